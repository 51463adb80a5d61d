//! The OpenShift template that collects one SelectorSyncSet per directory.
//!
//! Both skeletons are handled as raw YAML mappings so that any field the
//! templates carry (labels, selectors, resourceApplyMode, ...) is kept as is
//! and in its original order.

use std::path::{Component, Path};

use serde_yaml::{Mapping, Value};

use crate::classifier::Classification;
use crate::error::{Result, SyncSetError};

/// Template parameter that receives the repository name.
pub const REPO_NAME_PARAMETER: &str = "REPO_NAME";

const OBJECTS: &str = "objects";
const PARAMETERS: &str = "parameters";
const METADATA: &str = "metadata";
const SPEC: &str = "spec";
const PATCHES: &str = "patches";
const RESOURCES: &str = "resources";

/// Derives a bundle name from a directory below the manifest root.
///
/// The root itself maps to `repo_name`; `root/a/b` maps to `repo_name-a-b`.
pub fn bundle_name(root: &Path, dir: &Path, repo_name: &str) -> String {
    let relative = dir.strip_prefix(root).unwrap_or(dir);

    let mut name = repo_name.to_string();
    for component in relative.components() {
        if let Component::Normal(part) = component {
            name.push('-');
            name.push_str(&part.to_string_lossy());
        }
    }
    name
}

/// The top-level template document.
#[derive(Debug, Clone)]
pub struct Template {
    root: Mapping,
    /// Held outside `root` while bundles are appended; `root` keeps the key
    /// so the output order is unchanged.
    objects: Vec<Value>,
}

impl Template {
    /// Wraps a parsed `template.yaml`.
    ///
    /// A missing or null `objects` list is treated as empty.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Mapping(mut root) = value else {
            return Err(SyncSetError::InvalidTemplate(
                "template must be a mapping".to_string(),
            ));
        };

        match root.get(PARAMETERS) {
            None | Some(Value::Null) | Some(Value::Sequence(_)) => {}
            Some(_) => {
                return Err(SyncSetError::InvalidTemplate(format!(
                    "'{}' must be a list",
                    PARAMETERS
                )))
            }
        }

        let objects = match root.get_mut(OBJECTS) {
            Some(Value::Sequence(seq)) => std::mem::take(seq),
            None | Some(Value::Null) => Vec::new(),
            Some(_) => {
                return Err(SyncSetError::InvalidTemplate(format!(
                    "'{}' must be a list",
                    OBJECTS
                )))
            }
        };
        if !root.contains_key(OBJECTS) {
            root.insert(Value::from(OBJECTS), Value::Null);
        }

        Ok(Self { root, objects })
    }

    /// Sets the value of every parameter called `name`.
    ///
    /// Returns false if the template declares no such parameter.
    pub fn set_parameter(&mut self, name: &str, value: &str) -> bool {
        let Some(parameters) = self.root.get_mut(PARAMETERS).and_then(Value::as_sequence_mut)
        else {
            return false;
        };

        let mut found = false;
        for parameter in parameters.iter_mut().filter_map(Value::as_mapping_mut) {
            if parameter.get("name").and_then(Value::as_str) == Some(name) {
                parameter.insert(Value::from("value"), Value::from(value));
                found = true;
            }
        }
        found
    }

    /// Returns the value of the first parameter called `name`.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.root
            .get(PARAMETERS)?
            .as_sequence()?
            .iter()
            .filter_map(Value::as_mapping)
            .find(|p| p.get("name").and_then(Value::as_str) == Some(name))
            .and_then(|p| p.get("value"))
    }

    pub fn push_object(&mut self, object: Value) {
        self.objects.push(object);
    }

    pub fn objects(&self) -> &[Value] {
        &self.objects
    }

    pub fn into_value(self) -> Value {
        let mut root = self.root;
        root.insert(Value::from(OBJECTS), Value::Sequence(self.objects));
        Value::Mapping(root)
    }

    /// Serializes the template as block-style YAML.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.clone().into_value())?)
    }
}

/// The SelectorSyncSet skeleton every bundle is copied from.
#[derive(Debug, Clone)]
pub struct SyncSetSkeleton {
    root: Mapping,
}

impl SyncSetSkeleton {
    /// Wraps a parsed `selectorsyncset.yaml`.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Mapping(root) => Ok(Self { root }),
            _ => Err(SyncSetError::InvalidTemplate(
                "selectorsyncset must be a mapping".to_string(),
            )),
        }
    }

    /// Builds a bundle: a copy of the skeleton named `name`, with the
    /// classified documents appended to `spec.patches` and `spec.resources`.
    ///
    /// Each list is only created when there is something to put in it.
    pub fn instantiate(&self, name: &str, classification: Classification) -> Result<Value> {
        let mut object = self.root.clone();

        child_mapping(&mut object, METADATA)?.insert(Value::from("name"), Value::from(name));

        let Classification {
            patches, resources, ..
        } = classification;

        if !patches.is_empty() {
            let spec = child_mapping(&mut object, SPEC)?;
            child_sequence(spec, PATCHES)?.extend(patches);
        }
        if !resources.is_empty() {
            let spec = child_mapping(&mut object, SPEC)?;
            child_sequence(spec, RESOURCES)?.extend(resources);
        }

        Ok(Value::Mapping(object))
    }
}

fn child_mapping<'a>(parent: &'a mut Mapping, key: &str) -> Result<&'a mut Mapping> {
    let child = parent
        .entry(Value::from(key))
        .or_insert_with(|| Value::Mapping(Mapping::new()));
    if child.is_null() {
        *child = Value::Mapping(Mapping::new());
    }
    child
        .as_mapping_mut()
        .ok_or_else(|| SyncSetError::InvalidTemplate(format!("'{}' must be a mapping", key)))
}

fn child_sequence<'a>(parent: &'a mut Mapping, key: &str) -> Result<&'a mut Vec<Value>> {
    let child = parent
        .entry(Value::from(key))
        .or_insert_with(|| Value::Sequence(Vec::new()));
    if child.is_null() {
        *child = Value::Sequence(Vec::new());
    }
    child
        .as_sequence_mut()
        .ok_or_else(|| SyncSetError::InvalidTemplate(format!("'{}' must be a list", key)))
}
