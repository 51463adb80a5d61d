use std::io::IsTerminal;

use tracing_log::LogTracer;
use tracing_subscriber::EnvFilter;

/// Installs the stderr subscriber and routes `log` records from the library
/// into it. `RUST_LOG` takes precedence over the verbosity flag.
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        if let Err(e) = LogTracer::init() {
            eprintln!("Failed to bridge log records: {}", e);
        }
    }
}
