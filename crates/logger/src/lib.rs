//! Logging setup shared by the workspace binaries.
//!
//! Libraries only emit `tracing` events; a binary calls [`init`] once at
//! startup. Output goes to stderr so stdout stays free for command results.

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVES: &str = "warn,fund_parsers=info";

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Installs the global subscriber, filtered by `RUST_LOG` or else by
/// `default_directives`.
///
/// Returns `false` when a subscriber was already installed.
pub fn init(default_directives: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));
    install(filter)
}

/// Like [`init`] but ignores `RUST_LOG`, failing on malformed directives.
pub fn init_with_directives(directives: &str) -> Result<bool, ParseError> {
    let filter = EnvFilter::try_new(directives)?;
    Ok(install(filter))
}

fn install(filter: EnvFilter) -> bool {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("logger initialised");
    }
    installed
}
