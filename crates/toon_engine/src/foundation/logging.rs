//! Logging setup on top of `env_logger`

use std::sync::Once;

pub use log::{debug, error, info, trace, warn};

static INIT: Once = Once::new();

/// Initialize the logging system with `RUST_LOG` or the `info` default
pub fn init() {
    init_with_filter("info");
}

/// Initialize logging, falling back to `default_filter` when `RUST_LOG` is unset.
///
/// Safe to call more than once; only the first call installs the logger.
pub fn init_with_filter(default_filter: &str) {
    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or(default_filter);
        if env_logger::Builder::from_env(env).try_init().is_err() {
            eprintln!("logger already installed; keeping the existing one");
        }
    });
}
