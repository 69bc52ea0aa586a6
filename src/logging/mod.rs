use env_logger::{Builder, Env};

use crate::config;

/// Install the global logger.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this more
/// than once is harmless; later calls are ignored.
pub fn init_logger(config: &config::Log) {
    let env = Env::default().default_filter_or(config.level.as_str());

    if let Err(e) = Builder::from_env(env)
        .format_timestamp_millis()
        .try_init()
    {
        log::debug!("Logger already initialised: {e}");
    }
}
