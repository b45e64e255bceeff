// Log backend selection

use log::LevelFilter;

/// Level used when `RUST_LOG` does not set one
pub fn default_level(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Install the global logger.
///
/// With `use_syslog` the daemon facility is tried first and stderr is the
/// fallback when syslog is unavailable or compiled out.
pub fn init(debug: bool, use_syslog: bool) {
    let level = default_level(debug);
    if use_syslog && init_syslog(level) {
        return;
    }

    let env = env_logger::Env::default().default_filter_or(level.as_str());
    if let Err(e) = env_logger::Builder::from_env(env)
        .format_timestamp_secs()
        .try_init()
    {
        eprintln!("Logger already installed: {e}");
    }
}

#[cfg(feature = "syslog")]
fn init_syslog(level: LevelFilter) -> bool {
    use syslog::{BasicLogger, Facility, Formatter3164};

    let formatter = Formatter3164 {
        facility: Facility::LOG_DAEMON,
        hostname: None,
        process: "lowmem-killer".into(),
        pid: std::process::id(),
    };

    match syslog::unix(formatter) {
        Ok(logger) => log::set_boxed_logger(Box::new(BasicLogger::new(logger)))
            .map(|()| log::set_max_level(level))
            .is_ok(),
        Err(e) => {
            eprintln!("Failed to connect to syslog: {e}");
            false
        }
    }
}

#[cfg(not(feature = "syslog"))]
fn init_syslog(_level: LevelFilter) -> bool {
    eprintln!("Warning: --syslog needs the 'syslog' feature; logging to stderr");
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(true), LevelFilter::Debug);
        assert_eq!(default_level(false), LevelFilter::Info);
        assert_eq!(default_level(false).as_str(), "INFO");
    }
}
