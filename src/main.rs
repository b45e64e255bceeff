// lowmem-killer daemon entry point

use lowmem_killer::config::{Args, Config};
use lowmem_killer::{daemon, logging};
use nix::sys::mman::{mlockall, MlockAllFlags};
use std::process::ExitCode;

fn main() -> ExitCode {
    let config = match Config::from_args(Args::parse_args()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e:#}");
            eprintln!("Use --help for usage information");
            return ExitCode::FAILURE;
        }
    };

    logging::init(config.debug, config.syslog);
    for warning in config.warnings() {
        log::warn!("{warning}");
    }

    // Stay resident: the daemon must not page in while memory is short
    if let Err(e) = mlockall(MlockAllFlags::MCL_CURRENT | MlockAllFlags::MCL_FUTURE) {
        log::warn!("mlockall failed: {e}; passes may stall under memory pressure");
    }

    match daemon::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Fatal error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
