// Daemon module - scheduling loop and service

mod service;

pub use service::DaemonService;

use crate::config::Config;
use anyhow::Result;

/// Run the low memory killer daemon with the given configuration
pub fn run(config: Config) -> Result<()> {
    let mut service = DaemonService::new(config);
    service.run()
}
