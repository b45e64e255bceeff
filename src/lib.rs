// Low Memory Killer - priority-band process killer library

pub mod config;
pub mod monitor;
pub mod killer;
pub mod daemon;
pub mod logging;

// Re-export commonly used types
pub use config::{Config, Tunables};
pub use killer::LowMemoryKiller;
pub use monitor::{MemoryStats, ProcessCandidate};

/// Make a process name safe to print: control characters are replaced
/// and the length is capped
pub fn sanitize_for_log(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_control() { '?' } else { c })
        .take(64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_for_log() {
        assert_eq!(sanitize_for_log("firefox"), "firefox");
        assert_eq!(sanitize_for_log("evil\n[ALERT]"), "evil?[ALERT]");
        assert_eq!(sanitize_for_log("a\x1b[31mb"), "a?[31mb");
        assert_eq!(sanitize_for_log(&"x".repeat(100)).len(), 64);
    }
}
