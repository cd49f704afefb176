//! Diagnostics to stderr via tracing

use tracing_subscriber::EnvFilter;

/// Logging settings for a run; `RUST_LOG` overrides the derived filter
#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    pub verbose: bool,
}

impl LogConfig {
    pub fn directives(&self) -> &'static str {
        if self.verbose {
            "pseudo_rss=debug,warn"
        } else {
            "pseudo_rss=info,warn"
        }
    }

    /// Install the global subscriber; report output never goes through it
    pub fn init(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.directives()));

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives() {
        assert!(LogConfig { verbose: true }.directives().contains("debug"));
        assert!(!LogConfig::default().directives().contains("debug"));
        assert_eq!(LogConfig::default().directives(), "pseudo_rss=info,warn");
    }
}
