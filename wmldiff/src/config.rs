//! Diff configuration.
//!
//! Every fine-diff invocation receives the same configuration unchanged.
//! The defaults are the fixed values used for word-processing documents:
//! whitespace is significant and preserved.

use crate::constants::FINE_EVENT_CAP;
use crate::error::{Error, Result};

/// Configuration passed to the content recorder and the fine differ.
#[derive(Debug, Clone)]
pub struct DiffConfig {
    /// Treat whitespace differences as equal during comparison.
    pub ignore_whitespace: bool,
    /// Keep whitespace-only text nodes in recorded event sequences.
    pub preserve_whitespace: bool,
    /// Combined event count above which a changed run degrades to a
    /// whole-range delete+insert instead of a fine diff.
    pub max_fine_events: usize,
}

impl Default for DiffConfig {
    fn default() -> Self {
        DiffConfig {
            ignore_whitespace: false,
            preserve_whitespace: true,
            max_fine_events: FINE_EVENT_CAP,
        }
    }
}

impl DiffConfig {
    /// Validates the configuration.
    ///
    /// The default configuration always validates; only custom
    /// combinations can fail.
    pub fn validate(&self) -> Result<()> {
        if self.ignore_whitespace && self.preserve_whitespace {
            return Err(Error::Config(
                "whitespace cannot be both ignored and preserved".to_string(),
            ));
        }
        if self.max_fine_events == 0 {
            return Err(Error::Config(
                "max_fine_events must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = DiffConfig::default();
        assert!(!config.ignore_whitespace);
        assert!(config.preserve_whitespace);
        assert_eq!(config.max_fine_events, FINE_EVENT_CAP);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_contradictory_whitespace_flags() {
        let config = DiffConfig {
            ignore_whitespace: true,
            preserve_whitespace: true,
            ..DiffConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_cap_rejected() {
        let config = DiffConfig {
            max_fine_events: 0,
            ..DiffConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
