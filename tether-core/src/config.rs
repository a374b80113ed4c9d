//! Runtime configuration.
//!
//! The engine has a single tunable, the notification depth limit. It is
//! installed per thread with [`Runtime::configure`](crate::reactive::Runtime::configure).

use serde::{Deserialize, Serialize};

use crate::error::{ReactiveError, Result};

/// Default limit on nested notification passes.
pub const DEFAULT_MAX_NOTIFY_DEPTH: usize = 256;

/// Tunables of the reactive runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// How deeply notification passes may nest before the runtime treats
    /// the propagation as a cycle and panics.
    pub max_notify_depth: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_notify_depth: DEFAULT_MAX_NOTIFY_DEPTH,
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a JSON configuration. Missing fields keep their
    /// defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_notify_depth == 0 {
            return Err(ReactiveError::InvalidConfig(
                "max_notify_depth must be at least 1".to_owned(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = RuntimeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.max_notify_depth, DEFAULT_MAX_NOTIFY_DEPTH);
    }

    #[test]
    fn fields_are_read() {
        let config = RuntimeConfig::from_json_str(r#"{"max_notify_depth": 32}"#).unwrap();
        assert_eq!(config.max_notify_depth, 32);
    }

    #[test]
    fn zero_depth_is_rejected() {
        let err = RuntimeConfig::from_json_str(r#"{"max_notify_depth": 0}"#).unwrap_err();
        assert!(matches!(err, ReactiveError::InvalidConfig(_)));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = RuntimeConfig::from_json_str(r#"{"batch": true}"#).unwrap_err();
        assert!(matches!(err, ReactiveError::Json(_)));
    }
}
