//! Error types for the reactive engine.
//!
//! Missing dependency state is never an error: reads outside an effect and
//! writes nobody observed are ordinary no-ops. The variants here cover data
//! conversion, configuration, and the cycle guards.

use thiserror::Error;

/// Errors raised by tether.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// A JSON document was expected to be an object.
    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    /// The JSON value has no counterpart in the value model.
    #[error("unsupported JSON value: {kind}")]
    UnsupportedJson { kind: &'static str },

    /// A runtime configuration value was rejected.
    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A computed read its own value while evaluating for the first time.
    #[error("computed value read itself during its first evaluation")]
    CircularComputed,

    /// Notifications kept re-entering each other past the configured limit.
    #[error("notification depth {depth} exceeded the limit of {limit}")]
    NotifyDepthExceeded { depth: usize, limit: usize },
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, ReactiveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_value() {
        let err = ReactiveError::NotAnObject { found: "array" };
        assert_eq!(err.to_string(), "expected a JSON object, found array");

        let err = ReactiveError::NotifyDepthExceeded { depth: 9, limit: 8 };
        assert_eq!(
            err.to_string(),
            "notification depth 9 exceeded the limit of 8"
        );
    }

    #[test]
    fn json_errors_convert() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: ReactiveError = parse.into();
        assert!(matches!(err, ReactiveError::Json(_)));
    }
}
