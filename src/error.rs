//! Engine error types
//!
//! Errors only surface at construction and API boundaries (adding bodies,
//! loading config). A running step never fails; it degrades instead.

use std::fmt;

use crate::sim::BodyHandle;

/// Top-level error enum for the physics engine
#[derive(Debug)]
pub enum EngineError {
    /// Body radius or mass is not a positive finite number
    InvalidBody {
        field: &'static str,
        value: f32,
    },
    /// The world already holds the configured maximum number of bodies
    BodyLimit { max: usize },
    /// Handle does not refer to a live body
    UnknownBody(BodyHandle),
    /// Static bodies cannot be removed or take part in merges
    StaticBody(BodyHandle),
    /// Tier name missing from the catalog
    UnknownType(String),
    /// Configuration value outside its usable range
    InvalidConfig {
        name: &'static str,
        value: f32,
        reason: &'static str,
    },
    /// Malformed JSON configuration
    Parse(serde_json::Error),
    /// Config or tier file could not be read
    Io(std::io::Error),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidBody { field, value } => {
                write!(f, "invalid body: {} must be positive and finite, got {}", field, value)
            }
            EngineError::BodyLimit { max } => {
                write!(f, "body limit reached ({} bodies)", max)
            }
            EngineError::UnknownBody(handle) => write!(f, "unknown body {:?}", handle),
            EngineError::StaticBody(handle) => {
                write!(f, "body {:?} is static and cannot be removed or merged", handle)
            }
            EngineError::UnknownType(name) => write!(f, "unknown body type '{}'", name),
            EngineError::InvalidConfig {
                name,
                value,
                reason,
            } => write!(f, "config '{}' = {} is invalid: {}", name, value, reason),
            EngineError::Parse(err) => write!(f, "failed to parse config: {}", err),
            EngineError::Io(err) => write!(f, "failed to read file: {}", err),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Parse(err) => Some(err),
            EngineError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Parse(err)
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err)
    }
}

/// Convenience alias: a `Result` using `EngineError` as the error type
pub type EngineResult<T> = Result<T, EngineError>;

/// Returns an error unless `value` is positive and finite
pub(crate) fn require_positive(field: &'static str, value: f32) -> EngineResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidBody { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_positive() {
        assert!(require_positive("radius", 10.0).is_ok());
        assert!(require_positive("radius", 0.0).is_err());
        assert!(require_positive("mass", -1.0).is_err());
        assert!(require_positive("mass", f32::INFINITY).is_err());
    }

    #[test]
    fn test_display_mentions_field() {
        let err = EngineError::InvalidBody {
            field: "mass",
            value: -2.0,
        };
        assert!(err.to_string().contains("mass"));
    }
}
