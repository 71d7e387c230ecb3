//! Error types
//!
//! Gameplay operations never fail: stale ids, double breaks and refused
//! purchases are reported through `bool`/`Option` outcomes. `GameError` covers
//! the cases that do abort something: bad configuration at startup, shape
//! construction refused by the physics backend, and unknown keys arriving
//! from the JS side.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    /// A configuration value is out of its valid range
    #[error("invalid configuration `{field}`: {reason}")]
    Config { field: &'static str, reason: String },

    /// Configuration JSON could not be parsed
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Configuration file could not be read
    #[error("failed to read configuration: {0}")]
    ConfigIo(#[from] std::io::Error),

    /// The physics backend refused to build a polygon from these vertices
    #[error("degenerate polygon with {vertex_count} vertices")]
    ShapeRejected { vertex_count: usize },

    /// Upgrade key outside the catalog
    #[error("unknown upgrade `{0}`")]
    UnknownUpgrade(String),
}

pub type GameResult<T> = Result<T, GameError>;

impl GameError {
    pub(crate) fn config(field: &'static str, reason: impl Into<String>) -> Self {
        GameError::Config {
            field,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_message() {
        let err = GameError::config("bin_width", "must be positive");
        assert_eq!(
            err.to_string(),
            "invalid configuration `bin_width`: must be positive"
        );
    }

    #[test]
    fn test_parse_error_converts() {
        let parse: Result<u32, _> = serde_json::from_str("not json");
        let err: GameError = parse.unwrap_err().into();
        assert!(matches!(err, GameError::ConfigParse(_)));
    }
}
