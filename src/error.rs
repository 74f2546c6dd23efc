//! Error types for the mining engine
//!
//! "No records found" is not an error: an empty record list is returned
//! as `Ok(vec![])` so callers can tell it apart from a failure.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MineError {
    // Tree shape
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // K / T / cache bounds
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    // Markup reader
    #[error("Markup error: {0}")]
    Markup(String),
}

pub type Result<T> = std::result::Result<T, MineError>;

impl MineError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        MineError::InvalidInput(msg.into())
    }

    pub fn invalid_parameter(msg: impl Into<String>) -> Self {
        MineError::InvalidParameter(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = MineError::invalid_parameter("max_gn_size must be >= 1, got 0");
        assert_eq!(err.to_string(), "Invalid parameter: max_gn_size must be >= 1, got 0");

        let err = MineError::invalid_input("tree has no nodes");
        assert_eq!(err.to_string(), "Invalid input: tree has no nodes");
    }
}
