//! Error handling for medallion-store
//!
//! Wraps medallion-core ExError with store-specific helpers

use medallion_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create an IO error, keeping the OS error kind for retry decisions
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_io_kind(err.kind())
        .with_message(err.to_string())
}

/// Create a CSV error; IO failures underneath keep their IO classification
pub fn csv_error(operation: &str, path: &str, err: csv::Error) -> ExError {
    if let csv::ErrorKind::Io(io) = err.kind() {
        return ExError::new(ExErrorKind::Io)
            .with_op(operation.to_string())
            .with_item(path.to_string())
            .with_io_kind(io.kind())
            .with_message(io.to_string());
    }
    ExError::new(ExErrorKind::Parse)
        .with_op(operation.to_string())
        .with_item(path.to_string())
        .with_message(err.to_string())
}

/// Create a YAML (de)serialization error
pub fn yaml_error(operation: &str, path: &str, err: serde_yaml::Error) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op(operation.to_string())
        .with_item(path.to_string())
        .with_message(err.to_string())
}

/// Create a JSON serialization error
pub fn json_error(operation: &str, err: serde_json::Error) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_keeps_kind() {
        let err = io_error(
            "read_source",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.kind(), ExErrorKind::Io);
        assert_eq!(err.io_kind(), Some(std::io::ErrorKind::NotFound));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_interrupted_io_is_transient() {
        let err = io_error(
            "copy_source",
            std::io::Error::new(std::io::ErrorKind::Interrupted, "signal"),
        );
        assert!(err.is_transient());
    }
}
