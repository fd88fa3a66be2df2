//! Typed error taxonomy for level loading, precomputation and search.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SokobanError {
    #[error("i/o error reading levels file: {0}")]
    Io(#[from] std::io::Error),

    #[error("level {level} exceeds maximum dimension {max_dim}: {width}x{height}")]
    SizeExceeded {
        level: usize,
        width: usize,
        height: usize,
        max_dim: usize,
    },

    #[error("level {level} is malformed: {reason}")]
    MalformedLevel { level: usize, reason: String },

    #[error("internal verification failure: {0}")]
    VerificationFailure(String),
}

pub type Result<T> = std::result::Result<T, SokobanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_exceeded_message_includes_dimensions() {
        let err = SokobanError::SizeExceeded {
            level: 1,
            width: 80,
            height: 10,
            max_dim: 50,
        };
        assert!(err.to_string().contains("80x10"));
    }

    #[test]
    fn io_error_converts_via_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SokobanError = io_err.into();
        assert!(matches!(err, SokobanError::Io(_)));
    }
}
