use thiserror::Error;

#[derive(Error, Debug)]
pub enum SupertonicError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ONNX Runtime error: {0}")]
    Ort(#[from] ort::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("WAV encoding error: {0}")]
    Encoding(#[from] hound::Error),

    #[error("Model configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Text processing error: {0}")]
    TextProcessing(String),

    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Coarse-grained error class an HTTP layer built on top of this crate can
/// use to pick a status code, without this crate depending on an HTTP
/// framework (see SPEC_FULL §6.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Caller's fault: bad input. Maps to `400` at the HTTP boundary.
    ClientError,
    /// Everything else: bad assets, runtime failure, internal bug. Maps to
    /// `500` at the HTTP boundary.
    ServerError,
}

impl SupertonicError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SupertonicError::Validation(_) => ErrorClass::ClientError,
            SupertonicError::Io(_)
            | SupertonicError::Ort(_)
            | SupertonicError::Serialization(_)
            | SupertonicError::Encoding(_)
            | SupertonicError::Config(_)
            | SupertonicError::TextProcessing(_)
            | SupertonicError::ShapeMismatch { .. }
            | SupertonicError::Unknown(_) => ErrorClass::ServerError,
        }
    }
}
