//! Error types for I/O operations

use thiserror::Error;

/// Errors that can occur during I/O operations
#[derive(Error, Debug)]
pub enum IoError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file format: {format}")]
    InvalidFormat { format: String },

    #[error("Parse error on line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Write error: {message}")]
    WriteError { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IoError {
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        IoError::ParseError {
            line,
            message: message.into(),
        }
    }
}

impl From<IoError> for meshview_core::Error {
    fn from(err: IoError) -> Self {
        match err {
            IoError::FileNotFound { .. } | IoError::ParseError { .. } => {
                meshview_core::Error::LoadFailed(err.to_string())
            }
            IoError::InvalidFormat { format } => meshview_core::Error::UnsupportedFormat(format),
            IoError::WriteError { message } => {
                meshview_core::Error::Io(std::io::Error::other(message))
            }
            IoError::Io(e) => meshview_core::Error::Io(e),
        }
    }
}
