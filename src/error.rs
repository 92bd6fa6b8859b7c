//! Error types for the PDF object model

use std::io;
use thiserror::Error;

/// Main error type for PDF object operations
#[derive(Error, Debug)]
pub enum PDFObjectError {
    /// An object was built or used in a way its invariants forbid
    #[error("Invariant violated by {object}: {message}")]
    InvariantViolation {
        object: String,
        message: String,
    },

    /// Malformed PDF structure
    #[error("Malformed PDF structure: {0}")]
    MalformedPDF(String),

    /// Syntax error at a byte offset
    #[error("Syntax error at offset {offset}: {message}")]
    SyntaxError {
        offset: usize,
        message: String,
    },

    /// Feature present in the file but not handled
    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Unknown text encoding name
    #[error("Unsupported text encoding: {0}")]
    UnsupportedEncoding(String),

    /// Invalid key length
    #[error("Invalid key length: {0}")]
    InvalidKeyLength(usize),

    /// Invalid data length
    #[error("Invalid data length for {operation}")]
    InvalidDataLength {
        operation: String,
    },

    /// AES error
    #[error("AES error: {0}")]
    AesError(String),

    /// Encrypt or decrypt requested before a key context was set
    #[error("No key context set on encryption engine")]
    MissingKeyContext,

    /// The document owning the decryptor is gone
    #[error("Encryption engine was released by its document")]
    EngineReleased,

    /// Invalid object type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        expected: &'static str,
        found: &'static str,
    },

    /// Document has no underlying byte source
    #[error("Document has no byte source")]
    NoByteSource,

    /// Cross reference table error
    #[error("Cross reference table error: {0}")]
    XRefError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
}

/// Result type for PDF object operations
pub type PDFObjectResult<T> = Result<T, PDFObjectError>;

impl PDFObjectError {
    /// Create a new malformed PDF error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedPDF(msg.into())
    }

    /// Create a new invariant violation naming the offending object
    pub fn invariant(object: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvariantViolation {
            object: object.into(),
            message: msg.into(),
        }
    }

    /// Create a new syntax error
    pub fn syntax(offset: usize, msg: impl Into<String>) -> Self {
        Self::SyntaxError {
            offset,
            message: msg.into(),
        }
    }

    /// Create a new invalid data length error
    pub fn invalid_length(operation: impl Into<String>) -> Self {
        Self::InvalidDataLength {
            operation: operation.into(),
        }
    }

    /// Check if error is cryptographic
    pub fn is_crypto_error(&self) -> bool {
        matches!(self,
            Self::AesError(_) |
            Self::InvalidKeyLength(_) |
            Self::MissingKeyContext |
            Self::EngineReleased
        )
    }

    /// Check if error is related to PDF structure
    pub fn is_structure_error(&self) -> bool {
        matches!(self,
            Self::MalformedPDF(_) |
            Self::SyntaxError { .. } |
            Self::XRefError(_)
        )
    }

    /// Check if error comes from the byte source
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::IoError(_) | Self::NoByteSource)
    }
}

impl From<aes::cipher::InvalidLength> for PDFObjectError {
    fn from(err: aes::cipher::InvalidLength) -> Self {
        Self::AesError(err.to_string())
    }
}

impl From<aes::cipher::block_padding::UnpadError> for PDFObjectError {
    fn from(err: aes::cipher::block_padding::UnpadError) -> Self {
        Self::AesError(err.to_string())
    }
}
