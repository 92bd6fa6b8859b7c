//! PDF Primitives Library for Rust
//!
//! The PDF object model with deferred decoding: strings keep their encoded
//! on-disk form until first read, decrypt at most once, and re-encode (and
//! re-encrypt) only when written. On top of it sits a signature indexer that
//! reconstructs the revision history of a signed document from its form tree.
//!
//! The crate is single-threaded: a [`PdfDocument`] and the objects
//! it owns must not be shared across threads, and the byte source backing a
//! document must not change while a signature scan runs.

use std::fmt;

mod error;
pub mod crypto;
pub mod forms;
pub mod pdf;
pub mod signatures;
pub mod source;

pub use error::{PDFObjectError, PDFObjectResult};
pub use crypto::{EncryptionEngine, SharedEngine};
pub use crypto::engine::{EncryptionConfig, StandardEncryption};
pub use forms::{AcroForm, FieldNameTranslator, FormField};
pub use pdf::{
    Dictionary, IndirectReference, ObjectFlags, ObjectType, PdfArray, PdfDocument, PdfObject,
    PdfReader, PdfString, PrimitiveObject, ReaderProperties, TextEncoding,
};
pub use signatures::SignatureUtil;
pub use source::{RandomAccessSource, RangedReader, WindowReader};

/// Supported encryption algorithms for PDF string and stream encryption
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncryptionAlgorithm {
    /// RC4 encryption with 40-bit key (PDF 1.3)
    RC4_40,
    /// RC4 encryption with 128-bit key (PDF 1.4)
    RC4_128,
    /// AES encryption with 128-bit key (PDF 1.6)
    AES_128,
    /// AES encryption with 256-bit key (PDF 1.7+/2.0)
    AES_256,
}

impl EncryptionAlgorithm {
    /// Length in bytes of the file key this algorithm expects
    pub fn file_key_length(&self) -> usize {
        match self {
            EncryptionAlgorithm::RC4_40 => 5,
            EncryptionAlgorithm::RC4_128 | EncryptionAlgorithm::AES_128 => 16,
            EncryptionAlgorithm::AES_256 => 32,
        }
    }

    /// Whether the algorithm is an AES variant
    pub fn is_aes(&self) -> bool {
        matches!(self, EncryptionAlgorithm::AES_128 | EncryptionAlgorithm::AES_256)
    }
}

impl fmt::Display for EncryptionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncryptionAlgorithm::RC4_40 => write!(f, "RC4-40"),
            EncryptionAlgorithm::RC4_128 => write!(f, "RC4-128"),
            EncryptionAlgorithm::AES_128 => write!(f, "AES-128"),
            EncryptionAlgorithm::AES_256 => write!(f, "AES-256"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_key_lengths() {
        assert_eq!(EncryptionAlgorithm::RC4_40.file_key_length(), 5);
        assert_eq!(EncryptionAlgorithm::AES_128.file_key_length(), 16);
        assert_eq!(EncryptionAlgorithm::AES_256.file_key_length(), 32);
        assert!(EncryptionAlgorithm::AES_128.is_aes());
        assert!(!EncryptionAlgorithm::RC4_128.is_aes());
    }

    #[test]
    fn test_algorithm_display() {
        assert_eq!(EncryptionAlgorithm::RC4_128.to_string(), "RC4-128");
        assert_eq!(EncryptionAlgorithm::AES_256.to_string(), "AES-256");
    }
}
