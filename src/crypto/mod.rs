//! PDF cryptographic engine implementation
//!
//! Strings and streams of an encrypted document are transformed with a key
//! derived from the file key and the number and generation of the indirect
//! object that contains them. [`EncryptionEngine`] is the stateful contract
//! the object model consumes: callers set the key context, then transform.

mod rc4;
mod aes;
pub mod engine;

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::error::PDFObjectResult;

pub use engine::StandardEncryption;

/// Per-object encrypt/decrypt transform
pub trait EncryptionEngine {
    /// Select the key for the object with the given number and generation
    fn set_key_context(&mut self, object_number: u32, generation: u16);

    /// Encrypt bytes with the current key context
    fn encrypt_bytes(&mut self, data: &[u8]) -> PDFObjectResult<Vec<u8>>;

    /// Decrypt bytes with the current key context
    fn decrypt_bytes(&mut self, data: &[u8]) -> PDFObjectResult<Vec<u8>>;

    /// Whether only embedded file streams are encrypted
    fn is_embedded_files_only(&self) -> bool;
}

/// Engine owned by a document and lent to its objects
pub type SharedEngine = Rc<RefCell<dyn EncryptionEngine>>;

/// Non-owning handle an object keeps to its document's engine
pub type EngineRef = Weak<RefCell<dyn EncryptionEngine>>;

/// Wrap an engine so a document can own it and its objects can refer to it
pub fn share<E: EncryptionEngine + 'static>(engine: E) -> SharedEngine {
    Rc::new(RefCell::new(engine))
}

/// Cipher primitive used by the standard engine
pub(crate) trait CryptoProvider {
    fn encrypt(&self, key: &[u8], data: &[u8]) -> PDFObjectResult<Vec<u8>>;
    fn decrypt(&self, key: &[u8], data: &[u8]) -> PDFObjectResult<Vec<u8>>;
}
