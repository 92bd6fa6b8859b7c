//! PDF string object
//!
//! A string holds its encoded on-disk form (`content`: escaped literal or hex
//! digits, possibly still encrypted), its decoded value, or both. Either side
//! is derived from the other on first use and cached until a mutation that
//! changes the byte interpretation drops the content.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use log::trace;

use crate::crypto::{EncryptionEngine, EngineRef, SharedEngine};
use crate::error::{PDFObjectError, PDFObjectResult};
use super::codec;
use super::encoding::{self, TextEncoding, UTF16BE_BOM};
use super::object::{IndirectReference, ObjectFlags, ObjectHeader, ObjectType, PrimitiveObject};
use super::PdfDocument;

/// Which side of the string is known
#[derive(Debug, Clone)]
enum Representation {
    Content(Vec<u8>),
    Value(String),
    Both { content: Vec<u8>, value: String },
}

impl Representation {
    fn content(&self) -> Option<&[u8]> {
        match self {
            Representation::Content(content) | Representation::Both { content, .. } => Some(content),
            Representation::Value(_) => None,
        }
    }

    fn value(&self) -> Option<&str> {
        match self {
            Representation::Value(value) | Representation::Both { value, .. } => Some(value),
            Representation::Content(_) => None,
        }
    }

    fn with_value(self, value: String) -> Self {
        match self {
            Representation::Content(content) | Representation::Both { content, .. } => {
                Representation::Both { content, value }
            }
            Representation::Value(_) => Representation::Value(value),
        }
    }

    fn with_content(self, content: Vec<u8>) -> Self {
        match self {
            Representation::Value(value) | Representation::Both { value, .. } => {
                Representation::Both { content, value }
            }
            Representation::Content(_) => Representation::Content(content),
        }
    }

    /// Forget the content; only valid once the value is known
    fn without_content(self) -> Self {
        match self {
            Representation::Both { value, .. } => Representation::Value(value),
            other => other,
        }
    }
}

/// Whether content still has to pass through a decryptor
#[derive(Debug, Clone)]
enum CryptState {
    Plaintext,
    Encrypted {
        key: IndirectReference,
        decryptor: EngineRef,
    },
}

/// PDF string object
#[derive(Debug, Clone)]
pub struct PdfString {
    header: ObjectHeader,
    repr: Representation,
    crypt: CryptState,
    encoding: Option<TextEncoding>,
    hex_writing: bool,
}

impl PdfString {
    /// Create a string from its value
    pub fn new(value: impl Into<String>) -> Self {
        Self::from_representation(Representation::Value(value.into()), None, false)
    }

    /// Create a string whose value is converted to bytes with `encoding`
    pub fn with_encoding(value: impl Into<String>, encoding: TextEncoding) -> Self {
        Self::from_representation(Representation::Value(value.into()), Some(encoding), false)
    }

    /// Create a string from raw bytes, one char per byte
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let value = if bytes.is_empty() {
            String::new()
        } else {
            encoding::convert_to_string(bytes, None)
        };
        Self::new(value)
    }

    /// Create a string from encoded content as read from a file
    pub fn from_raw(content: Vec<u8>, hex_writing: bool) -> Self {
        Self::from_representation(Representation::Content(content), None, hex_writing)
    }

    fn from_representation(repr: Representation, encoding: Option<TextEncoding>, hex_writing: bool) -> Self {
        Self {
            header: ObjectHeader::default(),
            repr,
            crypt: CryptState::Plaintext,
            encoding,
            hex_writing,
        }
    }

    /// Attach the decryptor and key context of the object this string was read from
    pub(crate) fn set_decryption(&mut self, key: IndirectReference, decryptor: &SharedEngine) {
        self.crypt = CryptState::Encrypted {
            key,
            decryptor: Rc::downgrade(decryptor),
        };
    }

    /// Whether content still awaits decryption
    pub fn is_encrypted(&self) -> bool {
        matches!(self.crypt, CryptState::Encrypted { .. })
    }

    /// Get the decoded value, decoding and decrypting content on first use
    pub fn get_value(&mut self) -> PDFObjectResult<&str> {
        if self.repr.value().is_none() {
            self.generate_value()?;
        }
        let described = self.describe();
        self.repr
            .value()
            .ok_or_else(|| PDFObjectError::invariant(described, "no value after decoding"))
    }

    /// Get the value as bytes in this string's text encoding
    ///
    /// A `UnicodeBig` string whose text fits PDFDocEncoding is written in
    /// PDFDocEncoding.
    pub fn get_value_bytes(&mut self) -> PDFObjectResult<Vec<u8>> {
        let encoding = self.encoding;
        let value = self.get_value()?;
        if encoding == Some(TextEncoding::UnicodeBig) && encoding::is_pdf_doc_encoding(value) {
            Ok(encoding::convert_to_bytes(value, Some(TextEncoding::PdfDocEncoding)))
        } else {
            Ok(encoding::convert_to_bytes(value, encoding))
        }
    }

    /// Decode as text, guessing the encoding from a UTF-16BE marker when none is set
    pub fn to_unicode_string(&mut self) -> PDFObjectResult<String> {
        if self.encoding.is_some() {
            return self.get_value().map(str::to_owned);
        }
        if self.repr.content().is_none() {
            self.generate_content()?;
        }
        let bytes = self.decode_content()?;
        if bytes.starts_with(&UTF16BE_BOM) {
            Ok(encoding::convert_to_string(&bytes, Some(TextEncoding::UnicodeBig)))
        } else {
            Ok(encoding::convert_to_string(&bytes, Some(TextEncoding::PdfDocEncoding)))
        }
    }

    pub fn get_encoding(&self) -> Option<TextEncoding> {
        self.encoding
    }

    /// Change the text encoding; the content is regenerated on next use
    pub fn set_encoding(&mut self, encoding: Option<TextEncoding>) -> PDFObjectResult<&mut Self> {
        self.materialize_value()?;
        self.encoding = encoding;
        self.set_modified();
        Ok(self)
    }

    pub fn is_hex_writing(&self) -> bool {
        self.hex_writing
    }

    /// Switch between hex and literal writing; the content is regenerated on next use
    pub fn set_hex_writing(&mut self, hex_writing: bool) -> PDFObjectResult<&mut Self> {
        self.materialize_value()?;
        self.hex_writing = hex_writing;
        self.set_modified();
        Ok(self)
    }

    /// Exclude this string from encryption and decryption
    ///
    /// Has no effect on a value that was already decoded.
    pub fn mark_as_unencrypted_object(&mut self) -> &mut Self {
        self.header.flags.insert(ObjectFlags::UNENCRYPTED);
        self
    }

    pub fn is_unencrypted_object(&self) -> bool {
        self.header.flags.contains(ObjectFlags::UNENCRYPTED)
    }

    /// Encrypt the value into the content with `engine` keyed by the
    /// containing object `key`, or drop stale ciphertext when `None`
    ///
    /// Returns `true` when the content was rewritten. A string still holding
    /// ciphertext for the same engine and object is left as is. Afterwards
    /// the content is known to be ciphertext for `engine`, so reads decrypt
    /// it and a later write without an engine falls back to the value.
    pub fn encrypt(&mut self, encryption: Option<(IndirectReference, &SharedEngine)>) -> PDFObjectResult<bool> {
        if self.is_unencrypted_object() {
            return Ok(false);
        }
        if self.holds_ciphertext_for(encryption) {
            return Ok(false);
        }
        if self.is_encrypted() {
            // stale ciphertext from another engine or object
            self.materialize_value()?;
        }

        let Some((key, engine)) = encryption else {
            return Ok(false);
        };
        if engine.borrow().is_embedded_files_only() {
            return Ok(false);
        }

        let bytes = self.get_value_bytes()?;
        let encrypted = {
            let mut engine = engine.borrow_mut();
            engine.set_key_context(key.number, key.generation);
            engine.encrypt_bytes(&bytes)?
        };
        let content = self.encode_bytes(&encrypted);
        self.replace_content(content);
        self.crypt = CryptState::Encrypted {
            key,
            decryptor: Rc::downgrade(engine),
        };
        self.set_modified();
        Ok(true)
    }

    /// Strip hex or literal encoding from the content, then decrypt it
    pub fn decode_content(&self) -> PDFObjectResult<Vec<u8>> {
        let content = self
            .repr
            .content()
            .ok_or_else(|| PDFObjectError::invariant(self.describe(), "no content to decode"))?;
        let decoded = codec::decode_string_content(content, self.hex_writing);

        match &self.crypt {
            CryptState::Encrypted { key, decryptor } if !self.is_unencrypted_object() => {
                let engine = decryptor.upgrade().ok_or(PDFObjectError::EngineReleased)?;
                let mut engine = engine.borrow_mut();
                trace!("Decrypting string of object {}", key);
                engine.set_key_context(key.number, key.generation);
                engine.decrypt_bytes(&decoded)
            }
            _ => Ok(decoded),
        }
    }

    /// Encoded form as written between the string delimiters
    pub fn content(&mut self) -> PDFObjectResult<&[u8]> {
        if self.repr.content().is_none() {
            self.generate_content()?;
        }
        let described = self.describe();
        self.repr
            .content()
            .ok_or_else(|| PDFObjectError::invariant(described, "no content after encoding"))
    }

    fn generate_value(&mut self) -> PDFObjectResult<()> {
        let decoded = self.decode_content()?;
        let value = encoding::convert_to_string(&decoded, None);
        let repr = std::mem::replace(&mut self.repr, Representation::Value(String::new()));

        self.repr = if self.is_encrypted() {
            // plaintext from now on; the ciphertext must not be reused
            self.crypt = CryptState::Plaintext;
            Representation::Value(value)
        } else {
            repr.with_value(value)
        };
        Ok(())
    }

    fn generate_content(&mut self) -> PDFObjectResult<()> {
        let bytes = self.get_value_bytes()?;
        let content = self.encode_bytes(&bytes);
        self.replace_content(content);
        Ok(())
    }

    /// Make sure the value is known, then drop the content and any
    /// ciphertext state that went with it
    fn materialize_value(&mut self) -> PDFObjectResult<()> {
        if self.repr.value().is_none() {
            self.generate_value()?;
        }
        let repr = std::mem::replace(&mut self.repr, Representation::Value(String::new()));
        self.repr = repr.without_content();
        self.crypt = CryptState::Plaintext;
        Ok(())
    }

    fn replace_content(&mut self, content: Vec<u8>) {
        let repr = std::mem::replace(&mut self.repr, Representation::Value(String::new()));
        self.repr = repr.with_content(content);
    }

    fn encode_bytes(&self, bytes: &[u8]) -> Vec<u8> {
        if self.hex_writing {
            codec::encode_hex(bytes)
        } else {
            codec::escape_literal(bytes)
        }
    }

    fn holds_ciphertext_for(&self, encryption: Option<(IndirectReference, &SharedEngine)>) -> bool {
        match (&self.crypt, encryption) {
            (CryptState::Encrypted { key: own_key, decryptor }, Some((key, engine))) => {
                *own_key == key
                    && std::ptr::eq(decryptor.as_ptr() as *const u8, Rc::as_ptr(engine) as *const u8)
            }
            (CryptState::Plaintext, None) => true,
            _ => false,
        }
    }

    /// Value without caching anything
    fn peek_value(&self) -> Option<Cow<'_, str>> {
        if let Some(value) = self.repr.value() {
            return Some(Cow::Borrowed(value));
        }
        self.decode_content()
            .ok()
            .map(|bytes| Cow::Owned(encoding::convert_to_string(&bytes, None)))
    }

    fn describe(&self) -> String {
        match self.header.reference {
            Some(reference) => format!("string in object {}", reference),
            None => "direct string".to_string(),
        }
    }
}

impl PrimitiveObject for PdfString {
    fn object_type(&self) -> ObjectType {
        ObjectType::String
    }

    fn header(&self) -> &ObjectHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ObjectHeader {
        &mut self.header
    }

    fn copy_content(&self, _from: &PdfDocument, _to: &mut PdfDocument) -> PDFObjectResult<Self> {
        Ok(Self {
            header: ObjectHeader::default(),
            repr: self.repr.clone(),
            crypt: self.crypt.clone(),
            encoding: self.encoding,
            hex_writing: self.hex_writing,
        })
    }
}

impl PartialEq for PdfString {
    /// Equal values in equal encodings; content and hex mode are ignored
    fn eq(&self, other: &Self) -> bool {
        if self.encoding != other.encoding {
            return false;
        }
        match (self.peek_value(), other.peek_value()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for PdfString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.peek_value() {
            Some(value) => f.write_str(&value),
            None => Ok(()),
        }
    }
}
