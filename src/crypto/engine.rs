//! Core cryptographic engine implementation

use log::trace;
use zeroize::Zeroizing;

use crate::error::{PDFObjectError, PDFObjectResult};
use crate::EncryptionAlgorithm;
use super::{aes, rc4, CryptoProvider, EncryptionEngine};

/// Configuration of the standard engine
#[derive(Clone)]
pub struct EncryptionConfig {
    /// Cipher used for strings and streams
    pub algorithm: EncryptionAlgorithm,
    /// File encryption key, as computed by the security handler
    pub file_key: Zeroizing<Vec<u8>>,
    /// Encrypt embedded file streams only, leaving strings in plaintext
    pub embedded_files_only: bool,
}

impl EncryptionConfig {
    pub fn new(algorithm: EncryptionAlgorithm, file_key: &[u8]) -> Self {
        Self {
            algorithm,
            file_key: Zeroizing::new(file_key.to_vec()),
            embedded_files_only: false,
        }
    }

    pub fn with_embedded_files_only(mut self, embedded_files_only: bool) -> Self {
        self.embedded_files_only = embedded_files_only;
        self
    }
}

/// Standard per-object encryption engine
pub struct StandardEncryption {
    algorithm: EncryptionAlgorithm,
    file_key: Zeroizing<Vec<u8>>,
    embedded_files_only: bool,
    object_key: Option<Zeroizing<Vec<u8>>>,
    provider: Box<dyn CryptoProvider>,
}

impl StandardEncryption {
    /// Create new engine from a file key
    pub fn new(config: EncryptionConfig) -> PDFObjectResult<Self> {
        let expected = config.algorithm.file_key_length();
        if config.file_key.len() != expected {
            return Err(PDFObjectError::InvalidKeyLength(config.file_key.len()));
        }

        let provider: Box<dyn CryptoProvider> = match config.algorithm {
            EncryptionAlgorithm::RC4_40 | EncryptionAlgorithm::RC4_128 => Box::new(rc4::RC4Provider::new(16)),
            EncryptionAlgorithm::AES_128 => Box::new(aes::AESProvider::new(16)),
            EncryptionAlgorithm::AES_256 => Box::new(aes::AESProvider::new(32)),
        };

        Ok(Self {
            algorithm: config.algorithm,
            file_key: config.file_key,
            embedded_files_only: config.embedded_files_only,
            object_key: None,
            provider,
        })
    }

    /// Get encryption algorithm
    pub fn algorithm(&self) -> EncryptionAlgorithm {
        self.algorithm
    }

    /// Generate unique encryption key for each object
    fn generate_object_key(
        file_key: &[u8],
        obj_num: u32,
        gen_num: u16,
        algorithm: EncryptionAlgorithm,
    ) -> Zeroizing<Vec<u8>> {
        // AES-256 uses the file key for every object
        if algorithm == EncryptionAlgorithm::AES_256 {
            return Zeroizing::new(file_key.to_vec());
        }

        let mut key_data = Zeroizing::new(Vec::with_capacity(file_key.len() + 9));
        key_data.extend_from_slice(file_key);
        // Low order 3 bytes of the object number, 2 bytes of the generation
        key_data.extend_from_slice(&obj_num.to_le_bytes()[..3]);
        key_data.extend_from_slice(&gen_num.to_le_bytes());
        if algorithm == EncryptionAlgorithm::AES_128 {
            key_data.extend_from_slice(b"sAlT");
        }

        let hash = md5::compute(&key_data[..]);
        let key_len = (file_key.len() + 5).min(16);
        Zeroizing::new(hash.0[..key_len].to_vec())
    }

    fn object_key(&self) -> PDFObjectResult<&[u8]> {
        self.object_key
            .as_ref()
            .map(|key| key.as_slice())
            .ok_or(PDFObjectError::MissingKeyContext)
    }
}

impl EncryptionEngine for StandardEncryption {
    fn set_key_context(&mut self, object_number: u32, generation: u16) {
        trace!("Deriving key for object {} {}", object_number, generation);
        self.object_key = Some(Self::generate_object_key(
            &self.file_key,
            object_number,
            generation,
            self.algorithm,
        ));
    }

    fn encrypt_bytes(&mut self, data: &[u8]) -> PDFObjectResult<Vec<u8>> {
        let key = self.object_key()?;
        self.provider.encrypt(key, data)
    }

    fn decrypt_bytes(&mut self, data: &[u8]) -> PDFObjectResult<Vec<u8>> {
        let key = self.object_key()?;
        self.provider.decrypt(key, data)
    }

    fn is_embedded_files_only(&self) -> bool {
        self.embedded_files_only
    }
}
