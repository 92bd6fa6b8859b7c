//! AES encryption provider implementation

use aes::{Aes128, Aes256};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::{thread_rng, RngCore};

use crate::error::{PDFObjectError, PDFObjectResult};
use super::CryptoProvider;

const BLOCK_SIZE: usize = 16;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;
type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES-CBC provider; ciphertext is the IV followed by the padded blocks
pub(crate) struct AESProvider {
    key_length: usize,
}

impl AESProvider {
    pub fn new(key_length: usize) -> Self {
        Self { key_length }
    }

    fn check_key(&self, key: &[u8]) -> PDFObjectResult<()> {
        if key.len() != self.key_length {
            return Err(PDFObjectError::InvalidKeyLength(key.len()));
        }
        Ok(())
    }

    /// Encrypt with an explicit IV
    fn encrypt_with_iv(&self, key: &[u8], iv: &[u8; BLOCK_SIZE], data: &[u8]) -> PDFObjectResult<Vec<u8>> {
        self.check_key(key)?;

        let padded_len = (data.len() / BLOCK_SIZE + 1) * BLOCK_SIZE;
        let mut buf = vec![0u8; padded_len];
        buf[..data.len()].copy_from_slice(data);

        let written = match self.key_length {
            16 => Aes128CbcEnc::new_from_slices(key, iv)?
                .encrypt_padded_mut::<Pkcs7>(&mut buf, data.len())
                .map_err(|_| PDFObjectError::invalid_length("AES encryption"))?
                .len(),
            32 => Aes256CbcEnc::new_from_slices(key, iv)?
                .encrypt_padded_mut::<Pkcs7>(&mut buf, data.len())
                .map_err(|_| PDFObjectError::invalid_length("AES encryption"))?
                .len(),
            other => return Err(PDFObjectError::InvalidKeyLength(other)),
        };

        let mut output = Vec::with_capacity(BLOCK_SIZE + written);
        output.extend_from_slice(iv);
        output.extend_from_slice(&buf[..written]);
        Ok(output)
    }
}

impl CryptoProvider for AESProvider {
    fn encrypt(&self, key: &[u8], data: &[u8]) -> PDFObjectResult<Vec<u8>> {
        let mut iv = [0u8; BLOCK_SIZE];
        thread_rng().fill_bytes(&mut iv);
        self.encrypt_with_iv(key, &iv, data)
    }

    fn decrypt(&self, key: &[u8], data: &[u8]) -> PDFObjectResult<Vec<u8>> {
        self.check_key(key)?;

        if data.len() < BLOCK_SIZE {
            return Err(PDFObjectError::invalid_length("AES decryption"));
        }

        // Extract IV (first 16 bytes)
        let (iv, encrypted) = data.split_at(BLOCK_SIZE);
        if encrypted.is_empty() {
            return Ok(Vec::new());
        }
        if encrypted.len() % BLOCK_SIZE != 0 {
            return Err(PDFObjectError::invalid_length("AES decryption"));
        }

        let mut buf = encrypted.to_vec();
        let plain_len = match self.key_length {
            16 => Aes128CbcDec::new_from_slices(key, iv)?
                .decrypt_padded_mut::<Pkcs7>(&mut buf)?
                .len(),
            32 => Aes256CbcDec::new_from_slices(key, iv)?
                .decrypt_padded_mut::<Pkcs7>(&mut buf)?
                .len(),
            other => return Err(PDFObjectError::InvalidKeyLength(other)),
        };

        buf.truncate(plain_len);
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_aes_128_encryption() {
        let provider = AESProvider::new(16);
        let key = [1u8; 16];
        let data = b"Test AES-128 encryption with CBC mode".to_vec();

        let encrypted = provider.encrypt(&key, &data).unwrap();
        assert_eq!(encrypted.len() % 16, 0);
        assert_ne!(&encrypted[16..], &data[..]);

        let decrypted = provider.decrypt(&key, &encrypted).unwrap();
        assert_eq!(decrypted, data);
    }

    #[test]
    fn test_aes_256_encryption() {
        let provider = AESProvider::new(32);
        let key = [7u8; 32];
        let data = b"Test AES-256 encryption with CBC mode".to_vec();

        let encrypted = provider.encrypt(&key, &data).unwrap();
        let decrypted = provider.decrypt(&key, &encrypted).unwrap();
        assert_eq!(decrypted, data);
    }

    #[test]
    fn test_fixed_iv_is_prefixed() {
        let provider = AESProvider::new(16);
        let iv = [9u8; 16];
        let encrypted = provider.encrypt_with_iv(&[3u8; 16], &iv, b"block").unwrap();

        assert_eq!(&encrypted[..16], &iv);
        // one padded block follows the IV
        assert_eq!(encrypted.len(), 32);
    }

    #[test]
    fn test_block_aligned_input_gets_full_padding_block() {
        let provider = AESProvider::new(16);
        let encrypted = provider.encrypt(&[3u8; 16], &[0u8; 16]).unwrap();
        assert_eq!(encrypted.len(), 16 + 32);
    }

    #[test]
    fn test_iv_only_decrypts_to_empty() {
        let provider = AESProvider::new(16);
        assert!(provider.decrypt(&[1u8; 16], &[0u8; 16]).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_key_length() {
        let provider = AESProvider::new(16);
        let key = vec![1u8; 24];

        assert!(matches!(
            provider.decrypt(&key, &[0u8; 32]),
            Err(PDFObjectError::InvalidKeyLength(24))
        ));
    }

    #[test]
    fn test_invalid_data_length() {
        let provider = AESProvider::new(16);
        let key = vec![1u8; 16];

        assert!(matches!(
            provider.decrypt(&key, &[0u8; 8]),
            Err(PDFObjectError::InvalidDataLength { .. })
        ));
        assert!(matches!(
            provider.decrypt(&key, &[0u8; 20]),
            Err(PDFObjectError::InvalidDataLength { .. })
        ));
    }
}
