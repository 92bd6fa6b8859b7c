//! RC4 encryption provider implementation

use rc4::consts::{U10, U16, U5};
use rc4::{KeyInit, Rc4, StreamCipher};

use crate::error::{PDFObjectError, PDFObjectResult};
use super::CryptoProvider;

/// RC4 encryption provider
#[derive(Debug)]
pub(crate) struct RC4Provider {
    max_key_length: usize,
}

impl RC4Provider {
    /// Create new RC4 provider accepting object keys up to `max_key_length` bytes
    pub fn new(max_key_length: usize) -> Self {
        Self { max_key_length }
    }

    fn process(&self, key: &[u8], data: &[u8]) -> PDFObjectResult<Vec<u8>> {
        if key.is_empty() || key.len() > self.max_key_length {
            return Err(PDFObjectError::InvalidKeyLength(key.len()));
        }

        let mut output = data.to_vec();
        match key.len() {
            5 => apply_keystream::<Rc4<U5>>(key, &mut output)?,
            10 => apply_keystream::<Rc4<U10>>(key, &mut output)?,
            16 => apply_keystream::<Rc4<U16>>(key, &mut output)?,
            other => return Err(PDFObjectError::InvalidKeyLength(other)),
        }
        Ok(output)
    }
}

/// Object keys are 10 or 16 bytes; 40-bit file keys are 5
fn apply_keystream<C: KeyInit + StreamCipher>(key: &[u8], data: &mut [u8]) -> PDFObjectResult<()> {
    let mut cipher = C::new_from_slice(key).map_err(|_| PDFObjectError::InvalidKeyLength(key.len()))?;
    cipher.apply_keystream(data);
    Ok(())
}

impl CryptoProvider for RC4Provider {
    fn encrypt(&self, key: &[u8], data: &[u8]) -> PDFObjectResult<Vec<u8>> {
        self.process(key, data)
    }

    fn decrypt(&self, key: &[u8], data: &[u8]) -> PDFObjectResult<Vec<u8>> {
        self.process(key, data)
    }
}
