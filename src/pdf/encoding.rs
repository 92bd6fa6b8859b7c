//! Text encodings for string values
//!
//! A string's value without an explicit encoding is a byte string: each
//! char stands for one byte (U+0000..U+00FF). The explicit encodings map
//! between real Unicode text and PDFDocEncoding or UTF-16BE bytes.

use std::fmt;
use std::str::FromStr;

use byteorder::{BigEndian, ByteOrder};
use encoding_rs::UTF_16BE;

use crate::error::PDFObjectError;

/// UTF-16BE byte-order marker
pub const UTF16BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// PDFDocEncoding bytes 0x18..=0x1F
const DIACRITICS: [char; 8] = [
    '\u{02D8}', '\u{02C7}', '\u{02C6}', '\u{02D9}', '\u{02DD}', '\u{02DB}', '\u{02DA}', '\u{02DC}',
];

/// PDFDocEncoding bytes 0x80..=0xA0; 0x9F is undefined and kept as is
const HIGH: [char; 33] = [
    '\u{2022}', '\u{2020}', '\u{2021}', '\u{2026}', '\u{2014}', '\u{2013}', '\u{0192}', '\u{2044}',
    '\u{2039}', '\u{203A}', '\u{2212}', '\u{2030}', '\u{201E}', '\u{201C}', '\u{201D}', '\u{2018}',
    '\u{2019}', '\u{201A}', '\u{2122}', '\u{FB01}', '\u{FB02}', '\u{0141}', '\u{0152}', '\u{0160}',
    '\u{0178}', '\u{017D}', '\u{0131}', '\u{0142}', '\u{0153}', '\u{0161}', '\u{017E}', '\u{009F}',
    '\u{20AC}',
];

/// Named text encoding of a string value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    /// The single-byte document encoding
    PdfDocEncoding,
    /// UTF-16 big-endian, written with a byte-order marker
    UnicodeBig,
}

impl TextEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::PdfDocEncoding => "PDF",
            TextEncoding::UnicodeBig => "UnicodeBig",
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TextEncoding {
    type Err = PDFObjectError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "PDF" | "PDFDocEncoding" => Ok(TextEncoding::PdfDocEncoding),
            "UnicodeBig" | "UTF-16BE" => Ok(TextEncoding::UnicodeBig),
            other => Err(PDFObjectError::UnsupportedEncoding(other.to_string())),
        }
    }
}

fn pdf_doc_char(b: u8) -> char {
    match b {
        0x18..=0x1F => DIACRITICS[(b - 0x18) as usize],
        0x80..=0xA0 => HIGH[(b - 0x80) as usize],
        _ => b as char,
    }
}

fn pdf_doc_byte(c: char) -> Option<u8> {
    if let Some(idx) = DIACRITICS.iter().position(|&d| d == c) {
        return Some(0x18 + idx as u8);
    }
    if let Some(idx) = HIGH.iter().position(|&h| h == c) {
        return Some(0x80 + idx as u8);
    }
    match u32::from(c) {
        code @ 0..=0xFF => {
            let b = code as u8;
            // bytes in the remapped ranges decode to something else
            if (0x18..=0x1F).contains(&b) || (0x80..=0xA0).contains(&b) {
                None
            } else {
                Some(b)
            }
        }
        _ => None,
    }
}

/// Whether every char of `text` has a PDFDocEncoding byte
pub fn is_pdf_doc_encoding(text: &str) -> bool {
    text.chars().all(|c| pdf_doc_byte(c).is_some())
}

/// Convert text to bytes
///
/// Without an encoding each char is truncated to one byte. PDFDocEncoding
/// drops chars it cannot represent.
pub fn convert_to_bytes(text: &str, encoding: Option<TextEncoding>) -> Vec<u8> {
    match encoding {
        None => text.chars().map(|c| u32::from(c) as u8).collect(),
        Some(TextEncoding::PdfDocEncoding) => text.chars().filter_map(pdf_doc_byte).collect(),
        Some(TextEncoding::UnicodeBig) => {
            let mut out = Vec::with_capacity(2 + text.len() * 2);
            out.extend_from_slice(&UTF16BE_BOM);
            let mut pair = [0u8; 2];
            for unit in text.encode_utf16() {
                BigEndian::write_u16(&mut pair, unit);
                out.extend_from_slice(&pair);
            }
            out
        }
    }
}

/// Convert bytes to text
pub fn convert_to_string(bytes: &[u8], encoding: Option<TextEncoding>) -> String {
    match encoding {
        None => bytes.iter().map(|&b| b as char).collect(),
        Some(TextEncoding::PdfDocEncoding) => bytes.iter().map(|&b| pdf_doc_char(b)).collect(),
        Some(TextEncoding::UnicodeBig) => {
            let payload = bytes.strip_prefix(&UTF16BE_BOM[..]).unwrap_or(bytes);
            let (text, _had_errors) = UTF_16BE.decode_without_bom_handling(payload);
            text.into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_raw_bytes_round_trip() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let text = convert_to_string(&bytes, None);
        assert_eq!(text.chars().count(), 256);
        assert_eq!(convert_to_bytes(&text, None), bytes);
    }

    #[test]
    fn test_pdf_doc_table_round_trip() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let text = convert_to_string(&bytes, Some(TextEncoding::PdfDocEncoding));
        assert!(is_pdf_doc_encoding(&text));
        assert_eq!(convert_to_bytes(&text, Some(TextEncoding::PdfDocEncoding)), bytes);
    }

    #[rstest]
    #[case(0x80, '\u{2022}')]
    #[case(0x18, '\u{02D8}')]
    #[case(0xA0, '\u{20AC}')]
    #[case(0xE9, 'é')]
    #[case(b'A', 'A')]
    fn test_pdf_doc_specials(#[case] byte: u8, #[case] expected: char) {
        assert_eq!(convert_to_string(&[byte], Some(TextEncoding::PdfDocEncoding)), expected.to_string());
    }

    #[test]
    fn test_pdf_doc_drops_unmappable() {
        assert!(!is_pdf_doc_encoding("日本"));
        assert_eq!(convert_to_bytes("a日b", Some(TextEncoding::PdfDocEncoding)), b"ab".to_vec());
    }

    #[test]
    fn test_unicode_big_writes_bom() {
        let bytes = convert_to_bytes("Aé", Some(TextEncoding::UnicodeBig));
        assert_eq!(bytes, vec![0xFE, 0xFF, 0x00, 0x41, 0x00, 0xE9]);
        assert_eq!(convert_to_string(&bytes, Some(TextEncoding::UnicodeBig)), "Aé");
    }

    #[test]
    fn test_unicode_big_surrogates() {
        let text = "clef 𝄞";
        let bytes = convert_to_bytes(text, Some(TextEncoding::UnicodeBig));
        assert_eq!(convert_to_string(&bytes, Some(TextEncoding::UnicodeBig)), text);
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!("PDFDocEncoding".parse::<TextEncoding>().unwrap(), TextEncoding::PdfDocEncoding);
        assert_eq!("UTF-16BE".parse::<TextEncoding>().unwrap(), TextEncoding::UnicodeBig);
        assert!("Cp1252".parse::<TextEncoding>().is_err());
        assert_eq!(TextEncoding::UnicodeBig.to_string(), "UnicodeBig");
    }
}
