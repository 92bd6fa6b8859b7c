//! PDF document reader

use std::collections::HashSet;
use std::path::Path;

use log::{debug, trace, warn};

use crate::crypto::SharedEngine;
use crate::error::{PDFObjectError, PDFObjectResult};
use crate::source::{FileSource, RandomAccessSource};
use super::object::{IndirectReference, PdfObject};
use super::tokenizer::{self, Token, Tokenizer};
use super::xref::XRefTable;
use super::{Dictionary, PdfArray, PdfDocument, PdfString};

const PDF_MAGIC: &[u8] = b"%PDF-";
const STARTXREF_MARKER: &[u8] = b"startxref";

/// Reader configuration
#[derive(Clone, Default)]
pub struct ReaderProperties {
    encryption: Option<SharedEngine>,
    strict: bool,
}

impl ReaderProperties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine that decrypts the strings of an encrypted document
    pub fn with_encryption(mut self, engine: SharedEngine) -> Self {
        self.encryption = Some(engine);
        self
    }

    /// Fail on malformed objects instead of skipping them
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Decryption context of the indirect object being parsed
type Decryption<'e> = Option<(IndirectReference, &'e SharedEngine)>;

/// PDF document reader
pub struct PdfReader;

impl PdfReader {
    /// Read a document from a byte source
    ///
    /// The source stays attached to the document for byte-range access.
    pub fn read(source: Box<dyn RandomAccessSource>, properties: ReaderProperties) -> PDFObjectResult<PdfDocument> {
        debug!("Reading PDF document");
        let data = source.read_all()?;

        if !data.starts_with(PDF_MAGIC) {
            return Err(PDFObjectError::malformed("Invalid PDF header"));
        }
        let version = header_version(&data);

        let xref_offset = find_last_xref(&data)?;
        let (xref, trailer) = read_xref_chain(&data, xref_offset)?;

        let encrypted = trailer.contains_key("Encrypt");
        let encrypt_ref = trailer.get_reference("Encrypt");
        let engine = if encrypted {
            if properties.encryption.is_none() {
                warn!("Document is encrypted but no engine was supplied; strings stay encrypted");
            }
            properties.encryption.clone()
        } else {
            None
        };

        let mut document = PdfDocument::new();
        document.set_version(version);

        for (number, entry) in xref.in_use() {
            if number == 0 {
                continue;
            }
            let reference = IndirectReference::new(number, entry.generation);
            let decryption = engine
                .as_ref()
                .filter(|_| encrypt_ref != Some(reference))
                .map(|engine| (reference, engine));

            match read_indirect_object(&data, entry.offset, reference, decryption) {
                Ok(object) => document.set_object(reference, object),
                Err(e) if !properties.strict => warn!("Skipping object {}: {}", reference, e),
                Err(e) => return Err(e),
            }
        }

        debug!("Read {} objects", document.object_count());
        document.set_trailer(trailer);
        document.set_encryption(engine);
        document.set_source(source);
        Ok(document)
    }

    /// Read a document held in memory
    pub fn read_bytes(data: Vec<u8>, properties: ReaderProperties) -> PDFObjectResult<PdfDocument> {
        Self::read(Box::new(data), properties)
    }

    /// Read a document from a file
    pub fn open(path: impl AsRef<Path>, properties: ReaderProperties) -> PDFObjectResult<PdfDocument> {
        Self::read(Box::new(FileSource::open(path)?), properties)
    }
}

fn header_version(data: &[u8]) -> String {
    let rest = &data[PDF_MAGIC.len()..];
    let end = rest
        .iter()
        .position(|b| b.is_ascii_whitespace())
        .unwrap_or(rest.len());
    String::from_utf8_lossy(&rest[..end]).into_owned()
}

/// Find the offset given after the last `startxref`
fn find_last_xref(data: &[u8]) -> PDFObjectResult<u64> {
    trace!("Searching for last xref table");
    let marker = tokenizer::rfind(data, STARTXREF_MARKER)
        .ok_or_else(|| PDFObjectError::malformed("No startxref marker found"))?;

    let mut tokenizer = Tokenizer::at(data, marker + STARTXREF_MARKER.len());
    match tokenizer.next_token()? {
        Some(Token::Integer(offset)) if offset >= 0 => {
            trace!("Found xref table at offset {}", offset);
            Ok(offset as u64)
        }
        _ => Err(PDFObjectError::malformed("No valid xref table found")),
    }
}

/// Read the xref section at `offset` and every older section reached through `/Prev`
///
/// Returns the merged table and the newest trailer.
fn read_xref_chain(data: &[u8], offset: u64) -> PDFObjectResult<(XRefTable, Dictionary)> {
    let mut table = XRefTable::new();
    let mut trailer: Option<Dictionary> = None;
    let mut visited = HashSet::new();
    let mut next = Some(offset);

    while let Some(offset) = next {
        if !visited.insert(offset) {
            warn!("Xref chain loops back to offset {}", offset);
            break;
        }
        let position = usize::try_from(offset)
            .ok()
            .filter(|&p| p < data.len())
            .ok_or_else(|| PDFObjectError::XRefError(format!("xref offset {} beyond end of file", offset)))?;

        trace!("Parsing xref section at offset {}", position);
        let mut tokenizer = Tokenizer::at(data, position);
        let section = XRefTable::parse(&mut tokenizer)?;
        let section_trailer = match parse_object(&mut tokenizer, None)? {
            PdfObject::Dictionary(dict) => dict,
            other => {
                return Err(PDFObjectError::XRefError(format!(
                    "trailer is a {}, not a dictionary",
                    other.object_type().name()
                )))
            }
        };

        next = section_trailer.get_integer("Prev").and_then(|prev| u64::try_from(prev).ok());
        table.merge_older(section);
        if trailer.is_none() {
            trailer = Some(section_trailer);
        }
    }

    let trailer = trailer.ok_or_else(|| PDFObjectError::XRefError("no trailer".to_string()))?;
    Ok((table, trailer))
}

/// Parse `n g obj ... endobj` at `offset`
fn read_indirect_object(
    data: &[u8],
    offset: u64,
    reference: IndirectReference,
    decryption: Decryption<'_>,
) -> PDFObjectResult<PdfObject> {
    let position = usize::try_from(offset)
        .ok()
        .filter(|&p| p < data.len())
        .ok_or_else(|| PDFObjectError::malformed(format!("object {} offset {} beyond end of file", reference, offset)))?;
    let mut tokenizer = Tokenizer::at(data, position);

    let header = (tokenizer.next_token()?, tokenizer.next_token()?, tokenizer.next_token()?);
    match header {
        (Some(Token::Integer(number)), Some(Token::Integer(generation)), Some(Token::Keyword(ref k)))
            if k == "obj" && number == i64::from(reference.number) && generation == i64::from(reference.generation) => {}
        _ => {
            return Err(PDFObjectError::syntax(
                position,
                format!("expected object header for {}", reference),
            ))
        }
    }

    trace!("Parsing object {} at offset {}", reference, position);
    let object = parse_object(&mut tokenizer, decryption)?;

    match tokenizer.next_token()? {
        Some(Token::Keyword(k)) if k == "stream" => {
            let length = object
                .as_dictionary()
                .and_then(|dict| dict.get_integer("Length"))
                .and_then(|length| usize::try_from(length).ok());
            tokenizer.skip_stream(length)?;
        }
        Some(Token::Keyword(k)) if k == "endobj" => {}
        other => debug!("Object {} not closed by endobj: {:?}", reference, other),
    }

    Ok(object)
}

/// Parse one object, attaching `decryption` to every string in it
fn parse_object(tokenizer: &mut Tokenizer<'_>, decryption: Decryption<'_>) -> PDFObjectResult<PdfObject> {
    let start = tokenizer.position();
    let token = tokenizer
        .next_token()?
        .ok_or_else(|| PDFObjectError::syntax(start, "unexpected end of data"))?;
    parse_token(token, start, tokenizer, decryption)
}

fn parse_token(
    token: Token,
    start: usize,
    tokenizer: &mut Tokenizer<'_>,
    decryption: Decryption<'_>,
) -> PDFObjectResult<PdfObject> {
    match token {
        Token::Integer(number) => {
            // `n g R` is a reference
            let rewind = tokenizer.position();
            if let (Ok(Some(Token::Integer(generation))), Ok(Some(Token::Keyword(k)))) =
                (tokenizer.next_token(), tokenizer.next_token())
            {
                if k == "R" {
                    if let (Ok(number), Ok(generation)) = (u32::try_from(number), u16::try_from(generation)) {
                        return Ok(PdfObject::Reference(IndirectReference::new(number, generation)));
                    }
                }
            }
            tokenizer.seek(rewind);
            Ok(PdfObject::Number(number as f64))
        }
        Token::Real(value) => Ok(PdfObject::Number(value)),
        Token::Name(name) => Ok(PdfObject::Name(name)),
        Token::LiteralString(raw) => Ok(PdfObject::String(read_string(raw, false, decryption))),
        Token::HexString(raw) => Ok(PdfObject::String(read_string(raw, true, decryption))),
        Token::ArrayStart => {
            let mut items = Vec::new();
            loop {
                let item_start = tokenizer.position();
                match tokenizer.next_token()? {
                    Some(Token::ArrayEnd) => break,
                    Some(token) => items.push(parse_token(token, item_start, tokenizer, decryption)?),
                    None => return Err(PDFObjectError::syntax(start, "unterminated array")),
                }
            }
            Ok(PdfObject::Array(PdfArray::from_items(items)))
        }
        Token::DictStart => {
            let mut entries = Vec::new();
            loop {
                let key_start = tokenizer.position();
                match tokenizer.next_token()? {
                    Some(Token::DictEnd) => break,
                    Some(Token::Name(key)) => entries.push((key, parse_object(tokenizer, decryption)?)),
                    Some(other) => {
                        return Err(PDFObjectError::syntax(key_start, format!("expected name, found {:?}", other)))
                    }
                    None => return Err(PDFObjectError::syntax(start, "unterminated dictionary")),
                }
            }
            Ok(PdfObject::Dictionary(entries.into_iter().collect()))
        }
        Token::Keyword(keyword) => match keyword.as_str() {
            "true" => Ok(PdfObject::Boolean(true)),
            "false" => Ok(PdfObject::Boolean(false)),
            "null" => Ok(PdfObject::Null),
            _ => Err(PDFObjectError::syntax(start, format!("unexpected keyword '{}'", keyword))),
        },
        other => Err(PDFObjectError::syntax(start, format!("unexpected token {:?}", other))),
    }
}

fn read_string(raw: Vec<u8>, hex: bool, decryption: Decryption<'_>) -> PdfString {
    let mut string = PdfString::from_raw(raw, hex);
    if let Some((reference, engine)) = decryption {
        string.set_decryption(reference, engine);
    }
    string
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::testing::counting_engine;
    use crate::crypto::EncryptionEngine;
    use crate::pdf::codec;
    use pretty_assertions::assert_eq;
    use test_log::test;

    /// Assemble a file from object bodies, computing the xref offsets
    fn build_pdf(objects: &[&str], trailer: &str) -> Vec<u8> {
        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (idx, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", idx + 1, body).as_bytes());
        }
        let xref = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        out.extend_from_slice(format!("trailer\n{}\nstartxref\n{}\n%%EOF\n", trailer, xref).as_bytes());
        out
    }

    #[test]
    fn test_read_simple_document() -> PDFObjectResult<()> {
        let data = build_pdf(
            &[
                "<< /Type /Catalog /Title (Hello \\(World\\)) /Kids [2 0 R 3.5 true null] >>",
                "<FEFF0041>",
            ],
            "<< /Size 3 /Root 1 0 R >>",
        );
        let mut document = PdfReader::read_bytes(data, ReaderProperties::new())?;
        assert_eq!(document.version(), "1.4");
        assert_eq!(document.object_count(), 2);

        let catalog = document.catalog().unwrap();
        assert_eq!(catalog.get_name("Type"), Some("Catalog"));
        let kids = catalog.get_array("Kids").unwrap();
        assert_eq!(kids.get(0).and_then(PdfObject::as_reference), Some(IndirectReference::new(2, 0)));
        assert_eq!(kids.get_as_number(1), Some(3.5));

        let title = document
            .get_object_mut(IndirectReference::new(1, 0))
            .and_then(PdfObject::as_dictionary_mut)
            .and_then(|catalog| catalog.get_string_mut("Title"))
            .unwrap();
        assert_eq!(title.get_value()?, "Hello (World)");

        let unicode = document
            .get_object_mut(IndirectReference::new(2, 0))
            .and_then(PdfObject::as_string_mut)
            .unwrap();
        assert!(unicode.is_hex_writing());
        assert_eq!(unicode.to_unicode_string()?, "A");
        Ok(())
    }

    #[test]
    fn test_stream_bodies_are_skipped() -> PDFObjectResult<()> {
        let data = build_pdf(
            &["<< /Length 5 >>\nstream\nabcde\nendstream", "(after)"],
            "<< /Size 3 >>",
        );
        let document = PdfReader::read_bytes(data, ReaderProperties::new())?;
        let stream_dict = document.get_object(IndirectReference::new(1, 0)).and_then(PdfObject::as_dictionary);
        assert_eq!(stream_dict.and_then(|d| d.get_integer("Length")), Some(5));
        assert!(document.get_object(IndirectReference::new(2, 0)).is_some());
        Ok(())
    }

    #[test]
    fn test_incremental_update_overrides_objects() -> PDFObjectResult<()> {
        let mut data = build_pdf(&["(old)"], "<< /Size 2 >>");
        let first_xref = find_last_xref(&data)?;

        let update_offset = data.len();
        data.extend_from_slice(b"1 0 obj\n(new)\nendobj\n");
        let xref = data.len();
        data.extend_from_slice(
            format!(
                "xref\n1 1\n{:010} 00000 n \ntrailer\n<< /Size 2 /Prev {} >>\nstartxref\n{}\n%%EOF\n",
                update_offset, first_xref, xref
            )
            .as_bytes(),
        );

        let mut document = PdfReader::read_bytes(data, ReaderProperties::new())?;
        let string = document
            .get_object_mut(IndirectReference::new(1, 0))
            .and_then(PdfObject::as_string_mut)
            .unwrap();
        assert_eq!(string.get_value()?, "new");
        Ok(())
    }

    #[test]
    fn test_encrypted_strings_get_object_key_context() -> PDFObjectResult<()> {
        let (engine, counters) = counting_engine();
        let cipher = {
            let mut engine = engine.borrow_mut();
            engine.set_key_context(1, 0);
            engine.encrypt_bytes(b"hidden")?
        };
        let body = format!("<< /Secret <{}> >>", String::from_utf8_lossy(&codec::encode_hex(&cipher)));
        let data = build_pdf(&[body.as_str(), "<< /Filter /Standard /O (owner) >>"], "<< /Size 3 /Encrypt 2 0 R >>");

        let mut document = PdfReader::read_bytes(data, ReaderProperties::new().with_encryption(engine))?;
        assert!(document.encryption().is_some());

        let secret = document
            .get_object_mut(IndirectReference::new(1, 0))
            .and_then(PdfObject::as_dictionary_mut)
            .and_then(|dict| dict.get_string_mut("Secret"))
            .unwrap();
        assert_eq!(secret.get_value()?, "hidden");

        // the encryption dictionary itself is never decrypted
        let owner = document
            .get_object_mut(IndirectReference::new(2, 0))
            .and_then(PdfObject::as_dictionary_mut)
            .and_then(|dict| dict.get_string_mut("O"))
            .unwrap();
        assert!(!owner.is_encrypted());
        assert_eq!(owner.get_value()?, "owner");
        assert_eq!(counters.borrow().decryptions, 1);
        Ok(())
    }

    #[test]
    fn test_unencrypted_document_ignores_engine() -> PDFObjectResult<()> {
        let (engine, _counters) = counting_engine();
        let data = build_pdf(&["(plain)"], "<< /Size 2 >>");
        let document = PdfReader::read_bytes(data, ReaderProperties::new().with_encryption(engine))?;

        assert!(document.encryption().is_none());
        let string = document.get_object(IndirectReference::new(1, 0)).and_then(PdfObject::as_string).unwrap();
        assert!(!string.is_encrypted());
        Ok(())
    }

    #[test]
    fn test_malformed_object_strict_and_lenient() {
        let data = build_pdf(&["<< /Broken (unterminated >>", "(fine)"], "<< /Size 3 >>");

        let lenient = PdfReader::read_bytes(data.clone(), ReaderProperties::new()).unwrap();
        assert_eq!(lenient.object_count(), 1);

        let strict = PdfReader::read_bytes(data, ReaderProperties::new().with_strict(true));
        assert!(matches!(strict, Err(PDFObjectError::SyntaxError { .. })));
    }

    #[test]
    fn test_invalid_pdf() {
        let result = PdfReader::read_bytes(b"Not a PDF file".to_vec(), ReaderProperties::new());
        assert!(matches!(result, Err(PDFObjectError::MalformedPDF(_))));
    }

    #[test]
    fn test_missing_startxref() {
        let result = PdfReader::read_bytes(b"%PDF-1.7\n1 0 obj null endobj".to_vec(), ReaderProperties::new());
        assert!(matches!(result, Err(PDFObjectError::MalformedPDF(_))));
    }
}
