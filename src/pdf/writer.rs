//! PDF document serialization

use std::io::Write;

use log::{debug, trace};

use crate::crypto::SharedEngine;
use crate::error::PDFObjectResult;
use super::object::{IndirectReference, PdfObject};
use super::xref::{XRefEntry, XRefTable};
use super::{Dictionary, PdfDocument, PdfString};

/// Marker bytes after the header flagging the file as binary
const BINARY_MARKER: &[u8] = b"%\xE2\xE3\xCF\xD3\n";

impl PdfDocument {
    /// Serialize the document: header, objects, xref table and trailer
    ///
    /// Strings are encrypted with the document's engine using the key of
    /// the indirect object that contains them. The object referenced by the
    /// trailer's `/Encrypt` and the trailer itself are written in the clear.
    pub fn to_bytes(&mut self) -> PDFObjectResult<Vec<u8>> {
        debug!("Writing PDF document");
        let mut output = Vec::new();
        output.extend_from_slice(format!("%PDF-{}\n", self.version()).as_bytes());
        output.extend_from_slice(BINARY_MARKER);

        let engine = self.encryption().cloned();
        let encrypt_ref = self.trailer().get_reference("Encrypt");

        let mut xref = XRefTable::new();
        xref.insert(0, XRefEntry { offset: 0, generation: 65535, in_use: false });

        for (reference, object) in self.objects_mut() {
            trace!("Writing object {}", reference);
            xref.insert(reference.number, XRefEntry {
                offset: output.len() as u64,
                generation: reference.generation,
                in_use: true,
            });

            let encryption = engine
                .as_ref()
                .filter(|_| encrypt_ref != Some(reference))
                .map(|engine| (reference, engine));

            output.extend_from_slice(format!("{} {} obj\n", reference.number, reference.generation).as_bytes());
            write_object(object, encryption, &mut output)?;
            output.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = output.len();
        xref.write_to(&mut output);

        self.trailer_mut().set("Size", i64::from(xref.size()));
        self.trailer_mut().remove("Prev");
        output.extend_from_slice(b"trailer\n");
        write_dictionary(self.trailer_mut(), None, &mut output)?;
        output.extend_from_slice(format!("\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes());

        debug!("Wrote {} bytes", output.len());
        Ok(output)
    }

    /// Serialize the document into `output`
    pub fn write_to<W: Write>(&mut self, output: &mut W) -> PDFObjectResult<()> {
        let bytes = self.to_bytes()?;
        output.write_all(&bytes)?;
        Ok(())
    }
}

/// Engine and key of the indirect object being written
type Encryption<'e> = Option<(IndirectReference, &'e SharedEngine)>;

/// Write one object; strings pass through `encryption` first
pub(crate) fn write_object(object: &mut PdfObject, encryption: Encryption<'_>, output: &mut Vec<u8>) -> PDFObjectResult<()> {
    match object {
        PdfObject::Null => output.extend_from_slice(b"null"),
        PdfObject::Boolean(b) => output.extend_from_slice(if *b { b"true" } else { b"false" }),
        PdfObject::Number(n) => output.extend_from_slice(n.to_string().as_bytes()),
        PdfObject::Name(name) => write_name(name, output),
        PdfObject::String(string) => write_string(string, encryption, output)?,
        PdfObject::Array(array) => {
            output.push(b'[');
            for (i, item) in array.iter_mut().enumerate() {
                if i > 0 {
                    output.push(b' ');
                }
                write_object(item, encryption, output)?;
            }
            output.push(b']');
        }
        PdfObject::Dictionary(dict) => write_dictionary(dict, encryption, output)?,
        PdfObject::Reference(reference) => output.extend_from_slice(reference.to_string().as_bytes()),
    }
    Ok(())
}

fn write_dictionary(dict: &mut Dictionary, encryption: Encryption<'_>, output: &mut Vec<u8>) -> PDFObjectResult<()> {
    output.extend_from_slice(b"<<");
    for (key, value) in dict.iter_mut() {
        write_name(key, output);
        output.push(b' ');
        write_object(value, encryption, output)?;
        output.push(b' ');
    }
    output.extend_from_slice(b">>");
    Ok(())
}

fn write_string(string: &mut PdfString, encryption: Encryption<'_>, output: &mut Vec<u8>) -> PDFObjectResult<()> {
    string.encrypt(encryption)?;
    let hex = string.is_hex_writing();
    let content = string.content()?;
    output.push(if hex { b'<' } else { b'(' });
    output.extend_from_slice(content);
    output.push(if hex { b'>' } else { b')' });
    Ok(())
}

fn write_name(name: &str, output: &mut Vec<u8>) {
    output.push(b'/');
    for &b in name.as_bytes() {
        let plain = (0x21..=0x7E).contains(&b)
            && !matches!(b, b'#' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%');
        if plain {
            output.push(b);
        } else {
            output.extend_from_slice(format!("#{:02X}", b).as_bytes());
        }
    }
}
