//! Signature field index and revision extraction

use std::collections::HashMap;

use log::{debug, trace, warn};

use crate::error::{PDFObjectError, PDFObjectResult};
use crate::forms::{AcroForm, FieldNameTranslator, FormField};
use crate::pdf::{Dictionary, PdfArray, PdfDocument, PdfObject};
use crate::source::{RangedReader, WindowReader};

/// Byte coverage and 1-based revision of a signed field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct SignatureEntry {
    coverage: u64,
    revision: usize,
}

/// Result of scanning the form for signatures
#[derive(Debug, Default)]
struct SignatureIndex {
    entries: HashMap<String, SignatureEntry>,
    /// Names in revision order
    ordered: Vec<String>,
    total_revisions: usize,
}

/// Signature queries over a document
///
/// The form is scanned once, on the first query. The scan marks every
/// signature `/Contents` string as unencrypted, so it must run before those
/// strings are read. The document's byte source must not change while a
/// `SignatureUtil` is alive.
pub struct SignatureUtil<'a> {
    document: &'a mut PdfDocument,
    acro_form: Option<AcroForm>,
    translator: Option<Box<dyn FieldNameTranslator + 'a>>,
    index: Option<SignatureIndex>,
}

impl<'a> SignatureUtil<'a> {
    /// Create a signature index over `document`
    ///
    /// Fails only if the field names cannot be decoded.
    pub fn new(document: &'a mut PdfDocument) -> PDFObjectResult<Self> {
        let acro_form = AcroForm::from_document(document)?;
        Ok(Self {
            document,
            acro_form,
            translator: None,
            index: None,
        })
    }

    /// Resolve names passed to [`get_revision`](Self::get_revision) through `translator`
    pub fn with_translator(mut self, translator: impl FieldNameTranslator + 'a) -> Self {
        self.translator = Some(Box::new(translator));
        self
    }

    pub fn document(&self) -> &PdfDocument {
        &*self.document
    }

    /// Names of the signed fields, in revision order
    pub fn get_signature_names(&mut self) -> Vec<String> {
        self.index().ordered.clone()
    }

    /// Names of signature fields that are not signed
    pub fn get_blank_signature_names(&mut self) -> Vec<String> {
        self.index();
        let (Some(form), Some(index)) = (self.acro_form.as_ref(), self.index.as_ref()) else {
            return Vec::new();
        };
        form.fields()
            .filter(|field| field.is_signature() && !index.entries.contains_key(field.name()))
            .map(|field| field.name().to_string())
            .collect()
    }

    /// Number of revisions, counting unsigned content after the last signature
    pub fn get_total_revisions(&mut self) -> usize {
        self.index().total_revisions
    }

    /// 1-based revision signed by `field`, or 0 if it is not a signed field
    pub fn get_revision(&mut self, field: &str) -> usize {
        let field = self.get_translated_field_name(field);
        self.index().entries.get(&field).map_or(0, |entry| entry.revision)
    }

    /// Name `name` is known by in the form hierarchy
    pub fn get_translated_field_name(&self, name: &str) -> String {
        self.translator
            .as_ref()
            .and_then(|translator| translator.translate(name))
            .unwrap_or_else(|| name.to_string())
    }

    /// Reader over the revision signed by `field`: the first bytes of the
    /// file up to the end of its byte range
    pub fn extract_revision(&mut self, field: &str) -> PDFObjectResult<Option<WindowReader<'_>>> {
        let Some(entry) = self.index().entries.get(field).copied() else {
            return Ok(None);
        };
        let source = self.document.source().ok_or(PDFObjectError::NoByteSource)?;
        Ok(Some(WindowReader::new(source, 0, entry.coverage)))
    }

    /// Whether the signature of `name` covers the file up to its current end
    pub fn signature_covers_whole_document(&mut self, name: &str) -> PDFObjectResult<bool> {
        let Some(entry) = self.index().entries.get(name).copied() else {
            return Ok(false);
        };
        Ok(entry.coverage == self.document.file_length()?)
    }

    /// Whether `name` is a signature field, signed or blank
    pub fn does_signature_field_exist(&mut self, name: &str) -> bool {
        self.get_blank_signature_names().iter().any(|blank| blank == name)
            || self.index().entries.contains_key(name)
    }

    /// The signature dictionary under `/V` of a signed field
    pub fn get_signature_dictionary(&mut self, name: &str) -> Option<&Dictionary> {
        if !self.index().entries.contains_key(name) {
            return None;
        }
        self.acro_form
            .as_ref()?
            .get_field(name)?
            .value_dictionary(&*self.document)
    }

    /// Reader over exactly the bytes the signature of `name` covers
    pub fn signed_ranges(&mut self, name: &str) -> PDFObjectResult<Option<RangedReader<'_>>> {
        let Some(byte_range) = self
            .get_signature_dictionary(name)
            .and_then(|signature| signature.get("ByteRange").cloned())
        else {
            return Ok(None);
        };
        let ranges = match self.document.resolve(&byte_range).and_then(PdfObject::as_array) {
            Some(array) => byte_range_pairs(array)?,
            None => return Ok(None),
        };
        let source = self.document.source().ok_or(PDFObjectError::NoByteSource)?;
        Ok(Some(RangedReader::new(source, ranges)))
    }

    fn index(&mut self) -> &SignatureIndex {
        self.index
            .get_or_insert_with(|| Self::scan(&mut *self.document, self.acro_form.as_ref()))
    }

    fn scan(document: &mut PdfDocument, acro_form: Option<&AcroForm>) -> SignatureIndex {
        let Some(acro_form) = acro_form else {
            return SignatureIndex::default();
        };

        let mut sorter: Vec<(String, u64)> = Vec::new();
        for field in acro_form.fields().filter(|field| field.is_signature()) {
            if let Some(coverage) = Self::signature_coverage(document, field) {
                trace!("Signature {} covers {} bytes", field.name(), coverage);
                sorter.push((field.name().to_string(), coverage));
            }
        }
        // stable: equal coverage keeps discovery order
        sorter.sort_by_key(|(_, coverage)| *coverage);

        let mut index = SignatureIndex::default();
        if let Some(&(_, last_coverage)) = sorter.last() {
            index.total_revisions = match document.file_length() {
                Ok(length) if length == last_coverage => sorter.len(),
                Ok(_) => sorter.len() + 1,
                Err(e) => {
                    warn!("Cannot read file length, not counting a trailing revision: {}", e);
                    sorter.len()
                }
            };
        }

        for (position, (name, coverage)) in sorter.into_iter().enumerate() {
            index.entries.insert(name.clone(), SignatureEntry {
                coverage,
                revision: position + 1,
            });
            index.ordered.push(name);
        }
        debug!("Found {} signatures, {} revisions", index.ordered.len(), index.total_revisions);
        index
    }

    /// Coverage of a signed field, marking its `/Contents` unencrypted
    fn signature_coverage(document: &mut PdfDocument, field: &FormField) -> Option<u64> {
        let byte_range = {
            let value = field.value_dictionary_mut(document)?;
            value.get_string_mut("Contents")?.mark_as_unencrypted_object();
            value.get("ByteRange")?.clone()
        };

        let Some(range) = document.resolve(&byte_range).and_then(PdfObject::as_array) else {
            debug!("Signature {} has no /ByteRange array", field.name());
            return None;
        };
        let size = range.len();
        if size < 2 {
            debug!("Signature {} has a /ByteRange of {} entries", field.name(), size);
            return None;
        }
        let (Some(offset), Some(length)) = (range.get_as_number(size - 2), range.get_as_number(size - 1)) else {
            warn!("Signature {} has a non-numeric /ByteRange", field.name());
            return None;
        };
        (offset as i64)
            .checked_add(length as i64)
            .and_then(|end| u64::try_from(end).ok())
    }
}

/// `(offset, length)` pairs of a `/ByteRange`
fn byte_range_pairs(array: &PdfArray) -> PDFObjectResult<Vec<(u64, u64)>> {
    let values = array.to_long_array()?;
    values
        .chunks_exact(2)
        .map(|pair| match (u64::try_from(pair[0]), u64::try_from(pair[1])) {
            (Ok(offset), Ok(length)) => Ok((offset, length)),
            _ => Err(PDFObjectError::malformed(format!("negative /ByteRange entry {:?}", pair))),
        })
        .collect()
}
