//! Document context: object table, trailer, byte source and encryption engine

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use log::trace;

use crate::crypto::SharedEngine;
use crate::error::{PDFObjectError, PDFObjectResult};
use crate::source::RandomAccessSource;
use super::object::{IndirectReference, PdfObject};
use super::Dictionary;

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Longest chain of references followed by [`PdfDocument::resolve`]
const MAX_RESOLVE_DEPTH: usize = 32;

/// PDF document
pub struct PdfDocument {
    id: u64,
    version: String,
    objects: BTreeMap<IndirectReference, PdfObject>,
    next_number: u32,
    trailer: Dictionary,
    source: Option<Box<dyn RandomAccessSource>>,
    encryption: Option<SharedEngine>,
    /// Objects copied in from other documents, keyed by source document id
    copied: HashMap<(u64, IndirectReference), IndirectReference>,
}

impl PdfDocument {
    /// Create new empty document
    pub fn new() -> Self {
        Self {
            id: NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed),
            version: "1.7".to_string(),
            objects: BTreeMap::new(),
            next_number: 1,
            trailer: Dictionary::new(),
            source: None,
            encryption: None,
            copied: HashMap::new(),
        }
    }

    /// Process-unique document id
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    /// Register an object under a fresh reference
    pub fn add_object(&mut self, object: impl Into<PdfObject>) -> IndirectReference {
        let reference = self.reserve_reference();
        self.set_object(reference, object);
        reference
    }

    /// Allocate a reference without an object behind it yet
    pub fn reserve_reference(&mut self) -> IndirectReference {
        let reference = IndirectReference::new(self.next_number, 0);
        self.next_number = self.next_number.saturating_add(1);
        reference
    }

    /// Store an object under `reference`, replacing any previous one
    pub fn set_object(&mut self, reference: IndirectReference, object: impl Into<PdfObject>) {
        let mut object = object.into();
        object.set_indirect_reference(Some(reference));
        if reference.number >= self.next_number {
            self.next_number = reference.number.saturating_add(1);
        }
        trace!("Storing object {}", reference);
        self.objects.insert(reference, object);
    }

    pub fn get_object(&self, reference: IndirectReference) -> Option<&PdfObject> {
        self.objects.get(&reference)
    }

    pub fn get_object_mut(&mut self, reference: IndirectReference) -> Option<&mut PdfObject> {
        self.objects.get_mut(&reference)
    }

    pub fn remove_object(&mut self, reference: IndirectReference) -> Option<PdfObject> {
        self.objects.remove(&reference)
    }

    /// Follow references until a direct object
    ///
    /// Dangling references resolve to `None`.
    pub fn resolve<'a>(&'a self, object: &'a PdfObject) -> Option<&'a PdfObject> {
        let mut current = object;
        for _ in 0..MAX_RESOLVE_DEPTH {
            match current {
                PdfObject::Reference(reference) => current = self.objects.get(reference)?,
                direct => return Some(direct),
            }
        }
        None
    }

    /// Resolve `object` to a dictionary
    pub fn resolve_dictionary<'a>(&'a self, object: &'a PdfObject) -> Option<&'a Dictionary> {
        self.resolve(object).and_then(PdfObject::as_dictionary)
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Objects in ascending reference order
    pub fn objects(&self) -> impl Iterator<Item = (IndirectReference, &PdfObject)> {
        self.objects.iter().map(|(reference, object)| (*reference, object))
    }

    pub(crate) fn objects_mut(&mut self) -> impl Iterator<Item = (IndirectReference, &mut PdfObject)> {
        self.objects.iter_mut().map(|(reference, object)| (*reference, object))
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn trailer_mut(&mut self) -> &mut Dictionary {
        &mut self.trailer
    }

    pub(crate) fn set_trailer(&mut self, trailer: Dictionary) {
        self.trailer = trailer;
    }

    /// Document catalog, as referenced by the trailer's `/Root`
    pub fn catalog(&self) -> Option<&Dictionary> {
        self.trailer.get("Root").and_then(|root| self.resolve_dictionary(root))
    }

    pub fn source(&self) -> Option<&dyn RandomAccessSource> {
        self.source.as_deref()
    }

    pub fn set_source(&mut self, source: Box<dyn RandomAccessSource>) {
        self.source = Some(source);
    }

    /// Length of the underlying byte source
    pub fn file_length(&self) -> PDFObjectResult<u64> {
        let source = self.source().ok_or(PDFObjectError::NoByteSource)?;
        Ok(source.length()?)
    }

    pub fn encryption(&self) -> Option<&SharedEngine> {
        self.encryption.as_ref()
    }

    /// Set the engine strings are encrypted with when written
    pub fn set_encryption(&mut self, engine: Option<SharedEngine>) {
        self.encryption = engine;
    }

    pub(crate) fn copied_reference(&self, source_document: u64, reference: IndirectReference) -> Option<IndirectReference> {
        self.copied.get(&(source_document, reference)).copied()
    }

    pub(crate) fn record_copy(&mut self, source_document: u64, reference: IndirectReference, target: IndirectReference) {
        self.copied.insert((source_document, reference), target);
    }
}

impl Default for PdfDocument {
    fn default() -> Self {
        Self::new()
    }
}
