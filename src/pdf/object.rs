//! PDF object types and the primitive-object capability

use std::fmt;

use crate::error::{PDFObjectError, PDFObjectResult};
use super::{Dictionary, PdfArray, PdfDocument, PdfString};

/// PDF object types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Array,
    Boolean,
    Dictionary,
    Name,
    Null,
    Number,
    Reference,
    String,
}

impl ObjectType {
    pub fn name(&self) -> &'static str {
        match self {
            ObjectType::Array => "array",
            ObjectType::Boolean => "boolean",
            ObjectType::Dictionary => "dictionary",
            ObjectType::Name => "name",
            ObjectType::Null => "null",
            ObjectType::Number => "number",
            ObjectType::Reference => "reference",
            ObjectType::String => "string",
        }
    }
}

/// Object number and generation of an indirect object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IndirectReference {
    pub number: u32,
    pub generation: u16,
}

impl IndirectReference {
    pub fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }
}

impl fmt::Display for IndirectReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// Object state flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectFlags(u8);

impl ObjectFlags {
    /// No flags
    pub const NONE: u8 = 0;
    /// Content changed since the object was read
    pub const MODIFIED: u8 = 1 << 0;
    /// Never encrypted nor decrypted, whatever the document does
    pub const UNENCRYPTED: u8 = 1 << 1;

    /// Create new flags from raw bits
    pub fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// Get raw flag bits
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Check if specific flag is set
    pub fn contains(&self, flag: u8) -> bool {
        (self.0 & flag) == flag
    }

    pub fn insert(&mut self, flag: u8) {
        self.0 |= flag;
    }

    pub fn remove(&mut self, flag: u8) {
        self.0 &= !flag;
    }
}

/// Indirection and state shared by every container-like object
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectHeader {
    pub(crate) reference: Option<IndirectReference>,
    pub(crate) flags: ObjectFlags,
}

/// Capability surface common to all primitive objects
pub trait PrimitiveObject: Sized {
    fn object_type(&self) -> ObjectType;

    fn header(&self) -> &ObjectHeader;

    fn header_mut(&mut self) -> &mut ObjectHeader;

    /// Duplicate this object's content for `to`; nested references are
    /// resolved through `from`
    fn copy_content(&self, from: &PdfDocument, to: &mut PdfDocument) -> PDFObjectResult<Self>;

    fn indirect_reference(&self) -> Option<IndirectReference> {
        self.header().reference
    }

    fn is_indirect(&self) -> bool {
        self.header().reference.is_some()
    }

    fn flags(&self) -> ObjectFlags {
        self.header().flags
    }

    fn is_modified(&self) -> bool {
        self.header().flags.contains(ObjectFlags::MODIFIED)
    }

    fn set_modified(&mut self) {
        self.header_mut().flags.insert(ObjectFlags::MODIFIED);
    }

    /// Register the object in `document` under a fresh reference
    fn make_indirect(self, document: &mut PdfDocument) -> IndirectReference
    where
        Self: Into<PdfObject>,
    {
        document.add_object(self)
    }

    /// Copy the object into `to`
    ///
    /// A direct object comes back as its copy. An indirect object is
    /// registered in `to` under a new reference, which is returned.
    fn copy_to(&self, from: &PdfDocument, to: &mut PdfDocument) -> PDFObjectResult<PdfObject>
    where
        Self: Into<PdfObject>,
    {
        let mut copy = self.copy_content(from, to)?;
        copy.header_mut().reference = None;
        if self.is_indirect() {
            Ok(PdfObject::Reference(to.add_object(copy)))
        } else {
            Ok(copy.into())
        }
    }
}

/// Any PDF value
#[derive(Debug, Clone)]
pub enum PdfObject {
    Null,
    Boolean(bool),
    Number(f64),
    Name(String),
    String(PdfString),
    Array(PdfArray),
    Dictionary(Dictionary),
    Reference(IndirectReference),
}

impl PdfObject {
    pub fn object_type(&self) -> ObjectType {
        match self {
            PdfObject::Null => ObjectType::Null,
            PdfObject::Boolean(_) => ObjectType::Boolean,
            PdfObject::Number(_) => ObjectType::Number,
            PdfObject::Name(_) => ObjectType::Name,
            PdfObject::String(_) => ObjectType::String,
            PdfObject::Array(_) => ObjectType::Array,
            PdfObject::Dictionary(_) => ObjectType::Dictionary,
            PdfObject::Reference(_) => ObjectType::Reference,
        }
    }

    pub fn name(value: impl Into<String>) -> Self {
        PdfObject::Name(value.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PdfObject::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        self.as_number().map(|n| n as i64)
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            PdfObject::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&PdfString> {
        match self {
            PdfObject::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_string_mut(&mut self) -> Option<&mut PdfString> {
        match self {
            PdfObject::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&PdfArray> {
        match self {
            PdfObject::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Dictionary> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_dictionary_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<IndirectReference> {
        match self {
            PdfObject::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Typed access failing with the expected and found type names
    pub fn expect_dictionary(&self) -> PDFObjectResult<&Dictionary> {
        self.as_dictionary().ok_or(PDFObjectError::InvalidObjectType {
            expected: ObjectType::Dictionary.name(),
            found: self.object_type().name(),
        })
    }

    /// Reference of the indirect object this value lives in, if known
    pub fn indirect_reference(&self) -> Option<IndirectReference> {
        match self {
            PdfObject::String(s) => s.indirect_reference(),
            PdfObject::Array(a) => a.indirect_reference(),
            PdfObject::Dictionary(d) => d.indirect_reference(),
            _ => None,
        }
    }

    pub(crate) fn set_indirect_reference(&mut self, reference: Option<IndirectReference>) {
        match self {
            PdfObject::String(s) => s.header_mut().reference = reference,
            PdfObject::Array(a) => a.header_mut().reference = reference,
            PdfObject::Dictionary(d) => d.header_mut().reference = reference,
            _ => {}
        }
    }

    /// Copy a value that sits inside another object
    ///
    /// References are followed through `from` and each referenced object is
    /// copied into `to` once; later encounters reuse the first copy.
    pub fn copy_value(&self, from: &PdfDocument, to: &mut PdfDocument) -> PDFObjectResult<PdfObject> {
        match self {
            PdfObject::Reference(reference) => {
                if let Some(copied) = to.copied_reference(from.id(), *reference) {
                    return Ok(PdfObject::Reference(copied));
                }
                // reserve first so cycles resolve to the same target
                let target = to.reserve_reference();
                to.record_copy(from.id(), *reference, target);
                let copy = match from.get_object(*reference) {
                    Some(object) => object.copy_direct(from, to)?,
                    None => PdfObject::Null,
                };
                to.set_object(target, copy);
                Ok(PdfObject::Reference(target))
            }
            other => other.copy_direct(from, to),
        }
    }

    fn copy_direct(&self, from: &PdfDocument, to: &mut PdfDocument) -> PDFObjectResult<PdfObject> {
        Ok(match self {
            PdfObject::String(s) => PdfObject::String(s.copy_content(from, to)?),
            PdfObject::Array(a) => PdfObject::Array(a.copy_content(from, to)?),
            PdfObject::Dictionary(d) => PdfObject::Dictionary(d.copy_content(from, to)?),
            other => other.clone(),
        })
    }
}

impl From<PdfString> for PdfObject {
    fn from(value: PdfString) -> Self {
        PdfObject::String(value)
    }
}

impl From<PdfArray> for PdfObject {
    fn from(value: PdfArray) -> Self {
        PdfObject::Array(value)
    }
}

impl From<Dictionary> for PdfObject {
    fn from(value: Dictionary) -> Self {
        PdfObject::Dictionary(value)
    }
}

impl From<IndirectReference> for PdfObject {
    fn from(value: IndirectReference) -> Self {
        PdfObject::Reference(value)
    }
}

impl From<bool> for PdfObject {
    fn from(value: bool) -> Self {
        PdfObject::Boolean(value)
    }
}

impl From<f64> for PdfObject {
    fn from(value: f64) -> Self {
        PdfObject::Number(value)
    }
}

impl From<i64> for PdfObject {
    fn from(value: i64) -> Self {
        PdfObject::Number(value as f64)
    }
}

impl fmt::Display for PdfObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfObject::Null => f.write_str("null"),
            PdfObject::Boolean(b) => write!(f, "{}", b),
            PdfObject::Number(n) => write!(f, "{}", n),
            PdfObject::Name(n) => write!(f, "/{}", n),
            PdfObject::String(s) => write!(f, "{}", s),
            PdfObject::Array(a) => {
                f.write_str("[")?;
                for (i, item) in a.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            PdfObject::Dictionary(d) => {
                f.write_str("<<")?;
                for (key, value) in d.iter() {
                    write!(f, "/{} {} ", key, value)?;
                }
                f.write_str(">>")
            }
            PdfObject::Reference(r) => write!(f, "{}", r),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn test_flags() {
        let mut flags = ObjectFlags::default();
        assert!(!flags.contains(ObjectFlags::UNENCRYPTED));

        flags.insert(ObjectFlags::UNENCRYPTED);
        flags.insert(ObjectFlags::MODIFIED);
        assert!(flags.contains(ObjectFlags::UNENCRYPTED | ObjectFlags::MODIFIED));

        flags.remove(ObjectFlags::MODIFIED);
        assert_eq!(flags.bits(), ObjectFlags::UNENCRYPTED);
    }

    #[test]
    fn test_reference_display() {
        assert_eq!(IndirectReference::new(12, 0).to_string(), "12 0 R");
    }

    #[test]
    fn test_typed_access() {
        let obj = PdfObject::from(42i64);
        assert_eq!(obj.object_type(), ObjectType::Number);
        assert_eq!(obj.as_integer(), Some(42));
        assert!(obj.as_name().is_none());

        let err = obj.expect_dictionary().unwrap_err();
        assert!(matches!(
            err,
            PDFObjectError::InvalidObjectType { expected: "dictionary", found: "number" }
        ));
    }

    #[test]
    fn test_make_indirect_assigns_reference() {
        let mut doc = PdfDocument::new();
        let reference = PdfString::new("indirect").make_indirect(&mut doc);

        let stored = doc.get_object(reference).unwrap();
        assert_eq!(stored.indirect_reference(), Some(reference));
        assert_eq!(stored.object_type(), ObjectType::String);
    }

    #[test]
    fn test_copy_direct_and_indirect() -> PDFObjectResult<()> {
        let mut source = PdfDocument::new();
        let mut target = PdfDocument::new();

        let direct = PdfString::new("direct");
        let copied = direct.copy_to(&source, &mut target)?;
        assert!(matches!(copied, PdfObject::String(_)));

        let reference = PdfString::new("shared").make_indirect(&mut source);
        let indirect = source.get_object(reference).and_then(PdfObject::as_string).cloned().unwrap();
        let copied = indirect.copy_to(&source, &mut target)?;
        let new_ref = copied.as_reference().unwrap();
        let mut stored = target.get_object(new_ref).and_then(PdfObject::as_string).cloned().unwrap();
        assert_eq!(stored.get_value()?, "shared");
        assert_eq!(stored.indirect_reference(), Some(new_ref));
        Ok(())
    }

    #[test]
    fn test_copy_value_reuses_nested_references() -> PDFObjectResult<()> {
        let mut source = PdfDocument::new();
        let mut target = PdfDocument::new();
        let shared = PdfString::new("shared").make_indirect(&mut source);

        let mut array = PdfArray::new();
        array.push(PdfObject::Reference(shared));
        array.push(PdfObject::Reference(shared));

        let copy = PdfObject::Array(array).copy_value(&source, &mut target)?;
        let copy = copy.as_array().unwrap();
        assert_eq!(copy.get(0).and_then(PdfObject::as_reference), copy.get(1).and_then(PdfObject::as_reference));
        assert_eq!(target.object_count(), 1);
        Ok(())
    }

    #[test]
    fn test_copy_value_handles_cycles() -> PDFObjectResult<()> {
        let mut source = PdfDocument::new();
        let mut target = PdfDocument::new();

        let reference = source.reserve_reference();
        let mut dict = Dictionary::new();
        dict.set("Self", PdfObject::Reference(reference));
        source.set_object(reference, PdfObject::Dictionary(dict));

        let copy = PdfObject::Reference(reference).copy_value(&source, &mut target)?;
        let target_ref = copy.as_reference().unwrap();
        let copied = target.get_object(target_ref).and_then(PdfObject::as_dictionary).unwrap();
        assert_eq!(copied.get_reference("Self"), Some(target_ref));
        Ok(())
    }
}
