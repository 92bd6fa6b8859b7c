//! PDF dictionary implementation

use indexmap::IndexMap;

use crate::error::PDFObjectResult;
use super::object::{IndirectReference, ObjectHeader, ObjectType, PdfObject, PrimitiveObject};
use super::{PdfArray, PdfDocument, PdfString};

/// PDF dictionary object; keys keep their insertion order
#[derive(Debug, Clone, Default)]
pub struct Dictionary {
    header: ObjectHeader,
    entries: IndexMap<String, PdfObject>,
}

impl Dictionary {
    /// Create new dictionary
    pub fn new() -> Self {
        Self::default()
    }

    /// Get value by key
    pub fn get(&self, key: &str) -> Option<&PdfObject> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut PdfObject> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Get number value
    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PdfObject::as_number)
    }

    /// Get integer value
    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(PdfObject::as_integer)
    }

    /// Get name value
    pub fn get_name(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PdfObject::as_name)
    }

    /// Get string value
    pub fn get_string(&self, key: &str) -> Option<&PdfString> {
        self.get(key).and_then(PdfObject::as_string)
    }

    pub fn get_string_mut(&mut self, key: &str) -> Option<&mut PdfString> {
        self.get_mut(key).and_then(PdfObject::as_string_mut)
    }

    pub fn get_array(&self, key: &str) -> Option<&PdfArray> {
        self.get(key).and_then(PdfObject::as_array)
    }

    pub fn get_dictionary(&self, key: &str) -> Option<&Dictionary> {
        self.get(key).and_then(PdfObject::as_dictionary)
    }

    pub fn get_dictionary_mut(&mut self, key: &str) -> Option<&mut Dictionary> {
        self.get_mut(key).and_then(PdfObject::as_dictionary_mut)
    }

    /// Get reference value
    pub fn get_reference(&self, key: &str) -> Option<IndirectReference> {
        self.get(key).and_then(PdfObject::as_reference)
    }

    /// Set value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<PdfObject>) {
        self.entries.insert(key.into(), value.into());
        self.set_modified();
    }

    /// Set reference value
    pub fn set_reference(&mut self, key: impl Into<String>, reference: IndirectReference) {
        self.set(key, PdfObject::Reference(reference));
    }

    pub fn remove(&mut self, key: &str) -> Option<PdfObject> {
        let removed = self.entries.shift_remove(key);
        if removed.is_some() {
            self.set_modified();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, PdfObject> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, String, PdfObject> {
        self.entries.iter_mut()
    }
}

impl PrimitiveObject for Dictionary {
    fn object_type(&self) -> ObjectType {
        ObjectType::Dictionary
    }

    fn header(&self) -> &ObjectHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ObjectHeader {
        &mut self.header
    }

    fn copy_content(&self, from: &PdfDocument, to: &mut PdfDocument) -> PDFObjectResult<Self> {
        let mut entries = IndexMap::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            entries.insert(key.clone(), value.copy_value(from, to)?);
        }
        Ok(Self {
            header: ObjectHeader::default(),
            entries,
        })
    }
}

impl FromIterator<(String, PdfObject)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (String, PdfObject)>>(iter: T) -> Self {
        Self {
            header: ObjectHeader::default(),
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_typed_getters() {
        let mut dict = Dictionary::new();
        dict.set("Type", PdfObject::name("Sig"));
        dict.set("Length", 12i64);
        dict.set("Contents", PdfString::from_raw(b"00ff".to_vec(), true));
        dict.set("ByteRange", PdfArray::from_numbers([0, 10, 20, 30]));
        dict.set_reference("Parent", IndirectReference::new(4, 0));

        assert_eq!(dict.get_name("Type"), Some("Sig"));
        assert_eq!(dict.get_integer("Length"), Some(12));
        assert!(dict.get_string("Contents").unwrap().is_hex_writing());
        assert_eq!(dict.get_array("ByteRange").map(PdfArray::len), Some(4));
        assert_eq!(dict.get_reference("Parent"), Some(IndirectReference::new(4, 0)));

        // wrong type reads as absent
        assert_eq!(dict.get_name("Length"), None);
    }

    #[test]
    fn test_insertion_order_is_kept() {
        let mut dict = Dictionary::new();
        for key in ["Z", "A", "M"] {
            dict.set(key, PdfObject::Null);
        }
        dict.remove("A");
        assert_eq!(dict.keys().collect::<Vec<_>>(), vec!["Z", "M"]);
    }

    #[test]
    fn test_nested_dictionary() {
        let mut nested = Dictionary::new();
        nested.set("Key2", 123i64);
        let mut dict = Dictionary::new();
        dict.set("Nested", nested);

        dict.get_dictionary_mut("Nested").unwrap().set("Key3", true);
        let nested = dict.get_dictionary("Nested").unwrap();
        assert_eq!(nested.get_integer("Key2"), Some(123));
        assert_eq!(nested.len(), 2);
    }
}
