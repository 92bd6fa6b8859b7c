//! PDF array implementation

use crate::error::{PDFObjectError, PDFObjectResult};
use super::object::{ObjectHeader, ObjectType, PdfObject, PrimitiveObject};
use super::{Dictionary, PdfDocument, PdfString};

/// PDF array object
#[derive(Debug, Clone, Default)]
pub struct PdfArray {
    header: ObjectHeader,
    items: Vec<PdfObject>,
}

impl PdfArray {
    /// Create new array
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<PdfObject>) -> Self {
        Self {
            header: ObjectHeader::default(),
            items,
        }
    }

    /// Array of numbers
    pub fn from_numbers<I: IntoIterator<Item = i64>>(numbers: I) -> Self {
        Self::from_items(numbers.into_iter().map(PdfObject::from).collect())
    }

    pub fn push(&mut self, value: impl Into<PdfObject>) {
        self.items.push(value.into());
        self.set_modified();
    }

    pub fn get(&self, index: usize) -> Option<&PdfObject> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut PdfObject> {
        self.items.get_mut(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PdfObject> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, PdfObject> {
        self.items.iter_mut()
    }

    /// Get number at index
    pub fn get_as_number(&self, index: usize) -> Option<f64> {
        self.get(index).and_then(PdfObject::as_number)
    }

    pub fn get_as_string(&self, index: usize) -> Option<&PdfString> {
        self.get(index).and_then(PdfObject::as_string)
    }

    pub fn get_as_dictionary(&self, index: usize) -> Option<&Dictionary> {
        self.get(index).and_then(PdfObject::as_dictionary)
    }

    /// Convert every element to an integer
    ///
    /// Fails on the first element that is not a number.
    pub fn to_long_array(&self) -> PDFObjectResult<Vec<i64>> {
        self.items
            .iter()
            .map(|item| {
                item.as_integer().ok_or(PDFObjectError::InvalidObjectType {
                    expected: ObjectType::Number.name(),
                    found: item.object_type().name(),
                })
            })
            .collect()
    }
}

impl PrimitiveObject for PdfArray {
    fn object_type(&self) -> ObjectType {
        ObjectType::Array
    }

    fn header(&self) -> &ObjectHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ObjectHeader {
        &mut self.header
    }

    fn copy_content(&self, from: &PdfDocument, to: &mut PdfDocument) -> PDFObjectResult<Self> {
        let items = self
            .items
            .iter()
            .map(|item| item.copy_value(from, to))
            .collect::<PDFObjectResult<Vec<_>>>()?;
        Ok(Self::from_items(items))
    }
}

impl FromIterator<PdfObject> for PdfArray {
    fn from_iter<T: IntoIterator<Item = PdfObject>>(iter: T) -> Self {
        Self::from_items(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PdfArray {
    type Item = &'a PdfObject;
    type IntoIter = std::slice::Iter<'a, PdfObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
