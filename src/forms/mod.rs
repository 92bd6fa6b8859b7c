//! Interactive form field tree
//!
//! Fields are collected from `/Root /AcroForm /Fields`, descending through
//! `/Kids`. A kid without `/T` is a widget of its parent rather than a field
//! of its own.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use log::{debug, warn};

use crate::error::PDFObjectResult;
use crate::pdf::{Dictionary, IndirectReference, PdfDocument, PdfObject};

/// Field type of signature fields
pub const SIGNATURE_FIELD_TYPE: &str = "Sig";

/// Maps a field name to the name it is known by in the form hierarchy
pub trait FieldNameTranslator {
    /// The translated name, or `None` to keep `name`
    fn translate(&self, name: &str) -> Option<String>;
}

impl FieldNameTranslator for HashMap<String, String> {
    fn translate(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// A named form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormField {
    name: String,
    reference: IndirectReference,
    field_type: Option<String>,
}

impl FormField {
    /// Fully qualified name, partial names joined with `.`
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn reference(&self) -> IndirectReference {
        self.reference
    }

    /// `/FT`, inherited from the nearest ancestor that has one
    pub fn field_type(&self) -> Option<&str> {
        self.field_type.as_deref()
    }

    pub fn is_signature(&self) -> bool {
        self.field_type() == Some(SIGNATURE_FIELD_TYPE)
    }

    /// The field dictionary
    pub fn dictionary<'d>(&self, document: &'d PdfDocument) -> Option<&'d Dictionary> {
        document.get_object(self.reference).and_then(PdfObject::as_dictionary)
    }

    /// The dictionary under `/V`, following a reference
    pub fn value_dictionary<'d>(&self, document: &'d PdfDocument) -> Option<&'d Dictionary> {
        self.dictionary(document)?
            .get("V")
            .and_then(|value| document.resolve_dictionary(value))
    }

    /// Mutable access to the dictionary under `/V`
    pub fn value_dictionary_mut<'d>(&self, document: &'d mut PdfDocument) -> Option<&'d mut Dictionary> {
        let indirect = match self.dictionary(document)?.get("V")? {
            PdfObject::Reference(reference) => Some(*reference),
            PdfObject::Dictionary(_) => None,
            _ => return None,
        };
        match indirect {
            Some(reference) => document.get_object_mut(reference)?.as_dictionary_mut(),
            None => document
                .get_object_mut(self.reference)?
                .as_dictionary_mut()?
                .get_dictionary_mut("V"),
        }
    }
}

/// Form fields of a document in discovery order
#[derive(Debug, Clone, Default)]
pub struct AcroForm {
    fields: IndexMap<String, FormField>,
}

impl AcroForm {
    /// Collect the fields of `document`, or `None` when it has no form
    ///
    /// Field names are decoded as text, which may decrypt the `/T` strings.
    pub fn from_document(document: &mut PdfDocument) -> PDFObjectResult<Option<Self>> {
        let roots: Vec<PdfObject> = {
            let Some(form) = document
                .catalog()
                .and_then(|catalog| catalog.get("AcroForm"))
                .and_then(|form| document.resolve_dictionary(form))
            else {
                return Ok(None);
            };
            form.get("Fields")
                .and_then(|fields| document.resolve(fields))
                .and_then(PdfObject::as_array)
                .map(|fields| fields.iter().cloned().collect())
                .unwrap_or_default()
        };

        let mut acro_form = Self::default();
        let mut visited = HashSet::new();
        for root in &roots {
            acro_form.collect(document, root, None, None, &mut visited)?;
        }
        debug!("Form has {} fields", acro_form.fields.len());
        Ok(Some(acro_form))
    }

    fn collect(
        &mut self,
        document: &mut PdfDocument,
        node: &PdfObject,
        parent_name: Option<&str>,
        inherited_type: Option<&str>,
        visited: &mut HashSet<IndirectReference>,
    ) -> PDFObjectResult<()> {
        let PdfObject::Reference(reference) = node else {
            debug!("Skipping direct entry in field tree");
            return Ok(());
        };
        let reference = *reference;
        if !visited.insert(reference) {
            warn!("Field tree loops back to {}", reference);
            return Ok(());
        }

        let partial_name = match document.get_object_mut(reference).and_then(PdfObject::as_dictionary_mut) {
            Some(dict) => match dict.get_string_mut("T") {
                Some(title) => Some(title.to_unicode_string()?),
                None => None,
            },
            None => {
                warn!("Field {} is not a dictionary", reference);
                return Ok(());
            }
        };

        let (field_type, kids) = match document.get_object(reference).and_then(PdfObject::as_dictionary) {
            Some(dict) => {
                let field_type = dict
                    .get_name("FT")
                    .or(inherited_type)
                    .map(str::to_owned);
                let kids: Vec<PdfObject> = dict
                    .get("Kids")
                    .and_then(|kids| document.resolve(kids))
                    .and_then(PdfObject::as_array)
                    .map(|kids| kids.iter().cloned().collect())
                    .unwrap_or_default();
                (field_type, kids)
            }
            None => return Ok(()),
        };

        let name = match (parent_name, partial_name) {
            (Some(parent), Some(partial)) => format!("{}.{}", parent, partial),
            (None, Some(partial)) => partial,
            // widget annotation, or a nameless root
            (_, None) => return Ok(()),
        };

        self.fields.entry(name.clone()).or_insert_with(|| FormField {
            name: name.clone(),
            reference,
            field_type: field_type.clone(),
        });

        for kid in &kids {
            self.collect(document, kid, Some(&name), field_type.as_deref(), visited)?;
        }
        Ok(())
    }

    pub fn get_field(&self, name: &str) -> Option<&FormField> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FormField> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{PdfArray, PdfString};
    use pretty_assertions::assert_eq;
    use test_log::test;

    fn field(document: &mut PdfDocument, title: Option<&str>, field_type: Option<&str>, kids: &[IndirectReference]) -> IndirectReference {
        let mut dict = Dictionary::new();
        if let Some(title) = title {
            dict.set("T", PdfString::new(title));
        }
        if let Some(field_type) = field_type {
            dict.set("FT", PdfObject::name(field_type));
        }
        if !kids.is_empty() {
            dict.set("Kids", kids.iter().map(|kid| PdfObject::Reference(*kid)).collect::<PdfArray>());
        }
        document.add_object(dict)
    }

    fn with_form(document: &mut PdfDocument, roots: &[IndirectReference]) {
        let mut form = Dictionary::new();
        form.set("Fields", roots.iter().map(|root| PdfObject::Reference(*root)).collect::<PdfArray>());
        let mut catalog = Dictionary::new();
        catalog.set("AcroForm", form);
        let catalog = document.add_object(catalog);
        document.trailer_mut().set_reference("Root", catalog);
    }

    #[test]
    fn test_qualified_names_and_inherited_type() -> PDFObjectResult<()> {
        let mut document = PdfDocument::new();
        let widget = field(&mut document, None, None, &[]);
        let child = field(&mut document, Some("approval"), None, &[widget]);
        let parent = field(&mut document, Some("signatures"), Some("Sig"), &[child]);
        let text = field(&mut document, Some("name"), Some("Tx"), &[]);
        with_form(&mut document, &[parent, text]);

        let form = AcroForm::from_document(&mut document)?.unwrap();
        let names: Vec<&str> = form.fields().map(FormField::name).collect();
        assert_eq!(names, vec!["signatures", "signatures.approval", "name"]);

        let approval = form.get_field("signatures.approval").unwrap();
        assert!(approval.is_signature());
        assert_eq!(approval.reference(), child);
        assert!(!form.get_field("name").unwrap().is_signature());
        Ok(())
    }

    #[test]
    fn test_utf16_field_names() -> PDFObjectResult<()> {
        let mut document = PdfDocument::new();
        let mut dict = Dictionary::new();
        dict.set("T", PdfString::from_bytes(&[0xFE, 0xFF, 0x00, 0xC5, 0x00, 0x73]));
        let root = document.add_object(dict);
        with_form(&mut document, &[root]);

        let form = AcroForm::from_document(&mut document)?.unwrap();
        assert!(form.get_field("\u{C5}s").is_some());
        Ok(())
    }

    #[test]
    fn test_no_form() -> PDFObjectResult<()> {
        let mut document = PdfDocument::new();
        assert!(AcroForm::from_document(&mut document)?.is_none());
        Ok(())
    }

    #[test]
    fn test_kid_cycles_are_cut() -> PDFObjectResult<()> {
        let mut document = PdfDocument::new();
        let root = document.reserve_reference();
        let child = field(&mut document, Some("child"), None, &[root]);
        let mut dict = Dictionary::new();
        dict.set("T", PdfString::new("root"));
        dict.set("Kids", PdfArray::from_items(vec![PdfObject::Reference(child)]));
        document.set_object(root, dict);
        with_form(&mut document, &[root]);

        let form = AcroForm::from_document(&mut document)?.unwrap();
        assert_eq!(form.len(), 2);
        Ok(())
    }

    #[test]
    fn test_value_dictionary_direct_and_indirect() {
        let mut document = PdfDocument::new();
        let mut signature = Dictionary::new();
        signature.set("Type", PdfObject::name("Sig"));
        let signature_ref = document.add_object(signature.clone());

        let mut indirect = Dictionary::new();
        indirect.set_reference("V", signature_ref);
        let indirect = FormField { name: "a".into(), reference: document.add_object(indirect), field_type: None };

        let mut direct = Dictionary::new();
        direct.set("V", signature);
        let direct = FormField { name: "b".into(), reference: document.add_object(direct), field_type: None };

        for field in [&indirect, &direct] {
            assert_eq!(field.value_dictionary(&document).and_then(|v| v.get_name("Type")), Some("Sig"));
            field.value_dictionary_mut(&mut document).unwrap().set("M", true);
        }
        assert!(document
            .get_object(signature_ref)
            .and_then(PdfObject::as_dictionary)
            .unwrap()
            .contains_key("M"));
    }

    #[test]
    fn test_map_translator() {
        let mut aliases = HashMap::new();
        aliases.insert("form1[0].sig[0]".to_string(), "sig".to_string());
        assert_eq!(aliases.translate("form1[0].sig[0]"), Some("sig".to_string()));
        assert_eq!(aliases.translate("other"), None);
    }
}
