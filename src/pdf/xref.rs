//! PDF cross-reference table implementation

use std::collections::BTreeMap;

use log::trace;

use crate::error::{PDFObjectError, PDFObjectResult};
use super::tokenizer::{Token, Tokenizer};

/// Cross-reference entry of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XRefEntry {
    pub offset: u64,
    pub generation: u16,
    pub in_use: bool,
}

/// PDF cross-reference table
#[derive(Debug, Default)]
pub struct XRefTable {
    entries: BTreeMap<u32, XRefEntry>,
}

impl XRefTable {
    /// Create new xref table
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an `xref` section; the tokenizer is left just after `trailer`
    pub(crate) fn parse(tokenizer: &mut Tokenizer<'_>) -> PDFObjectResult<Self> {
        let start = tokenizer.position();
        match tokenizer.next_token()? {
            Some(Token::Keyword(k)) if k == "xref" => {}
            Some(Token::Integer(_)) => {
                return Err(PDFObjectError::UnsupportedFeature(format!(
                    "cross-reference stream at offset {}",
                    start
                )))
            }
            _ => return Err(PDFObjectError::XRefError(format!("no xref keyword at offset {}", start))),
        }

        let mut table = Self::new();
        loop {
            let first = match tokenizer.next_token()? {
                Some(Token::Keyword(k)) if k == "trailer" => break,
                Some(Token::Integer(n)) => to_u32(n, "subsection start")?,
                other => return Err(PDFObjectError::XRefError(format!("invalid subsection header {:?}", other))),
            };
            let count = match tokenizer.next_token()? {
                Some(Token::Integer(n)) => to_u32(n, "subsection count")?,
                other => return Err(PDFObjectError::XRefError(format!("invalid subsection count {:?}", other))),
            };
            trace!("Xref subsection {} {}", first, count);

            for number in first..first.saturating_add(count) {
                let entry = Self::parse_entry(tokenizer)?;
                table.entries.insert(number, entry);
            }
        }

        Ok(table)
    }

    fn parse_entry(tokenizer: &mut Tokenizer<'_>) -> PDFObjectResult<XRefEntry> {
        let offset = match tokenizer.next_token()? {
            Some(Token::Integer(n)) if n >= 0 => n as u64,
            other => return Err(PDFObjectError::XRefError(format!("invalid xref offset {:?}", other))),
        };
        let generation = match tokenizer.next_token()? {
            Some(Token::Integer(n)) => u16::try_from(n)
                .map_err(|_| PDFObjectError::XRefError(format!("invalid xref generation {}", n)))?,
            other => return Err(PDFObjectError::XRefError(format!("invalid xref generation {:?}", other))),
        };
        let in_use = match tokenizer.next_token()? {
            Some(Token::Keyword(k)) if k == "n" => true,
            Some(Token::Keyword(k)) if k == "f" => false,
            other => return Err(PDFObjectError::XRefError(format!("invalid xref entry type {:?}", other))),
        };
        Ok(XRefEntry {
            offset,
            generation,
            in_use,
        })
    }

    /// Add the entries of an older section that this table does not override
    pub fn merge_older(&mut self, older: XRefTable) {
        for (number, entry) in older.entries {
            self.entries.entry(number).or_insert(entry);
        }
    }

    pub fn get(&self, number: u32) -> Option<&XRefEntry> {
        self.entries.get(&number)
    }

    pub fn insert(&mut self, number: u32, entry: XRefEntry) {
        self.entries.insert(number, entry);
    }

    /// In-use entries in object number order
    pub fn in_use(&self) -> impl Iterator<Item = (u32, &XRefEntry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.in_use)
            .map(|(number, entry)| (*number, entry))
    }

    /// One more than the highest object number
    pub fn size(&self) -> u32 {
        self.entries.keys().next_back().map_or(1, |max| max.saturating_add(1))
    }

    /// Write the table as one `xref` section with a subsection per run of numbers
    pub fn write_to(&self, output: &mut Vec<u8>) {
        output.extend_from_slice(b"xref\n");
        let numbers: Vec<u32> = self.entries.keys().copied().collect();
        let mut idx = 0;
        while idx < numbers.len() {
            let first = numbers[idx];
            let mut run = 1;
            while idx + run < numbers.len() && numbers[idx + run] == first + run as u32 {
                run += 1;
            }
            output.extend_from_slice(format!("{} {}\n", first, run).as_bytes());
            for number in &numbers[idx..idx + run] {
                if let Some(entry) = self.entries.get(number) {
                    let kind = if entry.in_use { 'n' } else { 'f' };
                    output.extend_from_slice(format!("{:010} {:05} {} \n", entry.offset, entry.generation, kind).as_bytes());
                }
            }
            idx += run;
        }
    }
}

fn to_u32(value: i64, what: &str) -> PDFObjectResult<u32> {
    u32::try_from(value).map_err(|_| PDFObjectError::XRefError(format!("invalid {} {}", what, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(data: &[u8]) -> PDFObjectResult<XRefTable> {
        XRefTable::parse(&mut Tokenizer::new(data))
    }

    #[test]
    fn test_xref_parsing() {
        let xref_data = b"xref\n0 3\n\
                         0000000000 65535 f \n\
                         0000000012 00000 n \n\
                         0000000234 00000 n \n\
                         trailer";

        let xref = parse(xref_data).unwrap();
        assert_eq!(xref.in_use().count(), 2);
        assert_eq!(xref.get(1).map(|e| e.offset), Some(12));
        assert_eq!(xref.get(2).map(|e| e.offset), Some(234));
        assert_eq!(xref.size(), 3);
    }

    #[test]
    fn test_multiple_subsections() {
        let xref = parse(b"xref\n0 1\n0000000000 65535 f \n7 2\n0000000100 00000 n \n0000000200 00001 n \ntrailer").unwrap();
        assert_eq!(xref.get(8).map(|e| e.generation), Some(1));
        assert_eq!(xref.size(), 9);
    }

    #[test]
    fn test_invalid_xref() {
        let invalid_data = b"xref\n0 2\n\
                           invalid entry\n\
                           0000000234 00000 n \n";

        assert!(matches!(parse(invalid_data), Err(PDFObjectError::XRefError(_))));
    }

    #[test]
    fn test_xref_stream_is_unsupported() {
        assert!(matches!(
            parse(b"15 0 obj << /Type /XRef >>"),
            Err(PDFObjectError::UnsupportedFeature(_))
        ));
    }

    #[test]
    fn test_newer_entries_win() {
        let mut newer = parse(b"xref\n3 1\n0000000900 00000 n \ntrailer").unwrap();
        let older = parse(b"xref\n0 4\n0000000000 65535 f \n0000000010 00000 n \n0000000020 00000 n \n0000000030 00000 n \ntrailer").unwrap();
        newer.merge_older(older);

        assert_eq!(newer.get(3).map(|e| e.offset), Some(900));
        assert_eq!(newer.get(1).map(|e| e.offset), Some(10));
    }

    #[test]
    fn test_write_groups_runs() {
        let mut table = XRefTable::new();
        table.insert(0, XRefEntry { offset: 0, generation: 65535, in_use: false });
        table.insert(1, XRefEntry { offset: 15, generation: 0, in_use: true });
        table.insert(5, XRefEntry { offset: 99, generation: 0, in_use: true });

        let mut out = Vec::new();
        table.write_to(&mut out);
        assert_eq!(
            String::from_utf8(out.clone()).unwrap(),
            "xref\n0 2\n0000000000 65535 f \n0000000015 00000 n \n5 1\n0000000099 00000 n \n"
        );

        out.extend_from_slice(b"trailer");
        let reparsed = parse(&out).unwrap();
        assert_eq!(reparsed.get(5).map(|e| e.offset), Some(99));
    }

    #[test]
    fn test_size_saturates_at_highest_number() {
        let mut table = XRefTable::new();
        table.insert(u32::MAX, XRefEntry { offset: 10, generation: 0, in_use: true });
        assert_eq!(table.size(), u32::MAX);
    }
}
