//! PDF object model, reader and writer

pub mod codec;
pub mod encoding;
mod object;
mod array;
mod dict;
mod string;
mod document;
mod tokenizer;
mod xref;
mod parser;
mod writer;

pub use object::{IndirectReference, ObjectFlags, ObjectHeader, ObjectType, PdfObject, PrimitiveObject};
pub use array::PdfArray;
pub use dict::Dictionary;
pub use string::PdfString;
pub use document::PdfDocument;
pub use encoding::TextEncoding;
pub use parser::{PdfReader, ReaderProperties};
pub use xref::{XRefEntry, XRefTable};
