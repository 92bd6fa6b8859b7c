//! Digital signature inspection
//!
//! A signed field's `/V` dictionary carries a `/ByteRange` of
//! `(offset, length)` pairs. The end of the last pair is the length of the
//! revision the signature covers; sorting signatures by that coverage gives
//! their revision numbers.

mod util;

pub use util::SignatureUtil;
