//! PDFTok — incremental PDF tokenizer for JavaScript extraction.
//!
//! Finds `/JS`-referenced indirect objects (literal strings, hex
//! strings, or streams) inside a byte-exact, chunked PDF body and
//! forwards their decoded content — UTF-16BE re-encoded to UTF-8 where a
//! BOM says so — to a caller-supplied [`JsSink`] (spec.md §4.3–§4.4).
//!
//! Everything else in the document (non-`/JS` objects, xref tables,
//! trailers) is skipped without being fully parsed; PDFTok only tracks
//! enough dictionary and array nesting to know where a `/JS` stream or
//! string begins and ends.

pub mod error;
pub mod lexer;
pub mod semantic;
pub mod utf16;

pub use error::{LexerOutcome, PdfTokError};
pub use lexer::{JsSink, Lexer, NullJsSink, MAX_CONDITION_STACK};
pub use semantic::{ObjId, Semantic};
