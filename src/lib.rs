//! h2fs-pdftok: byte-exact streaming parsers for a network intrusion
//! detection engine's HTTP/2 and PDF coverage.
//!
//! This crate provides two independent, sans-I/O parsing components:
//!
//! - [`h2fs`] — an HTTP/2 frame splitter and reassembler. Watches a
//!   directional TCP byte stream and decides when a complete logical
//!   unit (connection preface, DATA segment, HEADERS+CONTINUATION
//!   chain, or any other control frame) is ready to flush, without ever
//!   requiring the caller to buffer whole frames itself.
//! - [`pdftok`] — an incremental PDF tokenizer that finds `/JS`
//!   indirect-object references and extracts their JavaScript content
//!   (literal strings, hex strings, streams), re-encoding UTF-16BE to
//!   UTF-8 where a byte-order mark says so.
//!
//! # Quick Start
//!
//! ```rust
//! use h2fs_pdftok::h2fs::{Direction, NullEventSink, PassthroughDataCutter, Scanner, Status};
//!
//! let mut scanner = Scanner::new(Direction::ClientToServer);
//! let mut sink = NullEventSink;
//! let mut cutter = PassthroughDataCutter;
//! let mut flush_offset = 0usize;
//!
//! let preface = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";
//! let status = scanner.scan(preface, &mut flush_offset, &mut sink, &mut cutter);
//! assert_eq!(status, Status::Flush);
//! assert_eq!(flush_offset, preface.len());
//! ```
//!
//! # Design
//!
//! Both components are sans-I/O: they never perform network or file
//! I/O themselves, operate on byte slices the caller owns, and report
//! progress through small enums (`Status`, `LexerOutcome`) rather than
//! callbacks into a runtime. Neither component allocates growable
//! buffers internally except where the data genuinely must be retained
//! across calls (reassembled frame buffers, decoded JavaScript source).
//!
//! Logging uses [`tracing`]; this crate never installs a subscriber —
//! that's left to the binary embedding it.
//!
//! # Non-goals
//!
//! - HPACK header decompression.
//! - HTTP/2 flow-control window accounting.
//! - PDF cross-reference table parsing, object streams, or rendering.
//!
//! Callers needing those should layer them on top via the `DataCutter`
//! and `JsSink` collaborator traits.

pub mod byte_cursor;
pub mod h2fs;
pub mod pdftok;

pub use byte_cursor::ByteCursor;
