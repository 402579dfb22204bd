//! Protocol-violation taxonomy for the HTTP/2 frame splitter.
//!
//! These are not fatal to the process: a violation aborts the offending
//! *direction* and is reported to the caller's [`super::EventSink`], the way
//! spec.md §7 requires ("the core never terminates the process").

use thiserror::Error;

/// An HTTP/2 protocol violation observed by the scanner.
///
/// Doubles as the event id recorded through [`super::EventSink`]; there is
/// no separate "error" vs. "infraction" type because every scanner error
/// *is* an infraction report to the caller's detection pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum H2FsError {
    /// A frame arrived out of the order the direction's state allows (e.g.
    /// a DATA frame with no matching half-open body, or a non-DATA frame
    /// exceeding `MAX_OCTETS`).
    #[error("frame sequence violation")]
    FrameSequence,
    /// A HEADERS (or CONTINUATION) frame lacked `END_HEADERS`, and the next
    /// frame on the connection was not a CONTINUATION.
    #[error("missing CONTINUATION frame")]
    MissingContinuation,
    /// A CONTINUATION frame arrived with no HEADERS chain open for it.
    #[error("unexpected CONTINUATION frame")]
    UnexpectedContinuation,
    /// The client connection preface did not match the fixed 24-byte
    /// prologue.
    #[error("connection preface mismatch")]
    PrefaceMatchFailure,
}

pub use H2FsError as Infraction;
