//! PDF grammar violations. None of these abort the process: they halt
//! tokenisation of the current stream and are returned to the immediate
//! caller (spec.md §7).

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PdfTokError {
    /// A `stream` keyword was reached with no `/Length` recorded for the
    /// enclosing dictionary.
    #[error("stream object has no /Length")]
    StreamNoLength,
    /// `[`/`]` nesting at dictionary close didn't match the nesting level
    /// recorded when the dictionary opened.
    #[error("array left open across dictionary boundary")]
    IncompleteArrayInDictionary,
    /// A dictionary key position held something other than a `/Name`.
    #[error("dictionary key is not a name")]
    NotNameInDictionaryKey,
    /// A UTF-16BE low surrogate was missing or out of range.
    #[error("unexpected symbol in UTF-16BE sequence")]
    UnexpectedSymbol,
    /// The start-condition stack exceeded its fixed bound.
    #[error("lexer start-condition stack overflow")]
    ConditionStackOverflow,
}

/// Result of driving the lexer to the end of the currently available
/// input. `Eos` is a normal outcome, not an error (spec.md §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerOutcome {
    /// More bytes are needed before further progress can be made.
    NeedMore,
    /// The input stream ended cleanly.
    Eos,
}
