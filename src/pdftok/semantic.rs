//! PDF semantic state: dictionary context, the `/JS` cross-reference set,
//! the current stream length, and the UTF-16 decode automaton (spec.md
//! §3, §4.4).

use std::collections::HashSet;

use super::error::PdfTokError;
use super::utf16::Utf16Accumulator;

/// Bound on how much of a dictionary key is retained — the lexer only
/// ever needs to compare keys against the handful of literal names it
/// cares about (`/JS`, `/Length`), so longer keys are simply truncated,
/// the way spec.md §3 calls for ("bounded, truncated").
pub const MAX_KEY_LEN: usize = 32;

/// Bound on how many distinct `/JS` references a single document can
/// register — bounded memory (spec.md §1) against an adversarial PDF
/// declaring an unbounded number of `/JS` keys. Once reached, further
/// references are silently not tracked (their targets are treated as
/// non-JS, not as a parse error).
pub const MAX_JS_REFS: usize = 4096;

/// An indirect-object id: object number + generation number.
pub type ObjId = (u32, u16);

#[derive(Debug, Default)]
pub struct ObjDictionary {
    /// `obj_array.nesting_level` recorded when this dictionary opened.
    pub array_level: u32,
    /// Next token is a key (`false`) or a value (`true`).
    pub key_value: bool,
}

#[derive(Debug, Default)]
pub struct ObjEntry {
    pub key: [u8; MAX_KEY_LEN],
    pub key_len: usize,
}

impl ObjEntry {
    pub fn key(&self) -> &[u8] {
        &self.key[..self.key_len]
    }

    pub fn set_key(&mut self, name: &[u8]) {
        let n = name.len().min(MAX_KEY_LEN);
        self.key[..n].copy_from_slice(&name[..n]);
        self.key_len = n;
    }

    pub fn key_is(&self, literal: &[u8]) -> bool {
        self.key() == literal
    }
}

#[derive(Debug, Default)]
pub struct ObjArray {
    /// Current `[` depth, shared across all dictionaries on the
    /// start-condition stack.
    pub nesting_level: u32,
}

#[derive(Debug)]
pub struct ObjStream {
    /// Bytes remaining in an open stream; `-1` means unknown (no
    /// `/Length` seen yet).
    pub rem_length: i64,
    /// True when the enclosing indirect object's id was referenced by a
    /// `/JS` key somewhere in the document.
    pub is_js: bool,
}

impl Default for ObjStream {
    fn default() -> Self {
        Self { rem_length: -1, is_js: false }
    }
}

/// Holds everything the lexer needs beyond pure syntax: dictionary
/// bookkeeping, the `/JS` reference set, and the UTF-16 accumulator.
#[derive(Debug, Default)]
pub struct Semantic {
    pub obj_dictionary: ObjDictionary,
    pub obj_entry: ObjEntry,
    pub obj_array: ObjArray,
    pub obj_stream: ObjStream,
    pub js_refs: HashSet<ObjId>,
    pub u16_state: Utf16Accumulator,
}

impl Semantic {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called when `IndObj` opens with id `(num, gen)`: §4.3 point 2.
    pub fn open_indirect_object(&mut self, num: u32, gen: u16) {
        self.obj_stream = ObjStream { rem_length: -1, is_js: self.js_refs.contains(&(num, gen)) };
    }

    /// Called when `DictNr` records `/JS` as a key and then sees a
    /// reference `int int R` as its value: §4.3 point 1.
    pub fn record_js_ref(&mut self, id: ObjId) {
        if self.js_refs.len() < MAX_JS_REFS {
            self.js_refs.insert(id);
        }
    }

    /// A non-name token appeared where a dictionary key was expected
    /// (`h_dict_other`), or a name token appeared in either position
    /// (`h_dict_name`). Both parity-flip `key_value`.
    pub fn h_dict_other(&mut self) -> Result<(), PdfTokError> {
        if !self.obj_dictionary.key_value {
            return Err(PdfTokError::NotNameInDictionaryKey);
        }
        self.obj_dictionary.key_value = false;
        Ok(())
    }

    pub fn h_dict_name(&mut self, name: &[u8]) -> Result<(), PdfTokError> {
        if !self.obj_dictionary.key_value {
            self.obj_entry.set_key(name);
        }
        self.obj_dictionary.key_value = !self.obj_dictionary.key_value;
        Ok(())
    }

    /// `array_level_at_open` is the `obj_array.nesting_level` snapshot
    /// taken when this dictionary frame was pushed.
    pub fn h_dict_close(&self, array_level_at_open: u32) -> Result<(), PdfTokError> {
        if self.obj_array.nesting_level != array_level_at_open {
            return Err(PdfTokError::IncompleteArrayInDictionary);
        }
        Ok(())
    }

    pub fn h_stream_open(&self) -> Result<(), PdfTokError> {
        if self.obj_stream.rem_length < 0 {
            return Err(PdfTokError::StreamNoLength);
        }
        Ok(())
    }
}
