//! The PDFTok byte-level state machine: recognizes indirect objects,
//! dictionaries, literal/hex strings, and stream bodies one byte (or, for
//! stream bodies, one slice) at a time, without backtracking (spec.md §4).
//!
//! Start conditions are kept on a small fixed-depth stack
//! ([`MAX_CONDITION_STACK`]) the way a generated lexer keeps nested
//! `%x` states; here the stack is explicit because the input can pause
//! at any byte boundary between calls to [`Lexer::process`].

use tracing::{trace, warn};

use crate::byte_cursor::ByteCursor;

use super::error::{LexerOutcome, PdfTokError};
use super::semantic::Semantic;
use super::utf16::u16_to_u8;

/// Upper bound on how deep nested dictionaries (and the string/stream
/// states opened from within them) may stack. A legitimate PDF never
/// nests this deep; this is a security cap, not a spec requirement.
pub const MAX_CONDITION_STACK: usize = 32;

/// Which PDF literal the current string/hex-string state is extracting
/// into, decided at the moment `(` or `<` opens it: a plain value, or a
/// `/JS` stream's source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum U16Target {
    LiteralString,
    /// Not yet driven from `step_hex_string`: hex-string BOM detection
    /// requires decoding nibble pairs before the probe, which the
    /// current hex-string state doesn't do. Tracked for the day that's
    /// added; `step_u16_probe` already handles it correctly.
    HexString,
    /// Same gap for stream bodies.
    Stream,
}

/// One level of the lexer's start-condition stack.
#[derive(Debug, Clone)]
enum StartCondition {
    /// Top-level scan: watching for `int int obj`.
    Initial,
    /// Inside `N M obj ... endobj`, watching for `<<`, `(`, `<`, `stream`.
    IndObj { phase: IndObjPhase },
    /// Inside a `<< ... >>` dictionary.
    DictNr { array_level_at_open: u32, value_array_depth: u32 },
    /// Inside a literal string `( ... )`, not in a `/JS` stream.
    LitStr { paren_level: u32 },
    /// Inside a literal string that is JavaScript source; bytes are
    /// handed to the sink as they're unescaped.
    JsLstr { paren_level: u32 },
    /// Inside a hex string `< ... >`.
    HexStr { high_nibble: Option<u8> },
    JsHstr { high_nibble: Option<u8> },
    /// Inside a stream body, counted down via `obj_stream.rem_length`.
    Stream,
    JsStream,
    /// A UTF-16BE BOM probe taken mid literal/hex string: `target` says
    /// which closing delimiter ends it, `is_js` whether decoded scalars
    /// are forwarded to the sink at all.
    U16 { target: U16Target, is_js: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndObjPhase {
    Scanning,
    AngleBracket,
    MatchingStream(u8),
    AfterStreamKeywordCr,
    AfterStreamKeywordLf,
    MatchingEndobj(u8),
}

const STREAM_KW: &[u8] = b"stream";
const ENDOBJ_KW: &[u8] = b"endobj";

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n' | 0x0C | 0x00)
}

fn is_delimiter(b: u8) -> bool {
    matches!(b, b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%')
}

fn is_regular(b: u8) -> bool {
    !is_whitespace(b) && !is_delimiter(b)
}

/// Bytes produced by unescaping string/stream content are delivered to
/// this trait, the only place `pdftok` hands data back to the caller
/// (spec.md §6).
pub trait JsSink {
    /// Called with each chunk of decoded JavaScript source as it becomes
    /// available. May be called many times per logical string/stream.
    fn push_js_bytes(&mut self, bytes: &[u8]);
}

#[derive(Debug, Default)]
pub struct NullJsSink;

impl JsSink for NullJsSink {
    fn push_js_bytes(&mut self, _bytes: &[u8]) {}
}

/// A scratch accumulator for a small, bounded token (a `/Name`, an
/// integer, or an `int int keyword` pair), fed one byte at a time.
#[derive(Debug, Default)]
struct IntPairThenKeyword {
    keyword: &'static [u8],
    phase: IpkPhase,
    a: u32,
    b: u32,
    kw_matched: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum IpkPhase {
    #[default]
    Idle,
    Digits1,
    Between1,
    Digits2,
    Between2,
    Keyword,
}

const MAX_NUMBER_DIGITS: u32 = 16;

enum IpkStep {
    /// Still scanning, no decision yet.
    Continue,
    /// Byte didn't fit the grammar; the scanner gave up. The byte was
    /// still consumed (no backtracking).
    Abandoned,
    /// `int int keyword` fully matched.
    Matched(u32, u32),
}

impl IntPairThenKeyword {
    fn new(keyword: &'static [u8]) -> Self {
        Self { keyword, phase: IpkPhase::Idle, a: 0, b: 0, kw_matched: 0 }
    }

    fn reset(&mut self) {
        self.phase = IpkPhase::Idle;
        self.a = 0;
        self.b = 0;
        self.kw_matched = 0;
    }

    fn step(&mut self, byte: u8) -> IpkStep {
        match self.phase {
            IpkPhase::Idle => {
                if byte.is_ascii_digit() {
                    self.a = (byte - b'0') as u32;
                    self.phase = IpkPhase::Digits1;
                    IpkStep::Continue
                } else {
                    IpkStep::Abandoned
                }
            }
            IpkPhase::Digits1 => {
                if byte.is_ascii_digit() {
                    if self.a < 10u32.pow(MAX_NUMBER_DIGITS - 1) {
                        self.a = self.a * 10 + (byte - b'0') as u32;
                    }
                    IpkStep::Continue
                } else if is_whitespace(byte) {
                    self.phase = IpkPhase::Between1;
                    IpkStep::Continue
                } else {
                    self.reset();
                    IpkStep::Abandoned
                }
            }
            IpkPhase::Between1 => {
                if is_whitespace(byte) {
                    IpkStep::Continue
                } else if byte.is_ascii_digit() {
                    self.b = (byte - b'0') as u32;
                    self.phase = IpkPhase::Digits2;
                    IpkStep::Continue
                } else {
                    self.reset();
                    IpkStep::Abandoned
                }
            }
            IpkPhase::Digits2 => {
                if byte.is_ascii_digit() {
                    if self.b < 10u32.pow(MAX_NUMBER_DIGITS - 1) {
                        self.b = self.b * 10 + (byte - b'0') as u32;
                    }
                    IpkStep::Continue
                } else if is_whitespace(byte) {
                    self.phase = IpkPhase::Between2;
                    IpkStep::Continue
                } else {
                    self.reset();
                    IpkStep::Abandoned
                }
            }
            IpkPhase::Between2 => {
                if is_whitespace(byte) {
                    IpkStep::Continue
                } else if byte == self.keyword[0] {
                    self.kw_matched = 1;
                    self.phase = IpkPhase::Keyword;
                    if self.keyword.len() == 1 {
                        let (a, b) = (self.a, self.b);
                        self.reset();
                        return IpkStep::Matched(a, b);
                    }
                    IpkStep::Continue
                } else {
                    self.reset();
                    IpkStep::Abandoned
                }
            }
            IpkPhase::Keyword => {
                if byte == self.keyword[self.kw_matched] {
                    self.kw_matched += 1;
                    if self.kw_matched == self.keyword.len() {
                        let (a, b) = (self.a, self.b);
                        self.reset();
                        IpkStep::Matched(a, b)
                    } else {
                        IpkStep::Continue
                    }
                } else {
                    self.reset();
                    IpkStep::Abandoned
                }
            }
        }
    }
}

/// A bounded `/Name` accumulator: records up to
/// [`super::semantic::MAX_KEY_LEN`] bytes, but keeps consuming (and
/// counting) past that bound so the caller's cursor still lands exactly
/// on the name's end.
#[derive(Debug, Default)]
struct NameScan {
    buf: [u8; super::semantic::MAX_KEY_LEN],
    len: usize,
}

impl NameScan {
    fn reset(&mut self) {
        self.len = 0;
    }

    fn push(&mut self, byte: u8) {
        if self.len < self.buf.len() {
            self.buf[self.len] = byte;
        }
        self.len += 1;
    }

    fn bytes(&self) -> &[u8] {
        &self.buf[..self.len.min(self.buf.len())]
    }
}

/// A plain unsigned integer accumulator, used for `/Length` values.
#[derive(Debug, Default)]
struct NumberScan {
    value: i64,
    active: bool,
}

/// The PDFTok lexer. Generic over the sink that receives decoded
/// JavaScript bytes extracted from `/JS`-referenced streams and strings.
pub struct Lexer<S: JsSink> {
    stack: Vec<StartCondition>,
    semantic: Semantic,
    sink: S,

    obj_header_scan: IntPairThenKeyword,
    ref_scan: IntPairThenKeyword,
    name_scan: NameScan,
    length_scan: NumberScan,
    watching_js_ref: bool,
    watching_length: bool,
    /// Set while a `/Name` token in `DictNr` is incomplete at the end of
    /// a chunk, so the next `process()` call resumes straight into
    /// `step_dict_name` instead of re-entering `step_dict` from scratch
    /// (spec.md §1, §4.3: arbitrary segmentation, no backtracking).
    scanning_name: bool,
    current_obj: (u32, u16),
    pending_gen_digits: u32,
}

impl<S: JsSink> Lexer<S> {
    pub fn new(sink: S) -> Self {
        Self {
            stack: vec![StartCondition::Initial],
            semantic: Semantic::new(),
            sink,
            obj_header_scan: IntPairThenKeyword::new(b"obj"),
            ref_scan: IntPairThenKeyword::new(b"R"),
            name_scan: NameScan::default(),
            length_scan: NumberScan::default(),
            watching_js_ref: false,
            watching_length: false,
            scanning_name: false,
            current_obj: (0, 0),
            pending_gen_digits: 0,
        }
    }

    pub fn semantic(&self) -> &Semantic {
        &self.semantic
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Drive the lexer over `chunk`. Set `end_of_input` once the caller
    /// knows no further bytes will ever arrive for this stream; any
    /// state still open at that point is simply abandoned (not an
    /// error — matching a half-open connection's stream just stops
    /// being interesting, per spec.md §7).
    pub fn process(&mut self, chunk: &[u8], end_of_input: bool) -> Result<LexerOutcome, PdfTokError> {
        let mut cursor = ByteCursor::new(chunk);

        while !cursor.is_empty() {
            let made_progress = self.step(&mut cursor)?;
            if !made_progress {
                break;
            }
        }

        if end_of_input {
            Ok(LexerOutcome::Eos)
        } else {
            Ok(LexerOutcome::NeedMore)
        }
    }

    fn push_condition(&mut self, cond: StartCondition) -> Result<(), PdfTokError> {
        if self.stack.len() >= MAX_CONDITION_STACK {
            return Err(PdfTokError::ConditionStackOverflow);
        }
        self.stack.push(cond);
        Ok(())
    }

    fn pop_condition(&mut self) -> StartCondition {
        if self.stack.len() <= 1 {
            // Initial is the floor; never pop it.
            return StartCondition::Initial;
        }
        self.stack.pop().expect("stack non-empty, checked above")
    }

    /// Advance by exactly one "step", which for most states is one byte
    /// and for stream bodies is one bounded slice. Returns `Ok(false)`
    /// when the cursor ran out before any progress could be made.
    fn step(&mut self, cursor: &mut ByteCursor<'_>) -> Result<bool, PdfTokError> {
        let top = self.stack.last().cloned().unwrap_or(StartCondition::Initial);
        match top {
            StartCondition::Initial => self.step_initial(cursor),
            StartCondition::IndObj { phase } => self.step_ind_obj(cursor, phase),
            StartCondition::DictNr { array_level_at_open, value_array_depth } => {
                self.step_dict(cursor, array_level_at_open, value_array_depth)
            }
            StartCondition::LitStr { paren_level } => self.step_literal_string(cursor, paren_level, false),
            StartCondition::JsLstr { paren_level } => self.step_literal_string(cursor, paren_level, true),
            StartCondition::HexStr { high_nibble } => self.step_hex_string(cursor, high_nibble, false),
            StartCondition::JsHstr { high_nibble } => self.step_hex_string(cursor, high_nibble, true),
            StartCondition::Stream => self.step_stream_body(cursor, false),
            StartCondition::JsStream => self.step_stream_body(cursor, true),
            StartCondition::U16 { target, is_js } => self.step_u16_probe(cursor, target, is_js),
        }
    }

    // -- Initial ----------------------------------------------------

    fn step_initial(&mut self, cursor: &mut ByteCursor<'_>) -> Result<bool, PdfTokError> {
        let Some(byte) = cursor.next_byte() else { return Ok(false) };
        if let IpkStep::Matched(num, gen) = self.obj_header_scan.step(byte) {
            let gen = gen.min(u16::MAX as u32) as u16;
            trace!(num, gen, "pdftok: indirect object opened");
            self.current_obj = (num, gen);
            self.semantic.open_indirect_object(num, gen);
            self.push_condition(StartCondition::IndObj { phase: IndObjPhase::Scanning })?;
        }
        Ok(true)
    }

    // -- IndObj -------------------------------------------------------

    fn step_ind_obj(&mut self, cursor: &mut ByteCursor<'_>, phase: IndObjPhase) -> Result<bool, PdfTokError> {
        match phase {
            IndObjPhase::Scanning => self.step_ind_obj_scanning(cursor),
            IndObjPhase::AngleBracket => self.step_ind_obj_angle(cursor),
            IndObjPhase::MatchingStream(n) => self.step_match_stream(cursor, n),
            IndObjPhase::AfterStreamKeywordCr => self.step_after_stream_cr(cursor),
            IndObjPhase::AfterStreamKeywordLf => self.step_after_stream_lf(cursor),
            IndObjPhase::MatchingEndobj(n) => self.step_match_endobj(cursor, n),
        }
    }

    fn set_ind_obj_phase(&mut self, phase: IndObjPhase) {
        if let Some(StartCondition::IndObj { phase: slot }) = self.stack.last_mut() {
            *slot = phase;
        }
    }

    fn step_ind_obj_scanning(&mut self, cursor: &mut ByteCursor<'_>) -> Result<bool, PdfTokError> {
        let Some(byte) = cursor.next_byte() else { return Ok(false) };
        match byte {
            b'<' => self.set_ind_obj_phase(IndObjPhase::AngleBracket),
            b'(' => {
                let is_js = self.semantic.obj_stream.is_js;
                self.push_condition(if is_js {
                    StartCondition::JsLstr { paren_level: 1 }
                } else {
                    StartCondition::LitStr { paren_level: 1 }
                })?;
            }
            b's' => self.set_ind_obj_phase(IndObjPhase::MatchingStream(1)),
            b'e' => self.set_ind_obj_phase(IndObjPhase::MatchingEndobj(1)),
            _ => {} // numbers, whitespace, other keywords outside any dictionary: skip
        }
        Ok(true)
    }

    fn step_ind_obj_angle(&mut self, cursor: &mut ByteCursor<'_>) -> Result<bool, PdfTokError> {
        match cursor.peek() {
            Some(b'<') => {
                cursor.advance(1);
                self.set_ind_obj_phase(IndObjPhase::Scanning);
                self.push_condition(StartCondition::DictNr { array_level_at_open: self.semantic.obj_array.nesting_level, value_array_depth: 0 })?;
            }
            Some(_) => {
                // A bare '<' opens a hex string; the byte we peeked is
                // its first content byte, not consumed here.
                self.set_ind_obj_phase(IndObjPhase::Scanning);
                let is_js = self.semantic.obj_stream.is_js;
                self.push_condition(if is_js {
                    StartCondition::JsHstr { high_nibble: None }
                } else {
                    StartCondition::HexStr { high_nibble: None }
                })?;
            }
            None => return Ok(false),
        }
        Ok(true)
    }

    fn step_match_stream(&mut self, cursor: &mut ByteCursor<'_>, matched: u8) -> Result<bool, PdfTokError> {
        let Some(byte) = cursor.next_byte() else { return Ok(false) };
        if byte == STREAM_KW[matched as usize] {
            let matched = matched + 1;
            if matched as usize == STREAM_KW.len() {
                self.set_ind_obj_phase(IndObjPhase::AfterStreamKeywordCr);
            } else {
                self.set_ind_obj_phase(IndObjPhase::MatchingStream(matched));
            }
        } else {
            self.set_ind_obj_phase(IndObjPhase::Scanning);
        }
        Ok(true)
    }

    fn step_after_stream_cr(&mut self, cursor: &mut ByteCursor<'_>) -> Result<bool, PdfTokError> {
        match cursor.peek() {
            Some(b'\r') => {
                cursor.advance(1);
                self.set_ind_obj_phase(IndObjPhase::AfterStreamKeywordLf);
                Ok(true)
            }
            Some(b'\n') => {
                cursor.advance(1);
                self.commit_stream_open()?;
                Ok(true)
            }
            Some(_) => {
                self.commit_stream_open()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn step_after_stream_lf(&mut self, cursor: &mut ByteCursor<'_>) -> Result<bool, PdfTokError> {
        match cursor.peek() {
            Some(b'\n') => {
                cursor.advance(1);
                self.commit_stream_open()?;
                Ok(true)
            }
            Some(_) => {
                self.commit_stream_open()?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn commit_stream_open(&mut self) -> Result<(), PdfTokError> {
        self.semantic.h_stream_open()?;
        self.set_ind_obj_phase(IndObjPhase::Scanning);
        let is_js = self.semantic.obj_stream.is_js;
        self.stack.pop(); // leave IndObj; the stream body is its own state
        self.push_condition(if is_js { StartCondition::JsStream } else { StartCondition::Stream })?;
        Ok(())
    }

    fn step_match_endobj(&mut self, cursor: &mut ByteCursor<'_>, matched: u8) -> Result<bool, PdfTokError> {
        let Some(byte) = cursor.next_byte() else { return Ok(false) };
        if byte == ENDOBJ_KW[matched as usize] {
            let matched = matched + 1;
            if matched as usize == ENDOBJ_KW.len() {
                self.pop_condition();
            } else {
                self.set_ind_obj_phase(IndObjPhase::MatchingEndobj(matched));
            }
        } else {
            self.set_ind_obj_phase(IndObjPhase::Scanning);
        }
        Ok(true)
    }

    // -- DictNr ---------------------------------------------------------

    fn step_dict(&mut self, cursor: &mut ByteCursor<'_>, array_level_at_open: u32, value_array_depth: u32) -> Result<bool, PdfTokError> {
        // A `/Name` or `/Length` digit run left incomplete at the end of
        // the previous chunk must resume directly into its sub-scan, not
        // re-read as a fresh byte here — otherwise the partial token is
        // either stranded (name) or silently overwritten (length).
        if self.scanning_name {
            return self.step_dict_name(cursor, array_level_at_open, value_array_depth);
        }
        if value_array_depth == 0 && self.length_scan.active {
            return self.step_dict_length(cursor, array_level_at_open, value_array_depth);
        }

        if value_array_depth == 0 && self.watching_js_ref {
            // Opportunistically try to recognize `int int R` before
            // falling back to plain skip-and-flip handling.
            if let Some(byte) = cursor.peek() {
                if byte.is_ascii_digit() || (self.ref_scan_active()) {
                    return self.step_dict_js_ref_candidate(cursor, array_level_at_open, value_array_depth);
                }
            }
        }

        let Some(byte) = cursor.next_byte() else { return Ok(false) };

        match byte {
            b'/' => {
                self.name_scan.reset();
                return self.step_dict_name(cursor, array_level_at_open, value_array_depth);
            }
            b'[' => {
                self.semantic.obj_array.nesting_level = self.semantic.obj_array.nesting_level.saturating_add(1);
                self.bump_value_array_depth(1);
            }
            b']' => {
                self.semantic.obj_array.nesting_level = self.semantic.obj_array.nesting_level.saturating_sub(1);
                let now_zero = self.bump_value_array_depth_down();
                if now_zero {
                    self.complete_value(array_level_at_open);
                }
            }
            b'<' => {
                if cursor.peek() == Some(b'<') {
                    cursor.advance(1);
                    self.push_condition(StartCondition::DictNr { array_level_at_open: self.semantic.obj_array.nesting_level, value_array_depth: 0 })?;
                } else {
                    let is_js = self.semantic.obj_stream.is_js;
                    self.push_condition(if is_js { StartCondition::JsHstr { high_nibble: None } } else { StartCondition::HexStr { high_nibble: None } })?;
                }
            }
            b'>' => {
                if cursor.peek() == Some(b'>') {
                    cursor.advance(1);
                    self.semantic.h_dict_close(array_level_at_open)?;
                    self.pop_condition();
                    self.complete_value_after_pop();
                }
            }
            b'(' => {
                let is_js = self.semantic.obj_stream.is_js;
                self.push_condition(if is_js { StartCondition::JsLstr { paren_level: 1 } } else { StartCondition::LitStr { paren_level: 1 } })?;
            }
            _ if byte.is_ascii_digit() && value_array_depth == 0 && self.watching_length => {
                self.length_scan.value = (byte - b'0') as i64;
                self.length_scan.active = true;
                return self.step_dict_length(cursor, array_level_at_open, value_array_depth);
            }
            _ if is_whitespace(byte) => {}
            _ => {
                if value_array_depth == 0 {
                    self.semantic.h_dict_other()?;
                    self.watching_js_ref = false;
                    self.watching_length = false;
                }
            }
        }
        Ok(true)
    }

    fn ref_scan_active(&self) -> bool {
        !matches!(self.ref_scan.phase, IpkPhase::Idle)
    }

    fn bump_value_array_depth(&mut self, delta: i32) {
        if let Some(StartCondition::DictNr { value_array_depth, .. }) = self.stack.last_mut() {
            *value_array_depth = (*value_array_depth as i32 + delta).max(0) as u32;
        }
    }

    /// Decrement value_array_depth by one; returns true if it reached 0.
    fn bump_value_array_depth_down(&mut self) -> bool {
        if let Some(StartCondition::DictNr { value_array_depth, .. }) = self.stack.last_mut() {
            if *value_array_depth > 0 {
                *value_array_depth -= 1;
            }
            return *value_array_depth == 0;
        }
        false
    }

    fn complete_value(&mut self, _array_level_at_open: u32) {
        if let Some(StartCondition::DictNr { .. }) = self.stack.last() {
            let _ = self.semantic.h_dict_other();
            self.watching_js_ref = false;
            self.watching_length = false;
        }
    }

    /// Called right after popping a value sub-state (string, stream,
    /// nested dict) back to its enclosing condition. If that enclosing
    /// condition is a dictionary waiting on a non-array value, flip its
    /// parity back to key-expected.
    fn complete_value_after_pop(&mut self) {
        if let Some(StartCondition::DictNr { value_array_depth, .. }) = self.stack.last() {
            if *value_array_depth == 0 {
                self.semantic.obj_dictionary.key_value = false;
            }
        }
    }

    fn step_dict_name(&mut self, cursor: &mut ByteCursor<'_>, array_level_at_open: u32, value_array_depth: u32) -> Result<bool, PdfTokError> {
        self.scanning_name = true;
        loop {
            match cursor.peek() {
                Some(b) if is_regular(b) => {
                    cursor.advance(1);
                    self.name_scan.push(b);
                }
                Some(_) | None => break,
            }
        }
        if cursor.is_empty() {
            // Still mid-name at chunk boundary: `scanning_name` stays set
            // so the next `process()` call resumes here directly (via
            // `step_dict`'s guard) instead of re-reading the next byte as
            // a fresh dictionary token.
            return Ok(true);
        }

        self.scanning_name = false;
        if value_array_depth == 0 {
            let was_key = !self.semantic.obj_dictionary.key_value;
            self.semantic.h_dict_name(self.name_scan.bytes())?;
            if was_key {
                self.watching_js_ref = self.semantic.obj_entry.key_is(b"JS");
                self.watching_length = self.semantic.obj_entry.key_is(b"Length");
            }
        }
        let _ = array_level_at_open;
        Ok(true)
    }

    /// Accumulates `/Length`'s digits into `length_scan.value`. Safe to
    /// resume across chunk boundaries: `step_dict` routes straight back
    /// here while `length_scan.active` is set, so the first-digit arm
    /// that seeds `value` never re-fires mid-number.
    fn step_dict_length(&mut self, cursor: &mut ByteCursor<'_>, array_level_at_open: u32, value_array_depth: u32) -> Result<bool, PdfTokError> {
        loop {
            match cursor.peek() {
                Some(b) if b.is_ascii_digit() => {
                    cursor.advance(1);
                    self.length_scan.value = self.length_scan.value.saturating_mul(10).saturating_add((b - b'0') as i64);
                }
                _ => break,
            }
        }
        if cursor.is_empty() {
            return Ok(true);
        }
        self.semantic.obj_stream.rem_length = self.length_scan.value;
        self.length_scan.active = false;
        self.complete_value(array_level_at_open);
        let _ = value_array_depth;
        Ok(true)
    }

    fn step_dict_js_ref_candidate(&mut self, cursor: &mut ByteCursor<'_>, array_level_at_open: u32, value_array_depth: u32) -> Result<bool, PdfTokError> {
        let Some(byte) = cursor.next_byte() else { return Ok(false) };
        match self.ref_scan.step(byte) {
            IpkStep::Continue => {}
            IpkStep::Matched(num, gen) => {
                let gen = gen.min(u16::MAX as u32) as u16;
                self.semantic.record_js_ref((num, gen));
                self.watching_js_ref = false;
                self.complete_value(array_level_at_open);
            }
            IpkStep::Abandoned => {
                // Not a reference after all; give up tracking for this
                // value but don't re-derive a parity flip from a partial
                // digit run — malformed-for-our-purposes input, leave
                // dictionary parity where it is rather than guess.
                self.watching_js_ref = false;
            }
        }
        let _ = value_array_depth;
        Ok(true)
    }

    // -- Literal strings --------------------------------------------

    fn step_literal_string(&mut self, cursor: &mut ByteCursor<'_>, paren_level: u32, is_js: bool) -> Result<bool, PdfTokError> {
        let Some(byte) = cursor.next_byte() else { return Ok(false) };

        if byte == 0xFE && paren_level == 1 {
            if let Some(0xFF) = cursor.peek() {
                cursor.advance(1);
                self.semantic.u16_state = super::utf16::Utf16Accumulator::new();
                self.pop_condition();
                self.push_condition(StartCondition::U16 { target: U16Target::LiteralString, is_js })?;
                return Ok(true);
            }
        }

        match byte {
            b'\\' => {
                if let Some(decoded) = self.unescape_literal(cursor)? {
                    if is_js {
                        self.sink.push_js_bytes(&[decoded]);
                    }
                }
            }
            b'(' => {
                self.set_paren_level(paren_level + 1);
                if is_js {
                    self.sink.push_js_bytes(b"(");
                }
            }
            b')' => {
                if paren_level == 1 {
                    self.pop_condition();
                    self.complete_value_after_pop();
                } else {
                    self.set_paren_level(paren_level - 1);
                    if is_js {
                        self.sink.push_js_bytes(b")");
                    }
                }
            }
            _ => {
                if is_js {
                    self.sink.push_js_bytes(&[byte]);
                }
            }
        }
        Ok(true)
    }

    fn set_paren_level(&mut self, level: u32) {
        match self.stack.last_mut() {
            Some(StartCondition::LitStr { paren_level }) => *paren_level = level,
            Some(StartCondition::JsLstr { paren_level }) => *paren_level = level,
            _ => {}
        }
    }

    /// Decode one backslash escape per PDF 32000-1:2008 §7.3.4.2. Returns
    /// the decoded byte, or `None` for a line-continuation escape
    /// (backslash immediately followed by EOL, which contributes nothing
    /// to the string).
    fn unescape_literal(&mut self, cursor: &mut ByteCursor<'_>) -> Result<Option<u8>, PdfTokError> {
        let Some(byte) = cursor.next_byte() else {
            // Escape split across a chunk boundary: not representable
            // with the current one-byte-at-a-time design without extra
            // state; treat conservatively as a literal backslash. This
            // only occurs when a producer's pathological chunking lands
            // exactly after the backslash.
            return Ok(Some(b'\\'));
        };
        let decoded = match byte {
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'b' => 0x08,
            b'f' => 0x0C,
            b'(' => b'(',
            b')' => b')',
            b'\\' => b'\\',
            b'\r' => {
                if cursor.peek() == Some(b'\n') {
                    cursor.advance(1);
                }
                return Ok(None);
            }
            b'\n' => return Ok(None),
            b'0'..=b'7' => {
                let mut value = byte - b'0';
                for _ in 0..2 {
                    match cursor.peek() {
                        Some(d @ b'0'..=b'7') => {
                            cursor.advance(1);
                            value = value.wrapping_mul(8).wrapping_add(d - b'0');
                        }
                        _ => break,
                    }
                }
                value
            }
            other => other,
        };
        Ok(Some(decoded))
    }

    // -- Hex strings --------------------------------------------------

    fn step_hex_string(&mut self, cursor: &mut ByteCursor<'_>, high_nibble: Option<u8>, is_js: bool) -> Result<bool, PdfTokError> {
        let Some(byte) = cursor.next_byte() else { return Ok(false) };

        if byte == b'>' {
            if let Some(high) = high_nibble {
                // Odd number of hex digits: the missing low nibble is
                // treated as 0, per PDF 32000-1:2008 §7.3.4.3.
                let value = high << 4;
                if is_js {
                    self.sink.push_js_bytes(&[value]);
                }
            }
            self.pop_condition();
            self.complete_value_after_pop();
            return Ok(true);
        }

        let Some(nibble) = hex_value(byte) else {
            // Whitespace is legal between hex digits; anything else is
            // simply skipped, matching the no-backtrack policy.
            return Ok(true);
        };

        match high_nibble {
            None => self.set_high_nibble(Some(nibble)),
            Some(high) => {
                let value = (high << 4) | nibble;
                if is_js {
                    self.sink.push_js_bytes(&[value]);
                }
                self.set_high_nibble(None);
            }
        }
        Ok(true)
    }

    fn set_high_nibble(&mut self, value: Option<u8>) {
        match self.stack.last_mut() {
            Some(StartCondition::HexStr { high_nibble }) => *high_nibble = value,
            Some(StartCondition::JsHstr { high_nibble }) => *high_nibble = value,
            _ => {}
        }
    }

    // -- Stream bodies --------------------------------------------------

    fn step_stream_body(&mut self, cursor: &mut ByteCursor<'_>, is_js: bool) -> Result<bool, PdfTokError> {
        let remaining = self.semantic.obj_stream.rem_length.max(0) as usize;
        if remaining == 0 {
            self.pop_condition();
            return Ok(true);
        }
        if cursor.is_empty() {
            return Ok(false);
        }
        let take = cursor.remaining().min(remaining);
        let slice = cursor.take(take);
        self.semantic.obj_stream.rem_length -= take as i64;
        if is_js {
            self.sink.push_js_bytes(slice);
        }
        if self.semantic.obj_stream.rem_length <= 0 {
            self.pop_condition();
            // spec.md §6: "a single \n inserted after each JS stream".
            if is_js {
                self.sink.push_js_bytes(b"\n");
            }
        }
        Ok(true)
    }

    // -- UTF-16BE probe --------------------------------------------------

    /// Decided mid literal/hex string (after a `FE FF` BOM was seen):
    /// continues decoding UTF-16BE code units and re-encoding them to
    /// UTF-8 before forwarding to the sink, until the enclosing
    /// delimiter (`)` or `>`) appears.
    fn step_u16_probe(&mut self, cursor: &mut ByteCursor<'_>, target: U16Target, is_js: bool) -> Result<bool, PdfTokError> {
        let Some(byte) = cursor.next_byte() else { return Ok(false) };

        let closing = match target {
            U16Target::LiteralString => Some(b')'),
            U16Target::HexString => Some(b'>'),
            U16Target::Stream => None,
        };

        if closing == Some(byte) {
            self.pop_condition();
            self.complete_value_after_pop();
            return Ok(true);
        }

        match self.semantic.u16_state.u16_eval(byte) {
            Ok(Some(code_point)) => {
                if is_js {
                    let mut out = Vec::with_capacity(4);
                    u16_to_u8(code_point, &mut out);
                    self.sink.push_js_bytes(&out);
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(?err, "pdftok: malformed UTF-16BE sequence, abandoning string");
                self.pop_condition();
                self.complete_value_after_pop();
                return Err(err);
            }
        }
        Ok(true)
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
