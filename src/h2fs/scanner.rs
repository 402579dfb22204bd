//! The frame-boundary state machine: decides *when* a complete logical
//! unit has arrived in a directional byte stream, without ever requiring
//! the caller to hand it whole frames.

use tracing::trace;

use crate::byte_cursor::ByteCursor;

use super::{flags, frame_type, DataCutter, EventSink, Infraction, CONNECTION_PREFACE, FRAME_HEADER_LEN, MAX_OCTETS};

/// Verdict returned by [`Scanner::scan`] (and, doubling as the same type,
/// by [`super::DataCutter::scan`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Need more bytes; no flush offset is meaningful.
    Search,
    /// Caller should deliver `chunk[..flush_offset]` (plus anything it
    /// buffered from earlier `Search` calls) to the reassembler, then
    /// resume scanning at `chunk[flush_offset..]`.
    Flush,
    /// A protocol error was recorded; the caller must tear down this
    /// direction.
    Abort,
}

/// What kind of logical unit the most recent `Flush` verdict cut at.
/// The 24-byte connection preface is flushed so the caller can advance its
/// cursor past it, but it is never forwarded to detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushKind {
    Preface,
    Frame,
}

/// Which side of the connection this scanner watches. Only the
/// client→server direction is expected to open with the connection
/// preface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

/// Per-direction scanner state (spec.md §3, "H2FS per-direction state").
/// One of these is created with the session and destroyed with it.
#[derive(Debug)]
pub struct DirectionState {
    direction: Direction,
    preface: bool,
    octets_seen: usize,
    frame_header: [u8; FRAME_HEADER_LEN],
    remaining_frame_octets: usize,
    continuation_expected: bool,
    mid_data_frame: bool,
    current_stream: u32,
    num_frame_headers: u32,
    total_bytes_in_split: usize,
    frame_type: u8,
    frame_flags: u8,
}

impl DirectionState {
    pub fn new(direction: Direction) -> Self {
        Self {
            preface: matches!(direction, Direction::ClientToServer),
            direction,
            octets_seen: 0,
            frame_header: [0u8; FRAME_HEADER_LEN],
            remaining_frame_octets: 0,
            continuation_expected: false,
            mid_data_frame: false,
            current_stream: 0,
            num_frame_headers: 0,
            total_bytes_in_split: 0,
            frame_type: 0,
            frame_flags: 0,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Header count accumulated since the last PDU tail. Read by the
    /// reassembler to size `frame_header` on the first reassembly call of
    /// a PDU; reset to 0 by the reassembler once it signals `PDU_TAIL`.
    pub fn num_frame_headers(&self) -> u32 {
        self.num_frame_headers
    }

    /// Bytes promised to the reassembler since the last PDU tail.
    pub fn total_bytes_in_split(&self) -> usize {
        self.total_bytes_in_split
    }

    /// Type of the most recently scanned frame header; tells the
    /// reassembler whether to run in DATA mode or header/payload mode.
    pub fn frame_type(&self) -> u8 {
        self.frame_type
    }

    pub fn current_stream(&self) -> u32 {
        self.current_stream
    }

    /// Reset the counters that are scoped to a single PDU. Called by the
    /// reassembler when it processes the call carrying `PDU_TAIL`.
    pub(crate) fn reset_pdu_counters(&mut self) {
        self.num_frame_headers = 0;
        self.total_bytes_in_split = 0;
    }
}

/// Single-directional HTTP/2 frame-boundary scanner (spec.md §4.1).
#[derive(Debug)]
pub struct Scanner {
    state: DirectionState,
    last_flush_kind: FlushKind,
}

impl Scanner {
    pub fn new(direction: Direction) -> Self {
        Self {
            state: DirectionState::new(direction),
            last_flush_kind: FlushKind::Frame,
        }
    }

    pub fn state(&self) -> &DirectionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut DirectionState {
        &mut self.state
    }

    /// What kind of unit the most recent `Flush` verdict corresponded to.
    pub fn last_flush_kind(&self) -> FlushKind {
        self.last_flush_kind
    }

    /// Idempotent on zero-length input; never reads beyond `chunk.len()`.
    pub fn scan<E: EventSink, D: DataCutter>(
        &mut self,
        chunk: &[u8],
        flush_offset: &mut usize,
        sink: &mut E,
        cutter: &mut D,
    ) -> Status {
        *flush_offset = 0;
        let mut cursor = ByteCursor::new(chunk);

        loop {
            if self.state.preface {
                match self.scan_preface(&mut cursor, sink) {
                    Some(Status::Flush) => {
                        *flush_offset = cursor.position();
                        self.last_flush_kind = FlushKind::Preface;
                        return Status::Flush;
                    }
                    Some(Status::Abort) => return Status::Abort,
                    Some(Status::Search) | None => return Status::Search,
                }
            }

            if !self.state.mid_data_frame && self.state.remaining_frame_octets == 0 {
                match self.assemble_header(&mut cursor) {
                    Ok(true) => {} // header complete, fall through to dispatch below
                    Ok(false) => return Status::Search,
                    Err(infraction) => {
                        sink.record_event(infraction);
                        return Status::Abort;
                    }
                }
            }

            if self.state.mid_data_frame {
                match self.drive_data_cutter(&mut cursor, cutter) {
                    Status::Flush => {
                        *flush_offset = cursor.position();
                        self.last_flush_kind = FlushKind::Frame;
                        return Status::Flush;
                    }
                    Status::Abort => {
                        sink.record_event(Infraction::FrameSequence);
                        return Status::Abort;
                    }
                    Status::Search => {
                        if self.state.remaining_frame_octets == 0 {
                            // This DATA frame's bytes are all consumed but
                            // the cutter wants more; keep scanning within
                            // the same chunk if any remains.
                            continue;
                        }
                        return Status::Search;
                    }
                }
            } else {
                match self.consume_non_data_payload(&mut cursor) {
                    Some(true) => continue, // continuation still pending, keep looping
                    Some(false) => {
                        *flush_offset = cursor.position();
                        self.last_flush_kind = FlushKind::Frame;
                        return Status::Flush;
                    }
                    None => return Status::Search,
                }
            }
        }
    }

    /// Returns `Some(Status::Flush)` once the full 24-byte preface has
    /// matched, `Some(Status::Abort)` on first mismatch, or `None` when
    /// the chunk ran out first (caller should return `Search`).
    fn scan_preface<E: EventSink>(&mut self, cursor: &mut ByteCursor<'_>, sink: &mut E) -> Option<Status> {
        while self.state.octets_seen < CONNECTION_PREFACE.len() {
            let byte = cursor.next_byte()?;
            if byte != CONNECTION_PREFACE[self.state.octets_seen] {
                sink.record_event(Infraction::PrefaceMatchFailure);
                return Some(Status::Abort);
            }
            self.state.octets_seen += 1;
        }
        self.state.preface = false;
        self.state.octets_seen = 0;
        Some(Status::Flush)
    }

    /// Accumulates 9 bytes into `frame_header`, then decodes and dispatches
    /// by type. Returns `Ok(true)` once a header has been fully decoded and
    /// dispatched, `Ok(false)` if the chunk ran out first.
    fn assemble_header(&mut self, cursor: &mut ByteCursor<'_>) -> Result<bool, Infraction> {
        while self.state.octets_seen < FRAME_HEADER_LEN {
            let byte = match cursor.next_byte() {
                Some(b) => b,
                None => return Ok(false),
            };
            self.state.frame_header[self.state.octets_seen] = byte;
            self.state.octets_seen += 1;
        }

        let h = &self.state.frame_header;
        let length = ((h[0] as u32) << 16) | ((h[1] as u32) << 8) | (h[2] as u32);
        let ftype = h[3];
        let fflags = h[4];
        let stream_id = (((h[5] as u32) << 24) | ((h[6] as u32) << 16) | ((h[7] as u32) << 8) | (h[8] as u32))
            & 0x7FFF_FFFF;

        trace!(ftype, length, stream_id, flags = fflags, "h2fs: frame header");

        self.state.octets_seen = 0;
        self.state.frame_type = ftype;
        self.state.frame_flags = fflags;
        self.state.current_stream = stream_id;
        self.state.num_frame_headers += 1;
        self.state.total_bytes_in_split += FRAME_HEADER_LEN + length as usize;

        self.dispatch(ftype, fflags, length)?;
        Ok(true)
    }

    fn dispatch(&mut self, ftype: u8, fflags: u8, length: u32) -> Result<(), Infraction> {
        match ftype {
            frame_type::DATA => {
                if self.state.continuation_expected {
                    return Err(Infraction::FrameSequence);
                }
                if length == 0 || length as usize > MAX_OCTETS {
                    return Err(Infraction::FrameSequence);
                }
                self.state.remaining_frame_octets = length as usize;
                self.state.mid_data_frame = true;
            }
            frame_type::HEADERS => {
                if self.state.continuation_expected {
                    return Err(Infraction::MissingContinuation);
                }
                if FRAME_HEADER_LEN + length as usize > MAX_OCTETS {
                    return Err(Infraction::FrameSequence);
                }
                self.state.remaining_frame_octets = length as usize;
                self.state.continuation_expected = fflags & flags::END_HEADERS == 0;
            }
            frame_type::CONTINUATION => {
                if !self.state.continuation_expected {
                    return Err(Infraction::UnexpectedContinuation);
                }
                if FRAME_HEADER_LEN + length as usize > MAX_OCTETS {
                    return Err(Infraction::FrameSequence);
                }
                self.state.remaining_frame_octets = length as usize;
                if fflags & flags::END_HEADERS != 0 {
                    self.state.continuation_expected = false;
                }
            }
            frame_type::PUSH_PROMISE => {
                // Not yet supported (spec.md §9 open question): surfaced
                // with the same taxonomy as an unexpected CONTINUATION.
                return Err(Infraction::UnexpectedContinuation);
            }
            _ => {
                if self.state.continuation_expected {
                    return Err(Infraction::MissingContinuation);
                }
                if FRAME_HEADER_LEN + length as usize > MAX_OCTETS {
                    return Err(Infraction::FrameSequence);
                }
                self.state.remaining_frame_octets = length as usize;
            }
        }
        Ok(())
    }

    /// Forwards the currently-open DATA frame's available payload bytes to
    /// the external `DataCutter`.
    fn drive_data_cutter<D: DataCutter>(&mut self, cursor: &mut ByteCursor<'_>, cutter: &mut D) -> Status {
        let take = cursor.remaining().min(self.state.remaining_frame_octets);
        let slice = cursor.take(take);
        self.state.remaining_frame_octets -= take;
        if self.state.remaining_frame_octets == 0 {
            self.state.mid_data_frame = false;
        }
        let mut cutter_flush_offset = 0usize;
        cutter.scan(slice, slice.len() as u32, self.state.frame_flags, &mut cutter_flush_offset)
    }

    /// Consumes the remaining payload of a non-DATA frame, if fully
    /// available in this chunk. Returns `Some(true)` if the frame
    /// completed but a CONTINUATION is still pending (keep looping),
    /// `Some(false)` if the frame completed and the PDU is done (flush
    /// now), or `None` if the chunk ran out first.
    fn consume_non_data_payload(&mut self, cursor: &mut ByteCursor<'_>) -> Option<bool> {
        if cursor.remaining() < self.state.remaining_frame_octets {
            // Partial: consume what we have and wait for more.
            let avail = cursor.remaining();
            cursor.advance(avail);
            self.state.remaining_frame_octets -= avail;
            return None;
        }
        cursor.advance(self.state.remaining_frame_octets);
        self.state.remaining_frame_octets = 0;
        Some(self.state.continuation_expected)
    }
}
