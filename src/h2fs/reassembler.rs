//! Turns the bytes the scanner chose to flush into two owned buffers: a
//! concatenation of frame headers and a concatenation of frame payloads
//! with padding elided (spec.md §4.2).

use tracing::trace;

use crate::byte_cursor::ByteCursor;

use super::scanner::DirectionState;
use super::{frame_type, DataCutter, FRAME_HEADER_LEN, PDU_TAIL};

/// The two buffers a completed PDU (or DATA segment) produces.
///
/// For a DATA-mode PDU, `frame_header` is empty and `frame_data` is
/// whatever the external [`DataCutter`] assembled. For a non-DATA PDU,
/// both are populated: `frame_header` is every frame header in the chain
/// concatenated, `frame_data` is every frame's payload concatenated with
/// padding (and pad-length bytes) stripped.
///
/// On the call carrying `PDU_TAIL`, [`Reassembler::reassemble`] returns a
/// non-null, zero-length `StreamBuffer` as a sentinel meaning "detection
/// required, no pkt_data" — the real accumulated bytes are read back
/// through [`Reassembler::frame_header`] / [`Reassembler::frame_data`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StreamBuffer {
    pub frame_header: Vec<u8>,
    pub frame_data: Vec<u8>,
}

/// Per-direction reassembler. Its buffers are allocated on the first
/// reassembly call of a PDU and live until the caller requests
/// [`Reassembler::clear`] (typically right after reading them out).
#[derive(Debug, Default)]
pub struct Reassembler {
    buffer: Option<StreamBuffer>,
    header_cap: usize,
    data_cap: usize,

    header_buf: [u8; FRAME_HEADER_LEN],
    header_filled: usize,
    frame_payload_remaining: usize,
    frame_padded: bool,
    pad_length_known: bool,
    pad_remaining: usize,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame_header(&self) -> &[u8] {
        self.buffer.as_ref().map(|b| b.frame_header.as_slice()).unwrap_or(&[])
    }

    pub fn frame_data(&self) -> &[u8] {
        self.buffer.as_ref().map(|b| b.frame_data.as_slice()).unwrap_or(&[])
    }

    /// Drop the accumulated buffers and reset internal cursors, ready for
    /// the next PDU.
    pub fn clear(&mut self) {
        self.buffer = None;
        self.header_cap = 0;
        self.data_cap = 0;
        self.header_filled = 0;
        self.frame_payload_remaining = 0;
        self.frame_padded = false;
        self.pad_length_known = false;
        self.pad_remaining = 0;
    }

    /// Process one contiguous segment of a flushed PDU.
    ///
    /// `offset == 0` on the first call for a PDU; `offset + chunk.len() <=
    /// total`; `pdu_flags` carries [`super::PDU_TAIL`] on the final call.
    pub fn reassemble<D: DataCutter>(
        &mut self,
        state: &mut DirectionState,
        total: usize,
        offset: usize,
        chunk: &[u8],
        pdu_flags: u8,
        cutter: &mut D,
    ) -> Option<StreamBuffer> {
        if state.frame_type() == frame_type::DATA {
            return self.reassemble_data_mode(state, chunk, pdu_flags, cutter);
        }

        if offset == 0 {
            self.header_cap = FRAME_HEADER_LEN * state.num_frame_headers() as usize;
            self.data_cap = total.saturating_sub(self.header_cap);
            self.buffer = Some(StreamBuffer {
                frame_header: Vec::with_capacity(self.header_cap),
                frame_data: Vec::with_capacity(self.data_cap),
            });
            self.header_filled = 0;
            self.frame_payload_remaining = 0;
            self.pad_length_known = false;
            self.pad_remaining = 0;
        }

        self.copy_non_data_chunk(chunk);

        if pdu_flags & PDU_TAIL != 0 {
            state.reset_pdu_counters();
            return Some(StreamBuffer::default());
        }
        None
    }

    fn copy_non_data_chunk(&mut self, chunk: &[u8]) {
        let mut cursor = ByteCursor::new(chunk);

        while !cursor.is_empty() {
            if self.header_filled < FRAME_HEADER_LEN {
                while self.header_filled < FRAME_HEADER_LEN {
                    let Some(b) = cursor.next_byte() else { break };
                    self.header_buf[self.header_filled] = b;
                    self.header_filled += 1;
                    if let Some(buf) = &mut self.buffer {
                        debug_assert!(buf.frame_header.len() < self.header_cap);
                        buf.frame_header.push(b);
                    }
                }
                if self.header_filled < FRAME_HEADER_LEN {
                    break; // header split across reassemble() calls; wait for more
                }

                let h = &self.header_buf;
                let length = ((h[0] as u32) << 16) | ((h[1] as u32) << 8) | (h[2] as u32);
                let fflags = h[4];
                self.frame_payload_remaining = length as usize;
                self.frame_padded = fflags & super::flags::PADDED != 0;
                self.pad_length_known = !self.frame_padded;
                self.pad_remaining = 0;
                trace!(length, padded = self.frame_padded, "h2fs: reassembler saw header");
                continue;
            }

            if self.frame_payload_remaining == 0 {
                self.header_filled = 0;
                continue;
            }

            if self.frame_padded && !self.pad_length_known {
                let Some(pad_len) = cursor.next_byte() else { break };
                self.pad_remaining = pad_len as usize;
                self.pad_length_known = true;
                self.frame_payload_remaining -= 1;
                continue;
            }

            let data_left = self.frame_payload_remaining - self.pad_remaining;
            if data_left > 0 {
                let take = cursor.remaining().min(data_left);
                let slice = cursor.take(take);
                if let Some(buf) = &mut self.buffer {
                    buf.frame_data.extend_from_slice(slice);
                    debug_assert!(buf.frame_data.len() <= self.data_cap);
                }
                self.frame_payload_remaining -= take;
            } else {
                let take = cursor.remaining().min(self.pad_remaining);
                cursor.advance(take);
                self.pad_remaining -= take;
                self.frame_payload_remaining -= take;
            }
        }
    }

    fn reassemble_data_mode<D: DataCutter>(
        &mut self,
        state: &mut DirectionState,
        chunk: &[u8],
        pdu_flags: u8,
        cutter: &mut D,
    ) -> Option<StreamBuffer> {
        let produced = cutter.reassemble(chunk);
        if pdu_flags & PDU_TAIL != 0 {
            state.reset_pdu_counters();
            if produced.is_none() {
                return Some(StreamBuffer::default());
            }
        }
        produced.map(|data| StreamBuffer {
            frame_header: Vec::new(),
            frame_data: data,
        })
    }
}
