//! Tests for the frame-boundary scanner in isolation.

use h2fs_pdftok::h2fs::{Direction, NullEventSink, PassthroughDataCutter, Scanner, Status};

fn header(length: u32, ftype: u8, flags: u8, stream_id: u32) -> [u8; 9] {
    let l = length.to_be_bytes();
    let s = stream_id.to_be_bytes();
    [l[1], l[2], l[3], ftype, flags, s[0], s[1], s[2], s[3]]
}

#[test]
fn preface_flushes_whole_and_reports_preface_kind() {
    let mut scanner = Scanner::new(Direction::ClientToServer);
    let mut sink = NullEventSink;
    let mut cutter = PassthroughDataCutter;
    let mut flush_offset = 0usize;

    let preface = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";
    let status = scanner.scan(preface, &mut flush_offset, &mut sink, &mut cutter);
    assert_eq!(status, Status::Flush);
    assert_eq!(flush_offset, preface.len());
    assert_eq!(scanner.last_flush_kind(), h2fs_pdftok::h2fs::FlushKind::Preface);
}

#[test]
fn preface_split_across_three_chunks_still_flushes() {
    let mut scanner = Scanner::new(Direction::ClientToServer);
    let mut sink = NullEventSink;
    let mut cutter = PassthroughDataCutter;
    let preface = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

    let (a, rest) = preface.split_at(5);
    let (b, c) = rest.split_at(10);

    let mut flush_offset = 0usize;
    assert_eq!(scanner.scan(a, &mut flush_offset, &mut sink, &mut cutter), Status::Search);
    assert_eq!(scanner.scan(b, &mut flush_offset, &mut sink, &mut cutter), Status::Search);
    let status = scanner.scan(c, &mut flush_offset, &mut sink, &mut cutter);
    assert_eq!(status, Status::Flush);
    assert_eq!(flush_offset, c.len());
}

#[test]
fn preface_mismatch_aborts() {
    let mut scanner = Scanner::new(Direction::ClientToServer);
    let mut sink = NullEventSink;
    let mut cutter = PassthroughDataCutter;
    let mut flush_offset = 0usize;

    let bad = b"GET / HTTP/1.1\r\n\r\n";
    let status = scanner.scan(bad, &mut flush_offset, &mut sink, &mut cutter);
    assert_eq!(status, Status::Abort);
}

#[test]
fn server_direction_skips_preface() {
    let mut scanner = Scanner::new(Direction::ServerToClient);
    let mut sink = NullEventSink;
    let mut cutter = PassthroughDataCutter;
    let mut flush_offset = 0usize;

    let mut frame = header(0, h2fs_pdftok::h2fs::frame_type::SETTINGS, 0, 0).to_vec();
    let status = scanner.scan(&frame, &mut flush_offset, &mut sink, &mut cutter);
    assert_eq!(status, Status::Flush);
    assert_eq!(flush_offset, frame.len());
    frame.clear();
}

#[test]
fn data_frame_flushes_via_cutter() {
    let mut scanner = Scanner::new(Direction::ServerToClient);
    let mut sink = NullEventSink;
    let mut cutter = PassthroughDataCutter;
    let mut flush_offset = 0usize;

    let mut frame = header(5, h2fs_pdftok::h2fs::frame_type::DATA, 1, 1).to_vec();
    frame.extend_from_slice(b"hello");
    let status = scanner.scan(&frame, &mut flush_offset, &mut sink, &mut cutter);
    assert_eq!(status, Status::Flush);
    assert_eq!(flush_offset, frame.len());
}

#[test]
fn headers_without_end_headers_waits_for_continuation() {
    let mut scanner = Scanner::new(Direction::ServerToClient);
    let mut sink = NullEventSink;
    let mut cutter = PassthroughDataCutter;
    let mut flush_offset = 0usize;

    let mut frame = header(3, h2fs_pdftok::h2fs::frame_type::HEADERS, 0, 1).to_vec();
    frame.extend_from_slice(b"abc");
    let status = scanner.scan(&frame, &mut flush_offset, &mut sink, &mut cutter);
    assert_eq!(status, Status::Search);
}

#[test]
fn headers_then_continuation_flushes_as_one_pdu() {
    let mut scanner = Scanner::new(Direction::ServerToClient);
    let mut sink = NullEventSink;
    let mut cutter = PassthroughDataCutter;
    let mut flush_offset = 0usize;

    let mut chunk = header(3, h2fs_pdftok::h2fs::frame_type::HEADERS, 0, 1).to_vec();
    chunk.extend_from_slice(b"abc");
    chunk.extend_from_slice(&header(2, h2fs_pdftok::h2fs::frame_type::CONTINUATION, 4, 1));
    chunk.extend_from_slice(b"de");

    let status = scanner.scan(&chunk, &mut flush_offset, &mut sink, &mut cutter);
    assert_eq!(status, Status::Flush);
    assert_eq!(flush_offset, chunk.len());
    assert_eq!(scanner.state().num_frame_headers(), 2);
}

#[test]
fn unexpected_continuation_aborts() {
    let mut scanner = Scanner::new(Direction::ServerToClient);
    let mut sink = NullEventSink;
    let mut cutter = PassthroughDataCutter;
    let mut flush_offset = 0usize;

    let mut chunk = header(2, h2fs_pdftok::h2fs::frame_type::CONTINUATION, 4, 1).to_vec();
    chunk.extend_from_slice(b"de");
    let status = scanner.scan(&chunk, &mut flush_offset, &mut sink, &mut cutter);
    assert_eq!(status, Status::Abort);
}

#[test]
fn push_promise_is_rejected() {
    let mut scanner = Scanner::new(Direction::ServerToClient);
    let mut sink = NullEventSink;
    let mut cutter = PassthroughDataCutter;
    let mut flush_offset = 0usize;

    let frame = header(0, h2fs_pdftok::h2fs::frame_type::PUSH_PROMISE, 0, 1);
    let status = scanner.scan(&frame, &mut flush_offset, &mut sink, &mut cutter);
    assert_eq!(status, Status::Abort);
}

#[test]
fn zero_length_data_frame_aborts() {
    let mut scanner = Scanner::new(Direction::ServerToClient);
    let mut sink = NullEventSink;
    let mut cutter = PassthroughDataCutter;
    let mut flush_offset = 0usize;

    let frame = header(0, h2fs_pdftok::h2fs::frame_type::DATA, 0, 1);
    let status = scanner.scan(&frame, &mut flush_offset, &mut sink, &mut cutter);
    assert_eq!(status, Status::Abort);
}

#[test]
fn oversized_frame_aborts() {
    let mut scanner = Scanner::new(Direction::ServerToClient);
    let mut sink = NullEventSink;
    let mut cutter = PassthroughDataCutter;
    let mut flush_offset = 0usize;

    let frame = header(u32::from(u16::MAX) + 1, h2fs_pdftok::h2fs::frame_type::SETTINGS, 0, 0);
    let status = scanner.scan(&frame, &mut flush_offset, &mut sink, &mut cutter);
    assert_eq!(status, Status::Abort);
}
