//! End-to-end scanner+reassembler scenarios, driven the way a real
//! caller would: keep scanning, flush what's indicated, reassemble it,
//! and read back the buffers once the PDU tail arrives.

use h2fs_pdftok::h2fs::{Direction, NullEventSink, PassthroughDataCutter, Reassembler, Scanner, Status, PDU_TAIL};

fn header(length: u32, ftype: u8, flags: u8, stream_id: u32) -> [u8; 9] {
    let l = length.to_be_bytes();
    let s = stream_id.to_be_bytes();
    [l[1], l[2], l[3], ftype, flags, s[0], s[1], s[2], s[3]]
}

/// Drives `scanner` + `reassembler` over a single chunk until `Search` is
/// reached, returning every completed PDU's header/data buffers.
fn drive(scanner: &mut Scanner, reassembler: &mut Reassembler, chunk: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut sink = NullEventSink;
    let mut cutter = PassthroughDataCutter;
    let mut results = Vec::new();
    let mut rest = chunk;

    loop {
        let mut flush_offset = 0usize;
        match scanner.scan(rest, &mut flush_offset, &mut sink, &mut cutter) {
            Status::Search => break,
            Status::Abort => panic!("unexpected abort"),
            Status::Flush => {
                if scanner.last_flush_kind() == h2fs_pdftok::h2fs::FlushKind::Preface {
                    rest = &rest[flush_offset..];
                    continue;
                }
                let sentinel = reassembler.reassemble(scanner.state_mut(), flush_offset, 0, &rest[..flush_offset], PDU_TAIL, &mut cutter);
                if sentinel.is_some() {
                    results.push((reassembler.frame_header().to_vec(), reassembler.frame_data().to_vec()));
                    reassembler.clear();
                }
                rest = &rest[flush_offset..];
            }
        }
    }
    results
}

#[test]
fn scenario_preface_split_across_three_chunks() {
    let mut scanner = Scanner::new(Direction::ClientToServer);
    let mut reassembler = Reassembler::new();
    let preface = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

    let (a, rest) = preface.split_at(5);
    let (b, c) = rest.split_at(10);

    assert!(drive(&mut scanner, &mut reassembler, a).is_empty());
    assert!(drive(&mut scanner, &mut reassembler, b).is_empty());
    assert!(drive(&mut scanner, &mut reassembler, c).is_empty());

    // Preface consumed; a SETTINGS frame now parses normally.
    let settings = header(0, h2fs_pdftok::h2fs::frame_type::SETTINGS, 0, 0);
    let results = drive(&mut scanner, &mut reassembler, &settings);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, settings.to_vec());
}

#[test]
fn scenario_headers_and_continuation_concatenate_into_one_pdu() {
    let mut scanner = Scanner::new(Direction::ServerToClient);
    let mut reassembler = Reassembler::new();

    let mut chunk = header(3, h2fs_pdftok::h2fs::frame_type::HEADERS, 0, 1).to_vec();
    chunk.extend_from_slice(b"abc");
    chunk.extend_from_slice(&header(2, h2fs_pdftok::h2fs::frame_type::CONTINUATION, 4, 1));
    chunk.extend_from_slice(b"de");

    let results = drive(&mut scanner, &mut reassembler, &chunk);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0.len(), 18);
    assert_eq!(results[0].1, b"abcde");
}

#[test]
fn scenario_unexpected_continuation_aborts_the_direction() {
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
fn scenario_padded_data_frame_strips_padding_via_cutter() {
    // DATA padding is the external DataCutter's responsibility
    // (spec.md's "external collaborator" split); PassthroughDataCutter
    // doesn't strip padding itself, so this exercises that the scanner
    // still delivers exactly the frame's payload bytes to it.
    let mut scanner = Scanner::new(Direction::ServerToClient);
    let mut sink = NullEventSink;
    let mut cutter = PassthroughDataCutter;
    let mut flush_offset = 0usize;

    let mut frame = header(6, h2fs_pdftok::h2fs::frame_type::DATA, 1 | 8, 1).to_vec();
    frame.push(2); // pad length
    frame.extend_from_slice(b"xyz");
    frame.extend_from_slice(&[0, 0]);

    let status = scanner.scan(&frame, &mut flush_offset, &mut sink, &mut cutter);
    assert_eq!(status, Status::Flush);
    assert_eq!(flush_offset, frame.len());
}
