//! Tests for the UTF-16BE re-encoding primitives in isolation from the
//! lexer that drives them.

use h2fs_pdftok::pdftok::utf16::{u16_to_u8, Utf16Accumulator};

#[test]
fn bmp_code_point_round_trips() {
    let mut acc = Utf16Accumulator::new();
    let mut code_point = None;
    for b in [0x00, 0x41] {
        if let Some(cp) = acc.u16_eval(b).unwrap() {
            code_point = Some(cp);
        }
    }
    let mut out = Vec::new();
    u16_to_u8(code_point.unwrap(), &mut out);
    assert_eq!(out, b"A");
}

#[test]
fn surrogate_pair_round_trips_to_four_byte_utf8() {
    // U+1D11E MUSICAL SYMBOL G CLEF
    let mut acc = Utf16Accumulator::new();
    let mut code_point = None;
    for b in [0xD8, 0x34, 0xDD, 0x1E] {
        if let Some(cp) = acc.u16_eval(b).unwrap() {
            code_point = Some(cp);
        }
    }
    let mut out = Vec::new();
    u16_to_u8(code_point.unwrap(), &mut out);
    assert_eq!(out, vec![0xF0, 0x9D, 0x84, 0x9E]);
}

#[test]
fn three_byte_utf8_range() {
    let mut acc = Utf16Accumulator::new();
    let mut code_point = None;
    for b in [0x4E, 0x2D] {
        // U+4E2D, "中"
        if let Some(cp) = acc.u16_eval(b).unwrap() {
            code_point = Some(cp);
        }
    }
    let mut out = Vec::new();
    u16_to_u8(code_point.unwrap(), &mut out);
    assert_eq!(out, "中".as_bytes());
}
