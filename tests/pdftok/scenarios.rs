//! End-to-end PDFTok scenarios: `/JS` reference resolution into a
//! stream's source, and UTF-16BE literal-string decoding driven through
//! the full lexer rather than the accumulator directly.

use h2fs_pdftok::pdftok::{JsSink, Lexer};

#[derive(Default)]
struct CollectSink(Vec<u8>);

impl JsSink for CollectSink {
    fn push_js_bytes(&mut self, bytes: &[u8]) {
        self.0.extend_from_slice(bytes);
    }
}

#[test]
fn scenario_js_reference_resolves_into_stream_source() {
    let mut lexer = Lexer::new(CollectSink::default());

    let catalog = b"1 0 obj\n<< /Type /Catalog /OpenAction << /S /JavaScript /JS 2 0 R >> >>\nendobj\n";
    lexer.process(catalog, false).unwrap();
    assert!(lexer.semantic().js_refs.contains(&(2, 0)));

    let js_obj = b"2 0 obj\n<< /Length 24 >>\nstream\napp.alert('hello world');\nendstream\nendobj\n";
    lexer.process(js_obj, true).unwrap();
    assert_eq!(lexer.sink().0, b"app.alert('hello world')\n");
}

#[test]
fn scenario_utf16be_literal_string_decodes_through_the_lexer() {
    let mut lexer = Lexer::new(CollectSink::default());
    lexer.process(b"1 0 obj << /JS 2 0 R >> endobj\n", true).unwrap();

    // (FEFF 0041 D834 DD1E) — BOM, 'A', then the G-clef surrogate pair.
    let mut doc = b"2 0 obj (".to_vec();
    doc.extend_from_slice(&[0xFE, 0xFF, 0x00, 0x41, 0xD8, 0x34, 0xDD, 0x1E]);
    doc.extend_from_slice(b") endobj");

    lexer.process(&doc, true).unwrap();
    let mut expected = b"A".to_vec();
    expected.extend_from_slice(&[0xF0, 0x9D, 0x84, 0x9E]);
    assert_eq!(lexer.sink().0, expected);
}

#[test]
fn scenario_split_across_chunk_boundaries_mid_stream() {
    let mut lexer = Lexer::new(CollectSink::default());
    lexer.process(b"1 0 obj << /JS 2 0 R >> endobj\n", true).unwrap();

    let js_obj = b"2 0 obj << /Length 10 >> stream\nvar x = 1;endstream endobj";
    // Split in the middle of the stream body itself.
    let (first, second) = js_obj.split_at(40);
    lexer.process(first, false).unwrap();
    lexer.process(second, true).unwrap();
    assert_eq!(lexer.sink().0, b"var x = 1;\n");
}
