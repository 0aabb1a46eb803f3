#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;
use std::path::Path;

fuzz_target!(|data: &[u8]| {
    // Arbitrary bytes as a JSON-lines file: every row is parsed or rejected,
    // reading from memory never fails as a whole
    let path = Path::new("fuzz.jsonl");
    let source = typeahead::store::ingest::parse_lines(Cursor::new(data), path, |_| {})
        .expect("in-memory JSON lines never fail to read");
    let rows = source.records.len() + source.rejected.len();
    assert!(rows <= data.split(|&b| b == b'\n').count());

    let store = typeahead::store::TextIndexStore::default();
    let report = store.load_rows(source.records);
    assert_eq!(report.loaded, store.len());
    let _ = typeahead::store::ingest::parse_array(Cursor::new(data), Path::new("fuzz.json"));
});
