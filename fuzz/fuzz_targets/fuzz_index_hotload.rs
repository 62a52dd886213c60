#![no_main]

use arbitrary::Arbitrary;
use hotconf::source::{ConfigSource, IndexedSource, MemoryReader};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    index: String,
    members: Vec<(String, String)>,
    edits: Vec<(String, Option<String>)>,
}

fuzz_target!(|input: Input| {
    let reader = MemoryReader::new();
    reader.insert("index", input.index);
    for (name, text) in input.members {
        reader.insert(name, text);
    }

    let mut source = IndexedSource::new(reader.clone()).with_hotload(true);
    if source.preload().is_err() {
        return;
    }

    // === Hotloading arbitrary edits never panics and keeps the table consistent ===
    for (name, text) in input.edits {
        match text {
            Some(text) => reader.insert(name, text),
            None => {
                reader.remove(&name);
            }
        }

        let before = source.files().len();
        let mut changed = Vec::new();
        if source.hotload(&mut changed).is_err() {
            assert!(changed.is_empty());
            assert_eq!(source.files().len(), before);
        }
    }
});
