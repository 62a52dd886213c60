#![no_main]

use hotconf::glob::{filter_matching, glob_to_regex};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let glob = String::from_utf8_lossy(data);

    // === Any text is a glob; oversized patterns are errors, not panics ===
    if let Ok(re) = glob_to_regex(&glob) {
        let names = ["a", "a/b", "Folder/1File", glob.as_ref()];
        let _ = filter_matching(&re, names.iter().copied());
    }
});
