#![no_main]

use hotconf::{DocNode, DocNodeType, parse_str};
use libfuzzer_sys::fuzz_target;

/// Reads every node of the tree through the public contract. Aliases can
/// make the tree exponentially larger than the input, so the walk stops once
/// `budget` nodes were visited.
fn walk(doc: &DocNode, budget: &mut usize) {
    if *budget == 0 {
        return;
    }
    *budget -= 1;
    let _ = doc.source_information();
    match doc.node_type() {
        DocNodeType::Invalid => {}
        DocNodeType::Scalar => {
            let _ = doc.string_value();
        }
        DocNodeType::List => {
            if let Ok(values) = doc.values() {
                for value in values {
                    walk(&value, budget);
                }
            }
        }
        DocNodeType::Dictionary => {
            if let Ok(pairs) = doc.pairs() {
                for (key, value) in pairs {
                    let _ = doc.contains_key(key, true);
                    walk(&value, budget);
                }
            }
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let content = String::from_utf8_lossy(data);

    // === Parsing may fail but never panics ===
    let Ok(doc) = parse_str(&content, "fuzz.yaml") else {
        return;
    };

    let mut budget = 10_000;
    walk(&doc, &mut budget);
    if budget == 0 {
        return;
    }

    let _ = doc.to_string();
    let _ = serde_json::to_string(&doc);

    // === A parsed tree equals its composed copy ===
    if let Ok(copy) = hotconf::ComposedDocNode::deep_clone(&doc) {
        assert_eq!(DocNode::from(copy), doc);
    }

    // === Common wrappers around the input ===
    for yaml in [
        format!("key: {content}"),
        format!("- {content}"),
        format!("nested:\n  value: {content}"),
    ] {
        let _ = parse_str(&yaml, "wrapped.yaml");
    }
});
