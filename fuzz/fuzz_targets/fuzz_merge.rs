#![no_main]

use arbitrary::Arbitrary;
use hotconf::{DocNode, combine_dict, combine_list, deep_merge, parse_str};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    lhs: String,
    rhs: String,
}

fuzz_target!(|input: Input| {
    // aliases can expand exponentially; parsing them is covered elsewhere
    if input.lhs.contains('*') || input.rhs.contains('*') {
        return;
    }

    let (Ok(lhs), Ok(rhs)) = (
        parse_str(&input.lhs, "lhs.yaml"),
        parse_str(&input.rhs, "rhs.yaml"),
    ) else {
        return;
    };

    // === Merging fails on mismatched types but never panics ===
    if let Ok(merged) = deep_merge(&lhs, &rhs) {
        assert_eq!(merged.node_type(), lhs.node_type());
        let _ = merged.to_string();
    }

    let docs: Vec<DocNode> = vec![lhs, rhs];
    let _ = combine_list(&docs);
    let _ = combine_dict(&docs);
});
