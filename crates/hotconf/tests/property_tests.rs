//! Property-based tests for hotconf invariants.
//!
//! These tests verify that critical invariants hold for all possible inputs,
//! not just hand-picked test cases.

#![allow(clippy::pedantic)]

use std::collections::BTreeMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use hotconf::checksum::{checksum, checksum_str};
use hotconf::glob::glob_to_regex;
use hotconf::{ComposedDocNode, DocNode, DocNodeType, deep_merge, parse_str};
use proptest::prelude::*;

fn hash_of(doc: &DocNode) -> u64 {
    let mut hasher = DefaultHasher::new();
    doc.hash(&mut hasher);
    hasher.finish()
}

fn scalar(text: impl Into<String>) -> DocNode {
    ComposedDocNode::scalar(text).into()
}

fn arb_doc() -> impl Strategy<Value = DocNode> {
    let leaf = "[a-z0-9]{0,6}".prop_map(scalar);
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4)
                .prop_map(|items| ComposedDocNode::list(items).into()),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|entries| ComposedDocNode::dictionary(entries).into()),
        ]
    })
}

fn scalar_map() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{1,6}", 0..8)
}

fn dict_of(entries: &BTreeMap<String, String>) -> DocNode {
    ComposedDocNode::dictionary(entries.iter().map(|(k, v)| (k.clone(), scalar(v.clone())))).into()
}

fn yaml_of(entries: &BTreeMap<String, String>) -> String {
    let body: Vec<String> = entries.iter().map(|(k, v)| format!("{k}: {v}")).collect();
    format!("{{{}}}", body.join(", "))
}

// ============================================================================
// Equality and Hash
// ============================================================================

mod equality_properties {
    use super::*;

    proptest! {
        /// A deep clone is equal and hashes the same
        #[test]
        fn deep_clone_equal(doc in arb_doc()) {
            let copy: DocNode = ComposedDocNode::deep_clone(&doc).unwrap().into();
            prop_assert_eq!(&copy, &doc);
            prop_assert_eq!(hash_of(&copy), hash_of(&doc));
        }

        /// Dictionary equality and hash ignore insertion order
        #[test]
        fn dictionary_order_irrelevant(entries in scalar_map()) {
            let forward = dict_of(&entries);
            let backward: DocNode = ComposedDocNode::dictionary(
                entries.iter().rev().map(|(k, v)| (k.clone(), scalar(v.clone()))),
            )
            .into();
            prop_assert_eq!(&forward, &backward);
            prop_assert_eq!(hash_of(&forward), hash_of(&backward));
        }

        /// Parsed and composed backings of the same content are equal
        #[test]
        fn parsed_equals_composed(entries in scalar_map()) {
            let parsed = parse_str(&yaml_of(&entries), "gen.yaml").unwrap();
            let composed = dict_of(&entries);
            prop_assert_eq!(&parsed, &composed);
            prop_assert_eq!(hash_of(&parsed), hash_of(&composed));
        }

        /// contains_key agrees with try_get for both case modes
        #[test]
        fn contains_key_matches_try_get(entries in scalar_map(), key in "[a-zA-Z]{1,6}") {
            let doc = dict_of(&entries);
            for ignore_case in [false, true] {
                prop_assert_eq!(
                    doc.contains_key(&key, ignore_case).unwrap(),
                    doc.try_get(&key, ignore_case).unwrap().is_some()
                );
            }
        }
    }
}

// ============================================================================
// Merge
// ============================================================================

mod merge_properties {
    use super::*;

    proptest! {
        /// Scalar dictionaries: rhs wins, lhs-only keys survive
        #[test]
        fn last_file_wins(lhs in scalar_map(), rhs in scalar_map()) {
            let merged = deep_merge(&dict_of(&lhs), &dict_of(&rhs)).unwrap();

            let mut expected = lhs.clone();
            expected.extend(rhs.clone());
            prop_assert_eq!(merged, dict_of(&expected));
        }

        /// Merging a scalar dictionary with itself is a no-op
        #[test]
        fn self_merge_dictionary(entries in scalar_map()) {
            let doc = dict_of(&entries);
            prop_assert_eq!(deep_merge(&doc, &doc).unwrap(), doc);
        }

        /// Merging a list with itself doubles it
        #[test]
        fn self_merge_list(items in prop::collection::vec("[a-z]{1,4}", 0..8)) {
            let doc: DocNode = ComposedDocNode::list(items.iter().cloned().map(scalar)).into();
            let merged = deep_merge(&doc, &doc).unwrap();
            prop_assert_eq!(merged.len().unwrap(), items.len() * 2);
        }

        /// Merging never changes the node type
        #[test]
        fn merge_preserves_type(doc in arb_doc()) {
            if let Ok(merged) = deep_merge(&doc, &doc) {
                prop_assert_eq!(merged.node_type(), doc.node_type());
            }
        }

        /// Promotion keeps the type and the value
        #[test]
        fn make_mutable_preserves(doc in arb_doc(), recursive in any::<bool>()) {
            prop_assume!(doc.node_type() != DocNodeType::Invalid);
            let promoted: DocNode =
                ComposedDocNode::make_mutable(doc.clone(), recursive, true).unwrap().into();
            prop_assert_eq!(promoted, doc);
        }
    }
}

// ============================================================================
// Parsing, Checksums, Globs
// ============================================================================

mod input_properties {
    use super::*;

    proptest! {
        /// Parsing never panics on any input
        #[test]
        fn parse_never_panics(s in "\\PC{0,64}") {
            let _ = parse_str(&s, "fuzz.yaml");
        }

        /// Checksums are deterministic
        #[test]
        fn checksum_deterministic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(checksum(&bytes), checksum(&bytes));
        }

        /// Appending content changes the checksum
        #[test]
        fn checksum_discriminates(s in "[a-z]{0,32}", extra in "[a-z]{1,4}") {
            let longer = format!("{s}{extra}");
            prop_assert_ne!(checksum_str(&s), checksum_str(&longer));
        }

        /// A plain name is a glob matching itself, case-insensitively
        #[test]
        fn literal_glob_matches_itself(name in "[a-zA-Z0-9_/]{1,16}") {
            let re = glob_to_regex(&name).unwrap();
            prop_assert!(re.is_match(&name));
            prop_assert!(re.is_match(&name.to_uppercase()));
        }

        /// Serialization of any tree succeeds
        #[test]
        fn serialize_never_fails(doc in arb_doc()) {
            prop_assert!(serde_json::to_string(&doc).is_ok());
        }
    }
}
