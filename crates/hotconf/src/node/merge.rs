//! Merging and combining documents.
//!
//! [`deep_merge`] is the recursive union used to layer configuration files
//! on top of each other. Conflicting scalars resolve to the right-hand side,
//! so folding a sequence of files left to right means the last file wins.
//! [`combine_list`] and [`combine_dict`] are the flat helpers behind combined
//! files.

use crate::error::{Error, Result};
use crate::node::{ComposedDocNode, DocNode, DocNodeType};

fn provenance<'a>(prefix: &str, docs: impl IntoIterator<Item = &'a DocNode>) -> String {
    let parts: Vec<String> = docs.into_iter().map(DocNode::source_information).collect();
    format!("{prefix}: [{}]", parts.join(", "))
}

/// Recursively merges `rhs` into `lhs`, producing a new node.
///
/// - scalars: `rhs` wins;
/// - lists: `lhs` elements followed by `rhs` elements;
/// - dictionaries: union of keys, values present on both sides merged
///   recursively.
///
/// Neither input is modified.
///
/// # Errors
///
/// [`Error::MergeTypeMismatch`] when the types differ, [`Error::InvalidMerge`]
/// for two `Invalid` nodes.
///
/// # Example
///
/// ```rust
/// use hotconf::{deep_merge, parse_str};
///
/// let base = parse_str("server: {host: localhost, port: 80}", "base.yaml").unwrap();
/// let local = parse_str("server: {port: 8080}", "local.yaml").unwrap();
///
/// let merged = deep_merge(&base, &local).unwrap();
/// let server = merged.get("server").unwrap();
/// assert_eq!(server.get("host").unwrap().string_value().unwrap(), "localhost");
/// assert_eq!(server.get("port").unwrap().string_value().unwrap(), "8080");
/// ```
pub fn deep_merge(lhs: &DocNode, rhs: &DocNode) -> Result<DocNode> {
    let node_type = lhs.node_type();
    if node_type != rhs.node_type() {
        return Err(Error::MergeTypeMismatch {
            lhs: node_type,
            lhs_source: lhs.source_information(),
            rhs: rhs.node_type(),
            rhs_source: rhs.source_information(),
        });
    }

    match node_type {
        DocNodeType::Scalar => Ok(rhs.clone()),
        DocNodeType::List => {
            let items = lhs.values()?.chain(rhs.values()?).map(|item| item.into_owned());
            Ok(ComposedDocNode::list(items)
                .with_source_info(provenance("Combination of", [lhs, rhs]))
                .into())
        }
        DocNodeType::Dictionary => {
            let mut result = ComposedDocNode::with_capacity(DocNodeType::Dictionary, lhs.len()?)?
                .with_source_info(provenance("Merging of", [lhs, rhs]));

            for (key, value) in lhs.pairs()? {
                result.set(key, value.into_owned())?;
            }

            for (key, value) in rhs.pairs()? {
                let merged = match result.try_get(key, false)? {
                    Some(existing) => deep_merge(existing, &value)?,
                    None => value.into_owned(),
                };
                result.set(key, merged)?;
            }

            Ok(result.into())
        }
        DocNodeType::Invalid => Err(Error::InvalidMerge {
            node_type,
            source_info: lhs.source_information(),
        }),
    }
}

/// Folds `docs` left to right with [`deep_merge`]. `None` when `docs` is
/// empty.
pub fn merge_all<'a>(docs: impl IntoIterator<Item = &'a DocNode>) -> Result<Option<DocNode>> {
    let mut docs = docs.into_iter();
    let Some(first) = docs.next() else {
        return Ok(None);
    };

    let mut merged = first.clone();
    for doc in docs {
        merged = deep_merge(&merged, doc)?;
    }
    Ok(Some(merged))
}

/// Combines `docs` into one list. List documents are flattened, anything
/// else is appended as a single element.
#[must_use]
pub fn combine_list(docs: &[DocNode]) -> DocNode {
    let mut items = Vec::new();
    for doc in docs {
        match doc.values() {
            Ok(values) => items.extend(values.map(|item| item.into_owned())),
            Err(_) => items.push(doc.clone()),
        }
    }

    ComposedDocNode::list(items)
        .with_source_info(provenance("Combination of", docs))
        .into()
}

/// Combines dictionary `docs` into one dictionary. Top-level keys of later
/// documents replace those of earlier ones; nothing is merged recursively.
///
/// # Errors
///
/// [`Error::NodeAccess`] if any document is not a dictionary.
pub fn combine_dict(docs: &[DocNode]) -> Result<DocNode> {
    let mut result = ComposedDocNode::new(DocNodeType::Dictionary)?
        .with_source_info(provenance("Combination of", docs));

    for doc in docs {
        for (key, value) in doc.pairs()? {
            result.set(key, value.into_owned())?;
        }
    }

    Ok(result.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yaml::parse_str;

    fn parse(text: &str, name: &str) -> DocNode {
        parse_str(text, name).unwrap()
    }

    #[test]
    fn test_scalar_rhs_wins() {
        let merged = deep_merge(&parse("a", "l.yaml"), &parse("b", "r.yaml")).unwrap();
        assert_eq!(merged.string_value().unwrap(), "b");
    }

    #[test]
    fn test_list_concatenates_without_dedup() {
        let merged = deep_merge(&parse("[1, 2]", "l.yaml"), &parse("[2, 3]", "r.yaml")).unwrap();
        assert_eq!(merged, parse("[1, 2, 2, 3]", "expected.yaml"));
        assert!(merged.source_information().starts_with("Combination of: [File: l.yaml"));
    }

    #[test]
    fn test_dictionary_merge_provenance() {
        let merged = deep_merge(&parse("a: 1", "l.yaml"), &parse("b: 2", "r.yaml")).unwrap();
        let info = merged.source_information();
        assert!(info.starts_with("Merging of: [File: l.yaml"));
        assert!(info.contains("File: r.yaml"));
    }

    #[test]
    fn test_nested_conflict_resolved_recursively() {
        let lhs = parse("db: {host: a, opts: [x]}\nkeep: 1\n", "l.yaml");
        let rhs = parse("db: {host: b, opts: [y]}\n", "r.yaml");
        let merged = deep_merge(&lhs, &rhs).unwrap();
        assert_eq!(
            merged,
            parse("db: {host: b, opts: [x, y]}\nkeep: 1\n", "expected.yaml")
        );
    }

    #[test]
    fn test_inputs_untouched() {
        let lhs = parse("a: 1", "l.yaml");
        let rhs = parse("a: 2", "r.yaml");
        let _ = deep_merge(&lhs, &rhs).unwrap();
        assert_eq!(lhs.get("a").unwrap().string_value().unwrap(), "1");
    }

    #[test]
    fn test_mismatch_fails() {
        let err = deep_merge(&parse("[1]", "l.yaml"), &parse("a: 1", "r.yaml")).unwrap_err();
        assert!(matches!(
            err,
            Error::MergeTypeMismatch {
                lhs: DocNodeType::List,
                rhs: DocNodeType::Dictionary,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_fails() {
        let err = deep_merge(&parse("", "l.yaml"), &parse("", "r.yaml")).unwrap_err();
        assert!(matches!(err, Error::InvalidMerge { .. }));
    }

    #[test]
    fn test_merge_all_last_wins() {
        let docs = [
            parse("a: 1\nb: 1", "1.yaml"),
            parse("a: 2", "2.yaml"),
            parse("a: 3", "3.yaml"),
        ];
        let merged = merge_all(&docs).unwrap().unwrap();
        assert_eq!(merged, parse("a: 3\nb: 1", "expected.yaml"));
        assert!(merge_all(&[]).unwrap().is_none());
    }

    #[test]
    fn test_combine_list_flattens_lists() {
        let docs = [parse("[a, b]", "1.yaml"), parse("c", "2.yaml"), parse("[d]", "3.yaml")];
        assert_eq!(combine_list(&docs), parse("[a, b, c, d]", "expected.yaml"));
    }

    #[test]
    fn test_combine_dict_is_shallow() {
        let docs = [parse("a: {x: 1}\nb: 1", "1.yaml"), parse("a: {y: 2}", "2.yaml")];
        let combined = combine_dict(&docs).unwrap();
        assert_eq!(combined, parse("a: {y: 2}\nb: 1", "expected.yaml"));
        assert!(
            combined
                .source_information()
                .starts_with("Combination of: [")
        );
    }

    #[test]
    fn test_combine_dict_rejects_lists() {
        let docs = [parse("a: 1", "1.yaml"), parse("[1]", "2.yaml")];
        assert!(matches!(
            combine_dict(&docs),
            Err(Error::NodeAccess { .. })
        ));
    }
}
