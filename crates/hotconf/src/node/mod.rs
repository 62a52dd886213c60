//! The configuration tree value.
//!
//! Every configuration file becomes a [`DocNode`]: a dictionary, a list, a
//! scalar string or `Invalid` (no value at all). A node has one of two
//! backings that share a single read contract:
//!
//! - [`YamlDocNode`], a read-only view into a parsed document;
//! - [`ComposedDocNode`], an owned node that can be edited in place.
//!
//! Reads never coerce. Asking a list for a key or a scalar for its length
//! fails with [`Error::NodeAccess`], carrying both shapes and the node's
//! provenance.
//!
//! # Equality
//!
//! Two nodes are equal when their values are, whatever their backing:
//! dictionaries compare as key sets, lists in order, scalars by text. The
//! provenance string never takes part. [`Hash`] follows the same rules.
//!
//! # Example
//!
//! ```rust
//! use hotconf::{ComposedDocNode, DocNode, parse_str};
//!
//! let parsed = parse_str("b: 2\na: 1", "a.yaml").unwrap();
//! let built = DocNode::from(ComposedDocNode::dictionary([
//!     ("a", ComposedDocNode::scalar("1").into()),
//!     ("b", ComposedDocNode::scalar("2").into()),
//! ]));
//! assert_eq!(parsed, built);
//! ```

mod composed;
mod merge;
mod yaml;

use std::borrow::Cow;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};

use serde::ser::{Error as _, SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

pub use composed::ComposedDocNode;
pub use merge::{combine_dict, combine_list, deep_merge, merge_all};
pub use yaml::{Pairs as YamlPairs, SourceLocation, Values as YamlValues, YamlDocNode};

use crate::error::{Error, Result};

/// Shape of a [`DocNode`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DocNodeType {
    /// No value.
    Invalid,

    /// String-keyed mapping.
    Dictionary,

    /// Ordered sequence.
    List,

    /// Single string payload.
    Scalar,
}

impl fmt::Display for DocNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Invalid => "Invalid",
            Self::Dictionary => "Dictionary",
            Self::List => "List",
            Self::Scalar => "Scalar",
        };
        f.write_str(name)
    }
}

/// Compares two dictionary keys, optionally folding case.
pub(crate) fn key_eq(a: &str, b: &str, ignore_case: bool) -> bool {
    if ignore_case {
        a.chars()
            .flat_map(char::to_lowercase)
            .eq(b.chars().flat_map(char::to_lowercase))
    } else {
        a == b
    }
}

/// A configuration tree node.
#[derive(Clone, Debug)]
pub enum DocNode {
    /// View into a parsed document.
    Yaml(YamlDocNode),

    /// Owned, editable node.
    Composed(ComposedDocNode),
}

impl From<YamlDocNode> for DocNode {
    fn from(view: YamlDocNode) -> Self {
        Self::Yaml(view)
    }
}

impl From<ComposedDocNode> for DocNode {
    fn from(node: ComposedDocNode) -> Self {
        Self::Composed(node)
    }
}

impl DocNode {
    /// Shape of this node; never changes.
    #[must_use]
    pub fn node_type(&self) -> DocNodeType {
        match self {
            Self::Yaml(view) => view.node_type(),
            Self::Composed(node) => node.node_type(),
        }
    }

    /// Number of children of a list or dictionary.
    ///
    /// # Errors
    ///
    /// [`Error::NodeAccess`] for scalars and `Invalid`.
    pub fn len(&self) -> Result<usize> {
        match self {
            Self::Yaml(view) => view.len(),
            Self::Composed(node) => node.len(),
        }
    }

    /// Whether a list or dictionary has no children.
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// List element at `index`.
    ///
    /// # Errors
    ///
    /// [`Error::NodeAccess`] for non-lists, [`Error::IndexOutOfRange`] past
    /// the end.
    pub fn at(&self, index: usize) -> Result<Cow<'_, Self>> {
        match self {
            Self::Yaml(view) => view.at(index).map(|child| Cow::Owned(Self::Yaml(child))),
            Self::Composed(node) => node.at(index).map(Cow::Borrowed),
        }
    }

    /// Dictionary value under `key`, compared case-sensitively.
    ///
    /// # Errors
    ///
    /// [`Error::NodeAccess`] for non-dictionaries, [`Error::MissingKey`] when
    /// the key is absent.
    pub fn get(&self, key: &str) -> Result<Cow<'_, Self>> {
        match self {
            Self::Yaml(view) => view.get(key).map(|child| Cow::Owned(Self::Yaml(child))),
            Self::Composed(node) => node.get(key).map(Cow::Borrowed),
        }
    }

    /// Dictionary value under `key`, `None` when absent.
    pub fn try_get(&self, key: &str, ignore_case: bool) -> Result<Option<Cow<'_, Self>>> {
        match self {
            Self::Yaml(view) => Ok(view
                .try_get(key, ignore_case)?
                .map(|child| Cow::Owned(Self::Yaml(child)))),
            Self::Composed(node) => Ok(node.try_get(key, ignore_case)?.map(Cow::Borrowed)),
        }
    }

    /// Whether the dictionary holds `key`.
    pub fn contains_key(&self, key: &str, ignore_case: bool) -> Result<bool> {
        match self {
            Self::Yaml(view) => view.contains_key(key, ignore_case),
            Self::Composed(node) => node.contains_key(key, ignore_case),
        }
    }

    /// Whether the list holds an element equal to `item`.
    pub fn contains(&self, item: &Self) -> Result<bool> {
        Ok(self.values()?.any(|value| *value == *item))
    }

    /// Iterator over list elements. Calling it again starts over.
    pub fn values(&self) -> Result<Values<'_>> {
        match self {
            Self::Yaml(view) => view.values().map(Values::Yaml),
            Self::Composed(node) => node.list_items().map(|items| Values::Composed(items.iter())),
        }
    }

    /// Iterator over dictionary entries in the backing's natural order.
    pub fn pairs(&self) -> Result<Pairs<'_>> {
        match self {
            Self::Yaml(view) => view.pairs().map(Pairs::Yaml),
            Self::Composed(node) => node.dict_entries().map(|map| Pairs::Composed(map.iter())),
        }
    }

    /// Text of a scalar.
    pub fn string_value(&self) -> Result<&str> {
        match self {
            Self::Yaml(view) => view.string_value(),
            Self::Composed(node) => node.string_value(),
        }
    }

    /// Provenance of this node, for diagnostics only.
    #[must_use]
    pub fn source_information(&self) -> String {
        match self {
            Self::Yaml(view) => view.source_information(),
            Self::Composed(node) => node.source_information(),
        }
    }

    /// Replaces the text of a composed scalar.
    ///
    /// # Errors
    ///
    /// [`Error::ReadOnly`] on a parsed view.
    pub fn set_string_value(&mut self, text: impl Into<String>) -> Result<()> {
        self.composed_mut()?.set_string_value(text)
    }

    /// Replaces the element at `index` of a composed list.
    pub fn set_at(&mut self, index: usize, node: Self) -> Result<()> {
        self.composed_mut()?.set_at(index, node)
    }

    /// Inserts or replaces `key` in a composed dictionary.
    pub fn set(&mut self, key: impl Into<String>, node: Self) -> Result<()> {
        self.composed_mut()?.set(key, node)
    }

    /// The composed node, if this is one.
    #[must_use]
    pub const fn as_composed(&self) -> Option<&ComposedDocNode> {
        match self {
            Self::Composed(node) => Some(node),
            Self::Yaml(_) => None,
        }
    }

    /// The composed node, if this is one.
    pub const fn as_composed_mut(&mut self) -> Option<&mut ComposedDocNode> {
        match self {
            Self::Composed(node) => Some(node),
            Self::Yaml(_) => None,
        }
    }

    /// The parsed view, if this is one.
    #[must_use]
    pub const fn as_yaml(&self) -> Option<&YamlDocNode> {
        match self {
            Self::Yaml(view) => Some(view),
            Self::Composed(_) => None,
        }
    }

    fn composed_mut(&mut self) -> Result<&mut ComposedDocNode> {
        match self {
            Self::Composed(node) => Ok(node),
            Self::Yaml(view) => Err(Error::read_only("YamlDocNode", view.source_information())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Iterators
// ─────────────────────────────────────────────────────────────────────────────

/// List elements of a [`DocNode`].
#[derive(Clone, Debug)]
pub enum Values<'a> {
    /// Elements of a parsed list.
    Yaml(yaml::Values<'a>),

    /// Elements of a composed list.
    Composed(std::slice::Iter<'a, DocNode>),
}

impl<'a> Iterator for Values<'a> {
    type Item = Cow<'a, DocNode>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Yaml(iter) => iter.next().map(|view| Cow::Owned(DocNode::Yaml(view))),
            Self::Composed(iter) => iter.next().map(Cow::Borrowed),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::Yaml(iter) => iter.size_hint(),
            Self::Composed(iter) => iter.size_hint(),
        }
    }
}

impl ExactSizeIterator for Values<'_> {}

/// Dictionary entries of a [`DocNode`].
#[derive(Clone, Debug)]
pub enum Pairs<'a> {
    /// Entries of a parsed mapping.
    Yaml(yaml::Pairs<'a>),

    /// Entries of a composed dictionary.
    Composed(indexmap::map::Iter<'a, String, DocNode>),
}

impl<'a> Iterator for Pairs<'a> {
    type Item = (&'a str, Cow<'a, DocNode>);

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Yaml(iter) => iter
                .next()
                .map(|(key, view)| (key, Cow::Owned(DocNode::Yaml(view)))),
            Self::Composed(iter) => iter
                .next()
                .map(|(key, node)| (key.as_str(), Cow::Borrowed(node))),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Self::Yaml(iter) => iter.size_hint(),
            Self::Composed(iter) => iter.size_hint(),
        }
    }
}

impl ExactSizeIterator for Pairs<'_> {}

// ─────────────────────────────────────────────────────────────────────────────
// Value semantics
// ─────────────────────────────────────────────────────────────────────────────

impl PartialEq for DocNode {
    fn eq(&self, other: &Self) -> bool {
        let node_type = self.node_type();
        if node_type != other.node_type() {
            return false;
        }

        match node_type {
            DocNodeType::Invalid => true,
            DocNodeType::Scalar => self.string_value().ok() == other.string_value().ok(),
            DocNodeType::List => match (self.values(), other.values()) {
                (Ok(lhs), Ok(rhs)) => lhs.len() == rhs.len() && lhs.eq(rhs),
                _ => false,
            },
            DocNodeType::Dictionary => match (self.pairs(), other.len()) {
                (Ok(pairs), Ok(other_len)) => {
                    pairs.len() == other_len
                        && pairs.into_iter().all(|(key, value)| {
                            matches!(other.try_get(key, false), Ok(Some(found)) if found == value)
                        })
                }
                _ => false,
            },
        }
    }
}

impl Eq for DocNode {}

impl Hash for DocNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        let node_type = self.node_type();
        node_type.hash(state);

        match node_type {
            DocNodeType::Invalid => {}
            DocNodeType::Scalar => self.string_value().unwrap_or_default().hash(state),
            DocNodeType::List => {
                if let Ok(values) = self.values() {
                    values.len().hash(state);
                    for value in values {
                        value.hash(state);
                    }
                }
            }
            DocNodeType::Dictionary => {
                if let Ok(pairs) = self.pairs() {
                    let len = pairs.len();
                    // Entry hashes are summed so iteration order drops out.
                    let combined = pairs.fold(0u64, |acc, (key, value)| {
                        let mut entry = DefaultHasher::new();
                        key.hash(&mut entry);
                        value.hash(&mut entry);
                        acc.wrapping_add(entry.finish())
                    });
                    len.hash(state);
                    combined.hash(state);
                }
            }
        }
    }
}

impl Serialize for DocNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.node_type() {
            DocNodeType::Invalid => serializer.serialize_unit(),
            DocNodeType::Scalar => {
                serializer.serialize_str(self.string_value().map_err(S::Error::custom)?)
            }
            DocNodeType::List => {
                let values = self.values().map_err(S::Error::custom)?;
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(&*value)?;
                }
                seq.end()
            }
            DocNodeType::Dictionary => {
                let pairs = self.pairs().map_err(S::Error::custom)?;
                let mut map = serializer.serialize_map(Some(pairs.len()))?;
                for (key, value) in pairs {
                    map.serialize_entry(key, &*value)?;
                }
                map.end()
            }
        }
    }
}

#[cfg(feature = "json")]
impl DocNode {
    /// Renders the tree as JSON. Scalars become strings, `Invalid` becomes
    /// `null`.
    ///
    /// # Errors
    ///
    /// Only if a node changes shape while being written, which owned trees
    /// cannot do.
    pub fn to_json_string(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

/// Flow-style rendering: `{a: 1, b: [x, y]}`.
impl fmt::Display for DocNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node_type() {
            DocNodeType::Invalid => f.write_str("<invalid>"),
            DocNodeType::Scalar => f.write_str(self.string_value().unwrap_or_default()),
            DocNodeType::List => {
                f.write_str("[")?;
                for (i, value) in self.values().into_iter().flatten().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str("]")
            }
            DocNodeType::Dictionary => {
                f.write_str("{")?;
                for (i, (key, value)) in self.pairs().into_iter().flatten().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                f.write_str("}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::yaml::parse_str;

    fn parse(text: &str) -> DocNode {
        parse_str(text, "test.yaml").unwrap()
    }

    #[test]
    fn test_key_eq_folds_unicode() {
        assert!(key_eq("ÜBER", "über", true));
        assert!(!key_eq("ÜBER", "über", false));
    }

    #[test]
    fn test_backings_compare_by_value() {
        let parsed = parse("a: [1, 2]\nb: x\n");
        let composed = DocNode::from(ComposedDocNode::deep_clone(&parsed).unwrap());
        assert_eq!(parsed, composed);
    }

    #[test]
    fn test_dictionary_order_ignored() {
        assert_eq!(parse("a: 1\nb: 2\n"), parse("b: 2\na: 1\n"));
        assert_ne!(parse("[1, 2]"), parse("[2, 1]"));
    }

    #[test]
    fn test_hash_consistent_with_eq() {
        let mut set = HashSet::new();
        set.insert(parse("a: 1\nb: [x]\n"));
        assert!(set.contains(&parse("b: [x]\na: 1\n")));
        assert!(!set.contains(&parse("a: 1\nb: [y]\n")));
    }

    #[test]
    fn test_invalid_nodes_are_equal() {
        assert_eq!(parse(""), parse(""));
        assert_ne!(parse(""), parse("x"));
    }

    #[test]
    fn test_views_are_read_only() {
        let mut doc = parse("a: 1\n");
        assert!(matches!(
            doc.set("b", ComposedDocNode::scalar("2").into()),
            Err(Error::ReadOnly { .. })
        ));
    }

    #[test]
    fn test_contains() {
        let doc = parse("[a, b]");
        assert!(doc.contains(&ComposedDocNode::scalar("b").into()).unwrap());
        assert!(!doc.contains(&ComposedDocNode::scalar("c").into()).unwrap());
    }

    #[test]
    fn test_display_flow_style() {
        let doc = parse("a: 1\nb: [x, y]\n");
        assert_eq!(doc.to_string(), "{a: 1, b: [x, y]}");
    }

    #[test]
    fn test_serialize_to_json() {
        let doc = parse("name: demo\ntags: [a, b]\n");
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json, serde_json::json!({"name": "demo", "tags": ["a", "b"]}));
    }
}
