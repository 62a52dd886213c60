//! YAML parser that builds arena parse trees.
//!
//! `yaml-rust2` supplies marked parse events; [`TreeBuilder`] turns them into
//! a [`YamlDocument`], a flat arena of nodes addressed by [`NodeId`]. Aliases
//! reuse the id of the anchored node, so the arena is a DAG rather than a
//! strict tree. Nothing in here is exposed mutably: once built, a document is
//! shared behind an `Arc` by every [`YamlDocNode`](crate::node::YamlDocNode)
//! view that points into it.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::Marker;

use crate::error::{Error, Result};
use crate::node::{DocNode, YamlDocNode};

/// Index of a node inside a [`YamlDocument`] arena.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct NodeId(pub(crate) usize);

/// Line/column of a parsed node (both 1-based).
#[derive(Clone, Copy, Debug, Default, Eq, Ord, PartialEq, PartialOrd)]
pub struct Mark {
    /// Line number.
    pub line: usize,

    /// Column number.
    pub col: usize,
}

impl Mark {
    fn from_marker(marker: &Marker) -> Self {
        Self {
            line: marker.line(),
            col: marker.col() + 1,
        }
    }
}

/// Payload of a parsed node.
#[derive(Clone, Debug)]
pub(crate) enum YamlNodeKind {
    /// No value at all (an empty document).
    Invalid,

    /// Raw scalar text.
    Scalar(String),

    /// Sequence children in document order.
    Sequence(Vec<NodeId>),

    /// Mapping entries in document order; keys are always scalar nodes.
    Mapping(Vec<(NodeId, NodeId)>),
}

#[derive(Clone, Debug)]
pub(crate) struct YamlNode {
    pub(crate) kind: YamlNodeKind,
    pub(crate) mark: Mark,
}

/// A parsed YAML document stored as an arena of nodes.
pub struct YamlDocument {
    filename: String,
    nodes: Vec<YamlNode>,
    root: NodeId,
}

impl YamlDocument {
    /// Logical file name the document was parsed from.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Id of the root node.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Number of distinct nodes in the arena.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn node(&self, id: NodeId) -> &YamlNode {
        &self.nodes[id.0]
    }

    /// Text of a scalar node, `None` for any other kind.
    pub(crate) fn scalar(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            YamlNodeKind::Scalar(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Debug for YamlDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YamlDocument")
            .field("filename", &self.filename)
            .field("nodes", &self.nodes.len())
            .finish_non_exhaustive()
    }
}

/// Parse YAML text into a [`DocNode`] rooted at the first document.
///
/// An empty input yields an `Invalid` root node.
///
/// # Example
///
/// ```rust
/// use hotconf::{DocNodeType, parse_str};
///
/// let doc = parse_str("title: My Document", "config.yaml").unwrap();
/// assert_eq!(doc.node_type(), DocNodeType::Dictionary);
/// assert_eq!(doc.get("title").unwrap().string_value().unwrap(), "My Document");
/// ```
///
/// # Errors
///
/// Returns [`Error::Parse`] on syntax errors, non-scalar mapping keys and
/// duplicated keys.
///
/// Aliases share the anchored node, so parsing stays linear in the input.
/// Whole-tree walks (equality, hashing, `Display`, serialization and
/// [`ComposedDocNode::deep_clone`](crate::ComposedDocNode::deep_clone)) see
/// the expanded tree, which nested aliases can make exponentially large.
pub fn parse_str(content: &str, filename: &str) -> Result<DocNode> {
    let document = parse_document(content, filename)?;
    Ok(DocNode::Yaml(YamlDocNode::root(Arc::new(document))))
}

/// Parse YAML text into a bare [`YamlDocument`].
///
/// # Errors
///
/// See [`parse_str`].
pub fn parse_document(content: &str, filename: &str) -> Result<YamlDocument> {
    let mut parser = Parser::new_from_str(content);
    let mut builder = TreeBuilder::new(filename);

    parser
        .load(&mut builder, false) // false = single document only
        .map_err(|e| Error::parse(filename, content, e.marker().index(), e.info()))?;

    builder.finish(content)
}

/// A container being filled while its events stream in.
enum Frame {
    Sequence {
        mark: Mark,
        first: Option<Mark>,
        anchor: usize,
        items: Vec<NodeId>,
    },
    Mapping {
        mark: Mark,
        first: Option<Mark>,
        anchor: usize,
        entries: Vec<(NodeId, NodeId)>,
        pending_key: Option<NodeId>,
    },
}

/// Receives marked events and appends nodes to the arena.
struct TreeBuilder {
    filename: String,
    nodes: Vec<YamlNode>,
    stack: Vec<Frame>,
    anchors: HashMap<usize, NodeId>,
    root: Option<NodeId>,
    /// First structural problem, reported once parsing stops.
    error: Option<(usize, String)>,
}

impl TreeBuilder {
    fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            nodes: Vec::new(),
            stack: Vec::new(),
            anchors: HashMap::new(),
            root: None,
            error: None,
        }
    }

    fn finish(mut self, content: &str) -> Result<YamlDocument> {
        if let Some((index, message)) = self.error {
            return Err(Error::parse(&self.filename, content, index, message));
        }

        let root = match self.root {
            Some(root) => root,
            None => self.alloc(YamlNodeKind::Invalid, Mark::default()),
        };

        Ok(YamlDocument {
            filename: self.filename,
            nodes: self.nodes,
            root,
        })
    }

    fn alloc(&mut self, kind: YamlNodeKind, mark: Mark) -> NodeId {
        self.nodes.push(YamlNode { kind, mark });
        NodeId(self.nodes.len() - 1)
    }

    fn fail(&mut self, marker: &Marker, message: String) {
        if self.error.is_none() {
            self.error = Some((marker.index(), message));
        }
    }

    fn remember_anchor(&mut self, anchor: usize, id: NodeId) {
        if anchor > 0 {
            self.anchors.insert(anchor, id);
        }
    }

    /// Attaches a finished node to the container on top of the stack. `at`
    /// is where the node's own event started.
    fn attach(&mut self, id: NodeId, at: Mark, marker: &Marker) {
        let problem = match self.stack.last_mut() {
            None => {
                self.root.get_or_insert(id);
                None
            }
            Some(Frame::Sequence { items, first, .. }) => {
                first.get_or_insert(at);
                items.push(id);
                None
            }
            Some(Frame::Mapping {
                entries,
                pending_key,
                first,
                ..
            }) => match pending_key.take() {
                Some(key) => {
                    entries.push((key, id));
                    None
                }
                None => {
                    first.get_or_insert(at);
                    *pending_key = Some(id);
                    match &self.nodes[id.0].kind {
                        YamlNodeKind::Scalar(_) => None,
                        _ => Some("mapping keys must be plain scalars".to_string()),
                    }
                }
            },
        };

        if let Some(message) = problem {
            self.fail(marker, message);
        }
    }

    fn check_unique_keys(&mut self, entries: &[(NodeId, NodeId)], marker: &Marker) {
        let mut seen = HashSet::with_capacity(entries.len());
        let mut duplicate = None;
        for (key, _) in entries {
            if let YamlNodeKind::Scalar(text) = &self.nodes[key.0].kind
                && !seen.insert(text.as_str())
            {
                duplicate = Some(text.clone());
                break;
            }
        }

        if let Some(key) = duplicate {
            self.fail(marker, format!("duplicate key '{key}'"));
        }
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        match ev {
            Event::Nothing
            | Event::StreamStart
            | Event::StreamEnd
            | Event::DocumentStart
            | Event::DocumentEnd => {}

            Event::Scalar(value, _style, anchor, _tag) => {
                let mark = Mark::from_marker(&marker);
                let id = self.alloc(YamlNodeKind::Scalar(value), mark);
                self.remember_anchor(anchor, id);
                self.attach(id, mark, &marker);
            }

            Event::SequenceStart(anchor, _tag) => {
                self.stack.push(Frame::Sequence {
                    mark: Mark::from_marker(&marker),
                    first: None,
                    anchor,
                    items: Vec::new(),
                });
            }

            Event::MappingStart(anchor, _tag) => {
                self.stack.push(Frame::Mapping {
                    mark: Mark::from_marker(&marker),
                    first: None,
                    anchor,
                    entries: Vec::new(),
                    pending_key: None,
                });
            }

            Event::SequenceEnd | Event::MappingEnd => {
                let (kind, mark, first, anchor) = match self.stack.pop() {
                    Some(Frame::Sequence {
                        mark,
                        first,
                        anchor,
                        items,
                    }) => (YamlNodeKind::Sequence(items), mark, first, anchor),
                    Some(Frame::Mapping {
                        mark,
                        first,
                        anchor,
                        entries,
                        ..
                    }) => {
                        self.check_unique_keys(&entries, &marker);
                        (YamlNodeKind::Mapping(entries), mark, first, anchor)
                    }
                    None => {
                        self.fail(&marker, "unbalanced collection end".to_string());
                        return;
                    }
                };

                // block collections are marked past their first entry
                let mark = first.map_or(mark, |first| mark.min(first));
                let id = self.alloc(kind, mark);
                self.remember_anchor(anchor, id);
                self.attach(id, mark, &marker);
            }

            Event::Alias(anchor) => match self.anchors.get(&anchor).copied() {
                Some(id) => self.attach(id, Mark::from_marker(&marker), &marker),
                None => self.fail(&marker, format!("unknown alias {anchor}")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalar_root() {
        let doc = parse_document("hello", "a.yaml").unwrap();
        assert_eq!(doc.scalar(doc.root()), Some("hello"));
        assert_eq!(doc.filename(), "a.yaml");
    }

    #[test]
    fn test_scalars_keep_raw_text() {
        let doc = parse_document("[1, 2.5, true, ~]", "a.yaml").unwrap();
        let YamlNodeKind::Sequence(items) = &doc.node(doc.root()).kind else {
            panic!("Expected a sequence");
        };
        let texts: Vec<_> = items.iter().map(|id| doc.scalar(*id).unwrap()).collect();
        assert_eq!(texts, ["1", "2.5", "true", "~"]);
    }

    #[test]
    fn test_empty_document_is_invalid() {
        let doc = parse_document("", "empty.yaml").unwrap();
        assert!(matches!(doc.node(doc.root()).kind, YamlNodeKind::Invalid));
    }

    #[test]
    fn test_only_first_document_is_read() {
        let doc = parse_document("a: 1\n---\nb: 2\n", "multi.yaml").unwrap();
        let YamlNodeKind::Mapping(entries) = &doc.node(doc.root()).kind else {
            panic!("Expected a mapping");
        };
        assert_eq!(entries.len(), 1);
        assert_eq!(doc.scalar(entries[0].0), Some("a"));
    }

    #[test]
    fn test_marks_are_one_based_and_follow_lines() {
        let doc = parse_document("first: 1\nsecond: 2\n", "a.yaml").unwrap();
        let YamlNodeKind::Mapping(entries) = &doc.node(doc.root()).kind else {
            panic!("Expected a mapping");
        };
        let first = doc.node(entries[0].1).mark;
        let second = doc.node(entries[1].1).mark;
        assert!(first.line >= 1);
        assert!(first.col >= 1);
        assert_eq!(second.line, first.line + 1);
    }

    #[test]
    fn test_block_mapping_marked_at_first_key() {
        let doc = parse_document("a: 1\nbb: [x, y]\n", "m.yaml").unwrap();
        assert_eq!(doc.node(doc.root()).mark, Mark { line: 1, col: 1 });

        let YamlNodeKind::Mapping(entries) = &doc.node(doc.root()).kind else {
            panic!("Expected a mapping");
        };
        assert_eq!(doc.node(entries[0].1).mark, Mark { line: 1, col: 4 });
        assert_eq!(doc.node(entries[1].1).mark, Mark { line: 2, col: 5 });
    }

    #[test]
    fn test_flow_mapping_marked_at_brace() {
        let doc = parse_document("{a: 1}", "m.yaml").unwrap();
        assert_eq!(doc.node(doc.root()).mark, Mark { line: 1, col: 1 });
    }

    #[test]
    fn test_alias_reuses_anchored_node() {
        let doc = parse_document("base: &b\n  x: 1\ncopy: *b\n", "a.yaml").unwrap();
        let YamlNodeKind::Mapping(entries) = &doc.node(doc.root()).kind else {
            panic!("Expected a mapping");
        };
        assert_eq!(entries[0].1, entries[1].1);
    }

    #[test]
    fn test_complex_key_rejected() {
        let err = parse_document("? [a, b]\n: value\n", "keys.yaml").unwrap_err();
        assert!(err.to_string().contains("plain scalars"));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let err = parse_document("a: 1\na: 2\n", "dup.yaml").unwrap_err();
        assert!(err.to_string().contains("duplicate key 'a'"));
    }

    #[test]
    fn test_syntax_error_names_file() {
        let err = parse_document("key: [unclosed", "broken.yaml").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains("broken.yaml"));
    }
}
