//! Read-only views over parsed YAML documents.

use std::fmt;
use std::slice;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::node::{DocNodeType, key_eq};
use crate::yaml::{Mark, NodeId, YamlDocument, YamlNodeKind};

const BACKING: &str = "YamlDocNode";

/// A read-only view of one node of a parsed document.
///
/// Cloning a view clones an `Arc`, never the document. Child accessors build
/// a fresh view on every call.
#[derive(Clone)]
pub struct YamlDocNode {
    doc: Arc<YamlDocument>,
    id: NodeId,
}

/// Where a parsed node came from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SourceLocation {
    /// Logical file name.
    pub file: String,

    /// 1-based line.
    pub line: usize,

    /// 1-based column.
    pub col: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

impl YamlDocNode {
    /// View of the root node of `doc`.
    #[must_use]
    pub fn root(doc: Arc<YamlDocument>) -> Self {
        let id = doc.root();
        Self { doc, id }
    }

    fn child(&self, id: NodeId) -> Self {
        Self {
            doc: Arc::clone(&self.doc),
            id,
        }
    }

    fn kind(&self) -> &YamlNodeKind {
        &self.doc.node(self.id).kind
    }

    fn mark(&self) -> Mark {
        self.doc.node(self.id).mark
    }

    fn access_error(&self, expected: &str) -> Error {
        Error::access(BACKING, expected, self.node_type(), self.source_information())
    }

    fn items(&self) -> Result<&[NodeId]> {
        match self.kind() {
            YamlNodeKind::Sequence(items) => Ok(items),
            _ => Err(self.access_error("List")),
        }
    }

    fn entries(&self) -> Result<&[(NodeId, NodeId)]> {
        match self.kind() {
            YamlNodeKind::Mapping(entries) => Ok(entries),
            _ => Err(self.access_error("Dictionary")),
        }
    }

    /// Shape of this node.
    #[must_use]
    pub fn node_type(&self) -> DocNodeType {
        match self.kind() {
            YamlNodeKind::Invalid => DocNodeType::Invalid,
            YamlNodeKind::Scalar(_) => DocNodeType::Scalar,
            YamlNodeKind::Sequence(_) => DocNodeType::List,
            YamlNodeKind::Mapping(_) => DocNodeType::Dictionary,
        }
    }

    /// Number of children of a list or dictionary.
    pub fn len(&self) -> Result<usize> {
        match self.kind() {
            YamlNodeKind::Sequence(items) => Ok(items.len()),
            YamlNodeKind::Mapping(entries) => Ok(entries.len()),
            _ => Err(self.access_error("Dictionary or List")),
        }
    }

    /// Whether a list or dictionary has no children.
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// List element at `index`.
    pub fn at(&self, index: usize) -> Result<Self> {
        let items = self.items()?;
        items
            .get(index)
            .map(|id| self.child(*id))
            .ok_or_else(|| Error::IndexOutOfRange {
                index,
                len: items.len(),
                source_info: self.source_information(),
            })
    }

    /// Dictionary value under `key` (case-sensitive).
    pub fn get(&self, key: &str) -> Result<Self> {
        self.try_get(key, false)?.ok_or_else(|| Error::MissingKey {
            key: key.to_string(),
            source_info: self.source_information(),
        })
    }

    /// Dictionary value under `key`, `None` when absent.
    pub fn try_get(&self, key: &str, ignore_case: bool) -> Result<Option<Self>> {
        let found = self
            .entries()?
            .iter()
            .find(|(k, _)| key_eq(self.doc.scalar(*k).unwrap_or_default(), key, ignore_case))
            .map(|(_, v)| self.child(*v));
        Ok(found)
    }

    /// Whether the dictionary holds `key`.
    pub fn contains_key(&self, key: &str, ignore_case: bool) -> Result<bool> {
        self.try_get(key, ignore_case).map(|found| found.is_some())
    }

    /// Iterator over list elements in document order.
    pub fn values(&self) -> Result<Values<'_>> {
        Ok(Values {
            owner: self,
            ids: self.items()?.iter(),
        })
    }

    /// Iterator over dictionary entries in document order.
    pub fn pairs(&self) -> Result<Pairs<'_>> {
        Ok(Pairs {
            owner: self,
            entries: self.entries()?.iter(),
        })
    }

    /// Text of a scalar.
    pub fn string_value(&self) -> Result<&str> {
        match self.kind() {
            YamlNodeKind::Scalar(text) => Ok(text),
            _ => Err(self.access_error("Scalar")),
        }
    }

    /// File, line and column of this node.
    #[must_use]
    pub fn location(&self) -> SourceLocation {
        let mark = self.mark();
        SourceLocation {
            file: self.doc.filename().to_string(),
            line: mark.line,
            col: mark.col,
        }
    }

    /// Provenance string in the `File: <name>, Line: <n>, Col: <n>` form.
    #[must_use]
    pub fn source_information(&self) -> String {
        let mark = self.mark();
        format!(
            "File: {}, Line: {}, Col: {}",
            self.doc.filename(),
            mark.line,
            mark.col
        )
    }

    /// Whether both views point into the same parsed document.
    #[must_use]
    pub fn shares_document(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.doc, &other.doc)
    }
}

impl fmt::Debug for YamlDocNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("YamlDocNode")
            .field("type", &self.node_type())
            .field("location", &self.location().to_string())
            .finish()
    }
}

/// List elements of a [`YamlDocNode`].
#[derive(Clone, Debug)]
pub struct Values<'a> {
    owner: &'a YamlDocNode,
    ids: slice::Iter<'a, NodeId>,
}

impl Iterator for Values<'_> {
    type Item = YamlDocNode;

    fn next(&mut self) -> Option<Self::Item> {
        self.ids.next().map(|id| self.owner.child(*id))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl ExactSizeIterator for Values<'_> {}

/// Dictionary entries of a [`YamlDocNode`].
#[derive(Clone, Debug)]
pub struct Pairs<'a> {
    owner: &'a YamlDocNode,
    entries: slice::Iter<'a, (NodeId, NodeId)>,
}

impl<'a> Iterator for Pairs<'a> {
    type Item = (&'a str, YamlDocNode);

    fn next(&mut self) -> Option<Self::Item> {
        let (key, value) = self.entries.next()?;
        let owner: &'a YamlDocNode = self.owner;
        let key = owner.doc.scalar(*key).unwrap_or_default();
        Some((key, owner.child(*value)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

impl ExactSizeIterator for Pairs<'_> {}
