//! Mutable, programmatically built document nodes.
//!
//! A [`ComposedDocNode`] owns its children outright. It is what merging
//! produces and what callers build when they want to patch a parsed tree:
//! [`ComposedDocNode::make_mutable`] promotes any [`DocNode`] into one,
//! either shallowly (children stay parsed views) or recursively.
//!
//! # Example
//!
//! ```rust
//! use hotconf::{ComposedDocNode, DocNode, DocNodeType, parse_str};
//!
//! let parsed = parse_str("name: demo\nport: 80", "server.yaml").unwrap();
//! let mut patched = ComposedDocNode::make_mutable(parsed, false, false).unwrap();
//! patched.set("port", ComposedDocNode::scalar("8080").into()).unwrap();
//!
//! let doc = DocNode::from(patched);
//! assert_eq!(doc.node_type(), DocNodeType::Dictionary);
//! assert_eq!(doc.get("port").unwrap().string_value().unwrap(), "8080");
//! ```

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::node::{DocNode, DocNodeType, YamlDocNode, key_eq};

const BACKING: &str = "ComposedDocNode";

/// Owned storage of a composed node; the variant is fixed at construction.
#[derive(Clone, Debug)]
enum ComposedValue {
    Dictionary(IndexMap<String, DocNode>),
    List(Vec<DocNode>),
    Scalar(String),
}

/// A mutable document node.
#[derive(Clone, Debug)]
pub struct ComposedDocNode {
    value: ComposedValue,
    source_info: Option<String>,
}

impl ComposedDocNode {
    /// Empty node of the given type.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidComposedType`] for [`DocNodeType::Invalid`].
    pub fn new(node_type: DocNodeType) -> Result<Self> {
        Self::with_capacity(node_type, 0)
    }

    /// Empty node of the given type with room for `capacity` children.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidComposedType`] for [`DocNodeType::Invalid`].
    pub fn with_capacity(node_type: DocNodeType, capacity: usize) -> Result<Self> {
        let value = match node_type {
            DocNodeType::Dictionary => ComposedValue::Dictionary(IndexMap::with_capacity(capacity)),
            DocNodeType::List => ComposedValue::List(Vec::with_capacity(capacity)),
            DocNodeType::Scalar => ComposedValue::Scalar(String::new()),
            DocNodeType::Invalid => {
                return Err(Error::InvalidComposedType {
                    node_type,
                    source_info: format!("{BACKING} {node_type}"),
                });
            }
        };
        Ok(Self {
            value,
            source_info: None,
        })
    }

    /// Scalar node holding `text`.
    #[must_use]
    pub fn scalar(text: impl Into<String>) -> Self {
        Self {
            value: ComposedValue::Scalar(text.into()),
            source_info: None,
        }
    }

    /// List node holding `items` in order.
    #[must_use]
    pub fn list(items: impl IntoIterator<Item = DocNode>) -> Self {
        Self {
            value: ComposedValue::List(items.into_iter().collect()),
            source_info: None,
        }
    }

    /// Dictionary node holding `entries`; a repeated key keeps its first
    /// position and its last value.
    #[must_use]
    pub fn dictionary<K: Into<String>>(entries: impl IntoIterator<Item = (K, DocNode)>) -> Self {
        Self {
            value: ComposedValue::Dictionary(
                entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ),
            source_info: None,
        }
    }

    /// Replaces the provenance string.
    #[must_use]
    pub fn with_source_info(mut self, source_info: impl Into<String>) -> Self {
        self.source_info = Some(source_info.into());
        self
    }

    /// Shape of this node.
    #[must_use]
    pub const fn node_type(&self) -> DocNodeType {
        match self.value {
            ComposedValue::Dictionary(_) => DocNodeType::Dictionary,
            ComposedValue::List(_) => DocNodeType::List,
            ComposedValue::Scalar(_) => DocNodeType::Scalar,
        }
    }

    /// Provenance string; `ComposedDocNode <Type>` unless set explicitly.
    #[must_use]
    pub fn source_information(&self) -> String {
        describe(self.source_info.as_deref(), self.node_type())
    }

    fn access_error(&self, expected: &str) -> Error {
        Error::access(BACKING, expected, self.node_type(), self.source_information())
    }

    fn range_error(&self, index: usize, len: usize) -> Error {
        Error::IndexOutOfRange {
            index,
            len,
            source_info: self.source_information(),
        }
    }

    pub(crate) fn list_items(&self) -> Result<&[DocNode]> {
        match &self.value {
            ComposedValue::List(items) => Ok(items),
            _ => Err(self.access_error("List")),
        }
    }

    fn list_items_mut(&mut self) -> Result<&mut Vec<DocNode>> {
        let node_type = self.node_type();
        match &mut self.value {
            ComposedValue::List(items) => Ok(items),
            _ => Err(Error::access(
                BACKING,
                "List",
                node_type,
                describe(self.source_info.as_deref(), node_type),
            )),
        }
    }

    pub(crate) fn dict_entries(&self) -> Result<&IndexMap<String, DocNode>> {
        match &self.value {
            ComposedValue::Dictionary(map) => Ok(map),
            _ => Err(self.access_error("Dictionary")),
        }
    }

    fn dict_entries_mut(&mut self) -> Result<&mut IndexMap<String, DocNode>> {
        let node_type = self.node_type();
        match &mut self.value {
            ComposedValue::Dictionary(map) => Ok(map),
            _ => Err(Error::access(
                BACKING,
                "Dictionary",
                node_type,
                describe(self.source_info.as_deref(), node_type),
            )),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Read contract
    // ─────────────────────────────────────────────────────────────────────

    /// Number of children of a list or dictionary.
    pub fn len(&self) -> Result<usize> {
        match &self.value {
            ComposedValue::Dictionary(map) => Ok(map.len()),
            ComposedValue::List(items) => Ok(items.len()),
            ComposedValue::Scalar(_) => Err(self.access_error("Dictionary or List")),
        }
    }

    /// Whether a list or dictionary has no children.
    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|len| len == 0)
    }

    /// List element at `index`.
    pub fn at(&self, index: usize) -> Result<&DocNode> {
        let items = self.list_items()?;
        items
            .get(index)
            .ok_or_else(|| self.range_error(index, items.len()))
    }

    /// Dictionary value under `key` (case-sensitive).
    pub fn get(&self, key: &str) -> Result<&DocNode> {
        self.try_get(key, false)?.ok_or_else(|| Error::MissingKey {
            key: key.to_string(),
            source_info: self.source_information(),
        })
    }

    /// Dictionary value under `key`, `None` when absent.
    pub fn try_get(&self, key: &str, ignore_case: bool) -> Result<Option<&DocNode>> {
        let map = self.dict_entries()?;
        if !ignore_case {
            return Ok(map.get(key));
        }
        Ok(map
            .iter()
            .find(|(k, _)| key_eq(k, key, true))
            .map(|(_, v)| v))
    }

    /// Whether the dictionary holds `key`.
    pub fn contains_key(&self, key: &str, ignore_case: bool) -> Result<bool> {
        self.try_get(key, ignore_case).map(|found| found.is_some())
    }

    /// Text of a scalar.
    pub fn string_value(&self) -> Result<&str> {
        match &self.value {
            ComposedValue::Scalar(text) => Ok(text),
            _ => Err(self.access_error("Scalar")),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────

    /// Replaces the text of a scalar.
    pub fn set_string_value(&mut self, text: impl Into<String>) -> Result<()> {
        match &mut self.value {
            ComposedValue::Scalar(current) => {
                *current = text.into();
                Ok(())
            }
            _ => Err(self.access_error("Scalar")),
        }
    }

    /// Appends to a list.
    pub fn push(&mut self, node: DocNode) -> Result<()> {
        self.list_items_mut()?.push(node);
        Ok(())
    }

    /// Inserts into a list at `index` (`index == len` appends).
    pub fn insert_at(&mut self, index: usize, node: DocNode) -> Result<()> {
        let len = self.list_items()?.len();
        if index > len {
            return Err(self.range_error(index, len));
        }
        self.list_items_mut()?.insert(index, node);
        Ok(())
    }

    /// Replaces the list element at `index`.
    pub fn set_at(&mut self, index: usize, node: DocNode) -> Result<()> {
        *self.at_mut(index)? = node;
        Ok(())
    }

    /// Mutable list element at `index`.
    pub fn at_mut(&mut self, index: usize) -> Result<&mut DocNode> {
        let len = self.list_items()?.len();
        if index >= len {
            return Err(self.range_error(index, len));
        }
        Ok(&mut self.list_items_mut()?[index])
    }

    /// Removes the first list element equal to `item`.
    pub fn remove(&mut self, item: &DocNode) -> Result<bool> {
        let items = self.list_items_mut()?;
        match items.iter().position(|candidate| candidate == item) {
            Some(index) => {
                items.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes and returns the list element at `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<DocNode> {
        let len = self.list_items()?.len();
        if index >= len {
            return Err(self.range_error(index, len));
        }
        Ok(self.list_items_mut()?.remove(index))
    }

    /// Adds a new dictionary entry.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::DuplicateKey`] when `key` is already present.
    pub fn add(&mut self, key: impl Into<String>, node: DocNode) -> Result<()> {
        let key = key.into();
        if self.dict_entries()?.contains_key(&key) {
            return Err(Error::DuplicateKey {
                key,
                source_info: self.source_information(),
            });
        }
        self.dict_entries_mut()?.insert(key, node);
        Ok(())
    }

    /// Inserts or replaces a dictionary entry; a replaced key keeps its
    /// position.
    pub fn set(&mut self, key: impl Into<String>, node: DocNode) -> Result<()> {
        self.dict_entries_mut()?.insert(key.into(), node);
        Ok(())
    }

    /// Removes a dictionary entry, preserving the order of the rest.
    pub fn remove_key(&mut self, key: &str) -> Result<Option<DocNode>> {
        Ok(self.dict_entries_mut()?.shift_remove(key))
    }

    /// Mutable dictionary value under `key`.
    pub fn get_mut(&mut self, key: &str) -> Result<&mut DocNode> {
        let node_type = self.node_type();
        let source_info = self.source_info.as_deref();
        match &mut self.value {
            ComposedValue::Dictionary(map) => map.get_mut(key).ok_or_else(|| Error::MissingKey {
                key: key.to_string(),
                source_info: describe(source_info, node_type),
            }),
            _ => Err(Error::access(
                BACKING,
                "Dictionary",
                node_type,
                describe(source_info, node_type),
            )),
        }
    }

    /// Mutable dictionary value under `key`, `None` when absent.
    pub fn try_get_mut(&mut self, key: &str, ignore_case: bool) -> Result<Option<&mut DocNode>> {
        let map = self.dict_entries_mut()?;
        if !ignore_case {
            return Ok(map.get_mut(key));
        }
        Ok(map
            .iter_mut()
            .find(|(k, _)| key_eq(k, key, true))
            .map(|(_, v)| v))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Promotion
    // ─────────────────────────────────────────────────────────────────────

    /// Turns any node into a composed node.
    ///
    /// A composed `doc` is returned untouched unless `force` is set. Otherwise
    /// a new node of the same type is built; children are promoted too when
    /// `recursive` is set and moved over as they are when it is not.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::InvalidComposedType`] when `doc` (or, with
    /// `recursive`, any descendant) is `Invalid`.
    pub fn make_mutable(doc: DocNode, recursive: bool, force: bool) -> Result<Self> {
        match doc {
            DocNode::Composed(composed) if !force => Ok(composed),
            DocNode::Composed(composed) => composed.rebuild(recursive),
            DocNode::Yaml(view) => Self::from_view(&view, recursive),
        }
    }

    /// Fully independent copy of `doc`. Aliases are expanded, one copy per
    /// reference.
    pub fn deep_clone(doc: &DocNode) -> Result<Self> {
        Self::make_mutable(doc.clone(), true, true)
    }

    /// Promotes `slot` in place and hands out the composed node inside it.
    pub fn make_mutable_ref(slot: &mut DocNode, recursive: bool) -> Result<&mut Self> {
        if let DocNode::Yaml(view) = &*slot {
            let promoted = Self::from_view(view, recursive)?;
            *slot = DocNode::Composed(promoted);
        }
        match slot {
            DocNode::Composed(composed) => Ok(composed),
            DocNode::Yaml(view) => Err(Error::access(
                "YamlDocNode",
                BACKING,
                view.node_type(),
                view.source_information(),
            )),
        }
    }

    fn promote_child(child: DocNode, recursive: bool) -> Result<DocNode> {
        if recursive {
            Self::make_mutable(child, true, true).map(DocNode::Composed)
        } else {
            Ok(child)
        }
    }

    fn rebuild(self, recursive: bool) -> Result<Self> {
        let value = match self.value {
            ComposedValue::Scalar(text) => ComposedValue::Scalar(text),
            ComposedValue::List(items) => ComposedValue::List(
                items
                    .into_iter()
                    .map(|child| Self::promote_child(child, recursive))
                    .collect::<Result<_>>()?,
            ),
            ComposedValue::Dictionary(map) => ComposedValue::Dictionary(
                map.into_iter()
                    .map(|(k, child)| -> Result<(String, DocNode)> {
                        Ok((k, Self::promote_child(child, recursive)?))
                    })
                    .collect::<Result<_>>()?,
            ),
        };
        Ok(Self {
            value,
            source_info: self.source_info,
        })
    }

    fn from_view(view: &YamlDocNode, recursive: bool) -> Result<Self> {
        let node_type = view.node_type();
        let value = match node_type {
            DocNodeType::Scalar => ComposedValue::Scalar(view.string_value()?.to_string()),
            DocNodeType::List => ComposedValue::List(
                view.values()?
                    .map(|child| Self::promote_child(DocNode::Yaml(child), recursive))
                    .collect::<Result<_>>()?,
            ),
            DocNodeType::Dictionary => ComposedValue::Dictionary(
                view.pairs()?
                    .map(|(k, child)| -> Result<(String, DocNode)> {
                        Ok((k.to_string(), Self::promote_child(DocNode::Yaml(child), recursive)?))
                    })
                    .collect::<Result<_>>()?,
            ),
            DocNodeType::Invalid => {
                return Err(Error::InvalidComposedType {
                    node_type,
                    source_info: view.source_information(),
                });
            }
        };
        Ok(Self {
            value,
            source_info: Some(view.source_information()),
        })
    }
}

fn describe(source_info: Option<&str>, node_type: DocNodeType) -> String {
    source_info.map_or_else(|| format!("{BACKING} {node_type}"), str::to_string)
}
