//! Error types for document access, merging and source loading.
//!
//! This module contains the [`Error`] enum used across the crate. Every
//! variant integrates with [`miette`] so a misconfigured entry can be located
//! from the error alone: node access failures carry the node's provenance
//! string, YAML syntax errors carry the offending source text and a span.
//!
//! # Error Variants
//!
//! | Variant | When It Occurs |
//! |---------|----------------|
//! | [`Error::NodeAccess`] | Operation used on the wrong [`DocNodeType`] |
//! | [`Error::IndexOutOfRange`] | List index past the end |
//! | [`Error::MissingKey`] | Definite key lookup on an absent key |
//! | [`Error::DuplicateKey`] | `add` of a key that already exists |
//! | [`Error::ReadOnly`] | Mutation attempted on a parsed (read-only) node |
//! | [`Error::InvalidComposedType`] | Building a composed node of type `Invalid` |
//! | [`Error::MergeTypeMismatch`] | `deep_merge` of nodes with different types |
//! | [`Error::InvalidMerge`] | `deep_merge` of two `Invalid` nodes |
//! | [`Error::Parse`] | YAML syntax error or unsupported document shape |
//! | [`Error::Read`] | I/O failure reading a configuration file |
//! | [`Error::IndexMissing`] | A source's index file is absent |
//! | [`Error::InvalidIndex`] | The index file is not a list of names |
//! | [`Error::SourceDirMissing`] | A directory source's base directory is absent |
//! | [`Error::FileNotFound`] | Lookup of a file no source knows about |
//! | [`Error::NotPreloaded`] | Manager used before preloading finished |
//! | [`Error::InvalidGlob`] | A glob pattern produced an unusable regex |
//! | [`Error::Settings`] | Settings text failed to parse (with `toml` feature) |
//! | [`Error::Multiple`] | Several sources failed during one poll |
//!
//! # Example
//!
//! ```rust,ignore
//! let doc = hotconf::parse_str("port: 8080", "server.yaml")?;
//! match doc.at(0) {
//!     Err(hotconf::Error::NodeAccess { expected, actual, .. }) => {
//!         eprintln!("wanted {expected}, found {actual}");
//!     }
//!     _ => unreachable!(),
//! }
//! ```

use miette::{Diagnostic, NamedSource, SourceSpan};

use crate::node::DocNodeType;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised by the document model and the configuration sources.
#[derive(Debug, Diagnostic, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A node was accessed as a shape it does not have.
    #[error("accessing {backing} as {expected} but is {actual}. {source_info}")]
    #[diagnostic(
        code(hotconf::node::access),
        help("check the shape of this entry in the configuration file")
    )]
    NodeAccess {
        /// Which backing produced the error (`YamlDocNode` or `ComposedDocNode`).
        backing: &'static str,

        /// The shape the caller asked for.
        expected: String,

        /// The shape the node actually has.
        actual: DocNodeType,

        /// Provenance of the node.
        source_info: String,
    },

    /// A list index was past the end of the list.
    #[error("index {index} is out of range for a list of {len} item(s). {source_info}")]
    #[diagnostic(code(hotconf::node::index_out_of_range))]
    IndexOutOfRange {
        /// Requested index.
        index: usize,

        /// Length of the list.
        len: usize,

        /// Provenance of the list node.
        source_info: String,
    },

    /// A definite key lookup found nothing.
    #[error("key '{key}' not found. {source_info}")]
    #[diagnostic(
        code(hotconf::node::missing_key),
        help("use try_get for lookups that may legitimately miss")
    )]
    MissingKey {
        /// The key that was looked up.
        key: String,

        /// Provenance of the dictionary node.
        source_info: String,
    },

    /// A key was added twice to the same dictionary.
    #[error("key '{key}' is already present. {source_info}")]
    #[diagnostic(
        code(hotconf::node::duplicate_key),
        help("use set to replace an existing value")
    )]
    DuplicateKey {
        /// The duplicated key.
        key: String,

        /// Provenance of the dictionary node.
        source_info: String,
    },

    /// A parsed node was asked to change.
    #[error("cannot modify a read-only {backing}. {source_info}")]
    #[diagnostic(
        code(hotconf::node::read_only),
        help("promote the node first with ComposedDocNode::make_mutable or make_mutable_ref")
    )]
    ReadOnly {
        /// Which backing refused the write.
        backing: &'static str,

        /// Provenance of the node.
        source_info: String,
    },

    /// A composed node was requested with a type that cannot hold data.
    #[error("can't make a ComposedDocNode instance with type {node_type}. {source_info}")]
    #[diagnostic(code(hotconf::node::invalid_composed_type))]
    InvalidComposedType {
        /// The rejected type.
        node_type: DocNodeType,

        /// Provenance of the node being promoted, if any.
        source_info: String,
    },

    /// Two nodes of different types were merged.
    #[error("can't merge different DocNode types: {lhs} ({lhs_source}), {rhs} ({rhs_source})")]
    #[diagnostic(
        code(hotconf::merge::type_mismatch),
        help("every file folded into one merge must have the same top-level shape")
    )]
    MergeTypeMismatch {
        /// Type of the left-hand node.
        lhs: DocNodeType,

        /// Provenance of the left-hand node.
        lhs_source: String,

        /// Type of the right-hand node.
        rhs: DocNodeType,

        /// Provenance of the right-hand node.
        rhs_source: String,
    },

    /// Two nodes of a type with nothing to merge were merged.
    #[error("can't merge DocNodes of type {node_type}. {source_info}")]
    #[diagnostic(code(hotconf::merge::invalid))]
    InvalidMerge {
        /// The unmergeable type.
        node_type: DocNodeType,

        /// Provenance of the left-hand node.
        source_info: String,
    },

    /// YAML text could not be turned into a document.
    #[error("encountered error parsing YAML file '{file}': {message}")]
    #[diagnostic(code(hotconf::yaml::parse_error))]
    Parse {
        /// Logical file name used for error reporting.
        file: String,

        /// The source text for display.
        #[source_code]
        src: NamedSource<String>,

        /// The location of the error.
        #[label("{message}")]
        span: SourceSpan,

        /// Description of what went wrong.
        message: String,
    },

    /// Reading a file failed.
    #[error("failed to read configuration file: {path}")]
    #[diagnostic(
        code(hotconf::source::read_error),
        help("check file permissions and ensure it's readable")
    )]
    Read {
        /// Path of the file.
        path: String,

        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The index file of a source could not be found.
    #[error("index file '{name}' is missing from {source_name}")]
    #[diagnostic(
        code(hotconf::source::index_missing),
        help("every indexed source needs an index file listing its members")
    )]
    IndexMissing {
        /// Logical name of the index file.
        name: String,

        /// Description of the source.
        source_name: String,
    },

    /// The index file does not enumerate file names.
    #[error("index file '{name}' must be a list of file names. {source_info}")]
    #[diagnostic(code(hotconf::source::invalid_index))]
    InvalidIndex {
        /// Logical name of the index file.
        name: String,

        /// Provenance of the offending node.
        source_info: String,
    },

    /// A directory source points at a directory that does not exist.
    #[error("configuration directory not found: {path}")]
    #[diagnostic(
        code(hotconf::source::dir_missing),
        help("ensure the directory exists at the specified path")
    )]
    SourceDirMissing {
        /// The missing directory.
        path: String,
    },

    /// A file was requested that no source or combined file provides.
    #[error("couldn't find file {name}. Perhaps it isn't in the index, or wasn't preloaded.")]
    #[diagnostic(code(hotconf::manager::file_not_found))]
    FileNotFound {
        /// Logical file name.
        name: String,
    },

    /// The manager was used before preloading completed.
    #[error("preloading must complete before calling {operation}")]
    #[diagnostic(
        code(hotconf::manager::not_preloaded),
        help("drain ConfigFileManager::step_preload or call preload first")
    )]
    NotPreloaded {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// A glob pattern could not be turned into a regex.
    #[error("invalid glob pattern '{glob}'")]
    #[diagnostic(code(hotconf::glob::invalid))]
    InvalidGlob {
        /// The offending glob.
        glob: String,

        /// The underlying regex error.
        #[source]
        source: regex::Error,
    },

    /// Settings text could not be parsed.
    #[cfg(feature = "toml")]
    #[error("invalid settings: {message}")]
    #[diagnostic(code(hotconf::settings::parse_error))]
    Settings {
        /// Description of what went wrong.
        message: String,

        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// Several errors were accumulated in one operation.
    #[error("{} configuration error(s) occurred", .errors.len())]
    #[diagnostic(
        code(hotconf::multiple_errors),
        help("fix all listed configuration errors")
    )]
    Multiple {
        /// All accumulated errors.
        #[related]
        errors: Vec<Error>,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Constructor helpers for ergonomic error creation
// ─────────────────────────────────────────────────────────────────────────────

impl Error {
    pub(crate) fn access(
        backing: &'static str,
        expected: impl Into<String>,
        actual: DocNodeType,
        source_info: impl Into<String>,
    ) -> Self {
        Self::NodeAccess {
            backing,
            expected: expected.into(),
            actual,
            source_info: source_info.into(),
        }
    }

    pub(crate) fn read_only(backing: &'static str, source_info: impl Into<String>) -> Self {
        Self::ReadOnly {
            backing,
            source_info: source_info.into(),
        }
    }

    pub(crate) fn read(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Builds a YAML parse error pointing at `char_index` inside `content`.
    pub(crate) fn parse(
        file: impl Into<String>,
        content: &str,
        char_index: usize,
        message: impl Into<String>,
    ) -> Self {
        let file = file.into();
        let offset = content
            .char_indices()
            .nth(char_index)
            .map_or(content.len(), |(offset, _)| offset);

        Self::Parse {
            src: NamedSource::new(&file, content.to_string()),
            file,
            span: SourceSpan::from((offset, 1)),
            message: message.into(),
        }
    }

    /// Collects multiple errors into a single `Multiple` error.
    /// Returns `None` if the input is empty.
    #[must_use]
    pub fn multiple(errors: Vec<Self>) -> Option<Self> {
        if errors.len() > 1 {
            Some(Self::Multiple { errors })
        } else {
            // Unwrap single error instead of wrapping
            errors.into_iter().next()
        }
    }
}
