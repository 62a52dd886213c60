//! # hotconf
//!
//! A YAML document model with deep merging and checksum-driven hotloading.
//!
//! `hotconf` parses configuration files into a uniform tree value,
//! [`DocNode`], and keeps that tree current while the program runs: sources
//! remember a checksum per file, and every poll reports exactly the files
//! whose contents changed so only those are re-parsed.
//!
//! ## What Makes hotconf Unique
//!
//! - **Two backings, one contract** - parsed documents are read in place
//!   through cheap views ([`YamlDocNode`]); programmatic trees
//!   ([`ComposedDocNode`]) answer the same calls and can be mutated
//! - **Deep merging** - [`deep_merge`] layers documents so the last file wins
//! - **Incremental reload** - index files and checksums decide what changed
//! - **Provenance everywhere** - every node can say which file, line and
//!   column it came from, and errors carry it
//!
//! ## Quick Start
//!
//! ```rust
//! use hotconf::{ConfigFileManager, DocNode};
//! use hotconf::source::{IndexedSource, MemoryReader};
//!
//! fn main() -> hotconf::Result<()> {
//!     let reader = MemoryReader::new();
//!     reader.insert("index", "[index, server]");
//!     reader.insert("server", "host: localhost\nport: 8080");
//!
//!     let mut manager = ConfigFileManager::default();
//!     manager.add_source(IndexedSource::new(reader).with_hotload(true));
//!     manager.preload()?;
//!
//!     let server = manager.parse_file("server")?;
//!     assert_eq!(server.get("port")?.string_value()?, "8080");
//!     Ok(())
//! }
//! ```
//!
//! ## Merging
//!
//! ```rust
//! use hotconf::{deep_merge, parse_str};
//!
//! let base = parse_str("server: {host: localhost, port: 80}", "base.yaml").unwrap();
//! let local = parse_str("server: {port: 8080}", "local.yaml").unwrap();
//!
//! let merged = deep_merge(&base, &local).unwrap();
//! assert_eq!(merged.to_string(), "{server: {host: localhost, port: 8080}}");
//! ```
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`node`] | [`DocNode`] and its backings, merge functions |
//! | [`yaml`] | Arena parse tree built from YAML text |
//! | [`checksum`] | Content checksums used for change detection |
//! | [`source`] | [`ConfigSource`](source::ConfigSource) and the built-in sources |
//! | [`glob`] | Glob patterns over logical file names |
//! | [`manager`] | [`ConfigFileManager`]: sources, combined files, callbacks |
//! | [`settings`] | [`Settings`] for the manager |
//! | `watch` | Background poller (`watch` feature) |
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `toml` | [`Settings::from_toml_str`] | No |
//! | `json` | `DocNode::to_json_string` | No |
//! | `watch` | Background polling with file events | No |
//! | `full` | Enable all features | No |
//!
//! ## Error Handling
//!
//! All errors are reported through the [`Error`] type, which integrates with
//! [`miette`] for rich terminal diagnostics. YAML syntax errors carry the file
//! contents and a labeled span:
//!
//! ```rust
//! let err = hotconf::parse_str("a: [1, 2", "broken.yaml").unwrap_err();
//! eprintln!("{:?}", miette::Report::from(err));
//! ```

#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

// ============================================================================
// Re-exported Dependencies
// ============================================================================

/// Re-export miette for error handling.
pub use miette;

/// Re-export regex for [`ConfigFileManager::filenames_matching_regex`] and
/// [`source::FileSource::ignore_pattern`].
pub use regex;

/// Re-export toml when the feature is enabled.
#[cfg(feature = "toml")]
pub use toml;

/// Re-export `serde_json` when the json feature is enabled.
#[cfg(feature = "json")]
pub use serde_json;

// ============================================================================
// Core Modules
// ============================================================================

mod error;
pub use error::{Error, Result};

pub mod checksum;
pub mod glob;
pub mod node;
pub mod yaml;

pub use node::{
    ComposedDocNode, DocNode, DocNodeType, SourceLocation, YamlDocNode, combine_dict,
    combine_list, deep_merge, merge_all,
};
pub use yaml::parse_str;

// ============================================================================
// Sources and File Management
// ============================================================================

pub mod manager;
pub mod settings;
pub mod source;

pub use manager::ConfigFileManager;
pub use settings::Settings;
pub use source::{ConfigFileInfo, ConfigSource};

// ============================================================================
// Background Polling
// ============================================================================

#[cfg(feature = "watch")]
pub mod watch;

#[cfg(feature = "watch")]
pub use watch::{PollReport, PollTrigger, PollerBuilder, PollerHandle, WatchError};
