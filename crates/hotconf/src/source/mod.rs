//! Configuration sources and their change-detection protocol.
//!
//! A [`ConfigSource`] owns a table of [`ConfigFileInfo`] records keyed by
//! logical file name. Preloading fills the table one file per step so a host
//! loop can spread the work across ticks; hotloading re-reads the backing
//! store and reports which logical names changed.
//!
//! # Built-in Sources
//!
//! - [`IndexedSource`] - members enumerated by an index file, read through a
//!   [`ResourceReader`] ([`DirectoryReader`] or [`MemoryReader`])
//! - [`FileSource`] - every matching file under a directory
//!
//! # Example
//!
//! ```rust
//! use hotconf::source::{ConfigSource, IndexedSource, MemoryReader};
//!
//! let reader = MemoryReader::new();
//! reader.insert("index", "[index, server]");
//! reader.insert("server", "port: 80");
//!
//! let mut source = IndexedSource::new(reader.clone()).with_hotload(true);
//! source.preload().unwrap();
//!
//! reader.insert("server", "port: 8080");
//! let mut changed = Vec::new();
//! source.hotload(&mut changed).unwrap();
//! assert_eq!(changed, ["server"]);
//! ```

mod file;
mod indexed;

pub use file::FileSource;
pub use indexed::{DirectoryReader, IndexedSource, MemoryReader, Resource, ResourceReader};

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};
use std::time::SystemTime;

use crate::checksum::{Checksum, checksum, checksum_str};
use crate::error::Result;
use crate::node::DocNode;
use crate::yaml::parse_str;

// ============================================================================
// Per-file record
// ============================================================================

/// Everything a source remembers about one loaded file.
///
/// Records are replaced wholesale whenever a file is re-read; change
/// detection compares the checksum of the old and new record.
#[derive(Clone, Debug)]
pub struct ConfigFileInfo {
    name: String,
    size: u64,
    checksum: Checksum,
    modified: Option<SystemTime>,
    parsed: DocNode,
}

impl ConfigFileInfo {
    /// Creates a record from already computed parts.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        size: u64,
        checksum: Checksum,
        modified: Option<SystemTime>,
        parsed: DocNode,
    ) -> Self {
        Self {
            name: name.into(),
            size,
            checksum,
            modified,
            parsed,
        }
    }

    /// Checksums and parses `text`. `origin` names the file in provenance
    /// strings and parse errors.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Parse`] if `text` is not valid YAML.
    pub fn load(
        name: impl Into<String>,
        origin: &str,
        text: &str,
        modified: Option<SystemTime>,
    ) -> Result<Self> {
        Self::load_with_checksum(name, origin, text, checksum_str(text), modified)
    }

    pub(crate) fn load_with_checksum(
        name: impl Into<String>,
        origin: &str,
        text: &str,
        checksum: Checksum,
        modified: Option<SystemTime>,
    ) -> Result<Self> {
        let parsed = parse_str(text, origin)?;
        Ok(Self::new(name, text.len() as u64, checksum, modified, parsed))
    }

    /// Checksums raw file bytes and parses them, replacing invalid UTF-8
    /// with U+FFFD. The recorded size is the byte length on disk.
    pub(crate) fn load_bytes(
        name: impl Into<String>,
        origin: &str,
        bytes: &[u8],
        modified: Option<SystemTime>,
    ) -> Result<Self> {
        let text = String::from_utf8_lossy(bytes);
        let parsed = parse_str(&text, origin)?;
        Ok(Self::new(name, bytes.len() as u64, checksum(bytes), modified, parsed))
    }

    /// Same file contents with fresh size and timestamp.
    #[must_use]
    pub(crate) fn with_metadata(&self, size: u64, modified: Option<SystemTime>) -> Self {
        Self {
            size,
            modified,
            ..self.clone()
        }
    }

    /// Logical file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size of the content in bytes.
    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    /// Content checksum.
    #[must_use]
    pub const fn checksum(&self) -> Checksum {
        self.checksum
    }

    /// Last modification time, when the backing store has one.
    #[must_use]
    pub const fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// Parsed document root.
    #[must_use]
    pub const fn parsed(&self) -> &DocNode {
        &self.parsed
    }
}

impl Display for ConfigFileInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {:08X} parsed]", self.name, self.checksum)
    }
}

// ============================================================================
// Source contract
// ============================================================================

/// One unit of preload progress.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PreloadStep {
    /// The source reset its state and is about to read members.
    Started,

    /// A member was read and parsed.
    Loaded(String),

    /// A member was listed but absent; it was skipped.
    Skipped(String),
}

/// A named set of configuration files that can be preloaded and, optionally,
/// hotloaded.
///
/// Implementors provide the two step functions [`begin_preload`] and
/// [`preload_next`]; [`step_preload`] and [`preload`] drive them.
///
/// [`begin_preload`]: ConfigSource::begin_preload
/// [`preload_next`]: ConfigSource::preload_next
/// [`step_preload`]: ConfigSource::step_preload
/// [`preload`]: ConfigSource::preload
pub trait ConfigSource: Display + Send {
    /// Whether [`hotload`](ConfigSource::hotload) can report changes.
    fn can_hotload(&self) -> bool;

    /// Resets the file table and prepares to read members.
    ///
    /// # Errors
    ///
    /// Fails when the source's structure cannot be read (missing index,
    /// missing directory).
    fn begin_preload(&mut self) -> Result<()>;

    /// Reads the next member. `Ok(None)` once every member was read, at which
    /// point the source is preloaded.
    fn preload_next(&mut self) -> Result<Option<PreloadStep>>;

    /// Whether the last preload ran to completion.
    fn is_preloaded(&self) -> bool;

    /// Re-reads the backing store and appends the logical names of changed
    /// files to `changed`.
    fn hotload(&mut self, changed: &mut Vec<String>) -> Result<()> {
        let _ = changed;
        Ok(())
    }

    /// Every loaded file keyed by logical name.
    fn files(&self) -> &HashMap<String, ConfigFileInfo>;

    /// The record of one loaded file.
    fn file(&self, name: &str) -> Option<&ConfigFileInfo> {
        self.files().get(name)
    }

    /// Logical names of every loaded file in sorted order.
    fn sorted_filenames(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.files().keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Restarts preloading and returns an iterator over its steps.
    ///
    /// For trait objects use [`StepPreload::new`].
    fn step_preload(&mut self) -> StepPreload<'_, Self>
    where
        Self: Sized,
    {
        StepPreload::new(self)
    }

    /// Preloads every member in one call.
    fn preload(&mut self) -> Result<()> {
        for step in StepPreload::new(self) {
            step?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum StepState {
    Begin,
    Reading,
    Done,
}

/// Iterator over the steps of one preload run.
///
/// The first item is [`PreloadStep::Started`]; the iterator ends after the
/// last member or after the first error. Dropping it early leaves the source
/// not preloaded.
pub struct StepPreload<'a, S: ?Sized + ConfigSource> {
    source: &'a mut S,
    state: StepState,
}

impl<'a, S: ?Sized + ConfigSource> StepPreload<'a, S> {
    /// Starts a preload run over `source`.
    pub fn new(source: &'a mut S) -> Self {
        Self {
            source,
            state: StepState::Begin,
        }
    }
}

impl<S: ?Sized + ConfigSource> Iterator for StepPreload<'_, S> {
    type Item = Result<PreloadStep>;

    fn next(&mut self) -> Option<Self::Item> {
        let step = match self.state {
            StepState::Done => return None,
            StepState::Begin => self.source.begin_preload().map(|()| Some(PreloadStep::Started)),
            StepState::Reading => self.source.preload_next(),
        };

        match step {
            Ok(Some(step)) => {
                self.state = StepState::Reading;
                Some(Ok(step))
            }
            Ok(None) => {
                self.state = StepState::Done;
                None
            }
            Err(err) => {
                self.state = StepState::Done;
                Some(Err(err))
            }
        }
    }
}

impl<S: ?Sized + ConfigSource> fmt::Debug for StepPreload<'_, S> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepPreload")
            .field("source", &self.source.to_string())
            .field("state", &self.state)
            .finish()
    }
}
