//! Index-driven sources.
//!
//! An [`IndexedSource`] never lists its backing store. It reads one file, the
//! index, whose content is a YAML list of member names (by convention
//! including `index` itself), and then reads each member by name through a
//! [`ResourceReader`]. Hotloading compares content checksums only, so it
//! works for stores with no usable timestamps.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display, Formatter};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::RwLock;

use crate::checksum::checksum_str;
use crate::error::{Error, Result};
use crate::source::{ConfigFileInfo, ConfigSource, PreloadStep};

/// Raw text of one member.
#[derive(Clone, Debug, Default)]
pub struct Resource {
    /// File contents.
    pub text: String,

    /// Modification time, if the store tracks one.
    pub modified: Option<SystemTime>,
}

/// Reads named resources out of some backing store.
pub trait ResourceReader: Display + Send {
    /// Text of the resource called `name`, `None` when it doesn't exist.
    ///
    /// # Errors
    ///
    /// Any failure other than absence.
    fn read(&self, name: &str) -> Result<Option<Resource>>;
}

// ============================================================================
// Directory reader
// ============================================================================

/// Reads `<base_dir>/<name><extension>` from disk.
#[derive(Clone, Debug)]
pub struct DirectoryReader {
    base_dir: PathBuf,
    extension: String,
}

impl DirectoryReader {
    /// Reader for `.yaml` files under `base_dir`.
    #[must_use]
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            extension: ".yaml".to_string(),
        }
    }

    /// Changes the extension appended to names (with leading dot).
    #[must_use]
    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    fn path_of(&self, name: &str) -> PathBuf {
        self.base_dir.join(format!("{name}{}", self.extension))
    }
}

impl ResourceReader for DirectoryReader {
    fn read(&self, name: &str) -> Result<Option<Resource>> {
        let path = self.path_of(name);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::read(path.display().to_string(), e)),
        };

        let modified = std::fs::metadata(&path)
            .and_then(|meta| meta.modified())
            .ok();

        Ok(Some(Resource { text, modified }))
    }
}

impl Display for DirectoryReader {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_dir.display())
    }
}

// ============================================================================
// Memory reader
// ============================================================================

/// In-memory store. Clones share the same contents, so a test or an embedder
/// can keep one handle and edit files under a source that owns another.
#[derive(Clone, Debug, Default)]
pub struct MemoryReader {
    files: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryReader {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a resource.
    pub fn insert(&self, name: impl Into<String>, text: impl Into<String>) {
        self.files.write().insert(name.into(), text.into());
    }

    /// Deletes a resource, returning its text.
    pub fn remove(&self, name: &str) -> Option<String> {
        self.files.write().remove(name)
    }
}

impl ResourceReader for MemoryReader {
    fn read(&self, name: &str) -> Result<Option<Resource>> {
        Ok(self.files.read().get(name).map(|text| Resource {
            text: text.clone(),
            modified: None,
        }))
    }
}

impl Display for MemoryReader {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "memory({} file(s))", self.files.read().len())
    }
}

// ============================================================================
// Indexed source
// ============================================================================

/// A source whose members are enumerated by an index file.
#[derive(Debug)]
pub struct IndexedSource<R> {
    reader: R,
    index_name: String,
    hotload: bool,
    index: Option<ConfigFileInfo>,
    members: Vec<String>,
    cursor: usize,
    preloaded: bool,
    files: HashMap<String, ConfigFileInfo>,
}

impl<R: ResourceReader> IndexedSource<R> {
    /// Source reading through `reader`, with hotloading off.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            index_name: "index".to_string(),
            hotload: false,
            index: None,
            members: Vec::new(),
            cursor: 0,
            preloaded: false,
            files: HashMap::new(),
        }
    }

    /// Enables or disables hotloading.
    #[must_use]
    pub fn with_hotload(mut self, enabled: bool) -> Self {
        self.hotload = enabled;
        self
    }

    /// Changes the logical name of the index file.
    #[must_use]
    pub fn index_name(mut self, name: impl Into<String>) -> Self {
        self.index_name = name.into();
        self
    }

    /// The reader this source reads through.
    pub const fn reader(&self) -> &R {
        &self.reader
    }

    /// Member names listed by the current index, without the index itself.
    #[must_use]
    pub fn members(&self) -> &[String] {
        &self.members
    }

    fn read_index(&self) -> Result<ConfigFileInfo> {
        let resource = self
            .reader
            .read(&self.index_name)?
            .ok_or_else(|| Error::IndexMissing {
                name: self.index_name.clone(),
                source_name: self.to_string(),
            })?;

        ConfigFileInfo::load(
            self.index_name.clone(),
            &self.index_name,
            &resource.text,
            resource.modified,
        )
    }

    /// Member names from the index, in order, without duplicates and without
    /// the index itself.
    fn index_members(&self, index: &ConfigFileInfo) -> Result<Vec<String>> {
        let invalid = |source_info: String| Error::InvalidIndex {
            name: self.index_name.clone(),
            source_info,
        };

        let parsed = index.parsed();
        let values = parsed
            .values()
            .map_err(|_| invalid(parsed.source_information()))?;

        let mut seen = HashSet::new();
        let mut members = Vec::new();
        for value in values {
            let name = value
                .string_value()
                .map_err(|_| invalid(value.source_information()))?;
            if name != self.index_name && seen.insert(name.to_string()) {
                members.push(name.to_string());
            }
        }
        Ok(members)
    }

    fn load_member(&self, name: &str) -> Result<Option<ConfigFileInfo>> {
        self.reader
            .read(name)?
            .map(|resource| ConfigFileInfo::load(name, name, &resource.text, resource.modified))
            .transpose()
    }

    /// Re-reads every member; `Some(record)` marks a changed or appeared
    /// member, `None` a vanished one.
    fn changed_members(&self) -> Result<Vec<(String, Option<ConfigFileInfo>)>> {
        let mut updates = Vec::new();

        for name in &self.members {
            let cached = self.files.get(name);
            let Some(resource) = self.reader.read(name)? else {
                if cached.is_some() {
                    updates.push((name.clone(), None));
                }
                continue;
            };

            let checksum = checksum_str(&resource.text);
            if cached.is_some_and(|info| info.checksum() == checksum) {
                continue;
            }

            let info = ConfigFileInfo::load_with_checksum(
                name.as_str(),
                name,
                &resource.text,
                checksum,
                resource.modified,
            )?;
            updates.push((name.clone(), Some(info)));
        }

        Ok(updates)
    }

    /// Reads the index and every member into fresh tables, touching nothing.
    fn reload_all(
        &self,
        index: &ConfigFileInfo,
    ) -> Result<(Vec<String>, HashMap<String, ConfigFileInfo>)> {
        let members = self.index_members(index)?;
        let mut files = HashMap::with_capacity(members.len());
        for name in &members {
            match self.load_member(name)? {
                Some(info) => {
                    files.insert(name.clone(), info);
                }
                None => tracing::warn!(source = %self, file = %name, "Skipping missing member"),
            }
        }
        Ok((members, files))
    }
}

impl<R: ResourceReader> ConfigSource for IndexedSource<R> {
    fn can_hotload(&self) -> bool {
        self.hotload
    }

    fn begin_preload(&mut self) -> Result<()> {
        self.preloaded = false;
        self.files.clear();
        self.members.clear();
        self.cursor = 0;

        let index = self.read_index()?;
        self.members = self.index_members(&index)?;
        self.index = Some(index);

        tracing::info!(source = %self, members = self.members.len(), "Preloading");
        Ok(())
    }

    fn preload_next(&mut self) -> Result<Option<PreloadStep>> {
        let Some(name) = self.members.get(self.cursor).cloned() else {
            if !self.preloaded {
                self.preloaded = true;
                tracing::info!(source = %self, files = self.files.len(), "Preload complete");
            }
            return Ok(None);
        };
        self.cursor += 1;

        match self.load_member(&name)? {
            Some(info) => {
                self.files.insert(name.clone(), info);
                Ok(Some(PreloadStep::Loaded(name)))
            }
            None => {
                tracing::warn!(source = %self, file = %name, "Skipping missing member");
                Ok(Some(PreloadStep::Skipped(name)))
            }
        }
    }

    fn is_preloaded(&self) -> bool {
        self.preloaded
    }

    fn hotload(&mut self, changed: &mut Vec<String>) -> Result<()> {
        let index = self.read_index()?;
        let index_changed = self
            .index
            .as_ref()
            .is_none_or(|old| old.checksum() != index.checksum());

        if index_changed {
            tracing::info!(source = %self, "Index changed, reloading every member");
            let (members, files) = self.reload_all(&index)?;

            changed.extend(members.iter().cloned());
            changed.extend(
                self.files
                    .keys()
                    .filter(|name| !members.contains(*name))
                    .cloned(),
            );

            self.members = members;
            self.files = files;
            self.index = Some(index);
            self.cursor = self.members.len();
            self.preloaded = true;
            return Ok(());
        }

        for (name, update) in self.changed_members()? {
            match update {
                Some(info) => {
                    tracing::info!(source = %self, file = %info, "Hotloaded");
                    self.files.insert(name.clone(), info);
                }
                None => {
                    tracing::info!(source = %self, file = %name, "Member disappeared");
                    self.files.remove(&name);
                }
            }
            changed.push(name);
        }
        Ok(())
    }

    fn files(&self) -> &HashMap<String, ConfigFileInfo> {
        &self.files
    }
}

impl<R: ResourceReader> Display for IndexedSource<R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "IndexedSource({})", self.reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(files: &[(&str, &str)]) -> MemoryReader {
        let reader = MemoryReader::new();
        for (name, text) in files {
            reader.insert(*name, *text);
        }
        reader
    }

    #[test]
    fn test_preload_steps() {
        let reader = store(&[("index", "[index, a, b]"), ("a", "x: 1"), ("b", "y: 2")]);
        let mut source = IndexedSource::new(reader);

        let steps: Vec<_> = source.step_preload().map(Result::unwrap).collect();
        assert_eq!(
            steps,
            [
                PreloadStep::Started,
                PreloadStep::Loaded("a".into()),
                PreloadStep::Loaded("b".into()),
            ]
        );
        assert!(source.is_preloaded());
        assert_eq!(source.sorted_filenames(), ["a", "b"]);
    }

    #[test]
    fn test_abandoned_preload_is_not_ready() {
        let reader = store(&[("index", "[a, b]"), ("a", "x: 1"), ("b", "y: 2")]);
        let mut source = IndexedSource::new(reader);
        let mut steps = source.step_preload();
        steps.next();
        steps.next();
        drop(steps);
        assert!(!source.is_preloaded());
    }

    #[test]
    fn test_missing_member_skipped() {
        let reader = store(&[("index", "[a, gone]"), ("a", "x: 1")]);
        let mut source = IndexedSource::new(reader);

        let steps: Vec<_> = source.step_preload().map(Result::unwrap).collect();
        assert!(steps.contains(&PreloadStep::Skipped("gone".into())));
        assert!(source.is_preloaded());
        assert!(source.file("gone").is_none());
    }

    #[test]
    fn test_missing_index_is_fatal() {
        let mut source = IndexedSource::new(store(&[("a", "x: 1")]));
        assert!(matches!(source.preload(), Err(Error::IndexMissing { .. })));
    }

    #[test]
    fn test_index_must_be_list_of_scalars() {
        let mut source = IndexedSource::new(store(&[("index", "a: 1")]));
        assert!(matches!(source.preload(), Err(Error::InvalidIndex { .. })));

        let mut source = IndexedSource::new(store(&[("index", "[[a]]")]));
        assert!(matches!(source.preload(), Err(Error::InvalidIndex { .. })));
    }

    #[test]
    fn test_custom_index_name() {
        let reader = store(&[("manifest", "[manifest, a]"), ("a", "x: 1")]);
        let mut source = IndexedSource::new(reader).index_name("manifest");
        source.preload().unwrap();
        assert_eq!(source.members(), ["a"]);
    }

    #[test]
    fn test_failed_hotload_keeps_cache() {
        let reader = store(&[("index", "[a]"), ("a", "x: 1")]);
        let mut source = IndexedSource::new(reader.clone()).with_hotload(true);
        source.preload().unwrap();

        reader.insert("a", "x: [broken");
        let mut changed = Vec::new();
        assert!(source.hotload(&mut changed).is_err());
        assert!(changed.is_empty());
        let a = source.file("a").unwrap().parsed();
        assert_eq!(a.get("x").unwrap().string_value().unwrap(), "1");
    }

    #[test]
    fn test_vanished_member_reported() {
        let reader = store(&[("index", "[a, b]"), ("a", "x: 1"), ("b", "y: 2")]);
        let mut source = IndexedSource::new(reader.clone()).with_hotload(true);
        source.preload().unwrap();

        reader.remove("b");
        let mut changed = Vec::new();
        source.hotload(&mut changed).unwrap();
        assert_eq!(changed, ["b"]);
        assert!(source.file("b").is_none());
    }

    #[test]
    fn test_directory_reader_absent_file() {
        let dir = tempfile::tempdir().unwrap();
        let reader = DirectoryReader::new(dir.path());
        assert!(reader.read("nope").unwrap().is_none());

        std::fs::write(dir.path().join("there.yml"), "a: 1").unwrap();
        let reader = reader.extension(".yml");
        let resource = reader.read("there").unwrap().unwrap();
        assert_eq!(resource.text, "a: 1");
        assert!(resource.modified.is_some());
    }
}
