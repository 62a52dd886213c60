//! Directory-scanning source.

use std::collections::{HashMap, HashSet};
use std::fmt::{self, Display, Formatter};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use regex::Regex;
use walkdir::WalkDir;

use crate::checksum::checksum;
use crate::error::{Error, Result};
use crate::source::{ConfigFileInfo, ConfigSource, PreloadStep};

/// Timestamps closer than this count as equal.
const MTIME_TOLERANCE: Duration = Duration::from_secs(1);

/// Loads every file with a configured extension under a directory.
///
/// Logical names are paths relative to the directory, `/`-separated, with
/// the extension removed: `<dir>/items/sword.yaml` becomes `items/sword`.
/// Hotloading uses size and modification time to decide which files are
/// worth checksumming again.
#[derive(Debug)]
pub struct FileSource {
    base_dir: PathBuf,
    extensions: Vec<String>,
    hotload: bool,
    ignore_pattern: Option<Regex>,
    set_modified_time_on_checksum_match: bool,
    pending: Vec<(String, PathBuf)>,
    cursor: usize,
    preloaded: bool,
    files: HashMap<String, ConfigFileInfo>,
}

impl FileSource {
    /// Source over `.yaml` files under `base_dir`, with hotloading off.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            extensions: vec![".yaml".to_string()],
            hotload: false,
            ignore_pattern: None,
            set_modified_time_on_checksum_match: false,
            pending: Vec::new(),
            cursor: 0,
            preloaded: false,
            files: HashMap::new(),
        }
    }

    /// Replaces the accepted extensions (each with leading dot).
    #[must_use]
    pub fn extensions<S: Into<String>>(mut self, extensions: impl IntoIterator<Item = S>) -> Self {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Enables or disables hotloading.
    #[must_use]
    pub fn with_hotload(mut self, enabled: bool) -> Self {
        self.hotload = enabled;
        self
    }

    /// Skips files whose logical name matches `pattern`.
    #[must_use]
    pub fn ignore_pattern(mut self, pattern: Regex) -> Self {
        self.ignore_pattern = Some(pattern);
        self
    }

    /// When a file's timestamp changed but its checksum did not, writes the
    /// cached timestamp back to disk so the next session skips it too.
    #[must_use]
    pub fn set_modified_time_on_checksum_match(mut self, enabled: bool) -> Self {
        self.set_modified_time_on_checksum_match = enabled;
        self
    }

    /// The scanned directory.
    #[must_use]
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Logical name of `path`, `None` if it has none of the extensions.
    fn logical_name(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_dir).ok()?;
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        self.extensions
            .iter()
            .find_map(|ext| relative.strip_suffix(ext.as_str()))
            .filter(|name| !name.is_empty() && !name.ends_with('/'))
            .map(str::to_string)
    }

    /// Every config file under the base directory, sorted by path.
    fn find_configs(&self) -> Result<Vec<(String, PathBuf)>> {
        if !self.base_dir.is_dir() {
            return Err(Error::SourceDirMissing {
                path: self.base_dir.display().to_string(),
            });
        }

        let mut found = Vec::new();
        for entry in WalkDir::new(&self.base_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let path = e
                    .path()
                    .unwrap_or(&self.base_dir)
                    .display()
                    .to_string();
                Error::read(path, e.into())
            })?;

            if !entry.file_type().is_file() {
                continue;
            }

            let Some(name) = self.logical_name(entry.path()) else {
                continue;
            };
            if self
                .ignore_pattern
                .as_ref()
                .is_some_and(|pattern| pattern.is_match(&name))
            {
                tracing::debug!(file = %name, "Ignoring file");
                continue;
            }

            found.push((name, entry.into_path()));
        }
        Ok(found)
    }

    fn read_file(name: &str, path: &Path) -> Result<ConfigFileInfo> {
        let display = path.display().to_string();
        let bytes = fs::read(path).map_err(|e| Error::read(&display, e))?;
        let modified = fs::metadata(path).and_then(|meta| meta.modified()).ok();
        ConfigFileInfo::load_bytes(name, &display, &bytes, modified)
    }

    /// Checks one already loaded file. Returns the record to store and whether
    /// the contents changed.
    fn refresh(&self, cached: &ConfigFileInfo, path: &Path) -> Result<Option<(ConfigFileInfo, bool)>> {
        let display = path.display().to_string();
        let meta = fs::metadata(path).map_err(|e| Error::read(&display, e))?;
        let size = meta.len();
        let modified = meta.modified().ok();

        if size == cached.size() && same_time(modified, cached.modified()) {
            return Ok(None);
        }

        let bytes = fs::read(path).map_err(|e| Error::read(&display, e))?;
        let sum = checksum(&bytes);

        if sum == cached.checksum() {
            let modified = if self.set_modified_time_on_checksum_match {
                self.restore_mtime(cached, path).or(modified)
            } else {
                modified
            };
            return Ok(Some((cached.with_metadata(size, modified), false)));
        }

        let info = ConfigFileInfo::load_bytes(cached.name(), &display, &bytes, modified)?;
        Ok(Some((info, true)))
    }

    /// Writes the cached mtime back to `path`. Returns the timestamp to keep,
    /// `None` when the write failed.
    fn restore_mtime(&self, cached: &ConfigFileInfo, path: &Path) -> Option<SystemTime> {
        let mtime = cached.modified()?;
        let result = File::options()
            .write(true)
            .open(path)
            .and_then(|file| file.set_modified(mtime));

        match result {
            Ok(()) => {
                tracing::debug!(file = %cached, "Set mtime of file with matching checksum");
                Some(mtime)
            }
            Err(e) => {
                tracing::warn!(file = %cached, error = %e, "Failed to set mtime");
                None
            }
        }
    }
}

fn same_time(a: Option<SystemTime>, b: Option<SystemTime>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => {
            let delta = a.duration_since(b).or_else(|_| b.duration_since(a));
            delta.is_ok_and(|d| d < MTIME_TOLERANCE)
        }
        (None, None) => true,
        _ => false,
    }
}

impl ConfigSource for FileSource {
    fn can_hotload(&self) -> bool {
        self.hotload
    }

    fn begin_preload(&mut self) -> Result<()> {
        self.preloaded = false;
        self.files.clear();
        self.cursor = 0;
        self.pending = self.find_configs()?;

        tracing::info!(source = %self, files = self.pending.len(), "Preloading");
        Ok(())
    }

    fn preload_next(&mut self) -> Result<Option<PreloadStep>> {
        let Some((name, path)) = self.pending.get(self.cursor) else {
            if !self.preloaded {
                self.preloaded = true;
                self.pending.clear();
                self.cursor = 0;
                tracing::info!(source = %self, files = self.files.len(), "Preload complete");
            }
            return Ok(None);
        };

        let info = Self::read_file(name, path)?;
        let name = name.clone();
        self.cursor += 1;
        self.files.insert(name.clone(), info);
        Ok(Some(PreloadStep::Loaded(name)))
    }

    fn is_preloaded(&self) -> bool {
        self.preloaded
    }

    fn hotload(&mut self, changed: &mut Vec<String>) -> Result<()> {
        let found = self.find_configs()?;
        let mut remaining: HashSet<&String> = self.files.keys().collect();
        let mut updates = Vec::new();

        for (name, path) in &found {
            remaining.remove(name);
            match self.files.get(name) {
                None => {
                    let info = Self::read_file(name, path)?;
                    updates.push((info, true));
                }
                Some(cached) => {
                    if let Some(update) = self.refresh(cached, path)? {
                        updates.push(update);
                    }
                }
            }
        }

        let deleted: Vec<String> = remaining.into_iter().cloned().collect();

        for (info, reload) in updates {
            let name = info.name().to_string();
            if reload {
                tracing::info!(source = %self, file = %info, "Hotloaded");
                changed.push(name.clone());
            }
            self.files.insert(name, info);
        }

        for name in deleted {
            tracing::info!(source = %self, file = %name, "File deleted");
            self.files.remove(&name);
            changed.push(name);
        }
        Ok(())
    }

    fn files(&self) -> &HashMap<String, ConfigFileInfo> {
        &self.files
    }
}

impl Display for FileSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "FileSource({})", self.base_dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_names() {
        let source = FileSource::new("/configs").extensions([".yaml", ".yml"]);
        assert_eq!(
            source.logical_name(Path::new("/configs/items/sword.yaml")),
            Some("items/sword".to_string())
        );
        assert_eq!(
            source.logical_name(Path::new("/configs/top.yml")),
            Some("top".to_string())
        );
        assert_eq!(source.logical_name(Path::new("/configs/readme.md")), None);
        assert_eq!(source.logical_name(Path::new("/elsewhere/a.yaml")), None);
    }

    #[test]
    fn test_same_time_tolerance() {
        let t = SystemTime::UNIX_EPOCH + Duration::from_secs(1000);
        assert!(same_time(Some(t), Some(t + Duration::from_millis(400))));
        assert!(same_time(Some(t + Duration::from_millis(400)), Some(t)));
        assert!(!same_time(Some(t), Some(t + Duration::from_secs(2))));
        assert!(!same_time(Some(t), None));
    }

    #[test]
    fn test_missing_dir() {
        let mut source = FileSource::new("/definitely/not/here");
        assert!(matches!(
            source.preload(),
            Err(Error::SourceDirMissing { .. })
        ));
    }
}
