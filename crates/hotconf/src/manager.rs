//! The file manager: sources, combined files and reload callbacks.
//!
//! [`ConfigFileManager`] is the entry point most applications use. It owns a
//! list of [`ConfigSource`]s, resolves logical file names against them,
//! maintains *combined files* (in-memory documents built from several real
//! files) and calls reload callbacks when hotloading detects changes.
//!
//! # Example
//!
//! ```rust
//! use hotconf::ConfigFileManager;
//! use hotconf::source::{IndexedSource, MemoryReader};
//!
//! let reader = MemoryReader::new();
//! reader.insert("index", "[index, items/sword, items/shield]");
//! reader.insert("items/sword", "sword: {damage: 5}");
//! reader.insert("items/shield", "shield: {armor: 3}");
//!
//! let mut manager = ConfigFileManager::default();
//! manager.add_source(IndexedSource::new(reader.clone()).with_hotload(true));
//! manager.preload().unwrap();
//!
//! manager
//!     .parse_files_as_merged_dict("items/*", |items| {
//!         assert_eq!(items.len().unwrap(), 2);
//!         true
//!     })
//!     .unwrap();
//!
//! reader.insert("items/sword", "sword: {damage: 7}");
//! let changed = manager.do_immediate_hotload().unwrap();
//! assert_eq!(changed, ["items/sword", "items/*_file"]);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::{Error, Result};
use crate::glob::{filter_matching, glob_to_regex};
use crate::node::{DocNode, combine_dict, combine_list};
use crate::settings::Settings;
use crate::source::{ConfigFileInfo, ConfigSource, PreloadStep};

/// Builds a combined file from the documents of its constituents.
pub type Combiner = Box<dyn Fn(&[DocNode]) -> Result<DocNode> + Send + Sync>;

/// Called with the new document whenever a file is (re)loaded. Returning
/// `false` unregisters the callback.
pub type ReloadCallback = Box<dyn FnMut(&DocNode) -> bool + Send>;

struct CombinedFile {
    filenames: Vec<String>,
    combiner: Combiner,
    parsed: Option<DocNode>,
}

/// Owns configuration sources and everything derived from them.
pub struct ConfigFileManager {
    settings: Settings,
    sources: Vec<Box<dyn ConfigSource>>,
    combined: IndexMap<String, CombinedFile>,
    combined_by_subfile: HashMap<String, Vec<String>>,
    reload_callbacks: HashMap<String, Vec<ReloadCallback>>,
    hotloading: bool,
    next_hotload: Duration,
    preloaded: bool,
}

impl Default for ConfigFileManager {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl fmt::Debug for ConfigFileManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sources: Vec<String> = self.sources.iter().map(ToString::to_string).collect();
        f.debug_struct("ConfigFileManager")
            .field("sources", &sources)
            .field("combined", &self.combined.keys().collect::<Vec<_>>())
            .field("reload_callbacks", &self.count_reload_callbacks())
            .field("hotloading", &self.hotloading)
            .field("preloaded", &self.preloaded)
            .finish_non_exhaustive()
    }
}

impl ConfigFileManager {
    /// Empty manager. Hotloading starts as `settings.enable_hotloading`.
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            hotloading: settings.enable_hotloading,
            next_hotload: settings.hotload_check_interval(),
            settings,
            sources: Vec::new(),
            combined: IndexMap::new(),
            combined_by_subfile: HashMap::new(),
            reload_callbacks: HashMap::new(),
            preloaded: false,
        }
    }

    /// The settings this manager was created with.
    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Registers a source. Sources are searched in registration order.
    ///
    /// A source added after preloading must be preloaded by the caller, or
    /// the manager preloaded again.
    pub fn add_source(&mut self, source: impl ConfigSource + 'static) {
        self.sources.push(Box::new(source));
    }

    /// Number of registered sources.
    #[must_use]
    pub fn count_sources(&self) -> usize {
        self.sources.len()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Preloading
    // ─────────────────────────────────────────────────────────────────────

    /// Restarts preloading and returns an iterator over its steps, across all
    /// sources in order. Combined files are built after the last step.
    pub fn step_preload(&mut self) -> ManagerPreload<'_> {
        self.preloaded = false;
        tracing::info!(sources = self.sources.len(), "Preloading sources");
        ManagerPreload {
            manager: self,
            source: 0,
            started: false,
            done: false,
        }
    }

    /// Preloads every source and builds combined files.
    ///
    /// # Errors
    ///
    /// The first source or combiner error.
    pub fn preload(&mut self) -> Result<()> {
        for step in self.step_preload() {
            step?;
        }
        Ok(())
    }

    /// Whether preloading ran to completion.
    #[must_use]
    pub const fn is_preloaded(&self) -> bool {
        self.preloaded
    }

    fn finish_preload(&mut self) -> Result<()> {
        let names: Vec<String> = self.combined.keys().cloned().collect();
        for name in names {
            self.build_combined(&name)?;
        }

        self.preloaded = true;
        self.next_hotload = self.settings.hotload_check_interval();
        tracing::info!(hotloading = self.hotloading, "Done preloading");
        Ok(())
    }

    fn ensure_preloaded(&self, operation: &'static str) -> Result<()> {
        if self.preloaded {
            Ok(())
        } else {
            Err(Error::NotPreloaded { operation })
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lookup
    // ─────────────────────────────────────────────────────────────────────

    fn lookup(&self, name: &str) -> Option<&DocNode> {
        self.sources
            .iter()
            .find_map(|source| source.file(name))
            .map(ConfigFileInfo::parsed)
            .or_else(|| {
                self.combined
                    .get(name)
                    .and_then(|combined| combined.parsed.as_ref())
            })
    }

    /// The document of a loaded or combined file.
    ///
    /// # Errors
    ///
    /// [`Error::NotPreloaded`] before preloading, [`Error::FileNotFound`] if
    /// no source or combined file has that name.
    pub fn parse_file(&self, name: &str) -> Result<DocNode> {
        self.ensure_preloaded("parse_file")?;
        self.lookup(name)
            .cloned()
            .ok_or_else(|| Error::FileNotFound {
                name: name.to_string(),
            })
    }

    /// Calls `callback` with the document of `name` now, and again after
    /// every reload for as long as it returns `true`.
    pub fn parse_file_with(
        &mut self,
        name: &str,
        mut callback: impl FnMut(&DocNode) -> bool + Send + 'static,
    ) -> Result<()> {
        let doc = self.parse_file(name)?;
        if callback(&doc) {
            self.register_reload_callback(name, callback);
        }
        Ok(())
    }

    /// Whether any source has loaded `name`.
    #[must_use]
    pub fn has_file(&self, name: &str) -> bool {
        self.sources.iter().any(|source| source.file(name).is_some())
    }

    /// Record of a file loaded by a source.
    pub fn file_info(&self, name: &str) -> Result<&ConfigFileInfo> {
        self.ensure_preloaded("file_info")?;
        self.sources
            .iter()
            .find_map(|source| source.file(name))
            .ok_or_else(|| Error::FileNotFound {
                name: name.to_string(),
            })
    }

    /// Names of loaded files matching `pattern`, source by source in sorted
    /// order.
    pub fn filenames_matching_regex(&self, pattern: &Regex) -> Result<Vec<String>> {
        self.ensure_preloaded("filenames_matching_regex")?;
        Ok(self
            .sources
            .iter()
            .flat_map(|source| filter_matching(pattern, source.sorted_filenames()))
            .collect())
    }

    /// Names of loaded files matching a glob; see [`crate::glob`].
    pub fn filenames_matching_glob(&self, glob: &str) -> Result<Vec<String>> {
        self.filenames_matching_regex(&glob_to_regex(glob)?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Combined files
    // ─────────────────────────────────────────────────────────────────────

    /// Registers an in-memory file named `name`, built by `combiner` from the
    /// documents of `filenames` and rebuilt whenever one of them changes.
    /// An existing combined file with the same name is replaced.
    ///
    /// # Errors
    ///
    /// When already preloaded, any error from building the file right away;
    /// the registration is rolled back in that case.
    pub fn register_combined_file(
        &mut self,
        filenames: Vec<String>,
        name: impl Into<String>,
        combiner: impl Fn(&[DocNode]) -> Result<DocNode> + Send + Sync + 'static,
    ) -> Result<()> {
        let name = name.into();
        self.unregister_combined_file(&name);

        for filename in &filenames {
            let dependents = self.combined_by_subfile.entry(filename.clone()).or_default();
            if !dependents.contains(&name) {
                dependents.push(name.clone());
            }
        }
        self.combined.insert(
            name.clone(),
            CombinedFile {
                filenames,
                combiner: Box::new(combiner),
                parsed: None,
            },
        );

        if self.preloaded
            && let Err(e) = self.build_combined(&name)
        {
            self.unregister_combined_file(&name);
            return Err(e);
        }
        Ok(())
    }

    /// Stops producing a combined file. Returns whether it existed.
    pub fn unregister_combined_file(&mut self, name: &str) -> bool {
        let Some(combined) = self.combined.shift_remove(name) else {
            return false;
        };

        for filename in &combined.filenames {
            if let Some(dependents) = self.combined_by_subfile.get_mut(filename) {
                dependents.retain(|dependent| dependent != name);
                if dependents.is_empty() {
                    self.combined_by_subfile.remove(filename);
                }
            }
        }
        true
    }

    fn build_combined(&mut self, name: &str) -> Result<()> {
        let Some(combined) = self.combined.get(name) else {
            return Ok(());
        };

        let mut docs = Vec::with_capacity(combined.filenames.len());
        for filename in &combined.filenames {
            // a combined file never feeds itself
            if filename == name {
                continue;
            }
            let doc = self.lookup(filename).ok_or_else(|| Error::FileNotFound {
                name: filename.clone(),
            })?;
            docs.push(doc.clone());
        }

        let parsed = (combined.combiner)(&docs)?;
        if let Some(combined) = self.combined.get_mut(name) {
            combined.parsed = Some(parsed);
        }
        Ok(())
    }

    /// Combines every file matching `glob` into one list, registered as the
    /// combined file `<glob>_file`, and hands it to `callback` like
    /// [`parse_file_with`](Self::parse_file_with).
    pub fn parse_files_as_list(
        &mut self,
        glob: &str,
        callback: impl FnMut(&DocNode) -> bool + Send + 'static,
    ) -> Result<()> {
        let name = format!("{glob}_file");
        let filenames = self.filenames_matching_glob(glob)?;
        self.register_combined_file(filenames, name.clone(), |docs| Ok(combine_list(docs)))?;
        self.parse_file_with(&name, callback)
    }

    /// Combines every dictionary file matching `glob` into one dictionary,
    /// later files overriding earlier keys, registered as `<glob>_file`.
    pub fn parse_files_as_merged_dict(
        &mut self,
        glob: &str,
        callback: impl FnMut(&DocNode) -> bool + Send + 'static,
    ) -> Result<()> {
        let name = format!("{glob}_file");
        let filenames = self.filenames_matching_glob(glob)?;
        self.register_combined_file(filenames, name.clone(), combine_dict)?;
        self.parse_file_with(&name, callback)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Hotloading
    // ─────────────────────────────────────────────────────────────────────

    /// Registers a callback for reloads of `name`.
    pub fn register_reload_callback(
        &mut self,
        name: impl Into<String>,
        callback: impl FnMut(&DocNode) -> bool + Send + 'static,
    ) {
        self.reload_callbacks
            .entry(name.into())
            .or_default()
            .push(Box::new(callback));
    }

    /// Number of registered reload callbacks across all files.
    #[must_use]
    pub fn count_reload_callbacks(&self) -> usize {
        self.reload_callbacks.values().map(Vec::len).sum()
    }

    /// Turns periodic polling from [`update`](Self::update) on or off. The
    /// first poll after enabling waits a full interval.
    pub fn set_hotloading(&mut self, enabled: bool) {
        self.hotloading = enabled;
        if enabled {
            self.next_hotload = self.settings.hotload_check_interval();
        }
    }

    /// Whether [`update`](Self::update) polls sources.
    #[must_use]
    pub const fn is_hotloading(&self) -> bool {
        self.hotloading
    }

    /// Polls every hotloadable source now, rebuilds the combined files that
    /// depend on changed files and runs reload callbacks. Returns the names of
    /// changed files, combined files included.
    ///
    /// A failing source does not stop the others from being polled; all
    /// failures are returned together once the changes were applied.
    ///
    /// # Errors
    ///
    /// [`Error::NotPreloaded`] before preloading; otherwise the accumulated
    /// source and combiner errors (see [`Error::multiple`]).
    pub fn do_immediate_hotload(&mut self) -> Result<Vec<String>> {
        self.ensure_preloaded("do_immediate_hotload")?;
        self.next_hotload = self.settings.hotload_check_interval();

        let mut changed = Vec::new();
        let mut errors = Vec::new();

        for source in self.sources.iter_mut().filter(|source| source.can_hotload()) {
            if let Err(e) = source.hotload(&mut changed) {
                tracing::error!(source = %source, error = %e, "Hotload failed");
                errors.push(e);
            }
        }

        // `changed` grows while it is walked so chained combined files rebuild too.
        let mut i = 0;
        while i < changed.len() {
            let dependents = self
                .combined_by_subfile
                .get(&changed[i])
                .cloned()
                .unwrap_or_default();
            for combined in dependents {
                if changed.contains(&combined) {
                    continue;
                }
                match self.build_combined(&combined) {
                    Ok(()) => changed.push(combined),
                    Err(e) => {
                        tracing::error!(file = %combined, error = %e, "Rebuilding combined file failed");
                        errors.push(e);
                    }
                }
            }
            i += 1;
        }

        for name in &changed {
            tracing::info!(file = %name, "Hotloaded file");
            self.run_reload_callbacks(name);
        }

        match Error::multiple(errors) {
            Some(err) => Err(err),
            None => Ok(changed),
        }
    }

    fn run_reload_callbacks(&mut self, name: &str) {
        let Some(doc) = self.lookup(name).cloned() else {
            return;
        };
        let Some(mut callbacks) = self.reload_callbacks.remove(name) else {
            return;
        };

        callbacks.retain_mut(|callback| callback(&doc));
        if !callbacks.is_empty() {
            self.reload_callbacks.insert(name.to_string(), callbacks);
        }
    }

    /// Advances the hotload timer by `dt` and polls once it runs out. Does
    /// nothing while hotloading is off or before preloading.
    pub fn update(&mut self, dt: Duration) -> Result<Vec<String>> {
        if !self.hotloading || !self.preloaded {
            return Ok(Vec::new());
        }

        self.next_hotload = self.next_hotload.saturating_sub(dt);
        if self.next_hotload.is_zero() {
            self.do_immediate_hotload()
        } else {
            Ok(Vec::new())
        }
    }
}

/// Iterator over the preload steps of every source of a manager.
pub struct ManagerPreload<'a> {
    manager: &'a mut ConfigFileManager,
    source: usize,
    started: bool,
    done: bool,
}

impl Iterator for ManagerPreload<'_> {
    type Item = Result<PreloadStep>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let Some(source) = self.manager.sources.get_mut(self.source) else {
                self.done = true;
                return self.manager.finish_preload().err().map(Err);
            };

            let step = if self.started {
                source.preload_next()
            } else {
                self.started = true;
                tracing::info!(source = %source, "Preloading source");
                source.begin_preload().map(|()| Some(PreloadStep::Started))
            };

            match step {
                Ok(Some(step)) => return Some(Ok(step)),
                Ok(None) => {
                    self.source += 1;
                    self.started = false;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}

impl fmt::Debug for ManagerPreload<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerPreload")
            .field("source", &self.source)
            .field("started", &self.started)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}
