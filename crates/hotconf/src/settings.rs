//! Runtime settings for the file manager.
//!
//! [`Settings`] deserializes with serde, every field falling back to its
//! default, so a settings file only needs the values it changes:
//!
//! ```toml
//! enable_hotloading = true
//! hotload_check_frequency_seconds = 0.5
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Knobs controlling loading and hotloading.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Whether [`ConfigFileManager::update`](crate::ConfigFileManager::update)
    /// polls sources at all.
    pub enable_hotloading: bool,

    /// Seconds between two polls driven by `update`.
    pub hotload_check_frequency_seconds: f64,

    /// Extensions, with leading dot, recognized by directory sources built
    /// from these settings.
    pub file_extensions: Vec<String>,

    /// Logical name of the index file of indexed sources built from these
    /// settings.
    pub index_filename: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enable_hotloading: false,
            hotload_check_frequency_seconds: 2.0,
            file_extensions: vec![".yaml".to_string()],
            index_filename: "index".to_string(),
        }
    }
}

impl Settings {
    /// The poll interval as a [`Duration`]. Negative or non-finite values
    /// mean "poll on every update".
    #[must_use]
    pub fn hotload_check_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.hotload_check_frequency_seconds).unwrap_or_default()
    }

    /// A [`FileSource`](crate::source::FileSource) over `dir` using these
    /// extensions and hotload flag.
    #[must_use]
    pub fn file_source(&self, dir: impl Into<std::path::PathBuf>) -> crate::source::FileSource {
        crate::source::FileSource::new(dir)
            .extensions(self.file_extensions.iter().cloned())
            .with_hotload(self.enable_hotloading)
    }

    /// An [`IndexedSource`](crate::source::IndexedSource) over `reader` using
    /// this index name and hotload flag.
    #[must_use]
    pub fn indexed_source<R: crate::source::ResourceReader>(
        &self,
        reader: R,
    ) -> crate::source::IndexedSource<R> {
        crate::source::IndexedSource::new(reader)
            .index_name(self.index_filename.clone())
            .with_hotload(self.enable_hotloading)
    }

    /// Parses settings from TOML text.
    ///
    /// # Errors
    ///
    /// [`Error::Settings`](crate::Error::Settings) on malformed TOML or
    /// mistyped fields.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(text: &str) -> crate::Result<Self> {
        toml::from_str(text).map_err(|source| crate::Error::Settings {
            message: "failed to parse settings".to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(!settings.enable_hotloading);
        assert_eq!(settings.hotload_check_interval(), Duration::from_secs(2));
        assert_eq!(settings.file_extensions, [".yaml"]);
        assert_eq!(settings.index_filename, "index");
    }

    #[test]
    fn test_bad_interval_polls_immediately() {
        let settings = Settings {
            hotload_check_frequency_seconds: -1.0,
            ..Settings::default()
        };
        assert_eq!(settings.hotload_check_interval(), Duration::ZERO);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"enable_hotloading": true}"#).unwrap();
        assert!(settings.enable_hotloading);
        assert_eq!(settings.index_filename, "index");
    }

    #[test]
    fn test_file_source_carries_flags() {
        use crate::source::ConfigSource;

        let settings = Settings {
            enable_hotloading: true,
            ..Settings::default()
        };
        assert!(settings.file_source("/tmp").can_hotload());
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_from_toml() {
        let settings =
            Settings::from_toml_str("enable_hotloading = true\nhotload_check_frequency_seconds = 0.5\n")
                .unwrap();
        assert!(settings.enable_hotloading);
        assert_eq!(settings.hotload_check_interval(), Duration::from_millis(500));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_from_toml_type_error() {
        let err = Settings::from_toml_str("enable_hotloading = \"yes\"").unwrap_err();
        assert!(matches!(err, crate::Error::Settings { .. }));
    }
}
