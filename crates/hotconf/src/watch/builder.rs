//! Builder for the background poller.
//!
//! The [`PollerBuilder`] configures which directories to watch, how often to
//! poll and which callbacks receive the results.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::handle::PollerHandle;
use super::poller::{ChangeCallback, ErrorCallback, Poller, PollerConfig};
use super::types::{PollReport, WatchError};
use crate::ConfigFileManager;

/// Builder for a background hotload poller.
///
/// The poller calls
/// [`do_immediate_hotload`](ConfigFileManager::do_immediate_hotload) on a
/// shared manager:
/// - every poll interval (defaults to the manager's
///   `hotload_check_frequency_seconds`; zero disables the timer),
/// - after file events under a watched directory settle for the debounce
///   duration,
/// - on [`PollerHandle::request_poll`].
///
/// # Example
///
/// ```ignore
/// let manager = Arc::new(Mutex::new(manager));
/// let handle = PollerBuilder::new()
///     .watch_dir("config")
///     .debounce(Duration::from_millis(200))
///     .on_change(|report| println!("reloaded {:?}", report.changed))
///     .on_error(|err| eprintln!("hotload failed: {err}"))
///     .build(manager.clone())?;
/// ```
pub struct PollerBuilder {
    /// Directories watched recursively for file events.
    dirs: Vec<PathBuf>,

    /// Poll interval override.
    interval: Option<Duration>,

    /// Debounce duration (default: 100ms).
    debounce: Duration,

    /// Callback for polls that found changes.
    on_change: Option<ChangeCallback>,

    /// Callback for failed polls.
    on_error: Option<ErrorCallback>,
}

impl PollerBuilder {
    /// Create a new builder: no watched directories, 100ms debounce, the
    /// manager's interval, no callbacks.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dirs: Vec::new(),
            interval: None,
            debounce: Duration::from_millis(100),
            on_change: None,
            on_error: None,
        }
    }

    /// Watch a directory (recursively) for file events.
    #[must_use]
    pub fn watch_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.dirs.push(path.as_ref().to_path_buf());
        self
    }

    /// Watch several directories.
    #[must_use]
    pub fn watch_dirs<P: AsRef<Path>>(mut self, paths: impl IntoIterator<Item = P>) -> Self {
        self.dirs
            .extend(paths.into_iter().map(|p| p.as_ref().to_path_buf()));
        self
    }

    /// Poll every `interval` regardless of file events. `Duration::ZERO`
    /// turns timed polling off.
    #[must_use]
    pub const fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// How long file events must settle before a poll.
    #[must_use]
    pub const fn debounce(mut self, duration: Duration) -> Self {
        self.debounce = duration;
        self
    }

    /// Called on the poll thread after every poll that found changes.
    #[must_use]
    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(PollReport) + Send + Sync + 'static,
    {
        self.on_change = Some(Box::new(callback));
        self
    }

    /// Called on the poll thread after every failed poll.
    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(WatchError) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// Starts the poll thread.
    ///
    /// Reload callbacks registered on the manager run on the poll thread
    /// while it holds the manager lock; they must not lock it again.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError`] if:
    /// - the manager is not preloaded
    /// - a watched directory does not exist or cannot be watched
    /// - the thread cannot be spawned
    pub fn build(self, manager: Arc<Mutex<ConfigFileManager>>) -> Result<PollerHandle, WatchError> {
        let interval = {
            let manager = manager.lock();
            if !manager.is_preloaded() {
                return Err(WatchError::init_failed("manager is not preloaded", None));
            }
            self.interval
                .unwrap_or_else(|| manager.settings().hotload_check_interval())
        };

        let config = PollerConfig {
            dirs: self.dirs,
            interval: (!interval.is_zero()).then_some(interval),
            debounce: self.debounce,
            on_change: self.on_change,
            on_error: self.on_error,
        };

        let poller = Poller::start(manager.clone(), config)?;
        Ok(PollerHandle::new(poller, manager))
    }
}

impl Default for PollerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
