//! Core types for background polling.
//!
//! - [`WatchError`] - errors from setting up or running the poller
//! - [`PollReport`] - what one poll found
//! - [`PollTrigger`] - what caused a poll

use std::path::PathBuf;
use std::time::Instant;

use miette::Diagnostic;
use thiserror::Error;

/// Error type for the background poller.
#[derive(Debug, Error, Diagnostic)]
#[non_exhaustive]
pub enum WatchError {
    /// The poller could not be started.
    #[error("failed to start hotload poller: {message}")]
    #[diagnostic(
        code(hotconf::watch::init_failed),
        help("Preload the manager before starting the poller and check the watched directories")
    )]
    InitFailed {
        /// Human-readable error message.
        message: String,
        /// The underlying notify error, if any.
        #[source]
        source: Option<notify::Error>,
    },

    /// A directory could not be watched.
    #[error("failed to watch path '{path}': {message}")]
    #[diagnostic(
        code(hotconf::watch::path_error),
        help("Ensure the directory exists and you have read permissions")
    )]
    PathError {
        /// The path that could not be watched.
        path: PathBuf,
        /// Human-readable error message.
        message: String,
    },

    /// A poll failed. Sources that did poll successfully kept their changes.
    #[error("hotload poll failed: {message}")]
    #[diagnostic(
        code(hotconf::watch::poll_failed),
        help("Fix the reported files and save them again; the next poll picks them up")
    )]
    PollFailed {
        /// Human-readable error message.
        message: String,
        /// The underlying source and combiner errors.
        #[related]
        errors: Vec<crate::Error>,
    },

    /// The poller has been stopped.
    #[error("poller has been stopped")]
    #[diagnostic(
        code(hotconf::watch::stopped),
        help("Start a new poller to resume hotloading")
    )]
    Stopped,

    /// Channel communication error.
    #[error("internal channel error: {message}")]
    #[diagnostic(code(hotconf::watch::channel_error))]
    ChannelError {
        /// Human-readable error message.
        message: String,
    },
}

impl WatchError {
    /// Create a new `InitFailed` error.
    pub fn init_failed(message: impl Into<String>, source: Option<notify::Error>) -> Self {
        Self::InitFailed {
            message: message.into(),
            source,
        }
    }

    /// Create a new `PathError`.
    pub fn path_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::PathError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wraps a failed manager poll, unpacking [`crate::Error::Multiple`].
    pub fn poll_failed(error: crate::Error) -> Self {
        let message = error.to_string();
        let errors = match error {
            crate::Error::Multiple { errors } => errors,
            other => vec![other],
        };
        Self::PollFailed { message, errors }
    }

    /// Create a new `ChannelError`.
    pub fn channel_error(message: impl Into<String>) -> Self {
        Self::ChannelError {
            message: message.into(),
        }
    }
}

/// What caused a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PollTrigger {
    /// The poll interval elapsed.
    Interval,

    /// A file event under a watched directory, after debouncing. Carries the
    /// path of the last event.
    FileEvent(PathBuf),

    /// [`PollerHandle::request_poll`](super::PollerHandle::request_poll).
    Manual,
}

/// Outcome of a poll that found changes.
#[derive(Debug, Clone)]
pub struct PollReport {
    /// Logical names of changed files, combined files included.
    pub changed: Vec<String>,

    /// What caused the poll.
    pub trigger: PollTrigger,

    /// When the poll finished.
    pub timestamp: Instant,
}

impl PollReport {
    /// Creates a report stamped now.
    pub fn new(changed: Vec<String>, trigger: PollTrigger) -> Self {
        Self {
            changed,
            trigger,
            timestamp: Instant::now(),
        }
    }

    /// Whether `name` is among the changed files.
    #[must_use]
    pub fn file_changed(&self, name: &str) -> bool {
        self.changed.iter().any(|changed| changed == name)
    }
}
