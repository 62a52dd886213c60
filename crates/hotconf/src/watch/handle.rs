//! User-facing handle for the background poller.

use std::fmt;
use std::sync::Arc;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use super::poller::{PollCommand, Poller};
use super::types::WatchError;
use crate::ConfigFileManager;

/// Handle to a running poller.
///
/// Dropping the handle stops the poll thread and waits for it. The manager
/// stays usable through [`manager`](Self::manager) or any other clone of
/// the `Arc`.
///
/// # Example
///
/// ```ignore
/// let polls = handle.poll_count();
/// handle.request_poll()?;
/// // ... later ...
/// if handle.poll_count() > polls {
///     let doc = handle.manager().lock().parse_file("server")?;
/// }
/// handle.stop();
/// ```
pub struct PollerHandle {
    poller: Poller,
    manager: Arc<Mutex<ConfigFileManager>>,
}

impl PollerHandle {
    pub(crate) fn new(poller: Poller, manager: Arc<Mutex<ConfigFileManager>>) -> Self {
        Self { poller, manager }
    }

    /// The polled manager.
    #[must_use]
    pub fn manager(&self) -> &Arc<Mutex<ConfigFileManager>> {
        &self.manager
    }

    /// Asks the thread to poll right away.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Stopped`] if the poller has been stopped,
    /// or [`WatchError::ChannelError`] if the thread is gone.
    pub fn request_poll(&self) -> Result<(), WatchError> {
        self.poller.request_poll()
    }

    /// Number of polls finished so far, failed ones included.
    #[must_use]
    pub fn poll_count(&self) -> u64 {
        self.poller.state().polls()
    }

    /// Stops the thread and waits for it to exit. Idempotent.
    pub fn stop(&mut self) {
        self.poller.stop();
    }

    /// Returns `false` after [`stop`](Self::stop).
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.poller.state().is_running()
    }

    /// A clone of the command sender, for triggering polls from elsewhere.
    #[must_use]
    pub fn command_sender(&self) -> Sender<PollCommand> {
        self.poller.command_sender()
    }
}

impl fmt::Debug for PollerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollerHandle")
            .field("polls", &self.poll_count())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
