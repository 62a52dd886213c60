//! Internal poll thread.
//!
//! The thread waits on three inputs: commands from the handle, `notify`
//! events from the watched directories and its own interval timer. Every
//! trigger ends in one [`ConfigFileManager::do_immediate_hotload`] call made
//! under the manager lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded, never, select};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;

use super::types::{PollReport, PollTrigger, WatchError};
use crate::ConfigFileManager;

/// Idle wake-up when neither a timer nor a pending event is due.
const IDLE_WAIT: Duration = Duration::from_millis(100);

/// Commands sent to the poll thread.
#[derive(Debug, Clone)]
pub enum PollCommand {
    /// Poll right away.
    Poll,
    /// Stop the thread.
    Stop,
}

/// Callback type for polls that found changes.
pub type ChangeCallback = Box<dyn Fn(PollReport) + Send + Sync + 'static>;

/// Callback type for failed polls.
pub type ErrorCallback = Box<dyn Fn(WatchError) + Send + Sync + 'static>;

/// State shared between the handle and the thread.
pub(crate) struct PollerState {
    running: AtomicBool,
    polls: AtomicU64,
}

impl PollerState {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            polls: AtomicU64::new(0),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }

    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Acquire)
    }
}

pub(crate) struct PollerConfig {
    pub dirs: Vec<PathBuf>,
    pub interval: Option<Duration>,
    pub debounce: Duration,
    pub on_change: Option<ChangeCallback>,
    pub on_error: Option<ErrorCallback>,
}

/// The running poll thread and its control channel.
pub(crate) struct Poller {
    state: Arc<PollerState>,
    command_tx: Sender<PollCommand>,
    thread_handle: Option<JoinHandle<()>>,
}

impl Poller {
    pub fn start(
        manager: Arc<Mutex<ConfigFileManager>>,
        config: PollerConfig,
    ) -> Result<Self, WatchError> {
        let state = Arc::new(PollerState::new());
        let (command_tx, command_rx) = bounded::<PollCommand>(16);

        let (watcher, notify_rx) = if config.dirs.is_empty() {
            (None, never())
        } else {
            let (notify_tx, notify_rx) = bounded::<notify::Result<Event>>(100);
            let mut watcher = create_notify_watcher(notify_tx)?;
            for dir in &config.dirs {
                watch_dir(&mut watcher, dir)?;
            }
            (Some(watcher), notify_rx)
        };

        let thread_state = state.clone();
        let thread_handle = thread::Builder::new()
            .name("hotconf-poller".to_string())
            .spawn(move || {
                poll_loop(
                    &thread_state,
                    &manager,
                    &command_rx,
                    &notify_rx,
                    &config,
                    watcher,
                );
            })
            .map_err(|e| {
                WatchError::init_failed(format!("failed to spawn poller thread: {e}"), None)
            })?;

        Ok(Self {
            state,
            command_tx,
            thread_handle: Some(thread_handle),
        })
    }

    pub fn state(&self) -> &PollerState {
        &self.state
    }

    pub fn request_poll(&self) -> Result<(), WatchError> {
        if !self.state.is_running() {
            return Err(WatchError::Stopped);
        }
        self.command_tx
            .send(PollCommand::Poll)
            .map_err(|_| WatchError::channel_error("failed to send poll command"))
    }

    pub fn command_sender(&self) -> Sender<PollCommand> {
        self.command_tx.clone()
    }

    /// Stops the thread and waits for it to exit.
    pub fn stop(&mut self) {
        self.state.stop();
        let _ = self.command_tx.send(PollCommand::Stop);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn create_notify_watcher(
    tx: Sender<notify::Result<Event>>,
) -> Result<RecommendedWatcher, WatchError> {
    notify::recommended_watcher(move |res| {
        let _ = tx.send(res);
    })
    .map_err(|e| WatchError::init_failed(format!("failed to create file watcher: {e}"), Some(e)))
}

fn watch_dir(watcher: &mut RecommendedWatcher, dir: &Path) -> Result<(), WatchError> {
    if !dir.is_dir() {
        return Err(WatchError::path_error(dir, "not an existing directory"));
    }

    watcher
        .watch(dir, RecursiveMode::Recursive)
        .map_err(|e| WatchError::path_error(dir, format!("failed to watch: {e}")))
}

fn poll_loop(
    state: &PollerState,
    manager: &Mutex<ConfigFileManager>,
    command_rx: &Receiver<PollCommand>,
    notify_rx: &Receiver<notify::Result<Event>>,
    config: &PollerConfig,
    _watcher: Option<RecommendedWatcher>, // keeps notify alive
) {
    let mut pending_event: Option<PathBuf> = None;
    let mut last_event = Instant::now();
    let mut next_tick = config.interval.map(|interval| Instant::now() + interval);

    while state.is_running() {
        let now = Instant::now();
        let wait = [
            pending_event.as_ref().map(|_| last_event + config.debounce),
            next_tick,
        ]
        .into_iter()
        .flatten()
        .min()
        .map_or(IDLE_WAIT, |deadline| deadline.saturating_duration_since(now));

        select! {
            recv(command_rx) -> cmd => {
                match cmd {
                    Ok(PollCommand::Poll) => poll(state, manager, config, PollTrigger::Manual),
                    Ok(PollCommand::Stop) | Err(_) => {
                        state.stop();
                        break;
                    }
                }
            }

            recv(notify_rx) -> event => {
                if let Ok(Ok(event)) = event
                    && let Some(path) = relevant_path(&event)
                {
                    pending_event = Some(path);
                    last_event = Instant::now();
                }
            }

            default(wait) => {}
        }

        if pending_event.is_some() && last_event.elapsed() >= config.debounce {
            if let Some(path) = pending_event.take() {
                poll(state, manager, config, PollTrigger::FileEvent(path));
            }
            // the event poll covers the timer too
            next_tick = config.interval.map(|interval| Instant::now() + interval);
        }

        if let Some(tick) = next_tick
            && Instant::now() >= tick
        {
            poll(state, manager, config, PollTrigger::Interval);
            next_tick = config.interval.map(|interval| Instant::now() + interval);
        }
    }
}

/// Path of a create, modify or remove event.
fn relevant_path(event: &Event) -> Option<PathBuf> {
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_) => {
            event.paths.first().cloned()
        }
        _ => None,
    }
}

fn poll(
    state: &PollerState,
    manager: &Mutex<ConfigFileManager>,
    config: &PollerConfig,
    trigger: PollTrigger,
) {
    let result = manager.lock().do_immediate_hotload();
    state.polls.fetch_add(1, Ordering::AcqRel);

    match result {
        Ok(changed) if changed.is_empty() => {
            tracing::trace!(?trigger, "Poll found no changes");
        }
        Ok(changed) => {
            tracing::debug!(?trigger, files = changed.len(), "Poll found changes");
            if let Some(cb) = &config.on_change {
                cb(PollReport::new(changed, trigger));
            }
        }
        Err(e) => {
            tracing::error!(?trigger, error = %e, "Poll failed");
            if let Some(cb) = &config.on_error {
                cb(WatchError::poll_failed(e));
            }
        }
    }
}
