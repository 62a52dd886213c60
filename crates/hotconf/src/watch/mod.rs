//! Background hotload polling.
//!
//! With the `watch` feature a [`PollerHandle`] owns a thread that keeps a
//! shared [`ConfigFileManager`](crate::ConfigFileManager) up to date, so a
//! host without a frame loop does not have to call
//! [`update`](crate::ConfigFileManager::update) itself.
//!
//! # Features
//!
//! - **Interval polling** - the manager's check frequency, or an override
//! - **File events** - directories watched recursively through `notify`
//! - **Debouncing** - bursts of events from one save cause one poll
//! - **Callbacks** - for polls that found changes and for failed polls
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use hotconf::ConfigFileManager;
//! use hotconf::source::FileSource;
//! use hotconf::watch::PollerBuilder;
//! use parking_lot::Mutex;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut manager = ConfigFileManager::default();
//!     manager.add_source(FileSource::new("config").with_hotload(true));
//!     manager.preload()?;
//!     manager.parse_file_with("server", |doc| {
//!         println!("server config: {doc}");
//!         true
//!     })?;
//!
//!     let mut handle = PollerBuilder::new()
//!         .watch_dir("config")
//!         .debounce(Duration::from_millis(200))
//!         .on_error(|err| eprintln!("hotload failed: {err}"))
//!         .build(Arc::new(Mutex::new(manager)))?;
//!
//!     // ... run the application ...
//!
//!     handle.stop();
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌───────────────┐     ┌──────────────────────┐
//! │   notify    │────▶│  poll thread  │────▶│ Mutex<ConfigFile-    │
//! │  (events)   │     │ (debounce,    │     │       Manager>       │
//! └─────────────┘     │  interval)    │     └──────────────────────┘
//!                     └───────────────┘                │
//!                            │                         ▼
//!                            ▼                 reload callbacks
//!                     ┌─────────────┐
//!                     │  on_change  │
//!                     │  on_error   │
//!                     └─────────────┘
//! ```

mod builder;
mod handle;
mod poller;
mod types;

pub use builder::PollerBuilder;
pub use handle::PollerHandle;
pub use poller::{ChangeCallback, ErrorCallback, PollCommand};
pub use types::{PollReport, PollTrigger, WatchError};
