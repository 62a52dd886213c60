//! Hot reload example demonstrating background polling.
//!
//! This example writes a small config directory, starts a poller over it and
//! edits a file; the reload callback prints the new value.
//!
//! # Running
//!
//! ```bash
//! cargo run --example hot_reload --features watch
//! ```

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hotconf::source::FileSource;
use hotconf::{ConfigFileManager, PollerBuilder, Settings};
use parking_lot::Mutex;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::temp_dir().join("hotconf_example");
    fs::create_dir_all(dir.join("items"))?;
    fs::write(dir.join("server.yaml"), "port: 8080\n")?;
    fs::write(dir.join("items/sword.yaml"), "sword: {damage: 5}\n")?;
    fs::write(dir.join("items/shield.yaml"), "shield: {armor: 3}\n")?;

    let settings = Settings {
        hotload_check_frequency_seconds: 0.5,
        ..Settings::default()
    };
    let mut manager = ConfigFileManager::new(settings);
    manager.add_source(FileSource::new(&dir).with_hotload(true));
    manager.preload()?;

    manager.parse_file_with("server", |doc| {
        println!("server: {doc}");
        true
    })?;
    manager.parse_files_as_merged_dict("items/*", |items| {
        println!("items:  {items}");
        true
    })?;

    let mut handle = PollerBuilder::new()
        .watch_dir(&dir)
        .debounce(Duration::from_millis(100))
        .on_change(|report| println!("changed {:?} ({:?})", report.changed, report.trigger))
        .on_error(|err| eprintln!("hotload failed: {err}"))
        .build(Arc::new(Mutex::new(manager)))?;

    for port in [9090, 10000] {
        thread::sleep(Duration::from_secs(1));
        println!("writing port {port}");
        fs::write(dir.join("server.yaml"), format!("port: {port}\n"))?;
    }

    thread::sleep(Duration::from_secs(1));
    fs::write(dir.join("items/sword.yaml"), "sword: {damage: 7}\n")?;
    thread::sleep(Duration::from_secs(1));

    handle.stop();
    fs::remove_dir_all(&dir)?;
    Ok(())
}
