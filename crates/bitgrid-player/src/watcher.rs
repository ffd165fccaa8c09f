use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use notify::Watcher as _;
use notify_debouncer_mini::{DebouncedEventKind, Debouncer, new_debouncer};

const DEBOUNCE: Duration = Duration::from_millis(250);

/// Files whose change should trigger a playlist reload.
pub fn is_reload_trigger(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext == "json" || ext == "bin")
}

/// Watches the storage root for playlist and animation edits.
pub struct PlaylistWatcher {
    _debouncer: Debouncer<notify::RecommendedWatcher>,
    receiver: Receiver<PathBuf>,
}

impl PlaylistWatcher {
    pub fn new(root: &Path) -> Result<Self> {
        let (tx, rx): (Sender<PathBuf>, Receiver<PathBuf>) = crossbeam_channel::unbounded();

        let mut debouncer = new_debouncer(
            DEBOUNCE,
            move |res: Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>| {
                match res {
                    Ok(events) => {
                        for event in events {
                            if event.kind == DebouncedEventKind::Any
                                && is_reload_trigger(&event.path)
                            {
                                let _ = tx.send(event.path);
                            }
                        }
                    }
                    Err(e) => log::warn!("Storage watch error: {e}"),
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(root, notify::RecursiveMode::Recursive)?;
        log::info!("Watching {} for playlist changes", root.display());

        Ok(Self {
            _debouncer: debouncer,
            receiver: rx,
        })
    }

    /// Drain all pending change events and return the unique paths.
    pub fn drain_changes(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        while let Ok(path) = self.receiver.try_recv() {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_triggers() {
        assert!(is_reload_trigger(Path::new("/sd/playlist.json")));
        assert!(is_reload_trigger(Path::new("anims/a.bin")));
        assert!(!is_reload_trigger(Path::new("anims/a.gif")));
        assert!(!is_reload_trigger(Path::new("README")));
    }

    #[test]
    fn fresh_watcher_has_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = PlaylistWatcher::new(dir.path()).unwrap();
        assert!(watcher.drain_changes().is_empty());
    }
}
