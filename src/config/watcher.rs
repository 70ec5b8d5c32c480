//! File watcher for hot reload of configuration and cluster snapshots.

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

/// Loader run on every change of the watched file.
pub type LoadFn<T, E> = fn(&Path) -> Result<T, E>;

/// A watcher that reloads a file whenever it changes.
///
/// Successfully loaded values are sent to the receiver returned by
/// [`FileWatcher::new`]; failed loads are logged and the previous value
/// stays in effect.
pub struct FileWatcher<T, E> {
    path: PathBuf,
    load: LoadFn<T, E>,
    update_tx: mpsc::UnboundedSender<T>,
}

impl<T, E> FileWatcher<T, E>
where
    T: Send + 'static,
    E: Display + 'static,
{
    /// Create a new FileWatcher.
    ///
    /// Returns the watcher and a receiver for reloaded values.
    pub fn new(path: &Path, load: LoadFn<T, E>) -> (Self, mpsc::UnboundedReceiver<T>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                load,
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// Watching stops when the returned handle is dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let load = self.load;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = ?path, "File change detected, reloading...");
                        match load(&path) {
                            Ok(value) => {
                                let _ = tx.send(value);
                            }
                            Err(e) => {
                                tracing::error!(path = ?path, "Failed to reload: {}. Keeping current state.", e);
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "File watcher started");
        Ok(watcher)
    }
}
