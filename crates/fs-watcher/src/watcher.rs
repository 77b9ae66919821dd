//! The notify-backed change watcher.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                 Blocking Thread (spawn_blocking)             │
//! │  ┌───────────────────┐    ┌──────────────────────────────┐  │
//! │  │ RecommendedWatcher│ -> │ Callback (relative + filter) │  │
//! │  └───────────────────┘    └──────────────┬───────────────┘  │
//! └──────────────────────────────────────────│──────────────────┘
//!                                            │ blocking_send
//!                                            ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Async Runtime (tokio)                   │
//! │  mpsc::Receiver<ChangeEvent> -> debounce_loop -> SyncTrigger │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use fs_core::WatchConfig;
use notify::{RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::WatchError;
use crate::events::ChangeEvent;
use crate::filter::FileFilter;
use crate::trigger::{LoopExit, SyncTrigger, debounce_loop};

/// Default channel capacity for change events.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Watches a source tree and streams filtered [`ChangeEvent`]s.
///
/// Dropping the watcher stops the notify thread.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use camino::Utf8Path;
/// use fs_core::WatchConfig;
/// use fs_ignore::PathFilter;
/// use fs_watcher::{ChangeWatcher, IgnoreFilter};
///
/// # async fn example() -> Result<(), fs_watcher::WatchError> {
/// let filter = IgnoreFilter::new(Arc::new(PathFilter::default()));
/// let mut watcher =
///     ChangeWatcher::new(Utf8Path::new("/data/src"), filter, &WatchConfig::default()).await?;
///
/// while let Some(change) = watcher.recv().await {
///     println!("{:?} {:?}", change.kind, change.paths);
/// }
/// # Ok(())
/// # }
/// ```
pub struct ChangeWatcher {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task_handle: Option<JoinHandle<()>>,
    event_rx: mpsc::Receiver<ChangeEvent>,
    root: Utf8PathBuf,
    config: WatchConfig,
}

impl std::fmt::Debug for ChangeWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeWatcher")
            .field("root", &self.root)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl ChangeWatcher {
    /// Starts watching `source_root`.
    ///
    /// Resolves once notify has subscribed to the tree, so events for changes
    /// made after this returns are not lost.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::PathNotFound`] if the root is not a directory,
    /// [`WatchError::Io`] if it cannot be resolved, and [`WatchError::Notify`]
    /// if the platform watcher fails to start.
    pub async fn new<F: FileFilter>(
        source_root: &Utf8Path,
        filter: F,
        config: &WatchConfig,
    ) -> Result<Self, WatchError> {
        Self::with_capacity(source_root, filter, config, DEFAULT_CHANNEL_CAPACITY).await
    }

    /// Like [`new`](Self::new), with a custom event channel capacity.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub async fn with_capacity<F: FileFilter>(
        source_root: &Utf8Path,
        filter: F,
        config: &WatchConfig,
        channel_capacity: usize,
    ) -> Result<Self, WatchError> {
        if !source_root.is_dir() {
            return Err(WatchError::path_not_found(source_root));
        }
        let root = source_root.canonicalize_utf8()?;

        let (event_tx, event_rx) = mpsc::channel(channel_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        let task_root = root.clone();
        let recursive = config.recursive;
        let task_handle = tokio::task::spawn_blocking(move || {
            run_watcher_loop(&task_root, recursive, event_tx, ready_tx, shutdown_rx, filter);
        });

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err(WatchError::ChannelClosed),
        }

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
            event_rx,
            root,
            config: *config,
        })
    }

    /// Receives the next change, or `None` once the watcher has stopped.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.event_rx.recv().await
    }

    /// Returns a mutable reference to the event receiver.
    pub fn events(&mut self) -> &mut mpsc::Receiver<ChangeEvent> {
        &mut self.event_rx
    }

    /// Returns the canonical root being watched.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Returns `true` if the notify thread is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Debounces this watcher's events into `trigger` until the trigger's
    /// token is cancelled or the event stream ends.
    ///
    /// Waits for an in-flight sync to finish before returning.
    pub async fn run(&mut self, trigger: &Arc<SyncTrigger>) -> LoopExit {
        let exit = debounce_loop(trigger, &mut self.event_rx, self.config.debounce()).await;
        trigger.wait_idle().await;
        exit
    }

    /// Stops the notify thread and waits for it to exit.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::ChannelClosed`] if the thread panicked.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.task_handle.take() {
            handle.await.map_err(|_| WatchError::ChannelClosed)?;
        }
        Ok(())
    }
}

impl Drop for ChangeWatcher {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Runs the notify watcher on a blocking thread until shutdown.
fn run_watcher_loop<F: FileFilter>(
    root: &Utf8Path,
    recursive: bool,
    event_tx: mpsc::Sender<ChangeEvent>,
    ready_tx: oneshot::Sender<Result<(), WatchError>>,
    shutdown_rx: oneshot::Receiver<()>,
    filter: F,
) {
    let callback_root = root.to_path_buf();
    let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| match res {
        Ok(event) => {
            let Some(change) = ChangeEvent::from_notify(callback_root.as_std_path(), &filter, &event)
            else {
                return;
            };
            if event_tx.blocking_send(change).is_err() {
                tracing::debug!("change channel closed, dropping event");
            }
        }
        Err(error) => tracing::warn!(error = %error, "notify error"),
    });

    let mode = if recursive {
        RecursiveMode::Recursive
    } else {
        RecursiveMode::NonRecursive
    };
    let started = watcher.and_then(|mut watcher| {
        watcher.watch(root.as_std_path(), mode)?;
        Ok(watcher)
    });
    let watcher = match started {
        Ok(watcher) => watcher,
        Err(err) => {
            let _ = ready_tx.send(Err(err.into()));
            return;
        }
    };
    let _ = ready_tx.send(Ok(()));

    tracing::info!(path = %root, recursive, "change watcher started");
    let _ = shutdown_rx.blocking_recv();
    drop(watcher);
    tracing::info!(path = %root, "change watcher stopped");
}
