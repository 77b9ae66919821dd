//! Turning quiet periods into sync runs.
//!
//! [`SyncTrigger`] owns the "sync in flight" flag and a single pending bit.
//! Firing while a run is in flight never starts a second run; it schedules
//! exactly one more run after the current one finishes, however many times it
//! fires meanwhile.
//!
//! [`debounce_loop`] feeds a [`Debouncer`] from the event channel and fires the
//! trigger when a quiet period elapses.

use std::any::Any;
use std::future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use fs_sync::{SyncEngine, SyncError, SyncReport};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::debounce::Debouncer;
use crate::error::WatchError;
use crate::events::ChangeEvent;

/// Something that can run one sync to completion on a blocking thread.
pub trait SyncRunner: Send + Sync + 'static {
    /// Runs one sync.
    ///
    /// # Errors
    ///
    /// Returns the error that aborted the run.
    fn run_sync(&self) -> Result<SyncReport, SyncError>;
}

impl SyncRunner for SyncEngine {
    fn run_sync(&self) -> Result<SyncReport, SyncError> {
        self.sync()
    }
}

#[derive(Debug, Default)]
struct TriggerState {
    in_flight: bool,
    pending: bool,
    task: Option<JoinHandle<()>>,
}

/// Serializes triggered syncs.
pub struct SyncTrigger {
    runner: Arc<dyn SyncRunner>,
    state: Mutex<TriggerState>,
    cancel: CancellationToken,
    started: AtomicU64,
    failed: AtomicU64,
    coalesced: AtomicU64,
}

impl std::fmt::Debug for SyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("SyncTrigger")
            .field("in_flight", &state.in_flight)
            .field("pending", &state.pending)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl SyncTrigger {
    /// Creates an idle trigger.
    ///
    /// Once `cancel` fires, no new run starts and a pending trailing run is
    /// dropped.
    #[must_use]
    pub fn new(runner: Arc<dyn SyncRunner>, cancel: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            runner,
            state: Mutex::new(TriggerState::default()),
            cancel,
            started: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            coalesced: AtomicU64::new(0),
        })
    }

    /// Returns the token that stops this trigger.
    #[inline]
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Returns `true` while a sync is running.
    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    /// Requests a sync.
    ///
    /// Starts one on the blocking pool if none is running; otherwise sets the
    /// pending bit. Must be called from within a tokio runtime.
    pub fn fire(self: &Arc<Self>) {
        if self.cancel.is_cancelled() {
            return;
        }
        let mut state = self.state.lock();
        if state.in_flight {
            if state.pending {
                self.coalesced.fetch_add(1, Ordering::Relaxed);
            }
            state.pending = true;
            debug!("sync already running, scheduled a trailing run");
            return;
        }
        state.in_flight = true;
        let this = Arc::clone(self);
        state.task = Some(tokio::task::spawn_blocking(move || this.run_until_settled()));
    }

    /// Waits for the current run, and its trailing run if any, to finish.
    pub async fn wait_idle(&self) {
        loop {
            let task = self.state.lock().task.take();
            let Some(task) = task else {
                return;
            };
            if let Err(err) = task.await {
                error!(error = %err, "sync task panicked");
                let mut state = self.state.lock();
                state.in_flight = false;
                state.pending = false;
            }
        }
    }

    /// Returns the run counters.
    #[must_use]
    pub fn stats(&self) -> TriggerStats {
        TriggerStats {
            started: self.started.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
        }
    }

    fn run_until_settled(&self) {
        loop {
            self.run_once();

            let mut state = self.state.lock();
            if state.pending && !self.cancel.is_cancelled() {
                state.pending = false;
                continue;
            }
            state.pending = false;
            state.in_flight = false;
            return;
        }
    }

    /// Runs one sync, logging its error or panic.
    fn run_once(&self) {
        self.started.fetch_add(1, Ordering::Relaxed);
        match panic::catch_unwind(AssertUnwindSafe(|| self.runner.run_sync())) {
            Ok(Ok(report)) if report.is_partial_failure() => {
                warn!(failed = report.stats.failed, "triggered sync finished with failures");
            }
            Ok(Ok(report)) => {
                debug!(changed = report.stats.changed(), "triggered sync finished");
            }
            Ok(Err(err)) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                let err = WatchError::from(err);
                error!(error = %err, "triggered sync failed, waiting for the next change");
            }
            Err(payload) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                error!(
                    panic = panic_message(&*payload),
                    "triggered sync panicked, waiting for the next change"
                );
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}

/// Counters kept by a [`SyncTrigger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TriggerStats {
    /// Sync runs started.
    pub started: u64,
    /// Runs that returned an error or panicked.
    pub failed: u64,
    /// Fires absorbed by an already pending trailing run.
    pub coalesced: u64,
}

/// Why [`debounce_loop`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The trigger's cancellation token fired.
    Cancelled,
    /// The event channel closed.
    StreamClosed,
}

/// Debounces `events` with a `window` quiet period and fires `trigger` once
/// per quiet period.
///
/// Returns as soon as the trigger's token is cancelled or the channel closes,
/// without waiting for an in-flight sync; use [`SyncTrigger::wait_idle`] for
/// that.
pub async fn debounce_loop(
    trigger: &Arc<SyncTrigger>,
    events: &mut mpsc::Receiver<ChangeEvent>,
    window: Duration,
) -> LoopExit {
    let mut debouncer = Debouncer::new(window);
    let cancel = trigger.cancellation_token().clone();

    loop {
        let deadline = debouncer.deadline();
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                info!("change watcher cancelled");
                return LoopExit::Cancelled;
            }
            event = events.recv() => match event {
                Some(event) => {
                    tracing::trace!(kind = ?event.kind, paths = ?event.paths, "change");
                    debouncer.record(Instant::now());
                }
                None => {
                    info!("change stream closed");
                    return LoopExit::StreamClosed;
                }
            },
            () = wait_until(deadline) => {
                let collapsed = debouncer.pending_events();
                if debouncer.poll(Instant::now()) {
                    debug!(events = collapsed, "quiet period elapsed, triggering sync");
                    trigger.fire();
                }
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}
