/// Page lifecycle authority.
///
/// Broadcasts the shutdown signal to subscribers and tracks "expected unload"
/// scopes, during which the unsaved-work confirmation must not be raised.
use crate::host::{LifecycleService, ShutdownSignal};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;

/// Shutdown fires at most a handful of times per page; a small buffer is plenty.
const SHUTDOWN_CHANNEL_CAPACITY: usize = 4;

pub struct ShellLifecycle {
    shutdown_tx: broadcast::Sender<ShutdownSignal>,
    /// Depth of nested `with_expected_unload` calls.
    expected_unloads: AtomicUsize,
}

impl ShellLifecycle {
    pub fn new() -> Self {
        let (shutdown_tx, _) = broadcast::channel(SHUTDOWN_CHANNEL_CAPACITY);
        Self {
            shutdown_tx,
            expected_unloads: AtomicUsize::new(0),
        }
    }

    /// Emit the shutdown signal. Returns how many subscribers received it.
    pub fn fire_shutdown(&self) -> usize {
        match self.shutdown_tx.send(ShutdownSignal) {
            Ok(receivers) => {
                tracing::info!(receivers, "shutdown signal emitted");
                receivers
            }
            Err(_) => {
                tracing::debug!("shutdown signal emitted with no subscribers");
                0
            }
        }
    }

    /// True while an expected-unload scope is active.
    pub fn is_expected_unload(&self) -> bool {
        self.expected_unloads.load(Ordering::SeqCst) > 0
    }

    /// Whether the page should ask the user before unloading.
    ///
    /// Only pages with unsaved work ask, and never inside an expected unload.
    pub fn should_veto_unload(&self, has_unsaved_work: bool) -> bool {
        has_unsaved_work && !self.is_expected_unload()
    }
}

impl Default for ShellLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Leaves the expected-unload scope on drop, so a panicking action still
/// restores the guard.
struct ExpectedUnloadScope<'a>(&'a AtomicUsize);

impl Drop for ExpectedUnloadScope<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl LifecycleService for ShellLifecycle {
    fn on_will_shutdown(&self) -> broadcast::Receiver<ShutdownSignal> {
        self.shutdown_tx.subscribe()
    }

    fn with_expected_unload(&self, action: &mut dyn FnMut()) {
        self.expected_unloads.fetch_add(1, Ordering::SeqCst);
        let _scope = ExpectedUnloadScope(&self.expected_unloads);
        action();
    }
}
