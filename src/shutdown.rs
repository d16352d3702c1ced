/// Shutdown error notifier.
///
/// A shutdown signal while the page keeps running means the application was
/// torn down underneath it and only a reload brings it back. The check is
/// delayed because a shutdown is usually followed straight away by a real
/// unload the user asked for; in that case the context is gone before the
/// timer fires and nothing is shown.
///
/// State machine:
/// `Idle -> TimerArmed -> DialogShown -> Reloading`, returning to `Idle` if the
/// dialog is dismissed or cannot be shown. Signals arriving outside `Idle` are
/// coalesced into the pending check.
use crate::host::{
    DialogError, DialogOptions, DialogService, HostService, LifecycleService, Severity,
    ShutdownSignal,
};
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

pub const SHUTDOWN_ERROR_MESSAGE: &str =
    "An unexpected error occurred that requires a reload of this page.";
pub const SHUTDOWN_ERROR_DETAIL: &str =
    "The application was unexpectedly torn down while running.";
pub const RELOAD_LABEL: &str = "Reload";

/// Button index of "Reload".
const RELOAD_CHOICE: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifierState {
    Idle,
    TimerArmed,
    DialogShown,
    Reloading,
}

pub struct ShutdownErrorNotifier {
    inner: Arc<Inner>,
    listener: JoinHandle<()>,
}

struct Inner {
    dialogs: Arc<dyn DialogService>,
    host: Arc<dyn HostService>,
    delay: Duration,
    state: watch::Sender<NotifierState>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl ShutdownErrorNotifier {
    /// Subscribe to `lifecycle` and start listening for shutdown signals.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        lifecycle: &dyn LifecycleService,
        dialogs: Arc<dyn DialogService>,
        host: Arc<dyn HostService>,
        delay: Duration,
    ) -> Self {
        let (state, _) = watch::channel(NotifierState::Idle);
        let inner = Arc::new(Inner {
            dialogs,
            host,
            delay,
            state,
            pending: Mutex::new(None),
        });
        let signals = lifecycle.on_will_shutdown();
        let listener = tokio::spawn(listen(Arc::clone(&inner), signals));
        Self { inner, listener }
    }

    pub fn state(&self) -> NotifierState {
        *self.inner.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<NotifierState> {
        self.inner.state.subscribe()
    }

    /// Tear down as if the page context were destroyed: stop listening and
    /// drop any armed timer or open dialog wait without resuming it.
    pub fn dispose(&self) {
        self.listener.abort();
        let pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(pending) = pending {
            pending.abort();
            tracing::debug!(state = ?self.state(), "pending shutdown check discarded");
        }
    }
}

impl Drop for ShutdownErrorNotifier {
    fn drop(&mut self) {
        self.dispose();
    }
}

async fn listen(inner: Arc<Inner>, mut signals: broadcast::Receiver<ShutdownSignal>) {
    loop {
        match signals.recv().await {
            Ok(ShutdownSignal) => inner.on_will_shutdown(),
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                tracing::debug!(missed, "shutdown signals lagged");
                inner.on_will_shutdown();
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

impl Inner {
    fn on_will_shutdown(self: &Arc<Self>) {
        let armed = self.state.send_if_modified(|state| {
            if *state == NotifierState::Idle {
                *state = NotifierState::TimerArmed;
                true
            } else {
                false
            }
        });
        if !armed {
            tracing::debug!(
                state = ?*self.state.borrow(),
                "shutdown signal coalesced into pending check"
            );
            return;
        }

        tracing::info!(
            delay_ms = self.delay.as_millis() as u64,
            "shutdown signal received, arming error check"
        );
        // Anchor the deadline at signal receipt, not at first poll of the task.
        let deadline = tokio::time::Instant::now() + self.delay;
        let inner = Arc::clone(self);
        let check = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            if let Err(e) = inner.show_shutdown_error().await {
                tracing::error!(error = %e, "failed to present shutdown error dialog");
            }
        });
        *self.pending.lock().unwrap_or_else(PoisonError::into_inner) = Some(check);
    }

    /// Show the error dialog and reload on confirmation.
    ///
    /// A presentation failure is returned as-is; there is no retry.
    async fn show_shutdown_error(&self) -> Result<(), DialogError> {
        self.state.send_replace(NotifierState::DialogShown);

        let options = DialogOptions {
            detail: Some(SHUTDOWN_ERROR_DETAIL.to_string()),
        };
        let result = self
            .dialogs
            .show(
                Severity::Error,
                SHUTDOWN_ERROR_MESSAGE,
                &[RELOAD_LABEL],
                options,
            )
            .await;

        let choice = match result {
            Ok(choice) => choice,
            Err(e) => {
                self.state.send_replace(NotifierState::Idle);
                return Err(e);
            }
        };

        if choice.choice == RELOAD_CHOICE {
            self.state.send_replace(NotifierState::Reloading);
            tracing::info!("reloading after unexpected shutdown");
            self.host.reload();
        } else {
            tracing::debug!(choice = choice.choice, "shutdown error dialog dismissed");
            self.state.send_replace(NotifierState::Idle);
        }
        Ok(())
    }
}
