/// Collaborator surfaces the window components are wired against.
///
/// Each trait is the narrow contract one component needs: the dialog surface,
/// host control (reload), the lifecycle authority, and the raw page/window
/// primitives. Concrete implementations live in `lifecycle` and `console`;
/// tests use recording fakes.
use async_trait::async_trait;
use tokio::sync::broadcast;

/// Severity tag attached to a dialog message. Only errors are raised today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
}

/// Optional extras for a dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogOptions {
    /// Secondary text shown beneath the primary message.
    pub detail: Option<String>,
}

/// The button the user picked. Index 0 is the primary action by convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialogChoice {
    pub choice: usize,
}

/// Shutdown-in-progress notification. Carries no payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownSignal;

/// Errors raised when a dialog cannot be presented.
#[derive(Debug)]
pub enum DialogError {
    /// The host surface refused or is gone.
    Unavailable(String),
    /// Reading the answer failed.
    Io(std::io::Error),
}

impl std::fmt::Display for DialogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DialogError::Unavailable(reason) => write!(f, "dialog surface unavailable: {reason}"),
            DialogError::Io(e) => write!(f, "I/O error while awaiting dialog choice: {e}"),
        }
    }
}

impl std::error::Error for DialogError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DialogError::Unavailable(_) => None,
            DialogError::Io(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for DialogError {
    fn from(e: std::io::Error) -> Self {
        DialogError::Io(e)
    }
}

/// Modal, asynchronous dialog surface.
#[async_trait]
pub trait DialogService: Send + Sync {
    /// Show `message` with one button per entry in `buttons` and resolve
    /// with the index the user picked. No timeout: the wait is user-facing.
    async fn show(
        &self,
        severity: Severity,
        message: &str,
        buttons: &[&str],
        options: DialogOptions,
    ) -> Result<DialogChoice, DialogError>;
}

/// Host control surface.
pub trait HostService: Send + Sync {
    /// Fire-and-forget request to reload the whole application.
    fn reload(&self);
}

/// Lifecycle authority of the page.
pub trait LifecycleService: Send + Sync {
    /// Subscribe to the shutdown signal. Dropping the receiver unsubscribes.
    fn on_will_shutdown(&self) -> broadcast::Receiver<ShutdownSignal>;

    /// Run `action` with the unsaved-work unload confirmation suppressed.
    fn with_expected_unload(&self, action: &mut dyn FnMut());
}

/// Low-level page and window primitives.
pub trait PageWindow: Send + Sync {
    /// Open `url` in a new browsing context that gets no reference back to
    /// this page.
    fn open_no_opener(&self, url: &str);

    /// Navigate the current page to `url`.
    fn set_location(&self, url: &str);
}
