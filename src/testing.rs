//! Recording fakes for the collaborator traits.
use crate::host::{
    DialogChoice, DialogError, DialogOptions, DialogService, HostService, LifecycleService,
    PageWindow, Severity, ShutdownSignal,
};
use crate::lifecycle::ShellLifecycle;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// Everything the page and lifecycle fakes observed, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    EnterExpectedUnload,
    ExitExpectedUnload,
    OpenNoOpener(String),
    SetLocation(String),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

pub struct RecordingLifecycle {
    pub inner: ShellLifecycle,
    log: EventLog,
}

impl RecordingLifecycle {
    pub fn new(log: EventLog) -> Self {
        Self {
            inner: ShellLifecycle::new(),
            log,
        }
    }
}

impl LifecycleService for RecordingLifecycle {
    fn on_will_shutdown(&self) -> broadcast::Receiver<ShutdownSignal> {
        self.inner.on_will_shutdown()
    }

    fn with_expected_unload(&self, action: &mut dyn FnMut()) {
        self.log.lock().unwrap().push(Event::EnterExpectedUnload);
        self.inner.with_expected_unload(action);
        self.log.lock().unwrap().push(Event::ExitExpectedUnload);
    }
}

pub struct RecordingPage {
    log: EventLog,
}

impl RecordingPage {
    pub fn new(log: EventLog) -> Self {
        Self { log }
    }
}

impl PageWindow for RecordingPage {
    fn open_no_opener(&self, url: &str) {
        self.log
            .lock()
            .unwrap()
            .push(Event::OpenNoOpener(url.to_string()));
    }

    fn set_location(&self, url: &str) {
        self.log
            .lock()
            .unwrap()
            .push(Event::SetLocation(url.to_string()));
    }
}

/// One presented dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShownDialog {
    pub severity: Severity,
    pub message: String,
    pub buttons: Vec<String>,
    pub detail: Option<String>,
}

/// Scripted answer for `FakeDialog`.
#[derive(Debug, Clone, Copy)]
pub enum DialogOutcome {
    Choose(usize),
    Fail,
}

pub struct FakeDialog {
    pub shown: Mutex<Vec<ShownDialog>>,
    outcome: DialogOutcome,
}

impl FakeDialog {
    pub fn new(outcome: DialogOutcome) -> Self {
        Self {
            shown: Mutex::new(Vec::new()),
            outcome,
        }
    }

    pub fn shown_count(&self) -> usize {
        self.shown.lock().unwrap().len()
    }
}

#[async_trait]
impl DialogService for FakeDialog {
    async fn show(
        &self,
        severity: Severity,
        message: &str,
        buttons: &[&str],
        options: DialogOptions,
    ) -> Result<DialogChoice, DialogError> {
        self.shown.lock().unwrap().push(ShownDialog {
            severity,
            message: message.to_string(),
            buttons: buttons.iter().map(|b| b.to_string()).collect(),
            detail: options.detail,
        });
        match self.outcome {
            DialogOutcome::Choose(choice) => Ok(DialogChoice { choice }),
            DialogOutcome::Fail => Err(DialogError::Unavailable("host gone".to_string())),
        }
    }
}

#[derive(Default)]
pub struct CountingHost {
    reloads: AtomicUsize,
}

impl CountingHost {
    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::SeqCst)
    }
}

impl HostService for CountingHost {
    fn reload(&self) {
        self.reloads.fetch_add(1, Ordering::SeqCst);
    }
}
