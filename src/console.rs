/// Terminal-backed collaborators for the `shellguard` binary.
///
/// The page and host print what a browser would do; the dialog prints the
/// message and reads a button index from stdin unless a choice was scripted.
use crate::host::{
    DialogChoice, DialogError, DialogOptions, DialogService, HostService, PageWindow, Severity,
};
use crate::lifecycle::ShellLifecycle;
use async_trait::async_trait;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::oneshot;

pub struct ConsolePage {
    lifecycle: Arc<ShellLifecycle>,
    has_unsaved_work: bool,
}

impl ConsolePage {
    pub fn new(lifecycle: Arc<ShellLifecycle>, has_unsaved_work: bool) -> Self {
        Self {
            lifecycle,
            has_unsaved_work,
        }
    }

    /// Whether leaving the page right now would raise the unsaved-work prompt.
    fn unload_prompted(&self) -> bool {
        self.lifecycle.should_veto_unload(self.has_unsaved_work)
    }
}

impl PageWindow for ConsolePage {
    fn open_no_opener(&self, url: &str) {
        println!("open (new context, noopener): {url}");
    }

    fn set_location(&self, url: &str) {
        if self.unload_prompted() {
            println!("unsaved work: confirmation shown before leaving for {url}");
        }
        println!("navigate (current page): {url}");
    }
}

pub struct ConsoleHost;

impl HostService for ConsoleHost {
    fn reload(&self) {
        println!("reload requested");
    }
}

pub struct ConsoleDialog {
    scripted: Option<usize>,
}

impl ConsoleDialog {
    pub fn new(scripted: Option<usize>) -> Self {
        Self { scripted }
    }
}

/// Parse a typed answer. Anything that is not a valid button index dismisses
/// the dialog, reported as the index one past the last button.
fn parse_choice(input: &str, button_count: usize) -> usize {
    match input.trim().parse::<usize>() {
        Ok(n) if n < button_count => n,
        _ => button_count,
    }
}

/// Read one line of stdin on a plain OS thread.
///
/// The runtime never waits on this thread, so an abandoned dialog does not
/// keep the process alive at exit.
fn read_stdin_line() -> oneshot::Receiver<std::io::Result<Option<String>>> {
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let result = std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map(|read| (read > 0).then_some(line));
        let _ = tx.send(result);
    });
    rx
}

#[async_trait]
impl DialogService for ConsoleDialog {
    async fn show(
        &self,
        severity: Severity,
        message: &str,
        buttons: &[&str],
        options: DialogOptions,
    ) -> Result<DialogChoice, DialogError> {
        println!("[{severity:?}] {message}");
        if let Some(detail) = &options.detail {
            println!("  {detail}");
        }
        for (i, label) in buttons.iter().enumerate() {
            println!("  [{i}] {label}");
        }

        if let Some(choice) = self.scripted {
            println!("> {choice}");
            return Ok(DialogChoice { choice });
        }

        let line = read_stdin_line()
            .await
            .map_err(|_| DialogError::Unavailable("stdin reader stopped".to_string()))??;
        match line {
            Some(line) => Ok(DialogChoice {
                choice: parse_choice(&line, buttons.len()),
            }),
            None => Err(DialogError::Unavailable("stdin closed".to_string())),
        }
    }
}
