/// Browser window composition: wires the shutdown notifier and the external
/// link dispatcher against one set of page services at startup.
use crate::config::ShellConfig;
use crate::external::ExternalLinkDispatcher;
use crate::host::{DialogService, HostService, LifecycleService, PageWindow};
use crate::opener::OpenerService;
use crate::shutdown::{NotifierState, ShutdownErrorNotifier};
use std::sync::Arc;
use tokio::sync::watch;

/// The collaborators a window is built from.
#[derive(Clone)]
pub struct WindowServices {
    pub opener: Arc<OpenerService>,
    pub lifecycle: Arc<dyn LifecycleService>,
    pub dialogs: Arc<dyn DialogService>,
    pub host: Arc<dyn HostService>,
    pub page: Arc<dyn PageWindow>,
}

pub struct BrowserWindow {
    notifier: ShutdownErrorNotifier,
}

impl BrowserWindow {
    /// Start both components. The external link dispatcher becomes the
    /// opener service's only external opener.
    pub fn create(services: &WindowServices, config: &ShellConfig) -> Self {
        let notifier = ShutdownErrorNotifier::spawn(
            services.lifecycle.as_ref(),
            Arc::clone(&services.dialogs),
            Arc::clone(&services.host),
            config.shutdown.delay(),
        );
        // The opener service keeps the dispatcher alive from here on.
        ExternalLinkDispatcher::register(
            &services.opener,
            Arc::clone(&services.lifecycle),
            Arc::clone(&services.page),
            &config.external,
        );
        tracing::debug!(
            delay_ms = config.shutdown.delay_ms,
            schemes = ?config.external.new_context_schemes,
            "browser window created"
        );
        Self { notifier }
    }

    pub fn subscribe_state(&self) -> watch::Receiver<NotifierState> {
        self.notifier.subscribe_state()
    }

    /// Destroy the page context. Pending shutdown checks never resume.
    pub fn dispose(self) {
        tracing::info!(state = ?self.notifier.state(), "browser window disposed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        CountingHost, DialogOutcome, Event, EventLog, FakeDialog, RecordingLifecycle,
        RecordingPage,
    };
    use std::time::Duration;

    struct Fixture {
        services: WindowServices,
        lifecycle: Arc<RecordingLifecycle>,
        dialog: Arc<FakeDialog>,
        host: Arc<CountingHost>,
        log: EventLog,
    }

    fn fixture() -> Fixture {
        let log = EventLog::default();
        let lifecycle = Arc::new(RecordingLifecycle::new(log.clone()));
        let dialog = Arc::new(FakeDialog::new(DialogOutcome::Choose(0)));
        let host = Arc::new(CountingHost::default());
        let services = WindowServices {
            opener: Arc::new(OpenerService::new()),
            lifecycle: lifecycle.clone(),
            dialogs: dialog.clone(),
            host: host.clone(),
            page: Arc::new(RecordingPage::new(log.clone())),
        };
        Fixture {
            services,
            lifecycle,
            dialog,
            host,
            log,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_wires_dispatcher_into_opener() {
        let f = fixture();
        let _window = BrowserWindow::create(&f.services, &ShellConfig::default());

        assert!(f.services.opener.open_external("https://example.com").await);
        assert!(f.services.opener.open_external("myapp://handoff?x=1").await);

        assert_eq!(
            *f.log.lock().unwrap(),
            vec![
                Event::OpenNoOpener("https://example.com".to_string()),
                Event::EnterExpectedUnload,
                Event::SetLocation("myapp://handoff?x=1".to_string()),
                Event::ExitExpectedUnload,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_reloads_after_unexpected_shutdown() {
        let f = fixture();
        let window = BrowserWindow::create(&f.services, &ShellConfig::default());
        let mut state = window.subscribe_state();

        f.lifecycle.inner.fire_shutdown();
        state
            .wait_for(|s| *s == NotifierState::Reloading)
            .await
            .unwrap();

        assert_eq!(f.dialog.shown_count(), 1);
        assert_eq!(f.host.reloads(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disposed_window_never_prompts() {
        let f = fixture();
        let window = BrowserWindow::create(&f.services, &ShellConfig::default());
        let mut state = window.subscribe_state();

        f.lifecycle.inner.fire_shutdown();
        state
            .wait_for(|s| *s == NotifierState::TimerArmed)
            .await
            .unwrap();
        window.dispose();

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(f.dialog.shown_count(), 0);
        assert_eq!(f.host.reloads(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_configured_delay_is_used() {
        let f = fixture();
        let mut config = ShellConfig::default();
        config.shutdown.delay_ms = 200;
        let window = BrowserWindow::create(&f.services, &config);
        let mut state = window.subscribe_state();

        f.lifecycle.inner.fire_shutdown();
        state
            .wait_for(|s| *s == NotifierState::TimerArmed)
            .await
            .unwrap();
        tokio::time::advance(Duration::from_millis(199)).await;
        assert_eq!(f.dialog.shown_count(), 0);

        tokio::time::advance(Duration::from_millis(1)).await;
        state
            .wait_for(|s| *s == NotifierState::Reloading)
            .await
            .unwrap();
        assert_eq!(f.dialog.shown_count(), 1);
    }
}
