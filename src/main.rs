mod config;
mod console;
mod external;
mod host;
mod lifecycle;
mod opener;
mod shutdown;
#[cfg(test)]
mod testing;
mod window;

use clap::{Parser, Subcommand};
use config::ShellConfig;
use lifecycle::ShellLifecycle;
use opener::OpenerService;
use shutdown::NotifierState;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use window::{BrowserWindow, WindowServices};

/// Shutdown-error recovery and external link dispatch for a browser-hosted
/// application shell, driven from the terminal.
#[derive(Parser, Debug)]
#[command(name = "shellguard", version, about)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Config file path
    #[arg(short, long, default_value = "shellguard.toml", global = true)]
    config: PathBuf,

    /// Shutdown check delay in milliseconds (overrides config)
    #[arg(long, global = true)]
    delay_ms: Option<u64>,

    /// Validate config and print resolved settings, don't run
    #[arg(long, global = true)]
    dry_run: bool,

    /// Extra logging (routing decisions, state transitions)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Dispatch external open requests and show the route each one takes
    Open {
        /// URLs to open
        #[arg(required = true)]
        urls: Vec<String>,

        /// Treat the page as holding unsaved work
        #[arg(long)]
        unsaved_work: bool,
    },
    /// Fire one shutdown signal and run the error check
    Shutdown {
        /// Answer the dialog with this button index instead of reading stdin
        #[arg(long)]
        choice: Option<usize>,

        /// Destroy the page context this many milliseconds after the signal
        #[arg(long)]
        unload_after_ms: Option<u64>,
    },
}

fn init_tracing(cli: &Cli) {
    let default_level = if cli.verbose {
        "shellguard=debug"
    } else if cli.quiet {
        "shellguard=warn"
    } else {
        "shellguard=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();
}

fn resolve_config(cli: &Cli) -> Result<ShellConfig, config::ConfigError> {
    let mut config = ShellConfig::load(&cli.config)?;
    if let Some(delay_ms) = cli.delay_ms {
        config.shutdown.delay_ms = delay_ms;
    }
    config.validated()
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);
    tracing::debug!(?cli, "parsed CLI arguments");

    let config = match resolve_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if cli.dry_run {
        match serde_json::to_string_pretty(&config) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("error: failed to render config: {e}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    match cli.command {
        Some(Command::Open { urls, unsaved_work }) => {
            run_open(&config, &urls, unsaved_work).await
        }
        Some(Command::Shutdown {
            choice,
            unload_after_ms,
        }) => run_shutdown(&config, choice, unload_after_ms).await,
        None => {
            eprintln!("error: no command given (see --help)");
            ExitCode::from(2)
        }
    }
}

fn console_services(
    lifecycle: Arc<ShellLifecycle>,
    choice: Option<usize>,
    unsaved_work: bool,
) -> WindowServices {
    WindowServices {
        opener: Arc::new(OpenerService::new()),
        lifecycle: lifecycle.clone(),
        dialogs: Arc::new(console::ConsoleDialog::new(choice)),
        host: Arc::new(console::ConsoleHost),
        page: Arc::new(console::ConsolePage::new(lifecycle, unsaved_work)),
    }
}

async fn run_open(config: &ShellConfig, urls: &[String], unsaved_work: bool) -> ExitCode {
    let services = console_services(Arc::new(ShellLifecycle::new()), None, unsaved_work);
    let window = BrowserWindow::create(&services, config);

    for url in urls {
        let accepted = services.opener.open_external(url).await;
        tracing::debug!(url = %url, accepted, "external open handled");
    }

    window.dispose();
    ExitCode::SUCCESS
}

/// How a `shutdown` run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ShutdownOutcome {
    /// The check finished on its own, by reloading or by returning to idle.
    Settled(NotifierState),
    /// The page was destroyed first; carries the state it was in at that moment.
    Unloaded(NotifierState),
}

impl ShutdownOutcome {
    fn to_json(self) -> serde_json::Value {
        match self {
            ShutdownOutcome::Settled(state) => {
                serde_json::json!({ "state": state, "unloaded": false })
            }
            ShutdownOutcome::Unloaded(state) => {
                serde_json::json!({ "state": state, "unloaded": true })
            }
        }
    }
}

/// Wait for the check to settle, or for the page to be unloaded after
/// `unload_after`, whichever comes first.
async fn await_shutdown_outcome(
    state: &mut watch::Receiver<NotifierState>,
    unload_after: Option<Duration>,
) -> ShutdownOutcome {
    let Some(unload_after) = unload_after else {
        return ShutdownOutcome::Settled(wait_until_settled(state).await);
    };
    tokio::select! {
        s = wait_until_settled(state) => return ShutdownOutcome::Settled(s),
        _ = tokio::time::sleep(unload_after) => {}
    }
    ShutdownOutcome::Unloaded(*state.borrow())
}

async fn run_shutdown(
    config: &ShellConfig,
    choice: Option<usize>,
    unload_after_ms: Option<u64>,
) -> ExitCode {
    let lifecycle = Arc::new(ShellLifecycle::new());
    let services = console_services(Arc::clone(&lifecycle), choice, false);
    let window = BrowserWindow::create(&services, config);
    let mut state = window.subscribe_state();

    lifecycle.fire_shutdown();

    let outcome =
        await_shutdown_outcome(&mut state, unload_after_ms.map(Duration::from_millis)).await;
    match outcome {
        ShutdownOutcome::Settled(s) => tracing::info!(state = ?s, "shutdown check settled"),
        ShutdownOutcome::Unloaded(s) => {
            tracing::info!(state = ?s, "page unloaded during shutdown check")
        }
    }
    println!("{}", outcome.to_json());
    window.dispose();
    ExitCode::SUCCESS
}

/// Wait until the notifier has armed and then finished its check, either by
/// reloading or by returning to idle.
async fn wait_until_settled(state: &mut watch::Receiver<NotifierState>) -> NotifierState {
    let mut left_idle = false;
    loop {
        let current = *state.borrow_and_update();
        match current {
            NotifierState::Reloading => return current,
            NotifierState::Idle if left_idle => return current,
            NotifierState::Idle => {}
            NotifierState::TimerArmed | NotifierState::DialogShown => left_idle = true,
        }
        if state.changed().await.is_err() {
            return current;
        }
    }
}
