//! Terminal front end
//!
//! Prints the current frame whenever a view's state changes and reads
//! one-line commands from stdin. Commands that wait on the backend run on
//! their own tasks, so frames and input keep flowing during a long sync.
//! Logging goes to stderr, so frames stay readable with `RUST_LOG=off`.

use std::io::Write as _;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use crate::api::{ApiError, BackendClient, CredentialField, HttpBackendClient};
use crate::config::DashboardConfig;
use crate::host::Host;
use crate::oauth_return;
use crate::shell::{MountedView, Shell};
use crate::views::{ActionOutcome, Redraw};

const HELP: &str = "\
Commands:
  dashboard | settings | logs   switch page
  go <path>                     open a location, e.g. go /settings?oauth=success
  refresh                       re-fetch the current page
  sync                          trigger a manual sync (dashboard)
  set <field> <value>           edit a credential field (settings)
  save                          save credentials (settings)
  connect                       connect to FreeAgent (settings)
  disconnect                    disconnect from FreeAgent (settings)
  dismiss                       hide the current alert
  help                          show this help
  quit                          exit";

fn flush_stdout() {
    if let Err(e) = std::io::stdout().flush() {
        log::debug!("Failed to flush stdout: {}", e);
    }
}

// ============================================================================
// Host
// ============================================================================

/// Question for the user, answered by the next input line
pub struct ConfirmRequest {
    prompt: String,
    reply: oneshot::Sender<bool>,
}

/// Host backed by the terminal: location is a string shown in the header,
/// external URLs go to the system browser. Confirmation is routed through
/// the event loop, which owns stdin.
pub struct TerminalHost {
    location: StdMutex<String>,
    confirms: mpsc::Sender<ConfirmRequest>,
}

impl TerminalHost {
    fn new(confirms: mpsc::Sender<ConfirmRequest>) -> Self {
        Self {
            location: StdMutex::new("/".to_string()),
            confirms,
        }
    }
}

#[async_trait]
impl Host for TerminalHost {
    fn location(&self) -> String {
        self.location.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn replace_location(&self, location: &str) {
        *self.location.lock().unwrap_or_else(|e| e.into_inner()) = location.to_string();
    }

    fn open_external(&self, url: &str) {
        println!("Opening browser for FreeAgent authorization...");
        if let Err(e) = open::that(url) {
            log::warn!("Could not open browser: {}", e);
            println!("Could not open browser. Please visit:\n{}", url);
        }
    }

    async fn confirm(&self, prompt: &str) -> bool {
        let (reply, answer) = oneshot::channel();
        let request = ConfirmRequest {
            prompt: prompt.to_string(),
            reply,
        };
        if self.confirms.send(request).await.is_err() {
            log::warn!("Confirmation unavailable, treating as declined");
            return false;
        }
        answer.await.unwrap_or(false)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

// ============================================================================
// Commands
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Go(String),
    Refresh,
    Sync,
    Set(CredentialField, String),
    Save,
    Connect,
    Disconnect,
    Dismiss,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command '{0}' (type 'help')")]
    Unknown(String),
    #[error("Usage: {0}")]
    Usage(&'static str),
    #[error("Unknown field '{0}'")]
    UnknownField(String),
}

impl Command {
    /// `Ok(None)` for a blank line
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();

        let command = match word {
            "" => return Ok(None),
            "dashboard" | "home" => Command::Go("/".to_string()),
            "settings" => Command::Go("/settings".to_string()),
            "logs" => Command::Go("/logs".to_string()),
            "go" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("go <path>"));
                }
                Command::Go(rest.to_string())
            }
            "refresh" => Command::Refresh,
            "sync" => Command::Sync,
            "set" => {
                let (name, value) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(CommandError::Usage("set <field> <value>"))?;
                let field = CredentialField::from_str(name)
                    .ok_or_else(|| CommandError::UnknownField(name.to_string()))?;
                Command::Set(field, value.trim().to_string())
            }
            "save" => Command::Save,
            "connect" => Command::Connect,
            "disconnect" => Command::Disconnect,
            "dismiss" => Command::Dismiss,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(Some(command))
    }
}

// ============================================================================
// Actions
// ============================================================================

/// Commands that wait on the backend. They run on their own task so the
/// event loop keeps drawing frames and reading input meanwhile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Refresh,
    Sync,
    Save,
    Connect,
    Disconnect,
}

impl Action {
    fn name(&self) -> &'static str {
        match self {
            Action::Refresh => "refresh",
            Action::Sync => "sync",
            Action::Save => "save",
            Action::Connect => "connect",
            Action::Disconnect => "disconnect",
        }
    }
}

pub type ActionSet = JoinSet<(Action, ActionOutcome)>;

/// Start `action` against the mounted page. Returns false when the page has
/// no such control.
pub fn spawn_action(shell: &Shell, action: Action, actions: &mut ActionSet) -> bool {
    match (action, shell.current()) {
        (Action::Refresh, Some(view)) => {
            actions.spawn(async move {
                view.refresh().await;
                (action, ActionOutcome::Completed)
            });
        }
        (Action::Sync, Some(MountedView::Dashboard(view))) => {
            actions.spawn(async move { (action, view.manual_sync().await) });
        }
        (Action::Save, Some(MountedView::Settings(view))) => {
            actions.spawn(async move { (action, view.save().await) });
        }
        (Action::Connect, Some(MountedView::Settings(view))) => {
            actions.spawn(async move { (action, view.connect().await) });
        }
        (Action::Disconnect, Some(MountedView::Settings(view))) => {
            actions.spawn(async move { (action, view.disconnect().await) });
        }
        _ => return false,
    }
    true
}

// ============================================================================
// Event loop
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TerminalError {
    #[error("Failed to create backend client: {0}")]
    Client(#[from] ApiError),
}

enum Event {
    Input(std::io::Result<Option<String>>),
    Redraw,
    OAuthReturn(String),
    Confirm(ConfirmRequest),
    ActionDone(Result<(Action, ActionOutcome), tokio::task::JoinError>),
}

/// Next input line, or `None` at end of input. A read error ends input the
/// same way EOF does rather than failing the dashboard.
fn input_line(read: std::io::Result<Option<String>>) -> Option<String> {
    match read {
        Ok(line) => line,
        Err(e) => {
            log::error!("Failed to read input: {}", e);
            None
        }
    }
}

async fn draw(shell: &Shell) {
    let frame = shell.render().await;
    print!("\x1b[2J\x1b[H{}\n> ", frame);
    flush_stdout();
}

fn not_on_page(page: &str) {
    print!("'{}' is not available on this page\n> ", page);
    flush_stdout();
}

/// Run the dashboard until `quit` or end of input
pub async fn run(config: DashboardConfig) -> Result<(), TerminalError> {
    let client: Arc<dyn BackendClient> = Arc::new(HttpBackendClient::new(&config.backend_url)?);

    match client.health().await {
        Ok(health) => log::info!("Backend at {} is {}", config.backend_url, health.status),
        Err(e) => log::warn!("Backend health check failed: {}", e),
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let (confirm_tx, mut confirm_rx) = mpsc::channel::<ConfirmRequest>(1);
    let host = Arc::new(TerminalHost::new(confirm_tx));
    let (redraw, mut revisions) = Redraw::new();
    let (return_tx, mut return_rx) = mpsc::channel::<String>(1);
    let mut actions = ActionSet::new();
    let mut pending_confirm: Option<oneshot::Sender<bool>> = None;

    let mut shell = Shell::new(client, host, redraw);
    shell.navigate(&config.initial_route);
    draw(&shell).await;

    loop {
        let event = tokio::select! {
            line = lines.next_line() => Event::Input(line),
            Ok(()) = revisions.changed() => Event::Redraw,
            Some(location) = return_rx.recv() => Event::OAuthReturn(location),
            Some(request) = confirm_rx.recv() => Event::Confirm(request),
            Some(done) = actions.join_next(), if !actions.is_empty() => Event::ActionDone(done),
        };

        let line = match event {
            Event::Redraw => {
                // Keep the prompt on screen while a question is open
                if pending_confirm.is_none() {
                    draw(&shell).await;
                }
                continue;
            }
            Event::OAuthReturn(location) => {
                shell.navigate(&location);
                continue;
            }
            Event::Confirm(request) => {
                print!("{} [y/N] ", request.prompt);
                flush_stdout();
                pending_confirm = Some(request.reply);
                continue;
            }
            Event::ActionDone(Ok((action, outcome))) => {
                log::debug!("Action '{}' finished: {:?}", action.name(), outcome);
                if action == Action::Connect && outcome == ActionOutcome::Completed {
                    if let Some(return_config) = config.oauth_return.clone() {
                        let tx = return_tx.clone();
                        tokio::spawn(async move {
                            match oauth_return::listen(return_config).await {
                                Ok(location) => {
                                    if tx.send(location).await.is_err() {
                                        log::debug!("Dashboard closed before the OAuth return");
                                    }
                                }
                                Err(e) => log::warn!("OAuth return not received: {}", e),
                            }
                        });
                    }
                }
                continue;
            }
            Event::ActionDone(Err(e)) => {
                log::error!("Action task failed: {}", e);
                continue;
            }
            Event::Input(read) => match input_line(read) {
                Some(line) => line,
                None => break,
            },
        };

        if let Some(reply) = pending_confirm.take() {
            if reply.send(is_yes(&line)).is_err() {
                log::debug!("Confirmation answered after its action ended");
            }
            draw(&shell).await;
            continue;
        }

        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => {
                draw(&shell).await;
                continue;
            }
            Err(e) => {
                print!("{}\n> ", e);
                flush_stdout();
                continue;
            }
        };

        let action = match command {
            Command::Quit => break,
            Command::Help => {
                print!("{}\n> ", HELP);
                flush_stdout();
                continue;
            }
            Command::Go(location) => {
                shell.navigate(&location);
                continue;
            }
            Command::Dismiss => {
                shell.dismiss_banner().await;
                continue;
            }
            Command::Set(field, value) => {
                match shell.settings() {
                    Some(view) => view.set_field(field, value).await,
                    None => not_on_page("set"),
                }
                continue;
            }
            Command::Refresh => Action::Refresh,
            Command::Sync => Action::Sync,
            Command::Save => Action::Save,
            Command::Connect => Action::Connect,
            Command::Disconnect => Action::Disconnect,
        };

        if !spawn_action(&shell, action, &mut actions) {
            not_on_page(action.name());
        }
    }

    // Pending actions are dropped with the set
    actions.abort_all();
    log::info!("Dashboard closed");
    Ok(())
}
