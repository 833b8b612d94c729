use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use rustyline::Editor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use sidechat_application::panel::active_trigger;
use sidechat_application::{ChatMediator, PanelState};
use sidechat_core::protocol::{PanelEvent, PanelIntent};
use sidechat_infrastructure::{SettingsService, SidechatPaths, WorkspaceFileResolver};

mod helper;

use helper::CliHelper;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "sidechat")]
#[command(about = "Chat with an AI assistant about files in your workspace", long_about = None)]
struct Cli {
    /// Workspace root to search (repeatable). Defaults to the current directory.
    #[arg(long = "root", value_name = "DIR")]
    roots: Vec<PathBuf>,

    /// Override the configured model.
    #[arg(long)]
    model: Option<String>,

    /// Use this directory instead of the platform config directory.
    #[arg(long, value_name = "DIR")]
    config_dir: Option<PathBuf>,
}

/// Writes logs to a daily file so they never interleave with the REPL.
fn init_logging(paths: &SidechatPaths) -> Result<WorkerGuard> {
    let logs_dir = paths.logs_dir()?;
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&logs_dir, "sidechat.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,reqwest=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .init();

    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let paths = SidechatPaths::new(cli.config_dir.clone());
    let _log_guard = init_logging(&paths)?;

    // ===== Backend Initialization =====
    let mut settings = SettingsService::new(&paths)?.load()?;
    if let Some(model) = cli.model {
        settings.chat.model = model;
    }

    let roots = if cli.roots.is_empty() {
        vec![std::env::current_dir()?]
    } else {
        cli.roots
    };
    tracing::info!("[Bootstrap] Workspace roots: {:?}", roots);

    let resolver = Arc::new(WorkspaceFileResolver::from_config(roots, &settings.search));

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<PanelEvent>();
    let (intent_tx, intent_rx) = mpsc::channel::<PanelIntent>(32);

    let mediator = ChatMediator::from_settings(&settings, resolver, event_tx);
    let mediator_task = tokio::spawn(mediator.clone().run(intent_rx));

    // Generous margin over the HTTP timeout so the client reports first.
    let reply_timeout = Duration::from_secs(settings.chat.request_timeout_secs + 10);

    let mut panel = PanelState::new();
    intent_tx.send(panel.ready()).await?;
    pump_events(&mut event_rx, &mut panel, HANDSHAKE_TIMEOUT, |event| {
        matches!(event, PanelEvent::Initialized)
    })
    .await;

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== sidechat ===".bright_magenta().bold());
    println!(
        "{}",
        format!("model: {}", settings.chat.model).bright_black()
    );
    if !settings.has_credential() {
        println!(
            "{}",
            "No API key configured. Set OPENAI_API_KEY or add secret.json.".yellow()
        );
    }
    println!(
        "{}",
        "End a line with @name to search files, /attach N to attach a result, /quit to exit."
            .bright_black()
    );
    println!();

    // ===== Main REPL Loop =====
    let mut carry_over = String::new();
    loop {
        // Late replies after a timeout.
        while let Ok(event) = event_rx.try_recv() {
            render(&event);
            panel.apply_event(event, Utc::now());
        }
        if panel.dismiss_expired_error(Utc::now()) {
            tracing::debug!("[Readline] Error banner dismissed");
        }

        let prompt = if panel.staged.is_empty() {
            ">> ".to_string()
        } else {
            format!("[{} attached] >> ", panel.staged.len())
        };

        // Text left in the draft after `/attach` strips the `@query`.
        let initial = std::mem::take(&mut carry_over);
        match rl.readline_with_initial(&prompt, (initial.as_str(), "")) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if let Some(command) = trimmed.strip_prefix('/') {
                    let (name, arg) = command
                        .split_once(' ')
                        .map(|(name, arg)| (name, arg.trim()))
                        .unwrap_or((command, ""));

                    match name {
                        "quit" | "exit" => {
                            println!("{}", "Goodbye!".bright_green());
                            break;
                        }
                        "attach" => {
                            if attach(&mut panel, arg) {
                                carry_over = panel.draft.trim_start().to_string();
                            }
                        }
                        "detach" => detach(&mut panel, arg),
                        "files" => print_staged(&panel),
                        "reset" => {
                            mediator.reset_history().await;
                            panel.messages.clear();
                            println!("{}", "Conversation cleared.".bright_green());
                        }
                        "search" => {
                            panel.open_popup();
                            let intents = panel.search(arg);
                            search(&intent_tx, &mut event_rx, &mut panel, intents).await?;
                        }
                        _ => println!("{}", format!("Unknown command: /{name}").bright_black()),
                    }
                    continue;
                }

                // A trailing `@query` word searches instead of sending.
                let cursor = line.chars().count();
                if active_trigger(&line, cursor).is_some_and(|t| t.starts_word(&line)) {
                    let intents = panel.update_draft(line.clone(), cursor);
                    search(&intent_tx, &mut event_rx, &mut panel, intents).await?;
                    continue;
                }

                panel.update_draft(trimmed, trimmed.chars().count());
                let intents = panel.submit(Utc::now());
                if intents.is_empty() {
                    println!("{}", "Still waiting for the previous reply.".yellow());
                    continue;
                }
                println!("{}", format!("> {}", trimmed).green());
                for intent in intents {
                    intent_tx.send(intent).await?;
                }
                pump_events(&mut event_rx, &mut panel, reply_timeout, |event| {
                    matches!(
                        event,
                        PanelEvent::AiResponse { .. } | PanelEvent::Error { .. }
                    )
                })
                .await;
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type '/quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    // Closing the intent channel lets the mediator drain and exit.
    drop(intent_tx);
    let _ = mediator_task.await;

    Ok(())
}

async fn search(
    intent_tx: &mpsc::Sender<PanelIntent>,
    event_rx: &mut mpsc::UnboundedReceiver<PanelEvent>,
    panel: &mut PanelState,
    intents: Vec<PanelIntent>,
) -> Result<()> {
    if intents.is_empty() {
        println!("{}", "Type part of a file name after @ to search.".bright_black());
        return Ok(());
    }
    for intent in intents {
        intent_tx.send(intent).await?;
    }
    pump_events(event_rx, panel, SEARCH_TIMEOUT, |event| {
        matches!(event, PanelEvent::FilesFound { .. })
    })
    .await;
    Ok(())
}

/// Renders and applies events until `done` matches one, the channel closes,
/// or `wait` passes without a new event.
async fn pump_events<F>(
    events: &mut mpsc::UnboundedReceiver<PanelEvent>,
    panel: &mut PanelState,
    wait: Duration,
    done: F,
) where
    F: Fn(&PanelEvent) -> bool,
{
    loop {
        match timeout(wait, events.recv()).await {
            Ok(Some(event)) => {
                let finished = done(&event);
                render(&event);
                panel.apply_event(event, Utc::now());
                if finished {
                    return;
                }
            }
            Ok(None) => {
                eprintln!("{}", "Chat backend stopped.".red());
                return;
            }
            Err(_) => {
                println!("{}", "Error: Request timed out.".red());
                return;
            }
        }
    }
}

fn render(event: &PanelEvent) {
    match event {
        PanelEvent::TypingStart => println!("{}", "thinking...".bright_black()),
        PanelEvent::TypingEnd | PanelEvent::Initialized | PanelEvent::FileContent { .. } => {}
        PanelEvent::AiResponse { message, .. } => {
            for line in message.lines() {
                println!("{}", line.bright_blue());
            }
            println!();
        }
        PanelEvent::FilesFound { files } => {
            if files.is_empty() {
                println!("{}", "No matching files.".bright_black());
            }
            for (i, file) in files.iter().enumerate() {
                println!(
                    "  {} {}",
                    format!("{:>2}.", i + 1).bright_yellow(),
                    file.relative_path
                );
            }
        }
        PanelEvent::Error { message } => println!("{}", message.red()),
    }
}

fn parse_index(arg: &str) -> Option<usize> {
    arg.parse::<usize>().ok().and_then(|n| n.checked_sub(1))
}

fn attach(panel: &mut PanelState, arg: &str) -> bool {
    let Some(index) = parse_index(arg) else {
        println!("{}", "Usage: /attach N (N from the last search)".bright_black());
        return false;
    };
    if panel.select_result(index) {
        print_staged(panel);
        true
    } else {
        println!("{}", format!("No search result #{arg}").yellow());
        false
    }
}

fn detach(panel: &mut PanelState, arg: &str) {
    let path = parse_index(arg).and_then(|index| panel.staged.get(index).map(|f| f.path.clone()));
    match path {
        Some(path) => {
            panel.detach(&path);
            print_staged(panel);
        }
        None => println!("{}", "Usage: /detach N (see /files)".bright_black()),
    }
}

fn print_staged(panel: &PanelState) {
    if panel.staged.is_empty() {
        println!("{}", "No files attached.".bright_black());
        return;
    }
    println!("{}", "Attached:".bright_magenta());
    for (i, file) in panel.staged.iter().enumerate() {
        println!("  {:>2}. {}", i + 1, file.relative_path);
    }
}
