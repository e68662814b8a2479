use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use switchboard_core::{
    Agent, InMemorySessionStore, Message, Runner, Turn, TurnRole, extract_reply,
};

mod config;

use config::SwitchboardConfig;

#[derive(Parser)]
#[command(name = "switchboard")]
#[command(version)]
#[command(about = "Switchboard: route requests from a coordinator agent to specialists")]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default help-desk config to ~/.switchboard
    Init,

    /// Show the loaded configuration with secrets masked
    Config,

    /// Show the validated agent tree
    Agents,

    /// Send one message and print the reply
    Ask {
        #[arg(long, default_value = "test_user")]
        user: String,

        #[arg(long, default_value = "test_session")]
        session: String,

        /// The message to send
        message: String,
    },

    /// Chat on one session, one round per line of stdin
    Chat {
        #[arg(long, default_value = "test_user")]
        user: String,

        #[arg(long, default_value = "test_session")]
        session: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Init => cmd_init().await,
        Commands::Config => cmd_config(&cli.config),
        Commands::Agents => cmd_agents(&cli.config),
        Commands::Ask {
            user,
            session,
            message,
        } => cmd_ask(&cli.config, &user, &session, &message).await,
        Commands::Chat { user, session } => cmd_chat(&cli.config, &user, &session).await,
    }
}

async fn cmd_init() -> Result<()> {
    let config_dir = config::config_dir();
    tokio::fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create config dir: {}", config_dir.display()))?;

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        warn!("Config already exists at {}", config_path.display());
        return Ok(());
    }

    let default_config = include_str!("../../../config/default.toml");
    tokio::fs::write(&config_path, default_config).await?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&config_path, std::fs::Permissions::from_mode(0o600)).await?;
    }
    info!("Created default config at {}", config_path.display());

    println!("Switchboard initialized at {}", config_dir.display());
    println!("Set OPENAI_API_KEY or edit {} to configure providers.", config_path.display());
    Ok(())
}

fn cmd_config(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = SwitchboardConfig::load(config_path)?;
    println!("{:#?}", cfg);
    Ok(())
}

fn cmd_agents(config_path: &Option<PathBuf>) -> Result<()> {
    let cfg = SwitchboardConfig::load(config_path)?;
    let registry = cfg.build_registry()?;
    print_agent(registry.root(), 0);
    Ok(())
}

fn print_agent(agent: &Agent, depth: usize) {
    let indent = "  ".repeat(depth);
    if agent.description().is_empty() {
        println!("{}{} [{}]", indent, agent.name(), agent.provider().model());
    } else {
        println!(
            "{}{} [{}]: {}",
            indent,
            agent.name(),
            agent.provider().model(),
            agent.description()
        );
    }
    for child in agent.children() {
        print_agent(child, depth + 1);
    }
}

/// Build the runner with a fresh in-memory store
fn build_runner(cfg: &SwitchboardConfig) -> Result<Runner> {
    let registry = cfg.build_registry()?;
    let sessions = Arc::new(InMemorySessionStore::new());
    Ok(Runner::new(&cfg.app.name, Arc::new(registry), sessions)
        .with_config(cfg.runner.to_runner_config()))
}

async fn ensure_session(runner: &Runner, user: &str, session: &str) -> Result<()> {
    if runner
        .sessions()
        .get(runner.app_name(), user, session)
        .await
        .is_none()
    {
        runner
            .sessions()
            .create(runner.app_name(), user, Some(session), HashMap::new())
            .await?;
    }
    Ok(())
}

fn log_turns(turns: &[Turn]) {
    for turn in turns {
        match (&turn.role, &turn.delegate_to) {
            (TurnRole::Delegation, Some(target)) => {
                info!("Turn from '{}' ({}) -> '{}'", turn.author, turn.role, target)
            }
            _ => info!("Turn from '{}' ({})", turn.author, turn.role),
        }
    }
}

async fn cmd_ask(config_path: &Option<PathBuf>, user: &str, session: &str, message: &str) -> Result<()> {
    let cfg = SwitchboardConfig::load(config_path)?;
    let runner = build_runner(&cfg)?;
    ensure_session(&runner, user, session).await?;

    let turns = runner
        .run(user, session, Message::user_text(message))
        .await
        .context("Request failed")?;
    log_turns(&turns);

    println!("{}", extract_reply(&turns));
    Ok(())
}

async fn cmd_chat(config_path: &Option<PathBuf>, user: &str, session: &str) -> Result<()> {
    let cfg = SwitchboardConfig::load(config_path)?;
    let runner = build_runner(&cfg)?;
    ensure_session(&runner, user, session).await?;

    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down...");
            cancel_on_signal.cancel();
        }
    });

    println!(
        "Chatting with {} as {} (session {}). Ctrl+C to quit.",
        runner.agents().root().name(),
        user,
        session
    );

    chat_loop(&runner, user, session, spawn_stdin_reader(), cancel).await?;

    println!("Bye.");
    Ok(())
}

/// Read stdin lines on a plain thread.
///
/// A blocked read cannot be cancelled, and a tokio blocking task would keep
/// the runtime from shutting down. The thread is abandoned at exit.
fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// One round per input line until input ends or `cancel` fires
async fn chat_loop(
    runner: &Runner,
    user: &str,
    session: &str,
    mut lines: mpsc::Receiver<String>,
    cancel: CancellationToken,
) -> Result<()> {
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.recv() => line,
        };
        let Some(line) = line else { break };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }

        let outcome = tokio::select! {
            _ = cancel.cancelled() => {
                warn!("Round cancelled; only the message was recorded");
                break;
            }
            outcome = runner.run(user, session, Message::user_text(text)) => outcome,
        };

        match outcome {
            Ok(turns) => {
                log_turns(&turns);
                println!("{}", extract_reply(&turns));
            }
            Err(e) if e.is_recoverable() => {
                warn!("Round failed: {}", e);
                eprintln!("error: {}", e);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
