mod cli;
mod render;
mod repl;

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use paychat_agent::{
    ChatExtras, ChatSession, FileStore, HttpConfig, HttpTransport, IdentityStore, MemoryStore,
    Role, TurnOutcome,
};
use paychat_common::{ConfigError, PaychatError};
use paychat_config::schema::{PaychatConfig, SessionStoreKind};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use repl::Command;

fn init_logging(directive: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(
                directive
                    .parse()
                    .unwrap_or_else(|_| "paychat=info".parse().unwrap()),
            ),
        )
        .init();
}

fn identity_store(config: &PaychatConfig) -> Arc<dyn IdentityStore> {
    match config.session.store {
        SessionStoreKind::Memory => Arc::new(MemoryStore::new()),
        SessionStoreKind::File => {
            let path = match &config.session.store_path {
                Some(path) => Ok(path.clone()),
                None => paychat_config::toml_loader::default_session_path(),
            };
            match path {
                Ok(path) => {
                    tracing::info!("Session identity stored at {}", path.display());
                    Arc::new(FileStore::new(path))
                }
                Err(e) => {
                    tracing::warn!("No session store path, keeping identity in memory: {e}");
                    Arc::new(MemoryStore::new())
                }
            }
        }
    }
}

/// A file named with `--config` must load; the default one falls back to
/// built-in defaults.
fn resolve_config(
    loaded: Result<PaychatConfig, ConfigError>,
    explicit: bool,
) -> paychat_common::Result<PaychatConfig> {
    match loaded {
        Ok(config) => Ok(config),
        Err(e) if explicit => Err(e.into()),
        Err(e) => {
            tracing::warn!("Config load failed, using defaults: {e}");
            Ok(PaychatConfig::default())
        }
    }
}

fn transport(config: &PaychatConfig) -> paychat_common::Result<HttpTransport> {
    let backend = &config.backend;
    HttpTransport::new(
        HttpConfig::new(&backend.base_url)
            .with_connect_timeout(Duration::from_secs(backend.connect_timeout_secs.into()))
            .with_request_timeout(Duration::from_secs(backend.request_timeout_secs.into()))
            .with_session_header(&backend.session_header),
    )
    .map_err(|e| PaychatError::Agent(e.to_string()))
}

/// Print whatever the last operation left behind: new assistant records,
/// the error field, the rate-limit countdown and the turn latency.
fn report(session: &ChatSession, seen: usize, outcome: TurnOutcome) {
    for record in session.log().since(seen) {
        if record.role != Role::User {
            println!("\n{}\n", render::message(&record));
        }
    }
    if let Some(notice) = session.rate_limit() {
        println!("{}", render::rate_limit(&notice, Instant::now()));
    } else if let Some(error) = session.error() {
        println!("! {error}");
    }
    if outcome == TurnOutcome::Completed {
        if let Some(elapsed) = session.last_latency() {
            println!("{}", render::latency(elapsed));
        }
    }
}

/// The commands act on whatever approval is live; an empty id is refused
/// by the session with the usual error.
fn live_approval_id(session: &ChatSession) -> String {
    session
        .pending_approval()
        .map(|a| a.approval_id)
        .unwrap_or_default()
}

async fn run(session: &ChatSession, extras: Option<ChatExtras>) -> paychat_common::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let seen = session.log().len();
        match repl::parse(&line) {
            Command::Empty => {}
            Command::Send(text) => {
                let outcome = session.send(&text, extras.clone()).await;
                report(session, seen, outcome);
            }
            Command::Approve => {
                let outcome = session.approve(&live_approval_id(session)).await;
                report(session, seen, outcome);
            }
            Command::Deny => {
                let outcome = session.deny(&live_approval_id(session)).await;
                report(session, seen, outcome);
            }
            Command::Limits => {
                session.refresh_limits().await;
                match session.limits() {
                    Some(snapshot) => println!("{}", render::limits(&snapshot)),
                    None => println!("No limits loaded yet."),
                }
                if let Some(error) = session.limits_error() {
                    println!("! {error}");
                }
            }
            Command::Upgrade(key) => {
                if session.upgrade(&key).await {
                    if let Some(snapshot) = session.limits() {
                        println!("{}", render::limits(&snapshot));
                    }
                } else if let Some(error) = session.upgrade_error() {
                    println!("! {error}");
                    session.dismiss_upgrade_error();
                }
            }
            Command::Clear => {
                if session.clear() {
                    println!("Conversation cleared.");
                }
            }
            Command::Health => {
                let status = if session.health().await { "up" } else { "down" };
                println!("backend: {status}");
            }
            Command::Help => println!("{}", repl::HELP),
            Command::Quit => break,
            Command::Unknown(input) => println!("Unknown command: {input} (try /help)"),
        }
    }
    Ok(())
}

async fn start(args: cli::Args) -> paychat_common::Result<()> {
    let loaded = match &args.config {
        Some(path) => paychat_config::load_config_from(Path::new(path)),
        None => paychat_config::load_config(),
    };
    let config_level = loaded
        .as_ref()
        .map(|c| format!("paychat={}", c.logging.level.as_directive()))
        .unwrap_or_else(|_| "paychat=info".to_string());
    init_logging(args.log_level.as_deref().unwrap_or(&config_level));

    tracing::info!("paychat v{} starting...", env!("CARGO_PKG_VERSION"));
    let config = resolve_config(loaded, args.config.is_some())?;
    tracing::info!("Backend: {}", config.backend.base_url);

    let session = ChatSession::builder(Arc::new(transport(&config)?))
        .with_store(identity_store(&config))
        .with_local_fallback(config.session.local_fallback)
        .build();

    if session.bootstrap().await {
        if let Some(identity) = session.identity() {
            println!("Session ready (tier: {}).", identity.tier);
        }
    } else if let Some(error) = session.error() {
        println!("! {error}");
    }
    println!("{}\n", repl::HELP);

    run(&session, args.extras()).await
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = start(cli::parse()).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
    tracing::info!("Shutdown complete");
}
