//! ASK.AI - terminal chat client
//!
//! Talks to the ASK.AI backend's `/chat` route. Runs an interactive session
//! by default; `send` and `health` cover one-off use from scripts.

mod repl;

use anyhow::{bail, Result};
use askai_core::{ChatClient, ChatSession, ClientConfig, Outcome};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "askai")]
#[command(about = "ASK.AI chat client")]
#[command(version)]
struct Cli {
    /// Chat endpoint URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// User identifier sent with each message
    #[arg(long, global = true)]
    user_id: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat session (default)
    Chat,
    /// Send a single message and print the reply
    Send {
        /// Message text
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Check that the backend is up
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so the transcript owns stdout
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::load()?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }
    if let Some(user_id) = cli.user_id {
        config.user_id = user_id;
    }

    let client = ChatClient::new(&config)?;
    tracing::debug!("Using endpoint {} as {}", client.endpoint(), config.user_id);

    match cli.command.unwrap_or(Commands::Chat) {
        Commands::Chat => repl::run(client, config.user_id).await,
        Commands::Send { message } => send_once(&client, config.user_id, message.join(" ")).await,
        Commands::Health => health(&client).await,
    }
}

async fn send_once(client: &ChatClient, user_id: String, message: String) -> Result<()> {
    let mut session = ChatSession::new(user_id);
    session.set_draft(message);

    let outcome = session.submit(client).await?;
    if let Some(reply) = session.transcript().iter().last() {
        println!("{}", reply.content);
    }

    if outcome == Outcome::Failed {
        bail!("chat request failed");
    }
    Ok(())
}

async fn health(client: &ChatClient) -> Result<()> {
    let status = client.health().await?;
    match status.timestamp {
        Some(ref ts) => println!("{} ({})", status.status, ts),
        None => println!("{}", status.status),
    }

    if !status.is_healthy() {
        bail!("backend reported status {}", status.status);
    }
    Ok(())
}
