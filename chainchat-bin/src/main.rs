use std::time::{SystemTime, UNIX_EPOCH};

use chainchat_core::{
    client::ChatClient,
    config::Config,
    model::{ChatRequest, FeedbackKind, FeedbackRequest, StepEvent, StepStatus},
    service::{ChatService, NullChat},
};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about = "chainchat CLI smoke tool", long_about = None)]
struct Cli {
    /// Base URL of the chat service (falls back to CHAINCHAT_BASE_URL,
    /// then http://localhost:8000)
    #[arg(long)]
    base_url: Option<String>,
    /// Load endpoint/http settings from a JSON or TOML file
    #[arg(long)]
    config: Option<std::path::PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a question and stream pipeline progress while waiting
    Ask {
        #[arg(short, long, help = "Message for the assistant")]
        message: String,
        #[arg(long, help = "Reuse a session id across questions")]
        session: Option<String>,
        /// Answer from the built-in null service instead of the network
        #[arg(long)]
        offline: bool,
    },
    /// Submit feedback for an earlier answer
    Feedback {
        #[arg(long)]
        response_id: String,
        #[arg(long, value_parser = parse_kind, help = "positive or negative")]
        kind: FeedbackKind,
    },
    /// Check whether the service is up
    Health,
}

fn parse_kind(s: &str) -> Result<FeedbackKind, String> {
    match s {
        "positive" | "up" => Ok(FeedbackKind::Positive),
        "negative" | "down" => Ok(FeedbackKind::Negative),
        other => Err(format!("unknown feedback kind '{other}' (use positive|negative)")),
    }
}

fn resolve_base_url(cli: &Cli) -> String {
    cli.base_url
        .clone()
        .or_else(|| std::env::var("CHAINCHAT_BASE_URL").ok())
        .unwrap_or_else(|| "http://localhost:8000".to_string())
}

fn build_client(cli: &Cli) -> anyhow::Result<ChatClient> {
    let client = match &cli.config {
        Some(path) => {
            let mut cfg = Config::from_path(path)?;
            if let Some(base) = &cli.base_url {
                cfg.endpoint.base_url = base.clone();
            }
            ChatClient::from_config(&cfg)?
        }
        None => ChatClient::new(resolve_base_url(cli))?,
    };
    Ok(client)
}

fn new_session_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    format!("session-{}-{:x}", millis, std::process::id())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let client = build_client(&cli)?;

    match cli.command {
        Commands::Ask {
            message,
            session,
            offline,
        } => {
            let req = ChatRequest {
                message,
                session_id: session.unwrap_or_else(new_session_id),
                conversation_history: vec![],
            };
            let mut on_step = |ev: StepEvent| {
                let marker = match ev.status {
                    StepStatus::Running => "..",
                    StepStatus::Complete => "ok",
                };
                eprintln!("[{marker}] {}: {}", ev.step, ev.label);
            };
            let service: Box<dyn ChatService> = if offline {
                Box::new(NullChat)
            } else {
                Box::new(client)
            };
            let resp = service.send_message(req, &mut on_step).await?;

            println!("{}", resp.reply);
            if !resp.sources.is_empty() {
                println!();
                println!("Sources:");
                for s in &resp.sources {
                    println!("  {} <{}>", s.title, s.url);
                }
            }
            eprintln!(
                "[response {} | intent {} | quality passed: {}]",
                resp.response_id, resp.intent, resp.quality.passed
            );
        }
        Commands::Feedback { response_id, kind } => {
            client
                .send_feedback(&FeedbackRequest { response_id, kind })
                .await?;
            println!("feedback recorded");
        }
        Commands::Health => {
            let health = client.health().await?;
            println!("status: {}", health.status);
        }
    }

    Ok(())
}
