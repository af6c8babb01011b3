use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use donjed::api::{create_router, AppState};
use donjed::config::Config;
use donjed::knowledge::KnowledgeBase;
use donjed::llm::LlmStreamClient;
use donjed::processing::index_directory;
use donjed::services::{lock_session, SessionStore};

#[derive(Parser)]
#[command(name = "donjed")]
#[command(about = "Retrieval-augmented chat assistant for DonJed Energy Solutions")]
#[command(version)]
struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Chat with the assistant in the terminal
    Chat,
    /// Ask a single question and print the streamed answer
    Ask {
        #[arg(required = true)]
        question: Vec<String>,
    },
    /// Build a knowledge base from a directory of .txt/.md documents
    Index {
        dir: PathBuf,
        /// Output path (defaults to KNOWLEDGE_BASE_PATH)
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Maximum chunk size in characters (defaults to CHUNK_SIZE)
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// Send a one-line prompt to the primary LLM endpoint
    Check,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "donjed=info,tower_http=debug".into());

    // Logs go to stderr so `chat` and `ask` keep stdout for the reply.
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();
    init_tracing(args.log_format);

    let config = Config::from_env();

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Chat => chat(config).await,
        Command::Ask { question } => ask(config, &question.join(" ")).await,
        Command::Index {
            dir,
            output,
            chunk_size,
        } => index(config, dir, output, chunk_size),
        Command::Check => check(config).await,
    }
}

fn build_state(config: Config) -> anyhow::Result<AppState> {
    tracing::info!("Loading knowledge base from {}...", config.knowledge.path);
    let knowledge = KnowledgeBase::load_or_empty(&config.knowledge.path)
        .with_context(|| format!("failed to load knowledge base {}", config.knowledge.path))?;

    tracing::info!(
        documents = knowledge.total_documents,
        chunks = knowledge.total_chunks,
        "Knowledge base ready"
    );

    Ok(AppState::build(config, knowledge)?)
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = build_state(config)?;

    if !state.chat.llm().has_credential() {
        tracing::warn!("LLM_API_KEY is not set - every reply will explain the missing key");
    }

    let app = create_router(state);

    tracing::info!("DonJed assistant starting on http://{}", addr);
    tracing::info!("  Health check: http://{}/api/v1/health", addr);
    tracing::info!("  API docs:     http://{}/api/v1/docs", addr);
    tracing::info!("  OpenAPI spec: http://{}/api/v1/openapi.json", addr);

    let cancel_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(cancel_token.clone()));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(cancel_token.cancelled_owned())
        .await?;

    Ok(())
}

async fn chat(config: Config) -> anyhow::Result<()> {
    let state = build_state(config)?;
    let sessions = SessionStore::new();
    let (_, session) = sessions.create();

    println!("DonJed assistant. Type /reset to start over, /quit to exit.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/reset" => {
                lock_session(&session).reset();
                println!("(conversation cleared)");
                continue;
            }
            _ => {}
        }

        let mut turn = state.chat.submit(&session, &line)?;
        while let Some(fragment) = turn.next().await {
            print!("{fragment}");
            std::io::stdout().flush()?;
        }
        println!();
    }

    Ok(())
}

async fn ask(config: Config, question: &str) -> anyhow::Result<()> {
    let state = build_state(config)?;
    let (_, session) = state.sessions.create();

    let mut turn = state.chat.submit(&session, question)?;
    while let Some(fragment) = turn.next().await {
        print!("{fragment}");
        std::io::stdout().flush()?;
    }
    println!();

    Ok(())
}

fn index(
    config: Config,
    dir: PathBuf,
    output: Option<PathBuf>,
    chunk_size: Option<usize>,
) -> anyhow::Result<()> {
    let chunk_size = chunk_size.unwrap_or(config.processing.max_chunk_size);
    let output = output.unwrap_or_else(|| PathBuf::from(&config.knowledge.path));

    let knowledge = index_directory(&dir, chunk_size)
        .with_context(|| format!("failed to index {}", dir.display()))?;
    knowledge
        .save(&output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    tracing::info!(
        documents = knowledge.total_documents,
        chunks = knowledge.total_chunks,
        output = %output.display(),
        "Knowledge base written"
    );
    Ok(())
}

async fn check(config: Config) -> anyhow::Result<()> {
    let client = LlmStreamClient::new(&config.llm)?;
    tracing::info!(
        model = client.model(),
        endpoint = %client.endpoints()[0].url,
        "Testing LLM connectivity"
    );

    let reply = client
        .check_connectivity()
        .await
        .context("connectivity test failed")?;
    println!("SUCCESS: {}", reply.trim());
    Ok(())
}

async fn shutdown_signal(cancel_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, stopping server...");
    cancel_token.cancel();
}
