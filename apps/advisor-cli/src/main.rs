use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use advisor_chat::notify::LogNotifier;
use advisor_chat::{Advisor, Answer, AnyModel, ChatService, InMemoryRecords, NewLead};
use advisor_core::config::{expand_path, Config, Settings};
use advisor_embed::load_embedder;
use advisor_hybrid::RetrievalStore;

#[derive(Parser)]
#[command(
    name = "advisor",
    version,
    about = "Knowledge-base advisor: ingest documents, ask questions, chat"
)]
struct Cli {
    /// Configuration environment (selects config.<env>.toml); defaults to RUST_ENV or "dev".
    #[arg(long, global = true)]
    env: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load, chunk, embed and index the knowledge base, then publish it.
    Ingest {
        /// Knowledge-base directory (default: knowledge_base.source_dir).
        #[arg(long)]
        source: Option<String>,
        /// Index directory (default: knowledge_base.persist_dir).
        #[arg(long)]
        persist: Option<String>,
        /// Hide the embedding progress bar.
        #[arg(long)]
        quiet: bool,
    },
    /// Answer a single question.
    Ask { question: String },
    /// Interactive session with a demo lead.
    Chat,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load_settings(env: Option<&str>) -> anyhow::Result<Settings> {
    let config = match env {
        Some(env) => Config::load_for_env(env),
        None => Config::load(),
    }
    .map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    tracing::debug!(env = config.env_name(), "configuration loaded");
    Ok(config.settings()?)
}

async fn open_store(settings: &Settings) -> anyhow::Result<Arc<RetrievalStore>> {
    let embedder = load_embedder(&settings.embedding).context("loading embedding model")?;
    Ok(Arc::new(RetrievalStore::open(settings, embedder).await?))
}

fn print_answer(answer: &Answer) {
    println!("\n{}\n", answer.text);
    if !answer.sources.is_empty() {
        println!("📚 Sources:");
        for source in &answer.sources {
            match source.page {
                Some(page) => println!("  - {}, Page {page}", source.origin),
                None => println!("  - {}", source.origin),
            }
        }
    }
}

async fn ingest(
    mut settings: Settings,
    source: Option<String>,
    persist: Option<String>,
    quiet: bool,
) -> anyhow::Result<()> {
    if let Some(persist) = persist {
        settings.knowledge_base.persist_dir = persist;
    }
    let source_dir: PathBuf =
        source.map_or_else(|| settings.knowledge_base.source_path(), expand_path);
    println!("Knowledge-base ingestion\n========================");
    println!("Source directory: {}", source_dir.display());
    println!("Index directory:  {}", settings.knowledge_base.persist_path().display());

    // A rebuild never reads the published generation, so a damaged one can be replaced.
    let embedder = load_embedder(&settings.embedding).context("loading embedding model")?;
    let store = RetrievalStore::from_settings(&settings, embedder)?.with_progress(!quiet);
    let report = store.reingest(&source_dir).await?;

    println!("\n✅ Ingestion complete: generation {}", report.generation);
    println!("📊 {} chunks from {} files", report.chunk_count, report.loaded.len());
    for file in &report.loaded {
        println!("  - {} ({} chunks)", file.name, file.chunks);
    }
    if !report.skipped.is_empty() {
        println!("⚠️  Skipped {} files:", report.skipped.len());
        for file in &report.skipped {
            println!("  - {}: {}", file.name, file.reason);
        }
    }
    Ok(())
}

async fn ask(settings: Settings, question: &str) -> anyhow::Result<()> {
    let store = open_store(&settings).await?;
    let model = AnyModel::from_settings(&settings.llm)?;
    let advisor = Advisor::from_settings(&settings, store, model);
    let answer = advisor.ask(question, &[]).await?;
    print_answer(&answer);
    Ok(())
}

fn demo_lead() -> NewLead {
    NewLead {
        full_name: "Demo User".to_string(),
        email: "demo@example.com".to_string(),
        phone: None,
        date_of_birth: NaiveDate::from_ymd_opt(1985, 1, 1).unwrap_or_default(),
        zip_code: "00000".to_string(),
        gender: None,
        address: "Demo address".to_string(),
        consent: true,
    }
}

async fn chat(settings: Settings) -> anyhow::Result<()> {
    let store = open_store(&settings).await?;
    let model = AnyModel::from_settings(&settings.llm)?;
    let advisor = Advisor::from_settings(&settings, store, model);
    let records = Arc::new(InMemoryRecords::new());
    let service = ChatService::new(advisor, records, Arc::new(LogNotifier::default()));
    let token = service.start_session(demo_lead())?;

    println!("💬 Chat started. Commands: /explore <preferences>, /agree, /quit");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        eprint!("> ");
        let Some(line) = lines.next_line().await? else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let result = if line == "/quit" {
            break;
        } else if line == "/agree" {
            match service.agree(&token) {
                Ok(sent) => {
                    let outcome = if sent { "sent" } else { "could not be sent" };
                    println!("✅ Recorded. Confirmation email {outcome}.");
                    continue;
                }
                Err(e) => Err(e),
            }
        } else if let Some(prefs) = line.strip_prefix("/explore") {
            service.explore(&token, prefs.trim()).await
        } else {
            service.chat(&token, line).await
        };
        match result {
            Ok(answer) => print_answer(&answer),
            Err(e) => {
                tracing::error!(error = %e, "request failed");
                println!("{}", e.user_message());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = load_settings(cli.env.as_deref())?;
    match cli.command {
        Command::Ingest { source, persist, quiet } => {
            ingest(settings, source, persist, quiet).await
        }
        Command::Ask { question } => ask(settings, &question).await,
        Command::Chat => chat(settings).await,
    }
}
