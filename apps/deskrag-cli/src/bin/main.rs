use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use deskrag_core::config::{Config, Settings};
use deskrag_core::document_store::DocumentStore;
use deskrag_core::types::Answer;
use deskrag_embed::load_embedder;
use deskrag_rag::generate::load_generator;
use deskrag_rag::ServiceDesk;
use deskrag_vector::{IndexBuilder, IndexHandle, VectorIndex};

#[derive(Parser)]
#[command(name = "deskrag", version, about = "IT service desk assistant over a local knowledge base")]
struct Cli {
    /// Config environment (dev, prod, test); defaults to RUST_ENV or dev
    #[arg(long, global = true)]
    config_env: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the index if none is persisted yet
    Index {
        /// Re-read the knowledge base and replace the persisted index
        #[arg(long)]
        force: bool,
    },
    /// Answer a single question
    Ask { question: String },
    /// Interactive question loop on stdin
    Chat,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).init();
}

fn load_settings(config_env: Option<&str>) -> anyhow::Result<Settings> {
    let config = match config_env {
        Some(env) => Config::load_for_env(env),
        None => Config::load(),
    }
    .context("loading configuration")?;
    config.settings().context("invalid configuration")
}

fn open_index(settings: &Settings, embedder: &dyn deskrag_core::traits::Embedder, force: bool) -> anyhow::Result<VectorIndex> {
    let builder = IndexBuilder::new(embedder)
        .with_store(DocumentStore::new(&settings.knowledge_base.extension))
        .with_progress(true);
    let kb_dir = settings.knowledge_base_dir();
    let index_path = settings.index_path();
    let index = if force { builder.rebuild(&kb_dir, &index_path) } else { builder.load_or_build(&kb_dir, &index_path) };
    index.with_context(|| format!("preparing index at {}", index_path.display()))
}

fn print_answer(answer: &Answer) {
    println!("{}", answer.text);
    println!("Source: {}", answer.citation);
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = load_settings(cli.config_env.as_deref())?;
    let embedder = load_embedder(&settings).context("loading embedding model")?;

    let force = matches!(cli.command, Command::Index { force: true });
    let index = {
        let settings = settings.clone();
        let embedder = Arc::clone(&embedder);
        tokio::task::spawn_blocking(move || open_index(&settings, embedder.as_ref(), force)).await??
    };

    if let Command::Index { .. } = cli.command {
        println!("✅ Index ready: {} documents ({})", index.len(), index.model());
        return Ok(());
    }

    let generator = load_generator(&settings.generation);
    let desk = ServiceDesk::from_settings(&settings, Arc::new(IndexHandle::new(index)), embedder, generator);

    match cli.command {
        Command::Ask { question } => {
            let answer = desk.ask(&question).await?;
            print_answer(&answer);
            if answer.is_failure() {
                std::process::exit(2);
            }
        }
        Command::Chat => chat(&desk).await?,
        Command::Index { .. } => {}
    }
    Ok(())
}

async fn chat(desk: &ServiceDesk) -> anyhow::Result<()> {
    println!("IT Service Desk assistant. Type 'exit' to quit.");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if matches!(question.to_lowercase().as_str(), "exit" | "quit") {
            break;
        }
        match desk.ask(question).await {
            Ok(answer) => print_answer(&answer),
            Err(e) => eprintln!("Error: {:#}", e),
        }
        println!();
    }
    Ok(())
}
