use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;

use tenant_rag::core::config::{AppPaths, ConfigService};
use tenant_rag::core::logging;
use tenant_rag::rag::{namespace_for_url, ContextProvider, SemanticChunker};
use tenant_rag::state::RagState;

#[derive(Parser)]
#[command(
    name = "tenant-rag",
    version,
    about = "Operator tools for the tenant retrieval index"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the chunks of a text file as JSON
    Chunk { file: PathBuf },

    /// Print the namespace derived from a site URL
    Namespace { url: String },

    /// Replace a namespace's content with a text file
    Ingest { namespace: String, file: PathBuf },

    /// Add a text file to a namespace as an uploaded document
    IngestDoc { namespace: String, file: PathBuf },

    /// Remove an uploaded document from a namespace
    DeleteDoc { namespace: String, doc_id: String },

    /// Print the context retrieved for a question
    Context {
        namespace: String,
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Print stored vector counts, for one namespace or all
    Stats { namespace: Option<String> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let paths = Arc::new(AppPaths::new());
    logging::init(&paths);

    match cli.command {
        Command::Chunk { file } => {
            let settings = ConfigService::new(paths.clone()).load_settings()?;
            let chunker = SemanticChunker::from_settings(&settings.chunker);
            print_json(&chunker.chunk(&read_text(&file)?))
        }
        Command::Namespace { url } => {
            println!("{}", namespace_for_url(&url)?);
            Ok(())
        }
        Command::Ingest { namespace, file } => {
            let state = RagState::initialize_with(paths).await?;
            let report = state
                .ingestion
                .ingest_namespace(&namespace, &read_text(&file)?)
                .await
                .with_context(|| format!("Failed to ingest {} into '{}'", file.display(), namespace))?;
            print_json(&report)
        }
        Command::IngestDoc { namespace, file } => {
            let state = RagState::initialize_with(paths).await?;
            let doc_name = document_name(&file);
            let report = state
                .ingestion
                .ingest_document(&namespace, &doc_name, &read_text(&file)?)
                .await
                .with_context(|| {
                    format!("Failed to ingest document {} into '{}'", file.display(), namespace)
                })?;
            print_json(&report)
        }
        Command::DeleteDoc { namespace, doc_id } => {
            let state = RagState::initialize_with(paths).await?;
            let removed = state.ingestion.delete_document(&namespace, &doc_id).await?;
            print_json(&serde_json::json!({ "namespace": namespace, "doc_id": doc_id, "removed": removed }))
        }
        Command::Context { namespace, question } => {
            let state = RagState::initialize_with(paths).await?;
            println!("{}", state.context.get_context(&namespace, &question.join(" ")).await);
            Ok(())
        }
        Command::Stats { namespace } => {
            let state = RagState::initialize_with(paths).await?;
            print_json(&state.store.describe_stats(namespace.as_deref()).await?)
        }
    }
}

fn document_name(file: &Path) -> String {
    file.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| file.display().to_string())
}

fn read_text(file: &Path) -> anyhow::Result<String> {
    fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
