use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use ragchat_rag::{ConversationHistory, EmbeddingProvider, VectorStore};
use ragchat_server::{AppState, ServerConfig, run_server};
use tracing::{info, warn};

use crate::cli::{ChunkingArgs, Cli, Command, ProviderArgs, StoreKind};
use crate::setup;

pub async fn run(cli: Cli) -> Result<()> {
    let Cli { providers, command } = cli;
    match command {
        Command::Ingest { files, chunking } => {
            if providers.store == StoreKind::Memory {
                warn!("ingesting into the memory store; vectors are discarded when the command exits");
            }
            let embedder = setup::embedding_provider(&providers)?;
            let store = setup::vector_store(&providers)?;
            let written = ingest(&providers, &chunking, &files, embedder, store).await?;
            println!("Ingested {written} chunks into '{}'.", providers.collection);
            Ok(())
        }
        Command::Serve { host, port, ingest: seed, chunking } => {
            let config = setup::rag_config(&providers, &chunking)?;
            let embedder = setup::embedding_provider(&providers)?;
            let store = setup::vector_store(&providers)?;
            if !seed.is_empty() {
                ingest(&providers, &chunking, &seed, embedder.clone(), store.clone()).await?;
            } else if providers.store == StoreKind::Memory {
                warn!("memory store is empty; pass --ingest <FILE> or every chat request will fail retrieval");
            }

            let rag = setup::conversational_rag(&providers, &config, embedder, store)?;
            run_server(ServerConfig { host, port }, AppState::new(Arc::new(rag))).await
        }
        Command::Ask { question, ingest: seed, verbose, chunking } => {
            let config = setup::rag_config(&providers, &chunking)?;
            let embedder = setup::embedding_provider(&providers)?;
            let store = setup::vector_store(&providers)?;
            if !seed.is_empty() {
                ingest(&providers, &chunking, &seed, embedder.clone(), store.clone()).await?;
            }

            let rag = setup::conversational_rag(&providers, &config, embedder, store)?;
            let outcome = rag.run(&ConversationHistory::new(), &question).await?;
            if verbose {
                for (i, passage) in outcome.passages.iter().enumerate() {
                    println!("[{}] ({:.3}) {}", i + 1, passage.score, passage.text);
                }
                println!();
            }
            println!("{}", outcome.answer);
            Ok(())
        }
    }
}

async fn ingest(
    providers: &ProviderArgs,
    chunking: &ChunkingArgs,
    files: &[PathBuf],
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
) -> Result<usize> {
    let config = setup::rag_config(providers, chunking)?;
    let pipeline = setup::ingestion_pipeline(config, chunking.chunker, embedder, store)?;
    let written = pipeline
        .ingest_files(&providers.collection, files)
        .await
        .with_context(|| format!("ingestion into '{}' failed", providers.collection))?;
    info!(collection = %providers.collection, record_count = written, "collection rebuilt");
    Ok(written)
}
