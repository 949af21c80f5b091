//! End-to-end text search: embed, query the index, enrich from the store.
//!
//! The embedding provider and chunk store here are tiny in-process stand-ins
//! for the real external services, enough to show the orchestrator workflow:
//! text in, ranked enriched matches out.
//!
//! Run with: cargo run --example search_pipeline

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use lodestone::prelude::*;
use uuid::Uuid;

const DIM: usize = 8;

/// Deterministic toy embedder: hashes character trigrams into a fixed-width
/// vector. Stands in for the remote embedding API.
struct TrigramEmbedder;

fn embed(text: &str) -> Vec<f32> {
    let chars: Vec<char> = text.to_lowercase().chars().collect();
    let mut v = vec![0.0f32; DIM];
    for window in chars.windows(3) {
        let mut h: u32 = 2166136261;
        for &c in window {
            h = (h ^ c as u32).wrapping_mul(16777619);
        }
        v[h as usize % DIM] += 1.0;
    }
    v
}

#[async_trait]
impl EmbeddingProvider for TrigramEmbedder {
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(embed(text))
    }
}

/// In-memory chunk store standing in for the relational database.
struct DemoStore {
    chunks: HashMap<ChunkId, StoredChunk>,
}

#[async_trait]
impl ChunkStore for DemoStore {
    async fn fetch_chunk(&self, chunk_id: ChunkId) -> Result<Option<StoredChunk>> {
        Ok(self.chunks.get(&chunk_id).cloned())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let registry = Arc::new(IndexRegistry::new(CoreConfig::new(DIM)));
    let library = Uuid::new_v4();

    let documents = [
        ("handbook.md", "the quick brown fox jumped over the lazy dog"),
        ("handbook.md", "a fast auburn fox leapt across a sleepy hound"),
        ("rustbook.md", "rust gives memory safety without garbage collection"),
        ("rustbook.md", "ownership and borrowing keep data races away"),
        ("paper.pdf", "cosine similarity compares direction not magnitude"),
    ];

    let mut chunks = HashMap::new();
    for (document_name, text) in documents {
        let id = Uuid::new_v4();
        registry.add_chunk(library, id, &embed(text), Metadata::new(), false)?;
        chunks.insert(
            id,
            StoredChunk {
                text: text.to_string(),
                document_name: document_name.to_string(),
            },
        );
    }

    let orchestrator =
        SearchOrchestrator::new(Arc::clone(&registry), TrigramEmbedder, DemoStore { chunks });

    for query in ["quick fox", "memory safety in rust", "comparing directions"] {
        let matches = orchestrator.search_text(library, query, 2, None).await?;
        println!("query: {query:?}");
        for m in matches {
            println!("  {:.4}  [{}] {}", m.similarity, m.document_name, m.text);
        }
    }

    Ok(())
}
