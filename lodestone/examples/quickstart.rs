//! Quickstart: one library, three algorithms, side-by-side results.
//!
//! Run with: cargo run --example quickstart

use lodestone::prelude::*;
use uuid::Uuid;

fn main() -> Result<()> {
    let registry = IndexRegistry::new(CoreConfig::new(8));
    let library = Uuid::new_v4();

    // Index a handful of chunks into every algorithm so we can compare them.
    let chunks = [
        ("the quick brown fox", [0.9, 0.1, 0.0, 0.0, 0.2, 0.0, 0.0, 0.1]),
        ("jumped over the lazy dog", [0.8, 0.2, 0.1, 0.0, 0.1, 0.0, 0.0, 0.0]),
        ("rust is a systems language", [0.0, 0.1, 0.9, 0.3, 0.0, 0.0, 0.1, 0.0]),
        ("vectors live in libraries", [0.0, 0.0, 0.8, 0.4, 0.0, 0.1, 0.0, 0.0]),
        ("cosine measures direction", [0.1, 0.0, 0.1, 0.0, 0.9, 0.2, 0.0, 0.0]),
    ];

    let mut ids = Vec::new();
    for (text, vector) in &chunks {
        let id = Uuid::new_v4();
        ids.push((id, *text));
        registry.add_chunk(
            library,
            id,
            vector,
            Metadata::new().with_field("text", *text),
            true, // build_all: populate HNSW, LSH and brute force alike
        )?;
    }

    let query = [0.85, 0.15, 0.05, 0.0, 0.15, 0.0, 0.0, 0.05];
    for algorithm in AlgorithmTag::ALL {
        let hits = registry.query(library, &query, 3, Some(algorithm))?;
        println!("{algorithm}:");
        for hit in hits {
            let text = ids
                .iter()
                .find(|(id, _)| *id == hit.chunk_id)
                .map(|(_, text)| *text)
                .unwrap_or("?");
            println!("  {:.4}  {}", hit.similarity, text);
        }
    }

    let stats = registry
        .stats(library, Some(AlgorithmTag::Hnsw))
        .expect("library was just populated");
    println!("\nhnsw stats: {stats:?}");

    Ok(())
}
