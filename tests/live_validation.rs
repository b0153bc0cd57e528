use std::{env, sync::Once};

use studynotes::config::Config;
use studynotes::embedding::build_embedding_client;
use studynotes::llm::{GenerationRequest, build_text_generator};
use studynotes::vector_store::{ChunkMetadata, VectorRecord, build_vector_store};

static INIT: Once = Once::new();

fn set_default_env(key: &str, value: &str) {
    let needs_value = env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true);
    if needs_value {
        // SAFETY: Tests run serially via Once and we intentionally mutate process env.
        unsafe {
            env::set_var(key, value);
        }
    }
}

fn live_config() -> Config {
    INIT.call_once(|| {
        set_default_env("VECTOR_STORE", "qdrant");
        set_default_env("QDRANT_URL", "http://127.0.0.1:6333");
        set_default_env("QDRANT_COLLECTION_NAME", "study-notes-live");
        set_default_env("EMBEDDING_PROVIDER", "ollama");
        set_default_env("EMBEDDING_MODEL", "nomic-embed-text");
        set_default_env("EMBEDDING_DIMENSION", "768");
        set_default_env("LLM_PROVIDER", "ollama");
        set_default_env("LLM_MODEL", "llama3.1");
        set_default_env("OLLAMA_URL", "http://127.0.0.1:11434");
    });
    Config::from_env().expect("live configuration")
}

#[tokio::test]
#[ignore = "Requires live Qdrant"]
async fn live_qdrant_namespace_roundtrip() {
    let config = live_config();
    let store = build_vector_store(&config).expect("vector store");
    store.health_check().await.expect("Qdrant should be reachable");

    let namespace = uuid::Uuid::new_v4().to_string();
    let record = VectorRecord {
        id: "page1_chunk0".into(),
        vector: vec![0.1; config.embedding_dimension],
        metadata: ChunkMetadata {
            text: "Mitochondria produce ATP.".into(),
            page: 1,
            heading: Some("Cells".into()),
            chunk_index: 0,
        },
    };
    assert_eq!(store.upsert(&namespace, vec![record]).await.expect("upsert"), 1);

    let fetched = store.fetch_all(&namespace).await.expect("fetch");
    assert_eq!(fetched.len(), 1);
    assert_eq!(fetched[0].heading.as_deref(), Some("Cells"));

    store.delete_namespace(&namespace).await.expect("delete");
    assert!(store.fetch_all(&namespace).await.expect("fetch").is_empty());
}

#[tokio::test]
#[ignore = "Requires live Ollama embeddings"]
async fn live_ollama_embedding_roundtrip() {
    let config = live_config();
    let client = build_embedding_client(&config).expect("embedding client");
    let vectors = client
        .embed_batch(vec!["study notes live embedding".to_string()])
        .await
        .expect("failed to request embeddings from provider");
    assert_eq!(vectors.len(), 1, "expected embedding per input chunk");
    assert_eq!(
        vectors[0].len(),
        config.embedding_dimension,
        "embedding dimension mismatch"
    );
}

#[tokio::test]
#[ignore = "Requires live Ollama generation"]
async fn live_ollama_generation_returns_text() {
    let config = live_config();
    let client = build_text_generator(&config).expect("text generator");
    let text = client
        .generate(GenerationRequest::new(
            "You are a concise summarizer.",
            "Summarize: cells are the basic unit of life.",
            64,
        ))
        .await
        .expect("generation");
    assert!(!text.trim().is_empty());
}
