use std::sync::Arc;

use ragchat_model::MockLlm;
use ragchat_rag::{
    ConversationalRag, Document, HashingEmbeddingProvider, InMemoryVectorStore, IngestionPipeline,
    RagConfig, VectorRetriever,
};
use ragchat_server::{AppState, WELCOME_MESSAGE, app_router};
use serde_json::{Value, json};

const COLLECTION: &str = "contract";

async fn engine(documents: &[Document], llm: MockLlm) -> Arc<ConversationalRag> {
    let embedder = Arc::new(HashingEmbeddingProvider::new(256));
    let store = Arc::new(InMemoryVectorStore::new());
    IngestionPipeline::builder()
        .config(RagConfig::builder().chunk_size(24).chunk_overlap(1).build().expect("config"))
        .embedding_provider(embedder.clone())
        .vector_store(store.clone())
        .build()
        .expect("pipeline")
        .ingest(COLLECTION, documents)
        .await
        .expect("ingest");

    Arc::new(
        ConversationalRag::builder()
            .language_model(Arc::new(llm))
            .retriever(Arc::new(VectorRetriever::new(embedder, store, COLLECTION)))
            .build()
            .expect("engine"),
    )
}

async fn spawn_server(rag: Arc<ConversationalRag>) -> (String, tokio::task::JoinHandle<()>) {
    let app = app_router(AppState::new(rag));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), handle)
}

fn poem() -> Document {
    Document::new("poem.txt", "长安一片月，万户捣衣声。秋风吹不尽，总是玉关情。")
}

#[tokio::test]
async fn chat_returns_an_answer() {
    let rag = engine(&[poem()], MockLlm::new("mock").with_reply("长安一片月。")).await;
    let (base, handle) = spawn_server(rag).await;

    let response = reqwest::Client::new()
        .post(format!("{}/chat", base))
        .json(&json!({"question": "月亮", "chat_history": []}))
        .send()
        .await
        .expect("chat response");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("chat json");
    assert_eq!(body, json!({"answer": "长安一片月。"}));

    handle.abort();
}

#[tokio::test]
async fn chat_accepts_history_pairs() {
    let llm = MockLlm::new("mock").with_reply("李白还写了什么诗？").with_reply("《静夜思》");
    let rag = engine(&[poem()], llm).await;
    let (base, handle) = spawn_server(rag).await;

    let response = reqwest::Client::new()
        .post(format!("{}/chat", base))
        .json(&json!({
            "question": "他还写了什么诗",
            "chat_history": [["这首诗的作者是谁", "李白"]]
        }))
        .send()
        .await
        .expect("chat response");

    assert!(response.status().is_success());
    let body: Value = response.json().await.expect("chat json");
    assert_eq!(body["answer"], "《静夜思》");

    handle.abort();
}

#[tokio::test]
async fn rewrite_failure_names_the_stage() {
    let rag = engine(&[poem()], MockLlm::new("mock").with_failure("model unavailable")).await;
    let (base, handle) = spawn_server(rag).await;

    let response = reqwest::Client::new()
        .post(format!("{}/chat", base))
        .json(&json!({"question": "下一句呢", "chat_history": [["第一句", "长安一片月"]]}))
        .send()
        .await
        .expect("chat response");

    assert_eq!(response.status(), reqwest::StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.expect("error json");
    assert_eq!(body["stage"], "rewrite");
    assert!(body["error"].as_str().unwrap_or_default().contains("model unavailable"));

    handle.abort();
}

#[tokio::test]
async fn empty_collection_is_a_retrieval_failure() {
    let rag = engine(&[], MockLlm::new("mock")).await;
    let (base, handle) = spawn_server(rag).await;

    let response = reqwest::Client::new()
        .post(format!("{}/chat", base))
        .json(&json!({"question": "月亮"}))
        .send()
        .await
        .expect("chat response");

    assert!(!response.status().is_success());
    let body: Value = response.json().await.expect("error json");
    assert_eq!(body["stage"], "retrieve");

    handle.abort();
}

#[tokio::test]
async fn blank_and_malformed_requests_are_rejected() {
    let rag = engine(&[poem()], MockLlm::new("mock")).await;
    let (base, handle) = spawn_server(rag).await;
    let client = reqwest::Client::new();

    let blank = client
        .post(format!("{}/chat", base))
        .json(&json!({"question": "  "}))
        .send()
        .await
        .expect("blank response");
    assert_eq!(blank.status(), reqwest::StatusCode::BAD_REQUEST);

    let malformed = client
        .post(format!("{}/chat", base))
        .header(reqwest::header::CONTENT_TYPE, "application/json")
        .body("{\"chat_history\": 3}")
        .send()
        .await
        .expect("malformed response");
    assert_eq!(malformed.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = malformed.json().await.expect("error json");
    assert!(body.get("error").is_some());

    handle.abort();
}

#[tokio::test]
async fn index_and_health_respond() {
    let rag = engine(&[poem()], MockLlm::new("mock")).await;
    let (base, handle) = spawn_server(rag).await;
    let client = reqwest::Client::new();

    let index: Value = client
        .get(format!("{}/", base))
        .send()
        .await
        .expect("index response")
        .json()
        .await
        .expect("index json");
    assert_eq!(index["message"], WELCOME_MESSAGE);

    let health = client.get(format!("{}/health", base)).send().await.expect("health response");
    assert!(health.status().is_success());

    handle.abort();
}
