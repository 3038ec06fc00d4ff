//! `ragchat-server` exposes a [`ConversationalRag`](ragchat_rag::ConversationalRag)
//! engine over HTTP: `POST /chat`, `GET /` and `GET /health`.

pub mod server;

pub use server::{AppState, ServerConfig, WELCOME_MESSAGE, app_router, run_server};
