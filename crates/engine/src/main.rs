//! Affinitas Engine - Main entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::header::HeaderName;
use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use affinitas_engine::app::{App, Repos};
use affinitas_engine::infrastructure::{
    clock::SystemClock,
    content::load_bundle,
    memory::MemoryStore,
    openai::OpenAiClient,
    ports::ClockPort,
};
use affinitas_engine::use_cases::chat::DEFAULT_TOKEN_BUDGET;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv_from_repo_root();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "affinitas_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Affinitas Engine");

    // Load configuration
    let server_host = std::env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let server_port: u16 = std::env::var("SERVER_PORT")
        .or_else(|_| std::env::var("PORT"))
        .unwrap_or_else(|_| "8000".into())
        .parse()
        .unwrap_or(8000);
    let bundle_path =
        std::env::var("CONTENT_BUNDLE_PATH").unwrap_or_else(|_| "content/bundle.json".into());
    let token_budget: usize = std::env::var("CHAT_TOKEN_BUDGET")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_TOKEN_BUDGET);

    // Seed the store from the authored content bundle
    tracing::info!(path = %bundle_path, "Loading content bundle");
    let bundle = load_bundle(&bundle_path)?;
    let store = Arc::new(MemoryStore::new());
    store
        .seed(bundle)
        .map_err(|e| anyhow::anyhow!("content bundle rejected: {e}"))?;

    // Judgment client (judge + narrator share one endpoint)
    let llm = Arc::new(OpenAiClient::from_env()?);
    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);

    let app = Arc::new(App::new(
        Repos {
            sessions: store.clone(),
            saves: store.clone(),
            defaults: store.clone(),
            npcs: store,
        },
        llm.clone(),
        llm,
        clock,
        token_budget,
    ));

    let mut router = affinitas_engine::api::routes()
        .with_state(app)
        .layer(TraceLayer::new_for_http());

    if let Some(cors) = build_cors_layer_from_env() {
        router = router.layer(cors);
    }

    let addr: SocketAddr = format!("{server_host}:{server_port}").parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}

fn build_cors_layer_from_env() -> Option<CorsLayer> {
    let allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let allowed_origins = allowed_origins?;

    let mut cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        // The client sends X-Client-UUID and JSON content types which
        // trigger CORS preflights.
        .allow_headers([
            HeaderName::from_static("x-client-uuid"),
            axum::http::header::CONTENT_TYPE,
        ]);

    if allowed_origins == "*" {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = allowed_origins
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        if origins.is_empty() {
            return None;
        }

        cors = cors.allow_origin(origins);
    }

    Some(cors)
}
