//! Orator Spark server
//!
//! Hosts `handle_request` over HTTP. Axum only provides the transport, CORS
//! and request tracing; routing happens inside the library.

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::http::{HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::runtime::Handle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use orator_spark::config::Config;
use orator_spark::cooldown::CooldownScheduler;
use orator_spark::routes::util::ApiResponse;
use orator_spark::store::GameStore;
use orator_spark::{ServiceContext, handle_request};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    let store = if config.in_memory {
        tracing::warn!("running with in-memory store; state is lost on exit");
        GameStore::in_memory()
    } else {
        GameStore::open(&config.data_file)
            .with_context(|| format!("Failed to open {}", config.data_file.display()))?
    };
    let store = Arc::new(store);

    let cooldowns = CooldownScheduler::new(store.clone(), Handle::current());
    let rearmed = cooldowns
        .rearm_all()
        .context("Failed to re-arm cooldown timers")?;
    if rearmed > 0 {
        tracing::info!(count = rearmed, "re-armed pending cooldowns");
    }

    let ctx = Arc::new(ServiceContext::new(store).with_cooldowns(cooldowns));

    let app = Router::new()
        .fallback(dispatch)
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::CONTENT_TYPE])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Server running on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}

/// Forward every request to the library dispatcher. Store work may touch the
/// disk, so it runs on the blocking pool.
async fn dispatch(
    State(ctx): State<Arc<ServiceContext>>,
    method: Method,
    uri: Uri,
    body: String,
) -> Response {
    let path = uri.path().to_string();
    let result = tokio::task::spawn_blocking(move || {
        handle_request(&ctx, method.as_str(), &path, &body)
    })
    .await;

    let res = result.unwrap_or_else(|e| {
        tracing::error!(error = %e, "request handler panicked");
        ApiResponse::server_error()
    });
    let status = StatusCode::from_u16(res.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        res.body,
    )
        .into_response()
}
