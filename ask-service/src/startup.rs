//! Application startup and lifecycle management.
//!
//! The model is loaded exactly once here and shared with every request
//! through [`AppState`].

use crate::config::{AskConfig, ModelBackend, ModelConfig};
use crate::handlers;
use crate::services::{ChatModel, GgufChatModel, MockChatModel};
use axum::{
    http::Uri,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{metrics_middleware, request_id_middleware, REQUEST_ID_HEADER};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AskConfig,
    pub model: Arc<dyn ChatModel>,
}

/// Load the configured chat model. GGUF weights are read on a blocking thread.
pub async fn load_model(config: &ModelConfig) -> Result<Arc<dyn ChatModel>, AppError> {
    match config.backend {
        ModelBackend::Mock => {
            tracing::warn!("Using mock chat model, responses are not generated by a language model");
            Ok(Arc::new(MockChatModel::new(true)))
        }
        ModelBackend::Gguf => {
            tracing::info!(
                weights = %config.weights_path.display(),
                tokenizer = %config.tokenizer_path.display(),
                "Loading GGUF model"
            );
            let model_config = config.clone();
            let model = tokio::task::spawn_blocking(move || GgufChatModel::load(&model_config))
                .await
                .map_err(|e| {
                    AppError::InternalError(anyhow::anyhow!("model loading task failed: {}", e))
                })?
                .map_err(|e| {
                    tracing::error!("Failed to load model: {}", e);
                    AppError::from(e)
                })?;
            Ok(Arc::new(model))
        }
    }
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(anyhow::anyhow!("No route for {}", uri.path()))
}

/// Build the HTTP router around an already-loaded model.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ask", post(handlers::ask))
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .fallback(not_found)
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    address: SocketAddr,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application with the given configuration, loading the model.
    pub async fn build(config: AskConfig) -> Result<Self, AppError> {
        let model = load_model(&config.model).await?;
        Self::build_with_model(config, model).await
    }

    /// Build the application around a model that is already loaded.
    pub async fn build_with_model(
        config: AskConfig,
        model: Arc<dyn ChatModel>,
    ) -> Result<Self, AppError> {
        // Port 0 picks a random port, used by tests.
        let host = config.common.host.as_str();
        let port = config.common.port;
        let listener = TcpListener::bind((host, port)).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}:{}: {}", host, port, e);
            AppError::from(e)
        })?;
        let address = listener.local_addr()?;

        tracing::info!(%address, model = %model.name(), "Ask service listening");

        let router = build_router(AppState { config, model });

        Ok(Self {
            address,
            listener,
            router,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.address.port()
    }

    /// Get the address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Serve until Ctrl+C or SIGTERM.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
