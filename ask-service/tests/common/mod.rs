#![allow(dead_code)]

use ask_service::config::AskConfig;
use ask_service::services::{init_metrics, ChatModel, MockChatModel};
use ask_service::startup::Application;
use service_core::config::{Config as CoreConfig, DEFAULT_HOST};
use std::sync::{Arc, Once};

static INIT_METRICS: Once = Once::new();

pub fn ensure_metrics_initialized() {
    INIT_METRICS.call_once(|| {
        init_metrics().expect("Failed to install metrics recorder");
    });
}

/// Mock-backed configuration listening on the given port.
pub fn test_config(port: u16) -> AskConfig {
    let common = CoreConfig {
        host: DEFAULT_HOST.to_string(),
        port,
    };
    AskConfig::from_lookup(common, |key| match key {
        "ASK_MODEL_BACKEND" => Some("mock".to_string()),
        _ => None,
    })
    .expect("Failed to build test configuration")
}

pub struct TestApp {
    pub address: String,
}

impl TestApp {
    /// Spawn the service with the configured (mock) model on a random port.
    pub async fn spawn() -> Self {
        ensure_metrics_initialized();

        let app = Application::build(test_config(0))
            .await
            .expect("Failed to build test application");
        Self::start(app).await
    }

    /// Spawn the service around a specific model.
    pub async fn spawn_with_model(model: Arc<dyn ChatModel>) -> Self {
        ensure_metrics_initialized();

        let app = Application::build_with_model(test_config(0), model)
            .await
            .expect("Failed to build test application");
        Self::start(app).await
    }

    async fn start(app: Application) -> Self {
        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp { address }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

pub fn failing_model() -> Arc<dyn ChatModel> {
    Arc::new(MockChatModel::failing())
}

pub fn disabled_model() -> Arc<dyn ChatModel> {
    Arc::new(MockChatModel::new(false))
}
