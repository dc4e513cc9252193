#![allow(dead_code)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};

use kanban_api::config::AppConfig;
use kanban_api::database::{MemoryStore, Store};
use kanban_api::{app, AppState};

/// In-process server on its own port, backed by a fresh in-memory store.
///
/// The server task lives on the calling test's runtime and stops with it.
pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    pub client: Client,
}

impl TestServer {
    pub async fn start() -> Result<Self> {
        Self::start_with_store(Arc::new(MemoryStore::new())).await
    }

    pub async fn start_with_store(store: Arc<dyn Store>) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut config = AppConfig::development();
        config.server.port = port;
        config.security.bcrypt_cost = 4;
        config.api.enable_request_logging = false;

        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test port")?;
        let router = app(AppState::new(config, store));
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        let server = Self { port, base_url, client: Client::new() };
        server.wait_ready(Duration::from_secs(10)).await?;
        Ok(server)
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = self.client.get(self.url("/health")).send().await {
                if resp.status() == StatusCode::OK || resp.status() == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.get(self.url(path)).bearer_auth(token)
    }

    pub fn post(&self, path: &str, token: &str, body: Value) -> RequestBuilder {
        self.client.post(self.url(path)).bearer_auth(token).json(&body)
    }

    pub fn put(&self, path: &str, token: &str, body: Value) -> RequestBuilder {
        self.client.put(self.url(path)).bearer_auth(token).json(&body)
    }

    pub fn delete(&self, path: &str, token: &str) -> RequestBuilder {
        self.client.delete(self.url(path)).bearer_auth(token)
    }

    /// Signs up `username` and returns `(token, user id)`.
    pub async fn sign_up(&self, username: &str) -> Result<(String, String)> {
        let res = self
            .client
            .post(self.url("/auth/sign-up"))
            .json(&json!({ "username": username, "password": "password123" }))
            .send()
            .await?;
        anyhow::ensure!(res.status() == StatusCode::CREATED, "sign-up failed: {}", res.status());

        let body: Value = res.json().await?;
        let token = body["data"]["token"].as_str().context("missing token")?.to_string();
        let id = body["data"]["user"]["id"].as_str().context("missing user id")?.to_string();
        Ok((token, id))
    }

    /// POSTs and returns the `data` of a 201 response.
    pub async fn create(&self, path: &str, token: &str, body: Value) -> Result<Value> {
        let res = self.post(path, token, body).send().await?;
        let status = res.status();
        let body: Value = res.json().await?;
        anyhow::ensure!(status == StatusCode::CREATED, "POST {} -> {}: {}", path, status, body);
        Ok(body["data"].clone())
    }
}

pub fn id_of(doc: &Value) -> String {
    doc["id"].as_str().unwrap_or_default().to_string()
}
