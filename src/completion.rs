use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Completions are slower than passage lookups but still bounded.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// System prompt for the open-ended listening mode.
pub const LISTENER_PROMPT: &str = "You are a gentle, supportive listener for someone \
who is going through a hard time. Reply with warmth and empathy in at most three \
short sentences. Never give medical advice. If the person sounds like they are in \
danger, encourage them to reach out to someone they trust.";

#[async_trait]
pub trait TextCompleter: Send + Sync {
    async fn complete(
        &self,
        user_input: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

#[derive(Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
    system: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

pub struct CompletionClient {
    client: Client,
    endpoint: String,
    model: String,
}

impl CompletionClient {
    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl TextCompleter for CompletionClient {
    async fn complete(
        &self,
        user_input: &str,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: user_input.to_string(),
            stream: false,
            system: LISTENER_PROMPT.to_string(),
        };

        let res = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .json(&request)
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            return Err(format!("completion backend returned {}", status).into());
        }

        let body: GenerateResponse = res.json().await?;
        Ok(body.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Router};
    use std::net::SocketAddr;

    async fn spawn_stub(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn relays_backend_response() {
        let app = Router::new().route(
            "/api/generate",
            post(|| async {
                (
                    [(axum::http::header::CONTENT_TYPE, "application/json")],
                    r#"{"response":"that sounds really hard"}"#,
                )
            }),
        );
        let addr = spawn_stub(app).await;

        let client = CompletionClient::new(&format!("http://{}", addr), "test-model");
        let reply = client.complete("work has been rough").await.unwrap();
        assert_eq!(reply, "that sounds really hard");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let app = Router::new().route(
            "/api/generate",
            post(|| async { (axum::http::StatusCode::SERVICE_UNAVAILABLE, "down") }),
        );
        let addr = spawn_stub(app).await;

        let client = CompletionClient::new(&format!("http://{}", addr), "test-model");
        let err = client.complete("hello").await.unwrap_err();
        assert!(err.to_string().contains("503"));
    }
}
