use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{GenerationRequest, LlmClientError, REQUEST_TIMEOUT, TextGenerator};

/// Client for a local Ollama runtime's `/api/generate` endpoint.
pub struct OllamaGenerationClient {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaGenerationClient {
    /// Build a client targeting `base_url`.
    pub fn new(base_url: String, model: String) -> Result<Self, LlmClientError> {
        let http = Client::builder()
            .user_agent("studynotes/llm")
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| {
                LlmClientError::ProviderUnavailable(format!(
                    "failed to build Ollama HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            http,
            base_url,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl TextGenerator for OllamaGenerationClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, LlmClientError> {
        let payload = json!({
            "model": self.model,
            "system": request.system,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": 0.1,
                "num_predict": request.max_tokens,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                LlmClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(LlmClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            LlmClientError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(LlmClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn forwards_system_prompt_and_budget() {
        let server = MockServer::start_async().await;
        let client = OllamaGenerationClient::new(server.base_url(), "llama3".into())
            .expect("client");

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .json_body_partial(
                        r#"{"model": "llama3", "system": "You are a concise summarizer.", "options": {"num_predict": 200}}"#,
                    );
                then.status(200).json_body(json!({
                    "response": "  This lecture covers waves.  ",
                    "done": true
                }));
            })
            .await;

        let text = client
            .generate(GenerationRequest::new(
                "You are a concise summarizer.",
                "Summarize",
                200,
            ))
            .await
            .expect("text");

        mock.assert_async().await;
        assert_eq!(text, "This lecture covers waves.");
    }

    #[tokio::test]
    async fn reports_error_status() {
        let server = MockServer::start_async().await;
        let client = OllamaGenerationClient::new(server.base_url(), "llama3".into())
            .expect("client");

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("boom");
            })
            .await;

        let error = client
            .generate(GenerationRequest::new("s", "p", 10))
            .await
            .expect_err("error response");

        assert!(
            matches!(error, LlmClientError::GenerationFailed(ref message) if message.contains("500"))
        );
    }

    #[tokio::test]
    async fn rejects_incomplete_response() {
        let server = MockServer::start_async().await;
        let client = OllamaGenerationClient::new(server.base_url(), "llama3".into())
            .expect("client");

        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200)
                    .json_body(json!({ "response": "partial", "done": false }));
            })
            .await;

        let error = client
            .generate(GenerationRequest::new("s", "p", 10))
            .await
            .expect_err("incomplete");
        assert!(matches!(error, LlmClientError::InvalidResponse(_)));
    }
}
