//! Post-resolution insight text via an external completion service.
//!
//! Strictly best-effort: any failure (disabled, network, bad status, bad
//! body) degrades to a canned message. Nothing here is allowed to block or
//! affect finalization -- callers invoke this after the record is durable.

use serde::Deserialize;
use serde_json::json;

use crate::policy::Verdict;
use crate::store::InsightConfig;

/// Shown whenever the completion service cannot be reached.
pub const FALLBACK_INSIGHT: &str =
    "Decision made. Committing beats deliberating -- check back later to rate how it went.";

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    text: String,
}

/// Thin client for the text-completion endpoint.
pub struct InsightClient {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl InsightClient {
    /// Build from config; `None` when the feature is disabled or the
    /// endpoint is unset. The API key comes from VERDICT_INSIGHT_KEY.
    pub fn from_config(config: &InsightConfig) -> Option<Self> {
        if !config.enabled || config.endpoint.is_empty() {
            return None;
        }
        Some(Self {
            endpoint: config.endpoint.clone(),
            api_key: std::env::var("VERDICT_INSIGHT_KEY").ok(),
            client: reqwest::Client::new(),
        })
    }

    #[cfg(test)]
    fn for_endpoint(endpoint: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    /// Ask the service for a short reflection on the decision.
    /// Always returns text; never an error.
    pub async fn generate(
        &self,
        question: &str,
        pros: &[String],
        cons: &[String],
        result: Verdict,
        mood_score: Option<i32>,
    ) -> String {
        let body = json!({
            "question": question,
            "pros": pros,
            "cons": cons,
            "result": result,
            "mood_score": mood_score,
        });

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(_) => return FALLBACK_INSIGHT.to_string(),
        };
        if !response.status().is_success() {
            return FALLBACK_INSIGHT.to_string();
        }
        match response.json::<CompletionResponse>().await {
            Ok(completion) if !completion.text.trim().is_empty() => completion.text,
            _ => FALLBACK_INSIGHT.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_config_yields_no_client() {
        let config = InsightConfig::default();
        assert!(InsightClient::from_config(&config).is_none());
    }

    #[tokio::test]
    async fn successful_completion_is_returned() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/complete")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text": "Bold move. Revisit it in a day."}"#)
            .create_async()
            .await;

        let client = InsightClient::for_endpoint(&format!("{}/complete", server.url()));
        let text = client
            .generate("Take the job?", &["more pay".into()], &[], Verdict::Yes, None)
            .await;
        assert_eq!(text, "Bold move. Revisit it in a day.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn server_error_degrades_to_fallback() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/complete")
            .with_status(500)
            .create_async()
            .await;

        let client = InsightClient::for_endpoint(&format!("{}/complete", server.url()));
        let text = client
            .generate("Take the job?", &[], &["commute".into()], Verdict::No, Some(3))
            .await;
        assert_eq!(text, FALLBACK_INSIGHT);
    }

    #[tokio::test]
    async fn malformed_body_degrades_to_fallback() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/complete")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = InsightClient::for_endpoint(&format!("{}/complete", server.url()));
        let text = client
            .generate("Take the job?", &[], &[], Verdict::No, None)
            .await;
        assert_eq!(text, FALLBACK_INSIGHT);
    }
}
