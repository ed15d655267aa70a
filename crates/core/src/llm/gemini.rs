use crate::config::Settings;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{json, prompt};
use crate::llm::{Narrative, NarrativeGenerator, NarrativeInput, Provider};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let api_key = settings.require_gemini_api_key()?.to_string();
        let base_url =
            std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        let timeout_secs = std::env::var("GEMINI_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(api_key, base_url, model, Duration::from_secs(timeout_secs))
    }

    pub fn new(
        api_key: String,
        base_url: String,
        model: String,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build Gemini http client")?;

        Ok(Self {
            http,
            api_key,
            base_url,
            model,
        })
    }

    async fn generate_content(&self, req: &GenerateContentRequest) -> anyhow::Result<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        );

        let res = self
            .http
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(req)
            .send()
            .await
            .context("Gemini request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Gemini response body")?;
        if !status.is_success() {
            return Err(LlmDiagnosticsError::new(Provider::Gemini, "http", "non-success status")
                .with_status(status.as_u16())
                .with_raw_output(text)
                .into());
        }

        let parsed = match serde_json::from_str::<GenerateContentResponse>(&text) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Err(LlmDiagnosticsError::new(Provider::Gemini, "decode", e.to_string())
                    .with_raw_output(text)
                    .into())
            }
        };

        let out = parsed
            .candidates
            .into_iter()
            .next()
            .map(|c| {
                c.content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        if out.trim().is_empty() {
            return Err(LlmDiagnosticsError::new(Provider::Gemini, "empty", "no candidate text")
                .with_raw_output(text)
                .into());
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl NarrativeGenerator for GeminiClient {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    async fn generate_narrative(&self, input: &NarrativeInput) -> anyhow::Result<Narrative> {
        let req = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: Some(prompt::system_prompt()),
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: Some(prompt::user_prompt(input)),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let text = self.generate_content(&req).await?;
        json::parse_narrative(&text, input.products.len()).map_err(|e| {
            LlmDiagnosticsError::new(Provider::Gemini, "parse", format!("{e:#}"))
                .with_raw_output(text)
                .into()
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    system_instruction: Content,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none", skip_deserializing)]
    role: Option<&'static str>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Clone, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct Candidate {
    content: Content,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::RiskTolerance;
    use crate::llm::NarrativeProduct;
    use httpmock::prelude::*;
    use serde_json::json;

    fn input() -> NarrativeInput {
        NarrativeInput {
            goal: "결혼 자금".to_string(),
            target_amount: 24_000_000.0,
            time_frame_months: 24,
            risk_tolerance: RiskTolerance::Conservative,
            age: None,
            income: Some(4_000_000.0),
            purposes: vec!["결혼".to_string()],
            products: vec![NarrativeProduct {
                name: "KB내맘대로적금".to_string(),
                product_type: "자유적립식 적금".to_string(),
                rate: 3.55,
                risk_level: "low",
                monthly_amount: 1_000_000.0,
                suitability_score: 80,
            }],
        }
    }

    fn client(base_url: String) -> GeminiClient {
        GeminiClient::new(
            "g-key".to_string(),
            base_url,
            DEFAULT_MODEL.to_string(),
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn parses_json_candidate_text() {
        let server = MockServer::start_async().await;
        let body = json!({"summary": "결혼 자금 마련을 위한 추천입니다.", "products": ["안정적입니다."]})
            .to_string();
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-1.5-flash:generateContent")
                    .query_param("key", "g-key");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "candidates": [{
                            "content": {"role": "model", "parts": [{"text": body}]}
                        }]
                    }));
            })
            .await;

        let narrative = client(server.base_url())
            .generate_narrative(&input())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(narrative.summary, "결혼 자금 마련을 위한 추천입니다.");
        assert_eq!(narrative.product_analyses, vec!["안정적입니다.".to_string()]);
    }

    #[tokio::test]
    async fn empty_candidates_are_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"candidates": []}));
            })
            .await;

        let err = client(server.base_url())
            .generate_narrative(&input())
            .await
            .unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "empty");
    }

    #[tokio::test]
    async fn slow_responses_time_out() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200)
                    .delay(Duration::from_millis(500))
                    .json_body(json!({"candidates": []}));
            })
            .await;

        let slow = GeminiClient::new(
            "g-key".to_string(),
            server.base_url(),
            DEFAULT_MODEL.to_string(),
            Duration::from_millis(50),
        )
        .unwrap();
        assert!(slow.generate_narrative(&input()).await.is_err());
    }
}
