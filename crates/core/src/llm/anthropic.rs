use crate::config::Settings;
use crate::domain::contract::LlmNarrative;
use crate::llm::error::LlmDiagnosticsError;
use crate::llm::{json, prompt};
use crate::llm::{Narrative, NarrativeGenerator, NarrativeInput, Provider};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const DEFAULT_TIMEOUT_SECS: u64 = 15;

const TOOL_NAME_EMIT_NARRATIVE: &str = "emit_narrative";

#[derive(Debug, Clone)]
pub struct AnthropicOptions {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl AnthropicOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicClient {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let mut opts = AnthropicOptions::new(settings.require_anthropic_api_key()?);
        if let Ok(base_url) = std::env::var("ANTHROPIC_BASE_URL") {
            opts.base_url = base_url;
        }
        if let Ok(model) = std::env::var("ANTHROPIC_MODEL") {
            opts.model = model;
        }
        if let Some(max_tokens) = std::env::var("ANTHROPIC_MAX_TOKENS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
        {
            opts.max_tokens = max_tokens;
        }
        if let Some(secs) = std::env::var("ANTHROPIC_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            opts.timeout = Duration::from_secs(secs);
        }
        Self::new(opts)
    }

    pub fn new(opts: AnthropicOptions) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(opts.timeout)
            .build()
            .context("failed to build reqwest client")?;

        Ok(Self {
            http,
            api_key: opts.api_key,
            base_url: opts.base_url,
            model: opts.model,
            max_tokens: opts.max_tokens,
        })
    }

    async fn create_message(&self, req: &CreateMessageRequest) -> anyhow::Result<CreateMessageResponse> {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_str(&self.api_key)?);
        headers.insert(
            "anthropic-version",
            HeaderValue::from_static(ANTHROPIC_VERSION),
        );

        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));
        let res = self
            .http
            .post(url)
            .headers(headers)
            .json(req)
            .send()
            .await
            .context("Anthropic request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read Anthropic response body")?;
        if !status.is_success() {
            return Err(LlmDiagnosticsError::new(Provider::Anthropic, "http", "non-success status")
                .with_status(status.as_u16())
                .with_raw_output(text)
                .into());
        }

        serde_json::from_str::<CreateMessageResponse>(&text).map_err(|e| {
            LlmDiagnosticsError::new(Provider::Anthropic, "decode", e.to_string())
                .with_raw_output(text)
                .into()
        })
    }

    fn tools(products: usize) -> Vec<Tool> {
        let schema = serde_json::json!({
            "type": "object",
            "additionalProperties": false,
            "required": ["summary", "products"],
            "properties": {
                "summary": {"type": "string"},
                "products": {
                    "type": "array",
                    "minItems": products,
                    "maxItems": products,
                    "items": {"type": "string"}
                }
            }
        });

        vec![Tool {
            name: TOOL_NAME_EMIT_NARRATIVE,
            description: "Emit the recommendation summary and one explanation per product",
            input_schema: schema,
        }]
    }

    fn tool_choice() -> ToolChoice {
        ToolChoice::Tool {
            name: TOOL_NAME_EMIT_NARRATIVE,
        }
    }

    fn response_text(res: &CreateMessageResponse) -> String {
        let mut out = String::new();
        for block in &res.content {
            if let ContentBlock::Text { text } = block {
                if !out.is_empty() {
                    out.push('\n');
                }
                out.push_str(text);
            }
        }
        out
    }

    fn response_tool_narrative(res: &CreateMessageResponse) -> anyhow::Result<Option<LlmNarrative>> {
        for block in &res.content {
            if let ContentBlock::ToolUse { name, input, .. } = block {
                if name == TOOL_NAME_EMIT_NARRATIVE {
                    let parsed = serde_json::from_value::<LlmNarrative>(input.clone())
                        .context("failed to decode tool_use.input into LlmNarrative")?;
                    return Ok(Some(parsed));
                }
            }
        }
        Ok(None)
    }
}

#[async_trait::async_trait]
impl NarrativeGenerator for AnthropicClient {
    fn provider(&self) -> Provider {
        Provider::Anthropic
    }

    async fn generate_narrative(&self, input: &NarrativeInput) -> anyhow::Result<Narrative> {
        let expected = input.products.len();
        let req = CreateMessageRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system: Some(prompt::system_prompt()),
            messages: vec![Message {
                role: "user",
                content: prompt::user_prompt(input),
            }],
            tools: Some(Self::tools(expected)),
            tool_choice: Some(Self::tool_choice()),
        };

        let res = self.create_message(&req).await?;

        if matches!(res.stop_reason.as_deref(), Some("max_tokens")) {
            tracing::warn!(max_tokens = self.max_tokens, "Anthropic narrative hit max_tokens");
        }

        if let Some(tool_narrative) = Self::response_tool_narrative(&res)? {
            return tool_narrative.validate_and_into_narrative(expected);
        }

        // Models occasionally answer in text despite tool_choice.
        let text = Self::response_text(&res);
        json::parse_narrative(&text, expected).map_err(|e| {
            LlmDiagnosticsError::new(Provider::Anthropic, "parse", format!("{e:#}"))
                .with_raw_output(text)
                .into()
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct CreateMessageRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,

    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CreateMessageResponse {
    content: Vec<ContentBlock>,

    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct Tool {
    name: &'static str,
    description: &'static str,
    input_schema: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
enum ToolChoice {
    #[serde(rename = "tool")]
    Tool { name: &'static str },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_use")]
    ToolUse {
        #[serde(default)]
        #[allow(dead_code)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        input: serde_json::Value,
    },

    #[serde(other)]
    Unknown,
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
            goal: "유럽 여행".to_string(),
            target_amount: 6_000_000.0,
            time_frame_months: 12,
            risk_tolerance: RiskTolerance::Moderate,
            age: Some(28),
            income: None,
            purposes: vec!["여행".to_string()],
            products: vec![
                NarrativeProduct {
                    name: "KB내맘대로적금".to_string(),
                    product_type: "자유적립식 적금".to_string(),
                    rate: 3.55,
                    risk_level: "low",
                    monthly_amount: 500_000.0,
                    suitability_score: 84,
                },
                NarrativeProduct {
                    name: "펀드 투자".to_string(),
                    product_type: "투자신탁".to_string(),
                    rate: 5.5,
                    risk_level: "medium",
                    monthly_amount: 500_000.0,
                    suitability_score: 57,
                },
            ],
        }
    }

    fn client(base_url: String) -> AnthropicClient {
        let mut opts = AnthropicOptions::new("test-key");
        opts.base_url = base_url;
        opts.timeout = Duration::from_secs(2);
        AnthropicClient::new(opts).unwrap()
    }

    #[test]
    fn parses_tool_use_narrative_input() {
        let res = CreateMessageResponse {
            content: vec![ContentBlock::ToolUse {
                id: "toolu_1".to_string(),
                name: TOOL_NAME_EMIT_NARRATIVE.to_string(),
                input: json!({"summary": "요약", "products": ["a", "b"]}),
            }],
            stop_reason: None,
        };

        let parsed = AnthropicClient::response_tool_narrative(&res).unwrap().unwrap();
        let narrative = parsed.validate_and_into_narrative(2).unwrap();
        assert_eq!(narrative.summary, "요약");
        assert_eq!(narrative.product_analyses.len(), 2);
    }

    #[test]
    fn unknown_blocks_are_ignored() {
        let res: CreateMessageResponse = serde_json::from_value(json!({
            "content": [
                {"type": "thinking", "thinking": "..."},
                {"type": "text", "text": "hello"}
            ],
            "stop_reason": "end_turn"
        }))
        .unwrap();
        assert_eq!(AnthropicClient::response_text(&res), "hello");
        assert!(AnthropicClient::response_tool_narrative(&res).unwrap().is_none());
    }

    #[tokio::test]
    async fn generates_narrative_from_tool_output() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/messages")
                    .header("x-api-key", "test-key")
                    .header("anthropic-version", ANTHROPIC_VERSION);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "content": [{
                            "type": "tool_use",
                            "id": "toolu_1",
                            "name": TOOL_NAME_EMIT_NARRATIVE,
                            "input": {
                                "summary": "여행 자금에 맞춘 추천입니다.",
                                "products": ["자유 적립이 가능합니다.", "수익을 기대할 수 있습니다."]
                            }
                        }],
                        "stop_reason": "tool_use"
                    }));
            })
            .await;

        let narrative = client(server.base_url())
            .generate_narrative(&input())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(narrative.summary, "여행 자금에 맞춘 추천입니다.");
        assert_eq!(narrative.product_analyses[1], "수익을 기대할 수 있습니다.");
    }

    #[tokio::test]
    async fn http_errors_carry_diagnostics() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/messages");
                then.status(529).body("{\"type\":\"error\"}");
            })
            .await;

        let err = client(server.base_url())
            .generate_narrative(&input())
            .await
            .unwrap_err();
        let diag = err.downcast_ref::<LlmDiagnosticsError>().unwrap();
        assert_eq!(diag.stage, "http");
        assert_eq!(diag.http_status, Some(529));
        assert_eq!(diag.raw_output.as_deref(), Some("{\"type\":\"error\"}"));
    }
}
