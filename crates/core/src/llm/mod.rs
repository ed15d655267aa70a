pub mod anthropic;
pub mod error;
pub mod gemini;
pub mod json;
pub mod prompt;

pub use crate::domain::contract::Narrative;

use crate::config::Settings;
use crate::domain::recommendation::ScoredProduct;
use crate::domain::request::{RecommendationRequest, RiskTolerance};
use crate::engine::purpose::PurposeKeywords;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    Gemini,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeProduct {
    pub name: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub rate: f64,
    pub risk_level: &'static str,
    pub monthly_amount: f64,
    pub suitability_score: u32,
}

/// User profile plus the shortlist, in final ranking order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeInput {
    pub goal: String,
    pub target_amount: f64,
    pub time_frame_months: u32,
    pub risk_tolerance: RiskTolerance,
    pub age: Option<u32>,
    pub income: Option<f64>,
    pub purposes: Vec<String>,
    pub products: Vec<NarrativeProduct>,
}

impl NarrativeInput {
    pub fn new(
        request: &RecommendationRequest,
        keywords: &PurposeKeywords,
        shortlist: &[ScoredProduct],
    ) -> Self {
        let products = shortlist
            .iter()
            .map(|s| NarrativeProduct {
                name: s.product.name.clone(),
                product_type: s.product.product_type.clone(),
                rate: s.product.interest_rate_percent,
                risk_level: s.product.risk_level.as_str(),
                monthly_amount: s.monthly_contribution.ceil(),
                suitability_score: s.total_score.round().clamp(0.0, 100.0) as u32,
            })
            .collect();

        Self {
            goal: request.goal_description.clone(),
            target_amount: request.target_amount,
            time_frame_months: request.time_frame_months,
            risk_tolerance: request.risk_tolerance,
            age: request.age,
            income: request.income,
            purposes: keywords.keywords().iter().map(|k| k.to_string()).collect(),
            products,
        }
    }

    pub fn monthly_amount(&self) -> f64 {
        (self.target_amount / f64::from(self.time_frame_months.max(1))).ceil()
    }
}

#[async_trait::async_trait]
pub trait NarrativeGenerator: Send + Sync {
    fn provider(&self) -> Provider;

    async fn generate_narrative(&self, input: &NarrativeInput) -> anyhow::Result<Narrative>;
}

/// Picks the configured collaborator. `None` means every request uses the fallback text.
pub fn from_settings(settings: &Settings) -> anyhow::Result<Option<Arc<dyn NarrativeGenerator>>> {
    let requested = settings
        .llm_provider
        .as_deref()
        .map(|s| s.trim().to_ascii_lowercase());

    let provider = match requested.as_deref() {
        Some("none") | Some("off") => return Ok(None),
        Some("anthropic") => Provider::Anthropic,
        Some("gemini") => Provider::Gemini,
        Some(other) => anyhow::bail!("unknown LLM_PROVIDER: {other}"),
        None if settings.anthropic_api_key.is_some() => Provider::Anthropic,
        None if settings.gemini_api_key.is_some() => Provider::Gemini,
        None => return Ok(None),
    };

    let client: Arc<dyn NarrativeGenerator> = match provider {
        Provider::Anthropic => Arc::new(anthropic::AnthropicClient::from_settings(settings)?),
        Provider::Gemini => Arc::new(gemini::GeminiClient::from_settings(settings)?),
    };
    Ok(Some(client))
}
