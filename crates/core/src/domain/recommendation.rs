use crate::domain::product::{FinancialProduct, ProductCategory, RiskLevel};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubScores {
    pub purpose: f64,
    pub financial: f64,
    pub risk: f64,
    pub demographics: f64,
    pub behavioral: f64,
}

impl SubScores {
    pub fn iter(&self) -> impl Iterator<Item = f64> {
        [
            self.purpose,
            self.financial,
            self.risk,
            self.demographics,
            self.behavioral,
        ]
        .into_iter()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredProduct {
    pub product: FinancialProduct,
    pub scores: SubScores,
    pub total_score: f64,
    pub monthly_contribution: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedReturn {
    pub total_saved: f64,
    pub total_amount: f64,
    pub interest: f64,
}

/// One entry of the `recommendations` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub category: ProductCategory,
    pub risk_level: RiskLevel,
    pub rate: f64,
    pub monthly_amount: f64,
    pub projected_return: ProjectedReturn,
    pub suitability_score: u32,
    pub score_breakdown: SubScores,
    pub ai_analysis: String,
    pub target: String,
    pub period: String,
    pub features: String,
}

impl Recommendation {
    pub fn from_scored(
        scored: ScoredProduct,
        projected_return: ProjectedReturn,
        ai_analysis: String,
    ) -> Self {
        let ScoredProduct {
            product,
            scores,
            total_score,
            monthly_contribution,
        } = scored;

        Self {
            id: product.id,
            name: product.name,
            product_type: product.product_type,
            category: product.category,
            risk_level: product.risk_level,
            rate: product.interest_rate_percent,
            monthly_amount: monthly_contribution.ceil(),
            projected_return,
            suitability_score: total_score.round().clamp(0.0, 100.0) as u32,
            score_breakdown: scores,
            ai_analysis,
            target: product.target,
            period: product.period_description,
            features: product.features,
        }
    }
}

/// The `data` object of a successful `recommend` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub recommendations: Vec<Recommendation>,
    pub ai_summary: String,
    pub bucket_goal: String,
    pub target_amount: f64,
    pub time_frame: u32,
    pub total_products: usize,
}
