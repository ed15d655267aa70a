//! Five-dimension suitability scoring. Every sub-score and the weighted total are in 0..=100.

use crate::domain::product::{FinancialProduct, ProductCategory, RiskLevel};
use crate::domain::recommendation::{ScoredProduct, SubScores};
use crate::domain::request::{RecommendationRequest, RiskTolerance};
use crate::engine::purpose::PurposeKeywords;

const EXACT_MATCH_POINTS: f64 = 100.0;
const EXACT_MATCH_WEIGHT: f64 = 1.0;
const PARTIAL_MATCH_POINTS: f64 = 60.0;
const PARTIAL_MATCH_WEIGHT: f64 = 0.6;

const CONTRIBUTION_FIT_MAX: f64 = 40.0;
const SAVINGS_RATE_MAX: f64 = 40.0;
const SAVINGS_RATE_LOW: f64 = 20.0;
/// Points lost per percentage point of income above the comfortable band.
const SAVINGS_RATE_PENALTY_SLOPE: f64 = 2.0;
const COMFORTABLE_RATE_PERCENT: (f64, f64) = (10.0, 30.0);
const PERIOD_FIT_POINTS: f64 = 20.0;

const BASE_DEMOGRAPHICS: f64 = 50.0;
const BASE_BEHAVIORAL: f64 = 50.0;
const FLEXIBLE_BONUS: f64 = 15.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWeights {
    pub purpose: f64,
    pub financial: f64,
    pub risk: f64,
    pub demographics: f64,
    pub behavioral: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        super::DEFAULT_WEIGHTS
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.purpose + self.financial + self.risk + self.demographics + self.behavioral
    }

    pub fn combine(&self, s: &SubScores) -> f64 {
        s.purpose * self.purpose
            + s.financial * self.financial
            + s.risk * self.risk
            + s.demographics * self.demographics
            + s.behavioral * self.behavioral
    }
}

#[derive(Debug, Clone)]
pub struct SuitabilityScorer {
    weights: ScoringWeights,
    default_income: f64,
    default_age: u32,
}

impl Default for SuitabilityScorer {
    fn default() -> Self {
        Self::new(
            ScoringWeights::default(),
            super::DEFAULT_INCOME,
            super::DEFAULT_AGE,
        )
    }
}

impl SuitabilityScorer {
    pub fn new(weights: ScoringWeights, default_income: f64, default_age: u32) -> Self {
        Self {
            weights,
            default_income,
            default_age,
        }
    }

    pub fn from_config(config: &super::EngineConfig) -> Self {
        Self::new(config.weights, config.default_income, config.default_age)
    }

    pub fn score(
        &self,
        product: &FinancialProduct,
        request: &RecommendationRequest,
        keywords: &PurposeKeywords,
    ) -> ScoredProduct {
        let income = request.income.unwrap_or(self.default_income);
        let age = request.age.unwrap_or(self.default_age);
        let monthly_amount = request.monthly_amount();

        let scores = SubScores {
            purpose: purpose_score(product, keywords),
            financial: financial_score(product, monthly_amount, income, request.time_frame_months),
            risk: risk_score(request.risk_tolerance, product.risk_level),
            demographics: demographics_score(product, age),
            behavioral: behavioral_score(product, request.target_amount, income, request.time_frame_months),
        };

        let total_score = (self.weights.combine(&scores) / self.weights.sum()).clamp(0.0, 100.0);

        tracing::debug!(
            product_id = %product.id,
            purpose = scores.purpose,
            financial = scores.financial,
            risk = scores.risk,
            demographics = scores.demographics,
            behavioral = scores.behavioral,
            total = total_score,
            "scored product"
        );

        ScoredProduct {
            product: product.clone(),
            scores,
            total_score,
            monthly_contribution: monthly_amount,
        }
    }
}

/// Weighted average over the product's tags that match at all; zero when none do.
pub fn purpose_score(product: &FinancialProduct, keywords: &PurposeKeywords) -> f64 {
    let mut points = 0.0;
    let mut weight = 0.0;

    for tag in &product.purpose_tags {
        if keywords.contains(tag) {
            points += EXACT_MATCH_POINTS * EXACT_MATCH_WEIGHT;
            weight += EXACT_MATCH_WEIGHT;
        } else if keywords.partially_matches(tag) {
            points += PARTIAL_MATCH_POINTS * PARTIAL_MATCH_WEIGHT;
            weight += PARTIAL_MATCH_WEIGHT;
        }
    }

    if weight > 0.0 {
        points / weight
    } else {
        0.0
    }
}

pub fn financial_score(
    product: &FinancialProduct,
    monthly_amount: f64,
    income: f64,
    time_frame_months: u32,
) -> f64 {
    let total = contribution_fit(product, monthly_amount)
        + savings_rate_fit(monthly_amount, income)
        + period_fit(product, time_frame_months);
    total.clamp(0.0, 100.0)
}

/// Linear falloff from the range midpoint: full points at the midpoint, half at the range
/// edges, nothing once the distance reaches the range width.
pub fn contribution_fit(product: &FinancialProduct, monthly_amount: f64) -> f64 {
    let width = product.contribution_width();
    let distance = (monthly_amount - product.contribution_midpoint()).abs();
    if width <= 0.0 {
        return if distance == 0.0 { CONTRIBUTION_FIT_MAX } else { 0.0 };
    }
    CONTRIBUTION_FIT_MAX * (1.0 - distance / width).max(0.0)
}

pub fn savings_rate_fit(monthly_amount: f64, income: f64) -> f64 {
    let rate_percent = monthly_amount * 100.0 / income;
    let (low, high) = COMFORTABLE_RATE_PERCENT;
    if rate_percent < low {
        SAVINGS_RATE_LOW
    } else if rate_percent <= high {
        SAVINGS_RATE_MAX
    } else {
        (SAVINGS_RATE_MAX - (rate_percent - high) * SAVINGS_RATE_PENALTY_SLOPE).max(0.0)
    }
}

pub fn period_fit(product: &FinancialProduct, time_frame_months: u32) -> f64 {
    match product.eligible_period() {
        Some(range) if range.contains(time_frame_months) => PERIOD_FIT_POINTS,
        _ => 0.0,
    }
}

pub fn risk_score(tolerance: RiskTolerance, level: RiskLevel) -> f64 {
    use RiskLevel::*;
    use RiskTolerance::*;

    match (tolerance, level) {
        (Conservative, VeryLow) => 100.0,
        (Conservative, Low) => 80.0,
        (Conservative, Medium) => 40.0,
        (Conservative, High) => 10.0,
        (Moderate, VeryLow) => 60.0,
        (Moderate, Low) => 90.0,
        (Moderate, Medium) => 100.0,
        (Moderate, High) => 70.0,
        (Aggressive, VeryLow) => 20.0,
        (Aggressive, Low) => 50.0,
        (Aggressive, Medium) => 80.0,
        (Aggressive, High) => 100.0,
    }
}

pub fn demographics_score(product: &FinancialProduct, age: u32) -> f64 {
    let risk = product.risk_level;
    let bonus = match age {
        0..=29 => {
            if product.category == ProductCategory::Savings || risk == RiskLevel::Medium {
                30.0
            } else {
                0.0
            }
        }
        30..=49 => {
            if matches!(risk, RiskLevel::Low | RiskLevel::Medium) {
                25.0
            } else {
                0.0
            }
        }
        _ => {
            if matches!(risk, RiskLevel::VeryLow | RiskLevel::Low) {
                35.0
            } else {
                0.0
            }
        }
    };
    (BASE_DEMOGRAPHICS + bonus).min(100.0)
}

/// Rewards goals that are small relative to income over the horizon.
pub fn behavioral_score(
    product: &FinancialProduct,
    target_amount: f64,
    income: f64,
    time_frame_months: u32,
) -> f64 {
    let horizon_income = income * (f64::from(time_frame_months) / 12.0);
    let target_ratio = target_amount / horizon_income;

    let realism = if target_ratio <= 0.1 {
        30.0
    } else if target_ratio <= 0.2 {
        20.0
    } else if target_ratio <= 0.3 {
        10.0
    } else {
        -10.0
    };

    let flexibility = if product.is_flexible() {
        FLEXIBLE_BONUS
    } else {
        0.0
    };

    (BASE_BEHAVIORAL + realism + flexibility).clamp(0.0, 100.0)
}
