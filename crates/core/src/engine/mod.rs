//! Recommendation engine: purpose extraction, candidate filtering, suitability scoring and
//! return projection, composed by [`RecommendationOrchestrator`].

pub mod filter;
pub mod orchestrator;
pub mod projection;
pub mod purpose;
pub mod scoring;

pub use filter::CandidateFilter;
pub use orchestrator::RecommendationOrchestrator;
pub use projection::project_returns;
pub use purpose::{PurposeExtractor, PurposeKeywords};
pub use scoring::{ScoringWeights, SuitabilityScorer};

use std::time::Duration;

/// Dimension weights; they sum to 1 so the composite stays within 0..=100.
pub const DEFAULT_WEIGHTS: ScoringWeights = ScoringWeights {
    purpose: 0.25,
    financial: 0.25,
    risk: 0.20,
    demographics: 0.15,
    behavioral: 0.15,
};

/// Minimum composite score for the qualified set.
pub const MIN_QUALIFIED_SCORE: f64 = 30.0;

/// Relative slack around a product's contribution range when filtering candidates.
pub const CONTRIBUTION_TOLERANCE: f64 = 0.20;

pub const MAX_RECOMMENDATIONS: usize = 3;

/// Monthly income assumed when the request omits it.
pub const DEFAULT_INCOME: f64 = 3_000_000.0;

pub const DEFAULT_AGE: u32 = 30;

pub const DEFAULT_NARRATIVE_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub weights: ScoringWeights,
    pub min_qualified_score: f64,
    pub contribution_tolerance: f64,
    pub max_recommendations: usize,
    pub default_income: f64,
    pub default_age: u32,
    pub narrative_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: DEFAULT_WEIGHTS,
            min_qualified_score: MIN_QUALIFIED_SCORE,
            contribution_tolerance: CONTRIBUTION_TOLERANCE,
            max_recommendations: MAX_RECOMMENDATIONS,
            default_income: DEFAULT_INCOME,
            default_age: DEFAULT_AGE,
            narrative_timeout: Duration::from_secs(DEFAULT_NARRATIVE_TIMEOUT_SECS),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Some(v) = env_parse::<f64>("RECO_MIN_SCORE") {
            if (0.0..=100.0).contains(&v) {
                out.min_qualified_score = v;
            }
        }

        if let Some(v) = env_parse::<f64>("RECO_CONTRIBUTION_TOLERANCE") {
            if (0.0..1.0).contains(&v) {
                out.contribution_tolerance = v;
            }
        }

        if let Some(n) = env_parse::<usize>("RECO_MAX_RESULTS") {
            out.max_recommendations = n.clamp(1, MAX_RECOMMENDATIONS);
        }

        if let Some(v) = env_parse::<f64>("RECO_DEFAULT_INCOME") {
            if v.is_finite() && v > 0.0 {
                out.default_income = v;
            }
        }

        if let Some(n) = env_parse::<u32>("RECO_DEFAULT_AGE") {
            out.default_age = n;
        }

        if let Some(secs) = env_parse::<u64>("NARRATIVE_TIMEOUT_SECS") {
            out.narrative_timeout = Duration::from_secs(secs);
        }

        out
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        assert!((DEFAULT_WEIGHTS.sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.min_qualified_score, 30.0);
        assert_eq!(cfg.contribution_tolerance, 0.20);
        assert_eq!(cfg.max_recommendations, 3);
        assert_eq!(cfg.default_income, 3_000_000.0);
        assert_eq!(cfg.default_age, 30);
    }
}
