use crate::catalog::ProductCatalog;
use crate::domain::contract::Narrative;
use crate::domain::recommendation::{Recommendation, RecommendationResponse, ScoredProduct};
use crate::domain::request::{RecommendationRequest, MAX_TIME_FRAME_MONTHS};
use crate::engine::filter::CandidateFilter;
use crate::engine::projection::project_returns;
use crate::engine::purpose::{PurposeExtractor, PurposeKeywords};
use crate::engine::scoring::SuitabilityScorer;
use crate::engine::EngineConfig;
use crate::error::RecommendError;
use crate::llm::prompt::format_won;
use crate::llm::{NarrativeGenerator, NarrativeInput};
use std::sync::Arc;

const FALLBACK_PRODUCT_ANALYSIS: &str = "고객님의 목표에 적합한 추천 상품입니다.";
const MISSING_PRODUCT_ANALYSIS: &str = "개인 맞춤 추천 상품입니다.";

/// Ranked products for one request, before projections and narrative are attached.
#[derive(Debug, Clone)]
pub struct Shortlist {
    pub keywords: PurposeKeywords,
    pub candidate_count: usize,
    /// The contribution filter left nothing, so the whole catalog was scored.
    pub used_catalog_fallback: bool,
    pub products: Vec<ScoredProduct>,
}

/// Runs purpose extraction, filtering, scoring and ranking over a shared catalog, then asks the
/// optional narrative collaborator to explain the result.
///
/// Holds no per-request state; one instance serves concurrent requests.
#[derive(Clone)]
pub struct RecommendationOrchestrator {
    catalog: ProductCatalog,
    config: EngineConfig,
    extractor: PurposeExtractor,
    filter: CandidateFilter,
    scorer: SuitabilityScorer,
    narrator: Option<Arc<dyn NarrativeGenerator>>,
}

impl RecommendationOrchestrator {
    pub fn new(catalog: ProductCatalog, config: EngineConfig) -> Self {
        Self {
            filter: CandidateFilter::new(config.contribution_tolerance),
            scorer: SuitabilityScorer::from_config(&config),
            extractor: PurposeExtractor::default(),
            catalog,
            config,
            narrator: None,
        }
    }

    pub fn with_narrator(mut self, narrator: Option<Arc<dyn NarrativeGenerator>>) -> Self {
        self.narrator = narrator;
        self
    }

    pub fn catalog(&self) -> &ProductCatalog {
        &self.catalog
    }

    pub fn has_narrator(&self) -> bool {
        self.narrator.is_some()
    }

    /// Synchronous part of the pipeline. Never empty when the catalog is not.
    pub fn shortlist(&self, request: &RecommendationRequest) -> Result<Shortlist, RecommendError> {
        validate_request(request)?;

        let keywords = self.extractor.extract(&request.goal_description);
        tracing::info!(
            goal = %request.goal_description,
            purposes = ?keywords.keywords(),
            fallback_purposes = keywords.is_fallback(),
            "extracted purposes"
        );

        let candidates = self.filter.filter(self.catalog.products(), request);
        let candidate_count = candidates.len();
        let used_catalog_fallback = candidates.is_empty();
        let pool: Vec<_> = if used_catalog_fallback {
            tracing::warn!(
                monthly_amount = request.monthly_amount(),
                catalog_size = self.catalog.len(),
                "no product fits the monthly amount; ranking the whole catalog"
            );
            self.catalog.products().iter().collect()
        } else {
            candidates
        };

        let mut scored = Vec::with_capacity(pool.len());
        for product in pool {
            let s = self.scorer.score(product, request, &keywords);
            if !s.total_score.is_finite() || s.scores.iter().any(|v| !v.is_finite()) {
                return Err(anyhow::anyhow!("non-finite score for product {}", product.id).into());
            }
            scored.push(s);
        }

        // Stable: equal scores keep catalog order.
        scored.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));

        let qualified = scored
            .iter()
            .take_while(|s| s.total_score >= self.config.min_qualified_score)
            .count();
        let pool_size = if qualified == 0 { scored.len() } else { qualified };
        let keep = pool_size.min(self.config.max_recommendations);
        scored.truncate(keep);

        tracing::info!(
            candidates = candidate_count,
            qualified,
            shortlist = ?scored.iter().map(|s| s.product.id.as_str()).collect::<Vec<_>>(),
            "ranked products"
        );

        Ok(Shortlist {
            keywords,
            candidate_count,
            used_catalog_fallback,
            products: scored,
        })
    }

    pub async fn recommend(
        &self,
        request: &RecommendationRequest,
    ) -> Result<RecommendationResponse, RecommendError> {
        let shortlist = self.shortlist(request)?;

        let input = NarrativeInput::new(request, &shortlist.keywords, &shortlist.products);
        let narrative = self.narrate(&input).await;
        let mut analyses = narrative.product_analyses.into_iter();

        let recommendations: Vec<Recommendation> = shortlist
            .products
            .into_iter()
            .map(|scored| {
                let projected = project_returns(
                    &scored.product,
                    request.target_amount,
                    request.time_frame_months,
                );
                let analysis = analyses
                    .next()
                    .unwrap_or_else(|| MISSING_PRODUCT_ANALYSIS.to_string());
                Recommendation::from_scored(scored, projected, analysis)
            })
            .collect();

        Ok(RecommendationResponse {
            total_products: recommendations.len(),
            recommendations,
            ai_summary: narrative.summary,
            bucket_goal: request.goal_description.clone(),
            target_amount: request.target_amount,
            time_frame: request.time_frame_months,
        })
    }

    /// Best effort: any collaborator failure or timeout degrades to the fallback text.
    async fn narrate(&self, input: &NarrativeInput) -> Narrative {
        let Some(narrator) = self.narrator.as_ref() else {
            return fallback_narrative(input);
        };
        if input.products.is_empty() {
            return fallback_narrative(input);
        }

        let provider = narrator.provider().as_str();
        match tokio::time::timeout(self.config.narrative_timeout, narrator.generate_narrative(input))
            .await
        {
            Ok(Ok(narrative)) => narrative,
            Ok(Err(err)) => {
                tracing::warn!(provider, error = %format!("{err:#}"), "narrative generation failed");
                fallback_narrative(input)
            }
            Err(_) => {
                tracing::warn!(
                    provider,
                    timeout_ms = self.config.narrative_timeout.as_millis() as u64,
                    "narrative generation timed out"
                );
                fallback_narrative(input)
            }
        }
    }
}

fn validate_request(request: &RecommendationRequest) -> Result<(), RecommendError> {
    // Whitespace-only goals are allowed; they get the fallback purposes.
    if request.goal_description.is_empty() {
        return Err(RecommendError::validation("버킷리스트 목표는 필수입니다."));
    }
    if request.time_frame_months > MAX_TIME_FRAME_MONTHS {
        return Err(RecommendError::validation(format!(
            "달성 기간은 {MAX_TIME_FRAME_MONTHS}개월 이하여야 합니다."
        )));
    }
    if !request.target_amount.is_finite() || request.target_amount <= 0.0 {
        return Err(RecommendError::validation("목표금액은 0보다 커야 합니다."));
    }
    Ok(())
}

pub fn fallback_narrative(input: &NarrativeInput) -> Narrative {
    let summary = format!(
        "{goal} 달성을 위한 맞춤형 금융상품을 추천드립니다. \
{months}개월 동안 매월 약 {monthly}원씩 모아 목표 금액 {target}원을 마련할 수 있도록 \
안정적이면서도 효율적인 상품들을 선별했습니다.",
        goal = input.goal,
        months = input.time_frame_months,
        monthly = format_won(input.monthly_amount()),
        target = format_won(input.target_amount),
    );

    Narrative {
        summary,
        product_analyses: vec![FALLBACK_PRODUCT_ANALYSIS.to_string(); input.products.len()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::request::RiskTolerance;
    use crate::llm::Provider;
    use std::time::Duration;

    struct StubNarrator {
        analyses: usize,
    }

    #[async_trait::async_trait]
    impl NarrativeGenerator for StubNarrator {
        fn provider(&self) -> Provider {
            Provider::Anthropic
        }

        async fn generate_narrative(&self, input: &NarrativeInput) -> anyhow::Result<Narrative> {
            Ok(Narrative {
                summary: format!("{} 요약", input.goal),
                product_analyses: (0..self.analyses).map(|i| format!("분석 {i}")).collect(),
            })
        }
    }

    struct FailingNarrator;

    #[async_trait::async_trait]
    impl NarrativeGenerator for FailingNarrator {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        async fn generate_narrative(&self, _input: &NarrativeInput) -> anyhow::Result<Narrative> {
            anyhow::bail!("upstream unavailable")
        }
    }

    struct SlowNarrator;

    #[async_trait::async_trait]
    impl NarrativeGenerator for SlowNarrator {
        fn provider(&self) -> Provider {
            Provider::Gemini
        }

        async fn generate_narrative(&self, _input: &NarrativeInput) -> anyhow::Result<Narrative> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            anyhow::bail!("should have timed out")
        }
    }

    fn orchestrator() -> RecommendationOrchestrator {
        RecommendationOrchestrator::new(ProductCatalog::builtin(), EngineConfig::default())
    }

    fn travel_request() -> RecommendationRequest {
        let mut req = RecommendationRequest::new("유럽 여행", 6_000_000.0);
        req.time_frame_months = 12;
        req.risk_tolerance = RiskTolerance::Moderate;
        req
    }

    fn position(response: &RecommendationResponse, id: &str) -> Option<usize> {
        response.recommendations.iter().position(|r| r.id == id)
    }

    #[tokio::test]
    async fn travel_goal_prefers_flexible_savings() {
        let response = orchestrator().recommend(&travel_request()).await.unwrap();

        assert_eq!(response.recommendations.len(), 3);
        assert_eq!(response.total_products, 3);
        assert_eq!(response.recommendations[0].id, "kb-diy-savings");
        assert_eq!(response.recommendations[0].monthly_amount, 500_000.0);
        if let Some(pension) = position(&response, "pension-savings") {
            assert!(pension > 0);
        }
        assert!(position(&response, "kb-star-deposit").is_none());

        let scores: Vec<u32> = response
            .recommendations
            .iter()
            .map(|r| r.suitability_score)
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));

        assert_eq!(response.bucket_goal, "유럽 여행");
        assert_eq!(response.time_frame, 12);
        assert!(response.ai_summary.contains("6,000,000원"));
        assert!(response
            .recommendations
            .iter()
            .all(|r| r.ai_analysis == FALLBACK_PRODUCT_ANALYSIS));
    }

    #[test]
    fn shortlist_is_deterministic() {
        let orch = orchestrator();
        let a = orch.shortlist(&travel_request()).unwrap();
        let b = orch.shortlist(&travel_request()).unwrap();
        assert_eq!(a.products, b.products);
        assert_eq!(a.candidate_count, 4);
        assert!(!a.used_catalog_fallback);
    }

    #[test]
    fn oversized_target_ranks_whole_catalog() {
        let req = RecommendationRequest::new("유럽 여행", 12_000_000_000.0);
        let shortlist = orchestrator().shortlist(&req).unwrap();
        assert_eq!(shortlist.candidate_count, 0);
        assert!(shortlist.used_catalog_fallback);
        assert_eq!(shortlist.products.len(), 3);
    }

    #[test]
    fn threshold_never_empties_the_shortlist() {
        let mut config = EngineConfig::default();
        config.min_qualified_score = 100.5;
        let orch = RecommendationOrchestrator::new(ProductCatalog::builtin(), config);
        let shortlist = orch.shortlist(&travel_request()).unwrap();
        assert_eq!(shortlist.products.len(), 3);
    }

    #[test]
    fn honors_configured_result_count() {
        let mut config = EngineConfig::default();
        config.max_recommendations = 1;
        let orch = RecommendationOrchestrator::new(ProductCatalog::builtin(), config);
        let shortlist = orch.shortlist(&travel_request()).unwrap();
        assert_eq!(shortlist.products.len(), 1);
        assert_eq!(shortlist.products[0].product.id, "kb-diy-savings");
    }

    #[test]
    fn cardinality_holds_across_goals_and_amounts() {
        let orch = orchestrator();
        for goal in ["유럽 여행", "결혼 준비", "내 집 마련", "노후", "", "창업"] {
            for amount in [10_000.0, 1_000_000.0, 50_000_000.0, 5_000_000_000.0] {
                for months in [1, 12, 60] {
                    let mut req = RecommendationRequest::new(goal, amount);
                    req.time_frame_months = months;
                    if goal.is_empty() {
                        assert!(orch.shortlist(&req).unwrap_err().is_validation());
                        continue;
                    }
                    let n = orch.shortlist(&req).unwrap().products.len();
                    assert!((1..=3).contains(&n), "goal={goal} amount={amount} months={months}");
                }
            }
        }
    }

    #[tokio::test]
    async fn empty_catalog_yields_empty_list() {
        let orch = RecommendationOrchestrator::new(
            ProductCatalog::new(Vec::new()).unwrap(),
            EngineConfig::default(),
        );
        let response = orch.recommend(&travel_request()).await.unwrap();
        assert!(response.recommendations.is_empty());
        assert_eq!(response.total_products, 0);
        assert!(!response.ai_summary.is_empty());
    }

    #[tokio::test]
    async fn rejects_non_positive_target() {
        let req = RecommendationRequest::new("유럽 여행", 0.0);
        let err = orchestrator().recommend(&req).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn uses_narrator_output_and_fills_missing_lines() {
        let orch = orchestrator().with_narrator(Some(Arc::new(StubNarrator { analyses: 2 })));
        assert!(orch.has_narrator());

        let response = orch.recommend(&travel_request()).await.unwrap();
        assert_eq!(response.ai_summary, "유럽 여행 요약");
        assert_eq!(response.recommendations[0].ai_analysis, "분석 0");
        assert_eq!(response.recommendations[1].ai_analysis, "분석 1");
        assert_eq!(response.recommendations[2].ai_analysis, MISSING_PRODUCT_ANALYSIS);
    }

    #[tokio::test]
    async fn narrator_failure_falls_back() {
        let orch = orchestrator().with_narrator(Some(Arc::new(FailingNarrator)));
        let response = orch.recommend(&travel_request()).await.unwrap();
        assert!(response.ai_summary.starts_with("유럽 여행 달성을 위한"));
        assert_eq!(response.recommendations.len(), 3);
    }

    #[tokio::test]
    async fn narrator_timeout_falls_back() {
        let mut config = EngineConfig::default();
        config.narrative_timeout = Duration::from_millis(50);
        let orch = RecommendationOrchestrator::new(ProductCatalog::builtin(), config)
            .with_narrator(Some(Arc::new(SlowNarrator)));

        let response = orch.recommend(&travel_request()).await.unwrap();
        assert!(response.ai_summary.starts_with("유럽 여행 달성을 위한"));
        assert!(response
            .recommendations
            .iter()
            .all(|r| r.ai_analysis == FALLBACK_PRODUCT_ANALYSIS));
    }

    #[tokio::test]
    async fn whitespace_goal_uses_fallback_purposes() {
        let req = RecommendationRequest::new("   ", 6_000_000.0);
        let orch = orchestrator();

        let shortlist = orch.shortlist(&req).unwrap();
        assert!(shortlist.keywords.is_fallback());
        assert_eq!(shortlist.keywords.keywords(), &["단기저축", "안전자산"]);

        let response = orch.recommend(&req).await.unwrap();
        assert_eq!(response.recommendations.len(), 3);
    }

    #[test]
    fn rejects_horizon_beyond_cap() {
        let mut req = travel_request();
        req.time_frame_months = MAX_TIME_FRAME_MONTHS + 1;
        assert!(orchestrator().shortlist(&req).unwrap_err().is_validation());

        req.time_frame_months = MAX_TIME_FRAME_MONTHS;
        assert!(orchestrator().shortlist(&req).is_ok());
    }

    #[test]
    fn equal_scores_keep_catalog_order() {
        let template = ProductCatalog::builtin().products()[0].clone();
        let twin = |id: &str| {
            let mut p = template.clone();
            p.id = id.to_string();
            p
        };

        for ids in [["first", "second"], ["second", "first"]] {
            let catalog = ProductCatalog::new(ids.iter().map(|&id| twin(id)).collect()).unwrap();
            let orch = RecommendationOrchestrator::new(catalog, EngineConfig::default());
            let shortlist = orch.shortlist(&travel_request()).unwrap();

            assert_eq!(shortlist.products.len(), 2);
            assert_eq!(
                shortlist.products[0].total_score,
                shortlist.products[1].total_score
            );
            let order: Vec<&str> = shortlist
                .products
                .iter()
                .map(|s| s.product.id.as_str())
                .collect();
            assert_eq!(order, ids);
        }
    }

    #[test]
    fn fallback_summary_mentions_plan() {
        let shortlist = orchestrator().shortlist(&travel_request()).unwrap();
        let input = NarrativeInput::new(&travel_request(), &shortlist.keywords, &shortlist.products);
        let narrative = fallback_narrative(&input);
        assert!(narrative.summary.contains("12개월"));
        assert!(narrative.summary.contains("500,000원"));
        assert_eq!(narrative.product_analyses.len(), 3);
    }
}
