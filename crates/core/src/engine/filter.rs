use crate::domain::product::FinancialProduct;
use crate::domain::request::RecommendationRequest;

/// Keeps products whose contribution range, widened by `tolerance` on both sides, contains the
/// request's implied monthly amount.
#[derive(Debug, Clone, Copy)]
pub struct CandidateFilter {
    tolerance: f64,
}

impl Default for CandidateFilter {
    fn default() -> Self {
        Self::new(super::CONTRIBUTION_TOLERANCE)
    }
}

impl CandidateFilter {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn accepts(&self, product: &FinancialProduct, monthly_amount: f64) -> bool {
        let low = product.min_contribution * (1.0 - self.tolerance);
        let high = product.max_contribution * (1.0 + self.tolerance);
        monthly_amount >= low && monthly_amount <= high
    }

    /// Candidates in catalog order. An empty result is valid.
    pub fn filter<'a>(
        &self,
        catalog: &'a [FinancialProduct],
        request: &RecommendationRequest,
    ) -> Vec<&'a FinancialProduct> {
        let monthly_amount = request.monthly_amount();
        catalog
            .iter()
            .filter(|p| {
                let keep = self.accepts(p, monthly_amount);
                tracing::trace!(
                    product_id = %p.id,
                    monthly_amount,
                    min = p.min_contribution,
                    max = p.max_contribution,
                    keep,
                    "contribution range check"
                );
                keep
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductCatalog;

    fn ids(products: &[&FinancialProduct]) -> Vec<String> {
        products.iter().map(|p| p.id.clone()).collect()
    }

    #[test]
    fn travel_budget_excludes_high_minimum_deposit() {
        let catalog = ProductCatalog::builtin();
        let req = RecommendationRequest::new("유럽 여행", 6_000_000.0);
        let out = CandidateFilter::default().filter(catalog.products(), &req);
        assert_eq!(
            ids(&out),
            vec![
                "kb-diy-savings",
                "housing-savings",
                "pension-savings",
                "investment-trust"
            ]
        );
    }

    #[test]
    fn tolerance_band_admits_near_misses() {
        let catalog = ProductCatalog::builtin();
        let deposit = &catalog.products()[1];
        let filter = CandidateFilter::default();
        // Minimum is 1,000,000; 80% of it is the lower edge.
        assert!(filter.accepts(deposit, 800_000.0));
        assert!(!filter.accepts(deposit, 799_999.0));

        let housing = &catalog.products()[2];
        assert!(filter.accepts(housing, 600_000.0));
        assert!(!filter.accepts(housing, 600_001.0));
    }

    #[test]
    fn oversized_target_leaves_no_candidates() {
        let catalog = ProductCatalog::builtin();
        let req = RecommendationRequest::new("세계 일주", 10_000_000_000.0);
        assert!(CandidateFilter::default()
            .filter(catalog.products(), &req)
            .is_empty());
    }

    #[test]
    fn zero_tolerance_uses_exact_bounds() {
        let catalog = ProductCatalog::builtin();
        let housing = &catalog.products()[2];
        let filter = CandidateFilter::new(0.0);
        assert!(filter.accepts(housing, 500_000.0));
        assert!(!filter.accepts(housing, 500_001.0));
    }
}
