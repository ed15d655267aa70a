use anyhow::ensure;
use serde::{Deserialize, Serialize};

/// What the narrative collaborator hands back, after validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Narrative {
    pub summary: String,
    pub product_analyses: Vec<String>,
}

/// Raw JSON shape requested from the model. Accepts a few spellings of the products key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmNarrative {
    pub summary: String,
    #[serde(default, alias = "productAnalyses", alias = "product_analyses")]
    pub products: Vec<String>,
}

impl LlmNarrative {
    pub fn validate_and_into_narrative(self, expected_products: usize) -> anyhow::Result<Narrative> {
        let summary = self.summary.trim().to_string();
        ensure!(!summary.is_empty(), "summary must be non-empty");

        let mut product_analyses: Vec<String> = self
            .products
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        ensure!(
            product_analyses.len() <= expected_products.max(1) * 2,
            "too many product analyses (got {}, expected {expected_products})",
            product_analyses.len()
        );
        product_analyses.truncate(expected_products);

        Ok(Narrative {
            summary,
            product_analyses,
        })
    }
}

/// Plain-text replies: the first three non-empty lines are the summary, the rest are the
/// per-product lines in shortlist order.
pub fn narrative_from_lines(text: &str, expected_products: usize) -> anyhow::Result<Narrative> {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    ensure!(!lines.is_empty(), "narrative text is empty");

    let split = lines.len().min(3);
    let summary = lines[..split].join(" ");
    let product_analyses = lines[split..]
        .iter()
        .take(expected_products)
        .map(|s| s.to_string())
        .collect();

    Ok(Narrative {
        summary,
        product_analyses,
    })
}
