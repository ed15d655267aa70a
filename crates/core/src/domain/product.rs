use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductCategory {
    Savings,
    Deposit,
    Housing,
    Pension,
    Investment,
}

impl ProductCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Savings => "savings",
            Self::Deposit => "deposit",
            Self::Housing => "housing",
            Self::Pension => "pension",
            Self::Investment => "investment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "savings" => Some(Self::Savings),
            "deposit" => Some(Self::Deposit),
            "housing" => Some(Self::Housing),
            "pension" => Some(Self::Pension),
            "investment" => Some(Self::Investment),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryLow => "very_low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// A catalog entry. Contribution bounds are per month, in KRW.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialProduct {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub category: ProductCategory,
    #[serde(default)]
    pub target: String,
    #[serde(rename = "period")]
    pub period_description: String,
    pub min_contribution: f64,
    pub max_contribution: f64,
    #[serde(rename = "rate")]
    pub interest_rate_percent: f64,
    pub purpose_tags: Vec<String>,
    #[serde(default)]
    pub features: String,
    pub risk_level: RiskLevel,
}

const FLEXIBLE_MARKER: &str = "자유";

impl FinancialProduct {
    /// Free-contribution products (자유적립식 and friends).
    pub fn is_flexible(&self) -> bool {
        self.product_type.contains(FLEXIBLE_MARKER) || self.features.contains(FLEXIBLE_MARKER)
    }

    pub fn contribution_midpoint(&self) -> f64 {
        (self.min_contribution + self.max_contribution) / 2.0
    }

    pub fn contribution_width(&self) -> f64 {
        self.max_contribution - self.min_contribution
    }

    pub fn eligible_period(&self) -> Option<PeriodRange> {
        PeriodRange::parse(&self.period_description)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.id.trim().is_empty(), "product id must be non-empty");
        anyhow::ensure!(
            !self.name.trim().is_empty(),
            "product name must be non-empty (id={})",
            self.id
        );
        anyhow::ensure!(
            self.min_contribution.is_finite()
                && self.max_contribution.is_finite()
                && self.min_contribution >= 0.0
                && self.min_contribution <= self.max_contribution,
            "invalid contribution range {}..{} (id={})",
            self.min_contribution,
            self.max_contribution,
            self.id
        );
        anyhow::ensure!(
            self.interest_rate_percent.is_finite() && self.interest_rate_percent >= 0.0,
            "invalid rate {} (id={})",
            self.interest_rate_percent,
            self.id
        );
        // A blank tag would partially match every keyword.
        anyhow::ensure!(
            self.purpose_tags.iter().all(|t| !t.trim().is_empty()),
            "purpose tags must not be blank (id={})",
            self.id
        );
        Ok(())
    }
}

/// Holding period in months. `max == None` means open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodRange {
    pub min_months: u32,
    pub max_months: Option<u32>,
}

impl PeriodRange {
    /// Loose reading of texts like `6개월 ~ 36개월`, `1년 이상`, `장기 (5년 이상)`.
    pub fn parse(text: &str) -> Option<Self> {
        let values = numbers_in_months(text);
        match values.as_slice() {
            [] => None,
            [n] => {
                if text.contains("이상") || text.contains('+') {
                    Some(Self {
                        min_months: *n,
                        max_months: None,
                    })
                } else if text.contains("이내") || text.contains("이하") {
                    Some(Self {
                        min_months: 0,
                        max_months: Some(*n),
                    })
                } else {
                    Some(Self {
                        min_months: *n,
                        max_months: Some(*n),
                    })
                }
            }
            [a, b, ..] => Some(Self {
                min_months: (*a).min(*b),
                max_months: Some((*a).max(*b)),
            }),
        }
    }

    pub fn contains(&self, months: u32) -> bool {
        months >= self.min_months && self.max_months.map_or(true, |max| months <= max)
    }
}

fn numbers_in_months(text: &str) -> Vec<u32> {
    let mut out = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(|c: char| c.is_ascii_digit()) {
        let tail = &rest[start..];
        let end = tail
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(tail.len());
        let digits = &tail[..end];
        let after = tail[end..].trim_start();

        if let Ok(n) = digits.parse::<u32>() {
            let lower = after.to_ascii_lowercase();
            let months = if after.starts_with('년') || lower.starts_with("year") {
                n.saturating_mul(12)
            } else {
                n
            };
            out.push(months);
        }

        rest = &tail[end..];
    }
    out
}
