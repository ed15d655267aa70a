use crate::domain::product::{FinancialProduct, ProductCategory, RiskLevel};
use anyhow::Context;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

/// Read-only product list shared by every request. Order is significant: it breaks score ties.
#[derive(Debug, Clone)]
pub struct ProductCatalog {
    products: Arc<[FinancialProduct]>,
}

impl ProductCatalog {
    pub fn new(products: Vec<FinancialProduct>) -> anyhow::Result<Self> {
        let mut ids = BTreeSet::new();
        for product in &products {
            product.validate()?;
            anyhow::ensure!(
                ids.insert(product.id.as_str()),
                "duplicate product id: {}",
                product.id
            );
        }

        Ok(Self {
            products: products.into(),
        })
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let products = serde_json::from_str::<Vec<FinancialProduct>>(json)
            .context("catalog JSON must be an array of products")?;
        Self::new(products)
    }

    pub fn from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog file {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("invalid catalog file {}", path.display()))
    }

    /// `PRODUCT_CATALOG_PATH` when configured, the built-in list otherwise.
    pub fn from_settings(settings: &crate::config::Settings) -> anyhow::Result<Self> {
        match settings.product_catalog_path.as_deref() {
            Some(path) => Self::from_path(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn products(&self) -> &[FinancialProduct] {
        &self.products
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    pub fn by_category(&self, category: ProductCategory) -> impl Iterator<Item = &FinancialProduct> {
        self.products.iter().filter(move |p| p.category == category)
    }

    pub fn builtin() -> Self {
        Self {
            products: builtin_products().into(),
        }
    }
}

fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn builtin_products() -> Vec<FinancialProduct> {
    vec![
        FinancialProduct {
            id: "kb-diy-savings".to_string(),
            name: "KB내맘대로적금".to_string(),
            product_type: "자유적립식 적금".to_string(),
            category: ProductCategory::Savings,
            target: "만 14세 이상".to_string(),
            period_description: "6개월 ~ 36개월".to_string(),
            min_contribution: 10_000.0,
            max_contribution: 3_000_000.0,
            interest_rate_percent: 3.55,
            purpose_tags: tags(&["여행", "결혼", "내집마련", "교육", "창업"]),
            features: "DIY형 비대면 전용 상품, 고객 맞춤 설계".to_string(),
            risk_level: RiskLevel::Low,
        },
        FinancialProduct {
            id: "kb-star-deposit".to_string(),
            name: "KB Star 정기예금".to_string(),
            product_type: "정기예금".to_string(),
            category: ProductCategory::Deposit,
            target: "개인 및 개인사업자".to_string(),
            period_description: "1개월 ~ 36개월".to_string(),
            min_contribution: 1_000_000.0,
            max_contribution: 100_000_000.0,
            interest_rate_percent: 3.20,
            purpose_tags: tags(&["안전자산", "단기저축", "비상자금"]),
            features: "안정적인 금리, 원금보장".to_string(),
            risk_level: RiskLevel::VeryLow,
        },
        FinancialProduct {
            id: "housing-savings".to_string(),
            name: "주택청약종합저축".to_string(),
            product_type: "청약저축".to_string(),
            category: ProductCategory::Housing,
            target: "무주택자".to_string(),
            period_description: "장기".to_string(),
            min_contribution: 20_000.0,
            max_contribution: 500_000.0,
            interest_rate_percent: 1.8,
            purpose_tags: tags(&["내집마련", "주택청약"]),
            features: "소득공제 혜택, 청약 우선권".to_string(),
            risk_level: RiskLevel::Low,
        },
        FinancialProduct {
            id: "pension-savings".to_string(),
            name: "개인연금저축".to_string(),
            product_type: "연금저축".to_string(),
            category: ProductCategory::Pension,
            target: "근로소득자".to_string(),
            period_description: "장기 (5년 이상)".to_string(),
            min_contribution: 100_000.0,
            max_contribution: 1_800_000.0,
            interest_rate_percent: 3.0,
            purpose_tags: tags(&["노후준비", "세금절약"]),
            features: "세액공제 혜택, 노후 안정".to_string(),
            risk_level: RiskLevel::Low,
        },
        FinancialProduct {
            id: "investment-trust".to_string(),
            name: "펀드 투자".to_string(),
            product_type: "투자신탁".to_string(),
            category: ProductCategory::Investment,
            target: "투자 경험자".to_string(),
            period_description: "1년 이상".to_string(),
            min_contribution: 100_000.0,
            max_contribution: 50_000_000.0,
            interest_rate_percent: 5.5,
            purpose_tags: tags(&["재산증식", "투자", "창업자금"]),
            features: "높은 수익 가능성, 포트폴리오 다양화".to_string(),
            risk_level: RiskLevel::Medium,
        },
    ]
}
