use crate::error::RecommendError;
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIME_FRAME_MONTHS: u32 = 12;

/// Longest accepted horizon (50 years).
pub const MAX_TIME_FRAME_MONTHS: u32 = 600;

const TIME_FRAME_TOO_LONG_MESSAGE: &str = "달성 기간은 600개월 이하여야 합니다.";

const MISSING_REQUIRED_MESSAGE: &str = "버킷리스트 목표와 목표금액은 필수입니다.";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTolerance {
    Conservative,
    #[default]
    Moderate,
    Aggressive,
}

impl RiskTolerance {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conservative => "conservative",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "conservative" => Some(Self::Conservative),
            "moderate" => Some(Self::Moderate),
            "aggressive" => Some(Self::Aggressive),
            _ => None,
        }
    }
}

/// A validated request. Optional personalization inputs stay `None` here; the scorer applies
/// its configured defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationRequest {
    pub goal_description: String,
    pub target_amount: f64,
    pub time_frame_months: u32,
    pub risk_tolerance: RiskTolerance,
    pub age: Option<u32>,
    pub income: Option<f64>,
}

impl RecommendationRequest {
    pub fn new(goal_description: impl Into<String>, target_amount: f64) -> Self {
        Self {
            goal_description: goal_description.into(),
            target_amount,
            time_frame_months: DEFAULT_TIME_FRAME_MONTHS,
            risk_tolerance: RiskTolerance::default(),
            age: None,
            income: None,
        }
    }

    /// Monthly savings rate implied by the target and horizon.
    pub fn monthly_amount(&self) -> f64 {
        self.target_amount / f64::from(self.time_frame_months.max(1))
    }
}

/// Wire shape of the `recommend` body. Every field is optional so that missing values turn
/// into validation messages instead of deserializer errors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequestBody {
    pub bucket_goal: Option<String>,
    pub target_amount: Option<f64>,
    pub time_frame: Option<i64>,
    pub risk_tolerance: Option<String>,
    pub age: Option<i64>,
    pub income: Option<f64>,
}

impl RecommendRequestBody {
    pub fn into_request(self) -> Result<RecommendationRequest, RecommendError> {
        let goal = self.bucket_goal.filter(|g| !g.is_empty());
        let (Some(goal_description), Some(target_amount)) = (goal, self.target_amount) else {
            return Err(RecommendError::validation(MISSING_REQUIRED_MESSAGE));
        };

        if !target_amount.is_finite() || target_amount <= 0.0 {
            return Err(RecommendError::validation(
                "목표금액은 0보다 커야 합니다.",
            ));
        }

        let time_frame_months = match self.time_frame {
            None | Some(0) => DEFAULT_TIME_FRAME_MONTHS,
            Some(n) if n < 0 => {
                return Err(RecommendError::validation(
                    "달성 기간은 1개월 이상이어야 합니다.",
                ))
            }
            Some(n) => match u32::try_from(n) {
                Ok(months) if months <= MAX_TIME_FRAME_MONTHS => months,
                _ => return Err(RecommendError::validation(TIME_FRAME_TOO_LONG_MESSAGE)),
            },
        };

        let risk_tolerance = match self.risk_tolerance.as_deref() {
            None => RiskTolerance::default(),
            Some(s) => RiskTolerance::parse(s).ok_or_else(|| {
                RecommendError::validation(format!(
                    "알 수 없는 위험 성향입니다: {s} (conservative, moderate, aggressive 중 하나)"
                ))
            })?,
        };

        let age = match self.age {
            None | Some(0) => None,
            Some(n) => Some(u32::try_from(n).map_err(|_| {
                RecommendError::validation("나이가 올바르지 않습니다.")
            })?),
        };

        let income = match self.income {
            None => None,
            Some(v) if !v.is_finite() || v < 0.0 => {
                return Err(RecommendError::validation(
                    "소득은 0 이상이어야 합니다.",
                ))
            }
            Some(v) if v == 0.0 => None,
            Some(v) => Some(v),
        };

        Ok(RecommendationRequest {
            goal_description,
            target_amount,
            time_frame_months,
            risk_tolerance,
            age,
            income,
        })
    }
}
