use thiserror::Error;

/// Message shown to callers when the engine fails for a reason they cannot fix.
pub const INTERNAL_ERROR_MESSAGE: &str = "추천 시스템에 오류가 발생했습니다.";

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("{0}")]
    Validation(String),
    #[error("recommendation engine failure: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl RecommendError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Text safe to return to an end user.
    pub fn user_message(&self) -> &str {
        match self {
            Self::Validation(message) => message,
            Self::Internal(_) => INTERNAL_ERROR_MESSAGE,
        }
    }
}
