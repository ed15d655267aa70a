pub mod catalog;
pub mod domain;
pub mod engine;
pub mod error;
pub mod llm;

pub mod config {
    use anyhow::Context;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub anthropic_api_key: Option<String>,
        pub gemini_api_key: Option<String>,
        pub llm_provider: Option<String>,
        pub sentry_dsn: Option<String>,
        pub product_catalog_path: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                anthropic_api_key: non_empty_env("ANTHROPIC_API_KEY"),
                gemini_api_key: non_empty_env("GEMINI_API_KEY"),
                llm_provider: non_empty_env("LLM_PROVIDER"),
                sentry_dsn: non_empty_env("SENTRY_DSN"),
                product_catalog_path: non_empty_env("PRODUCT_CATALOG_PATH"),
            })
        }

        pub fn require_anthropic_api_key(&self) -> anyhow::Result<&str> {
            self.anthropic_api_key
                .as_deref()
                .context("ANTHROPIC_API_KEY is required")
        }

        pub fn require_gemini_api_key(&self) -> anyhow::Result<&str> {
            self.gemini_api_key
                .as_deref()
                .context("GEMINI_API_KEY is required")
        }
    }

    // An exported-but-empty variable counts as unset.
    fn non_empty_env(key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|v| !v.trim().is_empty())
    }
}
