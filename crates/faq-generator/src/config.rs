use std::time::Duration;

use crate::error::AppError;

/// Application configuration loaded explicitly from environment variables.
///
/// Backend credentials have no defaults. Redis is optional; without it every action
/// goes straight to the backend.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Supabase project, e.g. "https://abc.supabase.co".
    pub supabase_url: String,
    /// Service or anon key sent as `apikey` and bearer token.
    pub supabase_key: String,
    pub supabase_timeout: Duration,
    /// Table holding one row per FAQ.
    pub faq_table: String,
    pub screenshot_bucket: String,
    pub document_bucket: String,
    /// Redis connection URL. `None` disables caching.
    pub redis_url: Option<String>,
    /// Model ID passed to the chat-completions endpoint for step validation.
    pub llm_model: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `SUPABASE_URL`
    /// - `SUPABASE_KEY`
    ///
    /// Optional:
    /// - `FAQ_TABLE` (default: "faqs_adv")
    /// - `SCREENSHOT_BUCKET` (default: "screenshots")
    /// - `DOCUMENT_BUCKET` (default: "faq-documents")
    /// - `SUPABASE_TIMEOUT_SECS` (default: 30)
    /// - `REDIS_URL`
    /// - `LLM_MODEL` (default: "gemini-2.5-flash")
    pub fn from_env() -> Result<Self, AppError> {
        let supabase_url = required("SUPABASE_URL")?;
        if !supabase_url.starts_with("http://") && !supabase_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "SUPABASE_URL must be an http(s) URL, got {supabase_url}"
            )));
        }
        let supabase_key = required("SUPABASE_KEY")?;

        let supabase_timeout = std::env::var("SUPABASE_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(30));

        Ok(Self {
            supabase_url,
            supabase_key,
            supabase_timeout,
            faq_table: optional("FAQ_TABLE", "faqs_adv"),
            screenshot_bucket: optional("SCREENSHOT_BUCKET", "screenshots"),
            document_bucket: optional("DOCUMENT_BUCKET", "faq-documents"),
            redis_url: std::env::var("REDIS_URL").ok().filter(|u| !u.trim().is_empty()),
            llm_model: optional("LLM_MODEL", "gemini-2.5-flash"),
        })
    }
}

fn required(name: &str) -> Result<String, AppError> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::Config(format!("{name} environment variable is required")))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}
