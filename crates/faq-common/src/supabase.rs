/// Client for a Supabase-style backend: a PostgREST table API plus object storage.
///
/// Endpoints:
/// - table rows: `{base}/rest/v1/{table}` with `id=eq.{id}` filters
/// - objects: `{base}/storage/v1/object/{bucket}/{path}` (uploads use `x-upsert: true`)
/// - public object URLs: `{base}/storage/v1/object/public/{bucket}/{path}`
///
/// Every call is made once. Non-2xx responses become `BackendError::Upstream`.
use std::fmt::Display;
use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Debug)]
pub struct SupabaseConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
    pub max_error_body_bytes: usize,
}

impl SupabaseConfig {
    pub fn new(base_url: &str, api_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout: Duration::from_secs(30),
            max_error_body_bytes: 8 * 1024,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.base_url)
    }

    pub fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{bucket}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn public_object_url(&self, bucket: &str, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{bucket}/{}",
            self.base_url,
            path.trim_start_matches('/')
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid response JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("backend returned error: status={status} message={message}")]
    Upstream { status: StatusCode, message: String },

    #[error("backend returned no rows")]
    EmptyResponse,
}

#[derive(Clone)]
pub struct SupabaseClient {
    config: SupabaseConfig,
    http: reqwest::Client,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .user_agent("faq-generator")
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.config.api_key)
            .bearer_auth(&self.config.api_key)
    }

    /// Fetch every row as raw JSON. Callers validate rows individually so one bad row
    /// does not hide the rest.
    pub async fn select_all(&self, table: &str) -> Result<Vec<serde_json::Value>, BackendError> {
        let url = self.config.table_url(table);
        let resp = self
            .authed(self.http.get(&url))
            .query(&[("select", "*")])
            .send()
            .await?;
        let rows: Vec<serde_json::Value> = self.json_response(resp).await?;
        debug!(table, rows = rows.len(), "selected rows");
        Ok(rows)
    }

    pub async fn insert<B, T>(&self, table: &str, body: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.config.table_url(table);
        let resp = self
            .authed(self.http.post(&url))
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let mut rows: Vec<T> = self.json_response(resp).await?;
        if rows.is_empty() {
            return Err(BackendError::EmptyResponse);
        }
        Ok(rows.swap_remove(0))
    }

    /// PATCH the row with the given id. Returns the updated row, or `None` if no row matched.
    pub async fn update_by_id<B, T>(
        &self,
        table: &str,
        id: impl Display,
        body: &B,
    ) -> Result<Option<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.config.table_url(table);
        let resp = self
            .authed(self.http.patch(&url))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(body)
            .send()
            .await?;
        let mut rows: Vec<T> = self.json_response(resp).await?;
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    pub async fn delete_by_id(&self, table: &str, id: impl Display) -> Result<(), BackendError> {
        let url = self.config.table_url(table);
        let resp = self
            .authed(self.http.delete(&url))
            .query(&[("id", format!("eq.{id}"))])
            .send()
            .await?;
        self.ensure_success(resp).await
    }

    /// Upload (overwriting any existing object) and return the public URL.
    pub async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, BackendError> {
        let url = self.config.object_url(bucket, path);
        let resp = self
            .authed(self.http.post(&url))
            .header("x-upsert", "true")
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        self.ensure_success(resp).await?;
        Ok(self.config.public_object_url(bucket, path))
    }

    /// Plain GET of a (public) URL, used for previously stored screenshots.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, BackendError> {
        let resp = self.http.get(url).send().await?;
        if !resp.status().is_success() {
            return Err(self.to_upstream_error(resp).await);
        }
        Ok(resp.bytes().await?.to_vec())
    }

    async fn json_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, BackendError> {
        if !resp.status().is_success() {
            return Err(self.to_upstream_error(resp).await);
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn ensure_success(&self, resp: reqwest::Response) -> Result<(), BackendError> {
        if resp.status().is_success() {
            return Ok(());
        }
        Err(self.to_upstream_error(resp).await)
    }

    async fn to_upstream_error(&self, resp: reqwest::Response) -> BackendError {
        let status = resp.status();
        let body = match resp.bytes().await {
            Ok(mut b) => {
                if b.len() > self.config.max_error_body_bytes {
                    b.truncate(self.config.max_error_body_bytes);
                }
                String::from_utf8_lossy(&b).to_string()
            }
            Err(e) => format!("<failed to read error body: {e}>"),
        };
        BackendError::Upstream {
            status,
            message: error_message(&body),
        }
    }
}

/// PostgREST reports `message`, storage reports `message` or `error`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(m), ..
        }) => m,
        Ok(ErrorBody { error: Some(e), .. }) => e,
        _ if body.trim().is_empty() => "<empty body>".to_string(),
        _ => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_are_built_from_trimmed_base() {
        let config = SupabaseConfig::new("https://abc.supabase.co/", "key");
        assert_eq!(config.table_url("faqs_adv"), "https://abc.supabase.co/rest/v1/faqs_adv");
        assert_eq!(
            config.object_url("screenshots", "7/step_1.png"),
            "https://abc.supabase.co/storage/v1/object/screenshots/7/step_1.png"
        );
        assert_eq!(
            config.public_object_url("faq-documents", "/faq-7-v2.docx"),
            "https://abc.supabase.co/storage/v1/object/public/faq-documents/faq-7-v2.docx"
        );
    }

    #[test]
    fn error_message_prefers_message_field() {
        assert_eq!(
            error_message(r#"{"code":"42P01","message":"relation does not exist"}"#),
            "relation does not exist"
        );
        assert_eq!(
            error_message(r#"{"statusCode":"404","error":"Bucket not found"}"#),
            "Bucket not found"
        );
        assert_eq!(error_message("gateway timeout"), "gateway timeout");
        assert_eq!(error_message("  "), "<empty body>");
    }

    #[test]
    fn timeout_override_applies() {
        let config = SupabaseConfig::new("http://localhost:54321", "k")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(SupabaseClient::new(config).is_ok());
    }
}
