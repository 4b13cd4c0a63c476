/// Backend ports and their Supabase implementation.
///
/// The service only talks to the traits in this module; `SupabaseBackend` is the
/// production implementation and `testing` holds in-memory fakes.
///
/// Row wire format (`faqs_adv` by default):
///
/// ```text
/// { id, data: { question, assignee, content: { summary, steps: [{ id?, text, query,
///   screenshot: url | null }], notes }, versions: [...] }, keywords: [...], updated_at }
/// ```
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use faq_common::supabase::SupabaseClient;

use crate::error::AppError;
use crate::model::{DocVersion, FaqContent, FaqId, FaqRecord, Screenshot, Step, StepId};

/// A validated row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FaqRow {
    pub id: FaqId,
    pub record: FaqRecord,
    pub updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait FaqStore: Send + Sync {
    /// Every valid row. Invalid rows are skipped with a warning.
    async fn fetch_all(&self) -> Result<Vec<FaqRow>, AppError>;
    async fn insert(&self, record: &FaqRecord) -> Result<FaqRow, AppError>;
    /// Overwrites `data` and `keywords` and stamps `updated_at`. Unknown ids are
    /// `AppError::NotFound`.
    async fn update(&self, id: FaqId, record: &FaqRecord) -> Result<FaqRow, AppError>;
    async fn delete(&self, id: FaqId) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Screenshots,
    Documents,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bucket::Screenshots => f.write_str("screenshots"),
            Bucket::Documents => f.write_str("documents"),
        }
    }
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload with overwrite; returns the public URL of the object.
    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError>;
}

#[async_trait]
pub trait ScreenshotFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError>;
}

// --- wire types ---

/// `id` is the only key a row must carry; everything else defaults when missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RowData {
    id: FaqId,
    #[serde(default)]
    data: RecordData,
    /// Nullable column.
    #[serde(default)]
    keywords: Option<Vec<String>>,
    #[serde(default)]
    updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct RecordData {
    question: String,
    assignee: String,
    content: ContentData,
    versions: Vec<DocVersion>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct ContentData {
    summary: String,
    steps: Vec<StepData>,
    notes: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct StepData {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<StepId>,
    text: String,
    query: String,
    screenshot: Option<String>,
}

#[derive(Debug, Serialize)]
struct WriteBody<'a> {
    data: RecordData,
    keywords: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_at: Option<DateTime<Utc>>,
}

impl RecordData {
    /// Pending screenshots cannot be stored in a row; callers upload them first.
    fn from_record(record: &FaqRecord) -> Result<Self, AppError> {
        let steps = record
            .content
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                let screenshot = match &step.screenshot {
                    Screenshot::Absent => None,
                    Screenshot::Stored { url } => Some(url.clone()),
                    Screenshot::Pending { .. } => {
                        return Err(AppError::Validation(format!(
                            "step {} has a screenshot that was not uploaded",
                            i + 1
                        )))
                    }
                };
                Ok(StepData {
                    id: Some(step.id),
                    text: step.text.clone(),
                    query: step.query.clone(),
                    screenshot,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        Ok(Self {
            question: record.question.clone(),
            assignee: record.assignee.clone(),
            content: ContentData {
                summary: record.content.summary.clone(),
                steps,
                notes: record.content.notes.clone(),
            },
            versions: record.versions.clone(),
        })
    }

    fn into_record(self, keywords: Vec<String>) -> FaqRecord {
        let steps = self
            .content
            .steps
            .into_iter()
            .map(|s| Step {
                id: s.id.unwrap_or_default(),
                text: s.text,
                query: s.query,
                screenshot: match s.screenshot {
                    Some(url) if !url.trim().is_empty() => Screenshot::Stored { url },
                    _ => Screenshot::Absent,
                },
            })
            .collect();

        FaqRecord {
            question: self.question,
            assignee: self.assignee,
            content: FaqContent {
                summary: self.content.summary,
                steps,
                notes: self.content.notes,
            },
            keywords,
            versions: self.versions,
        }
    }
}

/// Validate one raw row. `None` means the row is skipped.
fn validate_row(raw: serde_json::Value) -> Option<FaqRow> {
    let row: RowData = serde_json::from_value(raw)
        .inspect_err(|e| warn!(error = %e, "skipping row that does not match the FAQ shape"))
        .ok()?;

    if row.data.question.trim().is_empty() {
        warn!(faq_id = row.id, "skipping row with blank question");
        return None;
    }

    let updated_at = row.updated_at.as_deref().and_then(parse_timestamp);
    Some(FaqRow {
        id: row.id,
        record: row.data.into_record(row.keywords.unwrap_or_default()),
        updated_at,
    })
}

/// PostgREST returns `timestamptz` as RFC 3339 and `timestamp` without an offset.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .inspect_err(|e| debug!(error = %e, raw, "unparsable updated_at"))
        .ok()
}

pub struct SupabaseBackend {
    client: SupabaseClient,
    table: String,
    screenshot_bucket: String,
    document_bucket: String,
}

impl SupabaseBackend {
    pub fn new(
        client: SupabaseClient,
        table: impl Into<String>,
        screenshot_bucket: impl Into<String>,
        document_bucket: impl Into<String>,
    ) -> Self {
        Self {
            client,
            table: table.into(),
            screenshot_bucket: screenshot_bucket.into(),
            document_bucket: document_bucket.into(),
        }
    }

    fn bucket_name(&self, bucket: Bucket) -> &str {
        match bucket {
            Bucket::Screenshots => &self.screenshot_bucket,
            Bucket::Documents => &self.document_bucket,
        }
    }

    fn returned_row(raw: serde_json::Value) -> Result<FaqRow, AppError> {
        validate_row(raw)
            .ok_or_else(|| AppError::Validation("backend returned a row that failed validation".into()))
    }
}

#[async_trait]
impl FaqStore for SupabaseBackend {
    async fn fetch_all(&self) -> Result<Vec<FaqRow>, AppError> {
        let raw = self.client.select_all(&self.table).await?;
        let total = raw.len();
        let rows: Vec<FaqRow> = raw.into_iter().filter_map(validate_row).collect();
        if rows.len() < total {
            warn!(total, valid = rows.len(), "some rows were skipped");
        }
        Ok(rows)
    }

    async fn insert(&self, record: &FaqRecord) -> Result<FaqRow, AppError> {
        let body = WriteBody {
            data: RecordData::from_record(record)?,
            keywords: &record.keywords,
            updated_at: None,
        };
        let raw: serde_json::Value = self.client.insert(&self.table, &body).await?;
        Self::returned_row(raw)
    }

    async fn update(&self, id: FaqId, record: &FaqRecord) -> Result<FaqRow, AppError> {
        let body = WriteBody {
            data: RecordData::from_record(record)?,
            keywords: &record.keywords,
            updated_at: Some(Utc::now()),
        };
        let raw: Option<serde_json::Value> =
            self.client.update_by_id(&self.table, id, &body).await?;
        Self::returned_row(raw.ok_or(AppError::NotFound(id))?)
    }

    async fn delete(&self, id: FaqId) -> Result<(), AppError> {
        self.client.delete_by_id(&self.table, id).await?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStorage for SupabaseBackend {
    async fn upload(
        &self,
        bucket: Bucket,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        let url = self
            .client
            .upload_object(self.bucket_name(bucket), path, bytes, content_type)
            .await?;
        Ok(url)
    }
}

#[async_trait]
impl ScreenshotFetcher for SupabaseBackend {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, AppError> {
        Ok(self.client.fetch_bytes(url).await?)
    }
}
