use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Primary key of a row in the FAQ table.
pub type FaqId = i64;

/// Stable identity of a step, independent of its position in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct StepId(Uuid);

impl StepId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Screenshot attached to a step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Screenshot {
    #[default]
    Absent,
    /// Uploaded by the user, not yet written to object storage. Base64 in JSON.
    Pending {
        #[serde(with = "base64_bytes")]
        #[schemars(with = "String")]
        data: Vec<u8>,
    },
    /// Stored in object storage; the URL is publicly fetchable.
    Stored { url: String },
}

impl Screenshot {
    pub fn is_absent(&self) -> bool {
        matches!(self, Screenshot::Absent)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Step {
    #[serde(default)]
    pub id: StepId,
    #[serde(default)]
    pub text: String,
    /// Optional query template; empty means none.
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub screenshot: Screenshot,
}

impl Step {
    pub fn new(text: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: StepId::new(),
            text: text.into(),
            query: query.into(),
            screenshot: Screenshot::Absent,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct FaqContent {
    pub summary: String,
    /// Order is significant: index + 1 is the step number in documents and storage paths.
    pub steps: Vec<Step>,
    pub notes: String,
}

/// One persisted generation of the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DocVersion {
    pub version: u32,
    pub url: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FaqRecord {
    pub question: String,
    pub assignee: String,
    #[serde(default)]
    pub content: FaqContent,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Append-only generation history.
    #[serde(default)]
    pub versions: Vec<DocVersion>,
}

impl FaqRecord {
    pub fn new(question: impl Into<String>, assignee: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            assignee: assignee.into(),
            ..Self::default()
        }
    }

    pub fn next_version(&self) -> u32 {
        self.versions.iter().map(|v| v.version).max().unwrap_or(0) + 1
    }
}

/// A step as recovered from a document. Only text survives the round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ParsedStep {
    pub text: String,
    pub query: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ParsedContent {
    pub summary: String,
    pub steps: Vec<ParsedStep>,
    pub notes: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ParsedDocument {
    /// Present when the document carries a `[Question]` section.
    pub question: Option<String>,
    pub content: ParsedContent,
}

/// The caller-owned state of one editing session on one FAQ.
///
/// Every action takes the session explicitly and hands it back; nothing about an
/// in-progress edit lives anywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EditingSession {
    pub faq_id: FaqId,
    pub record: FaqRecord,
}

impl EditingSession {
    pub fn new(faq_id: FaqId, record: FaqRecord) -> Self {
        Self { faq_id, record }
    }

    pub fn steps(&self) -> &[Step] {
        &self.record.content.steps
    }

    pub fn position(&self, id: StepId) -> Option<usize> {
        self.steps().iter().position(|s| s.id == id)
    }

    pub fn add_step(&mut self) -> StepId {
        let step = Step::default();
        let id = step.id;
        self.record.content.steps.push(step);
        id
    }

    pub fn step_mut(&mut self, id: StepId) -> Result<&mut Step, AppError> {
        self.record
            .content
            .steps
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(AppError::StepNotFound(id))
    }

    pub fn remove_step(&mut self, id: StepId) -> Result<Step, AppError> {
        let idx = self.position(id).ok_or(AppError::StepNotFound(id))?;
        Ok(self.record.content.steps.remove(idx))
    }

    /// Move a step to `new_index`, clamped to the end of the list.
    pub fn move_step(&mut self, id: StepId, new_index: usize) -> Result<(), AppError> {
        let idx = self.position(id).ok_or(AppError::StepNotFound(id))?;
        let step = self.record.content.steps.remove(idx);
        let target = new_index.min(self.record.content.steps.len());
        self.record.content.steps.insert(target, step);
        Ok(())
    }

    pub fn attach_screenshot(&mut self, id: StepId, data: Vec<u8>) -> Result<(), AppError> {
        self.step_mut(id)?.screenshot = Screenshot::Pending { data };
        Ok(())
    }

    pub fn clear_screenshot(&mut self, id: StepId) -> Result<(), AppError> {
        self.step_mut(id)?.screenshot = Screenshot::Absent;
        Ok(())
    }

    /// Comma-separated keywords, as typed into a single text field.
    pub fn set_keywords_from_input(&mut self, input: &str) {
        self.record.keywords = input
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect();
    }

    /// Replace the content with what was parsed from a document.
    ///
    /// Screenshots are not recoverable from documents, so step `i` keeps the id and
    /// screenshot of the current step `i`. The question stays as it is: it identifies
    /// the row being edited.
    pub fn apply_parsed(&mut self, parsed: ParsedContent) {
        let mut previous = std::mem::take(&mut self.record.content.steps).into_iter();
        let steps = parsed
            .steps
            .into_iter()
            .map(|p| match previous.next() {
                Some(old) => Step {
                    id: old.id,
                    text: p.text,
                    query: p.query,
                    screenshot: old.screenshot,
                },
                None => Step::new(p.text, p.query),
            })
            .collect();

        self.record.content = FaqContent {
            summary: parsed.summary,
            steps,
            notes: parsed.notes,
        };
    }

    /// `Step <n>: <text>` lines, the form the validator receives.
    pub fn steps_text(&self) -> String {
        self.steps()
            .iter()
            .enumerate()
            .map(|(i, s)| format!("Step {}: {}", i + 1, s.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(d)?;
        STANDARD.decode(raw.trim()).map_err(serde::de::Error::custom)
    }
}
