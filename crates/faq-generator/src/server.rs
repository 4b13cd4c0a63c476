/// MCP server for the FAQ document generator.
///
/// Exposes the editing workflow as tools. Sessions travel as JSON in both
/// directions; binary payloads (documents, archives, reports) are base64.
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::AppError;
use crate::model::{EditingSession, FaqId, ParsedDocument};
use crate::service::FaqService;
use crate::store::FaqRow;

// --- tool parameters ---

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ListFaqsParams {
    /// Only FAQs assigned to this person.
    pub assignee: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct AddFaqParams {
    /// The troubleshooting question, e.g. "Why does the nightly export fail?".
    pub question: String,
    pub assignee: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FaqIdParams {
    pub faq_id: FaqId,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct SessionParams {
    /// Editing session as returned by `open_faq` or a previous tool call.
    pub session: EditingSession,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GenerateDocumentParams {
    pub session: EditingSession,
    /// Upload the document as a new version and record it on the FAQ (default: false).
    pub persist: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ParseDocumentParams {
    /// A `.docx` file, base64 encoded.
    pub document_base64: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ImportDocumentParams {
    pub session: EditingSession,
    /// A `.docx` file, base64 encoded.
    pub document_base64: String,
}

// --- tool responses ---

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FaqSummary {
    pub faq_id: FaqId,
    pub question: String,
    pub assignee: String,
    pub keywords: Vec<String>,
    pub step_count: usize,
    pub latest_version: Option<u32>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<FaqRow> for FaqSummary {
    fn from(row: FaqRow) -> Self {
        Self {
            faq_id: row.id,
            latest_version: row.record.versions.iter().map(|v| v.version).max(),
            step_count: row.record.content.steps.len(),
            question: row.record.question,
            assignee: row.record.assignee,
            keywords: row.record.keywords,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListFaqsResponse {
    pub faqs: Vec<FaqSummary>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AssigneesResponse {
    pub assignees: Vec<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FaqResponse {
    pub faq: FaqSummary,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DeleteFaqResponse {
    pub deleted: FaqId,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SessionResponse {
    pub session: EditingSession,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct GenerateDocumentResponse {
    /// Session with any newly recorded version.
    pub session: EditingSession,
    pub file_name: String,
    pub document_base64: String,
    pub url: Option<String>,
    pub version: Option<u32>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ParseDocumentResponse {
    pub document: ParsedDocument,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ImportDocumentResponse {
    pub session: EditingSession,
    /// The `[Question]` found in the document, if any. The session keeps its own.
    pub document_question: Option<String>,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ExportScreenshotsResponse {
    /// Absent when no step has a screenshot.
    pub file_name: Option<String>,
    pub archive_base64: Option<String>,
    pub entries: usize,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ValidateStepsResponse {
    pub feedback: String,
    pub file_name: String,
    pub report_base64: String,
}

// --- MCP Server ---

#[derive(Clone)]
pub struct FaqGeneratorServer {
    service: Arc<FaqService>,
    tool_router: ToolRouter<FaqGeneratorServer>,
}

impl FaqGeneratorServer {
    pub fn new(service: Arc<FaqService>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }
}

fn require_question(session: &EditingSession) -> Result<(), String> {
    if session.record.question.trim().is_empty() {
        return Err("session question must not be empty".to_string());
    }
    Ok(())
}

fn decode_document(action: &str, raw: &str) -> Result<Vec<u8>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err("document_base64 must not be empty".to_string());
    }
    STANDARD
        .decode(raw)
        .map_err(AppError::from)
        .map_err(|e| format!("{action} failed: {e}"))
}

#[tool_router]
impl FaqGeneratorServer {
    #[tool(description = "List FAQs sorted by question, optionally only those assigned to one person.")]
    async fn list_faqs(
        &self,
        Parameters(params): Parameters<ListFaqsParams>,
    ) -> Result<Json<ListFaqsResponse>, String> {
        let rows = match params.assignee.as_deref().map(str::trim) {
            Some(assignee) if !assignee.is_empty() => self.service.faqs_for(assignee).await,
            _ => self.service.list_faqs().await,
        }
        .map_err(|e| format!("list_faqs failed: {e}"))?;

        Ok(Json(ListFaqsResponse {
            faqs: rows.into_iter().map(FaqSummary::from).collect(),
        }))
    }

    #[tool(description = "List everyone who has at least one FAQ assigned.")]
    async fn list_assignees(&self) -> Result<Json<AssigneesResponse>, String> {
        let assignees = self
            .service
            .assignees()
            .await
            .map_err(|e| format!("list_assignees failed: {e}"))?;
        Ok(Json(AssigneesResponse { assignees }))
    }

    #[tool(description = "Create a new FAQ with a question and an assignee. Both are required.")]
    async fn add_faq(
        &self,
        Parameters(params): Parameters<AddFaqParams>,
    ) -> Result<Json<FaqResponse>, String> {
        if params.question.trim().is_empty() || params.assignee.trim().is_empty() {
            return Err("question and assignee must not be empty".to_string());
        }
        let row = self
            .service
            .add_faq(&params.question, &params.assignee)
            .await
            .map_err(|e| format!("add_faq failed: {e}"))?;
        Ok(Json(FaqResponse { faq: row.into() }))
    }

    #[tool(description = "Delete an FAQ by id.")]
    async fn delete_faq(
        &self,
        Parameters(params): Parameters<FaqIdParams>,
    ) -> Result<Json<DeleteFaqResponse>, String> {
        self.service
            .delete_faq(params.faq_id)
            .await
            .map_err(|e| format!("delete_faq failed: {e}"))?;
        Ok(Json(DeleteFaqResponse {
            deleted: params.faq_id,
        }))
    }

    #[tool(description = "Open an FAQ for editing. Returns an editing session to pass to the other tools.")]
    async fn open_faq(
        &self,
        Parameters(params): Parameters<FaqIdParams>,
    ) -> Result<Json<SessionResponse>, String> {
        let session = self
            .service
            .open(params.faq_id)
            .await
            .map_err(|e| format!("open_faq failed: {e}"))?;
        Ok(Json(SessionResponse { session }))
    }

    #[tool(description = "Save an editing session: uploads pending screenshots, then writes content and keywords. Last write wins.")]
    async fn save_faq(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<Json<SessionResponse>, String> {
        let mut session = params.session;
        require_question(&session)?;
        self.service
            .save(&mut session)
            .await
            .map_err(|e| format!("save_faq failed: {e}"))?;
        Ok(Json(SessionResponse { session }))
    }

    #[tool(description = "Generate the FAQ .docx from a session. With persist=true the document is stored as the next version of the FAQ.")]
    async fn generate_document(
        &self,
        Parameters(params): Parameters<GenerateDocumentParams>,
    ) -> Result<Json<GenerateDocumentResponse>, String> {
        let mut session = params.session;
        require_question(&session)?;
        let persist = params.persist.unwrap_or(false);
        let doc = self
            .service
            .generate(&mut session, persist)
            .await
            .map_err(|e| format!("generate_document failed: {e}"))?;

        info!(faq_id = session.faq_id, persist, bytes = doc.bytes.len(), "document generated");
        Ok(Json(GenerateDocumentResponse {
            session,
            file_name: doc.file_name,
            document_base64: STANDARD.encode(&doc.bytes),
            url: doc.url,
            version: doc.version,
        }))
    }

    #[tool(description = "Parse a generated (or hand-edited) FAQ .docx back into summary, steps and notes.")]
    async fn parse_document(
        &self,
        Parameters(params): Parameters<ParseDocumentParams>,
    ) -> Result<Json<ParseDocumentResponse>, String> {
        let bytes = decode_document("parse_document", &params.document_base64)?;
        Ok(Json(ParseDocumentResponse {
            document: self.service.parse(&bytes),
        }))
    }

    #[tool(description = "Replace a session's summary, steps and notes with the content of a .docx. Screenshots stay attached by step position.")]
    async fn import_document(
        &self,
        Parameters(params): Parameters<ImportDocumentParams>,
    ) -> Result<Json<ImportDocumentResponse>, String> {
        let bytes = decode_document("import_document", &params.document_base64)?;
        let mut session = params.session;
        let parsed = self.service.import(&mut session, &bytes);
        Ok(Json(ImportDocumentResponse {
            session,
            document_question: parsed.question,
        }))
    }

    #[tool(description = "Zip every step screenshot of a session as Step<n>_screenshot.png.")]
    async fn export_screenshots(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<Json<ExportScreenshotsResponse>, String> {
        let archive = self
            .service
            .export_screenshots(&params.session)
            .await
            .map_err(|e| format!("export_screenshots failed: {e}"))?;

        Ok(Json(match archive {
            Some(archive) => ExportScreenshotsResponse {
                file_name: Some(archive.file_name),
                archive_base64: Some(STANDARD.encode(&archive.bytes)),
                entries: archive.entries,
            },
            None => ExportScreenshotsResponse {
                file_name: None,
                archive_base64: None,
                entries: 0,
            },
        }))
    }

    #[tool(description = "Ask the LLM to review a session's steps against its question. Returns the feedback verbatim.")]
    async fn validate_steps(
        &self,
        Parameters(params): Parameters<SessionParams>,
    ) -> Result<Json<ValidateStepsResponse>, String> {
        require_question(&params.session)?;
        let report = self
            .service
            .validate(&params.session)
            .await
            .map_err(|e| format!("validate_steps failed: {e}"))?;
        Ok(Json(ValidateStepsResponse {
            report_base64: STANDARD.encode(&report.bytes),
            feedback: report.feedback,
            file_name: report.file_name,
        }))
    }
}

#[tool_handler]
impl ServerHandler for FaqGeneratorServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "faq-generator".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "FAQ document generator. Use list_faqs or list_assignees to browse, \
                 open_faq to start an editing session, edit the returned session JSON, \
                 then save_faq, generate_document, export_screenshots or validate_steps. \
                 parse_document and import_document read .docx files back."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use faq_common::redis::RedisCache;

    use super::*;
    use crate::cache::FaqCache;
    use crate::model::FaqRecord;
    use crate::store::testing::{MemoryObjects, MemoryStore};
    use crate::validation::testing::EchoValidator;

    fn server() -> (FaqGeneratorServer, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_rows(vec![FaqRecord::new(
            "Why does X fail?",
            "alice",
        )]));
        let objects = Arc::new(MemoryObjects::default());
        let service = FaqService::new(
            store.clone(),
            objects.clone(),
            objects,
            Arc::new(EchoValidator::default()),
            Arc::new(FaqCache::new(RedisCache::disabled())),
        );
        (FaqGeneratorServer::new(Arc::new(service)), store)
    }

    #[test]
    fn tools_publish_output_schemas() {
        let tools = FaqGeneratorServer::tool_router().list_all();
        for name in [
            "list_faqs",
            "list_assignees",
            "add_faq",
            "delete_faq",
            "open_faq",
            "save_faq",
            "generate_document",
            "parse_document",
            "import_document",
            "export_screenshots",
            "validate_steps",
        ] {
            let tool = tools
                .iter()
                .find(|t| t.name == name)
                .unwrap_or_else(|| panic!("missing tool: {name}"));
            assert!(
                tool.output_schema.is_some(),
                "tool {name} should publish output_schema"
            );
        }
    }

    #[tokio::test]
    async fn blank_parameters_are_rejected_before_any_write() {
        let (server, store) = server();
        let Err(err) = server
            .add_faq(Parameters(AddFaqParams {
                question: "  ".to_string(),
                assignee: "alice".to_string(),
            }))
            .await
        else {
            panic!("blank question was accepted");
        };
        assert!(err.contains("must not be empty"));
        assert_eq!(store.write_count(), 0);

        let Err(err) = server
            .parse_document(Parameters(ParseDocumentParams {
                document_base64: " ".to_string(),
            }))
            .await
        else {
            panic!("blank document was accepted");
        };
        assert!(err.contains("document_base64"));
    }

    #[tokio::test]
    async fn malformed_base64_is_an_encoding_error() {
        let (server, _) = server();
        let Err(err) = server
            .import_document(Parameters(ImportDocumentParams {
                session: EditingSession::new(1, FaqRecord::new("q", "a")),
                document_base64: "not base64 at all!".to_string(),
            }))
            .await
        else {
            panic!("malformed base64 was accepted");
        };
        assert!(err.starts_with("import_document failed: invalid base64 payload:"), "{err}");
    }

    #[tokio::test]
    async fn errors_name_the_failed_action() {
        let (server, _) = server();
        let Err(err) = server
            .open_faq(Parameters(FaqIdParams { faq_id: 99 }))
            .await
        else {
            panic!("unknown faq was opened");
        };
        assert_eq!(err, "open_faq failed: faq not found: 99");
    }

    #[tokio::test]
    async fn generated_document_parses_back_through_tools() {
        let (server, _) = server();
        let Json(opened) = server
            .open_faq(Parameters(FaqIdParams { faq_id: 1 }))
            .await
            .unwrap();
        let mut session = opened.session;
        let id = session.add_step();
        session.step_mut(id).unwrap().text = "Check logs".to_string();

        let Json(generated) = server
            .generate_document(Parameters(GenerateDocumentParams {
                session,
                persist: None,
            }))
            .await
            .unwrap();
        assert_eq!(generated.file_name, "FAQ_Generated.docx");
        assert!(generated.url.is_none());

        let Json(parsed) = server
            .parse_document(Parameters(ParseDocumentParams {
                document_base64: generated.document_base64,
            }))
            .await
            .unwrap();
        assert_eq!(parsed.document.question.as_deref(), Some("Why does X fail?"));
        assert_eq!(parsed.document.content.steps.len(), 1);
        assert_eq!(parsed.document.content.steps[0].text, "Check logs");
    }

    #[tokio::test]
    async fn list_filters_by_assignee() {
        let (server, _) = server();
        let Json(all) = server
            .list_faqs(Parameters(ListFaqsParams { assignee: None }))
            .await
            .unwrap();
        assert_eq!(all.faqs.len(), 1);
        assert_eq!(all.faqs[0].latest_version, None);

        let Json(none) = server
            .list_faqs(Parameters(ListFaqsParams {
                assignee: Some("bob".to_string()),
            }))
            .await
            .unwrap();
        assert!(none.faqs.is_empty());
    }
}
