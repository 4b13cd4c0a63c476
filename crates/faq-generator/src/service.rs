/// User actions over FAQs: listing, editing sessions, document generation,
/// screenshot export and LLM validation.
///
/// Each action runs once and either completes or returns an error for that action
/// alone. Sessions are owned by the caller and passed in explicitly.
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::archive::screenshot_archive;
use crate::cache::FaqCache;
use crate::error::AppError;
use crate::generator::{self, normalize_image};
use crate::model::{DocVersion, EditingSession, FaqId, FaqRecord, ParsedDocument, Screenshot};
use crate::parser::parse_document;
use crate::store::{Bucket, FaqRow, FaqStore, ObjectStorage, ScreenshotFetcher};
use crate::validation::StepValidator;

pub const DOCUMENT_FILE_NAME: &str = "FAQ_Generated.docx";
pub const ARCHIVE_FILE_NAME: &str = "FAQ_Screenshots.zip";
pub const VALIDATION_FILE_NAME: &str = "FAQ_Validation.txt";
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub fn screenshot_path(faq_id: FaqId, n: usize) -> String {
    format!("{faq_id}/step_{n}.png")
}

/// Whether a stored screenshot URL points at the object path for its current position.
fn is_stored_at(url: &str, path: &str) -> bool {
    url.strip_suffix(path).is_some_and(|prefix| prefix.ends_with('/'))
}

pub fn document_path(faq_id: FaqId, version: u32) -> String {
    format!("faq-{faq_id}-v{version}.docx")
}

#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Set when the document was persisted.
    pub url: Option<String>,
    pub version: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ScreenshotArchive {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub entries: usize,
}

#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub feedback: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct FaqService {
    store: Arc<dyn FaqStore>,
    objects: Arc<dyn ObjectStorage>,
    fetcher: Arc<dyn ScreenshotFetcher>,
    validator: Arc<dyn StepValidator>,
    cache: Arc<FaqCache>,
}

impl FaqService {
    pub fn new(
        store: Arc<dyn FaqStore>,
        objects: Arc<dyn ObjectStorage>,
        fetcher: Arc<dyn ScreenshotFetcher>,
        validator: Arc<dyn StepValidator>,
        cache: Arc<FaqCache>,
    ) -> Self {
        Self {
            store,
            objects,
            fetcher,
            validator,
            cache,
        }
    }

    /// All valid rows, sorted by question.
    pub async fn list_faqs(&self) -> Result<Vec<FaqRow>, AppError> {
        if let Some(rows) = self.cache.get_rows().await {
            return Ok(rows);
        }

        let mut rows = self.store.fetch_all().await?;
        rows.sort_by(|a, b| {
            a.record
                .question
                .to_lowercase()
                .cmp(&b.record.question.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        self.cache.set_rows(&rows).await;
        Ok(rows)
    }

    pub async fn assignees(&self) -> Result<Vec<String>, AppError> {
        let mut names: Vec<String> = self
            .list_faqs()
            .await?
            .into_iter()
            .map(|row| row.record.assignee.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    pub async fn faqs_for(&self, assignee: &str) -> Result<Vec<FaqRow>, AppError> {
        let assignee = assignee.trim();
        Ok(self
            .list_faqs()
            .await?
            .into_iter()
            .filter(|row| row.record.assignee.trim() == assignee)
            .collect())
    }

    pub async fn add_faq(&self, question: &str, assignee: &str) -> Result<FaqRow, AppError> {
        let (question, assignee) = (question.trim(), assignee.trim());
        if question.is_empty() || assignee.is_empty() {
            return Err(AppError::Validation(
                "question and assignee are both required".to_string(),
            ));
        }

        let row = self.store.insert(&FaqRecord::new(question, assignee)).await?;
        self.cache.invalidate_rows().await;
        info!(faq_id = row.id, assignee, "faq added");
        Ok(row)
    }

    pub async fn delete_faq(&self, id: FaqId) -> Result<(), AppError> {
        self.store.delete(id).await?;
        self.cache.invalidate_rows().await;
        info!(faq_id = id, "faq deleted");
        Ok(())
    }

    pub async fn open(&self, id: FaqId) -> Result<EditingSession, AppError> {
        let row = self
            .list_faqs()
            .await?
            .into_iter()
            .find(|row| row.id == id)
            .ok_or(AppError::NotFound(id))?;
        Ok(EditingSession::new(row.id, row.record))
    }

    /// Upload pending screenshots, then write the whole record back.
    ///
    /// Screenshot objects are keyed by position. A stored screenshot whose step has
    /// moved since it was uploaded is read back and written to its new position.
    /// Every such read happens before the first upload, so no object is overwritten
    /// while another step still depends on it.
    ///
    /// A screenshot that uploads successfully stays `Stored` in the session even if
    /// a later step fails, so retrying the save does not upload it again.
    pub async fn save(&self, session: &mut EditingSession) -> Result<FaqRow, AppError> {
        let faq_id = session.faq_id;

        let mut writes: Vec<(usize, Vec<u8>)> = Vec::new();
        for (i, step) in session.steps().iter().enumerate() {
            let n = i + 1;
            let bytes = match &step.screenshot {
                Screenshot::Absent => continue,
                Screenshot::Stored { url } if is_stored_at(url, &screenshot_path(faq_id, n)) => {
                    continue
                }
                Screenshot::Stored { url } => {
                    debug!(faq_id, step = n, url = %url, "screenshot moved, relocating");
                    self.fetcher.fetch(url).await.inspect_err(|e| {
                        warn!(faq_id, step = n, url = %url, error = %e, "moved screenshot could not be read")
                    })?
                }
                Screenshot::Pending { data } => data.clone(),
            };
            let image = normalize_image(&bytes).map_err(|e| {
                AppError::Validation(format!("screenshot for step {n} is not a readable image: {e}"))
            })?;
            writes.push((i, image.png));
        }

        let uploaded = writes.len();
        for (i, png) in writes {
            let url = self
                .objects
                .upload(Bucket::Screenshots, &screenshot_path(faq_id, i + 1), png, "image/png")
                .await?;
            session.record.content.steps[i].screenshot = Screenshot::Stored { url };
        }

        let row = self.store.update(faq_id, &session.record).await?;
        self.cache.invalidate_rows().await;
        info!(faq_id, uploaded, steps = session.steps().len(), "faq saved");
        Ok(row)
    }

    /// Render the session's content. With `persist`, the document is uploaded as
    /// the next version and the version is appended to the stored row only; other
    /// unsaved edits in the session are not written.
    pub async fn generate(
        &self,
        session: &mut EditingSession,
        persist: bool,
    ) -> Result<GeneratedDocument, AppError> {
        let images = generator::resolve_screenshots(session.steps(), self.fetcher.as_ref()).await;
        let bytes = generator::generate(&session.record, &images)?;

        if !persist {
            return Ok(GeneratedDocument {
                file_name: DOCUMENT_FILE_NAME.to_string(),
                bytes,
                url: None,
                version: None,
            });
        }

        let faq_id = session.faq_id;
        let mut stored = self
            .store
            .fetch_all()
            .await?
            .into_iter()
            .find(|row| row.id == faq_id)
            .ok_or(AppError::NotFound(faq_id))?
            .record;

        let version = stored.next_version();
        let path = document_path(faq_id, version);
        let url = self
            .objects
            .upload(Bucket::Documents, &path, bytes.clone(), DOCX_CONTENT_TYPE)
            .await?;

        let entry = DocVersion {
            version,
            url: url.clone(),
            generated_at: Utc::now(),
        };
        stored.versions.push(entry.clone());
        self.store.update(faq_id, &stored).await?;
        self.cache.invalidate_rows().await;
        session.record.versions = stored.versions;

        info!(faq_id, version, url = %entry.url, "document version stored");
        Ok(GeneratedDocument {
            file_name: path,
            bytes,
            url: Some(url),
            version: Some(version),
        })
    }

    pub async fn export_screenshots(
        &self,
        session: &EditingSession,
    ) -> Result<Option<ScreenshotArchive>, AppError> {
        let images = generator::resolve_screenshots(session.steps(), self.fetcher.as_ref()).await;
        let entries = images.iter().filter(|i| i.is_some()).count();
        Ok(screenshot_archive(&images)?.map(|bytes| ScreenshotArchive {
            file_name: ARCHIVE_FILE_NAME.to_string(),
            bytes,
            entries,
        }))
    }

    pub async fn validate(&self, session: &EditingSession) -> Result<ValidationReport, AppError> {
        let question = session.record.question.as_str();
        let steps_text = session.steps_text();
        let model = self.validator.model();

        let feedback = match self.cache.get_validation(model, question, &steps_text).await {
            Some(cached) => cached,
            None => {
                let feedback = self.validator.review(question, &steps_text).await?;
                self.cache
                    .set_validation(model, question, &steps_text, &feedback)
                    .await;
                feedback
            }
        };

        Ok(ValidationReport {
            bytes: feedback.clone().into_bytes(),
            feedback,
            file_name: VALIDATION_FILE_NAME.to_string(),
        })
    }

    pub fn parse(&self, bytes: &[u8]) -> ParsedDocument {
        parse_document(bytes)
    }

    /// Parse a document into the session. Returns the parsed document.
    pub fn import(&self, session: &mut EditingSession, bytes: &[u8]) -> ParsedDocument {
        let parsed = parse_document(bytes);
        if let Some(question) = &parsed.question {
            if question.trim() != session.record.question.trim() {
                warn!(
                    faq_id = session.faq_id,
                    document_question = %question,
                    "imported document belongs to a different question; keeping the session question"
                );
            }
        }
        session.apply_parsed(parsed.content.clone());
        parsed
    }
}

#[cfg(test)]
mod tests {
    use faq_common::redis::RedisCache;

    use super::*;
    use crate::generator::tests::tiny_png;
    use crate::model::Step;
    use crate::store::testing::{MemoryObjects, MemoryStore};
    use crate::validation::testing::EchoValidator;

    struct Fixture {
        store: Arc<MemoryStore>,
        objects: Arc<MemoryObjects>,
        validator: Arc<EchoValidator>,
        service: FaqService,
    }

    fn fixture_with(records: Vec<FaqRecord>, objects: MemoryObjects, validator: EchoValidator) -> Fixture {
        let store = Arc::new(MemoryStore::with_rows(records));
        let objects = Arc::new(objects);
        let validator = Arc::new(validator);
        let service = FaqService::new(
            store.clone(),
            objects.clone(),
            objects.clone(),
            validator.clone(),
            Arc::new(FaqCache::new(RedisCache::disabled())),
        );
        Fixture {
            store,
            objects,
            validator,
            service,
        }
    }

    fn fixture(records: Vec<FaqRecord>) -> Fixture {
        fixture_with(records, MemoryObjects::default(), EchoValidator::default())
    }

    fn scenario() -> FaqRecord {
        let mut record = FaqRecord::new("Why does X fail?", "alice");
        record.content.summary = "S1".to_string();
        record.content.steps = vec![Step::new("Check logs", "SELECT * FROM t")];
        record.content.notes = "N1".to_string();
        record
    }

    #[tokio::test]
    async fn list_sorts_and_filters_by_assignee() {
        let f = fixture(vec![
            FaqRecord::new("zeta", "bob"),
            FaqRecord::new("Alpha", "alice"),
            FaqRecord::new("beta", "alice"),
        ]);
        let questions: Vec<String> = f
            .service
            .list_faqs()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.record.question)
            .collect();
        assert_eq!(questions, vec!["Alpha", "beta", "zeta"]);

        assert_eq!(f.service.assignees().await.unwrap(), vec!["alice", "bob"]);
        assert_eq!(f.service.faqs_for(" alice ").await.unwrap().len(), 2);
        assert!(f.service.faqs_for("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn add_faq_rejects_blank_fields_without_writing() {
        let f = fixture(vec![]);
        for (q, a) in [("", "alice"), ("   ", "alice"), ("Why?", ""), ("Why?", "  ")] {
            let err = f.service.add_faq(q, a).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert_eq!(f.store.write_count(), 0);

        let row = f.service.add_faq("  Why does X fail? ", " alice ").await.unwrap();
        assert_eq!(row.record.question, "Why does X fail?");
        assert_eq!(row.record.assignee, "alice");
        assert_eq!(f.store.write_count(), 1);
    }

    #[tokio::test]
    async fn open_unknown_faq_is_not_found() {
        let f = fixture(vec![scenario()]);
        assert!(matches!(f.service.open(42).await, Err(AppError::NotFound(42))));
        let session = f.service.open(1).await.unwrap();
        assert_eq!(session.record.question, "Why does X fail?");
    }

    #[tokio::test]
    async fn delete_removes_row() {
        let f = fixture(vec![scenario()]);
        f.service.delete_faq(1).await.unwrap();
        assert!(f.store.row(1).is_none());
        assert!(f.service.list_faqs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_uploads_pending_screenshots_by_position() {
        let f = fixture(vec![scenario()]);
        let mut session = f.service.open(1).await.unwrap();
        let second = session.add_step();
        session.step_mut(second).unwrap().text = "Restart".to_string();
        session.attach_screenshot(second, tiny_png(4, 4)).unwrap();
        session.set_keywords_from_input("x, logs");

        f.service.save(&mut session).await.unwrap();

        assert_eq!(
            f.objects.uploaded(),
            vec![(Bucket::Screenshots, "1/step_2.png".to_string())]
        );
        let expected_url = MemoryObjects::url_for(Bucket::Screenshots, "1/step_2.png");
        assert_eq!(
            session.steps()[1].screenshot,
            Screenshot::Stored { url: expected_url.clone() }
        );

        let row = f.store.row(1).unwrap();
        assert_eq!(row.record.content.steps.len(), 2);
        assert_eq!(row.record.content.steps[1].screenshot, Screenshot::Stored { url: expected_url });
        assert_eq!(row.record.keywords, vec!["x", "logs"]);
        assert!(row.updated_at.is_some());
    }

    fn stored_size(objects: &MemoryObjects, screenshot: &Screenshot) -> (u32, u32) {
        let Screenshot::Stored { url } = screenshot else {
            panic!("expected a stored screenshot, got {screenshot:?}");
        };
        let image = normalize_image(&objects.get(url).unwrap()).unwrap();
        (image.width_px, image.height_px)
    }

    #[tokio::test]
    async fn save_after_reorder_keeps_each_steps_image() {
        let mut record = FaqRecord::new("Why does X fail?", "alice");
        record.content.steps = vec![Step::new("A", ""), Step::new("B", "")];
        let f = fixture(vec![record]);
        let mut session = f.service.open(1).await.unwrap();
        let (a, b) = (session.steps()[0].id, session.steps()[1].id);

        session.attach_screenshot(a, tiny_png(3, 3)).unwrap();
        f.service.save(&mut session).await.unwrap();

        session.move_step(b, 0).unwrap();
        session.attach_screenshot(b, tiny_png(9, 2)).unwrap();
        f.service.save(&mut session).await.unwrap();

        let a_pos = session.position(a).unwrap();
        let b_pos = session.position(b).unwrap();
        assert_eq!((a_pos, b_pos), (1, 0));
        assert_eq!(
            session.steps()[a_pos].screenshot,
            Screenshot::Stored {
                url: MemoryObjects::url_for(Bucket::Screenshots, "1/step_2.png")
            }
        );
        assert_eq!(stored_size(&f.objects, &session.steps()[a_pos].screenshot), (3, 3));
        assert_eq!(stored_size(&f.objects, &session.steps()[b_pos].screenshot), (9, 2));

        let row = f.store.row(1).unwrap();
        assert_eq!(row.record.content.steps, session.record.content.steps);
    }

    #[tokio::test]
    async fn save_after_removal_moves_remaining_images_up() {
        let mut record = FaqRecord::new("Why does X fail?", "alice");
        record.content.steps = vec![Step::new("A", ""), Step::new("B", "")];
        let f = fixture(vec![record]);
        let mut session = f.service.open(1).await.unwrap();
        let (a, b) = (session.steps()[0].id, session.steps()[1].id);
        session.attach_screenshot(a, tiny_png(3, 3)).unwrap();
        session.attach_screenshot(b, tiny_png(5, 4)).unwrap();
        f.service.save(&mut session).await.unwrap();

        session.remove_step(a).unwrap();
        let c = session.add_step();
        session.attach_screenshot(c, tiny_png(7, 1)).unwrap();
        f.service.save(&mut session).await.unwrap();

        assert_eq!(
            session.steps()[0].screenshot,
            Screenshot::Stored {
                url: MemoryObjects::url_for(Bucket::Screenshots, "1/step_1.png")
            }
        );
        assert_eq!(stored_size(&f.objects, &session.steps()[0].screenshot), (5, 4));
        assert_eq!(stored_size(&f.objects, &session.steps()[1].screenshot), (7, 1));
    }

    #[tokio::test]
    async fn unmoved_screenshots_are_not_uploaded_again() {
        let f = fixture(vec![scenario()]);
        let mut session = f.service.open(1).await.unwrap();
        let id = session.steps()[0].id;
        session.attach_screenshot(id, tiny_png(2, 2)).unwrap();
        f.service.save(&mut session).await.unwrap();
        f.service.save(&mut session).await.unwrap();
        assert_eq!(f.objects.uploaded().len(), 1);
    }

    #[tokio::test]
    async fn moved_screenshot_that_cannot_be_read_fails_before_any_write() {
        let mut record = FaqRecord::new("Why does X fail?", "alice");
        record.content.steps = vec![Step::new("A", ""), Step::new("B", "")];
        record.content.steps[1].screenshot = Screenshot::Stored {
            url: MemoryObjects::url_for(Bucket::Screenshots, "1/step_2.png"),
        };
        let f = fixture_with(vec![record], MemoryObjects::failing(), EchoValidator::default());
        let mut session = f.service.open(1).await.unwrap();
        let a = session.steps()[0].id;
        session.attach_screenshot(a, tiny_png(2, 2)).unwrap();
        let b = session.steps()[1].id;
        session.move_step(b, 0).unwrap();

        assert!(f.service.save(&mut session).await.is_err());
        assert!(f.objects.uploaded().is_empty());
        assert_eq!(f.store.write_count(), 0);
    }

    #[test]
    fn stored_path_match_is_exact() {
        assert!(is_stored_at("https://s/screenshots/1/step_2.png", "1/step_2.png"));
        assert!(!is_stored_at("https://s/screenshots/11/step_2.png", "1/step_2.png"));
        assert!(!is_stored_at("https://s/screenshots/1/step_1.png", "1/step_2.png"));
    }

    #[tokio::test]
    async fn without_redis_every_listing_reads_the_store() {
        let f = fixture(vec![scenario()]);
        f.service.list_faqs().await.unwrap();
        f.service.open(1).await.unwrap();
        assert_eq!(f.store.fetch_count(), 2);
    }

    #[tokio::test]
    async fn save_rejects_unreadable_screenshot() {
        let f = fixture(vec![scenario()]);
        let mut session = f.service.open(1).await.unwrap();
        let id = session.steps()[0].id;
        session.attach_screenshot(id, b"not an image".to_vec()).unwrap();

        let err = f.service.save(&mut session).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(f.store.write_count(), 0);
        assert!(f.objects.uploaded().is_empty());
    }

    #[tokio::test]
    async fn generate_without_persist_writes_nothing() {
        let f = fixture(vec![scenario()]);
        let mut session = f.service.open(1).await.unwrap();
        let doc = f.service.generate(&mut session, false).await.unwrap();
        assert_eq!(doc.file_name, "FAQ_Generated.docx");
        assert!(doc.url.is_none());
        assert!(f.objects.uploaded().is_empty());
        assert_eq!(f.store.write_count(), 0);

        let parsed = f.service.parse(&doc.bytes);
        assert_eq!(parsed.content.steps[0].query, "SELECT * FROM t");
    }

    #[tokio::test]
    async fn persisted_generation_appends_versions() {
        let f = fixture(vec![scenario()]);
        let mut session = f.service.open(1).await.unwrap();

        let first = f.service.generate(&mut session, true).await.unwrap();
        assert_eq!(first.version, Some(1));
        assert_eq!(first.file_name, "faq-1-v1.docx");

        let second = f.service.generate(&mut session, true).await.unwrap();
        assert_eq!(second.version, Some(2));
        assert_eq!(
            f.objects.uploaded(),
            vec![
                (Bucket::Documents, "faq-1-v1.docx".to_string()),
                (Bucket::Documents, "faq-1-v2.docx".to_string()),
            ]
        );

        let stored = f.store.row(1).unwrap().record;
        let versions: Vec<u32> = stored.versions.iter().map(|v| v.version).collect();
        assert_eq!(versions, vec![1, 2]);
        assert_eq!(session.record.versions, stored.versions);
        assert_eq!(stored.versions[1].url, second.url.unwrap());
    }

    #[tokio::test]
    async fn persisted_generation_leaves_unsaved_edits_alone() {
        let f = fixture(vec![scenario()]);
        let mut session = f.service.open(1).await.unwrap();
        session.record.content.summary = "edited, not saved".to_string();

        f.service.generate(&mut session, true).await.unwrap();
        let stored = f.store.row(1).unwrap().record;
        assert_eq!(stored.content.summary, "S1");
        assert_eq!(stored.versions.len(), 1);
    }

    #[tokio::test]
    async fn failed_screenshot_fetch_still_generates() {
        let objects = MemoryObjects::failing();
        let mut record = scenario();
        record.content.steps[0].screenshot = Screenshot::Stored {
            url: "https://storage.test/screenshots/1/step_1.png".to_string(),
        };
        let f = fixture_with(vec![record], objects, EchoValidator::default());
        let mut session = f.service.open(1).await.unwrap();

        let doc = f.service.generate(&mut session, false).await.unwrap();
        let texts = crate::parser::paragraph_texts(&doc.bytes);
        assert!(!texts.iter().any(|t| t == "[Screenshot]"));
        assert_eq!(f.service.parse(&doc.bytes).content.steps.len(), 1);

        assert!(f.service.export_screenshots(&session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn export_screenshots_after_save() {
        let f = fixture(vec![scenario()]);
        let mut session = f.service.open(1).await.unwrap();
        assert!(f.service.export_screenshots(&session).await.unwrap().is_none());

        let id = session.steps()[0].id;
        session.attach_screenshot(id, tiny_png(2, 2)).unwrap();
        f.service.save(&mut session).await.unwrap();

        let archive = f.service.export_screenshots(&session).await.unwrap().unwrap();
        assert_eq!(archive.file_name, "FAQ_Screenshots.zip");
        assert_eq!(archive.entries, 1);
        let zip = zip::ZipArchive::new(std::io::Cursor::new(archive.bytes)).unwrap();
        assert_eq!(zip.file_names().collect::<Vec<_>>(), vec!["Step1_screenshot.png"]);
    }

    #[tokio::test]
    async fn validate_returns_feedback_verbatim() {
        let f = fixture(vec![scenario()]);
        let session = f.service.open(1).await.unwrap();
        let report = f.service.validate(&session).await.unwrap();
        assert_eq!(report.feedback, "reviewed Why does X fail?: Step 1: Check logs");
        assert_eq!(report.bytes, report.feedback.as_bytes());
        assert_eq!(report.file_name, "FAQ_Validation.txt");
        assert_eq!(f.validator.call_count(), 1);
    }

    #[tokio::test]
    async fn validation_failure_leaves_session_intact() {
        let validator = EchoValidator {
            fail: true,
            ..EchoValidator::default()
        };
        let f = fixture_with(vec![scenario()], MemoryObjects::default(), validator);
        let session = f.service.open(1).await.unwrap();
        let before = session.clone();
        assert!(f.service.validate(&session).await.is_err());
        assert_eq!(session, before);
    }

    #[tokio::test]
    async fn import_keeps_question_and_screenshots() {
        let f = fixture(vec![scenario()]);
        let mut session = f.service.open(1).await.unwrap();
        let id = session.steps()[0].id;
        session.attach_screenshot(id, vec![7]).unwrap();

        let mut other = FaqRecord::new("A different question", "bob");
        other.content.steps = vec![Step::new("Edited step", ""), Step::new("New step", "")];
        let bytes = generator::generate(&other, &[]).unwrap();

        let parsed = f.service.import(&mut session, &bytes);
        assert_eq!(parsed.question.as_deref(), Some("A different question"));
        assert_eq!(session.record.question, "Why does X fail?");
        assert_eq!(session.steps().len(), 2);
        assert_eq!(session.steps()[0].id, id);
        assert_eq!(session.steps()[0].text, "Edited step");
        assert_eq!(session.steps()[0].screenshot, Screenshot::Pending { data: vec![7] });
    }
}
