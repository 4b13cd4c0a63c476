/// Parser for FAQ documents written by the generator.
///
/// The document is a flat list of paragraphs in which section markers (see `format`)
/// open regions of body text. Parser approach: single pass over the paragraphs with a
/// small state machine; each non-blank paragraph is either a marker, which switches the
/// state, or body text, which is appended to the field the current state points at.
///
/// Parsing never fails. Text outside an open section is dropped, so a foreign or
/// hand-mangled document degrades to partial or empty content.
use docx_rs::{DocumentChild, Paragraph, ParagraphChild, RunChild};
use tracing::{debug, warn};

use crate::format::Marker;
use crate::model::{ParsedContent, ParsedDocument, ParsedStep};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Question,
    Summary,
    Step(StepField),
    Notes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepField {
    Text,
    Query,
}

/// Parse `.docx` bytes. Unreadable input yields an empty result.
pub fn parse_document(bytes: &[u8]) -> ParsedDocument {
    parse_paragraphs(&paragraph_texts(bytes))
}

/// Extract the text of every top-level paragraph, in document order.
///
/// Paragraphs holding only an image come back as empty strings.
pub fn paragraph_texts(bytes: &[u8]) -> Vec<String> {
    let docx = match docx_rs::read_docx(bytes) {
        Ok(docx) => docx,
        Err(e) => {
            warn!(error = %e, "document could not be read as docx, nothing to parse");
            return Vec::new();
        }
    };

    docx.document
        .children
        .iter()
        .filter_map(|child| match child {
            DocumentChild::Paragraph(p) => Some(paragraph_text(p)),
            _ => None,
        })
        .collect()
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut out = String::new();
    for child in &paragraph.children {
        let ParagraphChild::Run(run) = child else {
            continue;
        };
        for run_child in &run.children {
            match run_child {
                RunChild::Text(t) => out.push_str(&t.text),
                RunChild::Tab(_) => out.push(' '),
                _ => {}
            }
        }
    }
    out
}

/// Rebuild the structured content from paragraph texts.
pub fn parse_paragraphs<S: AsRef<str>>(paragraphs: &[S]) -> ParsedDocument {
    let mut question: Option<String> = None;
    let mut content = ParsedContent::default();
    let mut section = Section::None;

    for (i, raw) in paragraphs.iter().enumerate() {
        let line = raw.as_ref().trim();
        if line.is_empty() {
            continue;
        }

        if let Some(marker) = Marker::classify(line) {
            section = next_section(section, marker, &mut content, &mut question);
            continue;
        }

        match section {
            Section::None => {
                debug!(paragraph = i + 1, "text outside any section, dropping");
            }
            Section::Question => append_words(question.get_or_insert_with(String::new), line),
            Section::Summary => append_words(&mut content.summary, line),
            Section::Notes => append_words(&mut content.notes, line),
            Section::Step(field) => match content.steps.last_mut() {
                Some(step) => match field {
                    StepField::Text => append_words(&mut step.text, line),
                    StepField::Query => append_line(&mut step.query, line),
                },
                None => {
                    debug!(paragraph = i + 1, "step text before any [Step N] marker, dropping");
                }
            },
        }
    }

    content.summary = content.summary.trim().to_string();
    content.notes = content.notes.trim().to_string();
    for step in &mut content.steps {
        step.text = step.text.trim().to_string();
        step.query = step.query.trim().to_string();
    }
    let question = question
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());

    ParsedDocument { question, content }
}

fn next_section(
    current: Section,
    marker: Marker,
    content: &mut ParsedContent,
    question: &mut Option<String>,
) -> Section {
    match marker {
        Marker::Question => {
            question.get_or_insert_with(String::new);
            Section::Question
        }
        Marker::Summary => Section::Summary,
        Marker::Steps => Section::Step(StepField::Text),
        Marker::Step(n) => {
            content.steps.push(ParsedStep::default());
            if n != content.steps.len() {
                debug!(
                    written = n,
                    position = content.steps.len(),
                    "step marker number disagrees with position, using position"
                );
            }
            Section::Step(StepField::Text)
        }
        Marker::QueryTemplate if content.steps.is_empty() => {
            debug!("query template before any step, dropping it");
            Section::None
        }
        Marker::QueryTemplate => Section::Step(StepField::Query),
        // The image itself is not recoverable; text after it belongs to the step again.
        Marker::Screenshot if content.steps.is_empty() => current,
        Marker::Screenshot => Section::Step(StepField::Text),
        Marker::AdditionalNotes => Section::Notes,
    }
}

fn append_words(field: &mut String, line: &str) {
    if !field.is_empty() {
        field.push(' ');
    }
    field.push_str(line);
}

fn append_line(field: &mut String, line: &str) {
    if !field.is_empty() {
        field.push('\n');
    }
    field.push_str(line);
}
