/// Section markers shared by the document generator and parser.
///
/// A generated document is a flat sequence of paragraphs:
///
/// ```text
/// FAQ Document            (heading)
/// [Question]   <question>
/// [Summary]    <summary lines>
/// [Steps]
/// [Step 1]     <text lines>
/// [Query Template]  <query lines>     (optional)
/// [Screenshot]      <inline image>    (optional)
/// [Step 2]     ...
/// [Additional Notes]  <notes lines>
/// ```
///
/// A paragraph is a marker only when its whole trimmed text is one of these tokens,
/// compared case-insensitively. Body text that merely mentions "notes" or "step" is
/// never treated as a marker.
use std::sync::LazyLock;

use regex::Regex;

pub const TITLE: &str = "FAQ Document";
pub const QUESTION: &str = "[Question]";
pub const SUMMARY: &str = "[Summary]";
pub const STEPS: &str = "[Steps]";
pub const QUERY_TEMPLATE: &str = "[Query Template]";
pub const SCREENSHOT: &str = "[Screenshot]";
pub const ADDITIONAL_NOTES: &str = "[Additional Notes]";

static STEP_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\[step\s+(\d+)\]$").expect("valid regex"));

/// `[Step N]` for the 1-based position `n`.
pub fn step_marker(n: usize) -> String {
    format!("[Step {n}]")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Question,
    Summary,
    Steps,
    /// Carries the number written in the document, which may disagree with position
    /// in hand-edited files.
    Step(usize),
    QueryTemplate,
    Screenshot,
    AdditionalNotes,
}

impl Marker {
    /// Classify one paragraph. Returns `None` for body text.
    pub fn classify(line: &str) -> Option<Marker> {
        let line = line.trim();
        if !line.starts_with('[') || !line.ends_with(']') {
            return None;
        }

        let fixed = [
            (QUESTION, Marker::Question),
            (SUMMARY, Marker::Summary),
            (STEPS, Marker::Steps),
            (QUERY_TEMPLATE, Marker::QueryTemplate),
            (SCREENSHOT, Marker::Screenshot),
            (ADDITIONAL_NOTES, Marker::AdditionalNotes),
        ];
        if let Some((_, marker)) = fixed.iter().find(|(token, _)| line.eq_ignore_ascii_case(token)) {
            return Some(*marker);
        }

        let caps = STEP_MARKER_RE.captures(line)?;
        caps[1].parse::<usize>().ok().map(Marker::Step)
    }
}
