/// Document generator: renders an FAQ record into a `.docx` using the marker layout
/// described in `format`.
///
/// Generation is split in three stages so the text layout can be tested without Word:
/// 1. `resolve_screenshots` turns each step's screenshot into a decoded PNG (fail soft)
/// 2. `layout` produces the ordered block list
/// 3. `render_docx` writes the blocks with docx-rs
use std::io::Cursor;

use docx_rs::{Docx, Paragraph, Pic, Run, Style, StyleType};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::format::{
    step_marker, ADDITIONAL_NOTES, QUERY_TEMPLATE, QUESTION, SCREENSHOT, STEPS, SUMMARY, TITLE,
};
use crate::model::{FaqRecord, Screenshot, Step};
use crate::store::ScreenshotFetcher;

/// Fixed display width of embedded screenshots: 4 inches in EMU.
const IMAGE_WIDTH_EMU: u64 = 4 * 914_400;
const TITLE_STYLE: &str = "Heading1";

/// A screenshot decoded and re-encoded as PNG.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub png: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl ResolvedImage {
    /// Display size in EMU at the fixed width, keeping aspect ratio.
    fn display_size_emu(&self) -> (u32, u32) {
        let width = self.width_px.max(1) as u64;
        let height = self.height_px as u64 * IMAGE_WIDTH_EMU / width;
        (IMAGE_WIDTH_EMU as u32, height.min(u32::MAX as u64) as u32)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(String),
    Text(String),
    Image(ResolvedImage),
}

/// Decode any supported image format and re-encode it as PNG.
pub fn normalize_image(bytes: &[u8]) -> Result<ResolvedImage, image::ImageError> {
    let img = image::load_from_memory(bytes)?;
    let mut png = Cursor::new(Vec::new());
    img.write_to(&mut png, image::ImageFormat::Png)?;
    Ok(ResolvedImage {
        png: png.into_inner(),
        width_px: img.width(),
        height_px: img.height(),
    })
}

/// Resolve one image per step, by position. Missing, unfetchable or undecodable
/// screenshots come back as `None` and are logged; they never fail generation.
pub async fn resolve_screenshots(
    steps: &[Step],
    fetcher: &dyn ScreenshotFetcher,
) -> Vec<Option<ResolvedImage>> {
    let mut images = Vec::with_capacity(steps.len());
    for (i, step) in steps.iter().enumerate() {
        let n = i + 1;
        let image = match &step.screenshot {
            Screenshot::Absent => None,
            Screenshot::Pending { data } => decode(n, data),
            Screenshot::Stored { url } => match fetcher.fetch(url).await {
                Ok(bytes) => decode(n, &bytes),
                Err(e) => {
                    warn!(step = n, url = %url, error = %e, "screenshot fetch failed, skipping image");
                    None
                }
            },
        };
        images.push(image);
    }
    images
}

fn decode(step: usize, bytes: &[u8]) -> Option<ResolvedImage> {
    normalize_image(bytes)
        .inspect_err(|e| warn!(step, error = %e, "screenshot is not a readable image, skipping"))
        .ok()
}

/// Lay out the record as an ordered list of blocks. `images[i]` belongs to step `i`.
pub fn layout(record: &FaqRecord, images: &[Option<ResolvedImage>]) -> Vec<Block> {
    let mut blocks = vec![Block::Title(TITLE.to_string())];

    blocks.push(marker(QUESTION));
    push_lines(&mut blocks, &record.question);

    blocks.push(marker(SUMMARY));
    push_lines(&mut blocks, &record.content.summary);

    blocks.push(marker(STEPS));
    for (i, step) in record.content.steps.iter().enumerate() {
        blocks.push(Block::Text(step_marker(i + 1)));
        push_lines(&mut blocks, &step.text);

        if !step.query.trim().is_empty() {
            blocks.push(marker(QUERY_TEMPLATE));
            push_lines(&mut blocks, &step.query);
        }

        if let Some(Some(image)) = images.get(i) {
            blocks.push(marker(SCREENSHOT));
            blocks.push(Block::Image(image.clone()));
        }
    }

    blocks.push(marker(ADDITIONAL_NOTES));
    push_lines(&mut blocks, &record.content.notes);

    blocks
}

fn marker(token: &str) -> Block {
    Block::Text(token.to_string())
}

// One paragraph per non-blank line; the parser re-joins them.
fn push_lines(blocks: &mut Vec<Block>, text: &str) {
    blocks.extend(
        text.lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|l| Block::Text(l.to_string())),
    );
}

/// Write the blocks as a Word document and return the packed bytes.
pub fn render_docx(blocks: &[Block]) -> Result<Vec<u8>, AppError> {
    let mut docx = Docx::new().add_style(
        Style::new(TITLE_STYLE, StyleType::Paragraph)
            .name("Heading 1")
            .size(32)
            .bold(),
    );

    for block in blocks {
        let paragraph = match block {
            Block::Title(text) => Paragraph::new()
                .style(TITLE_STYLE)
                .add_run(Run::new().add_text(text)),
            Block::Text(text) => Paragraph::new().add_run(Run::new().add_text(text)),
            Block::Image(image) => {
                let (width, height) = image.display_size_emu();
                let pic = Pic::new(&image.png).size(width, height);
                Paragraph::new().add_run(Run::new().add_image(pic))
            }
        };
        docx = docx.add_paragraph(paragraph);
    }

    let mut out = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut out)
        .map_err(|e| AppError::Document(format!("failed to pack docx: {e}")))?;
    let bytes = out.into_inner();
    debug!(blocks = blocks.len(), bytes = bytes.len(), "document rendered");
    Ok(bytes)
}

/// Layout + render in one call.
pub fn generate(record: &FaqRecord, images: &[Option<ResolvedImage>]) -> Result<Vec<u8>, AppError> {
    render_docx(&layout(record, images))
}
