use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::AppError;
use crate::generator::ResolvedImage;

/// Archive entry name for the screenshot of step `n` (1-based).
pub fn entry_name(n: usize) -> String {
    format!("Step{n}_screenshot.png")
}

/// Zip every resolved screenshot, numbered by step position. Returns `None` when
/// there is nothing to archive.
pub fn screenshot_archive(images: &[Option<ResolvedImage>]) -> Result<Option<Vec<u8>>, AppError> {
    if images.iter().all(Option::is_none) {
        return Ok(None);
    }

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (i, image) in images.iter().enumerate() {
        let Some(image) = image else { continue };
        zip.start_file(entry_name(i + 1), options)?;
        zip.write_all(&image.png)?;
    }
    Ok(Some(zip.finish()?.into_inner()))
}
