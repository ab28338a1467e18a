//! Two-step multi-color editing: list the product colors, then swap one.
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::prompt::templates;
use crate::providers::{EditRequest, Part};
use crate::utils::files::{slug, Stamp};
use crate::utils::imaging;
use crate::workflows::{Studio, UploadForm, EDITOR_NAME};

pub const IMAGE_FIELD: &str = "multicolor_image";
const JPEG_QUALITY: u8 = 90;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetectedColors {
    pub colors: Vec<String>,
    pub filename: String,
    pub ts: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recolored {
    pub filename: String,
    pub ts: u64,
}

/// Split a comma-separated model answer into trimmed, non-empty names.
pub fn parse_color_list(answer: &str) -> Vec<String> {
    answer.split(',').map(str::trim).filter(|c| !c.is_empty()).map(str::to_string).collect()
}

/// Store the upload as JPEG in the output directory and ask the vision model
/// which distinct product colors it shows.
pub async fn detect_multicolors(studio: &Studio, form: &UploadForm) -> AppResult<DetectedColors> {
    let upload = form.require_file(IMAGE_FIELD)?;
    let stamp = Stamp::now();

    let jpeg = imaging::to_jpeg(upload.bytes.clone(), JPEG_QUALITY).await?;
    let filename = stamp.name("multicolor", "jpg");
    studio.store.write_output(&filename, &jpeg).await?;

    let answer = studio.vision_chat.ask_about_image(templates::DETECT_COLORS, &jpeg).await?;
    let colors = parse_color_list(&answer);
    tracing::info!(file = %filename, colors = colors.len(), "colors detected");

    Ok(DetectedColors { colors, filename, ts: stamp.ts })
}

/// Recolor the regions of a previously detected image.
pub async fn modify_detected_color(studio: &Studio, form: &UploadForm) -> AppResult<Recolored> {
    let source_color = form.require_text("source_color")?;
    let target_color = form.require_text("target_color")?;
    let source_file = form.require_text("filename")?;
    let stamp = Stamp::now();

    let path = studio.store.existing_output(source_file).await?;
    let png = imaging::to_png(tokio::fs::read(&path).await?).await?;
    let prompt = templates::modify_color(source_color, target_color)?;

    let generation = studio.editor.generate(EditRequest::new(vec![Part::text(prompt), Part::png(png)])).await?;
    let bytes = generation
        .into_first_image()
        .ok_or_else(|| AppError::NoImageReturned(EDITOR_NAME.to_string()))?;

    let filename = stamp.name(&format!("multicolor_{}_to_{}", slug(source_color), slug(target_color)), "png");
    studio.store.write_output(&filename, &bytes).await?;
    tracing::info!(file = %filename, "color modified");
    Ok(Recolored { filename, ts: stamp.ts })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_list_drops_blanks() {
        assert_eq!(parse_color_list(" navy blue, ivory ,, rust,"), vec!["navy blue", "ivory", "rust"]);
        assert!(parse_color_list("  ").is_empty());
    }
}
