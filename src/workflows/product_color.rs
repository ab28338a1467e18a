//! Fabric recoloring against the fixed texture palette.
//!
//! One editor call per selected color. A color that cannot be produced is
//! logged and skipped; the request only yields nothing when no color worked.
use serde::Serialize;

use crate::palette;
use crate::prompt::templates;
use crate::providers::{EditRequest, Part};
use crate::utils::files::{slug, Stamp};
use crate::utils::imaging;
use crate::workflows::{Studio, UploadForm};

pub const TARGET_FIELD: &str = "target_image";
pub const COLOR_TARGET_FIELD: &str = "color_target";
pub const COLORS_FIELD: &str = "colors";
pub const DEFAULT_COLOR_TARGET: &str = "product";
const TEMPERATURE: f32 = 0.2;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColorResult {
    pub label: String,
    pub filename: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColorBatch {
    pub results: Vec<ColorResult>,
    pub ts: u64,
}

fn capitalize(s: &str) -> String {
    let lower = s.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub async fn product_color(studio: &Studio, form: &UploadForm) -> Option<ColorBatch> {
    let stamp = Stamp::now();
    let target = form.file(TARGET_FIELD)?;
    let color_target = form
        .text(COLOR_TARGET_FIELD)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_COLOR_TARGET);
    let colors: Vec<&str> = form.texts(COLORS_FIELD).into_iter().map(str::trim).filter(|c| !c.is_empty()).collect();
    if colors.is_empty() {
        return None;
    }

    let target_png = match imaging::to_png(target.bytes.clone()).await {
        Ok(png) => png,
        Err(e) => {
            tracing::error!(error = %e, "invalid target image");
            return None;
        }
    };
    let prompt = match templates::fabric_recolor(color_target) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "could not build recolor prompt");
            return None;
        }
    };

    let mut results = Vec::new();
    for color in colors {
        let Some(fabric_path) = palette::texture_path(&studio.texture_dir, color) else {
            tracing::warn!(color, "unsupported color");
            continue;
        };
        let fabric_png = match tokio::fs::read(&fabric_path).await {
            Ok(bytes) => match imaging::to_png(bytes).await {
                Ok(png) => png,
                Err(e) => {
                    tracing::warn!(color, error = %e, "unreadable fabric image");
                    continue;
                }
            },
            Err(_) => {
                tracing::warn!(path = %fabric_path.display(), "missing fabric image");
                continue;
            }
        };

        let request = EditRequest::new(vec![
            Part::text(prompt.clone()),
            Part::png(target_png.clone()),
            Part::png(fabric_png),
        ])
        .with_temperature(TEMPERATURE);
        let generation = match studio.editor.generate(request).await {
            Ok(g) => g,
            Err(e) => {
                tracing::error!(color, error = %e, "editor failed");
                continue;
            }
        };
        let Some(bytes) = generation.into_first_image() else {
            tracing::error!(color, "no image returned");
            continue;
        };

        let filename = format!("{}_{}_{}_{}.png", slug(color_target), slug(color), stamp.ts, stamp.suffix);
        if let Err(e) = studio.store.write_output(&filename, &bytes).await {
            tracing::error!(color, error = %e, "could not write recolored image");
            continue;
        }
        results.push(ColorResult { label: format!("{} → {}", capitalize(color_target), color), filename });
    }

    if results.is_empty() {
        None
    } else {
        Some(ColorBatch { results, ts: stamp.ts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capitalize_matches_label_style() {
        assert_eq!(capitalize("product"), "Product");
        assert_eq!(capitalize("SOFA cover"), "Sofa cover");
        assert_eq!(capitalize(""), "");
    }
}
