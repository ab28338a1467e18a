//! Multi-object replacement in a staged setup photo.
//!
//! Step one stores the setup image and asks the editor which objects it sees.
//! Step two replaces the selected objects one after another, feeding each
//! result into the next edit, and returns the final image inline.
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::prompt::templates;
use crate::providers::{EditRequest, Part};
use crate::utils::files::Stamp;
use crate::utils::imaging;
use crate::workflows::{Studio, UploadForm};

pub const SETUP_FIELD: &str = "setup";
pub const SETUP_PATH_FIELD: &str = "setup_path";
pub const SELECTED_FIELD: &str = "selected_items";
pub const PRODUCT_PREFIX: &str = "product_";
pub const ITEM_KEY_PREFIX: &str = "item_key_";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SetupAnalysis {
    pub items: Vec<String>,
    /// Reference the client echoes back in step two.
    pub setup_path: String,
}

/// Pull the `items` list out of the model's JSON answer, tolerating a
/// surrounding Markdown code fence.
pub fn parse_items(answer: &str) -> AppResult<Vec<String>> {
    let invalid = || AppError::InvalidModelOutput(format!("Invalid JSON returned by {}:\n{}", super::EDITOR_NAME, answer));
    let body = strip_code_fence(answer);
    let data: Value = serde_json::from_str(body).map_err(|_| invalid())?;
    let obj = data.as_object().ok_or_else(invalid)?;
    let items = match obj.get("items") {
        None => Vec::new(),
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Some(_) => return Err(invalid()),
    };
    Ok(items)
}

fn strip_code_fence(s: &str) -> &str {
    let t = s.trim();
    let Some(rest) = t.strip_prefix("```") else { return t };
    // Language tag, with or without a newline after it.
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()).trim_start();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

pub async fn analyze_image(studio: &Studio, form: &UploadForm) -> AppResult<SetupAnalysis> {
    let upload = form
        .file(SETUP_FIELD)
        .ok_or_else(|| AppError::BadRequest("No setup image provided".to_string()))?;
    let stamp = Stamp::now();

    let png = imaging::to_png(upload.bytes.clone()).await?;
    let setup_name = stamp.name("setup", "png");
    studio.store.write_tmp(&setup_name, &png).await?;

    let generation = studio
        .editor
        .generate(EditRequest::new(vec![Part::text(templates::ANALYZE_SETUP), Part::png(png)]))
        .await?;
    let items = parse_items(&generation.text())?;
    tracing::info!(setup = %setup_name, items = items.len(), "setup analyzed");
    Ok(SetupAnalysis { items, setup_path: setup_name })
}

/// Returns the final image as base64-encoded PNG.
pub async fn replace_product(studio: &Studio, form: &UploadForm) -> AppResult<String> {
    let setup_ref = form
        .text(SETUP_PATH_FIELD)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing setup_path in form".to_string()))?;
    let setup_path = studio.store.existing_tmp(setup_ref).await?;
    let mut current = imaging::to_png(tokio::fs::read(&setup_path).await?).await?;
    let selected = form.texts(SELECTED_FIELD);

    for upload in form.files() {
        let Some(rest) = upload.field.strip_prefix(PRODUCT_PREFIX) else { continue };
        let index = rest.split('_').next().unwrap_or_default();
        let Some(item_name) = form.text(&format!("{}{}", ITEM_KEY_PREFIX, index)) else { continue };
        if !selected.contains(&item_name) || upload.bytes.is_empty() {
            continue;
        }

        let product = imaging::to_png(upload.bytes.clone()).await?;
        let prompt = templates::replace_object(item_name)?;
        let generation = studio
            .editor
            .generate(EditRequest::new(vec![Part::text(prompt), Part::png(current.clone()), Part::png(product)]))
            .await?;

        match generation.into_first_image() {
            Some(bytes) => {
                current = imaging::to_png(bytes).await?;
                tracing::info!(item = item_name, "object replaced");
            }
            None => tracing::warn!(item = item_name, "no image returned, keeping previous state"),
        }
    }

    Ok(STANDARD.encode(&current))
}
