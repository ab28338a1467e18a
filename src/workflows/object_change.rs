//! Accessory swap: remove whatever accessory is present and put the requested one in.
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::prompt::templates;
use crate::providers::{EditRequest, Part};
use crate::utils::files::Stamp;
use crate::utils::imaging;
use crate::workflows::{Studio, UploadForm, EDITOR_NAME};

pub const IMAGE_FIELD: &str = "accessory_image";
pub const ACCESSORY_FIELD: &str = "new_accessory";

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReplacedAccessory {
    pub filename: String,
    pub ts: u64,
}

pub async fn replace_accessory(studio: &Studio, form: &UploadForm) -> AppResult<ReplacedAccessory> {
    let upload = form.require_file(IMAGE_FIELD)?;
    let new_accessory = form.require_text(ACCESSORY_FIELD)?;
    let stamp = Stamp::now();

    let png = imaging::to_png(upload.bytes.clone()).await?;
    let prompt = templates::replace_accessory(new_accessory)?;
    let generation = studio.editor.generate(EditRequest::new(vec![Part::text(prompt), Part::png(png)])).await?;
    let bytes = generation
        .into_first_image()
        .ok_or_else(|| AppError::NoImageReturned(EDITOR_NAME.to_string()))?;

    let filename = stamp.name("replaced_accessory", "png");
    studio.store.write_output(&filename, &bytes).await?;
    tracing::info!(file = %filename, accessory = new_accessory, "accessory replaced");
    Ok(ReplacedAccessory { filename, ts: stamp.ts })
}
