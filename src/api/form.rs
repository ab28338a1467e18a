//! Multipart extraction into `UploadForm`.
use axum::extract::Multipart;

use crate::error::{AppError, AppResult};
use crate::workflows::{Upload, UploadForm};

/// Drain a multipart body. Parts with a file name are uploads (an empty part
/// from an untouched file input is dropped), everything else is text.
pub async fn read_form(mut multipart: Multipart) -> AppResult<UploadForm> {
    let mut form = UploadForm::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let Some(name) = field.name().map(str::to_string) else { continue };
        match field.file_name().map(str::to_string) {
            Some(file_name) => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Read error: {}", e)))?;
                if bytes.is_empty() && file_name.is_empty() {
                    continue;
                }
                tracing::debug!(field = %name, file = %file_name, bytes = bytes.len(), "upload received");
                form.push_file(Upload { field: name, bytes: bytes.to_vec() });
            }
            None => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Read error: {}", e)))?;
                form.push_text(name, value);
            }
        }
    }
    Ok(form)
}
