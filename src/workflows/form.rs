//! Submitted form data, independent of the HTTP extractor that produced it.
//!
//! File parts and text parts are kept in arrival order; text fields may repeat
//! (checkbox groups such as `colors` or `selected_items`).
use crate::error::{AppError, AppResult};

#[derive(Clone, Debug)]
pub struct Upload {
    pub field: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, Default)]
pub struct UploadForm {
    files: Vec<Upload>,
    fields: Vec<(String, String)>,
}

impl UploadForm {
    pub fn new() -> Self {
        UploadForm::default()
    }

    pub fn push_file(&mut self, upload: Upload) {
        self.files.push(upload);
    }

    pub fn push_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn with_file(mut self, field: &str, bytes: Vec<u8>) -> Self {
        self.push_file(Upload { field: field.to_string(), bytes });
        self
    }

    pub fn with_text(mut self, name: &str, value: &str) -> Self {
        self.push_text(name, value);
        self
    }

    pub fn files(&self) -> impl Iterator<Item = &Upload> {
        self.files.iter()
    }

    pub fn file(&self, field: &str) -> Option<&Upload> {
        self.files.iter().find(|f| f.field == field && !f.bytes.is_empty())
    }

    pub fn require_file(&self, field: &str) -> AppResult<&Upload> {
        self.file(field).ok_or_else(|| AppError::BadRequest(format!("Missing upload: {}", field)))
    }

    /// First value of a text field.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// First non-blank value of a text field, trimmed.
    pub fn require_text(&self, name: &str) -> AppResult<&str> {
        self.text(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::BadRequest(format!("Missing form field: {}", name)))
    }

    /// Every value of a repeated text field, in order.
    pub fn texts(&self, name: &str) -> Vec<&str> {
        self.fields.iter().filter(|(k, _)| k == name).map(|(_, v)| v.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_fields_keep_order() {
        let form = UploadForm::new().with_text("colors", "Oatmeal").with_text("x", "1").with_text("colors", "Wild Wind");
        assert_eq!(form.texts("colors"), vec!["Oatmeal", "Wild Wind"]);
        assert_eq!(form.text("colors"), Some("Oatmeal"));
        assert!(form.texts("missing").is_empty());
    }

    #[test]
    fn empty_file_parts_count_as_missing() {
        let form = UploadForm::new().with_file("setup", vec![]);
        assert!(form.file("setup").is_none());
        assert!(matches!(form.require_file("setup"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn blank_text_is_missing() {
        let form = UploadForm::new().with_text("new_accessory", "   ");
        assert!(form.require_text("new_accessory").is_err());
        let form = UploadForm::new().with_text("new_accessory", " scarf ");
        assert_eq!(form.require_text("new_accessory").unwrap(), "scarf");
    }
}
