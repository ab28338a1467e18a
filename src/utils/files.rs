//! Output and scratch file management.
//!
//! Generated files live in the output directory and are served under
//! `/static/output/`; scratch uploads (the product-replace setup image) live in
//! the tmp directory. Names are built from a unix timestamp plus a short random
//! suffix so two requests in the same second never share a file.
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::fs;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Per-request naming stamp.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Stamp {
    pub ts: u64,
    pub suffix: String,
}

impl Stamp {
    pub fn now() -> Self {
        let ts = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
        let suffix = Uuid::new_v4().simple().to_string()[..8].to_string();
        Stamp { ts, suffix }
    }

    /// `{stem}_{ts}_{suffix}.{ext}`
    pub fn name(&self, stem: &str, ext: &str) -> String {
        format!("{}_{}_{}.{}", stem, self.ts, self.suffix, ext)
    }
}

/// Make a user-supplied label safe for use inside a file name.
pub fn slug(label: &str) -> String {
    let s: String = label
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if s.is_empty() { "_".to_string() } else { s }
}

/// Accept only a plain file name: no separators, no parent references, no dotfiles.
pub fn bare_file_name(name: &str) -> AppResult<&str> {
    let name = name.trim();
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0');
    if ok {
        Ok(name)
    } else {
        Err(AppError::BadRequest(format!("Invalid file name: {}", name)))
    }
}

#[derive(Clone, Debug)]
pub struct OutputStore {
    output_dir: PathBuf,
    tmp_dir: PathBuf,
}

impl OutputStore {
    pub fn new(output_dir: PathBuf, tmp_dir: PathBuf) -> Self {
        OutputStore { output_dir, tmp_dir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn tmp_dir(&self) -> &Path {
        &self.tmp_dir
    }

    pub async fn ensure_dirs(&self) -> AppResult<()> {
        fs::create_dir_all(&self.output_dir).await?;
        fs::create_dir_all(&self.tmp_dir).await?;
        Ok(())
    }

    pub fn output_path(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }

    pub fn tmp_path(&self, name: &str) -> PathBuf {
        self.tmp_dir.join(name)
    }

    pub async fn write_output(&self, name: &str, bytes: &[u8]) -> AppResult<PathBuf> {
        let path = self.output_path(name);
        fs::create_dir_all(&self.output_dir).await?;
        fs::write(&path, bytes).await?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "wrote output file");
        Ok(path)
    }

    pub async fn write_tmp(&self, name: &str, bytes: &[u8]) -> AppResult<PathBuf> {
        let path = self.tmp_path(name);
        fs::create_dir_all(&self.tmp_dir).await?;
        fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Resolve a previously generated output file named by the client.
    pub async fn existing_output(&self, name: &str) -> AppResult<PathBuf> {
        let path = self.output_path(bare_file_name(name)?);
        existing(path).await
    }

    /// Resolve the setup image reference echoed back by the client. Only the
    /// final path component is honored and it must live in the tmp directory.
    pub async fn existing_tmp(&self, reference: &str) -> AppResult<PathBuf> {
        let name = Path::new(reference.trim())
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::BadRequest(format!("Invalid file reference: {}", reference)))?;
        let path = self.tmp_path(bare_file_name(name)?);
        existing(path).await
    }

    /// Best-effort removal of a scratch file.
    pub async fn discard(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %e, "could not remove scratch file");
        }
    }
}

async fn existing(path: PathBuf) -> AppResult<PathBuf> {
    if fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false) {
        Ok(path)
    } else {
        Err(AppError::NotFound(format!("File not found: {}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_names_carry_timestamp_and_suffix() {
        let s = Stamp { ts: 1700000000, suffix: "abcd1234".into() };
        assert_eq!(s.name("final_wall", "png"), "final_wall_1700000000_abcd1234.png");
    }

    #[test]
    fn stamps_differ_within_the_same_second() {
        let a = Stamp::now();
        let b = Stamp::now();
        assert_eq!(a.suffix.len(), 8);
        assert_ne!(a.suffix, b.suffix);
    }

    #[test]
    fn slug_replaces_spaces_and_symbols() {
        assert_eq!(slug("Midnight Green"), "Midnight_Green");
        assert_eq!(slug(" dark/blue "), "dark_blue");
        assert_eq!(slug(""), "_");
    }

    #[test]
    fn bare_file_name_rejects_paths() {
        assert!(bare_file_name("multicolor_1_x.jpg").is_ok());
        assert!(bare_file_name("../secret").is_err());
        assert!(bare_file_name("a/b.png").is_err());
        assert!(bare_file_name("..").is_err());
        assert!(bare_file_name("").is_err());
    }

    #[tokio::test]
    async fn existing_tmp_uses_only_the_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path().join("output"), dir.path().join("tmp"));
        store.ensure_dirs().await.unwrap();
        store.write_tmp("setup_1.png", b"x").await.unwrap();

        let resolved = store.existing_tmp("/somewhere/else/static/tmp/setup_1.png").await.unwrap();
        assert_eq!(resolved, dir.path().join("tmp").join("setup_1.png"));

        let missing = store.existing_tmp("setup_2.png").await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn existing_output_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = OutputStore::new(dir.path().join("output"), dir.path().join("tmp"));
        let err = store.existing_output("../tmp/setup_1.png").await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
