//! Local checkpoint files and on-demand download.
//!
//! Checkpoints live in `MODELS_DIR`. A missing file is fetched from its
//! configured URL into a `.part` file and renamed into place once complete, so
//! an interrupted download never leaves a truncated model behind.
use std::path::{Path, PathBuf};

use reqwest::Client;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config::Config;
use crate::error::{AppError, AppResult};

pub const DINO_MODEL_FILE: &str = "groundingdino_swint_ogc.onnx";
pub const DINO_TOKENIZER_FILE: &str = "bert-base-uncased-tokenizer.json";
pub const SAM_ENCODER_FILE: &str = "sam_vit_b_01ec64.encoder.onnx";
pub const SAM_DECODER_FILE: &str = "sam_vit_b_01ec64.decoder.onnx";

#[derive(Clone, Debug)]
pub struct ModelFiles {
    pub dino_model: PathBuf,
    pub dino_tokenizer: PathBuf,
    pub sam_encoder: PathBuf,
    pub sam_decoder: PathBuf,
}

#[derive(Clone, Debug)]
pub struct Checkpoint {
    pub name: &'static str,
    pub env_var: &'static str,
    pub path: PathBuf,
    pub url: Option<String>,
}

pub fn checkpoints(config: &Config) -> Vec<Checkpoint> {
    let dir = &config.models_dir;
    vec![
        Checkpoint {
            name: "GroundingDINO",
            env_var: "DINO_MODEL_URL",
            path: dir.join(DINO_MODEL_FILE),
            url: config.dino_model_url.clone(),
        },
        Checkpoint {
            name: "GroundingDINO tokenizer",
            env_var: "DINO_TOKENIZER_URL",
            path: dir.join(DINO_TOKENIZER_FILE),
            url: config.dino_tokenizer_url.clone(),
        },
        Checkpoint {
            name: "SAM encoder",
            env_var: "SAM_ENCODER_URL",
            path: dir.join(SAM_ENCODER_FILE),
            url: config.sam_encoder_url.clone(),
        },
        Checkpoint {
            name: "SAM decoder",
            env_var: "SAM_DECODER_URL",
            path: dir.join(SAM_DECODER_FILE),
            url: config.sam_decoder_url.clone(),
        },
    ]
}

/// Make sure every checkpoint exists locally, downloading the missing ones.
pub async fn ensure_checkpoints(config: &Config) -> AppResult<ModelFiles> {
    let client = Client::new();
    for ckpt in checkpoints(config) {
        if is_present(&ckpt.path).await {
            tracing::debug!(model = ckpt.name, path = %ckpt.path.display(), "checkpoint present");
            continue;
        }
        let url = ckpt.url.as_deref().ok_or_else(|| {
            AppError::Config(format!(
                "{} checkpoint missing at {} and {} is not set",
                ckpt.name,
                ckpt.path.display(),
                ckpt.env_var
            ))
        })?;
        tracing::info!(model = ckpt.name, url, "downloading checkpoint");
        let bytes = download_file(&client, url, &ckpt.path).await?;
        tracing::info!(model = ckpt.name, bytes, path = %ckpt.path.display(), "checkpoint saved");
    }
    let dir = &config.models_dir;
    Ok(ModelFiles {
        dino_model: dir.join(DINO_MODEL_FILE),
        dino_tokenizer: dir.join(DINO_TOKENIZER_FILE),
        sam_encoder: dir.join(SAM_ENCODER_FILE),
        sam_decoder: dir.join(SAM_DECODER_FILE),
    })
}

pub async fn is_present(path: &Path) -> bool {
    fs::metadata(path).await.map(|m| m.is_file() && m.len() > 0).unwrap_or(false)
}

/// Stream `url` to `dest`, returning the number of bytes written.
pub async fn download_file(client: &Client, url: &str, dest: &Path) -> AppResult<u64> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }
    let part = dest.with_extension("part");
    let result = match stream_to(client, url, &part).await {
        Ok(0) => Err(AppError::Provider(format!("Download of {} returned an empty body", url))),
        Ok(written) => fs::rename(&part, dest).await.map(|_| written).map_err(AppError::from),
        Err(e) => Err(e),
    };
    if result.is_err() {
        discard_partial(&part).await;
    }
    result
}

async fn stream_to(client: &Client, url: &str, part: &Path) -> AppResult<u64> {
    let mut response = client.get(url).send().await.map_err(AppError::HttpClient)?;
    if !response.status().is_success() {
        return Err(AppError::Provider(format!("Download of {} failed. Status: {}", url, response.status())));
    }

    let mut file = fs::File::create(part).await?;
    let mut written: u64 = 0;
    while let Some(chunk) = response.chunk().await.map_err(AppError::HttpClient)? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

async fn discard_partial(part: &Path) {
    match fs::remove_file(part).await {
        Ok(()) => tracing::debug!(path = %part.display(), "removed partial download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %part.display(), error = %e, "could not remove partial download"),
    }
}
