//! Env-driven configuration for the service and library.
//!
//! Values are read from the process environment; `dotenv` is loaded on demand
//! by the binaries. The two provider keys are required, everything else has a
//! development default.
use std::env;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

const BERT_TOKENIZER_URL: &str = "https://huggingface.co/bert-base-uncased/resolve/main/tokenizer.json";
const DINO_MODEL_URL: &str =
    "https://github.com/CVHub520/X-AnyLabeling/releases/download/v1.0.0/groundingdino_swint_ogc_quant.onnx";
const SAM_ENCODER_URL: &str =
    "https://huggingface.co/vietanhdev/segment-anything-onnx-models/resolve/main/sam_vit_b_01ec64.encoder.onnx";
const SAM_DECODER_URL: &str =
    "https://huggingface.co/vietanhdev/segment-anything-onnx-models/resolve/main/sam_vit_b_01ec64.decoder.onnx";

#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: String,
    pub openai_api_key: String,
    pub gemini_base_url: String,
    pub openai_base_url: String,
    pub gemini_model: String,
    pub openai_model: String,
    pub api_host: String,
    pub api_port: String,
    pub static_dir: PathBuf,
    pub models_dir: PathBuf,
    pub dino_model_url: Option<String>,
    pub dino_tokenizer_url: Option<String>,
    pub sam_encoder_url: Option<String>,
    pub sam_decoder_url: Option<String>,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn dotenv_load() {
        dotenv::dotenv().ok();
    }

    pub fn new() -> AppResult<Self> {
        Self::build(true)
    }

    /// Same as `new` but without the provider keys, for commands that never
    /// reach a provider (palette listing, checkpoint management).
    pub fn offline() -> AppResult<Self> {
        Self::build(false)
    }

    fn build(with_keys: bool) -> AppResult<Self> {
        let key = |name: &str| if with_keys { required(name) } else { Ok(optional(name).unwrap_or_default()) };
        let max_upload_bytes = match env::var("MAX_UPLOAD_BYTES") {
            Ok(v) => v
                .parse()
                .map_err(|_| AppError::Config(format!("MAX_UPLOAD_BYTES is not a number: {}", v)))?,
            Err(_) => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Config {
            gemini_api_key: key("GEMINI_API_KEY")?,
            openai_api_key: key("OPENAI_API_KEY")?,
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".to_string()),
            openai_base_url: env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            gemini_model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-2.5-flash-image".to_string()),
            openai_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: env::var("PORT").unwrap_or_else(|_| "10000".to_string()),
            static_dir: PathBuf::from(env::var("STATIC_DIR").unwrap_or_else(|_| "./static".to_string())),
            models_dir: PathBuf::from(env::var("MODELS_DIR").unwrap_or_else(|_| "./weights".to_string())),
            dino_model_url: Some(optional("DINO_MODEL_URL").unwrap_or_else(|| DINO_MODEL_URL.to_string())),
            dino_tokenizer_url: Some(optional("DINO_TOKENIZER_URL").unwrap_or_else(|| BERT_TOKENIZER_URL.to_string())),
            sam_encoder_url: Some(optional("SAM_ENCODER_URL").unwrap_or_else(|| SAM_ENCODER_URL.to_string())),
            sam_decoder_url: Some(optional("SAM_DECODER_URL").unwrap_or_else(|| SAM_DECODER_URL.to_string())),
            max_upload_bytes,
        })
    }

    pub fn output_dir(&self) -> PathBuf {
        self.static_dir.join("output")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.static_dir.join("tmp")
    }

    pub fn texture_dir(&self) -> PathBuf {
        self.static_dir.join("textures")
    }

    pub fn print_env_vars(&self) {
        tracing::info!("GEMINI_API_KEY: {}", redact(&self.gemini_api_key));
        tracing::info!("OPENAI_API_KEY: {}", redact(&self.openai_api_key));
        tracing::info!("GEMINI_MODEL: {} ({})", self.gemini_model, self.gemini_base_url);
        tracing::info!("OPENAI_MODEL: {} ({})", self.openai_model, self.openai_base_url);
        tracing::info!("STATIC_DIR: {}", self.static_dir.display());
        tracing::info!("MODELS_DIR: {}", self.models_dir.display());
        tracing::info!("API_HOST: {}", self.api_host);
        tracing::info!("PORT: {}", self.api_port);
    }
}

fn required(key: &str) -> AppResult<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(AppError::Config(format!("{} is not set", key))),
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn redact(secret: &str) -> String {
    let count = secret.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = secret.chars().skip(count - 4).collect();
    format!("****{}", tail)
}
