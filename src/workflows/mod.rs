//! Editing workflows.
//!
//! Each workflow is a straight line: validate the form, decode the uploads,
//! optionally run local detection/segmentation, build the prompt, call the
//! provider, unwrap the first inline image and persist it. All external
//! capabilities come from `Studio`, built once at start-up.
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::error::AppResult;
use crate::providers::{GeminiClient, ImageEditor, OpenAiClient, VisionChat};
use crate::utils::files::OutputStore;
use crate::vision::{self, Detector, LocalVision, Segmenter};

pub mod form;
pub mod multicolor;
pub mod object_change;
pub mod product_color;
pub mod product_replace;
pub mod surface;

pub use form::{Upload, UploadForm};

/// Name used in `NoImageReturned` errors for the image editor.
pub(crate) const EDITOR_NAME: &str = "Gemini";

#[derive(Clone)]
pub struct Studio {
    pub editor: Arc<dyn ImageEditor>,
    pub vision_chat: Arc<dyn VisionChat>,
    pub detector: Arc<dyn Detector>,
    pub segmenter: Arc<dyn Segmenter>,
    pub store: OutputStore,
    pub texture_dir: PathBuf,
    pub vision_status: String,
}

impl Studio {
    /// Build provider clients, load local models and create the output dirs.
    pub async fn from_config(config: &Config) -> AppResult<Self> {
        let local = vision::load_local_vision(config).await;
        Self::assemble(config, local).await
    }

    /// Provider-only studio; wall and floor replacement report the local
    /// models as unavailable.
    pub async fn without_local_vision(config: &Config) -> AppResult<Self> {
        Self::assemble(config, LocalVision::unavailable("local models not loaded")).await
    }

    async fn assemble(config: &Config, local: LocalVision) -> AppResult<Self> {
        let store = OutputStore::new(config.output_dir(), config.tmp_dir());
        store.ensure_dirs().await?;

        let editor = GeminiClient::new(
            config.gemini_base_url.clone(),
            config.gemini_model.clone(),
            config.gemini_api_key.clone(),
        );
        let vision_chat = OpenAiClient::new(
            config.openai_base_url.clone(),
            config.openai_model.clone(),
            config.openai_api_key.clone(),
        );
        tracing::info!(vision = %local.status, "local vision");

        Ok(Studio {
            editor: Arc::new(editor),
            vision_chat: Arc::new(vision_chat),
            detector: local.detector,
            segmenter: local.segmenter,
            store,
            texture_dir: config.texture_dir(),
            vision_status: local.status,
        })
    }
}
