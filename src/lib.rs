//! Product photo studio library
//!
//! Modules:
//! - `api`: Axum HTTP handlers, HTML pages and router setup used by the binary.
//! - `workflows`: The six editing workflows and the `Studio` they share.
//! - `providers`: Gemini and OpenAI clients behind the `ImageEditor` / `VisionChat` traits.
//! - `vision`: Local GroundingDINO + SAM inference, checkpoint download, mask compositing.
//! - `prompt`: Prompt construction with `{{placeholder}}` replacement and the workflow templates.
//! - `palette`: Fabric color to texture lookup.
//! - `utils`: Output file management and image codecs.
//! - `config`: Env-driven configuration loader.
//! - `error`: Common error type and alias.
//!
//! Re-exports are provided for common types: `Config`, `Studio`, `GeminiClient`,
//! `OpenAiClient` and `PromptConstructor`.
pub mod api;
pub mod config;
pub mod error;
pub mod palette;
pub mod prompt;
pub mod providers;
pub mod utils;
pub mod vision;
pub mod workflows;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use prompt::constructor::PromptConstructor;
pub use providers::{GeminiClient, OpenAiClient};
pub use workflows::Studio;
