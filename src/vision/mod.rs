//! Local detection and segmentation.
//!
//! A caption-driven detector (GroundingDINO) proposes boxes, a box-prompted
//! segmenter (SAM) turns the chosen box into a per-pixel mask. Both models are
//! loaded once at start-up and shared across requests; inference is blocking
//! and is expected to run on `spawn_blocking`.
use std::sync::Arc;

use image::RgbImage;

use crate::config::Config;
use crate::error::{AppError, AppResult};

pub mod compose;
pub mod models;
#[cfg(feature = "onnx")]
pub mod onnx;

/// Axis-aligned box in pixel coordinates, `x1`/`y1` exclusive.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
    pub score: f32,
}

impl BoundingBox {
    /// Convert a normalized `(cx, cy, w, h)` detection into pixel corners,
    /// truncating toward zero and clamping to the image.
    pub fn from_normalized_cxcywh(cxcywh: [f32; 4], width: u32, height: u32, score: f32) -> Self {
        let (w, h) = (width as f32, height as f32);
        let [cx, cy, bw, bh] = [cxcywh[0] * w, cxcywh[1] * h, cxcywh[2] * w, cxcywh[3] * h];
        let clamp_x = |v: f32| (v as i32).clamp(0, width as i32);
        let clamp_y = |v: f32| (v as i32).clamp(0, height as i32);
        BoundingBox {
            x0: clamp_x(cx - bw / 2.0),
            y0: clamp_y(cy - bh / 2.0),
            x1: clamp_x(cx + bw / 2.0),
            y1: clamp_y(cy + bh / 2.0),
            score,
        }
    }

    pub fn area(&self) -> i64 {
        i64::from((self.x1 - self.x0).max(0)) * i64::from((self.y1 - self.y0).max(0))
    }
}

/// Binary per-pixel mask, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    pub width: u32,
    pub height: u32,
    pub data: Vec<bool>,
}

impl Mask {
    pub fn new(width: u32, height: u32, data: Vec<bool>) -> AppResult<Self> {
        if data.len() != (width as usize) * (height as usize) {
            return Err(AppError::Inference(format!(
                "mask has {} pixels, expected {}x{}",
                data.len(),
                width,
                height
            )));
        }
        Ok(Mask { width, height, data })
    }

    /// Mask covering exactly `bbox`.
    pub fn from_box(width: u32, height: u32, bbox: &BoundingBox) -> Self {
        let mut data = vec![false; (width as usize) * (height as usize)];
        for y in bbox.y0.max(0)..bbox.y1.min(height as i32) {
            for x in bbox.x0.max(0)..bbox.x1.min(width as i32) {
                data[y as usize * width as usize + x as usize] = true;
            }
        }
        Mask { width, height, data }
    }

    pub fn coverage(&self) -> usize {
        self.data.iter().filter(|v| **v).count()
    }
}

#[derive(Clone, Debug)]
pub struct DetectionQuery {
    pub caption: String,
    pub box_threshold: f32,
    pub text_threshold: f32,
}

pub trait Detector: Send + Sync {
    /// Boxes matching `query.caption`, best first.
    fn detect(&self, image: &RgbImage, query: &DetectionQuery) -> AppResult<Vec<BoundingBox>>;
}

pub trait Segmenter: Send + Sync {
    fn segment(&self, image: &RgbImage, bbox: &BoundingBox) -> AppResult<Mask>;
}

/// Stand-in used when the local models could not be loaded. The service still
/// serves every workflow that only needs the remote providers.
pub struct UnavailableVision {
    reason: String,
}

impl UnavailableVision {
    pub fn new(reason: impl Into<String>) -> Self {
        UnavailableVision { reason: reason.into() }
    }
}

impl Detector for UnavailableVision {
    fn detect(&self, _image: &RgbImage, _query: &DetectionQuery) -> AppResult<Vec<BoundingBox>> {
        Err(AppError::Inference(format!("local detector unavailable: {}", self.reason)))
    }
}

impl Segmenter for UnavailableVision {
    fn segment(&self, _image: &RgbImage, _bbox: &BoundingBox) -> AppResult<Mask> {
        Err(AppError::Inference(format!("local segmenter unavailable: {}", self.reason)))
    }
}

/// Loaded model pair plus a human-readable status for `/health`.
pub struct LocalVision {
    pub detector: Arc<dyn Detector>,
    pub segmenter: Arc<dyn Segmenter>,
    pub status: String,
}

impl LocalVision {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let stub = Arc::new(UnavailableVision::new(reason.clone()));
        LocalVision { detector: stub.clone(), segmenter: stub, status: format!("unavailable: {}", reason) }
    }
}

/// Fetch missing checkpoints and load both models. Failures degrade to
/// `UnavailableVision` instead of stopping the service.
pub async fn load_local_vision(config: &Config) -> LocalVision {
    let files = match models::ensure_checkpoints(config).await {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!(error = %e, "local vision checkpoints missing, wall/floor workflows disabled");
            return LocalVision::unavailable(e.to_string());
        }
    };
    load_from_files(files).await
}

#[cfg(feature = "onnx")]
async fn load_from_files(files: models::ModelFiles) -> LocalVision {
    tracing::info!("Loading GroundingDINO + SAM (CPU)");
    let loaded = tokio::task::spawn_blocking(move || -> AppResult<LocalVision> {
        let detector = onnx::GroundingDino::load(&files.dino_model, &files.dino_tokenizer)?;
        let segmenter = onnx::Sam::load(&files.sam_encoder, &files.sam_decoder)?;
        Ok(LocalVision { detector: Arc::new(detector), segmenter: Arc::new(segmenter), status: "ready".to_string() })
    })
    .await;
    match loaded {
        Ok(Ok(vision)) => vision,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "failed to load local vision models");
            LocalVision::unavailable(e.to_string())
        }
        Err(e) => LocalVision::unavailable(e.to_string()),
    }
}

#[cfg(not(feature = "onnx"))]
async fn load_from_files(_files: models::ModelFiles) -> LocalVision {
    LocalVision::unavailable("built without the `onnx` feature")
}

/// Highest-scoring box, ties broken by larger area.
pub fn best_box(boxes: &[BoundingBox]) -> Option<BoundingBox> {
    boxes.iter().copied().fold(None, |best, b| match best {
        None => Some(b),
        Some(cur) if b.score > cur.score || (b.score == cur.score && b.area() > cur.area()) => Some(b),
        keep => keep,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalized_box_converts_to_pixel_corners() {
        let b = BoundingBox::from_normalized_cxcywh([0.5, 0.5, 0.5, 0.25], 200, 100, 0.9);
        assert_eq!((b.x0, b.y0, b.x1, b.y1), (50, 37, 150, 62));
    }

    #[test]
    fn normalized_box_is_clamped() {
        let b = BoundingBox::from_normalized_cxcywh([0.05, 0.95, 0.5, 0.5], 100, 100, 0.5);
        assert_eq!((b.x0, b.y0, b.x1, b.y1), (0, 70, 30, 100));
    }

    #[test]
    fn best_box_prefers_score_then_area() {
        let small = BoundingBox { x0: 0, y0: 0, x1: 2, y1: 2, score: 0.8 };
        let large = BoundingBox { x0: 0, y0: 0, x1: 4, y1: 4, score: 0.8 };
        let weak = BoundingBox { x0: 0, y0: 0, x1: 9, y1: 9, score: 0.4 };
        assert_eq!(best_box(&[weak, small, large]), Some(large));
        assert_eq!(best_box(&[]), None);
    }

    #[test]
    fn mask_from_box_covers_the_box() {
        let b = BoundingBox { x0: 1, y0: 1, x1: 3, y1: 2, score: 1.0 };
        let m = Mask::from_box(4, 3, &b);
        assert_eq!(m.coverage(), 2);
        assert!(m.data[4 + 1] && m.data[4 + 2]);
    }

    #[test]
    fn mask_size_is_checked() {
        assert!(Mask::new(2, 2, vec![true; 3]).is_err());
    }
}
