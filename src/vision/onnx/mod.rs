//! ONNX Runtime backends for the local vision models.
//!
//! Sessions run on CPU. `Session::run` needs exclusive access, so each session
//! sits behind a `Mutex`; callers are already on blocking threads.
use std::fmt::Display;
use std::path::Path;

use image::RgbImage;
use ndarray::Array4;
use ort::session::{builder::GraphOptimizationLevel, Session};

use crate::error::{AppError, AppResult};

mod grounding_dino;
mod sam;

pub use grounding_dino::GroundingDino;
pub use sam::Sam;

pub(crate) fn ort_err<E: Display>(context: &'static str) -> impl FnOnce(E) -> AppError {
    move |e| AppError::Inference(format!("{}: {}", context, e))
}

pub(crate) fn build_session(path: &Path) -> AppResult<Session> {
    let threads = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
    tracing::debug!(model = %path.display(), threads, "creating ONNX session");
    Session::builder()
        .map_err(ort_err("failed to create session builder"))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(ort_err("failed to set optimization level"))?
        .with_intra_threads(threads)
        .map_err(ort_err("failed to set intra-op threads"))?
        .commit_from_file(path)
        .map_err(ort_err("failed to load ONNX model"))
}

/// NCHW float tensor of `image`, normalized per channel as `(v * scale - mean) / std`.
pub(crate) fn normalized_chw(image: &RgbImage, scale: f32, mean: [f32; 3], std: [f32; 3], canvas: (u32, u32)) -> Array4<f32> {
    let (cw, ch) = canvas;
    let mut tensor = Array4::<f32>::zeros((1, 3, ch as usize, cw as usize));
    for (x, y, px) in image.enumerate_pixels() {
        if x >= cw || y >= ch {
            continue;
        }
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = (f32::from(px.0[c]) * scale - mean[c]) / std[c];
        }
    }
    tensor
}
