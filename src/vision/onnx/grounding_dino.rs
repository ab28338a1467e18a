//! GroundingDINO (Swin-T OGC) exported to ONNX.
//!
//! Inputs: `img` f32[1,3,H,W], `input_ids` i64[1,L], `attention_mask` bool[1,L],
//! `position_ids` i64[1,L], `token_type_ids` i64[1,L], `text_token_mask` bool[1,L,L].
//! Outputs, by position: logits f32[1,Q,256] (pre-sigmoid), then boxes
//! f32[1,Q,4] as normalized `(cx, cy, w, h)`.
use std::path::Path;
use std::sync::Mutex;

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{Array2, Array3, Ix3};
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::Tokenizer;

use super::{build_session, normalized_chw, ort_err};
use crate::error::{AppError, AppResult};
use crate::vision::{BoundingBox, DetectionQuery, Detector};

const SHORT_SIDE: u32 = 800;
const MAX_SIDE: u32 = 1333;
const MAX_TEXT_LEN: usize = 256;
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// `[CLS]`, `[SEP]`, `.` and `?` in the bert-base-uncased vocabulary.
const SPECIAL_TOKENS: [i64; 4] = [101, 102, 1012, 1029];

pub struct GroundingDino {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
}

impl GroundingDino {
    pub fn load(model: &Path, tokenizer: &Path) -> AppResult<Self> {
        let session = build_session(model)?;
        let tokenizer = Tokenizer::from_file(tokenizer)
            .map_err(|e| AppError::Inference(format!("failed to load tokenizer {}: {}", tokenizer.display(), e)))?;
        Ok(GroundingDino { session: Mutex::new(session), tokenizer })
    }

    fn tokenize(&self, caption: &str) -> AppResult<Vec<i64>> {
        let encoding = self
            .tokenizer
            .encode(caption, true)
            .map_err(|e| AppError::Inference(format!("failed to tokenize caption: {}", e)))?;
        let mut ids: Vec<i64> = encoding.get_ids().iter().map(|&id| i64::from(id)).collect();
        ids.truncate(MAX_TEXT_LEN);
        Ok(ids)
    }
}

/// Lower-case, trimmed and terminated with a period.
pub(crate) fn preprocess_caption(caption: &str) -> String {
    let c = caption.trim().to_lowercase();
    if c.ends_with('.') { c } else { format!("{}.", c) }
}

/// Short side to 800 unless that pushes the long side past 1333.
pub(crate) fn resized_dims(width: u32, height: u32) -> (u32, u32) {
    let (min_side, max_side) = (width.min(height) as f32, width.max(height) as f32);
    let mut size = SHORT_SIDE as f32;
    if max_side / min_side * size > MAX_SIDE as f32 {
        size = (MAX_SIDE as f32 * min_side / max_side).round();
    }
    if width <= height {
        (size as u32, (size * height as f32 / width as f32) as u32)
    } else {
        ((size * width as f32 / height as f32) as u32, size as u32)
    }
}

pub(crate) struct TextMasks {
    pub position_ids: Vec<i64>,
    /// Row-major `len x len` block-diagonal attention between phrase tokens.
    pub self_attention: Vec<bool>,
}

/// Phrases delimited by special tokens attend only to themselves and restart
/// their position ids at zero.
pub(crate) fn text_masks(ids: &[i64]) -> TextMasks {
    let len = ids.len();
    let mut attention = vec![false; len * len];
    for i in 0..len {
        attention[i * len + i] = true;
    }
    let mut position_ids = vec![0i64; len];
    let mut previous = 0usize;
    for (col, id) in ids.iter().enumerate() {
        if !SPECIAL_TOKENS.contains(id) {
            continue;
        }
        if col == 0 || col == len - 1 {
            position_ids[col] = 0;
        } else {
            for r in previous + 1..=col {
                for c in previous + 1..=col {
                    attention[r * len + c] = true;
                }
                position_ids[r] = (r - previous - 1) as i64;
            }
        }
        previous = col;
    }
    TextMasks { position_ids, self_attention: attention }
}

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

impl Detector for GroundingDino {
    fn detect(&self, image: &RgbImage, query: &DetectionQuery) -> AppResult<Vec<BoundingBox>> {
        let (w, h) = image.dimensions();
        let caption = preprocess_caption(&query.caption);
        let ids = self.tokenize(&caption)?;
        let len = ids.len();
        let masks = text_masks(&ids);

        let (rw, rh) = resized_dims(w, h);
        let resized = imageops::resize(image, rw, rh, FilterType::Triangle);
        let pixels = normalized_chw(&resized, 1.0 / 255.0, MEAN, STD, (rw, rh));

        let shape_err = |e: ndarray::ShapeError| AppError::Inference(format!("bad text tensor shape: {}", e));
        let input_ids = Array2::from_shape_vec((1, len), ids).map_err(shape_err)?;
        let attention_mask = Array2::from_elem((1, len), true);
        let position_ids = Array2::from_shape_vec((1, len), masks.position_ids).map_err(shape_err)?;
        let token_type_ids = Array2::<i64>::zeros((1, len));
        let text_token_mask = Array3::from_shape_vec((1, len, len), masks.self_attention).map_err(shape_err)?;

        let (logits, boxes) = {
            let mut session = self
                .session
                .lock()
                .map_err(|_| AppError::Inference("GroundingDINO session lock poisoned".to_string()))?;
            let outputs = session
                .run(ort::inputs![
                    "img" => Tensor::from_array(pixels).map_err(ort_err("img tensor"))?,
                    "input_ids" => Tensor::from_array(input_ids).map_err(ort_err("input_ids tensor"))?,
                    "attention_mask" => Tensor::from_array(attention_mask).map_err(ort_err("attention_mask tensor"))?,
                    "position_ids" => Tensor::from_array(position_ids).map_err(ort_err("position_ids tensor"))?,
                    "token_type_ids" => Tensor::from_array(token_type_ids).map_err(ort_err("token_type_ids tensor"))?,
                    "text_token_mask" => Tensor::from_array(text_token_mask).map_err(ort_err("text_token_mask tensor"))?
                ])
                .map_err(ort_err("GroundingDINO inference failed"))?;
            let logits = outputs[0]
                .try_extract_array::<f32>()
                .map_err(ort_err("failed to extract logits"))?
                .into_dimensionality::<Ix3>()
                .map_err(|e| AppError::Inference(format!("logits shape: {}", e)))?
                .to_owned();
            let boxes = outputs[1]
                .try_extract_array::<f32>()
                .map_err(ort_err("failed to extract boxes"))?
                .into_dimensionality::<Ix3>()
                .map_err(|e| AppError::Inference(format!("boxes shape: {}", e)))?
                .to_owned();
            (logits, boxes)
        };

        let queries = logits.shape()[1].min(boxes.shape()[1]);
        let tokens = logits.shape()[2].min(len);
        let mut found = Vec::new();
        for q in 0..queries {
            let scores: Vec<f32> = (0..tokens).map(|t| sigmoid(logits[[0, q, t]])).collect();
            let best = scores.iter().copied().fold(0.0f32, f32::max);
            if best <= query.box_threshold {
                continue;
            }
            let phrase_tokens = scores.iter().filter(|s| **s > query.text_threshold).count();
            tracing::trace!(query = q, score = best, phrase_tokens, "detection kept");
            let cxcywh = [boxes[[0, q, 0]], boxes[[0, q, 1]], boxes[[0, q, 2]], boxes[[0, q, 3]]];
            found.push(BoundingBox::from_normalized_cxcywh(cxcywh, w, h, best));
        }
        found.sort_by(|a, b| b.score.total_cmp(&a.score));
        tracing::debug!(caption = %caption, boxes = found.len(), "GroundingDINO finished");
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caption_is_normalized() {
        assert_eq!(preprocess_caption("  Wall "), "wall.");
        assert_eq!(preprocess_caption("floor, flooring, ground."), "floor, flooring, ground.");
    }

    #[test]
    fn resize_keeps_aspect_and_caps_long_side() {
        assert_eq!(resized_dims(640, 480), (1066, 800));
        assert_eq!(resized_dims(480, 640), (800, 1066));
        assert_eq!(resized_dims(3000, 1000), (1332, 444));
    }

    #[test]
    fn text_masks_isolate_phrases() {
        // [CLS] floor , flooring . [SEP]
        let ids = [101, 2723, 1010, 8343, 1012, 102];
        let m = text_masks(&ids);
        assert_eq!(m.position_ids, vec![0, 0, 1, 2, 3, 0]);
        let len = ids.len();
        assert!(m.self_attention[1 * len + 4]);
        assert!(m.self_attention[4 * len + 1]);
        assert!(!m.self_attention[0 * len + 1]);
        assert!(!m.self_attention[5 * len + 4]);
        assert!(m.self_attention[5 * len + 5]);
    }

    #[test]
    fn sigmoid_is_centered() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
    }
}
