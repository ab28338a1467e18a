//! Segment-Anything (vit_b) split into an image encoder and a prompt decoder.
//!
//! Encoder: raw RGB pixels as f32[1024,1024,3], resized on the longest side
//! and zero padded bottom-right; normalization is part of the graph. Its single
//! input is looked up by position and the first output is the
//! f32[1,256,64,64] embedding.
//! Decoder: the standard SAM export with `point_coords`, `point_labels`,
//! `mask_input`, `has_mask_input` and `orig_im_size`, returning `masks` as
//! logits at the original resolution.
use std::path::Path;
use std::sync::Mutex;

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::{Array1, Array2, Array3, Array4, ArrayD, Ix4};
use ort::session::Session;
use ort::value::Tensor;

use super::{build_session, ort_err};
use crate::error::{AppError, AppResult};
use crate::vision::{BoundingBox, Mask, Segmenter};

const INPUT_SIDE: u32 = 1024;
const MASK_THRESHOLD: f32 = 0.0;
const BOX_TOP_LEFT: f32 = 2.0;
const BOX_BOTTOM_RIGHT: f32 = 3.0;

pub struct Sam {
    encoder: Mutex<Session>,
    decoder: Mutex<Session>,
}

impl Sam {
    pub fn load(encoder: &Path, decoder: &Path) -> AppResult<Self> {
        Ok(Sam { encoder: Mutex::new(build_session(encoder)?), decoder: Mutex::new(build_session(decoder)?) })
    }

    fn embed(&self, image: &RgbImage) -> AppResult<ArrayD<f32>> {
        let (w, h) = image.dimensions();
        let (nw, nh) = resize_longest(w, h, INPUT_SIDE);
        let resized = imageops::resize(image, nw, nh, FilterType::Triangle);
        let pixels = padded_hwc(&resized, INPUT_SIDE);

        let mut encoder = self
            .encoder
            .lock()
            .map_err(|_| AppError::Inference("SAM encoder lock poisoned".to_string()))?;
        let input_name = encoder
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| AppError::Inference("SAM encoder declares no inputs".to_string()))?;
        let outputs = encoder
            .run(ort::inputs![input_name => Tensor::from_array(pixels).map_err(ort_err("image tensor"))?])
            .map_err(ort_err("SAM encoder inference failed"))?;
        let embeddings = outputs[0]
            .try_extract_array::<f32>()
            .map_err(ort_err("failed to extract image embeddings"))?
            .to_owned();
        Ok(embeddings)
    }
}

/// `side`x`side`x3 float canvas with `image` in the top-left corner.
pub(crate) fn padded_hwc(image: &RgbImage, side: u32) -> Array3<f32> {
    let mut canvas = Array3::<f32>::zeros((side as usize, side as usize, 3));
    for (x, y, px) in image.enumerate_pixels() {
        if x >= side || y >= side {
            continue;
        }
        for c in 0..3 {
            canvas[[y as usize, x as usize, c]] = f32::from(px.0[c]);
        }
    }
    canvas
}

/// Scale so the longer side equals `target`, rounding to the nearest pixel.
pub(crate) fn resize_longest(width: u32, height: u32, target: u32) -> (u32, u32) {
    let scale = target as f32 / width.max(height) as f32;
    ((width as f32 * scale + 0.5) as u32, (height as f32 * scale + 0.5) as u32)
}

/// Box corners mapped into the encoder's resized frame.
pub(crate) fn box_prompt(bbox: &BoundingBox, width: u32, height: u32) -> [[f32; 2]; 2] {
    let (nw, nh) = resize_longest(width, height, INPUT_SIDE);
    let sx = nw as f32 / width as f32;
    let sy = nh as f32 / height as f32;
    [[bbox.x0 as f32 * sx, bbox.y0 as f32 * sy], [bbox.x1 as f32 * sx, bbox.y1 as f32 * sy]]
}

impl Segmenter for Sam {
    fn segment(&self, image: &RgbImage, bbox: &BoundingBox) -> AppResult<Mask> {
        let (w, h) = image.dimensions();
        let embeddings = self.embed(image)?;

        let [[ax, ay], [bx, by]] = box_prompt(bbox, w, h);
        let shape_err = |e: ndarray::ShapeError| AppError::Inference(format!("bad prompt tensor shape: {}", e));
        let point_coords = Array3::from_shape_vec((1, 2, 2), vec![ax, ay, bx, by]).map_err(shape_err)?;
        let point_labels = Array2::from_shape_vec((1, 2), vec![BOX_TOP_LEFT, BOX_BOTTOM_RIGHT]).map_err(shape_err)?;
        let mask_input = Array4::<f32>::zeros((1, 1, 256, 256));
        let has_mask_input = Array1::from_vec(vec![0.0f32]);
        let orig_im_size = Array1::from_vec(vec![h as f32, w as f32]);

        let masks = {
            let mut decoder = self
                .decoder
                .lock()
                .map_err(|_| AppError::Inference("SAM decoder lock poisoned".to_string()))?;
            let outputs = decoder
                .run(ort::inputs![
                    "image_embeddings" => Tensor::from_array(embeddings).map_err(ort_err("embeddings tensor"))?,
                    "point_coords" => Tensor::from_array(point_coords).map_err(ort_err("point_coords tensor"))?,
                    "point_labels" => Tensor::from_array(point_labels).map_err(ort_err("point_labels tensor"))?,
                    "mask_input" => Tensor::from_array(mask_input).map_err(ort_err("mask_input tensor"))?,
                    "has_mask_input" => Tensor::from_array(has_mask_input).map_err(ort_err("has_mask_input tensor"))?,
                    "orig_im_size" => Tensor::from_array(orig_im_size).map_err(ort_err("orig_im_size tensor"))?
                ])
                .map_err(ort_err("SAM decoder inference failed"))?;
            outputs["masks"]
                .try_extract_array::<f32>()
                .map_err(ort_err("failed to extract masks"))?
                .into_dimensionality::<Ix4>()
                .map_err(|e| AppError::Inference(format!("masks shape: {}", e)))?
                .to_owned()
        };

        let shape = masks.shape();
        if shape[2] != h as usize || shape[3] != w as usize {
            return Err(AppError::Inference(format!(
                "SAM returned a {}x{} mask for a {}x{} image",
                shape[3], shape[2], w, h
            )));
        }
        let data: Vec<bool> = masks
            .index_axis(ndarray::Axis(0), 0)
            .index_axis(ndarray::Axis(0), 0)
            .iter()
            .map(|v| *v > MASK_THRESHOLD)
            .collect();
        let mask = Mask::new(w, h, data)?;
        tracing::debug!(coverage = mask.coverage(), "SAM finished");
        Ok(mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_side_becomes_1024() {
        assert_eq!(resize_longest(2048, 1536, 1024), (1024, 768));
        assert_eq!(resize_longest(300, 600, 1024), (512, 1024));
    }

    #[test]
    fn encoder_input_is_raw_pixels_padded_with_zeros() {
        let image = RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 255]));
        let canvas = padded_hwc(&image, 4);
        assert_eq!(canvas.shape(), &[4, 4, 3]);
        assert_eq!((canvas[[1, 2, 0]], canvas[[1, 2, 1]], canvas[[1, 2, 2]]), (10.0, 20.0, 255.0));
        assert_eq!(canvas[[2, 0, 0]], 0.0);
        assert_eq!(canvas[[0, 3, 2]], 0.0);
    }

    #[test]
    fn box_prompt_scales_corners() {
        let b = BoundingBox { x0: 100, y0: 50, x1: 200, y1: 150, score: 1.0 };
        let [[ax, ay], [bx, by]] = box_prompt(&b, 2048, 1536);
        assert_eq!((ax, ay, bx, by), (50.0, 25.0, 100.0, 75.0));
    }
}
