//! Mask feathering and texture compositing.
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::error::{AppError, AppResult};
use crate::vision::Mask;

/// Sigma OpenCV derives for a Gaussian kernel of odd size `ksize` when none is given.
pub fn sigma_for_kernel(ksize: usize) -> f32 {
    0.3 * ((ksize as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

fn gaussian_kernel(ksize: usize) -> Vec<f32> {
    let sigma = sigma_for_kernel(ksize);
    let half = (ksize / 2) as i32;
    let mut k: Vec<f32> = (-half..=half)
        .map(|i| (-((i * i) as f32) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f32 = k.iter().sum();
    k.iter_mut().for_each(|v| *v /= sum);
    k
}

/// Mirror an out-of-range index without repeating the edge sample.
fn reflect101(i: i32, len: i32) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len - 1);
    let mut i = i.rem_euclid(period);
    if i >= len {
        i = period - i;
    }
    i as usize
}

/// Soft alpha matte: the binary mask blurred with a `ksize`×`ksize` Gaussian.
pub fn feather(mask: &Mask, ksize: usize) -> Vec<f32> {
    let (w, h) = (mask.width as usize, mask.height as usize);
    let src: Vec<f32> = mask.data.iter().map(|&v| if v { 1.0 } else { 0.0 }).collect();
    if ksize <= 1 || w == 0 || h == 0 {
        return src;
    }
    let kernel = gaussian_kernel(ksize | 1);
    let half = (kernel.len() / 2) as i32;

    let mut horizontal = vec![0.0f32; w * h];
    for y in 0..h {
        let row = &src[y * w..(y + 1) * w];
        for x in 0..w {
            horizontal[y * w + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| weight * row[reflect101(x as i32 + k as i32 - half, w as i32)])
                .sum();
        }
    }

    let mut out = vec![0.0f32; w * h];
    for y in 0..h {
        for x in 0..w {
            out[y * w + x] = kernel
                .iter()
                .enumerate()
                .map(|(k, weight)| weight * horizontal[reflect101(y as i32 + k as i32 - half, h as i32) * w + x])
                .sum();
        }
    }
    out
}

/// `overlay * alpha + base * (1 - alpha)` per channel, truncated to u8.
pub fn blend(base: &RgbImage, overlay: &RgbImage, alpha: &[f32]) -> AppResult<RgbImage> {
    let (w, h) = base.dimensions();
    if overlay.dimensions() != (w, h) || alpha.len() != (w as usize) * (h as usize) {
        return Err(AppError::Inference(format!(
            "blend inputs disagree: base {}x{}, overlay {}x{}, alpha {}",
            w,
            h,
            overlay.width(),
            overlay.height(),
            alpha.len()
        )));
    }
    let mut out = RgbImage::new(w, h);
    for (i, (dst, (b, o))) in out.pixels_mut().zip(base.pixels().zip(overlay.pixels())).enumerate() {
        let a = alpha[i].clamp(0.0, 1.0);
        for c in 0..3 {
            dst.0[c] = (f32::from(o.0[c]) * a + f32::from(b.0[c]) * (1.0 - a)) as u8;
        }
    }
    Ok(out)
}

/// Stretch a texture to the target size with bilinear filtering.
pub fn fit_texture(texture: &RgbImage, width: u32, height: u32) -> RgbImage {
    if texture.dimensions() == (width, height) {
        return texture.clone();
    }
    imageops::resize(texture, width, height, FilterType::Triangle)
}

/// Lay `texture` over the masked region of `base` with a feathered edge.
pub fn composite(base: &RgbImage, texture: &RgbImage, mask: &Mask, ksize: usize) -> AppResult<RgbImage> {
    if (mask.width, mask.height) != base.dimensions() {
        return Err(AppError::Inference(format!(
            "mask is {}x{} but image is {}x{}",
            mask.width,
            mask.height,
            base.width(),
            base.height()
        )));
    }
    let texture = fit_texture(texture, base.width(), base.height());
    let alpha = feather(mask, ksize);
    blend(base, &texture, &alpha)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn opencv_sigma_for_common_kernels() {
        assert!((sigma_for_kernel(21) - 3.5).abs() < 1e-5);
        assert!((sigma_for_kernel(25) - 4.1).abs() < 1e-5);
    }

    #[test]
    fn kernel_is_normalized_and_symmetric() {
        let k = gaussian_kernel(21);
        assert_eq!(k.len(), 21);
        assert!((k.iter().sum::<f32>() - 1.0).abs() < 1e-5);
        assert!((k[0] - k[20]).abs() < 1e-7);
        assert!(k[10] > k[9]);
    }

    #[test]
    fn reflect101_mirrors_without_edge_repeat() {
        assert_eq!(reflect101(-1, 5), 1);
        assert_eq!(reflect101(-2, 5), 2);
        assert_eq!(reflect101(5, 5), 3);
        assert_eq!(reflect101(2, 5), 2);
        assert_eq!(reflect101(-3, 1), 0);
    }

    #[test]
    fn feather_keeps_solid_regions_and_softens_edges() {
        let mut data = vec![false; 40 * 40];
        for y in 0..40 {
            for x in 0..20 {
                data[y * 40 + x] = true;
            }
        }
        let mask = Mask::new(40, 40, data).unwrap();
        let alpha = feather(&mask, 21);
        assert!((alpha[20 * 40] - 1.0).abs() < 1e-3);
        assert!(alpha[20 * 40 + 39] < 1e-3);
        let edge = alpha[20 * 40 + 19];
        assert!(edge > 0.3 && edge < 0.8, "edge alpha {}", edge);
    }

    #[test]
    fn blend_mixes_by_alpha() {
        let base = RgbImage::from_pixel(2, 1, Rgb([0, 100, 200]));
        let over = RgbImage::from_pixel(2, 1, Rgb([200, 100, 0]));
        let out = blend(&base, &over, &[1.0, 0.5]).unwrap();
        assert_eq!(out.get_pixel(0, 0), &Rgb([200, 100, 0]));
        assert_eq!(out.get_pixel(1, 0), &Rgb([100, 100, 100]));
    }

    #[test]
    fn blend_rejects_mismatched_inputs() {
        let base = RgbImage::new(2, 2);
        let over = RgbImage::new(2, 1);
        assert!(blend(&base, &over, &[0.0; 4]).is_err());
    }

    #[test]
    fn composite_stretches_the_texture() {
        let base = RgbImage::from_pixel(8, 8, Rgb([0, 0, 0]));
        let texture = RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]));
        let mask = Mask::new(8, 8, vec![true; 64]).unwrap();
        let out = composite(&base, &texture, &mask, 1).unwrap();
        assert_eq!(out.dimensions(), (8, 8));
        assert!(out.get_pixel(4, 4).0.iter().all(|c| *c >= 254));
    }
}
