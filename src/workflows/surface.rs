//! Wall and floor replacement.
//!
//! The target photo is searched for the surface caption, the best box is
//! segmented, the uploaded texture is feathered into the mask and the
//! composite is sent to the image editor for a clean-up pass.
use crate::error::{AppError, AppResult};
use crate::prompt::templates;
use crate::providers::{EditRequest, Part};
use crate::utils::files::Stamp;
use crate::utils::imaging;
use crate::vision::{best_box, compose, DetectionQuery};
use crate::workflows::{Studio, UploadForm, EDITOR_NAME};

#[derive(Clone, Copy, Debug)]
pub struct SurfaceJob {
    pub label: &'static str,
    pub texture_field: &'static str,
    pub caption: &'static str,
    pub box_threshold: f32,
    pub text_threshold: f32,
    pub feather_kernel: usize,
    pub composite_stem: &'static str,
    pub final_stem: &'static str,
    pub refine_prompt: &'static str,
}

pub const TARGET_FIELD: &str = "target_image";

pub const WALL: SurfaceJob = SurfaceJob {
    label: "wall",
    texture_field: "wall_image",
    caption: "wall",
    box_threshold: 0.32,
    text_threshold: 0.25,
    feather_kernel: 21,
    composite_stem: "sam_wall",
    final_stem: "final_wall",
    refine_prompt: templates::WALL_REFINE,
};

pub const FLOOR: SurfaceJob = SurfaceJob {
    label: "floor",
    texture_field: "floor_image",
    caption: "floor, flooring, ground",
    box_threshold: 0.30,
    text_threshold: 0.25,
    feather_kernel: 25,
    composite_stem: "sam_floor",
    final_stem: "final_floor",
    refine_prompt: templates::FLOOR_REFINE,
};

impl SurfaceJob {
    fn query(&self) -> DetectionQuery {
        DetectionQuery {
            caption: self.caption.to_string(),
            box_threshold: self.box_threshold,
            text_threshold: self.text_threshold,
        }
    }
}

pub async fn replace_wall(studio: &Studio, form: &UploadForm) -> AppResult<String> {
    replace_surface(studio, form, &WALL).await
}

pub async fn replace_floor(studio: &Studio, form: &UploadForm) -> AppResult<String> {
    replace_surface(studio, form, &FLOOR).await
}

/// Returns the file name of the refined image in the output directory.
pub async fn replace_surface(studio: &Studio, form: &UploadForm, job: &SurfaceJob) -> AppResult<String> {
    let target = form.require_file(TARGET_FIELD)?;
    let texture = form.require_file(job.texture_field)?;
    let stamp = Stamp::now();

    let temp_path = studio.store.write_output(&stamp.name("temp", "jpg"), &target.bytes).await?;
    let result = composite_and_refine(studio, &temp_path, texture.bytes.clone(), job, &stamp).await;
    studio.store.discard(&temp_path).await;
    result
}

async fn composite_and_refine(
    studio: &Studio,
    temp_path: &std::path::Path,
    texture_bytes: Vec<u8>,
    job: &SurfaceJob,
    stamp: &Stamp,
) -> AppResult<String> {
    let target_bytes = tokio::fs::read(temp_path).await?;
    let detector = studio.detector.clone();
    let segmenter = studio.segmenter.clone();
    let job_copy = *job;

    let composite_png = tokio::task::spawn_blocking(move || -> AppResult<Vec<u8>> {
        let image = imaging::decode_rgb(&target_bytes)?;
        let boxes = detector.detect(&image, &job_copy.query())?;
        let bbox = best_box(&boxes).ok_or_else(|| AppError::NoDetection(job_copy.label.to_string()))?;
        tracing::info!(surface = job_copy.label, candidates = boxes.len(), score = bbox.score, "surface detected");

        let mask = segmenter.segment(&image, &bbox)?;
        let texture = imaging::decode_rgb(&texture_bytes)?;
        let blended = compose::composite(&image, &texture, &mask, job_copy.feather_kernel)?;
        imaging::encode_png(&blended)
    })
    .await??;

    let composite_name = stamp.name(job.composite_stem, "png");
    studio.store.write_output(&composite_name, &composite_png).await?;
    tracing::info!(surface = job.label, file = %composite_name, "composite written, refining");

    let generation = studio
        .editor
        .generate(EditRequest::new(vec![Part::text(job.refine_prompt), Part::png(composite_png)]))
        .await?;
    let refined = generation
        .into_first_image()
        .ok_or_else(|| AppError::NoImageReturned(EDITOR_NAME.to_string()))?;

    let final_name = stamp.name(job.final_stem, "png");
    studio.store.write_output(&final_name, &refined).await?;
    tracing::info!(surface = job.label, file = %final_name, "surface replaced");
    Ok(final_name)
}
