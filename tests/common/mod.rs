//! Shared test infrastructure: scripted providers, fixed local vision and
//! a `Studio` rooted in a temp dir.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use tempfile::TempDir;

use product_studio::providers::{EditRequest, Generation, ImageEditor, Part, VisionChat};
use product_studio::utils::files::OutputStore;
use product_studio::vision::{BoundingBox, DetectionQuery, Detector, Mask, Segmenter};
use product_studio::{AppError, AppResult, Studio};

pub fn solid_png(w: u32, h: u32, color: [u8; 3]) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(color)))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

pub fn solid_jpeg(w: u32, h: u32, color: [u8; 3]) -> Vec<u8> {
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb(color)))
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

/// What the scripted editor answers with, one entry per call.
#[derive(Clone, Debug)]
pub enum Reply {
    Image(Vec<u8>),
    Text(String),
    Fail(String),
}

/// Image editor that replays a script and records every request. Once the
/// script runs out it keeps answering with `fallback`.
pub struct ScriptedEditor {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    pub requests: Mutex<Vec<EditRequest>>,
}

impl ScriptedEditor {
    pub fn new(script: Vec<Reply>, fallback: Reply) -> Arc<Self> {
        Arc::new(ScriptedEditor {
            script: Mutex::new(script.into()),
            fallback,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn always(reply: Reply) -> Arc<Self> {
        Self::new(Vec::new(), reply)
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn request(&self, i: usize) -> EditRequest {
        self.requests.lock().unwrap()[i].clone()
    }
}

#[async_trait]
impl ImageEditor for ScriptedEditor {
    async fn generate(&self, request: EditRequest) -> AppResult<Generation> {
        self.requests.lock().unwrap().push(request);
        let reply = self.script.lock().unwrap().pop_front().unwrap_or_else(|| self.fallback.clone());
        match reply {
            Reply::Image(data) => Ok(Generation { parts: vec![Part::text("done"), Part::png(data)] }),
            Reply::Text(t) => Ok(Generation { parts: vec![Part::Text(t)] }),
            Reply::Fail(msg) => Err(AppError::Provider(msg)),
        }
    }
}

pub struct FixedChat {
    answer: String,
    pub prompts: Mutex<Vec<String>>,
}

impl FixedChat {
    pub fn new(answer: &str) -> Arc<Self> {
        Arc::new(FixedChat { answer: answer.to_string(), prompts: Mutex::new(Vec::new()) })
    }
}

#[async_trait]
impl VisionChat for FixedChat {
    async fn ask_about_image(&self, prompt: &str, jpeg: &[u8]) -> AppResult<String> {
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "vision chat expects a JPEG");
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.answer.clone())
    }
}

/// Detector returning the same boxes for every query; records captions.
pub struct FixedDetector {
    boxes: Vec<BoundingBox>,
    pub queries: Mutex<Vec<DetectionQuery>>,
}

impl FixedDetector {
    pub fn new(boxes: Vec<BoundingBox>) -> Arc<Self> {
        Arc::new(FixedDetector { boxes, queries: Mutex::new(Vec::new()) })
    }

    pub fn whole_image(w: u32, h: u32) -> Arc<Self> {
        Self::new(vec![BoundingBox { x0: 0, y0: 0, x1: w as i32, y1: h as i32, score: 0.9 }])
    }
}

impl Detector for FixedDetector {
    fn detect(&self, _image: &RgbImage, query: &DetectionQuery) -> AppResult<Vec<BoundingBox>> {
        self.queries.lock().unwrap().push(query.clone());
        Ok(self.boxes.clone())
    }
}

/// Segmenter that fills the box.
pub struct BoxSegmenter;

impl Segmenter for BoxSegmenter {
    fn segment(&self, image: &RgbImage, bbox: &BoundingBox) -> AppResult<Mask> {
        Ok(Mask::from_box(image.width(), image.height(), bbox))
    }
}

pub struct Harness {
    pub dir: TempDir,
    pub studio: Studio,
}

impl Harness {
    pub fn output_dir(&self) -> PathBuf {
        self.dir.path().join("output")
    }

    pub fn tmp_dir(&self) -> PathBuf {
        self.dir.path().join("tmp")
    }

    pub fn texture_dir(&self) -> PathBuf {
        self.dir.path().join("textures")
    }

    pub fn output_files(&self) -> Vec<String> {
        list(&self.output_dir())
    }

    pub fn tmp_files(&self) -> Vec<String> {
        list(&self.tmp_dir())
    }
}

pub fn list(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|rd| rd.filter_map(|e| e.ok()).map(|e| e.file_name().to_string_lossy().into_owned()).collect())
        .unwrap_or_default();
    names.sort();
    names
}

pub fn harness(editor: Arc<dyn ImageEditor>, chat: Arc<dyn VisionChat>, detector: Arc<dyn Detector>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = OutputStore::new(dir.path().join("output"), dir.path().join("tmp"));
    std::fs::create_dir_all(store.output_dir()).unwrap();
    std::fs::create_dir_all(store.tmp_dir()).unwrap();
    std::fs::create_dir_all(dir.path().join("textures")).unwrap();
    let studio = Studio {
        editor,
        vision_chat: chat,
        detector,
        segmenter: Arc::new(BoxSegmenter),
        store,
        texture_dir: dir.path().join("textures"),
        vision_status: "ready".to_string(),
    };
    Harness { dir, studio }
}

/// Harness whose editor always returns a small blue PNG.
pub fn default_harness() -> (Harness, Arc<ScriptedEditor>) {
    let editor = ScriptedEditor::always(Reply::Image(solid_png(4, 4, [0, 0, 255])));
    let h = harness(editor.clone(), FixedChat::new("navy blue, ivory"), FixedDetector::whole_image(64, 48));
    (h, editor)
}

pub fn image_parts(request: &EditRequest) -> Vec<Vec<u8>> {
    request
        .parts
        .iter()
        .filter_map(|p| match p {
            Part::Image { data, .. } => Some(data.clone()),
            _ => None,
        })
        .collect()
}

pub fn text_of(request: &EditRequest) -> String {
    request
        .parts
        .iter()
        .filter_map(|p| match p {
            Part::Text(t) => Some(t.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("")
}
