//! SCRFD face detector via ONNX Runtime.
//!
//! Anchor-free decoding over three stride levels, followed by NMS.
//! Input frames are 8-bit grayscale; the letterboxed tensor replicates the
//! luma channel into RGB.

use crate::types::FaceBox;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const INPUT_SIZE: usize = 640;
const PIXEL_MEAN: f32 = 127.5;
const PIXEL_STD: f32 = 128.0;
const DEFAULT_CONFIDENCE: f32 = 0.5;
const NMS_IOU: f32 = 0.4;
const STRIDES: [usize; 3] = [8, 16, 32];
const ANCHORS_PER_CELL: usize = 2;
/// 3 strides × (score, bbox, kps) tensors.
const EXPECTED_OUTPUTS: usize = 9;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} — download det_10g.onnx from insightface")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Geometry of the letterbox resize, kept so detections can be mapped back
/// onto the source frame.
struct Letterbox {
    scale: f32,
    pad_x: f32,
    pad_y: f32,
}

impl Letterbox {
    fn to_source(&self, x: f32, y: f32) -> (f32, f32) {
        ((x - self.pad_x) / self.scale, (y - self.pad_y) / self.scale)
    }
}

/// SCRFD-based face detector.
///
/// Assumes the standard SCRFD export output ordering:
/// `[0-2]` scores, `[3-5]` bboxes, `[6-8]` landmarks, each over strides
/// 8/16/32.
pub struct FaceDetector {
    session: Session,
    confidence: f32,
}

impl FaceDetector {
    /// Load the detection model from `model_path`.
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let num_outputs = session.outputs().len();
        if num_outputs != EXPECTED_OUTPUTS {
            return Err(DetectorError::InferenceFailed(format!(
                "SCRFD model must have {EXPECTED_OUTPUTS} outputs, got {num_outputs}"
            )));
        }

        tracing::info!(path = model_path, outputs = num_outputs, "detector model loaded");

        Ok(Self {
            session,
            confidence: DEFAULT_CONFIDENCE,
        })
    }

    /// Override the confidence threshold (default 0.5).
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    /// Detect faces in a grayscale frame.
    ///
    /// Returns boxes in source-frame coordinates, highest confidence first.
    pub fn detect(
        &mut self,
        gray: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Vec<FaceBox>, DetectorError> {
        let (input, letterbox) = preprocess(gray, width as usize, height as usize);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut candidates = Vec::new();
        for (level, &stride) in STRIDES.iter().enumerate() {
            let (_, scores) = outputs[level]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("scores s{stride}: {e}")))?;
            let (_, boxes) = outputs[level + 3]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("boxes s{stride}: {e}")))?;
            let (_, kps) = outputs[level + 6]
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::InferenceFailed(format!("kps s{stride}: {e}")))?;

            decode_level(
                scores,
                boxes,
                kps,
                stride,
                &letterbox,
                self.confidence,
                &mut candidates,
            );
        }

        let mut faces = nms(candidates, NMS_IOU);
        faces.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(faces)
    }
}

/// Letterbox a grayscale frame into the 640×640 NCHW input tensor.
fn preprocess(gray: &[u8], width: usize, height: usize) -> (Array4<f32>, Letterbox) {
    let scale = (INPUT_SIZE as f32 / width as f32).min(INPUT_SIZE as f32 / height as f32);
    let new_w = (width as f32 * scale).round() as usize;
    let new_h = (height as f32 * scale).round() as usize;
    let pad_x = ((INPUT_SIZE - new_w) / 2) as f32;
    let pad_y = ((INPUT_SIZE - new_h) / 2) as f32;

    let resized = resize_bilinear(gray, width, height, new_w, new_h);

    let x0 = pad_x as usize;
    let y0 = pad_y as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    for y in 0..INPUT_SIZE {
        for x in 0..INPUT_SIZE {
            let pixel = if y >= y0 && y < y0 + new_h && x >= x0 && x < x0 + new_w {
                resized[(y - y0) * new_w + (x - x0)] as f32
            } else {
                PIXEL_MEAN // pad value normalizes to 0
            };
            let v = (pixel - PIXEL_MEAN) / PIXEL_STD;
            tensor[[0, 0, y, x]] = v;
            tensor[[0, 1, y, x]] = v;
            tensor[[0, 2, y, x]] = v;
        }
    }

    (tensor, Letterbox { scale, pad_x, pad_y })
}

/// Bilinear grayscale resize.
fn resize_bilinear(src: &[u8], sw: usize, sh: usize, dw: usize, dh: usize) -> Vec<u8> {
    let mut dst = vec![0u8; dw * dh];
    let sx_step = sw as f32 / dw as f32;
    let sy_step = sh as f32 / dh as f32;

    for y in 0..dh {
        let fy = ((y as f32 + 0.5) * sy_step - 0.5).max(0.0);
        let y0 = (fy as usize).min(sh - 1);
        let y1 = (y0 + 1).min(sh - 1);
        let wy = fy - y0 as f32;

        for x in 0..dw {
            let fx = ((x as f32 + 0.5) * sx_step - 0.5).max(0.0);
            let x0 = (fx as usize).min(sw - 1);
            let x1 = (x0 + 1).min(sw - 1);
            let wx = fx - x0 as f32;

            let top = src[y0 * sw + x0] as f32 * (1.0 - wx) + src[y0 * sw + x1] as f32 * wx;
            let bot = src[y1 * sw + x0] as f32 * (1.0 - wx) + src[y1 * sw + x1] as f32 * wx;
            dst[y * dw + x] = (top * (1.0 - wy) + bot * wy).round().clamp(0.0, 255.0) as u8;
        }
    }
    dst
}

/// Decode one stride level's raw tensors into candidate boxes.
fn decode_level(
    scores: &[f32],
    boxes: &[f32],
    kps: &[f32],
    stride: usize,
    letterbox: &Letterbox,
    confidence: f32,
    out: &mut Vec<FaceBox>,
) {
    let grid = INPUT_SIZE / stride;
    let anchors = grid * grid * ANCHORS_PER_CELL;

    for idx in 0..anchors {
        let score = match scores.get(idx) {
            Some(&s) if s > confidence => s,
            _ => continue,
        };

        let cell = idx / ANCHORS_PER_CELL;
        let anchor_x = ((cell % grid) * stride) as f32;
        let anchor_y = ((cell / grid) * stride) as f32;

        let b = idx * 4;
        if b + 3 >= boxes.len() {
            continue;
        }
        let (x1, y1) = letterbox.to_source(
            anchor_x - boxes[b] * stride as f32,
            anchor_y - boxes[b + 1] * stride as f32,
        );
        let (x2, y2) = letterbox.to_source(
            anchor_x + boxes[b + 2] * stride as f32,
            anchor_y + boxes[b + 3] * stride as f32,
        );

        let k = idx * 10;
        let landmarks = if k + 9 < kps.len() {
            let mut lms = [(0.0f32, 0.0f32); 5];
            for (i, lm) in lms.iter_mut().enumerate() {
                *lm = letterbox.to_source(
                    anchor_x + kps[k + i * 2] * stride as f32,
                    anchor_y + kps[k + i * 2 + 1] * stride as f32,
                );
            }
            Some(lms)
        } else {
            None
        };

        out.push(FaceBox {
            x: x1,
            y: y1,
            width: x2 - x1,
            height: y2 - y1,
            confidence: score,
            landmarks,
        });
    }
}

/// Non-maximum suppression by IoU.
fn nms(mut candidates: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<FaceBox> = Vec::new();
    for cand in candidates {
        if keep.iter().all(|k| iou(k, &cand) <= iou_threshold) {
            keep.push(cand);
        }
    }
    keep
}

fn iou(a: &FaceBox, b: &FaceBox) -> f32 {
    let x1 = a.x.max(b.x);
    let y1 = a.y.max(b.y);
    let x2 = (a.x + a.width).min(b.x + b.width);
    let y2 = (a.y + a.height).min(b.y + b.height);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.width * a.height + b.width * b.height - inter;
    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}
