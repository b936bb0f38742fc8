use std::path::Path;

use image::{DynamicImage, imageops::FilterType};
use tract_onnx::prelude::*;

use super::{FaceDetector, FaceRegion};
use crate::error::DetectError;

const INPUT_WIDTH: usize = 320;
const INPUT_HEIGHT: usize = 240;
const PIXEL_MEAN: f32 = 127.0;
const PIXEL_SCALE: f32 = 128.0;
const SCORE_THRESHOLD: f32 = 0.7;
const IOU_THRESHOLD: f32 = 0.3;

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// Face detector running an UltraFace (RFB-320) ONNX network through
/// `tract`. Works on RGB input resized to the network resolution.
pub struct NeuralDetector {
    plan: OnnxPlan,
}

impl NeuralDetector {
    pub fn from_path(path: &Path) -> Result<Self, DetectError> {
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| {
                model.with_input_fact(0, f32::fact([1, 3, INPUT_HEIGHT, INPUT_WIDTH]).into())
            })
            .and_then(|model| model.into_optimized())
            .and_then(|model| model.into_runnable())
            .map_err(|err| DetectError::Model {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        Ok(Self { plan })
    }

    fn infer(&self, image: &DynamicImage) -> TractResult<Vec<Candidate>> {
        let rgb = image
            .resize_exact(INPUT_WIDTH as u32, INPUT_HEIGHT as u32, FilterType::Triangle)
            .to_rgb8();
        let input: Tensor =
            tract_ndarray::Array4::from_shape_fn((1, 3, INPUT_HEIGHT, INPUT_WIDTH), |(_, c, y, x)| {
                (rgb.get_pixel(x as u32, y as u32)[c] as f32 - PIXEL_MEAN) / PIXEL_SCALE
            })
            .into();

        let outputs = self.plan.run(tvec!(input.into()))?;
        if outputs.len() < 2 {
            anyhow::bail!("expected scores and boxes outputs, got {}", outputs.len());
        }
        let scores = outputs[0].as_slice::<f32>()?;
        let boxes = outputs[1].as_slice::<f32>()?;
        decode_candidates(scores, boxes, SCORE_THRESHOLD)
            .map_err(|reason| anyhow::anyhow!(reason))
    }
}

impl FaceDetector for NeuralDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceRegion>, DetectError> {
        let candidates = self
            .infer(image)
            .map_err(|err| DetectError::Inference(err.to_string()))?;
        let kept = non_maximum_suppression(candidates, IOU_THRESHOLD);
        Ok(kept
            .iter()
            .map(|candidate| candidate.to_region(image.width(), image.height()))
            .collect())
    }
}

/// Box in coordinates normalized to `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Candidate {
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
    score: f32,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.right - self.left).max(0.0) * (self.bottom - self.top).max(0.0)
    }

    fn iou(&self, other: &Candidate) -> f32 {
        let width = (self.right.min(other.right) - self.left.max(other.left)).max(0.0);
        let height = (self.bottom.min(other.bottom) - self.top.max(other.top)).max(0.0);
        let intersection = width * height;
        let union = self.area() + other.area() - intersection;
        if union > 0.0 { intersection / union } else { 0.0 }
    }

    fn to_region(&self, image_width: u32, image_height: u32) -> FaceRegion {
        let (w, h) = (image_width as f32, image_height as f32);
        let x = (self.left * w).round();
        let y = (self.top * h).round();
        let width = ((self.right - self.left) * w).round().max(0.0);
        let height = ((self.bottom - self.top) * h).round().max(0.0);
        FaceRegion::new(x as i32, y as i32, width as u32, height as u32)
    }
}

/// Pairs the `[background, face]` score rows with their corner boxes and
/// keeps the ones whose face probability reaches `threshold`.
fn decode_candidates(scores: &[f32], boxes: &[f32], threshold: f32) -> Result<Vec<Candidate>, String> {
    if scores.len() % 2 != 0 || boxes.len() % 4 != 0 || scores.len() / 2 != boxes.len() / 4 {
        return Err(format!(
            "mismatched detector outputs: {} scores, {} box values",
            scores.len(),
            boxes.len()
        ));
    }
    Ok(scores
        .chunks_exact(2)
        .zip(boxes.chunks_exact(4))
        .filter(|(score, _)| score[1] >= threshold)
        .map(|(score, bbox)| Candidate {
            left: bbox[0],
            top: bbox[1],
            right: bbox[2],
            bottom: bbox[3],
            score: score[1],
        })
        .collect())
}

fn non_maximum_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if kept.iter().all(|existing| existing.iou(&candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }
    kept
}
