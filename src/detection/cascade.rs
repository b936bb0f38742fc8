use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use image::DynamicImage;

use super::{FaceDetector, FaceRegion};
use crate::error::DetectError;

const MIN_FACE_SIZE: u32 = 30;
const PYRAMID_SCALE_FACTOR: f32 = 1.0 / 1.2;
const SCORE_THRESHOLD: f64 = 2.0;
const WINDOW_STEP: u32 = 4;

/// Face detector backed by the SeetaFace funnel-structured cascade from
/// `rustface`. Works on grayscale input.
pub struct CascadeDetector {
    model: rustface::Model,
}

impl CascadeDetector {
    pub fn from_path(path: &Path) -> Result<Self, DetectError> {
        let model_error = |reason: String| DetectError::Model {
            path: path.to_path_buf(),
            reason,
        };
        let file = File::open(path).map_err(|err| model_error(err.to_string()))?;
        let model =
            rustface::read_model(BufReader::new(file)).map_err(|err| model_error(err.to_string()))?;
        Ok(Self { model })
    }
}

impl FaceDetector for CascadeDetector {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceRegion>, DetectError> {
        let gray = image.to_luma8();
        let (width, height) = gray.dimensions();
        if width < MIN_FACE_SIZE || height < MIN_FACE_SIZE {
            return Ok(Vec::new());
        }

        let mut detector = rustface::create_detector_with_model(self.model.clone());
        detector.set_min_face_size(MIN_FACE_SIZE);
        detector.set_score_thresh(SCORE_THRESHOLD);
        detector.set_pyramid_scale_factor(PYRAMID_SCALE_FACTOR);
        detector.set_slide_window_step(WINDOW_STEP, WINDOW_STEP);

        let faces = detector.detect(&rustface::ImageData::new(gray.as_raw(), width, height));
        Ok(faces
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceRegion::new(bbox.x(), bbox.y(), bbox.width(), bbox.height())
            })
            .collect())
    }
}
