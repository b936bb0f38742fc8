//! Face detection backends.
//!
//! Both backends answer the same question: given an image, where are the
//! faces? They differ only in the model they load and the color space they
//! feed it.

mod cascade;
mod neural;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use image::DynamicImage;

pub use cascade::CascadeDetector;
pub use neural::NeuralDetector;

use crate::error::DetectError;

/// Axis-aligned face bounding box in pixels. The origin may be negative when
/// a detector reports a face cut off by the image border.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaceRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl FaceRegion {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Pluggable face detector.
pub trait FaceDetector: Send + Sync {
    /// Returns every face found in `image`. An empty vector is a valid answer.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<FaceRegion>, DetectError>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DetectorKind {
    #[default]
    Cascade,
    Neural,
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorKind::Cascade => f.write_str("cascade"),
            DetectorKind::Neural => f.write_str("neural"),
        }
    }
}

impl FromStr for DetectorKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cascade" | "haar" => Ok(DetectorKind::Cascade),
            "neural" | "onnx" => Ok(DetectorKind::Neural),
            other => Err(format!("unknown detector kind: {other}")),
        }
    }
}

/// Loads the detector selected by `kind` from the model artifact at `path`.
pub fn load_detector(kind: DetectorKind, path: &Path) -> Result<Arc<dyn FaceDetector>, DetectError> {
    let detector: Arc<dyn FaceDetector> = match kind {
        DetectorKind::Cascade => Arc::new(CascadeDetector::from_path(path)?),
        DetectorKind::Neural => Arc::new(NeuralDetector::from_path(path)?),
    };
    tracing::info!(%kind, model = %path.display(), "face detector loaded");
    Ok(detector)
}
