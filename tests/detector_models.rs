//! Runs the real detectors when their model files are present under
//! `models/`. The models are not shipped with the crate, so each test
//! returns early without them.

use std::path::PathBuf;

use face_detect_web::config::{DEFAULT_CASCADE_MODEL_PATH, DEFAULT_NEURAL_MODEL_PATH};
use face_detect_web::detection::{CascadeDetector, FaceDetector, NeuralDetector};
use image::{DynamicImage, Rgb, RgbImage};

fn model(relative: &str) -> Option<PathBuf> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(relative);
    if path.is_file() {
        Some(path)
    } else {
        eprintln!("skipping: {} not found", path.display());
        None
    }
}

fn flat_image(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])))
}

#[test]
fn cascade_finds_nothing_in_a_flat_image() {
    let Some(path) = model(DEFAULT_CASCADE_MODEL_PATH) else {
        return;
    };
    let detector = CascadeDetector::from_path(&path).unwrap();
    assert!(detector.detect(&flat_image(200, 160)).unwrap().is_empty());
    // smaller than the minimum face size
    assert!(detector.detect(&flat_image(20, 20)).unwrap().is_empty());
}

#[test]
fn neural_runs_on_any_input_size() {
    let Some(path) = model(DEFAULT_NEURAL_MODEL_PATH) else {
        return;
    };
    let detector = NeuralDetector::from_path(&path).unwrap();
    // input is resized to the network shape, so odd sizes work too
    for (width, height) in [(640, 480), (97, 211)] {
        assert!(detector.detect(&flat_image(width, height)).is_ok());
    }
}
