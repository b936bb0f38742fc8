use std::env;
use std::path::PathBuf;

use crate::detection::DetectorKind;

pub const DEFAULT_UPLOAD_DIR: &str = "static/assets/images";
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];
pub const IMG_FILE_EXT: &str = ".jpg";
pub const SRC_IMG_NAME_PREFIX: &str = "src_img";
pub const RESULT_IMG_NAME_PREFIX: &str = "result_img";
pub const DEFAULT_IMG_NAME: &str = "default_img.jpg";
pub const NO_FACES_SENTINEL: &str = "NO FACE(S) DETECTED";
pub const DEFAULT_CASCADE_MODEL_PATH: &str = "models/seeta_fd_frontal_v1.0.bin";
pub const DEFAULT_NEURAL_MODEL_PATH: &str = "models/version-RFB-320.onnx";
pub const DEFAULT_BIND_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Runtime settings. Every field falls back to the constants above when the
/// matching environment variable is unset or blank.
#[derive(Clone, Debug)]
pub struct Settings {
    pub bind_address: String,
    pub upload_dir: PathBuf,
    pub detector: DetectorKind,
    pub cascade_model_path: PathBuf,
    pub neural_model_path: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_address: format!("{DEFAULT_BIND_HOST}:{DEFAULT_PORT}"),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            detector: DetectorKind::default(),
            cascade_model_path: PathBuf::from(DEFAULT_CASCADE_MODEL_PATH),
            neural_model_path: PathBuf::from(DEFAULT_NEURAL_MODEL_PATH),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match read("PORT") {
            Some(raw) => raw.trim().parse::<u16>().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "invalid PORT, using {DEFAULT_PORT}");
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };
        let host = read("BIND_HOST").unwrap_or_else(|| DEFAULT_BIND_HOST.to_string());
        let detector = match read("DETECTOR") {
            Some(raw) => raw.parse::<DetectorKind>().unwrap_or_else(|err| {
                tracing::warn!(value = %raw, "{err}, using cascade");
                DetectorKind::Cascade
            }),
            None => DetectorKind::default(),
        };

        Self {
            bind_address: format!("{}:{port}", host.trim()),
            upload_dir: read("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            detector,
            cascade_model_path: read("CASCADE_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CASCADE_MODEL_PATH)),
            neural_model_path: read("NEURAL_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_NEURAL_MODEL_PATH)),
        }
    }

    pub fn model_path(&self) -> &PathBuf {
        match self.detector {
            DetectorKind::Cascade => &self.cascade_model_path,
            DetectorKind::Neural => &self.neural_model_path,
        }
    }
}
