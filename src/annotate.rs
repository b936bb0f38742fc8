use std::sync::Arc;

use crate::config::NO_FACES_SENTINEL;
use crate::detection::FaceDetector;
use crate::error::AnnotateError;
use crate::image_processing;
use crate::naming::Namer;
use crate::store::{ImageCategory, LocalFileStorage};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnnotationOutcome {
    NoFaces,
    Annotated(String),
}

impl AnnotationOutcome {
    /// The result half of the redirect token.
    pub fn token_part(&self) -> &str {
        match self {
            AnnotationOutcome::NoFaces => NO_FACES_SENTINEL,
            AnnotationOutcome::Annotated(name) => name,
        }
    }
}

/// Runs the configured detector over a stored source image and writes the
/// annotated copy back to the store.
#[derive(Clone)]
pub struct FaceAnnotator {
    detector: Arc<dyn FaceDetector>,
}

impl FaceAnnotator {
    pub fn new(detector: Arc<dyn FaceDetector>) -> Self {
        Self { detector }
    }

    /// Decode, detect and draw. `Ok(None)` means no face was found.
    pub fn render(&self, name: &str, bytes: &[u8]) -> Result<Option<Vec<u8>>, AnnotateError> {
        let image = image_processing::decode_image(bytes).map_err(|reason| AnnotateError::Decode {
            name: name.to_string(),
            reason,
        })?;
        let regions = self.detector.detect(&image)?;
        tracing::info!(source = %name, faces = regions.len(), "detection finished");
        if regions.is_empty() {
            return Ok(None);
        }
        let mut canvas = image.to_rgb8();
        image_processing::draw_face_boxes(&mut canvas, &regions);
        image_processing::encode_jpeg(canvas)
            .map(Some)
            .map_err(AnnotateError::Encode)
    }

    pub async fn annotate(
        &self,
        store: &mut LocalFileStorage,
        namer: &mut Namer,
        source_name: &str,
    ) -> Result<AnnotationOutcome, AnnotateError> {
        let bytes = store.read(source_name).await?;
        let annotator = self.clone();
        let name = source_name.to_string();
        let rendered = tokio::task::spawn_blocking(move || annotator.render(&name, &bytes)).await??;

        let Some(encoded) = rendered else {
            return Ok(AnnotationOutcome::NoFaces);
        };
        let result_name = store.fresh_name(namer, ImageCategory::Result).await?;
        store.save(&encoded, &result_name).await?;
        store.set_current(ImageCategory::Result, &result_name);
        Ok(AnnotationOutcome::Annotated(result_name))
    }
}
