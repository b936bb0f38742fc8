use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tokio::sync::Mutex;
use tower_http::services::ServeDir;

use crate::annotate::FaceAnnotator;
use crate::config::MAX_UPLOAD_BYTES;
use crate::detection::FaceDetector;
use crate::naming::Namer;
use crate::store::LocalFileStorage;
use crate::web_pages;

/// Everything an upload mutates. Held behind one lock so that clearing,
/// saving and detecting for one upload never interleave with another.
pub struct Session {
    pub store: LocalFileStorage,
    pub namer: Namer,
}

#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<Session>>,
    pub annotator: FaceAnnotator,
    pub image_dir: PathBuf,
}

impl AppState {
    pub fn new(image_dir: PathBuf, detector: Arc<dyn FaceDetector>) -> Self {
        Self::with_namer(image_dir, detector, Namer::default())
    }

    pub fn with_namer(image_dir: PathBuf, detector: Arc<dyn FaceDetector>, namer: Namer) -> Self {
        let session = Session {
            store: LocalFileStorage::new(image_dir.clone()),
            namer,
        };
        Self {
            session: Arc::new(Mutex::new(session)),
            annotator: FaceAnnotator::new(detector),
            image_dir,
        }
    }
}

pub fn router(state: AppState) -> Router {
    let image_dir = state.image_dir.clone();
    Router::new()
        .route("/", get(web_pages::index_page))
        .route(
            "/upload",
            post(web_pages::handle_upload)
                .fallback(web_pages::upload_redirect)
                .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/{token}", get(web_pages::result_page))
        .nest_service(web_pages::IMAGES_ROUTE, ServeDir::new(image_dir))
        .with_state(state)
}
