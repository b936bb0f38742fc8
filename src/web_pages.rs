use axum::{
    extract::{Multipart, Path, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::app::{AppState, Session};
use crate::config::{ALLOWED_EXTENSIONS, DEFAULT_IMG_NAME, NO_FACES_SENTINEL};
use crate::error::AppError;
use crate::store::ImageCategory;

const INDEX_HTML: &str = include_str!("../templates/index.html");

pub const IMAGES_ROUTE: &str = "/images";

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

fn extension_from_filename(file_name: &str) -> Option<String> {
    if let Some((_, ext)) = file_name.rsplit_once('.') {
        if !ext.is_empty() {
            return Some(ext.to_lowercase());
        }
    }
    None
}

pub fn allowed_file(file_name: &str) -> bool {
    extension_from_filename(file_name)
        .is_some_and(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
}

/// 302 with a `Location` header.
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

pub fn result_location(source_name: &str, result_part: &str) -> String {
    let token = format!("{source_name}:{result_part}");
    format!("/{}", utf8_percent_encode(&token, PATH_SEGMENT))
}

fn image_url(name: &str) -> String {
    format!("{IMAGES_ROUTE}/{}", utf8_percent_encode(name, PATH_SEGMENT))
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// What the page shows next to the upload form.
#[derive(Debug, PartialEq, Eq)]
pub enum PageView<'a> {
    Index { placeholder: &'a str },
    Result { source: &'a str, result: &'a str },
}

impl<'a> PageView<'a> {
    /// Splits a `<source>:<result>` token on its first colon.
    pub fn from_token(token: &'a str) -> Self {
        let (source, result) = token.split_once(':').unwrap_or((token, ""));
        PageView::Result { source, result }
    }

    pub fn render(&self) -> String {
        let (source, result_block) = match self {
            PageView::Index { placeholder } => (*placeholder, String::new()),
            PageView::Result { source, result } => {
                let block = if result.is_empty() {
                    String::new()
                } else if *result == NO_FACES_SENTINEL {
                    format!(
                        r#"<p id="result-text" class="no-faces">{}</p>"#,
                        escape_html(result)
                    )
                } else {
                    format!(
                        r#"<img id="result-image" src="{}" alt="{}">"#,
                        escape_html(&image_url(result)),
                        escape_html(result)
                    )
                };
                (*source, block)
            }
        };
        INDEX_HTML
            .replace("{{SOURCE_IMAGE_URL}}", &escape_html(&image_url(source)))
            .replace("{{SOURCE_IMAGE_NAME}}", &escape_html(source))
            .replace("{{RESULT_BLOCK}}", &result_block)
    }
}

pub async fn index_page() -> Html<String> {
    Html(
        PageView::Index {
            placeholder: DEFAULT_IMG_NAME,
        }
        .render(),
    )
}

pub async fn result_page(Path(token): Path<String>) -> Html<String> {
    Html(PageView::from_token(&token).render())
}

pub async fn upload_redirect() -> Response {
    found("/")
}

async fn read_upload(multipart: &mut Multipart) -> Option<Upload> {
    loop {
        match multipart.next_field().await {
            Ok(Some(field)) => {
                if field.name() == Some("file") {
                    let file_name = field.file_name().unwrap_or("").to_string();
                    return match field.bytes().await {
                        Ok(data) => Some(Upload {
                            file_name,
                            bytes: data.to_vec(),
                        }),
                        Err(err) => {
                            tracing::warn!("read upload field failed: {err}");
                            None
                        }
                    };
                }
            }
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!("read multipart form failed: {err}");
                return None;
            }
        }
    }
}

pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, AppError> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            tracing::debug!("upload without multipart body: {rejection}");
            return Ok(found("/"));
        }
    };
    let Some(upload) = read_upload(&mut multipart).await else {
        tracing::debug!("upload without file field");
        return Ok(found("/"));
    };
    if upload.file_name.is_empty() || !allowed_file(&upload.file_name) {
        tracing::debug!(file_name = %upload.file_name, "upload rejected by extension");
        return Ok(found("/"));
    }

    let mut session = state.session.lock().await;
    let Session { store, namer } = &mut *session;

    store.clear(ImageCategory::Source).await?;
    store.clear(ImageCategory::Result).await?;

    let source_name = store.fresh_name(namer, ImageCategory::Source).await?;
    store.save(&upload.bytes, &source_name).await?;
    store.set_current(ImageCategory::Source, &source_name);
    tracing::info!(
        file_name = %upload.file_name,
        stored_as = %source_name,
        bytes = upload.bytes.len(),
        "upload accepted"
    );

    let outcome = state.annotator.annotate(store, namer, &source_name).await?;
    drop(session);

    Ok(found(&result_location(&source_name, outcome.token_part())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_file_checks_extension_case_insensitively() {
        assert!(allowed_file("photo.JPG"));
        assert!(allowed_file("photo.jpeg"));
        assert!(allowed_file("archive.tar.gif"));
        assert!(allowed_file(".png"));
        assert!(!allowed_file("photo.bmp"));
        assert!(!allowed_file("photo"));
        assert!(!allowed_file("photo."));
        assert!(!allowed_file("photo.png "));
        assert!(!allowed_file("photo. jpg"));
        assert!(!allowed_file(""));
    }

    #[test]
    fn token_splits_on_first_colon() {
        assert_eq!(
            PageView::from_token("src_img_1.jpg:result_img_1.jpg"),
            PageView::Result {
                source: "src_img_1.jpg",
                result: "result_img_1.jpg"
            }
        );
        assert_eq!(
            PageView::from_token("src_img_1.jpg"),
            PageView::Result {
                source: "src_img_1.jpg",
                result: ""
            }
        );
    }

    #[test]
    fn location_encodes_the_sentinel() {
        assert_eq!(
            result_location("src_img_2024_3_7_14_2_9.jpg", NO_FACES_SENTINEL),
            "/src_img_2024_3_7_14_2_9.jpg:NO%20FACE(S)%20DETECTED"
        );
        assert_eq!(
            result_location("src_img_1.jpg", "result_img_1.jpg"),
            "/src_img_1.jpg:result_img_1.jpg"
        );
    }

    #[test]
    fn result_page_shows_both_images() {
        let html = PageView::from_token("src_img_1.jpg:result_img_1.jpg").render();
        assert!(html.contains(r#"src="/images/src_img_1.jpg""#));
        assert!(html.contains(r#"src="/images/result_img_1.jpg""#));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn result_page_shows_sentinel_as_text() {
        let html = PageView::from_token("src_img_1.jpg:NO FACE(S) DETECTED").render();
        assert!(html.contains(r#"<p id="result-text" class="no-faces">NO FACE(S) DETECTED</p>"#));
        assert!(!html.contains("result-image"));
    }

    #[test]
    fn names_are_escaped() {
        let html = PageView::from_token("<b>bold</b>:x\"y").render();
        assert!(!html.contains("<b>bold</b>"));
        assert!(html.contains("&lt;b&gt;bold&lt;/b&gt;"));
        assert!(html.contains(r#"alt="x&quot;y""#));
    }

    #[test]
    fn index_page_uses_placeholder() {
        let html = PageView::Index {
            placeholder: "default_img.jpg",
        }
        .render();
        assert!(html.contains(r#"src="/images/default_img.jpg""#));
        assert!(!html.contains("result-image"));
    }
}
