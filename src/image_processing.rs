use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;

use crate::detection::FaceRegion;

pub const BOX_MARGIN: i32 = 10;
pub const BOX_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const BOX_THICKNESS: u32 = 2;

/// Inclusive pixel corners of a box to draw, already clamped to the image.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoxBounds {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// Grows `region` by `margin` on every side and clamps the result to a
/// `width` x `height` image. `None` when nothing of it lies inside.
pub fn annotation_bounds(region: &FaceRegion, margin: i32, width: u32, height: u32) -> Option<BoxBounds> {
    if width == 0 || height == 0 {
        return None;
    }
    let max_x = i64::from(width) - 1;
    let max_y = i64::from(height) - 1;
    let margin = i64::from(margin);
    let left = i64::from(region.x) - margin;
    let top = i64::from(region.y) - margin;
    let right = i64::from(region.x) + i64::from(region.width) + margin;
    let bottom = i64::from(region.y) + i64::from(region.height) + margin;

    if right < 0 || bottom < 0 || left > max_x || top > max_y || left > right || top > bottom {
        return None;
    }
    Some(BoxBounds {
        left: left.clamp(0, max_x) as u32,
        top: top.clamp(0, max_y) as u32,
        right: right.clamp(0, max_x) as u32,
        bottom: bottom.clamp(0, max_y) as u32,
    })
}

/// Draws a `BOX_THICKNESS` wide outline inside `bounds`.
pub fn draw_box(image: &mut RgbImage, bounds: BoxBounds) {
    let mut bounds = bounds;
    for _ in 0..BOX_THICKNESS {
        let width = bounds.right - bounds.left + 1;
        let height = bounds.bottom - bounds.top + 1;
        let rect = Rect::at(bounds.left as i32, bounds.top as i32).of_size(width, height);
        draw_hollow_rect_mut(image, rect, BOX_COLOR);
        if width <= 2 || height <= 2 {
            break;
        }
        bounds = BoxBounds {
            left: bounds.left + 1,
            top: bounds.top + 1,
            right: bounds.right - 1,
            bottom: bounds.bottom - 1,
        };
    }
}

/// Draws one box per region, returning how many ended up on the image.
pub fn draw_face_boxes(image: &mut RgbImage, regions: &[FaceRegion]) -> usize {
    let (width, height) = image.dimensions();
    let mut drawn = 0;
    for region in regions {
        if let Some(bounds) = annotation_bounds(region, BOX_MARGIN, width, height) {
            draw_box(image, bounds);
            drawn += 1;
        }
    }
    drawn
}

/// Decodes uploaded bytes. The stored name always ends in `.jpg`, so the
/// format comes from the content, never from the name.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, String> {
    let decoded = match detect_mime_type(bytes).and_then(mime_to_format) {
        Some(format) => image::load_from_memory_with_format(bytes, format),
        None => image::load_from_memory(bytes),
    };
    decoded.map_err(|err| format!("decode image failed: {err}"))
}

pub fn encode_jpeg(image: RgbImage) -> Result<Vec<u8>, String> {
    let mut output = Vec::new();
    DynamicImage::ImageRgb8(image)
        .write_to(&mut std::io::Cursor::new(&mut output), ImageFormat::Jpeg)
        .map_err(|err| format!("encode jpeg failed: {err}"))?;
    Ok(output)
}

pub fn detect_mime_type(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    None
}

pub fn mime_to_format(mime_type: &str) -> Option<ImageFormat> {
    match mime_type {
        "image/png" => Some(ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
        "image/gif" => Some(ImageFormat::Gif),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_grows_by_margin_on_every_side() {
        let bounds = annotation_bounds(&FaceRegion::new(10, 10, 20, 20), BOX_MARGIN, 100, 100);
        assert_eq!(
            bounds,
            Some(BoxBounds {
                left: 0,
                top: 0,
                right: 40,
                bottom: 40
            })
        );
    }

    #[test]
    fn region_at_edges_is_clamped() {
        let bounds = annotation_bounds(&FaceRegion::new(0, 5, 20, 20), BOX_MARGIN, 50, 30).unwrap();
        assert_eq!(bounds.left, 0);
        assert_eq!(bounds.top, 0);
        assert_eq!(bounds.right, 30);
        assert_eq!(bounds.bottom, 29);

        let outside = annotation_bounds(&FaceRegion::new(200, 200, 10, 10), BOX_MARGIN, 50, 50);
        assert_eq!(outside, None);
        assert_eq!(annotation_bounds(&FaceRegion::new(0, 0, 1, 1), BOX_MARGIN, 0, 0), None);
    }

    #[test]
    fn box_outline_is_two_pixels_wide() {
        let mut image = RgbImage::new(60, 60);
        let drawn = draw_face_boxes(&mut image, &[FaceRegion::new(10, 10, 20, 20)]);
        assert_eq!(drawn, 1);
        assert_eq!(image.get_pixel(0, 0), &BOX_COLOR);
        assert_eq!(image.get_pixel(40, 40), &BOX_COLOR);
        assert_eq!(image.get_pixel(1, 20), &BOX_COLOR);
        assert_eq!(image.get_pixel(39, 20), &BOX_COLOR);
        assert_eq!(image.get_pixel(2, 20), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(20, 20), &Rgb([0, 0, 0]));
        assert_eq!(image.get_pixel(41, 41), &Rgb([0, 0, 0]));
    }

    #[test]
    fn region_at_origin_does_not_panic() {
        let mut image = RgbImage::new(8, 8);
        let drawn = draw_face_boxes(&mut image, &[FaceRegion::new(-4, 0, 3, 3)]);
        assert_eq!(drawn, 1);
        assert_eq!(image.get_pixel(0, 0), &BOX_COLOR);
    }

    #[test]
    fn decode_ignores_misleading_names() {
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(4, 3))
            .write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        assert_eq!(detect_mime_type(&png), Some("image/png"));
        let decoded = decode_image(&png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
        assert!(decode_image(b"definitely not an image").is_err());
    }

    #[test]
    fn encoded_result_is_jpeg() {
        let bytes = encode_jpeg(RgbImage::new(16, 16)).unwrap();
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);
    }
}
