use std::path::Path;
use std::sync::Arc;

use crate::foundation::error::{StippleError, StippleResult};

/// Decoded source image in straight (non-premultiplied) RGBA8 form.
///
/// Luminance sampling reads the color channels directly, so pixels are kept
/// straight; the render surface is the only place premultiplication happens.
#[derive(Clone, Debug)]
pub struct SourceImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major straight RGBA8 (`len == width * height * 4`).
    pub rgba8: Arc<Vec<u8>>,
}

/// Decode encoded image bytes (PNG, JPEG, ...) into a [`SourceImage`].
pub fn decode_image(bytes: &[u8]) -> StippleResult<SourceImage> {
    let dyn_img = image::load_from_memory(bytes)
        .map_err(|e| StippleError::image_load(format!("decode image from memory: {e}")))?;
    let rgba = dyn_img.to_rgba8();
    let (width, height) = rgba.dimensions();

    Ok(SourceImage {
        width,
        height,
        rgba8: Arc::new(rgba.into_raw()),
    })
}

/// Read and decode an image file.
pub fn load_image(path: &Path) -> StippleResult<SourceImage> {
    let bytes = std::fs::read(path)
        .map_err(|e| StippleError::image_load(format!("read image '{}': {e}", path.display())))?;
    decode_image(&bytes)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn decode_image_png_dimensions_and_pixels() {
        let src_rgba = vec![100u8, 50u8, 200u8, 128u8];
        let img = image::RgbaImage::from_raw(1, 1, src_rgba.clone()).unwrap();

        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();

        let decoded = decode_image(&buf).unwrap();
        assert_eq!(decoded.width, 1);
        assert_eq!(decoded.height, 1);
        // Straight alpha: channels come back untouched.
        assert_eq!(decoded.rgba8.as_slice(), src_rgba.as_slice());
    }

    #[test]
    fn decode_image_rejects_garbage() {
        let err = decode_image(b"not an image").unwrap_err();
        assert!(matches!(err, StippleError::ImageLoad(_)));
    }

    #[test]
    fn load_image_missing_file_is_image_load_error() {
        let err = load_image(Path::new("definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, StippleError::ImageLoad(_)));
    }
}
