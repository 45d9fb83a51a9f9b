//! Image loading utilities.

use std::path::Path;

use image::{imageops::FilterType, DynamicImage};
use ndarray::Array4;

use crate::error::{Error, Result};

use super::{ImageTensor, RGB_CHANNELS};

/// Decode image bytes and convert them to a normalized tensor.
///
/// The image is:
/// 1. Decoded from `bytes` (format guessed from the content)
/// 2. Stretched to `width` x `height`, ignoring the source aspect ratio
/// 3. Normalized to [0, 1] per channel, alpha discarded
/// 4. Returned as NCHW tensor (1, 3, height, width)
///
/// # Errors
///
/// Returns [`Error::Decode`] if the bytes are not a supported image and
/// [`Error::InvalidParameter`] if either target dimension is zero.
pub fn preprocess(bytes: &[u8], width: u32, height: u32) -> Result<ImageTensor> {
    check_dimensions(width, height)?;

    let img = image::load_from_memory(bytes).map_err(|source| Error::Decode { source })?;

    tracing::debug!(
        "Decoded {}x{} image, resampling to {width}x{height}",
        img.width(),
        img.height()
    );

    Ok(image_to_tensor(&img, width, height))
}

/// Read an image file and convert it to a normalized tensor.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded.
pub fn load_image<P: AsRef<Path>>(path: P, width: u32, height: u32) -> Result<ImageTensor> {
    let path = path.as_ref();

    let bytes = std::fs::read(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;

    preprocess(&bytes, width, height)
}

/// Convert a `DynamicImage` to a normalized NCHW tensor of the given size.
///
/// Plane 0 holds every red value in row-major order, plane 1 green, plane 2 blue.
pub fn image_to_tensor(img: &DynamicImage, width: u32, height: u32) -> ImageTensor {
    let resized = img.resize_exact(width, height, FilterType::Triangle);
    let rgba = resized.to_rgba8();

    let mut tensor = Array4::<f32>::zeros((1, RGB_CHANNELS, height as usize, width as usize));

    for (x, y, pixel) in rgba.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        tensor[[0, 0, y, x]] = f32::from(pixel[0]) / 255.0;
        tensor[[0, 1, y, x]] = f32::from(pixel[1]) / 255.0;
        tensor[[0, 2, y, x]] = f32::from(pixel[2]) / 255.0;
    }

    tensor
}

fn check_dimensions(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::InvalidParameter {
            name: "target size".to_string(),
            reason: format!("{width}x{height} has a zero dimension"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::STYLE_IMAGE_SIZE;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(img: &RgbaImage) -> Vec<u8> {
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_tensor_shape() {
        let img = DynamicImage::new_rgb8(100, 60);
        let tensor = image_to_tensor(&img, STYLE_IMAGE_SIZE, STYLE_IMAGE_SIZE);

        assert_eq!(tensor.shape(), &[1, 3, 224, 224]);
    }

    #[test]
    fn test_planes_hold_separate_channels() {
        let img = RgbaImage::from_pixel(8, 8, Rgba([255, 0, 51, 255]));
        let tensor = preprocess(&png_bytes(&img), 4, 4).unwrap();

        let data = tensor.as_slice().unwrap();
        let plane = 16;
        assert!(data[..plane].iter().all(|&v| (v - 1.0).abs() < f32::EPSILON));
        assert!(data[plane..2 * plane].iter().all(|&v| v == 0.0));
        assert!(data[2 * plane..]
            .iter()
            .all(|&v| (v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_non_square_source_is_stretched() {
        let mut img = RgbaImage::from_pixel(40, 10, Rgba([0, 0, 0, 255]));
        for y in 0..10 {
            for x in 20..40 {
                img.put_pixel(x, y, Rgba([255, 255, 255, 255]));
            }
        }
        let tensor = preprocess(&png_bytes(&img), 8, 8).unwrap();

        assert_eq!(tensor.shape(), &[1, 3, 8, 8]);
        assert!(tensor[[0, 0, 7, 0]] < 0.01);
        assert!(tensor[[0, 0, 0, 7]] > 0.99);
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = preprocess(b"definitely not an image", 224, 224).unwrap_err();
        assert!(matches!(err, Error::Decode { .. }));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let img = RgbaImage::new(2, 2);
        let err = preprocess(&png_bytes(&img), 0, 224).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = load_image("/nonexistent/input.png", 224, 224).unwrap_err();
        assert!(matches!(err, Error::ImageLoad { .. }));
    }
}
