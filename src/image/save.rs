//! Output decoding and image saving utilities.

use std::io::Cursor;
use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::error::{Error, Result};

use super::{OutputTensor, RGB_CHANNELS};

/// Memory layout of a model output tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputLayout {
    /// `(1, 3, H, W)`: one plane per channel after a batch dimension.
    BatchPlanar { height: u32, width: u32 },
    /// `(3, H, W)`: one plane per channel, no batch dimension.
    Planar { height: u32, width: u32 },
    /// `(1, H, W, 3)`: channels interleaved per pixel after a batch dimension.
    BatchInterleaved { height: u32, width: u32 },
}

impl OutputLayout {
    /// Classify a shape descriptor into one of the supported layouts.
    ///
    /// Planar layouts are tried before the interleaved one, so `(1, 3, 3, 3)`
    /// is read as batch planar.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnrecognizedShape`] for any other shape, including
    /// zero-sized spatial dimensions.
    pub fn classify(shape: &[usize]) -> Result<Self> {
        let layout = match *shape {
            [1, RGB_CHANNELS, h, w] => {
                spatial(h, w).map(|(height, width)| Self::BatchPlanar { height, width })
            }
            [RGB_CHANNELS, h, w] => {
                spatial(h, w).map(|(height, width)| Self::Planar { height, width })
            }
            [1, h, w, RGB_CHANNELS] => {
                spatial(h, w).map(|(height, width)| Self::BatchInterleaved { height, width })
            }
            _ => None,
        };

        layout.ok_or_else(|| Error::UnrecognizedShape {
            shape: shape.to_vec(),
        })
    }

    /// Image dimensions as `(width, height)`.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        match *self {
            Self::BatchPlanar { height, width }
            | Self::Planar { height, width }
            | Self::BatchInterleaved { height, width } => (width, height),
        }
    }

    /// Offsets of the red, green and blue values of pixel `index`.
    const fn offsets(&self, index: usize) -> [usize; 3] {
        match *self {
            Self::BatchPlanar { height, width } | Self::Planar { height, width } => {
                let plane = height as usize * width as usize;
                [index, plane + index, 2 * plane + index]
            }
            Self::BatchInterleaved { .. } => [3 * index, 3 * index + 1, 3 * index + 2],
        }
    }
}

fn spatial(height: usize, width: usize) -> Option<(u32, u32)> {
    let height = u32::try_from(height).ok().filter(|&h| h > 0)?;
    let width = u32::try_from(width).ok().filter(|&w| w > 0)?;
    Some((height, width))
}

/// Decode a raw output tensor into an opaque RGBA image.
///
/// Each channel value is scaled by 255, clamped to [0, 255] and rounded.
/// NaN decodes to 0. Alpha is always 255.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedShape`] if the shape is not a supported layout
/// or its element count overflows `usize`, and [`Error::ShapeMismatch`] if `data` does not hold exactly the number of
/// values the shape implies.
pub fn decode_output(shape: &[usize], data: &[f32]) -> Result<RgbaImage> {
    let layout = OutputLayout::classify(shape)?;

    let expected = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| Error::UnrecognizedShape {
            shape: shape.to_vec(),
        })?;
    if data.len() != expected {
        return Err(Error::ShapeMismatch {
            expected: format!("{expected} values for shape {shape:?}"),
            actual: format!("{} values", data.len()),
        });
    }

    tracing::debug!("Decoding output tensor {shape:?} as {layout:?}");

    let (width, height) = layout.dimensions();
    let mut img = RgbaImage::new(width, height);

    for (index, pixel) in img.pixels_mut().enumerate() {
        let [r, g, b] = layout.offsets(index);
        *pixel = Rgba([
            denormalize(data[r]),
            denormalize(data[g]),
            denormalize(data[b]),
            u8::MAX,
        ]);
    }

    Ok(img)
}

/// Decode an output tensor of any supported layout into an RGBA image.
///
/// # Errors
///
/// See [`decode_output`].
pub fn tensor_to_image(tensor: &OutputTensor) -> Result<RgbaImage> {
    let data = tensor.as_standard_layout();
    let values = data.as_slice().ok_or_else(|| Error::ShapeMismatch {
        expected: "contiguous tensor".to_string(),
        actual: "non-contiguous view".to_string(),
    })?;

    decode_output(tensor.shape(), values)
}

/// Scale a value from [0, 1] to [0, 255] with clamping and rounding.
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn denormalize(value: f32) -> u8 {
    // NaN casts to 0; everything else is in range after the clamp
    (value * 255.0).clamp(0.0, 255.0).round() as u8
}

/// Encode an image as PNG bytes.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|source| Error::Encode { source })?;
    Ok(bytes)
}

/// Encode an image as a `data:image/png;base64,...` URL.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn to_data_url(img: &RgbaImage) -> Result<String> {
    let png = encode_png(img)?;
    Ok(format!(
        "data:image/png;base64,{}",
        general_purpose::STANDARD.encode(png)
    ))
}

/// Save an image to disk.
///
/// The format is inferred from the extension (PNG when there is none).
/// JPEG output drops the alpha channel and uses `quality` (1-100).
///
/// # Errors
///
/// Returns an error if the image cannot be saved.
pub fn save_image<P: AsRef<Path>>(img: &RgbaImage, path: P, quality: u8) -> Result<()> {
    let path = path.as_ref();

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("png")
        .to_lowercase();

    match extension.as_str() {
        "jpg" | "jpeg" => {
            let mut output = std::fs::File::create(path)?;
            let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut output, quality);
            let rgb = DynamicImage::ImageRgba8(img.clone()).into_rgb8();
            DynamicImage::ImageRgb8(rgb)
                .write_with_encoder(encoder)
                .map_err(|source| Error::ImageSave {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        "png" => {
            img.save_with_format(path, ImageFormat::Png)
                .map_err(|source| Error::ImageSave {
                    path: path.to_path_buf(),
                    source,
                })?;
        }
        _ => {
            img.save(path).map_err(|source| Error::ImageSave {
                path: path.to_path_buf(),
                source,
            })?;
        }
    }

    tracing::debug!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    #[test]
    fn test_denormalize() {
        assert_eq!(denormalize(0.0), 0);
        assert_eq!(denormalize(0.5), 128);
        assert_eq!(denormalize(1.0), 255);
    }

    #[test]
    fn test_denormalize_clamp() {
        assert_eq!(denormalize(-0.3), 0);
        assert_eq!(denormalize(4.0), 255);
        assert_eq!(denormalize(f32::NAN), 0);
    }

    #[test]
    fn test_batch_planar_pixels() {
        let data = [
            0.0, 1.0, 0.0, 1.0, // R
            1.0, 0.0, 1.0, 0.0, // G
            0.5, 0.5, 0.5, 0.5, // B
        ];
        let img = decode_output(&[1, 3, 2, 2], &data).unwrap();

        assert_eq!(img.dimensions(), (2, 2));
        assert_eq!(img.get_pixel(0, 0), &Rgba([0, 255, 128, 255]));
        assert_eq!(img.get_pixel(1, 0), &Rgba([255, 0, 128, 255]));
        assert_eq!(img.get_pixel(0, 1), &Rgba([0, 255, 128, 255]));
        assert_eq!(img.get_pixel(1, 1), &Rgba([255, 0, 128, 255]));
    }

    #[test]
    fn test_planar_without_batch() {
        // 1 row, 3 columns
        let data = [
            0.0, 0.2, 0.4, // R
            0.6, 0.8, 1.0, // G
            1.0, 0.4, 0.2, // B
        ];
        let img = decode_output(&[3, 1, 3], &data).unwrap();

        assert_eq!(img.dimensions(), (3, 1));
        assert_eq!(img.get_pixel(0, 0), &Rgba([0, 153, 255, 255]));
        assert_eq!(img.get_pixel(2, 0), &Rgba([102, 255, 51, 255]));
    }

    #[test]
    fn test_batch_interleaved() {
        let data = [
            1.0, 0.0, 0.0, // (0, 0)
            0.0, 1.0, 0.0, // (1, 0)
            0.0, 0.0, 1.0, // (0, 1)
            -1.0, 2.0, 0.25, // (1, 1)
        ];
        let img = decode_output(&[1, 2, 2, 3], &data).unwrap();

        assert_eq!(img.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
        assert_eq!(img.get_pixel(1, 0), &Rgba([0, 255, 0, 255]));
        assert_eq!(img.get_pixel(0, 1), &Rgba([0, 0, 255, 255]));
        assert_eq!(img.get_pixel(1, 1), &Rgba([0, 255, 64, 255]));
    }

    #[test]
    fn test_ambiguous_shape_prefers_planar() {
        assert_eq!(
            OutputLayout::classify(&[1, 3, 3, 3]).unwrap(),
            OutputLayout::BatchPlanar { height: 3, width: 3 }
        );
    }

    #[test]
    fn test_unrecognized_shapes() {
        for shape in [
            vec![2, 4, 4],
            vec![1, 4, 2, 2],
            vec![2, 3, 2, 2],
            vec![3, 2],
            vec![1, 1, 3, 2, 2],
            vec![1, 3, 0, 2],
            vec![],
        ] {
            let data = vec![0.0; shape.iter().product()];
            let err = decode_output(&shape, &data).unwrap_err();
            assert!(
                matches!(err, Error::UnrecognizedShape { shape: ref s } if *s == shape),
                "{shape:?} gave {err}"
            );
        }
    }

    #[test]
    fn test_length_mismatch() {
        let err = decode_output(&[1, 3, 2, 2], &[0.0; 11]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { .. }));
    }

    #[test]
    fn test_overflowing_element_count_rejected() {
        let big = u32::MAX as usize;
        let err = decode_output(&[1, 3, big, big], &[]).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedShape { .. }));

        let err = decode_output(&[1, big, big, 3], &[]).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedShape { .. }));
    }

    #[test]
    fn test_tensor_to_image_leaves_input_untouched() {
        let tensor = ArrayD::from_shape_vec(IxDyn(&[3, 1, 1]), vec![0.2, 1.5, -0.5]).unwrap();
        let before = tensor.clone();

        let img = tensor_to_image(&tensor).unwrap();

        assert_eq!(img.get_pixel(0, 0), &Rgba([51, 255, 0, 255]));
        assert_eq!(tensor, before);
    }

    #[test]
    fn test_tensor_to_image_non_standard_layout() {
        // (3, 2, 1, 1) reversed into a (1, 1, 2, 3) interleaved view
        let data = vec![1.0, 0.0, 0.0, 1.0, 0.5, 0.5];
        let tensor = ArrayD::from_shape_vec(IxDyn(&[3, 2, 1, 1]), data)
            .unwrap()
            .reversed_axes();
        assert_eq!(tensor.shape(), &[1, 1, 2, 3]);

        let img = tensor_to_image(&tensor).unwrap();

        assert_eq!(img.get_pixel(0, 0), &Rgba([255, 0, 128, 255]));
        assert_eq!(img.get_pixel(1, 0), &Rgba([0, 255, 128, 255]));
    }

    #[test]
    fn test_data_url_prefix() {
        let img = RgbaImage::from_pixel(1, 1, Rgba([1, 2, 3, 255]));
        let url = to_data_url(&img).unwrap();

        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[test]
    fn test_save_png_round_trip_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.png");
        let img = RgbaImage::from_pixel(3, 2, Rgba([9, 8, 7, 255]));

        save_image(&img, &path, 95).unwrap();

        let reread = image::open(&path).unwrap();
        assert_eq!((reread.width(), reread.height()), (3, 2));
    }

    #[test]
    fn test_save_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jpg");
        let img = RgbaImage::from_pixel(4, 4, Rgba([200, 100, 50, 255]));

        save_image(&img, &path, 90).unwrap();

        assert!(path.exists());
    }
}
