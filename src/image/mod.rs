//! Image preprocessing and output decoding.

mod load;
mod save;

pub use load::{image_to_tensor, load_image, preprocess};
pub use save::{decode_output, encode_png, save_image, tensor_to_image, to_data_url, OutputLayout};

use ndarray::{Array4, ArrayD};

/// Input tensor in NCHW format (batch, channels, height, width).
/// Values are normalized to [0, 1].
pub type ImageTensor = Array4<f32>;

/// Output tensor of arbitrary rank as returned by an inference engine.
pub type OutputTensor = ArrayD<f32>;

/// Side length of the square input expected by the style models.
pub const STYLE_IMAGE_SIZE: u32 = 224;

/// Largest model input side accepted. A 4096x4096 tensor is already 192 MiB.
pub const MAX_INPUT_SIZE: u32 = 4096;

/// Number of channels in RGB images.
pub const RGB_CHANNELS: usize = 3;
