//! # neural-style
//!
//! Neural style transfer for a single image.
//!
//! An uploaded image is stretched to the model's fixed input size and turned
//! into a planar `(1, 3, H, W)` tensor in [0, 1]. The tensor goes through an
//! [`InferenceEngine`](model::InferenceEngine) (ONNX Runtime by default) and
//! the first output is decoded back into an RGBA image, whichever of the
//! supported layouts the model emits.
//!
//! ## Example
//!
//! ```no_run
//! use neural_style::model::{OrtEngine, StyleSelection};
//! use neural_style::{Config, Stylizer};
//!
//! # fn main() -> neural_style::Result<()> {
//! let stylizer = Stylizer::new(OrtEngine, Config::default())?;
//!
//! let bytes = std::fs::read("photo.jpg")?;
//! let styled = stylizer.stylize(&bytes, StyleSelection::Candy)?;
//! neural_style::image::save_image(&styled, "photo-candy.png", 95)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod image;
pub mod math;
pub mod model;
pub mod pipeline;

pub use error::{Error, Result};
pub use pipeline::{AppState, Config, Stylizer};
