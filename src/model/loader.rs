//! Style model lookup and the ONNX Runtime engine.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use ndarray::{ArrayD, IxDyn};
use ort::session::Session;
use ort::value::Tensor;

use crate::error::{Error, Result};
use crate::image::{ImageTensor, OutputTensor};

use super::engine::{InferenceEngine, InferenceSession, NamedOutputs};

/// The style models that can be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StyleSelection {
    /// Mosaic tile style.
    #[default]
    Mosaic,
    /// Candy style.
    Candy,
    /// Rain Princess style.
    RainPrincess,
}

impl StyleSelection {
    pub const ALL: [Self; 3] = [Self::Mosaic, Self::Candy, Self::RainPrincess];

    /// Kebab-case name used on the command line.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mosaic => "mosaic",
            Self::Candy => "candy",
            Self::RainPrincess => "rain-princess",
        }
    }

    /// Get the model filename for this style.
    #[must_use]
    pub const fn filename(&self) -> &'static str {
        match self {
            Self::Mosaic => "mosaic.onnx",
            Self::Candy => "candy.onnx",
            Self::RainPrincess => "rain-princess.onnx",
        }
    }
}

impl fmt::Display for StyleSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StyleSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|style| style.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::InvalidParameter {
                name: "style".to_string(),
                reason: format!(
                    "unknown style {s:?}, expected one of: {}",
                    Self::ALL.map(|style| style.name()).join(", ")
                ),
            })
    }
}

/// Resolves style selections to model files in a directory.
#[derive(Debug, Clone)]
pub struct ModelStore {
    model_dir: PathBuf,
}

impl ModelStore {
    /// Use models from `model_dir`.
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
        }
    }

    /// Platform-appropriate default model directory:
    /// - Windows: `%LOCALAPPDATA%\neural-style\models`
    /// - Linux: `~/.cache/neural-style/models`
    /// - macOS: `~/Library/Caches/neural-style/models`
    #[must_use]
    pub fn default_dir() -> PathBuf {
        let base = dirs::cache_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("neural-style").join("models")
    }

    #[must_use]
    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }

    /// Path of the model file for `style`. The file may not exist.
    #[must_use]
    pub fn model_path(&self, style: StyleSelection) -> PathBuf {
        self.model_dir.join(style.filename())
    }
}

impl Default for ModelStore {
    fn default() -> Self {
        Self::new(Self::default_dir())
    }
}

/// [`InferenceEngine`] backed by ONNX Runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrtEngine;

impl InferenceEngine for OrtEngine {
    fn create_session(&self, model_path: &Path) -> Result<Box<dyn InferenceSession>> {
        let name = model_path.display().to_string();

        if !model_path.is_file() {
            return Err(Error::ModelLoad {
                name,
                source: "model file not found".into(),
            });
        }

        tracing::debug!("Creating ONNX session for {name}");

        let session = Session::builder()
            .and_then(|builder| builder.commit_from_file(model_path))
            .map_err(|source| Error::ModelLoad {
                name,
                source: Box::new(source),
            })?;

        Ok(Box::new(OrtSession { session }))
    }
}

struct OrtSession {
    session: Session,
}

impl InferenceSession for OrtSession {
    fn run(&mut self, input: &ImageTensor) -> Result<NamedOutputs> {
        let input_value = Tensor::from_array(input.clone())?;

        let outputs = self.session.run(ort::inputs![input_value])?;

        let mut named = NamedOutputs::new();
        for (name, value) in outputs.iter() {
            // Non-f32 outputs are never images
            let Ok((shape, data)) = value.try_extract_tensor::<f32>() else {
                tracing::debug!("Skipping non-f32 output {name}");
                continue;
            };
            named.push(name, to_array(shape, data)?);
        }

        Ok(named)
    }
}

/// Copy raw ONNX output data into an owned dynamic-rank array.
fn to_array(shape: &[i64], data: &[f32]) -> Result<OutputTensor> {
    let dims = shape
        .iter()
        .map(|&d| usize::try_from(d))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| Error::MissingOutput {
            reason: format!("output has negative dimension in {shape:?}"),
        })?;

    ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec()).map_err(|_| Error::ShapeMismatch {
        expected: format!("{dims:?}"),
        actual: format!("{} values", data.len()),
    })
}
