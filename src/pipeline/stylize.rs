//! Style transfer pipeline: preprocess, infer, decode.

use std::path::PathBuf;

use image::RgbaImage;

use crate::error::{Error, Result};
use crate::image::{
    preprocess, tensor_to_image, ImageTensor, OutputTensor, MAX_INPUT_SIZE, STYLE_IMAGE_SIZE,
};
use crate::model::{InferenceEngine, ModelStore, StyleSelection};

use super::state::{AppState, Event, RunId, Transition};

/// Message shown to the user when a run fails. Details go to the log.
pub const FAILURE_MESSAGE: &str = "Style transfer failed. Please try a different image or style.";

/// Configuration for the style transfer pipeline.
#[derive(Debug, Clone)]
pub struct Config {
    /// Width of the model input in pixels.
    pub width: u32,

    /// Height of the model input in pixels.
    pub height: u32,

    /// Directory holding the `.onnx` style models. None for the default cache dir.
    pub models_dir: Option<PathBuf>,

    /// Output JPEG quality (1-100).
    pub output_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: STYLE_IMAGE_SIZE,
            height: STYLE_IMAGE_SIZE,
            models_dir: None,
            output_quality: 95,
        }
    }
}

impl Config {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidParameter {
                name: "size".to_string(),
                reason: "width and height must be greater than 0".to_string(),
            });
        }

        if self.width > MAX_INPUT_SIZE || self.height > MAX_INPUT_SIZE {
            return Err(Error::InvalidParameter {
                name: "size".to_string(),
                reason: format!("width and height must be at most {MAX_INPUT_SIZE}"),
            });
        }

        if !(1..=100).contains(&self.output_quality) {
            return Err(Error::InvalidParameter {
                name: "output_quality".to_string(),
                reason: "must be between 1 and 100".to_string(),
            });
        }

        Ok(())
    }
}

/// Runs style models through an [`InferenceEngine`].
///
/// Holds no per-run state: every call creates its own tensor, session and image.
pub struct Stylizer<E> {
    config: Config,
    engine: E,
    models: ModelStore,
}

impl<E: InferenceEngine> Stylizer<E> {
    /// Create a new stylizer with the given engine and configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(engine: E, config: Config) -> Result<Self> {
        config.validate()?;

        let models = config
            .models_dir
            .clone()
            .map(ModelStore::new)
            .unwrap_or_default();

        tracing::debug!(
            "Stylizer using models from {} at {}x{}",
            models.model_dir().display(),
            config.width,
            config.height
        );

        Ok(Self {
            config,
            engine,
            models,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn models(&self) -> &ModelStore {
        &self.models
    }

    /// Apply `style` to the encoded image in `bytes`.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding, inference or output decoding fails.
    pub fn stylize(&self, bytes: &[u8], style: StyleSelection) -> Result<RgbaImage> {
        let tensor = preprocess(bytes, self.config.width, self.config.height)?;
        let output = self.infer(style, &tensor)?;
        tensor_to_image(&output)
    }

    /// Start a run on `state` and drive it to completion.
    ///
    /// Failures are logged and recorded on the state as [`FAILURE_MESSAGE`]
    /// with the result cleared; they are never returned.
    pub fn run(&self, state: &mut AppState) -> Transition {
        let run = match state.apply(Event::RunRequested) {
            Transition::Started(run) => run,
            other => return other,
        };

        tracing::info!("Starting run {run} with style {}", state.style());

        let event = match self.drive(state, run) {
            Ok(image) => {
                tracing::info!("Run {run} complete");
                Event::Decoded(run, image)
            }
            Err(err) => {
                tracing::error!("Run {run} failed: {err}");
                Event::Failed(run, FAILURE_MESSAGE.to_string())
            }
        };

        state.apply(event)
    }

    fn drive(&self, state: &mut AppState, run: RunId) -> Result<RgbaImage> {
        let style = state.style();

        let tensor = {
            let file = state.file().ok_or_else(|| Error::InvalidParameter {
                name: "file".to_string(),
                reason: "no image selected".to_string(),
            })?;
            tracing::debug!("Preprocessing {} ({} bytes)", file.name, file.bytes.len());
            preprocess(&file.bytes, self.config.width, self.config.height)?
        };
        state.apply(Event::Preprocessed(run));

        let output = self.infer(style, &tensor)?;
        state.apply(Event::Inferred(run));

        tensor_to_image(&output)
    }

    fn infer(&self, style: StyleSelection, tensor: &ImageTensor) -> Result<OutputTensor> {
        let path = self.models.model_path(style);
        tracing::info!("Running {style} model from {}", path.display());

        let mut session = self.engine.create_session(&path)?;
        let outputs = session.run(tensor)?;
        tracing::debug!(
            "Model returned outputs [{}]",
            outputs.names().collect::<Vec<_>>().join(", ")
        );
        let (name, output) = outputs.into_first()?;

        tracing::debug!("Using output {name} with shape {:?}", output.shape());
        Ok(output)
    }
}
