//! Capability interface between the tensor pipeline and an inference runtime.

use std::path::Path;

use crate::error::{Error, Result};
use crate::image::{ImageTensor, OutputTensor};

/// Creates inference sessions from model files.
///
/// Implemented by [`OrtEngine`](super::OrtEngine) for real models and by
/// in-memory fakes in tests.
pub trait InferenceEngine {
    /// Load the model at `model_path` and return a ready session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelLoad`] if the model cannot be loaded.
    fn create_session(&self, model_path: &Path) -> Result<Box<dyn InferenceSession>>;
}

/// A loaded model that maps one input tensor to its named outputs.
pub trait InferenceSession {
    /// Run the model on `input`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Inference`] if the runtime fails.
    fn run(&mut self, input: &ImageTensor) -> Result<NamedOutputs>;
}

/// Output tensors keyed by name, in the model's declared output order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedOutputs {
    entries: Vec<(String, OutputTensor)>,
}

impl NamedOutputs {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Append an output. Order of insertion is the declared order.
    pub fn push(&mut self, name: impl Into<String>, tensor: OutputTensor) {
        self.entries.push((name.into(), tensor));
    }

    /// The first declared output.
    #[must_use]
    pub fn first(&self) -> Option<(&str, &OutputTensor)> {
        self.entries
            .first()
            .map(|(name, tensor)| (name.as_str(), tensor))
    }

    /// Consume the mapping and return the first declared output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingOutput`] if there are no outputs.
    pub fn into_first(self) -> Result<(String, OutputTensor)> {
        self.entries
            .into_iter()
            .next()
            .ok_or_else(|| Error::MissingOutput {
                reason: "engine returned no outputs".to_string(),
            })
    }

    /// Output names in declared order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }
}
