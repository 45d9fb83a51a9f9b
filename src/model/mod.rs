//! Style models and the inference engine interface.

mod engine;
mod loader;

pub use engine::{InferenceEngine, InferenceSession, NamedOutputs};
pub use loader::{ModelStore, OrtEngine, StyleSelection};
