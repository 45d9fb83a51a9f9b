//! Style transfer pipeline and its run state machine.

mod state;
mod stylize;

pub use state::{AppState, Event, Phase, RunId, SelectedFile, Transition};
pub use stylize::{Config, Stylizer, FAILURE_MESSAGE};
