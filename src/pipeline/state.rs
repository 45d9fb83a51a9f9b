//! Explicit state machine for user-triggered style transfer runs.
//!
//! A run moves `Idle -> Preprocessing -> Inferring -> Decoding -> Done`, or
//! from any intermediate phase back to `Idle` with an error. Every run gets a
//! fresh [`RunId`]; events carrying an older id are ignored so a slow run can
//! never overwrite the result of a newer one.

use std::fmt;

use image::RgbaImage;

use crate::model::StyleSelection;

/// Monotonically increasing identifier of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(u64);

impl RunId {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where the current run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Preprocessing,
    Inferring,
    Decoding,
    Done,
}

impl Phase {
    /// True while a run is in flight.
    #[must_use]
    pub const fn is_processing(self) -> bool {
        matches!(self, Self::Preprocessing | Self::Inferring | Self::Decoding)
    }
}

/// An image file picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Inputs to [`AppState::apply`].
#[derive(Debug, Clone)]
pub enum Event {
    StyleSelected(StyleSelection),
    FileSelected(SelectedFile),
    RunRequested,
    Preprocessed(RunId),
    Inferred(RunId),
    Decoded(RunId, RgbaImage),
    Failed(RunId, String),
}

/// What an event did to the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A new run began.
    Started(RunId),
    /// The latest run moved to this phase.
    Advanced(Phase),
    /// The style or file selection changed; the run phase is untouched.
    Updated,
    /// The request could not start a run; see [`AppState::error`].
    Rejected,
    /// Stale run or out-of-order event; nothing changed.
    Ignored,
}

/// Everything the front end displays.
#[derive(Debug, Clone, Default)]
pub struct AppState {
    style: StyleSelection,
    file: Option<SelectedFile>,
    phase: Phase,
    result: Option<RgbaImage>,
    error: Option<String>,
    latest_run: Option<RunId>,
    next_run: u64,
}

impl AppState {
    #[must_use]
    pub fn new(style: StyleSelection) -> Self {
        Self {
            style,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn style(&self) -> StyleSelection {
        self.style
    }

    #[must_use]
    pub const fn file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub const fn result(&self) -> Option<&RgbaImage> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub const fn latest_run(&self) -> Option<RunId> {
        self.latest_run
    }

    #[must_use]
    pub const fn processing(&self) -> bool {
        self.phase.is_processing()
    }

    /// Take the displayed result out of the state.
    pub fn take_result(&mut self) -> Option<RgbaImage> {
        self.result.take()
    }

    /// Apply one event.
    pub fn apply(&mut self, event: Event) -> Transition {
        match event {
            Event::StyleSelected(style) => {
                self.style = style;
                Transition::Updated
            }
            Event::FileSelected(file) => {
                self.file = Some(file);
                Transition::Updated
            }
            Event::RunRequested => self.start_run(),
            Event::Preprocessed(run) => self.advance(run, Phase::Preprocessing, Phase::Inferring),
            Event::Inferred(run) => self.advance(run, Phase::Inferring, Phase::Decoding),
            Event::Decoded(run, image) => {
                let transition = self.advance(run, Phase::Decoding, Phase::Done);
                if transition != Transition::Ignored {
                    self.result = Some(image);
                }
                transition
            }
            Event::Failed(run, message) => {
                if !self.is_latest(run) || !self.phase.is_processing() {
                    return Transition::Ignored;
                }
                tracing::debug!("Run {run} failed in {:?}", self.phase);
                self.phase = Phase::Idle;
                self.result = None;
                self.error = Some(message);
                Transition::Advanced(Phase::Idle)
            }
        }
    }

    fn start_run(&mut self) -> Transition {
        self.result = None;

        if self.file.is_none() {
            self.error = Some("Select an image first.".to_string());
            return Transition::Rejected;
        }

        self.next_run += 1;
        let run = RunId(self.next_run);
        if let Some(previous) = self.latest_run.filter(|_| self.phase.is_processing()) {
            tracing::debug!("Run {run} supersedes run {previous}");
        }

        self.latest_run = Some(run);
        self.error = None;
        self.phase = Phase::Preprocessing;
        Transition::Started(run)
    }

    fn advance(&mut self, run: RunId, from: Phase, to: Phase) -> Transition {
        if !self.is_latest(run) || self.phase != from {
            return Transition::Ignored;
        }
        self.phase = to;
        Transition::Advanced(to)
    }

    fn is_latest(&self, run: RunId) -> bool {
        self.latest_run == Some(run)
    }
}
