//! Avatar Forge
//!
//! Desktop wizard core for turning a calibrated photograph of a subject
//! into a rigged 3D avatar. The crate owns the wizard state machine, the
//! persisted JSON documents, and the gateway that drives the external
//! calibration/extraction/inference/generation tooling as subprocesses.
//! Rendering is left to whatever front end sits on top; it only needs to
//! mutate the step states, call the navigation methods, and listen on the
//! event bus.

pub mod backend;
pub mod config;
pub mod documents;
pub mod error;
pub mod messaging;
pub mod state;
pub mod worker;

// Re-export the types a front end touches most
pub use backend::{Backend, MockBackend, ScriptBackend};
pub use config::Config;
pub use error::{AppResult, BackendError, DocumentError, InputError};
pub use messaging::{EventBus, JobKind, StateEvent};
pub use state::{AppState, WizardStep};
pub use worker::{CalibrationJob, ExtractionJob, Jobs};
