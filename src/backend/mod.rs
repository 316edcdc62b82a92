/// Backend gateway module
///
/// The wizard delegates all computation-heavy work through the `Backend`
/// trait. `ScriptBackend` drives the real external modules as subprocesses;
/// `MockBackend` fabricates deterministic results for tests and dry runs.

pub mod gateway;
pub mod mock;
pub mod process;
pub mod scripts;

// Re-export commonly used types
pub use gateway::{
    reveal_in_file_manager, Backend, CalibrationOutcome, ExtractionOutcome, GenerationConfig,
    GenerationOutcome, ProgressSink,
};
pub use mock::MockBackend;
pub use scripts::ScriptBackend;
