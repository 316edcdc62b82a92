/// State management module
///
/// Wizard step enumeration, per-step state records, and the AppState
/// aggregate that arbitrates navigation between them.

pub mod app_state;
pub mod step_states;
pub mod steps;

// Re-export commonly used types
pub use app_state::AppState;
pub use step_states::{
    parse_cm_text, parse_corner_count, ArucoSettingsState, CameraCalibrationState, ConfigureState,
    GenerateState, ImageInputState, InstrumentedArm, MeasurementsState, OutputSettingsState,
    RigType,
};
pub use steps::WizardStep;
