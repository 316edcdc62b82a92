/// Event types for the application
///
/// Events represent things that have happened (past tense).
/// They are broadcast to all subscribers.
use crate::backend::{CalibrationOutcome, ExtractionOutcome, GenerationOutcome};
use crate::documents::ParameterReport;
use crate::state::WizardStep;

/// Kind of background job, for job lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Calibration,
    Extraction,
    Parameters,
    Generation,
}

impl JobKind {
    pub fn label(&self) -> &'static str {
        match self {
            JobKind::Calibration => "Camera calibration",
            JobKind::Extraction => "Measurement extraction",
            JobKind::Parameters => "Parameter computation",
            JobKind::Generation => "Avatar generation",
        }
    }
}

/// Application events
#[derive(Debug, Clone)]
pub enum StateEvent {
    /// The wizard moved to another step
    StepChanged { from: WizardStep, to: WizardStep },

    /// The wizard was reset to its initial state
    WasReset,

    /// A background job started
    JobStarted { job: JobKind },

    /// Measurement extraction finished successfully
    ExtractionFinished { outcome: ExtractionOutcome },

    /// Camera calibration finished successfully
    CalibrationFinished { outcome: CalibrationOutcome },

    /// Mesh parameter computation finished successfully
    ParametersComputed { report: ParameterReport },

    /// Generation reported progress
    GenerationProgress { fraction: f32, status: String },

    /// Avatar generation finished successfully
    GenerationFinished { outcome: GenerationOutcome },

    /// A background job failed
    JobFailed { job: JobKind, message: String },
}

impl StateEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            StateEvent::StepChanged { from, to } => {
                format!("Step changed: {} -> {}", from.title(), to.title())
            }
            StateEvent::WasReset => "Wizard reset".to_string(),
            StateEvent::JobStarted { job } => format!("{} started", job.label()),
            StateEvent::ExtractionFinished { outcome } => {
                format!(
                    "Extracted {} measurements",
                    outcome.measurements.body_measurements.len()
                        + outcome.measurements.hair_measurements.len()
                )
            }
            StateEvent::CalibrationFinished { outcome } => {
                format!(
                    "Calibrated from {} images ({:.3}px reprojection error)",
                    outcome.num_successful_images, outcome.reprojection_error
                )
            }
            StateEvent::ParametersComputed { report } => {
                format!(
                    "Parameters computed: {}/{} converged",
                    report.summary.converged_count, report.summary.total_measurements
                )
            }
            StateEvent::GenerationProgress { fraction, status } => {
                format!("Generation {:.0}%: {}", fraction * 100.0, status)
            }
            StateEvent::GenerationFinished { outcome } => match &outcome.fbx_path {
                Some(path) => format!("Avatar generated: {}", path.display()),
                None => "Avatar generated".to_string(),
            },
            StateEvent::JobFailed { job, message } => {
                format!("{} failed: {}", job.label(), message)
            }
        }
    }
}
