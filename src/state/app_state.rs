/// Application state with navigation rules
///
/// The aggregate root of the wizard: owns the current step, one state
/// record per step, and the event bus used to notify listeners of every
/// mutation. Navigation is a validation gate, not an error channel: every
/// guard returns a bool and a refused transition changes nothing.
use super::step_states::{
    ArucoSettingsState, CameraCalibrationState, ConfigureState, GenerateState, ImageInputState,
    MeasurementsState, OutputSettingsState,
};
use super::steps::WizardStep;
use crate::backend::GenerationConfig;
use crate::config::Config;
use crate::documents::{CalibrationFile, MeasurementsFile};
use crate::messaging::{EventBus, JobKind, StateEvent};

/// Main application state container
#[derive(Clone)]
pub struct AppState {
    current_step: WizardStep,

    // Standalone feature states, not part of the linear wizard
    pub camera_calibration: CameraCalibrationState,
    pub aruco_settings: ArucoSettingsState,

    // Wizard step states
    pub image_input: ImageInputState,
    pub measurements: MeasurementsState,
    pub configure: ConfigureState,
    pub output_settings: OutputSettingsState,
    pub generate: GenerateState,

    events: EventBus,
}

impl AppState {
    /// Create a fresh state on the first step
    pub fn new() -> Self {
        Self {
            current_step: WizardStep::ImageInput,
            camera_calibration: CameraCalibrationState::default(),
            aruco_settings: ArucoSettingsState::default(),
            image_input: ImageInputState::default(),
            measurements: MeasurementsState::default(),
            configure: ConfigureState::default(),
            output_settings: OutputSettingsState::default(),
            generate: GenerateState::default(),
            events: EventBus::new(),
        }
    }

    /// Get current step
    pub fn current_step(&self) -> WizardStep {
        self.current_step
    }

    /// The bus carrying this state's change notifications
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> crossbeam_channel::Receiver<StateEvent> {
        self.events.subscribe().0
    }

    /// Check if we can proceed to the next step
    pub fn can_go_next(&self) -> bool {
        match self.current_step {
            WizardStep::ImageInput => self.image_input.is_complete(),
            WizardStep::Measurements => self.measurements.is_complete(),
            WizardStep::AccuracyReview => self.measurements.parameters_computed,
            WizardStep::Configure => self.configure.is_complete(),
            WizardStep::OutputSettings => self.output_settings.is_complete(),
            // Terminal step, regardless of its own completeness
            WizardStep::Generate => false,
        }
    }

    /// Check if we can go back to the previous step
    pub fn can_go_back(&self) -> bool {
        !self.current_step.is_first()
    }

    /// Advance to the next step if possible
    pub fn go_next(&mut self) -> bool {
        if !self.can_go_next() {
            return false;
        }
        let next_index = self.current_step.index() + 1;
        // Bound re-checked here: a corrupted ordinal must never walk past the end
        if next_index > WizardStep::Generate.index() {
            return false;
        }
        let Some(next) = WizardStep::from_index(next_index) else {
            return false;
        };
        let from = self.current_step;
        self.current_step = next;
        self.events.publish(StateEvent::StepChanged { from, to: next });
        true
    }

    /// Go back to the previous step if possible
    pub fn go_back(&mut self) -> bool {
        if !self.can_go_back() {
            return false;
        }
        let Some(prev_index) = self.current_step.index().checked_sub(1) else {
            return false;
        };
        if prev_index < WizardStep::ImageInput.index() {
            return false;
        }
        let Some(prev) = WizardStep::from_index(prev_index) else {
            return false;
        };

        // Leaving the generation step abandons the in-flight run display;
        // finished outputs stay visible if the user returns.
        if self.current_step == WizardStep::Generate {
            self.generate.reset_run();
        }

        let from = self.current_step;
        self.current_step = prev;
        self.events.publish(StateEvent::StepChanged { from, to: prev });
        true
    }

    /// Navigate directly to a specific step.
    /// Only backward or same-position jumps are allowed; forward movement
    /// must pass through `go_next` so completeness is re-validated per hop.
    pub fn go_to_step(&mut self, step: WizardStep) -> bool {
        if step.index() > self.current_step.index() {
            return false;
        }
        let from = self.current_step;
        self.current_step = step;
        self.events.publish(StateEvent::StepChanged { from, to: step });
        true
    }

    /// Reset the wizard to its initial state.
    /// The standalone calibration and marker features are kept; they
    /// describe the studio setup, not the current subject.
    pub fn reset(&mut self) {
        self.current_step = WizardStep::ImageInput;
        self.image_input = ImageInputState::default();
        self.measurements = MeasurementsState::default();
        self.configure = ConfigureState::default();
        self.output_settings = OutputSettingsState::default();
        self.generate = GenerateState::default();
        self.events.publish(StateEvent::WasReset);
    }

    /// Re-derive the on-disk configuration validity flags for the image
    /// input step: a usable calibration document and a plausible marker
    /// layout must both exist before extraction can run.
    pub fn refresh_configuration_validity(&mut self, config: &Config) {
        let calibration_path = config.calibration_path();
        self.image_input.camera_calibration_valid = calibration_path.exists()
            && CalibrationFile::load(&calibration_path)
                .map(|file| file.is_usable())
                .unwrap_or(false);
        self.camera_calibration.load_existing(&calibration_path);

        let marker_path = config.marker_details_path();
        if self.aruco_settings.load(&marker_path) {
            self.image_input.aruco_settings_valid = self.aruco_settings.is_valid();
        } else {
            self.image_input.aruco_settings_valid = false;
        }
    }

    /// Fold a background job event into the step states.
    /// Called on the thread that owns this state; publishes nothing.
    pub fn apply_event(&mut self, event: &StateEvent) {
        match event {
            StateEvent::JobStarted { job } => match job {
                JobKind::Extraction => {
                    self.image_input.is_extracting = true;
                    self.image_input.extraction_error = None;
                }
                JobKind::Calibration => {
                    self.camera_calibration.reset_results();
                    self.camera_calibration.is_calibrating = true;
                    self.camera_calibration.progress_message = "Calibrating...".to_string();
                }
                JobKind::Parameters => {
                    self.measurements.is_computing_parameters = true;
                    self.measurements.parameters_error = None;
                }
                JobKind::Generation => {
                    self.generate.reset_run();
                    self.generate.is_generating = true;
                }
            },
            StateEvent::ExtractionFinished { outcome } => {
                self.image_input.is_extracting = false;
                self.image_input.extraction_error = None;
                self.measurements
                    .apply_extracted(&outcome.measurements, outcome.visualization_path.clone());
            }
            StateEvent::CalibrationFinished { outcome } => {
                let c = &mut self.camera_calibration;
                c.is_calibrating = false;
                c.progress_message.clear();
                c.calibration_success = Some(true);
                c.reprojection_error = Some(outcome.reprojection_error);
                c.num_successful_images = outcome.num_successful_images;
                c.num_failed_images = outcome.num_failed_images;
                self.image_input.camera_calibration_valid = true;
            }
            StateEvent::ParametersComputed { report } => {
                self.measurements.is_computing_parameters = false;
                self.measurements.parameters_computed = true;
                self.measurements.parameters_report = Some(report.clone());
            }
            StateEvent::GenerationProgress { fraction, status } => {
                self.generate.progress = *fraction;
                self.generate.status_message = status.clone();
            }
            StateEvent::GenerationFinished { outcome } => {
                self.generate.is_generating = false;
                self.generate.progress = 1.0;
                self.generate.output_fbx_path = outcome.fbx_path.clone();
                self.generate.output_obj_path = outcome.obj_path.clone();
                self.generate.preview_images = outcome.preview_images.clone();
                self.generate.error_message = None;
            }
            StateEvent::JobFailed { job, message } => match job {
                JobKind::Extraction => {
                    self.image_input.is_extracting = false;
                    self.image_input.extraction_error = Some(message.clone());
                }
                JobKind::Calibration => {
                    let c = &mut self.camera_calibration;
                    c.is_calibrating = false;
                    c.progress_message.clear();
                    c.calibration_success = Some(false);
                    c.error_message = Some(message.clone());
                }
                JobKind::Parameters => {
                    self.measurements.is_computing_parameters = false;
                    self.measurements.parameters_error = Some(message.clone());
                }
                JobKind::Generation => {
                    self.generate.is_generating = false;
                    self.generate.error_message = Some(message.clone());
                }
            },
            StateEvent::StepChanged { .. } | StateEvent::WasReset => {}
        }
    }

    /// Assemble the documents generation needs from the current state.
    /// None until gender, race and an output directory have been chosen.
    pub fn generation_request(&self) -> Option<(MeasurementsFile, GenerationConfig)> {
        let gender = self.image_input.gender?;
        let race = self.image_input.race?;
        let config = GenerationConfig::from_states(&self.configure, &self.output_settings)?;
        Some((self.measurements.to_file(gender, race), config))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
