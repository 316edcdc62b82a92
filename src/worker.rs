/// Background job dispatch
///
/// Long-running backend operations run on worker threads so the thread
/// driving the wizard stays responsive. Lifecycle and results are announced
/// on the event bus; whoever owns the AppState folds them back in with
/// `apply_event` on its own thread.
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::backend::{Backend, GenerationConfig};
use crate::documents::{Gender, MeasurementsFile, Race};
use crate::messaging::{EventBus, JobKind, StateEvent};

/// Inputs for a measurement extraction run
#[derive(Debug, Clone)]
pub struct ExtractionJob {
    pub front_image: PathBuf,
    pub height_cm: f64,
    pub calibration_path: PathBuf,
    pub marker_details_path: PathBuf,
    pub gender: Gender,
    pub race: Race,
}

/// Inputs for a camera calibration run
#[derive(Debug, Clone)]
pub struct CalibrationJob {
    pub image_dir: PathBuf,
    pub checkerboard: (u32, u32),
    pub square_size_mm: f64,
    pub output_path: PathBuf,
}

/// Dispatches backend operations onto worker threads
pub struct Jobs {
    backend: Arc<dyn Backend>,
    events: EventBus,
}

impl Jobs {
    pub fn new(backend: Arc<dyn Backend>, events: EventBus) -> Self {
        Self { backend, events }
    }

    /// Run camera calibration in the background
    pub fn spawn_calibration(&self, job: CalibrationJob) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();

        thread::spawn(move || {
            events.publish(StateEvent::JobStarted {
                job: JobKind::Calibration,
            });
            let result = backend.calibrate_camera(
                &job.image_dir,
                job.checkerboard,
                job.square_size_mm,
                &job.output_path,
            );
            match result {
                Ok(outcome) => events.publish(StateEvent::CalibrationFinished { outcome }),
                Err(e) => {
                    tracing::error!("Calibration job failed: {e}");
                    events.publish(StateEvent::JobFailed {
                        job: JobKind::Calibration,
                        message: e.to_string(),
                    });
                }
            }
        })
    }

    /// Run measurement extraction in the background
    pub fn spawn_extraction(&self, job: ExtractionJob) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();

        thread::spawn(move || {
            events.publish(StateEvent::JobStarted {
                job: JobKind::Extraction,
            });
            let result = backend.extract_measurements(
                &job.front_image,
                job.height_cm,
                &job.calibration_path,
                &job.marker_details_path,
                job.gender,
                job.race,
            );
            match result {
                Ok(outcome) => events.publish(StateEvent::ExtractionFinished { outcome }),
                Err(e) => {
                    tracing::error!("Extraction job failed: {e}");
                    events.publish(StateEvent::JobFailed {
                        job: JobKind::Extraction,
                        message: e.to_string(),
                    });
                }
            }
        })
    }

    /// Run mesh parameter computation in the background
    pub fn spawn_parameters(&self, measurements_path: PathBuf) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();

        thread::spawn(move || {
            events.publish(StateEvent::JobStarted {
                job: JobKind::Parameters,
            });
            match backend.compute_mesh_parameters(&measurements_path) {
                Ok(report) => events.publish(StateEvent::ParametersComputed { report }),
                Err(e) => {
                    tracing::error!("Parameter job failed: {e}");
                    events.publish(StateEvent::JobFailed {
                        job: JobKind::Parameters,
                        message: e.to_string(),
                    });
                }
            }
        })
    }

    /// Run avatar generation in the background, forwarding progress events
    pub fn spawn_generation(
        &self,
        measurements: MeasurementsFile,
        config: GenerationConfig,
    ) -> JoinHandle<()> {
        let backend = Arc::clone(&self.backend);
        let events = self.events.clone();

        thread::spawn(move || {
            events.publish(StateEvent::JobStarted {
                job: JobKind::Generation,
            });
            let progress_events = events.clone();
            let result = backend.generate_avatar(&measurements, &config, &|fraction, status| {
                progress_events.publish(StateEvent::GenerationProgress {
                    fraction,
                    status: status.to_string(),
                });
            });
            match result {
                Ok(outcome) => events.publish(StateEvent::GenerationFinished { outcome }),
                Err(e) => {
                    tracing::error!("Generation job failed: {e}");
                    events.publish(StateEvent::JobFailed {
                        job: JobKind::Generation,
                        message: e.to_string(),
                    });
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::state::{ConfigureState, OutputSettingsState};

    fn jobs_with_bus() -> (Jobs, crossbeam_channel::Receiver<StateEvent>) {
        let bus = EventBus::new();
        let (rx, _id) = bus.subscribe();
        (Jobs::new(Arc::new(MockBackend::new()), bus), rx)
    }

    #[test]
    fn test_extraction_job_publishes_lifecycle() {
        let (jobs, rx) = jobs_with_bus();

        let handle = jobs.spawn_extraction(ExtractionJob {
            front_image: PathBuf::from("front.jpg"),
            height_cm: 170.0,
            calibration_path: PathBuf::from("calibration.json"),
            marker_details_path: PathBuf::from("marker_details.json"),
            gender: Gender::Female,
            race: Race::Caucasian,
        });
        handle.join().unwrap();

        assert!(matches!(
            rx.try_recv().unwrap(),
            StateEvent::JobStarted {
                job: JobKind::Extraction
            }
        ));
        match rx.try_recv().unwrap() {
            StateEvent::ExtractionFinished { outcome } => {
                assert_eq!(outcome.measurements.weights_key(), "female_caucasian");
            }
            other => panic!("unexpected event: {}", other.description()),
        }
    }

    #[test]
    fn test_parameters_job_reports_failure() {
        let (jobs, rx) = jobs_with_bus();

        // Path does not exist, so the mock's document load fails
        let handle = jobs.spawn_parameters(PathBuf::from("/nonexistent/measurements.json"));
        handle.join().unwrap();

        assert!(matches!(
            rx.try_recv().unwrap(),
            StateEvent::JobStarted {
                job: JobKind::Parameters
            }
        ));
        match rx.try_recv().unwrap() {
            StateEvent::JobFailed { job, message } => {
                assert_eq!(job, JobKind::Parameters);
                assert!(!message.is_empty());
            }
            other => panic!("unexpected event: {}", other.description()),
        }
    }

    #[test]
    fn test_generation_job_forwards_progress() {
        let (jobs, rx) = jobs_with_bus();
        let dir = tempfile::tempdir().unwrap();

        let output = OutputSettingsState {
            output_directory: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let config = GenerationConfig::from_states(&ConfigureState::default(), &output).unwrap();

        let handle = jobs.spawn_generation(
            MeasurementsFile::new(Gender::Male, Race::Asian),
            config,
        );
        handle.join().unwrap();

        let events: Vec<StateEvent> = rx.try_iter().collect();
        assert!(matches!(
            events.first(),
            Some(StateEvent::JobStarted {
                job: JobKind::Generation
            })
        ));
        let progress_count = events
            .iter()
            .filter(|e| matches!(e, StateEvent::GenerationProgress { .. }))
            .count();
        assert!(progress_count >= 2);
        assert!(matches!(
            events.last(),
            Some(StateEvent::GenerationFinished { .. })
        ));
    }
}
