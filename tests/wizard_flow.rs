// Integration tests for the avatar wizard
// These tests exercise the navigation contract end to end and walk the
// whole flow against the mock backend.

use std::path::PathBuf;
use std::sync::Arc;

use avatar_forge::backend::GenerationConfig;
use avatar_forge::documents::{Gender, Race};
use avatar_forge::state::WizardStep;
use avatar_forge::worker::{CalibrationJob, ExtractionJob, Jobs};
use avatar_forge::{AppState, MockBackend, StateEvent};

fn complete_image_input(state: &mut AppState) {
    state.image_input.front_image_path = Some(PathBuf::from("front.jpg"));
    state.image_input.set_height_text("170").unwrap();
    state.image_input.gender = Some(Gender::Male);
    state.image_input.race = Some(Race::Asian);
    state.image_input.camera_calibration_valid = true;
    state.image_input.aruco_settings_valid = true;
}

/// Advance a fresh state to the given step, satisfying each gate on the way
fn state_at(step: WizardStep) -> AppState {
    let mut state = AppState::new();
    while state.current_step() != step {
        match state.current_step() {
            WizardStep::ImageInput => complete_image_input(&mut state),
            WizardStep::Measurements => state.measurements.is_extracted = true,
            WizardStep::AccuracyReview => state.measurements.parameters_computed = true,
            WizardStep::Configure => {}
            WizardStep::OutputSettings => {
                state.output_settings.output_directory = Some(PathBuf::from("/tmp/out"));
            }
            WizardStep::Generate => break,
        }
        assert!(state.go_next(), "gate at {} should be open", state.current_step());
    }
    state
}

/// Run one job to completion, folding its events into the state.
/// Returns false if the job reported failure.
fn drive<F>(state: &mut AppState, jobs: &Jobs, spawn: F) -> bool
where
    F: FnOnce(&Jobs) -> std::thread::JoinHandle<()>,
{
    let rx = state.subscribe();
    let handle = spawn(jobs);
    handle.join().unwrap();

    let mut failed = false;
    for event in rx.try_iter() {
        if matches!(event, StateEvent::JobFailed { .. }) {
            failed = true;
        }
        state.apply_event(&event);
    }
    !failed
}

#[test]
fn scenario_a_image_input_gate_opens_with_data() {
    let mut state = AppState::new();
    assert!(!state.can_go_next(), "no image selected yet");

    complete_image_input(&mut state);
    assert!(state.can_go_next());

    let before = state.current_step().index();
    assert!(state.go_next());
    assert_eq!(state.current_step().index(), before + 1);
}

#[test]
fn scenario_b_terminal_step_never_opens() {
    let mut state = state_at(WizardStep::Generate);
    state.generate.output_fbx_path = Some(PathBuf::from("avatar.fbx"));
    assert!(state.generate.is_complete());

    assert!(!state.can_go_next());
    assert!(!state.go_next());
    assert_eq!(state.current_step(), WizardStep::Generate);
}

#[test]
fn scenario_c_backward_jump_only() {
    let mut state = state_at(WizardStep::AccuracyReview);
    assert_eq!(state.current_step().index(), 2);

    assert!(state.go_to_step(WizardStep::ImageInput));
    assert_eq!(state.current_step().index(), 0);

    assert!(!state.go_to_step(WizardStep::AccuracyReview));
    assert_eq!(state.current_step().index(), 0);
}

#[test]
fn scenario_d_back_from_first_step_is_refused() {
    let mut state = AppState::new();
    assert!(!state.can_go_back());
    assert!(!state.go_back());
    assert_eq!(state.current_step(), WizardStep::ImageInput);
}

#[test]
fn go_next_succeeds_iff_guard_was_open_and_moves_by_one() {
    for target in WizardStep::all() {
        let mut state = state_at(target);
        let guard = state.can_go_next();
        let before = state.current_step().index();

        let moved = state.go_next();
        assert_eq!(moved, guard);
        let expected = if moved { before + 1 } else { before };
        assert_eq!(state.current_step().index(), expected);
        assert!(state.current_step().index() <= WizardStep::Generate.index());
    }
}

#[test]
fn can_go_back_everywhere_but_first() {
    for step in WizardStep::all() {
        let state = state_at(step);
        assert_eq!(state.can_go_back(), !step.is_first());
    }
}

#[test]
fn completeness_predicates_are_idempotent() {
    let state = state_at(WizardStep::OutputSettings);
    assert_eq!(state.image_input.is_complete(), state.image_input.is_complete());
    assert_eq!(state.measurements.is_complete(), state.measurements.is_complete());
    assert_eq!(state.configure.is_complete(), state.configure.is_complete());
    assert_eq!(
        state.output_settings.is_complete(),
        state.output_settings.is_complete()
    );
    assert_eq!(state.generate.is_complete(), state.generate.is_complete());
}

#[test]
fn reset_restores_fresh_defaults() {
    let mut state = state_at(WizardStep::Generate);
    state.measurements.set_value_text("height_cm", "190").unwrap();
    state.generate.output_fbx_path = Some(PathBuf::from("avatar.fbx"));

    state.reset();

    let fresh = AppState::new();
    assert_eq!(state.current_step(), fresh.current_step());
    assert_eq!(state.image_input, fresh.image_input);
    assert_eq!(state.measurements, fresh.measurements);
    assert_eq!(state.configure, fresh.configure);
    assert_eq!(state.output_settings, fresh.output_settings);
    assert_eq!(state.generate, fresh.generate);
}

#[test]
fn every_transition_is_announced_on_the_bus() {
    let mut state = state_at(WizardStep::Measurements);
    let rx = state.subscribe();

    assert!(state.go_back());
    complete_image_input(&mut state);
    assert!(state.go_next());
    state.reset();

    let events: Vec<StateEvent> = rx.try_iter().collect();
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], StateEvent::StepChanged { .. }));
    assert!(matches!(events[1], StateEvent::StepChanged { .. }));
    assert!(matches!(events[2], StateEvent::WasReset));
}

#[test]
fn full_flow_with_mock_backend() {
    let scratch = tempfile::tempdir().unwrap();
    let calibration_path = scratch.path().join("calibration.json");
    let marker_path = scratch.path().join("marker_details.json");
    let measurements_path = scratch.path().join("measurements.json");
    let output_dir = scratch.path().join("out");

    let mut state = AppState::new();
    let jobs = Jobs::new(Arc::new(MockBackend::new()), state.events().clone());

    // Studio setup: calibrate the camera, keep default markers
    assert!(drive(&mut state, &jobs, |jobs| {
        jobs.spawn_calibration(CalibrationJob {
            image_dir: scratch.path().to_path_buf(),
            checkerboard: (8, 6),
            square_size_mm: 40.0,
            output_path: calibration_path.clone(),
        })
    }));
    assert!(state.image_input.camera_calibration_valid);
    assert!(calibration_path.exists());
    state.aruco_settings.save(&marker_path).unwrap();
    state.image_input.aruco_settings_valid = state.aruco_settings.is_valid();

    // Step 1: subject data
    state.image_input.front_image_path = Some(scratch.path().join("front.jpg"));
    state.image_input.set_height_text("170").unwrap();
    state.image_input.gender = Some(Gender::Female);
    state.image_input.race = Some(Race::Caucasian);
    assert!(state.image_input.can_extract());

    assert!(drive(&mut state, &jobs, |jobs| {
        jobs.spawn_extraction(ExtractionJob {
            front_image: scratch.path().join("front.jpg"),
            height_cm: 170.0,
            calibration_path: calibration_path.clone(),
            marker_details_path: marker_path.clone(),
            gender: Gender::Female,
            race: Race::Caucasian,
        })
    }));
    assert!(state.measurements.is_extracted);
    assert_eq!(state.measurements.height_cm, Some(170.0));
    assert!(state.go_next());

    // Step 2: accept the extracted values, persist them for inference
    let (measurements, _) = {
        state.output_settings.output_directory = Some(output_dir.clone());
        state.generation_request().unwrap()
    };
    measurements.save(&measurements_path).unwrap();
    assert!(state.go_next());
    assert_eq!(state.current_step(), WizardStep::AccuracyReview);

    // Step 3: parameters must be computed before the gate opens
    assert!(!state.can_go_next());
    assert!(drive(&mut state, &jobs, |jobs| {
        jobs.spawn_parameters(measurements_path.clone())
    }));
    let report = state.measurements.parameters_report.as_ref().unwrap();
    assert!(report.summary.all_converged);
    assert!(state.go_next());

    // Steps 4 and 5 have valid defaults plus the chosen output directory
    assert!(state.go_next());
    assert!(state.go_next());
    assert_eq!(state.current_step(), WizardStep::Generate);

    // Step 6: generate and land in a complete terminal state
    let (measurements, config) = state.generation_request().unwrap();
    assert_eq!(config.fbx_path(), output_dir.join("avatar.fbx"));
    assert!(drive(&mut state, &jobs, move |jobs| {
        jobs.spawn_generation(measurements, config)
    }));

    assert!(state.generate.is_complete());
    assert_eq!(state.generate.progress, 1.0);
    assert!(state.generate.output_fbx_path.as_ref().unwrap().exists());
    assert!(!state.can_go_next());
}

#[test]
fn failed_extraction_keeps_the_gate_shut() {
    let mut state = AppState::new();
    complete_image_input(&mut state);
    assert!(state.go_next());
    assert_eq!(state.current_step(), WizardStep::Measurements);

    let jobs = Jobs::new(Arc::new(MockBackend::new()), state.events().clone());
    // The mock's parameter job fails on a missing file; reuse that to
    // produce a real failure event shape for the measurements step.
    assert!(!drive(&mut state, &jobs, |jobs| {
        jobs.spawn_parameters(PathBuf::from("/nonexistent/measurements.json"))
    }));

    assert!(state.measurements.parameters_error.is_some());
    assert!(!state.measurements.is_complete());
    assert!(!state.can_go_next());
    assert_eq!(state.current_step(), WizardStep::Measurements);
}

#[test]
fn generation_config_reflects_configure_choices() {
    let mut state = state_at(WizardStep::Generate);
    state.output_settings.output_filename = "subject_01".to_string();
    state.output_settings.export_obj = true;

    let (_, config) = state.generation_request().unwrap();
    assert!(config.fbx_path().ends_with("subject_01.fbx"));
    assert!(config.export_obj);
    assert_eq!(
        config,
        GenerationConfig::from_states(&state.configure, &state.output_settings).unwrap()
    );
}
