use std::path::PathBuf;
use std::sync::Arc;

use avatar_forge::backend::{reveal_in_file_manager, GenerationConfig};
use avatar_forge::documents::{Gender, MeasurementsFile, Race};
use avatar_forge::state::{ConfigureState, OutputSettingsState};
use avatar_forge::worker::{CalibrationJob, ExtractionJob, Jobs};
use avatar_forge::{AppState, Backend, Config, MockBackend, ScriptBackend, StateEvent};

/// Initialize tracing with file rotation
///
/// Logs are written to:
/// - macOS: ~/Library/Application Support/AvatarForge/logs/
/// - Windows: %APPDATA%/AvatarForge/logs/
/// - Linux: ~/.config/AvatarForge/logs/
///
/// Log rotation:
/// - Daily rotation (new file each day)
/// - Files named: avatar-forge.YYYY-MM-DD.log
///
/// Log output:
/// - Debug builds: Console + File
/// - Release builds: File only
fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = dirs::config_dir()
        .map(|dir| dir.join("AvatarForge").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    let file_appender = rolling::daily(&log_dir, "avatar-forge.log");

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }
}

fn print_usage() {
    println!("Avatar Forge - headless driver");
    println!();
    println!("Usage:");
    println!("  avatar-forge calibrate <image_dir> [--checkerboard CxR] [--square-size MM]");
    println!("  avatar-forge extract <front_image> --height CM --gender male|female --race asian|caucasian");
    println!("  avatar-forge parameters");
    println!("  avatar-forge generate <output_dir> [--name NAME] [--rig TYPE] [--obj] [--open] [--reveal]");
    println!("  avatar-forge doctor");
    println!();
    println!("Each command prints the events it observes and exits non-zero on failure.");
}

/// Pull a `--flag VALUE` pair out of an argument list
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

/// Drive one background job to completion, mirroring every event into the
/// state and onto the console. Returns false if the job failed.
fn drive_job<F>(state: &mut AppState, jobs: &Jobs, spawn: F) -> bool
where
    F: FnOnce(&Jobs) -> std::thread::JoinHandle<()>,
{
    let rx = state.subscribe();
    let handle = spawn(jobs);

    let mut failed = false;
    // The worker drops its bus clone senders only at process exit, so read
    // until the terminal event of this job rather than until disconnect.
    while let Ok(event) = rx.recv() {
        println!("  {}", event.description());
        state.apply_event(&event);
        match event {
            StateEvent::ExtractionFinished { .. }
            | StateEvent::CalibrationFinished { .. }
            | StateEvent::ParametersComputed { .. }
            | StateEvent::GenerationFinished { .. } => break,
            StateEvent::JobFailed { .. } => {
                failed = true;
                break;
            }
            _ => {}
        }
    }

    let _ = handle.join();
    !failed
}

fn cmd_calibrate(config: &Config, args: &[String]) -> i32 {
    let Some(image_dir) = args.first() else {
        eprintln!("✗ Missing image directory");
        return 2;
    };

    let mut state = AppState::new();
    state.camera_calibration.image_directory = Some(PathBuf::from(image_dir));
    if let Some(text) = flag_value(args, "--checkerboard") {
        let parts: Vec<&str> = text.split('x').collect();
        let parsed = match parts.as_slice() {
            [cols, rows] => state
                .camera_calibration
                .set_cols_text(cols)
                .and_then(|_| state.camera_calibration.set_rows_text(rows)),
            _ => {
                eprintln!("✗ Expected --checkerboard COLSxROWS, e.g. 8x6");
                return 2;
            }
        };
        if let Err(e) = parsed {
            eprintln!("✗ {e}");
            return 2;
        }
    }
    if let Some(text) = flag_value(args, "--square-size") {
        if let Err(e) = state.camera_calibration.set_square_size_text(&text) {
            eprintln!("✗ {e}");
            return 2;
        }
    }

    if !state.camera_calibration.can_calibrate() {
        eprintln!("✗ Calibration cannot start");
        return 1;
    }

    let backend: Arc<dyn Backend> = Arc::new(ScriptBackend::new(config.clone()));
    let jobs = Jobs::new(backend, state.events().clone());
    let job = CalibrationJob {
        image_dir: PathBuf::from(image_dir),
        checkerboard: (
            state.camera_calibration.checkerboard_cols,
            state.camera_calibration.checkerboard_rows,
        ),
        square_size_mm: state.camera_calibration.square_size_mm,
        output_path: config.calibration_path(),
    };

    println!("Calibrating from {image_dir}...");
    if drive_job(&mut state, &jobs, |jobs| jobs.spawn_calibration(job)) {
        println!("✓ Calibration written to {}", config.calibration_path().display());
        0
    } else {
        1
    }
}

fn cmd_extract(config: &Config, args: &[String]) -> i32 {
    let Some(front_image) = args.first() else {
        eprintln!("✗ Missing front image path");
        return 2;
    };

    let mut state = AppState::new();
    state.image_input.front_image_path = Some(PathBuf::from(front_image));

    let Some(height) = flag_value(args, "--height") else {
        eprintln!("✗ Missing --height");
        return 2;
    };
    if let Err(e) = state.image_input.set_height_text(&height) {
        eprintln!("✗ {e}");
        return 2;
    }

    state.image_input.gender = match flag_value(args, "--gender").as_deref() {
        Some(text) => match text.parse::<Gender>() {
            Ok(gender) => Some(gender),
            Err(e) => {
                eprintln!("✗ {e}");
                return 2;
            }
        },
        None => {
            eprintln!("✗ Missing --gender");
            return 2;
        }
    };
    state.image_input.race = match flag_value(args, "--race").as_deref() {
        Some(text) => match text.parse::<Race>() {
            Ok(race) => Some(race),
            Err(e) => {
                eprintln!("✗ {e}");
                return 2;
            }
        },
        None => {
            eprintln!("✗ Missing --race");
            return 2;
        }
    };

    state.refresh_configuration_validity(config);
    if !state.image_input.camera_calibration_valid {
        eprintln!("✗ No usable camera calibration. Run `avatar-forge calibrate` first.");
        return 1;
    }
    if !state.image_input.aruco_settings_valid {
        eprintln!(
            "✗ No marker configuration at {}",
            config.marker_details_path().display()
        );
        return 1;
    }
    if !state.image_input.can_extract() {
        eprintln!("✗ Extraction cannot start");
        return 1;
    }

    let backend: Arc<dyn Backend> = Arc::new(ScriptBackend::new(config.clone()));
    let jobs = Jobs::new(backend, state.events().clone());
    let job = ExtractionJob {
        front_image: PathBuf::from(front_image),
        height_cm: state.image_input.height_cm.unwrap_or(0.0),
        calibration_path: config.calibration_path(),
        marker_details_path: config.marker_details_path(),
        gender: state.image_input.gender.unwrap_or(Gender::Male),
        race: state.image_input.race.unwrap_or(Race::Asian),
    };

    println!("Extracting measurements from {front_image}...");
    if drive_job(&mut state, &jobs, |jobs| jobs.spawn_extraction(job)) {
        println!(
            "✓ Measurements written to {}",
            config.measurements_path().display()
        );
        0
    } else {
        1
    }
}

fn cmd_parameters(config: &Config) -> i32 {
    let measurements_path = config.measurements_path();
    if !measurements_path.exists() {
        eprintln!(
            "✗ No measurements at {}. Run `avatar-forge extract` first.",
            measurements_path.display()
        );
        return 1;
    }

    let mut state = AppState::new();
    let backend: Arc<dyn Backend> = Arc::new(ScriptBackend::new(config.clone()));
    let jobs = Jobs::new(backend, state.events().clone());

    println!("Computing mesh parameters...");
    if !drive_job(&mut state, &jobs, |jobs| {
        jobs.spawn_parameters(measurements_path)
    }) {
        return 1;
    }

    if let Some(report) = &state.measurements.parameters_report {
        println!("{:<20} {:>10} {:>10} {:>8} {:>6}", "Measurement", "Target", "Actual", "Error", "OK");
        for (key, fit) in &report.measurements {
            let label: &str = match avatar_forge::documents::report::display_label(key) {
                Some(label) => label,
                None => key,
            };
            println!(
                "{:<20} {:>10.2} {:>10.2} {:>+8.3} {:>6}",
                label,
                fit.target,
                fit.actual,
                fit.error,
                if fit.converged { "OK" } else { "!" },
            );
        }
        println!(
            "✓ {}/{} measurements converged, mean error {:.3} cm, max error {:.3} cm",
            report.summary.converged_count,
            report.summary.total_measurements,
            report.summary.mean_absolute_error,
            report.summary.max_absolute_error,
        );
    }
    0
}

fn cmd_generate(config: &Config, args: &[String]) -> i32 {
    let Some(output_dir) = args.first() else {
        eprintln!("✗ Missing output directory");
        return 2;
    };

    let measurements_path = config.measurements_path();
    let measurements = match MeasurementsFile::load(&measurements_path) {
        Ok(measurements) => measurements,
        Err(e) => {
            eprintln!("✗ {e}. Run `avatar-forge extract` first.");
            return 1;
        }
    };

    let mut configure = ConfigureState::default();
    if let Some(text) = flag_value(args, "--rig") {
        configure.rig_type = match text.parse() {
            Ok(rig) => rig,
            Err(e) => {
                eprintln!("✗ {e}");
                return 2;
            }
        };
    }

    let output_settings = OutputSettingsState {
        output_directory: Some(PathBuf::from(output_dir)),
        output_filename: flag_value(args, "--name").unwrap_or_else(|| "avatar".to_string()),
        export_fbx: true,
        export_obj: has_flag(args, "--obj"),
    };
    let Some(generation_config) = GenerationConfig::from_states(&configure, &output_settings)
    else {
        eprintln!("✗ Output settings incomplete");
        return 1;
    };

    let mut state = AppState::new();
    let backend: Arc<dyn Backend> = Arc::new(ScriptBackend::new(config.clone()));
    let jobs = Jobs::new(Arc::clone(&backend), state.events().clone());

    println!(
        "Generating avatar into {output_dir} ({} rig, {} arm instrumented)...",
        generation_config.rig_type.as_str(),
        generation_config.instrumented_arm.as_str(),
    );
    let job_config = generation_config.clone();
    if !drive_job(&mut state, &jobs, move |jobs| {
        jobs.spawn_generation(measurements, job_config)
    }) {
        return 1;
    }

    if let Some(path) = &state.generate.output_fbx_path {
        println!("✓ {}", path.display());
    }
    if let Some(path) = &state.generate.output_obj_path {
        println!("✓ {}", path.display());
    }

    if has_flag(args, "--open") {
        if let Some(path) = &state.generate.output_fbx_path {
            if let Err(e) = backend.open_in_viewer(path) {
                eprintln!("✗ {e}");
                return 1;
            }
        }
    }
    if has_flag(args, "--reveal") {
        if let Err(e) = reveal_in_file_manager(&generation_config.output_directory) {
            eprintln!("✗ {e}");
            return 1;
        }
    }
    0
}

/// Walk the whole wizard against the mock backend in a scratch directory.
/// A cheap end-to-end self check of the state machine and job plumbing.
fn cmd_doctor() -> i32 {
    let scratch = std::env::temp_dir().join(format!("avatar-forge-doctor-{}", std::process::id()));
    if let Err(e) = std::fs::create_dir_all(&scratch) {
        eprintln!("✗ Could not create scratch directory: {e}");
        return 1;
    }

    let mut state = AppState::new();
    let backend: Arc<dyn Backend> = Arc::new(MockBackend::new());
    let jobs = Jobs::new(Arc::clone(&backend), state.events().clone());

    println!("Step 1: {}", state.current_step());
    state.image_input.front_image_path = Some(scratch.join("front.jpg"));
    if state.image_input.set_height_text("170").is_err() {
        eprintln!("✗ Height rejected");
        return 1;
    }
    state.image_input.gender = Some(Gender::Male);
    state.image_input.race = Some(Race::Asian);

    let calibration_path = scratch.join("calibration.json");
    if !drive_job(&mut state, &jobs, |jobs| {
        jobs.spawn_calibration(CalibrationJob {
            image_dir: scratch.clone(),
            checkerboard: (8, 6),
            square_size_mm: 40.0,
            output_path: calibration_path.clone(),
        })
    }) {
        eprintln!("✗ Calibration failed");
        return 1;
    }
    state.image_input.aruco_settings_valid = state.aruco_settings.is_valid();

    if !state.can_go_next() {
        eprintln!("✗ Image input step did not complete");
        return 1;
    }

    if !drive_job(&mut state, &jobs, |jobs| {
        jobs.spawn_extraction(ExtractionJob {
            front_image: scratch.join("front.jpg"),
            height_cm: 170.0,
            calibration_path: calibration_path.clone(),
            marker_details_path: scratch.join("marker_details.json"),
            gender: Gender::Male,
            race: Race::Asian,
        })
    }) {
        eprintln!("✗ Extraction failed");
        return 1;
    }
    if !state.go_next() {
        eprintln!("✗ Could not advance to measurements review");
        return 1;
    }
    println!("Step 2: {}", state.current_step());

    // Pick the output directory now so the generation request is complete
    state.output_settings.output_directory = Some(scratch.join("out"));

    let measurements_path = scratch.join("measurements.json");
    let Some((measurements, _)) = state.generation_request() else {
        eprintln!("✗ Measurements are missing subject identity");
        return 1;
    };
    if let Err(e) = measurements.save(&measurements_path) {
        eprintln!("✗ {e}");
        return 1;
    }

    if !state.go_next() {
        eprintln!("✗ Could not advance to accuracy review");
        return 1;
    }
    println!("Step 3: {}", state.current_step());

    if !drive_job(&mut state, &jobs, |jobs| {
        jobs.spawn_parameters(measurements_path.clone())
    }) {
        eprintln!("✗ Parameter computation failed");
        return 1;
    }

    for expected in ["Configure Avatar", "Output Settings", "Generate"] {
        if !state.go_next() {
            eprintln!("✗ Could not advance to {expected}");
            return 1;
        }
        println!("Step {}: {}", state.current_step().index() + 1, state.current_step());
    }

    let Some((measurements, generation_config)) = state.generation_request() else {
        eprintln!("✗ Generation request incomplete");
        return 1;
    };
    if !drive_job(&mut state, &jobs, move |jobs| {
        jobs.spawn_generation(measurements, generation_config)
    }) {
        eprintln!("✗ Generation failed");
        return 1;
    }

    if state.generate.is_complete() && !state.can_go_next() {
        println!("✓ Wizard walked end to end");
        0
    } else {
        eprintln!("✗ Terminal state is inconsistent");
        1
    }
}

fn main() {
    initialize_tracing();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str);

    // Doctor needs no configuration; everything else does
    if command == Some("doctor") {
        std::process::exit(cmd_doctor());
    }

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ Failed to load config: {e}");
            std::process::exit(1);
        }
    };

    let rest: &[String] = args.get(2..).unwrap_or(&[]);
    let code = match command {
        Some("calibrate") => cmd_calibrate(&config, rest),
        Some("extract") => cmd_extract(&config, rest),
        Some("parameters") => cmd_parameters(&config),
        Some("generate") => cmd_generate(&config, rest),
        _ => {
            print_usage();
            2
        }
    };
    std::process::exit(code);
}
