use anyhow::{Context, Result, bail};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;

use quadify::config::{FileConfig, QualityTier, Settings, clamp_sensitivity};
use quadify::engine::{NativeEngine, NativeEngineConfig};
use quadify::mesh::{load_mesh, save_mesh, validate_and_fix, validate_mesh};
use quadify::pipeline::{PipelineState, Retopo, StatusReporter};
use quadify::scene::Scene;

/// Turn messy triangle meshes into clean quad-dominant meshes
///
/// Examples:
///   # Retopologize a scan at the default (mid) quality
///   quadify statue.stl
///
///   # Low poly proxy with a fixed 5k budget, written as OBJ
///   quadify car.obj -q draft --no-smart-budget -o car_proxy.obj
///
///   # Only treat near right angles as creases, pin the solver seed
///   quadify part.stl --sensitivity 0.1 --seed 42
///
///   # Use a config file and keep a JSON report of the run
///   quadify --config my-settings.toml --report run.json
#[derive(Parser, Debug)]
#[command(name = "quadify")]
#[command(version, about, long_about = None)]
struct Args {
    /// Input mesh (.stl or .obj)
    input: Option<PathBuf>,

    /// Output mesh path (defaults to {input}_quads.obj)
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Path to config file (optional, auto-searches quadify.toml if not provided)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Quality tier: draft (~5k), mid (~15k) or high (~50k faces)
    #[arg(short = 'q', long, value_enum)]
    quality: Option<QualityTier>,

    /// Use the fixed face count of the quality tier instead of scaling with object size
    #[arg(long)]
    no_smart_budget: bool,

    /// Skip sharp edge detection before solving
    #[arg(long)]
    no_curvature: bool,

    /// Curvature sensitivity from 0.1 (only near right angles) to 1.0 (anything over 15°)
    #[arg(long)]
    sensitivity: Option<f64>,

    /// Skip the relax and re-project polish passes
    #[arg(long)]
    no_polish: bool,

    /// Solver seed (random per run if not given)
    #[arg(long)]
    seed: Option<u64>,

    /// Write a JSON report of the run to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let total_start = Instant::now();

    let file_config: Option<FileConfig> = if let Some(ref config_path) = args.config {
        if config_path.exists() {
            let contents = std::fs::read_to_string(config_path)
                .context(format!("Failed to read config file: {:?}", config_path))?;
            Some(toml::from_str(&contents).context("Failed to parse config file")?)
        } else {
            bail!("Config file not found: {:?}", config_path);
        }
    } else {
        FileConfig::load()
    };

    let verbose = args.verbose || file_config.as_ref().is_some_and(|c| c.verbose);
    init_logging(verbose);

    let input = args
        .input
        .clone()
        .or_else(|| file_config.as_ref().and_then(|c| c.input.clone()));
    let Some(input) = input else {
        bail!("No input mesh given. Pass a .stl or .obj path, or set `input` in quadify.toml");
    };
    if !input.exists() {
        bail!("Input mesh not found: {}", input.display());
    }

    let output_path = args
        .output
        .clone()
        .or_else(|| file_config.as_ref().and_then(|c| c.output.clone()))
        .unwrap_or_else(|| default_output_path(&input));
    let report_path = args
        .report
        .clone()
        .or_else(|| file_config.as_ref().and_then(|c| c.report.clone()));

    let settings = merge_settings(&args, file_config.as_ref());
    if clamp_sensitivity(settings.curvature_sensitivity) != settings.curvature_sensitivity {
        tracing::warn!(
            "Curvature sensitivity {} is outside 0.1-1.0, using {}",
            settings.curvature_sensitivity,
            settings.clamped_sensitivity()
        );
    }
    let engine_config = file_config
        .as_ref()
        .and_then(|c| c.engine.clone())
        .unwrap_or_default();

    println!("quadify - Quad Retopology");
    println!("=========================");
    println!();

    if verbose {
        print_configuration(&input, &output_path, &settings, &engine_config);
    }

    let spinner = create_spinner("Loading mesh...");
    let start = Instant::now();
    let mesh = load_mesh(&input).with_context(|| format!("Failed to load {}", input.display()))?;
    let (mesh, topology) = validate_and_fix(mesh);
    if mesh.is_empty() {
        spinner.finish_and_clear();
        bail!("Input mesh has no usable faces: {}", input.display());
    }
    spinner.finish_with_message(format!(
        "Loaded {} faces, {} vertices [{:.1}s]",
        mesh.face_count(),
        mesh.vertex_count(),
        start.elapsed().as_secs_f32()
    ));
    if verbose {
        println!("  Input topology: {}", topology.summary());
    }
    for warning in &topology.warnings {
        println!("  Warning: {}", warning);
    }

    let object_name = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Mesh".to_string());
    let mut scene = Scene::new();
    let id = scene.add_mesh(object_name, mesh);
    scene.set_active(Some(id))?;

    let mut retopo = Retopo::new(NativeEngine::with_config(engine_config), settings);
    let mut reporter = SpinnerReporter::default();
    let report = match retopo.run(&mut scene, &mut reporter) {
        Ok(report) => report,
        Err(e) => bail!("{}", e),
    };

    let spinner = create_spinner("Writing output mesh...");
    let start = Instant::now();
    let result = scene.mesh(id)?;
    save_mesh(&output_path, result).context("Failed to write output mesh")?;
    spinner.finish_with_message(format!(
        "Wrote {} [{:.1}s]",
        output_path.display(),
        start.elapsed().as_secs_f32()
    ));

    if let Some(ref path) = report_path {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        if verbose {
            println!("  Report: {}", path.display());
        }
    }

    println!();
    println!("{}", report.message());
    println!("Topology: {}", validate_mesh(result).summary());
    println!(
        "Done! Total time: {:.1}s",
        total_start.elapsed().as_secs_f32()
    );
    println!();
    println!("Output: {}", output_path.display());

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Flags override the config file; the file overrides defaults
fn merge_settings(args: &Args, file_config: Option<&FileConfig>) -> Settings {
    let mut settings = file_config.map(FileConfig::settings).unwrap_or_default();
    if let Some(quality) = args.quality {
        settings.quality = quality;
    }
    if args.no_smart_budget {
        settings.smart_budget = false;
    }
    if args.no_curvature {
        settings.detect_curvature = false;
    }
    if let Some(sensitivity) = args.sensitivity {
        settings.curvature_sensitivity = sensitivity;
    }
    if args.no_polish {
        settings.flow_polish = false;
    }
    if args.seed.is_some() {
        settings.seed = args.seed;
    }
    settings
}

fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_string());
    input.with_file_name(format!("{}_quads.obj", stem))
}

fn print_configuration(
    input: &Path,
    output: &Path,
    settings: &Settings,
    engine: &NativeEngineConfig,
) {
    let on_off = |flag: bool| if flag { "enabled" } else { "disabled" };

    println!("Configuration:");
    println!("  Input: {}", input.display());
    println!("  Output: {}", output.display());
    println!("  Quality: {}", settings.quality);
    println!("  Smart budget: {}", on_off(settings.smart_budget));
    println!(
        "  Curvature detection: {} (sensitivity {})",
        on_off(settings.detect_curvature),
        settings.clamped_sensitivity()
    );
    println!("  Flow polish: {}", on_off(settings.flow_polish));
    match settings.seed {
        Some(seed) => println!("  Seed: {}", seed),
        None => println!("  Seed: random"),
    }
    println!(
        "  Engine: {} max grid cells, {} solver attempts, {:.0}% face tolerance",
        engine.max_grid_cells,
        engine.solver_attempts,
        engine.face_tolerance * 100.0
    );
    println!();
}

/// Shows one spinner per pipeline stage
#[derive(Default)]
struct SpinnerReporter {
    current: Option<(ProgressBar, Instant)>,
}

impl StatusReporter for SpinnerReporter {
    fn stage_started(&mut self, stage: PipelineState) {
        let message = match stage {
            PipelineState::Snapshotted => "Taking reference snapshot...",
            PipelineState::Normalized => "Normalizing with voxel remesh...",
            PipelineState::FeaturesMarked => "Marking sharp edges...",
            PipelineState::Solved => "Solving quad layout...",
            PipelineState::Polished => "Polishing edge flow...",
            PipelineState::Shaded => "Applying smooth shading...",
            _ => "Finishing...",
        };
        self.current = Some((create_spinner(message), Instant::now()));
    }

    fn stage_finished(&mut self, _stage: PipelineState, message: &str) {
        if let Some((spinner, start)) = self.current.take() {
            spinner.finish_with_message(format!(
                "{} [{:.1}s]",
                message,
                start.elapsed().as_secs_f32()
            ));
        }
    }

    /// Clears the spinner; `main` prints the error itself
    fn stage_failed(&mut self, _stage: PipelineState, _message: &str) {
        if let Some((spinner, _)) = self.current.take() {
            spinner.finish_and_clear();
        }
    }
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("scans/statue.stl")),
            PathBuf::from("scans/statue_quads.obj")
        );
    }

    #[test]
    fn test_failed_stage_leaves_no_message() {
        let mut reporter = SpinnerReporter::default();
        reporter.stage_started(PipelineState::Normalized);
        let spinner = reporter.current.as_ref().map(|(s, _)| s.clone()).unwrap();

        reporter.stage_failed(PipelineState::Normalized, "Retopology failed during normalize");
        assert!(reporter.current.is_none());
        assert!(spinner.is_finished());
        assert_eq!(spinner.message(), "Normalizing with voxel remesh...");
    }

    #[test]
    fn test_flags_override_file() {
        let file: FileConfig = toml::from_str(
            r#"
            quality = "high"
            flow_polish = false
            curvature_sensitivity = 0.3
            "#,
        )
        .unwrap();

        let args = Args::parse_from(["quadify", "in.stl", "-q", "draft", "--seed", "9"]);
        let settings = merge_settings(&args, Some(&file));
        assert_eq!(settings.quality, QualityTier::Draft);
        assert!(!settings.flow_polish);
        assert_eq!(settings.curvature_sensitivity, 0.3);
        assert_eq!(settings.seed, Some(9));

        let args = Args::parse_from(["quadify", "--no-curvature", "--no-smart-budget"]);
        let settings = merge_settings(&args, None);
        assert!(!settings.detect_curvature);
        assert!(!settings.smart_budget);
        assert_eq!(settings.quality, QualityTier::Mid);
    }
}
