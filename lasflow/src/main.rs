//! Command-line front end: `lasflow <recipe> [options]`.
//!
//! Exit status: 0 on success, 1 on a failed stage or missing inputs, 2 on a
//! configuration error, 130 when interrupted.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use lasflow::cancellation::CancellationToken;
use lasflow::config::{Configuration, ToolSettings, WarningPolicy};
use lasflow::errors::{ConfigurationError, LasflowError};
use lasflow::events::LoggingEventSink;
use lasflow::pipeline::{PipelineRun, PipelineRunner};
use lasflow::recipes::tools::{duplicate_keys, sort_keys};
use lasflow::recipes::{keys, Granularity, Recipe, Terrain};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "lasflow", author, version, about = "Run LAStools processing pipelines")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    recipe: RecipeCommand,
}

#[derive(Args, Debug)]
struct GlobalArgs {
    /// Tool settings file (JSON)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// LAStools installation folder
    #[arg(long, global = true)]
    lastools_dir: Option<PathBuf>,

    /// Wine folder, to run the Windows binaries
    #[arg(long, global = true)]
    wine_dir: Option<PathBuf>,

    /// Cores handed to multi-core tools
    #[arg(long, global = true)]
    cores: Option<u32>,

    /// Verbose tools and debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// How warnings in successful tool output are treated (ignore, log, escalate)
    #[arg(long, global = true)]
    warnings: Option<WarningPolicy>,

    /// Recipe options file (JSON); command-line options take precedence
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for intermediate products (a fresh temporary folder by default)
    #[arg(long, global = true)]
    working_dir: Option<PathBuf>,

    /// Print the planned command lines without running anything
    #[arg(long, global = true)]
    dry_run: bool,

    /// Print the run record as JSON
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum RecipeCommand {
    /// Tile flightlines and merge spike-free CHM tiles into one raster
    FlightlinesToMergedChm(FlightlineArgs),
    /// Tile flightlines and merge highest-return CHM tiles into one raster
    FlightlinesToMergedChmHighest(FlightlineArgs),
    /// Classify ground, buildings and vegetation of one huge file
    HugeFileClassify(HugeFileArgs),
    /// Ground-classify one huge file
    HugeFileGroundClassify(HugeFileArgs),
    /// Height-normalize one huge file
    HugeFileNormalize(HugeFileArgs),
    /// Sort the points of every file in a folder
    Lassort(SortArgs),
    /// Remove duplicate points from every file in a folder
    Lasduplicate(DuplicateArgs),
}

#[derive(Args, Debug)]
struct FlightlineArgs {
    /// Folder with the flightlines
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Wildcard selecting flightlines in the folder
    #[arg(long)]
    input_wildcard: Option<String>,
    /// Merged output raster
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Raster format when the output has no extension
    #[arg(long)]
    format: Option<String>,
    /// Tile side length
    #[arg(long)]
    tile_size: Option<f64>,
    /// Tile buffer, 0 for none
    #[arg(long)]
    buffer: Option<f64>,
    /// Terrain type
    #[arg(long)]
    terrain: Option<Terrain>,
    /// Laser beam width, 0 for none
    #[arg(long)]
    beam_width: Option<f64>,
    /// Raster step
    #[arg(long)]
    step: Option<f64>,
    /// Spike-free freeze value, 0 for three times the step
    #[arg(long)]
    freeze_value: Option<f64>,
}

#[derive(Args, Debug)]
struct HugeFileArgs {
    /// The huge input file
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Output file
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Tile side length
    #[arg(long)]
    tile_size: Option<f64>,
    /// Tile buffer, 0 for none
    #[arg(long)]
    buffer: Option<f64>,
    /// Terrestrial or mobile scan instead of airborne
    #[arg(long)]
    not_airborne: bool,
    /// Terrain type
    #[arg(long)]
    terrain: Option<Terrain>,
    /// Preprocessing granularity
    #[arg(long)]
    granularity: Option<Granularity>,
}

#[derive(Args, Debug)]
struct FolderArgs {
    /// Input folder
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Wildcard selecting files in the folder
    #[arg(long)]
    input_wildcard: Option<String>,
    /// Output folder
    #[arg(long)]
    output_directory: Option<PathBuf>,
    /// Appendix added to output file names
    #[arg(long)]
    output_appendix: Option<String>,
    /// Point format of the outputs
    #[arg(long)]
    output_format: Option<String>,
    /// Extra tool arguments
    #[arg(long, allow_hyphen_values = true)]
    additional: Option<String>,
}

#[derive(Args, Debug)]
struct SortArgs {
    #[command(flatten)]
    folder: FolderArgs,
    /// Sort by GPS time
    #[arg(long)]
    gps_time: bool,
    /// Sort by return number
    #[arg(long)]
    return_number: bool,
    /// Sort by point source id
    #[arg(long)]
    point_source: bool,
}

#[derive(Args, Debug)]
struct DuplicateArgs {
    #[command(flatten)]
    folder: FolderArgs,
    /// Keep the duplicate with the lowest z
    #[arg(long)]
    lowest_z: bool,
    /// Keep the duplicate with the highest z
    #[arg(long)]
    highest_z: bool,
    /// Only remove duplicates in x, y and z
    #[arg(long)]
    unique_xyz: bool,
    /// Mark the surviving duplicate as a single return
    #[arg(long)]
    single_returns: bool,
    /// Keep only one point within this tolerance
    #[arg(long)]
    nearby: Option<f64>,
    /// Record removed duplicates to a separate file
    #[arg(long)]
    record_removed: bool,
}

impl FlightlineArgs {
    fn apply(self, config: Configuration) -> Configuration {
        config
            .with_opt(keys::INPUT, self.input)
            .with_opt(keys::INPUT_WILDCARD, self.input_wildcard)
            .with_opt(keys::OUTPUT, self.output)
            .with_opt(keys::FORMAT, self.format)
            .with_opt(keys::TILE_SIZE, self.tile_size)
            .with_opt(keys::BUFFER, self.buffer)
            .with_opt(keys::TERRAIN, self.terrain.map(|t| t.as_str()))
            .with_opt(keys::BEAM_WIDTH, self.beam_width)
            .with_opt(keys::STEP, self.step)
            .with_opt(keys::FREEZE_VALUE, self.freeze_value)
    }
}

impl HugeFileArgs {
    fn apply(self, config: Configuration) -> Configuration {
        config
            .with_opt(keys::INPUT, self.input)
            .with_opt(keys::OUTPUT, self.output)
            .with_opt(keys::TILE_SIZE, self.tile_size)
            .with_opt(keys::BUFFER, self.buffer)
            .with_opt(keys::AIRBORNE, self.not_airborne.then_some(false))
            .with_opt(keys::TERRAIN, self.terrain.map(|t| t.as_str()))
            .with_opt(keys::GRANULARITY, self.granularity.map(|g| g.as_str()))
    }
}

impl FolderArgs {
    fn apply(self, config: Configuration) -> Configuration {
        config
            .with_opt(keys::INPUT, self.input)
            .with_opt(keys::INPUT_WILDCARD, self.input_wildcard)
            .with_opt(keys::OUTPUT_DIRECTORY, self.output_directory)
            .with_opt(keys::OUTPUT_APPENDIX, self.output_appendix)
            .with_opt(keys::OUTPUT_FORMAT, self.output_format)
            .with_opt(keys::ADDITIONAL, self.additional)
    }
}

impl RecipeCommand {
    /// Resolves the recipe and layers the command-line options over `base`.
    fn into_recipe(self, base: Configuration) -> (Recipe, Configuration) {
        match self {
            Self::FlightlinesToMergedChm(args) => (Recipe::FlightlinesToMergedChm, args.apply(base)),
            Self::FlightlinesToMergedChmHighest(args) => {
                (Recipe::FlightlinesToMergedChmHighest, args.apply(base))
            }
            Self::HugeFileClassify(args) => (Recipe::HugeFileClassify, args.apply(base)),
            Self::HugeFileGroundClassify(args) => (Recipe::HugeFileGroundClassify, args.apply(base)),
            Self::HugeFileNormalize(args) => (Recipe::HugeFileNormalize, args.apply(base)),
            Self::Lassort(args) => {
                let config = args
                    .folder
                    .apply(base)
                    .with_opt(sort_keys::GPS_TIME, args.gps_time.then_some(true))
                    .with_opt(sort_keys::RETURN_NUMBER, args.return_number.then_some(true))
                    .with_opt(sort_keys::POINT_SOURCE, args.point_source.then_some(true));
                (Recipe::LasSort, config)
            }
            Self::Lasduplicate(args) => {
                let config = args
                    .folder
                    .apply(base)
                    .with_opt(duplicate_keys::LOWEST_Z, args.lowest_z.then_some(true))
                    .with_opt(duplicate_keys::HIGHEST_Z, args.highest_z.then_some(true))
                    .with_opt(duplicate_keys::UNIQUE_XYZ, args.unique_xyz.then_some(true))
                    .with_opt(duplicate_keys::SINGLE_RETURNS, args.single_returns.then_some(true))
                    .with_opt(duplicate_keys::NEARBY, args.nearby.map(|_| true))
                    .with_opt(duplicate_keys::NEARBY_TOLERANCE, args.nearby)
                    .with_opt(duplicate_keys::RECORD_REMOVED, args.record_removed.then_some(true));
                (Recipe::LasDuplicate, config)
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.global.verbose);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{e:#}");
            ExitCode::from(exit_status(&e))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "lasflow=debug" } else { "lasflow=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<u8> {
    let global = cli.global;
    let settings = load_settings(&global)?;
    let base = match &global.config {
        Some(path) => load_config(path)?,
        None => Configuration::new(),
    };
    let (recipe, config) = cli.recipe.into_recipe(base);

    let working_dir = global
        .working_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join(format!("lasflow-{}", Uuid::now_v7())));
    let pipeline = recipe
        .build(&config, &settings, &working_dir)
        .map_err(LasflowError::from)?;

    if global.dry_run {
        print!("{}", pipeline.describe());
        return Ok(0);
    }

    std::fs::create_dir_all(&working_dir).with_context(|| {
        format!("cannot create working directory {}", working_dir.display())
    })?;
    info!(recipe = %recipe, working_dir = %working_dir.display(), "Running recipe");

    let token = Arc::new(CancellationToken::new());
    {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping the running tool");
                token.cancel("interrupted");
            }
        });
    }

    let run = PipelineRunner::default()
        .with_event_sink(Arc::new(LoggingEventSink::info()))
        .with_warning_policy(settings.warning_policy)
        .run(&pipeline, &token)
        .await;

    report(&run, global.json)?;
    Ok(u8::try_from(run.exit_code()).unwrap_or(1))
}

fn load_settings(global: &GlobalArgs) -> Result<ToolSettings> {
    let mut settings = ToolSettings::load(global.settings.as_deref())?;
    if let Some(dir) = &global.lastools_dir {
        settings = settings.with_lastools_dir(dir);
    }
    if let Some(dir) = &global.wine_dir {
        settings = settings.with_wine_dir(dir);
    }
    if let Some(cores) = global.cores {
        settings = settings.with_cores(cores);
    }
    if global.verbose {
        settings = settings.with_verbose(true);
    }
    if let Some(policy) = global.warnings {
        settings = settings.with_warning_policy(policy);
    }
    Ok(settings)
}

fn load_config(path: &Path) -> Result<Configuration> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read recipe options {}", path.display()))?;
    Ok(Configuration::from_json(&text)?)
}

fn report(run: &PipelineRun, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&run.to_json())?);
    }

    match run.error() {
        None => info!(
            pipeline = %run.pipeline,
            stages = run.results.len(),
            duration_ms = run.duration_ms,
            "Finished"
        ),
        Some(e) => {
            error!(code = e.code(), "{e}");
            if let LasflowError::StageFailed(failure) = e {
                let diagnostics = failure.diagnostics();
                if !diagnostics.is_empty() {
                    eprintln!("{diagnostics}");
                }
            }
        }
    }
    Ok(())
}

fn exit_status(error: &anyhow::Error) -> u8 {
    let code = if let Some(e) = error.downcast_ref::<LasflowError>() {
        e.exit_code()
    } else if error.downcast_ref::<ConfigurationError>().is_some() {
        2
    } else {
        1
    };
    u8::try_from(code).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flightline_options_layer_over_file() {
        let cli = Cli::try_parse_from([
            "lasflow",
            "flightlines-to-merged-chm",
            "-i",
            "/data/strips",
            "--step",
            "2",
            "--terrain",
            "city",
            "--dry-run",
        ])
        .unwrap();
        assert!(cli.global.dry_run);

        let base = Configuration::new()
            .with(keys::STEP, 1.0)
            .with(keys::OUTPUT, "/data/chm.tif");
        let (recipe, config) = cli.recipe.into_recipe(base);

        assert_eq!(recipe, Recipe::FlightlinesToMergedChm);
        assert_eq!(config.number(keys::STEP).unwrap(), 2.0);
        assert_eq!(config.text(keys::TERRAIN).unwrap(), "city");
        assert_eq!(config.text(keys::OUTPUT).unwrap(), "/data/chm.tif");
    }

    #[test]
    fn test_lasduplicate_nearby() {
        let cli = Cli::try_parse_from([
            "lasflow",
            "lasduplicate",
            "-i",
            "/data/tiles",
            "--nearby",
            "0.05",
            "--additional",
            "-keep_first",
        ])
        .unwrap();
        let (recipe, config) = cli.recipe.into_recipe(Configuration::new());

        assert_eq!(recipe, Recipe::LasDuplicate);
        assert!(config.bool_or(duplicate_keys::NEARBY, false).unwrap());
        assert_eq!(config.number(duplicate_keys::NEARBY_TOLERANCE).unwrap(), 0.05);
        assert_eq!(config.text(keys::ADDITIONAL).unwrap(), "-keep_first");
    }

    #[test]
    fn test_exit_status_mapping() {
        let config: anyhow::Error = LasflowError::from(ConfigurationError::new("bad")).into();
        assert_eq!(exit_status(&config), 2);
        let cancelled: anyhow::Error = LasflowError::cancelled("ctrl-c").into();
        assert_eq!(exit_status(&cancelled), 130);
        assert_eq!(exit_status(&anyhow::anyhow!("other")), 1);
    }

    #[test]
    fn test_unknown_terrain_rejected() {
        let parsed = Cli::try_parse_from([
            "lasflow",
            "huge-file-classify",
            "--terrain",
            "moon",
        ]);
        assert!(parsed.is_err());
    }
}
