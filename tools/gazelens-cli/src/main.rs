//! GazeLens CLI: command-line interface for gaze recordings.
//!
//! Usage:
//!   gazelens info <SAMPLES>             Summarize a binary sample recording
//!   gazelens detect <SAMPLES> [OPTIONS] Detect fixations and write a report
//!   gazelens aoi <REPORT> <AOIS>        Compute AOI metrics over a report

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use gazelens_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "gazelens",
    about = "Fixation detection and AOI analytics for eye-tracking recordings",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to $XDG_CONFIG_HOME/gazelens/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a binary sample recording
    Info {
        /// Path to the sample file
        path: PathBuf,
    },

    /// Detect fixations and write a JSON report
    Detect {
        /// Path to the sample file
        path: PathBuf,

        /// Detection settings JSON (overrides the config file)
        #[arg(long)]
        settings: Option<PathBuf>,

        /// Eye selection: left|right|average
        #[arg(long)]
        eye: Option<String>,

        /// Detection algorithm: idt|ivt
        #[arg(long)]
        algorithm: Option<String>,

        /// Screen width in pixels
        #[arg(long, default_value = "1920")]
        screen_width_px: u32,

        /// Screen height in pixels
        #[arg(long, default_value = "1080")]
        screen_height_px: u32,

        /// Physical screen width in millimeters
        #[arg(long, requires = "screen_height_mm")]
        screen_width_mm: Option<f64>,

        /// Physical screen height in millimeters
        #[arg(long, requires = "screen_width_mm")]
        screen_height_mm: Option<f64>,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute AOI metrics over a fixation report
    Aoi {
        /// Fixation report written by `detect`
        report: PathBuf,

        /// JSON list of AOI elements
        aois: PathBuf,

        /// Stimulus width in pixels
        #[arg(long)]
        stimulus_width: u32,

        /// Stimulus height in pixels
        #[arg(long)]
        stimulus_height: u32,

        /// Stimulus left edge on screen (pixels)
        #[arg(long, default_value = "0")]
        stimulus_x: f64,

        /// Stimulus top edge on screen (pixels)
        #[arg(long, default_value = "0")]
        stimulus_y: f64,

        /// Displayed stimulus width if scaled (pixels)
        #[arg(long)]
        display_width: Option<f64>,

        /// Displayed stimulus height if scaled (pixels)
        #[arg(long)]
        display_height: Option<f64>,

        /// Output file path (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };

    gazelens_common::logging::init_logging_verbose(&config.logging, cli.verbose);

    match cli.command {
        Commands::Info { path } => commands::info::run(path),
        Commands::Detect {
            path,
            settings,
            eye,
            algorithm,
            screen_width_px,
            screen_height_px,
            screen_width_mm,
            screen_height_mm,
            output,
        } => commands::detect::run(
            &config,
            commands::detect::DetectArgs {
                path,
                settings,
                eye,
                algorithm,
                screen_width_px,
                screen_height_px,
                screen_mm: screen_width_mm.zip(screen_height_mm),
                output,
            },
        ),
        Commands::Aoi {
            report,
            aois,
            stimulus_width,
            stimulus_height,
            stimulus_x,
            stimulus_y,
            display_width,
            display_height,
            output,
        } => commands::aoi::run(commands::aoi::AoiArgs {
            report,
            aois,
            stimulus_width,
            stimulus_height,
            stimulus_x,
            stimulus_y,
            display_width,
            display_height,
            output,
        }),
    }
}
