use std::{error::Error, fs, path::PathBuf};

use board_pose::{open_source, FrameDumpDisplay, PipelineConfig, PoseApp};
use clap::Parser;
use log::{info, LevelFilter};

#[cfg(feature = "tracing")]
use tracing_log::LogTracer;

/// Estimate the camera pose against a chessboard in every frame and draw a
/// pyramid on the board.
#[derive(Debug, Parser)]
#[command(author, version, about = "Chessboard pose estimation with an AR pyramid overlay")]
struct Args {
    /// Video file (`video` feature), directory of frames, single image or
    /// .txt list of frame paths.
    input: PathBuf,

    /// JSON PipelineConfig. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory receiving the annotated frames.
    #[arg(long, default_value = "annotated")]
    output: PathBuf,

    /// Log level for the stderr logger (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,

    /// Write the per-frame pose report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Emit JSON log lines (tracing builds only).
    #[cfg(feature = "tracing")]
    #[arg(long)]
    json_log: bool,
}

fn init_logging(args: &Args) -> Result<(), Box<dyn Error>> {
    #[cfg(feature = "tracing")]
    {
        let _ = LogTracer::init();
        board_pose::core::init_tracing(args.json_log);
        log::set_max_level(args.log_level);
        Ok(())
    }
    #[cfg(not(feature = "tracing"))]
    {
        board_pose::core::init_with_level(args.log_level)?;
        Ok(())
    }
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = match &args.config {
        Some(path) => PipelineConfig::load_json(path)?,
        None => PipelineConfig::default(),
    };
    config.validate()?;

    let app = PoseApp::from_config(&config)?;
    let mut source = open_source(&args.input)?;
    let mut display = FrameDumpDisplay::new(&args.output)?;

    let summary = app.run(source.as_mut(), &mut display)?;
    info!(
        "posed {} of {} frames, {} annotated frames in {}",
        summary.posed,
        summary.frames,
        display.written(),
        args.output.display()
    );

    if let Some(path) = &args.report {
        fs::write(path, serde_json::to_string_pretty(&summary.reports)?)?;
        info!("report written to {}", path.display());
    }

    println!("{}/{} frames posed", summary.posed, summary.frames);
    Ok(())
}
