use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use posetrack::{io, SequenceTracker, TrackerConfig};

#[derive(Parser)]
#[command(
    name = "posetrack",
    about = "Assign persistent ids to OpenPose keypoint detections",
    version
)]
struct Args {
    /// OpenPose keypoints directory with .json files
    #[arg(short, long)]
    keypoints_dir: PathBuf,

    /// Output .json file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Tracker configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = match &args.config {
        Some(path) => TrackerConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrackerConfig::default(),
    };

    let frames = io::load_keypoints_dir(&args.keypoints_dir)
        .with_context(|| format!("reading keypoints from {}", args.keypoints_dir.display()))?;
    info!(frames = frames.len(), "loaded keypoint frames");

    let mut tracker = SequenceTracker::new(&config);
    let snapshots = tracker.run(frames).context("tracking failed")?;
    info!(
        frames = snapshots.len(),
        tracks_created = tracker.next_id() - 1,
        "tracking completed"
    );

    if let Some(output) = &args.output {
        io::save_frames(output, &snapshots)
            .with_context(|| format!("writing {}", output.display()))?;
        info!(path = %output.display(), "tracking results saved");
    }

    Ok(())
}
