//! Reduce detection-probability maps to per-pixel sky maps.
//!
//! For each epoch the (pixel, distance) map is marginalized over the
//! Euclidean distance prior and then averaged over the run's sidereal
//! rotation using its observing-time table; for each event only the
//! distance marginalization applies, since the event map is already
//! tied to its detection time.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use selection::manifest::{self, AnalysisManifest};
use selection::pofd::DetectionProbabilityMap;
use selection::{marginalize_distance, store, time_average, ObservingSchedule};

#[derive(Parser, Debug)]
#[command(name = "marginalize")]
#[command(about = "Distance-marginalize and time-average detection maps")]
struct Args {
    /// Analysis manifest (JSON)
    #[arg(long)]
    manifest: PathBuf,

    /// Directory holding the (pixel, distance) map artifacts
    #[arg(long)]
    maps: PathBuf,

    /// Output directory for the reduced maps
    #[arg(long)]
    out: PathBuf,

    /// Upper edge of the distance prior in Mpc
    #[arg(long, default_value = "7500.0")]
    dmax: f64,

    /// Absolute tolerance of the quadrature stages
    #[arg(long, default_value = "1e-8")]
    tol: f64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let manifest = AnalysisManifest::load(&args.manifest)?;
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating output directory {}", args.out.display()))?;

    for epoch in &manifest.epochs {
        let map: DetectionProbabilityMap =
            store::load(&args.maps.join(manifest::epoch_map_file(&epoch.label)))?;
        let marg = marginalize_distance(&map, args.dmax, args.tol)?;

        let schedule = ObservingSchedule::load(&epoch.observing_times)
            .with_context(|| format!("observing times for epoch {}", epoch.label))?;
        info!(
            "epoch {}: {:.4} yr on sky over {} segments",
            epoch.label,
            schedule.observing_years(),
            schedule.segments().len()
        );
        let mean = time_average(&marg, &schedule, args.tol)?;
        let path = args.out.join(manifest::epoch_mean_file(&epoch.label));
        store::save(&path, &mean)?;
        info!("epoch {}: wrote {}", epoch.label, path.display());
    }

    for event in &manifest.events {
        let map: DetectionProbabilityMap =
            store::load(&args.maps.join(manifest::event_map_file(&event.name)))?;
        let marg = marginalize_distance(&map, args.dmax, args.tol)?;
        let path = args.out.join(manifest::event_marginal_file(&event.name));
        store::save(&path, &marg)?;
        info!("event {}: wrote {}", event.name, path.display());
    }

    Ok(())
}
