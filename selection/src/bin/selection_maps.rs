//! Build detection-probability maps for every epoch and event of an
//! analysis manifest.
//!
//! Epoch maps use the fiducial sidereal alignment and one shared noise
//! curve for the whole network; event maps use the sidereal time of the
//! detection and a per-instrument noise column for exactly the
//! instruments that recorded it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;

use selection::manifest::{self, AnalysisManifest};
use selection::{store, PsdTable, SelectionConfig, SelectionEstimator, Site};
use skymath::gmst_from_gps;

#[derive(Parser, Debug)]
#[command(name = "selection_maps")]
#[command(about = "Monte Carlo detection-probability maps per epoch and event")]
struct Args {
    /// Analysis manifest (JSON)
    #[arg(long)]
    manifest: PathBuf,

    /// Output directory for map artifacts
    #[arg(long)]
    out: PathBuf,

    /// Random seed for the source ensemble
    #[arg(long, default_value = "12345")]
    seed: u64,

    /// Sky resolution of the maps
    #[arg(long, default_value = "16")]
    nside: u32,

    /// Network signal-to-noise threshold for a detection
    #[arg(long, default_value = "12.0")]
    snr_threshold: f64,

    /// Monte Carlo ensemble size
    #[arg(long, default_value = "500")]
    samples: usize,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let manifest = AnalysisManifest::load(&args.manifest)?;
    let config = SelectionConfig {
        nside: args.nside,
        snr_threshold: args.snr_threshold,
        n_samples: args.samples,
        ..Default::default()
    };
    let estimator = SelectionEstimator::new(config, args.seed)?;
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating output directory {}", args.out.display()))?;

    let bar = ProgressBar::new((manifest.epochs.len() + manifest.events.len()) as u64);
    bar.set_style(ProgressStyle::with_template("{msg:24} {bar:40} {pos}/{len}")?);

    for epoch in &manifest.epochs {
        bar.set_message(format!("epoch {}", epoch.label));
        let network: Vec<Site> = epoch
            .detectors
            .iter()
            .map(|label| Site::from_label(label))
            .collect::<selection::Result<_>>()?;
        let psd = PsdTable::load_two_column(&epoch.psd)
            .with_context(|| format!("noise curve for epoch {}", epoch.label))?;
        let map = estimator.epoch_map(&network, &psd)?;
        let path = args.out.join(manifest::epoch_map_file(&epoch.label));
        store::save(&path, &map)?;
        info!("epoch {}: wrote {}", epoch.label, path.display());
        bar.inc(1);
    }

    for event in &manifest.events {
        bar.set_message(event.name.clone());
        let network: Vec<(Site, PsdTable)> = event
            .detectors
            .iter()
            .map(|label| -> selection::Result<(Site, PsdTable)> {
                let site = Site::from_label(label)?;
                let psd = PsdTable::load_named_column(&event.psd, label)?;
                Ok((site, psd))
            })
            .collect::<selection::Result<_>>()
            .with_context(|| format!("noise curves for event {}", event.name))?;
        let gmst = gmst_from_gps(event.gps_time as f64);
        let map = estimator.event_map(&network, gmst)?;
        let path = args.out.join(manifest::event_map_file(&event.name));
        store::save(&path, &map)?;
        info!("event {}: wrote {}", event.name, path.display());
        bar.inc(1);
    }

    bar.finish_and_clear();
    Ok(())
}
