//! End-to-end exercise of the two-stage pipeline on a synthetic
//! network: detection maps from the Monte Carlo estimator, reduction
//! through the marginalizer, and posterior evaluation over the reduced
//! maps, with the persistence layer in the middle.

use approx::assert_relative_eq;
use nalgebra::Matrix3;

use anisotropy::{
    Event, EventConfig, IsotropicModel, Model, ModelConfig, NumericalIsotropicModel, Params, Run,
    RunLabel, SampleArchive,
};
use selection::config::MassFunctionConfig;
use selection::marginal::SkyMap;
use selection::{
    marginalize_distance, store, time_average, ObservingSchedule, PsdTable, SelectionConfig,
    SelectionEstimator, Site,
};

const DMAX: f64 = 2000.0;

fn selection_config() -> SelectionConfig {
    SelectionConfig {
        snr_threshold: 12.0,
        nside: 2,
        d_max_mpc: DMAX,
        n_distance_bins: 24,
        n_samples: 32,
        n_sensitivity_points: 64,
        quad_tol: 1e-8,
        mass_function: MassFunctionConfig::default(),
    }
}

fn flat_psd() -> PsdTable {
    let mut s = String::new();
    let mut f = 10.0;
    while f <= 500.0 {
        s.push_str(&format!("{f} 1.0e-23\n"));
        f += 5.0;
    }
    PsdTable::from_two_column(&s).unwrap()
}

fn archive_json(n: usize) -> String {
    let ra: Vec<String> = (0..n).map(|i| format!("{:.6}", i as f64 * 0.21 % 6.28)).collect();
    let dec: Vec<String> = (0..n)
        .map(|i| format!("{:.6}", -1.2 + 2.4 * i as f64 / n as f64))
        .collect();
    let m1: Vec<String> = (0..n).map(|i| format!("{:.1}", 20.0 + (i % 30) as f64)).collect();
    let dist: Vec<String> = (0..n).map(|i| format!("{:.1}", 150.0 + 5.0 * i as f64)).collect();
    format!(
        r#"{{"IMRPhenomPv2_posterior": {{
            "right_ascension": [{}],
            "declination": [{}],
            "m1_detector_frame_Msun": [{}],
            "luminosity_distance_Mpc": [{}]
        }}}}"#,
        ra.join(","),
        dec.join(","),
        m1.join(","),
        dist.join(",")
    )
}

/// Build the reduced maps for one epoch and one event, exercising the
/// persistence layer in passing.
fn reduced_maps(tag: &str) -> (SkyMap, SkyMap, ObservingSchedule) {
    let estimator = SelectionEstimator::new(selection_config(), 12345).unwrap();
    let network = [Site::Hanford, Site::Livingston];

    let epoch_map = estimator.epoch_map(&network, &flat_psd()).unwrap();
    let marg = marginalize_distance(&epoch_map, DMAX, 1e-9).unwrap();
    let schedule = ObservingSchedule::from_tsv(
        "GPSstart\tGPSend\n1126000000\t1126050000\n1126100000\t1126150000\n",
    )
    .unwrap();
    let mean = time_average(&marg, &schedule, 1e-8).unwrap();

    let event_map = estimator
        .event_map(
            &[(Site::Hanford, flat_psd()), (Site::Livingston, flat_psd())],
            2.1,
        )
        .unwrap();
    let event_marg = marginalize_distance(&event_map, DMAX, 1e-9).unwrap();

    let dir =
        std::env::temp_dir().join(format!("anisotropy_pipeline_{}_{tag}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let mean_path = dir.join("pofd_mean_O1.bin");
    let marg_path = dir.join("pofd_marg_EV1.bin");
    store::save(&mean_path, &mean).unwrap();
    store::save(&marg_path, &event_marg).unwrap();
    let mean: SkyMap = store::load(&mean_path).unwrap();
    let event_marg: SkyMap = store::load(&marg_path).unwrap();
    std::fs::remove_dir_all(&dir).ok();

    (mean, event_marg, schedule)
}

fn event_config() -> EventConfig {
    EventConfig {
        dlmax_mpc: DMAX,
        n_samples: 64,
        ..Default::default()
    }
}

#[test]
fn pipeline_produces_a_finite_posterior() {
    let (mean, event_marg, schedule) = reduced_maps("posterior");
    for &v in mean.values.iter().chain(&event_marg.values) {
        assert!((0.0..=1.0).contains(&v), "map value {v} outside [0, 1]");
    }

    let run = Run::from_schedule(RunLabel::O1, mean, &schedule).unwrap();
    let archive = SampleArchive::from_json(&archive_json(300)).unwrap();
    let table = archive.resolve_posterior().unwrap();
    let event = Event::new(
        "EV1",
        RunLabel::O1,
        1_126_259_462,
        &table,
        event_marg,
        &event_config(),
        12345,
    )
    .unwrap();

    let model = Model::new(
        vec![event],
        vec![run],
        ModelConfig {
            weights_nside: 1,
            rate_bounds: (1e-5, 750.0),
            dlmax_mpc: DMAX,
        },
    )
    .unwrap();

    let params = Params {
        weights: vec![1.0; 12],
        alpha: 0.0,
        cos_beta: 1.0,
        gamma: 0.0,
    };
    let lp = model.log_prior(&params);
    let ll = model.log_likelihood(&params);
    assert!(lp.is_finite(), "log prior {lp}");
    assert!(ll.is_finite(), "log likelihood {ll}");

    // Slightly perturbed weights stay inside the prior and move the
    // likelihood continuously
    let mut nearby = params.clone();
    nearby.weights[3] = 1.05;
    let ll2 = model.log_likelihood(&nearby);
    assert!(ll2.is_finite());
    assert!((ll - ll2).abs() < 1.0, "likelihood jumped: {ll} vs {ll2}");
}

#[test]
fn isotropic_cross_check_on_the_pipeline_output() {
    let (mean, event_marg, schedule) = reduced_maps("isotropic");
    let runs = vec![Run::from_schedule(RunLabel::O1, mean, &schedule).unwrap()];
    let archive = SampleArchive::from_json(&archive_json(300)).unwrap();
    let table = archive.resolve_posterior().unwrap();
    let events = vec![Event::new(
        "EV1",
        RunLabel::O1,
        1_126_259_462,
        &table,
        event_marg,
        &event_config(),
        12345,
    )
    .unwrap()];

    let iso = IsotropicModel::new(&events, &runs, DMAX);
    let num = NumericalIsotropicModel::new(events, runs, (1e-5, 750.0), DMAX).unwrap();

    // Expected count at unit uniform weight equals the analytic
    // constant to quadrature accuracy
    let fine = num.model().expand_weights(&vec![1.0; 12]);
    assert_relative_eq!(
        num.model().nexp(&Matrix3::identity(), &fine),
        iso.alpha_const(),
        max_relative = 1e-3
    );

    // The grid argmax is self-consistent
    let max = num.maximum_logpost();
    let best = max
        .log_posterior
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    let a0_at_max = max.rate_at_max / (4.0 * std::f64::consts::PI);
    assert_relative_eq!(num.log_posterior(a0_at_max), best, epsilon = 1e-12);
}

#[test]
fn event_construction_is_reproducible_from_the_archive() {
    let archive = SampleArchive::from_json(&archive_json(500)).unwrap();
    let table = archive.resolve_posterior().unwrap();
    let map = SkyMap::uniform(2, 0.3);
    let a = Event::new(
        "EV1",
        RunLabel::O1,
        1_126_259_462,
        &table,
        map.clone(),
        &event_config(),
        12345,
    )
    .unwrap();
    let b = Event::new(
        "EV1",
        RunLabel::O1,
        1_126_259_462,
        &table,
        map,
        &event_config(),
        12345,
    )
    .unwrap();
    assert_eq!(a.samples().right_ascension, b.samples().right_ascension);
    assert_eq!(a.samples().luminosity_distance_mpc, b.samples().luminosity_distance_mpc);
    assert_eq!(a.pdist(), b.pdist());
    assert_eq!(a.pmass(), b.pmass());
}
