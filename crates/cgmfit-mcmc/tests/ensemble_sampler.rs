mod common;

use std::sync::atomic::{AtomicUsize, Ordering};

use cgmfit_core::{derive_substream_seed, ParameterVector, RngHandle};
use cgmfit_mcmc::determinism;
use cgmfit_mcmc::seeding::initial_positions;
use cgmfit_mcmc::{EnsembleSampler, SamplerConfig, SeedPolicy, StopFlag, StretchMove, WalkerInit};
use proptest::prelude::*;
use rand::Rng;

fn config(walkers: usize, threads: usize, seed: u64) -> SamplerConfig {
    SamplerConfig {
        walkers,
        steps: 200,
        threads,
        seed_policy: SeedPolicy {
            master_seed: seed,
            label: None,
        },
        ..SamplerConfig::default()
    }
}

fn gaussian(theta: ParameterVector) -> f64 {
    let dx = (theta.log_nh + 4.0) / 0.3;
    let dy = (theta.log_z + 1.0) / 0.2;
    -0.5 * (dx * dx + dy * dy)
}

#[test]
fn chain_is_identical_for_any_thread_count() {
    let posterior = common::synthetic_posterior(0.2);
    let single = config(16, 1, 11);
    let initial = initial_positions(&single.init, 16, 11).unwrap();

    let serial = EnsembleSampler::new(posterior.clone(), &single)
        .unwrap()
        .run(&initial, 150)
        .unwrap();
    let parallel = EnsembleSampler::new(posterior, &config(16, 4, 11))
        .unwrap()
        .run(&initial, 150)
        .unwrap();

    assert_eq!(serial, parallel);
}

#[test]
fn seeds_control_the_chain() {
    let cfg_a = config(8, 1, 1);
    let cfg_b = config(8, 1, 2);
    let initial = initial_positions(&cfg_a.init, 8, 1).unwrap();

    let a1 = EnsembleSampler::new(gaussian, &cfg_a).unwrap().run(&initial, 50).unwrap();
    let a2 = EnsembleSampler::new(gaussian, &cfg_a).unwrap().run(&initial, 50).unwrap();
    let b = EnsembleSampler::new(gaussian, &cfg_b).unwrap().run(&initial, 50).unwrap();

    assert_eq!(a1, a2);
    assert_ne!(a1.chain, b.chain);
}

#[test]
fn chain_records_every_walker_every_step() {
    let cfg = config(10, 2, 5);
    let initial = initial_positions(&cfg.init, 10, 5).unwrap();
    let run = EnsembleSampler::new(gaussian, &cfg).unwrap().run(&initial, 37).unwrap();

    assert_eq!(run.steps_completed, 37);
    assert_eq!(run.chain.steps(), 37);
    assert_eq!(run.chain.walkers(), 10);
    assert_eq!(run.accepted.len(), 10);
    assert!(!run.interrupted);
    for walker in 0..10 {
        for step in 0..37 {
            let theta = run.chain.get(walker, step).unwrap();
            assert_eq!(run.chain.log_prob(walker, step), Some(gaussian(theta)));
        }
    }
}

#[test]
fn acceptance_fraction_is_plausible_for_default_scale() {
    let posterior = common::synthetic_posterior(0.2);
    let cfg = config(32, 0, 2024);
    let initial = initial_positions(&cfg.init, 32, 2024).unwrap();
    let run = EnsembleSampler::new(posterior, &cfg)
        .unwrap()
        .run(&initial, 1000)
        .unwrap();

    let acceptance = run.mean_acceptance();
    assert!(
        (0.2..0.85).contains(&acceptance),
        "acceptance {acceptance}"
    );
    assert!(run
        .acceptance_fractions()
        .iter()
        .all(|f| (0.0..=1.0).contains(f)));
}

#[test]
fn invalid_densities_are_rejected_without_failing() {
    let nan_left = |theta: ParameterVector| {
        if theta.log_nh < -4.0 {
            f64::NAN
        } else if theta.log_nh > -2.5 {
            f64::INFINITY
        } else {
            gaussian(theta)
        }
    };
    let cfg = SamplerConfig {
        init: WalkerInit::Ball {
            center: ParameterVector::new(-3.5, -1.0),
            radius: 0.05,
        },
        ..config(12, 2, 9)
    };
    let initial = initial_positions(&cfg.init, 12, 9).unwrap();
    let run = EnsembleSampler::new(nan_left, &cfg)
        .unwrap()
        .run(&initial, 200)
        .unwrap();

    for walker in 0..12 {
        for step in 0..200 {
            let theta = run.chain.get(walker, step).unwrap();
            assert!(theta.log_nh >= -4.0 && theta.log_nh <= -2.5, "{theta}");
            assert!(run.chain.log_prob(walker, step).unwrap().is_finite());
        }
    }
}

#[test]
fn walkers_starting_outside_support_move_inside() {
    let posterior = common::synthetic_posterior(0.2);
    let mut initial = vec![ParameterVector::new(-1.5, 1.5); 4];
    let mut rng = RngHandle::from_seed(3);
    initial.extend((0..12).map(|_| {
        ParameterVector::new(rng.gen_range(-4.5..-3.5), rng.gen_range(-1.5..-0.5))
    }));
    let run = EnsembleSampler::new(posterior, &config(16, 1, 3))
        .unwrap()
        .run(&initial, 300)
        .unwrap();
    let last = run.chain.steps() - 1;
    for walker in 0..4 {
        assert!(run.chain.log_prob(walker, last).unwrap().is_finite());
    }
}

#[test]
fn stop_flag_returns_committed_prefix() {
    let stop = StopFlag::new();
    let evaluations = AtomicUsize::new(0);
    let trigger = stop.clone();
    let density = move |theta: ParameterVector| {
        if evaluations.fetch_add(1, Ordering::SeqCst) + 1 == 8 * 25 {
            trigger.request_stop();
        }
        gaussian(theta)
    };
    let cfg = config(8, 1, 4);
    let initial = initial_positions(&cfg.init, 8, 4).unwrap();
    let run = EnsembleSampler::new(density, &cfg)
        .unwrap()
        .run_until(&initial, 500, &stop)
        .unwrap();

    assert!(run.interrupted);
    assert_eq!(run.steps_completed, 24);
    assert_eq!(run.chain.steps(), 24);
}

#[test]
fn stop_before_start_yields_empty_chain() {
    let stop = StopFlag::new();
    stop.request_stop();
    let cfg = config(8, 1, 4);
    let initial = initial_positions(&cfg.init, 8, 4).unwrap();
    let run = EnsembleSampler::new(gaussian, &cfg)
        .unwrap()
        .run_until(&initial, 10, &stop)
        .unwrap();
    assert!(run.interrupted);
    assert_eq!(run.chain.steps(), 0);
    assert_eq!(run.mean_acceptance(), 0.0);
}

#[test]
fn initial_width_must_match_walkers() {
    let sampler = EnsembleSampler::new(gaussian, &config(8, 1, 1)).unwrap();
    let err = sampler
        .run(&[ParameterVector::new(-4.0, -1.0); 6], 5)
        .unwrap_err();
    assert_eq!(err.info().code, "sampler-initial-width");
}

#[test]
fn too_few_walkers_are_rejected() {
    let err = EnsembleSampler::new(gaussian, &config(3, 1, 1))
        .err()
        .unwrap();
    assert_eq!(err.info().code, "config-walkers");
}

#[test]
fn acceptance_ratio_includes_dimension_factor() {
    let stretch = StretchMove::new(2.0).unwrap();
    let log_ratio = stretch.log_acceptance(1.5, -3.0, -2.0);
    assert!((log_ratio - (1.5f64.ln() + 1.0)).abs() < 1e-12);
    assert_eq!(stretch.log_acceptance(1.5, -3.0, f64::NAN), f64::NEG_INFINITY);
    assert!(StretchMove::new(1.0).is_err());
}

proptest! {
    #[test]
    fn stretch_factor_stays_in_range(seed in any::<u64>(), scale in 1.01f64..5.0) {
        let stretch = StretchMove::new(scale).unwrap();
        let mut rng = RngHandle::from_seed(seed);
        for _ in 0..32 {
            let z = stretch.sample_z(&mut rng);
            prop_assert!(z >= 1.0 / scale - 1e-12 && z <= scale + 1e-12);
        }
    }
}

#[test]
fn move_streams_depend_only_on_step_and_walker() {
    let mut a = determinism::move_rng(11, 5, 3);
    let mut b = RngHandle::from_seed(derive_substream_seed(derive_substream_seed(11, 5), 3));
    assert_eq!(a.gen::<u64>(), b.gen::<u64>());

    let first: u64 = determinism::move_rng(11, 5, 3).gen();
    assert_ne!(first, determinism::move_rng(11, 5, 4).gen::<u64>());
    assert_ne!(first, determinism::move_rng(11, 6, 3).gen::<u64>());
}

#[test]
fn explicit_seeds_must_be_finite() {
    let mut positions = vec![ParameterVector::new(-4.0, -1.0); 8];
    positions[0] = ParameterVector::new(f64::NAN, -1.0);
    let err = initial_positions(&WalkerInit::Explicit { positions }, 8, 1).unwrap_err();
    assert_eq!(err.info().code, "config-init-positions");
    assert_eq!(err.info().context.get("walker").map(String::as_str), Some("0"));
}
