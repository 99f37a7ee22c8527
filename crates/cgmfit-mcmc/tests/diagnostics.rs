use cgmfit_core::{ParameterVector, RngHandle};
use cgmfit_mcmc::diagnostics::{check_convergence, choose_cut, integrated_time};
use cgmfit_mcmc::{AutocorrEstimate, Chain, ChainPolicy, DiagnosticsConfig};
use rand::Rng;
use rand_distr::StandardNormal;

/// Independent AR(1) series per walker and parameter with coefficient `phi`.
fn ar1_chain(walkers: usize, steps: usize, phi: f64, seed: u64) -> Chain {
    let mut rng = RngHandle::from_seed(seed);
    let scale = (1.0 - phi * phi).sqrt();
    let mut state: Vec<[f64; 2]> = (0..walkers)
        .map(|_| [rng.sample(StandardNormal), rng.sample(StandardNormal)])
        .collect();
    let mut chain = Chain::new(walkers);
    for _ in 0..steps {
        for s in state.iter_mut() {
            for v in s.iter_mut() {
                let noise: f64 = rng.sample(StandardNormal);
                *v = phi * *v + scale * noise;
            }
        }
        let positions: Vec<_> = state.iter().map(|s| ParameterVector::from_array(*s)).collect();
        chain.push_step(&positions, &vec![0.0; walkers]).unwrap();
    }
    chain
}

#[test]
fn white_noise_has_unit_autocorrelation_time() {
    let chain = ar1_chain(16, 2000, 0.0, 1);
    let estimate = integrated_time(&chain, &DiagnosticsConfig::default());
    for tau in &estimate.tau {
        assert!((0.7..1.5).contains(tau), "tau {tau}");
    }
    assert!(estimate.converged);
    assert!(check_convergence(&estimate, &DiagnosticsConfig::default()).is_none());
}

#[test]
fn ar1_autocorrelation_time_matches_theory() {
    // (1 + phi) / (1 - phi) = 9 for phi = 0.8
    let chain = ar1_chain(32, 4000, 0.8, 7);
    let estimate = integrated_time(&chain, &DiagnosticsConfig::default());
    for tau in &estimate.tau {
        assert!((6.5..11.5).contains(tau), "tau {tau}");
    }
    assert_eq!(estimate.steps, 4000);
    assert!(estimate.window.iter().all(|&m| m > 0 && m < 4000));
}

#[test]
fn short_chains_are_flagged_not_failed() {
    let chain = ar1_chain(16, 200, 0.9, 3);
    let config = DiagnosticsConfig::default();
    let estimate = integrated_time(&chain, &config);
    assert!(!estimate.converged);
    let report = check_convergence(&estimate, &config).unwrap();
    assert_eq!(report.steps, 200);
    assert!(report.required_steps > 200.0);
}

#[test]
fn frozen_walkers_give_infinite_time() {
    let mut chain = Chain::new(4);
    for _ in 0..50 {
        chain
            .push_step(&[ParameterVector::new(-4.0, -1.0); 4], &[0.0; 4])
            .unwrap();
    }
    let estimate = integrated_time(&chain, &DiagnosticsConfig::default());
    assert!(estimate.tau.iter().all(|t| t.is_infinite()));
    assert!(!estimate.converged);
    assert!(estimate.max_tau().is_infinite());
}

fn estimate(tau: [f64; 2], steps: usize) -> AutocorrEstimate {
    AutocorrEstimate {
        tau: tau.to_vec(),
        window: vec![10, 10],
        steps,
        converged: true,
    }
}

#[test]
fn automatic_cut_scales_with_autocorrelation_time() {
    let policy = ChainPolicy::default();
    let cut = choose_cut(&policy, &estimate([12.2, 20.5], 3000), 3000);
    assert_eq!(cut.discard, 103);
    assert_eq!(cut.thin, 6);
    assert!(!cut.clamped);
}

#[test]
fn automatic_cut_is_capped_at_half_the_chain() {
    let policy = ChainPolicy::default();
    let cut = choose_cut(&policy, &estimate([80.0, 90.0], 300), 300);
    assert_eq!(cut.discard, 150);
    assert!(cut.clamped);

    let cut = choose_cut(&policy, &estimate([f64::INFINITY, f64::INFINITY], 40), 40);
    assert_eq!(cut.discard, 20);
    assert_eq!(cut.thin, 1);
}

#[test]
fn fixed_cut_is_used_verbatim() {
    let policy = ChainPolicy::Fixed {
        discard: 1000,
        thin: 10,
    };
    let cut = choose_cut(&policy, &estimate([1.0, 1.0], 3000), 3000);
    assert_eq!((cut.discard, cut.thin, cut.clamped), (1000, 10, false));
}
