use std::fs;

use cgmfit_core::ParameterVector;
use cgmfit_mcmc::Chain;
use tempfile::tempdir;

fn position(walker: usize, step: usize) -> ParameterVector {
    ParameterVector::new(walker as f64, step as f64)
}

fn sample_chain(walkers: usize, steps: usize) -> Chain {
    let mut chain = Chain::new(walkers);
    for step in 0..steps {
        let positions: Vec<_> = (0..walkers).map(|w| position(w, step)).collect();
        let log_probs: Vec<_> = (0..walkers).map(|w| -((w + step) as f64)).collect();
        chain.push_step(&positions, &log_probs).unwrap();
    }
    chain
}

#[test]
fn get_addresses_walker_and_step() {
    let chain = sample_chain(4, 6);
    assert_eq!(chain.walkers(), 4);
    assert_eq!(chain.steps(), 6);
    assert_eq!(chain.get(3, 5), Some(position(3, 5)));
    assert_eq!(chain.log_prob(1, 2), Some(-3.0));
    assert_eq!(chain.get(4, 0), None);
    assert_eq!(chain.get(0, 6), None);
    assert_eq!(chain.walker_series(2, 1), vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
}

#[test]
fn push_step_rejects_wrong_width() {
    let mut chain = Chain::new(4);
    let err = chain
        .push_step(&[position(0, 0); 3], &[0.0; 3])
        .unwrap_err();
    assert_eq!(err.info().code, "chain-step-width");
    assert_eq!(chain.steps(), 0);
}

#[test]
fn flatten_without_cut_keeps_walker_major_order() {
    let chain = sample_chain(3, 4);
    let flat = chain.flatten(0, 1).unwrap();
    let expected: Vec<_> = (0..3)
        .flat_map(|w| (0..4).map(move |s| position(w, s)))
        .collect();
    assert_eq!(flat.as_slice(), expected.as_slice());
}

#[test]
fn flatten_discards_and_thins_every_walker() {
    let chain = sample_chain(2, 10);
    let flat = chain.flatten(3, 3).unwrap();
    let expected = vec![
        position(0, 3),
        position(0, 6),
        position(0, 9),
        position(1, 3),
        position(1, 6),
        position(1, 9),
    ];
    assert_eq!(flat.as_slice(), expected.as_slice());
    assert_eq!(flat.column(1), vec![3.0, 6.0, 9.0, 3.0, 6.0, 9.0]);
}

#[test]
fn discarding_whole_chain_fails_loudly() {
    let chain = sample_chain(4, 5);
    let err = chain.flatten(5, 1).unwrap_err();
    assert_eq!(err.info().code, "chain-degenerate-discard");
    assert!(chain.flatten(4, 1).is_ok());

    let err = Chain::new(4).flatten(0, 1).unwrap_err();
    assert_eq!(err.info().code, "chain-degenerate-discard");
}

#[test]
fn zero_thin_is_rejected() {
    let err = sample_chain(4, 5).flatten(0, 0).unwrap_err();
    assert_eq!(err.info().code, "chain-zero-thin");
}

#[test]
fn csv_exports_have_expected_headers() {
    let dir = tempdir().unwrap();
    let chain = sample_chain(2, 3);

    let chain_path = dir.path().join("out/chain.csv");
    chain.write_csv(&chain_path).unwrap();
    let text = fs::read_to_string(&chain_path).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("walker,step,log_nH,log_Z,log_prob"));
    assert_eq!(lines.count(), 6);

    let samples_path = dir.path().join("samples.csv");
    chain.flatten(1, 1).unwrap().write_csv(&samples_path).unwrap();
    let text = fs::read_to_string(&samples_path).unwrap();
    assert_eq!(text.lines().next(), Some("log_nH,log_Z"));
    assert_eq!(text.lines().count(), 1 + 4);
}
