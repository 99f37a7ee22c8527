use cgmfit_core::errors::CgmError;
use cgmfit_core::ParameterVector;
use cgmfit_mcmc::{percentile, summarize, FlatSamples};

#[test]
fn percentile_interpolates_linearly() {
    let values = [1.0, 2.0, 3.0, 4.0, 5.0];
    assert_eq!(percentile(&values, 0.5), 3.0);
    assert_eq!(percentile(&values, 0.0), 1.0);
    assert_eq!(percentile(&values, 1.0), 5.0);
    assert!((percentile(&values, 0.16) - 1.64).abs() < 1e-12);
    assert!((percentile(&values, 0.84) - 4.36).abs() < 1e-12);
    assert!(percentile(&[], 0.5).is_nan());
}

#[test]
fn summary_reports_median_and_asymmetric_errors() {
    let samples: Vec<_> = (0..=100)
        .map(|i| ParameterVector::new(-5.0 + i as f64 * 0.02, (i * i) as f64 / 10_000.0))
        .collect();
    let summary = summarize(&FlatSamples::new(samples)).unwrap();
    assert_eq!(summary.samples, 101);

    let nh = summary.get("log_nH").unwrap();
    assert!((nh.median + 4.0).abs() < 1e-12);
    assert!((nh.lower - 0.68).abs() < 1e-9);
    assert!((nh.upper - 0.68).abs() < 1e-9);

    let z = summary.get("log_Z").unwrap();
    assert!((z.median - 0.25).abs() < 1e-12);
    assert!(z.upper > z.lower);
    let (p16, p84) = z.interval();
    assert!((p16 - 0.0256).abs() < 1e-12);
    assert!((p84 - 0.7056).abs() < 1e-12);

    let labels: Vec<_> = summary.parameters.keys().cloned().collect();
    assert_eq!(labels, vec!["log_nH", "log_Z"]);
}

#[test]
fn empty_samples_cannot_be_summarised() {
    let err = summarize(&FlatSamples::new(Vec::new())).unwrap_err();
    assert_eq!(err.info().code, "summary-empty");
}

#[test]
fn non_finite_samples_are_not_summarised() {
    let mut samples: Vec<_> = (0..20)
        .map(|i| ParameterVector::new(-4.0 + i as f64 * 0.01, -1.0))
        .collect();
    samples[7].log_z = f64::NAN;
    let err = summarize(&FlatSamples::new(samples)).unwrap_err();
    assert!(matches!(err, CgmError::Chain(_)));
    assert_eq!(err.info().code, "summary-non-finite");
    assert_eq!(err.info().context.get("parameter").map(String::as_str), Some("log_Z"));
}
