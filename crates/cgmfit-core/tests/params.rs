use cgmfit_core::{LogDensity, ParameterVector};

#[test]
fn stretch_from_anchor_follows_affine_rule() {
    let walker = ParameterVector::new(-4.0, -1.0);
    let anchor = ParameterVector::new(-3.0, 0.0);

    assert_eq!(walker.stretch_from(anchor, 1.0), walker);
    let stretched = walker.stretch_from(anchor, 2.0);
    assert!((stretched.log_nh - -5.0).abs() < 1e-12);
    assert!((stretched.log_z - -2.0).abs() < 1e-12);
}

#[test]
fn indexing_and_finiteness() {
    let theta = ParameterVector::from_array([-4.0, -1.0]);
    assert_eq!(theta.get(0), Some(-4.0));
    assert_eq!(theta.get(1), Some(-1.0));
    assert_eq!(theta.get(2), None);
    assert!(theta.is_finite());
    assert!(!ParameterVector::new(f64::NAN, 0.0).is_finite());
    assert_eq!(ParameterVector::LABELS.len(), ParameterVector::DIM);
}

#[test]
fn closures_act_as_log_densities() {
    let density = |theta: ParameterVector| -(theta.log_nh.powi(2) + theta.log_z.powi(2));
    assert_eq!(density.log_density(ParameterVector::new(0.0, 0.0)), 0.0);
    assert_eq!(density.log_density(ParameterVector::new(1.0, 1.0)), -2.0);
}

#[test]
fn parameter_vector_round_trips_json() {
    let theta = ParameterVector::new(-4.25, -0.5);
    let json = serde_json::to_string(&theta).unwrap();
    let decoded: ParameterVector = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, theta);
}
