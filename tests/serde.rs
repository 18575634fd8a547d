#![cfg(feature = "serde")]

mod common;

use common::{CubicModel, MixedQoi};
use reduced_qoi::{
    geometric_steps, taylor_verify, ErrorNorm, ReducedQoi, VerificationReport, VerifyConfig,
};

#[test]
fn report_round_trips_through_json() {
    let mut rq = ReducedQoi::new(CubicModel::standard(), MixedQoi);
    let config = VerifyConfig {
        steps: geometric_steps(1e-2, 0.5, 6),
        ..VerifyConfig::default()
    };
    let report = taylor_verify(&mut rq, &vec![0.4, -0.1], None, &config).unwrap();

    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("gradient_error"));
    let back: VerificationReport<f64> = serde_json::from_str(&json).unwrap();
    assert_eq!(back, report);
}

#[test]
fn error_norm_serializes_by_name() {
    assert_eq!(serde_json::to_string(&ErrorNorm::Two).unwrap(), "\"Two\"");
    let norm: ErrorNorm = serde_json::from_str("\"Inf\"").unwrap();
    assert_eq!(norm, ErrorNorm::Inf);
}
