use serde_json::json;

use super::apex_agent;
use crate::config::ExplorationSpec;
use crate::schedule::{DecayKind, DecaySpec};

#[test]
fn test_apex_epsilon_schedule() {
    let config = apex_agent();

    assert_eq!(config.epsilon_at(0), Some(1.0));
    let halfway = config.epsilon_at(500).unwrap();
    assert!((halfway - 0.55).abs() < 1e-9);
    assert_eq!(config.epsilon_at(1000), Some(0.1));
    assert_eq!(config.epsilon_at(50_000), Some(0.1));
}

#[test]
fn test_linear_decay_is_monotonic() {
    let schedule = DecaySpec::linear(1.0, 0.02, 250, 10_000);
    let mut previous = schedule.value(0);
    for t in (0..12_000).step_by(37) {
        let value = schedule.value(t);
        assert!(value <= previous + 1e-12);
        assert!((0.02..=1.0).contains(&value));
        previous = value;
    }
}

#[test]
fn test_absent_fields_take_defaults() {
    let schedule: DecaySpec = serde_json::from_value(json!({})).unwrap();
    assert_eq!(schedule.kind(), DecayKind::LinearDecay);
    assert_eq!(schedule.value(0), 1.0);
    assert_eq!(schedule.value(10_000), 0.0);

    let mut filled = schedule.clone();
    filled.apply_defaults();
    assert_eq!(filled.num_timesteps, Some(10_000));
    assert_eq!(filled.power, None);
    assert_eq!(serde_json::to_value(&schedule).unwrap(), json!({}));
}

#[test]
fn test_exponential_defaults_half_life() {
    let mut schedule = DecaySpec {
        kind: Some(DecayKind::ExponentialDecay),
        num_timesteps: Some(500),
        ..Default::default()
    };
    schedule.apply_defaults();
    assert_eq!(schedule.half_life, Some(50.0));
    assert!((schedule.value(50) - 0.5).abs() < 1e-12);
}

#[test]
fn test_exploration_without_schedule() {
    let exploration: ExplorationSpec = serde_json::from_value(json!({"epsilon_spec": {}})).unwrap();
    assert!(exploration.decay_spec().is_none());
    assert_eq!(exploration.epsilon_at(10), None);
}

#[test]
fn test_points_follow_schedule() {
    let config = apex_agent();
    let points = config.epsilon_decay().unwrap().points(3);
    assert_eq!(points[0], (0, 1.0));
    assert_eq!(points[1].0, 500);
    assert_eq!(points[2], (1000, 0.1));
}
