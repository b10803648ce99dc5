//! # Decay Schedules
//!
//! Time-step driven parameter schedules as they appear in agent documents, most prominently
//! `exploration_spec.epsilon_spec.decay_spec`, and optionally as the learning rate of an
//! `optimizer_spec`.
//!
//! A schedule holds `from` until `start_timestep`, moves towards `to` over `num_timesteps`
//! steps, and holds `to` afterwards.
//!
//! ```rust
//! use apex_config::schedule::DecaySpec;
//!
//! let epsilon = DecaySpec::linear(1.0, 0.1, 0, 1000);
//! assert_eq!(epsilon.value(0), 1.0);
//! assert!((epsilon.value(500) - 0.55).abs() < 1e-9);
//! assert_eq!(epsilon.value(5000), 0.1);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const DEFAULT_FROM: f64 = 1.0;
pub const DEFAULT_TO: f64 = 0.0;
pub const DEFAULT_START_TIMESTEP: u64 = 0;
pub const DEFAULT_NUM_TIMESTEPS: u64 = 10000;
pub const DEFAULT_POWER: f64 = 1.0;

/// Shape of the decay between `from` and `to`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DecayKind {
    /// from + (to - from) * progress
    #[default]
    #[serde(alias = "linear")]
    LinearDecay,

    /// to + (from - to) * (1 - progress)^power
    #[serde(alias = "polynomial")]
    PolynomialDecay,

    /// to + (from - to) * 0.5^(elapsed / half_life)
    #[serde(alias = "exponential")]
    ExponentialDecay,

    /// Always `from`
    #[serde(alias = "constant")]
    ConstantDecay,
}

impl DecayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecayKind::LinearDecay => "linear_decay",
            DecayKind::PolynomialDecay => "polynomial_decay",
            DecayKind::ExponentialDecay => "exponential_decay",
            DecayKind::ConstantDecay => "constant_decay",
        }
    }
}

impl fmt::Display for DecayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decay schedule record.
///
/// All fields are optional in the document; the accessors return the effective value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct DecaySpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DecayKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<f64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub start_timestep: Option<u64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub num_timesteps: Option<u64>,

    /// Exponent of a polynomial decay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,

    /// Steps over which an exponential decay halves its distance to `to`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub half_life: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DecaySpec {
    /// Create a linear decay schedule
    pub fn linear(from: f64, to: f64, start_timestep: u64, num_timesteps: u64) -> Self {
        DecaySpec {
            kind: Some(DecayKind::LinearDecay),
            from: Some(from),
            to: Some(to),
            start_timestep: Some(start_timestep),
            num_timesteps: Some(num_timesteps),
            ..Default::default()
        }
    }

    /// Create a polynomial decay schedule
    pub fn polynomial(from: f64, to: f64, start_timestep: u64, num_timesteps: u64, power: f64) -> Self {
        DecaySpec {
            kind: Some(DecayKind::PolynomialDecay),
            power: Some(power),
            ..Self::linear(from, to, start_timestep, num_timesteps)
        }
    }

    /// Create an exponential decay schedule
    pub fn exponential(from: f64, to: f64, start_timestep: u64, num_timesteps: u64, half_life: f64) -> Self {
        DecaySpec {
            kind: Some(DecayKind::ExponentialDecay),
            half_life: Some(half_life),
            ..Self::linear(from, to, start_timestep, num_timesteps)
        }
    }

    /// Create a schedule that never moves
    pub fn constant(value: f64) -> Self {
        DecaySpec {
            kind: Some(DecayKind::ConstantDecay),
            from: Some(value),
            to: Some(value),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> DecayKind {
        self.kind.unwrap_or_default()
    }

    /// Effective `from`
    pub fn start_value(&self) -> f64 {
        self.from.unwrap_or(DEFAULT_FROM)
    }

    /// Effective `to`
    pub fn end_value(&self) -> f64 {
        self.to.unwrap_or(DEFAULT_TO)
    }

    pub fn start_timestep(&self) -> u64 {
        self.start_timestep.unwrap_or(DEFAULT_START_TIMESTEP)
    }

    pub fn num_timesteps(&self) -> u64 {
        self.num_timesteps.unwrap_or(DEFAULT_NUM_TIMESTEPS)
    }

    /// First time step at which the schedule holds `to`
    pub fn end_timestep(&self) -> u64 {
        self.start_timestep().saturating_add(self.num_timesteps())
    }

    pub fn power(&self) -> f64 {
        self.power.unwrap_or(DEFAULT_POWER)
    }

    pub fn half_life(&self) -> f64 {
        self.half_life
            .unwrap_or(self.num_timesteps() as f64 / 10.0)
    }

    /// Fill absent fields with their defaults
    pub fn apply_defaults(&mut self) {
        self.kind.get_or_insert(DecayKind::default());
        self.from.get_or_insert(DEFAULT_FROM);
        self.to.get_or_insert(DEFAULT_TO);
        self.start_timestep.get_or_insert(DEFAULT_START_TIMESTEP);
        self.num_timesteps.get_or_insert(DEFAULT_NUM_TIMESTEPS);
        match self.kind() {
            DecayKind::PolynomialDecay => {
                self.power.get_or_insert(DEFAULT_POWER);
            }
            DecayKind::ExponentialDecay => {
                let half_life = self.half_life();
                self.half_life.get_or_insert(half_life);
            }
            DecayKind::LinearDecay | DecayKind::ConstantDecay => {}
        }
    }

    /// Value of the schedule at a given time step
    pub fn value(&self, timestep: u64) -> f64 {
        let from = self.start_value();
        let to = self.end_value();

        if self.kind() == DecayKind::ConstantDecay {
            return from;
        }

        let start = self.start_timestep();
        if timestep < start {
            return from;
        }

        // A zero-length window is a step at `start_timestep`.
        let num_timesteps = self.num_timesteps();
        let elapsed = timestep - start;
        if elapsed >= num_timesteps {
            return to;
        }

        let progress = elapsed as f64 / num_timesteps as f64;
        match self.kind() {
            DecayKind::LinearDecay => from + (to - from) * progress,
            DecayKind::PolynomialDecay => to + (from - to) * (1.0 - progress).powf(self.power()),
            DecayKind::ExponentialDecay => {
                let half_life = self.half_life();
                // A non-positive half life decays instantly.
                if half_life <= 0.0 {
                    return to;
                }
                to + (from - to) * 0.5_f64.powf(elapsed as f64 / half_life)
            }
            DecayKind::ConstantDecay => from,
        }
    }

    /// `count` evenly spaced `(timestep, value)` pairs covering the decay window
    pub fn points(&self, count: usize) -> Vec<(u64, f64)> {
        let start = self.start_timestep();
        match count {
            0 => Vec::new(),
            1 => vec![(start, self.value(start))],
            _ => {
                let span = self.num_timesteps() as u128;
                let intervals = (count - 1) as u128;
                (0..count)
                    .map(|i| {
                        let offset = (span * i as u128 / intervals) as u64;
                        let timestep = start.saturating_add(offset);
                        (timestep, self.value(timestep))
                    })
                    .collect()
            }
        }
    }

    /// Lowest and highest value the schedule can take
    pub fn bounds(&self) -> (f64, f64) {
        let from = self.start_value();
        if self.kind() == DecayKind::ConstantDecay {
            return (from, from);
        }
        let to = self.end_value();
        (from.min(to), from.max(to))
    }
}

/// A learning rate given either as a plain number or as a decay schedule
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LearningRate {
    Constant(f64),
    Schedule(DecaySpec),
}

impl LearningRate {
    /// Learning rate at a given update step
    pub fn at(&self, step: u64) -> f64 {
        match self {
            LearningRate::Constant(lr) => *lr,
            LearningRate::Schedule(schedule) => schedule.value(step),
        }
    }

    /// Learning rate used for the first update
    pub fn initial(&self) -> f64 {
        self.at(0)
    }

    /// Lowest and highest learning rate that will be used
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            LearningRate::Constant(lr) => (*lr, *lr),
            LearningRate::Schedule(schedule) => schedule.bounds(),
        }
    }
}

impl From<f64> for LearningRate {
    fn from(lr: f64) -> Self {
        LearningRate::Constant(lr)
    }
}

impl From<DecaySpec> for LearningRate {
    fn from(schedule: DecaySpec) -> Self {
        LearningRate::Schedule(schedule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_linear_holds_outside_window() {
        let schedule = DecaySpec::linear(1.0, 0.1, 100, 1000);
        assert_eq!(schedule.value(0), 1.0);
        assert_eq!(schedule.value(99), 1.0);
        assert_eq!(schedule.value(100), 1.0);
        assert_eq!(schedule.value(1100), 0.1);
        assert_eq!(schedule.value(u64::MAX), 0.1);
    }

    #[test]
    fn test_zero_length_window_is_a_step() {
        let schedule = DecaySpec::linear(1.0, 0.1, 50, 0);
        assert_eq!(schedule.value(49), 1.0);
        assert_eq!(schedule.value(50), 0.1);
    }

    #[test]
    fn test_polynomial_with_power_one_matches_linear() {
        let linear = DecaySpec::linear(0.8, 0.2, 0, 100);
        let polynomial = DecaySpec::polynomial(0.8, 0.2, 0, 100, 1.0);
        for t in [0, 10, 33, 50, 99, 100, 150] {
            assert!((linear.value(t) - polynomial.value(t)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_exponential_halves_distance() {
        let schedule = DecaySpec::exponential(1.0, 0.0, 0, 1000, 100.0);
        assert!((schedule.value(100) - 0.5).abs() < 1e-12);
        assert!((schedule.value(200) - 0.25).abs() < 1e-12);
        assert_eq!(schedule.value(1000), 0.0);
    }

    #[test]
    fn test_exponential_zero_half_life_decays_instantly() {
        let schedule = DecaySpec::exponential(1.0, 0.1, 10, 1000, 0.0);
        assert_eq!(schedule.value(9), 1.0);
        assert_eq!(schedule.value(10), 0.1);
        assert_eq!(schedule.value(500), 0.1);
        assert!(schedule.points(5).iter().all(|(_, value)| value.is_finite()));
    }

    #[test]
    fn test_constant_ignores_window() {
        let schedule = DecaySpec::constant(0.3);
        assert_eq!(schedule.value(0), 0.3);
        assert_eq!(schedule.value(1_000_000), 0.3);
        assert_eq!(schedule.bounds(), (0.3, 0.3));
    }

    #[test]
    fn test_points_span_window() {
        let schedule = DecaySpec::linear(1.0, 0.0, 10, 100);
        let points = schedule.points(5);
        assert_eq!(points.len(), 5);
        assert_eq!(points[0], (10, 1.0));
        assert_eq!(points[4], (110, 0.0));
        assert_eq!(points[2].0, 60);
        assert!(schedule.points(0).is_empty());
    }

    #[test]
    fn test_decay_spec_parsing() {
        let schedule: DecaySpec = serde_json::from_value(json!({
            "type": "linear_decay",
            "from": 1.0,
            "to": 0.1,
            "start_timestep": 0,
            "num_timesteps": 1000
        }))
        .unwrap();
        assert_eq!(schedule.kind(), DecayKind::LinearDecay);
        assert_eq!(schedule.num_timesteps(), 1000);

        let aliased: DecaySpec = serde_json::from_value(json!({"type": "exponential"})).unwrap();
        assert_eq!(aliased.kind(), DecayKind::ExponentialDecay);
        assert_eq!(aliased.half_life(), 1000.0);
    }

    #[test]
    fn test_learning_rate_forms() {
        let constant: LearningRate = serde_json::from_value(json!(0.0005)).unwrap();
        assert_eq!(constant, LearningRate::Constant(0.0005));
        assert_eq!(constant.at(1_000), 0.0005);

        let scheduled: LearningRate = serde_json::from_value(json!({
            "type": "polynomial_decay",
            "from": 0.001,
            "to": 0.0001,
            "num_timesteps": 100,
            "power": 2.0
        }))
        .unwrap();
        assert!((scheduled.initial() - 0.001).abs() < 1e-12);
        assert_eq!(scheduled.at(100), 0.0001);
        assert_eq!(scheduled.bounds(), (0.0001, 0.001));
    }
}
