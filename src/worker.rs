//! Per-worker view of an Ape-X document.
//!
//! Sample workers run a copy of the agent described by the document, with three twists: each
//! may draw its own starting epsilon, each may run under its own execution settings, and
//! each post-processes the transitions it collects into n-step returns with initial replay
//! priorities before handing them to a replay shard.

use ndarray::{Array1, ArrayView1};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use tracing::{debug, trace};

use crate::config::execution::{
    DEFAULT_EXPLORATION_MIN_VALUE, DEFAULT_FRAME_SKIP, DEFAULT_NUM_BACKGROUND_ENVS,
    DEFAULT_NUM_WORKER_ENVIRONMENTS, DEFAULT_N_STEP_ADJUSTMENT, DEFAULT_SAMPLE_EXPLORATION,
    DEFAULT_WORKER_COMPUTES_WEIGHTS,
};
use crate::config::{AgentConfig, ExecutionSpec, WorkerSpec};
use crate::error::{ApexConfigError, Result};

/// Added to absolute losses so that no transition gets a zero priority
pub const PRIORITY_EPSILON: f32 = 1e-6;

/// Worker settings with every default resolved
#[derive(Clone, Debug, PartialEq)]
pub struct WorkerSettings {
    pub num_worker_environments: u64,
    pub num_background_envs: u64,
    pub frame_skip: u64,
    pub n_step_adjustment: u64,
    pub worker_computes_weights: bool,
    pub sample_exploration: bool,
    pub exploration_min_value: f64,
    pub execution_spec: Option<ExecutionSpec>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        WorkerSettings {
            num_worker_environments: DEFAULT_NUM_WORKER_ENVIRONMENTS,
            num_background_envs: DEFAULT_NUM_BACKGROUND_ENVS,
            frame_skip: DEFAULT_FRAME_SKIP,
            n_step_adjustment: DEFAULT_N_STEP_ADJUSTMENT,
            worker_computes_weights: DEFAULT_WORKER_COMPUTES_WEIGHTS,
            sample_exploration: DEFAULT_SAMPLE_EXPLORATION,
            exploration_min_value: DEFAULT_EXPLORATION_MIN_VALUE,
            execution_spec: None,
        }
    }
}

impl WorkerSettings {
    pub fn from_spec(spec: &WorkerSpec) -> Self {
        WorkerSettings {
            num_worker_environments: spec.num_worker_environments(),
            num_background_envs: spec.num_background_envs(),
            frame_skip: spec.frame_skip(),
            n_step_adjustment: spec.n_step_adjustment(),
            worker_computes_weights: spec.worker_computes_weights(),
            sample_exploration: spec.sample_exploration(),
            exploration_min_value: spec.exploration_min_value(),
            execution_spec: spec.execution_spec.as_deref().cloned(),
        }
    }

    /// Environment steps a worker advances per agent action across all its environments
    pub fn env_steps_per_action(&self) -> u64 {
        self.num_worker_environments * self.frame_skip
    }
}

/// The document a sample worker runs.
///
/// With `sample_exploration` on, the epsilon schedule starts from a value drawn uniformly
/// from `[exploration_min_value, from)`. A worker-level `execution_spec` replaces the
/// agent's.
pub fn derive_worker_config<R: Rng + ?Sized>(config: &AgentConfig, rng: &mut R) -> Result<AgentConfig> {
    let spec = config
        .worker_spec()
        .ok_or_else(|| ApexConfigError::MissingField("execution_spec.ray_spec.worker_spec".to_string()))?;
    let settings = WorkerSettings::from_spec(spec);
    let mut worker = config.clone();

    if settings.sample_exploration {
        if let Some(decay) = worker
            .exploration_spec
            .as_mut()
            .and_then(|exploration| exploration.decay_spec_mut())
        {
            let max_value = decay.start_value();
            let min_value = settings.exploration_min_value;
            if max_value < min_value {
                return Err(ApexConfigError::invalid_parameter(
                    "exploration_min_value",
                    format!("{} exceeds the epsilon decay start value {}", min_value, max_value),
                ));
            }
            if max_value > min_value {
                let sampled = Uniform::new(min_value, max_value).sample(rng);
                debug!(from = sampled, min_value, max_value, "sampled worker exploration start");
                decay.from = Some(sampled);
            }
        }
    }

    if let Some(execution) = settings.execution_spec {
        debug!("worker execution_spec replaces the agent's");
        worker.execution_spec = Some(execution);
    }

    Ok(worker)
}

/// One environment step as collected by a worker
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub state: Array1<f32>,
    pub action: usize,
    pub reward: f32,
    pub next_state: Array1<f32>,
    pub terminal: bool,
}

/// Transitions in collection order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleBatch {
    transitions: Vec<Transition>,
}

impl SampleBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        SampleBatch {
            transitions: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, transition: Transition) {
        self.transitions.push(transition);
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn truncate(&mut self, len: usize) {
        self.transitions.truncate(len);
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn rewards(&self) -> Array1<f32> {
        self.transitions.iter().map(|t| t.reward).collect()
    }

    pub fn terminals(&self) -> Vec<bool> {
        self.transitions.iter().map(|t| t.terminal).collect()
    }

    /// Fold the next `n - 1` discounted rewards into each transition.
    ///
    /// Terminal transitions are left alone. Accumulation stops after the first terminal
    /// reached, which then also marks the folded transition terminal. The last `n - 1`
    /// transitions lack a full horizon and are dropped.
    pub fn n_step_adjust(&mut self, n: u64, discount: f64) {
        let n = n as usize;
        if n <= 1 {
            return;
        }
        if self.transitions.len() < n {
            trace!(len = self.transitions.len(), n, "batch shorter than horizon");
            self.transitions.clear();
            return;
        }

        let new_len = self.transitions.len() - n + 1;
        for i in 0..new_len {
            let (head, tail) = self.transitions.split_at_mut(i + 1);
            let current = &mut head[i];
            if current.terminal {
                continue;
            }
            for (j, later) in tail.iter().take(n - 1).enumerate() {
                current.reward += (discount.powi(j as i32 + 1) as f32) * later.reward;
                current.next_state.clone_from(&later.next_state);
                if later.terminal {
                    current.terminal = true;
                    break;
                }
            }
        }
        self.transitions.truncate(new_len);
    }

    /// Clamp every reward to `[-1, 1]`
    pub fn clip_rewards(&mut self) {
        for transition in &mut self.transitions {
            transition.reward = transition.reward.clamp(-1.0, 1.0);
        }
    }
}

impl FromIterator<Transition> for SampleBatch {
    fn from_iter<I: IntoIterator<Item = Transition>>(iter: I) -> Self {
        SampleBatch {
            transitions: iter.into_iter().collect(),
        }
    }
}

/// Initial replay priorities from per-item losses
pub fn priority_weights(loss_per_item: ArrayView1<f32>) -> Array1<f32> {
    loss_per_item.mapv(|loss| loss.abs() + PRIORITY_EPSILON)
}

/// Priorities used when workers leave weighting to the replay shard
pub fn uniform_weights(len: usize) -> Array1<f32> {
    Array1::ones(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn transition(reward: f32, next: f32, terminal: bool) -> Transition {
        Transition {
            state: array![next - 1.0],
            action: 0,
            reward,
            next_state: array![next],
            terminal,
        }
    }

    #[test]
    fn test_n_step_of_one_is_identity() {
        let mut batch: SampleBatch = (0..4).map(|i| transition(1.0, i as f32, false)).collect();
        let before = batch.clone();
        batch.n_step_adjust(1, 0.9);
        assert_eq!(batch, before);
    }

    #[test]
    fn test_n_step_folds_following_rewards() {
        let mut batch: SampleBatch = vec![
            transition(1.0, 1.0, false),
            transition(2.0, 2.0, false),
            transition(4.0, 3.0, false),
            transition(8.0, 4.0, true),
            transition(16.0, 5.0, false),
        ]
        .into_iter()
        .collect();
        batch.n_step_adjust(3, 0.5);

        assert_eq!(batch.len(), 3);
        let folded = batch.transitions();
        assert!((folded[0].reward - 3.0).abs() < 1e-6);
        assert_eq!(folded[0].next_state, array![3.0_f32]);
        assert!(!folded[0].terminal);
        // Stops at the terminal and takes its next state
        assert!((folded[1].reward - 6.0).abs() < 1e-6);
        assert_eq!(folded[1].next_state, array![4.0_f32]);
        assert!(folded[1].terminal);
        // States themselves are untouched
        assert_eq!(folded[1].state, array![1.0_f32]);
    }

    #[test]
    fn test_priority_weights_are_positive() {
        let losses = array![-2.0_f32, 0.0, 0.5];
        let weights = priority_weights(losses.view());
        assert!((weights[0] - 2.0).abs() < 1e-5);
        assert!(weights[1] > 0.0);
        assert_eq!(uniform_weights(3), array![1.0_f32, 1.0, 1.0]);
    }

    #[test]
    fn test_settings_defaults() {
        let settings = WorkerSettings::from_spec(&WorkerSpec::default());
        assert_eq!(settings, WorkerSettings::default());
        assert_eq!(settings.env_steps_per_action(), 1);
    }
}
