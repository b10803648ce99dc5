//! Consistency checks over a parsed [`AgentConfig`].
//!
//! Parsing only guarantees that the document has the right shape. The rules here catch the
//! combinations a trainer would reject or silently mishandle: a replay memory smaller than
//! the batch it must serve, a sync interval that is not a multiple of the update interval,
//! worker and replay shards disagreeing on n-step returns, and so on.
//!
//! Rules that describe legal but suspicious setups are reported as warnings.

use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use tracing::warn;

use crate::config::{
    ActionAdapterSpec, AgentConfig, AgentKind, DeviceStrategy, ExecutionSpec, LayerKind, LayerSpec,
    PolicyKind, RaySpec,
};
use crate::error::{ApexConfigError, Result};
use crate::json::as_whole_u64;
use crate::schedule::{DecayKind, DecaySpec, LearningRate};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// A single finding, located by the dotted path of the offending field
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Issue {
    pub path: String,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}: {}", self.severity, self.path, self.message)
    }
}

/// All findings for one document
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.push(path.into(), Severity::Error, message.into());
    }

    pub fn warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.push(path.into(), Severity::Warning, message.into());
    }

    fn push(&mut self, path: String, severity: Severity, message: String) {
        self.issues.push(Issue { path, severity, message });
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|issue| issue.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|issue| issue.severity == Severity::Warning)
    }

    /// No errors; warnings are allowed
    pub fn is_ok(&self) -> bool {
        self.errors().next().is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Whether any issue is reported at exactly `path`
    pub fn has_issue_at(&self, path: &str) -> bool {
        self.issues.iter().any(|issue| issue.path == path)
    }

    /// The first error, as an `Err`
    pub fn into_result(self) -> Result<()> {
        match self.issues.into_iter().find(|issue| issue.severity == Severity::Error) {
            Some(issue) => Err(ApexConfigError::validation(issue.path, issue.message)),
            None => Ok(()),
        }
    }
}

/// Which ordered stack a list of descriptors belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stack {
    Network,
    Preprocessing,
}

impl AgentConfig {
    /// Run every rule and collect the findings
    pub fn validation_report(&self) -> ValidationReport {
        let mut report = ValidationReport::new();

        check_discount(self, &mut report);
        check_memory(self, &mut report);
        check_network(self, &mut report);
        check_preprocessing(self, &mut report);
        check_policy(self, &mut report);
        check_update(self, &mut report);
        check_exploration(self, &mut report);
        check_optimizer(self, &mut report);
        if let Some(execution) = &self.execution_spec {
            check_execution(self, execution, "execution_spec", &mut report);
        }
        check_saving(self, &mut report);

        report
    }

    /// Log warnings and fail on the first error
    pub fn validate(&self) -> Result<()> {
        let report = self.validation_report();
        for issue in report.warnings() {
            warn!(path = %issue.path, "{}", issue.message);
        }
        report.into_result()
    }
}

fn check_unit_interval(value: f64, path: &str, report: &mut ValidationReport) {
    if !(0.0..=1.0).contains(&value) {
        report.error(path, format!("must be within [0, 1], got {}", value));
    }
}

fn check_positive(value: u64, path: &str, report: &mut ValidationReport) {
    if value == 0 {
        report.error(path, "must be greater than 0");
    }
}

fn check_discount(config: &AgentConfig, report: &mut ValidationReport) {
    if let Some(discount) = config.discount {
        check_unit_interval(discount, "discount", report);
    }
}

fn check_memory(config: &AgentConfig, report: &mut ValidationReport) {
    let Some(memory) = &config.memory_spec else {
        report.warning("memory_spec", "absent; default replay memory will be used");
        return;
    };

    let capacity = memory.capacity();
    check_positive(capacity, "memory_spec.capacity", report);

    let batch_size = config.batch_size();
    if capacity < batch_size {
        report.error(
            "memory_spec.capacity",
            format!("capacity {} is smaller than update batch size {}", capacity, batch_size),
        );
    }

    if let Some(alpha) = memory.alpha {
        if alpha < 0.0 {
            report.error("memory_spec.alpha", format!("must be non-negative, got {}", alpha));
        }
    }
    if let Some(beta) = memory.beta {
        check_unit_interval(beta, "memory_spec.beta", report);
    }

    if config.agent_type == AgentKind::Apex && !config.memory_kind().is_prioritized() {
        report.warning(
            "memory_spec.type",
            format!("apex agents expect a prioritized memory, got '{}'", config.memory_kind()),
        );
    }
}

fn check_network(config: &AgentConfig, report: &mut ValidationReport) {
    match &config.network_spec {
        None => report.error("network_spec", "required"),
        Some(layers) if layers.is_empty() => report.error("network_spec", "must contain at least one layer"),
        Some(layers) => check_layers(layers, "network_spec", Stack::Network, false, report),
    }
}

fn check_preprocessing(config: &AgentConfig, report: &mut ValidationReport) {
    // Distributed workers address their preprocessors by scope.
    let needs_scope = config.ray_spec().is_some();
    if let Some(preprocessors) = &config.preprocessing_spec {
        check_layers(preprocessors, "preprocessing_spec", Stack::Preprocessing, needs_scope, report);
    }
}

fn check_layers(layers: &[LayerSpec], prefix: &str, stack: Stack, needs_scope: bool, report: &mut ValidationReport) {
    let mut scopes = HashSet::new();

    for (index, layer) in layers.iter().enumerate() {
        let path = format!("{}.{}", prefix, index);
        let kind = layer.layer_kind();

        match (&kind, stack) {
            (LayerKind::Custom(name), _) => {
                report.warning(format!("{}.type", path), format!("unknown kind '{}'", name));
            }
            (_, Stack::Network) if !kind.is_network_layer() => {
                report.error(
                    format!("{}.type", path),
                    format!("'{}' is a preprocessor and cannot be a network layer", layer.kind),
                );
            }
            (_, Stack::Preprocessing) if !kind.is_preprocessor() => {
                report.error(
                    format!("{}.type", path),
                    format!("'{}' is a network layer and cannot be a preprocessor", layer.kind),
                );
            }
            _ => {}
        }

        if let Err(err) = layer.activation() {
            report.error(format!("{}.activation", path), err.to_string());
        }

        match &layer.scope {
            Some(scope) => {
                if !scopes.insert(scope.as_str()) {
                    report.error(format!("{}.scope", path), format!("duplicate scope '{}'", scope));
                }
            }
            None if needs_scope => {
                report.error(format!("{}.scope", path), "required for distributed execution");
            }
            None => {}
        }

        check_layer_params(layer, &kind, &path, report);
    }
}

fn require_positive_param(layer: &LayerSpec, key: &str, path: &str, report: &mut ValidationReport) {
    match layer.param(key) {
        None => report.error(format!("{}.{}", path, key), "required"),
        Some(value) => match as_whole_u64(value) {
            Some(0) => report.error(format!("{}.{}", path, key), "must be greater than 0"),
            Some(_) => {}
            // Per-dimension values such as [8, 8] are left to the consumer.
            None if value.is_array() => {}
            None => report.error(format!("{}.{}", path, key), format!("expected a positive integer, got {}", value)),
        },
    }
}

fn check_layer_params(layer: &LayerSpec, kind: &LayerKind, path: &str, report: &mut ValidationReport) {
    match kind {
        LayerKind::Dense | LayerKind::Lstm => require_positive_param(layer, "units", path, report),
        LayerKind::Conv2d => {
            require_positive_param(layer, "filters", path, report);
            require_positive_param(layer, "kernel_size", path, report);
            require_positive_param(layer, "strides", path, report);
        }
        LayerKind::ImageResize => {
            require_positive_param(layer, "width", path, report);
            require_positive_param(layer, "height", path, report);
        }
        LayerKind::Sequence => require_positive_param(layer, "sequence_length", path, report),
        LayerKind::Divide => match layer.param_f64("divisor") {
            None => report.error(format!("{}.divisor", path), "required"),
            Some(divisor) if divisor == 0.0 => report.error(format!("{}.divisor", path), "must not be zero"),
            Some(_) => {}
        },
        LayerKind::Multiply => {
            if layer.param_f64("factor").is_none() {
                report.error(format!("{}.factor", path), "required");
            }
        }
        LayerKind::Clip => {
            if let (Some(min), Some(max)) = (layer.param_f64("min"), layer.param_f64("max")) {
                if min > max {
                    report.error(path.to_string(), format!("clip min {} exceeds max {}", min, max));
                }
            }
        }
        _ => {}
    }
}

fn check_policy(config: &AgentConfig, report: &mut ValidationReport) {
    let Some(policy) = &config.policy_spec else {
        return;
    };

    if policy.kind() == PolicyKind::Dueling {
        match policy.units_state_value_stream {
            None => report.error("policy_spec.units_state_value_stream", "required for a dueling policy"),
            Some(units) => check_positive(units, "policy_spec.units_state_value_stream", report),
        }
    }

    let Some(adapters) = &policy.action_adapter_spec else {
        return;
    };
    if let ActionAdapterSpec::PerComponent(map) = adapters {
        if map.is_empty() {
            report.warning("policy_spec.action_adapter_spec", "empty component map");
        }
    }
    for (component, adapter) in adapters.adapters() {
        let prefix = match component {
            Some(name) if name.trim().is_empty() => {
                report.error("policy_spec.action_adapter_spec", "component names must not be empty");
                continue;
            }
            Some(name) => format!("policy_spec.action_adapter_spec.{}", name),
            None => "policy_spec.action_adapter_spec".to_string(),
        };
        if let Some(activation) = &adapter.activation {
            if let Err(err) = activation.parse::<crate::config::Activation>() {
                report.error(format!("{}.activation", prefix), err.to_string());
            }
        }
        check_layers(
            adapter.pre_network(),
            &format!("{}.pre_network_spec", prefix),
            Stack::Network,
            false,
            report,
        );
    }
}

fn check_update(config: &AgentConfig, report: &mut ValidationReport) {
    let Some(update) = &config.update_spec else {
        return;
    };

    let update_interval = update.update_interval();
    let sync_interval = update.sync_interval();
    let batch_size = update.batch_size();

    check_positive(update_interval, "update_spec.update_interval", report);
    check_positive(batch_size, "update_spec.batch_size", report);
    check_positive(update.update_steps(), "update_spec.update_steps", report);

    if update_interval > 0 && sync_interval % update_interval != 0 {
        report.error(
            "update_spec.sync_interval",
            format!(
                "sync_interval ({}) must be a multiple of update_interval ({})",
                sync_interval, update_interval
            ),
        );
    }

    if update.do_updates() && update.steps_before_update() < batch_size {
        report.warning(
            "update_spec.steps_before_update",
            format!(
                "first update at step {} happens before a full batch of {} is available",
                update.steps_before_update(),
                batch_size
            ),
        );
    }
}

fn check_decay(decay: &DecaySpec, prefix: &str, report: &mut ValidationReport) {
    match decay.kind() {
        DecayKind::PolynomialDecay if decay.power() <= 0.0 => {
            report.error(format!("{}.power", prefix), "must be greater than 0");
        }
        DecayKind::ExponentialDecay if decay.half_life() <= 0.0 && decay.num_timesteps() > 0 => {
            report.error(format!("{}.half_life", prefix), "must be greater than 0");
        }
        _ => {}
    }
}

fn check_exploration(config: &AgentConfig, report: &mut ValidationReport) {
    let Some(decay) = config.epsilon_decay() else {
        if config.exploration_spec.is_none() {
            report.warning("exploration_spec", "absent; actions will be chosen greedily");
        }
        return;
    };

    let prefix = "exploration_spec.epsilon_spec.decay_spec";
    let from = decay.start_value();
    let to = decay.end_value();
    check_unit_interval(from, &format!("{}.from", prefix), report);
    check_unit_interval(to, &format!("{}.to", prefix), report);
    if from < to {
        report.warning(
            prefix,
            format!("epsilon increases from {} to {}; exploration grows over time", from, to),
        );
    }
    check_decay(decay, prefix, report);
}

fn check_optimizer(config: &AgentConfig, report: &mut ValidationReport) {
    let Some(optimizer) = &config.optimizer_spec else {
        report.warning("optimizer_spec", "absent; the trainer's default optimizer will be used");
        return;
    };

    let path = "optimizer_spec.learning_rate";
    match &optimizer.learning_rate {
        None => report.warning(path, "absent; the optimizer's default will be used"),
        Some(learning_rate) => {
            let (low, _) = learning_rate.bounds();
            if low <= 0.0 {
                report.error(path, format!("must be greater than 0, lowest value is {}", low));
            }
            if let LearningRate::Schedule(schedule) = learning_rate {
                check_decay(schedule, path, report);
            }
        }
    }

    if let Some(clip) = optimizer.clip_grad_norm {
        if clip <= 0.0 {
            report.error("optimizer_spec.clip_grad_norm", "must be greater than 0");
        }
    }
}

fn check_execution(config: &AgentConfig, execution: &ExecutionSpec, prefix: &str, report: &mut ValidationReport) {
    if let Some(ray) = &execution.ray_spec {
        check_ray(config, ray, &format!("{}.ray_spec", prefix), report);
        if execution.device_strategy() == DeviceStrategy::MultiGpuSync {
            report.warning(
                format!("{}.device_strategy", prefix),
                "multi_gpu_sync on a ray learner places every GPU on one process",
            );
        }
    }
}

fn check_ray(config: &AgentConfig, ray: &RaySpec, prefix: &str, report: &mut ValidationReport) {
    if config.agent_type != AgentKind::Apex {
        report.warning(prefix, format!("ray execution is only used by apex agents, not '{}'", config.agent_type));
    }

    if let Some(executor) = &ray.executor_spec {
        let path = |field: &str| format!("{}.executor_spec.{}", prefix, field);
        check_positive(executor.num_sample_workers(), &path("num_sample_workers"), report);
        check_positive(executor.num_replay_workers(), &path("num_replay_workers"), report);
        check_positive(executor.weight_sync_steps(), &path("weight_sync_steps"), report);
        check_positive(executor.learn_queue_size(), &path("learn_queue_size"), report);
        check_positive(executor.num_worker_samples(), &path("num_worker_samples"), report);
        check_positive(executor.replay_sampling_task_depth(), &path("replay_sampling_task_depth"), report);
        check_positive(executor.env_interaction_task_depth(), &path("env_interaction_task_depth"), report);
    }

    if let Some(worker) = &ray.worker_spec {
        let path = |field: &str| format!("{}.worker_spec.{}", prefix, field);
        check_positive(worker.num_worker_environments(), &path("num_worker_environments"), report);
        check_positive(worker.num_background_envs(), &path("num_background_envs"), report);
        check_positive(worker.frame_skip(), &path("frame_skip"), report);
        check_positive(worker.n_step_adjustment(), &path("n_step_adjustment"), report);

        let min_value = worker.exploration_min_value();
        check_unit_interval(min_value, &path("exploration_min_value"), report);
        if worker.sample_exploration() {
            if let Some(decay) = config.epsilon_decay() {
                if decay.start_value() < min_value {
                    report.error(
                        path("exploration_min_value"),
                        format!(
                            "exceeds the epsilon decay start value {}; nothing to sample from",
                            decay.start_value()
                        ),
                    );
                }
            }
        }

        if let Some(replay) = &ray.apex_replay_spec {
            if worker.n_step_adjustment() != replay.n_step_adjustment() {
                report.error(
                    path("n_step_adjustment"),
                    format!(
                        "worker uses {}-step returns but replay memory expects {}",
                        worker.n_step_adjustment(),
                        replay.n_step_adjustment()
                    ),
                );
            }
        }

        if let Some(worker_execution) = &worker.execution_spec {
            if worker_execution.ray_spec.is_some() {
                report.error(
                    format!("{}.worker_spec.execution_spec.ray_spec", prefix),
                    "workers cannot nest their own ray topology",
                );
            }
        }
    }

    if let Some(replay) = &ray.apex_replay_spec {
        let path = |field: &str| format!("{}.apex_replay_spec.{}", prefix, field);
        let capacity = replay
            .memory_spec
            .as_ref()
            .map(|memory| memory.capacity())
            .unwrap_or(crate::config::memory::DEFAULT_CAPACITY);
        check_positive(capacity, &path("memory_spec.capacity"), report);
        check_positive(replay.batch_size(), &path("batch_size"), report);

        if replay.batch_size() > capacity {
            report.error(
                path("batch_size"),
                format!("batch size {} exceeds replay capacity {}", replay.batch_size(), capacity),
            );
        }
        if replay.min_sample_memory_size() > capacity {
            report.error(
                path("min_sample_memory_size"),
                format!(
                    "shards would never fill: min_sample_memory_size {} exceeds capacity {}",
                    replay.min_sample_memory_size(),
                    capacity
                ),
            );
        }
        if let Some(memory) = &replay.memory_spec {
            if let Some(alpha) = memory.alpha {
                if alpha < 0.0 {
                    report.error(path("memory_spec.alpha"), format!("must be non-negative, got {}", alpha));
                }
            }
            if let Some(beta) = memory.beta {
                check_unit_interval(beta, &path("memory_spec.beta"), report);
            }
        }
        if !replay.memory_kind().is_prioritized() {
            report.warning(path("memory_spec.type"), "replay shards are normally prioritized");
        }
    }
}

fn check_saving(config: &AgentConfig, report: &mut ValidationReport) {
    if let Some(saver) = &config.saver_spec {
        if saver.save_secs.is_none() && saver.save_steps.is_none() {
            report.warning("saver_spec", "neither save_secs nor save_steps is set; checkpoints are never written");
        }
        if saver.max_checkpoints == Some(0) {
            report.error("saver_spec.max_checkpoints", "must be greater than 0");
        }
    }
    if let Some(summary) = &config.summary_spec {
        if summary.save_secs.is_none() && summary.save_steps.is_none() {
            report.warning("summary_spec", "neither save_secs nor save_steps is set; summaries are never written");
        }
    }
}
