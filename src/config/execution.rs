use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

use super::memory::{MemoryKind, MemorySpec};
use crate::json::merge_defaults;

pub const DEFAULT_PROFILER_FREQUENCY: u64 = 1000;

pub const DEFAULT_NUM_GPUS: u64 = 0;
pub const DEFAULT_WEIGHT_SYNC_STEPS: u64 = 400;
pub const DEFAULT_TASK_DEPTH: u64 = 1;
pub const DEFAULT_NUM_WORKER_SAMPLES: u64 = 100;
pub const DEFAULT_LEARN_QUEUE_SIZE: u64 = 1;
pub const DEFAULT_NUM_SAMPLE_WORKERS: u64 = 1;
pub const DEFAULT_NUM_REPLAY_WORKERS: u64 = 1;

pub const DEFAULT_NUM_WORKER_ENVIRONMENTS: u64 = 1;
pub const DEFAULT_NUM_BACKGROUND_ENVS: u64 = 1;
pub const DEFAULT_FRAME_SKIP: u64 = 1;
pub const DEFAULT_N_STEP_ADJUSTMENT: u64 = 1;
pub const DEFAULT_WORKER_COMPUTES_WEIGHTS: bool = true;
pub const DEFAULT_SAMPLE_EXPLORATION: bool = false;
pub const DEFAULT_EXPLORATION_MIN_VALUE: f64 = 0.0;

pub const DEFAULT_CLIP_REWARDS: bool = true;
pub const DEFAULT_MIN_SAMPLE_MEMORY_SIZE: u64 = 1000;
pub const DEFAULT_REPLAY_BATCH_SIZE: u64 = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Single,
    Distributed,
}

/// How graph operations are placed on devices
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStrategy {
    #[default]
    Default,
    Custom,
    MultiGpuSync,
}

impl fmt::Display for DeviceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceStrategy::Default => "default",
            DeviceStrategy::Custom => "custom",
            DeviceStrategy::MultiGpuSync => "multi_gpu_sync",
        })
    }
}

/// `execution_spec`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecutionSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ExecutionMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distributed_spec: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_strategy: Option<DeviceStrategy>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_device: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_map: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_config: Option<Value>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_profiler: Option<bool>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub profiler_frequency: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_spec: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ray_spec: Option<RaySpec>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExecutionSpec {
    pub fn mode(&self) -> ExecutionMode {
        self.mode.unwrap_or_default()
    }

    pub fn device_strategy(&self) -> DeviceStrategy {
        self.device_strategy.unwrap_or_default()
    }

    pub fn apply_defaults(&mut self) {
        let mode = *self.mode.get_or_insert(ExecutionMode::Single);
        self.device_strategy.get_or_insert(DeviceStrategy::Default);
        self.enable_profiler.get_or_insert(false);
        self.profiler_frequency.get_or_insert(DEFAULT_PROFILER_FREQUENCY);

        if mode == ExecutionMode::Distributed {
            let distributed = self.distributed_spec.get_or_insert_with(|| Value::Object(Map::new()));
            merge_defaults(
                distributed,
                &json!({
                    "job": "ps",
                    "task_index": 0,
                    "cluster_spec": {
                        "ps": ["localhost:22222"],
                        "worker": ["localhost:22223"]
                    },
                    "global_shared_memory": true,
                    "protocol": null
                }),
            );
        }

        let session = self.session_config.get_or_insert_with(|| Value::Object(Map::new()));
        merge_defaults(
            session,
            &json!({
                "allow_soft_placement": true,
                "log_device_placement": false
            }),
        );

        if let Some(ray) = self.ray_spec.as_mut() {
            ray.apply_defaults();
        }
    }
}

/// `execution_spec.ray_spec`: the Ape-X executor topology
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct RaySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_spec: Option<ExecutorSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_spec: Option<WorkerSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apex_replay_spec: Option<ApexReplaySpec>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RaySpec {
    pub fn apply_defaults(&mut self) {
        self.executor_spec
            .get_or_insert_with(ExecutorSpec::default)
            .apply_defaults();
        self.worker_spec
            .get_or_insert_with(WorkerSpec::default)
            .apply_defaults();
        self.apex_replay_spec
            .get_or_insert_with(ApexReplaySpec::default)
            .apply_defaults();
    }
}

/// Executor-level settings: worker counts, task pipelining, queue sizes
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct ExecutorSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis_address: Option<String>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub num_cpus: Option<u64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub num_gpus: Option<u64>,

    /// Learner steps between weight broadcasts to sample workers
    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub weight_sync_steps: Option<u64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub replay_sampling_task_depth: Option<u64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub env_interaction_task_depth: Option<u64>,

    /// Time steps a sample worker collects per task
    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub num_worker_samples: Option<u64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub learn_queue_size: Option<u64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub num_sample_workers: Option<u64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub num_replay_workers: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExecutorSpec {
    pub fn num_gpus(&self) -> u64 {
        self.num_gpus.unwrap_or(DEFAULT_NUM_GPUS)
    }

    pub fn weight_sync_steps(&self) -> u64 {
        self.weight_sync_steps.unwrap_or(DEFAULT_WEIGHT_SYNC_STEPS)
    }

    pub fn replay_sampling_task_depth(&self) -> u64 {
        self.replay_sampling_task_depth.unwrap_or(DEFAULT_TASK_DEPTH)
    }

    pub fn env_interaction_task_depth(&self) -> u64 {
        self.env_interaction_task_depth.unwrap_or(DEFAULT_TASK_DEPTH)
    }

    pub fn num_worker_samples(&self) -> u64 {
        self.num_worker_samples.unwrap_or(DEFAULT_NUM_WORKER_SAMPLES)
    }

    pub fn learn_queue_size(&self) -> u64 {
        self.learn_queue_size.unwrap_or(DEFAULT_LEARN_QUEUE_SIZE)
    }

    pub fn num_sample_workers(&self) -> u64 {
        self.num_sample_workers.unwrap_or(DEFAULT_NUM_SAMPLE_WORKERS)
    }

    pub fn num_replay_workers(&self) -> u64 {
        self.num_replay_workers.unwrap_or(DEFAULT_NUM_REPLAY_WORKERS)
    }

    pub fn apply_defaults(&mut self) {
        self.num_gpus.get_or_insert(DEFAULT_NUM_GPUS);
        self.weight_sync_steps.get_or_insert(DEFAULT_WEIGHT_SYNC_STEPS);
        self.replay_sampling_task_depth.get_or_insert(DEFAULT_TASK_DEPTH);
        self.env_interaction_task_depth.get_or_insert(DEFAULT_TASK_DEPTH);
        self.num_worker_samples.get_or_insert(DEFAULT_NUM_WORKER_SAMPLES);
        self.learn_queue_size.get_or_insert(DEFAULT_LEARN_QUEUE_SIZE);
        self.num_sample_workers.get_or_insert(DEFAULT_NUM_SAMPLE_WORKERS);
        self.num_replay_workers.get_or_insert(DEFAULT_NUM_REPLAY_WORKERS);
    }
}

/// Per-sample-worker settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct WorkerSpec {
    /// Replaces the agent's `execution_spec` inside the worker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_spec: Option<Box<ExecutionSpec>>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub num_worker_environments: Option<u64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub num_background_envs: Option<u64>,

    /// Times each action is repeated in the environment
    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub frame_skip: Option<u64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub n_step_adjustment: Option<u64>,

    /// Whether workers compute initial priorities from their own loss
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_computes_weights: Option<bool>,

    /// Whether each worker draws its own initial epsilon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_exploration: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exploration_min_value: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl WorkerSpec {
    pub fn num_worker_environments(&self) -> u64 {
        self.num_worker_environments.unwrap_or(DEFAULT_NUM_WORKER_ENVIRONMENTS)
    }

    pub fn num_background_envs(&self) -> u64 {
        self.num_background_envs.unwrap_or(DEFAULT_NUM_BACKGROUND_ENVS)
    }

    pub fn frame_skip(&self) -> u64 {
        self.frame_skip.unwrap_or(DEFAULT_FRAME_SKIP)
    }

    pub fn n_step_adjustment(&self) -> u64 {
        self.n_step_adjustment.unwrap_or(DEFAULT_N_STEP_ADJUSTMENT)
    }

    pub fn worker_computes_weights(&self) -> bool {
        self.worker_computes_weights.unwrap_or(DEFAULT_WORKER_COMPUTES_WEIGHTS)
    }

    pub fn sample_exploration(&self) -> bool {
        self.sample_exploration.unwrap_or(DEFAULT_SAMPLE_EXPLORATION)
    }

    pub fn exploration_min_value(&self) -> f64 {
        self.exploration_min_value.unwrap_or(DEFAULT_EXPLORATION_MIN_VALUE)
    }

    pub fn apply_defaults(&mut self) {
        self.num_worker_environments.get_or_insert(DEFAULT_NUM_WORKER_ENVIRONMENTS);
        self.num_background_envs.get_or_insert(DEFAULT_NUM_BACKGROUND_ENVS);
        self.frame_skip.get_or_insert(DEFAULT_FRAME_SKIP);
        self.n_step_adjustment.get_or_insert(DEFAULT_N_STEP_ADJUSTMENT);
        self.worker_computes_weights.get_or_insert(DEFAULT_WORKER_COMPUTES_WEIGHTS);
        self.sample_exploration.get_or_insert(DEFAULT_SAMPLE_EXPLORATION);
        self.exploration_min_value.get_or_insert(DEFAULT_EXPLORATION_MIN_VALUE);
        if let Some(execution) = self.execution_spec.as_mut() {
            execution.apply_defaults();
        }
    }
}

/// Settings of the replay shards that sit between workers and the learner
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct ApexReplaySpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_spec: Option<MemorySpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_rewards: Option<bool>,

    /// Records a shard holds before it serves samples
    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub min_sample_memory_size: Option<u64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ApexReplaySpec {
    /// Replay shards are always prioritized unless the record says otherwise
    pub fn memory_kind(&self) -> MemoryKind {
        self.memory_spec
            .as_ref()
            .map(|memory| memory.kind_or(MemoryKind::PrioritizedReplay))
            .unwrap_or(MemoryKind::PrioritizedReplay)
    }

    pub fn n_step_adjustment(&self) -> u64 {
        self.memory_spec
            .as_ref()
            .map(MemorySpec::n_step_adjustment)
            .unwrap_or(DEFAULT_N_STEP_ADJUSTMENT)
    }

    pub fn clip_rewards(&self) -> bool {
        self.clip_rewards.unwrap_or(DEFAULT_CLIP_REWARDS)
    }

    pub fn min_sample_memory_size(&self) -> u64 {
        self.min_sample_memory_size.unwrap_or(DEFAULT_MIN_SAMPLE_MEMORY_SIZE)
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size.unwrap_or(DEFAULT_REPLAY_BATCH_SIZE)
    }

    pub fn apply_defaults(&mut self) {
        let memory = self.memory_spec.get_or_insert_with(MemorySpec::default);
        memory.apply_defaults(MemoryKind::PrioritizedReplay);
        memory.n_step_adjustment.get_or_insert(DEFAULT_N_STEP_ADJUSTMENT);
        self.clip_rewards.get_or_insert(DEFAULT_CLIP_REWARDS);
        self.min_sample_memory_size.get_or_insert(DEFAULT_MIN_SAMPLE_MEMORY_SIZE);
        self.batch_size.get_or_insert(DEFAULT_REPLAY_BATCH_SIZE);
    }
}
