//! # Agent Configuration Document
//!
//! Typed model of the JSON document that parameterizes an Ape-X agent: which agent variant,
//! which replay memory, the preprocessing and network stacks, the policy head, the
//! distributed execution topology, the exploration schedule, the update cadence and the
//! optimizer.
//!
//! Every record keeps the keys it does not recognize and never emits fields the document
//! did not contain. Explicit `null` members are remembered and written back, so loading and
//! re-emitting a document reproduces it.
//! Effective values for absent fields come from the accessor methods, or can be written
//! into the document with [`AgentConfig::apply_defaults`].
//!
//! ```rust,no_run
//! use apex_config::config::AgentConfig;
//!
//! let config = AgentConfig::from_path("configs/apex_agent.json").unwrap();
//! assert_eq!(config.batch_size(), 64);
//! assert_eq!(config.epsilon_at(0), Some(1.0));
//! ```

pub mod execution;
pub mod exploration;
pub mod layers;
pub mod memory;
pub mod optimizer;
pub mod policy;
pub mod saver;
pub mod update;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::json::{null_paths, restore_nulls, retain_dropped_nulls, set_path};
use crate::schedule::DecaySpec;

pub use execution::{
    ApexReplaySpec, DeviceStrategy, ExecutionMode, ExecutionSpec, ExecutorSpec, RaySpec, WorkerSpec,
};
pub use exploration::{EpsilonSpec, ExplorationSpec};
pub use layers::{Activation, LayerKind, LayerSpec};
pub use memory::{MemoryKind, MemorySpec};
pub use optimizer::{OptimizerKind, OptimizerSpec};
pub use policy::{ActionAdapterSpec, AdapterSpec, PolicyKind, PolicySpec};
pub use saver::{SaverSpec, SummarySpec};
pub use update::{ObserveSpec, UpdateSpec};

pub const DEFAULT_DISCOUNT: f64 = 0.99;

/// Agent variants a document can select through its `type` field
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Distributed prioritized experience replay
    #[serde(alias = "apex_agent")]
    Apex,
    /// Single-process deep Q-network
    #[serde(alias = "dqn_agent")]
    Dqn,
}

impl AgentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Apex => "apex",
            AgentKind::Dqn => "dqn",
        }
    }

    /// Memory kind used when a document leaves `memory_spec.type` out
    pub fn default_memory(&self) -> MemoryKind {
        match self {
            AgentKind::Apex => MemoryKind::PrioritizedReplay,
            AgentKind::Dqn => MemoryKind::Replay,
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The complete agent configuration document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(rename = "type")]
    pub agent_type: AgentKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_spec: Option<MemorySpec>,

    /// Input transforms, applied in order before the network
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessing_spec: Option<Vec<LayerSpec>>,

    /// Layers, in order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_spec: Option<Vec<LayerSpec>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy_spec: Option<PolicySpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_spec: Option<ExecutionSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exploration_spec: Option<ExplorationSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observe_spec: Option<ObserveSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_spec: Option<UpdateSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimizer_spec: Option<OptimizerSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saver_spec: Option<SaverSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_spec: Option<SummarySpec>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,

    /// Members the source document set to an explicit `null`
    #[serde(skip)]
    explicit_nulls: Vec<Vec<String>>,
}

impl AgentConfig {
    /// An otherwise empty document of the given variant
    pub fn new(agent_type: AgentKind) -> Self {
        AgentConfig {
            agent_type,
            discount: None,
            memory_spec: None,
            preprocessing_spec: None,
            network_spec: None,
            policy_spec: None,
            execution_spec: None,
            exploration_spec: None,
            observe_spec: None,
            update_spec: None,
            optimizer_spec: None,
            saver_spec: None,
            summary_spec: None,
            extra: Map::new(),
            explicit_nulls: Vec::new(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let mut explicit_nulls = null_paths(&value);
        let mut config: AgentConfig = serde_json::from_value(value)?;
        // Only the nulls the typed model drops need remembering
        if !explicit_nulls.is_empty() {
            retain_dropped_nulls(&serde_json::to_value(&config)?, &mut explicit_nulls);
        }
        config.explicit_nulls = explicit_nulls;
        Ok(config)
    }

    /// Read and parse a document from disk
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        debug!(path = %path.display(), agent = %config.agent_type, "loaded agent config");
        Ok(config)
    }

    /// The JSON form, with the source document's `null` members written back
    pub fn to_value(&self) -> Result<Value> {
        let mut value = serde_json::to_value(self)?;
        restore_nulls(&mut value, &self.explicit_nulls);
        Ok(value)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.to_value()?)?)
    }

    /// Write the document to disk as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut contents = self.to_json_pretty()?;
        contents.push('\n');
        fs::write(path, contents)?;
        debug!(path = %path.display(), "saved agent config");
        Ok(())
    }

    /// Apply dotted-path overrides to the JSON form and parse the result
    pub fn with_overrides<K: AsRef<str>>(&self, overrides: &[(K, Value)]) -> Result<Self> {
        let mut value = self.to_value()?;
        for (path, new_value) in overrides {
            let path: &str = path.as_ref();
            set_path(&mut value, path, new_value.clone())?;
            debug!(path, value = %new_value, "applied override");
        }
        Self::from_value(value)
    }

    pub fn with_defaults(mut self) -> Self {
        self.apply_defaults();
        self
    }

    /// Write the effective value of every absent field into the document.
    ///
    /// Values already present are left alone. Preprocessing, network, policy and optimizer
    /// records have no defaults and stay absent when absent.
    pub fn apply_defaults(&mut self) {
        self.discount.get_or_insert(DEFAULT_DISCOUNT);

        let memory_kind = self.agent_type.default_memory();
        self.memory_spec
            .get_or_insert_with(MemorySpec::default)
            .apply_defaults(memory_kind);

        self.execution_spec
            .get_or_insert_with(ExecutionSpec::default)
            .apply_defaults();

        if let Some(decay) = self
            .exploration_spec
            .as_mut()
            .and_then(ExplorationSpec::decay_spec_mut)
        {
            decay.apply_defaults();
        }

        self.observe_spec
            .get_or_insert_with(ObserveSpec::default)
            .apply_defaults();
        self.update_spec
            .get_or_insert_with(UpdateSpec::default)
            .apply_defaults();
        self.saver_spec
            .get_or_insert_with(SaverSpec::default)
            .apply_defaults();
        self.summary_spec
            .get_or_insert_with(SummarySpec::default)
            .apply_defaults();

        if !self.explicit_nulls.is_empty() {
            if let Ok(value) = serde_json::to_value(&*self) {
                retain_dropped_nulls(&value, &mut self.explicit_nulls);
            }
        }
    }

    pub fn discount(&self) -> f64 {
        self.discount.unwrap_or(DEFAULT_DISCOUNT)
    }

    /// Effective memory kind
    pub fn memory_kind(&self) -> MemoryKind {
        let fallback = self.agent_type.default_memory();
        self.memory_spec
            .as_ref()
            .map(|memory| memory.kind_or(fallback))
            .unwrap_or(fallback)
    }

    pub fn memory_capacity(&self) -> u64 {
        self.memory_spec
            .as_ref()
            .map(MemorySpec::capacity)
            .unwrap_or(memory::DEFAULT_CAPACITY)
    }

    /// Learner batch size from `update_spec`
    pub fn batch_size(&self) -> u64 {
        self.update_spec
            .as_ref()
            .map(UpdateSpec::batch_size)
            .unwrap_or(update::DEFAULT_BATCH_SIZE)
    }

    pub fn preprocessors(&self) -> &[LayerSpec] {
        self.preprocessing_spec.as_deref().unwrap_or(&[])
    }

    pub fn layers(&self) -> &[LayerSpec] {
        self.network_spec.as_deref().unwrap_or(&[])
    }

    pub fn epsilon_decay(&self) -> Option<&DecaySpec> {
        self.exploration_spec.as_ref()?.decay_spec()
    }

    /// Exploration epsilon at a time step, when the document schedules one
    pub fn epsilon_at(&self, timestep: u64) -> Option<f64> {
        self.epsilon_decay().map(|decay| decay.value(timestep))
    }

    /// Action components with their own adapter, sorted by name
    pub fn action_components(&self) -> Vec<&str> {
        self.policy_spec
            .as_ref()
            .map(PolicySpec::action_components)
            .unwrap_or_default()
    }

    pub fn ray_spec(&self) -> Option<&RaySpec> {
        self.execution_spec.as_ref()?.ray_spec.as_ref()
    }

    pub fn worker_spec(&self) -> Option<&WorkerSpec> {
        self.ray_spec()?.worker_spec.as_ref()
    }

    pub fn apex_replay_spec(&self) -> Option<&ApexReplaySpec> {
        self.ray_spec()?.apex_replay_spec.as_ref()
    }
}
