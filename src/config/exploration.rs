use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schedule::DecaySpec;

/// `exploration_spec`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct ExplorationSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epsilon_spec: Option<EpsilonSpec>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `exploration_spec.epsilon_spec`: epsilon-greedy action selection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct EpsilonSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decay_spec: Option<DecaySpec>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExplorationSpec {
    pub fn epsilon_decay(decay_spec: DecaySpec) -> Self {
        ExplorationSpec {
            epsilon_spec: Some(EpsilonSpec {
                decay_spec: Some(decay_spec),
                extra: Map::new(),
            }),
            extra: Map::new(),
        }
    }

    pub fn decay_spec(&self) -> Option<&DecaySpec> {
        self.epsilon_spec.as_ref()?.decay_spec.as_ref()
    }

    pub fn decay_spec_mut(&mut self) -> Option<&mut DecaySpec> {
        self.epsilon_spec.as_mut()?.decay_spec.as_mut()
    }

    /// Epsilon at a time step; exploration without a schedule is not decayed
    pub fn epsilon_at(&self, timestep: u64) -> Option<f64> {
        self.decay_spec().map(|decay| decay.value(timestep))
    }
}
