use crate::config::{
    AgentConfig, AgentKind, ExecutionSpec, ExplorationSpec, LayerSpec, MemorySpec, ObserveSpec,
    OptimizerSpec, PolicySpec, RaySpec, SaverSpec, SummarySpec, UpdateSpec,
};
use crate::error::{ApexConfigError, Result};
use crate::schedule::DecaySpec;

/// Builder for constructing agent documents with a fluent API
pub struct AgentConfigBuilder {
    config: AgentConfig,
}

impl AgentConfigBuilder {
    /// Create a new builder for the given agent variant
    pub fn new(agent_type: AgentKind) -> Self {
        AgentConfigBuilder {
            config: AgentConfig::new(agent_type),
        }
    }

    /// Create a new builder for an Ape-X agent
    pub fn apex() -> Self {
        Self::new(AgentKind::Apex)
    }

    pub fn discount(mut self, discount: f64) -> Self {
        self.config.discount = Some(discount);
        self
    }

    pub fn memory(mut self, memory: MemorySpec) -> Self {
        self.config.memory_spec = Some(memory);
        self
    }

    /// Append a preprocessor
    pub fn preprocessor(mut self, layer: LayerSpec) -> Self {
        self.config
            .preprocessing_spec
            .get_or_insert_with(Vec::new)
            .push(layer);
        self
    }

    /// Append a network layer
    pub fn layer(mut self, layer: LayerSpec) -> Self {
        self.config.network_spec.get_or_insert_with(Vec::new).push(layer);
        self
    }

    /// Append a sequence of layers
    pub fn layers<I: IntoIterator<Item = LayerSpec>>(mut self, layers: I) -> Self {
        self.config.network_spec.get_or_insert_with(Vec::new).extend(layers);
        self
    }

    pub fn policy(mut self, policy: PolicySpec) -> Self {
        self.config.policy_spec = Some(policy);
        self
    }

    pub fn execution(mut self, execution: ExecutionSpec) -> Self {
        self.config.execution_spec = Some(execution);
        self
    }

    /// Set the ray topology, keeping any other execution settings
    pub fn ray(mut self, ray: RaySpec) -> Self {
        self.config
            .execution_spec
            .get_or_insert_with(ExecutionSpec::default)
            .ray_spec = Some(ray);
        self
    }

    /// Decay epsilon with the given schedule
    pub fn epsilon_decay(mut self, decay: DecaySpec) -> Self {
        self.config.exploration_spec = Some(ExplorationSpec::epsilon_decay(decay));
        self
    }

    pub fn observe(mut self, observe: ObserveSpec) -> Self {
        self.config.observe_spec = Some(observe);
        self
    }

    pub fn update(mut self, update: UpdateSpec) -> Self {
        self.config.update_spec = Some(update);
        self
    }

    pub fn optimizer(mut self, optimizer: OptimizerSpec) -> Self {
        self.config.optimizer_spec = Some(optimizer);
        self
    }

    pub fn saver(mut self, saver: SaverSpec) -> Self {
        self.config.saver_spec = Some(saver);
        self
    }

    pub fn summary(mut self, summary: SummarySpec) -> Self {
        self.config.summary_spec = Some(summary);
        self
    }

    /// Build the document, rejecting it if validation reports an error
    pub fn build(self) -> Result<AgentConfig> {
        if self.config.network_spec.is_none() {
            return Err(ApexConfigError::MissingField("network_spec".to_string()));
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Build without validating
    pub fn build_unchecked(self) -> AgentConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Activation, OptimizerKind};

    fn dense_network() -> Vec<LayerSpec> {
        vec![
            LayerSpec::dense(64, Activation::Relu),
            LayerSpec::dense(64, Activation::Relu),
        ]
    }

    #[test]
    fn test_agent_builder() {
        let config = AgentConfigBuilder::apex()
            .discount(0.99)
            .memory(MemorySpec::prioritized(10000, 0.6, 0.4))
            .layers(dense_network())
            .policy(PolicySpec::dueling(128))
            .epsilon_decay(DecaySpec::linear(1.0, 0.1, 0, 1000))
            .update(UpdateSpec::new(4, 64, 32))
            .optimizer(OptimizerSpec::new(OptimizerKind::Adam, 0.0005))
            .build()
            .unwrap();

        assert_eq!(config.layers().len(), 2);
        assert_eq!(config.batch_size(), 64);
        assert_eq!(config.epsilon_decay().map(DecaySpec::num_timesteps), Some(1000));
    }

    #[test]
    fn test_builder_errors() {
        // No network
        let result = AgentConfigBuilder::apex().build();
        assert!(matches!(result, Err(ApexConfigError::MissingField(_))));

        // Sync interval not a multiple of the update interval
        let result = AgentConfigBuilder::apex()
            .layers(dense_network())
            .update(UpdateSpec::new(4, 64, 30))
            .build();
        assert!(matches!(result, Err(ApexConfigError::Validation { .. })));

        // Memory smaller than a batch
        let result = AgentConfigBuilder::apex()
            .memory(MemorySpec::prioritized(32, 0.6, 0.4))
            .layers(dense_network())
            .update(UpdateSpec::new(4, 64, 32))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_ray_keeps_execution_settings() {
        let config = AgentConfigBuilder::apex()
            .execution(ExecutionSpec {
                seed: Some(7),
                ..Default::default()
            })
            .ray(RaySpec::default())
            .layers(dense_network())
            .build_unchecked();

        let execution = config.execution_spec.as_ref().unwrap();
        assert_eq!(execution.seed, Some(7));
        assert!(config.ray_spec().is_some());
    }
}
