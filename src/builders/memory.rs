use crate::config::{MemoryKind, MemorySpec};
use crate::error::{ApexConfigError, Result};

/// Builder for MemorySpec
pub struct MemorySpecBuilder {
    kind: MemoryKind,
    capacity: Option<u64>,
    alpha: Option<f64>,
    beta: Option<f64>,
    n_step_adjustment: Option<u64>,
}

impl MemorySpecBuilder {
    /// Create a new memory builder for a plain replay memory
    pub fn new() -> Self {
        MemorySpecBuilder {
            kind: MemoryKind::Replay,
            capacity: None,
            alpha: None,
            beta: None,
            n_step_adjustment: None,
        }
    }

    /// Set the capacity
    pub fn capacity(mut self, capacity: u64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Use uniform sampling
    pub fn uniform(mut self) -> Self {
        self.kind = MemoryKind::Replay;
        self.alpha = None;
        self.beta = None;
        self
    }

    /// Use proportional prioritization
    pub fn prioritized(mut self, alpha: f64, beta: f64) -> Self {
        self.kind = MemoryKind::PrioritizedReplay;
        self.alpha = Some(alpha);
        self.beta = Some(beta);
        self
    }

    pub fn kind(mut self, kind: MemoryKind) -> Self {
        self.kind = kind;
        self
    }

    /// Number of steps folded into each stored return
    pub fn n_step(mut self, n: u64) -> Self {
        self.n_step_adjustment = Some(n);
        self
    }

    /// Build the memory spec
    pub fn build(self) -> Result<MemorySpec> {
        let capacity = self
            .capacity
            .ok_or_else(|| ApexConfigError::invalid_parameter("capacity", "Capacity not specified"))?;

        if capacity == 0 {
            return Err(ApexConfigError::invalid_parameter(
                "capacity",
                "Capacity must be greater than 0",
            ));
        }

        if let Some(alpha) = self.alpha {
            if alpha < 0.0 {
                return Err(ApexConfigError::invalid_parameter("alpha", "Alpha must be non-negative"));
            }
        }

        if let Some(beta) = self.beta {
            if !(0.0..=1.0).contains(&beta) {
                return Err(ApexConfigError::invalid_parameter("beta", "Beta must be within [0, 1]"));
            }
        }

        if self.n_step_adjustment == Some(0) {
            return Err(ApexConfigError::invalid_parameter(
                "n_step_adjustment",
                "N-step horizon must be at least 1",
            ));
        }

        let mut spec = MemorySpec::new(self.kind, capacity);
        if self.kind.is_prioritized() {
            spec.alpha = self.alpha;
            spec.beta = self.beta;
        }
        spec.n_step_adjustment = self.n_step_adjustment;
        Ok(spec)
    }
}

impl Default for MemorySpecBuilder {
    fn default() -> Self {
        Self::new()
    }
}
