use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const DEFAULT_CAPACITY: u64 = 1000;
pub const DEFAULT_ALPHA: f64 = 1.0;
pub const DEFAULT_BETA: f64 = 0.0;
pub const DEFAULT_N_STEP_ADJUSTMENT: u64 = 1;

/// Replay memory implementations an agent can be pointed at
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// Uniform sampling
    #[default]
    Replay,
    /// Proportional prioritization over a segment tree
    PrioritizedReplay,
    /// Proportional prioritization held outside the computation graph
    MemPrioritizedReplay,
    /// Fixed-size ring buffer, uniform sampling
    RingBuffer,
    /// First-in first-out queue
    FifoQueue,
}

impl MemoryKind {
    pub fn is_prioritized(&self) -> bool {
        matches!(self, MemoryKind::PrioritizedReplay | MemoryKind::MemPrioritizedReplay)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MemoryKind::Replay => "replay",
            MemoryKind::PrioritizedReplay => "prioritized_replay",
            MemoryKind::MemPrioritizedReplay => "mem_prioritized_replay",
            MemoryKind::RingBuffer => "ring_buffer",
            MemoryKind::FifoQueue => "fifo_queue",
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `memory_spec`: which replay memory to build and how large
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct MemorySpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MemoryKind>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u64>,

    /// Prioritization exponent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,

    /// Importance-sampling exponent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub n_step_adjustment: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MemorySpec {
    pub fn new(kind: MemoryKind, capacity: u64) -> Self {
        MemorySpec {
            kind: Some(kind),
            capacity: Some(capacity),
            ..Default::default()
        }
    }

    pub fn prioritized(capacity: u64, alpha: f64, beta: f64) -> Self {
        MemorySpec {
            alpha: Some(alpha),
            beta: Some(beta),
            ..MemorySpec::new(MemoryKind::PrioritizedReplay, capacity)
        }
    }

    /// Declared kind, or `fallback` when the record leaves it out
    pub fn kind_or(&self, fallback: MemoryKind) -> MemoryKind {
        self.kind.unwrap_or(fallback)
    }

    pub fn capacity(&self) -> u64 {
        self.capacity.unwrap_or(DEFAULT_CAPACITY)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha.unwrap_or(DEFAULT_ALPHA)
    }

    pub fn beta(&self) -> f64 {
        self.beta.unwrap_or(DEFAULT_BETA)
    }

    pub fn n_step_adjustment(&self) -> u64 {
        self.n_step_adjustment.unwrap_or(DEFAULT_N_STEP_ADJUSTMENT)
    }

    /// Fill absent fields; prioritization exponents only for prioritized kinds
    pub fn apply_defaults(&mut self, fallback: MemoryKind) {
        let kind = *self.kind.get_or_insert(fallback);
        self.capacity.get_or_insert(DEFAULT_CAPACITY);
        if kind.is_prioritized() {
            self.alpha.get_or_insert(DEFAULT_ALPHA);
            self.beta.get_or_insert(DEFAULT_BETA);
        }
    }
}
