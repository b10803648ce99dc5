use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::schedule::LearningRate;

/// Optimizers the learner can be configured with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Adam,
    #[serde(alias = "gradient_descent", alias = "sgd_optimizer")]
    Sgd,
    #[serde(alias = "rms_prop", alias = "rmsprop_optimizer")]
    Rmsprop,
    Adagrad,
    Adadelta,
    Nadam,
}

impl OptimizerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizerKind::Adam => "adam",
            OptimizerKind::Sgd => "sgd",
            OptimizerKind::Rmsprop => "rmsprop",
            OptimizerKind::Adagrad => "adagrad",
            OptimizerKind::Adadelta => "adadelta",
            OptimizerKind::Nadam => "nadam",
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `optimizer_spec`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizerSpec {
    #[serde(rename = "type")]
    pub kind: OptimizerKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learning_rate: Option<LearningRate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_grad_norm: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl OptimizerSpec {
    pub fn new(kind: OptimizerKind, learning_rate: impl Into<LearningRate>) -> Self {
        OptimizerSpec {
            kind,
            learning_rate: Some(learning_rate.into()),
            clip_grad_norm: None,
            extra: Map::new(),
        }
    }

    /// Learning rate at a given update step, if one is configured
    pub fn learning_rate_at(&self, step: u64) -> Option<f64> {
        self.learning_rate.as_ref().map(|lr| lr.at(step))
    }
}
