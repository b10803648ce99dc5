use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{ApexConfigError, Result};
use crate::json::as_whole_u64;

/// An enumeration of the activation names a layer descriptor may carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    Relu,
    Linear,
    Sigmoid,
    Tanh,
    #[serde(rename = "lrelu", alias = "leaky_relu")]
    LeakyRelu,
    Elu,
    Selu,
    Softmax,
}

impl Activation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Activation::Relu => "relu",
            Activation::Linear => "linear",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::LeakyRelu => "lrelu",
            Activation::Elu => "elu",
            Activation::Selu => "selu",
            Activation::Softmax => "softmax",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Activation {
    type Err = ApexConfigError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "relu" => Ok(Activation::Relu),
            "linear" | "none" => Ok(Activation::Linear),
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "lrelu" | "leaky_relu" | "leaky-relu" => Ok(Activation::LeakyRelu),
            "elu" => Ok(Activation::Elu),
            "selu" => Ok(Activation::Selu),
            "softmax" => Ok(Activation::Softmax),
            other => Err(ApexConfigError::invalid_parameter(
                "activation",
                format!("unknown activation '{}'", other),
            )),
        }
    }
}

/// The kind of a layer or preprocessor descriptor, resolved from its `type` string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayerKind {
    Dense,
    Conv2d,
    Lstm,
    Concat,
    Reshape,
    Grayscale,
    ImageResize,
    ImageCrop,
    ImageBinary,
    Divide,
    Multiply,
    Clip,
    Normalize,
    Sequence,
    ConvertType,
    /// A kind this crate does not know; passed through untouched
    Custom(String),
}

impl LayerKind {
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().replace('-', "_").as_str() {
            "dense" | "dense_layer" => LayerKind::Dense,
            "conv2d" | "conv2d_layer" => LayerKind::Conv2d,
            "lstm" | "lstm_layer" => LayerKind::Lstm,
            "concat" | "concat_layer" => LayerKind::Concat,
            "reshape" => LayerKind::Reshape,
            "grayscale" => LayerKind::Grayscale,
            "image_resize" => LayerKind::ImageResize,
            "image_crop" => LayerKind::ImageCrop,
            "image_binary" => LayerKind::ImageBinary,
            "divide" => LayerKind::Divide,
            "multiply" => LayerKind::Multiply,
            "clip" => LayerKind::Clip,
            "normalize" => LayerKind::Normalize,
            "sequence" => LayerKind::Sequence,
            "convert_type" => LayerKind::ConvertType,
            _ => LayerKind::Custom(name.to_string()),
        }
    }

    /// Whether the kind may appear in a `network_spec`
    pub fn is_network_layer(&self) -> bool {
        matches!(
            self,
            LayerKind::Dense | LayerKind::Conv2d | LayerKind::Lstm | LayerKind::Concat | LayerKind::Reshape
        )
    }

    /// Whether the kind may appear in a `preprocessing_spec`
    pub fn is_preprocessor(&self) -> bool {
        matches!(
            self,
            LayerKind::Reshape
                | LayerKind::Grayscale
                | LayerKind::ImageResize
                | LayerKind::ImageCrop
                | LayerKind::ImageBinary
                | LayerKind::Divide
                | LayerKind::Multiply
                | LayerKind::Clip
                | LayerKind::Normalize
                | LayerKind::Sequence
                | LayerKind::ConvertType
        )
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, LayerKind::Custom(_))
    }
}

/// One entry of an ordered layer or preprocessor list.
///
/// Only `type` and `scope` are structural; every other key is a layer parameter and is kept
/// verbatim so the descriptor re-emits exactly as it was read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl LayerSpec {
    /// Create a descriptor of the given type with no parameters
    pub fn new(kind: impl Into<String>) -> Self {
        LayerSpec {
            kind: kind.into(),
            scope: None,
            params: Map::new(),
        }
    }

    /// Fully connected layer
    pub fn dense(units: u64, activation: Activation) -> Self {
        LayerSpec::new("dense")
            .with_param("units", units)
            .with_param("activation", activation.as_str())
    }

    /// 2D convolution layer
    pub fn conv2d(filters: u64, kernel_size: u64, strides: u64, activation: Activation) -> Self {
        LayerSpec::new("conv2d")
            .with_param("filters", filters)
            .with_param("kernel_size", kernel_size)
            .with_param("strides", strides)
            .with_param("activation", activation.as_str())
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set a parameter. A string `scope` sets the structural scope instead.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        match (key.as_str(), value) {
            ("scope", Value::String(scope)) => self.scope = Some(scope),
            (_, value) => {
                self.params.insert(key, value);
            }
        }
        self
    }

    pub fn layer_kind(&self) -> LayerKind {
        LayerKind::from_name(&self.kind)
    }

    pub fn param(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.param(key).and_then(as_whole_u64)
    }

    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.param(key).and_then(Value::as_f64)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(Value::as_str)
    }

    pub fn param_bool(&self, key: &str) -> Option<bool> {
        self.param(key).and_then(Value::as_bool)
    }

    pub fn units(&self) -> Option<u64> {
        self.param_u64("units")
    }

    /// Parsed activation, if the descriptor names one
    pub fn activation(&self) -> Result<Option<Activation>> {
        match self.param("activation") {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(name)) => name.parse().map(Some),
            Some(other) => Err(ApexConfigError::invalid_parameter(
                "activation",
                format!("expected a string, got {}", other),
            )),
        }
    }

    /// `scope` when set, otherwise the `type` string
    pub fn display_name(&self) -> &str {
        self.scope.as_deref().unwrap_or(&self.kind)
    }
}
