use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use super::layers::LayerSpec;

/// Shape of the policy head placed on top of the network
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PolicyKind {
    /// Plain action-value head
    #[default]
    #[serde(rename = "policy")]
    Policy,

    /// Separate state-value and advantage streams
    #[serde(rename = "dueling-policy", alias = "dueling_policy")]
    Dueling,

    /// Action adapters sharing one value-function head
    #[serde(
        rename = "shared-value-function-policy",
        alias = "shared_value_function_policy"
    )]
    SharedValueFunction,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Policy => "policy",
            PolicyKind::Dueling => "dueling-policy",
            PolicyKind::SharedValueFunction => "shared-value-function-policy",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keys that mark an `action_adapter_spec` object as a single adapter
const ADAPTER_FIELDS: &[&str] = &[
    "pre_network_spec",
    "add_units",
    "activation",
    "units_state_value_stream",
    "units_advantage_stream",
    "scope",
];

/// Sub-network override for one action adapter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct AdapterSpec {
    /// Layers inserted between the shared network output and the action layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_network_spec: Option<Vec<LayerSpec>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_units: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation: Option<String>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub units_state_value_stream: Option<u64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub units_advantage_stream: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AdapterSpec {
    pub fn with_pre_network(layers: Vec<LayerSpec>) -> Self {
        AdapterSpec {
            pre_network_spec: Some(layers),
            ..Default::default()
        }
    }

    pub fn pre_network(&self) -> &[LayerSpec] {
        self.pre_network_spec.as_deref().unwrap_or(&[])
    }
}

/// `action_adapter_spec`: one adapter for a flat action space, or one per component of a
/// container action space keyed by component name.
///
/// An object is a single adapter when it carries any adapter field or any non-object
/// member. Otherwise every member is a component's adapter.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ActionAdapterSpec {
    Single(AdapterSpec),
    PerComponent(BTreeMap<String, AdapterSpec>),
}

impl<'de> Deserialize<'de> for ActionAdapterSpec {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        let single = map.is_empty()
            || map
                .iter()
                .any(|(key, value)| ADAPTER_FIELDS.contains(&key.as_str()) || !value.is_object());
        let value = Value::Object(map);
        if single {
            AdapterSpec::deserialize(value)
                .map(ActionAdapterSpec::Single)
                .map_err(de::Error::custom)
        } else {
            BTreeMap::<String, AdapterSpec>::deserialize(value)
                .map(ActionAdapterSpec::PerComponent)
                .map_err(de::Error::custom)
        }
    }
}

impl ActionAdapterSpec {
    /// Component names, sorted; empty for a single adapter
    pub fn components(&self) -> Vec<&str> {
        match self {
            ActionAdapterSpec::Single(_) => Vec::new(),
            ActionAdapterSpec::PerComponent(map) => map.keys().map(String::as_str).collect(),
        }
    }

    /// The adapter that applies to `component`
    pub fn adapter_for(&self, component: &str) -> Option<&AdapterSpec> {
        match self {
            ActionAdapterSpec::Single(adapter) => Some(adapter),
            ActionAdapterSpec::PerComponent(map) => map.get(component),
        }
    }

    /// Every adapter with its component name (`None` for a single adapter)
    pub fn adapters(&self) -> Vec<(Option<&str>, &AdapterSpec)> {
        match self {
            ActionAdapterSpec::Single(adapter) => vec![(None, adapter)],
            ActionAdapterSpec::PerComponent(map) => map
                .iter()
                .map(|(name, adapter)| (Some(name.as_str()), adapter))
                .collect(),
        }
    }
}

/// `policy_spec`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct PolicySpec {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PolicyKind>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub units_state_value_stream: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_adapter_spec: Option<ActionAdapterSpec>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PolicySpec {
    pub fn dueling(units_state_value_stream: u64) -> Self {
        PolicySpec {
            kind: Some(PolicyKind::Dueling),
            units_state_value_stream: Some(units_state_value_stream),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> PolicyKind {
        self.kind.unwrap_or_default()
    }

    pub fn is_dueling(&self) -> bool {
        self.kind() == PolicyKind::Dueling
    }

    /// Add or replace the adapter for one action component
    pub fn with_component_adapter(mut self, component: impl Into<String>, adapter: AdapterSpec) -> Self {
        let mut map = match self.action_adapter_spec.take() {
            Some(ActionAdapterSpec::PerComponent(map)) => map,
            _ => BTreeMap::new(),
        };
        map.insert(component.into(), adapter);
        self.action_adapter_spec = Some(ActionAdapterSpec::PerComponent(map));
        self
    }

    pub fn action_components(&self) -> Vec<&str> {
        self.action_adapter_spec
            .as_ref()
            .map(ActionAdapterSpec::components)
            .unwrap_or_default()
    }
}
