use serde_json::{json, Value};

use super::{apex_agent, APEX_AGENT_JSON};
use crate::config::{
    AgentConfig, AgentKind, DeviceStrategy, ExecutionMode, LayerKind, MemoryKind, OptimizerKind,
    PolicyKind,
};
use crate::json::{equivalent, get_path};
use crate::schedule::{DecayKind, LearningRate};

#[test]
fn test_apex_agent_fields() {
    let config = apex_agent();

    assert_eq!(config.agent_type, AgentKind::Apex);
    assert_eq!(config.discount(), 0.99);
    assert_eq!(config.memory_kind(), MemoryKind::PrioritizedReplay);
    assert_eq!(config.memory_capacity(), 10000);
    assert_eq!(config.batch_size(), 64);

    let decay = config.epsilon_decay().unwrap();
    assert_eq!(decay.kind(), DecayKind::LinearDecay);
    assert_eq!(decay.num_timesteps(), 1000);
    assert_eq!(decay.start_value(), 1.0);
    assert_eq!(decay.end_value(), 0.1);

    let optimizer = config.optimizer_spec.as_ref().unwrap();
    assert_eq!(optimizer.kind, OptimizerKind::Adam);
    assert_eq!(optimizer.learning_rate, Some(LearningRate::Constant(0.0005)));

    let policy = config.policy_spec.as_ref().unwrap();
    assert_eq!(policy.kind(), PolicyKind::Dueling);
    assert_eq!(policy.units_state_value_stream, Some(128));
}

#[test]
fn test_layer_order_is_preserved() {
    let config = apex_agent();

    let preprocessors: Vec<&str> = config.preprocessors().iter().map(|p| p.kind.as_str()).collect();
    assert_eq!(preprocessors, vec!["image_resize", "grayscale", "divide", "sequence"]);

    let kinds: Vec<LayerKind> = config.layers().iter().map(|l| l.layer_kind()).collect();
    assert_eq!(
        kinds,
        vec![LayerKind::Conv2d, LayerKind::Conv2d, LayerKind::Reshape, LayerKind::Dense]
    );
    assert_eq!(config.layers()[0].param_u64("filters"), Some(16));
    assert_eq!(config.layers()[1].param_u64("filters"), Some(32));
    assert_eq!(config.layers()[3].units(), Some(256));
}

#[test]
fn test_action_components() {
    let config = apex_agent();
    assert_eq!(config.action_components(), vec!["forward", "jump", "turn"]);

    let adapters = config
        .policy_spec
        .as_ref()
        .and_then(|policy| policy.action_adapter_spec.as_ref())
        .unwrap();
    assert_eq!(adapters.adapter_for("jump").unwrap().pre_network()[0].units(), Some(32));
    assert!(adapters.adapter_for("crouch").is_none());
}

#[test]
fn test_ray_topology() {
    let config = apex_agent();

    let executor = config.ray_spec().and_then(|ray| ray.executor_spec.as_ref()).unwrap();
    assert_eq!(executor.num_sample_workers(), 2);
    assert_eq!(executor.weight_sync_steps(), 400);
    assert_eq!(executor.redis_address, None);
    assert_eq!(executor.num_cpus, Some(4));

    let worker = config.worker_spec().unwrap();
    assert_eq!(worker.n_step_adjustment(), 3);
    assert!(worker.sample_exploration());
    assert_eq!(worker.exploration_min_value(), 0.5);

    let replay = config.apex_replay_spec().unwrap();
    assert_eq!(replay.memory_kind(), MemoryKind::PrioritizedReplay);
    assert_eq!(replay.n_step_adjustment(), 3);
    assert_eq!(replay.min_sample_memory_size(), 500);
}

#[test]
fn test_round_trip_reproduces_document() {
    let original: Value = serde_json::from_str(APEX_AGENT_JSON).unwrap();
    let config = AgentConfig::from_value(original.clone()).unwrap();
    let emitted = config.to_value().unwrap();

    assert_eq!(emitted, original);
    assert_eq!(
        get_path(&emitted, "execution_spec.ray_spec.executor_spec.redis_address"),
        Some(&Value::Null)
    );

    let reparsed = AgentConfig::from_json_str(&config.to_json_pretty().unwrap()).unwrap();
    assert_eq!(reparsed, config);
    assert_eq!(reparsed.batch_size(), 64);
    assert_eq!(reparsed.epsilon_decay().unwrap().num_timesteps(), 1000);
}

#[test]
fn test_round_trip_adds_nothing() {
    let config = apex_agent();
    let emitted = config.to_value().unwrap();

    // Absent sections stay absent
    assert!(emitted.get("saver_spec").is_none());
    assert!(emitted.get("summary_spec").is_none());
    assert!(get_path(&emitted, "update_spec.update_steps").is_none());
    assert!(get_path(&emitted, "memory_spec.alpha").is_none());
}

#[test]
fn test_unknown_keys_survive() {
    let mut value: Value = serde_json::from_str(APEX_AGENT_JSON).unwrap();
    value["experiment_name"] = json!("pong-apex");
    value["update_spec"]["target_update_tau"] = json!(0.005);
    value["network_spec"][3]["weights_spec"] = json!({"type": "xavier"});

    let config = AgentConfig::from_value(value.clone()).unwrap();
    assert_eq!(config.extra.get("experiment_name"), Some(&json!("pong-apex")));

    let emitted = config.to_value().unwrap();
    assert!(equivalent(&value, &emitted));
    assert_eq!(
        get_path(&emitted, "network_spec.3.weights_spec.type"),
        Some(&json!("xavier"))
    );
}

#[test]
fn test_explicit_nulls_survive_overrides() {
    let config = apex_agent();
    let updated = config
        .with_overrides(&[("update_spec.batch_size", json!(32))])
        .unwrap();
    let emitted = updated.to_value().unwrap();
    assert_eq!(
        get_path(&emitted, "execution_spec.ray_spec.executor_spec.redis_address"),
        Some(&Value::Null)
    );

    let addressed = config
        .with_overrides(&[(
            "execution_spec.ray_spec.executor_spec.redis_address",
            json!("10.0.0.1:6379"),
        )])
        .unwrap();
    let executor = addressed.ray_spec().and_then(|ray| ray.executor_spec.as_ref()).unwrap();
    assert_eq!(executor.redis_address.as_deref(), Some("10.0.0.1:6379"));
    assert_eq!(
        get_path(&addressed.to_value().unwrap(), "execution_spec.ray_spec.executor_spec.redis_address"),
        Some(&json!("10.0.0.1:6379"))
    );
}

#[test]
fn test_null_typed_field_is_kept() {
    let value = json!({"type": "apex", "discount": null, "summary_spec": null});
    let config = AgentConfig::from_value(value.clone()).unwrap();
    assert_eq!(config.discount, None);
    assert_eq!(config.discount(), 0.99);
    assert_eq!(config.to_value().unwrap(), value);

    // A null filled by defaults is emitted as its value
    let resolved = config.with_defaults();
    let emitted = resolved.to_value().unwrap();
    assert_eq!(emitted["discount"], json!(0.99));
    assert!(emitted["summary_spec"].is_object());
    assert_eq!(AgentConfig::from_value(emitted).unwrap(), resolved);
}

#[test]
fn test_unknown_adapter_keys_survive() {
    let mut value: Value = serde_json::from_str(APEX_AGENT_JSON).unwrap();
    value["policy_spec"]["action_adapter_spec"]["turn"]["weights_spec"] = json!({"type": "xavier"});

    let config = AgentConfig::from_value(value.clone()).unwrap();
    assert_eq!(config.action_components(), vec!["forward", "jump", "turn"]);
    let turn = config
        .policy_spec
        .as_ref()
        .and_then(|policy| policy.action_adapter_spec.as_ref())
        .and_then(|adapters| adapters.adapter_for("turn"))
        .unwrap();
    assert_eq!(turn.extra.get("weights_spec"), Some(&json!({"type": "xavier"})));
    assert_eq!(turn.pre_network()[0].units(), Some(64));

    assert_eq!(config.to_value().unwrap(), value);
}

#[test]
fn test_whole_float_counts_load() {
    let mut value: Value = serde_json::from_str(APEX_AGENT_JSON).unwrap();
    value["memory_spec"]["capacity"] = json!(10000.0);
    value["update_spec"]["batch_size"] = json!(64.0);
    value["exploration_spec"]["epsilon_spec"]["decay_spec"]["num_timesteps"] = json!(1000.0);

    let config = AgentConfig::from_value(value.clone()).unwrap();
    assert_eq!(config.memory_capacity(), 10000);
    assert_eq!(config.batch_size(), 64);
    assert_eq!(config.epsilon_decay().unwrap().num_timesteps(), 1000);
    assert!(config.validate().is_ok());
    assert!(equivalent(&value, &config.to_value().unwrap()));

    value["memory_spec"]["capacity"] = json!(10000.5);
    assert!(AgentConfig::from_value(value.clone()).is_err());
    value["memory_spec"]["capacity"] = json!(-1);
    assert!(AgentConfig::from_value(value).is_err());
}

#[test]
fn test_missing_type_is_rejected() {
    let result = AgentConfig::from_value(json!({"discount": 0.9}));
    assert!(result.is_err());

    let result = AgentConfig::from_value(json!({"type": "a3c"}));
    assert!(result.is_err());
}

#[test]
fn test_with_overrides() {
    let config = apex_agent();
    let updated = config
        .with_overrides(&[
            ("update_spec.batch_size", json!(32)),
            ("optimizer_spec.type", json!("rmsprop")),
            ("network_spec.3.units", json!(512)),
        ])
        .unwrap();

    assert_eq!(updated.batch_size(), 32);
    assert_eq!(updated.optimizer_spec.as_ref().unwrap().kind, OptimizerKind::Rmsprop);
    assert_eq!(updated.layers()[3].units(), Some(512));
    // The source document is untouched
    assert_eq!(config.batch_size(), 64);

    assert!(config.with_overrides(&[("discount.value", json!(1))]).is_err());
}

#[test]
fn test_apply_defaults() {
    let mut config = AgentConfig::from_value(json!({
        "type": "apex",
        "network_spec": [{"type": "dense", "units": 16}],
        "execution_spec": {"ray_spec": {}},
        "update_spec": {"batch_size": 32}
    }))
    .unwrap();
    config.apply_defaults();

    assert_eq!(config.discount, Some(0.99));
    let memory = config.memory_spec.as_ref().unwrap();
    assert_eq!(memory.kind, Some(MemoryKind::PrioritizedReplay));
    assert_eq!(memory.alpha, Some(1.0));

    let update = config.update_spec.as_ref().unwrap();
    assert_eq!(update.batch_size, Some(32));
    assert_eq!(update.sync_interval, Some(128));

    let execution = config.execution_spec.as_ref().unwrap();
    assert_eq!(execution.mode(), ExecutionMode::Single);
    assert_eq!(execution.device_strategy(), DeviceStrategy::Default);
    assert!(config.worker_spec().is_some());
    assert_eq!(config.apex_replay_spec().unwrap().batch_size, Some(64));

    assert!(config.saver_spec.as_ref().unwrap().save_secs.is_some());
    assert!(config.policy_spec.is_none());
    assert!(config.optimizer_spec.is_none());

    // Idempotent
    let again = config.clone().with_defaults();
    assert_eq!(again, config);
}

#[test]
fn test_dqn_defaults_to_uniform_replay() {
    let config = AgentConfig::from_value(json!({"type": "dqn_agent"})).unwrap();
    assert_eq!(config.agent_type, AgentKind::Dqn);
    assert_eq!(config.memory_kind(), MemoryKind::Replay);
    assert_eq!(config.epsilon_at(0), None);

    let emitted = config.to_value().unwrap();
    assert_eq!(emitted, json!({"type": "dqn"}));
}
