use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const DEFAULT_DO_UPDATES: bool = true;
pub const DEFAULT_STEPS_BEFORE_UPDATE: u64 = 0;
pub const DEFAULT_UPDATE_INTERVAL: u64 = 4;
pub const DEFAULT_UPDATE_STEPS: u64 = 1;
pub const DEFAULT_BATCH_SIZE: u64 = 64;
pub const DEFAULT_SYNC_INTERVAL: u64 = 128;

pub const DEFAULT_BUFFER_ENABLED: bool = true;
pub const DEFAULT_BUFFER_SIZE: u64 = 100;

/// `update_spec`: learner cadence, measured in time steps
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct UpdateSpec {
    /// Whether updates happen at all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub do_updates: Option<bool>,

    /// Steps to wait before the first update
    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub steps_before_update: Option<u64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub update_interval: Option<u64>,

    /// Consecutive updates per interval
    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub update_steps: Option<u64>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u64>,

    /// Target network sync; must be a multiple of `update_interval`
    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub sync_interval: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UpdateSpec {
    pub fn new(update_interval: u64, batch_size: u64, sync_interval: u64) -> Self {
        UpdateSpec {
            update_interval: Some(update_interval),
            batch_size: Some(batch_size),
            sync_interval: Some(sync_interval),
            ..Default::default()
        }
    }

    pub fn do_updates(&self) -> bool {
        self.do_updates.unwrap_or(DEFAULT_DO_UPDATES)
    }

    pub fn steps_before_update(&self) -> u64 {
        self.steps_before_update.unwrap_or(DEFAULT_STEPS_BEFORE_UPDATE)
    }

    pub fn update_interval(&self) -> u64 {
        self.update_interval.unwrap_or(DEFAULT_UPDATE_INTERVAL)
    }

    pub fn update_steps(&self) -> u64 {
        self.update_steps.unwrap_or(DEFAULT_UPDATE_STEPS)
    }

    pub fn batch_size(&self) -> u64 {
        self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE)
    }

    pub fn sync_interval(&self) -> u64 {
        self.sync_interval.unwrap_or(DEFAULT_SYNC_INTERVAL)
    }

    /// Whether an update is due at `timestep`
    pub fn is_update_step(&self, timestep: u64) -> bool {
        let interval = self.update_interval();
        self.do_updates()
            && interval > 0
            && timestep >= self.steps_before_update()
            && timestep % interval == 0
    }

    /// Whether the target network syncs at `timestep`
    pub fn is_sync_step(&self, timestep: u64) -> bool {
        let interval = self.sync_interval();
        interval > 0 && timestep >= self.steps_before_update() && timestep % interval == 0
    }

    pub fn apply_defaults(&mut self) {
        self.do_updates.get_or_insert(DEFAULT_DO_UPDATES);
        self.steps_before_update.get_or_insert(DEFAULT_STEPS_BEFORE_UPDATE);
        self.update_interval.get_or_insert(DEFAULT_UPDATE_INTERVAL);
        self.update_steps.get_or_insert(DEFAULT_UPDATE_STEPS);
        self.batch_size.get_or_insert(DEFAULT_BATCH_SIZE);
        self.sync_interval.get_or_insert(DEFAULT_SYNC_INTERVAL);
    }
}

/// `observe_spec`: buffering of observations before they enter the memory
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub struct ObserveSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buffer_enabled: Option<bool>,

    #[serde(default, deserialize_with = "crate::json::whole_number", skip_serializing_if = "Option::is_none")]
    pub buffer_size: Option<u64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ObserveSpec {
    pub fn buffer_enabled(&self) -> bool {
        self.buffer_enabled.unwrap_or(DEFAULT_BUFFER_ENABLED)
    }

    pub fn buffer_size(&self) -> u64 {
        self.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE)
    }

    pub fn apply_defaults(&mut self) {
        self.buffer_enabled.get_or_insert(DEFAULT_BUFFER_ENABLED);
        self.buffer_size.get_or_insert(DEFAULT_BUFFER_SIZE);
    }
}
