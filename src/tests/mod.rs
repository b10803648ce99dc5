// Test modules for all components
pub mod test_config;
pub mod test_schedule;

use crate::config::AgentConfig;

pub(crate) const APEX_AGENT_JSON: &str = include_str!("../../configs/apex_agent.json");

pub(crate) fn apex_agent() -> AgentConfig {
    AgentConfig::from_json_str(APEX_AGENT_JSON).unwrap()
}
