pub mod agent;
pub mod memory;

pub use agent::AgentConfigBuilder;
pub use memory::MemorySpecBuilder;
