//! # apex-config - Ape-X Agent Configuration
//!
//! Typed loading, validation and re-emission of the JSON documents that configure a
//! distributed prioritized experience replay (Ape-X) agent.
//!
//! ## Key Features
//!
//! - **Lossless documents**: unknown keys survive a load/save cycle and absent fields stay absent
//! - **Effective values**: accessors resolve defaults without rewriting the document
//! - **Validation**: cross-field rules with located errors and warnings
//! - **Schedules**: linear, polynomial, exponential and constant decay for epsilon and learning rates
//! - **Worker derivation**: per-worker exploration sampling and n-step post-processing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use apex_config::config::AgentConfig;
//!
//! let config = AgentConfig::from_path("configs/apex_agent.json").unwrap();
//! config.validate().unwrap();
//!
//! let epsilon = config.epsilon_at(500).unwrap_or(0.0);
//! assert!(epsilon <= 1.0);
//! let round_trip = AgentConfig::from_json_str(&config.to_json_pretty().unwrap()).unwrap();
//! assert_eq!(round_trip.batch_size(), config.batch_size());
//! ```
//!
//! ## Module Organization
//!
//! - [`builders`] - Builder patterns for convenient document construction
//! - [`config`] - The document model
//! - [`error`] - Error types and result handling
//! - [`json`] - Dotted paths, overrides and document equivalence
//! - [`schedule`] - Decay schedules
//! - [`validation`] - Consistency rules
//! - [`worker`] - Sample worker configuration and batch post-processing

#[macro_use]
pub mod macros;

pub mod builders;
pub mod config;
pub mod error;
pub mod json;
pub mod schedule;
pub mod validation;
pub mod worker;

#[cfg(test)]
mod tests;

pub use config::{AgentConfig, AgentKind, LayerSpec};
pub use error::{ApexConfigError, Result};
pub use schedule::{DecayKind, DecaySpec, LearningRate};
pub use validation::{Issue, Severity, ValidationReport};
