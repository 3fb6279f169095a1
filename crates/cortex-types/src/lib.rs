//! Core types for the Cortex module host.
//!
//! This crate defines all shared data structures used across the module
//! loader, the per-module interface wrappers, and the orchestrator. It
//! contains no business logic.

pub mod adapter;
pub mod config;
pub mod error;
pub mod input;
pub mod model;
pub mod module;

pub use adapter::LoraAdapter;
pub use config::OrchestrationConfig;
pub use error::{CortexError, CortexResult};
pub use input::{AgentCoreResponse, SensoryInput, SensoryKind};
pub use model::{ModelConfig, ModelType};
pub use module::{ModuleInstanceInfo, ModuleKind};
