//! Runtime layer of the Cortex host.
//!
//! Owns the two typed interface wrappers (agent-core and model), the
//! orchestrator that routes sensory input and hot-swaps models, the module
//! byte-source collaborator trait, and the built-in fallback model.

pub mod agent_core;
pub mod config;
pub mod fallback;
pub mod model;
pub mod orchestrator;
pub mod source;

pub use agent_core::AgentCoreInterface;
pub use model::{ModelInterface, ModelSlot};
pub use orchestrator::{CallOutcome, ModuleInfoReport, Orchestrator, OrchestratorState};
pub use source::{FileBinarySource, ModuleBinarySource, StaticBinarySource};
