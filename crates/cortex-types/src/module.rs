//! Module instance descriptors.

use serde::{Deserialize, Serialize};

/// Which of the two hosted module roles an instance plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleKind {
    /// The agent's control/decision logic.
    AgentCore,
    /// The inference engine.
    Model,
}

impl std::fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModuleKind::AgentCore => write!(f, "agent-core"),
            ModuleKind::Model => write!(f, "model"),
        }
    }
}

/// Diagnostic snapshot of one live module instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInstanceInfo {
    /// Which role the instance plays.
    #[serde(rename = "type")]
    pub kind: ModuleKind,
    /// Whether the binary was compiled and instantiated.
    pub loaded: bool,
    /// Whether the instance has completed its domain initialization
    /// (agent-core `initialize`, model weight loading).
    pub initialized: bool,
    /// Current linear memory size in bytes.
    pub memory_size_bytes: u32,
}
