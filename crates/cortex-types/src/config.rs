//! Orchestration configuration.

use crate::model::ModelConfig;
use serde::{Deserialize, Serialize};

/// Configuration for the orchestrator. Immutable after construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestrationConfig {
    /// Model loaded during initialization.
    pub default_model: ModelConfig,
    /// Substitute the built-in fallback model when the default model
    /// cannot be fetched or instantiated.
    pub enable_model_fallback: bool,
    /// Expose the live model to the agent-core through the `model_infer`
    /// import.
    pub enable_cross_module_comm: bool,
    /// Boundary calls allowed in flight at once; further calls queue FIFO.
    pub max_concurrent_inferences: u32,
    /// Advisory timeout per boundary call. The underlying module call is
    /// never preempted; on expiry the caller is rejected and the late
    /// result is discarded.
    pub timeout_ms: u64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            default_model: ModelConfig::default(),
            enable_model_fallback: true,
            enable_cross_module_comm: true,
            max_concurrent_inferences: 4,
            timeout_ms: 30_000,
        }
    }
}

impl OrchestrationConfig {
    /// Maximum number of calls allowed to wait for a permit before new
    /// submissions are rejected with backpressure.
    pub fn queue_limit(&self) -> u32 {
        self.max_concurrent_inferences.saturating_mul(4).max(1)
    }
}
