//! Shared error types for the Cortex module host.
//!
//! Domain-level failures (not-initialized, unknown tool, model-not-loaded)
//! are *not* represented here — the boundary protocol returns those as
//! `{"success":false,"error":...}` envelopes in the response data. Only
//! loader-level and protocol-level failures surface as `CortexError`.

use thiserror::Error;

/// Top-level error type for the Cortex module host.
#[derive(Error, Debug)]
pub enum CortexError {
    /// The binary module failed to compile (malformed bytes).
    #[error("Module compilation failed: {0}")]
    Compile(String),

    /// The module could not be instantiated against the host import surface.
    #[error("Module linking failed: {0}")]
    Link(String),

    /// The module trapped or aborted during a call. The instance remains
    /// usable for subsequent calls.
    #[error("Module trapped: {0}")]
    RuntimeTrap(String),

    /// The guest violated the string-marshaling ABI (missing export,
    /// out-of-bounds pointer, non-UTF-8 return).
    #[error("Guest ABI violation: {0}")]
    Abi(String),

    /// A LoRA adapter failed host-side shape validation and was rejected
    /// before crossing the module boundary.
    #[error("Adapter shape mismatch: {0}")]
    AdapterShapeMismatch(String),

    /// A model switch failed and was rolled back to the previous model.
    #[error("Model switch to '{requested}' failed (rolled back): {reason}")]
    SwitchFailed {
        /// The model type that was requested.
        requested: String,
        /// Why the switch failed.
        reason: String,
    },

    /// An inference delegated to the model module failed during an
    /// agent-core call.
    #[error("Model inference failed: {0}")]
    ModelInferenceFailed(String),

    /// The operation was attempted after the orchestrator was disposed.
    #[error("Orchestrator disposed: {0} rejected")]
    Disposed(String),

    /// The orchestrator is in the wrong state for the requested operation.
    #[error("Invalid state '{current}' for operation '{operation}'")]
    InvalidState {
        /// The current orchestrator state.
        current: String,
        /// The operation that was attempted.
        operation: String,
    },

    /// The advisory timeout elapsed. The underlying module call keeps
    /// running; its late result will be logged and discarded.
    #[error("Operation '{operation}' timed out after {timeout_ms}ms (call still running)")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The configured advisory timeout.
        timeout_ms: u64,
    },

    /// The bounded concurrency queue is full.
    #[error("Backpressure: {queued} calls already queued (limit {limit})")]
    Backpressure {
        /// Calls currently waiting for a permit.
        queued: u32,
        /// Maximum queue depth.
        limit: u32,
    },

    /// The module byte-source collaborator could not supply a binary.
    #[error("Module fetch failed: {0}")]
    Fetch(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for Result with CortexError.
pub type CortexResult<T> = Result<T, CortexError>;
