//! LoRA adapter ("skill") records and host-side shape validation.

use crate::error::{CortexError, CortexResult};
use serde::{Deserialize, Serialize};

/// A trained low-rank weight delta, merged into a running agent-core as
/// `ΔW = alpha/rank · (A·B)`.
///
/// Constructed externally and applied exactly once per load call. The
/// runtime never persists adapters; it retains only the identity of the
/// most recently applied one for status reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoraAdapter {
    /// Stable adapter identifier.
    pub skill_id: String,
    /// Human-readable name.
    pub skill_name: String,
    /// Left factor, rank-many columns.
    pub weights_a: Vec<f32>,
    /// Right factor, rank-many rows.
    pub weights_b: Vec<f32>,
    /// Decomposition rank.
    pub rank: u32,
    /// Scaling factor.
    pub alpha: f32,
}

impl LoraAdapter {
    /// Validate the shape invariants. Performed host-side before any
    /// boundary crossing so malformed adapters never reach the module.
    pub fn validate(&self) -> CortexResult<()> {
        if self.rank == 0 {
            return Err(CortexError::AdapterShapeMismatch(format!(
                "adapter '{}' has rank 0",
                self.skill_id
            )));
        }
        if self.weights_a.is_empty() || self.weights_b.is_empty() {
            return Err(CortexError::AdapterShapeMismatch(format!(
                "adapter '{}' has empty weight factors",
                self.skill_id
            )));
        }
        let rank = self.rank as usize;
        if self.weights_a.len() % rank != 0 {
            return Err(CortexError::AdapterShapeMismatch(format!(
                "adapter '{}': weightsA length {} is not a multiple of rank {}",
                self.skill_id,
                self.weights_a.len(),
                self.rank
            )));
        }
        if self.weights_b.len() % rank != 0 {
            return Err(CortexError::AdapterShapeMismatch(format!(
                "adapter '{}': weightsB length {} is not a multiple of rank {}",
                self.skill_id,
                self.weights_b.len(),
                self.rank
            )));
        }
        if !self.alpha.is_finite() {
            return Err(CortexError::AdapterShapeMismatch(format!(
                "adapter '{}': alpha is not finite",
                self.skill_id
            )));
        }
        Ok(())
    }
}
