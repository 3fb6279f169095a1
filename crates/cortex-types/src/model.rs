//! Model configuration and the supported model-type set.

use crate::error::CortexError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The supported model set. Dynamic `modelType` strings are validated into
/// this tagged variant at the config/switch boundary, not at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    /// Hierarchical reasoning model.
    #[serde(rename = "hrm")]
    Hrm,
    /// Phi-3 mini.
    #[serde(rename = "phi-3-mini")]
    Phi3Mini,
    /// TinyLlama.
    #[serde(rename = "tiny-llama")]
    TinyLlama,
    /// The built-in degraded-mode model substituted when the default model
    /// cannot be fetched and fallback is enabled.
    #[serde(rename = "fallback")]
    Fallback,
}

impl ModelType {
    /// Wire name of this model type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Hrm => "hrm",
            ModelType::Phi3Mini => "phi-3-mini",
            ModelType::TinyLlama => "tiny-llama",
            ModelType::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = CortexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hrm" => Ok(ModelType::Hrm),
            "phi-3-mini" => Ok(ModelType::Phi3Mini),
            "tiny-llama" => Ok(ModelType::TinyLlama),
            "fallback" => Ok(ModelType::Fallback),
            other => Err(CortexError::Config(format!(
                "Unknown model type '{other}' (supported: hrm, phi-3-mini, tiny-llama, fallback)"
            ))),
        }
    }
}

/// Desired model instance description. Validated before a switch is
/// attempted; immutable once a switch succeeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// Which model to run.
    pub model_type: ModelType,
    /// Generation cap.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling cutoff.
    pub top_p: f32,
    /// Context window in tokens.
    pub context_length_tokens: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::Hrm,
            max_tokens: 1024,
            temperature: 0.7,
            top_p: 0.9,
            context_length_tokens: 4096,
        }
    }
}

impl ModelConfig {
    /// The built-in degraded-mode model configuration.
    pub fn fallback() -> Self {
        Self {
            model_type: ModelType::Fallback,
            max_tokens: 256,
            temperature: 0.0,
            top_p: 1.0,
            context_length_tokens: 512,
        }
    }
}
