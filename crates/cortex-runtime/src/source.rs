//! Module byte-source collaborator.
//!
//! The host never reads storage or the network itself; a byte source
//! supplies module binaries and weight blobs on request.

use async_trait::async_trait;
use cortex_types::{CortexError, CortexResult, ModelType};
use std::collections::HashMap;
use std::path::PathBuf;

/// Supplies compiled module binaries and model weight blobs.
#[async_trait]
pub trait ModuleBinarySource: Send + Sync {
    /// The agent-core module binary.
    async fn agent_core(&self) -> CortexResult<Vec<u8>>;

    /// The model module binary for the given type.
    async fn model(&self, model_type: ModelType) -> CortexResult<Vec<u8>>;

    /// The weight blob for the given model type.
    async fn model_weights(&self, model_type: ModelType) -> CortexResult<Vec<u8>>;
}

/// Reads modules from a directory: `agent-core.wasm`, `model-<type>.wasm`,
/// `model-<type>.weights`.
pub struct FileBinarySource {
    dir: PathBuf,
}

impl FileBinarySource {
    /// A source rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    async fn read(&self, file: String) -> CortexResult<Vec<u8>> {
        let path = self.dir.join(&file);
        tokio::fs::read(&path)
            .await
            .map_err(|e| CortexError::Fetch(format!("{}: {e}", path.display())))
    }
}

#[async_trait]
impl ModuleBinarySource for FileBinarySource {
    async fn agent_core(&self) -> CortexResult<Vec<u8>> {
        self.read("agent-core.wasm".to_string()).await
    }

    async fn model(&self, model_type: ModelType) -> CortexResult<Vec<u8>> {
        self.read(format!("model-{model_type}.wasm")).await
    }

    async fn model_weights(&self, model_type: ModelType) -> CortexResult<Vec<u8>> {
        self.read(format!("model-{model_type}.weights")).await
    }
}

/// In-memory source for tests and embedded deployments.
#[derive(Default)]
pub struct StaticBinarySource {
    agent_core: Option<Vec<u8>>,
    models: HashMap<ModelType, Vec<u8>>,
    weights: HashMap<ModelType, Vec<u8>>,
}

impl StaticBinarySource {
    /// An empty source; every fetch fails until populated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the agent-core binary.
    pub fn with_agent_core(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.agent_core = Some(bytes.into());
        self
    }

    /// Register a model binary with its weights.
    pub fn with_model(
        mut self,
        model_type: ModelType,
        bytes: impl Into<Vec<u8>>,
        weights: impl Into<Vec<u8>>,
    ) -> Self {
        self.models.insert(model_type, bytes.into());
        self.weights.insert(model_type, weights.into());
        self
    }
}

#[async_trait]
impl ModuleBinarySource for StaticBinarySource {
    async fn agent_core(&self) -> CortexResult<Vec<u8>> {
        self.agent_core
            .clone()
            .ok_or_else(|| CortexError::Fetch("no agent-core binary registered".into()))
    }

    async fn model(&self, model_type: ModelType) -> CortexResult<Vec<u8>> {
        self.models
            .get(&model_type)
            .cloned()
            .ok_or_else(|| CortexError::Fetch(format!("no binary for model '{model_type}'")))
    }

    async fn model_weights(&self, model_type: ModelType) -> CortexResult<Vec<u8>> {
        self.weights
            .get(&model_type)
            .cloned()
            .ok_or_else(|| CortexError::Fetch(format!("no weights for model '{model_type}'")))
    }
}
