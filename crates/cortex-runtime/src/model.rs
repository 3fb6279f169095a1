//! Typed wrapper around a loaded model module instance, and the shared
//! slot that makes the live model reachable from agent-core host calls.

use cortex_types::{CortexError, CortexResult, ModelType, ModuleInstanceInfo, ModuleKind};
use cortex_wasm::{InferenceBridge, LoadedModule};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Wraps one `LoadedModule` of type model. `run_inference` fails fast with
/// a domain `not loaded` payload until weights have been supplied. Weight
/// loading is one-shot; reloading does not require recreating the handle.
pub struct ModelInterface {
    module: LoadedModule,
    model_type: ModelType,
    weights_loaded: bool,
}

impl ModelInterface {
    /// Wrap a loaded module of the given type.
    pub fn new(module: LoadedModule, model_type: ModelType) -> CortexResult<Self> {
        if module.kind() != ModuleKind::Model {
            return Err(CortexError::Abi(format!(
                "expected model module, got {}",
                module.kind()
            )));
        }
        Ok(Self {
            module,
            model_type,
            weights_loaded: false,
        })
    }

    /// Which model this instance runs.
    pub fn model_type(&self) -> ModelType {
        self.model_type
    }

    /// Create the in-module model handle.
    pub fn create(&mut self) -> CortexResult<bool> {
        self.module.call_bool("create", &[self.model_type.as_str()])
    }

    /// Supply weight bytes. Copies the blob into guest memory and passes
    /// the `(ptr, len)` pair to `loadWeights`.
    pub fn load_weights(&mut self, weights: &[u8]) -> CortexResult<bool> {
        let ok = self.module.call_bool_bytes("loadWeights", weights)?;
        if ok {
            self.weights_loaded = true;
        }
        debug!(
            model = %self.model_type,
            bytes = weights.len(),
            accepted = ok,
            "weights load"
        );
        Ok(ok)
    }

    /// Whether weights have been supplied.
    pub fn is_loaded(&self) -> bool {
        self.weights_loaded
    }

    /// Run one inference, returning the raw JSON response string. Fails
    /// fast with a domain envelope when weights are missing.
    pub fn run_inference_raw(&mut self, input: &str, context: &str) -> CortexResult<String> {
        if !self.weights_loaded {
            return Ok(
                serde_json::json!({"success": false, "error": "Model weights not loaded"})
                    .to_string(),
            );
        }
        self.module.call_string("runInference", &[input, context])
    }

    /// Run one inference, parsed.
    pub fn run_inference(&mut self, input: &str, context: &str) -> CortexResult<serde_json::Value> {
        let raw = self.run_inference_raw(input, context)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Pure read of the module's info report. Always callable.
    pub fn get_info(&mut self) -> CortexResult<serde_json::Value> {
        let raw = self.module.call_string("getInfo", &[])?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Diagnostic snapshot.
    pub fn info(&self) -> ModuleInstanceInfo {
        ModuleInstanceInfo {
            kind: ModuleKind::Model,
            loaded: true,
            initialized: self.weights_loaded,
            memory_size_bytes: self.module.memory_size_bytes(),
        }
    }
}

/// Shared, swappable slot holding the current model instance.
///
/// The orchestrator owns the slot; the agent-core's `model_infer` import
/// holds a clone, so a hot swap is immediately visible to the guest.
/// The inner mutex guarantees at most one call in flight against the
/// model's linear memory.
#[derive(Clone)]
pub struct ModelSlot {
    inner: Arc<Mutex<Option<ModelInterface>>>,
}

impl ModelSlot {
    /// An empty slot (no model loaded).
    pub fn empty() -> Self {
        Self {
            inner: Arc::new(Mutex::new(None)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<ModelInterface>> {
        // A poisoned lock means a panic mid-call; the slot itself is still
        // structurally sound.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the current instance, returning the previous one.
    pub fn replace(&self, model: Option<ModelInterface>) -> Option<ModelInterface> {
        std::mem::replace(&mut *self.lock(), model)
    }

    /// Run `f` against the current instance, if any.
    pub fn with<R>(&self, f: impl FnOnce(&mut ModelInterface) -> R) -> Option<R> {
        self.lock().as_mut().map(f)
    }

    /// Diagnostic snapshot of the current instance.
    pub fn info(&self) -> Option<ModuleInstanceInfo> {
        self.lock().as_ref().map(|m| m.info())
    }

    /// Model type of the current instance.
    pub fn model_type(&self) -> Option<ModelType> {
        self.lock().as_ref().map(|m| m.model_type())
    }
}

impl InferenceBridge for ModelSlot {
    fn run_inference(&self, input: &str, context: &str) -> CortexResult<String> {
        match self.lock().as_mut() {
            Some(model) => model.run_inference_raw(input, context),
            None => Ok(
                serde_json::json!({"success": false, "error": "Model not loaded"}).to_string(),
            ),
        }
    }
}
