//! Orchestrator — owns both module instances, routes sensory input,
//! hot-swaps models, and enforces the concurrency/timeout policy.
//!
//! Scheduling model: module-boundary calls are synchronous and
//! non-preemptible; each is offloaded to a blocking thread and raced
//! against the advisory timeout. Only one call may be in flight against a
//! given instance's linear memory (the slot mutexes guarantee this), so
//! calls against one instance complete strictly in submission order.

use crate::agent_core::AgentCoreInterface;
use crate::fallback;
use crate::model::{ModelInterface, ModelSlot};
use crate::source::ModuleBinarySource;
use cortex_types::{
    AgentCoreResponse, CortexError, CortexResult, LoraAdapter, ModelConfig, ModelType,
    ModuleInstanceInfo, ModuleKind, OrchestrationConfig, SensoryInput,
};
use cortex_wasm::{HostState, InferenceBridge, ModuleLoader};
use serde::Serialize;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{RwLock, Semaphore};
use tracing::{info, warn};

/// Orchestrator lifecycle states. `Disposed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Uninitialized,
    Initializing,
    Ready,
    SwitchingModel,
    Disposed,
}

impl std::fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrchestratorState::Uninitialized => "uninitialized",
            OrchestratorState::Initializing => "initializing",
            OrchestratorState::Ready => "ready",
            OrchestratorState::SwitchingModel => "switching-model",
            OrchestratorState::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

/// Outcome of a boundary call raced against the advisory timeout.
///
/// `TimedOut` means the caller's wait expired but the underlying module
/// call is still running; its late result is logged and discarded.
#[derive(Debug)]
pub enum CallOutcome<T> {
    /// The call completed within the timeout.
    Completed(T),
    /// The advisory timeout elapsed first.
    TimedOut {
        /// The configured timeout that was exceeded.
        timeout_ms: u64,
    },
}

impl<T> CallOutcome<T> {
    /// The completed value, if any.
    pub fn into_completed(self) -> Option<T> {
        match self {
            CallOutcome::Completed(value) => Some(value),
            CallOutcome::TimedOut { .. } => None,
        }
    }
}

/// Identity of the most recently applied adapter, kept for status
/// reporting only — adapters themselves are never persisted here.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterIdentity {
    pub skill_id: String,
    pub skill_name: String,
}

/// Per-module diagnostic report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleInfoReport {
    /// Orchestrator lifecycle state.
    pub state: String,
    /// Agent-core instance snapshot, if one exists.
    pub agent_core: Option<ModuleInstanceInfo>,
    /// Model instance snapshot, if one exists.
    pub model: Option<ModuleInstanceInfo>,
    /// Config of the currently active model.
    pub active_model: ModelConfig,
    /// Agent-core module version, read once at initialization.
    pub agent_version: Option<String>,
    /// Features the agent-core advertises.
    pub supported_features: Vec<String>,
    /// Most recently applied adapter.
    pub last_adapter: Option<AdapterIdentity>,
    /// Non-fatal degradations recorded so far.
    pub warnings: Vec<String>,
}

/// Hosts the agent-core and model instances and coordinates all access to
/// them. Construct explicitly and pass the handle to collaborators; there
/// is no ambient global instance.
pub struct Orchestrator {
    config: OrchestrationConfig,
    loader: Arc<ModuleLoader>,
    source: Arc<dyn ModuleBinarySource>,
    state: Mutex<OrchestratorState>,
    agent: Arc<Mutex<Option<AgentCoreInterface>>>,
    model: ModelSlot,
    active_model: Mutex<ModelConfig>,
    /// FIFO admission gate for boundary calls.
    gate: Arc<Semaphore>,
    /// Calls currently waiting for a permit.
    queued: AtomicU32,
    /// Readers = boundary calls, writer = model switch. A switch drains
    /// in-flight calls before touching the model slot.
    swap_lock: Arc<RwLock<()>>,
    warnings: Arc<Mutex<Vec<String>>>,
    last_adapter: Mutex<Option<AdapterIdentity>>,
    agent_version: Mutex<Option<String>>,
    supported_features: Mutex<Vec<String>>,
}

impl Orchestrator {
    /// Create an orchestrator in the `Uninitialized` state.
    pub fn new(
        config: OrchestrationConfig,
        source: Arc<dyn ModuleBinarySource>,
    ) -> CortexResult<Self> {
        let permits = config.max_concurrent_inferences.max(1) as usize;
        let active_model = config.default_model.clone();
        Ok(Self {
            config,
            loader: Arc::new(ModuleLoader::new()?),
            source,
            state: Mutex::new(OrchestratorState::Uninitialized),
            agent: Arc::new(Mutex::new(None)),
            model: ModelSlot::empty(),
            active_model: Mutex::new(active_model),
            gate: Arc::new(Semaphore::new(permits)),
            queued: AtomicU32::new(0),
            swap_lock: Arc::new(RwLock::new(())),
            warnings: Arc::new(Mutex::new(Vec::new())),
            last_adapter: Mutex::new(None),
            agent_version: Mutex::new(None),
            supported_features: Mutex::new(Vec::new()),
        })
    }

    /// Current lifecycle state.
    pub fn state(&self) -> OrchestratorState {
        *lock(&self.state)
    }

    /// The orchestration configuration (immutable after construction).
    pub fn config(&self) -> &OrchestrationConfig {
        &self.config
    }

    /// Non-fatal degradations recorded so far.
    pub fn warnings(&self) -> Vec<String> {
        lock(&self.warnings).clone()
    }

    /// Load both modules and transition to `Ready`.
    ///
    /// Agent-core failure is fatal: the orchestrator stays
    /// `Uninitialized`. Model failure degrades to the built-in fallback
    /// when enabled, otherwise it is fatal too.
    pub async fn initialize(&self) -> CortexResult<()> {
        {
            let mut state = lock(&self.state);
            match *state {
                OrchestratorState::Disposed => {
                    return Err(CortexError::Disposed("initialize".into()))
                }
                OrchestratorState::Uninitialized => *state = OrchestratorState::Initializing,
                other => {
                    return Err(CortexError::InvalidState {
                        current: other.to_string(),
                        operation: "initialize".into(),
                    })
                }
            }
        }

        match self.perform_initialize().await {
            Ok(()) => {
                {
                    let mut state = lock(&self.state);
                    if *state != OrchestratorState::Initializing {
                        // Disposed while loading; discard the fresh
                        // instances instead of resurrecting the host.
                        drop(state);
                        lock(&self.agent).take();
                        self.model.replace(None);
                        return Err(CortexError::Disposed("initialize".into()));
                    }
                    *state = OrchestratorState::Ready;
                }
                info!(
                    model = %lock(&self.active_model).model_type,
                    "orchestrator ready"
                );
                Ok(())
            }
            Err(e) => {
                lock(&self.agent).take();
                self.model.replace(None);
                let mut state = lock(&self.state);
                if *state != OrchestratorState::Disposed {
                    *state = OrchestratorState::Uninitialized;
                }
                Err(e)
            }
        }
    }

    async fn perform_initialize(&self) -> CortexResult<()> {
        // Agent-core first; its failure aborts initialization.
        let bytes = self.source.agent_core().await?;
        let agent_id = format!("agent-{}", uuid::Uuid::new_v4());
        let bridge: Option<Arc<dyn InferenceBridge>> = if self.config.enable_cross_module_comm {
            Some(Arc::new(self.model.clone()))
        } else {
            None
        };

        let loader = self.loader.clone();
        let label = agent_id.clone();
        let join = tokio::task::spawn_blocking(move || -> CortexResult<AgentCoreInterface> {
            let state = match bridge {
                Some(bridge) => HostState::with_bridge(ModuleKind::AgentCore, label.clone(), bridge),
                None => HostState::new(ModuleKind::AgentCore, label.clone()),
            };
            let module = loader.compile_and_instantiate(&bytes, state)?;
            let mut iface = AgentCoreInterface::new(module)?;
            if !iface.create(&label)? {
                return Err(CortexError::Abi("agent-core rejected create".into()));
            }
            if !iface.initialize()? {
                return Err(CortexError::Abi("agent-core rejected initialize".into()));
            }
            Ok(iface)
        })
        .await
        .map_err(|e| CortexError::RuntimeTrap(format!("agent-core load task panicked: {e}")))?;
        let mut iface = join?;

        match iface.get_version() {
            Ok(version) => *lock(&self.agent_version) = Some(version),
            Err(e) => self.push_warning(format!("agent-core getVersion failed: {e}")),
        }
        match iface.get_supported_features() {
            Ok(features) => *lock(&self.supported_features) = features,
            Err(e) => self.push_warning(format!("agent-core getSupportedFeatures failed: {e}")),
        }
        *lock(&self.agent) = Some(iface);

        // Model second; degrade to the fallback when enabled.
        match self.load_model_instance(&self.config.default_model).await {
            Ok(model) => {
                self.model.replace(Some(model));
                *lock(&self.active_model) = self.config.default_model.clone();
            }
            Err(e) if self.config.enable_model_fallback => {
                warn!(
                    error = %e,
                    model = %self.config.default_model.model_type,
                    "default model load failed, substituting built-in fallback"
                );
                self.push_warning(format!(
                    "default model '{}' failed to load, fallback substituted: {e}",
                    self.config.default_model.model_type
                ));
                let fb = self.load_model_instance(&ModelConfig::fallback()).await?;
                self.model.replace(Some(fb));
                *lock(&self.active_model) = ModelConfig::fallback();
            }
            Err(e) => return Err(e),
        }

        Ok(())
    }

    /// Route one sensory input into the agent-core. Only valid in `Ready`.
    pub async fn process_sensory_input(
        &self,
        input: SensoryInput,
    ) -> CortexResult<CallOutcome<AgentCoreResponse>> {
        let context = serde_json::json!({ "sessionId": input.session_id });
        let result = self
            .run_agent_call("processSensoryInput", move |agent| {
                agent.execute(&input, &context)
            })
            .await;
        match result {
            // The model is reachable from `execute` through the bridge; a
            // trap during that call surfaces as a classified inference
            // failure rather than a raw trap.
            Err(CortexError::RuntimeTrap(msg)) if self.config.enable_cross_module_comm => {
                Err(CortexError::ModelInferenceFailed(msg))
            }
            other => other,
        }
    }

    /// Route a tool invocation into the agent-core.
    pub async fn execute_tool(
        &self,
        name: &str,
        params: serde_json::Value,
        context: serde_json::Value,
    ) -> CortexResult<CallOutcome<serde_json::Value>> {
        let name = name.to_string();
        self.run_agent_call("executeTool", move |agent| {
            agent.execute_tool(&name, &params, &context)
        })
        .await
    }

    /// Merge a LoRA adapter into the running agent-core. Shape invariants
    /// are validated here, before any queueing or boundary crossing.
    pub async fn load_lora_adapter(&self, adapter: LoraAdapter) -> CortexResult<bool> {
        adapter.validate()?;
        let identity = AdapterIdentity {
            skill_id: adapter.skill_id.clone(),
            skill_name: adapter.skill_name.clone(),
        };
        let outcome = self
            .run_agent_call("loadLoraAdapter", move |agent| {
                agent.load_lora_adapter(&adapter)
            })
            .await?;
        match outcome {
            CallOutcome::Completed(accepted) => {
                if accepted {
                    *lock(&self.last_adapter) = Some(identity);
                }
                Ok(accepted)
            }
            CallOutcome::TimedOut { timeout_ms } => Err(CortexError::Timeout {
                operation: "loadLoraAdapter".into(),
                timeout_ms,
            }),
        }
    }

    /// Replace the running model with `new_config`.
    ///
    /// Acts as a barrier: in-flight boundary calls drain first. The new
    /// instance is loaded before the old one is torn down, so a failed
    /// switch rolls back to the previous model with the orchestrator still
    /// `Ready` and functional.
    pub async fn switch_model(&self, new_config: ModelConfig) -> CortexResult<()> {
        {
            let mut state = lock(&self.state);
            match *state {
                OrchestratorState::Disposed => {
                    return Err(CortexError::Disposed("switchModel".into()))
                }
                OrchestratorState::Ready => *state = OrchestratorState::SwitchingModel,
                other => {
                    return Err(CortexError::InvalidState {
                        current: other.to_string(),
                        operation: "switchModel".into(),
                    })
                }
            }
        }

        let requested = new_config.model_type;
        let result = self.perform_switch(new_config).await;

        {
            let mut state = lock(&self.state);
            if *state == OrchestratorState::SwitchingModel {
                *state = OrchestratorState::Ready;
            }
        }

        match result {
            Ok(()) => {
                info!(model = %requested, "model switch complete");
                Ok(())
            }
            Err(e @ CortexError::Disposed(_)) => Err(e),
            Err(e) => {
                warn!(model = %requested, error = %e, "model switch failed, previous model kept");
                Err(CortexError::SwitchFailed {
                    requested: requested.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn perform_switch(&self, new_config: ModelConfig) -> CortexResult<()> {
        // Drain in-flight boundary calls; no instance is torn down mid-call.
        let _barrier = self.swap_lock.write().await;
        let new_model = self.load_model_instance(&new_config).await?;
        // Disposal may have landed while the new model was loading; never
        // install an instance into a disposed host.
        if self.state() != OrchestratorState::SwitchingModel {
            return Err(CortexError::Disposed("switchModel".into()));
        }
        let old = self.model.replace(Some(new_model));
        drop(old);
        *lock(&self.active_model) = new_config;
        Ok(())
    }

    /// Tear down both instances and transition to `Disposed`. Idempotent;
    /// waits for any in-flight call or model switch before releasing
    /// linear memory.
    pub async fn dispose(&self) {
        {
            let mut state = lock(&self.state);
            if *state == OrchestratorState::Disposed {
                return;
            }
            *state = OrchestratorState::Disposed;
        }
        self.gate.close();

        // Boundary calls hold read guards, a switch holds the write guard;
        // taking the write guard here drains both before teardown.
        let _barrier = self.swap_lock.write().await;

        let agent = self.agent.clone();
        let model = self.model.clone();
        let _ = tokio::task::spawn_blocking(move || {
            drop(lock(&agent).take());
            drop(model.replace(None));
        })
        .await;
        info!("orchestrator disposed");
    }

    /// Per-module diagnostic info.
    pub fn get_module_info(&self) -> ModuleInfoReport {
        ModuleInfoReport {
            state: self.state().to_string(),
            agent_core: lock(&self.agent).as_ref().map(|a| a.info()),
            model: self.model.info(),
            active_model: lock(&self.active_model).clone(),
            agent_version: lock(&self.agent_version).clone(),
            supported_features: lock(&self.supported_features).clone(),
            last_adapter: lock(&self.last_adapter).clone(),
            warnings: lock(&self.warnings).clone(),
        }
    }

    fn ensure_ready(&self, operation: &str) -> CortexResult<()> {
        match self.state() {
            OrchestratorState::Ready => Ok(()),
            OrchestratorState::Disposed => Err(CortexError::Disposed(operation.to_string())),
            other => Err(CortexError::InvalidState {
                current: other.to_string(),
                operation: operation.to_string(),
            }),
        }
    }

    fn push_warning(&self, message: String) {
        lock(&self.warnings).push(message);
    }

    async fn load_model_instance(&self, config: &ModelConfig) -> CortexResult<ModelInterface> {
        let (bytes, weights) = if config.model_type == ModelType::Fallback {
            (
                fallback::FALLBACK_MODEL_WAT.as_bytes().to_vec(),
                fallback::FALLBACK_WEIGHTS.to_vec(),
            )
        } else {
            (
                self.source.model(config.model_type).await?,
                self.source.model_weights(config.model_type).await?,
            )
        };

        let loader = self.loader.clone();
        let model_type = config.model_type;
        let join = tokio::task::spawn_blocking(move || -> CortexResult<ModelInterface> {
            let module = loader.compile_and_instantiate(
                &bytes,
                HostState::new(ModuleKind::Model, model_type.as_str()),
            )?;
            let mut model = ModelInterface::new(module, model_type)?;
            if !model.create()? {
                return Err(CortexError::Abi(format!(
                    "model '{model_type}' rejected create"
                )));
            }
            if !model.load_weights(&weights)? {
                return Err(CortexError::Abi(format!(
                    "model '{model_type}' rejected weights"
                )));
            }
            Ok(model)
        })
        .await
        .map_err(|e| CortexError::RuntimeTrap(format!("model load task panicked: {e}")))?;
        join
    }

    /// Run one boundary call against the agent-core under the admission
    /// gate, the switch barrier, and the advisory timeout.
    async fn run_agent_call<T, F>(
        &self,
        operation: &'static str,
        call: F,
    ) -> CortexResult<CallOutcome<T>>
    where
        F: FnOnce(&mut AgentCoreInterface) -> CortexResult<T> + Send + 'static,
        T: Send + 'static,
    {
        self.ensure_ready(operation)?;

        // Bounded FIFO admission.
        let limit = self.config.queue_limit();
        let waiting = self.queued.fetch_add(1, Ordering::SeqCst);
        if waiting >= limit {
            self.queued.fetch_sub(1, Ordering::SeqCst);
            return Err(CortexError::Backpressure {
                queued: waiting,
                limit,
            });
        }
        let permit = match self.gate.clone().acquire_owned().await {
            Ok(permit) => {
                self.queued.fetch_sub(1, Ordering::SeqCst);
                permit
            }
            Err(_) => {
                self.queued.fetch_sub(1, Ordering::SeqCst);
                return Err(CortexError::Disposed(operation.to_string()));
            }
        };

        // A model switch drains these read guards before swapping.
        let barrier = self.swap_lock.clone().read_owned().await;

        let agent = self.agent.clone();
        let mut handle = tokio::task::spawn_blocking(move || -> CortexResult<T> {
            let _permit = permit;
            let _barrier = barrier;
            let mut slot = agent.lock().unwrap_or_else(PoisonError::into_inner);
            let iface = slot
                .as_mut()
                .ok_or_else(|| CortexError::Disposed(operation.to_string()))?;
            call(iface)
        });

        let timeout_ms = self.config.timeout_ms;
        match tokio::time::timeout(Duration::from_millis(timeout_ms), &mut handle).await {
            Ok(joined) => {
                let result = joined.map_err(|e| {
                    CortexError::RuntimeTrap(format!("{operation} task panicked: {e}"))
                })?;
                result.map(CallOutcome::Completed)
            }
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms, "advisory timeout elapsed; module call continues in background"
                );
                let warnings = self.warnings.clone();
                tokio::spawn(async move {
                    match handle.await {
                        Ok(_) => {
                            warn!(operation, "late result after advisory timeout discarded");
                            lock(&warnings).push(format!(
                                "late result of '{operation}' discarded after {timeout_ms}ms timeout"
                            ));
                        }
                        Err(e) => {
                            warn!(operation, error = %e, "timed-out call failed in background")
                        }
                    }
                });
                Ok(CallOutcome::TimedOut { timeout_ms })
            }
        }
    }
}

/// Lock with poison recovery: a poisoned mutex means a panic mid-call,
/// not structural damage to the guarded value.
fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
