//! Typed wrapper around a loaded agent-core module instance.
//!
//! Domain errors (not initialized, unknown tool) come back as data in the
//! JSON response envelope, never as host-level failures — the caller is
//! often another module or a serialized transport.

use cortex_types::{
    AgentCoreResponse, CortexError, CortexResult, LoraAdapter, ModuleInstanceInfo, ModuleKind,
    SensoryInput,
};
use cortex_wasm::LoadedModule;
use std::time::Instant;
use tracing::debug;

/// Wraps one `LoadedModule` of type agent-core and owns its lifecycle
/// state. The `initialized` guard is host-side: boundary operations
/// short-circuit with a failure envelope until `initialize` succeeds.
pub struct AgentCoreInterface {
    module: LoadedModule,
    agent_id: String,
    initialized: bool,
}

impl AgentCoreInterface {
    /// Wrap a loaded module. The module must have been instantiated with
    /// `ModuleKind::AgentCore` state.
    pub fn new(module: LoadedModule) -> CortexResult<Self> {
        if module.kind() != ModuleKind::AgentCore {
            return Err(CortexError::Abi(format!(
                "expected agent-core module, got {}",
                module.kind()
            )));
        }
        Ok(Self {
            module,
            agent_id: String::new(),
            initialized: false,
        })
    }

    /// Reset agent identity state. Clears `initialized`.
    pub fn create(&mut self, agent_id: &str) -> CortexResult<bool> {
        self.initialized = false;
        let ok = self.module.call_bool("create", &[agent_id])?;
        if ok {
            self.agent_id = agent_id.to_string();
        }
        Ok(ok)
    }

    /// Arm the instance. Calling twice is allowed but re-arms any
    /// per-initialization counters inside the module.
    pub fn initialize(&mut self) -> CortexResult<bool> {
        let ok = self.module.call_bool("initialize", &[])?;
        if ok {
            self.initialized = true;
        }
        Ok(ok)
    }

    /// Whether `initialize` has succeeded since the last `create`.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The agent id passed to the last successful `create`.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    /// Execute one sensory input. Fails fast with a `success:false`
    /// envelope (not an error) when not initialized.
    pub fn execute(
        &mut self,
        input: &SensoryInput,
        context: &serde_json::Value,
    ) -> CortexResult<AgentCoreResponse> {
        if !self.initialized {
            return Ok(AgentCoreResponse::failure("Agent-core not initialized"));
        }

        let started = Instant::now();
        let input_json = serde_json::to_string(input)?;
        let context_json = context.to_string();
        let raw = self.module.call_string("execute", &[&input_json, &context_json])?;

        let mut response: AgentCoreResponse = serde_json::from_str(&raw)?;
        response.source = AgentCoreResponse::SOURCE.to_string();
        response.processing_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug!(
            agent = %self.agent_id,
            session = %input.session_id,
            elapsed_ms = response.processing_time_ms,
            success = response.success,
            "execute complete"
        );
        Ok(response)
    }

    /// Execute a named tool. Unknown tool names are surfaced as domain
    /// errors inside the returned payload by the module itself.
    pub fn execute_tool(
        &mut self,
        name: &str,
        params: &serde_json::Value,
        context: &serde_json::Value,
    ) -> CortexResult<serde_json::Value> {
        if !self.initialized {
            return Ok(serde_json::json!({
                "success": false,
                "error": "Agent-core not initialized",
            }));
        }
        let params_json = params.to_string();
        let context_json = context.to_string();
        let raw = self
            .module
            .call_string("executeTool", &[name, &params_json, &context_json])?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Merge a LoRA adapter into the running instance. Shape invariants are
    /// validated host-side first so malformed adapters never cross the
    /// boundary. Does not require re-`initialize`.
    pub fn load_lora_adapter(&mut self, adapter: &LoraAdapter) -> CortexResult<bool> {
        adapter.validate()?;
        let serialized = serde_json::to_string(adapter)?;
        let ok = self.module.call_bool("loadAdapter", &[&serialized])?;
        debug!(
            agent = %self.agent_id,
            skill = %adapter.skill_id,
            rank = adapter.rank,
            accepted = ok,
            "adapter merge"
        );
        Ok(ok)
    }

    /// Pure read of the module's status report. Always callable.
    pub fn get_status(&mut self) -> CortexResult<serde_json::Value> {
        let raw = self.module.call_string("getStatus", &[])?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Module version string.
    pub fn get_version(&mut self) -> CortexResult<String> {
        self.module.call_string("getVersion", &[])
    }

    /// Feature names the module advertises.
    pub fn get_supported_features(&mut self) -> CortexResult<Vec<String>> {
        let raw = self.module.call_string("getSupportedFeatures", &[])?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Diagnostic snapshot.
    pub fn info(&self) -> ModuleInstanceInfo {
        ModuleInstanceInfo {
            kind: ModuleKind::AgentCore,
            loaded: true,
            initialized: self.initialized,
            memory_size_bytes: self.module.memory_size_bytes(),
        }
    }
}
