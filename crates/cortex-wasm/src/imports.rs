//! The fixed host import surface (`"env"` module).
//!
//! Kept minimal on purpose: a logging sink, an abort/trap handler, pure
//! numeric/time shims, and the cross-module inference bridge. Nothing here
//! has side effects outside the call except the log sink.

use crate::marshal;
use cortex_types::{CortexResult, ModuleKind};
use std::sync::Arc;
use wasmtime::{Caller, Linker};

/// Reaches the live model instance from inside an agent-core host call.
///
/// Implemented by the orchestrator's shared model slot so that a hot swap
/// is immediately visible to the guest without re-linking.
pub trait InferenceBridge: Send + Sync {
    /// Run one inference. `input` and `context` are the JSON strings the
    /// guest passed; the return value is the model's JSON response string.
    fn run_inference(&self, input: &str, context: &str) -> CortexResult<String>;
}

/// State carried in each module's Store, accessible to host functions.
pub struct HostState {
    /// Which role this instance plays (log attribution).
    pub kind: ModuleKind,
    /// Instance label (agent id or model type) for log attribution.
    pub label: String,
    /// Inference bridge; `None` disables cross-module communication.
    pub bridge: Option<Arc<dyn InferenceBridge>>,
}

impl HostState {
    /// State with no bridge (model instances, or comm disabled).
    pub fn new(kind: ModuleKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            bridge: None,
        }
    }

    /// State with the inference bridge attached.
    pub fn with_bridge(
        kind: ModuleKind,
        label: impl Into<String>,
        bridge: Arc<dyn InferenceBridge>,
    ) -> Self {
        Self {
            kind,
            label: label.into(),
            bridge: Some(bridge),
        }
    }
}

/// Read `len` bytes at `ptr` from the caller's exported memory.
fn read_guest_bytes(
    caller: &mut Caller<'_, HostState>,
    ptr: i32,
    len: i32,
) -> Result<Vec<u8>, anyhow::Error> {
    let memory = caller
        .get_export("memory")
        .and_then(|e| e.into_memory())
        .ok_or_else(|| anyhow::anyhow!("no memory export"))?;
    let data = memory.data(&caller);
    let start = ptr as u32 as usize;
    let end = start + len as u32 as usize;
    if end > data.len() {
        anyhow::bail!("guest pointer out of bounds ({start}..{end} > {})", data.len());
    }
    Ok(data[start..end].to_vec())
}

/// Allocate in the caller via its `allocateString` export, write `bytes`,
/// and return the packed `(ptr, len)` pair.
fn write_guest_bytes(
    caller: &mut Caller<'_, HostState>,
    bytes: &[u8],
) -> Result<i64, anyhow::Error> {
    let alloc = caller
        .get_export("allocateString")
        .and_then(|e| e.into_func())
        .ok_or_else(|| anyhow::anyhow!("no allocateString export"))?;
    let alloc = alloc.typed::<i32, i32>(&caller)?;
    let len = bytes.len() as i32;
    let ptr = alloc.call(&mut *caller, len)?;

    let memory = caller
        .get_export("memory")
        .and_then(|e| e.into_memory())
        .ok_or_else(|| anyhow::anyhow!("no memory export"))?;
    let data = memory.data_mut(&mut *caller);
    let start = ptr as u32 as usize;
    let end = start + bytes.len();
    if end > data.len() {
        anyhow::bail!("allocateString returned out-of-bounds pointer");
    }
    data[start..end].copy_from_slice(bytes);
    Ok(marshal::pack(ptr, len))
}

/// Register the fixed import surface on the linker.
pub fn register(linker: &mut Linker<HostState>) -> Result<(), anyhow::Error> {
    // log: forward decoded UTF-8 slices to the host log sink.
    linker.func_wrap(
        "env",
        "log",
        |mut caller: Caller<'_, HostState>,
         level: i32,
         ptr: i32,
         len: i32|
         -> Result<(), anyhow::Error> {
            let bytes = read_guest_bytes(&mut caller, ptr, len)?;
            let msg = String::from_utf8_lossy(&bytes);
            let module = caller.data().kind;
            let label = &caller.data().label;
            match level {
                0 => tracing::trace!(module = %module, instance = %label, "[guest] {msg}"),
                1 => tracing::debug!(module = %module, instance = %label, "[guest] {msg}"),
                2 => tracing::info!(module = %module, instance = %label, "[guest] {msg}"),
                3 => tracing::warn!(module = %module, instance = %label, "[guest] {msg}"),
                _ => tracing::error!(module = %module, instance = %label, "[guest] {msg}"),
            }
            Ok(())
        },
    )?;

    // abort: convert a module-reported abort into a structured trap. The
    // returned error unwinds the in-flight call as a RuntimeTrap.
    linker.func_wrap(
        "env",
        "abort",
        |mut caller: Caller<'_, HostState>,
         msg_ptr: i32,
         msg_len: i32,
         line: i32,
         col: i32|
         -> Result<(), anyhow::Error> {
            let msg = match read_guest_bytes(&mut caller, msg_ptr, msg_len) {
                Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Err(_) => "<unreadable abort message>".to_string(),
            };
            let module = caller.data().kind;
            tracing::error!(module = %module, line, col, "guest abort: {msg}");
            anyhow::bail!("guest abort at {line}:{col}: {msg}")
        },
    )?;

    // time_now: unix milliseconds. Pure shim, no side effects.
    linker.func_wrap("env", "time_now", || -> i64 {
        chrono::Utc::now().timestamp_millis()
    })?;

    // random: uniform in [0, 1).
    linker.func_wrap("env", "random", || -> f64 { rand::random::<f64>() })?;

    // model_infer: the cross-module bridge. Bridge failures are answered
    // as domain-error envelopes, never as traps, so the guest can decide
    // how to degrade.
    linker.func_wrap(
        "env",
        "model_infer",
        |mut caller: Caller<'_, HostState>,
         input_ptr: i32,
         input_len: i32,
         ctx_ptr: i32,
         ctx_len: i32|
         -> Result<i64, anyhow::Error> {
            let input_bytes = read_guest_bytes(&mut caller, input_ptr, input_len)?;
            let ctx_bytes = read_guest_bytes(&mut caller, ctx_ptr, ctx_len)?;
            let input = String::from_utf8_lossy(&input_bytes).into_owned();
            let context = String::from_utf8_lossy(&ctx_bytes).into_owned();

            let response = match caller.data().bridge.clone() {
                Some(bridge) => match bridge.run_inference(&input, &context) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!(error = %e, "model_infer bridge call failed");
                        serde_json::json!({
                            "success": false,
                            "error": format!("Model inference failed: {e}"),
                        })
                        .to_string()
                    }
                },
                None => serde_json::json!({
                    "success": false,
                    "error": "Model unavailable: cross-module communication is disabled",
                })
                .to_string(),
            };

            write_guest_bytes(&mut caller, response.as_bytes())
        },
    )?;

    Ok(())
}
