//! WASM module hosting for Cortex.
//!
//! Compiles raw binary modules (or WAT text) with Wasmtime, instantiates
//! them against a fixed import surface, and marshals all cross-boundary
//! values as UTF-8 strings copied through the guest's linear memory.
//!
//! # Guest ABI
//!
//! Every module must export:
//! - `memory` — linear memory
//! - `allocateString(len: i32) -> i32` — allocate `len` bytes, return pointer
//! - `deallocateString(ptr: i32, len: i32)` — release a returned buffer
//!
//! plus the operation exports of its role (agent-core or model). String
//! arguments are passed as `(ptr, len)` pairs written via `allocateString`;
//! string returns are a packed `i64` of `(ptr << 32) | len` that the host
//! decodes immediately and then frees with `deallocateString`. No pointer
//! is retained past a single call. An optional `init()` export runs as the
//! tail of instantiation.
//!
//! # Host ABI
//!
//! The host provides (in the `"env"` import module):
//! - `log(level: i32, ptr: i32, len: i32)` — forward to the host log sink
//! - `abort(msg_ptr: i32, msg_len: i32, line: i32, col: i32)` — trap with
//!   a structured message
//! - `time_now() -> i64` — unix milliseconds
//! - `random() -> f64` — uniform in [0, 1)
//! - `model_infer(input_ptr, input_len, ctx_ptr, ctx_len) -> i64` — the
//!   cross-module inference bridge

pub mod imports;
pub mod loader;
pub mod marshal;

pub use imports::{HostState, InferenceBridge};
pub use loader::{LoadedModule, ModuleLoader};
