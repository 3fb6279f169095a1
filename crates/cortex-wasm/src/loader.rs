//! Module loader — atomic compile + instantiate, and the typed call layer.
//!
//! Compilation and instantiation are one step from the caller's point of
//! view: partial success (compiled but not instantiated) is never observed
//! outside this module. Failures are never retried here; the caller decides
//! whether to fall back.

use crate::imports::{self, HostState};
use crate::marshal;
use cortex_types::{CortexError, CortexResult, ModuleKind};
use tracing::debug;
use wasmtime::{Config, Engine, Instance, Linker, Memory, Module, Store, TypedFunc};

/// The loader engine. Create one per orchestrator; the `Engine` is
/// expensive to build but compiles and instantiates many modules.
///
/// No fuel metering or epoch interruption is configured: module execution
/// is non-preemptible by contract, and timeouts are advisory host-side.
pub struct ModuleLoader {
    engine: Engine,
}

impl ModuleLoader {
    /// Create a new loader engine.
    pub fn new() -> CortexResult<Self> {
        let config = Config::new();
        let engine = Engine::new(&config).map_err(|e| CortexError::Compile(e.to_string()))?;
        Ok(Self { engine })
    }

    /// Compile raw module bytes (`.wasm` binary or `.wat` text) and
    /// instantiate against the fixed import surface. Atomic: on any error
    /// nothing is retained.
    pub fn compile_and_instantiate(
        &self,
        bytes: &[u8],
        state: HostState,
    ) -> CortexResult<LoadedModule> {
        let kind = state.kind;
        let label = state.label.clone();

        let module =
            Module::new(&self.engine, bytes).map_err(|e| CortexError::Compile(e.to_string()))?;

        let mut store = Store::new(&self.engine, state);

        let mut linker = Linker::new(&self.engine);
        imports::register(&mut linker).map_err(|e| CortexError::Link(e.to_string()))?;

        let instance = linker.instantiate(&mut store, &module).map_err(|e| {
            // A trap inside a start function is a runtime failure, not an
            // import-surface mismatch.
            if e.downcast_ref::<wasmtime::Trap>().is_some() {
                CortexError::RuntimeTrap(e.to_string())
            } else {
                CortexError::Link(e.to_string())
            }
        })?;

        let memory = instance
            .get_memory(&mut store, "memory")
            .ok_or_else(|| CortexError::Abi("module must export 'memory'".into()))?;

        let alloc = instance
            .get_typed_func::<i32, i32>(&mut store, "allocateString")
            .map_err(|e| {
                CortexError::Abi(format!("module must export 'allocateString(i32)->i32': {e}"))
            })?;

        let dealloc = instance
            .get_typed_func::<(i32, i32), ()>(&mut store, "deallocateString")
            .map_err(|e| {
                CortexError::Abi(format!(
                    "module must export 'deallocateString(i32,i32)': {e}"
                ))
            })?;

        let mut loaded = LoadedModule {
            store,
            instance,
            memory,
            alloc,
            dealloc,
            kind,
        };

        // Optional init export runs as the tail of instantiation; a trap
        // there fails the whole load.
        if let Some(init) = loaded.instance.get_func(&mut loaded.store, "init") {
            let init = init
                .typed::<(), ()>(&loaded.store)
                .map_err(|e| CortexError::Abi(format!("'init' has wrong signature: {e}")))?;
            init.call(&mut loaded.store, ())
                .map_err(|e| CortexError::RuntimeTrap(format!("init trapped: {e:#}")))?;
        }

        debug!(
            module = %kind,
            instance = %label,
            memory_bytes = loaded.memory_size_bytes(),
            "module instantiated"
        );
        Ok(loaded)
    }
}

/// One live, instantiated module. Owns its Store (and thus the linear
/// memory) exclusively; all boundary values are copied in and out.
pub struct LoadedModule {
    store: Store<HostState>,
    instance: Instance,
    memory: Memory,
    alloc: TypedFunc<i32, i32>,
    dealloc: TypedFunc<(i32, i32), ()>,
    kind: ModuleKind,
}

impl std::fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModule")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl LoadedModule {
    /// Which role this instance plays.
    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    /// Current linear memory size in bytes.
    pub fn memory_size_bytes(&self) -> u32 {
        self.memory.data_size(&self.store) as u32
    }

    /// Call a `(...string) -> bool` export. Each argument is copied into
    /// guest memory and passed as a `(ptr, len)` pair.
    pub fn call_bool(&mut self, name: &str, args: &[&str]) -> CortexResult<bool> {
        let mut flat = Vec::with_capacity(args.len() * 2);
        for arg in args {
            let (ptr, len) = self.write_bytes(arg.as_bytes())?;
            flat.push(ptr);
            flat.push(len);
        }
        Ok(self.call_flat_i32(name, &flat)? != 0)
    }

    /// Call a `(ptr, len) -> bool` export with a raw byte buffer (weight
    /// blobs and other non-string payloads).
    pub fn call_bool_bytes(&mut self, name: &str, bytes: &[u8]) -> CortexResult<bool> {
        let (ptr, len) = self.write_bytes(bytes)?;
        Ok(self.call_flat_i32(name, &[ptr, len])? != 0)
    }

    /// Call a `(...string) -> string` export. The packed return is decoded
    /// immediately and the guest buffer freed before this returns.
    pub fn call_string(&mut self, name: &str, args: &[&str]) -> CortexResult<String> {
        let mut flat = Vec::with_capacity(args.len() * 2);
        for arg in args {
            let (ptr, len) = self.write_bytes(arg.as_bytes())?;
            flat.push(ptr);
            flat.push(len);
        }
        let packed = self.call_flat_i64(name, &flat)?;
        self.read_and_free(packed)
    }

    /// Copy bytes into guest memory via `allocateString`.
    fn write_bytes(&mut self, bytes: &[u8]) -> CortexResult<(i32, i32)> {
        let len = bytes.len() as i32;
        let ptr = self
            .alloc
            .call(&mut self.store, len)
            .map_err(|e| CortexError::RuntimeTrap(format!("allocateString trapped: {e:#}")))?;

        let data = self.memory.data_mut(&mut self.store);
        let start = ptr as u32 as usize;
        let end = start + bytes.len();
        if end > data.len() {
            return Err(CortexError::Abi(
                "allocateString returned out-of-bounds pointer".into(),
            ));
        }
        data[start..end].copy_from_slice(bytes);
        Ok((ptr, len))
    }

    /// Decode a packed `(ptr, len)` string return, then ask the guest to
    /// free it. The pointer is never retained past this call.
    fn read_and_free(&mut self, packed: i64) -> CortexResult<String> {
        let (ptr, len) = marshal::unpack(packed);
        let data = self.memory.data(&self.store);
        if ptr + len > data.len() {
            return Err(CortexError::Abi(format!(
                "string return out of bounds ({ptr}..{} > {})",
                ptr + len,
                data.len()
            )));
        }
        let decoded = std::str::from_utf8(&data[ptr..ptr + len])
            .map_err(|e| CortexError::Abi(format!("non-UTF-8 string return: {e}")))?
            .to_string();

        self.dealloc
            .call(&mut self.store, (ptr as i32, len as i32))
            .map_err(|e| CortexError::RuntimeTrap(format!("deallocateString trapped: {e:#}")))?;

        Ok(decoded)
    }

    fn call_flat_i32(&mut self, name: &str, flat: &[i32]) -> CortexResult<i32> {
        let trap = |e: wasmtime::Error| CortexError::RuntimeTrap(format!("'{name}': {e:#}"));
        let abi = |e: wasmtime::Error| CortexError::Abi(format!("export '{name}': {e}"));
        match flat {
            [] => self
                .instance
                .get_typed_func::<(), i32>(&mut self.store, name)
                .map_err(abi)?
                .call(&mut self.store, ())
                .map_err(trap),
            [a, b] => self
                .instance
                .get_typed_func::<(i32, i32), i32>(&mut self.store, name)
                .map_err(abi)?
                .call(&mut self.store, (*a, *b))
                .map_err(trap),
            [a, b, c, d] => self
                .instance
                .get_typed_func::<(i32, i32, i32, i32), i32>(&mut self.store, name)
                .map_err(abi)?
                .call(&mut self.store, (*a, *b, *c, *d))
                .map_err(trap),
            [a, b, c, d, e, f] => self
                .instance
                .get_typed_func::<(i32, i32, i32, i32, i32, i32), i32>(&mut self.store, name)
                .map_err(abi)?
                .call(&mut self.store, (*a, *b, *c, *d, *e, *f))
                .map_err(trap),
            _ => Err(CortexError::Abi(format!(
                "unsupported arity {} for '{name}'",
                flat.len() / 2
            ))),
        }
    }

    fn call_flat_i64(&mut self, name: &str, flat: &[i32]) -> CortexResult<i64> {
        let trap = |e: wasmtime::Error| CortexError::RuntimeTrap(format!("'{name}': {e:#}"));
        let abi = |e: wasmtime::Error| CortexError::Abi(format!("export '{name}': {e}"));
        match flat {
            [] => self
                .instance
                .get_typed_func::<(), i64>(&mut self.store, name)
                .map_err(abi)?
                .call(&mut self.store, ())
                .map_err(trap),
            [a, b] => self
                .instance
                .get_typed_func::<(i32, i32), i64>(&mut self.store, name)
                .map_err(abi)?
                .call(&mut self.store, (*a, *b))
                .map_err(trap),
            [a, b, c, d] => self
                .instance
                .get_typed_func::<(i32, i32, i32, i32), i64>(&mut self.store, name)
                .map_err(abi)?
                .call(&mut self.store, (*a, *b, *c, *d))
                .map_err(trap),
            [a, b, c, d, e, f] => self
                .instance
                .get_typed_func::<(i32, i32, i32, i32, i32, i32), i64>(&mut self.store, name)
                .map_err(abi)?
                .call(&mut self.store, (*a, *b, *c, *d, *e, *f))
                .map_err(trap),
            _ => Err(CortexError::Abi(format!(
                "unsupported arity {} for '{name}'",
                flat.len() / 2
            ))),
        }
    }
}
