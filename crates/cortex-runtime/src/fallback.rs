//! Built-in fallback model.
//!
//! Substituted when the default model cannot be fetched or instantiated
//! and fallback is enabled. Satisfies the full model ABI with canned
//! degraded-mode responses, so the orchestrator (and the agent-core's
//! `model_infer` import) keep a usable model instance.

/// Minimal model module embedded as WAT (wasmtime compiles WAT directly).
pub const FALLBACK_MODEL_WAT: &str = r#"
    (module
        (memory (export "memory") 1)
        (global $bump (mut i32) (i32.const 1024))
        (global $loaded (mut i32) (i32.const 0))

        ;; {"success":true,"result":"Degraded fallback model response","confidence":0.1}
        (data (i32.const 64) "{\22success\22:true,\22result\22:\22Degraded fallback model response\22,\22confidence\22:0.1}")
        ;; {"modelType":"fallback","loaded":true,"parameters":0}
        (data (i32.const 256) "{\22modelType\22:\22fallback\22,\22loaded\22:true,\22parameters\22:0}")

        (func (export "allocateString") (param $size i32) (result i32)
            (local $ptr i32)
            (local.set $ptr (global.get $bump))
            (global.set $bump (i32.add (global.get $bump) (local.get $size)))
            (local.get $ptr)
        )

        (func (export "deallocateString") (param $ptr i32) (param $len i32))

        (func (export "create") (param $ptr i32) (param $len i32) (result i32)
            (i32.const 1)
        )

        (func (export "loadWeights") (param $ptr i32) (param $len i32) (result i32)
            (if (i32.gt_s (local.get $len) (i32.const 0))
                (then (global.set $loaded (i32.const 1)))
            )
            (global.get $loaded)
        )

        (func (export "runInference")
            (param $iptr i32) (param $ilen i32) (param $cptr i32) (param $clen i32)
            (result i64)
            (i64.or
                (i64.shl (i64.const 64) (i64.const 32))
                (i64.const 77)
            )
        )

        (func (export "getInfo") (result i64)
            (i64.or
                (i64.shl (i64.const 256) (i64.const 32))
                (i64.const 53)
            )
        )
    )
"#;

/// Placeholder weight blob fed to the fallback module's `loadWeights`.
pub const FALLBACK_WEIGHTS: &[u8] = &[0u8; 64];
