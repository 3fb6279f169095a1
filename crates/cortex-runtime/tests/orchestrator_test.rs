//! End-to-end tests of the orchestrator against WAT modules implementing
//! the full agent-core and model ABIs.

use cortex_runtime::{
    AgentCoreInterface, CallOutcome, ModuleBinarySource, Orchestrator, OrchestratorState,
    StaticBinarySource,
};
use cortex_types::{
    CortexError, CortexResult, LoraAdapter, ModelConfig, ModelType, ModuleKind,
    OrchestrationConfig, SensoryInput,
};
use cortex_wasm::{HostState, ModuleLoader};
use std::sync::Arc;
use std::time::Duration;

/// Agent-core module with canned JSON responses.
const AGENT_WAT: &str = r#"
    (module
        (memory (export "memory") 1)
        (global $bump (mut i32) (i32.const 4096))

        ;; {"success":true,"result":{"echo":"processed"},"confidence":0.9}
        (data (i32.const 64) "{\22success\22:true,\22result\22:{\22echo\22:\22processed\22},\22confidence\22:0.9}")
        ;; {"success":true,"result":"tool ok"}
        (data (i32.const 192) "{\22success\22:true,\22result\22:\22tool ok\22}")
        ;; {"agentId":"wat-agent","initialized":true}
        (data (i32.const 256) "{\22agentId\22:\22wat-agent\22,\22initialized\22:true}")
        ;; 1.0.0
        (data (i32.const 320) "1.0.0")
        ;; ["execute","tools"]
        (data (i32.const 336) "[\22execute\22,\22tools\22]")

        (func $pack (param $ptr i32) (param $len i32) (result i64)
            (i64.or
                (i64.shl (i64.extend_i32_u (local.get $ptr)) (i64.const 32))
                (i64.extend_i32_u (local.get $len))
            )
        )

        (func (export "allocateString") (param $size i32) (result i32)
            (local $ptr i32)
            (local.set $ptr (global.get $bump))
            (global.set $bump (i32.add (global.get $bump) (local.get $size)))
            (local.get $ptr)
        )
        (func (export "deallocateString") (param $ptr i32) (param $len i32))
        (func (export "init"))

        (func (export "create") (param i32 i32) (result i32) (i32.const 1))
        (func (export "initialize") (result i32) (i32.const 1))
        (func (export "execute") (param i32 i32 i32 i32) (result i64)
            (call $pack (i32.const 64) (i32.const 63))
        )
        (func (export "executeTool") (param i32 i32 i32 i32 i32 i32) (result i64)
            (call $pack (i32.const 192) (i32.const 35))
        )
        (func (export "loadAdapter") (param i32 i32) (result i32) (i32.const 1))
        (func (export "getStatus") (result i64)
            (call $pack (i32.const 256) (i32.const 42))
        )
        (func (export "getVersion") (result i64)
            (call $pack (i32.const 320) (i32.const 5))
        )
        (func (export "getSupportedFeatures") (result i64)
            (call $pack (i32.const 336) (i32.const 19))
        )
    )
"#;

/// Agent-core whose `execute` forwards to the model through `model_infer`.
const PROXY_AGENT_WAT: &str = r#"
    (module
        (import "env" "model_infer" (func $model_infer (param i32 i32 i32 i32) (result i64)))
        (memory (export "memory") 2)
        (global $bump (mut i32) (i32.const 4096))

        (data (i32.const 320) "1.0.0")
        (data (i32.const 336) "[\22execute\22,\22tools\22]")
        (data (i32.const 256) "{\22agentId\22:\22proxy\22,\22initialized\22:true}")

        (func $pack (param $ptr i32) (param $len i32) (result i64)
            (i64.or
                (i64.shl (i64.extend_i32_u (local.get $ptr)) (i64.const 32))
                (i64.extend_i32_u (local.get $len))
            )
        )

        (func (export "allocateString") (param $size i32) (result i32)
            (local $ptr i32)
            (local.set $ptr (global.get $bump))
            (global.set $bump (i32.add (global.get $bump) (local.get $size)))
            (local.get $ptr)
        )
        (func (export "deallocateString") (param $ptr i32) (param $len i32))

        (func (export "create") (param i32 i32) (result i32) (i32.const 1))
        (func (export "initialize") (result i32) (i32.const 1))
        (func (export "execute") (param $iptr i32) (param $ilen i32) (param $cptr i32) (param $clen i32) (result i64)
            (call $model_infer
                (local.get $iptr) (local.get $ilen)
                (local.get $cptr) (local.get $clen))
        )
        (func (export "executeTool") (param i32 i32 i32 i32 i32 i32) (result i64)
            (call $pack (i32.const 256) (i32.const 38))
        )
        (func (export "loadAdapter") (param i32 i32) (result i32) (i32.const 1))
        (func (export "getStatus") (result i64)
            (call $pack (i32.const 256) (i32.const 38))
        )
        (func (export "getVersion") (result i64)
            (call $pack (i32.const 320) (i32.const 5))
        )
        (func (export "getSupportedFeatures") (result i64)
            (call $pack (i32.const 336) (i32.const 19))
        )
    )
"#;

/// Agent-core whose `execute` traps.
const TRAPPING_AGENT_WAT: &str = r#"
    (module
        (memory (export "memory") 1)
        (global $bump (mut i32) (i32.const 4096))
        (data (i32.const 320) "1.0.0")
        (data (i32.const 336) "[\22execute\22,\22tools\22]")

        (func $pack (param $ptr i32) (param $len i32) (result i64)
            (i64.or
                (i64.shl (i64.extend_i32_u (local.get $ptr)) (i64.const 32))
                (i64.extend_i32_u (local.get $len))
            )
        )
        (func (export "allocateString") (param $size i32) (result i32)
            (local $ptr i32)
            (local.set $ptr (global.get $bump))
            (global.set $bump (i32.add (global.get $bump) (local.get $size)))
            (local.get $ptr)
        )
        (func (export "deallocateString") (param $ptr i32) (param $len i32))
        (func (export "create") (param i32 i32) (result i32) (i32.const 1))
        (func (export "initialize") (result i32) (i32.const 1))
        (func (export "execute") (param i32 i32 i32 i32) (result i64)
            unreachable
        )
        (func (export "executeTool") (param i32 i32 i32 i32 i32 i32) (result i64)
            unreachable
        )
        (func (export "loadAdapter") (param i32 i32) (result i32) (i32.const 1))
        (func (export "getStatus") (result i64)
            (call $pack (i32.const 320) (i32.const 5))
        )
        (func (export "getVersion") (result i64)
            (call $pack (i32.const 320) (i32.const 5))
        )
        (func (export "getSupportedFeatures") (result i64)
            (call $pack (i32.const 336) (i32.const 19))
        )
    )
"#;

/// Agent-core whose `execute` spins long enough to outlive a short
/// advisory timeout, then returns normally.
const SLOW_AGENT_WAT: &str = r#"
    (module
        (memory (export "memory") 1)
        (global $bump (mut i32) (i32.const 4096))
        (data (i32.const 64) "{\22success\22:true,\22result\22:{\22echo\22:\22processed\22},\22confidence\22:0.9}")
        (data (i32.const 320) "1.0.0")
        (data (i32.const 336) "[\22execute\22,\22tools\22]")

        (func $pack (param $ptr i32) (param $len i32) (result i64)
            (i64.or
                (i64.shl (i64.extend_i32_u (local.get $ptr)) (i64.const 32))
                (i64.extend_i32_u (local.get $len))
            )
        )
        (func (export "allocateString") (param $size i32) (result i32)
            (local $ptr i32)
            (local.set $ptr (global.get $bump))
            (global.set $bump (i32.add (global.get $bump) (local.get $size)))
            (local.get $ptr)
        )
        (func (export "deallocateString") (param $ptr i32) (param $len i32))
        (func (export "create") (param i32 i32) (result i32) (i32.const 1))
        (func (export "initialize") (result i32) (i32.const 1))
        (func (export "execute") (param i32 i32 i32 i32) (result i64)
            (local $i i64)
            (local.set $i (i64.const 1500000000))
            (block $done
                (loop $spin
                    (br_if $done (i64.eqz (local.get $i)))
                    (local.set $i (i64.sub (local.get $i) (i64.const 1)))
                    (br $spin)
                )
            )
            (call $pack (i32.const 64) (i32.const 63))
        )
        (func (export "executeTool") (param i32 i32 i32 i32 i32 i32) (result i64)
            (call $pack (i32.const 64) (i32.const 63))
        )
        (func (export "loadAdapter") (param i32 i32) (result i32) (i32.const 1))
        (func (export "getStatus") (result i64)
            (call $pack (i32.const 320) (i32.const 5))
        )
        (func (export "getVersion") (result i64)
            (call $pack (i32.const 320) (i32.const 5))
        )
        (func (export "getSupportedFeatures") (result i64)
            (call $pack (i32.const 336) (i32.const 19))
        )
    )
"#;

/// Model module with canned inference output.
const MODEL_WAT: &str = r#"
    (module
        (memory (export "memory") 1)
        (global $bump (mut i32) (i32.const 4096))
        (global $loaded (mut i32) (i32.const 0))

        ;; {"success":true,"result":"model inference ok"}
        (data (i32.const 64) "{\22success\22:true,\22result\22:\22model inference ok\22}")
        ;; {"modelType":"hrm","loaded":true}
        (data (i32.const 192) "{\22modelType\22:\22hrm\22,\22loaded\22:true}")

        (func $pack (param $ptr i32) (param $len i32) (result i64)
            (i64.or
                (i64.shl (i64.extend_i32_u (local.get $ptr)) (i64.const 32))
                (i64.extend_i32_u (local.get $len))
            )
        )
        (func (export "allocateString") (param $size i32) (result i32)
            (local $ptr i32)
            (local.set $ptr (global.get $bump))
            (global.set $bump (i32.add (global.get $bump) (local.get $size)))
            (local.get $ptr)
        )
        (func (export "deallocateString") (param $ptr i32) (param $len i32))

        (func (export "create") (param i32 i32) (result i32) (i32.const 1))
        (func (export "loadWeights") (param $ptr i32) (param $len i32) (result i32)
            (if (i32.gt_s (local.get $len) (i32.const 0))
                (then (global.set $loaded (i32.const 1)))
            )
            (global.get $loaded)
        )
        (func (export "runInference") (param i32 i32 i32 i32) (result i64)
            (call $pack (i32.const 64) (i32.const 46))
        )
        (func (export "getInfo") (result i64)
            (call $pack (i32.const 192) (i32.const 33))
        )
    )
"#;

/// Wraps another source and delays every fetch, to widen the window
/// between starting a load and its completion.
struct SlowSource {
    inner: StaticBinarySource,
    delay: Duration,
}

#[async_trait::async_trait]
impl ModuleBinarySource for SlowSource {
    async fn agent_core(&self) -> CortexResult<Vec<u8>> {
        tokio::time::sleep(self.delay).await;
        self.inner.agent_core().await
    }

    async fn model(&self, model_type: ModelType) -> CortexResult<Vec<u8>> {
        tokio::time::sleep(self.delay).await;
        self.inner.model(model_type).await
    }

    async fn model_weights(&self, model_type: ModelType) -> CortexResult<Vec<u8>> {
        tokio::time::sleep(self.delay).await;
        self.inner.model_weights(model_type).await
    }
}

fn full_source(agent_wat: &str) -> Arc<dyn ModuleBinarySource> {
    Arc::new(
        StaticBinarySource::new()
            .with_agent_core(agent_wat.as_bytes())
            .with_model(ModelType::Hrm, MODEL_WAT.as_bytes(), vec![1u8; 32]),
    )
}

async fn ready_orchestrator(agent_wat: &str, config: OrchestrationConfig) -> Orchestrator {
    let orch = Orchestrator::new(config, full_source(agent_wat)).unwrap();
    orch.initialize().await.unwrap();
    assert_eq!(orch.state(), OrchestratorState::Ready);
    orch
}

fn adapter(rank: u32, a_len: usize, b_len: usize) -> LoraAdapter {
    LoraAdapter {
        skill_id: "skill-nav".into(),
        skill_name: "Navigation".into(),
        weights_a: vec![0.5; a_len],
        weights_b: vec![0.25; b_len],
        rank,
        alpha: 16.0,
    }
}

#[tokio::test]
async fn initialize_reaches_ready_with_module_info() {
    let orch = ready_orchestrator(AGENT_WAT, OrchestrationConfig::default()).await;

    let info = orch.get_module_info();
    assert_eq!(info.state, "ready");
    let agent = info.agent_core.unwrap();
    assert_eq!(agent.kind, ModuleKind::AgentCore);
    assert!(agent.loaded && agent.initialized);
    assert!(agent.memory_size_bytes >= 65536);
    let model = info.model.unwrap();
    assert!(model.loaded && model.initialized);
    assert_eq!(info.active_model.model_type, ModelType::Hrm);
    assert_eq!(info.agent_version.as_deref(), Some("1.0.0"));
    assert_eq!(info.supported_features, vec!["execute", "tools"]);
    assert!(info.warnings.is_empty());
}

#[tokio::test]
async fn execute_before_initialize_returns_failure_envelope() {
    // Interface-level guard: the module is never reached.
    let loader = ModuleLoader::new().unwrap();
    let module = loader
        .compile_and_instantiate(
            AGENT_WAT.as_bytes(),
            HostState::new(ModuleKind::AgentCore, "guard-test"),
        )
        .unwrap();
    let mut agent = AgentCoreInterface::new(module).unwrap();
    agent.create("guard-test").unwrap();

    let response = agent
        .execute(&SensoryInput::text("hello", "s1"), &serde_json::json!({}))
        .unwrap();
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("Agent-core not initialized"));
    assert_eq!(response.source, "agent-core");

    // getStatus is a pure read, callable regardless of the guard.
    let status = agent.get_status().unwrap();
    assert_eq!(status["agentId"], "wat-agent");
}

#[tokio::test]
async fn process_before_initialize_is_rejected() {
    let orch = Orchestrator::new(OrchestrationConfig::default(), full_source(AGENT_WAT)).unwrap();
    let err = orch
        .process_sensory_input(SensoryInput::text("hello", "s1"))
        .await
        .unwrap_err();
    assert!(matches!(err, CortexError::InvalidState { .. }), "got: {err}");
}

#[tokio::test]
async fn sequential_executes_report_source_and_timing() {
    let orch = ready_orchestrator(AGENT_WAT, OrchestrationConfig::default()).await;

    for _ in 0..2 {
        let outcome = orch
            .process_sensory_input(SensoryInput::text("hello", "session-7"))
            .await
            .unwrap();
        let response = outcome.into_completed().unwrap();
        assert!(response.success);
        assert_eq!(response.source, "agent-core");
        assert!(response.processing_time_ms > 0.0);
        assert_eq!(response.confidence, Some(0.9));
    }
}

#[tokio::test]
async fn fallback_substituted_when_model_fetch_fails() {
    let source = Arc::new(StaticBinarySource::new().with_agent_core(AGENT_WAT.as_bytes()));
    let config = OrchestrationConfig {
        enable_model_fallback: true,
        ..Default::default()
    };
    let orch = Orchestrator::new(config, source).unwrap();
    orch.initialize().await.unwrap();

    assert_eq!(orch.state(), OrchestratorState::Ready);
    let info = orch.get_module_info();
    let model = info.model.unwrap();
    assert!(model.loaded, "fallback model must report loaded:true");
    assert!(model.initialized);
    assert_eq!(info.active_model.model_type, ModelType::Fallback);
    assert!(!info.warnings.is_empty());
}

#[tokio::test]
async fn missing_model_without_fallback_is_fatal() {
    let source = Arc::new(StaticBinarySource::new().with_agent_core(AGENT_WAT.as_bytes()));
    let config = OrchestrationConfig {
        enable_model_fallback: false,
        ..Default::default()
    };
    let orch = Orchestrator::new(config, source).unwrap();
    let err = orch.initialize().await.unwrap_err();
    assert!(matches!(err, CortexError::Fetch(_)), "got: {err}");
    assert_eq!(orch.state(), OrchestratorState::Uninitialized);
}

#[tokio::test]
async fn missing_agent_core_is_always_fatal() {
    let source =
        Arc::new(StaticBinarySource::new().with_model(
            ModelType::Hrm,
            MODEL_WAT.as_bytes(),
            vec![1u8; 32],
        ));
    let orch = Orchestrator::new(OrchestrationConfig::default(), source).unwrap();
    let err = orch.initialize().await.unwrap_err();
    assert!(matches!(err, CortexError::Fetch(_)), "got: {err}");
    assert_eq!(orch.state(), OrchestratorState::Uninitialized);
}

#[tokio::test]
async fn switch_model_replaces_instance() {
    let source = Arc::new(
        StaticBinarySource::new()
            .with_agent_core(AGENT_WAT.as_bytes())
            .with_model(ModelType::Hrm, MODEL_WAT.as_bytes(), vec![1u8; 32])
            .with_model(ModelType::Phi3Mini, MODEL_WAT.as_bytes(), vec![1u8; 32]),
    );
    let orch = Orchestrator::new(OrchestrationConfig::default(), source).unwrap();
    orch.initialize().await.unwrap();

    let new_config = ModelConfig {
        model_type: ModelType::Phi3Mini,
        ..Default::default()
    };
    orch.switch_model(new_config).await.unwrap();

    assert_eq!(orch.state(), OrchestratorState::Ready);
    let info = orch.get_module_info();
    assert_eq!(info.active_model.model_type, ModelType::Phi3Mini);
    assert!(info.model.unwrap().initialized);

    // Still functional after the swap.
    let outcome = orch
        .process_sensory_input(SensoryInput::text("post-switch", "s1"))
        .await
        .unwrap();
    assert!(outcome.into_completed().unwrap().success);
}

#[tokio::test]
async fn failed_switch_rolls_back_to_previous_model() {
    let orch = ready_orchestrator(AGENT_WAT, OrchestrationConfig::default()).await;

    // tiny-llama is a known type, but the byte source has no binary for it.
    let bad = ModelConfig {
        model_type: ModelType::TinyLlama,
        ..Default::default()
    };
    let err = orch.switch_model(bad).await.unwrap_err();
    assert!(matches!(err, CortexError::SwitchFailed { .. }), "got: {err}");

    assert_eq!(orch.state(), OrchestratorState::Ready);
    let info = orch.get_module_info();
    assert_eq!(info.active_model.model_type, ModelType::Hrm);
    let outcome = orch
        .process_sensory_input(SensoryInput::text("after rollback", "s1"))
        .await
        .unwrap();
    assert!(outcome.into_completed().unwrap().success);
}

#[tokio::test]
async fn adapter_shape_validated_host_side() {
    let orch = ready_orchestrator(AGENT_WAT, OrchestrationConfig::default()).await;

    assert!(orch.load_lora_adapter(adapter(8, 8, 8)).await.unwrap());
    let info = orch.get_module_info();
    let identity = info.last_adapter.unwrap();
    assert_eq!(identity.skill_id, "skill-nav");

    let err = orch.load_lora_adapter(adapter(8, 7, 8)).await.unwrap_err();
    assert!(
        matches!(err, CortexError::AdapterShapeMismatch(_)),
        "got: {err}"
    );
}

#[tokio::test]
async fn dispose_is_terminal_and_idempotent() {
    let orch = ready_orchestrator(AGENT_WAT, OrchestrationConfig::default()).await;
    orch.dispose().await;
    orch.dispose().await;

    assert_eq!(orch.state(), OrchestratorState::Disposed);
    let info = orch.get_module_info();
    assert!(info.agent_core.is_none());
    assert!(info.model.is_none());

    let err = orch
        .process_sensory_input(SensoryInput::text("too late", "s1"))
        .await
        .unwrap_err();
    assert!(matches!(err, CortexError::Disposed(_)), "got: {err}");

    let err = orch.switch_model(ModelConfig::default()).await.unwrap_err();
    assert!(matches!(err, CortexError::Disposed(_)), "got: {err}");

    let err = orch.initialize().await.unwrap_err();
    assert!(matches!(err, CortexError::Disposed(_)), "got: {err}");
}

#[tokio::test]
async fn dispose_during_initialize_stays_disposed() {
    let source = Arc::new(SlowSource {
        inner: StaticBinarySource::new()
            .with_agent_core(AGENT_WAT.as_bytes())
            .with_model(ModelType::Hrm, MODEL_WAT.as_bytes(), vec![1u8; 32]),
        delay: Duration::from_millis(300),
    });
    let orch = Arc::new(Orchestrator::new(OrchestrationConfig::default(), source).unwrap());

    let init = {
        let orch = orch.clone();
        tokio::spawn(async move { orch.initialize().await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    orch.dispose().await;

    let result = init.await.unwrap();
    assert!(matches!(result, Err(CortexError::Disposed(_))), "got: {result:?}");
    assert_eq!(orch.state(), OrchestratorState::Disposed);
    let info = orch.get_module_info();
    assert!(info.agent_core.is_none());
    assert!(info.model.is_none());
}

#[tokio::test]
async fn dispose_during_switch_leaves_no_instances() {
    let source = Arc::new(SlowSource {
        inner: StaticBinarySource::new()
            .with_agent_core(AGENT_WAT.as_bytes())
            .with_model(ModelType::Hrm, MODEL_WAT.as_bytes(), vec![1u8; 32])
            .with_model(ModelType::Phi3Mini, MODEL_WAT.as_bytes(), vec![1u8; 32]),
        delay: Duration::from_millis(200),
    });
    let orch = Arc::new(Orchestrator::new(OrchestrationConfig::default(), source).unwrap());
    orch.initialize().await.unwrap();

    let switch = {
        let orch = orch.clone();
        let config = ModelConfig {
            model_type: ModelType::Phi3Mini,
            ..Default::default()
        };
        tokio::spawn(async move { orch.switch_model(config).await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;
    orch.dispose().await;

    let result = switch.await.unwrap();
    assert!(matches!(result, Err(CortexError::Disposed(_))), "got: {result:?}");
    assert_eq!(orch.state(), OrchestratorState::Disposed);
    assert!(orch.get_module_info().model.is_none());
}

#[tokio::test]
async fn concurrent_submissions_complete_or_backpressure() {
    let config = OrchestrationConfig {
        max_concurrent_inferences: 1,
        ..Default::default()
    };
    let orch = ready_orchestrator(AGENT_WAT, config).await;

    let futures: Vec<_> = (0..8)
        .map(|i| orch.process_sensory_input(SensoryInput::text(format!("msg {i}"), "s1")))
        .collect();
    let results = futures::future::join_all(futures).await;

    for result in results {
        match result {
            Ok(CallOutcome::Completed(response)) => assert!(response.success),
            Ok(CallOutcome::TimedOut { .. }) => panic!("unexpected timeout"),
            Err(CortexError::Backpressure { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}

#[tokio::test]
async fn cross_module_inference_reaches_model() {
    let orch = ready_orchestrator(PROXY_AGENT_WAT, OrchestrationConfig::default()).await;

    let outcome = orch
        .process_sensory_input(SensoryInput::text("infer this", "s1"))
        .await
        .unwrap();
    let response = outcome.into_completed().unwrap();
    assert!(response.success);
    assert_eq!(
        response.result.unwrap().as_str().unwrap(),
        "model inference ok"
    );
    // The host stamps the source even for delegated calls.
    assert_eq!(response.source, "agent-core");
}

#[tokio::test]
async fn cross_module_reaches_fallback_after_substitution() {
    let source = Arc::new(StaticBinarySource::new().with_agent_core(PROXY_AGENT_WAT.as_bytes()));
    let orch = Orchestrator::new(OrchestrationConfig::default(), source).unwrap();
    orch.initialize().await.unwrap();

    let outcome = orch
        .process_sensory_input(SensoryInput::text("infer this", "s1"))
        .await
        .unwrap();
    let response = outcome.into_completed().unwrap();
    assert!(response.success);
    assert!(response
        .result
        .unwrap()
        .as_str()
        .unwrap()
        .contains("fallback model response"));
}

#[tokio::test]
async fn trap_is_classified_when_cross_module_enabled() {
    let orch = ready_orchestrator(TRAPPING_AGENT_WAT, OrchestrationConfig::default()).await;
    let err = orch
        .process_sensory_input(SensoryInput::text("boom", "s1"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, CortexError::ModelInferenceFailed(_)),
        "got: {err}"
    );

    // The instance survives the trap.
    assert_eq!(orch.state(), OrchestratorState::Ready);
}

#[tokio::test]
async fn tool_trap_is_not_classified_as_inference_failure() {
    // Only `execute` delegates to the model; a trap inside a tool call
    // stays a raw trap even with cross-module comm on.
    let orch = ready_orchestrator(TRAPPING_AGENT_WAT, OrchestrationConfig::default()).await;
    let err = orch
        .execute_tool("navigate", serde_json::json!({}), serde_json::json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, CortexError::RuntimeTrap(_)), "got: {err}");
}

#[tokio::test]
async fn trap_is_raw_when_cross_module_disabled() {
    let config = OrchestrationConfig {
        enable_cross_module_comm: false,
        ..Default::default()
    };
    let orch = ready_orchestrator(TRAPPING_AGENT_WAT, config).await;
    let err = orch
        .process_sensory_input(SensoryInput::text("boom", "s1"))
        .await
        .unwrap_err();
    assert!(matches!(err, CortexError::RuntimeTrap(_)), "got: {err}");
}

#[tokio::test]
async fn advisory_timeout_leaves_call_running() {
    let config = OrchestrationConfig {
        timeout_ms: 100,
        ..Default::default()
    };
    let orch = ready_orchestrator(SLOW_AGENT_WAT, config).await;

    let outcome = orch
        .process_sensory_input(SensoryInput::text("slow", "s1"))
        .await
        .unwrap();
    match outcome {
        CallOutcome::TimedOut { timeout_ms } => assert_eq!(timeout_ms, 100),
        CallOutcome::Completed(_) => panic!("expected advisory timeout"),
    }

    // Dispose waits for the background call before tearing down memory.
    orch.dispose().await;
    assert_eq!(orch.state(), OrchestratorState::Disposed);

    // The discarded late result lands in the warning ledger. The watcher
    // task races dispose's return, so poll briefly.
    let mut warnings = orch.warnings();
    for _ in 0..50 {
        if !warnings.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        warnings = orch.warnings();
    }
    assert!(
        warnings.iter().any(|w| w.contains("discarded")),
        "missing late-result warning: {warnings:?}"
    );
}

#[tokio::test]
async fn execute_tool_roundtrip() {
    let orch = ready_orchestrator(AGENT_WAT, OrchestrationConfig::default()).await;
    let outcome = orch
        .execute_tool("navigate", serde_json::json!({"to": "dock"}), serde_json::json!({}))
        .await
        .unwrap();
    let payload = outcome.into_completed().unwrap();
    assert_eq!(payload["success"], true);
    assert_eq!(payload["result"], "tool ok");
}
