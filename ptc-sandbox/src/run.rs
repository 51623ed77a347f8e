//! Runs one `parse ∘ analyze ∘ eval ∘ memory_contract` pipeline under
//! a wall-clock timeout and a memory-footprint ceiling.
//!
//! The evaluator's value graph (`Value`, `Env`, `Memory`) is
//! `Arc`-linked, so it is `Send` and can cross a thread boundary
//! intact — a closure stored in memory keeps its captured environment
//! across the run, which is what lets it survive into the next turn.
//! The run still executes on a dedicated `std::thread` rather than
//! `tokio::task::spawn_blocking`, since evaluation is synchronous,
//! CPU-bound, and must not occupy one of the async runtime's worker
//! threads; this is the "separate OS-level process/thread under which
//! the timeout is a hard deadline" alternative the design allows for.
//! On timeout the shared cancellation flag is flipped so a
//! still-running thread stops at its next call/loop boundary even
//! though the sandbox has already returned to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ptc_analyzer::analyze;
use ptc_runtime::{apply_contract, eval_ast, root_env, to_json, Ctx, EvalCtx, Memory, ToolTable, Value};
use ptc_syntax::parse_program;

use crate::config::SandboxConfig;
use crate::error::SandboxError;
use crate::outcome::SandboxOutcome;

/// Runs `source` once against `ctx`/`memory` with access to `tools`,
/// bounded by `config`. `recent_results` seeds `*1`/`*2`/`*3` (most
/// recent first) into the root environment, the way the language
/// reference binds the last few successful turns' values.
pub async fn run(
    source: &str,
    ctx: Ctx,
    memory: Memory,
    tools: Arc<dyn ToolTable + Send + Sync>,
    recent_results: Vec<Value>,
    config: SandboxConfig,
) -> Result<SandboxOutcome, SandboxError> {
    let source = source.to_string();
    let cancelled = Arc::new(AtomicBool::new(false));
    let worker_cancelled = cancelled.clone();

    let (tx, rx) = tokio::sync::oneshot::channel::<Result<SandboxOutcome, SandboxError>>();

    std::thread::spawn(move || {
        let outcome = run_blocking(
            &source,
            ctx,
            memory,
            tools,
            recent_results,
            worker_cancelled,
            config.memory_limit_bytes,
        );
        let _ = tx.send(outcome);
    });

    let timeout = std::time::Duration::from_millis(config.timeout_ms);
    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(_)) => Err(SandboxError::WorkerLost("worker thread dropped its result sender".to_string())),
        Err(_elapsed) => {
            cancelled.store(true, Ordering::Relaxed);
            Err(SandboxError::Timeout { limit_ms: config.timeout_ms })
        }
    }
}

fn run_blocking(
    source: &str,
    ctx: Ctx,
    memory: Memory,
    tools: Arc<dyn ToolTable + Send + Sync>,
    recent_results: Vec<Value>,
    cancelled: Arc<AtomicBool>,
    memory_limit_bytes: usize,
) -> Result<SandboxOutcome, SandboxError> {
    let forms = parse_program(source).map_err(|e| SandboxError::Parse(e.to_string()))?;
    let ast = analyze(&forms).map_err(|e| SandboxError::Analyze(e.to_string()))?;

    let eval_ctx = EvalCtx::new(ctx, tools, cancelled);
    let env = root_env();
    let env = env.bind_many(
        recent_results
            .into_iter()
            .enumerate()
            .map(|(i, v)| (format!("*{}", i + 1), v))
            .collect(),
    );

    let (value, memory) = eval_ast(&eval_ctx, &ast, memory, &env).map_err(|e| SandboxError::Eval(e.to_string()))?;
    let contract = apply_contract(value, &memory);

    let memory_json = to_json(&contract.memory.to_value());
    let observed_bytes = serde_json::to_vec(&memory_json).map(|b| b.len()).unwrap_or(0);
    if observed_bytes > memory_limit_bytes {
        return Err(SandboxError::MemoryLimitExceeded {
            limit_bytes: memory_limit_bytes,
            observed_bytes,
        });
    }

    Ok(SandboxOutcome {
        result: contract.result,
        memory: contract.memory,
        terminal: contract.terminal,
        prints: eval_ctx.prints.borrow().clone(),
        tool_calls: eval_ctx.tool_calls.borrow().clone(),
        steps_taken: eval_ctx.steps_taken(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptc_runtime::{NoTools, Value};

    fn no_tools() -> Arc<dyn ToolTable + Send + Sync> {
        Arc::new(NoTools)
    }

    #[tokio::test]
    async fn returns_the_result_and_folds_the_delta_into_memory() {
        let outcome = run(
            "(return {:result (+ 1 2) :seen true})",
            Ctx::default(),
            Memory::default(),
            no_tools(),
            vec![],
            SandboxConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.result, Value::Int(3));
        assert_eq!(outcome.memory.get("seen"), Value::Bool(true));
        assert_eq!(outcome.terminal, Some(true));
    }

    #[tokio::test]
    async fn reads_ctx_and_memory_from_the_caller() {
        let ctx = Ctx::new(vec![(Value::Keyword("base".into()), Value::Int(10))]);
        let memory = Memory::new(vec![(Value::Keyword("count".into()), Value::Int(5))]);
        let outcome = run(
            "(+ (ctx/base) (memory/count))",
            ctx,
            memory,
            no_tools(),
            vec![],
            SandboxConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.result, Value::Int(15));
    }

    #[tokio::test]
    async fn sort_by_key_fn_sees_the_real_memory() {
        let ctx = Ctx::default();
        let memory = Memory::new(vec![(Value::Keyword("offset".into()), Value::Int(10))]);
        let outcome = run(
            "(sort-by (fn [x] (+ (memory/offset) x)) [3 1 2])",
            ctx,
            memory,
            no_tools(),
            vec![],
            SandboxConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.result, Value::Vector(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
    }

    #[tokio::test]
    async fn sort_comparator_sees_the_real_memory() {
        let ctx = Ctx::default();
        let memory = Memory::new(vec![(Value::Keyword("flip".into()), Value::Bool(true))]);
        let outcome = run(
            "(sort (fn [a b] (if (memory/flip) (> a b) (< a b))) [3 1 2])",
            ctx,
            memory,
            no_tools(),
            vec![],
            SandboxConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.result, Value::Vector(vec![Value::Int(3), Value::Int(2), Value::Int(1)]));
    }

    #[tokio::test]
    async fn a_closure_stashed_in_memory_survives_the_run_intact() {
        let outcome = run(
            "{:result nil :adder (fn [x] (+ x 1))}",
            Ctx::default(),
            Memory::default(),
            no_tools(),
            vec![],
            SandboxConfig::default(),
        )
        .await
        .unwrap();
        let adder = outcome.memory.get("adder");
        assert!(matches!(adder, Value::Closure(_)));
    }

    #[tokio::test]
    async fn eval_errors_surface_as_sandbox_errors() {
        let err = run(
            "(undefined-symbol)",
            Ctx::default(),
            Memory::default(),
            no_tools(),
            vec![],
            SandboxConfig::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SandboxError::Eval(_)));
    }

    #[tokio::test]
    async fn recent_results_are_bound_as_star_vars() {
        let outcome = run(
            "(+ *1 *2)",
            Ctx::default(),
            Memory::default(),
            no_tools(),
            vec![Value::Int(10), Value::Int(1)],
            SandboxConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.result, Value::Int(11));
    }

    struct SlowTool;

    impl ToolTable for SlowTool {
        fn call(&self, _name: &str, _args: Value) -> Result<Value, String> {
            std::thread::sleep(std::time::Duration::from_millis(200));
            Ok(Value::Nil)
        }
    }

    #[tokio::test]
    async fn a_run_blocked_on_a_slow_tool_times_out() {
        let config = SandboxConfig {
            timeout_ms: 20,
            ..SandboxConfig::default()
        };
        let err = run(
            "(tool/wait {})",
            Ctx::default(),
            Memory::default(),
            Arc::new(SlowTool),
            vec![],
            config,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SandboxError::Timeout { limit_ms: 20 }));
    }

    #[tokio::test]
    async fn memory_over_the_ceiling_is_rejected() {
        let config = SandboxConfig {
            memory_limit_bytes: 8,
            ..SandboxConfig::default()
        };
        let err = run(
            "{:result nil :big \"this is a string longer than eight bytes\"}",
            Ctx::default(),
            Memory::default(),
            no_tools(),
            vec![],
            config,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SandboxError::MemoryLimitExceeded { .. }));
    }
}
