//! The turn-bounded state machine (C9): assembles a prompt via the
//! compression strategy, calls the LLM, runs the parsed program in the
//! sandbox, classifies what came back, and decides whether to
//! continue, retry, or terminate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ptc_context::{CompressionOptions, CompressionStrategy, SingleUserCoalesced, ToolDescriptor};
use ptc_protocol::{LlmRequest, Provider, TokenUsage};
use ptc_runtime::{to_json, Ctx, Memory, NoTools, ToolTable, Value};
use ptc_sandbox::SandboxConfig;
use ptc_turn::{TurnHistory, TurnType};

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::outcome::{AgentFailure, AgentOutcome, Usage};
use crate::parse::extract_program;
use crate::validate::{NoValidator, ReturnValidator};

/// Drives one PTC-Lisp agentic run to completion.
///
/// Generic over [`Provider`] rather than boxed behind a trait object:
/// there is exactly one loop implementation, so no object-safe
/// boundary is needed.
pub struct AgentLoop<P: Provider> {
    provider: P,
    config: AgentConfig,
    validator: Box<dyn ReturnValidator>,
}

impl<P: Provider> AgentLoop<P> {
    /// Builds a loop with no return-signature validation.
    pub fn new(provider: P, config: AgentConfig) -> Self {
        AgentLoop {
            provider,
            config,
            validator: Box::new(NoValidator),
        }
    }

    /// Attaches a return-signature validator.
    pub fn with_validator(mut self, validator: Box<dyn ReturnValidator>) -> Self {
        self.validator = validator;
        self
    }

    /// Runs a top-level agent (nesting depth 0) to completion.
    pub async fn run(
        &self,
        mission: Option<String>,
        system_prompt: impl Into<String>,
        ctx: Ctx,
        initial_memory: Memory,
        tools: Arc<dyn ToolTable + Send + Sync>,
        tool_descriptors: Vec<ToolDescriptor>,
    ) -> Result<AgentOutcome, AgentFailure> {
        self.run_nested(mission, system_prompt.into(), ctx, initial_memory, tools, tool_descriptors, 0, None)
            .await
    }

    /// Runs an agent at nesting level `depth`. A tool that is itself a
    /// configured agent calls this with `depth + 1` and, to thread its
    /// own dwindling turn budget down to the child, `Some(turns it has
    /// left)` as `parent_turns_remaining`; exceeding `max_depth`
    /// terminates immediately without consuming the parent's own turn
    /// budget. When `parent_turns_remaining` is the tighter of the two
    /// ceilings and the child would exceed it, the run fails with
    /// `:turn_budget_exhausted` rather than `:max_turns_exceeded` — the
    /// child's own `max_turns` was never the binding constraint.
    pub async fn run_nested(
        &self,
        mission: Option<String>,
        system_prompt: String,
        ctx: Ctx,
        initial_memory: Memory,
        tools: Arc<dyn ToolTable + Send + Sync>,
        tool_descriptors: Vec<ToolDescriptor>,
        depth: u32,
        parent_turns_remaining: Option<u32>,
    ) -> Result<AgentOutcome, AgentFailure> {
        if depth > self.config.max_depth {
            return Err(AgentFailure {
                reason: AgentError::MaxDepthExceeded,
                memory: initial_memory,
                turns: TurnHistory::new(),
                usage: Usage::default(),
            });
        }

        let start = Instant::now();
        let deadline = self.config.mission_timeout.map(|d| start + d);

        let mut history = TurnHistory::new();
        let mut memory = initial_memory;
        let mut memory_bytes_peak = measure(&memory);
        let mut tokens: Option<TokenUsage> = None;

        let mut turn_no: u32 = 0;
        let mut is_retry_phase = false;
        let mut retries_used: u32 = 0;
        let mut pending_validation_error: Option<String> = None;

        let no_tools: Arc<dyn ToolTable + Send + Sync> = Arc::new(NoTools);

        loop {
            if let Some(dl) = deadline {
                if Instant::now() >= dl {
                    return Err(self.failure(AgentError::MissionTimeout, history, memory, start, memory_bytes_peak, tokens));
                }
            }

            let (turn_type, turns_left, active_tools, active_descriptors) = if is_retry_phase {
                if retries_used >= self.config.return_retries {
                    return Err(self.failure(AgentError::BudgetExhausted, history, memory, start, memory_bytes_peak, tokens));
                }
                retries_used += 1;
                (TurnType::Retry, 1u32, no_tools.clone(), Vec::new())
            } else {
                turn_no += 1;
                let effective_max = match parent_turns_remaining {
                    Some(parent) => self.config.max_turns.min(parent),
                    None => self.config.max_turns,
                };
                if turn_no > effective_max {
                    let reason = if parent_turns_remaining.is_some_and(|parent| parent < self.config.max_turns) {
                        AgentError::TurnBudgetExhausted
                    } else {
                        AgentError::MaxTurnsExceeded
                    };
                    return Err(self.failure(reason, history, memory, start, memory_bytes_peak, tokens));
                }
                let turns_left = effective_max - turn_no + 1;
                let turn_type = if turns_left == 1 { TurnType::MustReturn } else { TurnType::Normal };
                (turn_type, turns_left, tools.clone(), tool_descriptors.clone())
            };

            let mut options = CompressionOptions::new(system_prompt.clone(), turns_left);
            options.mission = mission.clone();
            options.tools = active_descriptors.clone();
            options.data = render_ctx(&ctx);
            options.tool_call_limit = self.config.tool_call_limit;
            options.println_limit = self.config.println_limit;
            options.validation_error = pending_validation_error.take();

            let [system, user] = SingleUserCoalesced.compress(&history, &memory, &options);
            tracing::debug!(turn = turn_no, retry = is_retry_phase, turn_type = ?turn_type, "assembled turn context");

            let tool_names: Vec<String> = active_descriptors.iter().map(|t| t.name.clone()).collect();
            let raw_response = match self.call_llm(&system.content, &user.content, turn_no, tool_names).await {
                Ok(resp) => resp,
                Err(message) => {
                    return Err(self.failure(AgentError::LlmError(message), history, memory, start, memory_bytes_peak, tokens))
                }
            };
            if let Some(usage) = raw_response.tokens {
                let acc = tokens.get_or_insert_with(TokenUsage::default);
                acc.input += usage.input;
                acc.output += usage.output;
                acc.cache_creation += usage.cache_creation;
                acc.cache_read += usage.cache_read;
            }

            let Some(program) = extract_program(&raw_response.content) else {
                history.record_error(
                    None,
                    raw_response.content.clone(),
                    &ptc_sandbox::SandboxError::Parse("parse_error: no PTC-Lisp program found in response".to_string()),
                    memory.clone(),
                    turn_type,
                );
                tracing::warn!(turn = turn_no, "no program found in llm response");
                continue;
            };

            let sandbox_config = SandboxConfig {
                timeout_ms: self.config.timeout_ms,
                memory_limit_bytes: self.config.memory_limit_bytes,
            };
            let run_result = ptc_sandbox::run(
                &program,
                ctx.clone(),
                memory.clone(),
                active_tools.clone(),
                history.recent_results(),
                sandbox_config,
            )
            .await;

            match run_result {
                Err(err) => {
                    tracing::warn!(turn = turn_no, error = %err, "turn run failed");
                    history.record_error(Some(program), raw_response.content.clone(), &err, memory.clone(), turn_type);
                    continue;
                }
                Ok(outcome) => {
                    memory_bytes_peak = memory_bytes_peak.max(measure(&outcome.memory));
                    let terminal = outcome.terminal;
                    let turn = history.record_outcome(program, raw_response.content.clone(), outcome, turn_type);
                    let value = turn.value().cloned().unwrap_or(Value::Nil);
                    memory = turn.memory.clone();

                    match terminal {
                        None => continue,
                        Some(false) => {
                            let message = fail_message(&value);
                            return Err(self.failure(AgentError::Failed(message), history, memory, start, memory_bytes_peak, tokens));
                        }
                        Some(true) => match self.validator.validate(&value) {
                            Ok(()) => {
                                let usage = self.usage(start, memory_bytes_peak, &history, tokens);
                                return Ok(AgentOutcome {
                                    value,
                                    memory,
                                    turns: history,
                                    usage,
                                });
                            }
                            Err(message) => {
                                pending_validation_error = Some(message);
                                let past_normal_budget = is_retry_phase || turn_type == TurnType::MustReturn;
                                if past_normal_budget {
                                    if retries_used >= self.config.return_retries {
                                        return Err(self.failure(
                                            AgentError::BudgetExhausted,
                                            history,
                                            memory,
                                            start,
                                            memory_bytes_peak,
                                            tokens,
                                        ));
                                    }
                                    is_retry_phase = true;
                                }
                                continue;
                            }
                        },
                    }
                }
            }
        }
    }

    async fn call_llm(
        &self,
        system: &str,
        user: &str,
        turn: u32,
        tool_names: Vec<String>,
    ) -> Result<ptc_protocol::LlmResponse, String> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let request = LlmRequest {
                system: system.to_string(),
                messages: vec![ptc_protocol::Message::user(user.to_string())],
                turn,
                tool_names: tool_names.clone(),
                cache: false,
                llm_opts: serde_json::Value::Null,
            };
            match self.provider.complete(request).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    if attempt >= self.config.retry_policy.max_attempts || !err.is_retryable() {
                        return Err(err.to_string());
                    }
                    let delay = self.config.retry_policy.delay_for(attempt + 1);
                    tracing::warn!(attempt, error = %err, "retrying llm call");
                    if delay > Duration::ZERO {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    fn failure(
        &self,
        reason: AgentError,
        turns: TurnHistory,
        memory: Memory,
        start: Instant,
        memory_bytes_peak: usize,
        tokens: Option<TokenUsage>,
    ) -> AgentFailure {
        let usage = self.usage(start, memory_bytes_peak, &turns, tokens);
        AgentFailure {
            reason,
            memory,
            turns,
            usage,
        }
    }

    fn usage(&self, start: Instant, memory_bytes_peak: usize, turns: &TurnHistory, tokens: Option<TokenUsage>) -> Usage {
        Usage {
            duration_ms: start.elapsed().as_millis() as u64,
            memory_bytes_peak,
            turn_count: turns.len() as u32,
            tokens,
        }
    }
}

fn measure(memory: &Memory) -> usize {
    let json = to_json(&memory.to_value());
    serde_json::to_vec(&json).map(|b| b.len()).unwrap_or(0)
}

fn fail_message(value: &Value) -> String {
    match value {
        Value::Str(s) => s.clone(),
        other => to_json(other).to_string(),
    }
}

fn render_ctx(ctx: &Ctx) -> Vec<(String, Value)> {
    ctx.0
        .iter()
        .filter_map(|(k, v)| match k {
            Value::Keyword(s) | Value::Str(s) => Some((s.clone(), v.clone())),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptc_protocol::{LlmResponse, ProviderError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    struct ScriptedProvider {
        responses: Mutex<Vec<String>>,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<&str>) -> Self {
            ScriptedProvider {
                responses: Mutex::new(responses.into_iter().map(str::to_string).rev().collect()),
                calls: AtomicU32::new(0),
            }
        }
    }

    impl Provider for ScriptedProvider {
        async fn complete(&self, _request: LlmRequest) -> Result<LlmResponse, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let content = self
                .responses
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| "(return nil)".to_string());
            Ok(LlmResponse { content, tokens: None })
        }
    }

    fn no_tools() -> Arc<dyn ToolTable + Send + Sync> {
        Arc::new(NoTools)
    }

    #[tokio::test]
    async fn a_single_turn_return_completes_ok() {
        let provider = ScriptedProvider::new(vec!["(return 42)"]);
        let agent = AgentLoop::new(provider, AgentConfig::default());
        let outcome = agent
            .run(None, "be helpful", Ctx::default(), Memory::default(), no_tools(), vec![])
            .await
            .unwrap();
        assert_eq!(outcome.value, Value::Int(42));
        assert_eq!(outcome.turns.len(), 1);
    }

    #[tokio::test]
    async fn an_intermediate_value_continues_to_the_next_turn() {
        let provider = ScriptedProvider::new(vec!["{:result nil :seen true}", "(return (memory/seen))"]);
        let agent = AgentLoop::new(provider, AgentConfig::default());
        let outcome = agent
            .run(None, "be helpful", Ctx::default(), Memory::default(), no_tools(), vec![])
            .await
            .unwrap();
        assert_eq!(outcome.value, Value::Bool(true));
        assert_eq!(outcome.turns.len(), 2);
    }

    #[tokio::test]
    async fn explicit_fail_terminates_completed_fail() {
        let provider = ScriptedProvider::new(vec!["(fail \"nope\")"]);
        let agent = AgentLoop::new(provider, AgentConfig::default());
        let failure = agent
            .run(None, "be helpful", Ctx::default(), Memory::default(), no_tools(), vec![])
            .await
            .unwrap_err();
        assert!(matches!(failure.reason, AgentError::Failed(ref m) if m == "nope"));
    }

    #[tokio::test]
    async fn exhausting_max_turns_without_a_return_fails() {
        let provider = ScriptedProvider::new(vec!["{:result nil}", "{:result nil}"]);
        let config = AgentConfig {
            max_turns: 2,
            ..AgentConfig::default()
        };
        let agent = AgentLoop::new(provider, config);
        let failure = agent
            .run(None, "be helpful", Ctx::default(), Memory::default(), no_tools(), vec![])
            .await
            .unwrap_err();
        assert!(matches!(failure.reason, AgentError::MaxTurnsExceeded));
        assert_eq!(failure.turns.len(), 2);
    }

    #[tokio::test]
    async fn a_nested_run_past_max_depth_fails_without_running_a_turn() {
        let provider = ScriptedProvider::new(vec!["(return 1)"]);
        let config = AgentConfig {
            max_depth: 0,
            ..AgentConfig::default()
        };
        let agent = AgentLoop::new(provider, config);
        let failure = agent
            .run_nested(None, "be helpful".to_string(), Ctx::default(), Memory::default(), no_tools(), vec![], 1, None)
            .await
            .unwrap_err();
        assert!(matches!(failure.reason, AgentError::MaxDepthExceeded));
        assert_eq!(failure.turns.len(), 0);
        assert_eq!(agent.provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn a_nested_run_past_the_parents_remaining_turns_reports_turn_budget_exhausted() {
        let provider = ScriptedProvider::new(vec!["{:result nil}", "{:result nil}", "{:result nil}"]);
        let config = AgentConfig {
            max_turns: 5,
            ..AgentConfig::default()
        };
        let agent = AgentLoop::new(provider, config);
        let failure = agent
            .run_nested(
                None,
                "be helpful".to_string(),
                Ctx::default(),
                Memory::default(),
                no_tools(),
                vec![],
                1,
                Some(2),
            )
            .await
            .unwrap_err();
        assert!(matches!(failure.reason, AgentError::TurnBudgetExhausted));
        assert_eq!(failure.turns.len(), 2);
    }

    #[tokio::test]
    async fn a_nested_run_within_the_parents_remaining_turns_still_honors_its_own_max_turns() {
        let provider = ScriptedProvider::new(vec!["{:result nil}", "{:result nil}"]);
        let config = AgentConfig {
            max_turns: 2,
            ..AgentConfig::default()
        };
        let agent = AgentLoop::new(provider, config);
        let failure = agent
            .run_nested(
                None,
                "be helpful".to_string(),
                Ctx::default(),
                Memory::default(),
                no_tools(),
                vec![],
                1,
                Some(10),
            )
            .await
            .unwrap_err();
        assert!(matches!(failure.reason, AgentError::MaxTurnsExceeded));
        assert_eq!(failure.turns.len(), 2);
    }

    struct RejectOddValidator;

    impl ReturnValidator for RejectOddValidator {
        fn validate(&self, value: &Value) -> Result<(), String> {
            match value {
                Value::Int(n) if n % 2 == 0 => Ok(()),
                _ => Err("type_error: expected an even integer".to_string()),
            }
        }
    }

    #[tokio::test]
    async fn an_invalid_return_with_normal_budget_left_just_continues() {
        let provider = ScriptedProvider::new(vec!["(return 3)", "(return 4)"]);
        let config = AgentConfig {
            max_turns: 5,
            return_retries: 1,
            ..AgentConfig::default()
        };
        let agent = AgentLoop::new(provider, config).with_validator(Box::new(RejectOddValidator));
        let outcome = agent
            .run(None, "be helpful", Ctx::default(), Memory::default(), no_tools(), vec![])
            .await
            .unwrap();
        assert_eq!(outcome.value, Value::Int(4));
        assert_eq!(outcome.turns.len(), 2);
        assert_eq!(outcome.turns.turns()[0].turn_type, TurnType::Normal);
        assert_eq!(outcome.turns.turns()[1].turn_type, TurnType::Normal);
    }

    #[tokio::test]
    async fn an_invalid_return_on_the_last_normal_turn_spends_a_retry() {
        let provider = ScriptedProvider::new(vec!["(return 3)", "(return 4)"]);
        let config = AgentConfig {
            max_turns: 1,
            return_retries: 1,
            ..AgentConfig::default()
        };
        let agent = AgentLoop::new(provider, config).with_validator(Box::new(RejectOddValidator));
        let outcome = agent
            .run(None, "be helpful", Ctx::default(), Memory::default(), no_tools(), vec![])
            .await
            .unwrap();
        assert_eq!(outcome.value, Value::Int(4));
        assert_eq!(outcome.turns.len(), 2);
        assert_eq!(outcome.turns.turns()[0].turn_type, TurnType::MustReturn);
        assert_eq!(outcome.turns.turns()[1].turn_type, TurnType::Retry);
    }

    #[tokio::test]
    async fn exhausting_retries_without_a_valid_return_fails() {
        let provider = ScriptedProvider::new(vec!["(return 3)", "(return 5)"]);
        let config = AgentConfig {
            max_turns: 1,
            return_retries: 1,
            ..AgentConfig::default()
        };
        let agent = AgentLoop::new(provider, config).with_validator(Box::new(RejectOddValidator));
        let failure = agent
            .run(None, "be helpful", Ctx::default(), Memory::default(), no_tools(), vec![])
            .await
            .unwrap_err();
        assert!(matches!(failure.reason, AgentError::BudgetExhausted));
        assert_eq!(failure.turns.len(), 2);
    }
}
