//! The `CompressionStrategy` trait and its one built-in implementation.

use ptc_protocol::Message;
use ptc_runtime::Memory;
use ptc_turn::TurnHistory;

use crate::options::CompressionOptions;
use crate::sections::{
    data_section, failed_turns_section, mission_section, output_section, tool_calls_section, tools_section,
    turns_left_section, user_prelude_section, validation_error_section,
};

/// A pure, total function from turn history and memory to the two
/// messages sent to the LLM. No implementation may perform I/O or
/// mutate its arguments; `compress` is idempotent — calling it twice
/// with the same arguments produces identical messages.
pub trait CompressionStrategy {
    /// Builds `[system, user]` for the next LLM call.
    fn compress(&self, turns: &TurnHistory, memory: &Memory, options: &CompressionOptions) -> [Message; 2];
}

/// The default strategy: one system message passed through unchanged,
/// and every turn's history coalesced into a single ordered user
/// message.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleUserCoalesced;

impl CompressionStrategy for SingleUserCoalesced {
    fn compress(&self, turns: &TurnHistory, memory: &Memory, options: &CompressionOptions) -> [Message; 2] {
        let explicit_mode = turns.last().map(|t| !t.prints.is_empty()).unwrap_or(false);

        let sections: Vec<String> = [
            mission_section(options.mission.as_deref()),
            tools_section(&options.tools),
            data_section(&options.data),
            user_prelude_section(memory, explicit_mode),
            tool_calls_section(turns.turns(), options.tool_call_limit),
            output_section(turns.turns(), options.println_limit),
            failed_turns_section(turns.turns()),
            validation_error_section(options.validation_error.as_deref()),
            Some(turns_left_section(options.turns_left)),
        ]
        .into_iter()
        .flatten()
        .collect();

        [Message::system(options.system_prompt.clone()), Message::user(sections.join("\n\n"))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ptc_runtime::{ToolCallRecord, Value};
    use ptc_sandbox::SandboxOutcome;
    use ptc_turn::TurnType;

    fn history_with_one_success(printed: bool) -> TurnHistory {
        let mut history = TurnHistory::new();
        let prints = if printed { vec!["hello".to_string()] } else { vec![] };
        history.record_outcome(
            "{:result nil :count 1}".to_string(),
            "raw",
            SandboxOutcome {
                result: Value::Nil,
                memory: Memory::new(vec![(Value::Keyword("count".into()), Value::Int(1))]),
                terminal: None,
                prints,
                tool_calls: vec![],
                steps_taken: 1,
            },
            TurnType::Normal,
        );
        history
    }

    #[test]
    fn always_emits_exactly_system_and_user() {
        let history = TurnHistory::new();
        let memory = Memory::default();
        let options = CompressionOptions::new("be helpful", 5);
        let [system, user] = SingleUserCoalesced.compress(&history, &memory, &options);
        assert_eq!(system.content, "be helpful");
        assert!(user.content.contains("Turns left: 5"));
    }

    #[test]
    fn final_turn_gets_the_must_return_notice() {
        let history = TurnHistory::new();
        let memory = Memory::default();
        let options = CompressionOptions::new("sys", 1);
        let [_, user] = SingleUserCoalesced.compress(&history, &memory, &options);
        assert!(user.content.contains("FINAL TURN"));
    }

    #[test]
    fn exploration_mode_shows_a_sample() {
        let history = history_with_one_success(false);
        let memory = history.current_memory();
        let options = CompressionOptions::new("sys", 3);
        let [_, user] = SingleUserCoalesced.compress(&history, &memory, &options);
        assert!(user.content.contains("user/count ; = integer, sample: 1"));
    }

    #[test]
    fn explicit_mode_hides_the_sample_and_shows_output() {
        let history = history_with_one_success(true);
        let memory = history.current_memory();
        let options = CompressionOptions::new("sys", 3);
        let [_, user] = SingleUserCoalesced.compress(&history, &memory, &options);
        assert!(user.content.contains("user/count ; = integer"));
        assert!(!user.content.contains("sample:"));
        assert!(user.content.contains("Output:\nhello"));
    }

    #[test]
    fn tool_calls_are_most_recent_first_and_truncated() {
        let mut history = TurnHistory::new();
        history.record_outcome(
            "(tool/a {})".to_string(),
            "raw",
            SandboxOutcome {
                result: Value::Nil,
                memory: Memory::default(),
                terminal: None,
                prints: vec![],
                tool_calls: vec![
                    ToolCallRecord {
                        name: "search".to_string(),
                        args: Value::Nil,
                        result: Ok(Value::Int(1)),
                    },
                    ToolCallRecord {
                        name: "fetch".to_string(),
                        args: Value::Nil,
                        result: Ok(Value::Int(2)),
                    },
                ],
                steps_taken: 2,
            },
            TurnType::Normal,
        );
        let options = CompressionOptions::new("sys", 2);
        let [_, user] = SingleUserCoalesced.compress(&history, &Memory::default(), &options);
        let fetch_pos = user.content.find("fetch").unwrap();
        let search_pos = user.content.find("search").unwrap();
        assert!(fetch_pos < search_pos, "most recent tool call should appear first");
    }
}
