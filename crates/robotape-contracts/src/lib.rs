//! # robotape-contracts
//!
//! Shared types for the robotape runtime: the step/tape model, search
//! filters, tool outcomes, usage records, and the unified error type.
//!
//! All crates in the workspace import from here. The tape model carries its
//! own invariants (append-only, lineage on branch); nothing else in this crate
//! has behaviour beyond construction and conversion.

pub mod error;
pub mod filter;
pub mod step;
pub mod tape;
pub mod tool;
pub mod usage;

pub use error::{RobotapeError, RobotapeResult};
pub use filter::TapeFilter;
pub use step::{Step, StepMetadata, StepType};
pub use tape::{Tape, TapeId, TapeMetadata};
pub use tool::{Backoff, ToolDefinition, ToolOutcome, ToolReport};
pub use usage::{LlmResponse, Usage};

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use uuid::Uuid;

    use super::*;

    fn meta(agent: &str, node: &str) -> StepMetadata {
        StepMetadata::new(agent, node)
    }

    fn sample_tape() -> Tape {
        let mut tape = Tape::default();
        tape.append(Step::thought("Test thought", meta("test_agent", "test_node")))
            .unwrap();
        tape.append(Step::action(
            json!({ "action": "test_action" }),
            meta("test_agent", "test_node"),
        ))
        .unwrap();
        tape
    }

    // ── Tape creation and append ─────────────────────────────────────────────

    #[test]
    fn default_tape_is_empty_root_authored_by_root() {
        let tape = Tape::default();
        assert!(tape.is_empty());
        assert!(tape.is_root());
        assert_eq!(tape.metadata.author, "root");
        assert!(!tape.id().0.is_nil());
    }

    #[test]
    fn append_preserves_exact_order() {
        let mut tape = Tape::new("tester");
        let steps: Vec<Step> = (0..10)
            .map(|i| Step::observation(json!({ "i": i }), meta("a", "n")))
            .collect();
        for step in steps.clone() {
            tape.append(step).unwrap();
        }
        assert_eq!(tape.steps(), steps.as_slice());
    }

    #[test]
    fn append_keeps_duplicate_content() {
        let mut tape = Tape::new("tester");
        tape.append(Step::thought("same", meta("a", "n"))).unwrap();
        tape.append(Step::thought("same", meta("a", "n"))).unwrap();
        assert_eq!(tape.len(), 2);
    }

    #[test]
    fn append_rejects_empty_agent() {
        let mut tape = Tape::new("tester");
        let err = tape
            .append(Step::thought("x", meta("  ", "n")))
            .unwrap_err();
        assert!(matches!(err, RobotapeError::InvalidStep { .. }));
        assert!(tape.is_empty(), "a rejected step must not land on the tape");
    }

    #[test]
    fn append_rejects_nil_step_id() {
        let mut tape = Tape::new("tester");
        let mut step = Step::thought("x", meta("a", "n"));
        step.metadata.id = Uuid::nil();
        assert!(matches!(
            tape.append(step),
            Err(RobotapeError::InvalidStep { .. })
        ));
    }

    #[test]
    fn append_does_not_restamp_time() {
        let mut tape = Tape::new("tester");
        let fixed = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        tape.append(Step::thought("x", StepMetadata::at("a", "n", fixed)))
            .unwrap();
        assert_eq!(tape.get_last_step().unwrap().metadata.timestamp, fixed);
    }

    // ── Queries ──────────────────────────────────────────────────────────────

    #[test]
    fn get_steps_by_type_returns_ordered_subsequence() {
        let mut tape = Tape::new("tester");
        tape.append(Step::thought("t1", meta("a", "n"))).unwrap();
        tape.append(Step::action("a1", meta("a", "n"))).unwrap();
        tape.append(Step::thought("t2", meta("a", "n"))).unwrap();

        let thoughts = tape.get_steps_by_type(&StepType::Thought);
        let contents: Vec<&serde_json::Value> = thoughts.iter().map(|s| &s.content).collect();
        assert_eq!(contents, vec![&json!("t1"), &json!("t2")]);
    }

    #[test]
    fn get_steps_by_type_with_no_match_is_empty() {
        let tape = sample_tape();
        assert!(tape.get_steps_by_type(&StepType::Error).is_empty());
    }

    #[test]
    fn custom_step_types_filter_by_value() {
        let mut tape = Tape::new("tester");
        tape.append(Step::new(StepType::new("plan"), "p", meta("a", "n")))
            .unwrap();
        tape.append(Step::thought("t", meta("a", "n"))).unwrap();
        assert_eq!(
            tape.get_steps_by_type(&StepType::Custom("plan".to_string())).len(),
            1
        );
    }

    #[test]
    fn get_steps_by_agent_and_node() {
        let mut tape = sample_tape();
        tape.append(Step::observation("obs", meta("environment", "web_search")))
            .unwrap();

        assert_eq!(tape.get_steps_by_agent("test_agent").len(), 2);
        assert_eq!(tape.get_steps_by_agent("environment").len(), 1);
        assert!(tape.get_steps_by_agent("nobody").is_empty());
        assert_eq!(tape.get_steps_by_node("web_search").len(), 1);
    }

    #[test]
    fn get_last_step_on_empty_tape_errors() {
        let tape = Tape::new("tester");
        assert!(matches!(
            tape.get_last_step(),
            Err(RobotapeError::EmptyTape { .. })
        ));
    }

    #[test]
    fn get_last_step_returns_most_recent() {
        let tape = sample_tape();
        assert_eq!(
            tape.get_last_step().unwrap().content,
            json!({ "action": "test_action" })
        );
    }

    // ── Branching ────────────────────────────────────────────────────────────

    #[test]
    fn branch_links_to_parent_with_new_id() {
        let tape = sample_tape().with_tag("x");
        let child = tape.branch();

        assert_ne!(child.id(), tape.id());
        assert_eq!(child.parent_id(), Some(tape.id()));
        assert!(!child.is_root());
        assert_eq!(child.steps(), tape.steps());
        assert_eq!(child.metadata.author, tape.metadata.author);
        assert_eq!(child.metadata.tags, tape.metadata.tags);
    }

    #[test]
    fn branch_is_independent_of_original() {
        let mut original = sample_tape();
        let mut child = original.branch();

        child.append(Step::thought("child only", meta("a", "n"))).unwrap();
        assert_eq!(original.len(), 2);

        original
            .append(Step::thought("original only", meta("a", "n")))
            .unwrap();
        assert_eq!(child.len(), 3);
        assert_eq!(child.get_last_step().unwrap().content, json!("child only"));
    }

    // ── StepType serde ───────────────────────────────────────────────────────

    #[test]
    fn step_type_serializes_as_plain_string() {
        assert_eq!(serde_json::to_value(StepType::Thought).unwrap(), json!("thought"));
        assert_eq!(
            serde_json::to_value(StepType::new("handoff")).unwrap(),
            json!("handoff")
        );
        let decoded: StepType = serde_json::from_value(json!("error")).unwrap();
        assert_eq!(decoded, StepType::Error);
    }

    #[test]
    fn custom_type_with_core_tag_is_the_core_type() {
        assert_eq!(StepType::Custom("thought".into()), StepType::Thought);
        assert_ne!(StepType::Custom("plan".into()), StepType::Thought);

        let mut tape = Tape::new("root");
        tape.append(Step::new(StepType::Custom("thought".into()), "t", meta("a", "n")))
            .unwrap();
        assert_eq!(tape.get_steps_by_type(&StepType::Thought).len(), 1);

        let types: std::collections::HashSet<StepType> =
            [StepType::Custom("error".into()), StepType::Error].into_iter().collect();
        assert_eq!(types.len(), 1);
    }

    #[test]
    fn step_json_uses_type_key() {
        let step = Step::thought("hi", meta("a", "n"));
        let value = serde_json::to_value(&step).unwrap();
        assert_eq!(value["type"], json!("thought"));
        assert!(value["metadata"].get("prompt_id").is_none());
    }

    // ── TapeFilter ───────────────────────────────────────────────────────────

    #[test]
    fn filter_from_pairs_accepts_known_keys() {
        let filter = TapeFilter::from_pairs([
            ("author", json!("root")),
            ("agent", json!("test_agent")),
            ("tags", json!(["x", "y"])),
            ("tags", json!("z")),
        ])
        .unwrap();

        assert_eq!(filter.author.as_deref(), Some("root"));
        assert_eq!(filter.agent.as_deref(), Some("test_agent"));
        assert_eq!(filter.tags.len(), 3);
    }

    #[test]
    fn filter_from_pairs_rejects_unknown_key() {
        let err = TapeFilter::from_pairs([("colour", json!("red"))]).unwrap_err();
        match err {
            RobotapeError::UnsupportedFilter { key } => assert_eq!(key, "colour"),
            other => panic!("expected UnsupportedFilter, got {other:?}"),
        }
    }

    #[test]
    fn filter_matches_is_logical_and() {
        let tape = sample_tape().with_tag("x");
        assert!(TapeFilter::new().matches(&tape));
        assert!(TapeFilter::new().tag("x").agent("test_agent").matches(&tape));
        assert!(!TapeFilter::new().tag("x").tag("y").matches(&tape));
        assert!(!TapeFilter::new().tag("x").author("someone").matches(&tape));
        assert!(TapeFilter::new().node("test_node").matches(&tape));
    }

    // ── Backoff ──────────────────────────────────────────────────────────────

    #[test]
    fn exponential_backoff_doubles_and_caps() {
        let backoff = Backoff::Exponential {
            base_delay_ms: 100,
            max_delay_ms: 350,
        };
        assert_eq!(backoff.delay_for(0), Duration::from_millis(100));
        assert_eq!(backoff.delay_for(1), Duration::from_millis(200));
        assert_eq!(backoff.delay_for(2), Duration::from_millis(350));
        assert_eq!(backoff.delay_for(80), Duration::from_millis(350));
        assert_eq!(Backoff::None.delay_for(5), Duration::ZERO);
    }

    // ── ToolOutcome reports ──────────────────────────────────────────────────

    #[test]
    fn failed_outcome_reports_kind_and_attempts() {
        let outcome = ToolOutcome::Failed {
            tool: "search".to_string(),
            error: RobotapeError::RetriesExhausted {
                tool: "search".to_string(),
                attempts: 3,
                reason: "timeout".to_string(),
            },
            attempts: 3,
        };
        let report = outcome.report();
        assert!(!report.success);
        assert!(report.error.unwrap().contains("timeout"));
        assert_eq!(report.metadata.error_kind.as_deref(), Some("retries_exhausted"));
        assert_eq!(report.metadata.attempts, 3);
    }

    #[test]
    fn succeeded_outcome_into_result() {
        let outcome = ToolOutcome::Succeeded {
            tool: "search".to_string(),
            output: json!({ "ok": true }),
            attempts: 1,
        };
        assert!(outcome.report().success);
        assert_eq!(outcome.into_result().unwrap(), json!({ "ok": true }));
    }

    // ── Error display ────────────────────────────────────────────────────────

    #[test]
    fn validation_error_names_field() {
        let err = RobotapeError::Validation {
            field: "query".to_string(),
            reason: "required".to_string(),
        };
        assert!(err.to_string().contains("'query'"));
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn tape_id_parses_from_string() {
        let id = TapeId::new();
        let parsed: TapeId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<TapeId>().is_err());
    }
}
