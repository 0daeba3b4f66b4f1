//! Property-based tests for the turn state machine
//!
//! A scripted driver answers each effect with an event chosen by the
//! generated outcome, the way the orchestrator would.

use super::state::*;
use super::transition::*;
use super::*;
use crate::catalog::params::HistoryParams;
use crate::catalog::{OutagesParams, ToolInvocation, ToolName};
use crate::history::{SessionId, Turn};
use crate::intent::Intent;
use crate::query::{Records, ToolFailed, ToolResult};
use crate::synthesizer::Grounding;
use chrono::Utc;
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> TurnContext {
    TurnContext::new(SessionId::generate(), "Έχει διακοπή ρεύματος;", Utc::now())
}

/// How each dependency behaves on one path
#[derive(Debug, Clone)]
struct Outcomes {
    history: Option<usize>,
    intent: Intent,
    tool_ok: bool,
    synthesis_ok: bool,
    persist_ok: bool,
}

struct Run {
    final_state: TurnState,
    effects: Vec<Effect>,
}

fn respond(effect: &Effect, outcomes: &Outcomes) -> Option<Event> {
    match effect {
        Effect::LoadHistory => Some(match outcomes.history {
            Some(n) => Event::HistoryLoaded {
                turns: (0..n).map(|i| Turn::user(format!("q{i}"), Utc::now())).collect(),
            },
            None => Event::HistoryUnavailable {
                reason: "connection refused".to_string(),
            },
        }),
        Effect::SelectIntent { .. } => Some(Event::IntentSelected {
            intent: outcomes.intent.clone(),
        }),
        Effect::ExecuteTool { invocation } => Some(if outcomes.tool_ok {
            Event::ToolCompleted {
                result: ToolResult::new(invocation.tool_name(), empty_records(invocation.tool_name()), 10),
            }
        } else {
            Event::ToolFailed {
                failure: ToolFailed::new(invocation.tool_name(), "timeout"),
            }
        }),
        Effect::Synthesize { .. } => Some(if outcomes.synthesis_ok {
            Event::ReplySynthesized {
                reply: "reply".to_string(),
            }
        } else {
            Event::SynthesisFellBack {
                reply: "apology".to_string(),
            }
        }),
        Effect::PersistTurn { .. } => Some(if outcomes.persist_ok {
            Event::TurnPersisted
        } else {
            Event::PersistFailed {
                reason: "timeout".to_string(),
            }
        }),
        Effect::LogDegradation { .. } => None,
    }
}

fn empty_records(tool: ToolName) -> Records {
    match tool {
        ToolName::Outages => Records::Outages(vec![]),
        ToolName::Performances => Records::Performances(vec![]),
        ToolName::Movies => Records::Screenings {
            detailed: false,
            rows: vec![],
        },
        ToolName::HospitalShifts => Records::HospitalShifts(vec![]),
        ToolName::History => Records::History(vec![]),
    }
}

fn drive(outcomes: &Outcomes) -> Run {
    let ctx = test_context();
    let mut state = TurnState::Start;
    let mut effects = Vec::new();
    let mut pending = vec![Event::MessageReceived];

    while let Some(event) = pending.pop() {
        let result = transition(&state, &ctx, event).expect("scripted path must be valid");
        state = result.new_state;
        for effect in result.effects {
            if let Some(next) = respond(&effect, outcomes) {
                pending.push(next);
            }
            effects.push(effect);
        }
    }
    Run {
        final_state: state,
        effects,
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_invocation() -> impl Strategy<Value = ToolInvocation> {
    prop_oneof![
        Just(ToolInvocation::Outages(OutagesParams::default())),
        "[a-zα-ω ]{1,20}".prop_map(|q| ToolInvocation::History(HistoryParams { search_query: q })),
    ]
}

fn arb_intent() -> impl Strategy<Value = Intent> {
    prop_oneof![
        "[a-zA-Z ]{1,20}".prop_map(Intent::DirectAnswer),
        "[a-zA-Z ]{1,20}".prop_map(Intent::Clarify),
        arb_invocation().prop_map(Intent::ToolCall),
    ]
}

fn arb_outcomes() -> impl Strategy<Value = Outcomes> {
    (
        proptest::option::of(0usize..6),
        arb_intent(),
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(history, intent, tool_ok, synthesis_ok, persist_ok)| Outcomes {
            history,
            intent,
            tool_ok,
            synthesis_ok,
            persist_ok,
        })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::MessageReceived),
        Just(Event::HistoryLoaded { turns: vec![] }),
        Just(Event::HistoryUnavailable {
            reason: "down".to_string()
        }),
        arb_intent().prop_map(|intent| Event::IntentSelected { intent }),
        Just(Event::ToolFailed {
            failure: ToolFailed::new(ToolName::Outages, "down")
        }),
        Just(Event::ReplySynthesized {
            reply: "r".to_string()
        }),
        Just(Event::SynthesisFellBack {
            reply: "a".to_string()
        }),
        Just(Event::TurnPersisted),
        Just(Event::PersistFailed {
            reason: "down".to_string()
        }),
    ]
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Every path synthesizes exactly once and terminates
    #[test]
    fn prop_every_path_synthesizes_once(outcomes in arb_outcomes()) {
        let run = drive(&outcomes);
        let synths = run.effects.iter().filter(|e| matches!(e, Effect::Synthesize { .. })).count();
        prop_assert_eq!(synths, 1);
        prop_assert!(matches!(run.final_state, TurnState::Done { .. }), "final state is not Done");
    }

    // Persisted only when both the reply and the write succeeded
    #[test]
    fn prop_persisted_iff_synthesis_and_write_ok(outcomes in arb_outcomes()) {
        let run = drive(&outcomes);
        match run.final_state {
            TurnState::Done { reply, persisted } => {
                prop_assert_eq!(persisted, outcomes.synthesis_ok && outcomes.persist_ok);
                prop_assert_eq!(reply, if outcomes.synthesis_ok { "reply" } else { "apology" });
            }
            other => prop_assert!(false, "not done: {:?}", other),
        }
        let persists = run.effects.iter().filter(|e| matches!(e, Effect::PersistTurn { .. })).count();
        prop_assert_eq!(persists, usize::from(outcomes.synthesis_ok));
    }

    // Tools run only for tool calls, at most once
    #[test]
    fn prop_single_tool_per_turn(outcomes in arb_outcomes()) {
        let run = drive(&outcomes);
        let tools = run.effects.iter().filter(|e| matches!(e, Effect::ExecuteTool { .. })).count();
        prop_assert_eq!(tools, usize::from(matches!(outcomes.intent, Intent::ToolCall(_))));
    }

    // Failures reach the synthesizer as DATA_UNAVAILABLE grounding
    #[test]
    fn prop_tool_failure_grounding(invocation in arb_invocation(), synthesis_ok in any::<bool>()) {
        let outcomes = Outcomes {
            history: Some(2),
            intent: Intent::ToolCall(invocation),
            tool_ok: false,
            synthesis_ok,
            persist_ok: true,
        };
        let run = drive(&outcomes);
        let grounded_on_failure = run.effects.iter().any(|e| matches!(
            e,
            Effect::Synthesize { grounding: Grounding::ToolFailed(_), .. }
        ));
        prop_assert!(grounded_on_failure);
    }

    // Loaded history is the history handed to the synthesizer
    #[test]
    fn prop_history_flows_to_synthesis(outcomes in arb_outcomes()) {
        let run = drive(&outcomes);
        let expected = outcomes.history.unwrap_or(0);
        for effect in &run.effects {
            if let Effect::Synthesize { history, .. } = effect {
                prop_assert_eq!(history.len(), expected);
            }
        }
    }

    // Arbitrary event sequences never escape Done once reached
    #[test]
    fn prop_done_is_absorbing(events in proptest::collection::vec(arb_event(), 0..20)) {
        let ctx = test_context();
        let mut state = TurnState::Start;
        for event in events {
            let was_done = matches!(state, TurnState::Done { .. });
            match transition(&state, &ctx, event) {
                Ok(result) => {
                    prop_assert!(!was_done, "transitioned out of Done");
                    state = result.new_state;
                }
                Err(TransitionError::InvalidTransition(_)) => {}
            }
        }
    }
}
