//! Canned model replies for a complete weekly-workflow run
//!
//! Used by the `mock` provider so `ecc run` works offline, and by tests as a
//! known-good script.

use crate::testing::mocks::MockReply;
use crate::tools::builtin::{ACTION_ITEMS_TOOL, OPEN_LOOPS_TOOL};
use serde_json::json;

pub const DEMO_KNOWLEDGE: &str = r#"```json
{
  "goals": [
    {"id": "C", "summary": "Ship the ECC capstone and public repo this week"},
    {"id": "A", "summary": "Define a 3-tier AI consulting offer"},
    {"id": "D", "summary": "Protect morning workouts and deep work"}
  ],
  "decisions": [
    {"summary": "The capstone is non-negotiable this week", "area": "C"}
  ],
  "action_items": [
    {"title": "Finish ECC Kaggle capstone and GitHub repo", "area": "C", "due_hint": "this_week"},
    {"title": "Draft consulting offer with 3 pricing tiers", "area": "A", "due_hint": "this_week"},
    {"title": "Reply to the operations-agent lead", "area": "A", "due_hint": "today"}
  ],
  "risks": [
    {"summary": "Evening social media erodes focus", "area": "D"}
  ],
  "notes": ["One inbound lead wants an AI agent for operations."]
}
```"#;

pub const DEMO_PLAN: &str = r#"```json
{
  "week_theme": "Ship ECC publicly and turn it into a consulting wedge.",
  "non_negotiables": [
    {"goal_id": "C", "title": "Publish capstone repo and writeup", "why_now": "Deadline is this week"},
    {"goal_id": "A", "title": "Consulting offer v1", "why_now": "A live lead is waiting"},
    {"goal_id": "D", "title": "Four morning training blocks", "why_now": "Energy drives every other goal"}
  ],
  "plan_by_day": {
    "monday": [
      {"title": "ECC repo cleanup and README", "goal_id": "C", "block_hint": "morning"},
      {"title": "Call the operations lead", "goal_id": "A", "block_hint": "afternoon"}
    ],
    "tuesday": [
      {"title": "Kaggle writeup draft", "goal_id": "C", "block_hint": "morning"}
    ],
    "wednesday": [
      {"title": "Offer tiers and pricing", "goal_id": "A", "block_hint": "morning"}
    ],
    "thursday": [
      {"title": "Final capstone submission", "goal_id": "C", "block_hint": "morning"}
    ],
    "friday": [
      {"title": "Weekly review, phone out of the bedroom", "goal_id": "D", "block_hint": "evening"}
    ]
  }
}
```"#;

pub const DEMO_PRIORITIZED_PLAN: &str = r#"```json
{
  "prioritized_tasks": [
    {
      "title": "ECC repo cleanup and README",
      "goal_id": "C",
      "day": "monday",
      "block_hint": "morning",
      "priority": "P1",
      "time_estimate_hours": 2.5,
      "rationale": "The public repo is the capstone deliverable.",
      "area": "ECC"
    },
    {
      "title": "Call the operations lead",
      "goal_id": "A",
      "day": "monday",
      "block_hint": "afternoon",
      "priority": "P1",
      "time_estimate_hours": 1.0,
      "rationale": "Warm revenue opportunity that goes cold if ignored.",
      "area": "Consulting"
    },
    {
      "title": "Kaggle writeup draft",
      "goal_id": "C",
      "day": "tuesday",
      "block_hint": "morning",
      "priority": "P1",
      "time_estimate_hours": 3.0,
      "rationale": "Writeup is half the submission.",
      "area": "ECC"
    },
    {
      "title": "Offer tiers and pricing",
      "goal_id": "A",
      "day": "wednesday",
      "block_hint": "morning",
      "priority": "P2",
      "time_estimate_hours": 2.0,
      "rationale": "Needed before the lead asks for a quote.",
      "area": "Consulting"
    },
    {
      "title": "Weekly review, phone out of the bedroom",
      "goal_id": "D",
      "day": "friday",
      "block_hint": "evening",
      "priority": "P3",
      "time_estimate_hours": 0.5,
      "rationale": "Guards next week's mornings.",
      "area": "Discipline"
    }
  ]
}
```"#;

pub const DEMO_BRIEFING: &str = "## Week Theme
Ship ECC publicly and turn it into a consulting wedge.

## Top 3 P1 Tasks for Today
- ECC repo cleanup and README (2.5h, morning)
- Call the operations lead (1h, afternoon)
- Block tomorrow morning for the Kaggle writeup

## Key Risks / Bottlenecks
- Evening social media eating recovery and focus
- Polishing the repo past the point of diminishing returns

## Discipline Check
- Four morning workouts are booked; treat them like client meetings.
- Phone leaves the bedroom at 21:00.

## One Hard Question
If the capstone shipped today, what would you stop doing tomorrow?";

/// Script for one full run: a tool call and answer for knowledge capture,
/// the plan, a tool call and answer for prioritization, then the briefing.
pub fn demo_replies() -> Vec<MockReply> {
    vec![
        MockReply::tool_call(OPEN_LOOPS_TOOL, json!({})),
        MockReply::text(DEMO_KNOWLEDGE),
        MockReply::text(DEMO_PLAN),
        MockReply::tool_call(
            ACTION_ITEMS_TOOL,
            json!({
                "action_items": [
                    {"title": "ECC repo cleanup and README", "priority": "P1", "day": "monday", "area": "ECC"},
                    {"title": "Call the operations lead", "priority": "P1", "day": "monday", "area": "Consulting"},
                    {"title": "Kaggle writeup draft", "priority": "P1", "day": "tuesday", "area": "ECC"},
                    {"title": "Offer tiers and pricing", "priority": "P2", "day": "wednesday", "area": "Consulting"},
                    {"title": "Weekly review, phone out of the bedroom", "priority": "P3", "day": "friday", "area": "Discipline"}
                ]
            }),
        ),
        MockReply::text(DEMO_PRIORITIZED_PLAN),
        MockReply::text(DEMO_BRIEFING),
    ]
}
