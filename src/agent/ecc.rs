//! The four ECC stages: knowledge capture, strategic planning,
//! prioritization and the accountability briefing.

use crate::agent::output::OutputContract;
use crate::agent::stage::StageSpec;
use crate::goals::GoalRegistry;
use crate::tools::builtin::{ACTION_ITEMS_TOOL, OPEN_LOOPS_TOOL, WEB_SEARCH_TOOL};

pub const PIPELINE_NAME: &str = "ECCWorkflow";

pub const KNOWLEDGE_KEY: &str = "ecc_knowledge";
pub const PLAN_KEY: &str = "ecc_plan";
pub const PRIORITIZED_PLAN_KEY: &str = "ecc_prioritized_plan";

pub const KNOWLEDGE_STAGE: &str = "KnowledgeCaptureAgent";
pub const PLANNER_STAGE: &str = "StrategicPlannerAgent";
pub const PRIORITY_STAGE: &str = "PriorityAgent";
pub const ACCOUNTABILITY_STAGE: &str = "AccountabilityAgent";

/// Weekly note used when no input is supplied
pub const DEMO_INPUT: &str = "This week I must:
- Finish the ECC Kaggle capstone and GitHub repo (non-negotiable).
- Design the first version of my AI consulting offer with 3 pricing tiers.
- Keep morning workouts and at least 2h deep work on ECC for 4 days.
- I keep getting distracted in the evenings by social media.
- There is one potential client asking about an AI agent for operations.";

const KNOWLEDGE_INSTRUCTION: &str = r#"You are an executive knowledge capture agent.

The user sends raw weekly context: notes, meeting summaries, ideas, worries and to-dos.
Extract ONLY what matters for planning and execution, tagged with a strategic area:
- A: AI consulting / revenue engine.
- C: ECC product.
- D: Discipline / personal OS.
- other: everything else.

Call the `get_open_loops` tool to see commitments that are already open.
Use `web_search` only when a fact in the notes needs checking (a client, a deadline, an event).

Reply with STRICT JSON inside a ```json code block with exactly this structure:
```json
{
  "goals": [ {"id": "A|C|D|other", "summary": "..."} ],
  "decisions": [ {"summary": "...", "area": "A|C|D|other"} ],
  "action_items": [
    {"title": "...", "area": "A|C|D|other", "due_hint": "today|this_week|this_month|later"}
  ],
  "risks": [ {"summary": "...", "area": "A|C|D|other"} ],
  "notes": ["... important contextual notes ..."]
}
```

Rules:
- Ignore noise and small talk.
- If something is unclear, put it into `notes` instead of guessing."#;

const PLANNER_INSTRUCTION: &str = r#"You are the Chief Strategy Officer for a solo founder.

INPUT:
- `ecc_knowledge` from the knowledge capture stage.
- The long-term goals:
{goals}

GOAL:
- Design a one-week execution plan that moves the user decisively forward.
- Balance A (consulting), C (ECC) and D (discipline).
- Cut low-leverage tasks without mercy.

Reply with STRICT JSON in a ```json code block:
```json
{
  "week_theme": "One clear sentence.",
  "non_negotiables": [
    {"goal_id": "A|C|D", "title": "...", "why_now": "..."}
  ],
  "plan_by_day": {
    "monday": [
      {"title": "...", "goal_id": "A|C|D|other", "block_hint": "morning|afternoon|evening"}
    ],
    "tuesday": [ ... ],
    "wednesday": [ ... ],
    "thursday": [ ... ],
    "friday": [ ... ]
  }
}
```

You may call `web_search` to check external deadlines or context before committing to a plan.

All five weekdays must be present, even with an empty list.
Assume 3-5 hours of deep work per weekday. Prefer clarity over volume."#;

const PRIORITY_INSTRUCTION: &str = r#"You are an operations and execution specialist.

INPUT:
- `ecc_plan` with `plan_by_day`.

GOAL:
- For each planned item assign:
  * priority: P1 / P2 / P3
  * time_estimate_hours between 0.5 and 3.0
  * area: Consulting | ECC | Discipline | Other
  * a short rationale.

PRIORITY RULES:
- P1 moves a strategic needle this week.
- P2 is important but can slip.
- P3 is nice-to-have or admin.

First call the `log_action_items` tool with the prioritized tasks as `action_items`.
Then give your final reply as STRICT JSON in a ```json code block:
```json
{
  "prioritized_tasks": [
    {
      "title": "...",
      "goal_id": "A|C|D|other",
      "day": "monday|tuesday|wednesday|thursday|friday",
      "block_hint": "morning|afternoon|evening",
      "priority": "P1|P2|P3",
      "time_estimate_hours": 1.5,
      "rationale": "...",
      "area": "Consulting|ECC|Discipline|Other"
    }
  ]
}
```"#;

const ACCOUNTABILITY_INSTRUCTION: &str = r#"You are an executive coach and Chief of Staff.

INPUT:
- `ecc_prioritized_plan` with `prioritized_tasks`.
- The long-term goals:
{goals}

OUTPUT (Markdown, NOT JSON):
1. **Week Theme**: 1 sentence.
2. **Top 3 P1 Tasks for Today**: bullet list.
3. **Key Risks / Bottlenecks**: bullet list.
4. **Discipline Check**: 2-3 bullets on focus, energy and consistency.
5. **One Hard Question**: a direct question the user must answer.

Tone: direct, professional, zero fluff."#;

pub fn knowledge_capture_stage() -> StageSpec {
    StageSpec {
        name: KNOWLEDGE_STAGE.to_string(),
        description: "Extracts goals, decisions, action items and risks from raw weekly notes."
            .to_string(),
        instruction: KNOWLEDGE_INSTRUCTION.to_string(),
        tools: vec![WEB_SEARCH_TOOL.to_string(), OPEN_LOOPS_TOOL.to_string()],
        input_keys: vec![],
        output_key: Some(KNOWLEDGE_KEY.to_string()),
        contract: OutputContract::Knowledge,
    }
}

pub fn strategic_planner_stage(goals: &GoalRegistry) -> StageSpec {
    StageSpec {
        name: PLANNER_STAGE.to_string(),
        description: "Turns captured knowledge and long-term goals into a one-week plan."
            .to_string(),
        instruction: PLANNER_INSTRUCTION.replace("{goals}", &goals.render_for_prompt()),
        tools: vec![WEB_SEARCH_TOOL.to_string()],
        input_keys: vec![KNOWLEDGE_KEY.to_string()],
        output_key: Some(PLAN_KEY.to_string()),
        contract: OutputContract::WeeklyPlan,
    }
}

pub fn priority_stage() -> StageSpec {
    StageSpec {
        name: PRIORITY_STAGE.to_string(),
        description: "Turns the weekly plan into a P1/P2/P3 task list with time estimates."
            .to_string(),
        instruction: PRIORITY_INSTRUCTION.to_string(),
        tools: vec![ACTION_ITEMS_TOOL.to_string()],
        input_keys: vec![PLAN_KEY.to_string()],
        output_key: Some(PRIORITIZED_PLAN_KEY.to_string()),
        contract: OutputContract::PrioritizedPlan,
    }
}

pub fn accountability_stage(goals: &GoalRegistry) -> StageSpec {
    StageSpec {
        name: ACCOUNTABILITY_STAGE.to_string(),
        description: "Writes the final executive briefing.".to_string(),
        instruction: ACCOUNTABILITY_INSTRUCTION.replace("{goals}", &goals.render_for_prompt()),
        tools: vec![],
        input_keys: vec![PRIORITIZED_PLAN_KEY.to_string()],
        output_key: None,
        contract: OutputContract::Briefing,
    }
}

/// The four stage specs in execution order
pub fn ecc_stage_specs(goals: &GoalRegistry) -> Vec<StageSpec> {
    vec![
        knowledge_capture_stage(),
        strategic_planner_stage(goals),
        priority_stage(),
        accountability_stage(goals),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order_and_keys() {
        let specs = ecc_stage_specs(GoalRegistry::builtin());
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                KNOWLEDGE_STAGE,
                PLANNER_STAGE,
                PRIORITY_STAGE,
                ACCOUNTABILITY_STAGE
            ]
        );

        let keys: Vec<Option<&str>> = specs.iter().map(|s| s.output_key.as_deref()).collect();
        assert_eq!(
            keys,
            vec![
                Some(KNOWLEDGE_KEY),
                Some(PLAN_KEY),
                Some(PRIORITIZED_PLAN_KEY),
                None
            ]
        );
    }

    #[test]
    fn test_each_stage_reads_its_predecessor() {
        let specs = ecc_stage_specs(GoalRegistry::builtin());
        assert!(specs[0].input_keys.is_empty());
        for pair in specs.windows(2) {
            assert_eq!(
                pair[1].input_keys,
                vec![pair[0].output_key.clone().unwrap()]
            );
        }
    }

    #[test]
    fn test_goal_table_is_embedded() {
        let planner = strategic_planner_stage(GoalRegistry::builtin());
        assert!(!planner.instruction.contains("{goals}"));
        assert!(planner
            .instruction
            .contains("- C: Executive Command Center (ECC) Product"));

        let briefing = accountability_stage(GoalRegistry::builtin());
        assert!(briefing.instruction.contains("- D: Discipline"));
    }

    #[test]
    fn test_tool_assignment() {
        let specs = ecc_stage_specs(GoalRegistry::builtin());
        assert_eq!(
            specs[0].tools,
            vec![WEB_SEARCH_TOOL.to_string(), OPEN_LOOPS_TOOL.to_string()]
        );
        assert_eq!(specs[1].tools, vec![WEB_SEARCH_TOOL.to_string()]);
        assert_eq!(specs[2].tools, vec![ACTION_ITEMS_TOOL.to_string()]);
        assert!(specs[3].tools.is_empty());
    }

    #[test]
    fn test_demo_input_has_five_bullets() {
        assert!(DEMO_INPUT.starts_with("This week I must:"));
        assert_eq!(DEMO_INPUT.lines().filter(|l| l.starts_with("- ")).count(), 5);
    }
}
