//! Structured stage outputs
//!
//! These types are the contracts between pipeline stages. Each one derives
//! `JsonSchema` so the same definition drives schema validation of model
//! output, and each exposes a `validate()` for the rules a JSON schema
//! cannot express cleanly.

use crate::goals::GoalId;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Lower bound for `time_estimate_hours`
pub const MIN_TASK_HOURS: f64 = 0.5;
/// Upper bound for `time_estimate_hours`
pub const MAX_TASK_HOURS: f64 = 3.0;

/// Rough due date attached to a captured action item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DueHint {
    Today,
    ThisWeek,
    ThisMonth,
    Later,
}

/// Working day of the planning week
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl Weekday {
    pub const ALL: [Weekday; 5] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum BlockHint {
    Morning,
    Afternoon,
    Evening,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
pub enum Priority {
    P1,
    P2,
    P3,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Priority::P1 => "P1",
            Priority::P2 => "P2",
            Priority::P3 => "P3",
        };
        f.write_str(label)
    }
}

/// Human-facing area label used on prioritized tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum TaskArea {
    Consulting,
    #[serde(rename = "ECC")]
    Ecc,
    Discipline,
    Other,
}

impl TaskArea {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskArea::Consulting => "Consulting",
            TaskArea::Ecc => "ECC",
            TaskArea::Discipline => "Discipline",
            TaskArea::Other => "Other",
        }
    }
}

impl From<GoalId> for TaskArea {
    fn from(id: GoalId) -> Self {
        match id {
            GoalId::A => TaskArea::Consulting,
            GoalId::C => TaskArea::Ecc,
            GoalId::D => TaskArea::Discipline,
            GoalId::Other => TaskArea::Other,
        }
    }
}

// ----- Knowledge capture -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CapturedGoal {
    pub id: GoalId,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CapturedDecision {
    pub summary: String,
    pub area: GoalId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CapturedActionItem {
    #[schemars(length(min = 1))]
    pub title: String,
    pub area: GoalId,
    pub due_hint: DueHint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CapturedRisk {
    pub summary: String,
    pub area: GoalId,
}

/// Output of the knowledge capture stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CapturedKnowledge {
    #[serde(default)]
    pub goals: Vec<CapturedGoal>,
    #[serde(default)]
    pub decisions: Vec<CapturedDecision>,
    #[serde(default)]
    pub action_items: Vec<CapturedActionItem>,
    #[serde(default)]
    pub risks: Vec<CapturedRisk>,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl CapturedKnowledge {
    pub fn validate(&self) -> Result<(), String> {
        let violations: Vec<String> = self
            .action_items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.title.trim().is_empty())
            .map(|(i, _)| format!("action_items[{i}].title is empty"))
            .collect();
        join_violations(violations)
    }
}

// ----- Weekly plan -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NonNegotiable {
    /// Strategic goal only; `other` is rejected by `WeeklyPlan::validate`
    pub goal_id: GoalId,
    pub title: String,
    pub why_now: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PlannedBlock {
    pub title: String,
    pub goal_id: GoalId,
    pub block_hint: BlockHint,
}

/// Output of the strategic planner stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WeeklyPlan {
    pub week_theme: String,
    #[serde(default)]
    pub non_negotiables: Vec<NonNegotiable>,
    /// Every weekday must be present, lists may be empty
    pub plan_by_day: BTreeMap<Weekday, Vec<PlannedBlock>>,
}

impl WeeklyPlan {
    pub fn validate(&self) -> Result<(), String> {
        let mut violations = Vec::new();

        if self.week_theme.trim().is_empty() {
            violations.push("week_theme is empty".to_string());
        }

        for (i, item) in self.non_negotiables.iter().enumerate() {
            if !item.goal_id.is_strategic() {
                violations.push(format!(
                    "non_negotiables[{i}].goal_id must be one of A, C, D"
                ));
            }
        }

        for day in Weekday::ALL {
            if !self.plan_by_day.contains_key(&day) {
                violations.push(format!("plan_by_day is missing '{day}'"));
            }
        }

        join_violations(violations)
    }

    /// Total planned blocks across the week
    pub fn block_count(&self) -> usize {
        self.plan_by_day.values().map(Vec::len).sum()
    }
}

// ----- Prioritized plan -----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PrioritizedTask {
    #[schemars(length(min = 1))]
    pub title: String,
    pub goal_id: GoalId,
    pub day: Weekday,
    pub block_hint: BlockHint,
    pub priority: Priority,
    #[schemars(range(min = 0.5, max = 3.0))]
    pub time_estimate_hours: f64,
    pub rationale: String,
    pub area: TaskArea,
}

impl PrioritizedTask {
    pub fn validate(&self) -> Result<(), String> {
        let mut violations = Vec::new();
        if self.title.trim().is_empty() {
            violations.push("title is empty".to_string());
        }
        if !(MIN_TASK_HOURS..=MAX_TASK_HOURS).contains(&self.time_estimate_hours) {
            violations.push(format!(
                "time_estimate_hours {} outside [{MIN_TASK_HOURS}, {MAX_TASK_HOURS}]",
                self.time_estimate_hours
            ));
        }
        join_violations(violations)
    }
}

/// Output of the priority stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PrioritizedPlan {
    pub prioritized_tasks: Vec<PrioritizedTask>,
}

impl PrioritizedPlan {
    pub fn validate(&self) -> Result<(), String> {
        let violations: Vec<String> = self
            .prioritized_tasks
            .iter()
            .enumerate()
            .filter_map(|(i, task)| {
                task.validate()
                    .err()
                    .map(|e| format!("prioritized_tasks[{i}]: {e}"))
            })
            .collect();
        join_violations(violations)
    }

    /// Tasks with the given priority, in plan order
    pub fn with_priority(&self, priority: Priority) -> impl Iterator<Item = &PrioritizedTask> {
        self.prioritized_tasks
            .iter()
            .filter(move |t| t.priority == priority)
    }

    pub fn total_hours(&self) -> f64 {
        self.prioritized_tasks
            .iter()
            .map(|t| t.time_estimate_hours)
            .sum()
    }
}

fn join_violations(violations: Vec<String>) -> Result<(), String> {
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations.join("; "))
    }
}
