//! Long-term strategic goal registry
//!
//! The registry is a read-only table built once at startup. Stages reference
//! goals by [`GoalId`]; the planner and accountability prompts embed the
//! rendered table so the model plans against the same targets every run.

use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Strategic area tag shared by every stage output
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
pub enum GoalId {
    /// AI consulting / revenue engine
    A,
    /// ECC product
    C,
    /// Discipline / personal operating system
    D,
    #[serde(rename = "other")]
    Other,
}

impl GoalId {
    /// Goal ids that must have a registry entry
    pub const STRATEGIC: [GoalId; 3] = [GoalId::A, GoalId::C, GoalId::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalId::A => "A",
            GoalId::C => "C",
            GoalId::D => "D",
            GoalId::Other => "other",
        }
    }

    /// True for A, C and D
    pub fn is_strategic(&self) -> bool {
        !matches!(self, GoalId::Other)
    }
}

impl fmt::Display for GoalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One long-term objective
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategicGoal {
    pub id: GoalId,
    pub name: String,
    pub description: String,
    pub time_horizon: String,
}

/// Goal registry errors. All of them are startup configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GoalError {
    #[error("Goal '{0}' is not defined in the registry")]
    Undefined(GoalId),
    #[error("Goal '{0}' is defined more than once")]
    Duplicate(GoalId),
    #[error("Goal id 'other' is a catch-all and cannot be registered")]
    CatchAllRegistered,
}

/// Read-only table of strategic goals keyed by id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalRegistry {
    goals: BTreeMap<GoalId, StrategicGoal>,
}

impl GoalRegistry {
    /// Build a registry, rejecting duplicates and requiring A, C and D
    pub fn from_goals(goals: Vec<StrategicGoal>) -> Result<Self, GoalError> {
        let mut table = BTreeMap::new();
        for goal in goals {
            if !goal.id.is_strategic() {
                return Err(GoalError::CatchAllRegistered);
            }
            let id = goal.id;
            if table.insert(id, goal).is_some() {
                return Err(GoalError::Duplicate(id));
            }
        }

        let registry = Self { goals: table };
        for id in GoalId::STRATEGIC {
            registry.require(id)?;
        }
        Ok(registry)
    }

    /// Built-in long-term goals
    pub fn builtin() -> &'static GoalRegistry {
        &LONG_TERM_GOALS
    }

    pub fn get(&self, id: GoalId) -> Option<&StrategicGoal> {
        self.goals.get(&id)
    }

    /// Lookup that treats a missing entry as a configuration error
    pub fn require(&self, id: GoalId) -> Result<&StrategicGoal, GoalError> {
        self.get(id).ok_or(GoalError::Undefined(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &StrategicGoal> {
        self.goals.values()
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }

    /// Render the table for inclusion in a stage instruction
    pub fn render_for_prompt(&self) -> String {
        self.iter()
            .map(|goal| {
                format!(
                    "- {}: {} ({}). Horizon: {}.",
                    goal.id, goal.name, goal.description, goal.time_horizon
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn builtin_goals() -> Vec<StrategicGoal> {
    vec![
        StrategicGoal {
            id: GoalId::A,
            name: "AI Consulting Revenue Engine".to_string(),
            description: "Build and scale an AI consulting and agent-building business."
                .to_string(),
            time_horizon: "12-24 months".to_string(),
        },
        StrategicGoal {
            id: GoalId::C,
            name: "Executive Command Center (ECC) Product".to_string(),
            description: "Turn ECC into a repeatable, sellable strategic assistant product."
                .to_string(),
            time_horizon: "12-24 months".to_string(),
        },
        StrategicGoal {
            id: GoalId::D,
            name: "Discipline & Personal Operating System".to_string(),
            description: "Maintain elite discipline in health, learning, and execution."
                .to_string(),
            time_horizon: "ongoing".to_string(),
        },
    ]
}

static LONG_TERM_GOALS: Lazy<GoalRegistry> = Lazy::new(|| GoalRegistry {
    goals: builtin_goals().into_iter().map(|g| (g.id, g)).collect(),
});
