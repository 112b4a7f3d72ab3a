//! Stage output contracts
//!
//! Structured stages must answer with a JSON object, usually inside a fenced
//! ```json block. Parsing runs four gates in order: extraction, JSON schema
//! validation against the `schemars` schema of the target type, serde
//! deserialization, then the type's own semantic `validate()`. The first
//! failing gate becomes an [`OutputError`].

use crate::models::{CapturedKnowledge, PrioritizedPlan, WeeklyPlan};
use crate::tools::validate_against;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::warn;

/// Labelled sections an accountability briefing is expected to carry.
/// Each entry is (label, lowercase marker searched for in the text).
pub const BRIEFING_SECTIONS: [(&str, &str); 5] = [
    ("Week Theme", "week theme"),
    ("Top 3 P1 Tasks for Today", "p1"),
    ("Key Risks / Bottlenecks", "risk"),
    ("Discipline Check", "discipline check"),
    ("One Hard Question", "hard question"),
];

/// Shape a stage's final answer must take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputContract {
    Knowledge,
    WeeklyPlan,
    PrioritizedPlan,
    /// Free-form Markdown
    Briefing,
}

impl OutputContract {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputContract::Knowledge => "knowledge",
            OutputContract::WeeklyPlan => "weekly_plan",
            OutputContract::PrioritizedPlan => "prioritized_plan",
            OutputContract::Briefing => "briefing",
        }
    }

    pub fn is_structured(&self) -> bool {
        !matches!(self, OutputContract::Briefing)
    }

    /// JSON schema of the structured value, `None` for the briefing
    pub fn json_schema(&self) -> Option<Value> {
        let schema = match self {
            OutputContract::Knowledge => schemars::schema_for!(CapturedKnowledge),
            OutputContract::WeeklyPlan => schemars::schema_for!(WeeklyPlan),
            OutputContract::PrioritizedPlan => schemars::schema_for!(PrioritizedPlan),
            OutputContract::Briefing => return None,
        };
        serde_json::to_value(schema).ok()
    }

    /// Parse a model's final text into a validated stage value
    pub fn parse(&self, text: &str) -> Result<StageValue, OutputError> {
        let contract = *self;
        match contract {
            OutputContract::Knowledge => {
                let value: CapturedKnowledge = parse_structured(contract, text)?;
                semantic(contract, value.validate())?;
                Ok(StageValue::Knowledge(value))
            }
            OutputContract::WeeklyPlan => {
                let value: WeeklyPlan = parse_structured(contract, text)?;
                semantic(contract, value.validate())?;
                Ok(StageValue::WeeklyPlan(value))
            }
            OutputContract::PrioritizedPlan => {
                let value: PrioritizedPlan = parse_structured(contract, text)?;
                semantic(contract, value.validate())?;
                Ok(StageValue::PrioritizedPlan(value))
            }
            OutputContract::Briefing => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    warn!("Briefing output is empty");
                }
                Ok(StageValue::Briefing(trimmed.to_string()))
            }
        }
    }
}

impl fmt::Display for OutputContract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated stage output as stored in the session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StageValue {
    Knowledge(CapturedKnowledge),
    WeeklyPlan(WeeklyPlan),
    PrioritizedPlan(PrioritizedPlan),
    Briefing(String),
}

impl StageValue {
    pub fn contract(&self) -> OutputContract {
        match self {
            StageValue::Knowledge(_) => OutputContract::Knowledge,
            StageValue::WeeklyPlan(_) => OutputContract::WeeklyPlan,
            StageValue::PrioritizedPlan(_) => OutputContract::PrioritizedPlan,
            StageValue::Briefing(_) => OutputContract::Briefing,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            StageValue::Briefing(text) => Value::String(text.clone()),
            other => serde_json::to_value(other).unwrap_or(Value::Null),
        }
    }

    pub fn as_knowledge(&self) -> Option<&CapturedKnowledge> {
        match self {
            StageValue::Knowledge(k) => Some(k),
            _ => None,
        }
    }

    pub fn as_weekly_plan(&self) -> Option<&WeeklyPlan> {
        match self {
            StageValue::WeeklyPlan(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_prioritized_plan(&self) -> Option<&PrioritizedPlan> {
        match self {
            StageValue::PrioritizedPlan(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_briefing(&self) -> Option<&str> {
        match self {
            StageValue::Briefing(text) => Some(text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OutputError {
    #[error("{contract} output is empty")]
    Empty { contract: OutputContract },
    #[error("{contract} output contains no JSON object")]
    NoJson { contract: OutputContract },
    #[error("{contract} output is not valid JSON: {reason}")]
    InvalidJson {
        contract: OutputContract,
        reason: String,
    },
    #[error("{contract} output violates its schema: {details}")]
    SchemaViolation {
        contract: OutputContract,
        details: String,
    },
    #[error("{contract} output could not be decoded: {reason}")]
    Decode {
        contract: OutputContract,
        reason: String,
    },
    #[error("{contract} output failed validation: {details}")]
    Semantic {
        contract: OutputContract,
        details: String,
    },
}

fn parse_structured<T>(contract: OutputContract, text: &str) -> Result<T, OutputError>
where
    T: DeserializeOwned + JsonSchema,
{
    if text.trim().is_empty() {
        return Err(OutputError::Empty { contract });
    }

    let json_text = extract_json(text).ok_or(OutputError::NoJson { contract })?;
    let value: Value = serde_json::from_str(&json_text).map_err(|e| OutputError::InvalidJson {
        contract,
        reason: e.to_string(),
    })?;

    let schema = serde_json::to_value(schemars::schema_for!(T)).map_err(|e| {
        OutputError::SchemaViolation {
            contract,
            details: format!("schema generation failed: {e}"),
        }
    })?;
    validate_against(&schema, &value)
        .map_err(|details| OutputError::SchemaViolation { contract, details })?;

    serde_json::from_value(value).map_err(|e| OutputError::Decode {
        contract,
        reason: e.to_string(),
    })
}

fn semantic(contract: OutputContract, result: Result<(), String>) -> Result<(), OutputError> {
    result.map_err(|details| OutputError::Semantic { contract, details })
}

/// Pull the JSON object out of a model reply: a ```json fence first, then
/// any fence holding an object, then the first balanced object in the text.
pub fn extract_json(text: &str) -> Option<String> {
    extract_json_from_markdown(text).or_else(|| find_json_object(text))
}

fn extract_json_from_markdown(text: &str) -> Option<String> {
    if let Some(start) = text.find("```json") {
        let content = &text[start + 7..];
        if let Some(end) = content.find("```") {
            return Some(content[..end].trim().to_string());
        }
    }

    if let Some(start) = text.find("```") {
        let content = &text[start + 3..];
        if let Some(end) = content.find("```") {
            // Skip an info string such as ```JSON
            let body = content[..end]
                .trim_start_matches(|c: char| c.is_ascii_alphanumeric())
                .trim();
            if body.starts_with('{') && body.ends_with('}') {
                return Some(body.to_string());
            }
        }
    }

    None
}

/// First balanced `{...}` that parses as JSON. Braces inside string
/// literals are ignored.
fn find_json_object(text: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' if start.is_some() => in_string = true,
            '{' => {
                if start.is_none() {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(s) = start.take() {
                        let candidate = &text[s..=i];
                        if serde_json::from_str::<Value>(candidate).is_ok() {
                            return Some(candidate.to_string());
                        }
                    }
                }
            }
            _ => {}
        }
    }

    None
}

/// Labels of expected briefing sections that the text does not mention
pub fn missing_briefing_sections(text: &str) -> Vec<&'static str> {
    let lowered = text.to_lowercase();
    BRIEFING_SECTIONS
        .iter()
        .filter(|(_, marker)| !lowered.contains(marker))
        .map(|(label, _)| *label)
        .collect()
}
