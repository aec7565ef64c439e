//! Structured-payload extraction from completion text.
//!
//! Language models wrap JSON in prose, fence it in markdown code blocks, or
//! leave trailing commas behind. [`parse_structured`] tries a fixed ladder
//! of recovery strategies before giving up:
//! 1. Direct `serde_json` deserialization
//! 2. Extract JSON from markdown code blocks
//! 3. Cut the span between the first opening and last closing bracket
//!
//! Each candidate is retried with trailing commas stripped.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use socialsim_types::{MetricDraft, PersonaDraft};

use crate::error::SimulationError;

/// Parse a metric-evaluation reply: a JSON object of metric name to number.
///
/// Values may be numbers or numeric strings; anything else fails the whole
/// reply.
///
/// # Errors
///
/// [`SimulationError::Parse`] if no strategy yields such an object.
pub fn parse_scores(raw: &str) -> Result<BTreeMap<String, f64>, SimulationError> {
    let values: BTreeMap<String, Score> = parse_structured(raw, '{', '}')?;
    Ok(values.into_iter().map(|(name, score)| (name, score.0)).collect())
}

/// Parse a persona-generation reply: a JSON array of persona objects.
///
/// # Errors
///
/// [`SimulationError::Parse`] if no strategy yields a non-empty array.
pub fn parse_persona_drafts(raw: &str) -> Result<Vec<PersonaDraft>, SimulationError> {
    let drafts: Vec<GeneratedPersona> = parse_structured(raw, '[', ']')?;
    let drafts: Vec<PersonaDraft> = drafts
        .into_iter()
        .filter(|d| !d.name.trim().is_empty())
        .map(GeneratedPersona::into_draft)
        .collect();
    if drafts.is_empty() {
        return Err(SimulationError::Parse(
            "persona list contained no named personas".to_owned(),
        ));
    }
    Ok(drafts)
}

/// Parse a metric-drafting reply: a single JSON metric object.
///
/// # Errors
///
/// [`SimulationError::Parse`] if no strategy yields a metric object.
pub fn parse_metric_draft(raw: &str) -> Result<MetricDraft, SimulationError> {
    parse_structured(raw, '{', '}')
}

/// Deserialize `T` from `raw` using every recovery strategy in turn.
///
/// `open` and `close` delimit the outermost JSON value expected.
///
/// # Errors
///
/// [`SimulationError::Parse`] carrying the first deserialization error when
/// all strategies fail.
pub fn parse_structured<T: DeserializeOwned>(
    raw: &str,
    open: char,
    close: char,
) -> Result<T, SimulationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SimulationError::Parse("empty response".to_owned()));
    }

    let mut candidates: Vec<&str> = vec![trimmed];
    if let Some(block) = extract_json_from_codeblock(trimmed) {
        candidates.push(block);
    }
    if let Some(span) = extract_bracketed(trimmed, open, close) {
        candidates.push(span);
    }

    let mut first_error = None;
    for candidate in candidates {
        match serde_json::from_str::<T>(candidate) {
            Ok(value) => return Ok(value),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
        if let Ok(value) = serde_json::from_str::<T>(&strip_trailing_commas(candidate)) {
            return Ok(value);
        }
    }

    let reason = first_error.map_or_else(|| "no JSON found".to_owned(), |e| e.to_string());
    Err(SimulationError::Parse(reason))
}

/// A metric score that may arrive as a number or a numeric string.
#[derive(Debug, Deserialize)]
#[serde(try_from = "serde_json::Value")]
struct Score(f64);

impl TryFrom<serde_json::Value> for Score {
    type Error = String;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::Number(n) => n
                .as_f64()
                .map(Self)
                .ok_or_else(|| format!("number {n} out of range")),
            serde_json::Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Self)
                .map_err(|e| format!("score {s:?} is not numeric: {e}")),
            other => Err(format!("score must be a number, got {other}")),
        }
    }
}

/// Persona fields as a model returns them; every field is optional.
#[derive(Debug, Deserialize)]
struct GeneratedPersona {
    #[serde(default)]
    name: String,
    #[serde(default)]
    personality: String,
    #[serde(default)]
    goal: String,
    #[serde(default)]
    memory: String,
}

impl GeneratedPersona {
    fn into_draft(self) -> PersonaDraft {
        PersonaDraft {
            id: None,
            name: self.name.trim().to_owned(),
            personality: self.personality,
            goal: self.goal,
            memory: self.memory,
        }
    }
}

/// Extract JSON from a markdown code block.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let fence = text.find("```")?;
    let after_tag = fence.checked_add(3)?;
    let body_start = text
        .get(after_tag..)
        .and_then(|s| s.find('\n'))
        .and_then(|nl| after_tag.checked_add(nl))
        .and_then(|pos| pos.checked_add(1))?;
    let remaining = text.get(body_start..)?;
    let end = remaining.find("```")?;
    remaining.get(..end).map(str::trim)
}

/// The span from the first `open` to the last `close`, inclusive.
fn extract_bracketed(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end < start {
        return None;
    }
    text.get(start..=end)
}

/// Strip trailing commas before closing braces and brackets.
fn strip_trailing_commas(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == ',' {
            let rest: String = chars.clone().skip_while(|n| n.is_whitespace()).take(1).collect();
            if rest == "}" || rest == "]" {
                continue;
            }
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn score(map: &BTreeMap<String, f64>, name: &str) -> f64 {
        map.get(name).copied().unwrap()
    }

    #[test]
    fn scores_parse_directly() {
        let scores = parse_scores(r#"{"tension": 42, "trust": 7.5}"#).unwrap();
        assert!((score(&scores, "tension") - 42.0).abs() < f64::EPSILON);
        assert!((score(&scores, "trust") - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn scores_parse_from_prose_and_codeblock() {
        let prose = "Here are the values: {\"tension\": 60} based on recent events.";
        assert!((score(&parse_scores(prose).unwrap(), "tension") - 60.0).abs() < f64::EPSILON);

        let fenced = "```json\n{\"tension\": 61,}\n```";
        assert!((score(&parse_scores(fenced).unwrap(), "tension") - 61.0).abs() < f64::EPSILON);
    }

    #[test]
    fn numeric_strings_are_accepted() {
        let scores = parse_scores(r#"{"tension": " 12.5 "}"#).unwrap();
        assert!((score(&scores, "tension") - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn non_numeric_scores_fail() {
        assert!(matches!(
            parse_scores(r#"{"tension": "high"}"#),
            Err(SimulationError::Parse(_))
        ));
        assert!(matches!(parse_scores("no idea"), Err(SimulationError::Parse(_))));
        assert!(matches!(parse_scores(""), Err(SimulationError::Parse(_))));
    }

    #[test]
    fn persona_array_is_extracted() {
        let raw = r#"Sure! Here they are:
[
  {"name": "Ada", "personality": "curious", "goal": "map the valley", "memory": "grew up by the river"},
  {"name": "Bo", "personality": "wary"},
]"#;
        let drafts = parse_persona_drafts(raw).unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts.first().unwrap().name, "Ada");
        assert!(drafts.iter().all(|d| d.id.is_none()));
    }

    #[test]
    fn persona_array_without_names_fails() {
        assert!(matches!(
            parse_persona_drafts(r#"[{"name": "  "}]"#),
            Err(SimulationError::Parse(_))
        ));
        assert!(matches!(parse_persona_drafts("[]"), Err(SimulationError::Parse(_))));
    }

    #[test]
    fn metric_draft_defaults_bounds() {
        let draft = parse_metric_draft(r#"{"name": "Trust", "description": "how much"}"#).unwrap();
        assert_eq!(draft.name, "Trust");
        assert!(draft.min.abs() < f64::EPSILON);
        assert!((draft.max - 100.0).abs() < f64::EPSILON);
        assert!(draft.unit.is_empty());
    }

    #[test]
    fn extract_json_from_plain_codeblock() {
        let text = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(extract_json_from_codeblock(text), Some("{\"key\": \"value\"}"));
    }

    #[test]
    fn strip_trailing_commas_basic() {
        assert_eq!(strip_trailing_commas(r#"{"a": 1, "b": 2,}"#), r#"{"a": 1, "b": 2}"#);
        assert_eq!(strip_trailing_commas("[1, 2, 3,\n]"), "[1, 2, 3\n]");
    }
}
