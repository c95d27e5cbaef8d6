//! Validation of agent replies against per-call-site schemas.

use crate::agent::{AgentRequest, AnalysisAgent};
use crate::error::AgentError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Result of validating one agent reply against an expected schema.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutcome<T> {
    Parsed(T),
    Unparsed { raw: Value, reason: String },
}

impl<T: DeserializeOwned + Serialize> AgentOutcome<T> {
    /// Validate `raw` as `T`.
    ///
    /// An object carrying an `"error"` key, or sharing no field with the
    /// schema, is unparsed even when it would deserialize into defaults.
    pub fn from_value(raw: Value) -> Self {
        if let Some(marker) = error_marker(&raw) {
            return AgentOutcome::Unparsed {
                raw,
                reason: format!("reply reports an error: {}", marker),
            };
        }

        match serde_json::from_value::<T>(raw.clone()) {
            Ok(parsed) if shares_schema_field(&raw, &parsed) => AgentOutcome::Parsed(parsed),
            Ok(_) => AgentOutcome::Unparsed {
                raw,
                reason: "reply has none of the expected fields".to_string(),
            },
            Err(e) => AgentOutcome::Unparsed {
                raw,
                reason: e.to_string(),
            },
        }
    }
}

/// Text of the `"error"` key of an object reply.
fn error_marker(raw: &Value) -> Option<String> {
    let marker = raw.as_object()?.get("error")?;
    Some(match marker {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    })
}

/// An object reply must name at least one field of the parsed schema.
/// Non-object replies were already checked by deserialization.
fn shares_schema_field<T: Serialize>(raw: &Value, parsed: &T) -> bool {
    let Some(fields) = raw.as_object() else {
        return true;
    };
    match serde_json::to_value(parsed) {
        Ok(Value::Object(schema)) => fields.keys().any(|key| schema.contains_key(key)),
        _ => true,
    }
}

impl<T> AgentOutcome<T> {
    /// An unparsed reply is a failure like any other.
    pub fn into_result(self) -> Result<T, AgentError> {
        match self {
            AgentOutcome::Parsed(parsed) => Ok(parsed),
            AgentOutcome::Unparsed { raw, reason } => {
                debug!("Rejected agent reply: {}", raw);
                Err(AgentError::SchemaMismatch(reason))
            }
        }
    }
}

/// Parse the text content of a reply as JSON.
///
/// Models sometimes wrap the document in a markdown fence or add a sentence
/// around it; the outermost object or array is used in that case.
pub fn parse_json_reply(content: &str) -> Result<Value, AgentError> {
    let trimmed = strip_code_fence(content.trim());

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let start = trimmed.find(&['{', '['][..]);
    let end = trimmed.rfind(&['}', ']'][..]);
    if let (Some(start), Some(end)) = (start, end) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&trimmed[start..=end]) {
                return Ok(value);
            }
        }
    }

    let preview: String = trimmed.chars().take(120).collect();
    Err(AgentError::InvalidJson(preview))
}

fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    // Drop the language tag line, then the closing fence.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Invoke the agent and validate its reply as `T`.
pub async fn invoke_typed<T: DeserializeOwned + Serialize>(
    agent: &dyn AnalysisAgent,
    request: AgentRequest,
) -> Result<T, AgentError> {
    let raw = agent.invoke(request).await?;
    AgentOutcome::<T>::from_value(raw).into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExtractionOutput, Gaps};
    use serde_json::json;

    #[test]
    fn test_parse_plain_json() {
        let value = parse_json_reply(r#"{"a": 1}"#).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_parse_fenced_json() {
        let reply = "```json\n[{\"title\": \"x\"}]\n```";
        assert_eq!(parse_json_reply(reply).unwrap(), json!([{"title": "x"}]));
    }

    #[test]
    fn test_parse_json_with_surrounding_text() {
        let reply = "Here is the analysis:\n{\"strengths\": [\"clear\"]}\nHope this helps.";
        assert_eq!(
            parse_json_reply(reply).unwrap(),
            json!({"strengths": ["clear"]})
        );
    }

    #[test]
    fn test_parse_rejects_prose() {
        let err = parse_json_reply("I could not find any gaps.").unwrap_err();
        assert!(matches!(err, AgentError::InvalidJson(_)));
    }

    #[test]
    fn test_outcome_parsed() {
        let outcome = AgentOutcome::<Gaps>::from_value(json!({
            "missing_benchmarks": ["multilingual QA"]
        }));
        let gaps = outcome.into_result().unwrap();
        assert_eq!(gaps.missing_benchmarks[0].as_str(), "multilingual QA");
    }

    #[test]
    fn test_outcome_unparsed_is_schema_mismatch() {
        let outcome = AgentOutcome::<Gaps>::from_value(json!("no gaps found"));
        assert!(matches!(outcome, AgentOutcome::Unparsed { .. }));
        assert!(matches!(
            outcome.into_result(),
            Err(AgentError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_outcome_error_marker_is_unparsed() {
        let outcome = AgentOutcome::<Gaps>::from_value(json!({"error": "rate limited"}));
        match outcome {
            AgentOutcome::Unparsed { reason, .. } => {
                assert_eq!(reason, "reply reports an error: rate limited")
            }
            AgentOutcome::Parsed(_) => panic!("error marker accepted"),
        }

        // Schema fields alongside the marker do not rescue the reply.
        let outcome = AgentOutcome::<Gaps>::from_value(json!({
            "missing_benchmarks": ["multilingual QA"],
            "error": {"code": 429}
        }));
        assert!(matches!(outcome, AgentOutcome::Unparsed { .. }));
    }

    #[test]
    fn test_outcome_without_schema_fields_is_unparsed() {
        let outcome = AgentOutcome::<Gaps>::from_value(json!({"unrelated": 1}));
        assert!(matches!(
            outcome.into_result(),
            Err(AgentError::SchemaMismatch(reason)) if reason == "reply has none of the expected fields"
        ));

        let outcome = AgentOutcome::<Gaps>::from_value(json!({}));
        assert!(matches!(outcome, AgentOutcome::Unparsed { .. }));
    }

    #[test]
    fn test_outcome_digest_accepts_any_fields_but_not_errors() {
        let outcome = AgentOutcome::<ExtractionOutput>::from_value(json!({"papers": "two summaries"}));
        assert!(matches!(
            outcome,
            AgentOutcome::Parsed(ExtractionOutput::Digest(_))
        ));

        let outcome =
            AgentOutcome::<ExtractionOutput>::from_value(json!({"error": "could not summarize"}));
        assert!(matches!(outcome, AgentOutcome::Unparsed { .. }));
    }
}
