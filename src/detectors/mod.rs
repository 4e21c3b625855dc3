//! Detector passes and the shared normalization machinery.
//!
//! Every detector follows the same contract: render a prompt, invoke the
//! gateway (with the empty-body fallback), extract a structure from whatever
//! text came back, and normalize it into typed findings. Normalization is a
//! map, never a filter — a malformed element still yields a finding with
//! defaults, so totals stay consistent with what the model claimed to find.

pub mod context_audit;
pub mod deception;
pub mod fact_check;
pub mod fallacy;
pub mod persuasion;
pub mod steelman;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::extract::extract_structured;
use crate::gateway::{ChatGateway, ChatModel, ChatRequest, ProviderError};
use crate::prompts::PromptInstance;
use crate::severity::{DeductionTable, Severity};

/// A single flagged instance from a detector.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub id: Uuid,
    pub category: String,
    pub quote: String,
    pub context: String,
    pub severity: Severity,
    pub explanation: String,
    pub deduction: i32,
}

/// Candidate key names for each finding field, first match wins.
#[derive(Debug, Clone, Copy)]
pub struct FieldMap {
    pub category: &'static [&'static str],
    pub quote: &'static [&'static str],
    pub context: &'static [&'static str],
    pub explanation: &'static [&'static str],
}

/// Candidate keys for severity, shared by all detectors.
pub const SEVERITY_KEYS: &[&str] = &["severity", "level"];

/// First non-empty string value among the candidate keys.
pub fn first_str(value: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|k| value.get(k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_default()
}

/// First finite number among the candidate keys.
pub fn first_num(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| value.get(k).and_then(Value::as_f64))
        .find(|n| n.is_finite())
}

/// First string array among the candidate keys; non-string elements skipped.
pub fn str_array(value: &Value, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .filter_map(|k| value.get(k).and_then(Value::as_array))
        .next()
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Resolve the findings array despite key-naming drift.
///
/// Order: (1) ordered known top-level keys, first match wins; (2) the root
/// itself if it is an array; (3) one level of nested objects scanned for any
/// known key. No array anywhere means zero findings — "parsed but empty",
/// which is distinct from extraction failure and logged as such by callers.
pub fn discover_array<'a>(root: &'a Value, known_keys: &[&str]) -> Option<&'a Vec<Value>> {
    for key in known_keys {
        if let Some(arr) = root.get(key).and_then(Value::as_array) {
            return Some(arr);
        }
    }

    if let Some(arr) = root.as_array() {
        return Some(arr);
    }

    if let Some(obj) = root.as_object() {
        for nested in obj.values().filter(|v| v.is_object()) {
            for key in known_keys {
                if let Some(arr) = nested.get(key).and_then(Value::as_array) {
                    return Some(arr);
                }
            }
        }
    }

    None
}

/// Normalize raw elements into findings. Output length equals input length;
/// missing fields default (severity to medium, text to empty, ids fresh).
pub fn normalize_findings(raw: &[Value], fields: &FieldMap, table: &DeductionTable) -> Vec<Finding> {
    raw.iter()
        .map(|item| {
            let raw_severity = first_str(item, SEVERITY_KEYS);
            let raw_severity_opt = (!raw_severity.is_empty()).then_some(raw_severity.as_str());

            Finding {
                id: Uuid::new_v4(),
                category: first_str(item, fields.category),
                quote: first_str(item, fields.quote),
                context: first_str(item, fields.context),
                severity: Severity::parse(&raw_severity).unwrap_or(Severity::Medium),
                explanation: first_str(item, fields.explanation),
                deduction: table.deduction(raw_severity_opt),
            }
        })
        .collect()
}

/// Raw severity strings from a findings array, for the severity-weighted
/// logic score (which applies its own default weighting to unknown values).
pub fn raw_severities(raw: &[Value]) -> Vec<String> {
    raw.iter().map(|item| first_str(item, SEVERITY_KEYS)).collect()
}

/// Default generation budget for a detector pass.
pub const DETECTOR_MAX_OUTPUT_TOKENS: u32 = 4_096;

/// Invoke the gateway and extract a structure from the response.
///
/// The gateway already retries transport failures; this layer adds the other
/// half of the invocation policy: if the call succeeds with an empty body and
/// a simplified prompt is available, exactly one follow-up call is made
/// before giving up. `Ok(None)` means the calls succeeded but no structure
/// could be recovered.
pub async fn invoke_structured(
    gateway: &dyn ChatGateway,
    model: &str,
    primary: PromptInstance,
    fallback: Option<PromptInstance>,
    debug: bool,
) -> Result<Option<Value>, ProviderError> {
    let request = ChatRequest::new(ChatModel::openrouter(model), primary.to_messages())
        .max_tokens(DETECTOR_MAX_OUTPUT_TOKENS)
        .json();

    let response = gateway.chat(request).await?;

    let content = if response.is_empty() {
        match fallback {
            Some(simplified) => {
                debug!(
                    slug = %simplified.template_slug,
                    "empty response, retrying once with simplified prompt"
                );
                let retry =
                    ChatRequest::new(ChatModel::openrouter(model), simplified.to_messages())
                        .max_tokens(DETECTOR_MAX_OUTPUT_TOKENS)
                        .json();
                gateway.chat(retry).await?.content
            }
            None => return Ok(None),
        }
    } else {
        response.content
    };

    Ok(extract_structured(&content, debug))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::FALLACY_DEDUCTIONS;
    use serde_json::json;

    const FIELDS: FieldMap = FieldMap {
        category: &["type", "category"],
        quote: &["quote", "statement"],
        context: &["context"],
        explanation: &["explanation"],
    };

    #[test]
    fn discover_known_key_first_match_wins() {
        let root = json!({"items": [1], "fallacies": [1, 2]});
        // "fallacies" listed first in the detector's known keys.
        let arr = discover_array(&root, &["fallacies", "items"]).unwrap();
        assert_eq!(arr.len(), 2);
    }

    #[test]
    fn discover_root_array() {
        let root = json!([{"type": "strawman"}]);
        assert_eq!(discover_array(&root, &["fallacies"]).unwrap().len(), 1);
    }

    #[test]
    fn discover_nested_one_level() {
        let root = json!({"analysis": {"fallacies": [{"type": "strawman"}]}});
        assert_eq!(discover_array(&root, &["fallacies"]).unwrap().len(), 1);
    }

    #[test]
    fn discover_nothing_is_zero_findings() {
        let root = json!({"summary": "clean article"});
        assert!(discover_array(&root, &["fallacies"]).is_none());
    }

    #[test]
    fn normalize_is_map_not_filter() {
        let raw = vec![
            json!({"type": "strawman", "quote": "q", "severity": "high", "explanation": "e"}),
            json!({"unexpected": true}),
            json!(42),
        ];
        let findings = normalize_findings(&raw, &FIELDS, &FALLACY_DEDUCTIONS);
        assert_eq!(findings.len(), raw.len());
    }

    #[test]
    fn normalize_defaults_malformed_element() {
        let raw = vec![json!({"bogus": 1})];
        let f = &normalize_findings(&raw, &FIELDS, &FALLACY_DEDUCTIONS)[0];
        assert_eq!(f.severity, Severity::Medium);
        assert!(f.category.is_empty());
        assert!(f.quote.is_empty());
        // Missing severity takes the table default, not the medium weight.
        assert_eq!(f.deduction, -2);
    }

    #[test]
    fn normalize_generates_fresh_ids() {
        let raw = vec![json!({}), json!({})];
        let findings = normalize_findings(&raw, &FIELDS, &FALLACY_DEDUCTIONS);
        assert_ne!(findings[0].id, findings[1].id);
    }

    #[test]
    fn normalize_known_severity_uses_table() {
        let raw = vec![json!({"severity": "high"}), json!({"severity": "weird"})];
        let findings = normalize_findings(&raw, &FIELDS, &FALLACY_DEDUCTIONS);
        assert_eq!(findings[0].deduction, -4);
        // Unknown severity string resolves to the default weight, medium label.
        assert_eq!(findings[1].deduction, -2);
        assert_eq!(findings[1].severity, Severity::Medium);
    }

    #[test]
    fn first_str_skips_empty_candidates() {
        let v = json!({"type": "", "category": "ad_hominem"});
        assert_eq!(first_str(&v, &["type", "category"]), "ad_hominem");
    }

    #[test]
    fn str_array_ignores_non_strings() {
        let v = json!({"args": ["a", 2, "b"]});
        assert_eq!(str_array(&v, &["args"]), vec!["a", "b"]);
    }
}
