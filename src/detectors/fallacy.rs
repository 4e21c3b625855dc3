//! Logical fallacy detection pass.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::article::Article;
use crate::gateway::{ChatGateway, ProviderError};
use crate::prompts::{FALLACY_PROMPT, FALLACY_PROMPT_SIMPLE};
use crate::severity::{weighted_logic_score, FALLACY_DEDUCTIONS};

use super::{
    discover_array, invoke_structured, normalize_findings, raw_severities, FieldMap, Finding,
};

/// Key names the model has been observed using for the findings array.
pub const KNOWN_KEYS: &[&str] = &[
    "fallacies",
    "fallacies_detected",
    "logical_fallacies",
    "findings",
    "items",
];

const FIELDS: FieldMap = FieldMap {
    category: &["type", "fallacy", "fallacy_type", "category", "name"],
    quote: &["quote", "statement", "user_statement", "text"],
    context: &["context", "surrounding_context"],
    explanation: &["explanation", "reason", "why"],
};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FallacyReport {
    pub findings: Vec<Finding>,
    /// Severity-weighted logic score for the article, 0..100.
    pub score: f64,
}

impl FallacyReport {
    /// Result when the detector could not analyze anything: no findings,
    /// neutral score (zero analyzed units).
    pub fn degraded() -> Self {
        Self {
            findings: Vec::new(),
            score: weighted_logic_score(&[], 0),
        }
    }
}

/// Normalize raw finding elements into typed findings.
pub fn normalize(raw: &[Value]) -> Vec<Finding> {
    normalize_findings(raw, &FIELDS, &FALLACY_DEDUCTIONS)
}

/// Build a report from an extracted structure. One article = one analyzed
/// unit for the logic score.
pub fn from_value(value: &Value) -> FallacyReport {
    match discover_array(value, KNOWN_KEYS) {
        Some(items) => {
            let severities = raw_severities(items);
            let refs: Vec<&str> = severities.iter().map(String::as_str).collect();
            FallacyReport {
                findings: normalize(items),
                score: weighted_logic_score(&refs, 1),
            }
        }
        None => {
            debug!("fallacy response parsed but contained no findings array");
            FallacyReport {
                findings: Vec::new(),
                score: weighted_logic_score(&[], 1),
            }
        }
    }
}

/// Run the fallacy pass. Soft-fail: invocation errors degrade to an empty
/// neutral report and a warning, never an error.
pub async fn run(
    gateway: &dyn ChatGateway,
    model: &str,
    article: &Article,
    debug: bool,
) -> FallacyReport {
    match try_run(gateway, model, article, debug).await {
        Ok(report) => report,
        Err(err) => {
            warn!(error = %err, "fallacy detection failed, using empty result");
            FallacyReport::degraded()
        }
    }
}

async fn try_run(
    gateway: &dyn ChatGateway,
    model: &str,
    article: &Article,
    debug: bool,
) -> Result<FallacyReport, ProviderError> {
    let structured = invoke_structured(
        gateway,
        model,
        FALLACY_PROMPT.render(article),
        Some(FALLACY_PROMPT_SIMPLE.render(article)),
        debug,
    )
    .await?;

    Ok(match structured {
        Some(value) => from_value(&value),
        None => {
            debug!("fallacy response had no parseable structure");
            FallacyReport::degraded()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_from_findings() {
        let value = json!({"fallacies": [
            {"type": "strawman", "quote": "q", "severity": "high", "explanation": "e"}
        ]});
        let report = from_value(&value);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].category, "strawman");
        assert_eq!(report.findings[0].deduction, -4);
        // One high finding over one unit: 100 - 20*3 = 40.
        assert!((report.score - 40.0).abs() < 1e-9);
    }

    #[test]
    fn zero_findings_scores_perfect() {
        let report = from_value(&json!({"fallacies": []}));
        assert!(report.findings.is_empty());
        assert!((report.score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn missing_array_is_zero_findings() {
        let report = from_value(&json!({"notes": "nothing found"}));
        assert!(report.findings.is_empty());
        assert!((report.score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn key_drift_root_array() {
        let report = from_value(&json!([{"type": "ad_hominem", "severity": "low"}]));
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].deduction, -1);
    }

    #[test]
    fn key_drift_nested_wrapper() {
        let value = json!({"result": {"logical_fallacies": [{"type": "red_herring"}]}});
        let report = from_value(&value);
        assert_eq!(report.findings.len(), 1);
    }

    #[test]
    fn degraded_report_is_neutral() {
        let report = FallacyReport::degraded();
        assert!(report.findings.is_empty());
        assert!((report.score - 50.0).abs() < 1e-9);
    }
}
