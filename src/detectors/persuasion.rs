//! Persuasion and radicalization analysis pass.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::article::Article;
use crate::gateway::{ChatGateway, ProviderError};
use crate::prompts::{PERSUASION_PROMPT, PERSUASION_PROMPT_SIMPLE};
use crate::severity::{Severity, PERSUASION_DEDUCTIONS};

use super::{discover_array, first_str, invoke_structured, normalize_findings, FieldMap, Finding};

pub const KNOWN_KEYS: &[&str] = &[
    "markers",
    "patterns",
    "persuasion_markers",
    "findings",
    "items",
];

const FIELDS: FieldMap = FieldMap {
    category: &["pattern", "type", "category", "name"],
    quote: &["quote", "statement", "text"],
    context: &["context", "surrounding_context"],
    explanation: &["explanation", "reason", "why"],
};

const RISK_KEYS: &[&str] = &["overall_risk", "overallRisk", "radicalization_risk", "risk"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersuasionReport {
    pub findings: Vec<Finding>,
    /// Model-reported radicalization pressure; defaults to medium.
    pub overall_risk: Severity,
}

impl PersuasionReport {
    pub fn degraded() -> Self {
        Self {
            findings: Vec::new(),
            overall_risk: Severity::Medium,
        }
    }
}

pub fn normalize(raw: &[Value]) -> Vec<Finding> {
    normalize_findings(raw, &FIELDS, &PERSUASION_DEDUCTIONS)
}

pub fn from_value(value: &Value) -> PersuasionReport {
    let overall_risk =
        Severity::parse(&first_str(value, RISK_KEYS)).unwrap_or(Severity::Medium);

    match discover_array(value, KNOWN_KEYS) {
        Some(items) => PersuasionReport {
            findings: normalize(items),
            overall_risk,
        },
        None => {
            debug!("persuasion response parsed but contained no findings array");
            PersuasionReport {
                findings: Vec::new(),
                overall_risk,
            }
        }
    }
}

/// Run the persuasion pass. Soft-fail.
pub async fn run(
    gateway: &dyn ChatGateway,
    model: &str,
    article: &Article,
    debug: bool,
) -> PersuasionReport {
    match try_run(gateway, model, article, debug).await {
        Ok(report) => report,
        Err(err) => {
            warn!(error = %err, "persuasion analysis failed, using empty result");
            PersuasionReport::degraded()
        }
    }
}

async fn try_run(
    gateway: &dyn ChatGateway,
    model: &str,
    article: &Article,
    debug: bool,
) -> Result<PersuasionReport, ProviderError> {
    let structured = invoke_structured(
        gateway,
        model,
        PERSUASION_PROMPT.render(article),
        Some(PERSUASION_PROMPT_SIMPLE.render(article)),
        debug,
    )
    .await?;

    Ok(match structured {
        Some(value) => from_value(&value),
        None => {
            debug!("persuasion response had no parseable structure");
            PersuasionReport::degraded()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_parses_markers() {
        let value = json!({
            "markers": [{"pattern": "us_vs_them", "quote": "q", "severity": "high"}],
            "overall_risk": "low"
        });
        let report = from_value(&value);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].category, "us_vs_them");
        assert_eq!(report.findings[0].deduction, -5);
        assert_eq!(report.overall_risk, Severity::Low);
    }

    #[test]
    fn malformed_elements_still_counted() {
        let value = json!({"markers": [{"pattern": "urgency"}, "garbage", null]});
        let report = from_value(&value);
        assert_eq!(report.findings.len(), 3);
        assert_eq!(report.findings[1].severity, Severity::Medium);
    }
}
