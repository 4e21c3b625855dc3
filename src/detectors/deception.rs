//! Deception and propaganda detection pass.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::article::Article;
use crate::gateway::{ChatGateway, ProviderError};
use crate::prompts::{DECEPTION_PROMPT, DECEPTION_PROMPT_SIMPLE};
use crate::severity::{Severity, DECEPTION_DEDUCTIONS};

use super::{discover_array, first_str, invoke_structured, normalize_findings, FieldMap, Finding};

/// Key names the model has been observed using for the findings array.
pub const KNOWN_KEYS: &[&str] = &[
    "techniques",
    "deceptions",
    "manipulations",
    "manipulation_techniques",
    "findings",
    "items",
];

const FIELDS: FieldMap = FieldMap {
    category: &["technique", "type", "category", "name"],
    quote: &["quote", "statement", "text"],
    context: &["context", "surrounding_context"],
    explanation: &["explanation", "reason", "why"],
};

const RISK_KEYS: &[&str] = &["overall_risk", "overallRisk", "risk"];

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeceptionReport {
    pub findings: Vec<Finding>,
    /// Model-reported overall manipulation risk; defaults to medium.
    pub overall_risk: Severity,
}

impl DeceptionReport {
    pub fn degraded() -> Self {
        Self {
            findings: Vec::new(),
            overall_risk: Severity::Medium,
        }
    }
}

pub fn normalize(raw: &[Value]) -> Vec<Finding> {
    normalize_findings(raw, &FIELDS, &DECEPTION_DEDUCTIONS)
}

pub fn from_value(value: &Value) -> DeceptionReport {
    let overall_risk =
        Severity::parse(&first_str(value, RISK_KEYS)).unwrap_or(Severity::Medium);

    match discover_array(value, KNOWN_KEYS) {
        Some(items) => DeceptionReport {
            findings: normalize(items),
            overall_risk,
        },
        None => {
            debug!("deception response parsed but contained no findings array");
            DeceptionReport {
                findings: Vec::new(),
                overall_risk,
            }
        }
    }
}

/// Run the deception pass. Soft-fail.
pub async fn run(
    gateway: &dyn ChatGateway,
    model: &str,
    article: &Article,
    debug: bool,
) -> DeceptionReport {
    match try_run(gateway, model, article, debug).await {
        Ok(report) => report,
        Err(err) => {
            warn!(error = %err, "deception detection failed, using empty result");
            DeceptionReport::degraded()
        }
    }
}

async fn try_run(
    gateway: &dyn ChatGateway,
    model: &str,
    article: &Article,
    debug: bool,
) -> Result<DeceptionReport, ProviderError> {
    let structured = invoke_structured(
        gateway,
        model,
        DECEPTION_PROMPT.render(article),
        Some(DECEPTION_PROMPT_SIMPLE.render(article)),
        debug,
    )
    .await?;

    Ok(match structured {
        Some(value) => from_value(&value),
        None => {
            debug!("deception response had no parseable structure");
            DeceptionReport::degraded()
        }
    })
}
