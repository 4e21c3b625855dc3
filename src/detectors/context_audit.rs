//! Context-omission audit pass.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::article::Article;
use crate::gateway::{ChatGateway, ProviderError};
use crate::prompts::{CONTEXT_AUDIT_PROMPT, CONTEXT_AUDIT_PROMPT_SIMPLE};
use crate::severity::CONTEXT_AUDIT_DEDUCTIONS;

use super::{discover_array, invoke_structured, normalize_findings, FieldMap, Finding};

pub const KNOWN_KEYS: &[&str] = &[
    "omissions",
    "omitted_context",
    "context_omissions",
    "missing_context",
    "findings",
    "items",
];

const FIELDS: FieldMap = FieldMap {
    category: &["category", "type", "name"],
    quote: &["quote", "statement", "text"],
    context: &["context", "what_is_missing", "missing"],
    explanation: &["explanation", "reason", "why"],
};

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextAuditReport {
    pub findings: Vec<Finding>,
}

pub fn normalize(raw: &[Value]) -> Vec<Finding> {
    normalize_findings(raw, &FIELDS, &CONTEXT_AUDIT_DEDUCTIONS)
}

pub fn from_value(value: &Value) -> ContextAuditReport {
    match discover_array(value, KNOWN_KEYS) {
        Some(items) => ContextAuditReport {
            findings: normalize(items),
        },
        None => {
            debug!("context audit response parsed but contained no findings array");
            ContextAuditReport::default()
        }
    }
}

/// Run the context audit pass. Soft-fail.
pub async fn run(
    gateway: &dyn ChatGateway,
    model: &str,
    article: &Article,
    debug: bool,
) -> ContextAuditReport {
    match try_run(gateway, model, article, debug).await {
        Ok(report) => report,
        Err(err) => {
            warn!(error = %err, "context audit failed, using empty result");
            ContextAuditReport::default()
        }
    }
}

async fn try_run(
    gateway: &dyn ChatGateway,
    model: &str,
    article: &Article,
    debug: bool,
) -> Result<ContextAuditReport, ProviderError> {
    let structured = invoke_structured(
        gateway,
        model,
        CONTEXT_AUDIT_PROMPT.render(article),
        Some(CONTEXT_AUDIT_PROMPT_SIMPLE.render(article)),
        debug,
    )
    .await?;

    Ok(match structured {
        Some(value) => from_value(&value),
        None => {
            debug!("context audit response had no parseable structure");
            ContextAuditReport::default()
        }
    })
}
