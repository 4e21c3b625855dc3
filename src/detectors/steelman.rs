//! Perspective steel-manning pass.
//!
//! The only detector with a code-level guardrail: steel-manning an article
//! that was never really extracted produces pure fabrication, so the gate
//! runs before any generative call. A rejected article yields an empty
//! perspective list, every time, with zero external calls.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::article::{has_valid_content, Article};
use crate::gateway::{ChatGateway, ProviderError};
use crate::prompts::{STEELMAN_PROMPT, STEELMAN_PROMPT_SIMPLE};

use super::{discover_array, first_num, first_str, invoke_structured, str_array};

pub const KNOWN_KEYS: &[&str] = &[
    "perspectives",
    "steelmanned_perspectives",
    "positions",
    "items",
];

/// The strongest defensible version of one position.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SteelMannedVersion {
    pub core_claim: String,
    pub strongest_arguments: Vec<String>,
    pub best_evidence: Vec<String>,
    pub logical_structure: String,
    pub anticipated_counterarguments: Vec<String>,
    /// 0..100, clamped.
    pub quality_score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SteelMannedPerspective {
    pub id: Uuid,
    pub label: String,
    pub original_strength: String,
    pub steel_manned_version: SteelMannedVersion,
    pub source_in_article: Vec<String>,
    pub is_implicit: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SteelmanReport {
    pub perspectives: Vec<SteelMannedPerspective>,
}

/// Normalize raw perspective elements. Map, not filter.
pub fn normalize(raw: &[Value]) -> Vec<SteelMannedPerspective> {
    raw.iter()
        .map(|item| {
            let version = item
                .get("steelMannedVersion")
                .or_else(|| item.get("steel_manned_version"))
                .or_else(|| item.get("steelmanned"))
                .unwrap_or(&Value::Null);

            SteelMannedPerspective {
                id: Uuid::new_v4(),
                label: first_str(item, &["label", "name", "position"]),
                original_strength: first_str(item, &["originalStrength", "original_strength"]),
                steel_manned_version: SteelMannedVersion {
                    core_claim: first_str(version, &["coreClaim", "core_claim", "claim"]),
                    strongest_arguments: str_array(
                        version,
                        &["strongestArguments", "strongest_arguments", "arguments"],
                    ),
                    best_evidence: str_array(version, &["bestEvidence", "best_evidence", "evidence"]),
                    logical_structure: first_str(
                        version,
                        &["logicalStructure", "logical_structure"],
                    ),
                    anticipated_counterarguments: str_array(
                        version,
                        &[
                            "anticipatedCounterarguments",
                            "anticipated_counterarguments",
                            "counterarguments",
                        ],
                    ),
                    quality_score: first_num(version, &["qualityScore", "quality_score", "score"])
                        .unwrap_or(0.0)
                        .clamp(0.0, 100.0),
                },
                source_in_article: str_array(item, &["sourceInArticle", "source_in_article"]),
                is_implicit: item
                    .get("isImplicit")
                    .or_else(|| item.get("is_implicit"))
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            }
        })
        .collect()
}

pub fn from_value(value: &Value) -> SteelmanReport {
    match discover_array(value, KNOWN_KEYS) {
        Some(items) => SteelmanReport {
            perspectives: normalize(items),
        },
        None => {
            debug!("steelman response parsed but contained no perspectives array");
            SteelmanReport::default()
        }
    }
}

/// Run the steel-manning pass. Guardrailed, then soft-fail.
pub async fn run(
    gateway: &dyn ChatGateway,
    model: &str,
    article: &Article,
    debug: bool,
) -> SteelmanReport {
    if !has_valid_content(article) {
        debug!("guardrail rejected article, skipping steel-manning");
        return SteelmanReport::default();
    }

    match try_run(gateway, model, article, debug).await {
        Ok(report) => report,
        Err(err) => {
            warn!(error = %err, "steel-manning failed, using empty result");
            SteelmanReport::default()
        }
    }
}

async fn try_run(
    gateway: &dyn ChatGateway,
    model: &str,
    article: &Article,
    debug: bool,
) -> Result<SteelmanReport, ProviderError> {
    let structured = invoke_structured(
        gateway,
        model,
        STEELMAN_PROMPT.render(article),
        Some(STEELMAN_PROMPT_SIMPLE.render(article)),
        debug,
    )
    .await?;

    Ok(match structured {
        Some(value) => from_value(&value),
        None => {
            debug!("steelman response had no parseable structure");
            SteelmanReport::default()
        }
    })
}
