//! Independent fact-checking pass.
//!
//! Unlike the soft detectors, the verdict call here is an explicit-failure
//! path: if the generative backend cannot be reached for a claim that has
//! real evidence, the whole analysis is aborted rather than silently
//! shipping a report that pretends the claim was checked. Search-side
//! problems stay per-claim: a failed or empty research round yields an
//! inconclusive verdict with a diagnostic methodology tag.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::article::Article;
use crate::gateway::ChatGateway;
use crate::pipeline::PipelineError;
use crate::prompts::render_fact_check;
use crate::research::{gather_evidence, MAX_CLAIMS_PER_ARTICLE};
use crate::search::SearchProvider;

use super::{first_num, first_str, invoke_structured, str_array};

/// Fixed confidence for verdicts that never reached the generative backend.
pub const INCONCLUSIVE_CONFIDENCE: f64 = 30.0;

/// Methodology tag when research found nothing.
pub const METHODOLOGY_NO_RESULTS: &str = "no_search_results";

/// Methodology tag when every search query failed.
pub const METHODOLOGY_SEARCH_FAILED: &str = "search_failed";

/// Chars of article body passed as context to the verdict prompt.
const CONTEXT_SNIPPET_CHARS: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verification {
    Supported,
    Refuted,
    Mixed,
    Inconclusive,
}

impl Verification {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "supported" | "true" | "verified" => Some(Self::Supported),
            "refuted" | "false" | "debunked" => Some(Self::Refuted),
            "mixed" | "partial" | "partially_supported" => Some(Self::Mixed),
            "inconclusive" | "unverified" | "unknown" => Some(Self::Inconclusive),
            _ => None,
        }
    }
}

/// Three-tier confidence ranking of fact-check sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceHierarchy {
    Primary,
    Secondary,
    Tertiary,
}

impl EvidenceHierarchy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "primary" => Some(Self::Primary),
            "secondary" => Some(Self::Secondary),
            "tertiary" => Some(Self::Tertiary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactCheckVerdict {
    pub claim_id: String,
    pub verification: Verification,
    /// 0..100, clamped.
    pub confidence: f64,
    pub evidence_hierarchy: EvidenceHierarchy,
    pub sources: Vec<String>,
    pub methodology: String,
    /// 0..100, clamped.
    pub methodology_score: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FactCheckReport {
    pub verdicts: Vec<FactCheckVerdict>,
    /// Mean methodology score across verdicts; 0 when nothing was checked.
    pub methodology_score: f64,
}

/// Normalize a model verdict. Missing structure or missing fields all fall
/// through to defaults: inconclusive, confidence 0, tertiary evidence.
pub fn normalize_verdict(claim_id: String, value: Option<&Value>) -> FactCheckVerdict {
    let value = value.unwrap_or(&Value::Null);

    FactCheckVerdict {
        claim_id,
        verification: Verification::parse(&first_str(
            value,
            &["verification", "verdict", "result"],
        ))
        .unwrap_or(Verification::Inconclusive),
        confidence: first_num(value, &["confidence"])
            .unwrap_or(0.0)
            .clamp(0.0, 100.0),
        evidence_hierarchy: EvidenceHierarchy::parse(&first_str(
            value,
            &["evidenceHierarchy", "evidence_hierarchy", "hierarchy"],
        ))
        .unwrap_or(EvidenceHierarchy::Tertiary),
        sources: str_array(value, &["sources", "source_urls"]),
        methodology: first_str(value, &["methodology"]),
        methodology_score: first_num(value, &["methodologyScore", "methodology_score"])
            .unwrap_or(0.0)
            .clamp(0.0, 100.0),
    }
}

/// Verdict for a claim whose research never produced usable evidence. The
/// generative backend is deliberately not asked: verifying a claim with no
/// supporting evidence invites fabrication.
pub fn inconclusive_verdict(claim_id: String, methodology: &str) -> FactCheckVerdict {
    FactCheckVerdict {
        claim_id,
        verification: Verification::Inconclusive,
        confidence: INCONCLUSIVE_CONFIDENCE,
        evidence_hierarchy: EvidenceHierarchy::Tertiary,
        sources: Vec::new(),
        methodology: methodology.to_string(),
        methodology_score: 0.0,
    }
}

fn context_snippet(article: &Article) -> String {
    article
        .content
        .body
        .trim()
        .chars()
        .take(CONTEXT_SNIPPET_CHARS)
        .collect()
}

/// Run the fact-check pass over the article's most important claims.
pub async fn run(
    gateway: &dyn ChatGateway,
    search: &dyn SearchProvider,
    model: &str,
    article: &Article,
    debug: bool,
) -> Result<FactCheckReport, PipelineError> {
    let mut verdicts = Vec::new();

    for claim in article
        .ranked_claims()
        .into_iter()
        .take(MAX_CLAIMS_PER_ARTICLE)
    {
        let claim_id = if claim.id.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            claim.id.clone()
        };

        match gather_evidence(search, &claim.text, &article.publication).await {
            Err(err) => {
                warn!(error = %err, claim = %claim_id, "claim research failed");
                verdicts.push(inconclusive_verdict(claim_id, METHODOLOGY_SEARCH_FAILED));
            }
            Ok(evidence) if evidence.is_empty() => {
                verdicts.push(inconclusive_verdict(claim_id, METHODOLOGY_NO_RESULTS));
            }
            Ok(evidence) => {
                let prompt = render_fact_check(&claim.text, &context_snippet(article), &evidence);
                let structured = invoke_structured(gateway, model, prompt, None, debug)
                    .await
                    .map_err(|e| PipelineError::stage("Fact check", e))?;
                verdicts.push(normalize_verdict(claim_id, structured.as_ref()));
            }
        }
    }

    let methodology_score = if verdicts.is_empty() {
        0.0
    } else {
        verdicts.iter().map(|v| v.methodology_score).sum::<f64>() / verdicts.len() as f64
    };

    Ok(FactCheckReport {
        verdicts,
        methodology_score,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_full_verdict() {
        let value = json!({
            "verification": "supported",
            "confidence": 85,
            "evidenceHierarchy": "primary",
            "sources": ["https://a.example"],
            "methodology": "cross_referenced",
            "methodologyScore": 70
        });
        let v = normalize_verdict("c1".into(), Some(&value));
        assert_eq!(v.verification, Verification::Supported);
        assert!((v.confidence - 85.0).abs() < 1e-9);
        assert_eq!(v.evidence_hierarchy, EvidenceHierarchy::Primary);
        assert_eq!(v.sources.len(), 1);
    }

    #[test]
    fn confidence_clamped_to_range() {
        let v = normalize_verdict("c".into(), Some(&json!({"confidence": 180})));
        assert!((v.confidence - 100.0).abs() < 1e-9);
        let v = normalize_verdict("c".into(), Some(&json!({"confidence": -5})));
        assert!((v.confidence - 0.0).abs() < 1e-9);
    }

    #[test]
    fn hierarchy_defaults_to_tertiary() {
        let v = normalize_verdict("c".into(), Some(&json!({"verification": "mixed"})));
        assert_eq!(v.evidence_hierarchy, EvidenceHierarchy::Tertiary);
    }

    #[test]
    fn missing_structure_defaults_everything() {
        let v = normalize_verdict("c".into(), None);
        assert_eq!(v.verification, Verification::Inconclusive);
        assert!((v.confidence - 0.0).abs() < 1e-9);
        assert_eq!(v.evidence_hierarchy, EvidenceHierarchy::Tertiary);
    }

    #[test]
    fn inconclusive_verdict_shape() {
        let v = inconclusive_verdict("c9".into(), METHODOLOGY_NO_RESULTS);
        assert_eq!(v.verification, Verification::Inconclusive);
        assert!((v.confidence - 30.0).abs() < 1e-9);
        assert_eq!(v.methodology, "no_search_results");
    }
}
