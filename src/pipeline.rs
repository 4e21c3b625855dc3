//! Analysis orchestration.
//!
//! The six detectors run concurrently against the same article. Five of them
//! fail soft (a degraded section in the report); fact-check verdict calls and
//! the final synthesis fail hard, surfacing a [`PipelineError`] instead of a
//! report.

use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::article::Article;
use crate::detectors::{context_audit, deception, fact_check, fallacy, persuasion, steelman};
use crate::detectors::context_audit::ContextAuditReport;
use crate::detectors::deception::DeceptionReport;
use crate::detectors::fact_check::FactCheckReport;
use crate::detectors::fallacy::FallacyReport;
use crate::detectors::persuasion::PersuasionReport;
use crate::detectors::steelman::SteelmanReport;
use crate::gateway::ChatGateway;
use crate::search::SearchProvider;
use crate::synthesis::{self, CredibilityTier, ScoreBreakdown, SynthesisResult};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} failed: {reason}")]
    Stage { stage: String, reason: String },
}

impl PipelineError {
    pub fn stage(stage: &str, reason: impl fmt::Display) -> Self {
        Self::Stage {
            stage: stage.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// The complete analysis of one article.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub id: Uuid,
    pub headline: String,
    pub truth_score: f64,
    pub breakdown: ScoreBreakdown,
    pub credibility: CredibilityTier,
    pub what_ai_thinks: String,
    pub fallacy: FallacyReport,
    pub deception: DeceptionReport,
    pub persuasion: PersuasionReport,
    pub context_audit: ContextAuditReport,
    pub steelman: SteelmanReport,
    pub fact_check: FactCheckReport,
}

impl AnalysisReport {
    pub fn share_card(&self) -> String {
        let result = SynthesisResult {
            truth_score: self.truth_score,
            breakdown: self.breakdown,
            credibility: self.credibility,
            what_ai_thinks: self.what_ai_thinks.clone(),
        };
        synthesis::share_card(&self.headline, &result, self.id)
    }
}

/// Detector outputs as passed to the synthesis prompt.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectorSummary<'a> {
    fallacy: &'a FallacyReport,
    deception: &'a DeceptionReport,
    persuasion: &'a PersuasionReport,
    context_audit: &'a ContextAuditReport,
    steelman: &'a SteelmanReport,
    fact_check: &'a FactCheckReport,
}

/// Run the full analysis: six concurrent detector passes, then synthesis.
pub async fn analyze(
    gateway: &dyn ChatGateway,
    search: &dyn SearchProvider,
    model: &str,
    article: &Article,
    debug: bool,
) -> Result<AnalysisReport, PipelineError> {
    let (fallacy, deception, persuasion, context_audit, steelman, fact_check) = tokio::join!(
        fallacy::run(gateway, model, article, debug),
        deception::run(gateway, model, article, debug),
        persuasion::run(gateway, model, article, debug),
        context_audit::run(gateway, model, article, debug),
        steelman::run(gateway, model, article, debug),
        fact_check::run(gateway, search, model, article, debug),
    );
    let fact_check = fact_check?;

    info!(
        fallacies = fallacy.findings.len(),
        deceptions = deception.findings.len(),
        persuasion_markers = persuasion.findings.len(),
        omissions = context_audit.findings.len(),
        perspectives = steelman.perspectives.len(),
        verdicts = fact_check.verdicts.len(),
        "detector passes complete"
    );

    let summary = DetectorSummary {
        fallacy: &fallacy,
        deception: &deception,
        persuasion: &persuasion,
        context_audit: &context_audit,
        steelman: &steelman,
        fact_check: &fact_check,
    };
    let summary: Value =
        serde_json::to_value(&summary).map_err(|e| PipelineError::stage("Synthesis", e))?;

    let result = synthesis::synthesize(gateway, model, &summary, debug).await?;

    info!(
        truth_score = result.truth_score,
        credibility = result.credibility.label(),
        "analysis complete"
    );

    Ok(AnalysisReport {
        id: Uuid::new_v4(),
        headline: article.title.clone(),
        truth_score: result.truth_score,
        breakdown: result.breakdown,
        credibility: result.credibility,
        what_ai_thinks: result.what_ai_thinks,
        fallacy,
        deception,
        persuasion,
        context_audit,
        steelman,
        fact_check,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_error_display() {
        let err = PipelineError::stage("Synthesis", "connection reset");
        assert_eq!(err.to_string(), "Synthesis failed: connection reset");
    }
}
