//! Final score synthesis.
//!
//! Synthesis is the one generative stage with no soft fallback: a report
//! without a truth score is not a report, so gateway failures here abort the
//! analysis. Numeric discipline is absolute — the model proposes component
//! scores, but every component is clamped to its maximum and the total is
//! clamped to 0..100 before anything leaves this module.

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::detectors::{first_num, first_str, invoke_structured};
use crate::gateway::ChatGateway;
use crate::pipeline::PipelineError;
use crate::prompts::render_synthesis;

pub const EVIDENCE_QUALITY_MAX: f64 = 40.0;
pub const METHODOLOGY_RIGOR_MAX: f64 = 25.0;
pub const LOGICAL_STRUCTURE_MAX: f64 = 20.0;
pub const MANIPULATION_ABSENCE_MAX: f64 = 15.0;

/// Verdict text when the model returned nothing usable.
pub const DEFAULT_VERDICT: &str = "Analysis incomplete";

/// Component scores behind the truth score. Each field is already clamped
/// to its maximum when constructed through [`normalize_synthesis`].
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    /// 0..40
    pub evidence_quality: f64,
    /// 0..25
    pub methodology_rigor: f64,
    /// 0..20
    pub logical_structure: f64,
    /// 0..15
    pub manipulation_absence: f64,
}

impl ScoreBreakdown {
    /// Sum of the components, clamped to 0..100.
    pub fn total(&self) -> f64 {
        (self.evidence_quality
            + self.methodology_rigor
            + self.logical_structure
            + self.manipulation_absence)
            .clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CredibilityTier {
    High,
    Moderate,
    Low,
    VeryLow,
}

impl CredibilityTier {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "high" => Some(Self::High),
            "moderate" | "medium" => Some(Self::Moderate),
            "low" => Some(Self::Low),
            "very_low" => Some(Self::VeryLow),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Moderate => "moderate",
            Self::Low => "low",
            Self::VeryLow => "very_low",
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            Self::High => "✅",
            Self::Moderate => "⚠️",
            Self::Low => "❌",
            Self::VeryLow => "🚫",
        }
    }
}

/// Normalized output of the synthesis call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesisResult {
    pub truth_score: f64,
    pub breakdown: ScoreBreakdown,
    pub credibility: CredibilityTier,
    pub what_ai_thinks: String,
}

fn component(value: &Value, keys: &[&str], max: f64) -> f64 {
    first_num(value, keys).unwrap_or(0.0).clamp(0.0, max)
}

/// Containers the breakdown sometimes arrives nested under.
const BREAKDOWN_CONTAINERS: &[&str] = &["breakdown", "scoreBreakdown", "score_breakdown", "scores"];

/// Normalize a parsed synthesis structure into a scored result. Component
/// scores are looked up at the top level first, then inside a nested
/// breakdown object; anything missing scores zero. The credibility label is
/// taken at face value and never cross-checked against the numeric total.
///
/// This defaults a sparse *parsed* object. A response with no parseable
/// structure at all never reaches here; [`synthesize`] aborts on it.
pub fn normalize_synthesis(root: &Value) -> SynthesisResult {
    let nested = BREAKDOWN_CONTAINERS
        .iter()
        .filter_map(|k| root.get(k))
        .find(|v| v.is_object());
    let scores = nested.unwrap_or(root);

    let breakdown = ScoreBreakdown {
        evidence_quality: component(
            scores,
            &["evidenceQuality", "evidence_quality", "evidence"],
            EVIDENCE_QUALITY_MAX,
        ),
        methodology_rigor: component(
            scores,
            &["methodologyRigor", "methodology_rigor", "methodology"],
            METHODOLOGY_RIGOR_MAX,
        ),
        logical_structure: component(
            scores,
            &["logicalStructure", "logical_structure", "logic"],
            LOGICAL_STRUCTURE_MAX,
        ),
        manipulation_absence: component(
            scores,
            &["manipulationAbsence", "manipulation_absence", "manipulation"],
            MANIPULATION_ABSENCE_MAX,
        ),
    };

    let credibility = CredibilityTier::parse(&first_str(root, &["credibility", "credibilityTier"]))
        .unwrap_or(CredibilityTier::Moderate);

    let mut what_ai_thinks = first_str(root, &["whatAiThinks", "what_ai_thinks", "verdict"]);
    if what_ai_thinks.is_empty() {
        what_ai_thinks = DEFAULT_VERDICT.to_string();
    }

    SynthesisResult {
        truth_score: breakdown.total(),
        breakdown,
        credibility,
        what_ai_thinks,
    }
}

/// Run the synthesis call over the combined detector summary.
///
/// Unlike the detector passes, extraction failure here is fatal: a report
/// with no parseable score structure cannot be sensibly defaulted, so both
/// an invocation error and an unrecoverable response abort the analysis.
pub async fn synthesize(
    gateway: &dyn ChatGateway,
    model: &str,
    detector_summary: &Value,
    debug: bool,
) -> Result<SynthesisResult, PipelineError> {
    let summary_json = serde_json::to_string_pretty(detector_summary)
        .map_err(|e| PipelineError::stage("Synthesis", e))?;

    let structured = invoke_structured(gateway, model, render_synthesis(&summary_json), None, debug)
        .await
        .map_err(|e| PipelineError::stage("Synthesis", e))?;

    match structured {
        Some(value) => Ok(normalize_synthesis(&value)),
        None => Err(PipelineError::stage(
            "Synthesis",
            "no parseable structure in response",
        )),
    }
}

/// Plain-text share card for a finished analysis.
pub fn share_card(
    headline: &str,
    result: &SynthesisResult,
    analysis_id: Uuid,
) -> String {
    let b = &result.breakdown;
    format!(
        "{badge} TRUTH SCORE: {score:.0}/100\n\
         \"{headline}\"\n\
         Credibility: {credibility}\n\
         Evidence {eq:.0}/40 | Methodology {mr:.0}/25 | Logic {ls:.0}/20 | Integrity {ma:.0}/15\n\
         {verdict}\n\
         Full analysis: https://veracity.app/analysis/{id}",
        badge = result.credibility.badge(),
        score = result.truth_score,
        headline = headline,
        credibility = result.credibility.label().replace('_', " ").to_uppercase(),
        eq = b.evidence_quality,
        mr = b.methodology_rigor,
        ls = b.logical_structure,
        ma = b.manipulation_absence,
        verdict = result.what_ai_thinks,
        id = analysis_id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn components_clamped_to_maxima() {
        let value = json!({
            "evidenceQuality": 55,
            "methodologyRigor": 30,
            "logicalStructure": 25,
            "manipulationAbsence": 20
        });
        let result = normalize_synthesis(&value);
        assert!((result.breakdown.evidence_quality - 40.0).abs() < 1e-9);
        assert!((result.breakdown.methodology_rigor - 25.0).abs() < 1e-9);
        assert!((result.breakdown.logical_structure - 20.0).abs() < 1e-9);
        assert!((result.breakdown.manipulation_absence - 15.0).abs() < 1e-9);
        assert!((result.truth_score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn negative_components_floor_at_zero() {
        let value = json!({
            "evidenceQuality": -10,
            "methodologyRigor": -1,
            "logicalStructure": -5,
            "manipulationAbsence": -2
        });
        let result = normalize_synthesis(&value);
        assert!((result.truth_score - 0.0).abs() < 1e-9);
    }

    #[test]
    fn in_range_components_sum() {
        let value = json!({
            "evidenceQuality": 30,
            "methodologyRigor": 20,
            "logicalStructure": 15,
            "manipulationAbsence": 12,
            "credibility": "high",
            "whatAiThinks": "Well sourced."
        });
        let result = normalize_synthesis(&value);
        assert!((result.truth_score - 77.0).abs() < 1e-9);
        assert_eq!(result.credibility, CredibilityTier::High);
        assert_eq!(result.what_ai_thinks, "Well sourced.");
    }

    #[test]
    fn sparse_object_defaults() {
        let result = normalize_synthesis(&json!({}));
        assert!((result.truth_score - 0.0).abs() < 1e-9);
        assert_eq!(result.credibility, CredibilityTier::Moderate);
        assert_eq!(result.what_ai_thinks, DEFAULT_VERDICT);
    }

    #[test]
    fn nested_breakdown_object() {
        let value = json!({
            "breakdown": {
                "evidenceQuality": 20,
                "methodologyRigor": 10,
                "logicalStructure": 10,
                "manipulationAbsence": 10
            },
            "credibility": "low"
        });
        let result = normalize_synthesis(&value);
        assert!((result.truth_score - 50.0).abs() < 1e-9);
        assert_eq!(result.credibility, CredibilityTier::Low);
    }

    #[test]
    fn credibility_label_drift() {
        assert_eq!(CredibilityTier::parse("Very Low"), Some(CredibilityTier::VeryLow));
        assert_eq!(CredibilityTier::parse("very-low"), Some(CredibilityTier::VeryLow));
        assert_eq!(CredibilityTier::parse("MEDIUM"), Some(CredibilityTier::Moderate));
        assert_eq!(CredibilityTier::parse("credible"), None);
    }

    #[test]
    fn badges() {
        assert_eq!(CredibilityTier::High.badge(), "✅");
        assert_eq!(CredibilityTier::Moderate.badge(), "⚠️");
        assert_eq!(CredibilityTier::Low.badge(), "❌");
        assert_eq!(CredibilityTier::VeryLow.badge(), "🚫");
    }

    #[test]
    fn share_card_format() {
        let result = SynthesisResult {
            truth_score: 77.0,
            breakdown: ScoreBreakdown::default(),
            credibility: CredibilityTier::VeryLow,
            what_ai_thinks: "Largely unsupported.".to_string(),
        };
        let id = Uuid::new_v4();
        let card = share_card("Moon made of cheese", &result, id);
        assert!(card.contains("🚫 TRUTH SCORE: 77/100"));
        assert!(card.contains("\"Moon made of cheese\""));
        assert!(card.contains("Credibility: VERY LOW"));
        assert!(card.contains("Evidence 0/40 | Methodology 0/25 | Logic 0/20 | Integrity 0/15"));
        assert!(card.contains(&format!("https://veracity.app/analysis/{id}")));
    }
}
