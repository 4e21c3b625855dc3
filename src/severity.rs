//! Severity classification and deterministic score weighting.
//!
//! Detector findings carry a three-level severity reported by the model as a
//! free-form string. Everything numeric derived from severity goes through
//! the lookup tables here so scoring stays deterministic regardless of what
//! the model actually emitted.

use serde::{Deserialize, Serialize};

/// Severity of a single finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Parse a model-reported severity string. Unrecognized values map to
    /// `None` so callers can distinguish "unknown" from a real level.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" | "moderate" => Some(Severity::Medium),
            "high" | "severe" => Some(Severity::High),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Per-detector mapping from severity to point deductions.
///
/// Unknown severity strings resolve to `default`, never an error; the tables
/// are exhaustive-with-fallback by construction.
#[derive(Debug, Clone, Copy)]
pub struct DeductionTable {
    pub low: i32,
    pub medium: i32,
    pub high: i32,
    pub default: i32,
}

/// Deception and propaganda findings weigh heaviest.
pub const DECEPTION_DEDUCTIONS: DeductionTable = DeductionTable {
    low: -1,
    medium: -3,
    high: -5,
    default: -2,
};

pub const FALLACY_DEDUCTIONS: DeductionTable = DeductionTable {
    low: -1,
    medium: -2,
    high: -4,
    default: -2,
};

/// Persuasion/radicalization markers share the deception weighting.
pub const PERSUASION_DEDUCTIONS: DeductionTable = DeductionTable {
    low: -1,
    medium: -3,
    high: -5,
    default: -2,
};

pub const CONTEXT_AUDIT_DEDUCTIONS: DeductionTable = DeductionTable {
    low: -1,
    medium: -2,
    high: -4,
    default: -2,
};

impl DeductionTable {
    /// Resolve the deduction for a raw (possibly absent or garbage) severity
    /// string from the model.
    pub fn deduction(&self, raw: Option<&str>) -> i32 {
        match raw.map(Severity::parse) {
            Some(Some(Severity::Low)) => self.low,
            Some(Some(Severity::Medium)) => self.medium,
            Some(Some(Severity::High)) => self.high,
            _ => self.default,
        }
    }
}

/// Severity weight used by the detector-local logic score: high=3, medium=2,
/// low=1, anything unrecognized counts as 1.
pub fn severity_weight(raw: &str) -> u32 {
    match Severity::parse(raw) {
        Some(Severity::High) => 3,
        Some(Severity::Medium) => 2,
        Some(Severity::Low) => 1,
        None => 1,
    }
}

/// Severity-weighted logic score over a set of analyzed units.
///
/// `score = clamp(100 - 20 * (sum of weights / total_units), 0, 100)`.
/// Zero units is a neutral 50 (nothing was analyzed, so neither credit nor
/// penalty applies); zero findings over any positive unit count is a clean 100.
pub fn weighted_logic_score(severities: &[&str], total_units: usize) -> f64 {
    if total_units == 0 {
        return 50.0;
    }
    let weighted_sum: u32 = severities.iter().map(|s| severity_weight(s)).sum();
    let avg = f64::from(weighted_sum) / total_units as f64;
    (100.0 - 20.0 * avg).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_known_levels() {
        assert_eq!(Severity::parse("low"), Some(Severity::Low));
        assert_eq!(Severity::parse(" HIGH "), Some(Severity::High));
        assert_eq!(Severity::parse("moderate"), Some(Severity::Medium));
        assert_eq!(Severity::parse("catastrophic"), None);
    }

    #[test]
    fn deduction_tables() {
        assert_eq!(DECEPTION_DEDUCTIONS.deduction(Some("low")), -1);
        assert_eq!(DECEPTION_DEDUCTIONS.deduction(Some("medium")), -3);
        assert_eq!(DECEPTION_DEDUCTIONS.deduction(Some("high")), -5);
        assert_eq!(FALLACY_DEDUCTIONS.deduction(Some("high")), -4);
        assert_eq!(FALLACY_DEDUCTIONS.deduction(Some("medium")), -2);
    }

    #[test]
    fn unknown_severity_uses_default_not_panic() {
        assert_eq!(DECEPTION_DEDUCTIONS.deduction(Some("extreme")), -2);
        assert_eq!(DECEPTION_DEDUCTIONS.deduction(None), -2);
        assert_eq!(FALLACY_DEDUCTIONS.deduction(Some("")), -2);
    }

    #[test]
    fn logic_score_zero_units_is_neutral() {
        assert!((weighted_logic_score(&[], 0) - 50.0).abs() < 1e-9);
        assert!((weighted_logic_score(&["high"], 0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn logic_score_zero_findings_is_perfect() {
        assert!((weighted_logic_score(&[], 3) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn logic_score_single_high_over_one_unit() {
        // 100 - 20*3 = 40
        assert!((weighted_logic_score(&["high"], 1) - 40.0).abs() < 1e-9);
    }

    #[test]
    fn logic_score_mixed_over_five_units() {
        // weights 3+2+2+1+1+1 = 10, avg 2.0, score 60
        let sevs = ["high", "medium", "medium", "low", "low", "low"];
        assert!((weighted_logic_score(&sevs, 5) - 60.0).abs() < 1e-9);
    }

    #[test]
    fn logic_score_clamps_at_zero() {
        let sevs = ["high"; 20];
        assert!((weighted_logic_score(&sevs, 1) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn unrecognized_severity_weighs_one() {
        assert_eq!(severity_weight("??"), 1);
        assert_eq!(severity_weight("high"), 3);
    }
}
