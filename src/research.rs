//! Independent-research sub-pipeline for the fact-check detector.
//!
//! For one claim: build query variants, issue up to three of them
//! sequentially (rate-limit exposure against the search collaborator stays
//! bounded), merge, dedup by URL, cap. A single query's failure is caught
//! and skipped; only when every issued query fails is the claim's research
//! reported as failed.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::warn;

use crate::article::UNKNOWN_PUBLICATION;
use crate::search::{SearchProvider, SearchResult};

/// Claims researched per article, most important first.
pub const MAX_CLAIMS_PER_ARTICLE: usize = 10;

/// Query variants actually issued per claim.
pub const MAX_QUERIES_PER_CLAIM: usize = 3;

/// Results requested from the search collaborator per query.
pub const RESULTS_PER_QUERY: usize = 5;

/// Cap on merged, deduplicated results per claim.
pub const MAX_MERGED_RESULTS: usize = 10;

#[derive(Debug, Error)]
pub enum ResearchError {
    /// Every issued query failed; nothing was searched successfully.
    #[error("all {attempted} search queries failed")]
    AllQueriesFailed { attempted: usize },
}

fn numeric_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(?:\.\d+)?\s*%|\b\d{2,}\b").expect("static regex"))
}

/// Whether a claim contains a numeric or percentage pattern worth a
/// statistics-focused query.
pub fn has_numeric_pattern(claim: &str) -> bool {
    numeric_pattern().is_match(claim)
}

/// Build 3-4 query variants for a claim.
///
/// The quoted fact-check query always leads; the statistics variant is only
/// generated for numeric claims, and the publication variant only when the
/// publication is known.
pub fn build_query_variants(claim: &str, publication: &str) -> Vec<String> {
    let claim = claim.trim();
    let mut variants = vec![format!("\"{claim}\" fact check"), format!("{claim} study")];

    if has_numeric_pattern(claim) {
        variants.push(format!("{claim} statistics"));
    }

    let publication = publication.trim();
    if !publication.is_empty() && publication != UNKNOWN_PUBLICATION {
        variants.push(format!("{claim} {publication}"));
    }

    variants.push(format!("{claim} research"));
    variants.truncate(4);
    variants
}

/// Deduplicate by URL, first occurrence wins, stable order, capped.
pub fn dedup_by_url(results: Vec<SearchResult>, cap: usize) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.url.clone()))
        .take(cap)
        .collect()
}

/// Gather deduplicated evidence for one claim.
///
/// Queries run sequentially; a failed query is logged and skipped. Returns
/// an error only when every issued query failed, so callers can distinguish
/// "search broke" from "search found nothing".
pub async fn gather_evidence(
    search: &dyn SearchProvider,
    claim: &str,
    publication: &str,
) -> Result<Vec<SearchResult>, ResearchError> {
    let variants = build_query_variants(claim, publication);
    let issued = variants.len().min(MAX_QUERIES_PER_CLAIM);

    let mut merged = Vec::new();
    let mut failures = 0usize;

    for query in variants.iter().take(MAX_QUERIES_PER_CLAIM) {
        match search.search(query, RESULTS_PER_QUERY).await {
            Ok(results) => merged.extend(results),
            Err(err) => {
                failures += 1;
                warn!(error = %err, query = %query, "search query failed, skipping");
            }
        }
    }

    if failures == issued {
        return Err(ResearchError::AllQueriesFailed { attempted: issued });
    }

    Ok(dedup_by_url(merged, MAX_MERGED_RESULTS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[test]
    fn numeric_pattern_detection() {
        assert!(has_numeric_pattern("unemployment rose 4.2% last year"));
        assert!(has_numeric_pattern("over 5000 people attended"));
        assert!(!has_numeric_pattern("the sky is blue"));
        // Single digits without a percent sign are not statistics-worthy.
        assert!(!has_numeric_pattern("the 3 bears"));
    }

    #[test]
    fn variants_for_plain_claim() {
        let v = build_query_variants("the sky is blue", "The Daily Record");
        assert_eq!(
            v,
            vec![
                "\"the sky is blue\" fact check",
                "the sky is blue study",
                "the sky is blue The Daily Record",
                "the sky is blue research",
            ]
        );
    }

    #[test]
    fn variants_for_numeric_claim_include_statistics() {
        let v = build_query_variants("crime fell 30%", "");
        assert!(v.iter().any(|q| q.ends_with("statistics")));
        assert!(v.len() >= 3 && v.len() <= 4);
    }

    #[test]
    fn sentinel_publication_gets_no_variant() {
        let v = build_query_variants("the sky is blue", UNKNOWN_PUBLICATION);
        assert!(!v.iter().any(|q| q.contains(UNKNOWN_PUBLICATION)));
    }

    #[test]
    fn dedup_first_wins_stable_capped() {
        let mk = |url: &str, title: &str| SearchResult {
            url: url.into(),
            title: title.into(),
            snippet: String::new(),
        };
        let results = vec![
            mk("https://a", "first-a"),
            mk("https://b", "first-b"),
            mk("https://a", "dup-a"),
            mk("https://c", "first-c"),
        ];
        let deduped = dedup_by_url(results, 10);
        assert_eq!(deduped.len(), 3);
        assert_eq!(deduped[0].title, "first-a");
        assert_eq!(deduped[1].title, "first-b");
        assert_eq!(deduped[2].title, "first-c");

        let many: Vec<SearchResult> = (0..30).map(|i| mk(&format!("https://u{i}"), "t")).collect();
        assert_eq!(dedup_by_url(many, MAX_MERGED_RESULTS).len(), 10);
    }

    struct ScriptedSearch {
        // One script entry per expected call, popped front-first.
        script: Mutex<Vec<Result<Vec<SearchResult>, ()>>>,
    }

    #[async_trait]
    impl SearchProvider for ScriptedSearch {
        async fn search(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<SearchResult>, SearchError> {
            let mut script = self.script.lock().unwrap();
            match script.remove(0) {
                Ok(results) => Ok(results),
                Err(()) => Err(SearchError::provider("boom")),
            }
        }
    }

    fn result(url: &str) -> SearchResult {
        SearchResult {
            url: url.into(),
            title: String::new(),
            snippet: String::new(),
        }
    }

    #[tokio::test]
    async fn single_query_failure_is_skipped() {
        let search = ScriptedSearch {
            script: Mutex::new(vec![
                Ok(vec![result("https://a")]),
                Err(()),
                Ok(vec![result("https://b"), result("https://a")]),
            ]),
        };
        let evidence = gather_evidence(&search, "claim", "").await.unwrap();
        assert_eq!(evidence.len(), 2);
    }

    #[tokio::test]
    async fn all_queries_failing_is_an_error() {
        let search = ScriptedSearch {
            script: Mutex::new(vec![Err(()), Err(()), Err(())]),
        };
        let err = gather_evidence(&search, "claim", "").await.unwrap_err();
        assert!(matches!(err, ResearchError::AllQueriesFailed { attempted: 3 }));
    }

    #[tokio::test]
    async fn surviving_queries_with_no_results_is_ok_empty() {
        let search = ScriptedSearch {
            script: Mutex::new(vec![Ok(vec![]), Err(()), Ok(vec![])]),
        };
        let evidence = gather_evidence(&search, "claim", "").await.unwrap();
        assert!(evidence.is_empty());
    }
}
