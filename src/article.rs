//! Article input types and the guardrail gate.
//!
//! Articles arrive from an upstream extraction stage and may be nearly empty
//! when that stage failed. The guardrail exists so we never ask the
//! generative backend to reason about content that was never extracted: with
//! nothing real to analyze, any "perspectives" or "findings" it produced
//! would be fabricated.

use serde::{Deserialize, Serialize};

/// Sentinel title used upstream when extraction could not find one.
pub const UNTITLED: &str = "Untitled";

/// Sentinel publication used upstream when the outlet is unknown.
pub const UNKNOWN_PUBLICATION: &str = "Unknown";

/// Minimum body length (chars) below which the article counts as unextracted.
pub const MIN_BODY_CHARS: usize = 50;

/// A factual claim extracted from the article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claim {
    #[serde(default)]
    pub id: String,
    pub text: String,
    /// Relative importance assigned upstream; used to pick which claims get
    /// independent research when there are more than the per-article cap.
    #[serde(default)]
    pub importance: f64,
}

/// A source cited by the article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArticleContent {
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub body: String,
}

/// The immutable article aggregate every detector reads.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub publication: String,
    #[serde(default)]
    pub claims: Vec<Claim>,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    #[serde(default)]
    pub content: ArticleContent,
}

impl Article {
    /// Claims worth researching, most important first.
    pub fn ranked_claims(&self) -> Vec<&Claim> {
        let mut ranked: Vec<&Claim> = self.claims.iter().collect();
        ranked.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked
    }
}

/// Guardrail gate: does this article carry enough real content to analyze?
///
/// Rejects only when the identifying fields are missing or sentinels AND
/// there is no publication, no claim, and no source to anchor anything to.
/// Rejection is not an error; it is an intentional empty result. Callers
/// must make zero generative calls for a rejected article.
pub fn has_valid_content(article: &Article) -> bool {
    let title = article.title.trim();
    let title_missing = title.is_empty() || title == UNTITLED;

    let body_too_short = article.content.body.trim().chars().count() < MIN_BODY_CHARS;

    let publication = article.publication.trim();
    let publication_missing = publication.is_empty() || publication == UNKNOWN_PUBLICATION;

    let nothing_else = publication_missing && article.claims.is_empty() && article.sources.is_empty();

    !((title_missing || body_too_short) && nothing_else)
}
