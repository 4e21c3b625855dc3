//! Veracity: article credibility analysis over generative-model detectors.
//!
//! An [`Article`](article::Article) goes through six detector passes —
//! logical fallacies, deception techniques, persuasion/radicalization
//! markers, omitted context, steel-manned perspectives, and independent
//! fact-checking — whose typed reports are synthesized into a single 0..100
//! truth score. Model output is treated as hostile input throughout: every
//! response is coerced through extraction and normalization layers that
//! tolerate key drift, wrappers, and missing fields without ever panicking.

#![forbid(unsafe_code)]

pub mod article;
pub mod detectors;
pub mod extract;
pub mod gateway;
pub mod pipeline;
pub mod prompts;
pub mod research;
pub mod search;
pub mod severity;
pub mod synthesis;

pub use article::{has_valid_content, Article};
pub use gateway::{ChatGateway, GatewayConfig, ProviderError, ProviderGateway};
pub use pipeline::{analyze, AnalysisReport, PipelineError};
pub use search::{HttpSearchAdapter, SearchProvider};
pub use synthesis::{CredibilityTier, ScoreBreakdown};
