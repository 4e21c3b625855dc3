//! Prompt templates for the detector passes.
//!
//! Domain logic for rendering analysis prompts. Provider-agnostic. Each
//! detector has a primary template and a shorter simplified template; the
//! simplified one is only used for the single follow-up call after an empty
//! response.

use crate::article::Article;
use crate::gateway::Message;
use crate::search::SearchResult;

// =============================================================================
// Rendered prompts
// =============================================================================

/// Rendered prompt ready for the gateway.
#[derive(Debug, Clone)]
pub struct PromptInstance {
    pub template_slug: String,
    pub system: String,
    pub user: String,
}

impl PromptInstance {
    pub fn to_messages(&self) -> Vec<Message> {
        vec![Message::system(&self.system), Message::user(&self.user)]
    }
}

/// Escape XML special characters to prevent prompt injection via tag breaking.
fn escape_xml_chars(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// A prompt template with article placeholders.
#[derive(Debug, Clone, Copy)]
pub struct DetectorTemplate {
    pub slug: &'static str,
    pub system: &'static str,
    pub user: &'static str,
}

impl DetectorTemplate {
    /// Render against an article. User-provided text is XML-escaped before
    /// substitution.
    pub fn render(&self, article: &Article) -> PromptInstance {
        let claims = article
            .claims
            .iter()
            .map(|c| format!("- {}", escape_xml_chars(&c.text)))
            .collect::<Vec<_>>()
            .join("\n");
        let sources = article
            .sources
            .iter()
            .map(|s| format!("- {} ({})", escape_xml_chars(&s.title), escape_xml_chars(&s.url)))
            .collect::<Vec<_>>()
            .join("\n");

        let user = self
            .user
            .replace("{title}", &escape_xml_chars(article.title.trim()))
            .replace("{publication}", &escape_xml_chars(article.publication.trim()))
            .replace("{body}", &escape_xml_chars(article.content.body.trim()))
            .replace("{claims}", &claims)
            .replace("{sources}", &sources);

        PromptInstance {
            template_slug: self.slug.to_string(),
            system: self.system.trim().to_string(),
            user: user.trim().to_string(),
        }
    }
}

// =============================================================================
// Detector templates
// =============================================================================

pub const FALLACY_PROMPT: DetectorTemplate = DetectorTemplate {
    slug: "fallacy_v1",
    system: r#"You are an expert in logic and informal fallacies. You identify logical fallacies in written media with precision, flagging substantive logical errors rather than rhetorical flourishes. Always respond with valid JSON."#,
    user: r#"Identify ALL logical fallacies in this article.

<title>{title}</title>
<publication>{publication}</publication>
<article_body>
{body}
</article_body>

For each fallacy: type (e.g. strawman, ad_hominem, false_dichotomy), the exact quote, surrounding context, severity (low|medium|high), and a short explanation.

Return JSON:
{"fallacies": [{"type": "strawman", "quote": "...", "context": "...", "severity": "medium", "explanation": "..."}]}"#,
};

pub const FALLACY_PROMPT_SIMPLE: DetectorTemplate = DetectorTemplate {
    slug: "fallacy_v1_simple",
    system: r#"You identify logical fallacies. Respond with valid JSON only."#,
    user: r#"List logical fallacies in this text as JSON {"fallacies": [{"type", "quote", "severity", "explanation"}]}:

{body}"#,
};

pub const DECEPTION_PROMPT: DetectorTemplate = DetectorTemplate {
    slug: "deception_v1",
    system: r#"You are an expert in deception and propaganda analysis. You detect manipulation techniques in written media: misleading framing, selective statistics, loaded language, unattributed claims presented as fact. Always respond with valid JSON."#,
    user: r#"Identify deception and propaganda techniques in this article.

<title>{title}</title>
<publication>{publication}</publication>
<article_body>
{body}
</article_body>

For each technique: name, the exact quote, context, severity (low|medium|high), and a short explanation. Also give an overall_risk of low|medium|high.

Return JSON:
{"techniques": [{"technique": "loaded_language", "quote": "...", "context": "...", "severity": "high", "explanation": "..."}], "overall_risk": "medium"}"#,
};

pub const DECEPTION_PROMPT_SIMPLE: DetectorTemplate = DetectorTemplate {
    slug: "deception_v1_simple",
    system: r#"You detect deception and propaganda techniques. Respond with valid JSON only."#,
    user: r#"List manipulation techniques in this text as JSON {"techniques": [{"technique", "quote", "severity", "explanation"}], "overall_risk": "low|medium|high"}:

{body}"#,
};

pub const PERSUASION_PROMPT: DetectorTemplate = DetectorTemplate {
    slug: "persuasion_v1",
    system: r#"You are an expert in persuasion and radicalization analysis. You identify rhetorical pressure: us-vs-them framing, urgency manufacturing, identity appeals, escalation ladders. Always respond with valid JSON."#,
    user: r#"Analyze persuasion and radicalization pressure in this article.

<title>{title}</title>
<publication>{publication}</publication>
<article_body>
{body}
</article_body>

For each marker: pattern name, the exact quote, context, severity (low|medium|high), and explanation. Also give an overall_risk of low|medium|high.

Return JSON:
{"markers": [{"pattern": "us_vs_them", "quote": "...", "context": "...", "severity": "medium", "explanation": "..."}], "overall_risk": "low"}"#,
};

pub const PERSUASION_PROMPT_SIMPLE: DetectorTemplate = DetectorTemplate {
    slug: "persuasion_v1_simple",
    system: r#"You identify persuasion pressure patterns. Respond with valid JSON only."#,
    user: r#"List persuasion/radicalization markers in this text as JSON {"markers": [{"pattern", "quote", "severity", "explanation"}], "overall_risk": "low|medium|high"}:

{body}"#,
};

pub const CONTEXT_AUDIT_PROMPT: DetectorTemplate = DetectorTemplate {
    slug: "context_audit_v1",
    system: r#"You are an expert context auditor. You find material context an article omits: missing base rates, absent counter-evidence, dropped timeline context, unmentioned conflicts of interest. Always respond with valid JSON."#,
    user: r#"Audit this article for omitted context.

<title>{title}</title>
<publication>{publication}</publication>
<article_body>
{body}
</article_body>
<claims>
{claims}
</claims>

For each omission: category, the quote it relates to, what is missing, severity (low|medium|high), and explanation.

Return JSON:
{"omissions": [{"category": "missing_base_rate", "quote": "...", "context": "...", "severity": "medium", "explanation": "..."}]}"#,
};

pub const CONTEXT_AUDIT_PROMPT_SIMPLE: DetectorTemplate = DetectorTemplate {
    slug: "context_audit_v1_simple",
    system: r#"You audit articles for omitted context. Respond with valid JSON only."#,
    user: r#"List omitted context in this text as JSON {"omissions": [{"category", "quote", "severity", "explanation"}]}:

{body}"#,
};

pub const STEELMAN_PROMPT: DetectorTemplate = DetectorTemplate {
    slug: "steelman_v1",
    system: r#"You are an expert at steel-manning: constructing the strongest defensible version of each position touching an article, including counter-positions not explicit in the text. A complete answer always contains at least two perspectives: the article's own position and the strongest reasonable counter-position. Always respond with valid JSON."#,
    user: r#"Steel-man the perspectives around this article.

<title>{title}</title>
<publication>{publication}</publication>
<article_body>
{body}
</article_body>
<claims>
{claims}
</claims>

Return JSON:
{"perspectives": [{"label": "...", "originalStrength": "...", "steelMannedVersion": {"coreClaim": "...", "strongestArguments": ["..."], "bestEvidence": ["..."], "logicalStructure": "...", "anticipatedCounterarguments": ["..."], "qualityScore": 80}, "sourceInArticle": ["..."], "isImplicit": false}]}"#,
};

pub const STEELMAN_PROMPT_SIMPLE: DetectorTemplate = DetectorTemplate {
    slug: "steelman_v1_simple",
    system: r#"You steel-man positions. Respond with valid JSON only."#,
    user: r#"Give the article's position and the strongest counter-position as JSON {"perspectives": [{"label", "steelMannedVersion": {"coreClaim", "strongestArguments", "qualityScore"}}]}:

{body}"#,
};

// =============================================================================
// Fact-check and synthesis renderers
// =============================================================================

pub const FACT_CHECK_SLUG: &str = "fact_check_v1";

const FACT_CHECK_SYSTEM: &str = r#"You are an independent fact checker. You grade a claim strictly against the search evidence provided, weigh source quality on a primary/secondary/tertiary hierarchy, and never invent evidence. Always respond with valid JSON."#;

/// Render the fact-check verdict prompt for one claim with gathered evidence.
pub fn render_fact_check(
    claim: &str,
    article_context: &str,
    evidence: &[SearchResult],
) -> PromptInstance {
    let evidence_block = evidence
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[{}] {} — {}\n    {}",
                i + 1,
                escape_xml_chars(&r.title),
                escape_xml_chars(&r.url),
                escape_xml_chars(&r.snippet)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let user = format!(
        r#"Verify this claim against the evidence below.

<claim>{}</claim>
<article_context>
{}
</article_context>
<search_results>
{}
</search_results>

Return JSON:
{{"verification": "supported|refuted|mixed|inconclusive", "confidence": 0-100, "evidenceHierarchy": "primary|secondary|tertiary", "sources": ["url", ...], "methodology": "...", "methodologyScore": 0-100}}"#,
        escape_xml_chars(claim),
        escape_xml_chars(article_context.trim()),
        evidence_block
    );

    PromptInstance {
        template_slug: FACT_CHECK_SLUG.to_string(),
        system: FACT_CHECK_SYSTEM.trim().to_string(),
        user,
    }
}

pub const SYNTHESIS_SLUG: &str = "synthesis_v1";

const SYNTHESIS_SYSTEM: &str = r#"You are the synthesis stage of a truth-score pipeline. Given the detector findings for an article, you produce a final score breakdown. Sub-score maxima: evidenceQuality 40, methodologyRigor 25, logicalStructure 20, manipulationAbsence 15. Always respond with valid JSON."#;

/// Render the synthesis prompt from a JSON summary of all detector outputs.
pub fn render_synthesis(detector_summary_json: &str) -> PromptInstance {
    let user = format!(
        r#"Produce the final score for this analysis.

<detector_results>
{detector_summary_json}
</detector_results>

Return JSON:
{{"evidenceQuality": 0-40, "methodologyRigor": 0-25, "logicalStructure": 0-20, "manipulationAbsence": 0-15, "credibility": "high|moderate|low|very_low", "whatAiThinks": "one-paragraph narrative"}}"#
    );

    PromptInstance {
        template_slug: SYNTHESIS_SLUG.to_string(),
        system: SYNTHESIS_SYSTEM.trim().to_string(),
        user,
    }
}
