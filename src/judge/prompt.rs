//! Judge prompt construction and reply parsing.
//!
//! Both directions are pure: the same candidate, prior results and flags always
//! produce byte-identical prompts.

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;

use crate::citation::CitationCandidate;
use crate::heuristics::RedFlag;
use crate::layers::LayerResult;

pub const SYSTEM_PROMPT: &str = "You are an expert academic citation verification system. \
Analyze citations for credibility, validity, and potential hallucinations. \
Provide confidence scores between 0 and 1.";

/// Unsuffixed scores at or above this are percentages.
const PERCENT_THRESHOLD: f64 = 2.0;

static SCORE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)confidence\s+score\s*[:=]\s*(\d+(?:\.\d+)?)\s*(%)?")
        .expect("score regex is valid")
});

static REASONING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)reasoning\s*:\s*(.+)").expect("reasoning regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JudgePrompt {
    pub system: String,
    pub user: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JudgeReply {
    /// Always within `[0, 1]`.
    pub score: f64,
    pub reasoning: String,
}

pub fn build_prompt(
    candidate: &CitationCandidate,
    prior: &[LayerResult],
    flags: &[RedFlag],
) -> JudgePrompt {
    let mut user = String::new();
    let _ = writeln!(
        user,
        "Analyze this citation for credibility and potential AI hallucination:\n"
    );
    let _ = writeln!(user, "**Citation:**\n{}\n", candidate.raw());

    let fields = candidate.fields();
    let mut parsed = Vec::new();
    if let Some(author) = &fields.author {
        parsed.push(format!("- Author: {}", author));
    }
    if let Some(year) = fields.year {
        parsed.push(format!("- Year: {}", year));
    }
    if let Some(title) = &fields.title {
        parsed.push(format!("- Title: {}", title));
    }
    if let Some(venue) = &fields.venue {
        parsed.push(format!("- Venue: {}", venue));
    }
    if let Some(doi) = &fields.doi {
        parsed.push(format!("- DOI: {}", doi));
    }
    if let Some(id) = &fields.arxiv_id {
        parsed.push(format!("- arXiv: {}", id));
    }
    if let Some(url) = &fields.url {
        parsed.push(format!("- URL: {}", url));
    }
    if !parsed.is_empty() {
        let _ = writeln!(user, "**Parsed Fields:**\n{}\n", parsed.join("\n"));
    }

    if let Some(context) = candidate.context() {
        let _ = writeln!(user, "**Context:**\n{}\n", context);
    }

    if !prior.is_empty() {
        let _ = writeln!(user, "**Technical Verification Results:**");
        for result in prior {
            let score = result
                .score()
                .map(|s| format!("{:.2}", s))
                .unwrap_or_else(|| "n/a".to_string());
            let _ = writeln!(
                user,
                "- {}: {} (score {}): {}",
                result.layer(),
                result.status(),
                score,
                result.evidence()
            );
        }
        let _ = writeln!(user);
    }

    if !flags.is_empty() {
        let _ = writeln!(user, "**Red Flags:**");
        for flag in flags {
            let _ = writeln!(user, "- {}", flag.detail);
        }
        let _ = writeln!(user);
    }

    user.push_str(
        "**Analysis Required:**\n\
1. Evaluate if this citation appears legitimate or potentially fabricated\n\
2. Check for red flags (fake URLs, impossible dates, non-existent authors)\n\
3. Assess consistency between citation format and content\n\
4. Provide a confidence score (0.0 to 1.0) where:\n   \
- 0.9-1.0: Highly credible, verified citation\n   \
- 0.7-0.8: Likely valid, minor concerns\n   \
- 0.5-0.6: Suspicious, requires verification\n   \
- 0.0-0.4: Likely hallucinated or fabricated\n\n\
**Response Format:**\n\
Confidence Score: [0.0-1.0]\n\n\
Reasoning: [Your analysis explaining the confidence score]\n",
    );

    JudgePrompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

/// Extracts `Confidence Score: x` from a reply.
///
/// Values with a `%` suffix, or of 2 and above, are read as percentages. Anything
/// else is a fraction, so a slightly overshooting `1.5` stays near the top. The
/// score is clamped to `[0, 1]`. Returns `None` if no score is present.
pub fn parse_reply(text: &str) -> Option<JudgeReply> {
    let caps = SCORE.captures(text)?;
    let mut score: f64 = caps.get(1)?.as_str().parse().ok()?;
    if caps.get(2).is_some() || score >= PERCENT_THRESHOLD {
        score /= 100.0;
    }
    let score = score.clamp(0.0, 1.0);

    let reasoning = REASONING
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| text.trim().to_string());

    Some(JudgeReply { score, reasoning })
}
