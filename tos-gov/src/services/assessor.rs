//! AI quality assessment of proposals
//!
//! `rate_proposal` never fails: a missing client or a failed call yields
//! `None`, and an unparseable answer yields a neutral fallback rating.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::domain::{AiRating, Proposal};
use crate::llm::{CompletionOptions, LlmClient};

/// Low temperature keeps repeated assessments consistent
pub const ASSESSMENT_OPTIONS: CompletionOptions = CompletionOptions {
    temperature: 0.3,
    max_tokens: 1024,
};

pub const DEFAULT_CLARITY: u8 = 2;
pub const DEFAULT_CONSTRUCTIVENESS: u8 = 3;
pub const PARSE_ERROR_REASONING: &str = "parse error";

#[derive(Clone)]
pub struct QualityAssessor {
    llm: Option<Arc<dyn LlmClient>>,
}

impl QualityAssessor {
    pub fn new(llm: Option<Arc<dyn LlmClient>>) -> Self {
        Self { llm }
    }

    /// Assessor with no LLM; every call returns `None`
    pub fn disabled() -> Self {
        Self { llm: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.llm.is_some()
    }

    /// Ask the model to rate `proposal`
    pub async fn rate_proposal(&self, proposal: &Proposal) -> Option<AiRating> {
        let llm = self.llm.as_ref()?;

        let prompt = build_prompt(proposal);
        let text = match llm.complete(&prompt, ASSESSMENT_OPTIONS).await {
            Ok(text) => text,
            Err(e) => {
                error!(proposal_id = %proposal.id, model = llm.model(), error = %e, "AI assessment call failed");
                return None;
            }
        };

        let rating = parse_response(&text, proposal.id, Utc::now());
        info!(
            proposal_id = %proposal.id,
            clarity = rating.clarity,
            constructiveness = rating.constructiveness,
            flagged = rating.flagged_for_review,
            "Assessed proposal"
        );
        Some(rating)
    }

    /// Moderation policy over an assessment, independent of the model's own flag
    pub fn should_flag_for_moderation(rating: &AiRating) -> bool {
        rating.warrants_moderation()
    }
}

/// Fixed assessment prompt
pub fn build_prompt(proposal: &Proposal) -> String {
    format!(
        r#"You are Bridge, a governance assistant. Analyze this proposal and provide quality ratings.

**Proposal Title:** {title}

**Summary:**
{summary}

---

**Task:** Rate this proposal on two dimensions:

1. **Clarity** (1-3):
   - 1 (Unclear): Confusing, vague, lacks structure, difficult to understand
   - 2 (Somewhat Clear): Understandable but could be clearer, some ambiguity
   - 3 (Very Clear): Well-written, structured, easy to understand

2. **Constructiveness** (1-3):
   - 1 (Needs Moderation): Personal attacks, extreme language, inflammatory or divisive tone
   - 2 (Some Issues): Minor tone issues, could be more collaborative
   - 3 (Constructive): Respectful, collaborative, solution-focused

3. **Flag for Review** (true/false):
   - Flag for personal attacks, harassment, threats, or severe tone issues
   - Do not flag for policy disagreements or constructive criticism

**Response Format (JSON):**
```json
{{
  "clarity": 1 | 2 | 3,
  "constructiveness": 1 | 2 | 3,
  "flaggedForReview": true | false,
  "reasoning": "Brief explanation of ratings (1-2 sentences)",
  "issues": ["issue1", "issue2"],
  "suggestions": ["suggestion1", "suggestion2"],
  "confidence": 0.0-1.0
}}
```

Respond ONLY with the JSON object, no other text."#,
        title = proposal.title,
        summary = proposal.summary,
    )
}

/// Remove a ```json (or bare ```) fence around the payload
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        let body = &trimmed[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }

    if trimmed.len() >= 6 && trimmed.starts_with("```") && trimmed.ends_with("```") {
        return trimmed[3..trimmed.len() - 3].trim();
    }

    trimmed
}

/// Turn model output into a rating, falling back to a neutral one
pub fn parse_response(text: &str, proposal_id: Uuid, now: DateTime<Utc>) -> AiRating {
    let parsed = serde_json::from_str::<Value>(strip_code_fences(text))
        .ok()
        .filter(Value::is_object);

    let Some(parsed) = parsed else {
        warn!(%proposal_id, "Unparseable AI assessment, applying neutral rating");
        return fallback_rating(proposal_id, now);
    };

    AiRating {
        id: Uuid::new_v4(),
        proposal_id,
        clarity: ordinal_or_default(&parsed["clarity"], "clarity", DEFAULT_CLARITY),
        constructiveness: ordinal_or_default(
            &parsed["constructiveness"],
            "constructiveness",
            DEFAULT_CONSTRUCTIVENESS,
        ),
        flagged_for_review: parsed["flaggedForReview"] == Value::Bool(true),
        reasoning: parsed["reasoning"]
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        issues: string_list(&parsed["issues"]),
        suggestions: string_list(&parsed["suggestions"]),
        confidence: parsed["confidence"].as_f64().map(|c| c.clamp(0.0, 1.0)),
        assessed_at: now,
    }
}

fn fallback_rating(proposal_id: Uuid, now: DateTime<Utc>) -> AiRating {
    AiRating {
        id: Uuid::new_v4(),
        proposal_id,
        clarity: DEFAULT_CLARITY,
        constructiveness: DEFAULT_CONSTRUCTIVENESS,
        flagged_for_review: false,
        reasoning: Some(PARSE_ERROR_REASONING.to_string()),
        issues: Vec::new(),
        suggestions: Vec::new(),
        confidence: Some(0.0),
        assessed_at: now,
    }
}

/// 1, 2 or 3, written either as an integer or as an integral float
fn ordinal_or_default(value: &Value, field: &str, default: u8) -> u8 {
    let ordinal = value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && (1.0..=3.0).contains(f))
            .map(|f| f as u64)
    });
    match ordinal {
        Some(n @ 1..=3) => n as u8,
        _ => {
            warn!("Invalid {} value {}, using default {}", field, value, default);
            default
        }
    }
}

/// String entries of a JSON array; anything else reads as empty
fn string_list(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}
