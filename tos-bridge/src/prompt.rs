//! Trust-aware formatting of indexed content for the assistant's prompt
//!
//! Each item is rendered with the hedging phrase of its trust tier so the
//! model frames unvalidated content as one member's opinion and consensus
//! content as such.

use tos_common::index::IndexedContent;
use tos_common::{ContentEngagement, TrustTier};

/// Longest body excerpt used when an item has no summary
pub const EXCERPT_CHARS: usize = 500;

const BLOCK_HEADER: &str = "**LIVE COMMUNITY CONTENT:**
The following content was found on the platform. Use appropriate language based on trust level:
- Unvalidated: Frame as \"one member's opinion\" or \"a recent suggestion\"
- Low/Medium: Frame as \"some members think\" or \"there's interest in\"
- High: Frame as \"there's strong community support for\"
- Consensus: Frame as \"the community has reached consensus that\"";

const BLOCK_FOOTER: &str = "When citing this content, include the URL so users can explore further.";

const ITEM_SEPARATOR: &str = "\n\n---\n\n";

/// Compact engagement summary built from the non-zero components only
pub fn format_engagement(engagement: &ContentEngagement, tier: TrustTier) -> String {
    let mut parts = Vec::new();

    if engagement.vote_score != 0 {
        let sign = if engagement.vote_score > 0 { "+" } else { "" };
        parts.push(format!("{}{} votes", sign, engagement.vote_score));
    }
    if engagement.reply_count > 0 {
        parts.push(format!("{} replies", engagement.reply_count));
    }
    if engagement.total_sp > 0 {
        parts.push(format!(
            "{} SP from {} members",
            engagement.total_sp, engagement.sp_allocator_count
        ));
    }
    if engagement.participant_count > 0 && tier == TrustTier::Consensus {
        parts.push(format!("{} participants", engagement.participant_count));
    }

    if parts.is_empty() {
        "No engagement yet".to_string()
    } else {
        parts.join(", ")
    }
}

/// One item: label and title, trust phrase, URL, engagement, then summary
pub fn format_content_for_prompt(item: &IndexedContent) -> String {
    let mut block = format!("[{}: {}]\n", item.content_type.label(), item.title);
    block.push_str(&format!("Trust: {}\n", item.trust_tier.phrase()));
    block.push_str(&format!("URL: {}\n", item.url));

    if item.trust_tier > TrustTier::Unvalidated {
        block.push_str(&format!(
            "Engagement: {}\n",
            format_engagement(&item.engagement, item.trust_tier)
        ));
    }

    block.push('\n');
    block.push_str(&body_text(item));
    block
}

/// Framed block for a list of items; empty input yields an empty string
pub fn format_content_block_for_prompt<'a, I>(items: I) -> String
where
    I: IntoIterator<Item = &'a IndexedContent>,
{
    let formatted: Vec<String> = items.into_iter().map(format_content_for_prompt).collect();
    if formatted.is_empty() {
        return String::new();
    }

    format!(
        "{}\n\n{}\n\n{}",
        BLOCK_HEADER,
        formatted.join(ITEM_SEPARATOR),
        BLOCK_FOOTER
    )
}

fn body_text(item: &IndexedContent) -> String {
    if let Some(summary) = item.summary.as_deref().filter(|s| !s.is_empty()) {
        return summary.to_string();
    }
    match item.full_text.as_deref().filter(|t| !t.is_empty()) {
        Some(text) => text.chars().take(EXCERPT_CHARS).collect(),
        None => "(No summary available)".to_string(),
    }
}
