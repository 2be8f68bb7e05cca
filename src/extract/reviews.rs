//! Review-gap detection: low-rated reviews mentioning cleanliness complaints
//! become a short sales-hook summary.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

use super::engine;

static RATING_DIGIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d)").unwrap());

const REVIEW_CARD_SELECTORS: &[&str] = &[
    "div[data-review-id]",
    "div[data-testid='pdp-review-card-content']",
];
const RATING_SELECTORS: &[&str] = &["span[aria-label*='estrela']", "span[aria-label*='star']"];
const BODY_SELECTORS: &[&str] = &[
    "div[data-testid='pdp-review-description']",
    "span[data-testid='review-text']",
];

/// Complaint vocabulary, PT + EN. A review body counts as a cleanliness
/// complaint if any of these appears in it.
pub const COMPLAINT_KEYWORDS: &[&str] = &[
    "poeira", "sujo", "suja", "limpeza", "dust", "dirty", "mancha", "manchada", "odor", "rodapé",
];

const MAX_RATING_FOR_GAP: u8 = 4;
const MAX_SNIPPETS: usize = 3;
const SNIPPET_CHARS: usize = 80;

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewCard {
    pub rating: u8,
    pub text: String,
}

/// Pull review cards out of a listing page. Cards without a readable rating
/// default to 5 stars so they never count as complaints.
pub fn collect_reviews(doc: &Html) -> Vec<ReviewCard> {
    let root = doc.root_element();
    engine::select_all(root, REVIEW_CARD_SELECTORS)
        .into_iter()
        .map(|card| {
            let rating = engine::first_element(card, RATING_SELECTORS)
                .and_then(|el| el.value().attr("aria-label"))
                .and_then(|label| RATING_DIGIT_RE.captures(label))
                .and_then(|caps| caps[1].parse().ok())
                .unwrap_or(5);
            let text = engine::first_text(card, BODY_SELECTORS).unwrap_or_default();
            ReviewCard { rating, text }
        })
        .collect()
}

/// Summarize complaint snippets from reviews rated ≤ 4 stars: up to three
/// deduplicated previews, each tagged with its rating, joined with " | ".
pub fn cleanliness_gap(cards: &[ReviewCard]) -> Option<String> {
    let mut seen = HashSet::new();
    let mut snippets = Vec::new();

    for card in cards {
        if card.rating > MAX_RATING_FOR_GAP {
            continue;
        }
        let body = card.text.to_lowercase();
        if !COMPLAINT_KEYWORDS.iter().any(|kw| body.contains(kw)) {
            continue;
        }
        let preview: String = body.chars().take(SNIPPET_CHARS).collect();
        let snippet = format!("({}★): {}...", card.rating, preview.trim());
        if seen.insert(snippet.clone()) {
            snippets.push(snippet);
        }
        if snippets.len() == MAX_SNIPPETS {
            break;
        }
    }

    if snippets.is_empty() {
        None
    } else {
        Some(snippets.join(" | "))
    }
}

// ── Tests ──
