//! Listing-page fields: description, nightly price, photo count, and the
//! keyword-category signals (badges, maintenance items).

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

use super::engine;

static NIGHTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:por|for)\s+(\d+)\s+(?:noites?|nights?)").unwrap());
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d[\d.]*").unwrap());

const DESCRIPTION_SELECTORS: &[&str] = &[
    "div[data-section-id='DESCRIPTION_DEFAULT']",
    "div[data-testid='pdp-description-content']",
];

const PRICE_SELECTORS: &[&str] = &[
    "span[data-testid='price-summary-total-price']",
    "div[data-testid='price-availability-row']",
    "span[data-testid='book-it-default-price']",
];

const PHOTO_SELECTORS: &[&str] = &[
    "div[data-section-id='PHOTO_TOUR_SCROLLABLE'] img",
    "div[data-testid='photo-viewer'] img",
    "picture img",
];

/// Category → keyword list for maintenance signals. A category applies when
/// any keyword occurs anywhere in the lower-cased page text; unrelated
/// occurrences are accepted noise.
pub const MAINTENANCE_CATEGORIES: &[(&str, &[&str])] = &[
    ("Mármore/Vidro", &["mármore", "marble", "vidro", "glass", "madeira maciça"]),
    ("Piscina/Jacuzzi", &["piscina", "pool", "jacuzzi", "hidromassagem"]),
    ("Automação", &["automatizada", "alexa", "voice command", "cinema", "smart"]),
    ("Café Premium", &["nespresso", "espresso", "cafeteira"]),
];

/// Category → keyword list for program badges (PT + EN spellings).
pub const BADGE_CATEGORIES: &[(&str, &[&str])] = &[
    ("Superhost", &["superhost", "superanfitrião", "superanfitriã"]),
    ("Luxe", &["airbnb luxe"]),
    ("Plus", &["airbnb plus"]),
];

pub fn description(doc: &Html) -> Option<String> {
    engine::first_text(doc.root_element(), DESCRIPTION_SELECTORS)
}

/// Nightly price from the page's price element, when present.
pub fn nightly_price(doc: &Html) -> Option<i64> {
    let text = engine::first_text(doc.root_element(), PRICE_SELECTORS)?;
    parse_nightly_price(&text)
}

/// Normalize a price string to an integer nightly value. A "por N noites" /
/// "for N nights" divisor marks a multi-night total and is divided out; with
/// no readable divisor the raw amount is taken as already nightly. Decimal
/// centavos (after the comma) are dropped, thousands separators stripped.
pub fn parse_nightly_price(text: &str) -> Option<i64> {
    let head = text.split(',').next().unwrap_or(text);
    let digits = AMOUNT_RE.find(head)?.as_str().replace('.', "");
    let amount: i64 = digits.parse().ok()?;
    if amount <= 0 {
        return None;
    }

    let nights = NIGHTS_RE
        .captures(&text.to_lowercase())
        .and_then(|caps| caps[1].parse::<i64>().ok());

    match nights {
        Some(n) if n > 1 => Some(amount / n),
        _ => Some(amount),
    }
}

/// Countable photos in the gallery, if the page exposes any.
pub fn photo_count(doc: &Html) -> Option<u32> {
    let count = engine::count_first(doc.root_element(), PHOTO_SELECTORS);
    if count == 0 {
        None
    } else {
        Some(count as u32)
    }
}

pub fn maintenance_items(page_text: &str) -> Vec<String> {
    matched_categories(page_text, MAINTENANCE_CATEGORIES)
}

pub fn badges(page_text: &str) -> Vec<String> {
    matched_categories(page_text, BADGE_CATEGORIES)
}

fn matched_categories(page_text: &str, categories: &[(&str, &[&str])]) -> Vec<String> {
    categories
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|kw| page_text.contains(kw)))
        .map(|(label, _)| label.to_string())
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_night_total_is_divided() {
        assert_eq!(parse_nightly_price("R$ 2.000 por 2 noites"), Some(1000));
    }

    #[test]
    fn english_night_divisor() {
        assert_eq!(parse_nightly_price("6000 for 3 nights"), Some(2000));
    }

    #[test]
    fn no_divisor_means_already_nightly() {
        assert_eq!(parse_nightly_price("R$ 8.000"), Some(8000));
        assert_eq!(parse_nightly_price("R$ 8.000 noite"), Some(8000));
    }

    #[test]
    fn centavos_are_dropped_before_dividing() {
        assert_eq!(parse_nightly_price("R$ 3.000,75 por 3 noites"), Some(1000));
    }

    #[test]
    fn garbage_price_text_is_none() {
        assert_eq!(parse_nightly_price("consulte o anfitrião"), None);
        assert_eq!(parse_nightly_price(""), None);
    }

    #[test]
    fn maintenance_categories_from_page_text() {
        let text = "cobertura com piscina aquecida, bancada de mármore e máquina nespresso";
        let items = maintenance_items(text);
        assert_eq!(
            items,
            vec!["Mármore/Vidro", "Piscina/Jacuzzi", "Café Premium"]
        );
    }

    #[test]
    fn no_maintenance_keywords_no_categories() {
        assert!(maintenance_items("apartamento simples e aconchegante").is_empty());
    }

    #[test]
    fn badge_detection() {
        let text = "essa acomodação faz parte do airbnb luxe e a anfitriã é superhost";
        assert_eq!(badges(text), vec!["Superhost", "Luxe"]);
        assert!(badges("apartamento comum").is_empty());
    }

    #[test]
    fn description_selector_chain() {
        let html = "<div data-testid='pdp-description-content'>Vista para o mar.</div>";
        let doc = Html::parse_document(html);
        assert_eq!(description(&doc).as_deref(), Some("Vista para o mar."));
    }

    #[test]
    fn photo_count_uses_gallery_when_present() {
        let html = "<div data-testid='photo-viewer'>\
            <img src='1'><img src='2'><img src='3'></div>";
        let doc = Html::parse_document(html);
        assert_eq!(photo_count(&doc), Some(3));
        assert_eq!(photo_count(&Html::parse_document("<p>no photos</p>")), None);
    }
}
