//! Host section and host-profile extraction: name, superhost flag, host id,
//! and portfolio size from the profile page.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use super::engine;

const HOST_SECTION_SELECTORS: &[&str] = &[
    "div[data-section-id='HOST_PROFILE_DEFAULT']",
    "div[data-testid='pdp-host-profile-section']",
    "div[data-section-id='HOST_OVERVIEW_DEFAULT']",
    "section[data-section-id='HOST_PROFILE_DEFAULT']",
];

/// Fallback container keywords when no host selector matches.
const HOST_SECTION_KEYWORDS: &[&str] = &[
    "anfitrião",
    "anfitriã",
    "hosted by",
    "superhost",
    "superanfitrião",
];

static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"Anfitri[ãa]\(?o?\)?[:\s]+([A-ZÀ-Ú][\w\s\-&\.]+)").unwrap(),
        Regex::new(r"Hosted by\s+(.+?)(?:\s*$|\s*Superhost)").unwrap(),
        Regex::new(r"Hospede-se com\s+(.+?)(?:\s*$|\s*Superhost)").unwrap(),
    ]
});

static NAME_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(Hosted by|Hospede-se com|Anfitri[ãa]o?:?)\s*").unwrap());
static SUPERHOST_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Superhost.*$").unwrap());
static YEARS_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\d+\s*anos?\s*hospedando.*$").unwrap());

/// Button labels the name selectors are prone to picking up instead of a
/// person.
const NAME_GARBAGE: &[&str] = &["consultar perfil", "ver perfil", "profile"];

static HOST_URL_MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"/users/(?:show|profile)/(\d+)\?[^"']*PdpHomeMarketplace"#).unwrap()
});
static HOST_ID_JSON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""hostId"\s*:\s*"?(\d+)"?"#).unwrap());

static PORTFOLIO_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"(\d+)\s*an[uú]ncios?").unwrap(),
        Regex::new(r"[Vv]er\s+(?:os\s+)?(\d+)").unwrap(),
        Regex::new(r"[Ss]ee\s+all\s+(\d+)").unwrap(),
        Regex::new(r"(\d+)\s+acomoda[çc]").unwrap(),
        Regex::new(r"(\d+)\s+places?\b").unwrap(),
        Regex::new(r"(\d+)\s+listings?\b").unwrap(),
        Regex::new(r"[Ss]howing\s+(\d+)").unwrap(),
    ]
});

static LISTING_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)\s*an[uú]ncios?").unwrap());

/// Locate the host block on a listing page: selector chain first, then any
/// section whose text mentions hosting.
pub fn host_section(doc: &Html) -> Option<ElementRef<'_>> {
    let root = doc.root_element();
    engine::first_element(root, HOST_SECTION_SELECTORS).or_else(|| {
        engine::element_by_keywords(root, "section, div[data-section-id]", HOST_SECTION_KEYWORDS)
    })
}

/// Host display name from the host section: ordered regex patterns over the
/// section text, then the first heading with prefixes stripped. Button-label
/// garbage is rejected, badge and tenure suffixes trimmed.
pub fn host_name(section: ElementRef) -> Option<String> {
    let text = engine::element_text(section);

    for re in NAME_PATTERNS.iter() {
        if let Some(caps) = re.captures(&text) {
            if let Some(name) = accept_name(&caps[1]) {
                return Some(name);
            }
        }
    }

    let heading = engine::first_text(section, &["h2", "h3", "h1"])?;
    let stripped = NAME_PREFIX_RE.replace_all(&heading, "");
    accept_name(&stripped)
}

fn accept_name(candidate: &str) -> Option<String> {
    let cleaned = clean_name(candidate);
    if cleaned.is_empty() || NAME_GARBAGE.contains(&cleaned.to_lowercase().as_str()) {
        return None;
    }
    Some(cleaned)
}

fn clean_name(raw: &str) -> String {
    let no_badge = SUPERHOST_SUFFIX_RE.replace(raw.trim(), "");
    let no_years = YEARS_SUFFIX_RE.replace(no_badge.trim(), "");
    no_years.trim().trim_matches(&[' ', '·', '.'][..]).to_string()
}

pub fn is_superhost(section_text: &str) -> bool {
    let lower = section_text.to_lowercase();
    ["superhost", "superanfitrião", "superanfitriã"]
        .iter()
        .any(|kw| lower.contains(kw))
}

/// Host id from the raw listing HTML: a profile URL carrying the
/// marketplace marker is preferred, then the embedded JSON field.
pub fn host_id(raw_html: &str) -> Option<String> {
    HOST_URL_MARKER_RE
        .captures(raw_html)
        .or_else(|| HOST_ID_JSON_RE.captures(raw_html))
        .map(|caps| caps[1].to_string())
}

/// Profile URL for a host id. The marketplace marker parameter is required
/// for the page to render without a login wall.
pub fn profile_url(site_base: &str, host_id: &str) -> String {
    format!(
        "{}/users/profile/{}?previous_page_name=PdpHomeMarketplace",
        site_base, host_id
    )
}

/// Portfolio size from profile-page text: ordered count patterns (values of
/// 1 are ignored as uninformative), falling back to counting distinct room
/// links, else 1.
pub fn portfolio_size(profile_text: &str, room_link_count: usize) -> i64 {
    for re in PORTFOLIO_PATTERNS.iter() {
        if let Some(caps) = re.captures(profile_text) {
            if let Ok(val) = caps[1].parse::<i64>() {
                if val > 1 {
                    return val;
                }
            }
        }
    }
    if room_link_count > 1 {
        return room_link_count as i64;
    }
    1
}

/// Listing-count hint found on the listing page itself, used when the
/// profile page is unreachable.
pub fn listing_page_portfolio_hint(page_text: &str) -> Option<i64> {
    LISTING_COUNT_RE
        .captures(page_text)
        .and_then(|caps| caps[1].parse().ok())
}

/// Distinct canonical room URLs linked from a page.
pub fn room_links(doc: &Html, site_base: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for href in engine::attr_values(doc.root_element(), "a[href*='/rooms/']", "href") {
        let canonical = canonicalize(&href, site_base);
        if seen.insert(canonical.clone()) {
            out.push(canonical);
        }
    }
    out
}

/// The host's other listings as (title, url), deduplicated by URL.
pub fn other_listings(doc: &Html, site_base: &str) -> Vec<(String, String)> {
    let root = doc.root_element();
    let Ok(sel) = scraper::Selector::parse("a[href*='/rooms/']") else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for a in root.select(&sel) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let url = canonicalize(href, site_base);
        if !seen.insert(url.clone()) {
            continue;
        }
        let mut title: String = engine::element_text(a).chars().take(60).collect();
        if title.is_empty() {
            title = "Listing".to_string();
        }
        out.push((title, url));
    }
    out
}

fn canonicalize(href: &str, site_base: &str) -> String {
    let bare = href.split('?').next().unwrap_or(href);
    if bare.starts_with('/') {
        format!("{}{}", site_base, bare)
    } else {
        bare.to_string()
    }
}

// ── Tests ──
