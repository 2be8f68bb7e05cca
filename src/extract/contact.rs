//! Contact Resolver: scans text blocks and outbound links for email, phone,
//! Instagram, and website candidates. First match surviving the blocklist
//! wins per channel; there is no scoring or disambiguation. Regex false
//! positives are an accepted limit of the approach, mitigated only by the
//! blocklists.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").unwrap());
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?55\s?)?(?:\(?\d{2}\)?\s?)?9?\d{4}[\-\s]?\d{4}").unwrap()
});
static INSTAGRAM_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"instagram\.com/([A-Za-z0-9_.]+)").unwrap());
static HANDLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@([A-Za-z0-9_.]{3,30})").unwrap());

/// Substrings that disqualify an email: platform-internal addresses and
/// generic placeholders.
const EMAIL_BLOCKLIST: &[&str] = &["airbnb", "noreply", "no-reply", "example", "test", "host_"];

/// Handles that are platform names, mail providers, or URL path fragments
/// rather than a person.
const HANDLE_BLOCKLIST: &[&str] = &[
    "airbnb", "gmail", "hotmail", "yahoo", "outlook", "icloud", "p", "reel", "explore",
];

/// Domains that never count as a host's own website.
const WEBSITE_BLOCKLIST: &[&str] = &[
    "airbnb",
    "google",
    "facebook",
    "instagram",
    "apple",
    "play.google",
];

/// Extra email blocklist entries for text coming back from the web-search
/// fallback tier, which is full of provider boilerplate.
pub const SEARCH_EXTRA_BLOCKLIST: &[&str] = &["google", "wix", "domain", "sentry"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactSet {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub instagram: Option<String>,
    pub website: Option<String>,
}

impl ContactSet {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.phone.is_none()
            && self.instagram.is_none()
            && self.website.is_none()
    }

    /// Fill channels this set is missing from a lower-priority source.
    pub fn merge_missing(&mut self, other: ContactSet) {
        if self.email.is_none() {
            self.email = other.email;
        }
        if self.phone.is_none() {
            self.phone = other.phone;
        }
        if self.instagram.is_none() {
            self.instagram = other.instagram;
        }
        if self.website.is_none() {
            self.website = other.website;
        }
    }
}

pub fn resolve(blocks: &[&str], links: &[String]) -> ContactSet {
    resolve_filtered(blocks, links, &[])
}

pub fn resolve_filtered(blocks: &[&str], links: &[String], extra_blocklist: &[&str]) -> ContactSet {
    let text = blocks.join("\n");

    ContactSet {
        email: find_email(&text, extra_blocklist),
        phone: find_phone(&text),
        instagram: find_instagram(&text, links),
        website: find_website(links),
    }
}

fn find_email(text: &str, extra: &[&str]) -> Option<String> {
    EMAIL_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .find(|email| {
            !EMAIL_BLOCKLIST.iter().any(|b| email.contains(b))
                && !extra.iter().any(|b| email.contains(b))
        })
}

fn find_phone(text: &str) -> Option<String> {
    PHONE_RE
        .find_iter(text)
        .map(|m| normalize_phone(m.as_str()))
        .find(|digits| digits.trim_start_matches('+').len() >= 10)
}

/// Strip everything but digits, keeping a leading `+`.
pub fn normalize_phone(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, c) in raw.chars().enumerate() {
        if c.is_ascii_digit() || (c == '+' && i == 0) {
            out.push(c);
        }
    }
    out
}

fn find_instagram(text: &str, links: &[String]) -> Option<String> {
    // Profile links are more reliable than loose @handles in prose.
    for link in links {
        if let Some(caps) = INSTAGRAM_URL_RE.captures(link) {
            let handle = caps[1].to_string();
            if handle_ok(&handle) {
                return Some(format!("@{}", handle));
            }
        }
    }
    for caps in HANDLE_RE.captures_iter(text) {
        let handle = caps[1].to_string();
        if handle_ok(&handle) {
            return Some(format!("@{}", handle));
        }
    }
    None
}

fn handle_ok(handle: &str) -> bool {
    let lower = handle.to_lowercase();
    !HANDLE_BLOCKLIST.iter().any(|b| lower == *b)
}

fn find_website(links: &[String]) -> Option<String> {
    links
        .iter()
        .find(|url| {
            url.starts_with("http") && !WEBSITE_BLOCKLIST.iter().any(|b| url.contains(b))
        })
        .cloned()
}

// ── Tests ──
