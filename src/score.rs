/// Title keywords that mark a listing as upscale. Matched case-insensitively
/// as substrings; PT and EN spellings both count.
pub const LUXURY_KEYWORDS: &[&str] = &[
    "luxo",
    "luxury",
    "vista mar",
    "ocean view",
    "cobertura",
    "penthouse",
    "design",
    "exclusivo",
];

const TOP_BADGE: &str = "Luxe";
const MID_BADGE: &str = "Plus";

/// Arithmetic luxury score in [0, 100]:
/// up to 50 pts from nightly price (linear to 10k), up to 30 pts from title
/// keywords, up to 10 pts from photo count (linear to 50), plus a badge
/// bonus (Luxe 10, Plus 5). Rounded to one decimal.
pub fn luxury_score(price_per_night: i64, title: &str, photo_count: u32, badges: &[String]) -> f64 {
    let price_pts = ((price_per_night.max(0) as f64 / 10_000.0) * 50.0).min(50.0);

    let title_lower = title.to_lowercase();
    let matched = LUXURY_KEYWORDS
        .iter()
        .filter(|kw| title_lower.contains(*kw))
        .count();
    let kw_pts = (matched as f64 / LUXURY_KEYWORDS.len() as f64) * 30.0;

    let photo_pts = ((photo_count as f64 / 50.0) * 10.0).min(10.0);

    let badge_pts = if badges.iter().any(|b| b == TOP_BADGE) {
        10.0
    } else if badges.iter().any(|b| b == MID_BADGE) {
        5.0
    } else {
        0.0
    };

    ((price_pts + kw_pts + photo_pts + badge_pts) * 10.0).round() / 10.0
}

// ── Tests ──
