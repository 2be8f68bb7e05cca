//! Discovery pass: scan search-results pages per neighborhood and create
//! `pending` leads for listings not yet tracked.

use anyhow::Result;
use chrono::{Duration, Local};
use rusqlite::Connection;
use scraper::Html;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::{self, LeadPatch};
use crate::extract::{engine, listing};
use crate::fetch::PageFetcher;
use crate::score;

/// Default sweep, highest-value neighborhoods first.
pub const NEIGHBORHOODS: &[&str] = &[
    "Ipanema",
    "Leblon",
    "Barra da Tijuca",
    "Joá",
    "São Conrado",
    "Lagoa",
    "Copacabana",
    "Itanhangá",
    "Guaratiba",
    "Botafogo",
    "Vargem Grande",
    "Vargem Pequena",
    "Ilha de Guaratiba",
];

const CARD_SELECTORS: &[&str] = &["div[data-testid='card-container']"];
const CARD_TITLE_SELECTORS: &[&str] = &["div[data-testid='listing-card-title']"];
const CARD_PRICE_SELECTORS: &[&str] = &["div[data-testid='price-availability-row']"];

const MAX_CARDS_PER_PAGE: usize = 20;
/// Placeholder when a card exposes no readable price.
pub const FALLBACK_NIGHTLY_PRICE: i64 = 1000;
/// Photo count assumed at discovery time; the enrichment pass replaces the
/// score once the real gallery is visible.
pub const ASSUMED_PHOTO_COUNT: u32 = 30;

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub title: String,
    pub price_text: Option<String>,
    pub url: String,
}

/// (title, price text, link) tuples from a rendered search-results page.
/// Cards without a link are skipped; the link is canonicalized (query
/// stripped, host prefixed) so it can serve as the dedup key.
pub fn parse_search_results(html: &str, site_base: &str) -> Vec<SearchHit> {
    let doc = Html::parse_document(html);
    let root = doc.root_element();

    let mut hits = Vec::new();
    for card in engine::select_all(root, CARD_SELECTORS) {
        let Some(href) = engine::attr_values(card, "a[href]", "href").into_iter().next() else {
            continue;
        };
        let title = engine::first_text(card, CARD_TITLE_SELECTORS)
            .unwrap_or_else(|| "Luxury Property".to_string());
        let price_text = engine::first_text(card, CARD_PRICE_SELECTORS);

        hits.push(SearchHit {
            title,
            price_text,
            url: canonical_url(&href, site_base),
        });
    }
    hits
}

pub fn canonical_url(href: &str, site_base: &str) -> String {
    let bare = href.split('?').next().unwrap_or(href);
    if bare.starts_with('/') {
        format!("{}{}", site_base, bare)
    } else {
        bare.to_string()
    }
}

pub fn search_url(cfg: &Config, location: &str, checkin: &str, checkout: &str) -> String {
    format!(
        "{}/s/{}--{}/homes?price_min={}&room_types%5B%5D=Entire+home%2Fapt&checkin={}&checkout={}",
        cfg.site_base,
        location.replace(' ', "-"),
        cfg.region.replace(' ', "-"),
        cfg.min_price,
        checkin,
        checkout
    )
}

/// Sweep one location (or the whole neighborhood list), inserting unseen
/// listings as `pending` leads with a discovery-time score. A failed search
/// fetch skips that location and the sweep continues.
pub async fn run(
    cfg: &Config,
    conn: &Connection,
    fetcher: &dyn PageFetcher,
    location: Option<&str>,
    limit: Option<usize>,
) -> Result<usize> {
    let checkin_date = Local::now().date_naive() + Duration::days(cfg.checkin_days_ahead);
    let checkout_date = checkin_date + Duration::days(cfg.nights as i64);
    let checkin = checkin_date.format("%Y-%m-%d").to_string();
    let checkout = checkout_date.format("%Y-%m-%d").to_string();

    let locations: Vec<&str> = match location {
        Some(loc) => vec![loc],
        None => NEIGHBORHOODS.to_vec(),
    };

    let mut inserted = 0usize;
    'sweep: for loc in locations {
        info!("Searching {}", loc);
        let url = search_url(cfg, loc, &checkin, &checkout);
        let html = match fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Search fetch failed for {}: {}", loc, e);
                continue;
            }
        };

        for hit in parse_search_results(&html, &cfg.site_base)
            .into_iter()
            .take(MAX_CARDS_PER_PAGE)
        {
            if db::find_by_url(conn, &hit.url)?.is_some() {
                continue;
            }
            let price = hit
                .price_text
                .as_deref()
                .and_then(listing::parse_nightly_price)
                .unwrap_or(FALLBACK_NIGHTLY_PRICE);
            let lux = score::luxury_score(price, &hit.title, ASSUMED_PHOTO_COUNT, &[]);

            db::upsert(
                conn,
                &hit.url,
                &LeadPatch {
                    title: Some(hit.title.clone()),
                    neighborhood: Some(loc.to_string()),
                    price_per_night: Some(price),
                    luxury_score: Some(lux),
                    ..Default::default()
                },
            )?;
            info!("[+] {} ({})", hit.title, hit.url);
            inserted += 1;

            if let Some(max) = limit {
                if inserted >= max {
                    break 'sweep;
                }
            }
        }
    }
    Ok(inserted)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Status;
    use crate::fetch::FetchError;
    use async_trait::async_trait;

    const BASE: &str = "https://www.airbnb.com.br";

    fn fixture() -> String {
        std::fs::read_to_string("tests/fixtures/search.html").unwrap()
    }

    struct FixtureFetcher;

    #[async_trait]
    impl PageFetcher for FixtureFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            Ok(fixture())
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl PageFetcher for FailingFetcher {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            Err(FetchError::Status(429))
        }
    }

    #[test]
    fn parses_cards_with_canonical_links() {
        let hits = parse_search_results(&fixture(), BASE);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].title, "Cobertura Luxo Ipanema");
        assert_eq!(hits[0].url, "https://www.airbnb.com.br/rooms/777");
        assert_eq!(
            listing::parse_nightly_price(hits[0].price_text.as_deref().unwrap()),
            Some(2000)
        );
        // Third card has no price row at all.
        assert!(hits[2].price_text.is_none());
    }

    #[test]
    fn search_url_shape() {
        let cfg = Config::default();
        let url = search_url(&cfg, "Barra da Tijuca", "2026-08-22", "2026-08-25");
        assert!(url.starts_with("https://www.airbnb.com.br/s/Barra-da-Tijuca--Rio-de-Janeiro/"));
        assert!(url.contains("price_min=1000"));
        assert!(url.contains("checkin=2026-08-22"));
    }

    #[tokio::test]
    async fn sweep_inserts_pending_leads_once() {
        let cfg = Config::default();
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();

        let inserted = run(&cfg, &conn, &FixtureFetcher, Some("Ipanema"), None)
            .await
            .unwrap();
        assert_eq!(inserted, 3);

        let pending = db::list_by_status(&conn, Status::Pending).unwrap();
        assert_eq!(pending.len(), 3);
        let priced = pending
            .iter()
            .find(|l| l.url.ends_with("/rooms/777"))
            .unwrap();
        assert_eq!(priced.price_per_night, Some(2000));
        assert!(priced.luxury_score.unwrap() > 0.0);
        let unpriced = pending
            .iter()
            .find(|l| l.url.ends_with("/rooms/999"))
            .unwrap();
        assert_eq!(unpriced.price_per_night, Some(FALLBACK_NIGHTLY_PRICE));

        // Re-discovery does not duplicate.
        let again = run(&cfg, &conn, &FixtureFetcher, Some("Ipanema"), None)
            .await
            .unwrap();
        assert_eq!(again, 0);
        assert_eq!(db::list_by_status(&conn, Status::Pending).unwrap().len(), 3);
    }

    #[tokio::test]
    async fn failed_search_fetch_is_not_fatal() {
        let cfg = Config::default();
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let inserted = run(&cfg, &conn, &FailingFetcher, Some("Leblon"), None)
            .await
            .unwrap();
        assert_eq!(inserted, 0);
    }
}
