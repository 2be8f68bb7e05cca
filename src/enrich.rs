//! Enrichment pipeline: claim a pending lead, fetch its page, extract
//! fields, hop to the host profile, resolve contacts (with a one-shot
//! web-search fallback), recompute the score, and persist a field-level
//! merge. One lead's failure marks it `error` and never aborts the batch.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tokio::time::{sleep, Duration};
use tracing::{info, warn};

use crate::config::Config;
use crate::db::{self, Lead, LeadPatch, Status};
use crate::discover;
use crate::extract::{self, contact, host};
use crate::fetch::{self, PageFetcher};
use crate::score;

#[derive(Debug, Default)]
pub struct PassStats {
    pub processed: usize,
    pub ready: usize,
    pub errors: usize,
}

/// Enrich every pending lead once, sequentially. Stage order within a lead
/// is fixed: extract → resolve contact → score → persist.
pub async fn process_pending(
    cfg: &Config,
    conn: &Connection,
    fetcher: &dyn PageFetcher,
    limit: Option<usize>,
) -> Result<PassStats> {
    let mut pending = db::list_by_status(conn, Status::Pending)?;
    if let Some(max) = limit {
        pending.truncate(max);
    }
    if pending.is_empty() {
        info!("No pending leads.");
        return Ok(PassStats::default());
    }

    let pb = ProgressBar::new(pending.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")?
            .progress_chars("=> "),
    );

    let mut stats = PassStats::default();
    for lead in pending {
        match enrich_lead(cfg, conn, fetcher, &lead).await {
            Ok(()) => stats.ready += 1,
            Err(e) => {
                warn!("Lead {} failed: {}", lead.url, e);
                db::set_status(conn, lead.id, Status::Error)?;
                stats.errors += 1;
            }
        }
        stats.processed += 1;
        pb.inc(1);
    }
    pb.finish_and_clear();

    info!(
        "Enriched {} leads ({} ready, {} errors)",
        stats.processed, stats.ready, stats.errors
    );
    Ok(stats)
}

/// Full enrichment of a single lead. The listing fetch is the hard
/// dependency; the profile hop and search fallback degrade quietly.
pub async fn enrich_lead(
    cfg: &Config,
    conn: &Connection,
    fetcher: &dyn PageFetcher,
    lead: &Lead,
) -> Result<()> {
    db::set_status(conn, lead.id, Status::InProgress)?;

    let html = fetcher.fetch(&lead.url).await?;
    let facts = extract::extract_listing(&html);

    let mut profile = None;
    if let Some(host_id) = &facts.host_id {
        let profile_url = host::profile_url(&cfg.site_base, host_id);
        match fetcher.fetch(&profile_url).await {
            Ok(profile_html) => {
                profile = Some(extract::extract_profile(&profile_html, &cfg.site_base));
            }
            Err(e) => warn!("Host profile fetch failed for {}: {}", lead.url, e),
        }
    }

    // Contact resolution over listing description + profile text and the
    // outbound links of both pages.
    let description = facts.description.clone().unwrap_or_default();
    let mut blocks: Vec<&str> = vec![&description];
    let mut links = facts.outbound_links.clone();
    if let Some(p) = &profile {
        blocks.push(&p.text);
        links.extend(p.outbound_links.iter().cloned());
    }
    let mut contacts = contact::resolve(&blocks, &links);

    let host_name = facts.host_name.clone().or_else(|| lead.host_name.clone());
    if contacts.is_empty() {
        if let Some(name) = &host_name {
            info!("No contact on page for '{}', trying web search", name);
            match fetch::contact_lookup(fetcher, name, &cfg.region).await {
                Ok(text) => contacts.merge_missing(contact::resolve_filtered(
                    &[text.as_str()],
                    &[],
                    contact::SEARCH_EXTRA_BLOCKLIST,
                )),
                Err(e) => warn!("Contact lookup failed for '{}': {}", name, e),
            }
        }
    }

    // Badges accumulate across passes; maintenance items are replaced by
    // the latest scrape.
    let mut badges = lead.badges.clone();
    for badge in &facts.badges {
        if !badges.contains(badge) {
            badges.push(badge.clone());
        }
    }

    let portfolio = profile
        .as_ref()
        .map(|p| p.portfolio_size)
        .or(facts.portfolio_hint)
        .unwrap_or(1)
        .max(1);

    let price = facts.price_per_night.or(lead.price_per_night).unwrap_or(0);
    let title = lead.title.clone().unwrap_or_default();
    let photos = facts
        .photo_count
        .unwrap_or(discover::ASSUMED_PHOTO_COUNT);
    let lux = score::luxury_score(price, &title, photos, &badges);

    // The host's other listings ride along in the description text.
    let mut description_out = description.clone();
    if let Some(p) = &profile {
        if !p.other_listings.is_empty() {
            let catalog: Vec<String> = p
                .other_listings
                .iter()
                .map(|(title, url)| format!("{} ({})", title, url))
                .collect();
            description_out = format!(
                "{}\n\nOutros anúncios do anfitrião:\n{}",
                description_out,
                catalog.join("\n")
            );
        }
    }

    db::upsert(
        conn,
        &lead.url,
        &LeadPatch {
            host_name: facts.host_name.clone(),
            price_per_night: facts.price_per_night,
            luxury_score: Some(lux),
            badges: Some(badges),
            maintenance_items: Some(facts.maintenance_items.clone()),
            cleanliness_gap: facts.cleanliness_gap.clone(),
            email: contacts.email,
            phone: contacts.phone,
            instagram: contacts.instagram,
            website: contacts.website,
            host_portfolio_size: Some(portfolio),
            description: if description_out.trim().is_empty() {
                None
            } else {
                Some(description_out)
            },
            ..Default::default()
        },
    )?;
    db::set_status(conn, lead.id, Status::Ready)?;
    info!("Lead {} ready", lead.url);
    Ok(())
}

/// Poll for pending leads on a fixed interval and enrich them as they
/// appear. Errors inside one cycle are logged and the loop keeps going.
pub async fn watch(cfg: &Config, conn: &Connection, fetcher: &dyn PageFetcher) -> Result<()> {
    info!(
        "Watcher active, polling every {}s for pending leads",
        cfg.watch_interval_secs
    );
    loop {
        match db::list_by_status(conn, Status::Pending) {
            Ok(pending) if !pending.is_empty() => {
                info!("{} lead(s) to enrich", pending.len());
                match process_pending(cfg, conn, fetcher, None).await {
                    Ok(stats) => info!(
                        "Batch done ({} ready, {} errors). Waiting...",
                        stats.ready, stats.errors
                    ),
                    Err(e) => warn!("Watcher batch error: {}", e),
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Watcher error: {}", e),
        }
        sleep(Duration::from_secs(cfg.watch_interval_secs)).await;
    }
}

/// Enrich one specific URL now, creating the lead if it is unknown.
pub async fn target(
    cfg: &Config,
    conn: &Connection,
    fetcher: &dyn PageFetcher,
    url: &str,
) -> Result<()> {
    let canonical = discover::canonical_url(url, &cfg.site_base);
    let id = match db::find_by_url(conn, &canonical)? {
        Some(id) => id,
        None => db::upsert(
            conn,
            &canonical,
            &LeadPatch {
                title: Some("Manual Target".to_string()),
                neighborhood: Some("Manual".to_string()),
                ..Default::default()
            },
        )?,
    };

    let lead = db::get_lead(conn, id)?;
    if let Err(e) = enrich_lead(cfg, conn, fetcher, &lead).await {
        db::set_status(conn, id, Status::Error)?;
        return Err(e);
    }
    Ok(())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchError;
    use async_trait::async_trait;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        conn
    }

    /// Serves the listing fixture for room URLs, the profile fixture for
    /// profile URLs, and an empty page for web searches.
    struct StubSite;

    #[async_trait]
    impl PageFetcher for StubSite {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            if url.contains("/users/profile/") {
                Ok(fixture("profile"))
            } else if url.contains("google.com") {
                Ok("<html><body>sem resultados</body></html>".to_string())
            } else {
                Ok(fixture("listing"))
            }
        }
    }

    struct DeadSite;

    #[async_trait]
    impl PageFetcher for DeadSite {
        async fn fetch(&self, _url: &str) -> Result<String, FetchError> {
            Err(FetchError::Timeout)
        }
    }

    /// Listing page loads, but the profile hop always times out.
    struct ListingOnlySite;

    #[async_trait]
    impl PageFetcher for ListingOnlySite {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            if url.contains("/users/profile/") || url.contains("google.com") {
                Err(FetchError::Timeout)
            } else {
                Ok(fixture("listing"))
            }
        }
    }

    #[tokio::test]
    async fn pending_lead_ends_ready_with_fields_populated() {
        let cfg = Config::default();
        let conn = test_conn();
        let id = db::upsert(
            &conn,
            "https://www.airbnb.com.br/rooms/777",
            &LeadPatch {
                title: Some("Cobertura de Luxo Vista Mar".into()),
                neighborhood: Some("Ipanema".into()),
                price_per_night: Some(1000),
                ..Default::default()
            },
        )
        .unwrap();

        let stats = process_pending(&cfg, &conn, &StubSite, None).await.unwrap();
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.ready, 1);
        assert_eq!(stats.errors, 0);

        let lead = db::get_lead(&conn, id).unwrap();
        assert_eq!(lead.status, Status::Ready);
        assert_eq!(lead.host_name.as_deref(), Some("Maria Clara"));
        assert_eq!(lead.price_per_night, Some(8000));
        assert_eq!(lead.email.as_deref(), Some("reservas.mariac@gmail.com"));
        assert_eq!(lead.phone.as_deref(), Some("21999998888"));
        assert_eq!(lead.instagram.as_deref(), Some("@mariac.imoveis"));
        assert_eq!(lead.host_portfolio_size, 12);
        assert!(lead.badges.contains(&"Superhost".to_string()));
        assert!(lead.badges.contains(&"Luxe".to_string()));
        assert_eq!(lead.maintenance_items.len(), 4);
        assert!(lead.cleanliness_gap.unwrap().contains("poeira"));
        assert!(lead.description.unwrap().contains("Outros anúncios do anfitrião"));
        // Score recomputed from the real price and badges.
        assert!(lead.luxury_score.unwrap() > 60.0);
    }

    #[tokio::test]
    async fn fetch_failure_marks_error_and_batch_continues() {
        let cfg = Config::default();
        let conn = test_conn();
        let a = db::upsert(&conn, "https://www.airbnb.com.br/rooms/1", &LeadPatch::default())
            .unwrap();
        let b = db::upsert(&conn, "https://www.airbnb.com.br/rooms/2", &LeadPatch::default())
            .unwrap();

        let stats = process_pending(&cfg, &conn, &DeadSite, None).await.unwrap();
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.errors, 2);
        assert_eq!(db::get_lead(&conn, a).unwrap().status, Status::Error);
        assert_eq!(db::get_lead(&conn, b).unwrap().status, Status::Error);
        // No lead is ever left pending after a completed attempt.
        assert!(db::list_by_status(&conn, Status::Pending).unwrap().is_empty());
    }

    #[tokio::test]
    async fn profile_hop_failure_degrades_to_listing_facts() {
        let cfg = Config::default();
        let conn = test_conn();
        let id = db::upsert(
            &conn,
            "https://www.airbnb.com.br/rooms/777",
            &LeadPatch {
                title: Some("Cobertura".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let stats = process_pending(&cfg, &conn, &ListingOnlySite, None)
            .await
            .unwrap();
        assert_eq!(stats.ready, 1);

        let lead = db::get_lead(&conn, id).unwrap();
        assert_eq!(lead.status, Status::Ready);
        // Listing page carries no portfolio hint, so the default holds.
        assert_eq!(lead.host_portfolio_size, 1);
        // Contacts still come from the listing description.
        assert_eq!(lead.email.as_deref(), Some("reservas.mariac@gmail.com"));
    }

    #[tokio::test]
    async fn target_creates_and_enriches_unknown_url() {
        let cfg = Config::default();
        let conn = test_conn();
        target(
            &cfg,
            &conn,
            &StubSite,
            "https://www.airbnb.com.br/rooms/555?check_in=2026-09-01",
        )
        .await
        .unwrap();

        let id = db::find_by_url(&conn, "https://www.airbnb.com.br/rooms/555")
            .unwrap()
            .unwrap();
        let lead = db::get_lead(&conn, id).unwrap();
        assert_eq!(lead.status, Status::Ready);
        assert_eq!(lead.title.as_deref(), Some("Manual Target"));
        assert_eq!(lead.neighborhood.as_deref(), Some("Manual"));
    }

    #[tokio::test]
    async fn target_failure_marks_error() {
        let cfg = Config::default();
        let conn = test_conn();
        let err = target(&cfg, &conn, &DeadSite, "https://www.airbnb.com.br/rooms/556").await;
        assert!(err.is_err());

        let id = db::find_by_url(&conn, "https://www.airbnb.com.br/rooms/556")
            .unwrap()
            .unwrap();
        assert_eq!(db::get_lead(&conn, id).unwrap().status, Status::Error);
    }

    #[tokio::test]
    async fn maintenance_items_are_replaced_badges_accumulate() {
        let cfg = Config::default();
        let conn = test_conn();
        let id = db::upsert(
            &conn,
            "https://www.airbnb.com.br/rooms/777",
            &LeadPatch {
                title: Some("Cobertura".into()),
                badges: Some(vec!["Plus".into()]),
                maintenance_items: Some(vec!["Heliponto".into()]),
                ..Default::default()
            },
        )
        .unwrap();

        process_pending(&cfg, &conn, &StubSite, None).await.unwrap();

        let lead = db::get_lead(&conn, id).unwrap();
        // Stale category replaced by the latest scrape.
        assert!(!lead.maintenance_items.contains(&"Heliponto".to_string()));
        // Old badge kept, new ones appended.
        assert!(lead.badges.contains(&"Plus".to_string()));
        assert!(lead.badges.contains(&"Superhost".to_string()));
    }
}
