pub mod contact;
pub mod engine;
pub mod host;
pub mod listing;
pub mod reviews;

use scraper::Html;

/// Everything one enrichment pass pulls from a rendered listing page.
/// Missing fields stay `None`/empty; extraction never fails on absence.
#[derive(Debug, Default)]
pub struct ListingFacts {
    pub description: Option<String>,
    pub price_per_night: Option<i64>,
    pub photo_count: Option<u32>,
    pub badges: Vec<String>,
    pub maintenance_items: Vec<String>,
    pub cleanliness_gap: Option<String>,
    pub host_name: Option<String>,
    pub host_id: Option<String>,
    /// Listing-count hint on the listing page itself, for when the host
    /// profile is unreachable.
    pub portfolio_hint: Option<i64>,
    pub outbound_links: Vec<String>,
}

/// Facts from a host-profile page (second fetch).
#[derive(Debug, Default)]
pub struct ProfileFacts {
    pub text: String,
    pub portfolio_size: i64,
    pub other_listings: Vec<(String, String)>,
    pub outbound_links: Vec<String>,
}

pub fn extract_listing(html: &str) -> ListingFacts {
    let doc = Html::parse_document(html);
    let page_text = engine::page_text(&doc);
    let root = doc.root_element();

    let (host_name, superhost) = match host::host_section(&doc) {
        Some(section) => {
            let text = engine::element_text(section);
            (host::host_name(section), host::is_superhost(&text))
        }
        None => (None, false),
    };

    let mut badges = listing::badges(&page_text);
    if superhost && !badges.iter().any(|b| b == "Superhost") {
        badges.insert(0, "Superhost".to_string());
    }

    let cards = reviews::collect_reviews(&doc);

    ListingFacts {
        description: listing::description(&doc),
        price_per_night: listing::nightly_price(&doc),
        photo_count: listing::photo_count(&doc),
        badges,
        maintenance_items: listing::maintenance_items(&page_text),
        cleanliness_gap: reviews::cleanliness_gap(&cards),
        host_name,
        host_id: host::host_id(html),
        portfolio_hint: host::listing_page_portfolio_hint(&page_text),
        outbound_links: engine::attr_values(root, "a[href]", "href"),
    }
}

pub fn extract_profile(html: &str, site_base: &str) -> ProfileFacts {
    let doc = Html::parse_document(html);
    let text = engine::element_text(doc.root_element());
    let rooms = host::room_links(&doc, site_base);

    ProfileFacts {
        portfolio_size: host::portfolio_size(&text, rooms.len()),
        other_listings: host::other_listings(&doc, site_base),
        outbound_links: engine::attr_values(doc.root_element(), "a[href]", "href"),
        text,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    #[test]
    fn listing_fixture_full_extraction() {
        let facts = extract_listing(&fixture("listing"));

        let desc = facts.description.unwrap();
        assert!(desc.contains("piscina privativa"));

        // R$ 24.000 total over 3 nights
        assert_eq!(facts.price_per_night, Some(8000));
        assert_eq!(facts.photo_count, Some(3));

        assert!(facts.badges.iter().any(|b| b == "Superhost"));
        assert!(facts.badges.iter().any(|b| b == "Luxe"));

        assert_eq!(
            facts.maintenance_items,
            vec!["Mármore/Vidro", "Piscina/Jacuzzi", "Automação", "Café Premium"]
        );

        let gap = facts.cleanliness_gap.unwrap();
        assert!(gap.contains("poeira"));
        assert!(gap.starts_with("(3★)"));
        assert!(!gap.contains("impecável"));

        assert_eq!(facts.host_name.as_deref(), Some("Maria Clara"));
        assert_eq!(facts.host_id.as_deref(), Some("5541"));
    }

    #[test]
    fn listing_fixture_contact_resolution() {
        let facts = extract_listing(&fixture("listing"));
        let desc = facts.description.unwrap();
        let contacts = contact::resolve(&[desc.as_str()], &facts.outbound_links);

        assert_eq!(contacts.email.as_deref(), Some("reservas.mariac@gmail.com"));
        assert_eq!(contacts.phone.as_deref(), Some("21999998888"));
        assert_eq!(contacts.instagram.as_deref(), Some("@mariac.imoveis"));
    }

    #[test]
    fn profile_fixture_extraction() {
        let facts = extract_profile(&fixture("profile"), "https://www.airbnb.com.br");
        assert_eq!(facts.portfolio_size, 12);
        assert_eq!(facts.other_listings.len(), 2);
        assert_eq!(facts.other_listings[0].0, "Loft Ipanema");

        let contacts = contact::resolve(&[facts.text.as_str()], &facts.outbound_links);
        assert_eq!(
            contacts.email.as_deref(),
            Some("contato@mariacimoveis.com.br")
        );
        assert_eq!(
            contacts.website.as_deref(),
            Some("https://www.casamar.com.br")
        );
    }

    #[test]
    fn empty_page_extracts_nothing() {
        let facts = extract_listing("<html><body><p>404</p></body></html>");
        assert!(facts.description.is_none());
        assert!(facts.price_per_night.is_none());
        assert!(facts.badges.is_empty());
        assert!(facts.maintenance_items.is_empty());
        assert!(facts.cleanliness_gap.is_none());
        assert!(facts.host_name.is_none());
        assert!(facts.host_id.is_none());
    }
}
