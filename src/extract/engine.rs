//! Generic evaluator for per-field extraction strategies: each field is
//! declared as an ordered slice of CSS selectors (first non-empty result
//! wins), with keyword-based container lookup as the last-resort tier for
//! sections that lack stable selectors.

use scraper::{ElementRef, Html, Selector};

/// Whitespace-normalized text content of an element.
pub fn element_text(el: ElementRef) -> String {
    el.text()
        .collect::<Vec<_>>()
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lower-cased, whitespace-normalized text of the whole document.
pub fn page_text(doc: &Html) -> String {
    element_text(doc.root_element()).to_lowercase()
}

/// First element matched by the first selector in the chain that hits.
pub fn first_element<'a>(scope: ElementRef<'a>, selectors: &[&str]) -> Option<ElementRef<'a>> {
    for raw in selectors {
        let Ok(sel) = Selector::parse(raw) else {
            continue;
        };
        if let Some(el) = scope.select(&sel).next() {
            return Some(el);
        }
    }
    None
}

/// Non-empty text of the first matching element in the chain.
pub fn first_text(scope: ElementRef, selectors: &[&str]) -> Option<String> {
    for raw in selectors {
        let Ok(sel) = Selector::parse(raw) else {
            continue;
        };
        for el in scope.select(&sel) {
            let text = element_text(el);
            if !text.is_empty() {
                return Some(text);
            }
        }
    }
    None
}

/// All elements matched by the first selector in the chain that yields any.
pub fn select_all<'a>(scope: ElementRef<'a>, selectors: &[&str]) -> Vec<ElementRef<'a>> {
    for raw in selectors {
        let Ok(sel) = Selector::parse(raw) else {
            continue;
        };
        let found: Vec<_> = scope.select(&sel).collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

/// Match count of the first selector in the chain that yields any.
pub fn count_first(scope: ElementRef, selectors: &[&str]) -> usize {
    select_all(scope, selectors).len()
}

/// Attribute values of every element matching `selector`.
pub fn attr_values(scope: ElementRef, selector: &str, attr: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else {
        return Vec::new();
    };
    scope
        .select(&sel)
        .filter_map(|el| el.value().attr(attr))
        .map(|v| v.to_string())
        .collect()
}

/// Last-resort container lookup: the first element matching `container_sel`
/// whose text contains one of the keywords (case-insensitive).
pub fn element_by_keywords<'a>(
    scope: ElementRef<'a>,
    container_sel: &str,
    keywords: &[&str],
) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(container_sel).ok()?;
    scope.select(&sel).find(|el| {
        let text = element_text(*el).to_lowercase();
        keywords.iter().any(|kw| text.contains(kw))
    })
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn first_text_takes_earliest_selector_that_hits() {
        let d = doc("<div class='b'>fallback</div>");
        let got = first_text(d.root_element(), &["div.a", "div.b"]);
        assert_eq!(got.as_deref(), Some("fallback"));
    }

    #[test]
    fn first_text_skips_empty_matches() {
        let d = doc("<div class='a'>  </div><div class='b'>real</div>");
        let got = first_text(d.root_element(), &["div.a", "div.b"]);
        assert_eq!(got.as_deref(), Some("real"));
    }

    #[test]
    fn missing_field_is_none() {
        let d = doc("<p>nothing here</p>");
        assert!(first_text(d.root_element(), &["div.absent"]).is_none());
    }

    #[test]
    fn element_text_is_normalized() {
        let d = doc("<div>  a\n  b <span>c</span> </div>");
        let el = first_element(d.root_element(), &["div"]).unwrap();
        assert_eq!(element_text(el), "a b c");
    }

    #[test]
    fn keyword_container_lookup() {
        let d = doc(
            "<section>irrelevant</section>\
             <section>Anfitrião: Maria</section>",
        );
        let el = element_by_keywords(d.root_element(), "section", &["anfitrião"]).unwrap();
        assert!(element_text(el).contains("Maria"));
    }

    #[test]
    fn count_uses_first_matching_chain_entry() {
        let d = doc("<img src='1'><img src='2'><img src='3'>");
        assert_eq!(count_first(d.root_element(), &["picture img", "img"]), 3);
    }
}
