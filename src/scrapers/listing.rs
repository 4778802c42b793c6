//! Field extraction for a single sold-listing page.
//!
//! Every section is optional. A page missing the price box, the agent block
//! or even the attribute table still yields a record with whatever was found.

use crate::models::RawRecord;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::warn;

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css}: {e:?}"))
}

// Class names carry a build hash suffix, so match on the stable prefix.
static PRICE_BOX: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div[class*="SaleAttributes_sellingPrice__"]"#));
static PRICE_TEXT: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"span[class*="SaleAttributes_sellingPriceText__"]"#));
static HEADING: LazyLock<Selector> = LazyLock::new(|| selector("h1.hcl-heading"));
static SUMMARY_LINE: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"div[class*="ListingContent_paddedContainer__"] p.hcl-text"#));
static AGENT_LINK: LazyLock<Selector> = LazyLock::new(|| selector("div#maklarinfo a.hcl-link"));
static INFO_SECTION: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"section[aria-label="information om bostaden"]"#));
static INFO_ROW: LazyLock<Selector> =
    LazyLock::new(|| selector("div.hcl-flex--container.hcl-flex--justify-space-between"));
static INFO_LABEL: LazyLock<Selector> = LazyLock::new(|| selector("p.hcl-text"));
static INFO_VALUE: LazyLock<Selector> = LazyLock::new(|| selector("strong.hcl-text"));

const NBSP: char = '\u{a0}';

/// Parse one listing page into raw label/value pairs. The URL is attached
/// by the caller.
pub fn extract_fields(html: &str) -> RawRecord {
    let document = Html::parse_document(html);
    let mut record = RawRecord::default();

    if let Some(price) = final_price(&document) {
        record.insert("Slutpris", price);
    }

    if let Some(title) = document.select(&HEADING).next() {
        record.insert("Title", element_text(title).trim());
    }

    if let Some(line) = document.select(&SUMMARY_LINE).next() {
        let text = element_text(line);
        match split_summary(text.trim()) {
            Some((kind, location, sale_date)) => {
                record.insert("Type", kind);
                record.insert("Location", location);
                record.insert("Sale Date", sale_date);
            }
            None => warn!(line = %text.trim(), "Unexpected type/location/date line"),
        }
    }

    if let Some(agent) = document.select(&AGENT_LINK).next() {
        let name = element_text(agent);
        if !name.trim().is_empty() {
            record.insert("Agent Name", name.trim());
        }
        if let Some(href) = agent.value().attr("href") {
            record.insert("Agent Link", href);
        }
    }

    for (label, value) in attribute_table(&document) {
        record.insert(label, value);
    }

    record
}

/// The price box holds a label span followed by the amount span.
fn final_price(document: &Html) -> Option<String> {
    let container = document.select(&PRICE_BOX).next()?;
    let amount = container.select(&PRICE_TEXT).nth(1)?;
    Some(normalize_spaces(element_text(amount).trim()))
}

/// Split `"<type> - <location> - Såld <date>"` into its three parts.
pub fn split_summary(line: &str) -> Option<(&str, &str, &str)> {
    let parts: Vec<&str> = line.split(" - ").collect();
    match parts.as_slice() {
        [kind, location, sale_date] if sale_date.starts_with("Såld") => {
            Some((kind.trim(), location.trim(), sale_date.trim()))
        }
        _ => None,
    }
}

/// Label/value rows from the property information section, in page order.
fn attribute_table(document: &Html) -> Vec<(String, String)> {
    let Some(section) = document.select(&INFO_SECTION).next() else {
        return Vec::new();
    };

    section
        .select(&INFO_ROW)
        .filter_map(|row| {
            let label = row.select(&INFO_LABEL).next()?;
            let value = row.select(&INFO_VALUE).next()?;
            let label = stripped_text(label);
            if label.is_empty() {
                return None;
            }
            Some((label, normalize_spaces(&stripped_text(value))))
        })
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// Text nodes trimmed individually and joined, matching how the site splits
/// labels across inline elements.
fn stripped_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

fn normalize_spaces(value: &str) -> String {
    value.replace(NBSP, " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
          <h1 class="hcl-heading"> Rundelsgatan 14B </h1>
          <div class="ListingContent_paddedContainer__OC_QR">
            <p class="hcl-text">Lägenhet - Malmö Centrum - Såld 14 mars 2023</p>
          </div>
          <div class="SaleAttributes_sellingPrice__iFujI">
            <span class="SaleAttributes_sellingPriceText__UZF0W">Slutpris</span>
            <span class="SaleAttributes_sellingPriceText__UZF0W">2&nbsp;450&nbsp;000 kr</span>
          </div>
          <div id="maklarinfo">
            <a class="hcl-link" href="/maklare/anna-svensson-1234"> Anna Svensson </a>
          </div>
          <section aria-label="information om bostaden">
            <div class="hcl-flex--container hcl-flex--justify-space-between">
              <p class="hcl-text">Boarea</p><strong class="hcl-text">65,5&nbsp;m²</strong>
            </div>
            <div class="hcl-flex--container hcl-flex--justify-space-between">
              <p class="hcl-text">Avgift</p><strong class="hcl-text">3&nbsp;450 kr/mån</strong>
            </div>
            <div class="hcl-flex--container hcl-flex--justify-space-between">
              <p class="hcl-text">Våning</p><strong class="hcl-text">4 av 6, hiss finns</strong>
            </div>
            <div class="hcl-flex--container hcl-flex--justify-space-between">
              <p class="hcl-text">Balkong</p><strong class="hcl-text">Ja</strong>
            </div>
          </section>
        </body></html>
    "#;

    #[test]
    fn extracts_every_section() {
        let record = extract_fields(LISTING);

        assert_eq!(record.get("Slutpris"), Some("2 450 000 kr"));
        assert_eq!(record.get("Title"), Some("Rundelsgatan 14B"));
        assert_eq!(record.get("Type"), Some("Lägenhet"));
        assert_eq!(record.get("Location"), Some("Malmö Centrum"));
        assert_eq!(record.get("Sale Date"), Some("Såld 14 mars 2023"));
        assert_eq!(record.get("Agent Name"), Some("Anna Svensson"));
        assert_eq!(record.get("Agent Link"), Some("/maklare/anna-svensson-1234"));
        assert_eq!(record.get("Boarea"), Some("65,5 m²"));
        assert_eq!(record.get("Avgift"), Some("3 450 kr/mån"));
        assert_eq!(record.get("Våning"), Some("4 av 6, hiss finns"));
        assert_eq!(record.get("Balkong"), Some("Ja"));
    }

    #[test]
    fn labels_follow_the_page_not_a_schema() {
        let html = r#"
            <section aria-label="information om bostaden">
              <div class="hcl-flex--container hcl-flex--justify-space-between">
                <p class="hcl-text">Tomtarea</p><strong class="hcl-text">812 m²</strong>
              </div>
            </section>
        "#;
        let record = extract_fields(html);

        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.get("Tomtarea"), Some("812 m²"));
        assert_eq!(record.get("Avgift"), None);
    }

    #[test]
    fn missing_sections_yield_empty_record() {
        let record = extract_fields("<html><body><p>Sidan finns inte</p></body></html>");
        assert!(record.fields.is_empty());
    }

    #[test]
    fn price_box_with_single_span_is_skipped() {
        let html = r#"
            <h1 class="hcl-heading">Storgatan 1</h1>
            <div class="SaleAttributes_sellingPrice__x1">
              <span class="SaleAttributes_sellingPriceText__y2">Slutpris</span>
            </div>
        "#;
        let record = extract_fields(html);

        assert_eq!(record.get("Slutpris"), None);
        assert_eq!(record.get("Title"), Some("Storgatan 1"));
    }

    #[test]
    fn agent_name_without_link() {
        let html = r#"<div id="maklarinfo"><a class="hcl-link">Per Holm</a></div>"#;
        let record = extract_fields(html);

        assert_eq!(record.get("Agent Name"), Some("Per Holm"));
        assert_eq!(record.get("Agent Link"), None);
    }

    #[test]
    fn malformed_summary_line_leaves_fields_absent() {
        let html = r#"
            <div class="ListingContent_paddedContainer__abc">
              <p class="hcl-text">Villa - Limhamn</p>
            </div>
        "#;
        let record = extract_fields(html);

        assert_eq!(record.get("Type"), None);
        assert_eq!(record.get("Location"), None);
        assert_eq!(record.get("Sale Date"), None);
    }

    #[test]
    fn summary_requires_exactly_three_parts() {
        assert_eq!(
            split_summary("Radhus - Husie - Såld 2 maj 2024"),
            Some(("Radhus", "Husie", "Såld 2 maj 2024"))
        );
        assert_eq!(split_summary("Radhus - Husie - Öster - Såld 2 maj 2024"), None);
        assert_eq!(split_summary("Radhus - Husie - 2 maj 2024"), None);
    }
}
