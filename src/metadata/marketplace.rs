use crate::items::ItemType;
use crate::metadata::types::PageMeta;

const CURRENCY_SYMBOLS: [char; 5] = ['$', '€', '£', '₹', '¥'];

/// Ordered price selector candidates, most specific first.
const AMAZON_PRICE_SELECTORS: [&str; 3] = [
    "#priceblock_ourprice",
    ".a-price-whole",
    "#priceblock_dealprice",
];
const AMAZON_FRACTION_SELECTOR: &str = ".a-price-fraction";
const FLIPKART_PRICE_SELECTORS: [&str; 2] = ["._30jeq3", "._1_WHN1"];

fn is_amazon(url: &str) -> bool {
    url.contains("amazon.com") || url.contains("amazon.")
}

fn is_flipkart(url: &str) -> bool {
    url.contains("flipkart.com")
}

pub fn is_marketplace_url(url: &str) -> bool {
    is_amazon(url) || is_flipkart(url)
}

/// Marketplace rule: force the product type and, when the page markup is
/// available, try to pull a price out of it.
pub fn enrich(url: &str, html: Option<&str>, meta: &mut PageMeta) {
    if !is_marketplace_url(url) {
        return;
    }

    meta.item_type = Some(ItemType::Product);

    let Some(html) = html else {
        return;
    };

    if meta.price.is_none() {
        meta.price = extract_price(url, html);
    }
}

fn first_text(document: &scraper::Html, selector: &str) -> Option<String> {
    let selector = scraper::Selector::parse(selector).unwrap();
    document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

fn extract_price(url: &str, html: &str) -> Option<String> {
    let document = scraper::Html::parse_document(html);

    if is_amazon(url) {
        for selector in AMAZON_PRICE_SELECTORS {
            if let Some(whole) = first_text(&document, selector) {
                let fraction = first_text(&document, AMAZON_FRACTION_SELECTOR).unwrap_or_default();
                return Some(format!("{whole}{fraction}"));
            }
        }
        return class_price_fallback(&document);
    }

    if is_flipkart(url) {
        for selector in FLIPKART_PRICE_SELECTORS {
            if let Some(price) = first_text(&document, selector) {
                return Some(price);
            }
        }
        return class_price_fallback(&document);
    }

    None
}

/// Last resort: any element whose class mentions "price" and whose text
/// carries a currency symbol.
fn class_price_fallback(document: &scraper::Html) -> Option<String> {
    let selector = scraper::Selector::parse(r#"[class*="price"]"#).unwrap();
    document
        .select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .find(|text| !text.is_empty() && text.contains(&CURRENCY_SYMBOLS[..]))
}
