// src/analyze/price.rs
//! Price mentions: "$49.99", "EUR 20", "1,299 dollars", "¥500".

use super::text::enclosing_sentence;
use crate::model::{clamp01, PricePoint};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

const NUM: &str = r"\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?|\d+(?:[.,]\d{1,2})?";

static RE_PRICE: Lazy<Regex> = Lazy::new(|| {
    let prefix = r"\$|€|£|¥|\b(?:usd|eur|gbp|jpy|aud|cad)\b";
    let suffix = r"\$|€|£|¥|(?:usd|eur|gbp|jpy|aud|cad|australian\s+dollars?|canadian\s+dollars?|dollars?|euros?|pounds?|yen)\b";
    Regex::new(&format!(
        r"(?i)(?P<pre>{prefix})\s*(?P<n1>{NUM})|\b(?P<n2>{NUM})\s*(?P<post>{suffix})"
    ))
    .unwrap()
});
static RE_PRICE_WORDS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:costs?|prices?|priced|worth|value)\b").unwrap());
static RE_PERIOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bper\s+(?:month|year|annum)\b|\bannual(?:ly)?\b").unwrap());

fn currency_of(token: &str) -> &'static str {
    let t = token.to_lowercase();
    match t.as_str() {
        "$" | "usd" => "USD",
        "€" | "eur" => "EUR",
        "£" | "gbp" => "GBP",
        "¥" | "jpy" | "yen" => "JPY",
        "aud" => "AUD",
        "cad" => "CAD",
        _ if t.starts_with("australian") => "AUD",
        _ if t.starts_with("canadian") => "CAD",
        _ if t.starts_with("euro") => "EUR",
        _ if t.starts_with("pound") => "GBP",
        _ => "USD",
    }
}

/// "1,299.50" → 1299.5, "1,299" → 1299, "12,50" → 12.5.
fn parse_amount(raw: &str) -> Option<f64> {
    let s = if raw.contains(',') && raw.contains('.') {
        raw.replace(',', "")
    } else if let Some((_, tail)) = raw.rsplit_once(',') {
        if tail.len() == 3 {
            raw.replace(',', "")
        } else {
            raw.replace(',', ".")
        }
    } else {
        raw.to_string()
    };
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn price_confidence(value: f64, context: &str) -> f64 {
    let mut c = 0.5;
    if context.chars().count() > 20 {
        c += 0.2;
    }
    if RE_PRICE_WORDS.is_match(context) {
        c += 0.2;
    }
    if RE_PERIOD.is_match(context) {
        c += 0.1;
    }
    if value > 0.0 && value < 10_000.0 {
        c += 0.1;
    }
    clamp01(c)
}

/// All price mentions, highest confidence first (ties keep text order),
/// at most one entry per (value, currency).
pub fn extract_price_points(text: &str) -> Vec<PricePoint> {
    let mut points: Vec<PricePoint> = RE_PRICE
        .captures_iter(text)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let (num, cur) = match (cap.name("n1"), cap.name("pre")) {
                (Some(n), Some(p)) => (n.as_str(), p.as_str()),
                _ => (cap.name("n2")?.as_str(), cap.name("post")?.as_str()),
            };
            let value = parse_amount(num)?;
            let context = enclosing_sentence(text, whole.start(), whole.end()).to_string();
            Some(PricePoint {
                value,
                currency: currency_of(cur).to_string(),
                confidence: price_confidence(value, &context),
                context,
            })
        })
        .collect();

    points.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut seen: HashSet<(i64, String)> = HashSet::new();
    points.retain(|p| seen.insert(((p.value * 100.0).round() as i64, p.currency.clone())));
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_and_yen_in_order() {
        let pts = extract_price_points("This costs $49.99 and also ¥500");
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[0].currency, "USD");
        assert!((pts[0].value - 49.99).abs() < 1e-9);
        assert_eq!(pts[1].currency, "JPY");
        assert_eq!(pts[1].value, 500.0);
        assert!(pts[0].confidence >= pts[1].confidence);
    }

    #[test]
    fn duplicates_collapse() {
        let pts = extract_price_points("It was $20. Later it was $20 again. Now 20 EUR.");
        let usd: Vec<_> = pts.iter().filter(|p| p.currency == "USD").collect();
        assert_eq!(usd.len(), 1);
        assert!(pts.iter().any(|p| p.currency == "EUR" && p.value == 20.0));
    }

    #[test]
    fn currency_words_and_thousands() {
        let pts = extract_price_points("I paid 1,299 dollars, my friend paid 40 euros");
        assert!(pts.iter().any(|p| p.currency == "USD" && p.value == 1299.0));
        assert!(pts.iter().any(|p| p.currency == "EUR" && p.value == 40.0));

        let aud = extract_price_points("about 30 australian dollars");
        assert_eq!(aud[0].currency, "AUD");
    }

    #[test]
    fn recurring_period_raises_confidence() {
        let monthly = extract_price_points("The plan is $12 per month for teams");
        let once = extract_price_points("The plan is $12 once for all teams");
        assert!(monthly[0].confidence > once[0].confidence);
        assert!(monthly[0].confidence <= 1.0);
    }

    #[test]
    fn no_prices_in_plain_text() {
        assert!(extract_price_points("no numbers here, only 42 things").is_empty());
    }
}
