//! Free-text search queries in Portuguese.
//!
//! "gastos com alimentação em março acima de 50" becomes
//! `{ category: "alimentação", month: 3, min_amount: 50 }`.

use common::ParsedQuery;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::{debug, trace};

const MONTHS: [(&str, u32); 25] = [
    ("janeiro", 1),
    ("fevereiro", 2),
    ("março", 3),
    ("marco", 3),
    ("abril", 4),
    ("maio", 5),
    ("junho", 6),
    ("julho", 7),
    ("agosto", 8),
    ("setembro", 9),
    ("outubro", 10),
    ("novembro", 11),
    ("dezembro", 12),
    ("jan", 1),
    ("fev", 2),
    ("mar", 3),
    ("abr", 4),
    ("mai", 5),
    ("jun", 6),
    ("jul", 7),
    ("ago", 8),
    ("set", 9),
    ("out", 10),
    ("nov", 11),
    ("dez", 12),
];

static MONTH_RE: Lazy<Regex> = Lazy::new(|| {
    let names: Vec<&str> = MONTHS.iter().map(|(name, _)| *name).collect();
    Regex::new(&format!(r"\b({})\b", names.join("|"))).expect("month pattern is valid")
});

static YEAR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("year pattern is valid"));

/// `1.500,00` style amounts with thousands groups, or plain `250,50` / `250.5`.
const AMOUNT: &str = r"(?:(\d{1,3}(?:\.\d{3})+(?:,\d{1,2})?)|(\d+(?:[.,]\d{1,2})?))\b";

static ABOVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"acima\s+de\s+(?:r\$\s*)?{}", AMOUNT)).expect("amount pattern is valid")
});

static BELOW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"abaixo\s+de\s+(?:r\$\s*)?{}", AMOUNT)).expect("amount pattern is valid")
});

static PREPOSITION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:com|em|de|no|na)\s+(\p{L}{3,})").expect("category pattern is valid"));

/// Month number for a Portuguese month name or its three letter form.
pub fn month_from_name(name: &str) -> Option<u32> {
    let name = name.to_lowercase();
    MONTHS
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, month)| *month)
}

/// Reads the amount captured by [`AMOUNT`]. Dots are thousands separators in grouped form.
fn parse_amount(caps: &Captures) -> Option<Decimal> {
    let normalized = match (caps.get(1), caps.get(2)) {
        (Some(grouped), _) => grouped.as_str().replace('.', "").replace(',', "."),
        (None, Some(plain)) => plain.as_str().replace(',', "."),
        (None, None) => return None,
    };
    Decimal::from_str(&normalized).ok()
}

/// Extracts month, year, category and amount bounds from `query`.
///
/// Categories are matched against `category_names` first, longest name
/// first; otherwise the word following `com`, `em`, `de`, `no` or `na` is
/// used when it is not a month name.
pub fn parse_query(query: &str, category_names: &[String]) -> ParsedQuery {
    let text = query.trim().to_lowercase();
    let mut parsed = ParsedQuery::default();

    if let Some(caps) = MONTH_RE.captures(&text) {
        parsed.month = month_from_name(&caps[1]);
    }
    if let Some(caps) = YEAR_RE.captures(&text) {
        parsed.year = caps[1].parse().ok();
    }
    if let Some(caps) = ABOVE_RE.captures(&text) {
        parsed.min_amount = parse_amount(&caps);
    }
    if let Some(caps) = BELOW_RE.captures(&text) {
        parsed.max_amount = parse_amount(&caps);
    }

    let mut names: Vec<&String> = category_names.iter().collect();
    names.sort_by_key(|n| std::cmp::Reverse(n.chars().count()));
    parsed.category = names
        .into_iter()
        .find(|name| {
            let needle = name.trim().to_lowercase();
            !needle.is_empty() && text.contains(&needle)
        })
        .cloned()
        .or_else(|| {
            PREPOSITION_RE
                .captures_iter(&text)
                .map(|caps| caps[1].to_string())
                .find(|word| month_from_name(word).is_none())
        });

    trace!(query = %text, "Parsed search query");
    debug!(?parsed, "Search filters");
    parsed
}
