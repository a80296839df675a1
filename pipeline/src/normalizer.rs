//! Maps provider listings onto `JobRecord`.
//!
//! Normalization is total: any JSON value, however incomplete, yields a
//! record with every field filled in.

use chrono::{Local, NaiveDate};
use common::{JobRecord, NOT_AVAILABLE};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    currency_symbol: String,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            currency_symbol: "£".to_string(),
        }
    }
}

impl Normalizer {
    pub fn with_currency_symbol(symbol: impl Into<String>) -> Self {
        Self {
            currency_symbol: symbol.into(),
        }
    }

    /// Picks the salary currency symbol for a provider country code.
    pub fn for_country(country: &str) -> Self {
        Self::with_currency_symbol(currency_symbol(country))
    }

    pub fn currency_symbol(&self) -> &str {
        &self.currency_symbol
    }

    pub fn normalize(&self, raw: &Value) -> JobRecord {
        self.normalize_on(raw, Local::now().date_naive())
    }

    /// Same as [`normalize`](Self::normalize) with an explicit fallback date
    /// for listings that carry no usable `created` timestamp.
    pub fn normalize_on(&self, raw: &Value, today: NaiveDate) -> JobRecord {
        JobRecord {
            posted_date: posted_date(raw).unwrap_or(today),
            title: text(raw, "title"),
            company: display_name(raw, "company"),
            location: display_name(raw, "location"),
            contract_type: text(raw, "contract_type"),
            salary_display: salary_amount(raw)
                .and_then(|amount| format_salary(&self.currency_symbol, amount))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            url: redirect_url(raw),
        }
    }

    pub fn normalize_all(&self, raws: &[Value]) -> Vec<JobRecord> {
        let today = Local::now().date_naive();
        raws.iter().map(|raw| self.normalize_on(raw, today)).collect()
    }
}

fn currency_symbol(country: &str) -> &'static str {
    match country.to_ascii_lowercase().as_str() {
        "gb" => "£",
        "us" | "ca" | "au" | "nz" | "sg" | "mx" => "$",
        "at" | "be" | "de" | "es" | "fr" | "it" | "nl" => "€",
        "ch" => "CHF ",
        "in" => "₹",
        "pl" => "zł ",
        "br" => "R$",
        "za" => "R",
        _ => "",
    }
}

fn non_blank<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key)?.as_str().map(str::trim).filter(|s| !s.is_empty())
}

fn text(raw: &Value, key: &str) -> String {
    non_blank(raw, key).unwrap_or(NOT_AVAILABLE).to_string()
}

fn display_name(raw: &Value, key: &str) -> String {
    raw.get(key)
        .and_then(|nested| non_blank(nested, "display_name"))
        .unwrap_or(NOT_AVAILABLE)
        .to_string()
}

/// `created` is a full timestamp (`2024-05-01T09:12:44Z`); only the date part is kept.
fn posted_date(raw: &Value) -> Option<NaiveDate> {
    let created = raw.get("created")?.as_str()?;
    let date = created.get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .inspect_err(|_| debug!(created, "unparseable created date, using today"))
        .ok()
}

fn salary_amount(raw: &Value) -> Option<f64> {
    match raw.get("salary_max")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

/// `£80,000` style display; zero and non-finite amounts have no display.
/// Halves round to even, as in `{:.0}` formatting.
fn format_salary(symbol: &str, amount: f64) -> Option<String> {
    if amount == 0.0 || !amount.is_finite() {
        return None;
    }
    let whole = format!("{:.0}", amount.abs());
    let sign = if amount < 0.0 && whole != "0" { "-" } else { "" };
    Some(format!("{symbol}{sign}{}", group_thousands(&whole)))
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

fn redirect_url(raw: &Value) -> String {
    let Some(link) = non_blank(raw, "redirect_url") else {
        return String::new();
    };
    if common::parse_http_url(link).is_some() {
        link.to_string()
    } else {
        debug!(link, "dropping redirect_url that is not an absolute http(s) URL");
        String::new()
    }
}
