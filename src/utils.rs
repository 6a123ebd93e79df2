use chrono::{Days, NaiveDate};
use serde_json::Value;

/// Source format of the order ledger's `date` column (e.g. `29.01.22`).
pub const ORDER_DATE_FORMAT: &str = "%d.%m.%y";

/// Separator used when a salesowner list is serialized into a single field.
pub const SALESOWNER_SEPARATOR: &str = ", ";

/// Calendar month label in `YYYY-MM` form.
pub fn year_month_label(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Parses a `DD.MM.YY` order date (`29.01.22` is 2022-01-29).
pub fn parse_order_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, ORDER_DATE_FORMAT).ok()
}

/// Start of a trailing window of `days` ending at `latest` (inclusive).
pub fn lookback_start(latest: NaiveDate, days: u64) -> NaiveDate {
    latest
        .checked_sub_days(Days::new(days))
        .unwrap_or(NaiveDate::MIN)
}

/// Reads a monetary or percentage field that may arrive as a JSON number or
/// as numeric text. Anything else (null, empty or non-numeric text, objects)
/// yields `default`.
pub fn parse_amount_or_default(value: &Value, default: f64) -> f64 {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };

    match parsed {
        Some(v) if v.is_finite() => v,
        _ => default,
    }
}

/// Splits a comma-space joined salesowner field into its ordered names.
pub fn split_salesowners(raw: Option<&str>) -> Vec<String> {
    match raw {
        Some(s) => s
            .split(SALESOWNER_SEPARATOR)
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        None => Vec::new(),
    }
}

pub fn join_salesowners(owners: &[String]) -> String {
    owners.join(SALESOWNER_SEPARATOR)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
