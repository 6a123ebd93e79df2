//! Best-effort repair of the free-text `contact_data` column.
//!
//! The ledger stores contact details as something that is usually, but not
//! always, a JSON list of objects: keys may be unquoted, quotes may be single,
//! the surrounding brackets or separating commas may be missing. The repair is
//! a fixed sequence of textual fixes followed by a JSON parse; anything that
//! still fails to parse falls back to a fixed default.

use crate::schema::{ContactAddress, ContactFullName, Order};
use log::{debug, info, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

pub const DEFAULT_FULL_NAME: &str = "John Doe";
pub const DEFAULT_CITY: &str = "Unknown";
pub const DEFAULT_POSTAL_CODE: &str = "UNK00";

const FIRST_NAME_KEY: &str = "contact_name";
const LAST_NAME_KEY: &str = "contact_surname";
const CITY_KEY: &str = "city";
const POSTAL_CODE_KEY: &str = "cp";

static BARE_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([{,])\s*([a-zA-Z_]+)\s*:").expect("valid bare key pattern"));

static ADJACENT_OBJECTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\}\s*\{").expect("valid object boundary pattern"));

/// Applies the textual fixes and returns the repaired text. `None` means there
/// was nothing to repair (missing or blank input).
pub fn repair_contact_data(raw: Option<&str>) -> Option<String> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }

    let quoted_keys = BARE_KEY.replace_all(trimmed, r#"${1} "${2}":"#);
    let double_quoted = quoted_keys.replace('\'', "\"");

    let mut repaired = if double_quoted.starts_with('[') {
        double_quoted
    } else {
        format!("[{}", double_quoted)
    };
    repaired = ADJACENT_OBJECTS.replace_all(&repaired, "},{").into_owned();
    if !repaired.ends_with(']') {
        repaired.push(']');
    }

    debug!("Formatted contact_data: {}", repaired);
    Some(repaired)
}

/// Repairs and parses the field, returning its first record. Any failure along
/// the way yields `None`.
pub fn parse_contact_record(raw: Option<&str>) -> Option<Map<String, Value>> {
    let repaired = repair_contact_data(raw)?;

    match serde_json::from_str::<Value>(&repaired) {
        Ok(Value::Array(items)) => match items.into_iter().next() {
            Some(Value::Object(record)) => Some(record),
            _ => None,
        },
        Ok(_) => None,
        Err(e) => {
            debug!("Unparseable contact data {}: {}", repaired, e);
            None
        }
    }
}

fn text_field<'a>(record: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// `"First Last"`, or [`DEFAULT_FULL_NAME`] unless both parts are present.
pub fn extract_full_name(raw: Option<&str>) -> String {
    let Some(record) = parse_contact_record(raw) else {
        return DEFAULT_FULL_NAME.to_string();
    };

    match (
        text_field(&record, FIRST_NAME_KEY),
        text_field(&record, LAST_NAME_KEY),
    ) {
        (Some(first), Some(last)) => format!("{} {}", first, last),
        _ => DEFAULT_FULL_NAME.to_string(),
    }
}

/// `"City, PostalCode"`; each part falls back to its own default.
pub fn extract_address(raw: Option<&str>) -> String {
    let record = parse_contact_record(raw);
    let city = record
        .as_ref()
        .and_then(|r| text_field(r, CITY_KEY))
        .unwrap_or(DEFAULT_CITY);
    let postal_code = record
        .as_ref()
        .and_then(|r| text_field(r, POSTAL_CODE_KEY))
        .unwrap_or(DEFAULT_POSTAL_CODE);

    format!("{}, {}", city, postal_code)
}

pub fn contact_full_names<'a, I>(orders: I) -> Vec<ContactFullName>
where
    I: IntoIterator<Item = &'a Order>,
{
    let names: Vec<ContactFullName> = orders
        .into_iter()
        .map(|order| ContactFullName {
            order_id: order.order_id.clone(),
            contact_full_name: extract_full_name(order.contact_data.as_deref()),
        })
        .collect();

    report_fallbacks(
        "contact_full_name",
        names
            .iter()
            .filter(|n| n.contact_full_name == DEFAULT_FULL_NAME)
            .count(),
        names.len(),
    );
    names
}

pub fn contact_addresses<'a, I>(orders: I) -> Vec<ContactAddress>
where
    I: IntoIterator<Item = &'a Order>,
{
    let default_address = format!("{}, {}", DEFAULT_CITY, DEFAULT_POSTAL_CODE);
    let addresses: Vec<ContactAddress> = orders
        .into_iter()
        .map(|order| ContactAddress {
            order_id: order.order_id.clone(),
            contact_address: extract_address(order.contact_data.as_deref()),
        })
        .collect();

    report_fallbacks(
        "contact_address",
        addresses
            .iter()
            .filter(|a| a.contact_address == default_address)
            .count(),
        addresses.len(),
    );
    addresses
}

fn report_fallbacks(column: &str, fallbacks: usize, total: usize) {
    if total == 0 {
        warn!("No orders to process for {}", column);
        return;
    }
    if fallbacks > 0 {
        info!(
            "{}: {} of {} rows fell back to the default value",
            column, fallbacks, total
        );
    }
    info!("Successfully created {} column for {} orders", column, total);
}
