use crate::error::{ReportError, Result};
use crate::schema::{Invoice, Order, OrderTable};
use crate::utils::{parse_amount_or_default, parse_order_date, split_salesowners};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

pub const DEFAULT_ORDERS_DELIMITER: u8 = b';';

/// Row shape of the order ledger as it sits on disk. Every column is optional
/// here; stage-level column checks happen on [`OrderTable`].
#[derive(Debug, Deserialize)]
struct RawOrderRow {
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    company_id: Option<String>,
    #[serde(default)]
    company_name: Option<String>,
    #[serde(default)]
    crate_type: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    salesowners: Option<String>,
    #[serde(default)]
    contact_data: Option<String>,
}

impl RawOrderRow {
    fn into_order(self) -> Order {
        Order {
            order_id: self.order_id.unwrap_or_default(),
            company_id: non_blank(self.company_id),
            company_name: non_blank(self.company_name),
            crate_type: non_blank(self.crate_type),
            date: self.date.as_deref().and_then(parse_order_date),
            salesowners: split_salesowners(self.salesowners.as_deref()),
            contact_data: non_blank(self.contact_data),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

pub fn load_orders(path: impl AsRef<Path>) -> Result<OrderTable> {
    load_orders_with_delimiter(path, DEFAULT_ORDERS_DELIMITER)
}

pub fn load_orders_with_delimiter(path: impl AsRef<Path>, delimiter: u8) -> Result<OrderTable> {
    let path = path.as_ref();
    let display = path.display().to_string();

    if !path.exists() {
        error!("File not found: {}", display);
        return Err(ReportError::FileNotFound(display));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)
        .map_err(|e| malformed_csv(&display, e))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| malformed_csv(&display, e))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if !columns.iter().any(|c| c == "order_id") {
        error!("Order ledger {} has no 'order_id' column", display);
        return Err(ReportError::MissingColumn {
            table: "orders".to_string(),
            column: "order_id".to_string(),
        });
    }

    let mut rows = Vec::new();
    for record in reader.deserialize::<RawOrderRow>() {
        let raw = record.map_err(|e| malformed_csv(&display, e))?;
        rows.push(raw.into_order());
    }

    let missing_ids = rows.iter().filter(|o| o.order_id.trim().is_empty()).count();
    if missing_ids > 0 {
        warn!("{} order rows have an empty order_id", missing_ids);
    }

    if columns.iter().any(|c| c == "date") {
        let undated = rows.iter().filter(|o| o.date.is_none()).count();
        if undated > 0 {
            warn!(
                "{} order dates could not be parsed as DD.MM.YY and were left empty",
                undated
            );
        }
    }

    info!("Loaded {} order records from {}", rows.len(), display);
    Ok(OrderTable::new(columns, rows))
}

fn malformed_csv(path: &str, err: csv::Error) -> ReportError {
    error!("Error reading CSV file {}: {}", path, err);
    ReportError::MalformedCsv {
        path: path.to_string(),
        details: err.to_string(),
    }
}

/// Loads the `data.invoices` array of the invoicing feed. `grossValue` and
/// `vat` may be numbers or numeric text; anything unusable becomes 0.
pub fn load_invoices(path: impl AsRef<Path>) -> Result<Vec<Invoice>> {
    let path = path.as_ref();
    let display = path.display().to_string();

    if !path.exists() {
        error!("File not found: {}", display);
        return Err(ReportError::FileNotFound(display));
    }

    let raw = fs::read_to_string(path)?;
    let invoices = parse_invoices(&raw, &display)?;
    info!("Loaded {} invoicing records from {}", invoices.len(), display);
    Ok(invoices)
}

pub fn parse_invoices(raw: &str, source: &str) -> Result<Vec<Invoice>> {
    let document: Value = serde_json::from_str(raw).map_err(|e| {
        error!("Invalid JSON format in {}: {}", source, e);
        ReportError::MalformedJson {
            path: source.to_string(),
            details: e.to_string(),
        }
    })?;

    let entries = document
        .get("data")
        .and_then(|data| data.get("invoices"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            error!("Invoicing document {} has no data.invoices array", source);
            ReportError::MissingColumn {
                table: "invoices".to_string(),
                column: "data.invoices".to_string(),
            }
        })?;

    let mut invoices = Vec::with_capacity(entries.len());
    let mut coerced = 0usize;
    let mut skipped = 0usize;

    for entry in entries {
        let order_id = match entry.get("orderId") {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                skipped += 1;
                continue;
            }
        };

        let gross_raw = entry.get("grossValue").unwrap_or(&Value::Null);
        let vat_raw = entry.get("vat").unwrap_or(&Value::Null);
        let gross_value = parse_amount_or_default(gross_raw, 0.0);
        let vat = parse_amount_or_default(vat_raw, 0.0);

        if !is_numeric(gross_raw) || !is_numeric(vat_raw) {
            coerced += 1;
        }

        invoices.push(Invoice {
            order_id,
            gross_value,
            vat,
        });
    }

    if skipped > 0 {
        warn!("Skipped {} invoices without an orderId", skipped);
    }
    if coerced > 0 {
        warn!(
            "{} invoices had a non-numeric grossValue or vat, coerced to 0",
            coerced
        );
    }

    Ok(invoices)
}

fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok(),
        _ => false,
    }
}
