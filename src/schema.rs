use crate::error::{ReportError, Result};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, JsonSchema,
)]
#[serde(rename_all = "PascalCase")]
pub enum CrateType {
    #[schemars(description = "Metal crates")]
    Metal,

    #[schemars(description = "Plastic crates, the subset used by the performance reports")]
    Plastic,

    #[schemars(description = "Wooden crates")]
    Wood,
}

impl CrateType {
    pub const ALL: [CrateType; 3] = [CrateType::Metal, CrateType::Plastic, CrateType::Wood];

    pub fn as_str(&self) -> &'static str {
        match self {
            CrateType::Metal => "Metal",
            CrateType::Plastic => "Plastic",
            CrateType::Wood => "Wood",
        }
    }
}

impl fmt::Display for CrateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CrateType {
    type Err = ReportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Metal" => Ok(CrateType::Metal),
            "Plastic" => Ok(CrateType::Plastic),
            "Wood" => Ok(CrateType::Wood),
            other => Err(ReportError::InvalidCrateType(other.to_string())),
        }
    }
}

/// One row of the order ledger.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Order {
    pub order_id: String,
    pub company_id: Option<String>,
    /// Free text; the same company may appear under variant spellings.
    pub company_name: Option<String>,
    /// Raw crate type as written in the ledger. Use [`Order::crate_kind`] for
    /// the validated value.
    pub crate_type: Option<String>,
    /// `None` when the source date was missing or not in `DD.MM.YY` form.
    pub date: Option<NaiveDate>,
    /// Main owner first, then co-owner 1 and co-owner 2.
    pub salesowners: Vec<String>,
    pub contact_data: Option<String>,
}

impl Order {
    pub fn crate_kind(&self) -> Option<CrateType> {
        self.crate_type
            .as_deref()
            .and_then(|raw| raw.parse::<CrateType>().ok())
    }
}

/// Columns every order ledger is expected to carry.
pub const ORDER_COLUMNS: [&str; 7] = [
    "order_id",
    "company_id",
    "company_name",
    "crate_type",
    "date",
    "salesowners",
    "contact_data",
];

/// The parsed order ledger together with the header it was read from, so each
/// report stage can check for the columns it depends on.
#[derive(Debug, Clone, Default)]
pub struct OrderTable {
    pub columns: Vec<String>,
    pub rows: Vec<Order>,
}

impl OrderTable {
    pub fn new(columns: Vec<String>, rows: Vec<Order>) -> Self {
        Self { columns, rows }
    }

    /// Builds a table that claims every standard column. Used when orders are
    /// constructed in memory rather than read from a ledger.
    pub fn from_rows(rows: Vec<Order>) -> Self {
        Self {
            columns: ORDER_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn require_columns(&self, required: &[&str]) -> Result<()> {
        for column in required {
            if !self.has_column(column) {
                return Err(ReportError::MissingColumn {
                    table: "orders".to_string(),
                    column: column.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// One entry of the invoicing feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub order_id: String,
    /// Gross amount in cents.
    pub gross_value: f64,
    /// VAT percentage, 0-100.
    pub vat: f64,
}

impl Invoice {
    /// Gross value with VAT removed, converted from cents to euros.
    pub fn net_invoiced_value_euros(&self) -> f64 {
        self.gross_value * (1.0 - self.vat / 100.0) / 100.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionEntry {
    pub sales_owner: String,
    pub total_commission: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrateDistributionEntry {
    pub company_id: String,
    pub crate_type: String,
    pub order_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrateTypeShare {
    pub crate_type: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesPerformanceEntry {
    pub salesowners: String,
    pub gross_per_salesowner: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopPerformerEntry {
    pub salesowners: String,
    pub year_month: String,
    pub gross_per_salesowner: f64,
    pub gross_rolling_3m: f64,
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySalesowners {
    pub company_id: String,
    pub company_name: String,
    pub list_salesowners: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactFullName {
    pub order_id: String,
    pub contact_full_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactAddress {
    pub order_id: String,
    pub contact_address: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_net_invoiced_value() {
        let invoice = Invoice {
            order_id: "ord1".to_string(),
            gross_value: 100_000.0,
            vat: 20.0,
        };
        assert!((invoice.net_invoiced_value_euros() - 800.0).abs() < 1e-9);

        let untaxed = Invoice {
            order_id: "ord3".to_string(),
            gross_value: 150_000.0,
            vat: 0.0,
        };
        assert!((untaxed.net_invoiced_value_euros() - 1500.0).abs() < 1e-9);
    }

    #[test]
    fn test_net_value_is_never_negative_for_valid_inputs() {
        for gross in [0.0, 1.0, 999.0, 324_222.0] {
            for vat in [0.0, 7.0, 19.0, 100.0] {
                let invoice = Invoice {
                    order_id: "x".to_string(),
                    gross_value: gross,
                    vat,
                };
                assert!(invoice.net_invoiced_value_euros() >= 0.0);
            }
        }
    }

    #[test]
    fn test_crate_kind_parsing() {
        let mut order = Order {
            crate_type: Some("Plastic".to_string()),
            ..Default::default()
        };
        assert_eq!(order.crate_kind(), Some(CrateType::Plastic));

        order.crate_type = Some("Cardboard".to_string());
        assert_eq!(order.crate_kind(), None);

        let err = "Cardboard".parse::<CrateType>().unwrap_err();
        assert!(matches!(err, ReportError::InvalidCrateType(ref raw) if raw == "Cardboard"));

        order.crate_type = None;
        assert_eq!(order.crate_kind(), None);
    }

    #[test]
    fn test_require_columns() {
        let table = OrderTable::new(vec!["order_id".to_string()], vec![]);
        assert!(table.require_columns(&["order_id"]).is_ok());

        let err = table.require_columns(&["order_id", "date"]).unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn { ref column, .. } if column == "date"));
    }
}
