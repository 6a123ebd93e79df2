use crate::error::{ReportError, Result};
use crate::schema::CrateType;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CommissionRates {
    #[schemars(description = "Share of the net invoiced value paid to the first listed salesowner")]
    pub main_owner: f64,

    #[schemars(description = "Share paid to the second listed salesowner")]
    pub co_owner_1: f64,

    #[schemars(description = "Share paid to the third listed salesowner")]
    pub co_owner_2: f64,
}

impl Default for CommissionRates {
    fn default() -> Self {
        Self {
            main_owner: 0.06,
            co_owner_1: 0.025,
            co_owner_2: 0.0095,
        }
    }
}

impl CommissionRates {
    /// Rate for a 0-based position in an order's salesowner list. Positions
    /// past the third earn nothing.
    pub fn for_position(&self, position: usize) -> Option<f64> {
        match position {
            0 => Some(self.main_owner),
            1 => Some(self.co_owner_1),
            2 => Some(self.co_owner_2),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GroupingStrategy {
    #[schemars(
        description = "Rows are visited in file order; an ungrouped row opens a group and claims every later ungrouped row above the threshold. A row is never reassigned."
    )]
    FirstMatch,

    #[schemars(
        description = "Rows linked by any chain of above-threshold similarities share a group (union-find over the similarity matrix)."
    )]
    ConnectedComponents,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[schemars(description = "Keep every row; duplicated order ids are only reported as a warning")]
    KeepAll,

    #[schemars(description = "Keep the first row for each order id and drop later repeats")]
    KeepFirst,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DuplicatePolicies {
    pub commissions: DuplicatePolicy,
    pub crate_distribution: DuplicatePolicy,
    pub sales_performance: DuplicatePolicy,
    pub top_performers: DuplicatePolicy,
    pub company_salesowners: DuplicatePolicy,
    pub contacts: DuplicatePolicy,
}

impl Default for DuplicatePolicies {
    fn default() -> Self {
        Self {
            commissions: DuplicatePolicy::KeepAll,
            crate_distribution: DuplicatePolicy::KeepAll,
            sales_performance: DuplicatePolicy::KeepFirst,
            top_performers: DuplicatePolicy::KeepFirst,
            company_salesowners: DuplicatePolicy::KeepAll,
            contacts: DuplicatePolicy::KeepAll,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ReportConfig {
    #[schemars(description = "Path to the ';'-separated order ledger")]
    pub orders_path: PathBuf,

    #[schemars(description = "Path to the invoicing JSON document (data.invoices)")]
    pub invoices_path: PathBuf,

    #[schemars(description = "Directory every report CSV is written into; created if missing")]
    pub output_dir: PathBuf,

    #[schemars(description = "Field delimiter of the order ledger")]
    pub orders_delimiter: char,

    pub commission_rates: CommissionRates,

    #[schemars(description = "Minimum Jaccard similarity (0.0-1.0) for two company names to be grouped")]
    pub similarity_threshold: f64,

    pub grouping_strategy: GroupingStrategy,

    #[schemars(description = "Crate type the performance reports are restricted to")]
    pub performance_crate_type: CrateType,

    #[schemars(description = "Number of present months summed by the rolling performance window")]
    pub rolling_window_months: usize,

    #[schemars(description = "How many salesowners are kept per month in the rolling ranking")]
    pub top_n: usize,

    #[schemars(description = "Trailing window, in days before the latest order date, for the sales performance report")]
    pub lookback_days: u64,

    pub duplicates: DuplicatePolicies,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            orders_path: PathBuf::from("data/orders.csv"),
            invoices_path: PathBuf::from("data/invoicing_data.json"),
            output_dir: PathBuf::from("output"),
            orders_delimiter: ';',
            commission_rates: CommissionRates::default(),
            similarity_threshold: 0.7,
            grouping_strategy: GroupingStrategy::FirstMatch,
            performance_crate_type: CrateType::Plastic,
            rolling_window_months: 3,
            top_n: 5,
            lookback_days: 365,
            duplicates: DuplicatePolicies::default(),
        }
    }
}

impl ReportConfig {
    /// Reads a JSON config file. Fields left out of the file keep their
    /// defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ReportError::FileNotFound(path.display().to_string()));
        }
        let raw = fs::read_to_string(path)?;
        let config: ReportConfig = serde_json::from_str(&raw)?;
        debug!("Loaded report configuration from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(invalid(
                "similarity_threshold",
                format!("{} must be between 0.0 and 1.0", self.similarity_threshold),
            ));
        }
        if self.rolling_window_months == 0 {
            return Err(invalid("rolling_window_months", "must be at least 1".to_string()));
        }
        if self.top_n == 0 {
            return Err(invalid("top_n", "must be at least 1".to_string()));
        }
        if !self.orders_delimiter.is_ascii() {
            return Err(invalid(
                "orders_delimiter",
                format!("'{}' is not a single-byte delimiter", self.orders_delimiter),
            ));
        }

        let rates = &self.commission_rates;
        for (field, rate) in [
            ("commission_rates.main_owner", rates.main_owner),
            ("commission_rates.co_owner_1", rates.co_owner_1),
            ("commission_rates.co_owner_2", rates.co_owner_2),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(invalid(field, format!("{} must be between 0.0 and 1.0", rate)));
            }
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReportConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

fn invalid(field: &str, details: String) -> ReportError {
    ReportError::InvalidConfig {
        field: field.to_string(),
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = ReportConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.top_n, 5);
        assert_eq!(config.rolling_window_months, 3);
        assert_eq!(config.commission_rates.for_position(0), Some(0.06));
        assert_eq!(config.commission_rates.for_position(2), Some(0.0095));
        assert_eq!(config.commission_rates.for_position(3), None);
    }

    #[test]
    fn test_validation_rejects_out_of_range_values() {
        let config = ReportConfig {
            similarity_threshold: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ReportError::InvalidConfig { ref field, .. }) if field == "similarity_threshold"
        ));

        let config = ReportConfig {
            rolling_window_months: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let mut config = ReportConfig::default();
        config.commission_rates.co_owner_1 = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"output_dir": "reports", "top_n": 3, "grouping_strategy": "connected_components"}}"#
        )
        .unwrap();

        let config = ReportConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.output_dir, PathBuf::from("reports"));
        assert_eq!(config.top_n, 3);
        assert_eq!(config.grouping_strategy, GroupingStrategy::ConnectedComponents);
        assert_eq!(config.similarity_threshold, 0.7);
        assert_eq!(config.duplicates.top_performers, DuplicatePolicy::KeepFirst);
    }

    #[test]
    fn test_missing_config_file() {
        let err = ReportConfig::from_json_file("/nonexistent/report_config.json").unwrap_err();
        assert!(matches!(err, ReportError::FileNotFound(_)));
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = ReportConfig::schema_as_json().unwrap();
        assert!(schema_json.contains("similarity_threshold"));
        assert!(schema_json.contains("commission_rates"));
        assert!(schema_json.contains("connected_components"));
    }
}
