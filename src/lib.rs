//! # Crate Sales Reports
//!
//! A library for turning a crate-sales order ledger and its invoicing feed into
//! a set of business reports.
//!
//! ## Core Concepts
//!
//! - **Order ledger**: `;`-separated rows with company, crate type, order date,
//!   up to three salesowners and a free-text contact blob
//! - **Invoicing feed**: JSON document of gross values (in cents) and VAT rates per order
//! - **Commissions**: tiered share of each order's net invoiced value per salesowner
//! - **Performance**: even split of gross value across salesowners, summed per month
//!   with a trailing window and ranked
//! - **Company consolidation**: fuzzy grouping of variant company names with their
//!   salesowners merged
//! - **Contact repair**: best-effort recovery of names and addresses from malformed
//!   contact data
//!
//! Every report is computed and staged before any file in the output directory
//! is touched, so a failing run leaves the output directory as it was. A report
//! that comes out empty removes the file an earlier run left behind.
//!
//! ## Example
//!
//! ```rust,ignore
//! use crate_sales_reports::*;
//!
//! let config = ReportConfig {
//!     orders_path: "data/orders.csv".into(),
//!     invoices_path: "data/invoicing_data.json".into(),
//!     output_dir: "output".into(),
//!     ..Default::default()
//! };
//!
//! let reports = SalesReportProcessor::process(&config).unwrap();
//! println!("{} salesowners earned commission", reports.commissions.len());
//!
//! for outcome in reports.write_all(&config.output_dir).unwrap() {
//!     println!("{:?}", outcome);
//! }
//! ```

pub mod commission;
pub mod config;
pub mod contact;
pub mod distribution;
pub mod error;
pub mod grouping;
pub mod ingestion;
pub mod ledger;
pub mod normalize;
pub mod performance;
pub mod report;
pub mod schema;
pub mod utils;

pub use commission::{calculate_commissions, CommissionAllocator, CommissionLedger};
pub use config::*;
pub use contact::{
    contact_addresses, contact_full_names, extract_address, extract_full_name,
    repair_contact_data, DEFAULT_CITY, DEFAULT_FULL_NAME, DEFAULT_POSTAL_CODE,
};
pub use distribution::{calculate_crate_distribution, calculate_crate_type_share};
pub use error::{ReportError, Result};
pub use grouping::{
    assign_similarity_groups, company_salesowners, consolidate, jaccard_similarity_matrix,
    SimilarityMatrix,
};
pub use ingestion::*;
pub use normalize::normalize_company_name;
pub use performance::{calculate_sales_performance, calculate_top_performers};
pub use report::{read_report, save_report, ReportBatch, SaveOutcome};
pub use schema::*;

use ledger::apply_duplicate_policy;
use log::{debug, info};
use std::path::Path;

const COMMISSION_COLUMNS: [&str; 2] = ["order_id", "salesowners"];
const DISTRIBUTION_COLUMNS: [&str; 3] = ["order_id", "company_id", "crate_type"];
const PERFORMANCE_COLUMNS: [&str; 4] = ["order_id", "crate_type", "date", "salesowners"];
const COMPANY_COLUMNS: [&str; 3] = ["company_id", "company_name", "salesowners"];
const CONTACT_COLUMNS: [&str; 2] = ["order_id", "contact_data"];

/// Every report of one run, held in memory until written.
#[derive(Debug, Clone, Default)]
pub struct SalesReports {
    pub commissions: Vec<CommissionEntry>,
    pub crate_distribution: Vec<CrateDistributionEntry>,
    pub crate_type_share: Vec<CrateTypeShare>,
    pub sales_performance: Vec<SalesPerformanceEntry>,
    pub top_performers: Vec<TopPerformerEntry>,
    pub company_salesowners: Vec<CompanySalesowners>,
    pub contact_full_names: Vec<ContactFullName>,
    pub contact_addresses: Vec<ContactAddress>,
}

impl SalesReports {
    /// Writes every report into `output_dir` under its fixed file name.
    ///
    /// The reports are staged next to their targets first. If any of them
    /// cannot be written, or a target is not a regular file, `output_dir` is
    /// left as it was.
    pub fn write_all(&self, output_dir: impl AsRef<Path>) -> Result<Vec<SaveOutcome>> {
        let dir = output_dir.as_ref();

        let mut batch = ReportBatch::new(dir)?;
        batch.stage(&self.commissions, report::COMMISSIONS_FILE)?;
        batch.stage(&self.crate_distribution, report::CRATE_DISTRIBUTION_FILE)?;
        batch.stage(&self.crate_type_share, report::CRATE_TYPE_SHARE_FILE)?;
        batch.stage(&self.sales_performance, report::SALES_PERFORMANCE_FILE)?;
        batch.stage(&self.top_performers, report::TOP_PERFORMERS_FILE)?;
        batch.stage(&self.company_salesowners, report::COMPANY_SALESOWNERS_FILE)?;
        batch.stage(&self.contact_full_names, report::CONTACT_FULL_NAME_FILE)?;
        batch.stage(&self.contact_addresses, report::CONTACT_ADDRESS_FILE)?;
        let outcomes = batch.commit()?;

        let written = outcomes.iter().filter(|o| o.is_written()).count();
        info!(
            "Wrote {} of {} reports to {}",
            written,
            outcomes.len(),
            dir.display()
        );
        Ok(outcomes)
    }
}

pub struct SalesReportProcessor;

impl SalesReportProcessor {
    /// Loads both inputs named by `config` and computes every report.
    pub fn process(config: &ReportConfig) -> Result<SalesReports> {
        config.validate()?;

        info!(
            "Processing sales reports from {} and {}",
            config.orders_path.display(),
            config.invoices_path.display()
        );

        let orders = load_orders_with_delimiter(&config.orders_path, config.orders_delimiter as u8)?;
        if orders.is_empty() {
            return Err(ReportError::EmptyTable("orders".to_string()));
        }

        let invoices = load_invoices(&config.invoices_path)?;
        if invoices.is_empty() {
            return Err(ReportError::EmptyTable("invoices".to_string()));
        }

        Self::process_tables(&orders, &invoices, config)
    }

    /// Computes every report from tables already in memory.
    pub fn process_tables(
        orders: &OrderTable,
        invoices: &[Invoice],
        config: &ReportConfig,
    ) -> Result<SalesReports> {
        config.validate()?;
        debug!(
            "Computing reports over {} orders and {} invoices",
            orders.len(),
            invoices.len()
        );

        let rows = &orders.rows;
        let policies = &config.duplicates;

        orders.require_columns(&COMMISSION_COLUMNS)?;
        let commissions = calculate_commissions(
            apply_duplicate_policy(rows, policies.commissions, "commissions"),
            invoices,
            &config.commission_rates,
        );

        orders.require_columns(&DISTRIBUTION_COLUMNS)?;
        let distribution_rows =
            apply_duplicate_policy(rows, policies.crate_distribution, "crate_distribution");
        let crate_distribution = calculate_crate_distribution(distribution_rows.iter().copied());
        let crate_type_share = calculate_crate_type_share(distribution_rows);

        orders.require_columns(&PERFORMANCE_COLUMNS)?;
        let sales_performance = calculate_sales_performance(rows, invoices, config);
        let top_performers = calculate_top_performers(rows, invoices, config);

        orders.require_columns(&COMPANY_COLUMNS)?;
        let company_salesowners = company_salesowners(
            apply_duplicate_policy(rows, policies.company_salesowners, "company_salesowners"),
            config.similarity_threshold,
            config.grouping_strategy,
        );

        orders.require_columns(&CONTACT_COLUMNS)?;
        let contact_rows = apply_duplicate_policy(rows, policies.contacts, "contacts");
        let contact_full_names = contact_full_names(contact_rows.iter().copied());
        let contact_addresses = contact_addresses(contact_rows);

        info!("All reports computed");
        Ok(SalesReports {
            commissions,
            crate_distribution,
            crate_type_share,
            sales_performance,
            top_performers,
            company_salesowners,
            contact_full_names,
            contact_addresses,
        })
    }
}

/// Computes every report and writes it to `config.output_dir`.
pub fn generate_reports(config: &ReportConfig) -> Result<Vec<SaveOutcome>> {
    let reports = SalesReportProcessor::process(config)?;
    reports.write_all(&config.output_dir)
}
