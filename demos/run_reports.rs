use anyhow::{Context, Result};
use crate_sales_reports::*;
use std::env;

fn main() -> Result<()> {
    let config = match env::args().nth(1) {
        Some(path) => ReportConfig::from_json_file(&path)
            .with_context(|| format!("loading report config from {}", path))?,
        None => ReportConfig::default(),
    };

    println!("📦 Crate Sales Reports");
    println!("  orders:   {}", config.orders_path.display());
    println!("  invoices: {}", config.invoices_path.display());
    println!("  output:   {}\n", config.output_dir.display());

    let reports = SalesReportProcessor::process(&config).context("computing reports")?;

    println!("💶 Top commissions:");
    for entry in reports.commissions.iter().take(5) {
        println!("  {:<25} {:>10.2} €", entry.sales_owner, entry.total_commission);
    }

    println!("\n📊 Crate type share:");
    for share in &reports.crate_type_share {
        println!(
            "  {:<8} {:>5} orders ({:.2}%)",
            share.crate_type, share.count, share.percentage
        );
    }

    if let Some(latest) = reports.top_performers.last() {
        println!("\n🏆 Top performers for {}:", latest.year_month);
        for entry in reports
            .top_performers
            .iter()
            .filter(|t| t.year_month == latest.year_month)
        {
            println!(
                "  #{} {:<25} {:>12.2}",
                entry.rank, entry.salesowners, entry.gross_rolling_3m
            );
        }
    }

    println!("\n💾 Writing reports...");
    for outcome in reports.write_all(&config.output_dir)? {
        match outcome {
            SaveOutcome::Written { path, rows } => {
                println!("  ✓ {} ({} rows)", path.display(), rows)
            }
            SaveOutcome::Skipped { path } => println!("  - {} (empty, skipped)", path.display()),
        }
    }

    Ok(())
}
