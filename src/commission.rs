use crate::config::CommissionRates;
use crate::ledger::{merge_orders, InvoiceIndex, MergedOrder};
use crate::schema::{CommissionEntry, Invoice, Order};
use crate::utils::round2;
use log::{debug, info};
use std::collections::HashMap;

/// Running commission totals per salesowner, in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct CommissionLedger {
    index: HashMap<String, usize>,
    totals: Vec<(String, f64)>,
}

impl CommissionLedger {
    /// Returns the ledger with `amount` added to `owner`.
    pub fn credit(mut self, owner: &str, amount: f64) -> Self {
        match self.index.get(owner) {
            Some(&slot) => self.totals[slot].1 += amount,
            None => {
                self.index.insert(owner.to_string(), self.totals.len());
                self.totals.push((owner.to_string(), amount));
            }
        }
        self
    }

    pub fn total_for(&self, owner: &str) -> Option<f64> {
        self.index.get(owner).map(|&slot| self.totals[slot].1)
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    /// Highest commission first; equal totals keep first-appearance order.
    /// Totals are rounded to cents after sorting.
    pub fn into_entries(self) -> Vec<CommissionEntry> {
        let mut totals = self.totals;
        totals.sort_by(|a, b| b.1.total_cmp(&a.1));

        totals
            .into_iter()
            .map(|(sales_owner, total)| CommissionEntry {
                sales_owner,
                total_commission: round2(total),
            })
            .collect()
    }
}

pub struct CommissionAllocator<'a> {
    rates: &'a CommissionRates,
}

impl<'a> CommissionAllocator<'a> {
    pub fn new(rates: &'a CommissionRates) -> Self {
        Self { rates }
    }

    /// Per-owner share of one order's net value. Owners past the third
    /// position earn nothing and are left out.
    pub fn allocate(&self, salesowners: &[String], net_value: f64) -> Vec<(String, f64)> {
        salesowners
            .iter()
            .enumerate()
            .filter_map(|(position, owner)| {
                self.rates
                    .for_position(position)
                    .map(|rate| (owner.clone(), net_value * rate))
            })
            .collect()
    }

    /// Folds every eligible order into a ledger. Orders without an invoice or
    /// with a non-positive net value are skipped.
    pub fn accumulate(&self, merged: &[MergedOrder]) -> CommissionLedger {
        let mut skipped = 0usize;

        let ledger = merged
            .iter()
            .filter_map(|row| match row.net_invoiced_value_euros() {
                Some(net) if net > 0.0 => Some((row.order, net)),
                _ => {
                    skipped += 1;
                    None
                }
            })
            .fold(CommissionLedger::default(), |ledger, (order, net)| {
                self.allocate(&order.salesowners, net)
                    .into_iter()
                    .fold(ledger, |ledger, (owner, amount)| ledger.credit(&owner, amount))
            });

        if skipped > 0 {
            debug!(
                "Skipped {} orders with no invoice or a non-positive net value",
                skipped
            );
        }
        ledger
    }

    pub fn calculate(&self, merged: &[MergedOrder]) -> Vec<CommissionEntry> {
        let entries = self.accumulate(merged).into_entries();
        info!("Commissions calculated for {} salesowners", entries.len());
        entries
    }
}

/// Joins orders to invoices and computes the commission table.
pub fn calculate_commissions<'a, I>(
    orders: I,
    invoices: &'a [Invoice],
    rates: &CommissionRates,
) -> Vec<CommissionEntry>
where
    I: IntoIterator<Item = &'a Order>,
{
    let index = InvoiceIndex::new(invoices);
    let merged = merge_orders(orders, &index);
    CommissionAllocator::new(rates).calculate(&merged)
}
