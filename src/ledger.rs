//! Joins the order ledger with the invoicing feed and applies the per-report
//! duplicate policy.

use crate::config::DuplicatePolicy;
use crate::schema::{Invoice, Order};
use log::warn;
use std::collections::{HashMap, HashSet};

/// Invoices keyed by order id. When the feed carries more than one invoice for
/// an order, the first one is used.
pub struct InvoiceIndex<'a> {
    by_order: HashMap<&'a str, &'a Invoice>,
}

impl<'a> InvoiceIndex<'a> {
    pub fn new(invoices: &'a [Invoice]) -> Self {
        let mut by_order = HashMap::with_capacity(invoices.len());
        let mut repeated = 0usize;

        for invoice in invoices {
            if by_order.contains_key(invoice.order_id.as_str()) {
                repeated += 1;
                continue;
            }
            by_order.insert(invoice.order_id.as_str(), invoice);
        }

        if repeated > 0 {
            warn!(
                "{} invoices repeat an orderId already present; only the first is used",
                repeated
            );
        }

        Self { by_order }
    }

    pub fn get(&self, order_id: &str) -> Option<&'a Invoice> {
        self.by_order.get(order_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_order.is_empty()
    }
}

/// An order with the invoice it joined to, if any.
#[derive(Debug, Clone, Copy)]
pub struct MergedOrder<'a> {
    pub order: &'a Order,
    pub invoice: Option<&'a Invoice>,
}

impl<'a> MergedOrder<'a> {
    pub fn is_invoiced(&self) -> bool {
        self.invoice.is_some()
    }

    pub fn net_invoiced_value_euros(&self) -> Option<f64> {
        self.invoice.map(Invoice::net_invoiced_value_euros)
    }

    /// Gross value in cents, 0 when the order has no invoice.
    pub fn gross_value(&self) -> f64 {
        self.invoice.map(|i| i.gross_value).unwrap_or(0.0)
    }

    pub fn vat(&self) -> f64 {
        self.invoice.map(|i| i.vat).unwrap_or(0.0)
    }
}

/// Left join of orders onto invoices by order id. Output order follows the
/// input order.
pub fn merge_orders<'a, I>(orders: I, invoices: &InvoiceIndex<'a>) -> Vec<MergedOrder<'a>>
where
    I: IntoIterator<Item = &'a Order>,
{
    if invoices.is_empty() {
        warn!("No invoices to join; every order is left without an invoice");
    }

    orders
        .into_iter()
        .map(|order| MergedOrder {
            order,
            invoice: invoices.get(&order.order_id),
        })
        .collect()
}

/// Number of rows whose order id already appeared earlier in the table.
pub fn count_duplicate_order_ids(orders: &[Order]) -> usize {
    let mut seen = HashSet::new();
    orders
        .iter()
        .filter(|o| !seen.insert(o.order_id.as_str()))
        .count()
}

/// Applies a report's duplicate policy. Duplicates are always reported; with
/// [`DuplicatePolicy::KeepFirst`] only the first row per order id survives.
pub fn apply_duplicate_policy<'a>(
    orders: &'a [Order],
    policy: DuplicatePolicy,
    report: &str,
) -> Vec<&'a Order> {
    let duplicates = count_duplicate_order_ids(orders);

    match policy {
        DuplicatePolicy::KeepAll => {
            if duplicates > 0 {
                warn!(
                    "{}: {} duplicate order_id entries detected and kept. Verify for potential duplicate orders.",
                    report, duplicates
                );
            }
            orders.iter().collect()
        }
        DuplicatePolicy::KeepFirst => {
            if duplicates > 0 {
                warn!(
                    "{}: dropping {} rows with a repeated order_id (first occurrence kept)",
                    report, duplicates
                );
            }
            let mut seen = HashSet::new();
            orders
                .iter()
                .filter(|o| seen.insert(o.order_id.as_str()))
                .collect()
        }
    }
}
