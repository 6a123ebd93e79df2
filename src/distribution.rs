use crate::schema::{CrateDistributionEntry, CrateType, CrateTypeShare, Order};
use crate::utils::round2;
use log::{info, warn};
use std::collections::BTreeMap;

/// Orders that can be placed in the distribution: a company id and a crate
/// type from the known set. Invalid crate types are reported and excluded.
pub fn valid_crate_orders<'a, I>(orders: I) -> Vec<(&'a str, CrateType)>
where
    I: IntoIterator<Item = &'a Order>,
{
    let mut missing = 0usize;
    let mut invalid = 0usize;
    let mut valid = Vec::new();

    for order in orders {
        let (Some(company_id), Some(raw_type)) = (order.company_id.as_deref(), order.crate_type.as_deref())
        else {
            missing += 1;
            continue;
        };

        match raw_type.parse::<CrateType>() {
            Ok(crate_type) => valid.push((company_id, crate_type)),
            Err(_) => invalid += 1,
        }
    }

    if missing > 0 {
        info!("Dropped {} orders without a company_id or crate_type", missing);
    }
    if invalid > 0 {
        warn!(
            "{} orders have an invalid crate type. Excluding these from analysis.",
            invalid
        );
    }
    valid
}

/// Order count per `(company_id, crate_type)`, sorted by company id and then
/// crate type.
pub fn calculate_crate_distribution<'a, I>(orders: I) -> Vec<CrateDistributionEntry>
where
    I: IntoIterator<Item = &'a Order>,
{
    let mut counts: BTreeMap<(&str, CrateType), usize> = BTreeMap::new();
    for key in valid_crate_orders(orders) {
        *counts.entry(key).or_insert(0) += 1;
    }

    let distribution: Vec<CrateDistributionEntry> = counts
        .into_iter()
        .map(|((company_id, crate_type), order_count)| CrateDistributionEntry {
            company_id: company_id.to_string(),
            crate_type: crate_type.to_string(),
            order_count,
        })
        .collect();

    info!(
        "Crate distribution calculated for {} company/crate type pairs",
        distribution.len()
    );
    distribution
}

/// Share of valid orders per crate type, most common first. Percentages are of
/// all valid orders and rounded to 2 decimals.
pub fn calculate_crate_type_share<'a, I>(orders: I) -> Vec<CrateTypeShare>
where
    I: IntoIterator<Item = &'a Order>,
{
    let mut counts: BTreeMap<CrateType, usize> = BTreeMap::new();
    for (_, crate_type) in valid_crate_orders(orders) {
        *counts.entry(crate_type).or_insert(0) += 1;
    }

    let total: usize = counts.values().sum();
    if total == 0 {
        warn!("No valid crate types; crate type share is empty");
        return Vec::new();
    }

    let mut shares: Vec<CrateTypeShare> = counts
        .into_iter()
        .map(|(crate_type, count)| CrateTypeShare {
            crate_type: crate_type.to_string(),
            count,
            percentage: round2(count as f64 / total as f64 * 100.0),
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count));
    shares
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: &str, company_id: Option<&str>, crate_type: &str) -> Order {
        Order {
            order_id: id.to_string(),
            company_id: company_id.map(str::to_string),
            crate_type: Some(crate_type.to_string()),
            ..Default::default()
        }
    }

    fn sample() -> Vec<Order> {
        vec![
            order("1", Some("c1"), "Plastic"),
            order("2", Some("c1"), "Wood"),
            order("3", Some("c2"), "Metal"),
            order("4", Some("c3"), "InvalidType"),
            order("5", None, "Plastic"),
        ]
    }

    #[test]
    fn test_invalid_rows_are_excluded() {
        let orders = sample();
        let valid = valid_crate_orders(&orders);
        assert_eq!(valid.len(), 3);
        assert!(valid.iter().all(|(company, _)| *company != "c3"));
    }

    #[test]
    fn test_distribution_counts() {
        let mut orders = sample();
        orders.push(order("6", Some("c1"), "Plastic"));

        let distribution = calculate_crate_distribution(&orders);
        assert_eq!(
            distribution,
            vec![
                CrateDistributionEntry {
                    company_id: "c1".to_string(),
                    crate_type: "Plastic".to_string(),
                    order_count: 2,
                },
                CrateDistributionEntry {
                    company_id: "c1".to_string(),
                    crate_type: "Wood".to_string(),
                    order_count: 1,
                },
                CrateDistributionEntry {
                    company_id: "c2".to_string(),
                    crate_type: "Metal".to_string(),
                    order_count: 1,
                },
            ]
        );
    }

    #[test]
    fn test_distribution_sums_to_valid_rows() {
        let mut orders = sample();
        for i in 0..20 {
            let crate_type = CrateType::ALL[i % 3].as_str();
            orders.push(order(&format!("x{}", i), Some(format!("c{}", i % 4).as_str()), crate_type));
        }

        let distribution = calculate_crate_distribution(&orders);
        let total: usize = distribution.iter().map(|d| d.order_count).sum();
        assert_eq!(total, valid_crate_orders(&orders).len());
        assert_eq!(total, 23);
    }

    #[test]
    fn test_crate_type_share() {
        let orders = vec![
            order("1", Some("c1"), "Plastic"),
            order("2", Some("c1"), "Plastic"),
            order("3", Some("c2"), "Wood"),
            order("4", Some("c2"), "Cardboard"),
        ];

        let shares = calculate_crate_type_share(&orders);
        assert_eq!(shares.len(), 2);
        assert_eq!(shares[0].crate_type, "Plastic");
        assert_eq!(shares[0].count, 2);
        assert!((shares[0].percentage - 66.67).abs() < 1e-9);
        assert!((shares[1].percentage - 33.33).abs() < 1e-9);
    }

    #[test]
    fn test_crate_type_share_empty() {
        assert!(calculate_crate_type_share(&Vec::<Order>::new()).is_empty());
    }
}
