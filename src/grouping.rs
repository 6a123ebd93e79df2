//! Fuzzy grouping of near-duplicate companies.
//!
//! Each normalized name becomes a binary token-presence vector over the corpus
//! vocabulary; rows are compared pairwise by Jaccard similarity. Building the
//! matrix and assigning groups are separate pure steps, so a different
//! assignment strategy can run over the same matrix.
//!
//! Both the matrix and the default assignment are O(n²) in the number of rows.
//! That is fine for a few thousand orders; beyond that, candidate pairs should
//! come from a blocking or sparse index instead of the full matrix.

use crate::config::GroupingStrategy;
use crate::normalize::normalize_company_name;
use crate::schema::{CompanySalesowners, Order};
use crate::utils::join_salesowners;
use log::{debug, info};
use std::collections::{BTreeMap, BTreeSet};

/// Tokens shorter than this do not enter the vocabulary.
const MIN_TOKEN_CHARS: usize = 2;

/// One row taking part in company grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct CompanyRow {
    pub company_id: String,
    pub normalized_name: String,
    pub salesowners: Vec<String>,
}

impl CompanyRow {
    pub fn from_order(order: &Order) -> Self {
        Self {
            company_id: order.company_id.clone().unwrap_or_default(),
            normalized_name: normalize_company_name(order.company_name.as_deref()),
            salesowners: order.salesowners.clone(),
        }
    }
}

/// Binary token presence per row, stored as sorted vocabulary indices.
#[derive(Debug, Clone)]
pub struct TokenVectors {
    pub vocabulary: Vec<String>,
    pub rows: Vec<Vec<usize>>,
}

impl TokenVectors {
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let token_sets: Vec<BTreeSet<&str>> = names
            .iter()
            .map(|name| {
                name.as_ref()
                    .split_whitespace()
                    .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
                    .collect()
            })
            .collect();

        let vocabulary: Vec<String> = token_sets
            .iter()
            .flatten()
            .copied()
            .collect::<BTreeSet<&str>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        let rows: Vec<Vec<usize>> = token_sets
            .iter()
            .map(|set| {
                set.iter()
                    .filter_map(|token| {
                        vocabulary
                            .binary_search_by(|v| v.as_str().cmp(*token))
                            .ok()
                    })
                    .collect()
            })
            .collect();

        Self { vocabulary, rows }
    }
}

/// Jaccard similarity of two sorted index sets. Two empty sets are identical.
pub fn jaccard_similarity(a: &[usize], b: &[usize]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }

    let (mut i, mut j, mut intersection) = (0, 0, 0usize);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                intersection += 1;
                i += 1;
                j += 1;
            }
        }
    }

    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

/// Symmetric n×n matrix of pairwise similarities with a unit diagonal.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    size: usize,
    values: Vec<f64>,
}

impl SimilarityMatrix {
    pub fn from_vectors(vectors: &TokenVectors) -> Self {
        let size = vectors.rows.len();
        let mut values = vec![0.0; size * size];

        for i in 0..size {
            values[i * size + i] = 1.0;
            for j in (i + 1)..size {
                let similarity = jaccard_similarity(&vectors.rows[i], &vectors.rows[j]);
                values[i * size + j] = similarity;
                values[j * size + i] = similarity;
            }
        }

        Self { size, values }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i * self.size + j]
    }
}

pub fn jaccard_similarity_matrix<S: AsRef<str>>(names: &[S]) -> SimilarityMatrix {
    SimilarityMatrix::from_vectors(&TokenVectors::from_names(names))
}

/// Group id (1-based, in first-seen order) for every row of the matrix.
pub fn assign_similarity_groups(
    matrix: &SimilarityMatrix,
    threshold: f64,
    strategy: GroupingStrategy,
) -> Vec<usize> {
    if matrix.is_empty() {
        debug!("No rows to group");
        return Vec::new();
    }

    let groups = match strategy {
        GroupingStrategy::FirstMatch => first_match_groups(matrix, threshold),
        GroupingStrategy::ConnectedComponents => connected_component_groups(matrix, threshold),
    };

    let distinct = groups.iter().collect::<BTreeSet<_>>().len();
    info!(
        "Similarity groups assigned: {} rows in {} groups ({:?})",
        groups.len(),
        distinct,
        strategy
    );
    groups
}

fn first_match_groups(matrix: &SimilarityMatrix, threshold: f64) -> Vec<usize> {
    let n = matrix.len();
    let mut groups: Vec<Option<usize>> = vec![None; n];
    let mut next_group = 0;

    for i in 0..n {
        let group = match groups[i] {
            Some(g) => g,
            None => {
                next_group += 1;
                groups[i] = Some(next_group);
                next_group
            }
        };

        for j in (i + 1)..n {
            if groups[j].is_none() && matrix.get(i, j) >= threshold {
                groups[j] = Some(group);
            }
        }
    }

    groups.into_iter().map(|g| g.unwrap_or(0)).collect()
}

fn connected_component_groups(matrix: &SimilarityMatrix, threshold: f64) -> Vec<usize> {
    let n = matrix.len();
    let mut parent: Vec<usize> = (0..n).collect();

    fn find(parent: &mut [usize], mut x: usize) -> usize {
        while parent[x] != x {
            parent[x] = parent[parent[x]];
            x = parent[x];
        }
        x
    }

    for i in 0..n {
        for j in (i + 1)..n {
            if matrix.get(i, j) >= threshold {
                let (ri, rj) = (find(&mut parent, i), find(&mut parent, j));
                if ri != rj {
                    // The lower index stays the root so ids follow first appearance.
                    parent[ri.max(rj)] = ri.min(rj);
                }
            }
        }
    }

    let mut ids: BTreeMap<usize, usize> = BTreeMap::new();
    (0..n)
        .map(|i| {
            let root = find(&mut parent, i);
            let next = ids.len() + 1;
            *ids.entry(root).or_insert(next)
        })
        .collect()
}

/// Collapses grouped rows into one record per group: the first company id and
/// name seen, and the sorted union of every salesowner in the group.
pub fn consolidate(rows: &[CompanyRow], groups: &[usize]) -> Vec<CompanySalesowners> {
    struct GroupAccumulator<'a> {
        company_id: &'a str,
        company_name: &'a str,
        salesowners: BTreeSet<&'a str>,
    }

    let mut by_group: BTreeMap<usize, GroupAccumulator> = BTreeMap::new();

    for (row, &group) in rows.iter().zip(groups) {
        let entry = by_group.entry(group).or_insert_with(|| GroupAccumulator {
            company_id: &row.company_id,
            company_name: &row.normalized_name,
            salesowners: BTreeSet::new(),
        });
        entry
            .salesowners
            .extend(row.salesowners.iter().map(String::as_str));
    }

    by_group
        .into_values()
        .map(|acc| {
            let owners: Vec<String> = acc.salesowners.into_iter().map(str::to_string).collect();
            CompanySalesowners {
                company_id: acc.company_id.to_string(),
                company_name: acc.company_name.to_string(),
                list_salesowners: join_salesowners(&owners),
            }
        })
        .collect()
}

/// Normalizes, groups and consolidates the company rows of an order table.
pub fn company_salesowners<'a, I>(
    orders: I,
    threshold: f64,
    strategy: GroupingStrategy,
) -> Vec<CompanySalesowners>
where
    I: IntoIterator<Item = &'a Order>,
{
    let rows: Vec<CompanyRow> = orders.into_iter().map(CompanyRow::from_order).collect();
    let names: Vec<&str> = rows.iter().map(|r| r.normalized_name.as_str()).collect();

    let matrix = jaccard_similarity_matrix(&names);
    debug!("Computed {}x{} similarity matrix", matrix.len(), matrix.len());

    let groups = assign_similarity_groups(&matrix, threshold, strategy);
    let consolidated = consolidate(&rows, &groups);
    info!(
        "Salesowners consolidated into {} companies",
        consolidated.len()
    );
    consolidated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(company_id: &str, name: &str, owners: &[&str]) -> Order {
        Order {
            company_id: Some(company_id.to_string()),
            company_name: Some(name.to_string()),
            salesowners: owners.iter().map(|o| o.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_token_vectors_skip_single_characters() {
        let vectors = TokenVectors::from_names(&["fresh fruit", "a fruit"]);
        assert_eq!(vectors.vocabulary, vec!["fresh", "fruit"]);
        assert_eq!(vectors.rows[0], vec![0, 1]);
        assert_eq!(vectors.rows[1], vec![1]);
    }

    #[test]
    fn test_jaccard_similarity() {
        assert_eq!(jaccard_similarity(&[0, 1], &[0, 1]), 1.0);
        assert_eq!(jaccard_similarity(&[0, 1], &[1]), 0.5);
        assert_eq!(jaccard_similarity(&[0], &[1]), 0.0);
        assert_eq!(jaccard_similarity(&[], &[]), 1.0);
        assert_eq!(jaccard_similarity(&[0], &[]), 0.0);
    }

    #[test]
    fn test_similarity_matrix_is_symmetric() {
        let matrix = jaccard_similarity_matrix(&["fresh fruit", "fruit", "veggie"]);
        assert_eq!(matrix.len(), 3);
        for i in 0..3 {
            assert_eq!(matrix.get(i, i), 1.0);
            for j in 0..3 {
                assert_eq!(matrix.get(i, j), matrix.get(j, i));
            }
        }
        assert_eq!(matrix.get(0, 1), 0.5);
        assert_eq!(matrix.get(0, 2), 0.0);
    }

    #[test]
    fn test_first_match_grouping() {
        let names = ["fruit tropical", "fruit tropical", "fruit tropical", "fresh fruit"];
        let matrix = jaccard_similarity_matrix(&names);
        let groups = assign_similarity_groups(&matrix, 0.7, GroupingStrategy::FirstMatch);
        assert_eq!(groups, vec![1, 1, 1, 2]);
    }

    #[test]
    fn test_first_match_never_reassigns() {
        // Row 0 ~ row 2 and row 1 ~ row 2, but row 0 and row 1 are unrelated.
        let matrix = SimilarityMatrix {
            size: 3,
            values: vec![1.0, 0.0, 0.8, 0.0, 1.0, 0.8, 0.8, 0.8, 1.0],
        };

        let first = assign_similarity_groups(&matrix, 0.7, GroupingStrategy::FirstMatch);
        assert_eq!(first, vec![1, 2, 1]);

        let connected =
            assign_similarity_groups(&matrix, 0.7, GroupingStrategy::ConnectedComponents);
        assert_eq!(connected, vec![1, 1, 1]);
    }

    #[test]
    fn test_pairs_above_threshold_share_a_group() {
        let names = [
            "fresh fruit",
            "healthy snack",
            "fresh fruit",
            "veggie",
            "healthy snack",
            "fresh fruit market",
        ];
        let matrix = jaccard_similarity_matrix(&names);

        for strategy in [GroupingStrategy::FirstMatch, GroupingStrategy::ConnectedComponents] {
            let groups = assign_similarity_groups(&matrix, 0.7, strategy);
            for i in 0..names.len() {
                for j in 0..names.len() {
                    if matrix.get(i, j) >= 0.7 {
                        assert_eq!(groups[i], groups[j], "{:?}: rows {} and {}", strategy, i, j);
                    } else {
                        assert_ne!(groups[i], groups[j], "{:?}: rows {} and {}", strategy, i, j);
                    }
                }
            }
        }
    }

    #[test]
    fn test_group_ids_follow_first_appearance() {
        let names = ["veggie", "fresh fruit", "veggie", "fresh fruit"];
        let matrix = jaccard_similarity_matrix(&names);
        for strategy in [GroupingStrategy::FirstMatch, GroupingStrategy::ConnectedComponents] {
            assert_eq!(
                assign_similarity_groups(&matrix, 0.7, strategy),
                vec![1, 2, 1, 2]
            );
        }
    }

    #[test]
    fn test_empty_input_has_no_groups() {
        let matrix = jaccard_similarity_matrix::<&str>(&[]);
        assert!(matrix.is_empty());
        for strategy in [GroupingStrategy::FirstMatch, GroupingStrategy::ConnectedComponents] {
            assert!(assign_similarity_groups(&matrix, 0.7, strategy).is_empty());
        }
        assert!(company_salesowners(&Vec::<Order>::new(), 0.7, GroupingStrategy::FirstMatch).is_empty());
    }

    #[test]
    fn test_consolidate_salesowners() {
        let orders = vec![
            order("1", "Fresh Fruits Co", &["Alice Smith", "Bob Brown"]),
            order("2", "Veggies Inc", &["Charlie Green"]),
            order("1", "Fresh Fruits Ltd", &["Alice Smith"]),
            order("3", "Healthy Snacks Ltd", &["Dave White"]),
        ];

        let companies = company_salesowners(&orders, 0.7, GroupingStrategy::FirstMatch);
        assert_eq!(companies.len(), 3);
        assert_eq!(companies[0].company_id, "1");
        assert_eq!(companies[0].company_name, "fresh fruit");
        assert_eq!(companies[0].list_salesowners, "Alice Smith, Bob Brown");
        assert_eq!(companies[1].company_name, "veggie");
        assert_eq!(companies[2].list_salesowners, "Dave White");
    }

    #[test]
    fn test_variant_spellings_collapse_company_ids() {
        let orders = vec![
            order("1", "Tropical Fruits Co", &["Alice Smith"]),
            order("2", "Tropical Fruits Ltd", &["Bob Brown"]),
            order("3", "Tropical Fruits", &["Alice Smith", "Dave White"]),
            order("4", "Fresh Fruits", &["Charlie Green"]),
            order("1", "Tropical Fruits Co", &["Bob Brown"]),
        ];

        let companies = company_salesowners(&orders, 0.7, GroupingStrategy::FirstMatch);
        assert_eq!(companies.len(), 2);
        assert_eq!(companies[0].company_id, "1");
        assert_eq!(
            companies[0].list_salesowners,
            "Alice Smith, Bob Brown, Dave White"
        );
        assert_eq!(companies[1].company_id, "4");
    }
}
