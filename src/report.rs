//! Loadings tables and feature-influence rankings derived from a fitted PCA.

use crate::dataset::Table;
use crate::error::{PcrError, Result};
use crate::{Matrix, Vector};
use std::cmp::Ordering;

/// A feature (by column index) and the value it was ranked by.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RankedFeature {
    pub index: usize,
    pub value: f64,
}

/// `PC1`, `PC2`, ...
pub fn component_names(n_components: usize) -> Vec<String> {
    (1..=n_components).map(|i| format!("PC{}", i)).collect()
}

fn check_names(loadings: &Matrix, feature_names: &[String]) -> Result<()> {
    if loadings.nrows() != feature_names.len() {
        return Err(PcrError::DimensionMismatch(format!(
            "loadings have {} rows but {} feature names were given",
            loadings.nrows(),
            feature_names.len()
        )));
    }
    Ok(())
}

/// Sorts descending by value; equal values keep feature order.
fn rank_descending(mut ranked: Vec<RankedFeature>) -> Vec<RankedFeature> {
    ranked.sort_by(|a, b| b.value.partial_cmp(&a.value).unwrap_or(Ordering::Equal));
    ranked
}

/// Feature × component table of the raw loadings.
pub fn loadings_table(loadings: &Matrix, feature_names: &[String]) -> Result<Table> {
    check_names(loadings, feature_names)?;

    let mut table = Table::new("", component_names(loadings.ncols()));
    for (name, row) in feature_names.iter().zip(loadings.rows()) {
        table.push_row(name.clone(), row.iter().map(|v| v.to_string()).collect())?;
    }
    Ok(table)
}

/// For every component, the `top_n` features with the largest absolute
/// loading, largest first. The value is the absolute loading.
pub fn top_features_per_component(loadings: &Matrix, top_n: usize) -> Vec<Vec<RankedFeature>> {
    loadings
        .columns()
        .into_iter()
        .map(|column| {
            let ranked = column
                .iter()
                .enumerate()
                .map(|(index, v)| RankedFeature {
                    index,
                    value: v.abs(),
                })
                .collect();
            let mut ranked = rank_descending(ranked);
            ranked.truncate(top_n);
            ranked
        })
        .collect()
}

/// Combines the per-component top lists into one table. Rows are the union
/// of listed features in order of first appearance; a cell is empty when the
/// feature is not in that component's list.
pub fn top_features_table(top: &[Vec<RankedFeature>], feature_names: &[String]) -> Result<Table> {
    let mut order: Vec<usize> = Vec::new();
    for list in top {
        for feature in list {
            if feature.index >= feature_names.len() {
                return Err(PcrError::DimensionMismatch(format!(
                    "feature index {} out of range for {} names",
                    feature.index,
                    feature_names.len()
                )));
            }
            if !order.contains(&feature.index) {
                order.push(feature.index);
            }
        }
    }

    let mut table = Table::new("", component_names(top.len()));
    for index in order {
        let cells = top
            .iter()
            .map(|list| {
                list.iter()
                    .find(|f| f.index == index)
                    .map(|f| f.value.to_string())
                    .unwrap_or_default()
            })
            .collect();
        table.push_row(feature_names[index].clone(), cells)?;
    }
    Ok(table)
}

/// Per-feature influence: `sum_k |loading[f, k]| * ratio[k]`.
pub fn gene_influence(loadings: &Matrix, explained_variance_ratio: &Vector) -> Result<Vector> {
    if loadings.ncols() != explained_variance_ratio.len() {
        return Err(PcrError::DimensionMismatch(format!(
            "loadings have {} components but {} variance ratios were given",
            loadings.ncols(),
            explained_variance_ratio.len()
        )));
    }
    Ok(loadings.mapv(f64::abs).dot(explained_variance_ratio))
}

/// Influence values ranked from largest to smallest.
pub fn rank_gene_influence(influence: &Vector) -> Vec<RankedFeature> {
    rank_descending(
        influence
            .iter()
            .enumerate()
            .map(|(index, &value)| RankedFeature { index, value })
            .collect(),
    )
}

/// Single-column table of the `top_n` most influential features.
pub fn weighted_table(
    ranking: &[RankedFeature],
    feature_names: &[String],
    top_n: usize,
) -> Result<Table> {
    let mut table = Table::new("", vec!["WeightedContribution".to_string()]);
    for feature in ranking.iter().take(top_n) {
        let name = feature_names.get(feature.index).ok_or_else(|| {
            PcrError::DimensionMismatch(format!("feature index {} out of range", feature.index))
        })?;
        table.push_row(name.clone(), vec![feature.value.to_string()])?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use std::collections::HashSet;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("Gene_{}", i)).collect()
    }

    fn loadings() -> Matrix {
        array![
            [0.10, -0.70],
            [-0.60, 0.20],
            [0.50, 0.50],
            [-0.20, 0.10],
            [0.58, -0.45]
        ]
    }

    #[test]
    fn test_loadings_table_layout() {
        let table = loadings_table(&loadings(), &names(5)).unwrap();
        assert_eq!(table.index_name, "");
        assert_eq!(table.columns, vec!["PC1", "PC2"]);
        assert_eq!(table.index[1], "Gene_2");
        assert_eq!(table.rows[1], vec!["-0.6", "0.2"]);
        assert!(loadings_table(&loadings(), &names(4)).is_err());
    }

    #[test]
    fn test_top_features_sorted_without_duplicates() {
        let top = top_features_per_component(&loadings(), 3);
        assert_eq!(top.len(), 2);

        for list in &top {
            assert_eq!(list.len(), 3);
            for pair in list.windows(2) {
                assert!(pair[0].value >= pair[1].value);
            }
            let unique: HashSet<usize> = list.iter().map(|f| f.index).collect();
            assert_eq!(unique.len(), list.len());
        }

        let pc1: Vec<usize> = top[0].iter().map(|f| f.index).collect();
        assert_eq!(pc1, vec![1, 4, 2]);
        let pc2: Vec<usize> = top[1].iter().map(|f| f.index).collect();
        assert_eq!(pc2, vec![0, 2, 4]);
    }

    #[test]
    fn test_top_features_shorter_than_limit() {
        let top = top_features_per_component(&loadings(), 10);
        assert!(top.iter().all(|list| list.len() == 5));
    }

    #[test]
    fn test_top_features_table() {
        let top = top_features_per_component(&loadings(), 2);
        let table = top_features_table(&top, &names(5)).unwrap();

        assert_eq!(table.columns, vec!["PC1", "PC2"]);
        assert_eq!(table.index, vec!["Gene_2", "Gene_5", "Gene_1", "Gene_3"]);
        assert_eq!(table.rows[0], vec!["0.6".to_string(), String::new()]);
        assert_eq!(table.rows[2], vec![String::new(), "0.7".to_string()]);
    }

    #[test]
    fn test_gene_influence_is_weighted_sum() {
        let l = loadings();
        let ratio = array![0.6, 0.25];
        let influence = gene_influence(&l, &ratio).unwrap();

        for f in 0..l.nrows() {
            let expected: f64 = (0..l.ncols()).map(|k| l[(f, k)].abs() * ratio[k]).sum();
            assert_abs_diff_eq!(influence[f], expected, epsilon = 1e-15);
        }
        assert!(gene_influence(&l, &array![1.0]).is_err());
    }

    #[test]
    fn test_weighted_ranking_table() {
        let influence = array![0.1, 0.5, 0.3, 0.5];
        let ranking = rank_gene_influence(&influence);
        let order: Vec<usize> = ranking.iter().map(|f| f.index).collect();
        assert_eq!(order, vec![1, 3, 2, 0]);

        let table = weighted_table(&ranking, &names(4), 2).unwrap();
        assert_eq!(table.columns, vec!["WeightedContribution"]);
        assert_eq!(table.index, vec!["Gene_2", "Gene_4"]);
        assert_eq!(table.rows[0], vec!["0.5"]);
    }
}
