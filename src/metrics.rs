//! Binary classification metrics.

use crate::error::{PcrError, Result};
use crate::Vector;
use ndarray::Array2;
use std::cmp::Ordering;
use std::fmt;

fn check_lengths(y_true: &Vector, y_pred: &Vector) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(PcrError::DimensionMismatch(
            "y_true and y_pred must have the same length".to_string(),
        ));
    }
    if y_true.is_empty() {
        return Err(PcrError::InvalidInput("metrics need at least one sample".to_string()));
    }
    Ok(())
}

pub fn accuracy_score(y_true: &Vector, y_pred: &Vector) -> Result<f64> {
    check_lengths(y_true, y_pred)?;

    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(actual, pred)| actual == pred)
        .count();
    Ok(correct as f64 / y_true.len() as f64)
}

/// 2 × 2 counts, rows are the true class and columns the predicted class.
pub fn confusion_matrix(y_true: &Vector, y_pred: &Vector) -> Result<Array2<usize>> {
    check_lengths(y_true, y_pred)?;

    let mut matrix = Array2::zeros((2, 2));
    for (&actual, &pred) in y_true.iter().zip(y_pred.iter()) {
        matrix[(class_index(actual)?, class_index(pred)?)] += 1;
    }
    Ok(matrix)
}

fn class_index(label: f64) -> Result<usize> {
    if label == 0.0 {
        Ok(0)
    } else if label == 1.0 {
        Ok(1)
    } else {
        Err(PcrError::NonBinaryLabels(label.to_string()))
    }
}

/// Precision, recall, F1 and support of one class.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

fn class_scores(matrix: &Array2<usize>, class: usize) -> ClassScores {
    let other = 1 - class;
    let tp = matrix[(class, class)] as f64;
    let fp = matrix[(other, class)] as f64;
    let fn_ = matrix[(class, other)] as f64;

    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    ClassScores {
        precision,
        recall,
        f1: ratio(2.0 * precision * recall, precision + recall),
        support: matrix[(class, class)] + matrix[(class, other)],
    }
}

/// Zero when the denominator is zero.
fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 { numerator / denominator } else { 0.0 }
}

pub fn precision_score(y_true: &Vector, y_pred: &Vector) -> Result<f64> {
    Ok(class_scores(&confusion_matrix(y_true, y_pred)?, 1).precision)
}

pub fn recall_score(y_true: &Vector, y_pred: &Vector) -> Result<f64> {
    Ok(class_scores(&confusion_matrix(y_true, y_pred)?, 1).recall)
}

pub fn f1_score(y_true: &Vector, y_pred: &Vector) -> Result<f64> {
    Ok(class_scores(&confusion_matrix(y_true, y_pred)?, 1).f1)
}

/// Per-class and averaged scores, printed as a fixed-width text table.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationReport {
    pub classes: [ClassScores; 2],
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

pub fn classification_report(y_true: &Vector, y_pred: &Vector) -> Result<ClassificationReport> {
    let matrix = confusion_matrix(y_true, y_pred)?;
    let classes = [class_scores(&matrix, 0), class_scores(&matrix, 1)];
    let total = y_true.len();

    let average = |weight: &dyn Fn(&ClassScores) -> f64| {
        let weights: f64 = classes.iter().map(weight).sum();
        let mean = |metric: fn(&ClassScores) -> f64| {
            ratio(classes.iter().map(|c| weight(c) * metric(c)).sum(), weights)
        };
        ClassScores {
            precision: mean(|c: &ClassScores| c.precision),
            recall: mean(|c: &ClassScores| c.recall),
            f1: mean(|c: &ClassScores| c.f1),
            support: total,
        }
    };

    Ok(ClassificationReport {
        classes,
        accuracy: (matrix[(0, 0)] + matrix[(1, 1)]) as f64 / total as f64,
        macro_avg: average(&|_: &ClassScores| 1.0),
        weighted_avg: average(&|c: &ClassScores| c.support as f64),
    })
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = "weighted avg".len();
        let row = |f: &mut fmt::Formatter<'_>, name: &str, s: &ClassScores| {
            writeln!(
                f,
                "{:>width$}  {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, s.precision, s.recall, s.f1, s.support
            )
        };

        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        row(f, "0", &self.classes[0])?;
        row(f, "1", &self.classes[1])?;
        writeln!(f)?;
        writeln!(
            f,
            "{:>width$}  {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, "weighted avg", &self.weighted_avg)
    }
}

/// Renders a count matrix in the bracketed, right-aligned style of a
/// printed numeric array: `[[48  2]\n [ 1 49]]`.
pub fn format_confusion_matrix(matrix: &Array2<usize>) -> String {
    let width = matrix.iter().map(|v| v.to_string().len()).max().unwrap_or(1);
    let rows: Vec<String> = matrix
        .rows()
        .into_iter()
        .map(|row| {
            let cells: Vec<String> = row.iter().map(|v| format!("{:>width$}", v)).collect();
            format!("[{}]", cells.join(" "))
        })
        .collect();
    format!("[{}]", rows.join("\n "))
}

/// Area under the ROC curve via the rank-sum statistic; tied scores share
/// their average rank.
pub fn roc_auc_score(y_true: &Vector, y_score: &Vector) -> Result<f64> {
    check_lengths(y_true, y_score)?;
    for &label in y_true.iter() {
        class_index(label)?;
    }

    let n_pos = y_true.iter().filter(|&&v| v == 1.0).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Err(PcrError::InvalidInput(
            "ROC AUC is undefined when only one class is present in y_true".to_string(),
        ));
    }

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].partial_cmp(&y_score[b]).unwrap_or(Ordering::Equal));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && y_score[order[end]] == y_score[order[start]] {
            end += 1;
        }
        // Ranks are 1-based; the tie group spans ranks start+1 ..= end
        let average_rank = (start + 1 + end) as f64 / 2.0;
        let positives = order[start..end].iter().filter(|&&i| y_true[i] == 1.0).count();
        positive_rank_sum += average_rank * positives as f64;
        start = end;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Ok((positive_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}
