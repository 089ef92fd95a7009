//! Stratified cross-validation and the PCR hyperparameter grid search.

use crate::decomposition::PCA;
use crate::error::{PcrError, Result};
use crate::linear_model::LogisticRegression;
use crate::metrics::accuracy_score;
use crate::pipeline::{PcrParams, PcrPipeline};
use crate::preprocessing::StandardScaler;
use crate::{Matrix, Vector};
use log::{debug, info, warn};
use ndarray::{s, Axis};

/// K-fold splitter that keeps class proportions roughly equal across folds.
///
/// No shuffling: samples of each class are dealt to folds in their original
/// order, fold sizes per class coming from a round-robin over the sorted
/// class codes. Classes are coded by first appearance in `y`.
#[derive(Clone, Debug)]
pub struct StratifiedKFold {
    n_splits: usize,
}

impl StratifiedKFold {
    pub fn new(n_splits: usize) -> Self {
        Self { n_splits }
    }

    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Returns `(train, test)` index sets, one pair per fold.
    pub fn split(&self, y: &Vector) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
        let n_samples = y.len();
        if self.n_splits < 2 {
            return Err(PcrError::InvalidInput(format!(
                "n_splits must be at least 2, got {}",
                self.n_splits
            )));
        }
        if self.n_splits > n_samples {
            return Err(PcrError::InvalidInput(format!(
                "Cannot have n_splits={} greater than the number of samples={}",
                self.n_splits, n_samples
            )));
        }

        // Classes are numbered in order of first appearance
        let mut classes: Vec<f64> = Vec::new();
        let encoded: Vec<usize> = y
            .iter()
            .map(|&v| match classes.iter().position(|&c| c == v) {
                Some(k) => k,
                None => {
                    classes.push(v);
                    classes.len() - 1
                }
            })
            .collect();

        let mut class_counts = vec![0usize; classes.len()];
        for &k in &encoded {
            class_counts[k] += 1;
        }
        let smallest = class_counts.iter().copied().min().unwrap_or(0);
        if smallest < self.n_splits {
            warn!(
                "The least populated class has only {} members, which is less than n_splits={}",
                smallest, self.n_splits
            );
        }

        // allocation[fold][class]: class counts of every n_splits-th sorted label
        let mut sorted = encoded.clone();
        sorted.sort_unstable();
        let mut allocation = vec![vec![0usize; classes.len()]; self.n_splits];
        for (i, &k) in sorted.iter().enumerate() {
            allocation[i % self.n_splits][k] += 1;
        }

        let mut test_fold = vec![0usize; n_samples];
        for k in 0..classes.len() {
            let folds_for_class = (0..self.n_splits)
                .flat_map(|fold| std::iter::repeat(fold).take(allocation[fold][k]));
            let members = (0..n_samples).filter(|&i| encoded[i] == k);
            for (i, fold) in members.zip(folds_for_class) {
                test_fold[i] = fold;
            }
        }

        Ok((0..self.n_splits)
            .map(|fold| {
                let (test, train): (Vec<usize>, Vec<usize>) =
                    (0..n_samples).partition(|&i| test_fold[i] == fold);
                (train, test)
            })
            .collect())
    }
}

/// Cartesian grid over inverse regularization strength and component count.
#[derive(Clone, Debug)]
pub struct ParamGrid {
    pub c_values: Vec<f64>,
    pub n_components: Vec<usize>,
}

impl ParamGrid {
    /// Component counts `1..=max_components` crossed with `c_values`.
    pub fn new(max_components: usize, c_values: Vec<f64>) -> Self {
        Self {
            c_values,
            n_components: (1..=max_components).collect(),
        }
    }

    /// Candidates with `C` varying slowest.
    pub fn candidates(&self) -> Vec<PcrParams> {
        self.c_values
            .iter()
            .flat_map(|&c| {
                self.n_components
                    .iter()
                    .map(move |&n_components| PcrParams { n_components, c })
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.c_values.len() * self.n_components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cross-validated score of one grid point.
#[derive(Clone, Debug)]
pub struct CandidateResult {
    pub params: PcrParams,
    /// Test-fold accuracies; `NaN` where the fit failed
    pub fold_scores: Vec<f64>,
    pub mean_score: f64,
    pub std_score: f64,
}

#[derive(Clone, Debug)]
pub struct GridSearchResult {
    pub candidates: Vec<CandidateResult>,
    pub best_index: usize,
}

impl GridSearchResult {
    pub fn best_params(&self) -> PcrParams {
        self.candidates[self.best_index].params
    }

    pub fn best_score(&self) -> f64 {
        self.candidates[self.best_index].mean_score
    }
}

/// Exhaustive search scoring every candidate by mean test-fold accuracy.
#[derive(Clone, Debug)]
pub struct GridSearch {
    grid: ParamGrid,
    cv: StratifiedKFold,
    max_iter: usize,
}

impl GridSearch {
    pub fn new(grid: ParamGrid, cv: StratifiedKFold) -> Self {
        Self {
            grid,
            cv,
            max_iter: 1000,
        }
    }

    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Runs the search on raw (unstandardized) features.
    ///
    /// Within a fold the scaler and the widest PCA are fitted once; a
    /// candidate with `n` components uses the first `n` score columns, which
    /// is what a PCA fitted with `n` components would produce. The best
    /// candidate is the first one, in candidate order, with the highest mean
    /// accuracy.
    pub fn fit(&self, x: &Matrix, y: &Vector) -> Result<GridSearchResult> {
        if x.nrows() != y.len() {
            return Err(PcrError::DimensionMismatch(
                "Number of samples in X and y must match".to_string(),
            ));
        }
        let candidates = self.grid.candidates();
        let widest = match candidates.iter().map(|p| p.n_components).max() {
            Some(n) => n,
            None => return Err(PcrError::InvalidInput("parameter grid is empty".to_string())),
        };

        let splits = self.cv.split(y)?;
        info!(
            "Grid search: {} candidates x {} folds",
            candidates.len(),
            splits.len()
        );

        let mut fold_scores = vec![Vec::with_capacity(splits.len()); candidates.len()];
        for (fold, (train, test)) in splits.iter().enumerate() {
            let x_train = x.select(Axis(0), train);
            let y_train = y.select(Axis(0), train);
            let x_test = x.select(Axis(0), test);
            let y_test = y.select(Axis(0), test);

            let mut scaler = StandardScaler::new();
            let train_scaled = scaler.fit_transform(&x_train)?;
            let test_scaled = scaler.transform(&x_test)?;

            let available = widest.min(x_train.nrows()).min(x_train.ncols());
            let mut pca = PCA::new().n_components(available);
            let train_scores = pca.fit_transform(&train_scaled)?;
            let test_scores = pca.transform(&test_scaled)?;

            let mut skipped = 0;
            for (params, scores) in candidates.iter().zip(fold_scores.iter_mut()) {
                let n = params.n_components;
                if n == 0 || n > available {
                    skipped += 1;
                    scores.push(f64::NAN);
                    continue;
                }

                let train_n = train_scores.slice(s![.., ..n]).to_owned();
                let test_n = test_scores.slice(s![.., ..n]).to_owned();

                let mut classifier = LogisticRegression::new()
                    .c(params.c)
                    .max_iterations(self.max_iter);
                let score = match classifier.fit(&train_n, &y_train) {
                    Ok(()) => accuracy_score(&y_test, &classifier.predict(&test_n)?)?,
                    Err(e) => {
                        warn!("Fold {} failed for {}: {}", fold, params, e);
                        f64::NAN
                    }
                };
                scores.push(score);
            }

            if skipped > 0 {
                warn!(
                    "Fold {}: {} candidate(s) request more than {} components and were not scored",
                    fold, skipped, available
                );
            }
            debug!("Fold {} scored ({} train / {} test samples)", fold, train.len(), test.len());
        }

        let results: Vec<CandidateResult> = candidates
            .into_iter()
            .zip(fold_scores)
            .map(|(params, fold_scores)| {
                let (mean_score, std_score) = mean_and_std(&fold_scores);
                CandidateResult {
                    params,
                    fold_scores,
                    mean_score,
                    std_score,
                }
            })
            .collect();

        let mut best_index: Option<usize> = None;
        for (i, candidate) in results.iter().enumerate() {
            if candidate.mean_score.is_nan() {
                continue;
            }
            match best_index {
                Some(b) if results[b].mean_score >= candidate.mean_score => {}
                _ => best_index = Some(i),
            }
        }
        let best_index = best_index.ok_or_else(|| {
            PcrError::Numerical("no grid candidate could be scored".to_string())
        })?;

        info!(
            "Best candidate: {} (mean accuracy {:.4})",
            results[best_index].params, results[best_index].mean_score
        );
        Ok(GridSearchResult {
            candidates: results,
            best_index,
        })
    }
}

/// Test-fold accuracies of a full [`PcrPipeline`] refitted on every
/// training fold.
pub fn cross_val_score(
    params: PcrParams,
    x: &Matrix,
    y: &Vector,
    cv: &StratifiedKFold,
    max_iter: usize,
) -> Result<Vec<f64>> {
    cv.split(y)?
        .into_iter()
        .map(|(train, test)| {
            let mut pipeline = PcrPipeline::new(params).max_iter(max_iter);
            pipeline.fit(&x.select(Axis(0), &train), &y.select(Axis(0), &train))?;
            pipeline.score(&x.select(Axis(0), &test), &y.select(Axis(0), &test))
        })
        .collect()
}

/// Mean and population standard deviation; `NaN` if any score is `NaN`.
fn mean_and_std(scores: &[f64]) -> (f64, f64) {
    if scores.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = scores.len() as f64;
    let mean = scores.iter().sum::<f64>() / n;
    let variance = scores.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / n;
    (mean, variance.sqrt())
}
