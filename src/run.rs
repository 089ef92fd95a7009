//! End-to-end PCR run: load, align, analyse variance, search the grid, refit,
//! evaluate and report loadings.

use crate::config::PcrConfig;
use crate::dataset::{Dataset, Table};
use crate::decomposition::PCA;
use crate::error::{PcrError, Result};
use crate::metrics::{self, ClassificationReport};
use crate::model_selection::{GridSearch, GridSearchResult, ParamGrid, StratifiedKFold};
use crate::pipeline::{PcrParams, PcrPipeline};
use crate::plot;
use crate::preprocessing::StandardScaler;
use crate::report;
use crate::Matrix;
use log::{debug, info, warn};
use ndarray::Array2;
use std::path::PathBuf;

/// Files written by a run.
#[derive(Clone, Debug)]
pub struct OutputPaths {
    pub scree_plot: PathBuf,
    pub probability_plot: PathBuf,
    pub model: PathBuf,
    pub loadings: PathBuf,
    pub top_genes: PathBuf,
    pub top_genes_weighted: PathBuf,
}

impl OutputPaths {
    fn new(config: &PcrConfig) -> Self {
        Self {
            scree_plot: config.output_path("scree_plot.png"),
            probability_plot: config.output_path("probability_distribution.png"),
            model: config.output_path("pcr_model.pkl"),
            loadings: config.output_path("loadings.tsv"),
            top_genes: config.output_path("top_genes.tsv"),
            top_genes_weighted: config.output_path("top_genes_weighted.tsv"),
        }
    }
}

/// Outcome of a run. Metrics are computed on the training data.
#[derive(Clone, Debug)]
pub struct PcrReport {
    pub best_params: PcrParams,
    pub best_score: f64,
    pub search: GridSearchResult,
    /// Components needed to reach the variance threshold on the full data
    pub components_for_threshold: Option<usize>,
    pub confusion_matrix: Array2<usize>,
    pub classification_report: ClassificationReport,
    pub roc_auc: f64,
    pub outputs: OutputPaths,
}

pub fn run(config: &PcrConfig) -> Result<PcrReport> {
    let features = Table::read(&config.expression, config.delimiter)?;
    let labels = Table::read(&config.labels, config.delimiter)?;
    let dataset = Dataset::align(&features, &labels, &config.label_column)?;
    run_dataset(config, &dataset)
}

/// Runs every stage after loading on an already aligned data set.
pub fn run_dataset(config: &PcrConfig, dataset: &Dataset) -> Result<PcrReport> {
    let outputs = OutputPaths::new(config);
    let x = &dataset.features;
    let y = &dataset.labels;

    let mut scaler = StandardScaler::new();
    let scaled = scaler.fit_transform(x)?;

    let components_for_threshold = variance_analysis(config, &scaled, &outputs)?;

    let max_components = config.max_components.min(dataset.n_features());
    let grid = ParamGrid::new(max_components, config.c_grid.clone());
    let search = GridSearch::new(grid, StratifiedKFold::new(config.n_folds))
        .max_iter(config.max_iter)
        .fit(x, y)?;
    let best_params = search.best_params();

    let mut pipeline = PcrPipeline::new(best_params).max_iter(config.max_iter);
    pipeline.fit(x, y)?;
    pipeline.save(&outputs.model)?;
    info!("Saved fitted pipeline to {}", outputs.model.display());

    let predictions = pipeline.predict(x)?;
    let probabilities = pipeline.predict_proba(x)?;
    let confusion_matrix = metrics::confusion_matrix(y, &predictions)?;
    let classification_report = metrics::classification_report(y, &predictions)?;
    let roc_auc = metrics::roc_auc_score(y, &probabilities)?;

    plot::probability_histogram(&outputs.probability_plot, &probabilities, y)?;
    info!("Wrote {}", outputs.probability_plot.display());

    write_loadings(config, dataset, &scaled, best_params.n_components, &outputs)?;

    Ok(PcrReport {
        best_params,
        best_score: search.best_score(),
        search,
        components_for_threshold,
        confusion_matrix,
        classification_report,
        roc_auc,
        outputs,
    })
}

/// Full PCA on the standardized data and the scree plot.
fn variance_analysis(
    config: &PcrConfig,
    scaled: &Matrix,
    outputs: &OutputPaths,
) -> Result<Option<usize>> {
    let mut pca = PCA::new();
    pca.fit(scaled)?;
    let cumulative = pca
        .cumulative_explained_variance_ratio()
        .ok_or(PcrError::NotFitted("PCA"))?;

    let needed = pca.components_for_variance(config.variance_threshold);
    match needed {
        Some(n) => info!(
            "{} components explain {:.0}% of the variance",
            n,
            config.variance_threshold * 100.0
        ),
        None => warn!(
            "{} components do not reach {:.0}% of the variance",
            cumulative.len(),
            config.variance_threshold * 100.0
        ),
    }

    plot::scree_plot(&outputs.scree_plot, &cumulative, config.variance_threshold)?;
    info!("Wrote {}", outputs.scree_plot.display());
    Ok(needed)
}

/// Loadings of a PCA with `n_components` on the standardized data, the
/// per-component top features and the variance-weighted ranking.
fn write_loadings(
    config: &PcrConfig,
    dataset: &Dataset,
    scaled: &Matrix,
    n_components: usize,
    outputs: &OutputPaths,
) -> Result<()> {
    let mut pca = PCA::new().n_components(n_components);
    pca.fit(scaled)?;
    let loadings = pca.loadings().ok_or(PcrError::NotFitted("PCA"))?;
    let ratio = pca
        .explained_variance_ratio
        .as_ref()
        .ok_or(PcrError::NotFitted("PCA"))?;
    let names = &dataset.feature_names;

    report::loadings_table(&loadings, names)?.write(&outputs.loadings, '\t')?;

    let top = report::top_features_per_component(&loadings, config.top_per_component);
    report::top_features_table(&top, names)?.write(&outputs.top_genes, '\t')?;

    let influence = report::gene_influence(&loadings, ratio)?;
    let ranking = report::rank_gene_influence(&influence);
    if let Some(first) = ranking.first() {
        debug!("Most influential feature: {} ({})", names[first.index], first.value);
    }
    report::weighted_table(&ranking, names, config.top_weighted)?
        .write(&outputs.top_genes_weighted, '\t')?;

    info!(
        "Wrote {}, {} and {}",
        outputs.loadings.display(),
        outputs.top_genes.display(),
        outputs.top_genes_weighted.display()
    );
    Ok(())
}
