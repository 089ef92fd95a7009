use expression_pcr::generator::{generate_demo_data, write_demo_data, LABEL_COLUMN};
use expression_pcr::run::run;
use expression_pcr::{DemoConfig, PcrConfig, PcrError, PcrPipeline, Table};
use std::fs;
use std::path::Path;

fn prefix(dir: &Path) -> String {
    dir.join("result").to_string_lossy().into_owned()
}

#[test]
fn test_demo_output_is_reproducible() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let config = DemoConfig::default();

    let (expr_a, labels_a) = write_demo_data(&generate_demo_data(&config).unwrap(), a.path()).unwrap();
    let (expr_b, labels_b) = write_demo_data(&generate_demo_data(&config).unwrap(), b.path()).unwrap();

    assert_eq!(fs::read(&expr_a).unwrap(), fs::read(&expr_b).unwrap());
    assert_eq!(fs::read(&labels_a).unwrap(), fs::read(&labels_b).unwrap());

    let labels = Table::read(&labels_a, '\t').unwrap();
    let positives = labels.rows.iter().filter(|r| r[0] == "1").count();
    assert_eq!(labels.n_rows(), 100);
    assert_eq!(positives, 50);
}

#[test]
fn test_small_run_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let data = generate_demo_data(&DemoConfig {
        n_samples: 40,
        n_features: 60,
        n_informative: 10,
        seed: 11,
        shift: 2.0,
    })
    .unwrap();
    let (expression, labels) = write_demo_data(&data, dir.path()).unwrap();

    let mut config = PcrConfig::new(&expression, &labels, LABEL_COLUMN).output_prefix(prefix(dir.path()));
    config.max_components = 10;
    config.c_grid = vec![0.1, 1.0, 10.0];

    let report = run(&config).unwrap();
    assert_eq!(report.search.candidates.len(), 30);
    assert!(report.best_params.n_components >= 1 && report.best_params.n_components <= 10);
    assert_eq!(report.confusion_matrix.sum(), 40);
    assert!(report.best_score > 0.5);

    let weighted = Table::read(&report.outputs.top_genes_weighted, '\t').unwrap();
    assert_eq!(weighted.columns, vec!["WeightedContribution"]);
    assert_eq!(weighted.n_rows(), 20);

    let model = PcrPipeline::load(&report.outputs.model).unwrap();
    assert_eq!(model.params, report.best_params);
}

#[test]
fn test_full_demo_run() {
    let dir = tempfile::tempdir().unwrap();
    let data = generate_demo_data(&DemoConfig::default()).unwrap();
    let (expression, labels) = write_demo_data(&data, dir.path()).unwrap();

    let config = PcrConfig::new(&expression, &labels, "Disease").output_prefix(prefix(dir.path()));
    let report = run(&config).unwrap();

    assert!(report.best_params.n_components <= 50);
    assert_eq!(report.search.candidates.len(), 250);
    assert_eq!(report.confusion_matrix.sum(), 100);
    assert_eq!(report.classification_report.weighted_avg.support, 100);

    let loadings = Table::read(&report.outputs.loadings, '\t').unwrap();
    assert_eq!(loadings.index_name, "");
    assert_eq!(loadings.n_rows(), 1000);
    assert_eq!(loadings.n_columns(), report.best_params.n_components);
}

#[test]
fn test_unknown_label_samples_fail_fast() {
    let dir = tempfile::tempdir().unwrap();
    let expression = dir.path().join("x.tsv");
    let labels = dir.path().join("y.tsv");
    fs::write(&expression, "Sample\tG1\tG2\nS1\t1.0\t2.0\nS2\t0.5\t0.1\n").unwrap();
    fs::write(&labels, "Sample\tDisease\nS1\t0\nS3\t1\n").unwrap();

    let config = PcrConfig::new(&expression, &labels, "Disease").output_prefix(prefix(dir.path()));
    match run(&config) {
        Err(PcrError::MissingSamples { count, first }) => {
            assert_eq!(count, 1);
            assert_eq!(first, vec!["S3".to_string()]);
        }
        other => panic!("expected MissingSamples, got {:?}", other.map(|r| r.best_params)),
    }
}

#[test]
fn test_comma_separated_input() {
    let dir = tempfile::tempdir().unwrap();
    let data = generate_demo_data(&DemoConfig {
        n_samples: 20,
        n_features: 8,
        n_informative: 3,
        seed: 5,
        shift: 3.0,
    })
    .unwrap();

    let expression = dir.path().join("x.csv");
    let labels = dir.path().join("y.csv");
    data.expression_table().unwrap().write(&expression, ',').unwrap();
    data.labels_table().unwrap().write(&labels, ',').unwrap();

    let mut config = PcrConfig::new(&expression, &labels, LABEL_COLUMN)
        .delimiter(',')
        .output_prefix(prefix(dir.path()));
    config.n_folds = 4;
    let report = run(&config).unwrap();
    assert!(report.best_params.n_components <= 8);
    assert_eq!(report.confusion_matrix.sum(), 20);
}
