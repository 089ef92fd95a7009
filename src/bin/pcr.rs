//! Principal component regression on an expression table and a label table.

use anyhow::{Context, Result};
use clap::Parser;
use expression_pcr::metrics::{format_confusion_matrix, ClassificationReport};
use expression_pcr::run::run;
use expression_pcr::{Array2, PcrConfig, PcrParams};
use log::info;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Principal component regression for binary expression phenotypes.", long_about = None)]
struct Cli {
    /// Sample x gene table, sample IDs in the first column
    #[arg(long, required = true)]
    expression: PathBuf,

    /// Label table, sample IDs in the first column
    #[arg(long, required = true)]
    labels: PathBuf,

    /// Column of the label table holding the 0/1 target
    #[arg(long, required = true)]
    label_column: String,

    /// Field delimiter of both tables
    #[arg(long, default_value = "\t", value_parser = parse_delimiter)]
    sep: char,

    #[arg(long, default_value = "pcr_result")]
    output_prefix: String,

    #[arg(long, default_value = "info")]
    log_level: String,
}

/// Accepts a single character or the two-character escape `\t`.
fn parse_delimiter(raw: &str) -> std::result::Result<char, String> {
    if raw == "\\t" {
        return Ok('\t');
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("delimiter must be a single character, got {:?}", raw)),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = cli.log_level.parse::<log::LevelFilter>().unwrap_or_else(|_| {
        eprintln!(
            "Warning: Invalid log level '{}' provided. Defaulting to Info.",
            cli.log_level
        );
        log::LevelFilter::Info
    });
    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();
    info!("Starting pcr with args: {:?}", cli);

    let config = PcrConfig::new(&cli.expression, &cli.labels, cli.label_column.clone())
        .delimiter(cli.sep)
        .output_prefix(cli.output_prefix.clone());

    let report = run(&config).with_context(|| {
        format!(
            "PCR run on {} and {} failed",
            cli.expression.display(),
            cli.labels.display()
        )
    })?;

    print!(
        "{}",
        summary(
            report.best_params,
            &report.confusion_matrix,
            &report.classification_report,
            report.roc_auc
        )
    );
    Ok(())
}

/// Console report. Section bodies start with a space and the AUC keeps a
/// fractional part (`1.0`, not `1`).
fn summary(
    best: PcrParams,
    confusion: &Array2<usize>,
    classification: &ClassificationReport,
    roc_auc: f64,
) -> String {
    format!(
        "Best n_components: {}, C: {}\n\nConfusion Matrix:\n {}\n\nClassification Report:\n {}\n\nROC AUC: {:?}\n",
        best.n_components,
        best.c,
        format_confusion_matrix(confusion),
        classification,
        roc_auc
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimiter() {
        assert_eq!(parse_delimiter("\t"), Ok('\t'));
        assert_eq!(parse_delimiter("\\t"), Ok('\t'));
        assert_eq!(parse_delimiter(","), Ok(','));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter(",;").is_err());
    }

    #[test]
    fn test_summary_layout() {
        let y = expression_pcr::Vector::from(vec![0.0, 0.0, 1.0, 1.0]);
        let report = expression_pcr::metrics::classification_report(&y, &y).unwrap();
        let confusion = expression_pcr::metrics::confusion_matrix(&y, &y).unwrap();
        let best = PcrParams { n_components: 3, c: 0.1 };

        let text = summary(best, &confusion, &report, 1.0);
        assert!(text.starts_with("Best n_components: 3, C: 0.1\n\nConfusion Matrix:\n [[2 0]\n [0 2]]\n"));
        assert!(text.contains("\nClassification Report:\n               precision"));
        assert!(text.ends_with("\nROC AUC: 1.0\n"));

        let text = summary(PcrParams { n_components: 1, c: 10.0 }, &confusion, &report, 0.9375);
        assert!(text.starts_with("Best n_components: 1, C: 10\n"));
        assert!(text.ends_with("ROC AUC: 0.9375\n"));
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from([
            "pcr",
            "--expression",
            "x.tsv",
            "--labels",
            "y.tsv",
            "--label-column",
            "Disease",
        ])
        .unwrap();
        assert_eq!(cli.sep, '\t');
        assert_eq!(cli.output_prefix, "pcr_result");
        assert_eq!(cli.log_level, "info");
    }
}
