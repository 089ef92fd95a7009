//! PNG diagnostics: the cumulative-variance scree plot and the predicted
//! probability histogram.
//!
//! Text is rendered with a bundled DejaVu Sans, so no system fonts are read.

use crate::error::{PcrError, Result};
use crate::Vector;
use plotters::prelude::*;
use plotters::style::register_font;
use std::path::Path;
use std::sync::OnceLock;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 500;
const BINS: usize = 20;
const FONT: &str = "sans-serif";

static FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

fn plot_error<E: std::fmt::Display>(e: E) -> PcrError {
    PcrError::Plot(e.to_string())
}

/// Registers the bundled font once per process.
fn ensure_font() -> Result<()> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED.get_or_init(|| register_font(FONT, FontStyle::Normal, FONT_BYTES).is_ok());
    if ok {
        Ok(())
    } else {
        Err(PcrError::Plot("bundled font could not be loaded".to_string()))
    }
}

/// Cumulative explained variance per component count, with a horizontal
/// reference line at `threshold`.
pub fn scree_plot(path: &Path, cumulative: &Vector, threshold: f64) -> Result<()> {
    if cumulative.is_empty() {
        return Err(PcrError::InvalidInput("no components to plot".to_string()));
    }
    ensure_font()?;

    let n = cumulative.len() as f64;
    let points: Vec<(f64, f64)> = cumulative
        .iter()
        .enumerate()
        .map(|(i, &c)| ((i + 1) as f64, c))
        .collect();

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Scree Plot", (FONT, 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..n + 1.0, 0.0..1.05)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("Number of Principal Components")
        .y_desc("Cumulative Explained Variance Ratio")
        .label_style((FONT, 14))
        .draw()
        .map_err(plot_error)?;

    chart
        .draw_series(LineSeries::new(points.iter().copied(), &BLUE))
        .map_err(plot_error)?
        .label("Cumulative variance")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));
    chart
        .draw_series(points.iter().map(|&p| Circle::new(p, 3, BLUE.filled())))
        .map_err(plot_error)?;
    chart
        .draw_series(LineSeries::new(vec![(0.0, threshold), (n + 1.0, threshold)], &RED))
        .map_err(plot_error)?
        .label(format!("{:.0}% Variance", threshold * 100.0))
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .label_font((FONT, 14))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    Ok(())
}

/// Counts of `values` in `BINS` equal-width bins over [0, 1].
fn histogram(values: impl Iterator<Item = f64>) -> Vec<usize> {
    let mut counts = vec![0; BINS];
    for v in values {
        let bin = ((v * BINS as f64) as usize).min(BINS - 1);
        counts[bin] += 1;
    }
    counts
}

/// Overlaid histograms of predicted positive-class probabilities, class 0
/// in blue and class 1 in red.
pub fn probability_histogram(path: &Path, probabilities: &Vector, labels: &Vector) -> Result<()> {
    if probabilities.len() != labels.len() {
        return Err(PcrError::DimensionMismatch(
            "probabilities and labels must have the same length".to_string(),
        ));
    }
    ensure_font()?;

    let by_class = |class: f64| {
        histogram(
            probabilities
                .iter()
                .zip(labels.iter())
                .filter(move |(_, l)| **l == class)
                .map(|(p, _)| p.clamp(0.0, 1.0)),
        )
    };
    let negatives = by_class(0.0);
    let positives = by_class(1.0);
    let tallest = negatives.iter().chain(positives.iter()).copied().max().unwrap_or(0).max(1);
    let y_max = (tallest + tallest / 10 + 1) as u32;

    let root = BitMapBackend::new(path, (WIDTH, HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(plot_error)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Probability Distribution", (FONT, 24))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..1.0, 0u32..y_max)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .x_desc("Predicted Probability")
        .y_desc("Count")
        .label_style((FONT, 14))
        .draw()
        .map_err(plot_error)?;

    let width = 1.0 / BINS as f64;
    for (counts, color, name) in [(&negatives, BLUE, "Class 0"), (&positives, RED, "Class 1")] {
        chart
            .draw_series(counts.iter().enumerate().filter(|(_, c)| **c > 0).map(|(i, &c)| {
                let left = i as f64 * width;
                Rectangle::new([(left, 0), (left + width, c as u32)], color.mix(0.5).filled())
            }))
            .map_err(plot_error)?
            .label(name)
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.mix(0.5).filled()));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperMiddle)
        .label_font((FONT, 14))
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_error)?;

    root.present().map_err(plot_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_histogram_bins() {
        let counts = histogram([0.0, 0.04, 0.05, 0.5, 0.99, 1.0].into_iter());
        assert_eq!(counts.len(), BINS);
        assert_eq!(counts[0], 2);
        assert_eq!(counts[1], 1);
        assert_eq!(counts[10], 1);
        assert_eq!(counts[19], 2);
    }

    #[test]
    fn test_bundled_font_loads() {
        assert!(ensure_font().is_ok());
        assert!(ensure_font().is_ok());
    }

    #[test]
    fn test_plots_are_written() {
        let dir = tempfile::tempdir().unwrap();

        let scree = dir.path().join("scree.png");
        scree_plot(&scree, &array![0.5, 0.8, 0.95, 1.0], 0.9).unwrap();
        assert!(std::fs::metadata(&scree).unwrap().len() > 0);

        let hist = dir.path().join("hist.png");
        probability_histogram(&hist, &array![0.1, 0.2, 0.7, 0.9], &array![0.0, 0.0, 1.0, 1.0]).unwrap();
        assert!(std::fs::metadata(&hist).unwrap().len() > 0);
    }

    #[test]
    fn test_histogram_length_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hist.png");
        assert!(probability_histogram(&path, &array![0.1], &array![0.0, 1.0]).is_err());
    }
}
