use crate::error::{PcrError, Result};
use crate::{Matrix, Vector};
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// A delimited text table: a header row, then one row per sample whose
/// first field is the sample ID.
///
/// Cells are kept as text; numeric interpretation happens when a
/// [`Dataset`] is built from the table.
#[derive(Clone, Debug, PartialEq)]
pub struct Table {
    /// Header of the index (first) column, often empty
    pub index_name: String,
    pub columns: Vec<String>,
    pub index: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// File the table was read from
    pub source: Option<PathBuf>,
    /// 1-based line of every row; for built tables, the line it is written to
    pub line_numbers: Vec<usize>,
}

impl Table {
    pub fn new(index_name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            index_name: index_name.into(),
            columns,
            index: Vec::new(),
            rows: Vec::new(),
            source: None,
            line_numbers: Vec::new(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn push_row(&mut self, id: impl Into<String>, values: Vec<String>) -> Result<()> {
        if values.len() != self.columns.len() {
            return Err(PcrError::DimensionMismatch(format!(
                "row has {} values but the table has {} columns",
                values.len(),
                self.columns.len()
            )));
        }
        self.line_numbers.push(self.rows.len() + 2);
        self.index.push(id.into());
        self.rows.push(values);
        Ok(())
    }

    /// Reads a table from `path`, splitting fields on `delimiter`.
    pub fn read(path: impl AsRef<Path>, delimiter: char) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let mut lines = reader.lines().enumerate();

        let header = match lines.next() {
            Some((_, line)) => line?,
            None => {
                return Err(PcrError::Parse {
                    path: path.to_path_buf(),
                    line: 1,
                    message: "file is empty".to_string(),
                });
            }
        };
        let mut header_fields = split_fields(&header, delimiter);
        let index_name = header_fields.remove(0);
        let mut table = Table::new(index_name, header_fields);
        table.source = Some(path.to_path_buf());

        let mut seen = HashSet::new();
        for (line_no, line) in lines {
            let line = line?;
            let trimmed = line.trim_end_matches('\r');
            if trimmed.is_empty() {
                continue;
            }
            let mut fields = split_fields(trimmed, delimiter);
            if fields.len() != table.columns.len() + 1 {
                return Err(PcrError::Parse {
                    path: path.to_path_buf(),
                    line: line_no + 1,
                    message: format!(
                        "expected {} fields, found {}",
                        table.columns.len() + 1,
                        fields.len()
                    ),
                });
            }
            let id = fields.remove(0);
            if !seen.insert(id.clone()) {
                return Err(PcrError::Parse {
                    path: path.to_path_buf(),
                    line: line_no + 1,
                    message: format!("duplicate sample ID '{}'", id),
                });
            }
            table.index.push(id);
            table.rows.push(fields);
            table.line_numbers.push(line_no + 1);
        }

        debug!(
            "Read {} rows x {} columns from {}",
            table.n_rows(),
            table.n_columns(),
            path.display()
        );
        Ok(table)
    }

    /// Parse error pointing at `row` of the source file, or an input error
    /// for tables built in memory.
    fn cell_error(&self, row: usize, message: String) -> PcrError {
        match &self.source {
            Some(path) => PcrError::Parse {
                path: path.clone(),
                line: self.line_numbers.get(row).copied().unwrap_or(row + 2),
                message,
            },
            None => PcrError::InvalidInput(message),
        }
    }

    pub fn write(&self, path: impl AsRef<Path>, delimiter: char) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        let sep = delimiter.to_string();

        write!(writer, "{}", self.index_name)?;
        for column in &self.columns {
            write!(writer, "{}{}", sep, column)?;
        }
        writeln!(writer)?;

        for (id, row) in self.index.iter().zip(self.rows.iter()) {
            write!(writer, "{}", id)?;
            for value in row {
                write!(writer, "{}{}", sep, value)?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    line.trim_end_matches('\r')
        .split(delimiter)
        .map(String::from)
        .collect()
}

/// Feature matrix and binary target aligned by sample ID.
#[derive(Clone, Debug)]
pub struct Dataset {
    pub features: Matrix,
    pub labels: Vector,
    pub sample_ids: Vec<String>,
    pub feature_names: Vec<String>,
}

impl Dataset {
    /// Restricts the feature table to the label table's samples, in the
    /// label table's order, and extracts `label_column` as the target.
    ///
    /// Every label sample must be present in the feature table and the
    /// target must be 0/1 with both classes present.
    pub fn align(features: &Table, labels: &Table, label_column: &str) -> Result<Self> {
        let label_idx = labels
            .column_index(label_column)
            .ok_or_else(|| PcrError::MissingColumn(label_column.to_string()))?;

        let positions: HashMap<&str, usize> = features
            .index
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();

        let missing: Vec<&String> = labels
            .index
            .iter()
            .filter(|id| !positions.contains_key(id.as_str()))
            .collect();
        if !missing.is_empty() {
            return Err(PcrError::MissingSamples {
                count: missing.len(),
                first: missing.into_iter().take(5).cloned().collect(),
            });
        }

        let n_samples = labels.n_rows();
        let n_features = features.n_columns();
        let mut x = Matrix::zeros((n_samples, n_features));
        let mut y = Vector::zeros(n_samples);

        for (i, id) in labels.index.iter().enumerate() {
            let position = positions[id.as_str()];
            for (j, raw) in features.rows[position].iter().enumerate() {
                x[(i, j)] = raw.trim().parse::<f64>().map_err(|_| {
                    features.cell_error(
                        position,
                        format!(
                            "non-numeric value {:?} for sample '{}', feature '{}'",
                            raw, id, features.columns[j]
                        ),
                    )
                })?;
            }

            let raw = labels.rows[i][label_idx].trim();
            y[i] = match raw.parse::<f64>() {
                Ok(v) if v == 0.0 || v == 1.0 => v,
                _ => {
                    return Err(PcrError::NonBinaryLabels(format!(
                        "{:?} for sample '{}'",
                        raw, id
                    )));
                }
            };
        }

        let dataset = Self {
            features: x,
            labels: y,
            sample_ids: labels.index.clone(),
            feature_names: features.columns.clone(),
        };

        let (negatives, positives) = dataset.class_counts();
        if negatives == 0 || positives == 0 {
            return Err(PcrError::InvalidInput(format!(
                "label column '{}' must contain both classes (0: {}, 1: {})",
                label_column, negatives, positives
            )));
        }

        info!(
            "Aligned {} samples x {} features ({} feature rows dropped; class 0: {}, class 1: {})",
            dataset.n_samples(),
            dataset.n_features(),
            features.n_rows() - n_samples,
            negatives,
            positives
        );
        Ok(dataset)
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Number of samples labeled 0 and 1.
    pub fn class_counts(&self) -> (usize, usize) {
        let positives = self.labels.iter().filter(|&&v| v == 1.0).count();
        (self.labels.len() - positives, positives)
    }
}
