//! Tabular data loading through polars

use crate::classifiers::check_binary_labels;
use crate::error::{MetaModelError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::path::Path;

/// Feature matrix and binary target read from a table
#[derive(Debug, Clone)]
pub struct Dataset {
    pub features: Array2<f64>,
    pub target: Array1<f64>,
    pub feature_names: Vec<String>,
    pub target_name: String,
}

impl Dataset {
    /// Read `path` and split out the `target` column
    pub fn load(path: impl AsRef<Path>, target: &str) -> Result<Self> {
        let df = load_frame(path.as_ref())?;
        Self::from_dataframe(&df, target)
    }

    /// Split a frame into features (every other column) and target
    pub fn from_dataframe(df: &DataFrame, target: &str) -> Result<Self> {
        let feature_names: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| name.as_str() != target)
            .map(|s| s.to_string())
            .collect();
        if feature_names.len() == df.width() {
            return Err(MetaModelError::FeatureNotFound(target.to_string()));
        }
        if feature_names.is_empty() {
            return Err(MetaModelError::DataError("no feature columns besides the target".to_string()));
        }

        let target_values = column_f64(df, target)?;
        check_binary_labels(&Array1::from_vec(target_values.clone()))?;

        Ok(Self {
            features: columns_to_array2(df, &feature_names)?,
            target: Array1::from_vec(target_values),
            feature_names,
            target_name: target.to_string(),
        })
    }

    pub fn n_samples(&self) -> usize {
        self.features.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Fraction of positive labels
    pub fn positive_rate(&self) -> f64 {
        if self.target.is_empty() {
            0.0
        } else {
            self.target.sum() / self.target.len() as f64
        }
    }
}

/// Read CSV, TSV, JSON or Parquet by file extension
pub fn load_frame(path: &Path) -> Result<DataFrame> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let df = match ext.as_str() {
        "csv" | "tsv" => {
            let separator = if ext == "tsv" { b'\t' } else { b',' };
            CsvReadOptions::default()
                .with_infer_schema_length(Some(1000))
                .with_has_header(true)
                .map_parse_options(|opts| opts.with_separator(separator))
                .try_into_reader_with_file_path(Some(path.to_path_buf()))?
                .finish()?
        }
        "json" => JsonReader::new(std::fs::File::open(path)?).finish()?,
        "parquet" => ParquetReader::new(std::fs::File::open(path)?).finish()?,
        other => {
            return Err(MetaModelError::DataError(format!(
                "unsupported file format '{}' for {}",
                other,
                path.display()
            )))
        }
    };

    Ok(df)
}

/// A column cast to `f64`; nulls are an error
fn column_f64(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let series = df
        .column(name)
        .map_err(|_| MetaModelError::FeatureNotFound(name.to_string()))?;
    let series_f64 = series
        .cast(&DataType::Float64)
        .map_err(|e| MetaModelError::DataError(format!("column '{}': {}", name, e)))?;
    if series_f64.null_count() > 0 {
        return Err(MetaModelError::DataError(format!(
            "column '{}' has {} missing or non-numeric values",
            name,
            series_f64.null_count()
        )));
    }
    Ok(series_f64
        .f64()
        .map_err(|e| MetaModelError::DataError(e.to_string()))?
        .into_no_null_iter()
        .collect())
}

/// Extract named columns into a row-major matrix
fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let col_data = col_names
        .iter()
        .map(|name| column_f64(df, name))
        .collect::<Result<Vec<Vec<f64>>>>()?;

    Ok(Array2::from_shape_fn((df.height(), col_names.len()), |(r, c)| col_data[c][r]))
}
