use crate::error::{PcrError, Result};
use crate::{Matrix, Vector};
use serde::{Deserialize, Serialize};

/// Standard deviations below this are treated as constant features.
const MIN_SCALE: f64 = 1e-12;

/// Centers each feature and scales it to unit (population) variance.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Option<Vector>,
    scale: Option<Vector>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self {
            mean: None,
            scale: None,
        }
    }

    pub fn fit(&mut self, data: &Matrix) -> Result<()> {
        let mean = data
            .mean_axis(ndarray::Axis(0))
            .ok_or_else(|| PcrError::InvalidInput("cannot fit a scaler on zero samples".to_string()))?;
        // Constant columns keep scale 1 so they map to 0 rather than NaN.
        let scale = data
            .std_axis(ndarray::Axis(0), 0.0)
            .mapv(|s| if s > MIN_SCALE { s } else { 1.0 });

        self.mean = Some(mean);
        self.scale = Some(scale);
        Ok(())
    }

    pub fn transform(&self, data: &Matrix) -> Result<Matrix> {
        let mean = self.mean.as_ref().ok_or(PcrError::NotFitted("StandardScaler"))?;
        let scale = self.scale.as_ref().ok_or(PcrError::NotFitted("StandardScaler"))?;

        if data.ncols() != mean.len() {
            return Err(PcrError::DimensionMismatch(format!(
                "Number of features in X ({}) doesn't match training data ({})",
                data.ncols(),
                mean.len()
            )));
        }

        let mut result = data.clone();
        for mut row in result.axis_iter_mut(ndarray::Axis(0)) {
            row -= mean;
            row /= scale;
        }

        Ok(result)
    }

    pub fn fit_transform(&mut self, data: &Matrix) -> Result<Matrix> {
        self.fit(data)?;
        self.transform(data)
    }

    pub fn mean(&self) -> Option<&Vector> {
        self.mean.as_ref()
    }

    pub fn scale(&self) -> Option<&Vector> {
        self.scale.as_ref()
    }
}
