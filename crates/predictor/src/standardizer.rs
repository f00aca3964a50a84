use contracts::ContractError;
use nalgebra::DVector;

/// Per-component `(x - mean) / scale` transform and its inverse
#[derive(Debug, Clone, PartialEq)]
pub struct Standardizer {
    mean: DVector<f64>,
    scale: DVector<f64>,
}

impl Standardizer {
    /// # Errors
    /// Lengths differ from `dim`, or a component is non-finite or a scale is zero.
    pub fn new(
        field: &str,
        mean: &[f64],
        scale: &[f64],
        dim: usize,
    ) -> Result<Self, ContractError> {
        if mean.len() != dim || scale.len() != dim {
            return Err(ContractError::model_shape(
                field,
                format!(
                    "expected {dim} mean/scale components, got {}/{}",
                    mean.len(),
                    scale.len()
                ),
            ));
        }
        if mean.iter().any(|v| !v.is_finite()) {
            return Err(ContractError::model_shape(field, "mean must be finite"));
        }
        if let Some(idx) = scale.iter().position(|v| !v.is_finite() || *v == 0.0) {
            return Err(ContractError::model_shape(
                format!("{field}[{idx}]"),
                "scale must be finite and non-zero",
            ));
        }

        Ok(Self {
            mean: DVector::from_column_slice(mean),
            scale: DVector::from_column_slice(scale),
        })
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    pub fn standardize(&self, v: &DVector<f64>) -> DVector<f64> {
        (v - &self.mean).component_div(&self.scale)
    }

    pub fn destandardize(&self, v: &DVector<f64>) -> DVector<f64> {
        v.component_mul(&self.scale) + &self.mean
    }
}
