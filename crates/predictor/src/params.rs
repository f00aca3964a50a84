use contracts::{ContractError, ModelSpec, INPUT_DIM, OUTPUT_DIM};
use nalgebra::{DMatrix, DVector};

use crate::Standardizer;

/// Runtime weights of the 3→H→2 network
///
/// Dimensions are fixed at construction; only values change afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParameters {
    pub(crate) input: Standardizer,
    pub(crate) output: Standardizer,
    /// `INPUT_DIM × H`
    pub(crate) w1: DMatrix<f64>,
    pub(crate) b1: DVector<f64>,
    /// `H × OUTPUT_DIM`
    pub(crate) w2: DMatrix<f64>,
    pub(crate) b2: DVector<f64>,
}

impl ModelParameters {
    /// Validate a spec and build runtime parameters.
    ///
    /// # Errors
    /// `ModelShape` on any dimension mismatch, zero scale or non-finite weight.
    pub fn from_spec(spec: &ModelSpec) -> Result<Self, ContractError> {
        let hidden = spec.hidden_dim();
        if hidden == 0 {
            return Err(ContractError::model_shape("b1", "hidden layer is empty"));
        }

        let input = Standardizer::new("x_scale", &spec.x_mean, &spec.x_scale, INPUT_DIM)?;
        let output = Standardizer::new("y_scale", &spec.y_mean, &spec.y_scale, OUTPUT_DIM)?;
        let w1 = matrix("w1", &spec.w1, INPUT_DIM, hidden)?;
        let w2 = matrix("w2", &spec.w2, hidden, OUTPUT_DIM)?;
        let b1 = vector("b1", &spec.b1, hidden)?;
        let b2 = vector("b2", &spec.b2, OUTPUT_DIM)?;

        Ok(Self {
            input,
            output,
            w1,
            b1,
            w2,
            b2,
        })
    }

    pub fn hidden_dim(&self) -> usize {
        self.b1.len()
    }

    /// Output standardization mean, the neutral prediction
    pub fn output_mean(&self) -> (f64, f64) {
        let mean = self.output.mean();
        (mean[0], mean[1])
    }

    pub fn input_standardizer(&self) -> &Standardizer {
        &self.input
    }

    pub fn output_standardizer(&self) -> &Standardizer {
        &self.output
    }
}

fn matrix(
    field: &str,
    rows: &[Vec<f64>],
    nrows: usize,
    ncols: usize,
) -> Result<DMatrix<f64>, ContractError> {
    if rows.len() != nrows {
        return Err(ContractError::model_shape(
            field,
            format!("expected {nrows} rows, got {}", rows.len()),
        ));
    }
    for (idx, row) in rows.iter().enumerate() {
        if row.len() != ncols {
            return Err(ContractError::model_shape(
                format!("{field}[{idx}]"),
                format!("expected {ncols} columns, got {}", row.len()),
            ));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ContractError::model_shape(
                format!("{field}[{idx}]"),
                "weights must be finite",
            ));
        }
    }
    Ok(DMatrix::from_fn(nrows, ncols, |r, c| rows[r][c]))
}

fn vector(field: &str, values: &[f64], len: usize) -> Result<DVector<f64>, ContractError> {
    if values.len() != len {
        return Err(ContractError::model_shape(
            field,
            format!("expected {len} components, got {}", values.len()),
        ));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ContractError::model_shape(field, "weights must be finite"));
    }
    Ok(DVector::from_column_slice(values))
}
