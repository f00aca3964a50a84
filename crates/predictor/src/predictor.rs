use contracts::{ContractError, ModelSpec};
use nalgebra::DVector;
use tracing::trace;

use crate::{sigmoid, ModelParameters};

/// Intermediate state of one forward pass
///
/// Opaque to callers; hand it back to [`Predictor::update`] to train
/// against exactly this pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionContext {
    standardized_input: DVector<f64>,
    hidden: DVector<f64>,
}

/// Forward pass result in physical units
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// `(temperature, humidity)`
    pub values: (f64, f64),
    pub context: PredictionContext,
}

/// Owns the model parameters and the mutable predictor state
///
/// Not shared: one instance per protocol loop.
#[derive(Debug, Clone)]
pub struct Predictor {
    params: ModelParameters,
    last_prediction: (f64, f64),
    last_context: Option<PredictionContext>,
    update_count: u64,
}

impl Predictor {
    /// Last prediction starts at the output mean
    pub fn new(params: ModelParameters) -> Self {
        let last_prediction = params.output_mean();
        Self {
            params,
            last_prediction,
            last_context: None,
            update_count: 0,
        }
    }

    /// # Errors
    /// `ModelShape` if the `ModelSpec` is inconsistent.
    pub fn from_spec(spec: &ModelSpec) -> Result<Self, ContractError> {
        Ok(Self::new(ModelParameters::from_spec(spec)?))
    }

    pub fn params(&self) -> &ModelParameters {
        &self.params
    }

    /// Most recent prediction, or the last synced ground truth
    pub fn last_prediction(&self) -> (f64, f64) {
        self.last_prediction
    }

    /// Context of the most recent forward pass
    pub fn last_context(&self) -> Option<&PredictionContext> {
        self.last_context.as_ref()
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Forecast `(temperature, humidity)` from raw inputs.
    ///
    /// Inputs must be finite.
    pub fn predict(&mut self, temperature: f64, humidity: f64, time_fraction: f64) -> Prediction {
        let raw = DVector::from_column_slice(&[temperature, humidity, time_fraction]);
        let standardized_input = self.params.input.standardize(&raw);

        let hidden = (self.params.w1.tr_mul(&standardized_input) + &self.params.b1).map(sigmoid);
        let out_scaled = self.params.w2.tr_mul(&hidden) + &self.params.b2;
        let out = self.params.output.destandardize(&out_scaled);

        let values = (out[0], out[1]);
        let context = PredictionContext {
            standardized_input,
            hidden,
        };

        self.last_prediction = values;
        self.last_context = Some(context.clone());

        Prediction { values, context }
    }

    /// Autoregressive step: predict from the last prediction at `time_fraction`
    pub fn rollout(&mut self, time_fraction: f64) -> Prediction {
        let (temperature, humidity) = self.last_prediction;
        self.predict(temperature, humidity, time_fraction)
    }

    /// One step of single-sample gradient descent towards `actual`.
    ///
    /// Every delta is computed from the current weights before any of
    /// them is written, so the hidden error uses the pre-update `w2`.
    pub fn update(&mut self, context: &PredictionContext, actual: (f64, f64), learning_rate: f64) {
        debug_assert_eq!(context.hidden.len(), self.params.hidden_dim());

        let target = self
            .params
            .output
            .standardize(&DVector::from_column_slice(&[actual.0, actual.1]));
        let current = self.params.w2.tr_mul(&context.hidden) + &self.params.b2;
        let out_error = target - current;

        let slope = context.hidden.map(|h| h * (1.0 - h));
        let hidden_error = (&self.params.w2 * &out_error).component_mul(&slope);

        let delta_w2 = &context.hidden * out_error.transpose() * learning_rate;
        let delta_b2 = &out_error * learning_rate;
        let delta_w1 = &context.standardized_input * hidden_error.transpose() * learning_rate;
        let delta_b1 = &hidden_error * learning_rate;

        self.params.w2 += delta_w2;
        self.params.b2 += delta_b2;
        self.params.w1 += delta_w1;
        self.params.b1 += delta_b1;
        self.update_count += 1;

        trace!(
            error_norm = out_error.norm(),
            learning_rate,
            updates = self.update_count,
            "online update applied"
        );
    }

    /// Overwrite the last prediction with ground truth
    pub fn sync_to(&mut self, actual: (f64, f64)) {
        self.last_prediction = actual;
    }
}
