//! # Predictor
//!
//! Tiny feed-forward network (3 inputs, H sigmoid hidden units, 2 outputs)
//! that forecasts temperature and humidity, plus single-sample online
//! gradient updates that keep it in sync with received readings.
//!
//! `predict` returns a [`PredictionContext`] and `update` consumes it, so an
//! update always trains against the forward pass it belongs to.

mod params;
mod predictor;
mod reference;
mod standardizer;

pub use params::ModelParameters;
pub use predictor::{Prediction, PredictionContext, Predictor};
pub use reference::reference_model_spec;
pub use standardizer::Standardizer;

/// Pre-activations are clamped to this magnitude before `exp`
pub const SIGMOID_CLAMP: f64 = 20.0;

/// Logistic sigmoid with overflow guard
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x.clamp(-SIGMOID_CLAMP, SIGMOID_CLAMP)).exp())
}
