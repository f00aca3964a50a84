//! ModelSpec - load-time description of the predictor network.

use serde::{Deserialize, Serialize};

/// Input width: temperature, humidity, time-of-day fraction
pub const INPUT_DIM: usize = 3;

/// Output width: temperature, humidity
pub const OUTPUT_DIM: usize = 2;

/// Weights and standardization constants of a 3→H→2 network
///
/// Matrices are row-major: `w1` is `INPUT_DIM` rows of `H` columns,
/// `w2` is `H` rows of `OUTPUT_DIM` columns. Shape checks happen when the
/// spec is turned into runtime parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub x_mean: Vec<f64>,
    pub x_scale: Vec<f64>,
    pub y_mean: Vec<f64>,
    pub y_scale: Vec<f64>,
    pub w1: Vec<Vec<f64>>,
    pub b1: Vec<f64>,
    pub w2: Vec<Vec<f64>>,
    pub b2: Vec<f64>,
}

impl ModelSpec {
    /// Hidden width as declared by the first-layer bias
    pub fn hidden_dim(&self) -> usize {
        self.b1.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_from_toml() {
        let src = r#"
            x_mean = [20.0, 50.0, 0.5]
            x_scale = [5.0, 10.0, 0.3]
            y_mean = [20.0, 50.0]
            y_scale = [5.0, 10.0]
            w1 = [[0.1, 0.2], [0.3, 0.4], [0.5, 0.6]]
            b1 = [0.0, 0.0]
            w2 = [[0.1, 0.2], [0.3, 0.4]]
            b2 = [0.0, 0.0]
        "#;
        let spec: ModelSpec = toml::from_str(src).unwrap();
        assert_eq!(spec.hidden_dim(), 2);
        assert_eq!(spec.w1.len(), INPUT_DIM);
        assert_eq!(spec.w2[0].len(), OUTPUT_DIM);
    }
}
