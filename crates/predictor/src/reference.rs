use contracts::ModelSpec;

/// Deployed 3→16→2 weights, used when no model is configured
pub fn reference_model_spec() -> ModelSpec {
    ModelSpec {
        x_mean: vec![11.951440, 34.796511, 0.518765],
        x_scale: vec![5.192832, 19.254291, 0.287677],
        y_mean: vec![11.952372, 34.792687],
        y_scale: vec![5.192482, 19.253258],
        w1: vec![
            vec![
                -0.556351, 0.189494, -0.093627, 0.395785, -0.577321, 0.007591, -0.283381,
                0.373759, 0.595335, 0.768831, -1.089705, 0.857749, 0.713353, -0.719686,
                0.349461, -0.002144,
            ],
            vec![
                0.278056, 0.605283, 0.425705, -0.529407, 0.397235, 0.428362, -0.667639,
                -0.575691, -0.201403, -0.094113, -1.041557, 0.074900, -0.057000, -0.186813,
                0.802223, -0.792138,
            ],
            vec![
                -0.169951, 0.177320, 0.187231, 0.182245, -0.020823, -0.040330, 0.068759,
                -0.062626, -0.239455, -0.115023, 0.069360, 0.001581, -0.151701, 0.057098,
                0.121142, -0.038202,
            ],
        ],
        b1: vec![
            -0.103147, -0.179799, 0.235186, 0.303573, 0.055328, 0.258825, 0.170623, 0.350530,
            -0.223219, -0.245579, 0.069463, -0.026183, -0.112913, -0.009116, -0.218366,
            0.355398,
        ],
        w2: vec![
            vec![-0.581072, 0.426290],
            vec![0.057667, 0.765215],
            vec![-0.253485, 0.757576],
            vec![0.497511, -0.597305],
            vec![-0.727013, 0.628422],
            vec![-0.086437, 0.533692],
            vec![-0.198910, -0.838062],
            vec![0.272927, -0.631084],
            vec![0.702924, -0.230831],
            vec![0.447056, -0.067041],
            vec![-0.786047, -0.775605],
            vec![0.624468, -0.028861],
            vec![0.764573, -0.091280],
            vec![-0.834101, 0.028377],
            vec![0.166062, 0.657976],
            vec![0.060482, -0.581994],
        ],
        b2: vec![0.004370, 0.191009],
    }
}
