use habitat_forecast::forecast::{forecast, forecast_metal};
use habitat_forecast::models::LinearRegressor;
use habitat_forecast::{
    FeatureSchema, ForecastError, LagWindow, Quarter, Regressor, Result, Species, TrainedModel,
    VariableGroup, METAL_VARIABLES,
};
use pretty_assertions::assert_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Predicts every target's lag1 unchanged
#[derive(Debug)]
struct Lag1Stub {
    n_targets: usize,
    n_features: usize,
}

impl Regressor for Lag1Stub {
    fn predict(&self, features: &[f64]) -> Result<Vec<f64>> {
        Ok(features[..self.n_targets].to_vec())
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_outputs(&self) -> usize {
        self.n_targets
    }
}

fn lag_schema(targets: &[&str], covariates: &[&str]) -> FeatureSchema {
    let mut features: Vec<String> = targets.iter().map(|t| format!("{t}_lag1")).collect();
    features.extend(targets.iter().map(|t| format!("{t}_lag4")));
    features.extend(covariates.iter().map(|c| c.to_string()));
    FeatureSchema::new(features, targets.iter().map(|t| t.to_string()).collect())
}

fn metal_history(cn: [f64; 4]) -> LagWindow {
    let columns: Vec<(&str, Vec<f64>)> = METAL_VARIABLES
        .iter()
        .map(|&m| (m, if m == "CN" { cn.to_vec() } else { vec![0.0; 4] }))
        .collect();
    LagWindow::from_columns("S", &columns).unwrap()
}

fn quarter(year: i32, q: u8) -> Quarter {
    Quarter::new(year, q).unwrap()
}

#[test]
fn test_lag1_stub_carries_last_value_forward() {
    let schema = lag_schema(&METAL_VARIABLES, &["year", "quarter"]);
    let stub = Lag1Stub {
        n_targets: 8,
        n_features: schema.input_features.len(),
    };
    let history = metal_history([1.0, 2.0, 3.0, 4.0]);

    let records = forecast(&history, &stub, &schema, VariableGroup::Metal, quarter(2026, 1), 2).unwrap();

    let cn: Vec<f64> = records.iter().map(|r| r.get("CN").unwrap()).collect();
    assert_eq!(cn, vec![4.0, 4.0]);
    assert_eq!(records[0].quarter, quarter(2026, 1));
    assert_eq!(records[1].quarter, quarter(2026, 2));
    assert_eq!(records[0].values.len(), 8);
}

#[test]
fn test_quarters_wrap_into_next_year() {
    let schema = lag_schema(&METAL_VARIABLES, &["year", "quarter"]);
    let stub = Lag1Stub {
        n_targets: 8,
        n_features: schema.input_features.len(),
    };
    let history = metal_history([1.0, 2.0, 3.0, 4.0]);

    let records = forecast(&history, &stub, &schema, VariableGroup::Metal, quarter(2026, 4), 3).unwrap();
    let quarters: Vec<(i32, u8)> = records.iter().map(|r| (r.year(), r.quarter_number())).collect();
    assert_eq!(quarters, vec![(2026, 4), (2027, 1), (2027, 2)]);
}

#[test]
fn test_predictions_feed_the_next_step() {
    // CN_next = CN_lag1 + CN_lag4, so the window must roll with predictions
    let schema = lag_schema(&["DO"], &["Quarter_Num"]);
    let model = LinearRegressor::new(vec![0.0], vec![vec![1.0, 1.0, 0.0]]).unwrap();
    let history = LagWindow::from_columns("S", &[("DO", vec![1.0, 2.0, 3.0, 4.0])]).unwrap();

    let records = forecast(
        &history,
        &model,
        &schema,
        VariableGroup::NonMetal(Species::Oyster),
        quarter(2026, 1),
        3,
    )
    .unwrap();

    let values: Vec<f64> = records.iter().map(|r| r.get("DO").unwrap()).collect();
    // [1,2,3,4] -> 5 ; [2,3,4,5] -> 7 ; [3,4,5,7] -> 10
    assert_eq!(values, vec![5.0, 7.0, 10.0]);
}

#[test]
fn test_negative_prediction_is_clipped_but_fed_back_raw() {
    // DO_next = 6 - 2 * DO_lag1
    let schema = lag_schema(&["DO"], &["Quarter_Num"]);
    let model = LinearRegressor::new(vec![6.0], vec![vec![-2.0, 0.0, 0.0]]).unwrap();
    let history = LagWindow::from_columns("S", &[("DO", vec![1.0, 2.0, 3.0, 4.0])]).unwrap();

    let records = forecast(
        &history,
        &model,
        &schema,
        VariableGroup::NonMetal(Species::Oyster),
        quarter(2026, 1),
        2,
    )
    .unwrap();

    let values: Vec<f64> = records.iter().map(|r| r.get("DO").unwrap()).collect();
    // step 1 predicts -2 and emits 0; step 2 sees lag1 = -2, so 6 + 4 = 10 (a clipped lag1 would give 6)
    assert_eq!(values, vec![0.0, 10.0]);
}

#[test]
fn test_quarter_number_covariate_reaches_the_model() {
    let schema = lag_schema(&["Temperature"], &["Quarter_Num"]);
    let model = LinearRegressor::new(vec![0.0], vec![vec![0.0, 0.0, 10.0]]).unwrap();
    let history = LagWindow::from_columns("S", &[("Temperature", vec![25.0; 4])]).unwrap();

    let records = forecast(
        &history,
        &model,
        &schema,
        VariableGroup::NonMetal(Species::Cobia),
        quarter(2026, 3),
        3,
    )
    .unwrap();

    let values: Vec<f64> = records.iter().map(|r| r.get("Temperature").unwrap()).collect();
    assert_eq!(values, vec![30.0, 40.0, 10.0]);
}

#[test]
fn test_outputs_are_never_negative() {
    let targets = ["DO", "pH", "NH3"];
    let schema = lag_schema(&targets, &["Quarter_Num"]);

    for seed in 0..20u64 {
        let mut rng = StdRng::seed_from_u64(seed);
        let intercepts = (0..3).map(|_| rng.gen_range(-5.0..1.0)).collect();
        let coefficients = (0..3)
            .map(|_| (0..7).map(|_| rng.gen_range(-2.0..2.0)).collect())
            .collect();
        let model = LinearRegressor::new(intercepts, coefficients).unwrap();

        let columns: Vec<(&str, Vec<f64>)> = targets
            .iter()
            .map(|&t| (t, (0..4).map(|_| rng.gen_range(0.0..10.0)).collect()))
            .collect();
        let history = LagWindow::from_columns("S", &columns).unwrap();

        let records = forecast(
            &history,
            &model,
            &schema,
            VariableGroup::NonMetal(Species::Oyster),
            quarter(2026, 1),
            8,
        )
        .unwrap();

        for record in &records {
            for (name, value) in &record.values {
                assert!(*value >= 0.0, "seed {seed}: {name} = {value}");
            }
        }
    }
}

#[test]
fn test_prefix_of_longer_forecast_is_identical() {
    let targets = ["DO", "Salinity"];
    let schema = lag_schema(&targets, &["Quarter_Num"]);
    let model = LinearRegressor::new(
        vec![0.5, -1.0],
        vec![vec![0.6, 0.1, 0.2, 0.0, 0.05], vec![0.0, 0.9, 0.0, 0.1, -0.2]],
    )
    .unwrap();
    let history = LagWindow::from_columns(
        "S",
        &[("DO", vec![5.0, 6.0, 5.5, 6.2]), ("Salinity", vec![22.0, 24.0, 23.0, 25.0])],
    )
    .unwrap();
    let group = VariableGroup::NonMetal(Species::Oyster);

    let long = forecast(&history, &model, &schema, group, quarter(2026, 2), 6).unwrap();
    let short = forecast(&history, &model, &schema, group, quarter(2026, 2), 3).unwrap();
    assert_eq!(short, long[..3].to_vec());
}

#[test]
fn test_invalid_requests_are_rejected() {
    let schema = lag_schema(&METAL_VARIABLES, &["year", "quarter"]);
    let stub = Lag1Stub {
        n_targets: 8,
        n_features: schema.input_features.len(),
    };
    let history = metal_history([1.0, 2.0, 3.0, 4.0]);

    let zero = forecast(&history, &stub, &schema, VariableGroup::Metal, quarter(2026, 1), 0);
    assert!(matches!(zero, Err(ForecastError::InvalidParameter(_))));

    let other = LagWindow::from_columns("S", &[("CN", vec![1.0; 4])]).unwrap();
    let mismatch = forecast(&other, &stub, &schema, VariableGroup::Metal, quarter(2026, 1), 1);
    assert!(matches!(mismatch, Err(ForecastError::FeatureMismatch(_))));
}

#[test]
fn test_forecast_metal_uses_trained_model_schema() {
    let schema = lag_schema(&METAL_VARIABLES, &["year", "quarter"]);
    let n = schema.input_features.len();
    let coefficients = (0..8)
        .map(|i| (0..n).map(|j| if j == i { 1.0 } else { 0.0 }).collect())
        .collect();
    let model = TrainedModel::new(
        Box::new(LinearRegressor::new(vec![0.0; 8], coefficients).unwrap()),
        schema,
    )
    .unwrap();

    let records = forecast_metal(&metal_history([0.1, 0.2, 0.3, 0.4]), &model, quarter(2026, 1), 4).unwrap();
    assert_eq!(records.len(), 4);
    assert!(records.iter().all(|r| r.get("CN") == Some(0.4)));
    assert!(records.iter().all(|r| r.get("Hg") == Some(0.0)));
}
