use habitat_forecast::hsi::{HsiSummary, SpeciesRules};
use habitat_forecast::{ForecastRecord, HsiLevel, Quarter, RuleBook, Species};
use habitat_math::ScoreRule;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rstest::rstest;
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::NamedTempFile;

fn record(values: &[(&str, f64)]) -> ForecastRecord {
    ForecastRecord::new(
        Quarter::new(2026, 1).unwrap(),
        values.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
    )
}

fn temperature_only() -> RuleBook {
    let rules = SpeciesRules::new().with_rule("Temperature", ScoreRule::range(20.0, 28.0).unwrap());
    RuleBook::new(BTreeMap::from([(Species::Cobia, rules)])).unwrap()
}

#[rstest]
#[case(24.0, 1.0)]
#[case(10.0, 0.5)]
#[case(40.0, 16.0 / 28.0)]
#[case(56.0, 0.0)]
#[case(60.0, 0.0)]
fn test_range_rule_scores(#[case] value: f64, #[case] expected: f64) {
    let scored = temperature_only()
        .score(&record(&[("Temperature", value)]), Species::Cobia)
        .unwrap();
    assert!((scored.hsi - expected).abs() < 1e-12, "{value} -> {}", scored.hsi);
}

#[rstest]
#[case(0.9, HsiLevel::VerySuitable)]
#[case(0.85, HsiLevel::VerySuitable)]
#[case(0.8, HsiLevel::Suitable)]
#[case(0.75, HsiLevel::Suitable)]
#[case(0.6, HsiLevel::MarginallySuitable)]
#[case(0.5, HsiLevel::MarginallySuitable)]
#[case(0.3, HsiLevel::Unsuitable)]
fn test_level_bands(#[case] hsi: f64, #[case] level: HsiLevel) {
    assert_eq!(HsiLevel::from_score(hsi), level);
}

#[test]
fn test_nan_counts_as_zero_but_absent_column_is_skipped() {
    let rules = RuleBook::default();

    // DO 6 scores 1; NH3 missing-as-NaN scores 0
    let with_nan = rules
        .score(&record(&[("DO", 6.0), ("NH3", f64::NAN)]), Species::Oyster)
        .unwrap();
    assert_eq!(with_nan.hsi, 0.5);
    assert_eq!(with_nan.level, HsiLevel::MarginallySuitable);

    let without = rules.score(&record(&[("DO", 6.0)]), Species::Oyster).unwrap();
    assert_eq!(without.hsi, 1.0);
    assert_eq!(without.level, HsiLevel::VerySuitable);

    let nothing = rules.score(&record(&[("Depth", 3.0)]), Species::Oyster).unwrap();
    assert_eq!(nothing.hsi, 0.0);
}

#[test]
fn test_hsi_stays_in_unit_interval() {
    let rules = RuleBook::default();
    let variables = [
        "DO", "Temperature", "pH", "Salinity", "Alkalinity", "Transparency", "NH3", "H2S", "PO4",
        "BOD5", "COD", "Coliform", "TSS", "CN", "As", "Cd", "Pb", "Cu", "Hg", "Zn", "Total_Cr",
    ];
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..500 {
        let mut values: Vec<(&str, f64)> = Vec::new();
        for &variable in &variables {
            if !rng.gen_bool(0.8) {
                continue;
            }
            let value = if rng.gen_bool(0.05) {
                f64::NAN
            } else {
                rng.gen_range(-10.0..10_000.0)
            };
            values.push((variable, value));
        }
        let rec = record(&values);

        for species in Species::ALL {
            let scored = rules.score(&rec, species).unwrap();
            assert!((0.0..=1.0).contains(&scored.hsi), "{species}: {}", scored.hsi);
        }
    }
}

#[test]
fn test_species_use_their_own_tables() {
    let rules = RuleBook::default();
    let rec = record(&[("Salinity", 22.0)]);

    assert_eq!(rules.score(&rec, Species::Oyster).unwrap().hsi, 1.0);
    // below cobia's 27-33 optimum: 22/27
    let cobia = rules.score(&rec, Species::Cobia).unwrap().hsi;
    assert!((cobia - 22.0 / 27.0).abs() < 1e-12);
}

#[test]
fn test_rule_book_from_json_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"oyster": {{"DO": {{"min_val": 4}}, "NH3": {{"max_val": 0.2}}}}}}"#
    )
    .unwrap();

    let rules = RuleBook::from_file(file.path()).unwrap();
    let scored = rules
        .score(&record(&[("DO", 2.0), ("NH3", 0.1)]), Species::Oyster)
        .unwrap();
    assert_eq!(scored.hsi, 0.5);
    assert!(rules.score(&record(&[]), Species::Cobia).is_err());
}

#[test]
fn test_zero_bound_in_file_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"cobia": {{"pH": {{"low": 0, "high": 8.5}}}}}}"#).unwrap();
    assert!(RuleBook::from_file(file.path()).is_err());
}

#[test]
fn test_summary_over_scored_rows() {
    use habitat_forecast::HsiTableRow;

    let rows: Vec<HsiTableRow> = [0.95, 0.8, 0.8, 0.1]
        .iter()
        .enumerate()
        .map(|(i, &hsi)| HsiTableRow {
            station: format!("S{i}"),
            x: 0.0,
            y: 0.0,
            year: 2026,
            quarter: 1,
            hsi,
            level: None,
        })
        .collect();

    let summary = HsiSummary::from_rows(&rows);
    assert_eq!(summary.total, 4);
    assert_eq!(summary.count(HsiLevel::Suitable), 2);
    assert_eq!(summary.count(HsiLevel::MarginallySuitable), 0);
    assert_eq!(summary.percentage(HsiLevel::Unsuitable), 25.0);
    assert_eq!(summary.max_hsi, Some(0.95));
}
