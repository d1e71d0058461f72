//! Batch forecast, HSI and radius tables
//!
//! Usage:
//!   hsi_pipeline run <config.json>
//!   hsi_pipeline radius <hsi.csv> <out.csv> [max_dist_km] [bin_km]
//!
//! Log level is controlled with `RUST_LOG` (default `info`).

use habitat_forecast::hsi::HsiLevel;
use habitat_forecast::output::{read_hsi_table, write_hsi_table, write_radius_table};
use habitat_forecast::radius::{estimate_table, RadiusParams};
use habitat_forecast::{ForecastError, Pipeline, PipelineConfig, Result};
use std::fs;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const USAGE: &str = "usage:\n  hsi_pipeline run <config.json>\n  hsi_pipeline radius <hsi.csv> <out.csv> [max_dist_km] [bin_km]";

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let outcome = match args.first().map(String::as_str) {
        Some("run") if args.len() == 2 => run(&args[1]),
        Some("radius") if (3..=5).contains(&args.len()) => radius(&args[1..]),
        _ => {
            eprintln!("{}", USAGE);
            return ExitCode::from(2);
        }
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(kind = err.kind(), "{}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &str) -> Result<()> {
    let config = PipelineConfig::from_file(config_path)?;
    let pipeline = Pipeline::from_config(&config)?;
    let start = config.forecast.start()?;
    fs::create_dir_all(&config.output_dir)?;

    for &species in &config.species {
        let report = pipeline.run_species(species, start, config.forecast.n_quarters)?;
        for (station, failure) in report.failures() {
            warn!(station = %station.station, %species, kind = failure.kind, "{}", failure.message);
        }

        let table = report.hsi_table();
        let hsi_path = config.output_dir.join(format!("hsi_{}.csv", species));
        write_hsi_table(&hsi_path, &table)?;

        let summary = report.summary();
        for level in HsiLevel::ALL {
            info!(
                %species,
                %level,
                count = summary.count(level),
                percent = summary.percentage(level),
                "hsi level"
            );
        }

        let radii = estimate_table(&table, config.radius)?;
        let radius_path = config.output_dir.join(format!("R_{}.csv", species));
        write_radius_table(&radius_path, &radii)?;
        info!(
            %species,
            hsi = %hsi_path.display(),
            radius = %radius_path.display(),
            "tables written"
        );
    }
    Ok(())
}

fn parse_km(value: Option<&String>, name: &str, default: f64) -> Result<f64> {
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            ForecastError::InvalidParameter(format!("{} must be a number, got {:?}", name, raw))
        }),
    }
}

fn radius(args: &[String]) -> Result<()> {
    let defaults = RadiusParams::batch();
    let params = RadiusParams::new(
        parse_km(args.get(2), "max_dist_km", defaults.max_dist_km)?,
        parse_km(args.get(3), "bin_km", defaults.bin_km)?,
    );

    let rows = read_hsi_table(&args[0])?;
    let radii = estimate_table(&rows, params)?;
    write_radius_table(&args[1], &radii)?;
    info!(rows = rows.len(), records = radii.len(), out = %args[1], "radius table written");
    Ok(())
}
