//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads a CSV or generates the synthetic sample
//! - runs model comparison and limiting-factor diagnosis
//! - prints reports and writes optional exports

use clap::Parser;

use crate::cli::{Command, CompareArgs, DataArgs, DiagnoseArgs, SimulateArgs};
use crate::domain::{AnalysisConfig, Criterion, DataSource, ModelKind};
use crate::error::AppError;
use crate::io::export::{RunSummary, write_comparison_csv, write_dataset_csv, write_diagnostic_csv, write_summary_json};

pub mod pipeline;

/// Entry point for the `saviesa` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Compare(args) => handle_compare(args),
        Command::Diagnose(args) => handle_diagnose(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_compare(args: CompareArgs) -> Result<(), AppError> {
    let config = config_from_args(&args.data, args.loocv, args.criterion, args.export, args.json);
    let run = pipeline::run_compare(&config)?;
    let data = &run.data.dataset;

    println!(
        "{}",
        crate::report::format_dataset_summary(data, &run.data.source, run.data.row_errors.len())
    );
    println!("{}", crate::report::format_comparison(&run.table, config.criterion));
    if let Some(el) = run
        .table
        .fit_for(ModelKind::Multiplicative)
        .and_then(|f| f.elasticities().ok())
    {
        println!("{}", crate::report::format_elasticities(&el, &data.factors));
    }

    if let Some(path) = &config.export_csv {
        write_comparison_csv(path, &run.table)?;
    }
    if let Some(path) = &config.export_json {
        let summary = RunSummary::new(data, &run.table, config.criterion, config.epsilon);
        write_summary_json(path, &summary)?;
    }

    Ok(())
}

fn handle_diagnose(args: DiagnoseArgs) -> Result<(), AppError> {
    let config = config_from_args(&args.data, false, Criterion::Bic, args.export, args.json);
    let run = pipeline::run_diagnose(&config)?;
    let data = &run.data.dataset;

    println!(
        "{}",
        crate::report::format_dataset_summary(data, &run.data.source, run.data.row_errors.len())
    );
    println!("{}", crate::report::format_diagnosis(&run.diagnosis));

    if let Some(path) = &config.export_csv {
        write_diagnostic_csv(path, data, &run.diagnosis, &config.target)?;
    }
    if let Some(path) = &config.export_json {
        let summary =
            RunSummary::new(data, &run.table, config.criterion, config.epsilon).with_diagnosis(&run.diagnosis);
        write_summary_json(path, &summary)?;
    }

    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let data = crate::data::generate_education_sample(args.n, args.seed, args.noise)?;
    write_dataset_csv(&args.out, &data, "F")?;
    println!("Wrote {} synthetic observations to {}", data.len(), args.out.display());
    Ok(())
}

pub fn config_from_args(
    data: &DataArgs,
    loocv: bool,
    criterion: Criterion,
    export_csv: Option<std::path::PathBuf>,
    export_json: Option<std::path::PathBuf>,
) -> AnalysisConfig {
    let source = match &data.csv {
        Some(path) => DataSource::Csv {
            path: path.clone(),
            id_column: data.id_column.clone(),
        },
        None => DataSource::Synthetic {
            n: data.n,
            seed: data.seed,
            noise_sd: data.noise,
        },
    };

    AnalysisConfig {
        source,
        factor_names: data.factors.iter().map(|f| f.trim().to_string()).collect(),
        target: data.target.clone(),
        epsilon: data.epsilon,
        loocv,
        criterion,
        export_csv,
        export_json,
    }
}
