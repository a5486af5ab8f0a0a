use crate::infra::load_engine;
use clap::Args;
use greenscore::config::AppConfig;
use greenscore::report::CriteriaReport;
use greenscore::{AppError, BuildingRecord, EvaluationResult, ScoringEngine};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct SchemaArgs {
    /// Standard document to describe (defaults to the configured or bundled standard)
    #[arg(long)]
    pub(crate) standard: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct EvaluateArgs {
    /// JSON file holding one building record or an array of records
    #[arg(long)]
    pub(crate) input: PathBuf,
    /// Treat record keys as readable input names rather than param keys
    #[arg(long)]
    pub(crate) named: bool,
    /// Standard document to score against (defaults to the configured or bundled standard)
    #[arg(long)]
    pub(crate) standard: Option<PathBuf>,
    /// Print a met/unmet criteria report instead of raw JSON
    #[arg(long)]
    pub(crate) report: bool,
    /// Write the criteria of a single record to this CSV file
    #[arg(long)]
    pub(crate) csv: Option<PathBuf>,
}

/// One record or a batch, as found in an input file.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordInput {
    Batch(Vec<BuildingRecord>),
    Single(BuildingRecord),
}

pub(crate) fn run_schema(args: SchemaArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let engine = load_engine(&config.standard, args.standard.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&engine.schema())?);
    Ok(())
}

pub(crate) fn run_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let EvaluateArgs {
        input,
        named,
        standard,
        report,
        csv,
    } = args;

    let config = AppConfig::load()?;
    let engine = load_engine(&config.standard, standard.as_deref())?;
    let reader = BufReader::new(File::open(&input)?);

    match serde_json::from_reader(reader)? {
        RecordInput::Single(record) => {
            let result = evaluate_one(&engine, &record, named)?;
            let criteria = CriteriaReport::build(engine.rubric(), &result);
            if let Some(path) = csv {
                write_csv(&criteria, &path)?;
            }
            if report {
                print!("{}", criteria.render_text());
            } else {
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
        RecordInput::Batch(records) => {
            let results = if named {
                let translated = records
                    .iter()
                    .map(|record| engine.index().translate_named_record(record))
                    .collect::<Result<Vec<_>, _>>()?;
                engine.evaluate_batch(&translated)
            } else {
                engine.evaluate_batch(&records)
            };
            let results = results.into_iter().collect::<Result<Vec<_>, _>>()?;

            if report {
                for (position, result) in results.iter().enumerate() {
                    println!("Record {}", position + 1);
                    print!("{}", CriteriaReport::build(engine.rubric(), result).render_text());
                    println!();
                }
            } else {
                println!("{}", serde_json::to_string_pretty(&results)?);
            }
        }
    }

    Ok(())
}

fn evaluate_one(
    engine: &ScoringEngine,
    record: &BuildingRecord,
    named: bool,
) -> Result<EvaluationResult, AppError> {
    let result = if named {
        engine.evaluate_named(record)?
    } else {
        engine.evaluate(record)?
    };
    Ok(result)
}

fn write_csv(report: &CriteriaReport, path: &Path) -> Result<(), AppError> {
    let file = File::create(path)?;
    report.write_csv(file)?;
    Ok(())
}
