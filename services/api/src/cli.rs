use crate::commands::{run_evaluate, run_schema, EvaluateArgs, SchemaArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use greenscore::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "GreenScore",
    about = "Score buildings against a green building standard from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Print the input schema of the configured standard as JSON
    Schema(SchemaArgs),
    /// Evaluate building records read from a JSON file
    Evaluate(EvaluateArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Schema(args) => run_schema(args),
        Command::Evaluate(args) => run_evaluate(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_accepts_report_flags() {
        let cli = Cli::try_parse_from([
            "greenscore-api",
            "evaluate",
            "--input",
            "building.json",
            "--named",
            "--report",
            "--csv",
            "criteria.csv",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Evaluate(args)) => {
                assert!(args.named);
                assert!(args.report);
                assert_eq!(args.csv.as_deref(), Some(std::path::Path::new("criteria.csv")));
                assert!(args.standard.is_none());
            }
            other => panic!("expected evaluate command, got {other:?}"),
        }
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["greenscore-api"]).expect("arguments parse");
        assert!(cli.command.is_none());
    }
}
