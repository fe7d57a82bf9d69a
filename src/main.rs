use std::io::Read;
use std::panic;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use solution_runner::{
    config::EngineSettings,
    core::{domain::ExecutionResult, executor::CodeExecutor, traits::runner::CodeRunner},
    mappers,
};

const EXIT_FAILED: u8 = 1;
const EXIT_ERROR: u8 = 2;

#[derive(Parser, Debug)]
#[clap(
    name = "solution-runner",
    version,
    about = "Run Python submissions in an embedded interpreter and grade them against test cases"
)]
struct Cli {
    #[clap(
        required = true,
        help = "Source files, run in order through one interpreter; `-` reads standard input"
    )]
    sources: Vec<String>,

    #[clap(long, help = "JSON array of {input, expected} test cases for the last source")]
    tests: Option<PathBuf>,

    #[clap(long, help = "Function called once per test case")]
    entry_point: Option<String>,

    #[clap(long, conflicts_with = "no_time_limit", help = "Wall-clock limit per source")]
    time_limit_ms: Option<u64>,

    #[clap(long, help = "Let every source run to completion")]
    no_time_limit: bool,

    #[clap(long, help = "Print one JSON result per line")]
    json: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    set_panic_hook();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(%err, "run aborted");
            eprintln!("error: {err}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

#[tracing::instrument(skip_all)]
async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let settings = settings_for(&cli)?;
    let mut cases = match &cli.tests {
        Some(path) => Some(mappers::test_cases_from_str(&std::fs::read_to_string(path)?)?),
        None => None,
    };
    let sources = cli
        .sources
        .iter()
        .map(|name| read_source(name).map(|text| (name, text)))
        .collect::<Result<Vec<_>, _>>()?;

    let executor = CodeExecutor::new(settings);
    let last = sources.len().saturating_sub(1);
    let mut all_passed = true;

    for (position, (name, source)) in sources.iter().enumerate() {
        let test_cases = if position == last { cases.take() } else { None };
        match executor.execute_code(source, test_cases).await {
            Ok(result) => {
                all_passed &= result.passed;
                print_result(name, &result, cli.json)?;
            }
            Err(err) => {
                tracing::error!(%err, source = %name, "engine failure");
                print_result(name, &ExecutionResult::from(&err), cli.json)?;
                return Ok(ExitCode::from(EXIT_ERROR));
            }
        }
    }

    Ok(if all_passed {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_FAILED)
    })
}

fn settings_for(cli: &Cli) -> Result<EngineSettings, Box<dyn std::error::Error>> {
    let mut settings = EngineSettings::from_env()?;
    if let Some(entry_point) = &cli.entry_point {
        settings.entry_point = entry_point.clone();
    }
    if let Some(ms) = cli.time_limit_ms {
        settings.time_limit = Some(Duration::from_millis(ms));
    }
    if cli.no_time_limit {
        settings.time_limit = None;
    }
    Ok(settings)
}

fn read_source(name: &str) -> std::io::Result<String> {
    if name == "-" {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        std::fs::read_to_string(Path::new(name))
    }
}

fn print_result(
    name: &str,
    result: &ExecutionResult,
    json: bool,
) -> Result<(), serde_json::Error> {
    if json {
        println!("{}", serde_json::to_string(result)?);
        return Ok(());
    }

    let status = if result.passed { "PASSED" } else { "FAILED" };
    println!("== {name}: {status}");
    if !result.output.is_empty() {
        println!("{}", result.output.trim_end());
    }
    if let Some(error) = &result.error {
        println!("error: {error}");
    }
    Ok(())
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
