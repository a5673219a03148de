//! Binary entry point for the lakeq CLI.
#![forbid(unsafe_code)]

use std::error::Error;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use lakeq::{
    catalog::{format_date, DateRange},
    config::LakeConfig,
    orchestrator::{Answer, Inspection, Orchestrator, QuestionRequest},
    provider::ProviderKind,
    server::{self, install_tracing_subscriber, ServeOptions},
    storage::LocalStore,
    table::Table,
};

#[derive(Parser, Debug)]
#[command(
    name = "lakeq",
    version,
    about = "Ask questions of a date-partitioned CSV lake",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(long, global = true, env = "LAKEQ_CONFIG", help = "Path to lakeq.toml")]
    config: Option<PathBuf>,

    #[command(flatten)]
    storage: StorageArgs,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct StorageArgs {
    #[arg(
        long,
        global = true,
        env = "LAKEQ_ROOT",
        help = "Directory holding the partitions (default: current directory)"
    )]
    root: Option<PathBuf>,

    #[arg(long, global = true, env = "LAKEQ_BASE_PATH", help = "Prefix above year=/month=/day=")]
    base_path: Option<String>,

    #[arg(
        long,
        global = true,
        env = "LAKEQ_FILE_LIMIT",
        help = "Stop loading after this many files"
    )]
    file_limit: Option<usize>,
}

#[derive(Args, Debug, Default)]
struct RangeArgs {
    #[arg(long, requires = "end", help = "First day, YYYY-MM-DD")]
    start: Option<String>,

    #[arg(long, requires = "start", help = "Last day, YYYY-MM-DD")]
    end: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the earliest and latest partition dates.
    Dates,
    /// Describe the columns of a date range and show sample rows.
    Schema {
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Run a `SELECT ... [WHERE ...]` statement against a date range.
    Query {
        /// Statement to run.
        sql: String,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Answer a question with a language model.
    Ask {
        /// Question to answer.
        question: String,
        #[arg(long, value_enum, help = "Provider override")]
        provider: Option<ProviderKind>,
        #[arg(long, help = "Model override")]
        model: Option<String>,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Serve the HTTP API.
    Serve(ServeCmd),
}

#[derive(Args, Debug)]
struct ServeCmd {
    #[arg(long, help = "Interface to bind (default from config, 127.0.0.1)")]
    host: Option<IpAddr>,

    #[arg(long, help = "Port to listen on (default from config, 5000)")]
    port: Option<u16>,

    #[arg(
        long = "allow-origin",
        value_name = "ORIGIN",
        help = "Allow cross-origin requests from this origin (repeatable)"
    )]
    allow_origins: Vec<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let directive = match cli.command {
        Command::Serve(_) => "info",
        _ => "warn",
    };
    install_tracing_subscriber(directive);

    let config = build_config(&cli)?;
    let root = config
        .storage
        .root
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let store = Arc::new(LocalStore::open(&root)?);
    let orchestrator = Orchestrator::new(store, config);

    match cli.command {
        Command::Dates => {
            let range = orchestrator.available_dates()?;
            emit(cli.format, &range, || print_range_text(&range))?;
        }
        Command::Schema { range } => {
            let range = resolve(&orchestrator, &range)?;
            let inspection = orchestrator.inspect(range)?;
            emit(cli.format, &inspection, || print_inspection_text(&inspection))?;
        }
        Command::Query { sql, range } => {
            let range = resolve(&orchestrator, &range)?;
            let table = orchestrator.run_query(&sql, range)?;
            emit(cli.format, &table, || print_table_text(&table))?;
        }
        Command::Ask {
            question,
            provider,
            model,
            range,
        } => {
            let request = QuestionRequest {
                question,
                provider: provider.map(|kind| kind.to_string()),
                model,
                start_date: range.start,
                end_date: range.end,
            };
            let answer = orchestrator.ask(&request)?;
            emit(cli.format, &answer, || print_answer_text(&answer))?;
        }
        Command::Serve(cmd) => {
            let mut options = ServeOptions::from_config(&orchestrator.config().server)?;
            if let Some(host) = cmd.host {
                options.host = host;
            }
            if let Some(port) = cmd.port {
                options.port = port;
            }
            if !cmd.allow_origins.is_empty() {
                options.allow_origins = cmd.allow_origins;
            }
            if let Err(err) = server::serve(orchestrator, options).await {
                eprintln!("server terminated: {err}");
                return Err(Box::new(err));
            }
        }
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Result<LakeConfig, Box<dyn Error>> {
    let mut config = LakeConfig::load(cli.config.clone())?;
    if let Some(root) = &cli.storage.root {
        config.storage.root = Some(root.clone());
    }
    if let Some(base_path) = &cli.storage.base_path {
        config.storage.base_path = base_path.clone();
    }
    if let Some(limit) = cli.storage.file_limit {
        config.ingest.file_limit = Some(limit);
    }
    Ok(config)
}

fn resolve(orchestrator: &Orchestrator, range: &RangeArgs) -> lakeq::Result<DateRange> {
    orchestrator.resolve_range(range.start.as_deref(), range.end.as_deref())
}

fn emit<T, F>(format: OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: serde::Serialize,
    F: Fn(),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(),
    }
    Ok(())
}

fn print_range_text(range: &DateRange) {
    println!("start_date={}", format_date(range.start()));
    println!("end_date={}", format_date(range.end()));
}

fn print_inspection_text(inspection: &Inspection) {
    println!(
        "Range: {} .. {} ({} rows)",
        format_date(inspection.range.start()),
        format_date(inspection.range.end()),
        inspection.rows
    );
    println!();
    println!("{}", inspection.schema);
    println!();
    println!("{}", inspection.sample);
}

fn print_table_text(table: &Table) {
    println!("{table}");
    println!("({} rows)", table.num_rows());
}

fn print_answer_text(answer: &Answer) {
    println!("Query: {}", answer.sql_query);
    println!();
    print_table_text(&answer.results);
    println!();
    println!("{}", answer.explanation);
}
