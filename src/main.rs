use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use clap::{Args, Parser, Subcommand, ValueEnum};

use pipeline_tool_lib::error::{DashboardError, ErrorPayload, LoadError};
use pipeline_tool_lib::explore::{parse_command, ExploreCommand, HELP};
use pipeline_tool_lib::loader::{load_dataset, LoadOptions};
use pipeline_tool_lib::render::{render_dashboard, render_facets};
use pipeline_tool_lib::services::dashboard::DashboardResult;
use pipeline_tool_lib::state::{load_config, AppState};
use pipeline_tool_lib::types::{FacetField, FilterSelection};

#[derive(Parser)]
#[command(name = "pipeline-tool")]
#[command(about = "Filter and summarize a pipeline of opportunities", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Dataset file (.csv, .tsv, .xlsx, .xls, .ods)
    #[arg(short, long, global = true)]
    data: Option<PathBuf>,

    /// Config file (default: ~/.pipeline-tool/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// IANA timezone for naive deadlines and printed dates
    #[arg(long, global = true)]
    timezone: Option<String>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the dashboard for one filter selection
    Dashboard(DashboardArgs),
    /// List the selectable values of every facet
    Facets,
    /// Refine filters interactively; the dashboard is redrawn after each change
    Explore(WindowArgs),
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
struct DashboardArgs {
    #[command(flatten)]
    filters: FilterArgs,

    #[command(flatten)]
    window: WindowArgs,
}

#[derive(Args)]
struct FilterArgs {
    /// Keep only these statuses (repeat or comma-separate)
    #[arg(long, value_delimiter = ',')]
    status: Vec<String>,

    /// Keep only these responsible people
    #[arg(long, value_delimiter = ',')]
    owner: Vec<String>,

    /// Keep only these countries
    #[arg(long, value_delimiter = ',')]
    country: Vec<String>,
}

impl FilterArgs {
    fn selection(&self) -> FilterSelection {
        FilterSelection::new()
            .with(FacetField::Status, &self.status)
            .with(FacetField::Owner, &self.owner)
            .with(FacetField::Country, &self.country)
    }
}

#[derive(Args)]
struct WindowArgs {
    /// Reference time (RFC 3339 or a date); defaults to the current time
    #[arg(long)]
    now: Option<String>,

    /// Upcoming-deadline window in days (default from config, 7)
    #[arg(long)]
    window_days: Option<i64>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match cli.verbose {
        0 => {}
        1 => {
            builder.filter_level(log::LevelFilter::Info);
        }
        _ => {
            builder.filter_level(log::LevelFilter::Debug);
        }
    }
    builder.target(env_logger::Target::Stderr).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err, cli.format);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = load_config(cli.config.as_deref()).map_err(DashboardError::from)?;
    if let Some(tz) = &cli.timezone {
        config.timezone = tz.clone();
    }
    let options = LoadOptions::from_config(&config).map_err(DashboardError::from)?;
    let tz = options.timezone;

    let path = cli
        .data
        .clone()
        .or_else(|| config.dataset_path.as_ref().map(PathBuf::from))
        .ok_or(DashboardError::Load(LoadError::NoDataset))?;
    let dataset = load_dataset(&path, &options).map_err(DashboardError::from)?;
    let state = AppState::new(config, dataset);

    match &cli.command {
        Commands::Dashboard(args) => {
            let (now, window) = resolve_window(&args.window, &state, &tz)?;
            let result = state.dashboard(&args.filters.selection(), now, window);
            print_result(&result, cli.format, &tz)?;
        }
        Commands::Facets => print_facets(&state, cli.format)?,
        Commands::Explore(args) => {
            let (now, window) = resolve_window(args, &state, &tz)?;
            explore(&state, now, window, cli.format, &tz)?;
        }
    }
    Ok(())
}

fn resolve_window(
    args: &WindowArgs,
    state: &AppState,
    tz: &Tz,
) -> Result<(DateTime<Utc>, Duration)> {
    let resolved = state
        .resolve_window(args.now.as_deref(), args.window_days, tz)
        .map_err(DashboardError::from)?;
    Ok(resolved)
}

fn print_result(result: &DashboardResult, format: OutputFormat, tz: &Tz) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render_dashboard(result, tz)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(result)?),
    }
    Ok(())
}

fn print_facets(state: &AppState, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => print!("{}", render_facets(state.dataset())),
        OutputFormat::Json => {
            let facets: BTreeMap<&str, Vec<String>> = FacetField::ALL
                .iter()
                .map(|f| (f.as_str(), state.dataset().facet_options(*f)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&facets)?);
        }
    }
    Ok(())
}

/// Read commands from stdin until `quit` or end of input.
///
/// `now` is fixed for the whole session so repeated selections hit the memo.
fn explore(
    state: &AppState,
    now: DateTime<Utc>,
    window: Duration,
    format: OutputFormat,
    tz: &Tz,
) -> Result<()> {
    let mut selection = FilterSelection::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    println!("{}", HELP);
    print_result(&state.dashboard(&selection, now, window), format, tz)?;

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(message) => {
                eprintln!("{} (type 'help' for commands)", message);
                continue;
            }
        };

        match command {
            ExploreCommand::Quit => break,
            ExploreCommand::Noop => {}
            ExploreCommand::Help => print!("{}", HELP),
            ExploreCommand::Facets => print_facets(state, format)?,
            ExploreCommand::Show => {
                print_result(&state.dashboard(&selection, now, window), format, tz)?
            }
            filter_change => {
                if filter_change.apply_to(&mut selection) {
                    log::info!("Selection changed: {:?}", selection);
                }
                print_result(&state.dashboard(&selection, now, window), format, tz)?;
            }
        }
    }
    Ok(())
}

fn report_error(err: &anyhow::Error, format: OutputFormat) {
    match (err.downcast_ref::<DashboardError>(), format) {
        (Some(known), OutputFormat::Json) => {
            let payload = ErrorPayload::from(known);
            match serde_json::to_string_pretty(&payload) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("Error: {}", known),
            }
        }
        (Some(known), OutputFormat::Text) => {
            eprintln!("Error: {}", known);
            eprintln!("{}", known.recovery_suggestion());
        }
        (None, _) => eprintln!("Error: {:#}", err),
    }
}
