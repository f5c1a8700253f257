use clap::{Parser, ValueEnum};
use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{Level, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod conditions;
mod controller;
mod domain;
mod inputter;
mod model;
mod record;
mod source;
mod ui;
mod viewmodel;

use conditions::{AgencyCondition, Condition, GeneratedBonus};
use controller::Controller;
use domain::{AppConfig, ConsoleError, ViewConfig};
use model::{Model, Status};
use source::{FileSource, FromPayload};
use ui::TableUI;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum View {
    /// Condition groups per development
    Conditions,
    /// Conditions per agency
    AgencyConditions,
    /// Bonuses generated by the system
    Bonuses,
}

/// Browse and manage bonus conditions from a backend snapshot file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Snapshot file (csv, parquet or arrow)
    path: String,

    /// Record shape of the snapshot
    #[arg(long, value_enum, default_value_t = View::Conditions)]
    view: View,

    /// Only show the agency conditions of this condition group
    #[arg(long)]
    group: Option<i64>,

    /// Rows per page to start with
    #[arg(long, default_value_t = 5)]
    page_size: usize,

    /// Page sizes to cycle through
    #[arg(long, value_delimiter = ',', default_values_t = [5, 10, 25])]
    page_sizes: Vec<usize>,

    /// Upper bound for rendered column widths
    #[arg(long, default_value_t = 40)]
    max_column_width: usize,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<String>,

    /// More verbose logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    let result = init_logging(&args).and_then(|_| run(args));
    ratatui::restore();
    match result {
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn expand(path: &str) -> Result<PathBuf, ConsoleError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| ConsoleError::LoadingFailed(e.to_string()))
}

// The terminal belongs to the UI, so logs only go to a file.
fn init_logging(args: &Args) -> Result<(), ConsoleError> {
    let level = match args.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let file_layer = match &args.log_file {
        Some(path) => {
            let file = File::create(expand(path)?)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn run(args: Args) -> Result<(), ConsoleError> {
    let view = ViewConfig::default()
        .page_sizes(args.page_sizes.clone())
        .default_page_size(args.page_size)
        .validate()?;
    let cfg = AppConfig::default()
        .max_column_width(args.max_column_width)
        .view(view);
    let path = expand(&args.path)?;

    info!("Starting bonitv on {} ({:?})", path.display(), args.view);
    match args.view {
        View::Conditions => run_view::<Condition>(&cfg, path, args.group),
        View::AgencyConditions => run_view::<AgencyCondition>(&cfg, path, args.group),
        View::Bonuses => run_view::<GeneratedBonus>(&cfg, path, args.group),
    }
}

fn run_view<R: FromPayload>(
    cfg: &AppConfig,
    path: PathBuf,
    group: Option<i64>,
) -> Result<(), ConsoleError> {
    let source = FileSource::<R>::open(path)?.scoped_to(group)?;

    let mut terminal = ratatui::init();
    let mut model = Model::init(cfg, source);
    let mut ui = TableUI::new(cfg);
    let controller = Controller::new(cfg);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(model.get_uidata(), f))?;

        // A pending fetch runs right after the loading frame is shown
        let message = if model.status == Status::LOADING {
            None
        } else {
            controller.handle_event(model.raw_keyevents())?
        };
        model.update(message)?;
    }

    info!("Quitting bonitv");
    Ok(())
}
