//! Congregate CLI - attendance reports and service-period scheduling.
//!
//! Reads and writes the JSON data snapshot configured in
//! `~/.config/congregate/config.json` (or `CONGREGATE_DATA`).

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use congregate_core::models::{DateWindow, OrgAssignment, PeriodOwner, ServicePeriod, ServicePeriodInput};
use congregate_core::notify::{AnyNotifier, LogNotifier, WebhookNotifier};
use congregate_core::scope::MemberSortColumn;
use congregate_core::store::MemoryStore;
use congregate_core::utils::truncate_string;
use congregate_core::{
    AttendanceReport, Caller, Config, ReportRequest, ReportService, ReportSession, Role,
    ScheduleError, Scheduler, StatusFilter,
};

/// Width of the name column in report tables
const NAME_COLUMN_WIDTH: usize = 24;

#[derive(Parser)]
#[command(name = "congregate", version, about = "Church attendance reports and service-period scheduling")]
struct Cli {
    /// Data snapshot to use instead of the configured one
    #[arg(long, global = true, env = "CONGREGATE_DATA")]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Monthly attendance report for the members visible to a caller
    Report(ReportArgs),
    /// Create, update, delete or list service periods
    #[command(subcommand)]
    Period(PeriodCommand),
    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// Also write the effective configuration to the config file
    #[arg(long)]
    write: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Name,
    Created,
}

#[derive(Args)]
struct ReportArgs {
    /// Role of the caller (administrator, tribe-manager, department-manager, honor-family-manager)
    #[arg(long)]
    role: String,
    /// Member id of the caller
    #[arg(long)]
    member_id: i64,
    #[arg(long)]
    from: NaiveDate,
    #[arg(long)]
    to: NaiveDate,
    /// ALL, NEW or OLD
    #[arg(long, default_value = "all")]
    status: StatusFilter,
    #[arg(long, default_value = "")]
    query: String,
    #[arg(long)]
    take: Option<usize>,
    #[arg(long, value_enum, default_value = "name")]
    sort: SortArg,
    #[arg(long)]
    desc: bool,
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct OwnerArgs {
    #[arg(long)]
    tribe: Option<i64>,
    #[arg(long)]
    department: Option<i64>,
}

impl OwnerArgs {
    fn owner(&self) -> Result<PeriodOwner> {
        match (self.tribe, self.department) {
            (Some(id), None) => Ok(PeriodOwner::Tribe(id)),
            (None, Some(id)) => Ok(PeriodOwner::Department(id)),
            _ => anyhow::bail!("Specify exactly one of --tribe or --department"),
        }
    }
}

#[derive(Subcommand)]
enum PeriodCommand {
    Create {
        #[command(flatten)]
        owner: OwnerArgs,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    Update {
        #[arg(long)]
        id: i64,
        #[command(flatten)]
        owner: OwnerArgs,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
    },
    Delete {
        #[arg(long)]
        id: i64,
    },
    List {
        #[command(flatten)]
        owner: OwnerArgs,
    },
}

/// Initialize the tracing subscriber for logging.
/// Returns the file writer guard, which must live until exit.
fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "congregate.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(path) = cli.data {
        config.data_file = Some(path);
    }

    let _guard = init_tracing(&config);
    info!("Congregate starting");

    let data_path = config.data_path()?;
    let store = Arc::new(
        MemoryStore::open(&data_path)
            .with_context(|| format!("Failed to open data file {}", data_path.display()))?,
    );

    match cli.command {
        Command::Report(args) => run_report(&config, store, args).await,
        Command::Period(command) => run_period(&config, store, command).await,
        Command::Config(args) => {
            if args.write {
                config.save().context("Failed to write config file")?;
                info!(path = %Config::config_path()?.display(), "Configuration written");
            }
            println!("config: {}", Config::config_path()?.display());
            println!("data:   {}", data_path.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn run_report(config: &Config, store: Arc<MemoryStore>, args: ReportArgs) -> Result<()> {
    // The caller's assignment comes from their own member record
    let assignment = store
        .dataset()
        .await
        .members
        .iter()
        .find(|m| m.id == args.member_id)
        .map(|m| m.assignment)
        .unwrap_or_else(OrgAssignment::default);

    let request = ReportRequest {
        caller: Caller {
            member_id: args.member_id,
            role: Role::from_tag(&args.role),
            assignment,
        },
        window: DateWindow::new(args.from, args.to),
        status: args.status,
        query: args.query,
        take: args.take.unwrap_or(config.default_take),
        sort_column: match args.sort {
            SortArg::Name => MemberSortColumn::Name,
            SortArg::Created => MemberSortColumn::Created,
        },
        ascending: !args.desc,
    };

    let service = ReportService::new(store, config.report_settings());
    let report = service
        .attendance_report(&request, &mut ReportSession::new())
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &AttendanceReport) {
    println!(
        "{} of {} members",
        report.views.len(),
        report.total_matching_member_count
    );
    for view in &report.views {
        let marks: String = view
            .occurrences
            .iter()
            .map(|o| match (o.present, o.has_conflict) {
                (Some(true), true) => '*',
                (Some(true), false) => 'P',
                (Some(false), _) => 'A',
                (None, _) => '.',
            })
            .collect();
        let resume = |r: Option<congregate_core::models::MonthlyResume>| {
            r.map(|r| r.display()).unwrap_or_else(|| "-".to_string())
        };
        let regularity = view
            .current_regularity
            .map(|s| s.display_name())
            .unwrap_or("-");
        println!(
            "{:<width$} {:>5} {:>5}  {:<5}  {}",
            truncate_string(&view.member.name, NAME_COLUMN_WIDTH),
            resume(view.previous_resume),
            resume(view.current_resume),
            marks,
            regularity,
            width = NAME_COLUMN_WIDTH
        );
    }
    let b = &report.regularity_breakdown;
    println!(
        "very regular {} | regular {} | medium {} | little {} | absent {} | no data {}",
        b.very_regular, b.regular, b.medium_regular, b.little_regular, b.absent, b.no_data
    );
}

fn notifier(config: &Config) -> Result<AnyNotifier> {
    match &config.webhook_url {
        Some(url) => {
            let mut webhook = WebhookNotifier::new(url.clone())?;
            if let Some(token) = &config.webhook_token {
                webhook = webhook.with_token(token.clone());
            }
            Ok(AnyNotifier::Webhook(webhook))
        }
        None => Ok(AnyNotifier::Log(LogNotifier)),
    }
}

async fn run_period(config: &Config, store: Arc<MemoryStore>, command: PeriodCommand) -> Result<()> {
    let scheduler = Scheduler::new(store, notifier(config)?);

    let result = match command {
        PeriodCommand::Create { owner, from, to } => scheduler
            .create(ServicePeriodInput {
                owner: owner.owner()?,
                window: DateWindow::new(from, to),
            })
            .await
            .map(|p| vec![p]),
        PeriodCommand::Update { id, owner, from, to } => scheduler
            .update(
                id,
                ServicePeriodInput {
                    owner: owner.owner()?,
                    window: DateWindow::new(from, to),
                },
            )
            .await
            .map(|p| vec![p]),
        PeriodCommand::Delete { id } => scheduler.delete(id).await.map(|p| vec![p]),
        PeriodCommand::List { owner } => scheduler.list(owner.owner()?).await,
    };

    match result {
        Ok(periods) => {
            print_periods(&periods);
            Ok(())
        }
        Err(ScheduleError::Validation { field, message }) => {
            anyhow::bail!("Rejected ({}): {}", field, message)
        }
        Err(e) => Err(e.into()),
    }
}

fn print_periods(periods: &[ServicePeriod]) {
    if periods.is_empty() {
        println!("No service periods");
    }
    for period in periods {
        println!("#{:<4} {:<16} {}", period.id, period.owner.to_string(), period.window);
    }
}
