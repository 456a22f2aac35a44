//! aflux CLI - command-line interface for Activity Flux
//!
//! Commands:
//! - daily: today's goal progress
//! - weekly: weekly chart data and statistics for one metric
//! - set-goal: update a daily goal
//! - profile: show or edit the user profile
//! - summarize: run the pipeline offline on a JSON payload
//! - doctor: diagnose configuration and API reachability

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use activity_flux::config::{FallbackPolicy, RepositoryConfig};
use activity_flux::encoder::DashboardEncoder;
use activity_flux::pipeline::ActivityProcessor;
use activity_flux::presentation::{DailyView, WeeklyView};
use activity_flux::profile::{ProfileDraft, UserProfile};
use activity_flux::retry::RetryPolicy;
use activity_flux::state::ActivityDashboard;
use activity_flux::types::{DataOrigin, MetricKind, Sourced};
use activity_flux::{
    ActivityError, ActivityRepository, ComputeError, FetchError, ReqwestActivityRepository,
    SampleRepository, PRODUCER_NAME, VERSION,
};

/// aflux - activity aggregation and presentation for fitness dashboards
#[derive(Parser)]
#[command(name = "aflux")]
#[command(version = VERSION)]
#[command(about = "Daily goals and weekly activity summaries", long_about = None)]
struct Cli {
    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// API base URL (overrides ACTIVITY_API_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// What to do when a fetch fails (overrides ACTIVITY_FALLBACK)
    #[arg(long, global = true)]
    fallback: Option<FallbackArg>,

    /// Serve built-in sample data instead of calling the API
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show today's goal progress
    Daily,

    /// Show the weekly chart and statistics for a metric
    Weekly {
        #[arg(long, default_value = "steps")]
        metric: MetricKind,
    },

    /// Update a daily goal
    SetGoal {
        #[arg(long)]
        metric: MetricKind,

        /// New goal, must be positive
        #[arg(long)]
        value: f64,
    },

    /// Show the user profile, or edit it when any field is given
    Profile {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        age: Option<String>,
        /// Height in cm
        #[arg(long)]
        height: Option<String>,
        /// Weight in kg
        #[arg(long)]
        weight: Option<String>,
        #[arg(long)]
        step_goal: Option<String>,
        #[arg(long)]
        calorie_goal: Option<String>,
        #[arg(long)]
        notifications: Option<bool>,
    },

    /// Run the pipeline on a daily or weekly payload without calling the API
    Summarize {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long, default_value = "daily")]
        kind: PayloadKind,

        /// Metric for weekly payloads
        #[arg(long, default_value = "steps")]
        metric: MetricKind,
    },

    /// Diagnose configuration and API health
    Doctor {
        /// Also try to fetch from the API
        #[arg(long)]
        ping: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text
    Text,
    /// Compact JSON
    Json,
    /// Pretty-printed JSON
    JsonPretty,
}

#[derive(Clone, Copy, ValueEnum)]
enum PayloadKind {
    Daily,
    Weekly,
}

#[derive(Clone, Copy, ValueEnum)]
enum FallbackArg {
    Substitute,
    Propagate,
}

impl From<FallbackArg> for FallbackPolicy {
    fn from(arg: FallbackArg) -> Self {
        match arg {
            FallbackArg::Substitute => FallbackPolicy::Substitute,
            FallbackArg::Propagate => FallbackPolicy::Propagate,
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => return report(AfluxCliError::Io(e)),
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => report(e),
    }
}

fn report(e: AfluxCliError) -> ExitCode {
    eprintln!(
        "{}",
        serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string())
    );
    ExitCode::FAILURE
}

/// Log to stderr so stdout stays machine-readable. `RUST_LOG` sets the filter.
fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .compact()
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<RepositoryConfig, AfluxCliError> {
    let base_url = cli.base_url.clone();
    let config = RepositoryConfig::from_env_with(|key| match key {
        "ACTIVITY_API_BASE_URL" if base_url.is_some() => base_url.clone(),
        _ => std::env::var(key).ok(),
    })?;

    Ok(match cli.fallback {
        Some(arg) => RepositoryConfig {
            fallback: arg.into(),
            ..config
        },
        None => config,
    })
}

async fn run(cli: Cli) -> Result<(), AfluxCliError> {
    match &cli.command {
        Commands::Summarize {
            input,
            kind,
            metric,
        } => return cmd_summarize(input, *kind, *metric, cli.format),
        Commands::Doctor { ping } => return cmd_doctor(&cli, *ping).await,
        _ => {}
    }

    let config = load_config(&cli)?;
    if cli.offline {
        let today = chrono::Local::now().date_naive();
        let dashboard = ActivityDashboard::new(SampleRepository::new(today), config.fallback);
        run_with_dashboard(dashboard, &cli).await
    } else {
        let repository = ReqwestActivityRepository::new(&config)?;
        let dashboard = ActivityDashboard::new(repository, config.fallback);
        run_with_dashboard(dashboard, &cli).await
    }
}

async fn run_with_dashboard<R: ActivityRepository + 'static>(
    mut dashboard: ActivityDashboard<R>,
    cli: &Cli,
) -> Result<(), AfluxCliError> {
    match &cli.command {
        Commands::Daily => {
            dashboard.refresh_daily().await;
            if let Some(e) = dashboard.daily().error() {
                return Err(e.clone().into());
            }
            let view = dashboard.daily_view()?.ok_or(AfluxCliError::NoData)?;
            print_dashboard(Some(&view), None, cli.format)
        }

        Commands::Weekly { metric } => {
            dashboard.select_metric(*metric);
            dashboard.refresh_weekly().await;
            if let Some(e) = dashboard.weekly().error() {
                return Err(e.clone().into());
            }
            let view = dashboard.weekly_view()?.ok_or(AfluxCliError::NoData)?;
            print_dashboard(None, Some(&view), cli.format)
        }

        Commands::SetGoal { metric, value } => {
            dashboard.update_goal(*metric, *value).await?;
            match cli.format {
                OutputFormat::Text => println!("{} goal set to {}", metric.display_name(), value),
                _ => print_json(
                    &serde_json::json!({ "type": metric, "value": value, "updated": true }),
                    cli.format,
                )?,
            }
            Ok(())
        }

        Commands::Profile {
            name,
            age,
            height,
            weight,
            step_goal,
            calorie_goal,
            notifications,
        } => {
            dashboard.refresh_profile().await;
            if let Some(e) = dashboard.profile().error() {
                return Err(e.clone().into());
            }

            let draft = ProfileDraft {
                name: name.clone(),
                age: age.clone(),
                height: height.clone(),
                weight: weight.clone(),
                step_goal: step_goal.clone(),
                calorie_goal: calorie_goal.clone(),
                notifications: *notifications,
            };

            let shown = if draft == ProfileDraft::default() {
                dashboard
                    .profile()
                    .data()
                    .cloned()
                    .ok_or(AfluxCliError::NoData)?
            } else {
                Sourced::live(dashboard.save_profile(&draft).await?)
            };
            print_profile(&shown, cli.format)
        }

        Commands::Summarize { .. } | Commands::Doctor { .. } => Ok(()),
    }
}

fn cmd_summarize(
    input: &Path,
    kind: PayloadKind,
    metric: MetricKind,
    format: OutputFormat,
) -> Result<(), AfluxCliError> {
    let raw = if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(input)?
    };

    if raw.trim().is_empty() {
        return Err(AfluxCliError::NoData);
    }

    let processor = ActivityProcessor::new();
    match kind {
        PayloadKind::Daily => {
            let view = Sourced::live(processor.daily_view(&raw)?);
            print_dashboard(Some(&view), None, format)
        }
        PayloadKind::Weekly => {
            let view = Sourced::live(processor.weekly_view(&raw, metric)?);
            print_dashboard(None, Some(&view), format)
        }
    }
}

async fn cmd_doctor(cli: &Cli, ping: bool) -> Result<(), AfluxCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "version".to_string(),
        status: CheckStatus::Ok,
        message: format!("{PRODUCER_NAME} {VERSION}"),
    });

    match load_config(cli) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "base URL {}, timeout {}s, {} retries",
                    config.base_url,
                    config.timeout.as_secs(),
                    config.max_retries
                ),
            });
            checks.push(DoctorCheck {
                name: "fallback".to_string(),
                status: match config.fallback {
                    FallbackPolicy::Substitute => CheckStatus::Warning,
                    FallbackPolicy::Propagate => CheckStatus::Ok,
                },
                message: match config.fallback {
                    FallbackPolicy::Substitute => {
                        "fetch failures show sample data marked as fallback".to_string()
                    }
                    FallbackPolicy::Propagate => "fetch failures are reported".to_string(),
                },
            });

            if ping {
                checks.push(ping_api(&config).await);
            }
        }
        Err(e) => checks.push(DoctorCheck {
            name: "config".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        }),
    }

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        "stdin is a TTY (use --input FILE with summarize)"
    } else {
        "stdin is a pipe (summarize --input - ready)"
    };
    checks.push(DoctorCheck {
        name: "stdin".to_string(),
        status: CheckStatus::Ok,
        message: stdin_check.to_string(),
    });

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: VERSION.to_string(),
        checks,
    };

    match cli.format {
        OutputFormat::Text => {
            println!("aflux Doctor Report");
            println!("===================");
            println!("Producer: {}", report.producer);
            println!("Version:  {}", report.version);
            println!("\nChecks:");
            for check in &report.checks {
                let status_icon = match check.status {
                    CheckStatus::Ok => "[OK]",
                    CheckStatus::Warning => "[WARN]",
                    CheckStatus::Error => "[ERR]",
                };
                println!("  {} {}: {}", status_icon, check.name, check.message);
            }
        }
        format => print_json(&report, format)?,
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(AfluxCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

async fn ping_api(config: &RepositoryConfig) -> DoctorCheck {
    let result = match ReqwestActivityRepository::new(config) {
        Ok(repo) => {
            repo.with_retry(RetryPolicy::none())
                .get_daily_activity()
                .await
        }
        Err(e) => Err(e),
    };
    match result {
        Ok(_) => DoctorCheck {
            name: "api".to_string(),
            status: CheckStatus::Ok,
            message: format!("{}/daily-activity responded", config.base_url),
        },
        Err(e) => DoctorCheck {
            name: "api".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    }
}

// Output

fn print_json<T: serde::Serialize>(value: &T, format: OutputFormat) -> Result<(), AfluxCliError> {
    let out = match format {
        OutputFormat::JsonPretty => serde_json::to_string_pretty(value)?,
        _ => serde_json::to_string(value)?,
    };
    println!("{out}");
    Ok(())
}

fn print_dashboard(
    daily: Option<&Sourced<DailyView>>,
    weekly: Option<&Sourced<WeeklyView>>,
    format: OutputFormat,
) -> Result<(), AfluxCliError> {
    match format {
        OutputFormat::Text => {
            if let Some(daily) = daily {
                print_stale_marker(&daily.origin);
                print_daily_text(&daily.data);
            }
            if let Some(weekly) = weekly {
                print_stale_marker(&weekly.origin);
                print_weekly_text(&weekly.data);
            }
            Ok(())
        }
        format => {
            let payload = DashboardEncoder::new().encode(daily, weekly)?;
            print_json(&payload, format)
        }
    }
}

fn print_stale_marker(origin: &DataOrigin) {
    if let DataOrigin::Fallback { reason } = origin {
        println!("[STALE] showing sample data: {reason}");
    }
}

fn print_daily_text(view: &DailyView) {
    println!("Today's Activity ({})", view.date.format("%a, %b %-d"));
    println!(
        "  Steps: {} / {} ({}%), {} to go",
        view.step_progress.steps,
        view.step_progress.goal,
        view.step_progress.percentage,
        view.step_progress.remaining
    );
    println!();
    for card in &view.cards {
        println!("  {:<12} {} {}", card.title, card.value, card.unit);
    }
    println!();
    println!("Daily Goals ({} completed)", view.score_label);
    for goal in &view.goals {
        let mark = if goal.completed { "[x]" } else { "[ ]" };
        println!("  {mark} {:<15} {}", goal.name, goal.values_label);
    }
}

fn print_weekly_text(view: &WeeklyView) {
    println!("{}", view.chart.title);
    for (label, tick) in view.chart.series.labels.iter().zip(&view.chart.y_labels) {
        println!("  {label:<4} {tick:>8}{}", view.chart.y_axis_suffix);
    }
    println!();
    println!("Weekly Summary");
    println!("  Total:    {}", view.summary.total);
    println!("  Average:  {}", view.summary.average);
    println!(
        "  Best Day: {} ({})",
        view.summary.best_day, view.summary.best_day_label
    );
    println!("  Min:      {}", view.summary.min);
}

fn print_profile(profile: &Sourced<UserProfile>, format: OutputFormat) -> Result<(), AfluxCliError> {
    match format {
        OutputFormat::Text => {
            print_stale_marker(&profile.origin);
            let p = &profile.data;
            println!("{} (id {})", p.name, p.id);
            println!("  Age:    {}", p.age);
            println!("  Height: {} cm", p.height_cm);
            println!("  Weight: {} kg", p.weight_kg);
            println!("Goals");
            for metric in MetricKind::ALL {
                println!("  {:<15} {}", metric.display_name(), p.goals.get(metric));
            }
            println!(
                "Notifications: {}",
                if p.preferences.notifications { "on" } else { "off" }
            );
            Ok(())
        }
        format => print_json(profile, format),
    }
}

// Error types

#[derive(Debug)]
enum AfluxCliError {
    Io(io::Error),
    Compute(ComputeError),
    Fetch(FetchError),
    Json(serde_json::Error),
    NoData,
    DoctorFailed,
}

impl std::fmt::Display for AfluxCliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AfluxCliError::Io(e) => write!(f, "{e}"),
            AfluxCliError::Compute(e) => write!(f, "{e}"),
            AfluxCliError::Fetch(e) => write!(f, "{e}"),
            AfluxCliError::Json(e) => write!(f, "{e}"),
            AfluxCliError::NoData => write!(f, "no data available"),
            AfluxCliError::DoctorFailed => write!(f, "one or more health checks failed"),
        }
    }
}

impl From<io::Error> for AfluxCliError {
    fn from(e: io::Error) -> Self {
        AfluxCliError::Io(e)
    }
}

impl From<ComputeError> for AfluxCliError {
    fn from(e: ComputeError) -> Self {
        AfluxCliError::Compute(e)
    }
}

impl From<FetchError> for AfluxCliError {
    fn from(e: FetchError) -> Self {
        AfluxCliError::Fetch(e)
    }
}

impl From<ActivityError> for AfluxCliError {
    fn from(e: ActivityError) -> Self {
        match e {
            ActivityError::Compute(e) => AfluxCliError::Compute(e),
            ActivityError::Fetch(e) => AfluxCliError::Fetch(e),
        }
    }
}

impl From<serde_json::Error> for AfluxCliError {
    fn from(e: serde_json::Error) -> Self {
        AfluxCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<AfluxCliError> for CliError {
    fn from(e: AfluxCliError) -> Self {
        let message = e.to_string();
        let (code, hint) = match &e {
            AfluxCliError::Io(_) => ("IO_ERROR", Some("Check file paths and permissions")),
            AfluxCliError::Compute(ComputeError::InvalidGoal(_)) => {
                ("INVALID_GOAL", Some("Goals must be positive numbers"))
            }
            AfluxCliError::Compute(ComputeError::EmptyInput(_)) => {
                ("EMPTY_INPUT", Some("The weekly payload has no days"))
            }
            AfluxCliError::Compute(_) => (
                "PARSE_ERROR",
                Some("Ensure input matches the daily or weekly activity payload"),
            ),
            AfluxCliError::Fetch(FetchError::Config(_)) => (
                "CONFIG_ERROR",
                Some("Check ACTIVITY_API_* environment variables"),
            ),
            AfluxCliError::Fetch(FetchError::Network(_)) => (
                "NETWORK_ERROR",
                Some("Is the API reachable? Try --offline or --fallback substitute"),
            ),
            AfluxCliError::Fetch(FetchError::Server { .. }) => {
                ("SERVER_ERROR", Some("Run 'aflux doctor --ping' for details"))
            }
            AfluxCliError::Fetch(FetchError::Decode(_)) => {
                ("DECODE_ERROR", Some("The API returned an unexpected payload"))
            }
            AfluxCliError::Json(_) => ("JSON_ERROR", Some("Check JSON syntax")),
            AfluxCliError::NoData => ("NO_DATA", Some("Ensure the input is not empty")),
            AfluxCliError::DoctorFailed => {
                ("DOCTOR_FAILED", Some("Review the doctor report for details"))
            }
        };
        CliError {
            code: code.to_string(),
            message,
            hint: hint.map(str::to_string),
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
