//! Top-level CLI definition and dispatch.

use std::fs;
use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::json;
use signal_hook::consts::{SIGINT, SIGTERM};
use thiserror::Error;

use care_flow_monitor::core::config::Config;
use care_flow_monitor::core::errors::FlowError;
use care_flow_monitor::domain::{Severity, TimeRange, UpdateType};
use care_flow_monitor::engine::triage::{RESOLUTION_FAILED_TITLE, RESOLVED_TITLE};
use care_flow_monitor::engine::panels::{
    ConflictsPanel, DetailPanel, HistoryPanel, conflicts_panel, detail_panel, history_panel,
};
use care_flow_monitor::engine::{
    FlowMonitor, FlowMonitorModel, FlowMsg, ModelSettings, MonitorParts, ThreadTimerDriver, View,
};
use care_flow_monitor::flow::geometry::Point;
use care_flow_monitor::flow::render::render;
use care_flow_monitor::flow::style::StyleRegistry;
use care_flow_monitor::flow::surface::{SvgSurface, replay};
use care_flow_monitor::logger::jsonl::ActivityLog;
use care_flow_monitor::notify::{Notice, NotificationManager, NotificationSink, RecordingSink};
use care_flow_monitor::providers::{Providers, SnapshotProvider};

/// Upper bound on one fetch cycle or resolve round-trip.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(30);
/// Poll period of the watch loop while waiting for ticks and signals.
const WATCH_POLL: Duration = Duration::from_millis(200);

/// Care Flow Monitor: entity flow, update history and conflict triage.
#[derive(Debug, Parser)]
#[command(
    name = "cfm",
    author,
    version,
    about = "Care Flow Monitor - entity flow and conflict triage",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Read snapshots from this directory instead of the configured one.
    #[arg(long, global = true, value_name = "DIR")]
    snapshot_dir: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run one fetch cycle and render the flow diagram as SVG.
    Render(RenderArgs),
    /// Summarize entities, updates and conflicts.
    Status(RangeArgs),
    /// Hit-test a canvas point and show the entity detail panel.
    Hit(HitArgs),
    /// Show the update history.
    History(HistoryArgs),
    /// Show active data conflicts.
    Conflicts(EntityArgs),
    /// Resolve a conflict and refetch.
    Resolve(ResolveArgs),
    /// Auto-refresh and print one status line per cycle.
    Watch(WatchArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct RangeArgs {
    /// Time range: 1h, 24h, 7d or 30d (default from config).
    #[arg(long, value_name = "RANGE")]
    range: Option<TimeRange>,
}

#[derive(Debug, Clone, Args, Default)]
struct RenderArgs {
    #[command(flatten)]
    range: RangeArgs,
    /// Highlight this entity.
    #[arg(long, value_name = "ID")]
    select: Option<String>,
    /// Write the SVG here instead of stdout.
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct HitArgs {
    #[command(flatten)]
    range: RangeArgs,
    /// Canvas x coordinate.
    #[arg(long, allow_hyphen_values = true)]
    x: f64,
    /// Canvas y coordinate.
    #[arg(long, allow_hyphen_values = true)]
    y: f64,
}

#[derive(Debug, Clone, Args, Default)]
struct EntityArgs {
    #[command(flatten)]
    range: RangeArgs,
    /// Only records involving this entity.
    #[arg(long, value_name = "ID")]
    entity: Option<String>,
}

#[derive(Debug, Clone, Args, Default)]
struct HistoryArgs {
    #[command(flatten)]
    filter: EntityArgs,
    /// Expand every card into its field diff.
    #[arg(long)]
    expand: bool,
}

#[derive(Debug, Clone, Args)]
struct ResolveArgs {
    #[command(flatten)]
    range: RangeArgs,
    /// Conflict to resolve.
    conflict_id: String,
    /// Resolution option id offered by the conflict.
    #[arg(long, value_name = "ID")]
    option: Option<String>,
}

#[derive(Debug, Clone, Args, Default)]
struct WatchArgs {
    #[command(flatten)]
    range: RangeArgs,
    /// Refresh interval in seconds (default from config).
    #[arg(long, value_name = "SECONDS")]
    interval: Option<u64>,
    /// Stop after this many completed cycles.
    #[arg(long, value_name = "N")]
    cycles: Option<u64>,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Target shell.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
        }
    }
}

impl From<FlowError> for CliError {
    fn from(error: FlowError) -> Self {
        match error {
            FlowError::InvalidConfig { .. }
            | FlowError::MissingConfig { .. }
            | FlowError::ConfigParse { .. }
            | FlowError::UnknownConflict { .. } => Self::User(error.to_string()),
            FlowError::ChannelClosed { .. } => Self::Internal(error.to_string()),
            _ => Self::Runtime(error.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Render(args) => run_render(cli, args),
        Command::Status(args) => run_status(cli, args),
        Command::Hit(args) => run_hit(cli, args),
        Command::History(args) => run_history(cli, args),
        Command::Conflicts(args) => run_conflicts(cli, args),
        Command::Resolve(args) => run_resolve(cli, args),
        Command::Watch(args) => run_watch(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── session ────────────────────

/// Journal/file channels plus an in-memory copy the CLI can inspect.
struct CliSink {
    manager: NotificationManager,
    recorded: RecordingSink,
}

impl NotificationSink for CliSink {
    fn notify(&self, notice: &Notice) {
        self.manager.notify(notice);
        self.recorded.notify(notice);
    }
}

struct Session {
    config: Config,
    monitor: FlowMonitor,
    notices: RecordingSink,
}

impl Session {
    fn open(cli: &Cli, range: &RangeArgs) -> Result<Self, CliError> {
        let config = Config::load(cli.config.as_deref())?;
        let snapshot_dir = cli
            .snapshot_dir
            .clone()
            .unwrap_or_else(|| config.paths.snapshot_dir.clone());

        let mut settings = ModelSettings::from(&config);
        if let Some(range) = range.range {
            settings.time_range = range;
        }
        // Watch enables auto-refresh explicitly; one-shot commands never do.
        settings.auto_refresh = false;

        let notices = RecordingSink::new();
        let sink = CliSink {
            manager: NotificationManager::from_config(&config.notifications),
            recorded: notices.clone(),
        };
        let monitor = FlowMonitor::new(MonitorParts {
            providers: Providers::from_single(Arc::new(SnapshotProvider::new(snapshot_dir))),
            settings,
            sink: Arc::new(sink),
            log: ActivityLog::open(&config.paths.activity_log),
            timer_driver: Box::new(ThreadTimerDriver),
        });
        Ok(Self {
            config,
            monitor,
            notices,
        })
    }

    /// Open and run the first fetch cycle. A failed cycle is a runtime error.
    fn load(cli: &Cli, range: &RangeArgs) -> Result<Self, CliError> {
        let mut session = Self::open(cli, range)?;
        session.dispatch_and_settle(FlowMsg::Init)?;
        if let Some(banner) = &session.monitor.model().error {
            return Err(CliError::Runtime(banner.clone()));
        }
        Ok(session)
    }

    fn dispatch_and_settle(&mut self, msg: FlowMsg) -> Result<(), CliError> {
        self.monitor.dispatch(msg)?;
        self.monitor.settle(SETTLE_TIMEOUT)?;
        Ok(())
    }

    /// Select `entity_id` regardless of how crowded the ring is.
    fn select(&mut self, entity_id: &str) -> Result<(), CliError> {
        if !self.monitor.model().frame.contains(entity_id) {
            return Err(CliError::User(format!("unknown entity: {entity_id}")));
        }
        self.monitor.dispatch(FlowMsg::Select(entity_id.to_string()))?;
        Ok(())
    }

    /// Move to `view`, through the detail-panel shortcut when filtering.
    /// Returns the info notice when the shortcut found nothing.
    fn open_view(&mut self, view: View, entity: Option<&str>) -> Result<Option<Notice>, CliError> {
        let Some(entity_id) = entity else {
            self.monitor.dispatch(FlowMsg::SelectView(view))?;
            return Ok(None);
        };
        self.select(entity_id)?;
        self.notices.clear();
        let shortcut = match view {
            View::History => FlowMsg::ShowEntityHistory,
            View::Conflicts => FlowMsg::ShowEntityConflicts,
            View::Flow => FlowMsg::SelectView(View::Flow),
        };
        self.monitor.dispatch(shortcut)?;
        if self.monitor.model().view == view {
            Ok(None)
        } else {
            Ok(self.notices.notices().pop())
        }
    }
}

// ──────────────────── commands ────────────────────

fn run_render(cli: &Cli, args: &RenderArgs) -> Result<(), CliError> {
    let mut session = Session::load(cli, &args.range)?;
    if let Some(id) = &args.select {
        session.select(id)?;
    }

    let model = session.monitor.model();
    let options = session.config.render_options();
    let commands = render(
        &model.frame,
        model.selected.as_deref(),
        &options,
        StyleRegistry,
    );

    if output_mode(cli) == OutputMode::Json && args.out.is_none() {
        println!("{}", serde_json::to_string_pretty(&commands)?);
        return Ok(());
    }

    let mut surface = SvgSurface::new(options.geometry.width, options.geometry.height);
    replay(&commands, &mut surface);
    let svg = surface.finish();

    match &args.out {
        Some(path) => {
            fs::write(path, svg)?;
            match output_mode(cli) {
                OutputMode::Json => println!(
                    "{}",
                    json!({
                        "out": path,
                        "entities": model.frame.entities().len(),
                        "draw_commands": commands.len(),
                    })
                ),
                OutputMode::Human => println!(
                    "Rendered {} entities ({} draw commands) to {}",
                    model.frame.entities().len(),
                    commands.len(),
                    path.display()
                ),
            }
        }
        None => print!("{svg}"),
    }
    Ok(())
}

fn run_status(cli: &Cli, args: &RangeArgs) -> Result<(), CliError> {
    let session = Session::load(cli, args)?;
    let model = session.monitor.model();
    let conflicts = conflicts_panel(model);

    match output_mode(cli) {
        OutputMode::Json => {
            let payload = json!({
                "time_range": model.time_range(),
                "entities": model.frame.entities().len(),
                "relations": model.frame.relations().len(),
                "updates": model.summary,
                "conflicts": conflicts.counts,
                "config_hash": session.config.stable_hash()?,
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        OutputMode::Human => {
            let range = model.time_range();
            println!("Care Flow Monitor: {} ({range})", range.label());
            println!(
                "  Entities:  {}   Relations: {}",
                model.frame.entities().len(),
                model.frame.relations().len()
            );
            let by_type = |t: UpdateType| model.summary.by_type.get(&t).copied().unwrap_or(0);
            println!(
                "  Updates:   {} (created {}, modified {}, deleted {})",
                model.summary.total,
                by_type(UpdateType::Create),
                by_type(UpdateType::Modify),
                by_type(UpdateType::Delete)
            );
            println!(
                "  Conflicts: {} ({} {}, {} {}, {} {})",
                conflicts.counts.total(),
                conflicts.counts.high,
                severity_label(Severity::High),
                conflicts.counts.medium,
                severity_label(Severity::Medium),
                conflicts.counts.low,
                severity_label(Severity::Low)
            );
        }
    }
    Ok(())
}

fn run_hit(cli: &Cli, args: &HitArgs) -> Result<(), CliError> {
    let mut session = Session::load(cli, &args.range)?;
    session
        .monitor
        .dispatch(FlowMsg::Click(Point::new(args.x, args.y)))?;
    let panel = detail_panel(session.monitor.model());

    match output_mode(cli) {
        OutputMode::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "x": args.x, "y": args.y, "hit": panel }))?
            );
        }
        OutputMode::Human => match panel {
            Some(panel) => print_detail(&panel),
            None => println!("No entity at ({}, {}).", args.x, args.y),
        },
    }
    Ok(())
}

fn run_history(cli: &Cli, args: &HistoryArgs) -> Result<(), CliError> {
    let mut session = Session::load(cli, &args.filter.range)?;
    if let Some(notice) = session.open_view(View::History, args.filter.entity.as_deref())? {
        return print_notice(cli, &notice);
    }
    if args.expand {
        let ids: Vec<String> = history_panel(session.monitor.model())
            .cards
            .into_iter()
            .filter(|c| c.expandable)
            .map(|c| c.update_id)
            .collect();
        for id in ids {
            session.monitor.dispatch(FlowMsg::ToggleUpdate(id))?;
        }
    }

    let panel = history_panel(session.monitor.model());
    match output_mode(cli) {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(&panel)?),
        OutputMode::Human => print_history(&panel),
    }
    Ok(())
}

fn run_conflicts(cli: &Cli, args: &EntityArgs) -> Result<(), CliError> {
    let mut session = Session::load(cli, &args.range)?;
    if let Some(notice) = session.open_view(View::Conflicts, args.entity.as_deref())? {
        return print_notice(cli, &notice);
    }
    let panel = conflicts_panel(session.monitor.model());
    match output_mode(cli) {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(&panel)?),
        OutputMode::Human => print_conflicts(&panel),
    }
    Ok(())
}

fn run_resolve(cli: &Cli, args: &ResolveArgs) -> Result<(), CliError> {
    let mut session = Session::load(cli, &args.range)?;
    if session.monitor.model().conflict(&args.conflict_id).is_none() {
        return Err(FlowError::UnknownConflict {
            conflict_id: args.conflict_id.clone(),
        }
        .into());
    }

    session.notices.clear();
    session.dispatch_and_settle(FlowMsg::Resolve {
        conflict_id: args.conflict_id.clone(),
        option: args.option.clone(),
    })?;

    let notices = session.notices.notices();
    let Some(outcome) = notices
        .iter()
        .find(|n| n.title == RESOLVED_TITLE || n.title == RESOLUTION_FAILED_TITLE)
    else {
        return Err(CliError::Internal(
            "resolve finished without an outcome notice".to_string(),
        ));
    };
    if outcome.title == RESOLUTION_FAILED_TITLE {
        return Err(FlowError::Resolution {
            conflict_id: args.conflict_id.clone(),
            details: outcome.message.clone(),
        }
        .into());
    }

    let remaining = remaining_after_refetch(session.monitor.model(), &args.conflict_id)?;
    match output_mode(cli) {
        OutputMode::Json => println!(
            "{}",
            serde_json::to_string_pretty(&json!({
                "resolved": args.conflict_id,
                "option": args.option,
                "remaining_conflicts": remaining,
            }))?
        ),
        OutputMode::Human => {
            println!("{} {}", "✓".green(), outcome.message);
            println!("  {remaining} conflicts remain after refetch.");
        }
    }
    Ok(())
}

/// Conflicts left after the post-resolve refetch. A failed refetch leaves the
/// previous conflict list in place, so there is no count to report.
fn remaining_after_refetch(
    model: &FlowMonitorModel,
    conflict_id: &str,
) -> Result<usize, CliError> {
    match &model.error {
        Some(banner) => Err(CliError::Runtime(format!(
            "resolved {conflict_id} but refetch failed: {banner}"
        ))),
        None => Ok(model.conflicts.len()),
    }
}

fn run_watch(cli: &Cli, args: &WatchArgs) -> Result<(), CliError> {
    let mut session = Session::open(cli, &args.range)?;
    let interval = args
        .interval
        .unwrap_or(session.config.refresh.interval_secs);
    if interval == 0 {
        return Err(CliError::User("--interval must be greater than zero".to_string()));
    }
    if args.cycles == Some(0) {
        return Ok(());
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [SIGINT, SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, Arc::clone(&shutdown)) {
            eprintln!("[CFM-SIGNAL] failed to register signal {signal}: {e}");
        }
    }

    session.monitor.dispatch(FlowMsg::Init)?;
    session
        .monitor
        .dispatch(FlowMsg::EnableAuto(Duration::from_secs(interval)))?;

    let mut reported = 0;
    while !shutdown.load(Ordering::Relaxed) {
        session.monitor.wait_next(WATCH_POLL)?;
        let completed = session.monitor.model().cycles.completed();
        if completed > reported {
            reported = completed;
            print_watch_line(cli, &session, reported)?;
            if args.cycles.is_some_and(|limit| reported >= limit) {
                break;
            }
        }
    }

    session.monitor.dispatch(FlowMsg::DisableAuto)?;
    session.monitor.shutdown();
    Ok(())
}

// ──────────────────── output ────────────────────

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("CFM_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}

fn severity_label(severity: Severity) -> String {
    let tag = severity.tag().to_uppercase();
    match severity {
        Severity::High => tag.red().bold().to_string(),
        Severity::Medium => tag.yellow().to_string(),
        Severity::Low => tag.normal().to_string(),
    }
}

fn print_notice(cli: &Cli, notice: &Notice) -> Result<(), CliError> {
    match output_mode(cli) {
        OutputMode::Json => println!("{}", serde_json::to_string_pretty(notice)?),
        OutputMode::Human => println!("{}: {}", notice.title.bold(), notice.message),
    }
    Ok(())
}

fn print_detail(panel: &DetailPanel) {
    println!("{} ({})", panel.name.bold(), panel.type_label);
    println!("  ID:           {}", panel.id);
    println!("  Updates:      {}", panel.update_count);
    println!("  Last update:  {}", panel.last_update);
    let status = if panel.has_conflict {
        panel.conflict_status().red().to_string()
    } else {
        panel.conflict_status().green().to_string()
    };
    println!("  Status:       {status}");
}

fn print_history(panel: &HistoryPanel) {
    if let Some(empty) = &panel.empty {
        println!("{}", empty.message);
        return;
    }
    println!("{} updates", panel.summary.total);
    for card in &panel.cards {
        println!(
            "\n[{}] {} ({}) by {} at {}",
            card.update_type,
            card.entity_name.bold(),
            card.entity_type,
            card.user,
            card.timestamp
        );
        if let Some(description) = &card.description {
            println!("  {description}");
        }
        if card.expanded {
            println!("  {:<20}  {:<20}  {:<20}", "Field", "Previous", "New");
            println!("  {}", "-".repeat(64));
            for row in &card.diff {
                println!("  {:<20}  {:<20}  {:<20}", row.field, row.previous, row.new);
            }
        } else if card.expandable {
            println!("  {}", "(changes available, use --expand)".dimmed());
        }
    }
}

fn print_conflicts(panel: &ConflictsPanel) {
    if let Some(empty) = &panel.empty {
        println!("{} {}", "✓".green(), empty.message.green());
        return;
    }
    println!(
        "{} conflicts ({} high, {} medium, {} low)",
        panel.counts.total(),
        panel.counts.high,
        panel.counts.medium,
        panel.counts.low
    );
    for item in &panel.items {
        println!(
            "\n[{}] {} ({})",
            severity_label(item.severity),
            item.title.bold(),
            item.id
        );
        println!("  {}", item.between);
        println!("  {} detected {}", item.kind, item.detected_at);
        if !item.description.is_empty() {
            println!("  {}", item.description);
        }
        for (id, label) in &item.options {
            println!("    option {id}: {label}");
        }
    }
}

fn print_watch_line(cli: &Cli, session: &Session, cycle: u64) -> Result<(), CliError> {
    let model = session.monitor.model();
    let counts = conflicts_panel(model).counts;
    match output_mode(cli) {
        OutputMode::Json => println!(
            "{}",
            serde_json::to_string(&json!({
                "cycle": cycle,
                "time_range": model.time_range(),
                "entities": model.frame.entities().len(),
                "updates": model.summary.total,
                "conflicts": counts,
                "error": model.error,
            }))?
        ),
        OutputMode::Human => match &model.error {
            Some(banner) => println!("#{cycle} {}", banner.red()),
            None => println!(
                "#{cycle} {} entities, {} updates, {} conflicts ({} high)",
                model.frame.entities().len(),
                model.summary.total,
                counts.total(),
                counts.high
            ),
        },
    }
    Ok(())
}
