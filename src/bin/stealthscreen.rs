// stealthscreen CLI - Command-line host for the covert display controller
// This binary wires the controller to the system clock, the on-disk record and
// a logging platform, and exposes schedule and settings management.

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDateTime;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::info;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Duration;
use stealthscreen::config;
use stealthscreen::config_file::{load_or_default, ConfigStore, JsonFileStore, MemoryStore};
use stealthscreen::lockout::attempts_since;
use stealthscreen::runtime::{run_event_loop, spawn_stdin_reader};
use stealthscreen::{
    ActivationController, ActivationMethod, ClockSource, GestureSequence, LogPlatform,
    PatternPoint, Repeat, ScheduledActivation, StealthConfig, SystemClock,
};

/// Covert "screen off" mode with long-press, gesture and scheduled control
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Covert blank-screen mode controller",
    long_about = "Covert blank-screen mode controller.

The display looks switched off while the app keeps running. Deactivate with a
long press, a gesture (triple tap, swipe up, shake or a custom pattern), the
back button, or let a schedule end the session.

Repeated tapping and wrong patterns are logged as access attempts. Too many
attempts within a minute lock the controller out for a while.

Configuration is stored at:
  <config dir>/stealthscreen/blank_screen_stealth_config.json

The `schedule` and `set` commands edit the stored record without touching the
display. A running host rewrites the record on its next change, so stop the
host before editing.

ENVIRONMENT:
  STEALTHSCREEN_CONFIG        Path of the configuration record
  STEALTHSCREEN_LONG_PRESS    Long-press hold in seconds (1-10)"
)]
struct Cli {
    /// Path of the configuration record (overrides STEALTHSCREEN_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep the configuration in memory only
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the interactive host, reading commands from stdin
    Run,
    /// Show the stored state
    Status,
    /// List logged access attempts
    Attempts {
        /// Only attempts from the last N seconds
        #[arg(long)]
        since_secs: Option<u32>,
    },
    /// Manage scheduled activations
    #[command(subcommand)]
    Schedule(ScheduleCommand),
    /// Change a setting
    #[command(subcommand)]
    Set(SetCommand),
}

#[derive(Subcommand, Debug)]
enum ScheduleCommand {
    /// Add a schedule
    Add {
        /// Start, "YYYY-MM-DD HH:MM"
        #[arg(long, value_parser = parse_timestamp)]
        start: NaiveDateTime,
        /// End, "YYYY-MM-DD HH:MM"
        #[arg(long, value_parser = parse_timestamp)]
        end: Option<NaiveDateTime>,
        #[arg(long, value_enum, default_value_t = RepeatArg::Once)]
        repeat: RepeatArg,
        /// Weekdays for weekly schedules, 0 = Sunday
        #[arg(long, value_delimiter = ',')]
        days: Vec<u8>,
        /// Day of month for monthly schedules
        #[arg(long)]
        date: Option<u32>,
        #[arg(long)]
        label: Option<String>,
    },
    /// List schedules
    List,
    /// Remove a schedule
    Remove { id: String },
    /// Enable a schedule
    Enable { id: String },
    /// Disable a schedule without removing it
    Disable { id: String },
}

#[derive(Subcommand, Debug)]
enum SetCommand {
    Enabled {
        #[arg(action = ArgAction::Set)]
        value: bool,
    },
    Method {
        #[arg(value_enum)]
        value: MethodArg,
    },
    /// Long-press hold in seconds (clamped to 1-10)
    LongPress { seconds: u64 },
    Gesture {
        #[arg(value_enum)]
        value: GestureArg,
    },
    /// Custom pattern as "X,Y" points; no points clears it
    Pattern { points: Vec<String> },
    /// Covert brightness, 0.0-1.0
    Brightness { level: f32 },
    StatusBar {
        #[arg(action = ArgAction::Set)]
        value: bool,
    },
    Emergency {
        #[arg(action = ArgAction::Set)]
        value: bool,
    },
    /// Auto-deactivate after N seconds, 0 disables
    AutoDeactivate { seconds: u64 },
    Vibrate {
        #[arg(action = ArgAction::Set)]
        value: bool,
    },
    Lockout {
        #[arg(long)]
        max_attempts: u32,
        #[arg(long)]
        duration_secs: u64,
    },
    /// Taps within two seconds that count as tampering
    TouchThreshold { taps: u32 },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MethodArg {
    LongPress,
    Gesture,
    Both,
    Scheduled,
}

impl From<MethodArg> for ActivationMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::LongPress => ActivationMethod::LongPress,
            MethodArg::Gesture => ActivationMethod::Gesture,
            MethodArg::Both => ActivationMethod::Both,
            MethodArg::Scheduled => ActivationMethod::Scheduled,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum GestureArg {
    TripleTap,
    SwipeUp,
    Shake,
    CustomPattern,
}

impl From<GestureArg> for GestureSequence {
    fn from(arg: GestureArg) -> Self {
        match arg {
            GestureArg::TripleTap => GestureSequence::TripleTap,
            GestureArg::SwipeUp => GestureSequence::SwipeUp,
            GestureArg::Shake => GestureSequence::Shake,
            GestureArg::CustomPattern => GestureSequence::CustomPattern,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum RepeatArg {
    Once,
    Daily,
    Weekly,
    Monthly,
    Never,
}

impl From<RepeatArg> for Repeat {
    fn from(arg: RepeatArg) -> Self {
        match arg {
            RepeatArg::Once => Repeat::Once,
            RepeatArg::Daily => Repeat::Daily,
            RepeatArg::Weekly => Repeat::Weekly,
            RepeatArg::Monthly => Repeat::Monthly,
            RepeatArg::Never => Repeat::Never,
        }
    }
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| format!("expected \"YYYY-MM-DD HH:MM\": {}", e))
}

fn parse_point(value: &str) -> Result<PatternPoint> {
    let (x, y) = value
        .split_once(',')
        .ok_or_else(|| anyhow!("expected X,Y but got '{}'", value))?;
    let x: f64 = x.trim().parse().with_context(|| format!("Invalid x in '{}'", value))?;
    let y: f64 = y.trim().parse().with_context(|| format!("Invalid y in '{}'", value))?;
    Ok(PatternPoint::new(x, y))
}

/// Pick the record store (precedence: --ephemeral > --config > env var > default path)
fn open_store(cli: &Cli) -> Result<Box<dyn ConfigStore>> {
    if cli.ephemeral {
        info!("Using in-memory configuration (--ephemeral)");
        return Ok(Box::new(MemoryStore::new()));
    }

    let path = match cli.config.clone().or_else(config::parse_config_path_override) {
        Some(path) => path,
        None => JsonFileStore::default_path().context("Failed to locate configuration")?,
    };
    info!("Configuration record: {}", path.display());
    Ok(Box::new(JsonFileStore::new(path)))
}

type Controller = ActivationController<SystemClock, Box<dyn ConfigStore>, LogPlatform>;

fn open_controller(store: Box<dyn ConfigStore>) -> Controller {
    ActivationController::new(SystemClock, store, LogPlatform::default())
}

/// Editor handle for one-shot commands; leaves the stored session alone
fn attach_controller(store: Box<dyn ConfigStore>) -> Controller {
    ActivationController::attach(SystemClock, store, LogPlatform::default())
}

fn print_status(config: &StealthConfig) {
    let now = SystemClock.now();
    println!("enabled:              {}", config.enabled);
    println!("active:               {}", config.is_active);
    println!("activation method:    {:?}", config.activation_method);
    println!("gesture sequence:     {:?}", config.gesture_sequence);
    println!("long press:           {}s", config.long_press_duration.as_secs_f32());
    println!("brightness:           {:.2}", config.brightness_level);
    println!("status bar shown:     {}", config.show_status_bar);
    println!("emergency enabled:    {}", config.emergency_deactivation_enabled);
    match config.auto_deactivate_after {
        Some(after) => println!("auto-deactivate:      {}s", after.as_secs()),
        None => println!("auto-deactivate:      off"),
    }
    println!(
        "lockout:              {} attempts/min -> {}s",
        config.max_access_attempts,
        config.lockout_duration.as_secs()
    );
    match config.locked_out_until {
        Some(until) if until > now => println!("LOCKED OUT until:     {}", until),
        _ => println!("locked out:           no"),
    }
    println!("schedules:            {}", config.schedules.len());
    println!("attempts logged:      {}", config.access_attempts.len());
}

fn print_schedules(schedules: &[ScheduledActivation]) {
    if schedules.is_empty() {
        println!("No schedules");
        return;
    }
    for schedule in schedules {
        println!(
            "{}  {:<8} {}{}  {:?}{}{}  {}",
            schedule.id,
            if schedule.active { "active" } else { "disabled" },
            schedule.start_time.format("%Y-%m-%d %H:%M"),
            schedule
                .end_time
                .map(|end| format!(" -> {}", end.format("%Y-%m-%d %H:%M")))
                .unwrap_or_default(),
            schedule.repeat,
            if schedule.days_of_week.is_empty() {
                String::new()
            } else {
                format!(" days {:?}", schedule.days_of_week)
            },
            schedule
                .date_of_month
                .map(|d| format!(" on day {}", d))
                .unwrap_or_default(),
            schedule.label.as_deref().unwrap_or("")
        );
    }
}

fn run_host(store: Box<dyn ConfigStore>) -> Result<()> {
    let mut controller = open_controller(store);

    if let Some(hold) = config::parse_long_press_override() {
        controller.set_long_press_duration(hold);
    }

    info!("stealthscreen is running - type 'status' for state, 'quit' to exit");
    let (sender, receiver) = mpsc::channel();
    spawn_stdin_reader(sender)?;

    let mut stdout = std::io::stdout();
    run_event_loop(&mut controller, &receiver, &mut stdout)
}

fn run_schedule_command(store: Box<dyn ConfigStore>, command: ScheduleCommand) -> Result<()> {
    if let ScheduleCommand::List = command {
        print_schedules(&load_or_default(&store).schedules);
        return Ok(());
    }

    let mut controller = attach_controller(store);
    match command {
        ScheduleCommand::Add {
            start,
            end,
            repeat,
            days,
            date,
            label,
        } => {
            let mut schedule = ScheduledActivation::new(start, repeat.into()).with_days_of_week(days);
            if let Some(end) = end {
                schedule = schedule.with_end_time(end);
            }
            if let Some(date) = date {
                schedule = schedule.with_date_of_month(date);
            }
            if let Some(label) = label {
                schedule = schedule.with_label(label);
            }
            let id = controller.add_schedule(schedule)?;
            println!("Added schedule {}", id);
            if let Some(next) = controller.next_schedule_fire(&id) {
                println!("Next activation: {}", next.format("%Y-%m-%d %H:%M"));
            }
        }
        ScheduleCommand::Remove { id } => {
            controller.remove_schedule(&id)?;
            println!("Removed schedule {}", id);
        }
        ScheduleCommand::Enable { id } => {
            controller.set_schedule_active(&id, true)?;
            println!("Enabled schedule {}", id);
        }
        ScheduleCommand::Disable { id } => {
            controller.set_schedule_active(&id, false)?;
            println!("Disabled schedule {}", id);
        }
        ScheduleCommand::List => {}
    }
    controller.shutdown();
    Ok(())
}

fn run_set_command(store: Box<dyn ConfigStore>, command: SetCommand) -> Result<()> {
    let mut controller = attach_controller(store);
    match command {
        SetCommand::Enabled { value } => controller.set_enabled(value),
        SetCommand::Method { value } => controller.set_activation_method(value.into()),
        SetCommand::LongPress { seconds } => {
            let stored = controller.set_long_press_duration(Duration::from_secs(seconds));
            println!("Long press set to {}s", stored.as_secs());
        }
        SetCommand::Gesture { value } => controller.set_gesture_sequence(value.into()),
        SetCommand::Pattern { points } => {
            let pattern = if points.is_empty() {
                None
            } else {
                Some(
                    points
                        .iter()
                        .map(String::as_str)
                        .map(parse_point)
                        .collect::<Result<Vec<_>>>()?,
                )
            };
            controller.set_custom_pattern(pattern)?;
        }
        SetCommand::Brightness { level } => {
            let stored = controller.set_brightness_level(level);
            println!("Brightness set to {:.2}", stored);
        }
        SetCommand::StatusBar { value } => controller.set_show_status_bar(value),
        SetCommand::Emergency { value } => controller.set_emergency_deactivation_enabled(value),
        SetCommand::AutoDeactivate { seconds } => {
            let after = (seconds > 0).then(|| Duration::from_secs(seconds));
            controller.set_auto_deactivate_after(after)?;
        }
        SetCommand::Vibrate { value } => controller.set_vibrate_on_activation(value),
        SetCommand::Lockout {
            max_attempts,
            duration_secs,
        } => {
            if duration_secs > 24 * 60 * 60 {
                bail!("Lockout duration must be at most 24 hours");
            }
            controller
                .set_lockout_thresholds(max_attempts, Duration::from_secs(duration_secs))?;
        }
        SetCommand::TouchThreshold { taps } => controller.set_repeated_touch_threshold(taps)?,
    }
    controller.shutdown();
    println!("Setting saved");
    Ok(())
}

fn main() -> Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let store = open_store(&cli)?;

    match cli.command {
        Command::Run => run_host(store),
        Command::Status => {
            print_status(&load_or_default(&store));
            Ok(())
        }
        Command::Attempts { since_secs } => {
            let config = load_or_default(&store);
            let attempts = match since_secs {
                Some(secs) => {
                    let since = SystemClock.now() - chrono::Duration::seconds(i64::from(secs));
                    attempts_since(&config.access_attempts, since)
                }
                None => config.access_attempts.iter().cloned().collect(),
            };
            if attempts.is_empty() {
                println!("No access attempts logged");
            }
            for attempt in attempts {
                println!(
                    "{}  {:?}  {}",
                    attempt.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    attempt.kind,
                    attempt.details
                );
            }
            Ok(())
        }
        Command::Schedule(command) => run_schedule_command(store, command),
        Command::Set(command) => run_set_command(store, command),
    }
}
