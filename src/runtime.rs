//! Cooperative host runtime
//!
//! Host input arrives as [`HostEvent`]s on an mpsc channel. The loop thread
//! owns the controller, sleeps until the next timer deadline or the next event
//! (whichever comes first, capped at [`EVENT_LOOP_MAX_SLEEP_MS`]), and fires
//! due timers before handling each event.

use crate::clock::ClockSource;
use crate::config_file::ConfigStore;
use crate::constants::EVENT_LOOP_MAX_SLEEP_MS;
use crate::controller::{ActivationController, ControllerState};
use crate::error::{ActivationError, Transition};
use crate::gesture::GestureOutcome;
use crate::model::Timestamp;
use crate::platform::Platform;
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use std::io::{BufRead, Write};
use std::str::FromStr;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

/// One input from the host environment
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Activate,
    Deactivate,
    Emergency,
    Back,
    Background,
    Press,
    Release,
    Tap,
    Swipe { dx: f64, dy: f64 },
    SwipeUp,
    Shake,
    Point { x: f64, y: f64 },
    Status,
    Quit,
}

impl FromStr for HostEvent {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> Result<Self> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            bail!("empty command");
        };
        let args: Vec<&str> = words.collect();

        let event = match (command.to_ascii_lowercase().as_str(), args.as_slice()) {
            ("activate", []) => HostEvent::Activate,
            ("deactivate", []) => HostEvent::Deactivate,
            ("emergency", []) => HostEvent::Emergency,
            ("back", []) => HostEvent::Back,
            ("background", []) => HostEvent::Background,
            ("press", []) => HostEvent::Press,
            ("release", []) => HostEvent::Release,
            ("tap", []) => HostEvent::Tap,
            ("swipe", [dx, dy]) => HostEvent::Swipe {
                dx: parse_coordinate(dx)?,
                dy: parse_coordinate(dy)?,
            },
            ("swipe-up", []) => HostEvent::SwipeUp,
            ("shake", []) => HostEvent::Shake,
            ("point", [x, y]) => HostEvent::Point {
                x: parse_coordinate(x)?,
                y: parse_coordinate(y)?,
            },
            ("status", []) => HostEvent::Status,
            ("quit" | "exit", []) => HostEvent::Quit,
            (other, args) => bail!("unknown command '{}' with {} argument(s)", other, args.len()),
        };
        Ok(event)
    }
}

fn parse_coordinate(word: &str) -> Result<f64> {
    let value: f64 = word
        .parse()
        .with_context(|| format!("invalid number '{}'", word))?;
    if !value.is_finite() {
        bail!("coordinate must be finite: {}", word);
    }
    Ok(value)
}

/// Forward stdin lines as parsed events until EOF
///
/// Unparseable lines are reported and skipped; the channel closes at EOF.
pub fn spawn_stdin_reader(sender: Sender<HostEvent>) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("stdin-reader".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        warn!("Failed to read stdin: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<HostEvent>() {
                    Ok(event) => {
                        if sender.send(event).is_err() {
                            break;
                        }
                    }
                    Err(e) => eprintln!("error: {:#}", e),
                }
            }
            debug!("stdin closed");
        })
        .context("Failed to spawn stdin reader thread")
}

/// How long the loop may sleep before the next deadline needs attention
pub fn wait_budget(next_deadline: Option<Timestamp>, now: Timestamp) -> Duration {
    let cap = Duration::from_millis(EVENT_LOOP_MAX_SLEEP_MS);
    match next_deadline {
        Some(deadline) => (deadline - now).to_std().unwrap_or(Duration::ZERO).min(cap),
        None => cap,
    }
}

/// Drive the controller until `Quit` arrives or the event channel closes
///
/// Replies to commands are written to `out`. Timers are torn down on exit.
pub fn run_event_loop<C, S, P, W>(
    controller: &mut ActivationController<C, S, P>,
    events: &Receiver<HostEvent>,
    out: &mut W,
) -> Result<()>
where
    C: ClockSource,
    S: ConfigStore,
    P: Platform,
    W: Write,
{
    info!("Event loop started");
    loop {
        controller.run_due_timers();

        let timeout = wait_budget(controller.next_deadline(), controller.now());
        match events.recv_timeout(timeout) {
            Ok(HostEvent::Quit) => {
                info!("Quit requested");
                break;
            }
            Ok(event) => {
                // Timers that expired while waiting fire before the event
                controller.run_due_timers();
                let reply = handle_event(controller, event);
                writeln!(out, "{}", reply).context("Failed to write reply")?;
                out.flush().context("Failed to flush reply")?;
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                info!("Input closed");
                break;
            }
        }
    }
    controller.shutdown();
    Ok(())
}

/// Apply one host event and describe what happened
pub fn handle_event<C, S, P>(controller: &mut ActivationController<C, S, P>, event: HostEvent) -> String
where
    C: ClockSource,
    S: ConfigStore,
    P: Platform,
{
    match event {
        HostEvent::Activate => describe_transition(controller.activate(None), "activated"),
        HostEvent::Deactivate => describe_transition(controller.deactivate(), "deactivated"),
        HostEvent::Emergency => {
            describe_transition(controller.emergency_deactivate(), "deactivated")
        }
        HostEvent::Back => describe_transition(controller.on_back_pressed(), "deactivated"),
        HostEvent::Background => {
            describe_transition(Ok(controller.on_app_backgrounded()), "deactivated")
        }
        HostEvent::Press => {
            if controller.on_long_press_start() {
                "long press started".to_string()
            } else {
                "ignored".to_string()
            }
        }
        HostEvent::Release => {
            controller.on_long_press_end();
            "released".to_string()
        }
        HostEvent::Tap => describe_outcome(controller.register_gesture_tap()),
        HostEvent::Swipe { dx, dy } => describe_outcome(controller.on_swipe(dx, dy)),
        HostEvent::SwipeUp => describe_outcome(controller.on_swipe_up()),
        HostEvent::Shake => describe_outcome(controller.on_shake()),
        HostEvent::Point { x, y } => describe_outcome(controller.register_pattern_point(x, y)),
        HostEvent::Status => describe_status(controller),
        HostEvent::Quit => "bye".to_string(),
    }
}

fn describe_transition(result: Result<Transition, ActivationError>, changed: &str) -> String {
    match result {
        Ok(Transition::Changed) => changed.to_string(),
        Ok(Transition::Unchanged) => "unchanged".to_string(),
        Err(e) => format!("refused: {}", e),
    }
}

fn describe_outcome(outcome: GestureOutcome) -> String {
    match outcome {
        GestureOutcome::Matched => "gesture matched".to_string(),
        GestureOutcome::Pending => "gesture pending".to_string(),
        GestureOutcome::Rejected { kind, details } => {
            format!("gesture rejected ({:?}: {})", kind, details)
        }
        GestureOutcome::Tamper { details, .. } => format!("tamper detected ({})", details),
        GestureOutcome::Ignored => "ignored".to_string(),
    }
}

/// One-line summary of the controller state
pub fn describe_status<C, S, P>(controller: &ActivationController<C, S, P>) -> String
where
    C: ClockSource,
    S: ConfigStore,
    P: Platform,
{
    let config = controller.config();
    let state = match controller.state() {
        ControllerState::Inactive => "inactive".to_string(),
        ControllerState::Active => "ACTIVE".to_string(),
        ControllerState::LockedOut { underlying_active } => format!(
            "LOCKED OUT until {} ({})",
            controller
                .locked_out_until()
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
            if underlying_active { "active" } else { "inactive" }
        ),
    };
    format!(
        "state: {} | enabled: {} | method: {:?} | gesture: {:?} | long press: {}s | schedules: {} | attempts logged: {}",
        state,
        config.enabled,
        config.activation_method,
        config.gesture_sequence,
        config.long_press_duration.as_secs_f32(),
        config.schedules.len(),
        config.access_attempts.len()
    )
}
