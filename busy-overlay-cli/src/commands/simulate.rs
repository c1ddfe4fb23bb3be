//! Simulate command - replay a request script through an overlay.
//!
//! By default the script runs on a virtual clock and finishes instantly.
//! With `--realtime` it runs on the tokio runtime and takes as long as the
//! script says.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use busy_overlay::config::OverlayConfig;
use busy_overlay::controller::{ControllerSnapshot, OverlayState};
use busy_overlay::present::{PresenterEvent, RecordingPresenter, TimedEvent};
use busy_overlay::signal::legacy::{AjaxEvent, AjaxEventBus};
use busy_overlay::signal::pipeline::{HttpInterceptor, Rejection, RejectionReason, Response};
use busy_overlay::signal::RequestConfig;
use busy_overlay::timer::{ManualScheduler, TimerScheduler, TokioScheduler};
use busy_overlay::{Overlay, OverlayBuilder};
use clap::Args;
use console::style;
use serde::Serialize;

use super::common::{read_input, resolve_config, ConfigArgs, OutputFormat};
use crate::error::CliError;
use crate::script::{parse_script, EventKind, ScriptEvent};

/// Time allowed after the last timer in realtime mode.
const REALTIME_SETTLE: Duration = Duration::from_millis(50);

/// Arguments for the simulate command.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Script file, or '-' for stdin
    #[arg(value_name = "SCRIPT", required_unless_present = "events")]
    pub script: Option<PathBuf>,

    /// Inline script, e.g. "0 http send, 600 http ok"
    #[arg(short, long, conflicts_with = "script")]
    pub events: Option<String>,

    /// Run on the real clock instead of a virtual one
    #[arg(long)]
    pub realtime: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Run the simulate command.
pub fn run(args: SimulateArgs) -> Result<(), CliError> {
    let (config, source) = resolve_config(&args.config)?;
    tracing::debug!(%source, ?config, "Resolved overlay configuration");

    let text = match (&args.events, &args.script) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => read_input(path)?,
        (None, None) => read_input(&PathBuf::from("-"))?,
    };
    let events = parse_script(&text)?;
    tracing::info!(events = events.len(), realtime = args.realtime, "Replaying script");

    let report = if args.realtime {
        run_realtime(&config, &events)?
    } else {
        run_virtual(&config, &events)?
    };

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }

    Ok(())
}

/// Feeds script events into an overlay through its real adapters.
struct Driver {
    overlay: Overlay,
    bus: Arc<AjaxEventBus>,
    presenter: Arc<RecordingPresenter>,
}

impl Driver {
    fn new(config: &OverlayConfig, scheduler: Arc<dyn TimerScheduler>) -> Result<Self, CliError> {
        let presenter = Arc::new(RecordingPresenter::with_clock(Arc::clone(&scheduler)));
        let bus = Arc::new(AjaxEventBus::new());
        let overlay = OverlayBuilder::new()
            .config(config.clone())
            .presenter(presenter.clone())
            .scheduler(scheduler)
            .legacy_bus(Some(bus.clone()))
            .build()?;

        Ok(Self {
            overlay,
            bus,
            presenter,
        })
    }

    fn apply(&self, event: &ScriptEvent) {
        let request = request_config(event);
        let adapter = self.overlay.pipeline_adapter();

        match event.kind {
            EventKind::HttpSend => {
                adapter.request(request);
            }
            EventKind::HttpOk => {
                let mut response = Response::ok();
                response.config = Some(request);
                adapter.response(response);
            }
            EventKind::HttpError => {
                let rejection = Rejection::new(RejectionReason::Status(500)).with_config(request);
                // The adapter always re-propagates; nothing downstream to receive it
                let _ = adapter.response_error(rejection);
            }
            EventKind::AjaxSend => self.bus.emit(&AjaxEvent::send(request)),
            EventKind::AjaxComplete => self.bus.emit(&AjaxEvent::complete(200, request)),
        }
    }

    fn report(&self, config: &OverlayConfig, inputs: &[ScriptEvent], end: Duration) -> Report {
        Report::new(
            config,
            inputs,
            self.presenter.timeline(),
            self.overlay.controller().snapshot(),
            end,
        )
    }
}

fn request_config(event: &ScriptEvent) -> RequestConfig {
    let request = RequestConfig::get(format!("/script/line/{}", event.line));
    if event.skip {
        request.skip_overlay()
    } else {
        request
    }
}

/// Replay on a manual clock, then run every outstanding timer.
pub fn run_virtual(config: &OverlayConfig, events: &[ScriptEvent]) -> Result<Report, CliError> {
    let scheduler = Arc::new(ManualScheduler::new());
    let driver = Driver::new(config, scheduler.clone())?;

    for event in events {
        scheduler.advance_to(event.at);
        driver.apply(event);
    }
    while let Some(deadline) = scheduler.next_deadline() {
        scheduler.advance_to(deadline);
    }

    Ok(driver.report(config, events, scheduler.now()))
}

/// Replay on the tokio clock, on a runtime of our own.
fn run_realtime(config: &OverlayConfig, events: &[ScriptEvent]) -> Result<Report, CliError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_time()
        .build()?;

    runtime.block_on(replay_realtime(config, events))
}

/// Replay on the current runtime's clock. Waits for the last timer to
/// settle before reporting.
pub async fn replay_realtime(
    config: &OverlayConfig,
    events: &[ScriptEvent],
) -> Result<Report, CliError> {
    let scheduler = Arc::new(TokioScheduler::new(tokio::runtime::Handle::current()));
    let driver = Driver::new(config, scheduler.clone())?;
    let origin = tokio::time::Instant::now();

    for event in events {
        tokio::time::sleep_until(origin + event.at).await;
        driver.apply(event);
    }
    tokio::time::sleep(config.delay_in.max(config.delay_out) + REALTIME_SETTLE).await;

    Ok(driver.report(config, events, scheduler.now()))
}

/// A script event as it appears in the report.
#[derive(Debug, Clone, Serialize)]
pub struct InputRecord {
    pub at_ms: u64,
    pub source: String,
    pub action: String,
    pub skip: bool,
}

/// Simulation outcome.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub delay_in_ms: u64,
    pub delay_out_ms: u64,
    pub inputs: Vec<InputRecord>,
    pub timeline: Vec<TimedEvent>,
    pub final_state: OverlayState,
    pub pending: usize,
    pub times_shown: usize,
    pub visible_ms: u64,
    pub duration_ms: u64,
}

impl Report {
    fn new(
        config: &OverlayConfig,
        inputs: &[ScriptEvent],
        timeline: Vec<TimedEvent>,
        snapshot: ControllerSnapshot,
        end: Duration,
    ) -> Self {
        let mut times_shown = 0;
        let mut visible_total = Duration::ZERO;
        let mut shown_at = None;

        for entry in &timeline {
            if let PresenterEvent::Visibility { visible } = entry.event {
                if visible {
                    times_shown += 1;
                    shown_at = Some(entry.at);
                } else if let Some(start) = shown_at.take() {
                    visible_total += entry.at.saturating_sub(start);
                }
            }
        }
        if let Some(start) = shown_at {
            visible_total += end.saturating_sub(start);
        }

        Self {
            delay_in_ms: config.delay_in.as_millis() as u64,
            delay_out_ms: config.delay_out.as_millis() as u64,
            inputs: inputs
                .iter()
                .map(|event| InputRecord {
                    at_ms: event.at.as_millis() as u64,
                    source: event.kind.source().to_string(),
                    action: event.kind.action().to_string(),
                    skip: event.skip,
                })
                .collect(),
            timeline,
            final_state: snapshot.state(),
            pending: snapshot.pending,
            times_shown,
            visible_ms: visible_total.as_millis() as u64,
            duration_ms: end.as_millis() as u64,
        }
    }
}

fn print_report(report: &Report) {
    println!(
        "{} (delay_in {} ms, delay_out {} ms)",
        style("Overlay simulation").bold(),
        report.delay_in_ms,
        report.delay_out_ms
    );
    println!();

    // Timers fire before input events at the same instant
    let mut lines: Vec<(u64, String)> = report
        .timeline
        .iter()
        .map(|entry| {
            let line = match entry.event {
                PresenterEvent::Render { position } => format!(
                    "{}  top={} left={}",
                    style("render").cyan(),
                    position.top,
                    position.left
                ),
                PresenterEvent::Visibility { visible: true } => {
                    style("SHOW").green().bold().to_string()
                }
                PresenterEvent::Visibility { visible: false } => {
                    style("HIDE").yellow().bold().to_string()
                }
            };
            (entry.at.as_millis() as u64, line)
        })
        .collect();
    lines.extend(report.inputs.iter().map(|input| {
        let skip = if input.skip { " (skip)" } else { "" };
        let line = format!("{} {}{}", input.source, input.action, skip);
        (input.at_ms, style(line).dim().to_string())
    }));
    lines.sort_by_key(|(at, _)| *at);

    for (at, line) in lines {
        println!("  {:>7} ms  {}", at, line);
    }

    println!();
    println!(
        "Shown {} time(s), visible for {} ms; final state: {} ({} pending)",
        report.times_shown, report.visible_ms, report.final_state, report.pending
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulate(script: &str) -> Report {
        let events = parse_script(script).unwrap();
        run_virtual(&OverlayConfig::default(), &events).unwrap()
    }

    fn toggles(report: &Report) -> Vec<(u64, bool)> {
        report
            .timeline
            .iter()
            .filter_map(|entry| match entry.event {
                PresenterEvent::Visibility { visible } => Some((entry.at.as_millis() as u64, visible)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_slow_request() {
        let report = simulate("0 http send\n600 http ok");

        assert_eq!(toggles(&report), vec![(500, true), (1_100, false)]);
        assert_eq!(report.times_shown, 1);
        assert_eq!(report.visible_ms, 600);
        assert_eq!(report.final_state, OverlayState::Idle);
        assert_eq!(report.duration_ms, 1_100);
    }

    #[test]
    fn test_overlapping_fast_requests() {
        let report = simulate("0 http send, 100 ajax send, 200 http ok, 300 ajax complete");
        assert!(report.timeline.is_empty());
        assert_eq!(report.times_shown, 0);
    }

    #[test]
    fn test_grace_period_no_flicker() {
        let report = simulate("0 http send\n600 http ok\n700 ajax send\n900 ajax complete");
        assert_eq!(toggles(&report), vec![(500, true), (1_400, false)]);
    }

    #[test]
    fn test_error_counts_as_end() {
        let report = simulate("0 http send\n700 http error");
        assert_eq!(toggles(&report), vec![(500, true), (1_200, false)]);
    }

    #[test]
    fn test_skip_and_unmatched_end() {
        let report = simulate("0 http send skip\n10 http ok\n20 ajax complete\n900 http ok skip");
        assert!(report.timeline.is_empty());
        assert_eq!(report.pending, 0);
    }

    #[test]
    fn test_never_ending_request_stays_visible() {
        let report = simulate("0 ajax send");
        assert_eq!(toggles(&report), vec![(500, true)]);
        assert_eq!(report.final_state, OverlayState::Visible);
        assert_eq!(report.pending, 1);
        assert_eq!(report.visible_ms, 0);
    }

    #[test]
    fn test_report_serializes() {
        let report = simulate("0 http send\n600 http ok");
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["final_state"], "idle");
        assert_eq!(json["timeline"][1]["kind"], "visibility");
        assert_eq!(json["timeline"][1]["at_ms"], 500);
        assert_eq!(json["inputs"][0]["source"], "http");
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_replay_matches_virtual_clock() {
        let events = parse_script("0 http send\n600 http ok\n700 ajax send skip").unwrap();
        let report = replay_realtime(&OverlayConfig::default(), &events)
            .await
            .unwrap();

        let changes = toggles(&report);
        assert_eq!(changes.len(), 2);
        assert!(changes[0].1 && (495..=510).contains(&changes[0].0));
        assert!(!changes[1].1 && (1_095..=1_110).contains(&changes[1].0));

        assert_eq!(report.times_shown, 1);
        assert_eq!(report.final_state, OverlayState::Idle);
        assert_eq!(report.pending, 0);
        // Last event plus the longest delay plus settle time
        assert!(report.duration_ms >= 1_250);
        assert_eq!(report.inputs[2].source, "ajax");
        assert!(report.inputs[2].skip);
    }
}
