//! Integration tests for the busy overlay.
//!
//! These tests drive a fully built overlay on the tokio runtime with paused
//! time:
//! - HTTP pipeline requests → PipelineAdapter → controller → presenter
//! - Legacy AJAX bus events → LegacyBusAdapter → controller
//! - Both mechanisms interleaved against one counter
//!
//! Tokio timers have millisecond granularity, so visibility is sampled a few
//! milliseconds either side of each expected transition.
//!
//! Run with: `cargo test --test overlay_integration`

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, sleep_until, Instant};

use busy_overlay::config::OverlayConfig;
use busy_overlay::present::RecordingPresenter;
use busy_overlay::signal::legacy::{AjaxEvent, AjaxEventBus};
use busy_overlay::signal::pipeline::{InterceptorChain, Rejection, RejectionReason, Response};
use busy_overlay::signal::RequestConfig;
use busy_overlay::{Overlay, OverlayBuilder, OverlayState};

// ============================================================================
// Helper Functions
// ============================================================================

struct Fixture {
    overlay: Overlay,
    presenter: Arc<RecordingPresenter>,
    bus: Arc<AjaxEventBus>,
    chain: InterceptorChain,
    origin: Instant,
}

impl Fixture {
    /// Overlay with default 500/500 ms delays and both adapters installed.
    fn new() -> Self {
        Self::with_config(OverlayConfig::default())
    }

    fn with_config(config: OverlayConfig) -> Self {
        let presenter = Arc::new(RecordingPresenter::new());
        let bus = Arc::new(AjaxEventBus::new());
        let overlay = OverlayBuilder::new()
            .config(config)
            .presenter(presenter.clone())
            .legacy_bus(Some(bus.clone()))
            .build()
            .expect("overlay should build inside a runtime");
        let chain = overlay.interceptor_chain();

        Self {
            overlay,
            presenter,
            bus,
            chain,
            origin: Instant::now(),
        }
    }

    /// Sleep until `ms` after the fixture was created.
    async fn at(&self, ms: u64) {
        sleep_until(self.origin + Duration::from_millis(ms)).await;
    }

    fn visible(&self) -> bool {
        self.overlay.controller().is_visible()
    }

    fn visibility_toggles(&self) -> Vec<bool> {
        self.presenter
            .visibility_changes()
            .into_iter()
            .map(|(_, visible)| visible)
            .collect()
    }

    /// Spawn a pipeline request whose transport takes `duration_ms`.
    fn spawn_request(
        &self,
        config: RequestConfig,
        duration_ms: u64,
        outcome: Result<Response, Rejection>,
    ) -> tokio::task::JoinHandle<Result<Response, Rejection>> {
        let chain = self.chain.clone();
        tokio::spawn(async move {
            chain
                .dispatch(config, move |_| async move {
                    sleep(Duration::from_millis(duration_ms)).await;
                    outcome
                })
                .await
        })
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

/// A request slower than the show delay shows the overlay, which lingers for
/// the hide delay after completion.
#[tokio::test(start_paused = true)]
async fn test_slow_pipeline_request_shows_then_hides() {
    let f = Fixture::new();
    let request = f.spawn_request(RequestConfig::get("/report"), 600, Ok(Response::ok()));

    f.at(490).await;
    assert!(!f.visible());
    assert_eq!(f.overlay.controller().state(), OverlayState::PendingShow);

    f.at(510).await;
    assert!(f.visible());

    let response = request.await.unwrap().unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(f.overlay.controller().pending_requests(), 0);

    f.at(1_090).await;
    assert!(f.visible());
    assert_eq!(f.overlay.controller().state(), OverlayState::PendingHide);

    f.at(1_110).await;
    assert!(!f.visible());
    assert_eq!(f.visibility_toggles(), vec![true, false]);
}

/// Requests finishing within the show delay never flash the overlay.
#[tokio::test(start_paused = true)]
async fn test_fast_requests_never_show() {
    let f = Fixture::new();

    let a = f.spawn_request(RequestConfig::get("/a"), 200, Ok(Response::ok()));
    let b = f.spawn_request(RequestConfig::get("/b"), 300, Ok(Response::ok()));
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    f.at(3_000).await;
    assert!(f.presenter.events().is_empty());
    assert_eq!(f.overlay.controller().state(), OverlayState::Idle);
}

/// A new request during the hide grace period keeps the overlay up without
/// a hide/show flicker.
#[tokio::test(start_paused = true)]
async fn test_request_in_grace_period_keeps_overlay_visible() {
    let f = Fixture::new();

    let first = f.spawn_request(RequestConfig::get("/first"), 600, Ok(Response::ok()));
    first.await.unwrap().unwrap();

    f.at(700).await;
    let second = f.spawn_request(RequestConfig::get("/second"), 300, Ok(Response::ok()));

    f.at(1_150).await;
    assert!(f.visible(), "hide timer must see the second request in flight");

    second.await.unwrap().unwrap();

    f.at(1_490).await;
    assert!(f.visible());
    f.at(1_510).await;
    assert!(!f.visible());

    assert_eq!(f.visibility_toggles(), vec![true, false]);
}

/// Failed requests still end, and the failure reaches the caller unchanged.
#[tokio::test(start_paused = true)]
async fn test_failed_request_ends_and_propagates() {
    let f = Fixture::new();
    let request = f.spawn_request(
        RequestConfig::post("/save"),
        700,
        Err(Rejection::new(RejectionReason::Status(502))),
    );

    f.at(510).await;
    assert!(f.visible());

    let rejection = request.await.unwrap().unwrap_err();
    assert_eq!(rejection.reason, RejectionReason::Status(502));
    assert_eq!(rejection.config.unwrap().url, "/save");

    f.at(1_250).await;
    assert!(!f.visible());
}

/// Requests flagged to skip the overlay are invisible to both adapters.
#[tokio::test(start_paused = true)]
async fn test_skipped_requests_are_not_tracked() {
    let f = Fixture::new();
    let poll = RequestConfig::get("/poll").skip_overlay();

    let request = f.spawn_request(poll.clone(), 2_000, Ok(Response::ok()));
    f.bus.emit(&AjaxEvent::send(poll.clone()));

    f.at(1_000).await;
    assert_eq!(f.overlay.controller().pending_requests(), 0);
    assert!(!f.visible());

    request.await.unwrap().unwrap();
    f.bus.emit(&AjaxEvent::complete(200, poll));
    f.at(3_000).await;
    assert!(f.presenter.events().is_empty());
}

/// Legacy bus traffic and pipeline traffic share one counter.
#[tokio::test(start_paused = true)]
async fn test_legacy_and_pipeline_interleave() {
    let f = Fixture::new();
    let legacy = RequestConfig::get("/legacy/list");

    f.bus.emit(&AjaxEvent::send(legacy.clone()));
    let pipeline = f.spawn_request(RequestConfig::get("/api/list"), 300, Ok(Response::ok()));

    f.at(100).await;
    assert_eq!(f.overlay.controller().pending_requests(), 2);

    pipeline.await.unwrap().unwrap();
    assert_eq!(f.overlay.controller().pending_requests(), 1);

    f.at(510).await;
    assert!(f.visible());

    f.at(800).await;
    f.bus.emit(&AjaxEvent::complete(0, legacy));
    assert_eq!(f.overlay.controller().pending_requests(), 0);

    f.at(1_290).await;
    assert!(f.visible());
    f.at(1_310).await;
    assert!(!f.visible());
}

/// Unmatched completions never drive the counter negative or show anything.
#[tokio::test(start_paused = true)]
async fn test_excess_completions_are_ignored() {
    let f = Fixture::new();
    let options = RequestConfig::get("/x");

    for _ in 0..3 {
        f.bus.emit(&AjaxEvent::complete(200, options.clone()));
    }
    assert_eq!(f.overlay.controller().pending_requests(), 0);

    f.at(2_000).await;
    assert!(f.presenter.events().is_empty());

    // The counter still works from zero afterwards
    f.bus.emit(&AjaxEvent::send(options.clone()));
    f.at(2_510).await;
    assert!(f.visible());
}

/// Custom delays are honoured.
#[tokio::test(start_paused = true)]
async fn test_custom_delays() {
    let config = OverlayConfig::default()
        .with_delay_in(Duration::from_millis(100))
        .with_delay_out(Duration::from_millis(1_000));
    let f = Fixture::with_config(config);

    let request = f.spawn_request(RequestConfig::get("/slow"), 200, Ok(Response::ok()));
    f.at(120).await;
    assert!(f.visible());

    request.await.unwrap().unwrap();
    f.at(1_150).await;
    assert!(f.visible());
    f.at(1_250).await;
    assert!(!f.visible());
}

/// Overlays built separately keep separate counters.
#[tokio::test(start_paused = true)]
async fn test_instances_are_independent() {
    let a = Fixture::new();
    let b = Fixture::new();

    let request = a.spawn_request(RequestConfig::get("/only-a"), 800, Ok(Response::ok()));
    a.at(600).await;

    assert!(a.visible());
    assert!(!b.visible());
    assert_eq!(b.overlay.controller().pending_requests(), 0);
    request.await.unwrap().unwrap();
}
