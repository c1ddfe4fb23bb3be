//! Overlay composition.
//!
//! [`OverlayBuilder`] wires one controller to its collaborators and to the
//! request signal adapters. Every overlay is built explicitly; nothing is
//! registered globally.
//!
//! ```
//! use busy_overlay::builder::OverlayBuilder;
//! use busy_overlay::present::RecordingPresenter;
//! use busy_overlay::signal::legacy::AjaxEventBus;
//! use busy_overlay::timer::ManualScheduler;
//! use std::sync::Arc;
//!
//! let bus = Arc::new(AjaxEventBus::new());
//! let overlay = OverlayBuilder::new()
//!     .presenter(Arc::new(RecordingPresenter::new()))
//!     .scheduler(Arc::new(ManualScheduler::new()))
//!     .legacy_bus(Some(bus))
//!     .build()
//!     .unwrap();
//!
//! assert!(overlay.has_legacy_adapter());
//! assert_eq!(overlay.interceptor_chain().len(), 1);
//! ```

use std::sync::Arc;

use crate::config::OverlayConfig;
use crate::controller::OverlayController;
use crate::error::OverlayError;
use crate::markup::OverlayMarkup;
use crate::measure::{FixedMeasurement, MeasurementProvider};
use crate::present::OverlayPresenter;
use crate::signal::legacy::{AjaxEventBus, LegacyBusAdapter};
use crate::signal::pipeline::{InterceptorChain, PipelineAdapter};
use crate::signal::RequestObserver;
use crate::timer::{TimerScheduler, TokioScheduler};

/// Builder for [`Overlay`].
#[derive(Default)]
pub struct OverlayBuilder {
    config: Option<OverlayConfig>,
    presenter: Option<Arc<dyn OverlayPresenter>>,
    measurement: Option<Arc<dyn MeasurementProvider>>,
    scheduler: Option<Arc<dyn TimerScheduler>>,
    legacy_bus: Option<Arc<AjaxEventBus>>,
}

impl OverlayBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set delays and animation class. Defaults to [`OverlayConfig::default`].
    pub fn config(mut self, config: OverlayConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the presenter. Required.
    pub fn presenter(mut self, presenter: Arc<dyn OverlayPresenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    /// Set the measurement provider. Defaults to [`FixedMeasurement::default`].
    pub fn measurement(mut self, measurement: Arc<dyn MeasurementProvider>) -> Self {
        self.measurement = Some(measurement);
        self
    }

    /// Set the timer scheduler. Defaults to a [`TokioScheduler`] on the
    /// current runtime.
    pub fn scheduler(mut self, scheduler: Arc<dyn TimerScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Attach to the legacy AJAX bus, if the environment has one.
    pub fn legacy_bus(mut self, bus: Option<Arc<AjaxEventBus>>) -> Self {
        self.legacy_bus = bus;
        self
    }

    /// Assemble the overlay.
    ///
    /// Fails without a presenter, or when no scheduler was given and there
    /// is no tokio runtime to fall back on.
    pub fn build(self) -> Result<Overlay, OverlayError> {
        let presenter = self.presenter.ok_or(OverlayError::MissingPresenter)?;
        let config = self.config.unwrap_or_default();
        let measurement = self
            .measurement
            .unwrap_or_else(|| Arc::new(FixedMeasurement::default()));
        let scheduler = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(TokioScheduler::current()?),
        };

        tracing::debug!(
            delay_in_ms = config.delay_in.as_millis() as u64,
            delay_out_ms = config.delay_out.as_millis() as u64,
            animation = config.animation.as_deref().unwrap_or(""),
            "Building overlay"
        );

        let controller = OverlayController::new(config, presenter, measurement, scheduler);
        let observer: Arc<dyn RequestObserver> = controller.clone();

        let pipeline = PipelineAdapter::new(Arc::clone(&observer));
        let legacy = LegacyBusAdapter::install(self.legacy_bus, observer);

        Ok(Overlay {
            controller,
            pipeline,
            legacy,
        })
    }
}

/// A controller together with its installed signal adapters.
#[derive(Debug)]
pub struct Overlay {
    controller: Arc<OverlayController>,
    pipeline: PipelineAdapter,
    legacy: Option<LegacyBusAdapter>,
}

impl Overlay {
    pub fn builder() -> OverlayBuilder {
        OverlayBuilder::new()
    }

    pub fn controller(&self) -> &Arc<OverlayController> {
        &self.controller
    }

    /// Interceptor to register on an HTTP pipeline.
    pub fn pipeline_adapter(&self) -> &PipelineAdapter {
        &self.pipeline
    }

    /// Whether the legacy bus adapter was installed.
    pub fn has_legacy_adapter(&self) -> bool {
        self.legacy.is_some()
    }

    pub fn legacy_adapter(&self) -> Option<&LegacyBusAdapter> {
        self.legacy.as_ref()
    }

    /// A fresh interceptor chain with the pipeline adapter registered.
    pub fn interceptor_chain(&self) -> InterceptorChain {
        InterceptorChain::new().with(Arc::new(self.pipeline.clone()))
    }

    /// Markup for this overlay with the given content HTML.
    pub fn markup(&self, content_html: impl Into<String>) -> OverlayMarkup {
        OverlayMarkup::from_config(self.controller.config(), content_html)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::present::RecordingPresenter;
    use crate::timer::ManualScheduler;

    #[test]
    fn test_presenter_required() {
        let result = OverlayBuilder::new()
            .scheduler(Arc::new(ManualScheduler::new()))
            .build();
        assert!(matches!(result, Err(OverlayError::MissingPresenter)));
    }

    #[test]
    fn test_scheduler_falls_back_to_runtime() {
        // No runtime on a plain test thread
        let result = OverlayBuilder::new()
            .presenter(Arc::new(RecordingPresenter::new()))
            .build();
        assert!(matches!(result, Err(OverlayError::Scheduler(_))));
    }

    #[tokio::test]
    async fn test_scheduler_from_current_runtime() {
        let overlay = OverlayBuilder::new()
            .presenter(Arc::new(RecordingPresenter::new()))
            .build()
            .unwrap();
        assert_eq!(overlay.controller().pending_requests(), 0);
    }

    #[test]
    fn test_defaults_and_no_legacy_bus() {
        let overlay = OverlayBuilder::new()
            .presenter(Arc::new(RecordingPresenter::new()))
            .scheduler(Arc::new(ManualScheduler::new()))
            .legacy_bus(None)
            .build()
            .unwrap();

        assert!(!overlay.has_legacy_adapter());
        assert!(overlay.legacy_adapter().is_none());
        assert_eq!(overlay.controller().config(), &OverlayConfig::default());
    }

    #[test]
    fn test_config_flows_to_controller_and_markup() {
        let config = OverlayConfig::default()
            .with_delay_in(Duration::from_millis(50))
            .with_animation("spin");
        let overlay = Overlay::builder()
            .config(config)
            .presenter(Arc::new(RecordingPresenter::new()))
            .scheduler(Arc::new(ManualScheduler::new()))
            .build()
            .unwrap();

        assert_eq!(overlay.controller().config().delay_in, Duration::from_millis(50));
        assert!(overlay.markup("x").container().contains("class=\"spin\""));
    }

    #[test]
    fn test_both_adapters_feed_one_controller() {
        use crate::signal::legacy::AjaxEvent;
        use crate::signal::pipeline::HttpInterceptor;
        use crate::signal::RequestConfig;

        let bus = Arc::new(AjaxEventBus::new());
        let overlay = OverlayBuilder::new()
            .presenter(Arc::new(RecordingPresenter::new()))
            .scheduler(Arc::new(ManualScheduler::new()))
            .legacy_bus(Some(bus.clone()))
            .build()
            .unwrap();

        overlay.pipeline_adapter().request(RequestConfig::get("/a"));
        bus.emit(&AjaxEvent::send(RequestConfig::get("/b")));
        assert_eq!(overlay.controller().pending_requests(), 2);
    }

    #[test]
    fn test_dropped_overlay_detaches_from_bus() {
        use crate::signal::legacy::AjaxEvent;
        use crate::signal::RequestConfig;

        let bus = Arc::new(AjaxEventBus::new());
        let scheduler = Arc::new(ManualScheduler::new());
        let presenter = Arc::new(RecordingPresenter::new());

        let overlay = OverlayBuilder::new()
            .presenter(presenter.clone())
            .scheduler(scheduler.clone())
            .legacy_bus(Some(bus.clone()))
            .build()
            .unwrap();
        let weak = Arc::downgrade(overlay.controller());

        // Leave a show timer armed
        bus.emit(&AjaxEvent::send(RequestConfig::get("/slow")));
        assert_eq!(scheduler.pending(), 1);

        drop(overlay);
        assert!(weak.upgrade().is_none());
        assert_eq!(bus.handler_count(), 0);
        assert_eq!(scheduler.pending(), 0);

        bus.emit(&AjaxEvent::send(RequestConfig::get("/late")));
        scheduler.advance(Duration::from_secs(1));
        assert_eq!(scheduler.pending(), 0);
        assert!(presenter.events().is_empty());
    }

    #[test]
    fn test_rebuilding_on_shared_bus_does_not_accumulate_handlers() {
        let bus = Arc::new(AjaxEventBus::new());
        for _ in 0..4 {
            let overlay = OverlayBuilder::new()
                .presenter(Arc::new(RecordingPresenter::new()))
                .scheduler(Arc::new(ManualScheduler::new()))
                .legacy_bus(Some(bus.clone()))
                .build()
                .unwrap();
            assert_eq!(bus.handler_count(), 2);
            drop(overlay);
        }
        assert_eq!(bus.handler_count(), 0);
    }
}
