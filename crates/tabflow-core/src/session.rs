//! # Session
//!
//! The single owned application state of a visualizer: the loaded bundle, the playback
//! cursor, the animation driver and the stage it plays on.
//!
//! The host drives it cooperatively and owns the clock. Every operation that starts
//! motion takes the host time `now` in milliseconds, so a host may stop ticking once
//! [`Session::settled_at`] has passed. [`Session::render_into`] paints the current frame.

use crate::config::VisualizerConfig;
use crate::errors::{RenderError, ServiceError, SessionError};
use crate::model::{ExplanationBundle, Step};
use crate::playback::{Cursor, Playback};
use crate::service::{AnalysisService, ServiceResult};
use crate::stage::Stage;
use crate::surface::AnimatableSurface;
use crate::systems::driver::{AnimationDriver, TransitionReport};
use crate::systems::renderer::Renderer;
use tracing::{debug, info, warn};

/// Identifies one analysis request. Later requests carry larger tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionFailure {
    MalformedBundle(String),
    ServiceFailure(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Loading(RequestToken),
    Ready,
    Failed(SessionFailure),
}

pub struct Session {
    config: VisualizerConfig,
    bundle: Option<ExplanationBundle>,
    playback: Playback,
    driver: AnimationDriver,
    stage: Stage,
    renderer: Renderer,
    status: SessionStatus,
    latest_request: u64,
    last_report: Option<TransitionReport>,
}

impl Session {
    pub fn new(config: VisualizerConfig, width: f32, height: f32) -> Self {
        Self {
            playback: Playback::new(0, config.timings.autoplay_interval_ms),
            driver: AnimationDriver::new(config.clone()),
            stage: Stage::new(width, height),
            renderer: Renderer::new(),
            config,
            bundle: None,
            status: SessionStatus::Idle,
            latest_request: 0,
            last_report: None,
        }
    }

    pub fn config(&self) -> &VisualizerConfig {
        &self.config
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn bundle(&self) -> Option<&ExplanationBundle> {
        self.bundle.as_ref()
    }

    pub fn cursor(&self) -> Cursor {
        self.playback.cursor()
    }

    pub fn playback(&self) -> &Playback {
        &self.playback
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    /// Report of the most recently scheduled transition.
    pub fn last_report(&self) -> Option<&TransitionReport> {
        self.last_report.as_ref()
    }

    pub fn current_step(&self) -> Option<&Step> {
        self.bundle
            .as_ref()
            .and_then(|b| b.steps.get(self.playback.index()))
    }

    /// Clock time at which the stage has no pending motion left.
    pub fn settled_at(&self) -> f64 {
        self.stage.settled_at()
    }

    /// Advances the stage clock to `now` without firing autoplay. Hosts call this
    /// before [`Session::load`] when they have been idle.
    pub fn set_clock(&mut self, now: f64) {
        self.stage.advance(now.max(self.stage.now()));
    }

    /// Replaces the bundle wholesale and shows its first step from the current clock.
    ///
    /// An invalid bundle leaves the previous one in place and marks the session failed.
    /// A successful load supersedes every analysis request still in flight.
    pub fn load(&mut self, bundle: ExplanationBundle) -> Result<(), SessionError> {
        if let Err(e) = bundle.validate() {
            warn!(error = %e, "rejecting malformed bundle");
            self.status = SessionStatus::Failed(SessionFailure::MalformedBundle(e.to_string()));
            return Err(e.into());
        }
        info!(steps = bundle.len(), "bundle loaded");
        self.latest_request += 1;
        self.playback.reset(bundle.len());
        self.bundle = Some(bundle);
        self.driver.reset(&mut self.stage);
        self.status = SessionStatus::Ready;
        self.show_current()?;
        Ok(())
    }

    /// Clears the bundle and the stage.
    pub fn reset(&mut self) {
        self.bundle = None;
        self.playback.reset(0);
        self.driver.reset(&mut self.stage);
        self.status = SessionStatus::Idle;
        self.last_report = None;
    }

    /// Issues a token for a new analysis request. Results of earlier requests will be
    /// discarded.
    pub fn begin_request(&mut self) -> RequestToken {
        self.latest_request += 1;
        let token = RequestToken(self.latest_request);
        self.status = SessionStatus::Loading(token);
        token
    }

    /// Applies the result of the request identified by `token`.
    ///
    /// Returns `Ok(false)` when a newer request has been issued since.
    pub fn complete_request(
        &mut self,
        token: RequestToken,
        result: ServiceResult<ExplanationBundle>,
    ) -> Result<bool, SessionError> {
        if token.0 != self.latest_request {
            debug!(token = token.0, latest = self.latest_request, "discarding stale result");
            return Ok(false);
        }
        match result {
            Ok(bundle) => self.load(bundle).map(|_| true),
            Err(ServiceError::InvalidBundle(e)) => {
                warn!(error = %e, "service returned a malformed bundle");
                self.status = SessionStatus::Failed(SessionFailure::MalformedBundle(e.to_string()));
                Err(SessionError::Bundle(e))
            }
            Err(e) => {
                warn!(error = %e, "analysis failed");
                self.status = SessionStatus::Failed(SessionFailure::ServiceFailure(e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Runs one request against `service` and applies its result.
    pub async fn analyze(
        &mut self,
        service: &dyn AnalysisService,
        source: &str,
    ) -> Result<bool, SessionError> {
        let token = self.begin_request();
        debug!(service = service.name(), token = token.0, "analysis requested");
        let result = service.analyze(source).await;
        self.complete_request(token, result)
    }

    pub fn go_to(&mut self, index: usize, now: f64) -> Result<(), RenderError> {
        self.set_clock(now);
        if self.playback.go_to(index) {
            self.show_current()?;
        }
        Ok(())
    }

    pub fn next(&mut self, now: f64) -> Result<(), RenderError> {
        self.set_clock(now);
        if self.playback.next() {
            self.show_current()?;
        }
        Ok(())
    }

    pub fn prev(&mut self, now: f64) -> Result<(), RenderError> {
        self.set_clock(now);
        if self.playback.prev() {
            self.show_current()?;
        }
        Ok(())
    }

    pub fn first(&mut self, now: f64) -> Result<(), RenderError> {
        self.set_clock(now);
        if self.playback.first() {
            self.show_current()?;
        }
        Ok(())
    }

    pub fn last(&mut self, now: f64) -> Result<(), RenderError> {
        self.set_clock(now);
        if self.playback.last() {
            self.show_current()?;
        }
        Ok(())
    }

    /// Starts or pauses autoplay. The first advance is due `autoplay_interval_ms`
    /// after `now`.
    pub fn toggle_play(&mut self, now: f64) -> Result<(), RenderError> {
        self.set_clock(now);
        if self.playback.toggle_play(self.stage.now()) {
            self.show_current()?;
        }
        Ok(())
    }

    /// Pauses autoplay without moving the cursor.
    pub fn stop(&mut self) {
        self.playback.stop();
    }

    /// Advances the clock to `now`: samples every tween, applies due removals and
    /// fires the autoplay deadline.
    pub fn tick(&mut self, now: f64) -> Result<(), RenderError> {
        self.stage.advance(now);
        if self.playback.poll(now).is_some() {
            self.show_current()?;
        }
        Ok(())
    }

    /// Adopts a new surface size and moves the frame to fit it. Transitions in flight
    /// keep playing.
    pub fn resize(&mut self, width: f32, height: f32, now: f64) -> Result<(), RenderError> {
        self.set_clock(now);
        self.stage.resize(width, height);
        self.driver.relayout(&mut self.stage)
    }

    pub fn render_into(&self, canvas: &skia_safe::Canvas) -> Result<(), RenderError> {
        self.renderer
            .render_stage(&self.stage, canvas, &self.config.palette)
    }

    pub fn snapshot_png(&self) -> Result<Vec<u8>, RenderError> {
        self.renderer.render_png(&self.stage, &self.config.palette)
    }

    fn show_current(&mut self) -> Result<(), RenderError> {
        let Some(step) = self
            .bundle
            .as_ref()
            .and_then(|b| b.steps.get(self.playback.index()))
        else {
            return Ok(());
        };
        let report = self.driver.show(step, &mut self.stage)?;
        self.last_report = Some(report);
        Ok(())
    }
}
