//! Analysis lifecycle: one pass at a time, from capture to render.
//!
//! DESIGN
//! ======
//! A pass walks `Idle → Capturing → Awaiting → Rendering → Idle`. The mode
//! (active or idle) is fixed at the start of the pass from the activity clock.
//!
//! Exclusivity is an atomic flag taken by whoever starts a pass and released
//! by a drop guard, so a failing pass can never leave it set. The surface
//! mutex is held only for the two synchronous windows that touch the page
//! (rasterize, then clear-and-render); the student keeps drawing while the
//! request is in flight.
//!
//! Triggers that arrive while a pass is running:
//!
//! | Trigger | Effect |
//! |---------|--------|
//! | timer tick | dropped |
//! | manual | recorded; exactly one follow-up pass runs when the current one ends |
//!
//! Rendering always clears the previous annotation set first, so an empty
//! result wipes stale markers. Solution shapes are a separate set and are
//! not touched by that clear.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};

use canvas::surface::Surface;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::annotation::Annotation;
use crate::bounds::{CapturePurpose, CapturedBounds};
use crate::capture::{self, CaptureError};
use crate::client::{AnalysisMode, AnalyzeRequest, AnnotationClient, ClientError, SolutionRequest, TutorClient};
use crate::clock::ActivityClock;
use crate::config::AnnotatorConfig;
use crate::dedup::SpatialDeduplicator;
use crate::error::{ErrorCode, PassError};
use crate::render::{AnnotationRenderer, RenderReport};
use crate::solution::SolutionRenderer;
use crate::tag;

const NOTICE_CAPACITY: usize = 16;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Capturing,
    Awaiting,
    Rendering,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::Awaiting => "awaiting",
            Self::Rendering => "rendering",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Timer,
    Manual,
}

/// Non-blocking, user-visible notices about failed passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    TransportFailure { message: String },
    CaptureFailure { message: String },
}

/// Summary of a completed analysis pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassReport {
    pub mode: AnalysisMode,
    /// Annotations returned by the backend.
    pub received: usize,
    /// Previous annotation shapes removed.
    pub cleared: usize,
    pub render: RenderReport,
}

#[derive(Debug)]
pub enum PassOutcome {
    Completed(PassReport),
    /// The pass ended early; the canvas was not changed.
    Aborted(PassError),
    /// A pass was running; this manual trigger will run once it finishes.
    Queued,
    /// Timer tick dropped (busy, or manual-trigger-only mode).
    Ignored,
}

/// Summary of a rendered solution.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionReport {
    pub steps: usize,
    pub cleared: usize,
    pub shape_count: usize,
}

// =============================================================================
// MANAGER
// =============================================================================

/// Owns every programmatic write to the shared canvas.
pub struct LifecycleManager<S: Surface> {
    surface: Arc<Mutex<S>>,
    client: Arc<dyn AnnotationClient>,
    tutor: Arc<dyn TutorClient>,
    clock: Arc<ActivityClock>,
    config: AnnotatorConfig,
    renderer: std::sync::Mutex<AnnotationRenderer>,
    exercise_statement: std::sync::Mutex<String>,
    busy: AtomicBool,
    pending: AtomicBool,
    phase: watch::Sender<Phase>,
    notices: broadcast::Sender<Notice>,
}

/// Holds the exclusivity flag for one pass.
struct PassGuard<'a> {
    busy: &'a AtomicBool,
    phase: &'a watch::Sender<Phase>,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.phase.send_replace(Phase::Idle);
        self.busy.store(false, Ordering::SeqCst);
    }
}

impl<S: Surface> LifecycleManager<S> {
    #[must_use]
    pub fn new(
        surface: Arc<Mutex<S>>,
        client: Arc<dyn AnnotationClient>,
        tutor: Arc<dyn TutorClient>,
        clock: Arc<ActivityClock>,
        config: AnnotatorConfig,
    ) -> Self {
        let renderer = AnnotationRenderer::new(config.marker_tilt);
        Self::with_renderer(surface, client, tutor, clock, config, renderer)
    }

    /// Like [`LifecycleManager::new`] with an explicit renderer (seeded tilt).
    #[must_use]
    pub fn with_renderer(
        surface: Arc<Mutex<S>>,
        client: Arc<dyn AnnotationClient>,
        tutor: Arc<dyn TutorClient>,
        clock: Arc<ActivityClock>,
        config: AnnotatorConfig,
        renderer: AnnotationRenderer,
    ) -> Self {
        let (phase, _) = watch::channel(Phase::Idle);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            surface,
            client,
            tutor,
            clock,
            config,
            renderer: std::sync::Mutex::new(renderer),
            exercise_statement: std::sync::Mutex::new(String::new()),
            busy: AtomicBool::new(false),
            pending: AtomicBool::new(false),
            phase,
            notices,
        }
    }

    // --- Status ---

    #[must_use]
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    #[must_use]
    pub fn is_analyzing(&self) -> bool {
        self.phase() != Phase::Idle
    }

    #[must_use]
    pub fn subscribe_phase(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    #[must_use]
    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    #[must_use]
    pub fn clock(&self) -> &Arc<ActivityClock> {
        &self.clock
    }

    #[must_use]
    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    pub fn set_exercise_statement(&self, statement: impl Into<String>) {
        *self.exercise_statement.lock().unwrap_or_else(PoisonError::into_inner) = statement.into();
    }

    #[must_use]
    pub fn exercise_statement(&self) -> String {
        self.exercise_statement.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    // --- Analysis ---

    /// Run an analysis pass, or queue/drop the trigger if one is running.
    ///
    /// The caller that runs a pass also runs the coalesced follow-up (if any
    /// manual trigger arrived meanwhile) before returning; the returned
    /// outcome is that of the caller's own pass.
    pub async fn trigger(&self, trigger: Trigger) -> PassOutcome {
        if trigger == Trigger::Timer && self.config.manual_trigger_only {
            return PassOutcome::Ignored;
        }
        let Some(guard) = self.try_begin() else {
            return match trigger {
                Trigger::Manual => {
                    debug!("lifecycle: pass in flight, manual trigger queued");
                    self.pending.store(true, Ordering::SeqCst);
                    // The owner may have released between our attempt and the store.
                    self.drain_pending().await;
                    PassOutcome::Queued
                }
                Trigger::Timer => {
                    debug!("lifecycle: pass in flight, timer tick dropped");
                    PassOutcome::Ignored
                }
            };
        };
        let outcome = self.run_pass_logged(&guard).await;
        drop(guard);
        self.drain_pending().await;
        outcome
    }

    /// Run queued follow-up passes until none is pending. `pending` is only
    /// cleared while holding the pass flag, so a request stored while another
    /// caller holds it is seen by that caller after it releases.
    async fn drain_pending(&self) {
        while self.pending.load(Ordering::SeqCst) {
            let Some(guard) = self.try_begin() else {
                return;
            };
            if self.pending.swap(false, Ordering::SeqCst) {
                debug!("lifecycle: running coalesced follow-up pass");
                self.run_pass_logged(&guard).await;
            }
        }
    }

    /// Start the periodic analysis timer. The immediate first tick is skipped.
    pub fn spawn_timer(self: Arc<Self>) -> JoinHandle<()>
    where
        S: 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.config.analysis_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                self.trigger(Trigger::Timer).await;
            }
        })
    }

    fn try_begin(&self) -> Option<PassGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
            .then(|| PassGuard { busy: &self.busy, phase: &self.phase })
    }

    async fn run_pass_logged(&self, _guard: &PassGuard<'_>) -> PassOutcome {
        match self.run_pass().await {
            Ok(report) => {
                info!(
                    mode = %report.mode,
                    received = report.received,
                    cleared = report.cleared,
                    placed = report.render.placed,
                    suppressed = report.render.suppressed,
                    "lifecycle: pass complete"
                );
                PassOutcome::Completed(report)
            }
            Err(e) => {
                self.report_failure(&e);
                PassOutcome::Aborted(e)
            }
        }
    }

    async fn run_pass(&self) -> Result<PassReport, PassError> {
        let mode = self.clock.mode();
        debug!(%mode, "lifecycle: pass started");

        self.set_phase(Phase::Capturing);
        let image = capture::capture(&self.surface, CapturePurpose::Analysis).await?;

        self.set_phase(Phase::Awaiting);
        let request = AnalyzeRequest {
            image_data_url: image.data_url,
            mode,
            exercise_statement: self.exercise_statement(),
        };
        let annotations = self.analyze_with_backstop(&request).await?;

        self.set_phase(Phase::Rendering);
        let (cleared, render) = {
            let mut surface = self.surface.lock().await;
            self.apply(&mut *surface, &annotations, &image.bounds)
        };

        if mode == AnalysisMode::Idle && !annotations.is_empty() {
            self.clock.bump();
        }
        Ok(PassReport { mode, received: annotations.len(), cleared, render })
    }

    async fn analyze_with_backstop(&self, request: &AnalyzeRequest) -> Result<Vec<Annotation>, ClientError> {
        let limit = self.config.analyze_timeout;
        match tokio::time::timeout(limit, self.client.analyze(request)).await {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout(limit)),
        }
    }

    /// Clear the previous annotation set, then render the new one.
    fn apply(&self, surface: &mut S, annotations: &[Annotation], bounds: &CapturedBounds) -> (usize, RenderReport) {
        let stale = tag::annotation_shape_ids(surface);
        surface.delete_shapes(&stale);
        let dedup = SpatialDeduplicator::from_surface(surface, self.config.dedup_radius);
        let render = self.renderer.lock().unwrap_or_else(PoisonError::into_inner).render_all(
            surface,
            annotations,
            bounds,
            dedup,
        );
        (stale.len(), render)
    }

    /// Remove every live annotation shape without running a pass.
    ///
    /// # Errors
    ///
    /// Returns [`PassError::Busy`] while a pass is in flight.
    pub async fn clear_annotations(&self) -> Result<usize, PassError> {
        let _guard = self.try_begin().ok_or(PassError::Busy)?;
        let mut surface = self.surface.lock().await;
        let stale = tag::annotation_shape_ids(&*surface);
        surface.delete_shapes(&stale);
        Ok(stale.len())
    }

    // --- Solution ---

    /// Capture a snapshot, ask for a worked solution, and write it onto the
    /// page in place of any previous one. Shares exclusivity with analysis.
    ///
    /// # Errors
    ///
    /// [`PassError::Busy`] if a pass is running, otherwise capture or
    /// transport failures. The canvas is unchanged on error.
    pub async fn generate_solution(&self) -> Result<SolutionReport, PassError> {
        let guard = self.try_begin().ok_or(PassError::Busy)?;
        let result = self.run_solution().await;
        drop(guard);
        if let Err(e) = &result {
            self.report_failure(e);
        }
        result
    }

    async fn run_solution(&self) -> Result<SolutionReport, PassError> {
        self.set_phase(Phase::Capturing);
        let image_data_url = match capture::capture(&self.surface, CapturePurpose::Snapshot).await {
            Ok(image) => Some(image.data_url),
            Err(CaptureError::NoContent) => None,
            Err(e) => return Err(e.into()),
        };

        self.set_phase(Phase::Awaiting);
        let request = SolutionRequest { exercise_statement: self.exercise_statement(), image_data_url };
        let limit = self.config.analyze_timeout;
        let steps = match tokio::time::timeout(limit, self.tutor.generate_solution(&request)).await {
            Ok(result) => result?,
            Err(_) => return Err(ClientError::Timeout(limit).into()),
        };

        self.set_phase(Phase::Rendering);
        let mut surface = self.surface.lock().await;
        let cleared = SolutionRenderer::clear(&mut *surface);
        let ids = SolutionRenderer::render(&mut *surface, &steps);
        info!(steps = steps.len(), cleared, shape_count = ids.len(), "lifecycle: solution rendered");
        Ok(SolutionReport { steps: steps.len(), cleared, shape_count: ids.len() })
    }

    /// Remove a previously rendered solution.
    ///
    /// # Errors
    ///
    /// Returns [`PassError::Busy`] while a pass is in flight.
    pub async fn clear_solution(&self) -> Result<usize, PassError> {
        let _guard = self.try_begin().ok_or(PassError::Busy)?;
        let mut surface = self.surface.lock().await;
        Ok(SolutionRenderer::clear(&mut *surface))
    }

    // --- Internals ---

    fn set_phase(&self, phase: Phase) {
        debug!(%phase, "lifecycle: phase");
        self.phase.send_replace(phase);
    }

    fn report_failure(&self, e: &PassError) {
        let notice = match e {
            PassError::NoContent => {
                debug!("lifecycle: canvas empty, pass skipped");
                return;
            }
            PassError::Busy => {
                debug!("lifecycle: busy");
                return;
            }
            PassError::CaptureFailure(message) => {
                warn!(error = %e, code = e.error_code(), "lifecycle: capture failed");
                Notice::CaptureFailure { message: message.clone() }
            }
            PassError::TransportFailure(inner) => {
                warn!(error = %e, code = inner.error_code(), retryable = inner.retryable(), "lifecycle: tutor call failed");
                Notice::TransportFailure { message: inner.to_string() }
            }
        };
        if self.notices.send(notice).is_err() {
            debug!("lifecycle: no notice subscribers");
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod tests;
