//! Notebook wiring: one canvas, one tutor backend, one lifecycle manager.
//!
//! DESIGN
//! ======
//! `attach` takes ownership of the surface, registers its listeners, and
//! only then puts it behind the shared mutex:
//!
//! - user edits stamp the [`ActivityClock`] (programmatic writes never do);
//! - selection changes are forwarded over an unbounded channel to the
//!   [`SelectionBridge`] task, so the listener never waits on the lock it
//!   is called under.
//!
//! Background tasks (selection bridge, analysis timer) are aborted when the
//! notebook is dropped.

use std::sync::{Arc, PoisonError};

use canvas::surface::Surface;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::chat::ChatSession;
use crate::client::{AnnotationClient, TutorClient};
use crate::clock::ActivityClock;
use crate::config::AnnotatorConfig;
use crate::lifecycle::{LifecycleManager, PassOutcome, Trigger};
use crate::selection::{AnnotationDetail, SelectionBridge};

pub struct Notebook<S: Surface + 'static> {
    surface: Arc<Mutex<S>>,
    manager: Arc<LifecycleManager<S>>,
    tutor: Arc<dyn TutorClient>,
    detail: watch::Receiver<Option<AnnotationDetail>>,
    bridge_task: JoinHandle<()>,
    timer_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl<S: Surface + 'static> Notebook<S> {
    /// Wire `surface` to `client`. Must be called inside a Tokio runtime.
    pub fn attach<C>(mut surface: S, client: Arc<C>, config: AnnotatorConfig) -> Self
    where
        C: AnnotationClient + TutorClient + 'static,
    {
        let clock = Arc::new(ActivityClock::new(config.idle_threshold));
        let edit_clock = Arc::clone(&clock);
        surface.on_user_edit(Box::new(move || edit_clock.record_edit()));

        let (selection_tx, selection_rx) = mpsc::unbounded_channel();
        surface.on_selection_changed(Box::new(move |ids| {
            if selection_tx.send(ids.to_vec()).is_err() {
                debug!("notebook: selection bridge gone, event dropped");
            }
        }));

        let surface = Arc::new(Mutex::new(surface));
        let bridge = SelectionBridge::new(Arc::clone(&surface));
        let detail = bridge.subscribe();
        let bridge_task = tokio::spawn(bridge.run(selection_rx));

        let tutor: Arc<dyn TutorClient> = client.clone();
        let manager = Arc::new(LifecycleManager::new(Arc::clone(&surface), client, Arc::clone(&tutor), clock, config));
        info!(
            interval_secs = manager.config().analysis_interval.as_secs(),
            manual_only = manager.config().manual_trigger_only,
            "notebook: attached"
        );

        Self { surface, manager, tutor, detail, bridge_task, timer_task: std::sync::Mutex::new(None) }
    }

    #[must_use]
    pub fn manager(&self) -> &Arc<LifecycleManager<S>> {
        &self.manager
    }

    #[must_use]
    pub fn surface(&self) -> &Arc<Mutex<S>> {
        &self.surface
    }

    /// Latest detail for the selected annotation, `None` when dismissed.
    #[must_use]
    pub fn detail(&self) -> watch::Receiver<Option<AnnotationDetail>> {
        self.detail.clone()
    }

    pub fn set_exercise_statement(&self, statement: impl Into<String>) {
        self.manager.set_exercise_statement(statement);
    }

    /// A fresh chat about the current exercise.
    #[must_use]
    pub fn chat(&self) -> ChatSession<S> {
        ChatSession::new(Arc::clone(&self.surface), Arc::clone(&self.tutor), self.manager.exercise_statement())
    }

    /// The "analyze now" button.
    pub async fn analyze_now(&self) -> PassOutcome {
        self.manager.trigger(Trigger::Manual).await
    }

    /// Start the periodic analysis timer. Calling it again is a no-op.
    pub fn start_timer(&self) {
        let mut slot = self.timer_task.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            *slot = Some(Arc::clone(&self.manager).spawn_timer());
        }
    }

    #[must_use]
    pub fn timer_running(&self) -> bool {
        self.timer_task.lock().unwrap_or_else(PoisonError::into_inner).as_ref().is_some_and(|t| !t.is_finished())
    }
}

impl<S: Surface + 'static> Drop for Notebook<S> {
    fn drop(&mut self) {
        self.bridge_task.abort();
        if let Some(timer) = self.timer_task.lock().unwrap_or_else(PoisonError::into_inner).take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
