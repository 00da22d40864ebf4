use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::actor::broadcast::{BroadcastEvent, BroadcastSender};
use crate::common::config::TransitionSettings;
use crate::sys::compositor::{Compositor, with_retry};

/// Fade through the blank scene to `target`.
///
/// The blank scene is reached with a short fade, then the target is revealed
/// with the long one once it has had time to settle.
#[derive(Debug, Clone)]
pub struct FadeTransition {
    pub target: String,
    pub blank_scene: String,
    pub settings: TransitionSettings,
    pub retry_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Finished,
    Cancelled,
}

#[derive(Clone, Debug)]
pub struct TransitionCancel {
    generation: u64,
    token: Arc<AtomicU64>,
    cancelled: CancellationToken,
}

impl TransitionCancel {
    pub fn new(token: Arc<AtomicU64>, generation: u64, cancelled: CancellationToken) -> Self {
        Self { generation, token, cancelled }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.is_cancelled() || self.token.load(Ordering::Relaxed) != self.generation
    }

    /// Sleeps for `duration`; returns false if cancelled first.
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancelled.cancelled() => false,
            _ = tokio::time::sleep(duration) => !self.is_cancelled(),
        }
    }
}

impl FadeTransition {
    pub async fn run<C: Compositor>(
        &self,
        compositor: &C,
        cancel: &TransitionCancel,
    ) -> TransitionOutcome {
        let s = &self.settings;

        if cancel.is_cancelled() {
            return TransitionOutcome::Cancelled;
        }
        self.set_transition(compositor, s.fade_out).await;
        if !cancel.pause(s.settle).await {
            return TransitionOutcome::Cancelled;
        }
        self.switch_to(compositor, &self.blank_scene).await;
        if cancel.is_cancelled() {
            return TransitionOutcome::Cancelled;
        }
        self.set_transition(compositor, s.fade_in).await;
        if !cancel.pause(s.fade_in).await {
            return TransitionOutcome::Cancelled;
        }
        self.switch_to(compositor, &self.target).await;
        TransitionOutcome::Finished
    }

    async fn set_transition<C: Compositor>(&self, compositor: &C, duration: Duration) {
        if let Err(e) = compositor.set_transition(&self.settings.name, Some(duration)).await {
            warn!(name = %self.settings.name, ?duration, %e, "failed to set transition");
        }
    }

    async fn switch_to<C: Compositor>(&self, compositor: &C, scene: &str) {
        let result =
            with_retry(self.retry_attempts, "switch_scene", || compositor.switch_scene(scene))
                .await;
        if let Err(e) = result {
            warn!(scene, %e, "failed to switch scene");
        }
    }
}

struct ActiveTransition {
    cancelled: CancellationToken,
    handle: JoinHandle<TransitionOutcome>,
}

/// Owns the at-most-one running transition. Starting a new one supersedes the
/// previous one, which stops at its next step.
#[derive(Default)]
pub struct TransitionManager {
    generation: Arc<AtomicU64>,
    active: Option<ActiveTransition>,
}

impl TransitionManager {
    pub fn new() -> Self { Self::default() }

    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(|active| !active.handle.is_finished())
    }

    pub fn start<C: Compositor>(
        &mut self,
        transition: FadeTransition,
        compositor: Arc<C>,
        broadcast: Option<BroadcastSender>,
    ) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(previous) = self.active.take() {
            if !previous.handle.is_finished() {
                debug!(generation, "superseding running transition");
            }
            previous.cancelled.cancel();
        }

        let cancelled = CancellationToken::new();
        let cancel = TransitionCancel::new(self.generation.clone(), generation, cancelled.clone());
        info!(target_scene = %transition.target, generation, "starting scene transition");
        if let Some(tx) = &broadcast {
            tx.send(BroadcastEvent::SceneTransitionStarted {
                target: transition.target.clone(),
                generation,
            });
        }

        let span = info_span!("transition", target_scene = %transition.target, generation);
        let handle = tokio::spawn(
            async move {
                let outcome = transition.run(&*compositor, &cancel).await;
                let target = transition.target;
                let event = match outcome {
                    TransitionOutcome::Finished => {
                        debug!("scene transition finished");
                        BroadcastEvent::SceneTransitionFinished { target, generation }
                    }
                    TransitionOutcome::Cancelled => {
                        info!("scene transition cancelled");
                        BroadcastEvent::SceneTransitionCancelled { target, generation }
                    }
                };
                if let Some(tx) = broadcast {
                    tx.send(event);
                }
                outcome
            }
            .instrument(span),
        );

        self.active = Some(ActiveTransition { cancelled, handle });
        generation
    }

    pub fn cancel(&mut self) {
        if let Some(active) = &self.active {
            active.cancelled.cancel();
        }
    }

    /// Waits for the running transition, if any, to finish or stop.
    pub async fn wait_idle(&mut self) -> Option<TransitionOutcome> {
        let active = self.active.take()?;
        match active.handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(%e, "transition task failed");
                None
            }
        }
    }
}
