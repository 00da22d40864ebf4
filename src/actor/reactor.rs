//! The reactor owns a control session and is its only writer.
//!
//! Inbound events are processed strictly one at a time, in arrival order. A
//! handler may await collaborator calls, but no other event can observe or
//! change session state until it returns. Scene transitions are the one thing
//! that outlives a handler; they run as a separate task and are superseded,
//! not queued, when the tile count changes again.

pub mod events;
pub mod managers;
pub mod transition;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{Instrument, debug, error, info, instrument, trace, warn};

use self::events::command::CommandEventHandler;
use self::events::gallery::GalleryEventHandler;
use self::managers::Reconciliation;
use self::transition::{FadeTransition, TransitionManager};
use crate::actor::{self, broadcast};
use crate::actor::broadcast::BroadcastEvent;
use crate::common::config::Config;
use crate::layout_engine::{CropCalculator, CropValues, LayoutError};
use crate::model::server::{SceneData, SessionSnapshot, SourceId};
use crate::model::{CropStore, Generation, SceneState, Session};
use crate::sys::compositor::{Compositor, CompositorError, with_retry};
use crate::sys::participants::{ParticipantListError, ParticipantSource};
use crate::sys::upstream::{Upstream, UpstreamRequest};

#[derive(Debug)]
pub enum Event {
    /// The display-composition system is reachable (again).
    CompositorConnected,
    /// Upstream gallery order, as participant indices.
    OrderChanged(Vec<usize>),
    /// Upstream tile count. Informational; the count is taken from `OrderChanged`.
    CountChanged(usize),
    AssignOrder(Vec<String>),
    SetScenePrefix(String),
    Command(Command),
    QueryState {
        response: oneshot::Sender<SessionSnapshot>,
    },
}

/// Operator commands passed through to the compositor.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SwitchScene(String),
    SetTransition {
        name: String,
        duration: Option<Duration>,
    },
    CropAllScenes,
    /// Logs and broadcasts every scene with its sources.
    ListSources,
}

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

#[derive(Debug, Error)]
pub enum ReactorError {
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Participants(#[from] ParticipantListError),
    #[error(transparent)]
    Compositor(#[from] CompositorError),
}

pub struct Reactor<C, P, U> {
    pub(crate) config: Config,
    pub(crate) calculator: CropCalculator,
    pub(crate) compositor: Arc<C>,
    pub(crate) participants: P,
    pub(crate) upstream: U,
    pub(crate) session: Session,
    pub(crate) crop_store: CropStore,
    pub(crate) transitions: TransitionManager,
    pub(crate) broadcast_tx: Option<broadcast::BroadcastSender>,
}

impl<C, P, U> Reactor<C, P, U>
where
    C: Compositor,
    P: ParticipantSource,
    U: Upstream,
{
    pub fn new(config: Config, compositor: Arc<C>, participants: P, upstream: U) -> Self {
        Reactor {
            calculator: CropCalculator::new(config.layout.clone()),
            session: Session::new(config.scenes.prefix.clone()),
            config,
            compositor,
            participants,
            upstream,
            crop_store: CropStore::new(),
            transitions: TransitionManager::new(),
            broadcast_tx: None,
        }
    }

    pub fn with_broadcast(mut self, tx: broadcast::BroadcastSender) -> Self {
        self.broadcast_tx = Some(tx);
        self
    }

    pub fn session(&self) -> &Session { &self.session }

    pub fn crop_store(&self) -> &CropStore { &self.crop_store }

    /// Processes events until every sender is gone, then lets a running
    /// transition complete.
    pub async fn run(mut self, mut rx: Receiver) {
        while let Some((span, event)) = rx.recv().await {
            self.handle_event(event).instrument(span).await;
        }
        debug!("event channel closed; waiting for pending transition");
        self.transitions.wait_idle().await;
    }

    #[instrument(name = "reactor::handle_event", skip(self))]
    pub async fn handle_event(&mut self, event: Event) {
        let result = match event {
            Event::CompositorConnected => GalleryEventHandler::handle_connected(self).await,
            Event::OrderChanged(order) => {
                GalleryEventHandler::handle_order_changed(self, order).await
            }
            Event::CountChanged(count) => {
                debug!(count, "upstream reported tile count");
                Ok(())
            }
            Event::AssignOrder(names) => {
                GalleryEventHandler::handle_assign_order(self, names).await
            }
            Event::SetScenePrefix(prefix) => {
                CommandEventHandler::handle_set_scene_prefix(self, prefix);
                Ok(())
            }
            Event::Command(cmd) => CommandEventHandler::handle_command(self, cmd).await,
            Event::QueryState { response } => {
                _ = response.send(self.session.snapshot());
                Ok(())
            }
        };
        if let Err(e) = result {
            error!(%e, "update cycle failed");
        }
    }

    pub(crate) fn publish(&self, event: BroadcastEvent) {
        if let Some(tx) = &self.broadcast_tx {
            tx.send(event);
        }
    }

    async fn list_scenes(&self) -> Option<Vec<SceneData>> {
        match self.compositor.list_scenes().await {
            Ok(scenes) => Some(scenes),
            Err(e) => {
                warn!(%e, "failed to list scenes");
                None
            }
        }
    }

    /// Asks upstream for a fresh participant list and reads it.
    pub(crate) async fn refresh_participants(&mut self) -> Result<(), ReactorError> {
        let settle = self.config.participants.refresh_settle;
        for request in [UpstreamRequest::UpdateParticipants, UpstreamRequest::SaveParticipants] {
            if let Err(e) = self.upstream.send(request).await {
                warn!(%e, "upstream request failed");
            }
            tokio::time::sleep(settle).await;
        }
        let participants = self.participants.read_participants().await?;
        self.session.order.set_participants(participants);
        Ok(())
    }

    /// Crops every capture source of every scene to its natural gallery tile.
    /// The ledger is reset first, so every crop is sent even if unchanged.
    pub(crate) async fn crop_all_scenes(&mut self) -> Result<(), ReactorError> {
        let Some(scenes) = self.list_scenes().await else {
            return Ok(());
        };
        self.crop_store.clear();
        for scene in scenes {
            let sources = scene.capture_sources(&self.config.scenes);
            let Some(first) = sources.first() else {
                trace!(scene = %scene.name, "no capture sources");
                continue;
            };
            let crops = match self.calculator.calculate(first.frame(), sources.len()) {
                Ok(crops) => crops,
                Err(e) => {
                    warn!(scene = %scene.name, %e, "cannot lay out scene");
                    continue;
                }
            };
            info!(scene = %scene.name, count = sources.len(), "cropping scene sources");

            let generation = self.session.next_generation();
            let mut applied = 0;
            for (source, crop) in sources.iter().zip(&crops) {
                if self.apply_crop(&scene.name, source.id, *crop, generation).await {
                    applied += 1;
                }
            }
            self.session.scenes.insert(scene.name.clone(), SceneState {
                count: crops.len(),
                last_crops: crops,
            });
            self.publish(BroadcastEvent::CropsApplied {
                scene: scene.name.clone(),
                tile_count: sources.len(),
                applied,
                generation: generation.get(),
            });
        }
        Ok(())
    }

    /// Assigns crops in the scene for the current tile count so that each slot
    /// shows the participant the operator put there.
    pub(crate) async fn reconcile_current_scene(&mut self) -> Result<(), ReactorError> {
        let scene_name = self.session.current_scene_name();
        let Some(scenes) = self.list_scenes().await else {
            return Ok(());
        };
        let Some(scene) = scenes.into_iter().find(|s| s.name == scene_name) else {
            warn!(scene = %scene_name, "scene for tile count does not exist");
            return Ok(());
        };
        let sources = scene.capture_sources(&self.config.scenes);
        let Some(first) = sources.first() else {
            debug!(scene = %scene_name, "scene has no capture sources");
            return Ok(());
        };

        let crops = self.calculator.calculate(first.frame(), sources.len())?;
        self.session.scenes.insert(scene_name.clone(), SceneState {
            last_crops: crops.clone(),
            count: sources.len(),
        });

        let plan = match self.session.order.plan(sources.len()) {
            Reconciliation::Skipped { assigned, natural } => {
                debug!(assigned, natural, "reconciliation skipped");
                return Ok(());
            }
            Reconciliation::Mapped(plan) => plan,
        };

        let generation = self.session.next_generation();
        let mut applied = 0;
        for assignment in &plan.assignments {
            let Some(crop) = crops.get(assignment.natural_index) else {
                warn!(
                    name = %assignment.name,
                    natural_index = assignment.natural_index,
                    tiles = crops.len(),
                    "participant sits outside the scene's tiles; leaving slot unchanged"
                );
                continue;
            };
            let source = sources[assignment.slot].id;
            trace!(slot = assignment.slot, name = %assignment.name, %source, "assigning tile");
            if self.apply_crop(&scene_name, source, *crop, generation).await {
                applied += 1;
            }
        }
        self.publish(BroadcastEvent::CropsApplied {
            scene: scene_name,
            tile_count: sources.len(),
            applied,
            generation: generation.get(),
        });
        Ok(())
    }

    /// Sends one crop unless the item already shows it. Failures are logged and
    /// reported as not applied.
    async fn apply_crop(
        &self,
        scene: &str,
        source: SourceId,
        crop: CropValues,
        generation: Generation,
    ) -> bool {
        if self.crop_store.is_current(scene, source, &crop) {
            trace!(scene, %source, "crop unchanged");
            return false;
        }
        let compositor = &*self.compositor;
        let result = with_retry(self.config.collaborator.retry_attempts, "apply_crop", || {
            compositor.apply_crop(scene, source, crop)
        })
        .await;
        match result {
            Ok(()) => self.crop_store.record(scene, source, generation, crop),
            Err(e) => {
                warn!(scene, %source, %e, "failed to apply crop");
                false
            }
        }
    }

    pub(crate) fn start_transition(&mut self, count: usize) {
        let transition = FadeTransition {
            target: self.session.scene_name(count),
            blank_scene: self.config.scenes.blank_scene.clone(),
            settings: self.config.transition.clone(),
            retry_attempts: self.config.collaborator.retry_attempts,
        };
        self.transitions.start(transition, self.compositor.clone(), self.broadcast_tx.clone());
    }

    /// Waits for a running scene transition to end.
    pub async fn settle(&mut self) { self.transitions.wait_idle().await; }
}
