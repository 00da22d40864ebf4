use tracing::{info, warn};

use crate::actor::broadcast::BroadcastEvent;
use crate::actor::reactor::{Command, Reactor, ReactorError};
use crate::sys::compositor::{Compositor, with_retry};
use crate::sys::participants::ParticipantSource;
use crate::sys::upstream::Upstream;

pub struct CommandEventHandler;

impl CommandEventHandler {
    pub async fn handle_command<C, P, U>(
        reactor: &mut Reactor<C, P, U>,
        cmd: Command,
    ) -> Result<(), ReactorError>
    where
        C: Compositor,
        P: ParticipantSource,
        U: Upstream,
    {
        info!(?cmd);
        match cmd {
            Command::SwitchScene(scene) => {
                let compositor = &*reactor.compositor;
                let retries = reactor.config.collaborator.retry_attempts;
                let result =
                    with_retry(retries, "switch_scene", || compositor.switch_scene(&scene)).await;
                if let Err(e) = result {
                    warn!(%scene, %e, "failed to switch scene");
                }
            }
            Command::SetTransition { name, duration } => {
                if let Err(e) = reactor.compositor.set_transition(&name, duration).await {
                    warn!(%name, ?duration, %e, "failed to set transition");
                }
            }
            Command::CropAllScenes => reactor.crop_all_scenes().await?,
            Command::ListSources => {
                let scenes = reactor.compositor.list_scenes().await?;
                for scene in &scenes {
                    info!(scene = %scene.name, sources = ?scene.sources, "scene");
                }
                reactor.publish(BroadcastEvent::SourcesListed { scenes });
            }
        }
        Ok(())
    }

    pub fn handle_set_scene_prefix<C, P, U>(reactor: &mut Reactor<C, P, U>, prefix: String) {
        info!(%prefix, "scene prefix changed");
        reactor.session.scene_prefix = prefix;
    }
}
