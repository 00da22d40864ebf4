use tracing::{info, warn};

use crate::actor::reactor::{Reactor, ReactorError};
use crate::sys::compositor::Compositor;
use crate::sys::participants::ParticipantSource;
use crate::sys::upstream::{Upstream, UpstreamRequest};

pub struct GalleryEventHandler;

impl GalleryEventHandler {
    pub async fn handle_connected<C, P, U>(
        reactor: &mut Reactor<C, P, U>,
    ) -> Result<(), ReactorError>
    where
        C: Compositor,
        P: ParticipantSource,
        U: Upstream,
    {
        info!("compositor connected");
        reactor.crop_all_scenes().await?;
        if let Err(e) = reactor.upstream.send(UpstreamRequest::EnableGalleryTracking).await {
            warn!(%e, "could not enable gallery tracking");
        }
        reactor.refresh_participants().await
    }

    /// Records the new natural order, re-crops the scene for its length and,
    /// once that scene is in order, fades to it if the tile count changed.
    pub async fn handle_order_changed<C, P, U>(
        reactor: &mut Reactor<C, P, U>,
        order: Vec<usize>,
    ) -> Result<(), ReactorError>
    where
        C: Compositor,
        P: ParticipantSource,
        U: Upstream,
    {
        let change = reactor.session.count.observe(order.len());
        reactor.session.order.set_natural_order(order);

        let result = match reactor.refresh_participants().await {
            Ok(()) => reactor.reconcile_current_scene().await,
            Err(e) => Err(e),
        };

        if let Some(change) = change {
            info!(from = change.from, to = change.to, "tile count changed");
            reactor.start_transition(change.to);
        }
        result
    }

    pub async fn handle_assign_order<C, P, U>(
        reactor: &mut Reactor<C, P, U>,
        names: Vec<String>,
    ) -> Result<(), ReactorError>
    where
        C: Compositor,
        P: ParticipantSource,
        U: Upstream,
    {
        info!(?names, "assigned order");
        reactor.session.order.set_assigned_order(names);
        reactor.reconcile_current_scene().await
    }
}
