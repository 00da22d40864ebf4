//! Requests sent back to the upstream video source.

use std::future::Future;

use strum::{Display, IntoStaticStr};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum UpstreamRequest {
    /// Start reporting gallery order and count changes.
    EnableGalleryTracking,
    /// Refresh the upstream participant list.
    UpdateParticipants,
    /// Write the participant list where the participant source reads it.
    SaveParticipants,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("upstream request {request} failed: {message}")]
pub struct UpstreamError {
    pub request: UpstreamRequest,
    pub message: String,
}

pub trait Upstream: Send + Sync + 'static {
    fn send(&self, request: UpstreamRequest)
    -> impl Future<Output = Result<(), UpstreamError>> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingUpstream;

impl Upstream for LoggingUpstream {
    async fn send(&self, request: UpstreamRequest) -> Result<(), UpstreamError> {
        info!(%request, "upstream request");
        Ok(())
    }
}
