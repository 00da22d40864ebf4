use std::future::Future;
use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ParticipantListError {
    #[error("failed to read participant list {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Supplies participant names ordered by participant index.
pub trait ParticipantSource: Send + Sync + 'static {
    fn read_participants(
        &self,
    ) -> impl Future<Output = Result<Vec<String>, ParticipantListError>> + Send;
}

/// Participant list saved by the upstream source: one name per line, the line
/// number is the participant index.
#[derive(Debug, Clone)]
pub struct FileParticipants {
    path: PathBuf,
}

impl FileParticipants {
    pub fn new(path: impl Into<PathBuf>) -> Self { FileParticipants { path: path.into() } }

    pub fn path(&self) -> &PathBuf { &self.path }
}

pub fn parse_participants(text: &str) -> Vec<String> {
    text.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line).to_string()).collect()
}

impl ParticipantSource for FileParticipants {
    async fn read_participants(&self) -> Result<Vec<String>, ParticipantListError> {
        let text = tokio::fs::read_to_string(&self.path).await.map_err(|source| {
            ParticipantListError::Read { path: self.path.clone(), source }
        })?;
        let names = parse_participants(&text);
        debug!(path = %self.path.display(), count = names.len(), "read participant list");
        Ok(names)
    }
}
