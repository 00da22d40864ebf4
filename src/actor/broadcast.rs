use serde::{Deserialize, Serialize};

use crate::model::server::SceneData;

/// What the reactor did, for anyone watching (the CLI prints these).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum BroadcastEvent {
    CropsApplied {
        scene: String,
        tile_count: usize,
        applied: usize,
        generation: u64,
    },
    SceneTransitionStarted {
        target: String,
        generation: u64,
    },
    SceneTransitionFinished {
        target: String,
        generation: u64,
    },
    SceneTransitionCancelled {
        target: String,
        generation: u64,
    },
    SourcesListed {
        scenes: Vec<SceneData>,
    },
}

pub type BroadcastSender = crate::actor::Sender<BroadcastEvent>;
pub type BroadcastReceiver = crate::actor::Receiver<BroadcastEvent>;
