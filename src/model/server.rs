use serde::{Deserialize, Serialize};

use crate::common::collections::BTreeMap;
use crate::common::config::SceneSettings;
use crate::layout_engine::{CropValues, Frame};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(u64);

impl SourceId {
    pub fn new(id: u64) -> SourceId { SourceId(id) }

    pub fn get(&self) -> u64 { self.0 }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { self.0.fmt(f) }
}

/// A scene item as reported by the display-composition system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceData {
    pub id: SourceId,
    pub name: String,
    pub kind: String,
    /// Native size of the source before cropping.
    pub width: u32,
    pub height: u32,
}

impl SourceData {
    pub fn frame(&self) -> Frame { Frame::new(self.width, self.height) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneData {
    pub name: String,
    pub sources: Vec<SourceData>,
}

impl SceneData {
    /// Sources showing the upstream gallery, in scene order.
    pub fn capture_sources(&self, settings: &SceneSettings) -> Vec<&SourceData> {
        self.sources.iter().filter(|s| settings.is_capture_kind(&s.kind)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneStateData {
    pub tile_count: usize,
    pub crops: Vec<CropValues>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub count: usize,
    pub scene_prefix: String,
    pub natural_order: Vec<usize>,
    pub assigned_order: Vec<String>,
    pub participants: Vec<String>,
    pub generation: u64,
    pub scenes: BTreeMap<String, SceneStateData>,
}
