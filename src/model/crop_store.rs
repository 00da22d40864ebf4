use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};

use super::server::SourceId;
use crate::layout_engine::CropValues;

/// Monotonic stamp of a reconciliation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Generation { Generation(self.0.wrapping_add(1)) }

    pub fn get(self) -> u64 { self.0 }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CropRecord {
    pub generation: Generation,
    pub crop: CropValues,
}

/// Last crop successfully applied to each scene item.
#[derive(Clone, Default, Debug)]
pub struct CropStore(Arc<DashMap<(String, SourceId), CropRecord>>);

impl CropStore {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, scene: &str, source: SourceId) -> Option<CropRecord> {
        self.0.get(&(scene.to_string(), source)).map(|entry| *entry)
    }

    /// True when `crop` is exactly what the item already shows.
    pub fn is_current(&self, scene: &str, source: SourceId, crop: &CropValues) -> bool {
        self.get(scene, source).is_some_and(|record| record.crop == *crop)
    }

    /// Records an applied crop. A completion stamped with an older generation
    /// than the stored one is stale and is discarded; returns whether the
    /// record was written.
    pub fn record(
        &self,
        scene: &str,
        source: SourceId,
        generation: Generation,
        crop: CropValues,
    ) -> bool {
        match self.0.entry((scene.to_string(), source)) {
            Entry::Occupied(mut entry) => {
                let record = entry.get_mut();
                if record.generation > generation {
                    return false;
                }
                *record = CropRecord { generation, crop };
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(CropRecord { generation, crop });
                true
            }
        }
    }

    /// Drops every record, so the next pass re-sends all crops.
    pub fn clear(&self) { self.0.clear(); }

    pub fn len(&self) -> usize { self.0.len() }

    pub fn is_empty(&self) -> bool { self.0.is_empty() }
}
