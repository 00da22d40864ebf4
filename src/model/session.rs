use crate::actor::reactor::managers::{CountChangeDetector, OrderReconciler, scene_name};
use crate::common::collections::BTreeMap;
use crate::layout_engine::CropValues;
use crate::model::crop_store::Generation;
use crate::model::server::{SceneStateData, SessionSnapshot};

/// Geometry last computed for one scene.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneState {
    pub last_crops: Vec<CropValues>,
    pub count: usize,
}

/// Everything one control session remembers between events. Owned by the
/// reactor, which is the only writer.
#[derive(Debug, Clone)]
pub struct Session {
    pub scene_prefix: String,
    pub order: OrderReconciler,
    pub count: CountChangeDetector,
    pub scenes: BTreeMap<String, SceneState>,
    generation: Generation,
}

impl Session {
    pub fn new(scene_prefix: impl Into<String>) -> Self {
        Session {
            scene_prefix: scene_prefix.into(),
            order: OrderReconciler::new(),
            count: CountChangeDetector::default(),
            scenes: BTreeMap::new(),
            generation: Generation::default(),
        }
    }

    pub fn scene_name(&self, count: usize) -> String { scene_name(&self.scene_prefix, count) }

    pub fn current_scene_name(&self) -> String { self.scene_name(self.count.current()) }

    pub fn generation(&self) -> Generation { self.generation }

    pub fn next_generation(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.generation
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            count: self.count.current(),
            scene_prefix: self.scene_prefix.clone(),
            natural_order: self.order.natural_order().to_vec(),
            assigned_order: self.order.assigned_order().to_vec(),
            participants: self.order.participants().to_vec(),
            generation: self.generation.get(),
            scenes: self
                .scenes
                .iter()
                .map(|(name, state)| {
                    (name.clone(), SceneStateData {
                        tile_count: state.count,
                        crops: state.last_crops.clone(),
                    })
                })
                .collect(),
        }
    }
}
