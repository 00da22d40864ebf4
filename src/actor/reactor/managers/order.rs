use tracing::{debug, warn};

use crate::common::collections::HashMap;

/// Maps the upstream gallery order onto the order an operator asked for.
///
/// driven by:
/// - natural order: participant indices in the order the upstream gallery shows them
/// - participant list: index -> name, read from the participant-list collaborator
/// - assigned order: names in the order the operator wants them on screen
///
/// The reconciler never computes geometry. It only decides which natural tile's
/// crop each physical slot should show.
#[derive(Debug, Default, Clone)]
pub struct OrderReconciler {
    natural_order: Vec<usize>,
    assigned_order: Vec<String>,
    participants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotAssignment {
    pub slot: usize,
    pub name: String,
    /// Position of `name` in the natural order; index into the scene's crops.
    pub natural_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub assignments: Vec<SlotAssignment>,
    /// Slots left as they are because no assigned name could fill them.
    pub unresolved_slots: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The operator has not named everyone who is visible yet.
    Skipped { assigned: usize, natural: usize },
    Mapped(ReconcilePlan),
}

impl OrderReconciler {
    pub fn new() -> Self { Self::default() }

    pub fn natural_order(&self) -> &[usize] { &self.natural_order }

    pub fn assigned_order(&self) -> &[String] { &self.assigned_order }

    pub fn participants(&self) -> &[String] { &self.participants }

    pub fn set_natural_order(&mut self, order: Vec<usize>) { self.natural_order = order; }

    pub fn set_assigned_order(&mut self, names: Vec<String>) { self.assigned_order = names; }

    pub fn set_participants(&mut self, participants: Vec<String>) {
        self.participants = participants;
    }

    /// Names of the visible tiles in natural order. Indices missing from the
    /// participant list resolve to `None`.
    pub fn resolved_names(&self) -> Vec<Option<&str>> {
        self.natural_order
            .iter()
            .map(|&idx| self.participants.get(idx).map(String::as_str))
            .collect()
    }

    /// Computes, for each of `slot_count` physical slots, which natural tile
    /// should be shown there.
    pub fn plan(&self, slot_count: usize) -> Reconciliation {
        if self.assigned_order.len() < self.natural_order.len() {
            debug!(
                assigned = self.assigned_order.len(),
                natural = self.natural_order.len(),
                "assigned order shorter than natural order; keeping current tiles"
            );
            return Reconciliation::Skipped {
                assigned: self.assigned_order.len(),
                natural: self.natural_order.len(),
            };
        }

        // First natural position of each resolvable name.
        let mut natural_positions: HashMap<&str, usize> = HashMap::default();
        for (idx, name) in self.resolved_names().into_iter().enumerate() {
            if let Some(name) = name {
                natural_positions.entry(name).or_insert(idx);
            }
        }
        let natural_index_of = |name: &str| natural_positions.get(name).copied();
        let visible_assigned: Vec<&str> = self
            .assigned_order
            .iter()
            .map(String::as_str)
            .filter(|name| natural_index_of(*name).is_some())
            .collect();

        let mut plan = ReconcilePlan::default();
        for slot in 0..slot_count {
            let Some(name) = visible_assigned.get(slot).copied() else {
                warn!(slot, "no visible assigned participant for slot; leaving it unchanged");
                plan.unresolved_slots.push(slot);
                continue;
            };
            let Some(natural_index) = natural_index_of(name) else {
                warn!(slot, name, "participant not in natural order; leaving slot unchanged");
                plan.unresolved_slots.push(slot);
                continue;
            };
            plan.assignments.push(SlotAssignment {
                slot,
                name: name.to_string(),
                natural_index,
            });
        }
        Reconciliation::Mapped(plan)
    }
}
