/// Tracks how many tiles the upstream gallery shows.
///
/// Every observation replaces the stored count; a transition is only wanted
/// when the count actually differs.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CountChangeDetector {
    current: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountChange {
    pub from: usize,
    pub to: usize,
}

impl CountChangeDetector {
    pub fn new(initial: usize) -> Self { CountChangeDetector { current: initial } }

    pub fn current(&self) -> usize { self.current }

    pub fn observe(&mut self, new_count: usize) -> Option<CountChange> {
        let from = std::mem::replace(&mut self.current, new_count);
        (from != new_count).then_some(CountChange { from, to: new_count })
    }
}

/// Name of the scene laid out for `count` tiles.
pub fn scene_name(prefix: &str, count: usize) -> String { format!("{prefix}{count}") }
