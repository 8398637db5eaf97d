use std::collections::HashMap;

use rule_types::Fact;

/// A per-fact iteration timestamp, maintained only while the `Recency`
/// strategy is in use.
///
/// Initial facts are stamped with clock `0`; a fact produced by firing
/// during iteration `k` is stamped `k`. Kept as a side map rather than a
/// field on `Fact` itself, so every other strategy (and every other run)
/// pays nothing for it.
#[derive(Debug, Clone, Default)]
pub struct LogicalClock {
    stamps: HashMap<Fact, u32>,
}

impl LogicalClock {
    /// An empty clock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamps `fact` with `iteration`, overwriting any prior stamp.
    pub fn record(&mut self, fact: Fact, iteration: u32) {
        self.stamps.insert(fact, iteration);
    }

    /// The iteration at which `fact` was recorded, if any.
    #[must_use]
    pub fn get(&self, fact: &Fact) -> Option<u32> {
        self.stamps.get(fact).copied()
    }

    /// The greatest recorded clock among `facts`, or `0` if none are stamped.
    #[must_use]
    pub fn max_of<'a>(&self, facts: impl IntoIterator<Item = &'a Fact>) -> u32 {
        facts.into_iter().filter_map(|f| self.get(f)).max().unwrap_or(0)
    }
}
