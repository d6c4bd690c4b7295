//! Point-in-time population data from the live world
//!
//! Fetched once at sweep start, read-only for the whole sweep, discarded at
//! sweep end. Counts are read-then-act: concurrent external mutation between
//! fetch and spawn commit can cause minor over- or under-population, which
//! the next sweep corrects.

use ahash::AHashMap;

use crate::core::error::Result;
use crate::core::types::{EntityId, FactMap, RuleId, WorldId, ZoneId};

/// What the live world currently attributes to each rule, plus dynamic zone
/// and world fact data.
#[derive(Debug, Clone, Default)]
pub struct PopulationSnapshot {
    /// Live entities attributed to each rule
    pub rules: AHashMap<RuleId, Vec<EntityId>>,
    /// Current dynamic fact data per zone (warzone data)
    pub zone_facts: AHashMap<ZoneId, FactMap>,
    /// The live world's fact map, used by free-text condition gates
    pub world_facts: FactMap,
}

impl PopulationSnapshot {
    /// How many live entities the world attributes to a rule
    pub fn loaded_count(&self, rule: RuleId) -> usize {
        self.rules.get(&rule).map(Vec::len).unwrap_or(0)
    }
}

/// Read contract against the live world store. One fetch per checking sweep.
pub trait LiveStore {
    fn fetch_population(&self, world: WorldId) -> Result<PopulationSnapshot>;
}
