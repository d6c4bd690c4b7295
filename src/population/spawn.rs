//! The spawn collaborator boundary
//!
//! The engine decides *what* to spawn *where*; materialization (stat
//! generation, naming, attaching to the live world) is opaque behind the
//! [`Spawner`] trait.

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::{EntityId, LoaderId, PathId, RoomId, RuleId, TemplateId, WorldId, ZoneId};
use crate::population::model::TemplateRef;

/// Where a spawned entity is placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Placement {
    Room(RoomId),
    /// Inside another spawned entity, e.g. an item into a container
    Inside(EntityId),
}

/// What a spawned mob wanders, as opposed to holding a fixed room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoamTarget {
    Zone(ZoneId),
    Path(PathId),
}

/// Shared group identity for spawned mobs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupKey {
    /// The owning loader is a group loader
    Loader(LoaderId),
    /// The mob template declares self-grouping
    Template(TemplateId),
}

/// One fully resolved spawn instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub rule: RuleId,
    pub template: TemplateRef,
    pub placement: Placement,
    pub roam: Option<RoamTarget>,
    pub group: Option<GroupKey>,
}

/// Materializes fully formed entities. Failures (persistence conflicts
/// included) propagate to the sweep caller; the next tick self-corrects.
pub trait Spawner {
    fn spawn(&mut self, world: WorldId, request: &SpawnRequest) -> Result<EntityId>;
}
