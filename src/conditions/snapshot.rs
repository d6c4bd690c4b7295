//! Read-only snapshots the predicate language evaluates against
//!
//! Snapshots are built once by the caller, per concrete source kind, before
//! evaluation. Predicate logic only ever touches these uniform shapes and
//! never branches on where the data came from.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::FactMap;

/// Coarse kind of a character, for `is_mob` / `player_in_room` style checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CharKind {
    Player,
    Mob,
}

/// Item shape visible to predicates (equipment, inventory, room contents)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemSnapshot {
    pub template_id: Option<u32>,
    pub keywords: String,
    pub equipment_type: String,
    pub weapon_type: String,
}

/// A character present in a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharSnapshot {
    pub key: String,
    pub kind: CharKind,
    /// None for players, the mob's template for mobs
    pub template_id: Option<u32>,
}

/// The actor's resolved combat target
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TargetSnapshot {
    pub key: String,
    pub keywords: String,
}

/// Everything a predicate may ask about the actor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorSnapshot {
    pub key: String,
    pub kind: CharKind,
    pub name: String,
    pub archetype: String,
    pub gender: String,
    pub level: i64,
    pub gold: i64,
    pub medals: i64,
    pub currencies: AHashMap<String, i64>,
    pub health: i64,
    pub health_max: i64,
    /// Activity state, e.g. "combat"
    pub state: String,
    pub following: bool,
    pub core_faction: String,
    pub factions: AHashMap<String, i64>,
    pub marks: AHashMap<String, String>,
    /// Equipment keyed by slot name ("weapon", "offhand", ...)
    pub equipment: AHashMap<String, ItemSnapshot>,
    pub inventory: Vec<ItemSnapshot>,
    pub target: Option<TargetSnapshot>,
}

impl Default for ActorSnapshot {
    fn default() -> Self {
        Self {
            key: String::new(),
            kind: CharKind::Player,
            name: String::new(),
            archetype: String::new(),
            gender: String::new(),
            level: 0,
            gold: 0,
            medals: 0,
            currencies: AHashMap::new(),
            health: 0,
            health_max: 1,
            state: String::new(),
            following: false,
            core_faction: String::new(),
            factions: AHashMap::new(),
            marks: AHashMap::new(),
            equipment: AHashMap::new(),
            inventory: Vec::new(),
            target: None,
        }
    }
}

/// What a predicate may ask about the actor's room
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub inventory: Vec<ItemSnapshot>,
    pub chars: Vec<CharSnapshot>,
}

/// Flat world fact data
#[derive(Debug, Clone, Default)]
pub struct WorldSnapshot {
    pub facts: FactMap,
}

/// The full evaluation context. Built once per `evaluate` call.
#[derive(Debug, Clone, Default)]
pub struct ConditionContext {
    pub actor: ActorSnapshot,
    pub room: RoomSnapshot,
    pub world: WorldSnapshot,
}

impl ConditionContext {
    /// Context for a character actor (player or mob) standing in a room.
    pub fn for_actor(actor: ActorSnapshot, room: RoomSnapshot, world_facts: FactMap) -> Self {
        Self {
            actor,
            room,
            world: WorldSnapshot { facts: world_facts },
        }
    }

    /// Context with only world facts. Used by loader condition gates, where
    /// there is no acting character.
    pub fn for_world(world_facts: FactMap) -> Self {
        Self {
            actor: ActorSnapshot::default(),
            room: RoomSnapshot::default(),
            world: WorldSnapshot { facts: world_facts },
        }
    }
}
