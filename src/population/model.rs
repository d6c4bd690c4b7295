//! Authored population data: the spawn world and everything loaders read
//!
//! These are the persisted shapes the reconciliation sweep runs against. The
//! live game engine keeps its own transient representation; only the narrow
//! snapshot contract in [`super::snapshot`] crosses that boundary.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::core::types::{
    FactMap, LoaderId, PathId, RoomId, RuleId, Seconds, TemplateId, Timestamp, WorldId, ZoneId,
};

/// Respawn wait sentinel: never respawn under normal ticks
pub const RESPAWN_NEVER: Seconds = -1;

/// Room terrain kind. Only water matters to the loaders: mobs never spawn
/// into water rooms when roaming a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoomKind {
    #[default]
    Field,
    City,
    Forest,
    Mountain,
    Water,
}

/// Exit direction a door is anchored on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    South,
    East,
    West,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DoorState {
    Open,
    #[default]
    Closed,
    Locked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub zone: ZoneId,
    pub kind: RoomKind,
    /// Loaders never place spawns here
    pub no_load: bool,
    /// Roaming mobs never spawn here
    pub no_roam: bool,
}

impl Room {
    pub fn new(id: RoomId, zone: ZoneId) -> Self {
        Self {
            id,
            zone,
            kind: RoomKind::default(),
            no_load: false,
            no_roam: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub respawn_wait: Seconds,
    pub last_respawn_ts: Option<Timestamp>,
    /// Warzones carry dynamic fact data that loader condition scripts read
    pub warzone: bool,
    pub facts: FactMap,
}

impl Zone {
    pub fn new(id: ZoneId) -> Self {
        Self {
            id,
            respawn_wait: 300,
            last_respawn_ts: None,
            warzone: false,
            facts: FactMap::new(),
        }
    }
}

/// An authored route through rooms. Mobs assigned to a path roam along it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    pub id: PathId,
    pub rooms: Vec<RoomId>,
    /// When set, all path spawns enter the path here
    pub entry_room: Option<RoomId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Door {
    pub room: RoomId,
    pub direction: Direction,
    pub name: String,
    pub default_state: DoorState,
}

/// Tagged template reference. Transformation templates are applied at the
/// animation stage, never during loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateRef {
    Item(TemplateId),
    Mob(TemplateId),
    Transformation(TemplateId),
}

impl TemplateRef {
    pub fn is_mob(&self) -> bool {
        matches!(self, TemplateRef::Mob(_))
    }

    pub fn template_id(&self) -> TemplateId {
        match self {
            TemplateRef::Item(id) | TemplateRef::Mob(id) | TemplateRef::Transformation(id) => *id,
        }
    }
}

/// Tagged spawn target reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetRef {
    Room(RoomId),
    /// Spawn into the entities another rule produced this sweep
    Rule(RuleId),
    Zone(ZoneId),
    Path(PathId),
}

/// One declarative spawn instruction within a loader
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    /// Processing sequence within the loader
    pub order: u32,
    pub template: TemplateRef,
    pub target: Option<TargetRef>,
    pub num_copies: u32,
}

/// An authored unit owning an ordered list of rules and a respawn policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loader {
    pub id: LoaderId,
    pub zone: ZoneId,
    pub order: u32,
    /// Seconds between runs. `0` = always eligible, `-1` = never under
    /// normal ticks.
    pub respawn_wait: Seconds,
    /// Follow the owning zone's respawn timer instead of our own
    pub inherit_zone_wait: bool,
    /// Free-text predicate expression gating the run
    pub conditions: Option<String>,
    /// Scripted expression over warzone facts gating the run
    pub loader_condition: Option<String>,
    /// Spawned mobs share the loader as their group
    pub is_group: bool,
    /// Mutated only by the scheduler on completion
    pub last_processing_ts: Option<Timestamp>,
    pub rules: Vec<Rule>,
}

impl Loader {
    pub fn new(id: LoaderId, zone: ZoneId) -> Self {
        Self {
            id,
            zone,
            order: 0,
            respawn_wait: 0,
            inherit_zone_wait: false,
            conditions: None,
            loader_condition: None,
            is_group: false,
            last_processing_ts: None,
            rules: Vec::new(),
        }
    }

    /// Rules in ascending processing order
    pub fn rules_in_order(&self) -> Vec<&Rule> {
        let mut rules: Vec<&Rule> = self.rules.iter().collect();
        rules.sort_by_key(|rule| rule.order);
        rules
    }
}

/// The slice of a mob template this engine is allowed to see
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MobProfile {
    /// The template declares self-grouping: spawns share the template as
    /// their group even outside group loaders
    pub assists: bool,
}

/// A persisted spawn world: authored zones, rooms, paths, doors and loaders
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Realm {
    pub id: WorldId,
    pub multiplayer: bool,
    pub facts: FactMap,
    pub last_sweep_ts: Option<Timestamp>,
    pub zones: AHashMap<ZoneId, Zone>,
    pub rooms: AHashMap<RoomId, Room>,
    pub paths: AHashMap<PathId, Path>,
    pub doors: Vec<Door>,
    pub loaders: AHashMap<LoaderId, Loader>,
    pub mob_profiles: AHashMap<TemplateId, MobProfile>,
}

impl Realm {
    pub fn new(id: WorldId) -> Self {
        Self {
            id,
            multiplayer: false,
            facts: FactMap::new(),
            last_sweep_ts: None,
            zones: AHashMap::new(),
            rooms: AHashMap::new(),
            paths: AHashMap::new(),
            doors: Vec::new(),
            loaders: AHashMap::new(),
            mob_profiles: AHashMap::new(),
        }
    }

    pub fn add_zone(&mut self, zone: Zone) {
        self.zones.insert(zone.id, zone);
    }

    pub fn add_room(&mut self, room: Room) {
        self.rooms.insert(room.id, room);
    }

    pub fn add_path(&mut self, path: Path) {
        self.paths.insert(path.id, path);
    }

    pub fn add_loader(&mut self, loader: Loader) {
        self.loaders.insert(loader.id, loader);
    }

    /// Rooms belonging to a zone
    pub fn zone_rooms(&self, zone: ZoneId) -> impl Iterator<Item = &Room> {
        self.rooms.values().filter(move |room| room.zone == zone)
    }

    /// Doors anchored in a zone's rooms
    pub fn zone_doors(&self, zone: ZoneId) -> impl Iterator<Item = &Door> {
        self.doors.iter().filter(move |door| {
            self.rooms
                .get(&door.room)
                .map(|room| room.zone == zone)
                .unwrap_or(false)
        })
    }

    /// A zone's loaders in stable ascending order
    pub fn zone_loaders(&self, zone: ZoneId) -> Vec<LoaderId> {
        let mut loaders: Vec<&Loader> = self
            .loaders
            .values()
            .filter(|loader| loader.zone == zone)
            .collect();
        loaders.sort_by_key(|loader| (loader.order, loader.id.0));
        loaders.iter().map(|loader| loader.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_sorted_by_order() {
        let mut loader = Loader::new(LoaderId(1), ZoneId(1));
        for (id, order) in [(1, 30), (2, 10), (3, 20)] {
            loader.rules.push(Rule {
                id: RuleId(id),
                order,
                template: TemplateRef::Item(TemplateId(1)),
                target: Some(TargetRef::Room(RoomId(1))),
                num_copies: 1,
            });
        }
        let ordered: Vec<u32> = loader.rules_in_order().iter().map(|r| r.id.0).collect();
        assert_eq!(ordered, vec![2, 3, 1]);
    }

    #[test]
    fn test_zone_loaders_stable_order() {
        let mut realm = Realm::new(WorldId(1));
        realm.add_zone(Zone::new(ZoneId(1)));
        for (id, order) in [(5, 1), (2, 0), (9, 1)] {
            let mut loader = Loader::new(LoaderId(id), ZoneId(1));
            loader.order = order;
            realm.add_loader(loader);
        }
        let ids: Vec<u32> = realm
            .zone_loaders(ZoneId(1))
            .iter()
            .map(|id| id.0)
            .collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[test]
    fn test_zone_doors_filters_by_room_zone() {
        let mut realm = Realm::new(WorldId(1));
        realm.add_zone(Zone::new(ZoneId(1)));
        realm.add_zone(Zone::new(ZoneId(2)));
        realm.add_room(Room::new(RoomId(1), ZoneId(1)));
        realm.add_room(Room::new(RoomId(2), ZoneId(2)));
        for room in [RoomId(1), RoomId(2)] {
            realm.doors.push(Door {
                room,
                direction: Direction::North,
                name: "gate".to_string(),
                default_state: DoorState::Closed,
            });
        }
        assert_eq!(realm.zone_doors(ZoneId(1)).count(), 1);
    }
}
