//! Integration tests for the reconciliation sweep
//!
//! These cover the core population loop end to end:
//! - exact deficit reconciliation against a live snapshot
//! - idempotence of immediate repeat sweeps under timers
//! - rule chains feeding on same-sweep output
//! - zone due/reset bookkeeping and door resets
//! - zone fact sync from the live snapshot

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use worldseed::core::error::{Result, SeedError};
use worldseed::core::types::{
    EntityId, FactMap, LoaderId, PathId, RoomId, RuleId, TemplateId, WorldId, ZoneId,
};
use worldseed::population::{
    run_sweep, Direction, Door, DoorState, LiveStore, Loader, Path, Placement, PopulationSnapshot,
    Realm, RoamTarget, Room, Rule, SpawnRequest, Spawner, SweepMode, TargetRef, TemplateRef, Zone,
    RESPAWN_NEVER,
};

/// Live store stub returning a fixed snapshot
#[derive(Default)]
struct FixedStore {
    snapshot: PopulationSnapshot,
}

impl LiveStore for FixedStore {
    fn fetch_population(&self, _world: WorldId) -> Result<PopulationSnapshot> {
        Ok(self.snapshot.clone())
    }
}

/// Spawner stub recording every request
#[derive(Default)]
struct RecordingSpawner {
    requests: Vec<SpawnRequest>,
}

impl Spawner for RecordingSpawner {
    fn spawn(&mut self, _world: WorldId, request: &SpawnRequest) -> Result<EntityId> {
        self.requests.push(request.clone());
        Ok(EntityId::new())
    }
}

fn rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}

/// One zone, one loadable room, one loader
fn small_realm() -> Realm {
    let mut realm = Realm::new(WorldId(1));
    realm.add_zone(Zone::new(ZoneId(1)));
    realm.add_room(Room::new(RoomId(1), ZoneId(1)));
    realm.add_loader(Loader::new(LoaderId(1), ZoneId(1)));
    realm
}

fn room_rule(id: u32, order: u32, num_copies: u32) -> Rule {
    Rule {
        id: RuleId(id),
        order,
        template: TemplateRef::Mob(TemplateId(10)),
        target: Some(TargetRef::Room(RoomId(1))),
        num_copies,
    }
}

fn push_rule(realm: &mut Realm, loader: LoaderId, rule: Rule) {
    realm.loaders.get_mut(&loader).unwrap().rules.push(rule);
}

#[test]
fn test_exact_reconciliation() {
    for already in 0..=5 {
        let mut realm = small_realm();
        push_rule(&mut realm, LoaderId(1), room_rule(1, 1, 5));

        let mut store = FixedStore::default();
        store.snapshot.rules.insert(
            RuleId(1),
            (0..already).map(|_| EntityId::new()).collect(),
        );
        let mut spawner = RecordingSpawner::default();

        run_sweep(
            &mut realm,
            None,
            SweepMode::Repopulate,
            &store,
            &mut spawner,
            &mut rng(),
            1000,
        )
        .unwrap();

        assert_eq!(spawner.requests.len(), 5 - already);
    }
}

#[test]
fn test_no_over_population() {
    let mut realm = small_realm();
    push_rule(&mut realm, LoaderId(1), room_rule(1, 1, 2));

    let mut store = FixedStore::default();
    store
        .snapshot
        .rules
        .insert(RuleId(1), (0..7).map(|_| EntityId::new()).collect());
    let mut spawner = RecordingSpawner::default();

    run_sweep(
        &mut realm,
        None,
        SweepMode::Repopulate,
        &store,
        &mut spawner,
        &mut rng(),
        1000,
    )
    .unwrap();

    assert!(spawner.requests.is_empty());
}

#[test]
fn test_initial_sweep_ignores_population() {
    let mut realm = small_realm();
    push_rule(&mut realm, LoaderId(1), room_rule(1, 1, 3));

    // The store would report the rule as fully loaded, but Initial never asks
    let mut store = FixedStore::default();
    store
        .snapshot
        .rules
        .insert(RuleId(1), (0..3).map(|_| EntityId::new()).collect());
    let mut spawner = RecordingSpawner::default();

    run_sweep(
        &mut realm,
        None,
        SweepMode::Initial,
        &store,
        &mut spawner,
        &mut rng(),
        1000,
    )
    .unwrap();

    assert_eq!(spawner.requests.len(), 3);
}

#[test]
fn test_immediate_second_tick_spawns_nothing() {
    let mut realm = small_realm();
    realm.loaders.get_mut(&LoaderId(1)).unwrap().respawn_wait = 300;
    push_rule(&mut realm, LoaderId(1), room_rule(1, 1, 4));

    let store = FixedStore::default();
    let mut spawner = RecordingSpawner::default();

    run_sweep(
        &mut realm,
        None,
        SweepMode::Tick,
        &store,
        &mut spawner,
        &mut rng(),
        1000,
    )
    .unwrap();
    assert_eq!(spawner.requests.len(), 4);

    // Same snapshot, one second later: the loader timer stops the run
    let mut spawner = RecordingSpawner::default();
    run_sweep(
        &mut realm,
        None,
        SweepMode::Tick,
        &store,
        &mut spawner,
        &mut rng(),
        1001,
    )
    .unwrap();
    assert!(spawner.requests.is_empty());
}

#[test]
fn test_never_respawn_honored_under_tick_bypassed_under_force() {
    let mut realm = small_realm();
    realm.loaders.get_mut(&LoaderId(1)).unwrap().respawn_wait = RESPAWN_NEVER;
    push_rule(&mut realm, LoaderId(1), room_rule(1, 1, 2));

    let store = FixedStore::default();

    let mut spawner = RecordingSpawner::default();
    run_sweep(
        &mut realm,
        None,
        SweepMode::Tick,
        &store,
        &mut spawner,
        &mut rng(),
        1_000_000,
    )
    .unwrap();
    assert!(spawner.requests.is_empty());

    let mut spawner = RecordingSpawner::default();
    run_sweep(
        &mut realm,
        None,
        SweepMode::Repopulate,
        &store,
        &mut spawner,
        &mut rng(),
        1_000_000,
    )
    .unwrap();
    assert_eq!(spawner.requests.len(), 2);
}

#[test]
fn test_rule_chain_multiplies_output() {
    let mut realm = small_realm();
    // R1: two bags into the room; R2: three apples into each bag
    push_rule(
        &mut realm,
        LoaderId(1),
        Rule {
            id: RuleId(1),
            order: 1,
            template: TemplateRef::Item(TemplateId(20)),
            target: Some(TargetRef::Room(RoomId(1))),
            num_copies: 2,
        },
    );
    push_rule(
        &mut realm,
        LoaderId(1),
        Rule {
            id: RuleId(2),
            order: 2,
            template: TemplateRef::Item(TemplateId(21)),
            target: Some(TargetRef::Rule(RuleId(1))),
            num_copies: 3,
        },
    );

    let store = FixedStore::default();
    let mut spawner = RecordingSpawner::default();

    let output = run_sweep(
        &mut realm,
        None,
        SweepMode::Initial,
        &store,
        &mut spawner,
        &mut rng(),
        1000,
    )
    .unwrap();

    assert_eq!(output.rules.len(), 1);
    let loader_output = &output.rules[0];
    assert_eq!(loader_output.get(RuleId(1)).len(), 2);
    assert_eq!(loader_output.get(RuleId(2)).len(), 2 * 3);

    let inside = spawner
        .requests
        .iter()
        .filter(|r| matches!(r.placement, Placement::Inside(_)))
        .count();
    assert_eq!(inside, 6);
}

#[test]
fn test_empty_chain_stays_empty() {
    let mut realm = small_realm();
    // R1 targets a fully no-load zone, so it produces nothing; R2 feeds on R1
    realm.rooms.get_mut(&RoomId(1)).unwrap().no_load = true;
    push_rule(
        &mut realm,
        LoaderId(1),
        Rule {
            id: RuleId(1),
            order: 1,
            template: TemplateRef::Item(TemplateId(20)),
            target: Some(TargetRef::Zone(ZoneId(1))),
            num_copies: 2,
        },
    );
    push_rule(
        &mut realm,
        LoaderId(1),
        Rule {
            id: RuleId(2),
            order: 2,
            template: TemplateRef::Item(TemplateId(21)),
            target: Some(TargetRef::Rule(RuleId(1))),
            num_copies: 3,
        },
    );

    let store = FixedStore::default();
    let mut spawner = RecordingSpawner::default();

    let output = run_sweep(
        &mut realm,
        None,
        SweepMode::Initial,
        &store,
        &mut spawner,
        &mut rng(),
        1000,
    )
    .unwrap();

    let loader_output = &output.rules[0];
    assert!(loader_output.get(RuleId(1)).is_empty());
    assert!(loader_output.get(RuleId(2)).is_empty());
    assert!(spawner.requests.is_empty());
}

#[test]
fn test_fully_filtered_zone_pool_spawns_nothing() {
    let mut realm = small_realm();
    realm.rooms.get_mut(&RoomId(1)).unwrap().no_load = true;
    push_rule(
        &mut realm,
        LoaderId(1),
        Rule {
            id: RuleId(1),
            order: 1,
            template: TemplateRef::Mob(TemplateId(10)),
            target: Some(TargetRef::Zone(ZoneId(1))),
            num_copies: 5,
        },
    );

    let store = FixedStore::default();
    let mut spawner = RecordingSpawner::default();

    let output = run_sweep(
        &mut realm,
        None,
        SweepMode::Initial,
        &store,
        &mut spawner,
        &mut rng(),
        1000,
    )
    .unwrap();

    assert!(spawner.requests.is_empty());
    assert!(output.rules[0].get(RuleId(1)).is_empty());
}

#[test]
fn test_path_spawns_roam_the_path() {
    let mut realm = small_realm();
    realm.add_room(Room::new(RoomId(2), ZoneId(1)));
    realm.add_path(Path {
        id: PathId(5),
        rooms: vec![RoomId(1), RoomId(2)],
        entry_room: None,
    });
    push_rule(
        &mut realm,
        LoaderId(1),
        Rule {
            id: RuleId(1),
            order: 1,
            template: TemplateRef::Mob(TemplateId(10)),
            target: Some(TargetRef::Path(PathId(5))),
            num_copies: 3,
        },
    );

    let store = FixedStore::default();
    let mut spawner = RecordingSpawner::default();

    run_sweep(
        &mut realm,
        None,
        SweepMode::Initial,
        &store,
        &mut spawner,
        &mut rng(),
        1000,
    )
    .unwrap();

    assert_eq!(spawner.requests.len(), 3);
    for request in &spawner.requests {
        assert!(matches!(
            request.roam,
            Some(RoamTarget::Path(_))
        ));
    }
}

#[test]
fn test_due_zone_resets_doors_on_multiplayer_worlds() {
    let mut realm = small_realm();
    realm.multiplayer = true;
    realm.doors.push(Door {
        room: RoomId(1),
        direction: Direction::North,
        name: "oak gate".to_string(),
        default_state: DoorState::Closed,
    });

    let store = FixedStore::default();
    let mut spawner = RecordingSpawner::default();

    let output = run_sweep(
        &mut realm,
        None,
        SweepMode::Tick,
        &store,
        &mut spawner,
        &mut rng(),
        1000,
    )
    .unwrap();

    assert_eq!(output.doors.len(), 1);
    assert_eq!(output.doors[0].name, "oak gate");
    assert_eq!(output.doors[0].state, DoorState::Closed);
    assert_eq!(realm.zones[&ZoneId(1)].last_respawn_ts, Some(1000));

    // Not due again one second later: no door resets
    let output = run_sweep(
        &mut realm,
        None,
        SweepMode::Tick,
        &store,
        &mut spawner,
        &mut rng(),
        1001,
    )
    .unwrap();
    assert!(output.doors.is_empty());
}

#[test]
fn test_single_player_worlds_skip_door_resets() {
    let mut realm = small_realm();
    realm.doors.push(Door {
        room: RoomId(1),
        direction: Direction::East,
        name: "hatch".to_string(),
        default_state: DoorState::Locked,
    });

    let store = FixedStore::default();
    let mut spawner = RecordingSpawner::default();

    let output = run_sweep(
        &mut realm,
        None,
        SweepMode::Tick,
        &store,
        &mut spawner,
        &mut rng(),
        1000,
    )
    .unwrap();

    assert!(output.doors.is_empty());
}

#[test]
fn test_zone_fact_sync_from_snapshot() {
    let mut realm = small_realm();
    realm.zones.get_mut(&ZoneId(1)).unwrap().warzone = true;

    let mut store = FixedStore::default();
    let mut facts = FactMap::new();
    facts.insert("control".to_string(), serde_json::json!(75));
    store.snapshot.zone_facts.insert(ZoneId(1), facts);
    // Empty fact maps never overwrite
    store
        .snapshot
        .zone_facts
        .insert(ZoneId(99), FactMap::new());

    let mut spawner = RecordingSpawner::default();
    run_sweep(
        &mut realm,
        None,
        SweepMode::Tick,
        &store,
        &mut spawner,
        &mut rng(),
        1000,
    )
    .unwrap();

    assert_eq!(
        realm.zones[&ZoneId(1)].facts.get("control"),
        Some(&serde_json::json!(75))
    );
}

#[test]
fn test_loader_gate_prefers_live_world_facts() {
    let mut realm = small_realm();
    realm
        .loaders
        .get_mut(&LoaderId(1))
        .unwrap()
        .conditions = Some("fact_check siege active".to_string());
    push_rule(&mut realm, LoaderId(1), room_rule(1, 1, 1));
    realm
        .facts
        .insert("siege".to_string(), serde_json::json!("over"));

    let mut store = FixedStore::default();
    store
        .snapshot
        .world_facts
        .insert("siege".to_string(), serde_json::json!("active"));

    // Initial has no snapshot, so the persisted facts gate the loader out
    let mut spawner = RecordingSpawner::default();
    run_sweep(
        &mut realm,
        None,
        SweepMode::Initial,
        &store,
        &mut spawner,
        &mut rng(),
        1000,
    )
    .unwrap();
    assert!(spawner.requests.is_empty());

    // With a snapshot the live facts win and the loader runs
    let mut spawner = RecordingSpawner::default();
    run_sweep(
        &mut realm,
        None,
        SweepMode::Repopulate,
        &store,
        &mut spawner,
        &mut rng(),
        1001,
    )
    .unwrap();
    assert_eq!(spawner.requests.len(), 1);
}

#[test]
fn test_sweep_scoped_to_one_zone() {
    let mut realm = small_realm();
    realm.add_zone(Zone::new(ZoneId(2)));
    realm.add_room(Room::new(RoomId(2), ZoneId(2)));
    let mut other = Loader::new(LoaderId(2), ZoneId(2));
    other.rules.push(Rule {
        id: RuleId(2),
        order: 1,
        template: TemplateRef::Mob(TemplateId(10)),
        target: Some(TargetRef::Room(RoomId(2))),
        num_copies: 1,
    });
    realm.add_loader(other);
    push_rule(&mut realm, LoaderId(1), room_rule(1, 1, 1));

    let store = FixedStore::default();
    let mut spawner = RecordingSpawner::default();

    let output = run_sweep(
        &mut realm,
        Some(ZoneId(2)),
        SweepMode::Initial,
        &store,
        &mut spawner,
        &mut rng(),
        1000,
    )
    .unwrap();

    assert_eq!(output.rules.len(), 1);
    assert_eq!(spawner.requests.len(), 1);
    assert_eq!(spawner.requests[0].rule, RuleId(2));
}

#[test]
fn test_unknown_zone_is_an_error() {
    let mut realm = small_realm();
    let store = FixedStore::default();
    let mut spawner = RecordingSpawner::default();

    let result = run_sweep(
        &mut realm,
        Some(ZoneId(404)),
        SweepMode::Tick,
        &store,
        &mut spawner,
        &mut rng(),
        1000,
    );
    assert!(matches!(result, Err(SeedError::ZoneNotFound(ZoneId(404)))));
}

#[test]
fn test_sweep_updates_world_timestamp() {
    let mut realm = small_realm();
    let store = FixedStore::default();
    let mut spawner = RecordingSpawner::default();

    run_sweep(
        &mut realm,
        None,
        SweepMode::Tick,
        &store,
        &mut spawner,
        &mut rng(),
        1234,
    )
    .unwrap();
    assert_eq!(realm.last_sweep_ts, Some(1234));
}

#[test]
fn test_loaders_processed_in_stable_order() {
    let mut realm = small_realm();
    let mut second = Loader::new(LoaderId(2), ZoneId(1));
    second.order = 0;
    second.rules.push(room_rule(2, 1, 1));
    realm.add_loader(second);
    realm.loaders.get_mut(&LoaderId(1)).unwrap().order = 1;
    push_rule(&mut realm, LoaderId(1), room_rule(1, 1, 1));

    let store = FixedStore::default();
    let mut spawner = RecordingSpawner::default();

    run_sweep(
        &mut realm,
        None,
        SweepMode::Initial,
        &store,
        &mut spawner,
        &mut rng(),
        1000,
    )
    .unwrap();

    let order: Vec<RuleId> = spawner.requests.iter().map(|r| r.rule).collect();
    assert_eq!(order, vec![RuleId(2), RuleId(1)]);
}
