//! The zone/world reconciliation sweep
//!
//! One sweep walks a realm's zones, decides which zones are due for a
//! respawn reset, fetches the population snapshot once, runs every loader
//! through a [`LoaderRun`] and aggregates rule outputs plus door resets.
//! Prefer this entry point over driving [`LoaderRun`] directly: it owns the
//! snapshot fetch and the door bookkeeping.

use rand::Rng;

use crate::conditions::ConditionContext;
use crate::core::error::{Result, SeedError};
use crate::core::types::{RoomId, Timestamp, ZoneId};
use crate::population::model::{Direction, DoorState, Realm, Zone, RESPAWN_NEVER};
use crate::population::scheduler::{LoaderRun, RuleOutput};
use crate::population::snapshot::LiveStore;
use crate::population::spawn::Spawner;

/// What kind of sweep this is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepMode {
    /// Fresh world bring-up: no population check, timers bypassed
    Initial,
    /// Admin-triggered full respawn: population check, timers bypassed
    Repopulate,
    /// Steady-state heartbeat: population check, timers respected
    Tick,
}

impl SweepMode {
    /// Whether to reconcile against live population counts
    fn check(self) -> bool {
        !matches!(self, SweepMode::Initial)
    }

    /// Whether to bypass respawn timers
    fn force(self) -> bool {
        !matches!(self, SweepMode::Tick)
    }
}

/// A door to put back into its default state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoorReset {
    pub room: RoomId,
    pub direction: Direction,
    pub name: String,
    pub state: DoorState,
}

/// Aggregated result of one sweep
#[derive(Debug, Default)]
pub struct SweepOutput {
    /// One output per loader, in processing order
    pub rules: Vec<RuleOutput>,
    pub doors: Vec<DoorReset>,
}

/// Sweep a realm, or a single zone of it when `zone` is given.
pub fn run_sweep(
    realm: &mut Realm,
    zone: Option<ZoneId>,
    mode: SweepMode,
    store: &dyn LiveStore,
    spawner: &mut dyn Spawner,
    rng: &mut impl Rng,
    now: Timestamp,
) -> Result<SweepOutput> {
    let snapshot = if mode.check() {
        Some(store.fetch_population(realm.id)?)
    } else {
        None
    };

    // One-way sync: the live world's zone facts are the truth, the persisted
    // record follows.
    if let Some(snapshot) = &snapshot {
        for (zone_id, facts) in &snapshot.zone_facts {
            if facts.is_empty() {
                continue;
            }
            if let Some(zone) = realm.zones.get_mut(zone_id) {
                zone.facts = facts.clone();
            }
        }
    }

    // Free-text gate context, shared by every loader run this sweep. The
    // live world's facts take precedence over the persisted ones when the
    // sweep holds a snapshot.
    let gate_ctx = match &snapshot {
        Some(snapshot) => ConditionContext::for_world(snapshot.world_facts.clone()),
        None => ConditionContext::for_world(realm.facts.clone()),
    };

    let zone_ids: Vec<ZoneId> = match zone {
        Some(id) => {
            if !realm.zones.contains_key(&id) {
                return Err(SeedError::ZoneNotFound(id));
            }
            vec![id]
        }
        None => {
            let mut ids: Vec<ZoneId> = realm.zones.keys().copied().collect();
            ids.sort_by_key(|id| id.0);
            ids
        }
    };

    let mut output = SweepOutput::default();

    for zone_id in zone_ids {
        let due = realm
            .zones
            .get(&zone_id)
            .map(|zone| zone_due(zone, now))
            .unwrap_or(false);

        if due {
            if let Some(zone) = realm.zones.get_mut(&zone_id) {
                zone.last_respawn_ts = Some(now);
            }
            // Door resets are a multiplayer concern: single-player worlds
            // rebuild doors on load.
            if realm.multiplayer {
                for door in realm.zone_doors(zone_id) {
                    output.doors.push(DoorReset {
                        room: door.room,
                        direction: door.direction,
                        name: door.name.clone(),
                        state: door.default_state,
                    });
                }
            }
        }

        for loader_id in realm.zone_loaders(zone_id) {
            let mut run = LoaderRun::new(realm, loader_id, snapshot.as_ref(), &gate_ctx, due, now);
            output.rules.push(run.execute(mode.force(), spawner, rng)?);
        }

        tracing::debug!(zone = zone_id.0, due, "zone swept");
    }

    realm.last_sweep_ts = Some(now);

    Ok(output)
}

/// Whether the zone's respawn timer has lapsed
fn zone_due(zone: &Zone, now: Timestamp) -> bool {
    match zone.last_respawn_ts {
        None => true,
        Some(last) => zone.respawn_wait != RESPAWN_NEVER && now > last + zone.respawn_wait,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_due() {
        let mut zone = Zone::new(ZoneId(1));
        assert!(zone_due(&zone, 0));

        zone.last_respawn_ts = Some(1000);
        zone.respawn_wait = 300;
        assert!(!zone_due(&zone, 1300));
        assert!(zone_due(&zone, 1301));

        zone.respawn_wait = RESPAWN_NEVER;
        assert!(!zone_due(&zone, 1_000_000));
    }

    #[test]
    fn test_mode_flags() {
        assert!(!SweepMode::Initial.check());
        assert!(SweepMode::Initial.force());
        assert!(SweepMode::Repopulate.check());
        assert!(SweepMode::Repopulate.force());
        assert!(SweepMode::Tick.check());
        assert!(!SweepMode::Tick.force());
    }
}
