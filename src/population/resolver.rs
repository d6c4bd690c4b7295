//! Per-rule spawn planning
//!
//! Pure over the realm, the sweep's rule output so far and an optional
//! population snapshot: computes the reconciliation deficit for one rule and
//! resolves its target into concrete spawn requests. Invoking the spawner is
//! the scheduler's job.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::core::types::{PathId, RoomId, ZoneId};
use crate::population::model::{Loader, Realm, Room, RoomKind, Rule, TargetRef, TemplateRef};
use crate::population::scheduler::RuleOutput;
use crate::population::snapshot::PopulationSnapshot;
use crate::population::spawn::{GroupKey, Placement, RoamTarget, SpawnRequest};

/// Whether this engine processes the rule at all. Everything else is
/// silently inert: transformation templates are applied at the animation
/// stage, and untargeted rules have nowhere to spawn.
pub fn is_supported(rule: &Rule) -> bool {
    let template_ok = matches!(rule.template, TemplateRef::Item(_) | TemplateRef::Mob(_));
    template_ok && rule.target.is_some()
}

/// Resolve one rule into spawn requests.
///
/// `already = len(snapshot.rules[rule])` when a snapshot is present, else 0;
/// exactly `max(0, num_copies - already)` attempts are made. An attempt can
/// still yield nothing when its candidate pool is empty.
pub fn resolve_rule(
    realm: &Realm,
    loader: &Loader,
    rule: &Rule,
    output_so_far: &RuleOutput,
    snapshot: Option<&PopulationSnapshot>,
    rng: &mut impl Rng,
) -> Vec<SpawnRequest> {
    let Some(target) = rule.target else {
        return Vec::new();
    };

    let already = snapshot.map(|s| s.loaded_count(rule.id)).unwrap_or(0);
    let attempts = (rule.num_copies as usize).saturating_sub(already);

    let for_mob = rule.template.is_mob();
    let group = if for_mob {
        group_key(realm, loader, &rule.template)
    } else {
        None
    };

    // Candidate pools are computed once per rule; the random pick is per
    // attempt.
    let pool = match target {
        TargetRef::Zone(zone) => zone_pool(realm, zone, for_mob),
        TargetRef::Path(path) => path_pool(realm, path),
        _ => Vec::new(),
    };

    let mut requests = Vec::new();
    for _ in 0..attempts {
        match target {
            TargetRef::Room(room) => {
                requests.push(request(rule, Placement::Room(room), None, group));
            }
            TargetRef::Rule(other) => {
                // One copy into each entity the targeted rule produced
                // earlier this sweep. Nothing produced, nothing spawned.
                for &container in output_so_far.get(other) {
                    requests.push(request(rule, Placement::Inside(container), None, group));
                }
            }
            TargetRef::Zone(zone) => {
                let Some(&room) = pool.choose(rng) else {
                    continue;
                };
                let roam = for_mob.then_some(RoamTarget::Zone(zone));
                requests.push(request(rule, Placement::Room(room), roam, group));
            }
            TargetRef::Path(path) => {
                let Some(&room) = pool.choose(rng) else {
                    continue;
                };
                let roam = for_mob.then_some(RoamTarget::Path(path));
                requests.push(request(rule, Placement::Room(room), roam, group));
            }
        }
    }

    requests
}

fn request(
    rule: &Rule,
    placement: Placement,
    roam: Option<RoamTarget>,
    group: Option<GroupKey>,
) -> SpawnRequest {
    SpawnRequest {
        rule: rule.id,
        template: rule.template,
        placement,
        roam,
        group,
    }
}

/// Group identity for a spawned mob: the loader when it is a group loader,
/// else the template when it declares self-grouping.
fn group_key(realm: &Realm, loader: &Loader, template: &TemplateRef) -> Option<GroupKey> {
    if loader.is_group {
        return Some(GroupKey::Loader(loader.id));
    }
    let template_id = template.template_id();
    let assists = realm
        .mob_profiles
        .get(&template_id)
        .map(|profile| profile.assists)
        .unwrap_or(false);
    assists.then_some(GroupKey::Template(template_id))
}

fn zone_pool(realm: &Realm, zone: ZoneId, for_mob: bool) -> Vec<RoomId> {
    realm
        .zone_rooms(zone)
        .filter(|room| loadable(room, for_mob))
        .map(|room| room.id)
        .collect()
}

fn path_pool(realm: &Realm, path: PathId) -> Vec<RoomId> {
    let Some(path) = realm.paths.get(&path) else {
        return Vec::new();
    };
    let candidates: Vec<RoomId> = match path.entry_room {
        Some(entry) => vec![entry],
        None => path.rooms.clone(),
    };
    candidates
        .into_iter()
        .filter(|id| {
            realm
                .rooms
                .get(id)
                .map(|room| !room.no_load)
                .unwrap_or(false)
        })
        .collect()
}

fn loadable(room: &Room, for_mob: bool) -> bool {
    if room.no_load || room.no_roam {
        return false;
    }
    !(for_mob && room.kind == RoomKind::Water)
}
