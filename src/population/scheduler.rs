//! Single-use loader scheduling state machine
//!
//! A [`LoaderRun`] gates one loader (free-text conditions, respawn timers,
//! warzone scripts) and, when the gates pass, drives the resolver over the
//! loader's rules in order. An instance executes at most once; re-executing
//! it is a caller bug and panics.

use rand::Rng;

use crate::conditions::{self, ConditionContext};
use crate::core::error::Result;
use crate::core::types::{EntityId, LoaderId, RuleId, Timestamp};
use crate::population::model::{Realm, RESPAWN_NEVER};
use crate::population::resolver;
use crate::population::snapshot::PopulationSnapshot;
use crate::population::spawn::Spawner;
use crate::scripting;

/// Ordered per-rule output of one loader run, covering this sweep only.
/// Rules targeting other rules consume it within the same sweep.
#[derive(Debug, Clone, Default)]
pub struct RuleOutput {
    entries: Vec<(RuleId, Vec<EntityId>)>,
}

impl RuleOutput {
    /// Entities a rule produced this sweep; empty for absent rules
    pub fn get(&self, rule: RuleId) -> &[EntityId] {
        self.entries
            .iter()
            .find(|(id, _)| *id == rule)
            .map(|(_, entities)| entities.as_slice())
            .unwrap_or(&[])
    }

    pub fn push_entry(&mut self, rule: RuleId, entities: Vec<EntityId>) {
        self.entries.push((rule, entities));
    }

    pub fn iter(&self) -> impl Iterator<Item = (RuleId, &[EntityId])> {
        self.entries
            .iter()
            .map(|(id, entities)| (*id, entities.as_slice()))
    }

    /// Number of rules that produced an entry
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total entities spawned across all rules
    pub fn total_spawned(&self) -> usize {
        self.entries.iter().map(|(_, entities)| entities.len()).sum()
    }
}

/// Runs one loader. State dependent: each gate either stops the run or falls
/// through to rule processing, and the instance only wants to run once.
pub struct LoaderRun<'a> {
    realm: &'a mut Realm,
    loader: LoaderId,
    snapshot: Option<&'a PopulationSnapshot>,
    /// World-fact context for the free-text condition gate. Built by the
    /// sweep, shared by every loader run within it.
    conditions_ctx: &'a ConditionContext,
    /// Whether the owning zone was reset this sweep
    zone_reset: bool,
    now: Timestamp,
    executed: bool,
}

impl<'a> LoaderRun<'a> {
    pub fn new(
        realm: &'a mut Realm,
        loader: LoaderId,
        snapshot: Option<&'a PopulationSnapshot>,
        conditions_ctx: &'a ConditionContext,
        zone_reset: bool,
        now: Timestamp,
    ) -> Self {
        Self {
            realm,
            loader,
            snapshot,
            conditions_ctx,
            zone_reset,
            now,
            executed: false,
        }
    }

    /// Execute the loader. `force` bypasses the timing gates (initial world
    /// bring-up, admin repopulation).
    ///
    /// # Panics
    ///
    /// Panics when called on an instance that has already executed.
    pub fn execute(
        &mut self,
        force: bool,
        spawner: &mut dyn Spawner,
        rng: &mut impl Rng,
    ) -> Result<RuleOutput> {
        if self.executed {
            panic!("loader run has already been executed");
        }

        let (output, executed) = run_loader(
            self.realm,
            self.loader,
            self.snapshot,
            self.conditions_ctx,
            self.zone_reset,
            self.now,
            force,
            spawner,
            rng,
        )?;
        self.executed = executed;
        Ok(output)
    }
}

/// One gated pass over a loader. Returns the rule output and whether the run
/// counts as executed; the warzone script gate is the one exit that leaves a
/// run unexecuted.
#[allow(clippy::too_many_arguments)]
fn run_loader(
    realm: &mut Realm,
    loader_id: LoaderId,
    snapshot: Option<&PopulationSnapshot>,
    conditions_ctx: &ConditionContext,
    zone_reset: bool,
    now: Timestamp,
    force: bool,
    spawner: &mut dyn Spawner,
    rng: &mut impl Rng,
) -> Result<(RuleOutput, bool)> {
    let Some(loader) = realm.loaders.get(&loader_id) else {
        tracing::warn!(loader = loader_id.0, "loader missing from realm");
        return Ok((RuleOutput::default(), true));
    };

    // -- Free-text condition gate, against the sweep's world-fact context.
    if let Some(text) = &loader.conditions {
        let evaluation = conditions::evaluate(conditions_ctx, text);
        if !evaluation.result {
            tracing::debug!(
                loader = loader.id.0,
                detail = %evaluation.detail,
                "loader condition gate failed"
            );
            return Ok((RuleOutput::default(), true));
        }
    }

    // -- Timing gate. The run still counts as executed when a timer
    // stops it.
    if !force {
        if loader.inherit_zone_wait {
            if !zone_reset {
                return Ok((RuleOutput::default(), true));
            }
            // Zone set to never respawn
            let zone_wait = realm
                .zones
                .get(&loader.zone)
                .map(|zone| zone.respawn_wait)
                .unwrap_or(RESPAWN_NEVER);
            if zone_wait == RESPAWN_NEVER {
                return Ok((RuleOutput::default(), true));
            }
        } else if loader.respawn_wait == RESPAWN_NEVER {
            return Ok((RuleOutput::default(), true));
        } else if let Some(last) = loader.last_processing_ts {
            // A wait of 0 means always eligible
            if loader.respawn_wait > 0 && now < last + loader.respawn_wait {
                return Ok((RuleOutput::default(), true));
            }
        }
    }

    // -- Scripted warzone gate. A false or erroring script stops the run
    // without marking it executed or touching last_processing_ts. The
    // free-text gate above does mark it; authored content relies on the
    // asymmetry, so keep it.
    if let Some(script) = &loader.loader_condition {
        let warzone_facts = realm
            .zones
            .get(&loader.zone)
            .filter(|zone| zone.warzone)
            .map(|zone| &zone.facts);
        if let Some(facts) = warzone_facts {
            match scripting::eval_fact_script(script, facts) {
                Ok(true) => {}
                Ok(false) => return Ok((RuleOutput::default(), false)),
                Err(error) => {
                    tracing::warn!(
                        loader = loader.id.0,
                        script = %script,
                        %error,
                        "loader condition script failed"
                    );
                    return Ok((RuleOutput::default(), false));
                }
            }
        }
    }

    // -- Rule processing, in ascending order. Unsupported template and
    // target combinations are nothing to do, not errors.
    let mut output = RuleOutput::default();
    for rule in loader.rules_in_order() {
        if !resolver::is_supported(rule) {
            continue;
        }
        let requests = resolver::resolve_rule(realm, loader, rule, &output, snapshot, rng);
        let mut entities = Vec::with_capacity(requests.len());
        for request in &requests {
            entities.push(spawner.spawn(realm.id, request)?);
        }
        output.push_entry(rule.id, entities);
    }

    if let Some(loader) = realm.loaders.get_mut(&loader_id) {
        loader.last_processing_ts = Some(now);
    }
    Ok((output, true))
}
