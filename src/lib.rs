//! Worldseed - population reconciliation for persistent multiplayer text worlds
//!
//! Authors declare what should exist (mobs, items, counts, respawn policy,
//! gating conditions) as loaders and rules; [`population::run_sweep`]
//! compares that declaration against a live population snapshot and spawns
//! exactly the deficit. A control loop, not a one-shot script.

pub mod conditions;
pub mod core;
pub mod population;
pub mod scripting;
