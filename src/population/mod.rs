//! Declarative world population: loaders, rules and the reconciliation sweep

pub mod model;
pub mod resolver;
pub mod scheduler;
pub mod snapshot;
pub mod spawn;
pub mod sweep;

pub use model::{
    Door, DoorState, Direction, Loader, MobProfile, Path, Realm, Room, RoomKind, Rule, TargetRef,
    TemplateRef, Zone, RESPAWN_NEVER,
};
pub use scheduler::{LoaderRun, RuleOutput};
pub use snapshot::{LiveStore, PopulationSnapshot};
pub use spawn::{GroupKey, Placement, RoamTarget, SpawnRequest, Spawner};
pub use sweep::{run_sweep, DoorReset, SweepMode, SweepOutput};
