//! The predicate registry and single-clause evaluation
//!
//! A clause is one predicate name plus positional arguments, e.g.
//! `"standing ashen 20"`. Every failure mode evaluates to false with a
//! human-readable detail; nothing here ever propagates an error.

use crate::conditions::snapshot::{CharKind, ConditionContext};

/// Outcome of evaluating a clause or a whole expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub result: bool,
    pub detail: String,
}

impl Evaluation {
    pub fn pass() -> Self {
        Self {
            result: true,
            detail: String::new(),
        }
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            result: false,
            detail: detail.into(),
        }
    }
}

/// Declared argument kind, used for the minimum-arity contract
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgKind {
    Str,
    Int,
}

/// One registry entry: predicate name and its required arguments
pub struct PredicateSpec {
    pub name: &'static str,
    pub args: &'static [ArgKind],
}

use ArgKind::{Int, Str};

/// The fixed predicate registry. Deprecated entries are kept for authored
/// content that still uses them.
pub const PREDICATES: &[PredicateSpec] = &[
    PredicateSpec { name: "archetype", args: &[Str] },
    PredicateSpec { name: "core_faction", args: &[Str] },
    PredicateSpec { name: "currency", args: &[Str, Int] },
    PredicateSpec { name: "fact_check", args: &[Str, Str] },
    PredicateSpec { name: "fact_above", args: &[Str, Int] },
    PredicateSpec { name: "gender", args: &[Str] },
    PredicateSpec { name: "gold", args: &[Int] },
    // deprecated
    PredicateSpec { name: "gold_above", args: &[Int] },
    PredicateSpec { name: "has_shield", args: &[] },
    PredicateSpec { name: "has_weapon", args: &[] },
    PredicateSpec { name: "health", args: &[Int] },
    // deprecated
    PredicateSpec { name: "health_below", args: &[Int] },
    PredicateSpec { name: "in_combat", args: &[] },
    PredicateSpec { name: "is_following", args: &[] },
    PredicateSpec { name: "is_mob", args: &[] },
    PredicateSpec { name: "item_in_eq", args: &[Int] },
    PredicateSpec { name: "item_in_inv", args: &[Int] },
    PredicateSpec { name: "item_in_room", args: &[Int] },
    // deprecated
    PredicateSpec { name: "level_above", args: &[Int] },
    // deprecated
    PredicateSpec { name: "level_below", args: &[Int] },
    PredicateSpec { name: "level", args: &[Int] },
    PredicateSpec { name: "name", args: &[Str] },
    PredicateSpec { name: "marked", args: &[Str, Str] },
    PredicateSpec { name: "mark_above", args: &[Str, Int] },
    PredicateSpec { name: "medals", args: &[Int] },
    PredicateSpec { name: "mob_in_room", args: &[Int] },
    PredicateSpec { name: "player_in_room", args: &[] },
    PredicateSpec { name: "quest_complete", args: &[Int] },
    // deprecated
    PredicateSpec { name: "standing_above", args: &[Str, Int] },
    PredicateSpec { name: "standing", args: &[Str, Int] },
    PredicateSpec { name: "wields_weapon_type", args: &[Str] },
];

/// Evaluate a single clause. Unknown names, missing arguments and argument
/// parse failures all degrade to a false result with a detail string.
pub fn evaluate_clause(ctx: &ConditionContext, text: &str) -> Evaluation {
    let tokens: Vec<String> = text.split_whitespace().map(str::to_lowercase).collect();

    let Some(name) = tokens.first() else {
        return Evaluation::fail(format!("Invalid condition '{}'", text));
    };
    let args = &tokens[1..];

    let Some(spec) = PREDICATES.iter().find(|spec| spec.name == name) else {
        return Evaluation::fail(format!("Invalid condition name {}", name));
    };

    if args.len() < spec.args.len() {
        return Evaluation::fail(format!(
            "Not enough arguments for {}. Need {}, passed {}",
            name,
            spec.args.len(),
            args.len()
        ));
    }

    match dispatch(ctx, name, args) {
        Ok(evaluation) => evaluation,
        Err(BadArg) => Evaluation::fail(format!("Invalid condition '{}'", text)),
    }
}

/// An argument failed to parse as its expected type
struct BadArg;

fn int_arg(args: &[String], index: usize) -> Result<i64, BadArg> {
    args.get(index).ok_or(BadArg)?.parse().map_err(|_| BadArg)
}

fn float_arg(args: &[String], index: usize) -> Result<f64, BadArg> {
    args.get(index).ok_or(BadArg)?.parse().map_err(|_| BadArg)
}

fn template_arg(args: &[String], index: usize) -> Result<u32, BadArg> {
    args.get(index).ok_or(BadArg)?.parse().map_err(|_| BadArg)
}

/// Optional minimum-count argument, defaulting to 1 when absent.
fn count_arg(args: &[String], index: usize) -> Result<i64, BadArg> {
    match args.get(index) {
        Some(raw) => raw.parse().map_err(|_| BadArg),
        None => Ok(1),
    }
}

/// Render a fact value the way the string-compare predicates see it.
fn fact_as_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn fact_as_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn health_percentage(ctx: &ConditionContext) -> f64 {
    let health_max = ctx.actor.health_max.max(1);
    ctx.actor.health as f64 / health_max as f64 * 100.0
}

fn dispatch(ctx: &ConditionContext, name: &str, args: &[String]) -> Result<Evaluation, BadArg> {
    let actor = &ctx.actor;

    let evaluation = match name {
        "archetype" => {
            if actor.archetype == args[0] {
                Evaluation::pass()
            } else {
                Evaluation::fail(format!("You are not a {}.", args[0]))
            }
        }

        "core_faction" => {
            if actor.core_faction == args[0] {
                Evaluation::pass()
            } else {
                Evaluation::fail("You are not of this core faction.")
            }
        }

        "currency" => {
            let amount = int_arg(args, 1)?;
            let currency = args[0].as_str();
            let balance = match currency {
                "gold" => actor.gold,
                "medals" => actor.medals,
                other => actor.currencies.get(other).copied().unwrap_or(0),
            };
            if balance >= amount {
                Evaluation::pass()
            } else {
                Evaluation::fail(format!("Not enough {}.", currency))
            }
        }

        "fact_check" => {
            let Some(value) = ctx.world.facts.get(&args[0]) else {
                return Ok(Evaluation::fail("Fact is not set."));
            };
            if fact_as_string(value) == args[1] {
                Evaluation::pass()
            } else {
                Evaluation::fail("Fact differs.")
            }
        }

        "fact_above" => {
            let Ok(threshold) = float_arg(args, 1) else {
                return Ok(Evaluation::fail("Value is not a number."));
            };
            let Some(value) = ctx.world.facts.get(&args[0]) else {
                return Ok(Evaluation::fail("Fact is not set."));
            };
            match fact_as_number(value) {
                Some(number) if number > threshold => Evaluation::pass(),
                Some(_) => Evaluation::fail(format!("Fact is not above {}.", threshold)),
                None => Evaluation::fail("Fact is not a number."),
            }
        }

        "gender" => {
            if actor.gender == args[0] {
                Evaluation::pass()
            } else {
                Evaluation::fail(format!("You are {}.", actor.gender))
            }
        }

        "gold" => {
            if actor.gold >= int_arg(args, 0)? {
                Evaluation::pass()
            } else {
                Evaluation::fail("Not enough gold.")
            }
        }

        "gold_above" => {
            if actor.gold > int_arg(args, 0)? {
                Evaluation::pass()
            } else {
                Evaluation::fail("Not enough gold.")
            }
        }

        "has_shield" => {
            let is_shield = actor
                .equipment
                .get("offhand")
                .map(|item| item.equipment_type == "shield")
                .unwrap_or(false);
            if is_shield {
                Evaluation::pass()
            } else {
                Evaluation::fail("No shield equipped.")
            }
        }

        "has_weapon" => {
            if actor.equipment.contains_key("weapon") {
                Evaluation::pass()
            } else {
                Evaluation::fail("No weapon equipped.")
            }
        }

        "health" => {
            if health_percentage(ctx) >= float_arg(args, 0)? {
                Evaluation::pass()
            } else {
                Evaluation::fail("Not enough health.")
            }
        }

        "health_below" => {
            if health_percentage(ctx) < float_arg(args, 0)? {
                Evaluation::pass()
            } else {
                Evaluation::fail("Health is too high.")
            }
        }

        "in_combat" => {
            if actor.state != "combat" {
                return Ok(Evaluation::fail("Not in combat."));
            }
            // Optional target keyword argument
            match args.first() {
                None => Evaluation::pass(),
                Some(wanted) => match &actor.target {
                    Some(target) => {
                        let keywords = target.keywords.to_lowercase();
                        if keywords.split_whitespace().any(|kw| kw == wanted) {
                            Evaluation::pass()
                        } else {
                            Evaluation::fail("Not in combat against target.")
                        }
                    }
                    None => Evaluation::fail("Not in combat."),
                },
            }
        }

        "is_following" => {
            if actor.following {
                Evaluation::pass()
            } else {
                Evaluation::fail("Not following anyone.")
            }
        }

        "is_mob" => {
            if actor.kind == CharKind::Mob {
                Evaluation::pass()
            } else {
                Evaluation::fail("You are not a mob.")
            }
        }

        "item_in_eq" => {
            let template_id = template_arg(args, 0)?;
            let equipped = actor
                .equipment
                .values()
                .any(|item| item.template_id == Some(template_id));
            if equipped {
                Evaluation::pass()
            } else {
                Evaluation::fail("Item not equipped.")
            }
        }

        "item_in_inv" => {
            let template_id = template_arg(args, 0)?;
            let wanted = count_arg(args, 1)?;
            let found = actor
                .inventory
                .iter()
                .filter(|item| item.template_id == Some(template_id))
                .count() as i64;
            if found >= wanted {
                Evaluation::pass()
            } else {
                Evaluation::fail("Items not in inventory.")
            }
        }

        "item_in_room" => {
            let template_id = template_arg(args, 0)?;
            let wanted = count_arg(args, 1)?;
            let found = ctx
                .room
                .inventory
                .iter()
                .filter(|item| item.template_id == Some(template_id))
                .count() as i64;
            if found >= wanted {
                Evaluation::pass()
            } else {
                Evaluation::fail("Required item is not in the room.")
            }
        }

        "level" => {
            let level = int_arg(args, 0)?;
            if actor.level >= level {
                Evaluation::pass()
            } else {
                Evaluation::fail(format!("You are not level {}.", level))
            }
        }

        "level_above" => {
            let level = int_arg(args, 0)?;
            if actor.level > level {
                Evaluation::pass()
            } else {
                Evaluation::fail(format!("You are not above level {}.", level))
            }
        }

        "level_below" => {
            let level = int_arg(args, 0)?;
            if actor.level < level {
                Evaluation::pass()
            } else {
                Evaluation::fail(format!("You are not below level {}.", level))
            }
        }

        "name" => {
            if actor.name.to_lowercase() == args[0] {
                Evaluation::pass()
            } else {
                Evaluation::fail("Name does not match.")
            }
        }

        "marked" => {
            let Some(value) = actor.marks.get(&args[0]) else {
                return Ok(Evaluation::fail("Player is not marked."));
            };
            if value.to_lowercase() == args[1] {
                Evaluation::pass()
            } else {
                Evaluation::fail("Mark differs.")
            }
        }

        "mark_above" => {
            let Ok(threshold) = float_arg(args, 1) else {
                return Ok(Evaluation::fail("Value is not a number."));
            };
            let Some(value) = actor.marks.get(&args[0]) else {
                return Ok(Evaluation::fail("Player is not marked."));
            };
            match value.parse::<f64>() {
                Ok(number) if number > threshold => Evaluation::pass(),
                Ok(_) => Evaluation::fail(format!("Mark is not above {}.", threshold)),
                Err(_) => Evaluation::fail("Mark is not a number."),
            }
        }

        "medals" => {
            if actor.medals >= int_arg(args, 0)? {
                Evaluation::pass()
            } else {
                Evaluation::fail("Not enough medals.")
            }
        }

        "mob_in_room" => {
            let template_id = template_arg(args, 0)?;
            let wanted = count_arg(args, 1)?;
            let found = ctx
                .room
                .chars
                .iter()
                .filter(|ch| ch.template_id == Some(template_id))
                .count() as i64;
            if found >= wanted {
                Evaluation::pass()
            } else {
                Evaluation::fail("Mob is not in room.")
            }
        }

        "player_in_room" => {
            if ctx.room.chars.iter().any(|ch| ch.kind == CharKind::Player) {
                Evaluation::pass()
            } else {
                Evaluation::fail("No player in room.")
            }
        }

        "quest_complete" => {
            let _quest_id = int_arg(args, 0)?;
            // Quest state lives outside this engine.
            Evaluation::fail("Quest complete not implemented.")
        }

        "standing" => {
            let wanted = int_arg(args, 1)?;
            let standing = actor.factions.get(&args[0]).copied().unwrap_or(0);
            if standing >= wanted {
                Evaluation::pass()
            } else {
                Evaluation::fail("Faction standing too low.")
            }
        }

        "standing_above" => {
            let wanted = int_arg(args, 1)?;
            let standing = actor.factions.get(&args[0]).copied().unwrap_or(0);
            if standing > wanted {
                Evaluation::pass()
            } else {
                Evaluation::fail("Faction standing too low.")
            }
        }

        "wields_weapon_type" => {
            let wields = actor
                .equipment
                .get("weapon")
                .map(|weapon| weapon.weapon_type == args[0])
                .unwrap_or(false);
            if wields {
                Evaluation::pass()
            } else {
                Evaluation::fail(format!("You are not wielding a {}.", args[0]))
            }
        }

        _ => Evaluation::fail("Condition not satisfied."),
    };

    Ok(evaluation)
}
