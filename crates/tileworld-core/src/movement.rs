//! Movement rules: per-step passability and stamina cost.
//!
//! Passability is decided by a fixed precedence of overlay rules, first match
//! wins:
//! 1. dev-mode noclip
//! 2. grid bounds
//! 3. blocked for land (a road or bridge overrides)
//! 4. requires a boat (a bridge or owning a boat overrides)
//! 5. impassable biome (a road, bridge or climbing overrides)
//!
//! Cost is computed separately from the destination tile only.

use crate::biome::Biome;
use crate::coord::{Coord, Direction};
use crate::world::World;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Base stamina for one step
const BASE_COST: u32 = 1;

/// Base stamina for stepping onto impassable-class terrain
const STEEP_COST: u32 = 2;

/// Capabilities of the moving actor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Can enter tiles that require a boat
    #[serde(default, alias = "hasBoat")]
    pub boat: bool,
    /// Can climb mountains and volcanoes
    #[serde(default, alias = "canClimb")]
    pub climb: bool,
}

/// Per-call movement options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOptions {
    #[serde(default, alias = "devMode")]
    pub dev_mode: bool,
    /// Ignore every rule; only honoured in dev mode
    #[serde(default)]
    pub noclip: bool,
}

impl MoveOptions {
    /// Dev-mode noclip
    pub fn noclip() -> Self {
        Self {
            dev_mode: true,
            noclip: true,
        }
    }
}

/// Why a step was allowed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowReason {
    Noclip,
    RoadOverride,
    Ok,
}

impl AllowReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllowReason::Noclip => "noclip",
            AllowReason::RoadOverride => "road_override",
            AllowReason::Ok => "ok",
        }
    }
}

/// Why a step was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDenial {
    #[error("destination is outside the world")]
    Bounds,

    #[error("destination is blocked")]
    Blocked,

    #[error("destination requires a boat")]
    NeedBoat,

    #[error("destination is too steep")]
    TooSteep,

    #[error("unrecognized direction")]
    BadDirection,
}

impl MoveDenial {
    /// Stable reason string for the editor
    pub fn reason(&self) -> &'static str {
        match self {
            MoveDenial::Bounds => "bounds",
            MoveDenial::Blocked => "blocked",
            MoveDenial::NeedBoat => "need_boat",
            MoveDenial::TooSteep => "too_steep",
            MoveDenial::BadDirection => "bad_direction",
        }
    }
}

/// Destination of an allowed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepTarget {
    pub x: i32,
    pub y: i32,
    pub biome: Biome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepCost {
    pub stamina: u32,
}

/// An allowed step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub to: StepTarget,
    pub cost: StepCost,
    /// Rule that let the step through
    pub why: AllowReason,
}

/// Decide whether `actor` may enter (`x`, `y`).
pub fn passable(
    world: &World,
    x: i32,
    y: i32,
    actor: &Actor,
    options: &MoveOptions,
) -> Result<AllowReason, MoveDenial> {
    if options.dev_mode && options.noclip {
        return Ok(AllowReason::Noclip);
    }

    let at = Coord::new(x, y);
    let tile = world.tile(at).ok_or(MoveDenial::Bounds)?;
    let on_road = world.is_road(at);

    if world.is_blocked(at) && !on_road {
        return Err(MoveDenial::Blocked);
    }

    if world.requires_boat(at) && !actor.boat && !world.is_bridge(at) {
        return Err(MoveDenial::NeedBoat);
    }

    if tile.biome.is_impassable() && !on_road && !actor.climb {
        return Err(MoveDenial::TooSteep);
    }

    Ok(if on_road {
        AllowReason::RoadOverride
    } else {
        AllowReason::Ok
    })
}

/// Stamina for stepping onto `at`.
///
/// Impassable-class terrain costs double; roads and bridges halve the cost,
/// rounding up, never below 1.
pub fn step_cost(world: &World, at: Coord) -> u32 {
    let steep = world.tile(at).is_some_and(|t| t.biome.is_impassable());
    let base = if steep { STEEP_COST } else { BASE_COST };
    if world.is_road(at) {
        ((base + 1) / 2).max(1)
    } else {
        base
    }
}

/// Evaluate one step from `from` in the direction named by `direction`.
pub fn evaluate_step(
    world: &World,
    actor: &Actor,
    from: Coord,
    direction: &str,
    options: &MoveOptions,
) -> Result<Step, MoveDenial> {
    let direction = Direction::from_token(direction).ok_or(MoveDenial::BadDirection)?;
    evaluate_direction(world, actor, from, direction, options)
}

/// [`evaluate_step`] for an already parsed direction
pub fn evaluate_direction(
    world: &World,
    actor: &Actor,
    from: Coord,
    direction: Direction,
    options: &MoveOptions,
) -> Result<Step, MoveDenial> {
    let to = match from.checked_step(direction) {
        Some(to) => to,
        None if options.dev_mode && options.noclip => from.step(direction),
        None => {
            debug!(from = %from, reason = MoveDenial::Bounds.reason(), "step leaves the coordinate range");
            return Err(MoveDenial::Bounds);
        }
    };
    let why = passable(world, to.x, to.y, actor, options).map_err(|denial| {
        debug!(from = %from, to = %to, reason = denial.reason(), "step denied");
        denial
    })?;

    let biome = world
        .tile(to)
        .map(|t| t.biome.clone())
        .unwrap_or_else(Biome::void);

    Ok(Step {
        to: StepTarget {
            x: to.x,
            y: to.y,
            biome,
        },
        cost: StepCost {
            stamina: step_cost(world, to),
        },
        why,
    })
}

/// Where a route stopped early
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteStop {
    /// Index of the denied step
    pub index: usize,
    pub reason: MoveDenial,
}

/// Result of walking a sequence of steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    pub steps: Vec<Step>,
    /// Total stamina of the allowed steps
    pub stamina: u32,
    /// Last position reached
    pub end: Coord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped: Option<RouteStop>,
}

/// Walk `directions` from `from`, stopping at the first denied step.
pub fn evaluate_route<I, S>(
    world: &World,
    actor: &Actor,
    from: Coord,
    directions: I,
    options: &MoveOptions,
) -> Route
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut route = Route {
        steps: Vec::new(),
        stamina: 0,
        end: from,
        stopped: None,
    };

    for (index, direction) in directions.into_iter().enumerate() {
        match evaluate_step(world, actor, route.end, direction.as_ref(), options) {
            Ok(step) => {
                route.stamina += step.cost.stamina;
                route.end = Coord::new(step.to.x, step.to.y);
                route.steps.push(step);
            }
            Err(reason) => {
                route.stopped = Some(RouteStop { index, reason });
                break;
            }
        }
    }
    route
}
