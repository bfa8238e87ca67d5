//! Procedural layout generation engine
//!
//! Turns a small set of numeric parameters into spatial layout descriptions:
//! a BSP partitioner producing building floor plans, and an L-system driven
//! turtle producing planar road networks. Both paths are fully deterministic
//! for a fixed seed and configuration, and serialize to a canonical JSON
//! contract consumed by an external 3D content engine.

pub mod bsp;
pub mod config;
pub mod error;
pub mod export;
pub mod geometry;
pub mod lsystem;
pub mod roads;
pub mod rooms;
pub mod seeds;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::{BspConfig, LSystemConfig, RoomConfig};
use crate::error::LayoutError;
use crate::geometry::Rect;
use crate::lsystem::{expand, parse_symbols, RuleSet};
use crate::roads::RoadNetwork;
use crate::rooms::FloorPlan;
use crate::seeds::LayoutSeeds;

/// Generate a complete floor plan for `boundary`.
///
/// One run owns its RNGs exclusively; the partition and room systems draw
/// from separate sub-seeds so either can be varied independently.
pub fn generate_floor_plan(
    boundary: Rect,
    bsp_config: &BspConfig,
    room_config: &RoomConfig,
    seed: u64,
) -> Result<FloorPlan, LayoutError> {
    let seeds = LayoutSeeds::from_master(seed);
    let mut partition_rng = ChaCha8Rng::seed_from_u64(seeds.partition);
    let leaves = bsp::partition(boundary, bsp_config, &mut partition_rng)?;

    let mut room_rng = ChaCha8Rng::seed_from_u64(seeds.rooms);
    rooms::build_floor_plan(boundary, &leaves, room_config, &mut room_rng)
}

/// Generate a complete road network from an L-system configuration.
pub fn generate_road_network(
    config: &LSystemConfig,
    seed: u64,
) -> Result<RoadNetwork, LayoutError> {
    config.validate()?;
    let seeds = LayoutSeeds::from_master(seed);

    let axiom = parse_symbols(&config.axiom)?;
    let rules = RuleSet::from_specs(&config.rules)?;
    let mut grammar_rng = ChaCha8Rng::seed_from_u64(seeds.grammar);
    let symbols = expand(&axiom, &rules, config.iterations, config.max_symbols, &mut grammar_rng)?;

    roads::interpret(&symbols, &config.turtle())
}
