// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Random population of the merge road.
//!
//! Agent vehicles are spawned on the ramp and autonomous vehicles on the highway, at offsets
//! drawn without replacement from fixed pools of spawn points.
use anyhow::{bail, Result};
use log::debug;
use rand::seq::index;
use rand::Rng;

use super::road_builder::{HIGHWAY_LANE, RAMP_LANE};
use crate::network::LaneIndex;
use crate::parameters::ScenarioParameters;
use crate::road::Road;
use crate::units::Speed;
use crate::vehicle::{AutonomousState, TargetSpeeds, VehicleId, VehicleKind};

/// Spawn points on the highway, as longitudinal offsets on [HIGHWAY_LANE].
pub const HIGHWAY_SPAWN_POINTS: [f64; 6] = [10.0, 50.0, 90.0, 130.0, 170.0, 210.0];
/// Spawn points on the ramp, as longitudinal offsets on [RAMP_LANE].
pub const RAMP_SPAWN_POINTS: [f64; 6] = [5.0, 45.0, 85.0, 125.0, 165.0, 205.0];
/// Lower bound of the initial speeds.
pub const MIN_INITIAL_SPEED: f64 = 25.0;
/// Upper bound (excluded) of the initial speeds.
pub const MAX_INITIAL_SPEED: f64 = 27.0;
/// Maximum absolute longitudinal jitter added to the spawn points.
pub const MAX_JITTER: f64 = 1.5;

/// Driving mode of a spawned vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VehicleClass {
    /// Vehicle controlled by external meta-actions.
    Agent,
    /// Vehicle driving by itself.
    Autonomous,
}

/// Initial placement of a vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spawn {
    /// Driving mode of the vehicle.
    pub class: VehicleClass,
    /// Lane on which the vehicle is spawned.
    pub lane_index: LaneIndex,
    /// Spawn point drawn from the pool.
    pub offset: f64,
    /// Random longitudinal perturbation of the spawn point.
    pub jitter: f64,
    /// Initial speed.
    pub speed: Speed,
}

impl Spawn {
    /// Returns the longitudinal position of the vehicle on its lane.
    pub fn longitudinal(&self) -> f64 {
        self.offset + self.jitter
    }
}

/// Draws `n` spawn points without replacement from `pool` and removes them from the pool.
///
/// Returns an error if the pool has fewer than `n` spawn points left.
fn draw_offsets<R: Rng>(rng: &mut R, pool: &mut Vec<f64>, n: usize, name: &str) -> Result<Vec<f64>> {
    if n > pool.len() {
        bail!(
            "Cannot spawn {n} vehicles on the {name}: only {} spawn points are available",
            pool.len()
        );
    }
    let offsets: Vec<f64> = index::sample(rng, pool.len(), n)
        .into_iter()
        .map(|i| pool[i])
        .collect();
    pool.retain(|x| !offsets.contains(x));
    Ok(offsets)
}

/// Draws the initial placement of `nb_agents` agent vehicles on the ramp and `nb_autonomous`
/// autonomous vehicles on the highway.
///
/// The random draws happen in a fixed order: agent spawn points, autonomous spawn points, then
/// all the initial speeds and finally all the jitters. The spawns are returned with the agents
/// first.
pub fn draw_spawns<R: Rng>(rng: &mut R, nb_agents: usize, nb_autonomous: usize) -> Result<Vec<Spawn>> {
    let mut ramp_pool = RAMP_SPAWN_POINTS.to_vec();
    let mut highway_pool = HIGHWAY_SPAWN_POINTS.to_vec();
    let agent_offsets = draw_offsets(rng, &mut ramp_pool, nb_agents, "ramp")?;
    let autonomous_offsets = draw_offsets(rng, &mut highway_pool, nb_autonomous, "highway")?;
    let nb_vehicles = nb_agents + nb_autonomous;
    let speeds: Vec<Speed> = (0..nb_vehicles)
        .map(|_| Speed(rng.gen_range(MIN_INITIAL_SPEED..MAX_INITIAL_SPEED)))
        .collect();
    let jitters: Vec<f64> = (0..nb_vehicles)
        .map(|_| rng.gen_range(-MAX_JITTER..MAX_JITTER))
        .collect();
    let placements = agent_offsets
        .into_iter()
        .map(|offset| (VehicleClass::Agent, RAMP_LANE, offset))
        .chain(
            autonomous_offsets
                .into_iter()
                .map(|offset| (VehicleClass::Autonomous, HIGHWAY_LANE, offset)),
        );
    Ok(placements
        .zip(speeds)
        .zip(jitters)
        .map(|(((class, lane_index, offset), speed), jitter)| Spawn {
            class,
            lane_index,
            offset,
            jitter,
            speed,
        })
        .collect())
}

/// Populates the road with the vehicles of the scenario and returns the ids of the agent
/// vehicles.
pub fn populate<R: Rng>(
    road: &mut Road,
    parameters: &ScenarioParameters,
    rng: &mut R,
) -> Result<Vec<VehicleId>> {
    let spawns = draw_spawns(rng, parameters.controlled_vehicles, parameters.other_vehicles)?;
    let mut controlled = Vec::with_capacity(parameters.controlled_vehicles);
    for spawn in spawns {
        let kind = match spawn.class {
            VehicleClass::Agent => {
                VehicleKind::Agent(TargetSpeeds::new(parameters.target_speeds.clone()))
            }
            VehicleClass::Autonomous => VehicleKind::Autonomous(AutonomousState::default()),
        };
        let id = road.spawn_vehicle(spawn.lane_index, spawn.longitudinal(), spawn.speed, kind)?;
        if spawn.class == VehicleClass::Agent {
            controlled.push(id);
        }
    }
    debug!(
        "Populated the road with {} agent vehicles and {} autonomous vehicles",
        controlled.len(),
        road.vehicles().len() - controlled.len()
    );
    Ok(controlled)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    use super::*;

    #[test]
    fn draw_offsets_test() {
        let mut rng = XorShiftRng::seed_from_u64(13081996);
        let mut pool = RAMP_SPAWN_POINTS.to_vec();
        let offsets = draw_offsets(&mut rng, &mut pool, 4, "ramp").unwrap();
        assert_eq!(offsets.len(), 4);
        assert_eq!(pool.len(), 2);
        for offset in offsets {
            assert!(RAMP_SPAWN_POINTS.contains(&offset));
            assert!(!pool.contains(&offset));
        }
        assert!(draw_offsets(&mut rng, &mut pool, 3, "ramp").is_err());
        assert!(draw_offsets(&mut rng, &mut pool, 0, "ramp").unwrap().is_empty());
    }

    #[test]
    fn draw_spawns_test() {
        let mut rng = XorShiftRng::seed_from_u64(0);
        let spawns = draw_spawns(&mut rng, 2, 3).unwrap();
        assert_eq!(spawns.len(), 5);
        assert!(spawns[..2]
            .iter()
            .all(|s| s.class == VehicleClass::Agent && s.lane_index == RAMP_LANE));
        assert!(spawns[2..]
            .iter()
            .all(|s| s.class == VehicleClass::Autonomous && s.lane_index == HIGHWAY_LANE));
        for spawn in spawns {
            assert!((MIN_INITIAL_SPEED..MAX_INITIAL_SPEED).contains(&spawn.speed.0));
            assert!(spawn.jitter.abs() <= MAX_JITTER);
        }
    }
}
