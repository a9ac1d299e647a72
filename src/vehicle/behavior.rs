// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Driving behavior of autonomous vehicles: Intelligent Driver Model for the longitudinal control
//! and MOBIL (Minimizing Overall Braking Induced by Lane changes) for the lane-change decisions.
use anyhow::{anyhow, Result};

use super::{EntityView, LENGTH};
use crate::geometry::{direction, not_zero};
use crate::network::{LaneIndex, RoadNetwork};
use crate::road::Road;
use crate::units::Time;

/// Maximum absolute acceleration.
pub const ACC_MAX: f64 = 6.0;
/// Desired maximum acceleration.
pub const COMFORT_ACC_MAX: f64 = 3.0;
/// Desired maximum deceleration.
pub const COMFORT_ACC_MIN: f64 = -5.0;
/// Desired jam distance to the front vehicle.
pub const DISTANCE_WANTED: f64 = 5.0 + LENGTH;
/// Desired time gap to the front vehicle.
pub const TIME_WANTED: f64 = 1.5;
/// Exponent of the velocity term.
pub const DELTA: f64 = 4.0;
/// Weight of the accelerations of the other vehicles in the lane-change incentive.
pub const POLITENESS: f64 = 0.0;
/// Minimum acceleration gain required to change lane.
pub const LANE_CHANGE_MIN_ACC_GAIN: f64 = 0.2;
/// Maximum braking a lane change can impose on the new following vehicle.
pub const LANE_CHANGE_MAX_BRAKING_IMPOSED: f64 = 2.0;
/// Time between two lane-change decisions.
pub const LANE_CHANGE_DELAY: Time = Time(1.0);

/// Outcome of the lane-change policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct LaneChange {
    pub(crate) target_lane_index: LaneIndex,
    pub(crate) reset_timer: bool,
}

fn lane_of(ego: &EntityView) -> Result<LaneIndex> {
    ego.lane_index
        .ok_or_else(|| anyhow!("Static objects do not drive on a lane"))
}

/// Returns the longitudinal distance from `ego` to `other`, measured along the lane of `ego`.
fn lane_distance(network: &RoadNetwork, ego: &EntityView, other: &EntityView) -> Result<f64> {
    let lane = network.get_lane(lane_of(ego)?)?;
    Ok(lane.local_coordinates(other.position).0 - lane.local_coordinates(ego.position).0)
}

/// Returns the desired distance between `ego` and the vehicle in `front`.
pub fn desired_gap(ego: &EntityView, front: &EntityView) -> f64 {
    let ab = -COMFORT_ACC_MAX * COMFORT_ACC_MIN;
    let ego_direction = direction(ego.heading);
    let dv = (ego.velocity() - front.velocity()).dot(ego_direction);
    DISTANCE_WANTED + ego.speed.0 * TIME_WANTED + ego.speed.0 * dv / (2.0 * ab.sqrt())
}

/// Returns the IDM acceleration of `ego` when following `front`.
///
/// The acceleration is zero when `ego` is missing or is a static object.
pub fn idm_acceleration(
    network: &RoadNetwork,
    ego: Option<&EntityView>,
    front: Option<&EntityView>,
) -> Result<f64> {
    let Some(ego) = ego.filter(|e| e.is_vehicle()) else {
        return Ok(0.0);
    };
    let target_speed = ego.target_speed.map_or(0.0, |s| s.0);
    let mut acceleration =
        COMFORT_ACC_MAX * (1.0 - (ego.speed.0.max(0.0) / not_zero(target_speed).abs()).powf(DELTA));
    if let Some(front) = front {
        let d = lane_distance(network, ego, front)?;
        acceleration -= COMFORT_ACC_MAX * (desired_gap(ego, front) / not_zero(d)).powi(2);
    }
    Ok(acceleration)
}

/// Returns the acceleration of an autonomous vehicle, accounting for the front vehicles on both
/// its current lane and its target lane.
pub(crate) fn idm_control(
    road: &Road,
    ego: &EntityView,
    target_lane_index: LaneIndex,
) -> Result<f64> {
    let network = road.network();
    let lane_index = lane_of(ego)?;
    let (front, _) = road.neighbour_vehicles(ego, lane_index)?;
    let mut acceleration = idm_acceleration(network, Some(ego), front.as_ref())?;
    if lane_index != target_lane_index {
        let (target_front, _) = road.neighbour_vehicles(ego, target_lane_index)?;
        let target_acceleration = idm_acceleration(network, Some(ego), target_front.as_ref())?;
        acceleration = acceleration.min(target_acceleration);
    }
    Ok(acceleration.clamp(-ACC_MAX, ACC_MAX))
}

/// Returns `true` if changing to lane `lane_index` is both safe and advantageous for `ego`.
fn mobil(road: &Road, ego: &EntityView, lane_index: LaneIndex) -> Result<bool> {
    let network = road.network();
    // Is the maneuver unsafe for the new following vehicle?
    let (new_preceding, new_following) = road.neighbour_vehicles(ego, lane_index)?;
    let new_following_a =
        idm_acceleration(network, new_following.as_ref(), new_preceding.as_ref())?;
    let new_following_pred_a = idm_acceleration(network, new_following.as_ref(), Some(ego))?;
    if new_following_pred_a < -LANE_CHANGE_MAX_BRAKING_IMPOSED {
        return Ok(false);
    }
    // Is there an acceleration advantage for ego and its followers?
    let (old_preceding, old_following) = road.neighbour_vehicles(ego, lane_of(ego)?)?;
    let self_pred_a = idm_acceleration(network, Some(ego), new_preceding.as_ref())?;
    let self_a = idm_acceleration(network, Some(ego), old_preceding.as_ref())?;
    let old_following_a = idm_acceleration(network, old_following.as_ref(), Some(ego))?;
    let old_following_pred_a =
        idm_acceleration(network, old_following.as_ref(), old_preceding.as_ref())?;
    let jerk = self_pred_a - self_a
        + POLITENESS
            * (new_following_pred_a - new_following_a + old_following_pred_a - old_following_a);
    Ok(jerk >= LANE_CHANGE_MIN_ACC_GAIN)
}

/// Decides whether `ego` should change its target lane.
///
/// An ongoing lane change is aborted if another vehicle is merging into the same lane too
/// closely ahead. Otherwise, new lane changes are evaluated at most once every
/// [LANE_CHANGE_DELAY]. Forbidden lanes are never selected.
///
/// Returns `None` if the target lane and the decision timer are unchanged.
pub(crate) fn change_lane_policy(
    road: &Road,
    ego: &EntityView,
    timer: Time,
) -> Result<Option<LaneChange>> {
    let network = road.network();
    let lane_index = lane_of(ego)?;
    let target_lane_index = ego.target_lane_index.unwrap_or(lane_index);
    if lane_index != target_lane_index {
        if lane_index.same_edge(&target_lane_index) {
            for other in road.vehicle_views() {
                if other.entity != ego.entity
                    && other.lane_index != Some(target_lane_index)
                    && other.target_lane_index == Some(target_lane_index)
                {
                    let d = lane_distance(network, ego, &other)?;
                    if 0.0 < d && d < desired_gap(ego, &other) {
                        return Ok(Some(LaneChange {
                            target_lane_index: lane_index,
                            reset_timer: false,
                        }));
                    }
                }
            }
        }
        return Ok(None);
    }
    if timer <= LANE_CHANGE_DELAY {
        return Ok(None);
    }
    let mut decision = LaneChange {
        target_lane_index,
        reset_timer: true,
    };
    for candidate in network.side_lanes(lane_index) {
        let lane = network.get_lane(candidate)?;
        if lane.is_forbidden() || !lane.is_reachable_from(ego.position) {
            continue;
        }
        if ego.speed.0.abs() < 1.0 {
            continue;
        }
        if mobil(road, ego, candidate)? {
            decision.target_lane_index = candidate;
        }
    }
    Ok(Some(decision))
}

#[cfg(test)]
mod tests {
    use glam::DVec2;

    use super::*;
    use crate::units::Speed;
    use crate::vehicle::{EntityId, VehicleId};

    fn view(x: f64, speed: f64) -> EntityView {
        EntityView {
            entity: EntityId::Vehicle(VehicleId::new(0)),
            position: DVec2::new(x, 0.0),
            heading: 0.0,
            speed: Speed(speed),
            lane_index: Some(LaneIndex::new('a', 'b', 0)),
            target_lane_index: Some(LaneIndex::new('a', 'b', 0)),
            target_speed: Some(Speed(25.0)),
        }
    }

    #[test]
    fn desired_gap_test() {
        let ego = view(0.0, 20.0);
        let front = view(50.0, 20.0);
        assert!((desired_gap(&ego, &front) - 40.0).abs() < 1e-12);
        // Closing in on a slower vehicle increases the desired gap.
        let slower = view(50.0, 10.0);
        assert!(desired_gap(&ego, &slower) > 40.0);
    }

    #[test]
    fn free_road_acceleration_test() {
        let network = RoadNetwork::new();
        let at_target = view(0.0, 25.0);
        assert!(idm_acceleration(&network, Some(&at_target), None)
            .unwrap()
            .abs()
            < 1e-12);
        let stopped = view(0.0, 0.0);
        assert_eq!(
            idm_acceleration(&network, Some(&stopped), None).unwrap(),
            COMFORT_ACC_MAX
        );
        assert_eq!(idm_acceleration(&network, None, None).unwrap(), 0.0);
        let object = EntityView {
            entity: EntityId::Object(0),
            lane_index: None,
            target_lane_index: None,
            target_speed: None,
            ..stopped
        };
        assert_eq!(
            idm_acceleration(&network, Some(&object), None).unwrap(),
            0.0
        );
    }
}
