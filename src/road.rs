// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Description of the [Road]: a road network populated with vehicles and static objects.
use std::sync::Arc;

use anyhow::{anyhow, Result};
use glam::DVec2;
use log::debug;

use crate::geometry::are_polygons_intersecting;
use crate::network::{LaneIndex, RoadNetwork};
use crate::units::{Speed, Time};
use crate::vehicle::{
    EntityView, MetaAction, Obstacle, RoadObject, Vehicle, VehicleId, VehicleKind, VehicleState,
};

/// Lateral margin used to decide whether an entity is on a lane in neighbour queries.
const NEIGHBOUR_MARGIN: f64 = 1.0;

/// Closest entities ahead and behind a position on a lane.
pub type Neighbours = (Option<EntityView>, Option<EntityView>);

/// A road network with the vehicles and objects currently on it.
///
/// The network is immutable and can be shared between roads.
#[derive(Clone, Debug)]
pub struct Road {
    network: Arc<RoadNetwork>,
    vehicles: Vec<Vehicle>,
    objects: Vec<Obstacle>,
    record_history: bool,
}

impl Road {
    /// Creates a new Road with no vehicle and no object.
    ///
    /// If `record_history` is `true`, the vehicles keep track of their recent states.
    pub fn new(network: Arc<RoadNetwork>, record_history: bool) -> Self {
        Road {
            network,
            vehicles: Vec::new(),
            objects: Vec::new(),
            record_history,
        }
    }

    /// Returns the road network.
    pub fn network(&self) -> &RoadNetwork {
        &self.network
    }

    /// Returns `true` if the vehicles record their trajectory.
    pub const fn record_history(&self) -> bool {
        self.record_history
    }

    /// Returns the vehicles on the road, ordered by [VehicleId].
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    /// Returns the static objects on the road.
    pub fn objects(&self) -> &[Obstacle] {
        &self.objects
    }

    /// Returns the vehicle with the given id.
    pub fn vehicle(&self, id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(id.index())
    }

    /// Returns a mutable reference to the vehicle with the given id.
    pub fn vehicle_mut(&mut self, id: VehicleId) -> Option<&mut Vehicle> {
        self.vehicles.get_mut(id.index())
    }

    /// Overrides the kinematic state of a vehicle.
    pub fn set_vehicle_state(&mut self, id: VehicleId, state: VehicleState) -> Result<()> {
        let network = &self.network;
        self.vehicles
            .get_mut(id.index())
            .ok_or_else(|| anyhow!("No vehicle {id} on the road"))?
            .set_state(state, network)
    }

    /// Updates the targets of a vehicle according to a meta-action.
    pub fn apply_meta_action(&mut self, id: VehicleId, action: MetaAction) -> Result<()> {
        let network = &self.network;
        self.vehicles
            .get_mut(id.index())
            .ok_or_else(|| anyhow!("No vehicle {id} on the road"))?
            .apply_meta_action(action, network)
    }

    /// Places a static obstacle at the given position.
    pub fn add_obstacle(&mut self, position: DVec2) {
        debug!("Adding obstacle at ({:.2}, {:.2})", position.x, position.y);
        self.objects.push(Obstacle::new(self.objects.len(), position));
    }

    /// Spawns a vehicle at a longitudinal position of a lane and returns its id.
    pub fn spawn_vehicle(
        &mut self,
        lane_index: LaneIndex,
        longitudinal: f64,
        speed: Speed,
        kind: VehicleKind,
    ) -> Result<VehicleId> {
        let id = VehicleId::new(self.vehicles.len());
        let vehicle = Vehicle::on_lane(
            id,
            &self.network,
            lane_index,
            longitudinal,
            speed,
            kind,
            self.record_history,
        )?;
        debug!(
            "Spawned vehicle {id} on lane {lane_index} at ({:.2}, {:.2}) with speed {speed}",
            vehicle.position().x,
            vehicle.position().y
        );
        self.vehicles.push(vehicle);
        Ok(id)
    }

    /// Returns an iterator over the frozen views of the vehicles.
    pub fn vehicle_views(&self) -> impl Iterator<Item = EntityView> + '_ {
        self.vehicles.iter().map(|v| v.view())
    }

    /// Returns the closest entities (vehicles or objects) ahead of and behind `ego` on the lane
    /// `lane_index`.
    ///
    /// Positions are measured along the lane. An entity is considered only if it is on the lane
    /// (with a lateral margin of 1 meter). `ego` itself is never returned.
    pub fn neighbour_vehicles(&self, ego: &EntityView, lane_index: LaneIndex) -> Result<Neighbours> {
        let lane = self.network.get_lane(lane_index)?;
        let s = lane.local_coordinates(ego.position).0;
        let mut front: Option<(f64, EntityView)> = None;
        let mut rear: Option<(f64, EntityView)> = None;
        let candidates = self
            .vehicle_views()
            .chain(self.objects.iter().map(|o| o.view()));
        for other in candidates {
            if other.entity == ego.entity || !lane.on_lane(other.position, NEIGHBOUR_MARGIN) {
                continue;
            }
            let s_other = lane.local_coordinates(other.position).0;
            if s <= s_other && front.as_ref().map_or(true, |(s_front, _)| s_other <= *s_front) {
                front = Some((s_other, other));
            }
            if s_other < s && rear.as_ref().map_or(true, |(s_rear, _)| s_other > *s_rear) {
                rear = Some((s_other, other));
            }
        }
        Ok((front.map(|(_, v)| v), rear.map(|(_, v)| v)))
    }

    /// Lets all vehicles decide their next control inputs.
    ///
    /// All decisions are computed against the same state of the road, then applied.
    pub fn act(&mut self) -> Result<()> {
        let decisions = self
            .vehicles
            .iter()
            .map(|v| v.decide(self))
            .collect::<Result<Vec<_>>>()?;
        for (vehicle, decision) in self.vehicles.iter_mut().zip(decisions) {
            vehicle.commit(decision);
        }
        Ok(())
    }

    /// Advances all vehicles by `dt` then checks for collisions.
    pub fn step(&mut self, dt: Time) -> Result<()> {
        for vehicle in self.vehicles.iter_mut() {
            vehicle.step(dt, &self.network)?;
        }
        self.handle_collisions(dt);
        Ok(())
    }

    /// Marks as crashed all pairs of intersecting vehicles and vehicle-object pairs.
    fn handle_collisions(&mut self, dt: Time) {
        for i in 0..self.vehicles.len() {
            for j in (i + 1)..self.vehicles.len() {
                if is_colliding(&self.vehicles[i], &self.vehicles[j], dt) {
                    debug!(
                        "Collision between vehicles {} and {}",
                        self.vehicles[i].id(),
                        self.vehicles[j].id()
                    );
                    self.vehicles[i].set_crashed(true);
                    self.vehicles[j].set_crashed(true);
                }
            }
            for k in 0..self.objects.len() {
                if is_colliding(&self.vehicles[i], &self.objects[k], dt) {
                    debug!("Vehicle {} hit an obstacle", self.vehicles[i].id());
                    self.vehicles[i].set_crashed(true);
                    self.objects[k].set_crashed();
                }
            }
        }
    }
}

/// Returns `true` if the footprints of the two objects intersect.
///
/// The polygon test is skipped when the objects are too far apart to touch within `dt`.
fn is_colliding(a: &impl RoadObject, b: &impl RoadObject, dt: Time) -> bool {
    let (view_a, view_b) = (a.view(), b.view());
    let reach = (a.diagonal() + b.diagonal()) / 2.0 + view_a.speed.0 * dt.0;
    if view_a.position.distance(view_b.position) > reach {
        return false;
    }
    are_polygons_intersecting(&a.polygon(), &b.polygon())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{LineType, StraightLane};
    use crate::vehicle::{AutonomousState, TargetSpeeds};

    fn road() -> Road {
        let mut network = RoadNetwork::new();
        for y in [0.0, 4.0] {
            network.add_lane(
                'a',
                'b',
                StraightLane::with_default_width(
                    DVec2::new(0.0, y),
                    DVec2::new(500.0, y),
                    [LineType::Striped, LineType::Striped],
                ),
            );
        }
        Road::new(Arc::new(network), false)
    }

    fn autonomous() -> VehicleKind {
        VehicleKind::Autonomous(AutonomousState::default())
    }

    #[test]
    fn neighbour_vehicles_test() {
        let mut road = road();
        let lane = LaneIndex::new('a', 'b', 0);
        let ego = road
            .spawn_vehicle(lane, 100.0, Speed(25.0), autonomous())
            .unwrap();
        let front = road
            .spawn_vehicle(lane, 130.0, Speed(25.0), autonomous())
            .unwrap();
        let far_front = road
            .spawn_vehicle(lane, 160.0, Speed(25.0), autonomous())
            .unwrap();
        let rear = road
            .spawn_vehicle(lane, 70.0, Speed(25.0), autonomous())
            .unwrap();
        let other_lane = road
            .spawn_vehicle(LaneIndex::new('a', 'b', 1), 90.0, Speed(25.0), autonomous())
            .unwrap();
        road.add_obstacle(DVec2::new(120.0, 4.0));
        let view = road.vehicle(ego).unwrap().view();

        let (f, r) = road.neighbour_vehicles(&view, lane).unwrap();
        assert_eq!(f.unwrap().entity, road.vehicle(front).unwrap().view().entity);
        assert_eq!(r.unwrap().entity, road.vehicle(rear).unwrap().view().entity);
        assert_ne!(f.unwrap().entity, road.vehicle(far_front).unwrap().view().entity);

        // On the other lane, the obstacle is seen as a stopped leader.
        let (f, r) = road
            .neighbour_vehicles(&view, LaneIndex::new('a', 'b', 1))
            .unwrap();
        let f = f.unwrap();
        assert!(!f.is_vehicle());
        assert_eq!(f.speed, Speed(0.0));
        let other_view = road.vehicle(other_lane).unwrap().view();
        assert_eq!(r.unwrap().entity, other_view.entity);
        let (f, r) = road.neighbour_vehicles(&other_view, lane).unwrap();
        assert_eq!(f.unwrap().entity, view.entity);
        assert_eq!(r.unwrap().entity, road.vehicle(rear).unwrap().view().entity);
    }

    #[test]
    fn collision_test() {
        let mut road = road();
        let lane = LaneIndex::new('a', 'b', 0);
        let a = road
            .spawn_vehicle(lane, 100.0, Speed(0.0), autonomous())
            .unwrap();
        let b = road
            .spawn_vehicle(lane, 103.0, Speed(0.0), autonomous())
            .unwrap();
        let c = road
            .spawn_vehicle(LaneIndex::new('a', 'b', 1), 100.0, Speed(0.0), autonomous())
            .unwrap();
        road.step(Time(0.1)).unwrap();
        assert!(road.vehicle(a).unwrap().crashed());
        assert!(road.vehicle(b).unwrap().crashed());
        assert!(!road.vehicle(c).unwrap().crashed());
    }

    #[test]
    fn obstacle_collision_test() {
        let mut road = road();
        let lane = LaneIndex::new('a', 'b', 0);
        let id = road
            .spawn_vehicle(
                lane,
                96.0,
                Speed(20.0),
                VehicleKind::Agent(TargetSpeeds::default()),
            )
            .unwrap();
        road.add_obstacle(DVec2::new(100.0, 0.0));
        road.step(Time(0.1)).unwrap();
        assert!(road.vehicle(id).unwrap().crashed());
        assert!(road.objects()[0].crashed());
    }

    #[test]
    fn act_test() {
        let mut road = road();
        let lane = LaneIndex::new('a', 'b', 0);
        let leader = road
            .spawn_vehicle(lane, 120.0, Speed(25.0), autonomous())
            .unwrap();
        let follower = road
            .spawn_vehicle(lane, 100.0, Speed(25.0), autonomous())
            .unwrap();
        road.act().unwrap();
        // Free road at target speed: no acceleration.
        assert!(road.vehicle(leader).unwrap().control().acceleration.abs() < 1e-9);
        // 20 meters behind a vehicle at the same speed is too close.
        assert!(road.vehicle(follower).unwrap().control().acceleration < 0.0);
    }
}
