// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Description of the vehicles and static objects that populate a [Road](crate::road::Road).
//!
//! All the vehicles share the same kinematic state and update rule. They differ by the way they
//! choose their control inputs:
//!
//! - [VehicleKind::Agent] vehicles receive discrete [MetaAction]s from an external decision
//!   maker and pick their target speed in a discrete schedule.
//! - [VehicleKind::Autonomous] vehicles drive by themselves, using an intelligent-driver model
//!   for the longitudinal control and a MOBIL-style lane-change policy.
pub mod behavior;
pub mod controller;
pub mod objects;

use std::collections::VecDeque;
use std::fmt;

use anyhow::Result;
use glam::DVec2;
use num_traits::Zero;
use schemars::JsonSchema;
use serde_derive::{Deserialize, Serialize};

pub use self::controller::{MetaAction, TargetSpeeds};
pub use self::objects::Obstacle;
use crate::geometry::{direction, rectangle_corners};
use crate::network::{LaneIndex, RoadNetwork};
use crate::road::Road;
use crate::units::{Speed, Time};

/// Length of a vehicle.
pub const LENGTH: f64 = 5.0;
/// Width of a vehicle.
pub const WIDTH: f64 = 2.0;
/// Maximum speed of a vehicle.
pub const MAX_SPEED: Speed = Speed(40.0);
/// Minimum speed of a vehicle (i.e., maximum reverse speed).
pub const MIN_SPEED: Speed = Speed(-40.0);
/// Number of past states kept when the trajectories are recorded.
pub const HISTORY_SIZE: usize = 30;

/// Vehicle identifier, i.e., the position of the vehicle in the road's vehicle list.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    PartialOrd,
    Eq,
    Ord,
    Hash,
    Deserialize,
    Serialize,
    JsonSchema,
)]
pub struct VehicleId(usize);

impl VehicleId {
    /// Creates a new VehicleId.
    pub const fn new(x: usize) -> Self {
        VehicleId(x)
    }

    /// Returns the index of the VehicleId.
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of anything a vehicle can meet on the road.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityId {
    /// A vehicle.
    Vehicle(VehicleId),
    /// A static object, given by its position in the road's object list.
    Object(usize),
}

/// Low-level control inputs of a vehicle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Control {
    /// Front-wheel angle, in radians.
    pub steering: f64,
    /// Acceleration, in meters per second squared.
    pub acceleration: f64,
}

/// Kinematic state of a vehicle.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct VehicleState {
    /// World position of the vehicle center.
    pub position: DVec2,
    /// Heading, in radians.
    pub heading: f64,
    /// Speed along the heading.
    pub speed: Speed,
}

/// Frozen view of a vehicle or object, used by the driving policies of other vehicles.
#[derive(Clone, Copy, Debug)]
pub struct EntityView {
    /// Identifier of the entity.
    pub entity: EntityId,
    /// World position.
    pub position: DVec2,
    /// Heading, in radians.
    pub heading: f64,
    /// Speed along the heading.
    pub speed: Speed,
    /// Lane the entity is on (`None` for static objects).
    pub lane_index: Option<LaneIndex>,
    /// Lane the entity is heading to (`None` for static objects).
    pub target_lane_index: Option<LaneIndex>,
    /// Cruising speed of the entity (`None` for static objects).
    pub target_speed: Option<Speed>,
}

impl EntityView {
    /// Returns the velocity vector.
    pub fn velocity(&self) -> DVec2 {
        self.speed.0 * direction(self.heading)
    }

    /// Returns `true` if the entity is a vehicle.
    pub fn is_vehicle(&self) -> bool {
        matches!(self.entity, EntityId::Vehicle(_))
    }
}

/// Shared interface of everything that occupies space on the road.
pub trait RoadObject {
    /// Returns a frozen view of the object.
    fn view(&self) -> EntityView;
    /// Returns the length of the object.
    fn length(&self) -> f64;
    /// Returns the width of the object.
    fn width(&self) -> f64;

    /// Returns the corners of the object's footprint.
    fn polygon(&self) -> [DVec2; 4] {
        let view = self.view();
        rectangle_corners(view.position, self.length(), self.width(), view.heading)
    }

    /// Returns the length of the diagonal of the object's footprint.
    fn diagonal(&self) -> f64 {
        self.length().hypot(self.width())
    }
}

/// State specific to autonomous vehicles.
#[derive(Clone, Debug, Default)]
pub struct AutonomousState {
    /// Time elapsed since the last lane-change decision.
    pub(crate) timer: Time,
}

/// The closed set of vehicle variants.
#[derive(Clone, Debug)]
pub enum VehicleKind {
    /// Vehicle controlled by external discrete meta-actions.
    Agent(TargetSpeeds),
    /// Vehicle driving by itself.
    Autonomous(AutonomousState),
}

/// Decision taken by a vehicle for the next simulation frame.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Decision {
    pub(crate) control: Control,
    pub(crate) target_lane_index: LaneIndex,
    pub(crate) reset_timer: bool,
}

/// A vehicle moving on a [Road].
#[derive(Clone, Debug)]
pub struct Vehicle {
    id: VehicleId,
    position: DVec2,
    heading: f64,
    speed: Speed,
    lane_index: LaneIndex,
    target_lane_index: LaneIndex,
    target_speed: Speed,
    crashed: bool,
    control: Control,
    history: Option<VecDeque<VehicleState>>,
    kind: VehicleKind,
}

impl Vehicle {
    /// Creates a new vehicle at a given longitudinal position on a lane.
    ///
    /// The vehicle is aligned with the lane. Its target lane is its current lane and its target
    /// speed is its initial speed (for agent vehicles, the closest speed of the schedule).
    pub(crate) fn on_lane(
        id: VehicleId,
        network: &RoadNetwork,
        lane_index: LaneIndex,
        longitudinal: f64,
        speed: Speed,
        kind: VehicleKind,
        record_history: bool,
    ) -> Result<Self> {
        let lane = network.get_lane(lane_index)?;
        let mut vehicle = Vehicle {
            id,
            position: lane.position(longitudinal, 0.0),
            heading: lane.heading_at(longitudinal),
            speed,
            lane_index,
            target_lane_index: lane_index,
            target_speed: speed,
            crashed: false,
            control: Control::default(),
            history: record_history.then(VecDeque::new),
            kind,
        };
        if let VehicleKind::Agent(schedule) = &mut vehicle.kind {
            if let Some(index) = schedule.speed_to_index(speed) {
                schedule.set_index(index);
                vehicle.target_speed = schedule.speeds()[index];
            }
        }
        vehicle.lane_index = network.get_closest_lane_index(vehicle.position, vehicle.heading)?;
        Ok(vehicle)
    }

    /// Returns the identifier of the vehicle.
    pub const fn id(&self) -> VehicleId {
        self.id
    }

    /// Returns the world position of the vehicle center.
    pub const fn position(&self) -> DVec2 {
        self.position
    }

    /// Returns the heading of the vehicle.
    pub const fn heading(&self) -> f64 {
        self.heading
    }

    /// Returns the speed of the vehicle.
    pub const fn speed(&self) -> Speed {
        self.speed
    }

    /// Returns the velocity vector of the vehicle.
    pub fn velocity(&self) -> DVec2 {
        self.speed.0 * direction(self.heading)
    }

    /// Returns the lane the vehicle is currently on.
    pub const fn lane_index(&self) -> LaneIndex {
        self.lane_index
    }

    /// Returns the lane the vehicle is heading to.
    pub const fn target_lane_index(&self) -> LaneIndex {
        self.target_lane_index
    }

    /// Returns the cruising speed the vehicle is trying to reach.
    pub const fn target_speed(&self) -> Speed {
        self.target_speed
    }

    /// Returns `true` if the vehicle has been involved in a collision.
    pub const fn crashed(&self) -> bool {
        self.crashed
    }

    /// Returns the last control inputs applied to the vehicle.
    pub const fn control(&self) -> Control {
        self.control
    }

    /// Returns the variant of the vehicle.
    pub const fn kind(&self) -> &VehicleKind {
        &self.kind
    }

    /// Returns `true` if the vehicle receives external meta-actions.
    pub fn is_agent(&self) -> bool {
        matches!(self.kind, VehicleKind::Agent(_))
    }

    /// Returns the target-speed schedule of the vehicle, for agent vehicles.
    pub fn target_speeds(&self) -> Option<&TargetSpeeds> {
        match &self.kind {
            VehicleKind::Agent(schedule) => Some(schedule),
            VehicleKind::Autonomous(_) => None,
        }
    }

    /// Returns the past states of the vehicle, most recent first, if they are recorded.
    pub fn history(&self) -> Option<&VecDeque<VehicleState>> {
        self.history.as_ref()
    }

    /// Returns the kinematic state of the vehicle.
    pub fn state(&self) -> VehicleState {
        VehicleState {
            position: self.position,
            heading: self.heading,
            speed: self.speed,
        }
    }

    /// Sets the crashed flag of the vehicle.
    pub fn set_crashed(&mut self, crashed: bool) {
        self.crashed = crashed;
    }

    /// Overrides the kinematic state of the vehicle and updates its current lane.
    pub fn set_state(&mut self, state: VehicleState, network: &RoadNetwork) -> Result<()> {
        self.position = state.position;
        self.heading = state.heading;
        self.speed = state.speed;
        self.lane_index = network.get_closest_lane_index(self.position, self.heading)?;
        Ok(())
    }

    /// Returns the index of the lane the vehicle should follow: its target lane, or the next lane
    /// on the road when the end of the target lane is reached.
    fn follow_road(&self, network: &RoadNetwork) -> Result<LaneIndex> {
        if network
            .get_lane(self.target_lane_index)?
            .after_end(self.position)
        {
            Ok(network.next_lane(self.target_lane_index, self.position))
        } else {
            Ok(self.target_lane_index)
        }
    }

    /// Updates the targets of the vehicle according to a meta-action.
    pub fn apply_meta_action(&mut self, action: MetaAction, network: &RoadNetwork) -> Result<()> {
        self.target_lane_index = self.follow_road(network)?;
        match action {
            MetaAction::Faster | MetaAction::Slower => {
                let step: isize = if action == MetaAction::Faster { 1 } else { -1 };
                match &mut self.kind {
                    VehicleKind::Agent(schedule) => {
                        if let Some(index) = schedule.speed_to_index(self.speed) {
                            let index = schedule.clamp_index(index as isize + step);
                            schedule.set_index(index);
                            self.target_speed = schedule.speeds()[index];
                        }
                    }
                    VehicleKind::Autonomous(_) => {
                        self.target_speed += controller::DELTA_SPEED * step as f64;
                    }
                }
            }
            MetaAction::LaneLeft | MetaAction::LaneRight => {
                let current = self.target_lane_index;
                let nb_lanes = network
                    .lanes(current.from, current.to)
                    .map_or(1, |lanes| lanes.len());
                let id = if action == MetaAction::LaneLeft {
                    current.id.saturating_sub(1)
                } else {
                    (current.id + 1).min(nb_lanes - 1)
                };
                let candidate = LaneIndex::new(current.from, current.to, id);
                if network.get_lane(candidate)?.is_reachable_from(self.position) {
                    self.target_lane_index = candidate;
                }
            }
            MetaAction::Idle => {}
        }
        Ok(())
    }

    /// Computes the decision of the vehicle for the next frame, given a frozen road.
    pub(crate) fn decide(&self, road: &Road) -> Result<Decision> {
        if self.crashed {
            return Ok(Decision {
                control: self.control,
                target_lane_index: self.target_lane_index,
                reset_timer: false,
            });
        }
        let network = road.network();
        let mut target_lane_index = self.follow_road(network)?;
        let mut reset_timer = false;
        let acceleration = match &self.kind {
            VehicleKind::Agent(_) => controller::speed_control(self.speed, self.target_speed),
            VehicleKind::Autonomous(state) => {
                let ego = EntityView {
                    target_lane_index: Some(target_lane_index),
                    ..self.view()
                };
                if let Some(lane_change) = behavior::change_lane_policy(road, &ego, state.timer)? {
                    target_lane_index = lane_change.target_lane_index;
                    reset_timer = lane_change.reset_timer;
                }
                behavior::idm_control(road, &ego, target_lane_index)?
            }
        };
        let steering = controller::steering_control(network, &self.state(), target_lane_index)?;
        Ok(Decision {
            control: Control {
                steering,
                acceleration,
            },
            target_lane_index,
            reset_timer,
        })
    }

    /// Applies a decision computed by [Vehicle::decide].
    pub(crate) fn commit(&mut self, decision: Decision) {
        self.control = decision.control;
        self.target_lane_index = decision.target_lane_index;
        if let VehicleKind::Autonomous(state) = &mut self.kind {
            if decision.reset_timer {
                state.timer = Time::zero();
            }
        }
    }

    fn clip_control(&mut self) {
        if self.crashed {
            self.control.steering = 0.0;
            self.control.acceleration = -self.speed.0;
        }
        if self.speed > MAX_SPEED {
            self.control.acceleration = self.control.acceleration.min((MAX_SPEED - self.speed).0);
        } else if self.speed < MIN_SPEED {
            self.control.acceleration = self.control.acceleration.max((MIN_SPEED - self.speed).0);
        }
    }

    /// Integrates the kinematics of the vehicle over `dt`, using a kinematic bicycle model.
    pub(crate) fn step(&mut self, dt: Time, network: &RoadNetwork) -> Result<()> {
        self.clip_control();
        let Control {
            steering,
            acceleration,
        } = self.control;
        let beta = (0.5 * steering.tan()).atan();
        self.position += self.speed.0 * direction(self.heading + beta) * dt.0;
        self.heading += self.speed.0 * beta.sin() / (LENGTH / 2.0) * dt.0;
        self.speed += Speed(acceleration * dt.0);
        if let VehicleKind::Autonomous(state) = &mut self.kind {
            state.timer += dt;
        }
        self.lane_index = network.get_closest_lane_index(self.position, self.heading)?;
        let state = self.state();
        if let Some(history) = self.history.as_mut() {
            history.push_front(state);
            history.truncate(HISTORY_SIZE);
        }
        Ok(())
    }
}

impl RoadObject for Vehicle {
    fn view(&self) -> EntityView {
        EntityView {
            entity: EntityId::Vehicle(self.id),
            position: self.position,
            heading: self.heading,
            speed: self.speed,
            lane_index: Some(self.lane_index),
            target_lane_index: Some(self.target_lane_index),
            target_speed: Some(self.target_speed),
        }
    }

    fn length(&self) -> f64 {
        LENGTH
    }

    fn width(&self) -> f64 {
        WIDTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{LineType, StraightLane};

    fn network() -> RoadNetwork {
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
        network
    }

    fn agent(network: &RoadNetwork, speed: f64) -> Vehicle {
        Vehicle::on_lane(
            VehicleId::new(0),
            network,
            LaneIndex::new('a', 'b', 0),
            10.0,
            Speed(speed),
            VehicleKind::Agent(TargetSpeeds::default()),
            true,
        )
        .unwrap()
    }

    #[test]
    fn agent_initial_target_test() {
        let network = network();
        let vehicle = agent(&network, 26.0);
        assert_eq!(vehicle.target_speed(), Speed(25.0));
        assert_eq!(vehicle.target_speeds().unwrap().index(), 1);
        assert_eq!(vehicle.position(), DVec2::new(10.0, 0.0));
        assert_eq!(vehicle.lane_index(), LaneIndex::new('a', 'b', 0));
    }

    #[test]
    fn meta_action_test() {
        let network = network();
        let mut vehicle = agent(&network, 26.0);
        vehicle
            .apply_meta_action(MetaAction::Faster, &network)
            .unwrap();
        assert_eq!(vehicle.target_speed(), Speed(30.0));
        vehicle
            .apply_meta_action(MetaAction::Faster, &network)
            .unwrap();
        assert_eq!(vehicle.target_speeds().unwrap().index(), 2);
        vehicle
            .apply_meta_action(MetaAction::LaneRight, &network)
            .unwrap();
        assert_eq!(vehicle.target_lane_index(), LaneIndex::new('a', 'b', 1));
        // There is no lane right of lane 1.
        vehicle
            .apply_meta_action(MetaAction::LaneRight, &network)
            .unwrap();
        assert_eq!(vehicle.target_lane_index(), LaneIndex::new('a', 'b', 1));
        vehicle
            .apply_meta_action(MetaAction::LaneLeft, &network)
            .unwrap();
        assert_eq!(vehicle.target_lane_index(), LaneIndex::new('a', 'b', 0));
    }

    #[test]
    fn step_test() {
        let network = network();
        let mut vehicle = agent(&network, 25.0);
        vehicle.control = Control {
            steering: 0.0,
            acceleration: 2.0,
        };
        vehicle.step(Time(0.5), &network).unwrap();
        assert!((vehicle.position().x - 22.5).abs() < 1e-9);
        assert_eq!(vehicle.speed(), Speed(26.0));
        assert_eq!(vehicle.history().unwrap().len(), 1);
    }

    #[test]
    fn crashed_vehicle_brakes_test() {
        let network = network();
        let mut vehicle = agent(&network, 20.0);
        vehicle.set_crashed(true);
        vehicle.control = Control {
            steering: 0.3,
            acceleration: 3.0,
        };
        vehicle.step(Time(0.5), &network).unwrap();
        assert_eq!(vehicle.speed(), Speed(10.0));
        assert_eq!(vehicle.heading(), 0.0);
    }
}
