// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Low-level controllers turning lane and speed targets into steering and acceleration commands,
//! and the discrete meta-actions of agent vehicles.
use std::f64::consts::PI;
use std::fmt;

use anyhow::{anyhow, bail, Result};
use serde_derive::{Deserialize, Serialize};

use super::{VehicleState, LENGTH};
use crate::geometry::{not_zero, wrap_to_pi};
use crate::network::{LaneIndex, RoadNetwork};
use crate::units::Speed;

/// Characteristic time of the speed controller.
pub const TAU_ACC: f64 = 0.6;
/// Characteristic time of the heading controller.
pub const TAU_HEADING: f64 = 0.2;
/// Characteristic time of the lateral position controller.
pub const TAU_LATERAL: f64 = 0.6;
/// Look-ahead time used to compute the reference heading.
pub const TAU_PURSUIT: f64 = 0.5 * TAU_HEADING;
/// Proportional gain of the speed controller.
pub const KP_A: f64 = 1.0 / TAU_ACC;
/// Proportional gain of the heading controller.
pub const KP_HEADING: f64 = 1.0 / TAU_HEADING;
/// Proportional gain of the lateral position controller.
pub const KP_LATERAL: f64 = 1.0 / TAU_LATERAL;
/// Maximum front-wheel angle.
pub const MAX_STEERING_ANGLE: f64 = PI / 3.0;
/// Target speed increment of the `Faster` and `Slower` meta-actions for vehicles without a
/// discrete schedule.
pub const DELTA_SPEED: Speed = Speed(5.0);

/// Discrete high-level commands of agent vehicles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum MetaAction {
    /// Change to the lane with lower index.
    LaneLeft,
    /// Keep the current targets.
    Idle,
    /// Change to the lane with higher index.
    LaneRight,
    /// Select the next speed of the schedule.
    Faster,
    /// Select the previous speed of the schedule.
    Slower,
}

impl MetaAction {
    /// All the meta-actions, ordered by code.
    pub const ALL: [MetaAction; 5] = [
        MetaAction::LaneLeft,
        MetaAction::Idle,
        MetaAction::LaneRight,
        MetaAction::Faster,
        MetaAction::Slower,
    ];

    /// Returns the integer code of the meta-action.
    pub const fn code(self) -> u8 {
        match self {
            MetaAction::LaneLeft => 0,
            MetaAction::Idle => 1,
            MetaAction::LaneRight => 2,
            MetaAction::Faster => 3,
            MetaAction::Slower => 4,
        }
    }

    /// Returns `true` if the meta-action requests a lane change.
    pub const fn is_lane_change(self) -> bool {
        matches!(self, MetaAction::LaneLeft | MetaAction::LaneRight)
    }
}

impl From<MetaAction> for u8 {
    fn from(action: MetaAction) -> Self {
        action.code()
    }
}

impl TryFrom<u8> for MetaAction {
    type Error = anyhow::Error;
    fn try_from(code: u8) -> Result<Self> {
        MetaAction::ALL
            .get(code as usize)
            .copied()
            .ok_or_else(|| anyhow!("Unknown meta-action code: {code}"))
    }
}

impl TryFrom<i64> for MetaAction {
    type Error = anyhow::Error;
    fn try_from(code: i64) -> Result<Self> {
        match u8::try_from(code) {
            Ok(code) => MetaAction::try_from(code),
            Err(_) => bail!("Unknown meta-action code: {code}"),
        }
    }
}

impl fmt::Display for MetaAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetaAction::LaneLeft => "LANE_LEFT",
            MetaAction::Idle => "IDLE",
            MetaAction::LaneRight => "LANE_RIGHT",
            MetaAction::Faster => "FASTER",
            MetaAction::Slower => "SLOWER",
        };
        write!(f, "{name}")
    }
}

/// Discrete schedule of target speeds of an agent vehicle, with the currently selected entry.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetSpeeds {
    speeds: Vec<Speed>,
    index: usize,
}

impl Default for TargetSpeeds {
    fn default() -> Self {
        TargetSpeeds::new(vec![Speed(20.0), Speed(25.0), Speed(30.0)])
    }
}

impl TargetSpeeds {
    /// Creates a new schedule, with the first entry selected.
    pub fn new(speeds: Vec<Speed>) -> Self {
        TargetSpeeds { speeds, index: 0 }
    }

    /// Returns the speeds of the schedule.
    pub fn speeds(&self) -> &[Speed] {
        &self.speeds
    }

    /// Returns the number of entries of the schedule.
    pub fn len(&self) -> usize {
        self.speeds.len()
    }

    /// Returns `true` if the schedule has no entry.
    pub fn is_empty(&self) -> bool {
        self.speeds.is_empty()
    }

    /// Returns the index of the selected entry.
    pub const fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    /// Clamps an index to the bounds of the schedule.
    pub(crate) fn clamp_index(&self, index: isize) -> usize {
        index.clamp(0, self.speeds.len().saturating_sub(1) as isize) as usize
    }

    /// Returns the index of the entry closest to `speed`, assuming evenly spaced speeds.
    ///
    /// Returns `None` if the schedule is empty.
    pub fn speed_to_index(&self, speed: Speed) -> Option<usize> {
        let (first, last) = (*self.speeds.first()?, *self.speeds.last()?);
        if self.speeds.len() == 1 {
            return Some(0);
        }
        let x = (speed - first).0 / (last - first).0;
        let index = (x * (self.speeds.len() - 1) as f64).round();
        Some(self.clamp_index(index as isize))
    }

    /// Returns the selected index normalized to `[0, 1]`.
    ///
    /// Returns an error if the schedule has fewer than two entries.
    pub fn normalized_index(&self) -> Result<f64> {
        if self.speeds.len() < 2 {
            bail!(
                "The target-speed schedule must have at least two entries, got {}",
                self.speeds.len()
            );
        }
        Ok(self.index as f64 / (self.speeds.len() - 1) as f64)
    }
}

/// Returns the acceleration that drives `speed` towards `target_speed`.
pub fn speed_control(speed: Speed, target_speed: Speed) -> f64 {
    KP_A * (target_speed - speed).0
}

/// Returns the steering angle that drives a vehicle towards the center line of the target lane.
///
/// The lateral offset is turned into a lateral speed command, then into a heading command
/// relative to the heading of the lane slightly ahead of the vehicle. The resulting heading rate
/// is converted to a front-wheel angle through the kinematic bicycle model.
pub fn steering_control(
    network: &RoadNetwork,
    state: &VehicleState,
    target_lane_index: LaneIndex,
) -> Result<f64> {
    let target_lane = network.get_lane(target_lane_index)?;
    let speed = not_zero(state.speed.0);
    let (longitudinal, lateral) = target_lane.local_coordinates(state.position);
    let lane_future_heading = target_lane.heading_at(longitudinal + state.speed.0 * TAU_PURSUIT);
    let lateral_speed_command = -KP_LATERAL * lateral;
    let heading_command = (lateral_speed_command / speed).clamp(-1.0, 1.0).asin();
    let heading_ref = lane_future_heading + heading_command.clamp(-PI / 4.0, PI / 4.0);
    let heading_rate_command = KP_HEADING * wrap_to_pi(heading_ref - state.heading);
    let slip_angle = (LENGTH / 2.0 / speed * heading_rate_command)
        .clamp(-1.0, 1.0)
        .asin();
    let steering = (2.0 * slip_angle.tan()).atan();
    Ok(steering.clamp(-MAX_STEERING_ANGLE, MAX_STEERING_ANGLE))
}
