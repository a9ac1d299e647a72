// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Geometry of the lanes of a [RoadNetwork](super::RoadNetwork).
use glam::DVec2;
use serde_derive::{Deserialize, Serialize};

use crate::geometry::wrap_to_pi;

/// Default width of a lane.
pub const DEFAULT_WIDTH: f64 = 4.0;

/// Length of the vehicles used to decide whether a position is still on a lane.
const VEHICLE_LENGTH: f64 = 5.0;

/// Style of a lane boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum LineType {
    /// No marking: the boundary is open.
    #[default]
    None,
    /// Striped marking: lane changes are allowed.
    Striped,
    /// Continuous marking.
    Continuous,
}

/// A straight lane, defined by its two end points and a uniform width.
#[derive(Clone, Debug)]
pub struct StraightLane {
    start: DVec2,
    width: f64,
    /// Line types of the left and right boundaries.
    line_types: [LineType; 2],
    forbidden: bool,
    length: f64,
    heading: f64,
    direction: DVec2,
    direction_lateral: DVec2,
}

impl StraightLane {
    /// Creates a new StraightLane going from `start` to `end`.
    pub fn new(start: DVec2, end: DVec2, width: f64, line_types: [LineType; 2]) -> Self {
        let delta = end - start;
        let length = delta.length();
        let direction = delta / length;
        StraightLane {
            start,
            width,
            line_types,
            forbidden: false,
            length,
            heading: delta.y.atan2(delta.x),
            direction,
            direction_lateral: direction.perp(),
        }
    }

    /// Creates a new StraightLane of default width.
    pub fn with_default_width(start: DVec2, end: DVec2, line_types: [LineType; 2]) -> Self {
        Self::new(start, end, DEFAULT_WIDTH, line_types)
    }

    /// Marks the lane as forbidden for the lane-change decisions of autonomous vehicles.
    pub fn forbidden(mut self) -> Self {
        self.forbidden = true;
        self
    }

    fn position(&self, longitudinal: f64, lateral: f64) -> DVec2 {
        self.start + longitudinal * self.direction + lateral * self.direction_lateral
    }

    fn local_coordinates(&self, position: DVec2) -> (f64, f64) {
        let delta = position - self.start;
        (delta.dot(self.direction), delta.dot(self.direction_lateral))
    }
}

/// A lane whose center line oscillates laterally around a straight line.
///
/// The lateral offset at longitudinal position `s` is `amplitude * sin(pulsation * s + phase)`.
#[derive(Clone, Debug)]
pub struct SineLane {
    straight: StraightLane,
    amplitude: f64,
    pulsation: f64,
    phase: f64,
}

impl SineLane {
    /// Creates a new SineLane around the straight line going from `start` to `end`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start: DVec2,
        end: DVec2,
        amplitude: f64,
        pulsation: f64,
        phase: f64,
        width: f64,
        line_types: [LineType; 2],
    ) -> Self {
        SineLane {
            straight: StraightLane::new(start, end, width, line_types),
            amplitude,
            pulsation,
            phase,
        }
    }

    /// Marks the lane as forbidden for the lane-change decisions of autonomous vehicles.
    pub fn forbidden(mut self) -> Self {
        self.straight.forbidden = true;
        self
    }

    fn offset(&self, longitudinal: f64) -> f64 {
        self.amplitude * (self.pulsation * longitudinal + self.phase).sin()
    }

    fn position(&self, longitudinal: f64, lateral: f64) -> DVec2 {
        self.straight
            .position(longitudinal, lateral + self.offset(longitudinal))
    }

    fn heading_at(&self, longitudinal: f64) -> f64 {
        self.straight.heading
            + (self.amplitude
                * self.pulsation
                * (self.pulsation * longitudinal + self.phase).cos())
            .atan()
    }

    fn local_coordinates(&self, position: DVec2) -> (f64, f64) {
        let (longitudinal, lateral) = self.straight.local_coordinates(position);
        (longitudinal, lateral - self.offset(longitudinal))
    }
}

/// A lane of the road network.
#[derive(Clone, Debug)]
pub enum Lane {
    /// A straight segment.
    Straight(StraightLane),
    /// A sinusoidal connector.
    Sine(SineLane),
}

impl From<StraightLane> for Lane {
    fn from(lane: StraightLane) -> Self {
        Lane::Straight(lane)
    }
}

impl From<SineLane> for Lane {
    fn from(lane: SineLane) -> Self {
        Lane::Sine(lane)
    }
}

impl Lane {
    fn straight(&self) -> &StraightLane {
        match self {
            Lane::Straight(lane) => lane,
            Lane::Sine(lane) => &lane.straight,
        }
    }

    /// Returns the world position of the point at the given local coordinates.
    pub fn position(&self, longitudinal: f64, lateral: f64) -> DVec2 {
        match self {
            Lane::Straight(lane) => lane.position(longitudinal, lateral),
            Lane::Sine(lane) => lane.position(longitudinal, lateral),
        }
    }

    /// Returns the local coordinates (longitudinal, lateral) of a world position.
    pub fn local_coordinates(&self, position: DVec2) -> (f64, f64) {
        match self {
            Lane::Straight(lane) => lane.local_coordinates(position),
            Lane::Sine(lane) => lane.local_coordinates(position),
        }
    }

    /// Returns the heading of the lane at the given longitudinal position.
    pub fn heading_at(&self, longitudinal: f64) -> f64 {
        match self {
            Lane::Straight(lane) => lane.heading,
            Lane::Sine(lane) => lane.heading_at(longitudinal),
        }
    }

    /// Returns the width of the lane at the given longitudinal position.
    pub fn width_at(&self, _longitudinal: f64) -> f64 {
        self.straight().width
    }

    /// Returns the length of the lane, measured along its reference line.
    pub fn length(&self) -> f64 {
        self.straight().length
    }

    /// Returns the line types of the left and right boundaries.
    pub fn line_types(&self) -> [LineType; 2] {
        self.straight().line_types
    }

    /// Returns `true` if autonomous vehicles must not select this lane as a lane-change target.
    pub fn is_forbidden(&self) -> bool {
        self.straight().forbidden
    }

    /// Returns `true` if the position is on the lane, with an additional lateral margin.
    pub fn on_lane(&self, position: DVec2, margin: f64) -> bool {
        let (longitudinal, lateral) = self.local_coordinates(position);
        lateral.abs() <= self.width_at(longitudinal) / 2.0 + margin
            && -VEHICLE_LENGTH <= longitudinal
            && longitudinal < self.length() + VEHICLE_LENGTH
    }

    /// Returns `true` if a vehicle at the given position can change lane to this lane.
    pub fn is_reachable_from(&self, position: DVec2) -> bool {
        let (longitudinal, lateral) = self.local_coordinates(position);
        lateral.abs() <= 2.0 * self.width_at(longitudinal)
            && 0.0 <= longitudinal
            && longitudinal < self.length() + VEHICLE_LENGTH
    }

    /// Returns `true` if the position is past the end of the lane.
    pub fn after_end(&self, position: DVec2) -> bool {
        let (longitudinal, _) = self.local_coordinates(position);
        longitudinal > self.length() - VEHICLE_LENGTH / 2.0
    }

    /// Returns the distance between a position and the lane.
    pub fn distance(&self, position: DVec2) -> f64 {
        let (s, r) = self.local_coordinates(position);
        r.abs() + (s - self.length()).max(0.0) + (-s).max(0.0)
    }

    /// Returns the distance between a position and the lane, plus the heading mismatch with
    /// respect to the lane direction.
    pub fn distance_with_heading(&self, position: DVec2, heading: f64) -> f64 {
        let (s, _) = self.local_coordinates(position);
        let angle = wrap_to_pi(heading - self.heading_at(s)).abs();
        self.distance(position) + angle
    }
}
