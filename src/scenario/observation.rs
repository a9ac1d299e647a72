// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Raw snapshot of the road returned to the external decision maker.
use schemars::JsonSchema;
use serde_derive::{Deserialize, Serialize};

use crate::road::Road;
use crate::units::Speed;
use crate::vehicle::{Vehicle, VehicleId};

/// State of a vehicle at the time of the observation.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct VehicleObservation {
    /// Identifier of the vehicle.
    pub id: VehicleId,
    /// `true` if the vehicle receives meta-actions.
    pub controlled: bool,
    /// World position `[x, y]` of the vehicle center.
    pub position: [f64; 2],
    /// Heading, in radians.
    pub heading: f64,
    /// Speed along the heading.
    pub speed: Speed,
    /// Lane the vehicle is on, as "(from, to, id)".
    pub lane: String,
    /// `true` if the vehicle has been involved in a collision.
    pub crashed: bool,
}

impl VehicleObservation {
    fn new(vehicle: &Vehicle) -> Self {
        VehicleObservation {
            id: vehicle.id(),
            controlled: vehicle.is_agent(),
            position: vehicle.position().to_array(),
            heading: vehicle.heading(),
            speed: vehicle.speed(),
            lane: vehicle.lane_index().to_string(),
            crashed: vehicle.crashed(),
        }
    }
}

/// Snapshot of all the vehicles on the road, controlled vehicles first.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct Observation {
    /// States of the vehicles.
    pub vehicles: Vec<VehicleObservation>,
}

impl Observation {
    /// Takes a snapshot of the road, listing the `controlled` vehicles first, in order.
    pub fn new(road: &Road, controlled: &[VehicleId]) -> Self {
        let controlled_vehicles = controlled.iter().filter_map(|&id| road.vehicle(id));
        let other_vehicles = road
            .vehicles()
            .iter()
            .filter(|v| !controlled.contains(&v.id()));
        Observation {
            vehicles: controlled_vehicles
                .chain(other_vehicles)
                .map(VehicleObservation::new)
                .collect(),
        }
    }

    /// Returns the observation of the primary vehicle.
    pub fn primary(&self) -> Option<&VehicleObservation> {
        self.vehicles.first().filter(|v| v.controlled)
    }
}
