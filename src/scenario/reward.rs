// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Reward of the merge scenario.
//!
//! The reward is a weighted sum of five terms, linearly remapped so that the worst collision and
//! merging outcome maps to 0 and the best speed and lane outcome maps to 1. The remap is not
//! clamped: a lane change, several slow vehicles on the merge lane or a lane index larger than 1
//! can lead to a reward outside of `[0, 1]`.
use anyhow::{anyhow, Result};
use schemars::JsonSchema;
use serde_derive::{Deserialize, Serialize};

use super::road_builder::MERGE_LANE;
use crate::geometry::{lmap, not_zero};
use crate::road::Road;
use crate::vehicle::{MetaAction, Vehicle};

/// Weights of the reward terms.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct RewardWeights {
    /// Weight of [RewardTerms::collision].
    pub collision: f64,
    /// Weight of [RewardTerms::right_lane].
    pub right_lane: f64,
    /// Weight of [RewardTerms::high_speed].
    pub high_speed: f64,
    /// Weight of [RewardTerms::merging_speed].
    pub merging_speed: f64,
    /// Weight of [RewardTerms::lane_change].
    pub lane_change: f64,
}

/// Raw (unweighted) values of the reward terms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct RewardTerms {
    /// 1 if the primary vehicle is crashed, 0 otherwise.
    pub collision: f64,
    /// Lane index of the primary vehicle.
    pub right_lane: f64,
    /// Target-speed index of the primary vehicle, normalized to `[0, 1]`.
    pub high_speed: f64,
    /// 1 if the action is a lane change, 0 otherwise.
    pub lane_change: f64,
    /// Sum of the relative speed deficits of the controlled vehicles on the merge lane.
    pub merging_speed: f64,
}

impl RewardTerms {
    /// Computes the reward terms of the primary vehicle `vehicle` after `action`.
    ///
    /// Returns an error if the primary vehicle has no target-speed schedule, or a schedule with
    /// fewer than two entries.
    pub fn compute(road: &Road, vehicle: &Vehicle, action: Option<MetaAction>) -> Result<Self> {
        let schedule = vehicle
            .target_speeds()
            .ok_or_else(|| anyhow!("The primary vehicle {} is not an agent", vehicle.id()))?;
        let merging_speed = road
            .vehicles()
            .iter()
            .filter(|v| v.is_agent() && v.lane_index() == MERGE_LANE)
            .map(|v| (v.target_speed() - v.speed()).0 / not_zero(v.target_speed().0))
            .sum();
        Ok(RewardTerms {
            collision: f64::from(u8::from(vehicle.crashed())),
            right_lane: vehicle.lane_index().id as f64,
            high_speed: schedule.normalized_index()?,
            lane_change: f64::from(u8::from(action.is_some_and(MetaAction::is_lane_change))),
            merging_speed,
        })
    }

    /// Returns the weighted sum of the terms.
    pub fn weighted_sum(&self, weights: &RewardWeights) -> f64 {
        weights.collision * self.collision
            + weights.right_lane * self.right_lane
            + weights.high_speed * self.high_speed
            + weights.lane_change * self.lane_change
            + weights.merging_speed * self.merging_speed
    }

    /// Returns the normalized reward.
    pub fn reward(&self, weights: &RewardWeights) -> f64 {
        normalize(self.weighted_sum(weights), weights)
    }
}

/// Maps a weighted sum from `[collision + merging_speed, high_speed + right_lane]` to `[0, 1]`.
pub fn normalize(value: f64, weights: &RewardWeights) -> f64 {
    lmap(
        value,
        [
            weights.collision + weights.merging_speed,
            weights.high_speed + weights.right_lane,
        ],
        [0.0, 1.0],
    )
}
