// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Parameters of the merge scenario and of an evaluation run.
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::debug;
use schemars::JsonSchema;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

use crate::evaluation::EvaluationParameters;
use crate::scenario::reward::RewardWeights;
use crate::units::{Speed, Time};

const fn default_collision_reward() -> f64 {
    -1.0
}

const fn default_right_lane_reward() -> f64 {
    0.1
}

const fn default_high_speed_reward() -> f64 {
    0.2
}

const fn default_merging_speed_reward() -> f64 {
    -0.5
}

const fn default_lane_change_reward() -> f64 {
    -0.05
}

const fn default_controlled_vehicles() -> usize {
    1
}

const fn default_other_vehicles() -> usize {
    5
}

fn default_target_speeds() -> Vec<Speed> {
    vec![Speed(20.0), Speed(25.0), Speed(30.0)]
}

const fn default_simulation_frequency() -> u32 {
    15
}

const fn default_policy_frequency() -> u32 {
    1
}

const fn default_duration() -> u32 {
    40
}

/// Set of parameters of the merge scenario.
///
/// Every key is optional. Unknown keys are rejected.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ScenarioParameters {
    /// Weight of the collision term.
    #[serde(default = "default_collision_reward")]
    pub collision_reward: f64,
    /// Weight of the right-lane term (lane index of the primary vehicle).
    #[serde(default = "default_right_lane_reward")]
    pub right_lane_reward: f64,
    /// Weight of the high-speed term (normalized target-speed index of the primary vehicle).
    #[serde(default = "default_high_speed_reward")]
    pub high_speed_reward: f64,
    /// Weight of the altruistic penalty for slow vehicles on the merge lane.
    #[serde(default = "default_merging_speed_reward")]
    pub merging_speed_reward: f64,
    /// Weight of the lane-change term.
    #[serde(default = "default_lane_change_reward")]
    pub lane_change_reward: f64,
    /// Number of agent-controlled vehicles, spawned on the ramp.
    #[serde(default = "default_controlled_vehicles")]
    pub controlled_vehicles: usize,
    /// Number of autonomous vehicles, spawned on the highway.
    #[serde(default = "default_other_vehicles")]
    pub other_vehicles: usize,
    /// Target-speed schedule of the agent-controlled vehicles.
    #[serde(default = "default_target_speeds")]
    pub target_speeds: Vec<Speed>,
    /// Number of simulation frames per second.
    #[serde(default = "default_simulation_frequency")]
    pub simulation_frequency: u32,
    /// Number of decisions of the agents per second.
    #[serde(default = "default_policy_frequency")]
    pub policy_frequency: u32,
    /// Duration of an episode, in seconds, enforced by a
    /// [TimeLimit](crate::time_limit::TimeLimit).
    #[serde(default = "default_duration")]
    pub duration: u32,
    /// If `true`, the vehicles record their recent trajectory.
    #[serde(default)]
    pub show_trajectories: bool,
}

impl Default for ScenarioParameters {
    fn default() -> Self {
        ScenarioParameters {
            collision_reward: default_collision_reward(),
            right_lane_reward: default_right_lane_reward(),
            high_speed_reward: default_high_speed_reward(),
            merging_speed_reward: default_merging_speed_reward(),
            lane_change_reward: default_lane_change_reward(),
            controlled_vehicles: default_controlled_vehicles(),
            other_vehicles: default_other_vehicles(),
            target_speeds: default_target_speeds(),
            simulation_frequency: default_simulation_frequency(),
            policy_frequency: default_policy_frequency(),
            duration: default_duration(),
            show_trajectories: false,
        }
    }
}

impl ScenarioParameters {
    /// Checks that the parameters can be used to run the scenario.
    pub fn validate(&self) -> Result<()> {
        if self.controlled_vehicles == 0 {
            bail!("The scenario needs at least one controlled vehicle");
        }
        if let Some(speed) = self.target_speeds.iter().find(|s| !(s.0 > 0.0)) {
            bail!("The target speeds must be positive, got {speed}");
        }
        if self.simulation_frequency == 0 {
            bail!("The simulation frequency must be positive");
        }
        if self.policy_frequency == 0 {
            bail!("The policy frequency must be positive");
        }
        if self.policy_frequency > self.simulation_frequency {
            bail!(
                "The policy frequency ({}) cannot be larger than the simulation frequency ({})",
                self.policy_frequency,
                self.simulation_frequency
            );
        }
        Ok(())
    }

    /// Merges named options into the parameters.
    ///
    /// The options must be a JSON object whose keys are field names of [ScenarioParameters].
    /// On error, the parameters are left unchanged.
    pub fn configure(&mut self, options: &Value) -> Result<()> {
        let Value::Object(options) = options else {
            bail!("Scenario options must be a JSON object, got `{options}`");
        };
        let mut merged = serde_json::to_value(&*self)?;
        if let Value::Object(fields) = &mut merged {
            for (key, value) in options {
                debug!("Setting scenario option `{key}` to `{value}`");
                fields.insert(key.clone(), value.clone());
            }
        }
        let updated: ScenarioParameters =
            serde_json::from_value(merged).context("Invalid scenario options")?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Returns the weights of the reward terms.
    pub fn reward_weights(&self) -> RewardWeights {
        RewardWeights {
            collision: self.collision_reward,
            right_lane: self.right_lane_reward,
            high_speed: self.high_speed_reward,
            merging_speed: self.merging_speed_reward,
            lane_change: self.lane_change_reward,
        }
    }

    /// Returns the duration of a simulation frame.
    pub fn frame_duration(&self) -> Time {
        Time(1.0 / self.simulation_frequency as f64)
    }

    /// Returns the number of simulation frames per agent decision.
    pub fn frames_per_step(&self) -> u32 {
        self.simulation_frequency / self.policy_frequency
    }

    /// Returns the maximum number of agent decisions of an episode.
    pub fn max_episode_steps(&self) -> u64 {
        self.duration as u64 * self.policy_frequency as u64
    }
}

/// Input parameters of an evaluation run.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Parameters {
    /// Directory where the results and the log file are stored.
    pub output_directory: PathBuf,
    /// Parameters of the merge scenario.
    #[serde(default)]
    pub scenario: ScenarioParameters,
    /// Episodes to run and policy to use.
    #[serde(default)]
    pub evaluation: EvaluationParameters,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_test() {
        let parameters: ScenarioParameters = serde_json::from_str("{}").unwrap();
        assert_eq!(parameters, ScenarioParameters::default());
        assert_eq!(parameters.frames_per_step(), 15);
        assert_eq!(parameters.max_episode_steps(), 40);
        let weights = parameters.reward_weights();
        assert_eq!(weights.collision, -1.0);
        assert_eq!(weights.lane_change, -0.05);
    }

    #[test]
    fn configure_test() {
        let mut parameters = ScenarioParameters::default();
        parameters
            .configure(&json!({"collision_reward": -2.0, "other_vehicles": 3}))
            .unwrap();
        assert_eq!(parameters.collision_reward, -2.0);
        assert_eq!(parameters.other_vehicles, 3);
        // Other keys are untouched.
        assert_eq!(parameters.right_lane_reward, 0.1);
    }

    #[test]
    fn configure_error_test() {
        let mut parameters = ScenarioParameters::default();
        assert!(parameters.configure(&json!({"unknown_key": 1})).is_err());
        assert!(parameters
            .configure(&json!({"simulation_frequency": 0}))
            .is_err());
        assert!(parameters.configure(&json!([1, 2])).is_err());
        assert!(parameters
            .configure(&json!({"target_speeds": [0.0, 25.0, 30.0]}))
            .is_err());
        assert!(parameters
            .configure(&json!({"target_speeds": [20.0, -5.0]}))
            .is_err());
        assert_eq!(parameters, ScenarioParameters::default());
    }
}
