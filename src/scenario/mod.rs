// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! The highway merge scenario, exposed through a `reset` / `step` / `configure` interface.
//!
//! The ego-vehicle drives on the access ramp and must merge into a two-lane highway before the
//! merge lane ends. It is rewarded for driving fast, for staying on lanes to the right and for
//! avoiding collisions. An altruistic penalty is added when the controlled vehicles on the merge
//! lane drive below their target speed.
pub mod observation;
pub mod population;
pub mod reward;
pub mod road_builder;

use anyhow::{anyhow, bail, Result};
use log::{debug, info};
use num_traits::Zero;
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use serde_derive::{Deserialize, Serialize};
use serde_json::Value;

pub use self::observation::{Observation, VehicleObservation};
pub use self::reward::{RewardTerms, RewardWeights};
use crate::parameters::ScenarioParameters;
use crate::road::Road;
use crate::units::{Speed, Time};
use crate::vehicle::{MetaAction, Vehicle, VehicleId};

/// Longitudinal position past which the episode is over.
pub const TERMINAL_X: f64 = 370.0;

/// Auxiliary information returned alongside the observation.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct StepInfo {
    /// Speed of the primary vehicle.
    pub speed: Speed,
    /// `true` if the primary vehicle is crashed.
    pub crashed: bool,
    /// Meta-action applied at this step (`None` after a reset).
    pub action: Option<MetaAction>,
    /// Raw values of the reward terms (`None` after a reset).
    pub rewards: Option<RewardTerms>,
}

/// Outcome of a call to [MergeEnv::step].
#[derive(Clone, Debug)]
pub struct StepResult {
    /// State of the road after the step.
    pub observation: Observation,
    /// Normalized reward of the step.
    pub reward: f64,
    /// `true` if the episode is over.
    pub terminated: bool,
    /// `true` if the episode was cut short by a time limit.
    pub truncated: bool,
    /// Auxiliary information.
    pub info: StepInfo,
}

/// The merge scenario.
///
/// The road is rebuilt and populated at every [MergeEnv::reset]. A call to [MergeEnv::step]
/// applies a meta-action to the primary vehicle (the first controlled vehicle), advances the
/// simulation by one policy period and evaluates the new state.
#[derive(Clone, Debug)]
pub struct MergeEnv {
    parameters: ScenarioParameters,
    rng: XorShiftRng,
    road: Option<Road>,
    controlled_vehicles: Vec<VehicleId>,
    time: Time,
    steps: u64,
}

impl MergeEnv {
    /// Creates a new MergeEnv.
    ///
    /// The scenario must be [reset](MergeEnv::reset) before it can be stepped.
    pub fn new(parameters: ScenarioParameters) -> Result<Self> {
        parameters.validate()?;
        Ok(MergeEnv {
            parameters,
            rng: XorShiftRng::from_entropy(),
            road: None,
            controlled_vehicles: Vec::new(),
            time: Time::zero(),
            steps: 0,
        })
    }

    /// Returns the parameters of the scenario.
    pub fn parameters(&self) -> &ScenarioParameters {
        &self.parameters
    }

    /// Merges named options into the parameters of the scenario.
    ///
    /// The reward weights and the frequencies apply from the next call to
    /// [step](MergeEnv::step) or [reward](MergeEnv::reward). The vehicle counts, the target-speed
    /// schedule and `show_trajectories` apply from the next [reset](MergeEnv::reset).
    pub fn configure(&mut self, options: &Value) -> Result<()> {
        self.parameters.configure(options)
    }

    /// Returns the road, if the scenario has been reset.
    pub fn road(&self) -> Option<&Road> {
        self.road.as_ref()
    }

    /// Returns a mutable reference to the road, if the scenario has been reset.
    pub fn road_mut(&mut self) -> Option<&mut Road> {
        self.road.as_mut()
    }

    /// Returns the ids of the controlled vehicles. The first one is the primary vehicle.
    pub fn controlled_vehicles(&self) -> &[VehicleId] {
        &self.controlled_vehicles
    }

    /// Returns the time elapsed since the last reset.
    pub const fn time(&self) -> Time {
        self.time
    }

    /// Returns the number of steps since the last reset.
    pub const fn steps(&self) -> u64 {
        self.steps
    }

    /// Returns the primary vehicle, if the scenario has been reset.
    pub fn vehicle(&self) -> Option<&Vehicle> {
        let road = self.road.as_ref()?;
        road.vehicle(*self.controlled_vehicles.first()?)
    }

    fn state(&self) -> Result<(&Road, &Vehicle)> {
        let road = self
            .road
            .as_ref()
            .ok_or_else(|| anyhow!("The scenario must be reset before being used"))?;
        let vehicle = self
            .vehicle()
            .ok_or_else(|| anyhow!("The scenario has no primary vehicle"))?;
        Ok((road, vehicle))
    }

    /// Rebuilds the road, populates it and returns the initial observation.
    ///
    /// If a seed is given, the random number generator is reseeded first, so that two resets with
    /// the same seed produce the same initial state. On error, the scenario is left without a
    /// road and must be reset again before it can be stepped.
    pub fn reset(&mut self, seed: Option<u64>) -> Result<(Observation, StepInfo)> {
        // The previous episode is dropped first: a failed reset leaves no road to step.
        self.road = None;
        self.controlled_vehicles.clear();
        if let Some(seed) = seed {
            self.rng = XorShiftRng::seed_from_u64(seed);
        }
        let mut road = road_builder::make_road(self.parameters.show_trajectories)?;
        let controlled_vehicles = population::populate(&mut road, &self.parameters, &mut self.rng)?;
        self.time = Time::zero();
        self.steps = 0;
        self.road = Some(road);
        self.controlled_vehicles = controlled_vehicles;
        info!(
            "Reset merge scenario (seed: {seed:?}, {} controlled vehicles, {} other vehicles)",
            self.parameters.controlled_vehicles, self.parameters.other_vehicles
        );
        Ok((self.observation()?, self.info(None, None)?))
    }

    /// Applies a meta-action to the primary vehicle and advances the simulation by one policy
    /// period.
    ///
    /// Returns an error if the scenario has not been reset.
    pub fn step(&mut self, action: MetaAction) -> Result<StepResult> {
        if self.road.is_none() {
            bail!("The scenario must be reset before being stepped");
        }
        self.time += Time(1.0 / self.parameters.policy_frequency as f64);
        self.steps += 1;
        self.simulate(Some(action))?;

        let rewards = self.rewards(Some(action))?;
        let reward = rewards.reward(&self.parameters.reward_weights());
        if !(0.0..=1.0).contains(&reward) {
            debug!("Reward outside of [0, 1] at step {}: {reward:.4}", self.steps);
        }
        let terminated = self.is_terminated()?;
        let info = self.info(Some(action), Some(rewards))?;
        debug!(
            "Step {}: action {action}, reward {reward:.4}, speed {}, terminated {terminated}",
            self.steps, info.speed
        );
        Ok(StepResult {
            observation: self.observation()?,
            reward,
            terminated,
            truncated: self.is_truncated(),
            info,
        })
    }

    /// Runs the simulation frames of one policy period.
    fn simulate(&mut self, action: Option<MetaAction>) -> Result<()> {
        let primary = *self
            .controlled_vehicles
            .first()
            .ok_or_else(|| anyhow!("The scenario has no primary vehicle"))?;
        let dt = self.parameters.frame_duration();
        let road = self
            .road
            .as_mut()
            .ok_or_else(|| anyhow!("The scenario must be reset before being stepped"))?;
        if let Some(action) = action {
            road.apply_meta_action(primary, action)?;
        }
        for _ in 0..self.parameters.frames_per_step() {
            road.act()?;
            road.step(dt)?;
        }
        Ok(())
    }

    /// Returns the raw reward terms of the current state, given the last action.
    pub fn rewards(&self, action: Option<MetaAction>) -> Result<RewardTerms> {
        let (road, vehicle) = self.state()?;
        RewardTerms::compute(road, vehicle, action)
    }

    /// Returns the normalized reward of the current state, given the last action.
    pub fn reward(&self, action: Option<MetaAction>) -> Result<f64> {
        Ok(self
            .rewards(action)?
            .reward(&self.parameters.reward_weights()))
    }

    /// Returns `true` if the primary vehicle is crashed or has passed the end of the merge zone.
    pub fn is_terminated(&self) -> Result<bool> {
        let (_, vehicle) = self.state()?;
        Ok(vehicle.crashed() || vehicle.position().x > TERMINAL_X)
    }

    /// The scenario itself never truncates an episode, see
    /// [TimeLimit](crate::time_limit::TimeLimit).
    pub const fn is_truncated(&self) -> bool {
        false
    }

    /// Returns a snapshot of the road.
    pub fn observation(&self) -> Result<Observation> {
        let (road, _) = self.state()?;
        Ok(Observation::new(road, &self.controlled_vehicles))
    }

    fn info(&self, action: Option<MetaAction>, rewards: Option<RewardTerms>) -> Result<StepInfo> {
        let (_, vehicle) = self.state()?;
        Ok(StepInfo {
            speed: vehicle.speed(),
            crashed: vehicle.crashed(),
            action,
            rewards,
        })
    }
}
