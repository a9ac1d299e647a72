// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Step-count limiter wrapping a [MergeEnv].
use anyhow::Result;
use log::debug;

use crate::scenario::{MergeEnv, Observation, StepInfo, StepResult};
use crate::vehicle::MetaAction;

/// Wrapper truncating the episodes of a [MergeEnv] after a maximum number of steps.
#[derive(Clone, Debug)]
pub struct TimeLimit {
    env: MergeEnv,
    /// Fixed step limit. If `None`, the limit follows the `duration` parameter of the scenario.
    max_episode_steps: Option<u64>,
    elapsed_steps: u64,
}

impl TimeLimit {
    /// Wraps `env`, truncating the episodes after `max_episode_steps` steps.
    pub fn new(env: MergeEnv, max_episode_steps: u64) -> Self {
        TimeLimit {
            env,
            max_episode_steps: Some(max_episode_steps),
            elapsed_steps: 0,
        }
    }

    /// Wraps `env`, truncating the episodes after the duration given in its parameters.
    ///
    /// The limit is read from the parameters at each step, so it follows later calls to
    /// [MergeEnv::configure].
    pub fn from_duration(env: MergeEnv) -> Self {
        TimeLimit {
            env,
            max_episode_steps: None,
            elapsed_steps: 0,
        }
    }

    /// Returns the wrapped scenario.
    pub fn env(&self) -> &MergeEnv {
        &self.env
    }

    /// Returns a mutable reference to the wrapped scenario.
    pub fn env_mut(&mut self) -> &mut MergeEnv {
        &mut self.env
    }

    /// Returns the maximum number of steps of an episode.
    pub fn max_episode_steps(&self) -> u64 {
        self.max_episode_steps
            .unwrap_or_else(|| self.env.parameters().max_episode_steps())
    }

    /// Returns the number of steps since the last reset.
    pub const fn elapsed_steps(&self) -> u64 {
        self.elapsed_steps
    }

    /// Resets the wrapped scenario and the step counter.
    pub fn reset(&mut self, seed: Option<u64>) -> Result<(Observation, StepInfo)> {
        self.elapsed_steps = 0;
        self.env.reset(seed)
    }

    /// Steps the wrapped scenario, flagging the result as truncated once the step limit is
    /// reached.
    pub fn step(&mut self, action: MetaAction) -> Result<StepResult> {
        let mut result = self.env.step(action)?;
        self.elapsed_steps += 1;
        if self.elapsed_steps >= self.max_episode_steps() {
            if !result.terminated {
                debug!("Episode truncated after {} steps", self.elapsed_steps);
            }
            result.truncated = true;
        }
        Ok(result)
    }
}
