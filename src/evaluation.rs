// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Evaluation of a policy over a set of test episodes.
use anyhow::Result;
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_xorshift::XorShiftRng;
use schemars::JsonSchema;
use serde_derive::{Deserialize, Serialize};

use crate::parameters::ScenarioParameters;
use crate::scenario::{MergeEnv, Observation};
use crate::time_limit::TimeLimit;
use crate::vehicle::MetaAction;

/// Interface of the decision makers driving the primary vehicle.
pub trait Policy {
    /// Returns the meta-action to apply given the current observation.
    fn act(&mut self, observation: &Observation) -> MetaAction;

    /// Prepares the policy for a new episode.
    fn reset_episode(&mut self, _seed: u64) {}
}

/// Policy that always keeps the current targets.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdlePolicy;

impl Policy for IdlePolicy {
    fn act(&mut self, _observation: &Observation) -> MetaAction {
        MetaAction::Idle
    }
}

/// Policy picking a meta-action uniformly at random.
#[derive(Clone, Debug)]
pub struct RandomPolicy {
    rng: XorShiftRng,
}

impl RandomPolicy {
    /// Creates a new RandomPolicy.
    pub fn new(seed: u64) -> Self {
        RandomPolicy {
            rng: XorShiftRng::seed_from_u64(seed),
        }
    }
}

impl Policy for RandomPolicy {
    fn act(&mut self, _observation: &Observation) -> MetaAction {
        MetaAction::ALL[self.rng.gen_range(0..MetaAction::ALL.len())]
    }

    fn reset_episode(&mut self, seed: u64) {
        self.rng = XorShiftRng::seed_from_u64(seed);
    }
}

/// Policies available from the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum PolicyType {
    /// See [IdlePolicy].
    #[default]
    Idle,
    /// See [RandomPolicy].
    Random,
}

impl PolicyType {
    /// Creates the policy.
    pub fn build(self) -> Box<dyn Policy> {
        match self {
            PolicyType::Idle => Box::new(IdlePolicy),
            PolicyType::Random => Box::new(RandomPolicy::new(0)),
        }
    }
}

const fn default_nb_episodes() -> usize {
    10
}

/// Parameters of an evaluation run.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct EvaluationParameters {
    /// Policy driving the primary vehicle.
    #[serde(default)]
    pub policy: PolicyType,
    /// Number of episodes, when `seeds` is not given.
    #[serde(default = "default_nb_episodes")]
    pub nb_episodes: usize,
    /// Seeds of the test episodes.
    #[serde(default)]
    pub seeds: Option<Vec<u64>>,
    /// Seed used to draw the episode seeds, when `seeds` is not given.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for EvaluationParameters {
    fn default() -> Self {
        EvaluationParameters {
            policy: PolicyType::default(),
            nb_episodes: default_nb_episodes(),
            seeds: None,
            random_seed: None,
        }
    }
}

impl EvaluationParameters {
    /// Returns the seeds of the test episodes.
    pub fn episode_seeds(&self) -> Vec<u64> {
        if let Some(seeds) = &self.seeds {
            return seeds.clone();
        }
        let mut rng = self
            .random_seed
            .map_or_else(XorShiftRng::from_entropy, XorShiftRng::seed_from_u64);
        (0..self.nb_episodes).map(|_| rng.gen()).collect()
    }
}

/// Summary of a completed episode.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct EpisodeSummary {
    /// Seed of the episode.
    pub seed: u64,
    /// Number of steps executed.
    pub steps: u64,
    /// Sum of the rewards.
    pub total_reward: f64,
    /// `true` if the primary vehicle crashed.
    pub crashed: bool,
    /// `true` if the episode ended by termination.
    pub terminated: bool,
    /// `true` if the episode ended by truncation.
    pub truncated: bool,
    /// Longitudinal position of the primary vehicle at the end of the episode.
    pub final_position_x: f64,
}

/// Results of an evaluation run.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize, JsonSchema)]
pub struct EvaluationResults {
    /// Summary of each episode, in the order of the seeds.
    pub episodes: Vec<EpisodeSummary>,
    /// Number of episodes in which the primary vehicle crashed.
    pub crash_count: usize,
    /// Share of episodes in which the primary vehicle crashed.
    pub collision_rate: f64,
}

/// Runs one episode of `env` with `policy`, until termination or truncation.
pub fn run_episode(env: &mut TimeLimit, policy: &mut dyn Policy, seed: u64) -> Result<EpisodeSummary> {
    policy.reset_episode(seed);
    let (mut observation, _) = env.reset(Some(seed))?;
    let mut total_reward = 0.0;
    loop {
        let action = policy.act(&observation);
        let result = env.step(action)?;
        total_reward += result.reward;
        observation = result.observation;
        if result.terminated || result.truncated {
            let summary = EpisodeSummary {
                seed,
                steps: env.elapsed_steps(),
                total_reward,
                crashed: result.info.crashed,
                terminated: result.terminated,
                truncated: result.truncated,
                final_position_x: env.env().vehicle().map_or(f64::NAN, |v| v.position().x),
            };
            debug!("Episode summary: {summary:?}");
            return Ok(summary);
        }
    }
}

/// Runs one episode per seed and counts the crashes of the primary vehicle.
pub fn run_episodes(
    parameters: &ScenarioParameters,
    policy: &mut dyn Policy,
    seeds: &[u64],
) -> Result<EvaluationResults> {
    let mut env = TimeLimit::from_duration(MergeEnv::new(parameters.clone())?);
    let mut episodes = Vec::with_capacity(seeds.len());
    for (i, &seed) in seeds.iter().enumerate() {
        let summary = run_episode(&mut env, policy, seed)?;
        info!(
            "Episode {}/{} (seed {seed}): {} steps, total reward {:.3}, crashed: {}",
            i + 1,
            seeds.len(),
            summary.steps,
            summary.total_reward,
            summary.crashed
        );
        episodes.push(summary);
    }
    let crash_count = episodes.iter().filter(|e| e.crashed).count();
    let collision_rate = if episodes.is_empty() {
        0.0
    } else {
        crash_count as f64 / episodes.len() as f64
    };
    info!(
        "Total crashes in {} episodes: {crash_count}, collision rate is {:.1}%",
        episodes.len(),
        collision_rate * 100.0
    );
    Ok(EvaluationResults {
        episodes,
        crash_count,
        collision_rate,
    })
}
