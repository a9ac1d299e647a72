// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Construction of the merge road: a two-lane highway with an access ramp merging into it.
//!
//! ```text
//!  j ───────────── k ~~~~~~~~ b ════════ c                  ramp, lane 2 on (b, c)
//!  a ──────────────────────── b ════════ c ───────────── d  highway, lanes 0 and 1
//! ```
use std::f64::consts::PI;
use std::sync::Arc;

use glam::DVec2;
use log::debug;

use crate::network::{LaneIndex, Lane, LineType, RoadNetwork, SineLane, StraightLane, DEFAULT_WIDTH};
use crate::road::Road;

/// Lengths of the road sections: before the merge, converging, merge, after the merge.
pub const ENDS: [f64; 4] = [150.0, 80.0, 80.0, 150.0];
/// Lateral amplitude of the converging section of the ramp.
pub const AMPLITUDE: f64 = 3.25;
/// Lateral position of the straight section of the ramp.
pub const RAMP_Y: f64 = 6.5 + DEFAULT_WIDTH + DEFAULT_WIDTH;

/// First lane of the ramp, where the agent vehicles are spawned.
pub const RAMP_LANE: LaneIndex = LaneIndex::new('j', 'k', 0);
/// Converging section of the ramp.
pub const CONVERGING_LANE: LaneIndex = LaneIndex::new('k', 'b', 0);
/// Merge lane, running alongside the highway until the obstacle.
pub const MERGE_LANE: LaneIndex = LaneIndex::new('b', 'c', 2);
/// Rightmost highway lane of the merge section.
pub const MERGE_HIGHWAY_LANE: LaneIndex = LaneIndex::new('b', 'c', 1);
/// Upstream highway lane, where the autonomous vehicles are spawned.
pub const HIGHWAY_LANE: LaneIndex = LaneIndex::new('a', 'b', 0);

/// Returns the road network of the merge scenario.
pub fn make_network() -> RoadNetwork {
    use LineType::{Continuous as C, None as N, Striped as S};
    let mut network = RoadNetwork::new();
    let before = ENDS[0] + ENDS[1];
    let merge_end = before + ENDS[2];
    let end = merge_end + ENDS[3];

    // Highway lanes.
    let line_types = [[C, S], [N, C]];
    let line_types_merge = [[C, S], [N, S]];
    for (i, y) in [0.0, DEFAULT_WIDTH].into_iter().enumerate() {
        network.add_lane(
            'a',
            'b',
            StraightLane::with_default_width(DVec2::new(0.0, y), DVec2::new(before, y), line_types[i]),
        );
        network.add_lane(
            'b',
            'c',
            StraightLane::with_default_width(
                DVec2::new(before, y),
                DVec2::new(merge_end, y),
                line_types_merge[i],
            ),
        );
        network.add_lane(
            'c',
            'd',
            StraightLane::with_default_width(DVec2::new(merge_end, y), DVec2::new(end, y), line_types[i]),
        );
    }

    // Merging lane.
    let ljk: Lane = StraightLane::with_default_width(
        DVec2::new(0.0, RAMP_Y),
        DVec2::new(ENDS[0], RAMP_Y),
        [C, C],
    )
    .forbidden()
    .into();
    let lkb: Lane = SineLane::new(
        ljk.position(ENDS[0], -AMPLITUDE),
        ljk.position(before, -AMPLITUDE),
        AMPLITUDE,
        2.0 * PI / (2.0 * ENDS[1]),
        PI / 2.0,
        DEFAULT_WIDTH,
        [C, C],
    )
    .forbidden()
    .into();
    let merge_start = lkb.position(ENDS[1], 0.0);
    let lbc = StraightLane::with_default_width(
        merge_start,
        merge_start + DVec2::new(ENDS[2], 0.0),
        [N, C],
    )
    .forbidden();
    network.add_lane(RAMP_LANE.from, RAMP_LANE.to, ljk);
    network.add_lane(CONVERGING_LANE.from, CONVERGING_LANE.to, lkb);
    let merge_lane = network.add_lane(MERGE_LANE.from, MERGE_LANE.to, lbc);
    debug_assert_eq!(merge_lane, MERGE_LANE);
    debug!(
        "Built merge network with {} junctions and {} edges",
        network.nb_nodes(),
        network.nb_edges()
    );
    network
}

/// Returns the position of the obstacle closing the merge lane.
pub fn obstacle_position(network: &RoadNetwork) -> anyhow::Result<DVec2> {
    Ok(network.get_lane(MERGE_LANE)?.position(ENDS[2], 0.0))
}

/// Builds the road of the merge scenario, with the obstacle at the end of the merge lane and no
/// vehicle.
pub fn make_road(record_history: bool) -> anyhow::Result<Road> {
    let network = make_network();
    let obstacle = obstacle_position(&network)?;
    let mut road = Road::new(Arc::new(network), record_history);
    road.add_obstacle(obstacle);
    Ok(road)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_layout_test() {
        let network = make_network();
        assert_eq!(network.nb_nodes(), 6);
        assert_eq!(network.nb_edges(), 5);
        assert_eq!(network.lanes('a', 'b').unwrap().len(), 2);
        assert_eq!(network.lanes('b', 'c').unwrap().len(), 3);
        assert_eq!(network.lanes('c', 'd').unwrap().len(), 2);
        assert_eq!(network.lanes('j', 'k').unwrap().len(), 1);
        assert_eq!(network.lanes('k', 'b').unwrap().len(), 1);
    }

    #[test]
    fn obstacle_test() {
        let road = make_road(false).unwrap();
        assert_eq!(road.objects().len(), 1);
        let position = road.objects()[0].position();
        assert!((position - DVec2::new(310.0, 8.0)).length() < 1e-9);
        assert!(road.vehicles().is_empty());
    }
}
