// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Description of the road network: a directed graph of junctions whose edges hold parallel
//! lanes.
pub mod lane;

use std::fmt;

use anyhow::{anyhow, Result};
use glam::DVec2;
use hashbrown::HashMap;
use log::debug;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde_derive::{Deserialize, Serialize};

pub use self::lane::{Lane, LineType, SineLane, StraightLane, DEFAULT_WIDTH};

/// Label of a junction of the road network.
pub type NodeLabel = char;

/// Identifier of a lane: the edge it belongs to, given by its source and target junctions, and
/// the position of the lane on that edge.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
pub struct LaneIndex {
    /// Source junction.
    pub from: NodeLabel,
    /// Target junction.
    pub to: NodeLabel,
    /// Index of the lane on the edge, starting at 0.
    pub id: usize,
}

impl LaneIndex {
    /// Creates a new LaneIndex.
    pub const fn new(from: NodeLabel, to: NodeLabel, id: usize) -> Self {
        LaneIndex { from, to, id }
    }

    /// Returns `true` if both lanes belong to the same edge.
    pub fn same_edge(&self, other: &LaneIndex) -> bool {
        self.from == other.from && self.to == other.to
    }
}

impl fmt::Display for LaneIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.from, self.to, self.id)
    }
}

/// A junction of the road network.
#[derive(Clone, Copy, Debug)]
pub struct RoadNode {
    label: NodeLabel,
}

impl RoadNode {
    /// Returns the label of the junction.
    pub const fn label(&self) -> NodeLabel {
        self.label
    }
}

/// An edge of the road network: the set of parallel lanes going from a junction to another.
#[derive(Clone, Debug, Default)]
pub struct RoadEdge {
    lanes: Vec<Lane>,
}

impl RoadEdge {
    /// Returns the lanes of the edge, ordered by lane index.
    pub fn lanes(&self) -> &[Lane] {
        &self.lanes
    }
}

/// Directed graph of [RoadNode]s and [RoadEdge]s.
///
/// The network is built once and is immutable afterwards.
#[derive(Clone, Debug, Default)]
pub struct RoadNetwork {
    graph: DiGraph<RoadNode, RoadEdge>,
    /// Mapping from junction label to simulation NodeIndex.
    node_map: HashMap<NodeLabel, NodeIndex>,
}

impl RoadNetwork {
    /// Creates an empty RoadNetwork.
    pub fn new() -> Self {
        Default::default()
    }

    fn node(&mut self, label: NodeLabel) -> NodeIndex {
        let graph = &mut self.graph;
        *self
            .node_map
            .entry(label)
            .or_insert_with(|| graph.add_node(RoadNode { label }))
    }

    fn edge(&self, from: NodeLabel, to: NodeLabel) -> Option<EdgeIndex> {
        let source = *self.node_map.get(&from)?;
        let target = *self.node_map.get(&to)?;
        self.graph.find_edge(source, target)
    }

    /// Appends a lane to the edge going from `from` to `to` and returns its index.
    ///
    /// The junctions and the edge are created if they do not exist yet.
    pub fn add_lane(&mut self, from: NodeLabel, to: NodeLabel, lane: impl Into<Lane>) -> LaneIndex {
        let source = self.node(from);
        let target = self.node(to);
        let edge = match self.graph.find_edge(source, target) {
            Some(edge) => edge,
            None => self.graph.add_edge(source, target, RoadEdge::default()),
        };
        let lanes = &mut self.graph[edge].lanes;
        lanes.push(lane.into());
        let index = LaneIndex::new(from, to, lanes.len() - 1);
        debug!("Added lane {index}");
        index
    }

    /// Returns the number of junctions.
    pub fn nb_nodes(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    pub fn nb_edges(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns the lanes of the edge going from `from` to `to`, if it exists.
    pub fn lanes(&self, from: NodeLabel, to: NodeLabel) -> Option<&[Lane]> {
        self.edge(from, to).map(|e| self.graph[e].lanes())
    }

    /// Returns the lane with the given index.
    ///
    /// Returns an error if the network has no such lane.
    pub fn get_lane(&self, index: LaneIndex) -> Result<&Lane> {
        self.lanes(index.from, index.to)
            .and_then(|lanes| lanes.get(index.id))
            .ok_or_else(|| anyhow!("No lane {index} in the road network"))
    }

    /// Returns an iterator over all the lanes of the network, with their index.
    pub fn iter_lanes(&self) -> impl Iterator<Item = (LaneIndex, &Lane)> {
        self.graph.edge_references().flat_map(move |edge| {
            let from = self.graph[edge.source()].label();
            let to = self.graph[edge.target()].label();
            edge.weight()
                .lanes
                .iter()
                .enumerate()
                .map(move |(id, lane)| (LaneIndex::new(from, to, id), lane))
        })
    }

    /// Returns the index of the lane closest to the given position and heading.
    ///
    /// Returns an error if the network has no lane.
    pub fn get_closest_lane_index(&self, position: DVec2, heading: f64) -> Result<LaneIndex> {
        self.iter_lanes()
            .map(|(index, lane)| (index, lane.distance_with_heading(position, heading)))
            .min_by(|(_, d1), (_, d2)| d1.total_cmp(d2))
            .map(|(index, _)| index)
            .ok_or_else(|| anyhow!("The road network has no lane"))
    }

    /// Returns the index of the lane a vehicle at `position` continues on when it reaches the end
    /// of the lane `current`.
    ///
    /// If the next edge has the same number of lanes, the vehicle stays on the same lane index.
    /// Otherwise, it continues on the lane of the next edge closest to `position`. When there are
    /// several outgoing edges, the one whose candidate lane is closest to `position` is used.
    /// If the edge is a dead end, `current` is returned.
    pub fn next_lane(&self, current: LaneIndex, position: DVec2) -> LaneIndex {
        let (Some(edge), Some(&node)) = (
            self.edge(current.from, current.to),
            self.node_map.get(&current.to),
        ) else {
            return current;
        };
        let nb_current_lanes = self.graph[edge].lanes.len();
        self.graph
            .edges_directed(node, Direction::Outgoing)
            .filter_map(|next_edge| {
                let lanes = &next_edge.weight().lanes;
                let to = self.graph[next_edge.target()].label();
                let (id, lane) = if lanes.len() == nb_current_lanes {
                    (current.id, lanes.get(current.id)?)
                } else {
                    lanes.iter().enumerate().min_by(|(_, l1), (_, l2)| {
                        l1.distance(position).total_cmp(&l2.distance(position))
                    })?
                };
                Some((LaneIndex::new(current.to, to, id), lane.distance(position)))
            })
            .min_by(|(_, d1), (_, d2)| d1.total_cmp(d2))
            .map(|(index, _)| index)
            .unwrap_or(current)
    }

    /// Returns the indices of the lanes adjacent to the given lane on the same edge.
    pub fn side_lanes(&self, index: LaneIndex) -> Vec<LaneIndex> {
        let nb_lanes = self.lanes(index.from, index.to).map_or(0, |l| l.len());
        let mut side_lanes = Vec::with_capacity(2);
        if index.id > 0 && index.id < nb_lanes {
            side_lanes.push(LaneIndex::new(index.from, index.to, index.id - 1));
        }
        if index.id + 1 < nb_lanes {
            side_lanes.push(LaneIndex::new(index.from, index.to, index.id + 1));
        }
        side_lanes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_lane_network() -> RoadNetwork {
        let mut network = RoadNetwork::new();
        for (i, y) in [0.0, DEFAULT_WIDTH].into_iter().enumerate() {
            let index = network.add_lane(
                'a',
                'b',
                StraightLane::with_default_width(
                    DVec2::new(0.0, y),
                    DVec2::new(100.0, y),
                    [LineType::Continuous, LineType::Striped],
                ),
            );
            assert_eq!(index, LaneIndex::new('a', 'b', i));
        }
        network.add_lane(
            'b',
            'c',
            StraightLane::with_default_width(
                DVec2::new(100.0, 0.0),
                DVec2::new(200.0, 0.0),
                [LineType::Continuous, LineType::Continuous],
            ),
        );
        network
    }

    #[test]
    fn add_lane_test() {
        let network = two_lane_network();
        assert_eq!(network.nb_nodes(), 3);
        assert_eq!(network.nb_edges(), 2);
        assert_eq!(network.lanes('a', 'b').unwrap().len(), 2);
        assert!(network.get_lane(LaneIndex::new('a', 'b', 1)).is_ok());
        assert!(network.get_lane(LaneIndex::new('a', 'b', 2)).is_err());
        assert!(network.get_lane(LaneIndex::new('b', 'a', 0)).is_err());
        assert_eq!(network.iter_lanes().count(), 3);
    }

    #[test]
    fn closest_lane_test() {
        let network = two_lane_network();
        assert_eq!(
            network
                .get_closest_lane_index(DVec2::new(50.0, 3.5), 0.0)
                .unwrap(),
            LaneIndex::new('a', 'b', 1)
        );
        assert_eq!(
            network
                .get_closest_lane_index(DVec2::new(150.0, 0.5), 0.0)
                .unwrap(),
            LaneIndex::new('b', 'c', 0)
        );
        assert!(RoadNetwork::new()
            .get_closest_lane_index(DVec2::ZERO, 0.0)
            .is_err());
    }

    #[test]
    fn next_lane_test() {
        let network = two_lane_network();
        // The next edge has fewer lanes: continue on the closest one.
        assert_eq!(
            network.next_lane(LaneIndex::new('a', 'b', 1), DVec2::new(100.0, 4.0)),
            LaneIndex::new('b', 'c', 0)
        );
        // Dead end.
        let last = LaneIndex::new('b', 'c', 0);
        assert_eq!(network.next_lane(last, DVec2::new(200.0, 0.0)), last);
    }

    #[test]
    fn side_lanes_test() {
        let network = two_lane_network();
        assert_eq!(
            network.side_lanes(LaneIndex::new('a', 'b', 0)),
            vec![LaneIndex::new('a', 'b', 1)]
        );
        assert_eq!(
            network.side_lanes(LaneIndex::new('a', 'b', 1)),
            vec![LaneIndex::new('a', 'b', 0)]
        );
        assert!(network.side_lanes(LaneIndex::new('b', 'c', 0)).is_empty());
    }
}
