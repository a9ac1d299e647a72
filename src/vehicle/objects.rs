// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Static objects of the road.
use glam::DVec2;
use num_traits::Zero;

use super::{EntityId, EntityView, RoadObject};
use crate::units::Speed;

/// Side length of an [Obstacle].
pub const OBSTACLE_SIZE: f64 = 2.0;

/// A static square obstacle.
#[derive(Clone, Debug)]
pub struct Obstacle {
    id: usize,
    position: DVec2,
    heading: f64,
    crashed: bool,
}

impl Obstacle {
    pub(crate) fn new(id: usize, position: DVec2) -> Self {
        Obstacle {
            id,
            position,
            heading: 0.0,
            crashed: false,
        }
    }

    /// Returns the position of the obstacle center.
    pub const fn position(&self) -> DVec2 {
        self.position
    }

    /// Returns `true` if a vehicle collided with the obstacle.
    pub const fn crashed(&self) -> bool {
        self.crashed
    }

    pub(crate) fn set_crashed(&mut self) {
        self.crashed = true;
    }
}

impl RoadObject for Obstacle {
    fn view(&self) -> EntityView {
        EntityView {
            entity: EntityId::Object(self.id),
            position: self.position,
            heading: self.heading,
            speed: Speed::zero(),
            lane_index: None,
            target_lane_index: None,
            target_speed: None,
        }
    }

    fn length(&self) -> f64 {
        OBSTACLE_SIZE
    }

    fn width(&self) -> f64 {
        OBSTACLE_SIZE
    }
}
