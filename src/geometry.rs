// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Small planar geometry helpers shared by lanes, vehicles and the reward.
use std::f64::consts::PI;

use glam::DVec2;

const EPSILON: f64 = 1e-2;

/// Linear map of `value` from the range `[x0, x1]` to the range `[y0, y1]`.
///
/// The result is not clamped: values outside of `[x0, x1]` are mapped outside of `[y0, y1]`.
pub fn lmap(value: f64, [x0, x1]: [f64; 2], [y0, y1]: [f64; 2]) -> f64 {
    y0 + (value - x0) * (y1 - y0) / (x1 - x0)
}

/// Returns `x`, or a small value with the same sign when `x` is close to zero.
pub fn not_zero(x: f64) -> f64 {
    if x.abs() > EPSILON {
        x
    } else if x >= 0.0 {
        EPSILON
    } else {
        -EPSILON
    }
}

/// Wraps an angle to `[-pi, pi)`.
pub fn wrap_to_pi(angle: f64) -> f64 {
    (angle + PI).rem_euclid(2.0 * PI) - PI
}

/// Unit vector pointing in the direction of `heading`.
pub fn direction(heading: f64) -> DVec2 {
    DVec2::new(heading.cos(), heading.sin())
}

/// Corners of a rectangle of the given length and width, centered on `center` and rotated by
/// `heading`.
pub fn rectangle_corners(center: DVec2, length: f64, width: f64, heading: f64) -> [DVec2; 4] {
    let forward = direction(heading) * (length / 2.0);
    let lateral = direction(heading).perp() * (width / 2.0);
    [
        center + forward + lateral,
        center + forward - lateral,
        center - forward - lateral,
        center - forward + lateral,
    ]
}

/// Projects a polygon on an axis and returns the `[min, max]` interval.
fn project(polygon: &[DVec2], axis: DVec2) -> (f64, f64) {
    polygon
        .iter()
        .map(|p| p.dot(axis))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
            (lo.min(x), hi.max(x))
        })
}

/// Returns `true` if the two convex polygons intersect, using the separating axis theorem.
///
/// Polygons touching on an edge are not considered as intersecting.
pub fn are_polygons_intersecting(a: &[DVec2], b: &[DVec2]) -> bool {
    for polygon in [a, b] {
        for (i, &p1) in polygon.iter().enumerate() {
            let p2 = polygon[(i + 1) % polygon.len()];
            let normal = (p2 - p1).perp();
            if normal.length_squared() == 0.0 {
                continue;
            }
            let (min_a, max_a) = project(a, normal);
            let (min_b, max_b) = project(b, normal);
            if max_a <= min_b || max_b <= min_a {
                return false;
            }
        }
    }
    true
}
