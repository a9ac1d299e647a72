// Copyright 2022 Lucas Javaudin
//
// Licensed under the Creative Commons Attribution-NonCommercial-NoDerivatives 4.0 International
// https://creativecommons.org/licenses/by-nc-nd/4.0/legalcode

//! Definition of types representing values expressed in a given unit.
//!
//! The types assumed the following units:
//!
//! - [Time]: in seconds
//! - [Speed]: in meter per second
use std::fmt;
use std::ops::*;

use num_traits::Zero;
use schemars::JsonSchema;
use serde_derive::{Deserialize, Serialize};

/// Implements arithmetic operators and some useful traits on unit types.
macro_rules! impl_traits_on_unit(
    ( $( $t:ident ),* ) => {
        $(
            impl Add for $t {
                type Output = Self;
                fn add(self, rhs: Self) -> Self::Output {
                    Self(self.0 + rhs.0)
                }
            }

            impl AddAssign for $t {
                fn add_assign(&mut self, rhs: Self) {
                    self.0 += rhs.0;
                }
            }

            impl Sub for $t {
                type Output = Self;
                fn sub(self, rhs: Self) -> Self::Output {
                    Self(self.0 - rhs.0)
                }
            }

            impl Mul<f64> for $t {
                type Output = Self;
                fn mul(self, rhs: f64) -> Self::Output {
                    Self(self.0 * rhs)
                }
            }

            impl Zero for $t {
                fn zero() -> Self {
                    Self(0.0)
                }
                fn is_zero(&self) -> bool {
                    self.0 == 0.0
                }
            }
        )*
    };
);

/// Representation of time duration or timestamp, expressed in seconds.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(
    Default, Clone, Copy, Debug, PartialEq, PartialOrd, Deserialize, Serialize, JsonSchema,
)]
#[serde(transparent)]
pub struct Time(pub f64);

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} s", self.0)
    }
}

/// Representation of a speed, expressed in meters per second.
#[allow(clippy::derive_partial_eq_without_eq)]
#[derive(
    Default, Clone, Copy, Debug, PartialEq, PartialOrd, Deserialize, Serialize, JsonSchema,
)]
#[serde(transparent)]
pub struct Speed(pub f64);

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} m/s", self.0)
    }
}

impl_traits_on_unit!(Time, Speed);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_test() {
        let mut speed = Speed(25.0);
        speed += Speed(5.0) * -1.0;
        assert_eq!(speed, Speed(20.0));
        assert_eq!(Speed(30.0) - speed, Speed(10.0));
        let mut time = Time::zero();
        time += Time(0.5) + Time(0.25);
        assert_eq!(time, Time(0.75));
        assert!(Time::zero().is_zero());
    }

    #[test]
    fn display_test() {
        assert_eq!(format!("{}", Speed(25.0)), "25.00 m/s");
        assert_eq!(format!("{}", Time(0.5)), "0.50 s");
    }
}
