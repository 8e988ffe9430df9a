//! Linear and angular unit conversion.
//!
//! Each unit carries one authoritative constant in a canonical base
//! (meters per unit, units per full turn) and every conversion pivots
//! through that base, so `a -> b -> a` round-trips to within a few ulps.

use serde::{Deserialize, Serialize};

// -- Distance ------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnit {
    #[default]
    Meters,
    Kilometers,
    Feet,
    SurveyFoot,
    NauticalMile,
    Yards,
    Miles,
}

impl DistanceUnit {
    pub const ALL: [DistanceUnit; 7] = [
        DistanceUnit::Meters,
        DistanceUnit::Kilometers,
        DistanceUnit::Feet,
        DistanceUnit::SurveyFoot,
        DistanceUnit::NauticalMile,
        DistanceUnit::Yards,
        DistanceUnit::Miles,
    ];

    /// Length of one unit in meters.
    pub fn meters_per_unit(self) -> f64 {
        match self {
            DistanceUnit::Meters => 1.0,
            DistanceUnit::Kilometers => 1000.0,
            DistanceUnit::Feet => 0.3048,
            DistanceUnit::SurveyFoot => 1200.0 / 3937.0,
            DistanceUnit::NauticalMile => 1852.0,
            DistanceUnit::Yards => 0.9144,
            DistanceUnit::Miles => 1609.344,
        }
    }

    /// Map a host linear-unit factory code to a unit.
    ///
    /// Only the codes the visibility tools understood are recognised;
    /// callers fall back to meters for anything else.
    pub fn from_factory_code(code: i32) -> Option<Self> {
        match code {
            9001 => Some(DistanceUnit::Meters),
            9002 => Some(DistanceUnit::Feet),
            9003 => Some(DistanceUnit::SurveyFoot),
            9030 => Some(DistanceUnit::NauticalMile),
            9036 => Some(DistanceUnit::Kilometers),
            _ => None,
        }
    }
}

/// Convert `value` expressed in `from` into `to`.
pub fn convert_distance(from: DistanceUnit, to: DistanceUnit, value: f64) -> f64 {
    if from == to {
        return value;
    }
    value * from.meters_per_unit() / to.meters_per_unit()
}

// -- Angles --------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AngularUnit {
    #[default]
    Degrees,
    Grads,
    Mils,
}

impl AngularUnit {
    pub const ALL: [AngularUnit; 3] = [AngularUnit::Degrees, AngularUnit::Grads, AngularUnit::Mils];

    pub fn units_per_turn(self) -> f64 {
        match self {
            AngularUnit::Degrees => 360.0,
            AngularUnit::Grads => 400.0,
            AngularUnit::Mils => 6400.0,
        }
    }

    pub fn from_factory_code(code: i32) -> Option<Self> {
        match code {
            9102 => Some(AngularUnit::Degrees),
            9105 => Some(AngularUnit::Grads),
            9114 => Some(AngularUnit::Mils),
            _ => None,
        }
    }
}

/// Convert an angle between units. No rounding is applied here.
pub fn convert_angle(from: AngularUnit, to: AngularUnit, value: f64) -> f64 {
    if from == to {
        return value;
    }
    value * to.units_per_turn() / from.units_per_turn()
}
