//! Converting user-entered heights and distances into surface units.

use log::warn;

use crate::units::{convert_distance, DistanceUnit};

/// Convert a vertical offset into the surface's Z units.
///
/// With no known surface unit the offset is returned unchanged.
/// Otherwise it is converted into the surface's linear unit and divided
/// by the Z-factor. A Z-factor that is not a positive finite number is
/// treated as 1.0.
pub fn offset_to_surface_z_units(
    offset: f64,
    offset_unit: DistanceUnit,
    z_factor: f64,
    surface_unit: Option<DistanceUnit>,
) -> f64 {
    let Some(surface_unit) = surface_unit else {
        return offset;
    };
    let z_factor = if z_factor.is_finite() && z_factor > 0.0 {
        z_factor
    } else {
        warn!("offset: ignoring invalid z-factor {z_factor}, using 1.0");
        1.0
    };
    convert_distance(offset_unit, surface_unit, offset) / z_factor
}

/// Convert a horizontal distance into map units; unchanged if the map
/// unit is unknown.
pub fn distance_to_map_units(value: f64, unit: DistanceUnit, map_unit: Option<DistanceUnit>) -> f64 {
    match map_unit {
        Some(map_unit) => convert_distance(unit, map_unit, value),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_surface_unit_is_identity() {
        for v in [0.0, 2.0, -7.5, 1e6] {
            assert_eq!(offset_to_surface_z_units(v, DistanceUnit::Feet, 3.0, None), v);
            assert_eq!(distance_to_map_units(v, DistanceUnit::Miles, None), v);
        }
    }

    #[test]
    fn same_unit_and_unit_z_factor_is_identity() {
        for unit in DistanceUnit::ALL {
            for v in [0.0, 2.0, -7.5, 1234.5678] {
                assert_eq!(offset_to_surface_z_units(v, unit, 1.0, Some(unit)), v);
            }
        }
    }

    #[test]
    fn converts_then_divides_by_z_factor() {
        let got = offset_to_surface_z_units(10.0, DistanceUnit::Feet, 1.0, Some(DistanceUnit::Meters));
        assert!((got - 3.048).abs() < 1e-12);
        let got = offset_to_surface_z_units(2.0, DistanceUnit::Meters, 2.0, Some(DistanceUnit::Meters));
        assert_eq!(got, 1.0);
        let got = offset_to_surface_z_units(1.0, DistanceUnit::Kilometers, 0.3048, Some(DistanceUnit::Feet));
        assert!((got - 1000.0 / 0.3048 / 0.3048).abs() < 1e-6);
    }

    #[test]
    fn bad_z_factor_falls_back_to_one() {
        for z in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let got = offset_to_surface_z_units(5.0, DistanceUnit::Meters, z, Some(DistanceUnit::Meters));
            assert_eq!(got, 5.0);
        }
    }

    #[test]
    fn map_distance_conversion() {
        let got = distance_to_map_units(1.0, DistanceUnit::Kilometers, Some(DistanceUnit::Meters));
        assert_eq!(got, 1000.0);
        let got = distance_to_map_units(1.0, DistanceUnit::NauticalMile, Some(DistanceUnit::Feet));
        assert!((got - 6076.1154855643).abs() < 1e-6);
    }
}
