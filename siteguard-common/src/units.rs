//! Distance unit conversions
//!
//! Threshold tables are expressed in miles; regulatory bands are often quoted
//! in feet (500 ft) or fractions of a mile.

/// Mean Earth radius used by the haversine formula
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Meters per degree of latitude in the local planar approximation
pub const METERS_PER_DEGREE: f64 = 111_320.0;

pub const FEET_PER_MILE: f64 = 5280.0;
pub const METERS_PER_MILE: f64 = 1609.344;

pub fn feet_to_miles(feet: f64) -> f64 {
    feet / FEET_PER_MILE
}

pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_five_hundred_feet_in_miles() {
        let miles = feet_to_miles(500.0);
        assert!((miles - 0.0947).abs() < 1e-4);
    }

    #[test]
    fn test_one_mile_of_feet() {
        assert!((feet_to_miles(FEET_PER_MILE) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_meters_to_miles() {
        assert!((meters_to_miles(METERS_PER_MILE) - 1.0).abs() < 1e-12);
    }
}
