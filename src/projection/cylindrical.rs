//! Plate carrée and linear pass-through projections: degree-scaled offsets
//! with no spherical rotation.
//!
//! The ±360° longitude wrap of CAR is keyed to the image's pixel-space
//! extent and therefore lives with the calibration model, not here; this
//! module always returns the principal offset.

use crate::coord::{lon_diff, SkyPos, StandardPos};
use crate::skypix_errors::TransformError;

use super::RefTrig;

pub(crate) fn project_car(rt: &RefTrig, sky: SkyPos) -> Result<StandardPos, TransformError> {
    Ok(StandardPos::new(
        lon_diff(sky.lon, rt.lon0),
        sky.lat - rt.lat0,
    ))
}

pub(crate) fn deproject_car(rt: &RefTrig, std: StandardPos) -> Result<SkyPos, TransformError> {
    let lat = rt.lat0 + std.y;
    if !(-90.0..=90.0).contains(&lat) {
        return Err(TransformError::NoCoordinate);
    }
    Ok(SkyPos::new(rt.lon0 + std.x, lat))
}

pub(crate) fn project_sol(rt: &RefTrig, sky: SkyPos) -> Result<StandardPos, TransformError> {
    Ok(StandardPos::new(
        lon_diff(sky.lon, rt.lon0),
        sky.lat - rt.lat0,
    ))
}

pub(crate) fn deproject_sol(rt: &RefTrig, std: StandardPos) -> Result<SkyPos, TransformError> {
    // No normalization: the linear system may carry non-angular values.
    Ok(SkyPos {
        lon: rt.lon0 + std.x,
        lat: rt.lat0 + std.y,
    })
}

#[cfg(test)]
mod cylindrical_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_car_is_degree_offsets() {
        let rt = RefTrig::new(SkyPos::new(100.0, -30.0));
        let std = project_car(&rt, SkyPos::new(103.5, -28.0)).unwrap();
        assert_relative_eq!(std.x, 3.5, epsilon = 1e-12);
        assert_relative_eq!(std.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_car_principal_wrap() {
        let rt = RefTrig::new(SkyPos::new(1.0, 0.0));
        let std = project_car(&rt, SkyPos::new(359.0, 0.0)).unwrap();
        assert_relative_eq!(std.x, -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_car_latitude_domain() {
        let rt = RefTrig::new(SkyPos::new(0.0, 80.0));
        assert_eq!(
            deproject_car(&rt, StandardPos::new(0.0, 20.0)).unwrap_err(),
            TransformError::NoCoordinate
        );
    }

    #[test]
    fn test_sol_keeps_raw_values() {
        let rt = RefTrig::new(SkyPos::new(5.0, 0.0));
        let sky = deproject_sol(&rt, StandardPos::new(-12.0, 3.0)).unwrap();
        assert_relative_eq!(sky.lon, -7.0, epsilon = 1e-12);
        assert_relative_eq!(sky.lat, 3.0, epsilon = 1e-12);
    }
}
