//! Pseudo-cylindrical projections (Hammer-Aitoff, global sinusoidal,
//! Mollweide).
//!
//! Unlike the zenithal family, the pole of these projections is not the
//! reference point: the formulas run in a local longitude/latitude frame
//! whose origin is the reference and whose pole is the local north,
//! reached through the rotation cached in
//! [`RefTrig::local`](super::RefTrig).

use nalgebra::Vector3;

use crate::constants::{INVERSION_TOL, MAX_INVERSION_STEPS};
use crate::coord::{SkyPos, StandardPos};
use crate::frames::{unit_vector, vector_to_sky};
use crate::skypix_errors::TransformError;

use super::RefTrig;

const HALF_PI: f64 = std::f64::consts::FRAC_PI_2;
const PI: f64 = std::f64::consts::PI;

/// Local longitude/latitude of a sky position, radians, longitude in
/// `[-π, π]`.
fn to_local(rt: &RefTrig, sky: SkyPos) -> (f64, f64) {
    let v = rt.local * unit_vector(sky);
    let lat = v.z.clamp(-1.0, 1.0).asin();
    let lon = v.y.atan2(v.x);
    (lon, lat)
}

/// Sky position of a local longitude/latitude pair.
fn from_local(rt: &RefTrig, lon: f64, lat: f64) -> SkyPos {
    let (sin_b, cos_b) = lat.sin_cos();
    let (sin_l, cos_l) = lon.sin_cos();
    let v = Vector3::new(cos_b * cos_l, cos_b * sin_l, sin_b);
    vector_to_sky(rt.local.transpose() * v)
}

pub(crate) fn project_gls(rt: &RefTrig, sky: SkyPos) -> Result<StandardPos, TransformError> {
    let (lon, lat) = to_local(rt, sky);
    Ok(StandardPos::new(
        (lon * lat.cos()).to_degrees(),
        lat.to_degrees(),
    ))
}

pub(crate) fn deproject_gls(rt: &RefTrig, std: StandardPos) -> Result<SkyPos, TransformError> {
    let x = std.x.to_radians();
    let lat = std.y.to_radians();
    if lat.abs() > HALF_PI {
        return Err(TransformError::NoCoordinate);
    }
    let cos_lat = lat.cos();
    if cos_lat < 1e-12 {
        // The parallel collapses to a point at the poles.
        if x.abs() > 1e-12 {
            return Err(TransformError::NoCoordinate);
        }
        return Ok(from_local(rt, 0.0, lat));
    }
    let lon = x / cos_lat;
    if lon.abs() > PI {
        return Err(TransformError::NoCoordinate);
    }
    Ok(from_local(rt, lon, lat))
}

pub(crate) fn project_ait(rt: &RefTrig, sky: SkyPos) -> Result<StandardPos, TransformError> {
    let (lon, lat) = to_local(rt, sky);
    let (sin_b, cos_b) = lat.sin_cos();
    let half_lon = lon / 2.0;

    let denom = 1.0 + cos_b * half_lon.cos();
    if denom < 1e-10 {
        // Antipodal point of the reference.
        return Err(TransformError::OutOfProjection);
    }
    let gamma = (2.0 / denom).sqrt();
    Ok(StandardPos::new(
        (2.0 * gamma * cos_b * half_lon.sin()).to_degrees(),
        (gamma * sin_b).to_degrees(),
    ))
}

pub(crate) fn deproject_ait(rt: &RefTrig, std: StandardPos) -> Result<SkyPos, TransformError> {
    let x = std.x.to_radians();
    let y = std.y.to_radians();

    let xq = x / 4.0;
    let yq = y / 2.0;
    let z_sq = 1.0 - xq * xq - yq * yq;
    if z_sq < 0.0 {
        // Outside the projection ellipse.
        return Err(TransformError::NoCoordinate);
    }
    let z = z_sq.sqrt();

    let lat = (y * z).clamp(-1.0, 1.0).asin();
    let lon = 2.0 * (x * z / 2.0).atan2(2.0 * z * z - 1.0);
    Ok(from_local(rt, lon, lat))
}

pub(crate) fn project_mol(rt: &RefTrig, sky: SkyPos) -> Result<StandardPos, TransformError> {
    let (lon, lat) = to_local(rt, sky);
    let gamma = solve_mol_gamma(lat);

    let sqrt8_over_pi = 8.0_f64.sqrt() / PI;
    let (sin_g, cos_g) = gamma.sin_cos();
    Ok(StandardPos::new(
        (sqrt8_over_pi * lon * cos_g).to_degrees(),
        (std::f64::consts::SQRT_2 * sin_g).to_degrees(),
    ))
}

pub(crate) fn deproject_mol(rt: &RefTrig, std: StandardPos) -> Result<SkyPos, TransformError> {
    let x = std.x.to_radians();
    let y = std.y.to_radians();

    let sin_gamma = y / std::f64::consts::SQRT_2;
    if sin_gamma.abs() > 1.0 {
        return Err(TransformError::NoCoordinate);
    }
    let gamma = sin_gamma.asin();
    let cos_gamma = gamma.cos();

    let lat = ((2.0 * gamma + (2.0 * gamma).sin()) / PI)
        .clamp(-1.0, 1.0)
        .asin();

    if cos_gamma < 1e-12 {
        if x.abs() > 1e-12 {
            return Err(TransformError::NoCoordinate);
        }
        return Ok(from_local(rt, 0.0, lat));
    }

    let sqrt8_over_pi = 8.0_f64.sqrt() / PI;
    let lon = x / (sqrt8_over_pi * cos_gamma);
    if lon.abs() > PI + 1e-9 {
        return Err(TransformError::NoCoordinate);
    }
    Ok(from_local(rt, lon, lat))
}

/// Solve the Mollweide auxiliary angle: `2γ + sin 2γ = π sin β`.
///
/// Bounded iteration with the analytic slope `2 + 2 cos 2γ`; the slope
/// degenerates at the poles, so latitudes within a hair of ±90° short-cut
/// to ±π/2.
fn solve_mol_gamma(lat: f64) -> f64 {
    if lat.abs() >= HALF_PI - 1e-10 {
        return lat.signum() * HALF_PI;
    }
    let target = PI * lat.sin();
    let mut gamma = lat;
    for _ in 0..MAX_INVERSION_STEPS {
        let f = 2.0 * gamma + (2.0 * gamma).sin() - target;
        let fp = 2.0 + 2.0 * (2.0 * gamma).cos();
        if fp.abs() < 1e-15 {
            break;
        }
        let delta = f / fp;
        gamma = (gamma - delta).clamp(-HALF_PI, HALF_PI);
        if delta.abs() < INVERSION_TOL {
            break;
        }
    }
    gamma
}
