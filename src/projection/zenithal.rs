//! Zenithal (azimuthal) projections: the plane is tangent (or secant) at
//! the reference point and the formulas are radial around it.

use crate::constants::{INVERSION_TOL, MAX_INVERSION_STEPS};
use crate::coord::{SkyPos, StandardPos};
use crate::skypix_errors::TransformError;

use super::{RefTrig, SkyTrig};

/// Radial law of the distance-only zenithal projections.
pub(crate) enum RadialLaw<'a> {
    /// Equidistant: r = θ.
    Arc,
    /// Full-sphere equidistant fisheye; same law as ARC, accepted out to
    /// the antipode.
    Fie,
    /// Equal-area: r = 2·sin(θ/2).
    Zea,
    /// Stereographic: r = 2·tan(θ/2).
    Stg,
    /// Radial polynomial in the colatitude.
    Zpn(&'a [f64]),
}

pub(crate) fn project_tan(rt: &RefTrig, st: &SkyTrig) -> Result<StandardPos, TransformError> {
    let den = st.cos_dist(rt);
    if den <= 0.0 {
        return Err(TransformError::OutOfProjection);
    }
    Ok(StandardPos::new(
        (st.east() / den).to_degrees(),
        (st.north(rt) / den).to_degrees(),
    ))
}

pub(crate) fn deproject_tan(rt: &RefTrig, std: StandardPos) -> Result<SkyPos, TransformError> {
    let x = std.x.to_radians();
    let y = std.y.to_radians();
    let t = rt.cos_d0 - y * rt.sin_d0;
    let lat = (rt.sin_d0 + y * rt.cos_d0).atan2((x * x + t * t).sqrt());
    let lon = rt.lon0.to_radians() + x.atan2(t);
    Ok(SkyPos::from_radians(lon, lat))
}

pub(crate) fn project_sin(rt: &RefTrig, st: &SkyTrig) -> Result<StandardPos, TransformError> {
    if st.cos_dist(rt) < 0.0 {
        return Err(TransformError::OutOfProjection);
    }
    Ok(StandardPos::new(
        st.east().to_degrees(),
        st.north(rt).to_degrees(),
    ))
}

pub(crate) fn deproject_sin(rt: &RefTrig, std: StandardPos) -> Result<SkyPos, TransformError> {
    let x = std.x.to_radians();
    let y = std.y.to_radians();
    let r2 = x * x + y * y;
    if r2 > 1.0 {
        return Err(TransformError::NoCoordinate);
    }
    let z = (1.0 - r2).sqrt();
    let lat = (z * rt.sin_d0 + y * rt.cos_d0).clamp(-1.0, 1.0).asin();
    let lon = rt.lon0.to_radians() + x.atan2(z * rt.cos_d0 - y * rt.sin_d0);
    Ok(SkyPos::from_radians(lon, lat))
}

pub(crate) fn project_ncp(rt: &RefTrig, st: &SkyTrig) -> Result<StandardPos, TransformError> {
    // The NCP plane is parallel to the equator; an equatorial reference
    // pushes it to infinity.
    if rt.sin_d0 == 0.0 {
        return Err(TransformError::OutOfProjection);
    }
    if st.cos_dist(rt) < 0.0 {
        return Err(TransformError::OutOfProjection);
    }
    let x = st.east();
    let y = (rt.cos_d0 - st.cos_d * st.cos_da) / rt.sin_d0;
    Ok(StandardPos::new(x.to_degrees(), y.to_degrees()))
}

pub(crate) fn deproject_ncp(rt: &RefTrig, std: StandardPos) -> Result<SkyPos, TransformError> {
    if rt.sin_d0 == 0.0 {
        return Err(TransformError::NoCoordinate);
    }
    let x = std.x.to_radians();
    let y = std.y.to_radians();
    // cosδ·cosΔα and cosδ·sinΔα recovered directly; the declination keeps
    // the hemisphere of the reference.
    let t = rt.cos_d0 - y * rt.sin_d0;
    let cos_lat = (x * x + t * t).sqrt();
    if cos_lat > 1.0 + 1e-12 {
        return Err(TransformError::NoCoordinate);
    }
    let lat = cos_lat.clamp(-1.0, 1.0).acos() * rt.sin_d0.signum();
    let lon = rt.lon0.to_radians() + x.atan2(t);
    Ok(SkyPos::from_radians(lon, lat))
}

impl RadialLaw<'_> {
    /// Radius as a function of the colatitude θ (both radians).
    fn radius(&self, theta: f64) -> Result<f64, TransformError> {
        match self {
            RadialLaw::Arc | RadialLaw::Fie => Ok(theta),
            RadialLaw::Zea => Ok(2.0 * (theta / 2.0).sin()),
            RadialLaw::Stg => {
                if (theta - std::f64::consts::PI).abs() < 1e-9 {
                    return Err(TransformError::OutOfProjection);
                }
                Ok(2.0 * (theta / 2.0).tan())
            }
            RadialLaw::Zpn(coeffs) => Ok(eval_poly(coeffs, theta)),
        }
    }

    /// Colatitude as a function of the radius.
    fn colatitude(&self, r: f64) -> Result<f64, TransformError> {
        match self {
            RadialLaw::Arc | RadialLaw::Fie => {
                if r > std::f64::consts::PI {
                    return Err(TransformError::NoCoordinate);
                }
                Ok(r)
            }
            RadialLaw::Zea => {
                let half = r / 2.0;
                if half > 1.0 {
                    return Err(TransformError::NoCoordinate);
                }
                Ok(2.0 * half.asin())
            }
            RadialLaw::Stg => Ok(2.0 * (r / 2.0).atan()),
            RadialLaw::Zpn(coeffs) => invert_zpn(coeffs, r),
        }
    }
}

pub(crate) fn project_radial(
    law: RadialLaw<'_>,
    rt: &RefTrig,
    st: &SkyTrig,
) -> Result<StandardPos, TransformError> {
    let cos_dist = st.cos_dist(rt).clamp(-1.0, 1.0);
    let theta = cos_dist.acos();
    if theta == 0.0 {
        return Ok(StandardPos::new(0.0, 0.0));
    }

    let east = st.east();
    let north = st.north(rt);
    let sin_dist = (east * east + north * north).sqrt();
    if sin_dist < 1e-12 {
        // Antipode: the azimuth is undefined.
        return Err(TransformError::OutOfProjection);
    }

    let r = law.radius(theta)?;
    Ok(StandardPos::new(
        (r * east / sin_dist).to_degrees(),
        (r * north / sin_dist).to_degrees(),
    ))
}

pub(crate) fn deproject_radial(
    law: RadialLaw<'_>,
    rt: &RefTrig,
    std: StandardPos,
) -> Result<SkyPos, TransformError> {
    let x = std.x.to_radians();
    let y = std.y.to_radians();
    let r = (x * x + y * y).sqrt();
    if r == 0.0 {
        return Ok(SkyPos::new(rt.lon0, rt.lat0));
    }

    let theta = law.colatitude(r)?;
    let (sin_t, cos_t) = theta.sin_cos();
    let xu = x / r;
    let yu = y / r;

    let lat = (cos_t * rt.sin_d0 + yu * sin_t * rt.cos_d0)
        .clamp(-1.0, 1.0)
        .asin();
    let lon = rt.lon0.to_radians() + (xu * sin_t).atan2(cos_t * rt.cos_d0 - yu * sin_t * rt.sin_d0);
    Ok(SkyPos::from_radians(lon, lat))
}

/// Horner evaluation of the ZPN radial polynomial.
fn eval_poly(coeffs: &[f64], theta: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * theta + c)
}

fn eval_poly_derivative(coeffs: &[f64], theta: f64) -> f64 {
    coeffs
        .iter()
        .enumerate()
        .skip(1)
        .rev()
        .fold(0.0, |acc, (i, c)| acc * theta + i as f64 * c)
}

/// Newton-Raphson inversion of the ZPN radial polynomial.
///
/// Runs at most [`MAX_INVERSION_STEPS`] iterations with the analytic
/// derivative of the same polynomial; when the budget is exhausted the
/// last iterate is returned rather than an error. A vanishing derivative
/// means the radius is not locally invertible at all.
fn invert_zpn(coeffs: &[f64], r: f64) -> Result<f64, TransformError> {
    let mut theta = r.clamp(0.0, std::f64::consts::PI);
    for _ in 0..MAX_INVERSION_STEPS {
        let f = eval_poly(coeffs, theta) - r;
        let fp = eval_poly_derivative(coeffs, theta);
        if fp.abs() < 1e-15 {
            return Err(TransformError::NoCoordinate);
        }
        let delta = f / fp;
        theta = (theta - delta).clamp(0.0, std::f64::consts::PI);
        if delta.abs() < INVERSION_TOL {
            break;
        }
    }
    Ok(theta)
}
