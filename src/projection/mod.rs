//! # Projection core
//!
//! Forward (sky → standard plane) and inverse (standard plane → sky)
//! formulas for the sixteen supported projection conventions.
//!
//! The dispatch is a single `match` per direction on the
//! [`ProjectionType`] tagged union; the trigonometric quantities shared by
//! every zenithal branch (sin/cos of the declination and of the hour-angle
//! offset) are computed once per call in `SkyTrig`, and the
//! reference-point quantities once per model in `RefTrig`.
//!
//! The distorted variants (SIP, TPV, SIN-SIP) project with their base
//! formula here; the polynomial corrections are applied around this module
//! by the calibration model.

mod cylindrical;
mod pseudocyl;
mod zenithal;

use nalgebra::Matrix3;
use smallvec::SmallVec;

use crate::coord::{lon_diff, SkyPos, StandardPos};
use crate::frames::rotmt;
use crate::skypix_errors::TransformError;

use zenithal::RadialLaw;

/// Sphere-to-plane mapping convention of a calibration.
///
/// ZPN carries its radial polynomial coefficients; every other variant is
/// fully described by its tag. Unrecognized codes fail at construction
/// with `SkypixError::UnsupportedProjection`; there is no runtime default.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionType {
    /// Orthographic.
    Sin,
    /// Gnomonic (tangent plane).
    Tan,
    /// Zenithal equidistant.
    Arc,
    /// Hammer-Aitoff.
    Ait,
    /// Zenithal equal-area.
    Zea,
    /// Stereographic.
    Stg,
    /// Plate carrée.
    Car,
    /// North celestial pole (orthographic variant).
    Ncp,
    /// Zenithal radial polynomial, at most 10 coefficients.
    Zpn { coeffs: SmallVec<[f64; 10]> },
    /// Linear solar-image pass-through.
    Sol,
    /// Mollweide.
    Mol,
    /// Gnomonic with SIP pixel-space distortion.
    Sip,
    /// Fisheye (full-sphere equidistant).
    Fie,
    /// Gnomonic with PV standard-plane distortion.
    Tpv,
    /// Orthographic with SIP pixel-space distortion.
    SinSip,
    /// Global sinusoidal.
    Gls,
}

impl ProjectionType {
    /// The projection code as it appears in the tail of a CTYPE keyword.
    pub fn code(&self) -> &'static str {
        match self {
            ProjectionType::Sin => "SIN",
            ProjectionType::Tan => "TAN",
            ProjectionType::Arc => "ARC",
            ProjectionType::Ait => "AIT",
            ProjectionType::Zea => "ZEA",
            ProjectionType::Stg => "STG",
            ProjectionType::Car => "CAR",
            ProjectionType::Ncp => "NCP",
            ProjectionType::Zpn { .. } => "ZPN",
            ProjectionType::Sol => "SOL",
            ProjectionType::Mol => "MOL",
            ProjectionType::Sip => "TAN-SIP",
            ProjectionType::Fie => "FIE",
            ProjectionType::Tpv => "TPV",
            ProjectionType::SinSip => "SIN-SIP",
            ProjectionType::Gls => "GLS",
        }
    }

    /// Resolve a projection code (the CTYPE tail, dashes stripped).
    ///
    /// ZPN starts with the identity radial law `r = θ`; header ingestion
    /// replaces the coefficients when PV cards are present.
    pub fn from_code(code: &str) -> Option<Self> {
        let proj = match code.trim_matches('-').to_ascii_uppercase().as_str() {
            "SIN" => ProjectionType::Sin,
            "TAN" => ProjectionType::Tan,
            "ARC" => ProjectionType::Arc,
            "AIT" => ProjectionType::Ait,
            "ZEA" => ProjectionType::Zea,
            "STG" => ProjectionType::Stg,
            "CAR" => ProjectionType::Car,
            "NCP" => ProjectionType::Ncp,
            "ZPN" => ProjectionType::Zpn {
                coeffs: SmallVec::from_slice(&[0.0, 1.0]),
            },
            "SOL" => ProjectionType::Sol,
            "MOL" => ProjectionType::Mol,
            "SIP" | "TAN-SIP" => ProjectionType::Sip,
            "FIE" => ProjectionType::Fie,
            "TPV" => ProjectionType::Tpv,
            "SIN-SIP" => ProjectionType::SinSip,
            "GLS" | "SFL" => ProjectionType::Gls,
            _ => return None,
        };
        Some(proj)
    }

    /// True when the pixel-space SIP correction is active for this
    /// projection.
    pub(crate) fn has_sip_base(&self) -> bool {
        matches!(self, ProjectionType::Sip | ProjectionType::SinSip)
    }

    /// Sky → standard plane. `sky` must already be in the frame the
    /// reference trigonometry was built in.
    pub(crate) fn project(
        &self,
        rt: &RefTrig,
        sky: SkyPos,
    ) -> Result<StandardPos, TransformError> {
        let st = SkyTrig::new(rt, sky);
        match self {
            ProjectionType::Tan | ProjectionType::Sip | ProjectionType::Tpv => {
                zenithal::project_tan(rt, &st)
            }
            ProjectionType::Sin | ProjectionType::SinSip => zenithal::project_sin(rt, &st),
            ProjectionType::Ncp => zenithal::project_ncp(rt, &st),
            ProjectionType::Arc => zenithal::project_radial(RadialLaw::Arc, rt, &st),
            ProjectionType::Fie => zenithal::project_radial(RadialLaw::Fie, rt, &st),
            ProjectionType::Zea => zenithal::project_radial(RadialLaw::Zea, rt, &st),
            ProjectionType::Stg => zenithal::project_radial(RadialLaw::Stg, rt, &st),
            ProjectionType::Zpn { coeffs } => {
                zenithal::project_radial(RadialLaw::Zpn(coeffs), rt, &st)
            }
            ProjectionType::Ait => pseudocyl::project_ait(rt, sky),
            ProjectionType::Gls => pseudocyl::project_gls(rt, sky),
            ProjectionType::Mol => pseudocyl::project_mol(rt, sky),
            ProjectionType::Car => cylindrical::project_car(rt, sky),
            ProjectionType::Sol => cylindrical::project_sol(rt, sky),
        }
    }

    /// Standard plane → sky, in the frame of the reference trigonometry.
    pub(crate) fn deproject(
        &self,
        rt: &RefTrig,
        std: StandardPos,
    ) -> Result<SkyPos, TransformError> {
        match self {
            ProjectionType::Tan | ProjectionType::Sip | ProjectionType::Tpv => {
                zenithal::deproject_tan(rt, std)
            }
            ProjectionType::Sin | ProjectionType::SinSip => zenithal::deproject_sin(rt, std),
            ProjectionType::Ncp => zenithal::deproject_ncp(rt, std),
            ProjectionType::Arc => zenithal::deproject_radial(RadialLaw::Arc, rt, std),
            ProjectionType::Fie => zenithal::deproject_radial(RadialLaw::Fie, rt, std),
            ProjectionType::Zea => zenithal::deproject_radial(RadialLaw::Zea, rt, std),
            ProjectionType::Stg => zenithal::deproject_radial(RadialLaw::Stg, rt, std),
            ProjectionType::Zpn { coeffs } => {
                zenithal::deproject_radial(RadialLaw::Zpn(coeffs), rt, std)
            }
            ProjectionType::Ait => pseudocyl::deproject_ait(rt, std),
            ProjectionType::Gls => pseudocyl::deproject_gls(rt, std),
            ProjectionType::Mol => pseudocyl::deproject_mol(rt, std),
            ProjectionType::Car => cylindrical::deproject_car(rt, std),
            ProjectionType::Sol => cylindrical::deproject_sol(rt, std),
        }
    }
}

/// Reference-point quantities computed once per calibration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RefTrig {
    /// Reference longitude, degrees.
    pub lon0: f64,
    /// Reference latitude, degrees.
    pub lat0: f64,
    pub sin_d0: f64,
    pub cos_d0: f64,
    /// Rotation into the local frame whose origin is the reference point
    /// and whose pole is the local north: `R_y(δ₀) · R_z(−α₀)`. The
    /// pseudo-cylindrical projections are formulated around this pole,
    /// which is not the reference point itself.
    pub local: Matrix3<f64>,
}

impl RefTrig {
    pub(crate) fn new(reference: SkyPos) -> Self {
        let lat_rad = reference.lat.to_radians();
        let (sin_d0, cos_d0) = lat_rad.sin_cos();
        let local = rotmt(lat_rad, 1) * rotmt(-reference.lon.to_radians(), 2);
        Self {
            lon0: reference.lon,
            lat0: reference.lat,
            sin_d0,
            cos_d0,
            local,
        }
    }
}

/// Per-call trigonometry shared by the zenithal formulas.
pub(crate) struct SkyTrig {
    pub sin_d: f64,
    pub cos_d: f64,
    pub sin_da: f64,
    pub cos_da: f64,
}

impl SkyTrig {
    pub(crate) fn new(rt: &RefTrig, sky: SkyPos) -> Self {
        let (sin_d, cos_d) = sky.lat.to_radians().sin_cos();
        let (sin_da, cos_da) = lon_diff(sky.lon, rt.lon0).to_radians().sin_cos();
        Self {
            sin_d,
            cos_d,
            sin_da,
            cos_da,
        }
    }

    /// Cosine of the angular distance to the reference point.
    #[inline]
    pub(crate) fn cos_dist(&self, rt: &RefTrig) -> f64 {
        self.sin_d * rt.sin_d0 + self.cos_d * rt.cos_d0 * self.cos_da
    }

    /// Eastward component of the rotated unit vector.
    #[inline]
    pub(crate) fn east(&self) -> f64 {
        self.cos_d * self.sin_da
    }

    /// Northward component of the rotated unit vector.
    #[inline]
    pub(crate) fn north(&self, rt: &RefTrig) -> f64 {
        self.sin_d * rt.cos_d0 - self.cos_d * rt.sin_d0 * self.cos_da
    }
}

#[cfg(test)]
mod projection_test {
    use super::*;
    use approx::assert_relative_eq;

    fn rt(lon0: f64, lat0: f64) -> RefTrig {
        RefTrig::new(SkyPos::new(lon0, lat0))
    }

    fn all_projections() -> Vec<ProjectionType> {
        vec![
            ProjectionType::Sin,
            ProjectionType::Tan,
            ProjectionType::Arc,
            ProjectionType::Ait,
            ProjectionType::Zea,
            ProjectionType::Stg,
            ProjectionType::Car,
            ProjectionType::Ncp,
            ProjectionType::Zpn {
                coeffs: SmallVec::from_slice(&[0.0, 1.0, 0.02]),
            },
            ProjectionType::Sol,
            ProjectionType::Mol,
            ProjectionType::Sip,
            ProjectionType::Fie,
            ProjectionType::Tpv,
            ProjectionType::SinSip,
            ProjectionType::Gls,
        ]
    }

    #[test]
    fn test_reference_maps_to_origin() {
        for proj in all_projections() {
            let rt = rt(83.6, 22.0);
            let std = proj.project(&rt, SkyPos::new(83.6, 22.0)).unwrap();
            assert_relative_eq!(std.x, 0.0, epsilon = 1e-9);
            assert_relative_eq!(std.y, 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_origin_maps_to_reference() {
        for proj in all_projections() {
            let rt = rt(210.3, -47.5);
            let sky = proj.deproject(&rt, StandardPos::new(0.0, 0.0)).unwrap();
            assert_relative_eq!(sky.lon, 210.3, epsilon = 1e-9);
            assert_relative_eq!(sky.lat, -47.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_roundtrip_near_field() {
        // A ~1 degree field around an off-equator reference, every type.
        for proj in all_projections() {
            let rt = rt(120.0, 35.0);
            for (dl, db) in [(0.4, 0.3), (-0.5, 0.2), (0.1, -0.6), (-0.3, -0.4)] {
                let sky = SkyPos::new(120.0 + dl, 35.0 + db);
                let std = proj.project(&rt, sky).unwrap();
                let back = proj.deproject(&rt, std).unwrap();
                assert_relative_eq!(back.lon, sky.lon, epsilon = 1e-9);
                assert_relative_eq!(back.lat, sky.lat, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_tan_out_of_projection_beyond_horizon() {
        let rt = rt(0.0, 0.0);
        let res = ProjectionType::Tan.project(&rt, SkyPos::new(120.0, 0.0));
        assert_eq!(res.unwrap_err(), TransformError::OutOfProjection);
    }

    #[test]
    fn test_sin_out_of_projection_beyond_ninety() {
        let rt = rt(10.0, 20.0);
        // More than 90 degrees away from the reference.
        let res = ProjectionType::Sin.project(&rt, SkyPos::new(190.0, -20.0));
        assert_eq!(res.unwrap_err(), TransformError::OutOfProjection);
    }

    #[test]
    fn test_sin_inverse_outside_unit_disc() {
        let rt = rt(10.0, 20.0);
        let res = ProjectionType::Sin.deproject(&rt, StandardPos::new(80.0, 0.0));
        assert_eq!(res.unwrap_err(), TransformError::NoCoordinate);
    }

    #[test]
    fn test_ncp_equatorial_reference_rejected() {
        let rt = rt(0.0, 0.0);
        let res = ProjectionType::Ncp.project(&rt, SkyPos::new(1.0, 1.0));
        assert_eq!(res.unwrap_err(), TransformError::OutOfProjection);
    }

    #[test]
    fn test_ait_all_sky_roundtrip() {
        let rt = rt(0.0, 0.0);
        let proj = ProjectionType::Ait;
        for lon in [-150.0_f64, -60.0, 0.0, 45.0, 120.0] {
            for lat in [-75.0_f64, -30.0, 0.0, 30.0, 75.0] {
                let sky = SkyPos::new(lon, lat);
                let std = proj.project(&rt, sky).unwrap();
                let back = proj.deproject(&rt, std).unwrap();
                assert_relative_eq!(back.lon, sky.lon, epsilon = 1e-8);
                assert_relative_eq!(back.lat, sky.lat, epsilon = 1e-8);
            }
        }
    }

    #[test]
    fn test_ait_ellipse_argument_exceeded() {
        let rt = rt(0.0, 0.0);
        let res = ProjectionType::Ait.deproject(&rt, StandardPos::new(300.0, 100.0));
        assert_eq!(res.unwrap_err(), TransformError::NoCoordinate);
    }

    #[test]
    fn test_mol_gls_all_sky_roundtrip() {
        let rt = rt(180.0, 0.0);
        for proj in [ProjectionType::Mol, ProjectionType::Gls] {
            for lon in [60.0_f64, 150.0, 180.0, 250.0] {
                for lat in [-60.0_f64, -15.0, 0.0, 45.0] {
                    let sky = SkyPos::new(lon, lat);
                    let std = proj.project(&rt, sky).unwrap();
                    let back = proj.deproject(&rt, std).unwrap();
                    assert_relative_eq!(back.lon, sky.lon, epsilon = 2e-7);
                    assert_relative_eq!(back.lat, sky.lat, epsilon = 2e-7);
                }
            }
        }
    }

    #[test]
    fn test_zpn_quadratic_roundtrip() {
        let proj = ProjectionType::Zpn {
            coeffs: SmallVec::from_slice(&[0.0, 1.0, 0.0, 0.05]),
        };
        let rt = rt(95.0, 60.0);
        let sky = SkyPos::new(97.0, 58.5);
        let std = proj.project(&rt, sky).unwrap();
        let back = proj.deproject(&rt, std).unwrap();
        assert_relative_eq!(back.lon, sky.lon, epsilon = 1e-9);
        assert_relative_eq!(back.lat, sky.lat, epsilon = 1e-9);
    }

    #[test]
    fn test_code_resolution() {
        assert_eq!(
            ProjectionType::from_code("TAN").unwrap(),
            ProjectionType::Tan
        );
        assert_eq!(
            ProjectionType::from_code("TAN-SIP").unwrap(),
            ProjectionType::Sip
        );
        assert!(ProjectionType::from_code("BONNE").is_none());
        assert_eq!(ProjectionType::Sip.code(), "TAN-SIP");
    }
}
