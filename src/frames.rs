//! # Celestial reference systems and frame conversion
//!
//! This module defines the reference systems a calibration can be expressed
//! in, and the stateless conversion capability between them. The transform
//! core always normalizes through ICRS: a calibration converts its inputs
//! native→ICRS and its outputs ICRS→native, so a single set of
//! ICRS-anchored rotation matrices covers every pair of systems.
//!
//! ## Conversion model
//!
//! Every celestial system is related to ICRS by a fixed orthonormal 3×3
//! rotation:
//!
//! - `FK5` (J2000) is treated as coincident with ICRS (the ~20 mas frame
//!   bias is far below the calibration accuracies this library serves).
//! - `FK4` uses the standard Murray (1989) B1950→J2000 rotation, without
//!   E-term removal.
//! - `Galactic` uses the IAU equatorial-J2000→galactic matrix.
//! - `Supergalactic` composes the de Vaucouleurs galactic→supergalactic
//!   rotation with the galactic matrix.
//! - `Ecliptic` rotates about the x-axis by the mean obliquity at J2000.
//! - `Xy` is a non-celestial linear system; conversion passes through.
//!
//! The matrices are built once into a process-wide, immutable
//! [`LazyLock`] table and shared read-only across calibration instances.
//!
//! ## See also
//! ------------
//! * [`FrameConverter`] – the injected capability consumed by the model.
//! * [`RotationFrames`] – the default in-crate implementation.
//! * [`precess_fk5`] – IAU 1976 mean-equinox precession for non-J2000
//!   equatorial calibrations.

use std::sync::LazyLock;

use nalgebra::{Matrix3, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

use crate::constants::{Radian, RADEG, RADSEC};
use crate::coord::SkyPos;
use crate::skypix_errors::SkypixError;

/// The celestial reference system a calibration is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkySystem {
    /// International Celestial Reference System (the internal pivot).
    Icrs,
    /// FK4, equator and equinox B1950.
    Fk4,
    /// FK5, equator and equinox J2000 unless the calibration carries a
    /// different equinox.
    Fk5,
    /// IAU 1958 galactic coordinates.
    Galactic,
    /// De Vaucouleurs supergalactic coordinates.
    Supergalactic,
    /// Mean ecliptic and equinox J2000.
    Ecliptic,
    /// Linear pixel-like coordinates, not on the celestial sphere.
    Xy,
}

impl SkySystem {
    /// True for the systems whose coordinates are not equatorial angles,
    /// which therefore escape the equinox-1950 FK4 rule.
    pub fn is_non_equatorial(&self) -> bool {
        matches!(
            self,
            SkySystem::Galactic | SkySystem::Ecliptic | SkySystem::Supergalactic | SkySystem::Xy
        )
    }

    /// Parse a `RADESYS`-style tag.
    pub fn from_tag(tag: &str) -> Result<Self, SkypixError> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "ICRS" => Ok(SkySystem::Icrs),
            "FK4" | "FK4-NO-E" => Ok(SkySystem::Fk4),
            "FK5" => Ok(SkySystem::Fk5),
            "GALACTIC" => Ok(SkySystem::Galactic),
            "SUPERGALACTIC" => Ok(SkySystem::Supergalactic),
            "ECLIPTIC" => Ok(SkySystem::Ecliptic),
            "XY" | "LINEAR" => Ok(SkySystem::Xy),
            other => Err(SkypixError::UnknownSystem(other.to_string())),
        }
    }

    /// The `RADESYS` tag emitted for this system.
    pub fn tag(&self) -> &'static str {
        match self {
            SkySystem::Icrs => "ICRS",
            SkySystem::Fk4 => "FK4",
            SkySystem::Fk5 => "FK5",
            SkySystem::Galactic => "GALACTIC",
            SkySystem::Supergalactic => "SUPERGALACTIC",
            SkySystem::Ecliptic => "ECLIPTIC",
            SkySystem::Xy => "XY",
        }
    }
}

/// Stateless conversion between celestial reference systems.
///
/// Implementations must be immutable and safe to share across threads; the
/// calibration model holds one by reference and calls it on every
/// transform when its system is not ICRS/XY.
pub trait FrameConverter: Sync {
    /// Convert a sky position from one system to another.
    fn convert(&self, from: SkySystem, to: SkySystem, pos: SkyPos) -> SkyPos;
}

/// The default [`FrameConverter`]: fixed rotation matrices anchored on ICRS.
#[derive(Debug, Default, Clone, Copy)]
pub struct RotationFrames;

impl FrameConverter for RotationFrames {
    fn convert(&self, from: SkySystem, to: SkySystem, pos: SkyPos) -> SkyPos {
        if from == to || from == SkySystem::Xy || to == SkySystem::Xy {
            return pos;
        }
        let table = &*FRAME_TABLE;
        let v_icrs = table.to_icrs(from) * unit_vector(pos);
        vector_to_sky(table.from_icrs(to) * v_icrs)
    }
}

/// Process-wide conversion table, built once on first use.
static FRAME_TABLE: LazyLock<FrameTable> = LazyLock::new(FrameTable::build);

struct FrameTable {
    /// ICRS → galactic.
    galactic: Matrix3<f64>,
    /// ICRS → supergalactic.
    supergalactic: Matrix3<f64>,
    /// ICRS → mean ecliptic J2000.
    ecliptic: Matrix3<f64>,
    /// ICRS → FK4 B1950.
    fk4: Matrix3<f64>,
}

impl FrameTable {
    fn build() -> Self {
        // IAU equatorial-J2000 → galactic rotation.
        let galactic = Matrix3::new(
            -0.054_875_560_4,
            -0.873_437_090_2,
            -0.483_835_015_5,
            0.494_109_427_9,
            -0.444_829_630_0,
            0.746_982_244_5,
            -0.867_666_149_0,
            -0.198_076_373_4,
            0.455_983_776_2,
        );

        // De Vaucouleurs galactic → supergalactic rotation
        // (pole l = 47.37°, b = +6.32°; origin l = 137.37°).
        let gal_to_sgal = Matrix3::new(
            -0.735_742_574_804_374_88,
            0.677_261_296_413_894_32,
            0.0,
            -0.074_553_778_365_233_42,
            -0.080_991_471_306_976_73,
            0.993_948_740_566_344_43,
            0.673_145_302_109_207_64,
            0.731_271_165_816_964_50,
            0.110_081_267_765_460_67,
        );

        // Murray (1989) FK4 B1950 → FK5 J2000 rotation.
        let b1950_to_j2000 = Matrix3::new(
            0.999_925_678_2,
            -0.011_182_061_1,
            -0.004_857_947_7,
            0.011_182_061_0,
            0.999_937_478_4,
            -0.000_027_176_5,
            0.004_857_947_9,
            -0.000_027_147_4,
            0.999_988_199_7,
        );

        Self {
            galactic,
            supergalactic: gal_to_sgal * galactic,
            ecliptic: rotmt(-obleq(2000.0), 0),
            fk4: b1950_to_j2000.transpose(),
        }
    }

    /// Rotation taking ICRS vectors into `system`.
    fn from_icrs(&self, system: SkySystem) -> Matrix3<f64> {
        match system {
            SkySystem::Icrs | SkySystem::Fk5 | SkySystem::Xy => Matrix3::identity(),
            SkySystem::Fk4 => self.fk4,
            SkySystem::Galactic => self.galactic,
            SkySystem::Supergalactic => self.supergalactic,
            SkySystem::Ecliptic => self.ecliptic,
        }
    }

    /// Rotation taking `system` vectors into ICRS: the matrices are
    /// orthonormal, so the transpose is the inverse.
    fn to_icrs(&self, system: SkySystem) -> Matrix3<f64> {
        self.from_icrs(system).transpose()
    }
}

/// Construct a right-handed 3×3 rotation matrix around a principal axis.
///
/// Active rotation of a vector by `alpha` radians, counter-clockwise when
/// looking along the axis toward the origin.
///
/// Arguments
/// ---------
/// * `alpha`: rotation angle in radians.
/// * `k`: axis index, `0` → X, `1` → Y, `2` → Z.
///
/// Panics
/// ------
/// * If `k > 2`.
pub(crate) fn rotmt(alpha: Radian, k: usize) -> Matrix3<f64> {
    let axis = match k {
        0 => Vector3::x_axis(),
        1 => Vector3::y_axis(),
        2 => Vector3::z_axis(),
        _ => panic!("**** ROTMT: invalid axis index {k} (must be 0,1,2) ****"),
    };

    Rotation3::from_axis_angle(&axis, alpha).into()
}

/// Mean obliquity of the ecliptic at a given Julian epoch (IAU 1976 model).
///
/// Cubic polynomial in Julian centuries since J2000, evaluated with
/// Horner's method; coefficients in arcseconds, result in radians.
///
/// Arguments
/// ---------
/// * `jy`: Julian epoch in years (e.g. `2000.0`).
pub(crate) fn obleq(jy: f64) -> Radian {
    let ob0 = ((23.0 * 3600.0 + 26.0 * 60.0) + 21.448) * RADSEC;
    let ob1 = -46.815 * RADSEC;
    let ob2 = -0.0006 * RADSEC;
    let ob3 = 0.00181 * RADSEC;

    let t = (jy - 2000.0) / 100.0;

    ((ob3 * t + ob2) * t + ob1) * t + ob0
}

/// Precession matrix from J2000 to the mean equator and equinox of a given
/// Julian epoch (IAU 1976 model).
///
/// Three successive rotations Z(−ζ) · Y(θ) · Z(−z) with the standard
/// polynomial angles in Julian centuries `T = (jy − 2000) / 100`:
///
/// ```text
/// ζ(T) = (0.6406161 + 0.0000839·T + 0.0000050·T²) · T  [deg]
/// θ(T) = (0.5567530 − 0.0001185·T − 0.0000116·T²) · T  [deg]
/// z(T) = (0.6406161 + 0.0003041·T + 0.0000051·T²) · T  [deg]
/// ```
///
/// The result maps a J2000 mean-equatorial vector into the mean frame of
/// the requested epoch.
fn prec(jy: f64) -> Matrix3<f64> {
    let zed = 0.6406161 * RADEG;
    let zd = 0.6406161 * RADEG;
    let thd = 0.5567530 * RADEG;

    let zedd = 0.0000839 * RADEG;
    let zdd = 0.0003041 * RADEG;
    let thdd = -0.0001185 * RADEG;

    let zeddd = 0.0000050 * RADEG;
    let zddd = 0.0000051 * RADEG;
    let thddd = -0.0000116 * RADEG;

    let t = (jy - 2000.0) / 100.0;

    let zeta = ((zeddd * t + zedd) * t + zed) * t;
    let z = ((zddd * t + zdd) * t + zd) * t;
    let theta = ((thddd * t + thdd) * t + thd) * t;

    let r1 = rotmt(-zeta, 2);
    let r2 = rotmt(theta, 1);
    let r3 = rotmt(-z, 2);

    (r1 * r2) * r3
}

/// Precess an equatorial position between two mean equinoxes (IAU 1976).
///
/// Used by calibrations whose header carries an FK5 equinox other than
/// J2000; both epochs are Julian years.
pub fn precess_fk5(pos: SkyPos, from_jy: f64, to_jy: f64) -> SkyPos {
    if (from_jy - to_jy).abs() < f64::EPSILON {
        return pos;
    }
    let v_j2000 = prec(from_jy).transpose() * unit_vector(pos);
    vector_to_sky(prec(to_jy) * v_j2000)
}

/// Unit vector of a sky position.
#[inline]
pub(crate) fn unit_vector(pos: SkyPos) -> Vector3<f64> {
    let (sin_lat, cos_lat) = pos.lat.to_radians().sin_cos();
    let (sin_lon, cos_lon) = pos.lon.to_radians().sin_cos();
    Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
}

/// Convert a Cartesian direction back to longitude/latitude.
///
/// The longitude uses `atan2` to preserve the quadrant; a zero vector maps
/// to the origin of coordinates.
pub(crate) fn vector_to_sky(v: Vector3<f64>) -> SkyPos {
    let norm = v.norm();
    if norm == 0.0 {
        return SkyPos::new(0.0, 0.0);
    }
    let lat = (v.z / norm).clamp(-1.0, 1.0).asin();
    let lon = v.y.atan2(v.x);
    SkyPos::from_radians(lon, lat)
}
