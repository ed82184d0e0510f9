//! # The calibration model
//!
//! [`Calibration`] is the central façade of the crate: one immutable value
//! per image plane, owning the linear matrix pair, the reference point,
//! the projection convention, the reference system and the optional
//! distortion solution, and orchestrating them into the two public
//! transforms:
//!
//! 1. **sky → pixel** ([`Calibration::sky_to_pixel`])
//! 2. **pixel → sky** ([`Calibration::pixel_to_sky`])
//!
//! ## Construction paths
//!
//! A calibration is built exactly once, by one of four factories:
//!
//! - the explicit-numeric [`CalibrationBuilder`] (origin `Explicit`),
//! - `Calibration::from_header` (origin `Header`),
//! - `Calibration::from_plate_stream` (origin `PlateStream`),
//! - `Calibration::from_spherical_cell` (origin `SphericalCell`).
//!
//! Every path funnels through one private assembler that computes the
//! matrix inverse and the derived scale/rotation together, so `CD·ID = I`
//! and the derived quantities can never drift apart; the geometric
//! mutators reuse the same assembler and return new instances.
//!
//! ## Invariants
//!
//! - `cd` and `id` are mutual inverses; a degenerate matrix never
//!   constructs.
//! - Transform operations are pure reads; the model is `Sync` and can be
//!   shared across threads.
//! - Frame conversions always pivot through ICRS; the reference-point
//!   trigonometry is cached in the internal frame at construction.
//!
//! ## See also
//! ------------
//! * [`crate::mutators`] – crop / resize / flip / recalibrate.
//! * [`crate::ingest`] – the legacy format readers and the header writer.

use nalgebra::{Matrix2, Vector2};
use serde::{Deserialize, Serialize};

use crate::constants::DET_EPSILON;
use crate::coord::{PixelPos, SkyPos, StandardPos};
use crate::distortion::Distortion;
use crate::frames::{precess_fk5, FrameConverter, RotationFrames, SkySystem};
use crate::projection::{ProjectionType, RefTrig};
use crate::skypix_errors::{SkypixError, TransformError};

/// Which ingestion path built a calibration.
///
/// The transform formulas branch on it: plate-origin models route through
/// the plate polynomial pair instead of the CD matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalOrigin {
    Explicit,
    Header,
    PlateStream,
    SphericalCell,
}

/// An immutable astrometric calibration of one image plane.
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    /// Pixel offset → standard plane (degrees).
    cd: Matrix2<f64>,
    /// Standard plane → pixel offset; always the inverse of `cd`.
    id: Matrix2<f64>,
    /// Reference pixel (1-based).
    xcen: f64,
    ycen: f64,
    /// Reference sky position in the native system.
    crval: SkyPos,
    /// Reference-point trigonometry in the internal (ICRS) frame.
    ref_trig: RefTrig,
    /// Signed degree-per-pixel steps derived from `cd`.
    inc_a: f64,
    inc_d: f64,
    /// Field rotation, degrees.
    rota: f64,
    /// Field extent, degrees.
    width_a: f64,
    width_d: f64,
    xnpix: u32,
    ynpix: u32,
    proj: ProjectionType,
    system: SkySystem,
    equinox: f64,
    epoch: Option<f64>,
    distortion: Distortion,
    origin: CalOrigin,
}

/// Everything the private assembler needs; shared by the factories and
/// the mutators.
pub(crate) struct CalParts {
    pub cd: Matrix2<f64>,
    pub xcen: f64,
    pub ycen: f64,
    pub crval: SkyPos,
    pub xnpix: u32,
    pub ynpix: u32,
    pub proj: ProjectionType,
    pub system: SkySystem,
    pub equinox: f64,
    pub epoch: Option<f64>,
    pub distortion: Distortion,
    pub origin: CalOrigin,
}

impl Calibration {
    /// Start the explicit-numeric construction path.
    pub fn builder(proj: ProjectionType, system: SkySystem) -> CalibrationBuilder {
        CalibrationBuilder::new(proj, system)
    }

    /// Assemble a calibration, recomputing the matrix inverse and every
    /// derived quantity in one place.
    pub(crate) fn assemble(parts: CalParts) -> Result<Self, SkypixError> {
        let det = parts.cd[(0, 0)] * parts.cd[(1, 1)] - parts.cd[(0, 1)] * parts.cd[(1, 0)];
        if det.abs() < DET_EPSILON {
            return Err(SkypixError::SingularMatrix(det));
        }
        let id = Matrix2::new(
            parts.cd[(1, 1)] / det,
            -parts.cd[(0, 1)] / det,
            -parts.cd[(1, 0)] / det,
            parts.cd[(0, 0)] / det,
        );

        // Equinox 1950 forces FK4 unless the system is not equatorial.
        let system = if (parts.equinox - 1950.0).abs() < f64::EPSILON
            && !parts.system.is_non_equatorial()
        {
            SkySystem::Fk4
        } else {
            parts.system
        };

        let (inc_a, inc_d, rota) = derive_scale_rotation(&parts.cd);

        let crval_internal =
            internal_reference(parts.crval, system, parts.equinox, &RotationFrames);

        Ok(Self {
            cd: parts.cd,
            id,
            xcen: parts.xcen,
            ycen: parts.ycen,
            crval: parts.crval,
            ref_trig: RefTrig::new(crval_internal),
            inc_a,
            inc_d,
            rota,
            width_a: inc_a.abs() * parts.xnpix as f64,
            width_d: inc_d.abs() * parts.ynpix as f64,
            xnpix: parts.xnpix,
            ynpix: parts.ynpix,
            proj: parts.proj,
            system,
            equinox: parts.equinox,
            epoch: parts.epoch,
            distortion: parts.distortion,
            origin: parts.origin,
        })
    }

    /// Tear a calibration back into assembler parts (for the mutators).
    pub(crate) fn parts(&self) -> CalParts {
        CalParts {
            cd: self.cd,
            xcen: self.xcen,
            ycen: self.ycen,
            crval: self.crval,
            xnpix: self.xnpix,
            ynpix: self.ynpix,
            proj: self.proj.clone(),
            system: self.system,
            equinox: self.equinox,
            epoch: self.epoch,
            distortion: self.distortion.clone(),
            origin: self.origin,
        }
    }

    // ---------------------------------------------------------------------
    // Transforms
    // ---------------------------------------------------------------------

    /// Sky → pixel.
    ///
    /// `sky` is expressed in the calibration's native system; it is
    /// normalized to ICRS internally (unless the system is ICRS or XY)
    /// before the projection dispatch.
    ///
    /// Errors
    /// ------
    /// * [`TransformError::OutOfProjection`] – the position lies outside
    ///   the projection's domain (tangent-plane horizon, anti-pole, ...).
    /// * [`TransformError::NoSolution`] – a distortion inversion hit a
    ///   singular Jacobian.
    pub fn sky_to_pixel(&self, sky: SkyPos) -> Result<PixelPos, TransformError> {
        let internal = self.to_internal(sky);

        if let Distortion::Plate(plate) = &self.distortion {
            let std = self.proj.project(&self.ref_trig, internal)?;
            return Ok(plate.standard_to_pixel(std));
        }

        let std = self.proj.project(&self.ref_trig, internal)?;
        let pixel = self.standard_to_pixel(std)?;

        // CAR covers the full 360° band: a position that lands outside the
        // pixel extent may re-enter through the opposite edge.
        if matches!(self.proj, ProjectionType::Car) && !self.contains_x(pixel.x) {
            let wrapped = StandardPos::new(
                std.x + if std.x < 0.0 { 360.0 } else { -360.0 },
                std.y,
            );
            let alt = self.standard_to_pixel(wrapped)?;
            if self.contains_x(alt.x) {
                return Ok(alt);
            }
        }
        Ok(pixel)
    }

    /// Pixel → sky, in the calibration's native system.
    ///
    /// Errors
    /// ------
    /// * [`TransformError::NoCoordinate`] – the pixel falls outside the
    ///   inverse formula's domain (radial argument out of range).
    pub fn pixel_to_sky(&self, pixel: PixelPos) -> Result<SkyPos, TransformError> {
        if let Distortion::Plate(plate) = &self.distortion {
            let std = plate.pixel_to_standard(pixel);
            let internal = self.proj.deproject(&self.ref_trig, std)?;
            return Ok(self.from_internal(internal));
        }

        let offset = pixel.offset_from(self.xcen, self.ycen);
        let (dx, dy) = match &self.distortion {
            Distortion::Sip(sip) if self.proj.has_sip_base() => sip.apply(offset.dx, offset.dy),
            _ => (offset.dx, offset.dy),
        };

        let v = self.cd * Vector2::new(dx, dy);
        let std = match &self.distortion {
            Distortion::Pv(pv) => {
                let (xi, eta) = pv.apply(v.x, v.y);
                StandardPos::new(xi, eta)
            }
            _ => StandardPos::new(v.x, v.y),
        };

        let internal = self.proj.deproject(&self.ref_trig, std)?;
        Ok(self.from_internal(internal))
    }

    /// Apply the inverse linear chain (and any matrix-side distortion) to
    /// a standard-plane position.
    fn standard_to_pixel(&self, std: StandardPos) -> Result<PixelPos, TransformError> {
        let (xi, eta) = match &self.distortion {
            Distortion::Pv(pv) => pv.apply_inverse(std.x, std.y)?,
            _ => (std.x, std.y),
        };

        let v = self.id * Vector2::new(xi, eta);
        let (dx, dy) = match &self.distortion {
            Distortion::Sip(sip) if self.proj.has_sip_base() => sip.apply_inverse(v.x, v.y)?,
            _ => (v.x, v.y),
        };

        Ok(PixelPos::new(dx + self.xcen, dy + self.ycen))
    }

    #[inline]
    fn contains_x(&self, x: f64) -> bool {
        (0.5..=self.xnpix as f64 + 0.5).contains(&x)
    }

    /// Native system → internal (ICRS) frame.
    fn to_internal(&self, sky: SkyPos) -> SkyPos {
        match self.system {
            SkySystem::Icrs | SkySystem::Xy => sky,
            SkySystem::Fk5 => {
                let j2000 = precess_fk5(sky, self.equinox, 2000.0);
                RotationFrames.convert(SkySystem::Fk5, SkySystem::Icrs, j2000)
            }
            other => RotationFrames.convert(other, SkySystem::Icrs, sky),
        }
    }

    /// Internal (ICRS) frame → native system.
    fn from_internal(&self, sky: SkyPos) -> SkyPos {
        match self.system {
            SkySystem::Icrs | SkySystem::Xy => sky,
            SkySystem::Fk5 => {
                let j2000 = RotationFrames.convert(SkySystem::Icrs, SkySystem::Fk5, sky);
                precess_fk5(j2000, 2000.0, self.equinox)
            }
            other => RotationFrames.convert(SkySystem::Icrs, other, sky),
        }
    }

    // ---------------------------------------------------------------------
    // Pure queries
    // ---------------------------------------------------------------------

    /// Absolute pixel scale per axis, degrees per pixel.
    pub fn pixel_scale(&self) -> (f64, f64) {
        (self.inc_a.abs(), self.inc_d.abs())
    }

    /// Field width along the x axis, degrees.
    pub fn field_width(&self) -> f64 {
        self.width_a
    }

    /// Field height along the y axis, degrees.
    pub fn field_height(&self) -> f64 {
        self.width_d
    }

    /// Field rotation, degrees, from the matrix-ratio terms.
    pub fn rotation(&self) -> f64 {
        self.rota
    }

    pub fn system(&self) -> SkySystem {
        self.system
    }

    pub fn projection(&self) -> &ProjectionType {
        &self.proj
    }

    pub fn image_size(&self) -> (u32, u32) {
        (self.xnpix, self.ynpix)
    }

    pub fn reference_pixel(&self) -> PixelPos {
        PixelPos::new(self.xcen, self.ycen)
    }

    /// Reference sky position, native system.
    pub fn reference_sky(&self) -> SkyPos {
        self.crval
    }

    pub fn equinox(&self) -> f64 {
        self.equinox
    }

    pub fn epoch(&self) -> Option<f64> {
        self.epoch
    }

    pub fn origin(&self) -> CalOrigin {
        self.origin
    }

    pub fn distortion(&self) -> &Distortion {
        &self.distortion
    }

    /// The linear matrix, pixel offsets → degrees.
    pub fn cd_matrix(&self) -> Matrix2<f64> {
        self.cd
    }

    /// The inverse linear matrix, degrees → pixel offsets.
    pub fn id_matrix(&self) -> Matrix2<f64> {
        self.id
    }

    /// Sky position of the image center.
    pub fn field_center(&self) -> Result<SkyPos, TransformError> {
        self.pixel_to_sky(PixelPos::new(
            (self.xnpix as f64 + 1.0) / 2.0,
            (self.ynpix as f64 + 1.0) / 2.0,
        ))
    }

    /// Sky positions of the four image corners (bottom-left, bottom-right,
    /// top-left, top-right). A corner outside the projection domain yields
    /// `None`, which is routine for all-sky images.
    pub fn corners(&self) -> [Option<SkyPos>; 4] {
        let w = self.xnpix as f64;
        let h = self.ynpix as f64;
        [
            PixelPos::new(1.0, 1.0),
            PixelPos::new(w, 1.0),
            PixelPos::new(1.0, h),
            PixelPos::new(w, h),
        ]
        .map(|p| self.pixel_to_sky(p).ok())
    }
}

/// Decompose a CD matrix into signed axis steps and a rotation angle.
///
/// Uses the factorization `cd = R(ρ) · diag(inc_a, inc_d)`; the rotation
/// is recovered from the second-row/column ratio with `atan2`, then each
/// step from whichever trigonometric component is better conditioned.
pub(crate) fn derive_scale_rotation(cd: &Matrix2<f64>) -> (f64, f64, f64) {
    let rota = (-cd[(0, 1)]).atan2(cd[(1, 1)]);
    let (sin_r, cos_r) = rota.sin_cos();

    let inc_a = if cos_r.abs() >= sin_r.abs() {
        cd[(0, 0)] / cos_r
    } else {
        cd[(1, 0)] / sin_r
    };
    let inc_d = if cos_r.abs() >= sin_r.abs() {
        cd[(1, 1)] / cos_r
    } else {
        -cd[(0, 1)] / sin_r
    };

    (inc_a, inc_d, rota.to_degrees())
}

/// Compose a CD matrix from signed axis steps and a rotation angle.
pub(crate) fn compose_matrix(inc_a: f64, inc_d: f64, rota_deg: f64) -> Matrix2<f64> {
    let (sin_r, cos_r) = rota_deg.to_radians().sin_cos();
    Matrix2::new(
        inc_a * cos_r,
        -inc_d * sin_r,
        inc_a * sin_r,
        inc_d * cos_r,
    )
}

/// Reference position converted to the internal frame at construction.
fn internal_reference(
    crval: SkyPos,
    system: SkySystem,
    equinox: f64,
    frames: &dyn FrameConverter,
) -> SkyPos {
    match system {
        SkySystem::Icrs | SkySystem::Xy => crval,
        SkySystem::Fk5 => {
            let j2000 = precess_fk5(crval, equinox, 2000.0);
            frames.convert(SkySystem::Fk5, SkySystem::Icrs, j2000)
        }
        other => frames.convert(other, SkySystem::Icrs, crval),
    }
}

/// Explicit-numeric construction of a [`Calibration`].
///
/// ```
/// use skypix::{Calibration, ProjectionType, SkySystem};
///
/// let cal = Calibration::builder(ProjectionType::Tan, SkySystem::Icrs)
///     .image_size(1000, 1000)
///     .reference_pixel(100.0, 100.0)
///     .reference_sky(10.0, 20.0)
///     .scale(-1.0 / 3600.0, 1.0 / 3600.0)
///     .build()
///     .unwrap();
/// assert_eq!(cal.image_size(), (1000, 1000));
/// ```
#[derive(Debug, Clone)]
pub struct CalibrationBuilder {
    proj: ProjectionType,
    system: SkySystem,
    xnpix: u32,
    ynpix: u32,
    xcen: f64,
    ycen: f64,
    crval: SkyPos,
    matrix: Option<Matrix2<f64>>,
    inc_a: f64,
    inc_d: f64,
    rota: f64,
    equinox: f64,
    epoch: Option<f64>,
    distortion: Distortion,
}

impl CalibrationBuilder {
    fn new(proj: ProjectionType, system: SkySystem) -> Self {
        Self {
            proj,
            system,
            xnpix: 0,
            ynpix: 0,
            xcen: 0.0,
            ycen: 0.0,
            crval: SkyPos::new(0.0, 0.0),
            matrix: None,
            inc_a: -1.0,
            inc_d: 1.0,
            rota: 0.0,
            equinox: 2000.0,
            epoch: None,
            distortion: Distortion::None,
        }
    }

    pub fn image_size(mut self, xnpix: u32, ynpix: u32) -> Self {
        self.xnpix = xnpix;
        self.ynpix = ynpix;
        self
    }

    pub fn reference_pixel(mut self, xcen: f64, ycen: f64) -> Self {
        self.xcen = xcen;
        self.ycen = ycen;
        self
    }

    pub fn reference_sky(mut self, lon: f64, lat: f64) -> Self {
        self.crval = SkyPos::new(lon, lat);
        self
    }

    /// Explicit CD matrix; overrides [`scale`](Self::scale) and
    /// [`rotation`](Self::rotation).
    pub fn matrix(mut self, cd: Matrix2<f64>) -> Self {
        self.matrix = Some(cd);
        self
    }

    /// Signed axis steps, degrees per pixel (longitude step is negative
    /// for east-left images).
    pub fn scale(mut self, inc_a: f64, inc_d: f64) -> Self {
        self.inc_a = inc_a;
        self.inc_d = inc_d;
        self
    }

    /// Field rotation in degrees, composed with the axis steps.
    pub fn rotation(mut self, rota: f64) -> Self {
        self.rota = rota;
        self
    }

    pub fn equinox(mut self, equinox: f64) -> Self {
        self.equinox = equinox;
        self
    }

    pub fn epoch(mut self, epoch: f64) -> Self {
        self.epoch = Some(epoch);
        self
    }

    pub fn distortion(mut self, distortion: Distortion) -> Self {
        self.distortion = distortion;
        self
    }

    pub fn build(self) -> Result<Calibration, SkypixError> {
        if self.xnpix == 0 || self.ynpix == 0 {
            return Err(SkypixError::InvalidImageSize(
                self.xnpix as i64,
                self.ynpix as i64,
            ));
        }
        let cd = self
            .matrix
            .unwrap_or_else(|| compose_matrix(self.inc_a, self.inc_d, self.rota));
        Calibration::assemble(CalParts {
            cd,
            xcen: self.xcen,
            ycen: self.ycen,
            crval: self.crval,
            xnpix: self.xnpix,
            ynpix: self.ynpix,
            proj: self.proj,
            system: self.system,
            equinox: self.equinox,
            epoch: self.epoch,
            distortion: self.distortion,
            origin: CalOrigin::Explicit,
        })
    }
}
