//! # Geometric mutators
//!
//! Copy-producing transforms of a [`Calibration`]: crop, resize, flip and
//! recalibration from measured points. Every mutator tears the model into
//! its assembler parts, edits them, and rebuilds through the same single
//! construction path as the factories. The matrix/inverse/derived-scale
//! invariants therefore hold after every call, and a partially-updated
//! model can never be observed.

use crate::calibration::{compose_matrix, derive_scale_rotation, Calibration};
use crate::coord::{PixelOffset, StandardPos};
use crate::distortion::Distortion;
use crate::skypix_errors::SkypixError;

/// Mirror axis of [`Calibration::flip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlipAxis {
    /// Mirror left-right (x axis reversed).
    Horizontal,
    /// Mirror top-bottom (y axis reversed).
    Vertical,
}

impl Calibration {
    /// Extract a sub-image calibration.
    ///
    /// `x0`/`y0` are the parent-pixel coordinates of the sub-image origin
    /// (new pixel `(1,1)` sits at parent `(x0 + 1, y0 + 1)`), `w`/`h` its
    /// size. The reference pixel shifts accordingly; field width/height
    /// are re-derived from the new size.
    pub fn crop(&self, x0: f64, y0: f64, w: u32, h: u32) -> Result<Calibration, SkypixError> {
        if w == 0 || h == 0 {
            return Err(SkypixError::InvalidCropWindow(w as i64, h as i64));
        }
        let mut parts = self.parts();
        parts.xcen -= x0;
        parts.ycen -= y0;
        parts.xnpix = w;
        parts.ynpix = h;
        if let Distortion::Plate(plate) = &mut parts.distortion {
            plate.corner_um.0 += x0 * plate.pitch_um.0;
            plate.corner_um.1 += y0 * plate.pitch_um.1;
        }
        Calibration::assemble(parts)
    }

    /// Rescale the pixel grid by `factor` (integer or fractional).
    ///
    /// The matrix is scaled by the inverse factor, the reference pixel by
    /// the factor, and the dimensions are rounded.
    pub fn resize(&self, factor: f64) -> Result<Calibration, SkypixError> {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(SkypixError::InvalidResizeFactor(factor));
        }
        let mut parts = self.parts();
        parts.cd /= factor;
        parts.xcen *= factor;
        parts.ycen *= factor;
        parts.xnpix = (parts.xnpix as f64 * factor).round() as u32;
        parts.ynpix = (parts.ynpix as f64 * factor).round() as u32;
        if let Distortion::Plate(plate) = &mut parts.distortion {
            plate.pitch_um.0 /= factor;
            plate.pitch_um.1 /= factor;
        }
        Calibration::assemble(parts)
    }

    /// Crop then rescale, in one call.
    pub fn crop_and_zoom(
        &self,
        x0: f64,
        y0: f64,
        w: u32,
        h: u32,
        factor: f64,
    ) -> Result<Calibration, SkypixError> {
        self.crop(x0, y0, w, h)?.resize(factor)
    }

    /// Mirror the image along one axis.
    ///
    /// The corresponding matrix column is negated and the reference pixel
    /// re-centered with `size − (center − 1)`; applying the same flip
    /// twice restores the original transform.
    pub fn flip(&self, axis: FlipAxis) -> Result<Calibration, SkypixError> {
        let mut parts = self.parts();
        match axis {
            FlipAxis::Horizontal => {
                parts.cd[(0, 0)] = -parts.cd[(0, 0)];
                parts.cd[(1, 0)] = -parts.cd[(1, 0)];
                parts.xcen = parts.xnpix as f64 - (parts.xcen - 1.0);
                if let Distortion::Plate(plate) = &mut parts.distortion {
                    plate.corner_um.0 += (parts.xnpix as f64 - 1.0) * plate.pitch_um.0;
                    plate.pitch_um.0 = -plate.pitch_um.0;
                }
            }
            FlipAxis::Vertical => {
                parts.cd[(0, 1)] = -parts.cd[(0, 1)];
                parts.cd[(1, 1)] = -parts.cd[(1, 1)];
                parts.ycen = parts.ynpix as f64 - (parts.ycen - 1.0);
                if let Distortion::Plate(plate) = &mut parts.distortion {
                    plate.corner_um.1 += (parts.ynpix as f64 - 1.0) * plate.pitch_um.1;
                    plate.pitch_um.1 = -plate.pitch_um.1;
                }
            }
        }
        Calibration::assemble(parts)
    }

    /// Refine the center and matrix from measured (pixel offset,
    /// standard-plane) pairs.
    ///
    /// The fit is a 2-parameter linear solution (one scale per axis, not
    /// a full affine), performed in the de-rotated frame and recomposed
    /// with the current rotation. The sign of each fitted scale follows
    /// the dominant sign of the sampled `standard·offset` products; a tie
    /// keeps the current matrix sign.
    ///
    /// Errors
    /// ------
    /// * [`SkypixError::NotEnoughPoints`] – fewer than 2 samples with a
    ///   usable offset on either axis.
    pub fn recalibrate(
        &self,
        points: &[(PixelOffset, StandardPos)],
    ) -> Result<Calibration, SkypixError> {
        let rota = self.rotation();
        let (sin_r, cos_r) = rota.to_radians().sin_cos();
        let (cur_a, cur_d, _) = derive_scale_rotation(&self.cd_matrix());

        // De-rotated standard coordinates, paired with the raw offsets.
        let samples: Vec<(f64, f64, f64, f64)> = points
            .iter()
            .map(|(off, std)| {
                let sx = cos_r * std.x + sin_r * std.y;
                let sy = -sin_r * std.x + cos_r * std.y;
                (off.dx, off.dy, sx, sy)
            })
            .collect();

        let (inc_a, off_x) = fit_axis(
            samples.iter().map(|&(dx, _, sx, _)| (dx, sx)),
            cur_a.signum(),
        )?;
        let (inc_d, off_y) = fit_axis(
            samples.iter().map(|&(_, dy, _, sy)| (dy, sy)),
            cur_d.signum(),
        )?;

        let mut parts = self.parts();
        parts.cd = compose_matrix(inc_a, inc_d, rota);
        parts.xcen -= off_x / inc_a;
        parts.ycen -= off_y / inc_d;
        Calibration::assemble(parts)
    }
}

/// Per-axis least-squares line `s = slope·d + intercept` with the sign
/// tie-break policy on the slope.
fn fit_axis(
    samples: impl Iterator<Item = (f64, f64)>,
    current_sign: f64,
) -> Result<(f64, f64), SkypixError> {
    let mut n = 0usize;
    let mut sum_d = 0.0;
    let mut sum_s = 0.0;
    let mut sum_dd = 0.0;
    let mut sum_sd = 0.0;
    let mut positive = 0usize;
    let mut negative = 0usize;

    for (d, s) in samples {
        n += 1;
        sum_d += d;
        sum_s += s;
        sum_dd += d * d;
        sum_sd += s * d;
        match (s * d).partial_cmp(&0.0) {
            Some(std::cmp::Ordering::Greater) => positive += 1,
            Some(std::cmp::Ordering::Less) => negative += 1,
            _ => {}
        }
    }

    let denom = n as f64 * sum_dd - sum_d * sum_d;
    if n < 2 || denom.abs() < 1e-12 {
        return Err(SkypixError::NotEnoughPoints(n));
    }

    let fitted = (n as f64 * sum_sd - sum_s * sum_d) / denom;
    if fitted == 0.0 {
        return Err(SkypixError::NotEnoughPoints(n));
    }
    let sign = match positive.cmp(&negative) {
        std::cmp::Ordering::Greater => 1.0,
        std::cmp::Ordering::Less => -1.0,
        std::cmp::Ordering::Equal => current_sign,
    };
    let slope = sign * fitted.abs();
    let intercept = (sum_s - slope * sum_d) / n as f64;
    Ok((slope, intercept))
}
