//! PV/TPV polynomial distortion on standard-plane coordinates.
//!
//! Applied after the base gnomonic projection: the projected `(ξ, η)` pair
//! is pushed through one ≤12-term polynomial per axis (including the
//! radial terms). Per the TPV convention the latitude polynomial receives
//! its arguments swapped, `(η, ξ)`.

use smallvec::SmallVec;

use crate::constants::{INVERSION_TOL, MAX_INVERSION_STEPS};
use crate::skypix_errors::TransformError;

use super::poly_eval;

/// PV coefficient vectors for the two standard-plane axes.
#[derive(Debug, Clone, PartialEq)]
pub struct PvPoly {
    pv1: SmallVec<[f64; 12]>,
    pv2: SmallVec<[f64; 12]>,
}

impl PvPoly {
    /// Build from raw coefficient slices (at most 12 terms are kept).
    pub fn new(pv1: &[f64], pv2: &[f64]) -> Self {
        Self {
            pv1: SmallVec::from_slice(&pv1[..pv1.len().min(12)]),
            pv2: SmallVec::from_slice(&pv2[..pv2.len().min(12)]),
        }
    }

    /// The distortion-free polynomial pair (`ξ' = ξ`, `η' = η`).
    pub fn identity() -> Self {
        Self::new(&[0.0, 1.0], &[0.0, 1.0])
    }

    pub fn pv1(&self) -> &[f64] {
        &self.pv1
    }

    pub fn pv2(&self) -> &[f64] {
        &self.pv2
    }

    /// Forward correction of a standard-plane pair (degrees in, degrees
    /// out).
    pub fn apply(&self, xi: f64, eta: f64) -> (f64, f64) {
        (poly_eval(&self.pv1, xi, eta), poly_eval(&self.pv2, eta, xi))
    }

    /// Invert the forward correction by Newton iteration.
    ///
    /// The Jacobian is built numerically and the start point is the input
    /// corrected for the constant terms. The 20-step budget applies; the
    /// last iterate is returned on non-convergence, a singular Jacobian is
    /// [`TransformError::NoSolution`].
    pub fn apply_inverse(&self, xi_d: f64, eta_d: f64) -> Result<(f64, f64), TransformError> {
        let c1 = self.pv1.first().copied().unwrap_or(0.0);
        let c2 = self.pv2.first().copied().unwrap_or(0.0);
        let mut xi = xi_d - c1;
        let mut eta = eta_d - c2;

        for _ in 0..MAX_INVERSION_STEPS {
            let (fx, fy) = self.apply(xi, eta);
            let rx = fx - xi_d;
            let ry = fy - eta_d;

            let h = 1e-7 * xi.abs().max(eta.abs()).max(1.0);
            let (fxu, fyu) = self.apply(xi + h, eta);
            let (fxv, fyv) = self.apply(xi, eta + h);
            let j00 = (fxu - fx) / h;
            let j10 = (fyu - fy) / h;
            let j01 = (fxv - fx) / h;
            let j11 = (fyv - fy) / h;

            let det = j00 * j11 - j01 * j10;
            if det.abs() < 1e-12 {
                return Err(TransformError::NoSolution);
            }

            let dx = (j11 * rx - j01 * ry) / det;
            let dy = (j00 * ry - j10 * rx) / det;
            xi -= dx;
            eta -= dy;

            if dx.abs() < INVERSION_TOL && dy.abs() < INVERSION_TOL {
                break;
            }
        }
        Ok((xi, eta))
    }
}

#[cfg(test)]
mod pv_test {
    use super::*;

    #[test]
    fn test_identity() {
        let pv = PvPoly::identity();
        let (xi, eta) = pv.apply(0.25, -0.75);
        assert_eq!(xi, 0.25);
        assert_eq!(eta, -0.75);
    }

    #[test]
    fn test_axis_swap_convention() {
        // PV2_1 multiplies η, not ξ.
        let pv = PvPoly::new(&[0.0, 1.0], &[0.0, 2.0]);
        let (xi, eta) = pv.apply(0.3, 0.1);
        assert_eq!(xi, 0.3);
        assert_eq!(eta, 0.2);
    }

    #[test]
    fn test_radial_term() {
        let pv = PvPoly::new(&[0.0, 1.0, 0.0, 0.01], &[0.0, 1.0]);
        let (xi, _) = pv.apply(0.3, 0.4);
        assert!((xi - (0.3 + 0.01 * 0.5)).abs() < 1e-15);
    }

    #[test]
    fn test_newton_inverse_roundtrip() {
        let pv = PvPoly::new(
            &[1e-4, 1.0002, 1e-5, 2e-4, 3e-4, -1e-4, 5e-5],
            &[-2e-4, 0.9998, -2e-5, 1e-4, -1e-4, 2e-4, 1e-4],
        );
        for (xi, eta) in [(0.4, 0.3), (-0.8, 0.1), (0.05, -0.9)] {
            let (xd, yd) = pv.apply(xi, eta);
            let (xb, yb) = pv.apply_inverse(xd, yd).unwrap();
            assert!((xb - xi).abs() < 1e-10, "xi roundtrip at ({xi}, {eta})");
            assert!((yb - eta).abs() < 1e-10, "eta roundtrip at ({xi}, {eta})");
        }
    }

    #[test]
    fn test_degenerate_jacobian() {
        // Constant polynomials squash the plane to a point.
        let pv = PvPoly::new(&[0.5], &[0.5]);
        assert_eq!(
            pv.apply_inverse(0.5, 0.5).unwrap_err(),
            TransformError::NoSolution
        );
    }
}
