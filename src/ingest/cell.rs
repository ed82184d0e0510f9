//! # Spherical-cell bootstrap
//!
//! Coverage maps tile the sphere into nested cells; before a cell's image
//! exists, its drawing layer needs a calibration for it. The
//! [`CellGeometry`] collaborator supplies the cell's center and 8 border
//! vertices on the unit sphere, and
//! [`from_spherical_cell`](Calibration::from_spherical_cell) derives an
//! approximate TAN calibration from them: tangent plane at the center,
//! scale from the projected border extent.

use crate::calibration::{CalOrigin, CalParts, Calibration};
use crate::coord::SkyPos;
use crate::distortion::Distortion;
use crate::frames::SkySystem;
use crate::projection::{ProjectionType, RefTrig};
use crate::skypix_errors::SkypixError;

use nalgebra::Matrix2;

/// Geometry provider for a nested spherical tessellation.
///
/// `cell(order, index)` returns the cell's center and its 8 border
/// vertices (corners and edge midpoints), or `None` when the index does
/// not exist at that order. Positions are in the frame the provider was
/// built for.
pub trait CellGeometry {
    fn cell(&self, order: u32, index: u64) -> Option<(SkyPos, [SkyPos; 8])>;
}

impl Calibration {
    /// Derive an approximate TAN calibration covering one cell of a
    /// spherical tessellation, `size`×`size` pixels, in the given system.
    pub fn from_spherical_cell(
        geometry: &impl CellGeometry,
        order: u32,
        index: u64,
        system: SkySystem,
        size: u32,
    ) -> Result<Calibration, SkypixError> {
        let (center, border) = geometry
            .cell(order, index)
            .ok_or(SkypixError::InvalidCellIndex { order, index })?;
        if size == 0 {
            return Err(SkypixError::InvalidImageSize(0, 0));
        }

        // Project the border onto the tangent plane at the center; the
        // half-extent fixes the pixel scale.
        let rt = RefTrig::new(center);
        let mut half_extent = 0.0_f64;
        for vertex in border {
            if let Ok(std) = ProjectionType::Tan.project(&rt, vertex) {
                half_extent = half_extent.max(std.x.abs()).max(std.y.abs());
            }
        }
        if half_extent == 0.0 {
            return Err(SkypixError::InvalidCellIndex { order, index });
        }

        let step = 2.0 * half_extent / size as f64;
        let center_pix = (size as f64 + 1.0) / 2.0;

        Calibration::assemble(CalParts {
            cd: Matrix2::new(-step, 0.0, 0.0, step),
            xcen: center_pix,
            ycen: center_pix,
            crval: center,
            xnpix: size,
            ynpix: size,
            proj: ProjectionType::Tan,
            system,
            equinox: 2000.0,
            epoch: None,
            distortion: Distortion::None,
            origin: CalOrigin::SphericalCell,
        })
    }
}

#[cfg(test)]
mod cell_test {
    use super::*;
    use crate::coord::PixelPos;
    use approx::assert_relative_eq;

    /// A toy tessellation: cell 0 is a square of side `90/2^order`
    /// degrees centered on (45, 0).
    struct SquareCells;

    impl CellGeometry for SquareCells {
        fn cell(&self, order: u32, index: u64) -> Option<(SkyPos, [SkyPos; 8])> {
            if index != 0 {
                return None;
            }
            let half = 45.0 / 2f64.powi(order as i32);
            let center = SkyPos::new(45.0, 0.0);
            let at = |dl: f64, db: f64| SkyPos::new(45.0 + dl * half, db * half);
            Some((
                center,
                [
                    at(-1.0, -1.0),
                    at(0.0, -1.0),
                    at(1.0, -1.0),
                    at(1.0, 0.0),
                    at(1.0, 1.0),
                    at(0.0, 1.0),
                    at(-1.0, 1.0),
                    at(-1.0, 0.0),
                ],
            ))
        }
    }

    #[test]
    fn test_cell_center_maps_to_image_center() {
        let cal = Calibration::from_spherical_cell(&SquareCells, 3, 0, SkySystem::Icrs, 512)
            .unwrap();
        assert_eq!(cal.origin(), CalOrigin::SphericalCell);
        assert_eq!(cal.image_size(), (512, 512));

        let p = cal.sky_to_pixel(SkyPos::new(45.0, 0.0)).unwrap();
        assert_relative_eq!(p.x, 256.5, epsilon = 1e-9);
        assert_relative_eq!(p.y, 256.5, epsilon = 1e-9);
    }

    #[test]
    fn test_cell_border_fits_in_image() {
        let cal = Calibration::from_spherical_cell(&SquareCells, 2, 0, SkySystem::Icrs, 256)
            .unwrap();
        let (_, border) = SquareCells.cell(2, 0).unwrap();
        for vertex in border {
            let p = cal.sky_to_pixel(vertex).unwrap();
            assert!(
                (0.4..=256.6).contains(&p.x) && (0.4..=256.6).contains(&p.y),
                "vertex at ({}, {}) outside the image",
                p.x,
                p.y
            );
        }
    }

    #[test]
    fn test_cell_scale_shrinks_with_order() {
        let coarse =
            Calibration::from_spherical_cell(&SquareCells, 1, 0, SkySystem::Icrs, 128).unwrap();
        let fine =
            Calibration::from_spherical_cell(&SquareCells, 4, 0, SkySystem::Icrs, 128).unwrap();
        assert!(coarse.pixel_scale().0 > fine.pixel_scale().0 * 7.0);
    }

    #[test]
    fn test_unknown_cell_index() {
        let res = Calibration::from_spherical_cell(&SquareCells, 2, 99, SkySystem::Icrs, 128);
        assert!(matches!(
            res,
            Err(SkypixError::InvalidCellIndex { order: 2, index: 99 })
        ));
    }
}
