//! Legacy plate-solution transform.
//!
//! Schmidt-plate calibrations relate standard coordinates to measured
//! plate positions through a polynomial pair supplied by the measurement
//! record: a 10-term sky→plate solution and a 12-term plate→sky solution,
//! both over the shared basis of [`poly_eval`]. The two directions are
//! therefore closed-form; no iteration is involved.
//!
//! Units inside this type are already normalized (ingestion converts
//! microns and metres once): focal length in millimetres, plate positions
//! in millimetres from the plate center, pixel pitch and offsets in
//! microns.

use smallvec::SmallVec;

use crate::coord::{PixelPos, StandardPos};

use super::poly_eval;

/// Plate polynomial solution plus the measurement geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct PlatePoly {
    /// Focal length, millimetres.
    pub focal_mm: f64,
    /// Pixel pitch, microns per pixel, per axis.
    pub pitch_um: (f64, f64),
    /// Plate-micron coordinate of the image corner (pixel 1,1).
    pub corner_um: (f64, f64),
    /// Plate-micron coordinate of the plate center.
    pub center_um: (f64, f64),
    /// Sky→plate solution, 10 terms per axis, millimetres out.
    sky_to_plate: (SmallVec<[f64; 12]>, SmallVec<[f64; 12]>),
    /// Plate→sky solution, 12 terms per axis, focal-normalized radians
    /// out.
    plate_to_sky: (SmallVec<[f64; 12]>, SmallVec<[f64; 12]>),
}

impl PlatePoly {
    pub fn new(
        focal_mm: f64,
        pitch_um: (f64, f64),
        corner_um: (f64, f64),
        center_um: (f64, f64),
        sky_to_plate_x: &[f64],
        sky_to_plate_y: &[f64],
        plate_to_sky_x: &[f64],
        plate_to_sky_y: &[f64],
    ) -> Self {
        let clip = |c: &[f64]| SmallVec::from_slice(&c[..c.len().min(12)]);
        Self {
            focal_mm,
            pitch_um,
            corner_um,
            center_um,
            sky_to_plate: (clip(sky_to_plate_x), clip(sky_to_plate_y)),
            plate_to_sky: (clip(plate_to_sky_x), clip(plate_to_sky_y)),
        }
    }

    pub fn sky_to_plate(&self) -> (&[f64], &[f64]) {
        (&self.sky_to_plate.0, &self.sky_to_plate.1)
    }

    pub fn plate_to_sky(&self) -> (&[f64], &[f64]) {
        (&self.plate_to_sky.0, &self.plate_to_sky.1)
    }

    /// Ideal scale of the plate, degrees per pixel on the x axis.
    pub fn scale_deg_per_pixel(&self) -> f64 {
        (self.pitch_um.0 / 1000.0 / self.focal_mm).to_degrees()
    }

    /// Standard coordinates (degrees) → pixel, through the 10-term
    /// solution.
    pub fn standard_to_pixel(&self, std: StandardPos) -> PixelPos {
        // Ideal gnomonic position on the plate, millimetres.
        let x_id = self.focal_mm * std.x.to_radians();
        let y_id = self.focal_mm * std.y.to_radians();

        let x_mm = poly_eval(&self.sky_to_plate.0, x_id, y_id);
        let y_mm = poly_eval(&self.sky_to_plate.1, x_id, y_id);

        let x_um = x_mm * 1000.0 + self.center_um.0;
        let y_um = y_mm * 1000.0 + self.center_um.1;

        PixelPos::new(
            (x_um - self.corner_um.0) / self.pitch_um.0 + 1.0,
            (y_um - self.corner_um.1) / self.pitch_um.1 + 1.0,
        )
    }

    /// Pixel → standard coordinates (degrees), through the 12-term
    /// solution.
    pub fn pixel_to_standard(&self, pixel: PixelPos) -> StandardPos {
        let x_um = (pixel.x - 1.0) * self.pitch_um.0 + self.corner_um.0;
        let y_um = (pixel.y - 1.0) * self.pitch_um.1 + self.corner_um.1;

        let x_mm = (x_um - self.center_um.0) / 1000.0;
        let y_mm = (y_um - self.center_um.1) / 1000.0;

        let xi = poly_eval(&self.plate_to_sky.0, x_mm, y_mm) / self.focal_mm;
        let eta = poly_eval(&self.plate_to_sky.1, x_mm, y_mm) / self.focal_mm;
        StandardPos::new(xi.to_degrees(), eta.to_degrees())
    }
}

#[cfg(test)]
mod plate_test {
    use super::*;
    use approx::assert_relative_eq;

    /// A pure linear plate: 1 m focal length, 15 µm pixels, centered
    /// geometry.
    fn linear_plate() -> PlatePoly {
        PlatePoly::new(
            1000.0,
            (15.0, 15.0),
            (-7500.0, -7500.0),
            (0.0, 0.0),
            &[0.0, 1.0],
            &[0.0, 0.0, 1.0],
            &[0.0, 1.0],
            &[0.0, 0.0, 1.0],
        )
    }

    #[test]
    fn test_linear_plate_center_pixel() {
        let plate = linear_plate();
        let p = plate.standard_to_pixel(StandardPos::new(0.0, 0.0));
        assert_relative_eq!(p.x, 501.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 501.0, epsilon = 1e-12);
    }

    #[test]
    fn test_linear_plate_scale_matches_focal_and_pitch() {
        let plate = linear_plate();
        // 15 µm on a 1 m focal length: 3.0938 arcsec per pixel.
        let arcsec_per_pix = plate.scale_deg_per_pixel() * 3600.0;
        assert_relative_eq!(arcsec_per_pix, 3.09375, epsilon = 1e-3);

        let one_pix = plate.standard_to_pixel(StandardPos::new(plate.scale_deg_per_pixel(), 0.0));
        assert_relative_eq!(one_pix.x, 502.0, epsilon = 1e-9);
    }

    #[test]
    fn test_linear_plate_roundtrip() {
        let plate = linear_plate();
        for (x, y) in [(0.2, -0.1), (-0.45, 0.3), (0.0, 0.49)] {
            let std = StandardPos::new(x, y);
            let pix = plate.standard_to_pixel(std);
            let back = plate.pixel_to_standard(pix);
            assert_relative_eq!(back.x, std.x, epsilon = 1e-10);
            assert_relative_eq!(back.y, std.y, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_cubic_terms_participate() {
        let mut fwd_x = vec![0.0, 1.0];
        fwd_x.resize(8, 0.0);
        fwd_x[7] = 1e-6; // x³ term in mm
        let plate = PlatePoly::new(
            1000.0,
            (15.0, 15.0),
            (-7500.0, -7500.0),
            (0.0, 0.0),
            &fwd_x,
            &[0.0, 0.0, 1.0],
            &[0.0, 1.0],
            &[0.0, 0.0, 1.0],
        );
        let linear = linear_plate();
        let std = StandardPos::new(0.5, 0.0);
        let bent = plate.standard_to_pixel(std);
        let straight = linear.standard_to_pixel(std);
        assert!((bent.x - straight.x).abs() > 1e-3);
        assert_eq!(bent.y, straight.y);
    }
}
