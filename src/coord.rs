//! Coordinate value types for the three stages of the transform chain.
//!
//! Pixel space, standard-plane (intermediate) space, and celestial space
//! each get their own type; a value can only move between stages through
//! the named transform functions, so a position always knows what it is.

use serde::{Deserialize, Serialize};

use crate::constants::{Degree, DPI};

/// A 1-based pixel position, FITS convention: the center of the bottom-left
/// pixel is (1.0, 1.0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelPos {
    pub x: f64,
    pub y: f64,
}

impl PixelPos {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Offset of this position from a reference pixel.
    #[inline]
    pub fn offset_from(&self, xcen: f64, ycen: f64) -> PixelOffset {
        PixelOffset {
            dx: self.x - xcen,
            dy: self.y - ycen,
        }
    }
}

/// A pixel offset from the reference pixel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PixelOffset {
    pub dx: f64,
    pub dy: f64,
}

impl PixelOffset {
    #[inline]
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    #[inline]
    pub fn to_pixel(self, xcen: f64, ycen: f64) -> PixelPos {
        PixelPos {
            x: self.dx + xcen,
            y: self.dy + ycen,
        }
    }
}

/// Standard-plane (intermediate) coordinates in degrees: the tangent-plane
/// offsets produced by a projection, before or after distortion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardPos {
    pub x: Degree,
    pub y: Degree,
}

impl StandardPos {
    #[inline]
    pub fn new(x: Degree, y: Degree) -> Self {
        Self { x, y }
    }
}

/// A celestial position in degrees: longitude in `[0, 360)`, latitude in
/// `[-90, +90]`. The reference frame is carried by the calibration model,
/// not by the value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyPos {
    pub lon: Degree,
    pub lat: Degree,
}

impl SkyPos {
    /// Build a sky position, normalizing the longitude into `[0, 360)`.
    #[inline]
    pub fn new(lon: Degree, lat: Degree) -> Self {
        Self {
            lon: normalize_lon(lon),
            lat,
        }
    }

    /// Build from radians, normalizing the longitude.
    #[inline]
    pub fn from_radians(lon_rad: f64, lat_rad: f64) -> Self {
        Self::new(lon_rad.to_degrees(), lat_rad.to_degrees())
    }

    /// Angular separation from another position, in degrees.
    pub fn separation(&self, other: &SkyPos) -> Degree {
        let (sin_d1, cos_d1) = self.lat.to_radians().sin_cos();
        let (sin_d2, cos_d2) = other.lat.to_radians().sin_cos();
        let cos_da = (self.lon - other.lon).to_radians().cos();
        (sin_d1 * sin_d2 + cos_d1 * cos_d2 * cos_da)
            .clamp(-1.0, 1.0)
            .acos()
            .to_degrees()
    }
}

/// Normalize a longitude in degrees into `[0, 360)`.
#[inline]
pub fn normalize_lon(lon: Degree) -> Degree {
    let l = lon.to_radians().rem_euclid(DPI).to_degrees();
    if l >= 360.0 {
        0.0
    } else {
        l
    }
}

/// Principal value of a longitude difference, in `[-180, 180]` degrees.
#[inline]
pub fn lon_diff(a: Degree, b: Degree) -> Degree {
    let mut d = normalize_lon(a) - normalize_lon(b);
    if d > 180.0 {
        d -= 360.0;
    } else if d < -180.0 {
        d += 360.0;
    }
    d
}
