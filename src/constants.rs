//! # Constants and type definitions for skypix
//!
//! This module centralizes the **angular constants**, **conversion factors**, and
//! **common type aliases** used throughout the `skypix` library.
//!
//! ## Overview
//!
//! - Degree/radian/arcsecond conversion factors
//! - Plate-scale unit aliases (millimetres, microns)
//! - Tolerances shared by the iterative inversions
//!
//! These definitions are used by the projection core, the distortion
//! subsystem, and the legacy ingestion paths.

// -------------------------------------------------------------------------------------------------
// Angular constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for longitude normalization
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Radians → degrees
pub const DEGRAD: f64 = 180.0 / std::f64::consts::PI;

/// Arcseconds → radians
pub const RADSEC: f64 = std::f64::consts::PI / 648000.0;

/// One milliarcsecond in degrees
pub const MAS: f64 = 1.0 / 3_600_000.0;

/// Iteration cap shared by every bounded inversion (ZPN radius, SIP and PV
/// Newton loops; the Mollweide auxiliary-angle refinement runs fewer).
pub const MAX_INVERSION_STEPS: usize = 20;

/// Convergence tolerance for the bounded inversions, in the unit of the
/// iterated quantity (radians or pixels).
pub const INVERSION_TOL: f64 = 1e-12;

/// Determinant threshold below which a 2×2 calibration matrix is treated as
/// singular.
pub const DET_EPSILON: f64 = 1e-15;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Length in millimetres (plate space)
pub type Millimeter = f64;
/// Length in microns (plate space)
pub type Micron = f64;
