//! # skypix
//!
//! Astrometric calibration engine: places image pixels and celestial
//! coordinates into correspondence under a calibration model covering 16
//! projection conventions, three nonlinear distortion solutions, and the
//! historical encodings those calibrations ship in (header keyword maps,
//! positional plate-measurement records, spherical-cell bootstrap).
//!
//! The central type is [`Calibration`]: built once through one of its
//! factories, read concurrently through [`Calibration::sky_to_pixel`] /
//! [`Calibration::pixel_to_sky`] and the field-geometry queries, and
//! geometrically transformed through copy-producing mutators
//! (crop/resize/flip/recalibrate).
//!
//! ```
//! use skypix::{Calibration, PixelPos, ProjectionType, SkyPos, SkySystem};
//!
//! let cal = Calibration::builder(ProjectionType::Tan, SkySystem::Icrs)
//!     .image_size(1000, 1000)
//!     .reference_pixel(500.5, 500.5)
//!     .reference_sky(83.633, 22.014)
//!     .scale(-2.8e-4, 2.8e-4)
//!     .build()
//!     .unwrap();
//!
//! let pixel = cal.sky_to_pixel(SkyPos::new(83.633, 22.014)).unwrap();
//! let sky = cal.pixel_to_sky(PixelPos::new(1.0, 1.0)).unwrap();
//! assert!((pixel.x - 500.5).abs() < 1e-9);
//! assert!(sky.lat < 22.014);
//! ```

pub mod calibration;
pub mod constants;
mod conversion;
pub mod coord;
pub mod distortion;
pub mod frames;
pub mod ingest;
pub mod mutators;
pub mod projection;
pub mod skypix_errors;

pub use calibration::{CalOrigin, Calibration, CalibrationBuilder};
pub use conversion::{parse_dec_to_deg, parse_ra_to_deg};
pub use coord::{PixelOffset, PixelPos, SkyPos, StandardPos};
pub use distortion::{Distortion, PlatePoly, PvPoly, SipPoly};
pub use frames::{precess_fk5, FrameConverter, RotationFrames, SkySystem};
pub use ingest::{CardValue, CellGeometry, HeaderMap, HeaderProvider};
pub use mutators::FlipAxis;
pub use projection::ProjectionType;
pub use skypix_errors::{SkypixError, TransformError};
