//! # Legacy ingestion and emission
//!
//! The four ways a calibration enters or leaves the crate besides the
//! explicit builder: header keyword maps (in both directions), positional
//! plate-measurement streams, and spherical-cell bootstrap geometry. The
//! historical matching heuristics shared by these readers live in
//! `compat`.

pub(crate) mod compat;
pub mod header;
mod cell;
mod plate;

pub use cell::CellGeometry;
pub use header::{CardValue, HeaderMap, HeaderProvider};
