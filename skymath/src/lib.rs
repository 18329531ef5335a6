//! Sky geometry and small numerics shared by the selection-function and
//! anisotropy crates.
//!
//! This crate provides an equal-area sky pixelization with bilinear map
//! interpolation, Euler-angle rotations of sky maps and vector batches,
//! Greenwich Mean Sidereal Time from GPS seconds, and the linear
//! interpolation and adaptive quadrature routines the statistical layers
//! are built on.

pub mod healpix;
pub mod interp;
pub mod quad;
pub mod rotation;
pub mod sidereal;

pub use healpix::Pixelization;
pub use interp::LinearInterp;
pub use quad::adaptive_simpson;
pub use rotation::euler_zyz;
pub use sidereal::{gmst_from_gps, JULIAN_YEAR_SECONDS, SIDEREAL_DAY_SECONDS};
