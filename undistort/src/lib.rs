//! Undistortion of structure-from-motion reconstructions.
//!
//! Re-expresses a solved reconstruction with ideal pinhole cameras and
//! resamples the corresponding imagery: lens undistortion for perspective,
//! brown and fisheye shots, and a six-face cube-map decomposition for
//! spherical panoramas, including re-projection of the feature track graph.

pub mod batch;
pub mod convert;
pub mod dataset;
pub mod lens;
pub mod panorama;
pub mod pipeline;
pub mod tracks;

pub use batch::*;
pub use convert::*;
pub use dataset::*;
pub use lens::*;
pub use panorama::*;
pub use pipeline::*;
pub use tracks::*;

pub use prism_core::{Error, Result};
