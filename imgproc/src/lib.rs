pub mod raster;
pub mod remap;
pub mod resize;
pub mod sample;

pub use raster::*;
pub use remap::*;
pub use resize::*;
pub use sample::*;
