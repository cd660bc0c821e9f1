pub mod camera;
pub mod geometry;
pub mod reconstruction;
pub mod tracks;

pub use camera::*;
pub use geometry::*;
pub use reconstruction::*;
pub use tracks::*;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unsupported projection: {0}")]
    UnsupportedProjection(String),

    #[error("Camera not found: {0}")]
    MissingCamera(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
