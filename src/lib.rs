pub use prism_core as core;
pub use prism_imgproc as imgproc;
pub use prism_undistort as undistort;
