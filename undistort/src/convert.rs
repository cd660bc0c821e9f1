use prism_core::{BrownCamera, Camera, FisheyeCamera, PerspectiveCamera};

/// Equivalent ideal pinhole camera for a brown camera: same id and size,
/// focal length averaged over the two axes, zero distortion.
pub fn perspective_camera_from_brown(brown: &BrownCamera) -> Camera {
    Camera::Perspective(PerspectiveCamera {
        id: brown.id.clone(),
        width: brown.width,
        height: brown.height,
        focal: (brown.focal_x + brown.focal_y) / 2.0,
        focal_prior: (brown.focal_x_prior + brown.focal_y_prior) / 2.0,
        k1: 0.0,
        k2: 0.0,
        k1_prior: 0.0,
        k2_prior: 0.0,
    })
}

/// Equivalent ideal pinhole camera for a fisheye camera: focal length and
/// prior copied unchanged, zero distortion.
pub fn perspective_camera_from_fisheye(fisheye: &FisheyeCamera) -> Camera {
    Camera::Perspective(PerspectiveCamera {
        id: fisheye.id.clone(),
        width: fisheye.width,
        height: fisheye.height,
        focal: fisheye.focal,
        focal_prior: fisheye.focal_prior,
        k1: 0.0,
        k2: 0.0,
        k1_prior: 0.0,
        k2_prior: 0.0,
    })
}
