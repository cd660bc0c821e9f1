use nalgebra::{Point2, Rotation3, Vector3};
use rayon::prelude::*;

use prism_core::{
    denormalized_image_coordinates, normalized_image_coordinates, Camera, PerspectiveCamera, Pose,
    Shot,
};
use prism_imgproc::{BorderMode, Interpolation, Raster};

/// Id of the synthetic camera shared by all cube-face sub-shots.
pub const PANORAMA_CAMERA_ID: &str = "perspective_panorama_camera";

/// Cube face names, in the fixed sub-shot order.
pub const FACE_NAMES: [&str; 6] = ["front", "left", "back", "right", "top", "bottom"];

/// Split a spherical shot into six 90-degree perspective views sharing one
/// synthetic pinhole camera and the panorama's optical center.
///
/// Faces front/left/back/right look around the vertical axis; top and bottom
/// complete the cube. Together they partition the full viewing sphere.
pub fn perspective_views_of_a_panorama(spherical_shot: &Shot, width: u32) -> (Camera, Vec<Shot>) {
    let camera = Camera::Perspective(PerspectiveCamera {
        id: PANORAMA_CAMERA_ID.to_string(),
        width,
        height: width,
        // focal 0.5 gives a 90-degree field of view in both axes
        focal: 0.5,
        focal_prior: 0.5,
        k1: 0.0,
        k2: 0.0,
        k1_prior: 0.0,
        k2_prior: 0.0,
    });

    let half_pi = std::f64::consts::FRAC_PI_2;
    let rotations = [
        Rotation3::from_axis_angle(&Vector3::y_axis(), -0.0 * half_pi),
        Rotation3::from_axis_angle(&Vector3::y_axis(), -1.0 * half_pi),
        Rotation3::from_axis_angle(&Vector3::y_axis(), -2.0 * half_pi),
        Rotation3::from_axis_angle(&Vector3::y_axis(), -3.0 * half_pi),
        Rotation3::from_axis_angle(&Vector3::x_axis(), -half_pi),
        Rotation3::from_axis_angle(&Vector3::x_axis(), half_pi),
    ];

    let origin = spherical_shot.pose.origin();
    let shots = FACE_NAMES
        .iter()
        .zip(rotations.iter())
        .map(|(name, face_rotation)| {
            let rotation = face_rotation.matrix() * spherical_shot.pose.rotation_matrix();
            Shot {
                id: format!("{}_perspective_view_{}", spherical_shot.id, name),
                camera: PANORAMA_CAMERA_ID.to_string(),
                pose: Pose::from_rotation_origin(rotation, origin),
                metadata: spherical_shot.metadata.clone(),
            }
        })
        .collect();

    (camera, shots)
}

/// Resample a panorama raster into one perspective sub-view.
///
/// Every destination pixel is back-projected through the sub-view camera,
/// rotated into the panorama frame and forward-projected into
/// equirectangular pixel space, then sampled with horizontal wrap-around
/// (longitude wraps, the poles do not).
pub fn render_perspective_view_of_a_panorama(
    image: &Raster,
    panoshot: &Shot,
    pano_camera: &Camera,
    perspectiveshot: &Shot,
    perspective_camera: &Camera,
    interpolation: Interpolation,
) -> Raster {
    let width = perspective_camera.width();
    let height = perspective_camera.height();
    let pano_width = image.width();
    let pano_height = image.height();

    let rotation =
        panoshot.pose.rotation_matrix() * perspectiveshot.pose.rotation_matrix().transpose();

    let mut map_x = vec![0.0f32; (width * height) as usize];
    let mut map_y = vec![0.0f32; (width * height) as usize];

    map_x
        .par_chunks_mut(width as usize)
        .zip(map_y.par_chunks_mut(width as usize))
        .enumerate()
        .for_each(|(y, (row_x, row_y))| {
            for x in 0..width {
                let dst = normalized_image_coordinates(
                    Point2::new(x as f64, y as f64),
                    width,
                    height,
                );
                let bearing = perspective_camera.pixel_bearing(dst);
                let rotated = rotation * bearing;
                let src = pano_camera.project(&rotated);
                let pixel = denormalized_image_coordinates(src, pano_width, pano_height);
                row_x[x as usize] = pixel.x as f32;
                row_y[x as usize] = pixel.y as f32;
            }
        });

    image.remap_ex(
        &map_x,
        &map_y,
        width,
        height,
        interpolation,
        BorderMode::Wrap,
        BorderMode::Replicate,
    )
}
