use nalgebra::{Matrix3, Vector3};
use rayon::prelude::*;

use prism_core::{Camera, Distortion, Error, FisheyeDistortion, Result};
use prism_imgproc::{BorderMode, Interpolation, Raster};

/// Resample a distorted raster into the frame of its equivalent pinhole
/// camera.
///
/// Builds a dense destination-to-source pixel map by pushing each
/// destination pixel through the inverse of the new calibration and the
/// source camera's distortion model, then remaps the raster. Only
/// perspective, brown and fisheye cameras have a lens to undistort.
pub fn undistort_lens_image(
    image: &Raster,
    camera: &Camera,
    new_camera: &Camera,
    interpolation: Interpolation,
) -> Result<Raster> {
    let width = image.width();
    let height = image.height();

    let k_new = new_camera.k_in_pixel_coordinates(width, height)?;
    let k_new_inv = k_new.try_inverse().ok_or_else(|| {
        Error::InvalidParameters(format!(
            "calibration matrix of camera {} is singular",
            new_camera.id()
        ))
    })?;

    let (map_x, map_y) = match camera {
        Camera::Perspective(cam) => brown_rectify_map(
            (width, height),
            &cam.k_in_pixel_coordinates(width, height),
            &k_new_inv,
            &Distortion::radial(cam.k1, cam.k2),
        ),
        Camera::Brown(cam) => brown_rectify_map(
            (width, height),
            &cam.k_in_pixel_coordinates(width, height),
            &k_new_inv,
            &cam.distortion(),
        ),
        Camera::Fisheye(cam) => fisheye_rectify_map(
            (width, height),
            &cam.k_in_pixel_coordinates(width, height),
            &k_new_inv,
            &cam.distortion(),
        ),
        Camera::Spherical(cam) => {
            return Err(Error::UnsupportedProjection(format!(
                "cannot lens-undistort spherical camera {}",
                cam.id
            )))
        }
    };

    Ok(image.remap(
        &map_x,
        &map_y,
        width,
        height,
        interpolation,
        BorderMode::Constant(0),
    ))
}

/// Destination-to-source pixel map through a radial-tangential model.
fn brown_rectify_map(
    size: (u32, u32),
    k: &Matrix3<f64>,
    k_new_inv: &Matrix3<f64>,
    distortion: &Distortion,
) -> (Vec<f32>, Vec<f32>) {
    rectify_map(size, k, k_new_inv, |x, y| distortion.apply(x, y))
}

/// Destination-to-source pixel map through the equidistant fisheye model.
fn fisheye_rectify_map(
    size: (u32, u32),
    k: &Matrix3<f64>,
    k_new_inv: &Matrix3<f64>,
    distortion: &FisheyeDistortion,
) -> (Vec<f32>, Vec<f32>) {
    rectify_map(size, k, k_new_inv, |x, y| distortion.apply(x, y))
}

fn rectify_map<F>(
    size: (u32, u32),
    k: &Matrix3<f64>,
    k_new_inv: &Matrix3<f64>,
    distort: F,
) -> (Vec<f32>, Vec<f32>)
where
    F: Fn(f64, f64) -> (f64, f64) + Sync,
{
    let (width, height) = size;
    let mut map_x = vec![0.0f32; (width * height) as usize];
    let mut map_y = vec![0.0f32; (width * height) as usize];

    map_x
        .par_chunks_mut(width as usize)
        .zip(map_y.par_chunks_mut(width as usize))
        .enumerate()
        .for_each(|(y, (row_x, row_y))| {
            for x in 0..width {
                let dst = Vector3::new(x as f64, y as f64, 1.0);
                let norm = k_new_inv * dst;
                if norm[2].abs() <= 1e-12 {
                    continue;
                }
                let xn = norm[0] / norm[2];
                let yn = norm[1] / norm[2];
                let (xd, yd) = distort(xn, yn);
                let src = k * Vector3::new(xd, yd, 1.0);
                row_x[x as usize] = src[0] as f32;
                row_y[x as usize] = src[1] as f32;
            }
        });

    (map_x, map_y)
}
