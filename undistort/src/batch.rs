use std::collections::BTreeMap;

use log::{debug, warn};
use rayon::prelude::*;

use prism_core::{Camera, Error, Reconstruction, Result, Shot};
use prism_imgproc::{scale_image, Interpolation, Raster};

use crate::dataset::{DataSet, ImageFormat};
use crate::lens::undistort_lens_image;
use crate::panorama::render_perspective_view_of_a_panorama;
use crate::pipeline::UndistortedShotMapping;

/// Undistort one raster of a shot into its undistorted shot(s).
///
/// Lens cameras produce a single output keyed by the shot id; spherical
/// shots are first resized to the panorama working resolution (4x the
/// sub-shot width, 2:1 aspect) and then rendered into each cube face, keyed
/// by sub-shot id.
pub fn undistort_image(
    shot: &Shot,
    camera: &Camera,
    undistorted_shots: &[(&Shot, &Camera)],
    original: &Raster,
    interpolation: Interpolation,
    image_scale: f64,
    subshot_width: u32,
) -> Result<BTreeMap<String, Raster>> {
    let mut outputs = BTreeMap::new();
    match camera {
        Camera::Perspective(_) | Camera::Brown(_) | Camera::Fisheye(_) => {
            let (_, new_camera) = undistorted_shots.first().ok_or_else(|| {
                Error::InvalidParameters(format!("no undistorted shot for {}", shot.id))
            })?;
            let undistorted = undistort_lens_image(original, camera, new_camera, interpolation)?;
            outputs.insert(shot.id.clone(), scale_image(&undistorted, image_scale));
        }
        Camera::Spherical(_) => {
            let width = 4 * subshot_width;
            let height = width / 2;
            let resized = original.resize(width, height, interpolation);
            // Area filtering is undefined for the backward-mapping render
            // step; substitute linear there.
            let render_interpolation = if interpolation == Interpolation::Area {
                Interpolation::Linear
            } else {
                interpolation
            };
            for (subshot, sub_camera) in undistorted_shots {
                let rendered = render_perspective_view_of_a_panorama(
                    &resized,
                    shot,
                    camera,
                    subshot,
                    sub_camera,
                    render_interpolation,
                );
                outputs.insert(subshot.id.clone(), scale_image(&rendered, image_scale));
            }
        }
    }
    Ok(outputs)
}

/// Undistort the color image, mask and segmentation of every shot, one
/// worker-pool task per shot.
///
/// Tasks only read shared immutable state and write distinct outputs, so
/// they run concurrently without ordering guarantees. A missing raster skips
/// that modality; a failing save is logged and does not abort sibling tasks.
#[allow(clippy::too_many_arguments)]
pub fn undistort_images<D>(
    data: &D,
    reconstruction: &Reconstruction,
    undistorted: &Reconstruction,
    mapping: &UndistortedShotMapping,
    image_format: ImageFormat,
    image_scale: f64,
    subshot_width: u32,
    processes: usize,
) -> Result<()>
where
    D: DataSet + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(processes.max(1))
        .thread_name(|idx| format!("undistort-{}", idx))
        .build()
        .map_err(|e| Error::Runtime(format!("Failed to build thread pool: {}", e)))?;

    let shots: Vec<&Shot> = reconstruction.shots.values().collect();
    pool.install(|| {
        shots.par_iter().for_each(|shot| {
            undistort_image_and_masks(
                data,
                reconstruction,
                undistorted,
                mapping,
                shot,
                image_format,
                image_scale,
                subshot_width,
            );
        });
    });

    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn undistort_image_and_masks<D: DataSet>(
    data: &D,
    reconstruction: &Reconstruction,
    undistorted: &Reconstruction,
    mapping: &UndistortedShotMapping,
    shot: &Shot,
    image_format: ImageFormat,
    image_scale: f64,
    subshot_width: u32,
) {
    debug!("Undistorting image {}", shot.id);

    let Some(camera) = reconstruction.camera_of(shot) else {
        warn!("Skipping {}: camera {} not found", shot.id, shot.camera);
        return;
    };
    let undistorted_shots = match resolve_undistorted_shots(undistorted, mapping, shot) {
        Ok(shots) => shots,
        Err(e) => {
            warn!("Skipping {}: {}", shot.id, e);
            return;
        }
    };

    if let Some(image) = data.load_image(&shot.id) {
        run_modality(shot, camera, &undistorted_shots, &image, Interpolation::Area,
            image_scale, subshot_width, |id, raster| {
                data.save_undistorted_image(id, raster, image_format)
            });
    }

    if let Some(mask) = data.load_mask(&shot.id) {
        run_modality(shot, camera, &undistorted_shots, &mask, Interpolation::Nearest,
            1.0, subshot_width, |id, raster| data.save_undistorted_mask(id, raster));
    }

    if let Some(segmentation) = data.load_segmentation(&shot.id) {
        run_modality(shot, camera, &undistorted_shots, &segmentation, Interpolation::Nearest,
            1.0, subshot_width, |id, raster| {
                data.save_undistorted_segmentation(id, raster)
            });
    }
}

fn resolve_undistorted_shots<'a>(
    undistorted: &'a Reconstruction,
    mapping: &UndistortedShotMapping,
    shot: &Shot,
) -> Result<Vec<(&'a Shot, &'a Camera)>> {
    let subshot_ids = mapping
        .get(&shot.id)
        .ok_or_else(|| Error::InvalidParameters(format!("no mapping for shot {}", shot.id)))?;

    subshot_ids
        .iter()
        .map(|id| {
            let ushot = undistorted
                .shots
                .get(id)
                .ok_or_else(|| Error::InvalidParameters(format!("unknown subshot {}", id)))?;
            let ucamera = undistorted
                .camera_of(ushot)
                .ok_or_else(|| Error::MissingCamera(ushot.camera.clone()))?;
            Ok((ushot, ucamera))
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn run_modality<F>(
    shot: &Shot,
    camera: &Camera,
    undistorted_shots: &[(&Shot, &Camera)],
    original: &Raster,
    interpolation: Interpolation,
    image_scale: f64,
    subshot_width: u32,
    save: F,
) where
    F: Fn(&str, &Raster) -> Result<()>,
{
    match undistort_image(
        shot,
        camera,
        undistorted_shots,
        original,
        interpolation,
        image_scale,
        subshot_width,
    ) {
        Ok(outputs) => {
            for (id, raster) in &outputs {
                if let Err(e) = save(id, raster) {
                    warn!("Failed to save undistorted raster {}: {}", id, e);
                }
            }
        }
        Err(e) => warn!("Failed to undistort {}: {}", shot.id, e),
    }
}
