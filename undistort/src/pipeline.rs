use std::collections::BTreeMap;

use log::debug;

use prism_core::{Camera, Error, Reconstruction, Result, Shot, TrackGraph};

use crate::convert::{perspective_camera_from_brown, perspective_camera_from_fisheye};
use crate::panorama::perspective_views_of_a_panorama;
use crate::tracks::add_subshot_tracks;

/// Original shot id to the ids of its undistorted shot(s): one for lens
/// cameras, the six cube faces in order for panoramas.
pub type UndistortedShotMapping = BTreeMap<String, Vec<String>>;

/// Build the undistorted reconstruction for a solved one.
///
/// Walks all shots once: perspective shots are copied, brown and fisheye
/// cameras are replaced by their pinhole equivalents, and spherical shots
/// are split into six cube faces with their track observations re-projected
/// into `graph`. Reconstructed points are carried over unchanged.
pub fn undistort_reconstruction(
    reconstruction: &Reconstruction,
    graph: &mut TrackGraph,
    subshot_width: u32,
) -> Result<(Reconstruction, UndistortedShotMapping)> {
    debug!("Undistorting the reconstruction");

    let mut undistorted = Reconstruction::new();
    undistorted.points = reconstruction.points.clone();

    let mut mapping = UndistortedShotMapping::new();
    for shot in reconstruction.shots.values() {
        let camera = reconstruction
            .camera_of(shot)
            .ok_or_else(|| Error::MissingCamera(shot.camera.clone()))?;

        match camera {
            Camera::Perspective(_) => {
                undistorted.add_camera(camera.clone());
                undistorted.add_shot(shot.clone());
                mapping.insert(shot.id.clone(), vec![shot.id.clone()]);
            }
            Camera::Brown(brown) => {
                let ucamera = perspective_camera_from_brown(brown);
                register_lens_shot(&mut undistorted, &mut mapping, shot, ucamera);
            }
            Camera::Fisheye(fisheye) => {
                let ucamera = perspective_camera_from_fisheye(fisheye);
                register_lens_shot(&mut undistorted, &mut mapping, shot, ucamera);
            }
            Camera::Spherical(_) => {
                let (ucamera, subshots) = perspective_views_of_a_panorama(shot, subshot_width);
                undistorted.add_camera(ucamera.clone());
                let mut subshot_ids = Vec::with_capacity(subshots.len());
                for subshot in subshots {
                    add_subshot_tracks(graph, shot, camera, &subshot, &ucamera);
                    subshot_ids.push(subshot.id.clone());
                    undistorted.add_shot(subshot);
                }
                mapping.insert(shot.id.clone(), subshot_ids);
            }
        }
    }

    Ok((undistorted, mapping))
}

fn register_lens_shot(
    undistorted: &mut Reconstruction,
    mapping: &mut UndistortedShotMapping,
    shot: &Shot,
    ucamera: Camera,
) {
    let ushot = Shot {
        id: shot.id.clone(),
        camera: ucamera.id().to_string(),
        pose: shot.pose,
        metadata: shot.metadata.clone(),
    };
    undistorted.add_camera(ucamera);
    undistorted.add_shot(ushot);
    mapping.insert(shot.id.clone(), vec![shot.id.clone()]);
}
