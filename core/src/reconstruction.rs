use std::collections::BTreeMap;

use nalgebra::Vector3;

use crate::{Camera, Pose};

/// Capture metadata carried along with a shot, opaque to the geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShotMetadata {
    pub capture_time: Option<f64>,
    pub gps_position: Option<Vector3<f64>>,
    pub gps_dop: Option<f64>,
    pub orientation: Option<i64>,
}

/// A single exposure: a pose plus a reference to a camera in the owning
/// reconstruction's camera table. Cameras may be shared between shots.
#[derive(Debug, Clone, PartialEq)]
pub struct Shot {
    pub id: String,
    pub camera: String,
    pub pose: Pose,
    pub metadata: ShotMetadata,
}

/// Reconstructed 3-D point. Copied unchanged into undistorted reconstructions.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: String,
    pub coordinates: Vector3<f64>,
    pub color: [f64; 3],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconstruction {
    pub cameras: BTreeMap<String, Camera>,
    pub shots: BTreeMap<String, Shot>,
    pub points: BTreeMap<String, Point>,
}

impl Reconstruction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_camera(&mut self, camera: Camera) {
        self.cameras.insert(camera.id().to_string(), camera);
    }

    pub fn add_shot(&mut self, shot: Shot) {
        self.shots.insert(shot.id.clone(), shot);
    }

    pub fn add_point(&mut self, point: Point) {
        self.points.insert(point.id.clone(), point);
    }

    /// Camera referenced by a shot, if present in the camera table.
    pub fn camera_of(&self, shot: &Shot) -> Option<&Camera> {
        self.cameras.get(&shot.camera)
    }
}
