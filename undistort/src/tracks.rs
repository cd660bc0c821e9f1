use prism_core::{Camera, Observation, Shot, TrackGraph};

/// Re-derive feature observations of a panorama for one of its cube-face
/// sub-shots.
///
/// Each observation's bearing is rotated into the sub-shot frame; tracks
/// behind the face or outside its field of view are skipped. If the panorama
/// has no node in the graph, nothing is added.
pub fn add_subshot_tracks(
    graph: &mut TrackGraph,
    panoshot: &Shot,
    pano_camera: &Camera,
    perspectiveshot: &Shot,
    perspective_camera: &Camera,
) {
    if !graph.contains_shot(&panoshot.id) {
        return;
    }

    let rotation =
        perspectiveshot.pose.rotation_matrix() * panoshot.pose.rotation_matrix().transpose();

    let mut projected = Vec::new();
    if let Some(observations) = graph.shot_observations(&panoshot.id) {
        for (track_id, observation) in observations {
            let bearing = pano_camera.pixel_bearing(observation.coord);
            let rotated = rotation * bearing;
            if rotated.z <= 0.0 {
                continue;
            }

            let coord = perspective_camera.project(&rotated);
            if coord.x < -0.5 || coord.x > 0.5 || coord.y < -0.5 || coord.y > 0.5 {
                continue;
            }

            projected.push((
                track_id.clone(),
                Observation {
                    coord,
                    feature_id: observation.feature_id,
                    color: observation.color,
                },
            ));
        }
    }

    graph.add_shot_node(&perspectiveshot.id);
    for (track_id, observation) in projected {
        graph.add_observation(&perspectiveshot.id, &track_id, observation);
    }
}
