use image::{GrayImage, Luma, Rgb, RgbImage};
use nalgebra::{Point2, Vector3};
use prism_core::{
    Camera, Observation, PerspectiveCamera, Pose, Reconstruction, Shot, ShotMetadata,
    SphericalCamera, TrackGraph,
};
use prism_imgproc::{Interpolation, Raster};
use prism_undistort::{
    add_subshot_tracks, perspective_camera_from_brown, perspective_camera_from_fisheye,
    perspective_views_of_a_panorama, undistort_image, undistort_images, undistort_lens_image,
    undistort_reconstruction, MemoryDataSet, UndistortConfig, FACE_NAMES, PANORAMA_CAMERA_ID,
};

fn perspective_camera(id: &str, width: u32, height: u32, focal: f64, k1: f64, k2: f64) -> Camera {
    Camera::Perspective(PerspectiveCamera {
        id: id.to_string(),
        width,
        height,
        focal,
        focal_prior: focal,
        k1,
        k2,
        k1_prior: k1,
        k2_prior: k2,
    })
}

fn spherical_camera(id: &str, width: u32, height: u32) -> Camera {
    Camera::Spherical(SphericalCamera {
        id: id.to_string(),
        width,
        height,
    })
}

fn shot(id: &str, camera: &Camera) -> Shot {
    Shot {
        id: id.to_string(),
        camera: camera.id().to_string(),
        pose: Pose::default(),
        metadata: ShotMetadata::default(),
    }
}

fn brown_camera_zeroed(focal_x: f64, focal_y: f64) -> prism_core::BrownCamera {
    prism_core::BrownCamera {
        id: "brown".to_string(),
        width: 800,
        height: 600,
        focal_x,
        focal_y,
        c_x: 0.0,
        c_y: 0.0,
        focal_x_prior: focal_x,
        focal_y_prior: focal_y,
        c_x_prior: 0.0,
        c_y_prior: 0.0,
        k1: 0.0,
        k2: 0.0,
        p1: 0.0,
        p2: 0.0,
        k3: 0.0,
        k1_prior: 0.0,
        k2_prior: 0.0,
        p1_prior: 0.0,
        p2_prior: 0.0,
        k3_prior: 0.0,
    }
}

#[test]
fn brown_conversion_averages_focals() {
    let brown = brown_camera_zeroed(0.8, 0.9);
    let converted = perspective_camera_from_brown(&brown);
    let Camera::Perspective(p) = &converted else {
        panic!("expected a perspective camera");
    };
    assert_eq!(p.id, "brown");
    assert_eq!((p.width, p.height), (800, 600));
    assert!((p.focal - 0.85).abs() < 1e-12);
    assert!((p.focal_prior - 0.85).abs() < 1e-12);
    assert_eq!((p.k1, p.k2, p.k1_prior, p.k2_prior), (0.0, 0.0, 0.0, 0.0));
}

#[test]
fn zero_distortion_brown_conversion_is_geometrically_equivalent() {
    let brown = brown_camera_zeroed(0.7, 0.7);
    let converted = perspective_camera_from_brown(&brown);
    let direct = perspective_camera("brown", 800, 600, 0.7, 0.0, 0.0);
    for &(x, y, z) in &[(0.1, 0.2, 1.0), (-0.3, 0.05, 2.0), (0.0, 0.0, 1.0)] {
        let bearing = Vector3::new(x, y, z);
        let a = converted.project(&bearing);
        let b = direct.project(&bearing);
        assert!((a - b).norm() < 1e-12);
    }
}

#[test]
fn fisheye_conversion_copies_focal() {
    let fisheye = prism_core::FisheyeCamera {
        id: "fish".to_string(),
        width: 1024,
        height: 768,
        focal: 0.45,
        focal_prior: 0.47,
        k1: -0.02,
        k2: 0.003,
        k1_prior: -0.02,
        k2_prior: 0.003,
    };
    let converted = perspective_camera_from_fisheye(&fisheye);
    let Camera::Perspective(p) = &converted else {
        panic!("expected a perspective camera");
    };
    assert_eq!(p.focal, 0.45);
    assert_eq!(p.focal_prior, 0.47);
    assert_eq!((p.k1, p.k2), (0.0, 0.0));
}

fn optical_axis_world(s: &Shot) -> Vector3<f64> {
    // Viewing direction in world coordinates is the third row of the
    // world-to-camera rotation.
    s.pose.rotation_matrix().transpose() * Vector3::z()
}

#[test]
fn panorama_split_produces_six_cube_faces() {
    let pano_camera = spherical_camera("pano_cam", 4096, 2048);
    let mut pano = shot("pano1", &pano_camera);
    pano.pose = Pose::from_rotation_origin(
        *nalgebra::Rotation3::from_euler_angles(0.2, -0.1, 0.5).matrix(),
        Vector3::new(1.0, 2.0, 3.0),
    );

    let (camera, subshots) = perspective_views_of_a_panorama(&pano, 640);
    assert_eq!(camera.id(), PANORAMA_CAMERA_ID);
    assert_eq!((camera.width(), camera.height()), (640, 640));
    assert_eq!(subshots.len(), 6);

    for (subshot, face) in subshots.iter().zip(FACE_NAMES) {
        assert_eq!(subshot.id, format!("pano1_perspective_view_{}", face));
        assert_eq!(subshot.camera, PANORAMA_CAMERA_ID);
        assert!((subshot.pose.origin() - pano.pose.origin()).norm() < 1e-9);
    }

    // Opposite faces look in opposite directions, adjacent faces are
    // orthogonal.
    let axes: Vec<Vector3<f64>> = subshots.iter().map(optical_axis_world).collect();
    for (a, b) in [(0, 2), (1, 3), (4, 5)] {
        assert!((axes[a].dot(&axes[b]) + 1.0).abs() < 1e-9);
    }
    for (a, b) in [(0, 1), (0, 3), (0, 4), (0, 5), (1, 4), (2, 5)] {
        assert!(axes[a].dot(&axes[b]).abs() < 1e-9);
    }
}

#[test]
fn lens_undistortion_of_ideal_camera_is_identity() {
    let camera = perspective_camera("cam", 16, 12, 0.9, 0.0, 0.0);
    let img = GrayImage::from_fn(16, 12, |x, y| Luma([((x * 11 + y * 17) % 256) as u8]));
    let raster = Raster::Gray(img);
    let out = undistort_lens_image(&raster, &camera, &camera, Interpolation::Nearest).unwrap();
    assert_eq!(out, raster);
    let out = undistort_lens_image(&raster, &camera, &camera, Interpolation::Area).unwrap();
    assert_eq!(out, raster);
}

#[test]
fn lens_undistortion_rejects_spherical() {
    let camera = spherical_camera("pano_cam", 64, 32);
    let raster = Raster::Gray(GrayImage::new(64, 32));
    let err = undistort_lens_image(&raster, &camera, &camera, Interpolation::Nearest);
    assert!(matches!(
        err,
        Err(prism_core::Error::UnsupportedProjection(_))
    ));
}

fn observation(x: f64, y: f64, feature_id: usize) -> Observation {
    Observation {
        coord: Point2::new(x, y),
        feature_id,
        color: [10.0, 20.0, 30.0],
    }
}

#[test]
fn subshot_tracks_reject_behind_and_out_of_view() {
    let pano_camera = spherical_camera("pano_cam", 4096, 2048);
    let pano = shot("pano1", &pano_camera);
    let (sub_camera, subshots) = perspective_views_of_a_panorama(&pano, 640);

    let mut graph = TrackGraph::new();
    // Straight ahead: visible in the front face only.
    graph.add_observation("pano1", "t_front", observation(0.0, 0.0, 1));
    // 90 degrees to the side: exactly on the front/left boundary plane.
    graph.add_observation("pano1", "t_side", observation(0.25, 0.0, 2));
    // 72 degrees off axis: in front of the front face but outside its
    // 90-degree field of view.
    graph.add_observation("pano1", "t_wide", observation(0.2, 0.0, 3));

    let front = &subshots[0];
    add_subshot_tracks(&mut graph, &pano, &pano_camera, front, &sub_camera);

    let front_id = &front.id;
    assert!(graph.contains_shot(front_id));
    assert!(graph.observation(front_id, "t_front").is_some());
    // Forward component is exactly zero for t_side; that is "behind".
    assert!(graph.observation(front_id, "t_side").is_none());
    assert!(graph.observation(front_id, "t_wide").is_none());

    let kept = graph.observation(front_id, "t_front").unwrap();
    assert!(kept.coord.coords.norm() < 1e-12);
    assert_eq!(kept.feature_id, 1);
    assert_eq!(kept.color, [10.0, 20.0, 30.0]);

    // The back face sees none of these.
    let back = &subshots[2];
    add_subshot_tracks(&mut graph, &pano, &pano_camera, back, &sub_camera);
    assert!(graph.contains_shot(&back.id));
    assert_eq!(graph.shot_observations(&back.id).unwrap().len(), 0);
}

#[test]
fn subshot_tracks_reproject_coordinates() {
    let pano_camera = spherical_camera("pano_cam", 4096, 2048);
    let pano = shot("pano1", &pano_camera);
    let (sub_camera, subshots) = perspective_views_of_a_panorama(&pano, 640);

    let mut graph = TrackGraph::new();
    // 36 degrees of longitude, on the horizon.
    graph.add_observation("pano1", "t1", observation(0.1, 0.0, 7));
    add_subshot_tracks(&mut graph, &pano, &pano_camera, &subshots[0], &sub_camera);

    let obs = graph.observation(&subshots[0].id, "t1").unwrap();
    let lon = 0.1 * 2.0 * std::f64::consts::PI;
    assert!((obs.coord.x - 0.5 * lon.tan()).abs() < 1e-9);
    assert!(obs.coord.y.abs() < 1e-12);
}

#[test]
fn subshot_tracks_skip_absent_panorama() {
    let pano_camera = spherical_camera("pano_cam", 4096, 2048);
    let pano = shot("pano1", &pano_camera);
    let (sub_camera, subshots) = perspective_views_of_a_panorama(&pano, 640);

    let mut graph = TrackGraph::new();
    add_subshot_tracks(&mut graph, &pano, &pano_camera, &subshots[0], &sub_camera);
    assert!(!graph.contains_shot(&subshots[0].id));
    assert_eq!(graph.len_edges(), 0);
}

#[test]
fn undistorting_ideal_perspective_shot_copies_everything() {
    let camera = perspective_camera("cam1", 16, 12, 0.9, 0.0, 0.0);
    let mut reconstruction = Reconstruction::new();
    reconstruction.add_camera(camera.clone());
    reconstruction.add_shot(shot("im1.jpg", &camera));

    let mut graph = TrackGraph::new();
    let (undistorted, mapping) =
        undistort_reconstruction(&reconstruction, &mut graph, 640).unwrap();

    assert_eq!(undistorted.cameras.get("cam1"), Some(&camera));
    assert_eq!(undistorted.shots, reconstruction.shots);
    assert_eq!(mapping.get("im1.jpg").unwrap(), &vec!["im1.jpg".to_string()]);

    // The resampled image equals the input at scale 1.0.
    let img = Raster::Gray(GrayImage::from_fn(16, 12, |x, y| {
        Luma([((x * 3 + y * 5) % 256) as u8])
    }));
    let original_shot = &reconstruction.shots["im1.jpg"];
    let ushot = &undistorted.shots["im1.jpg"];
    let ucamera = undistorted.camera_of(ushot).unwrap();
    let outputs = undistort_image(
        original_shot,
        &camera,
        &[(ushot, ucamera)],
        &img,
        Interpolation::Area,
        1.0,
        640,
    )
    .unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs.get("im1.jpg"), Some(&img));
}

#[test]
fn undistorting_panorama_creates_six_named_shots() {
    let pano_camera = spherical_camera("pano_cam", 4096, 2048);
    let mut reconstruction = Reconstruction::new();
    reconstruction.add_camera(pano_camera.clone());
    reconstruction.add_shot(shot("pano1", &pano_camera));

    let mut graph = TrackGraph::new();
    graph.add_observation("pano1", "t1", observation(0.0, 0.0, 1));
    graph.add_observation("pano1", "t2", observation(0.3, 0.1, 2));
    graph.add_observation("pano1", "t3", observation(-0.15, -0.2, 3));

    let (undistorted, mapping) =
        undistort_reconstruction(&reconstruction, &mut graph, 640).unwrap();

    let subshot_ids = mapping.get("pano1").unwrap();
    assert_eq!(subshot_ids.len(), 6);
    for (id, face) in subshot_ids.iter().zip(FACE_NAMES) {
        assert_eq!(id, &format!("pano1_perspective_view_{}", face));
        let ushot = &undistorted.shots[id];
        let ucamera = undistorted.camera_of(ushot).unwrap();
        assert_eq!((ucamera.width(), ucamera.height()), (640, 640));
    }
    // One shared synthetic camera plus nothing else.
    assert_eq!(undistorted.cameras.len(), 1);
    assert!(undistorted.cameras.contains_key(PANORAMA_CAMERA_ID));

    // No re-projected observation falls outside the sub-view.
    for (shot_id, _, obs) in graph.edges() {
        if shot_id == "pano1" {
            continue;
        }
        assert!(obs.coord.x >= -0.5 && obs.coord.x <= 0.5);
        assert!(obs.coord.y >= -0.5 && obs.coord.y <= 0.5);
    }
}

#[test]
fn batch_resampling_writes_all_modalities() {
    let camera = perspective_camera("cam1", 16, 12, 0.9, 0.0, 0.0);
    let pano_camera = spherical_camera("pano_cam", 256, 128);
    let mut reconstruction = Reconstruction::new();
    reconstruction.add_camera(camera.clone());
    reconstruction.add_camera(pano_camera.clone());
    reconstruction.add_shot(shot("im1.jpg", &camera));
    reconstruction.add_shot(shot("pano1", &pano_camera));

    let mut graph = TrackGraph::new();
    let (undistorted, mapping) = undistort_reconstruction(&reconstruction, &mut graph, 32).unwrap();

    let mut data = MemoryDataSet::new(UndistortConfig {
        depthmap_resolution: 32,
        processes: 2,
    });
    let gray = GrayImage::from_fn(16, 12, |x, y| Luma([((x + y) % 2 * 255) as u8]));
    data.images.insert(
        "im1.jpg".to_string(),
        Raster::Rgb(RgbImage::from_pixel(16, 12, Rgb([120, 80, 40]))),
    );
    data.masks
        .insert("im1.jpg".to_string(), Raster::Gray(gray.clone()));
    data.images.insert(
        "pano1".to_string(),
        Raster::Rgb(RgbImage::from_pixel(256, 128, Rgb([9, 99, 199]))),
    );
    // No mask or segmentation for the panorama: silently skipped.

    undistort_images(
        &data,
        &reconstruction,
        &undistorted,
        &mapping,
        prism_undistort::ImageFormat::Png,
        1.0,
        32,
        2,
    )
    .unwrap();

    data.with_outputs(|outputs| {
        assert!(outputs.images.contains_key("im1.jpg"));
        for face in FACE_NAMES {
            let id = format!("pano1_perspective_view_{}", face);
            let rendered = outputs.images.get(&id).expect("missing cube face");
            assert_eq!((rendered.width(), rendered.height()), (32, 32));
            // A constant panorama renders to a constant face.
            let Raster::Rgb(img) = rendered else {
                panic!("expected RGB output");
            };
            assert!(img.pixels().all(|p| *p == Rgb([9, 99, 199])));
        }
        // Mask is resampled with nearest and written once.
        assert_eq!(outputs.masks.get("im1.jpg"), Some(&Raster::Gray(gray.clone())));
        assert!(outputs.masks.len() == 1);
        assert!(outputs.segmentations.is_empty());
    });
}

#[test]
fn missing_camera_fails_the_run() {
    let camera = perspective_camera("cam1", 16, 12, 0.9, 0.0, 0.0);
    let mut reconstruction = Reconstruction::new();
    let mut orphan = shot("im1.jpg", &camera);
    orphan.camera = "nonexistent".to_string();
    reconstruction.add_shot(orphan);

    let mut graph = TrackGraph::new();
    let result = undistort_reconstruction(&reconstruction, &mut graph, 640);
    assert!(matches!(result, Err(prism_core::Error::MissingCamera(_))));
}

#[test]
fn points_are_carried_over_unchanged() {
    let camera = perspective_camera("cam1", 16, 12, 0.9, 0.0, 0.0);
    let mut reconstruction = Reconstruction::new();
    reconstruction.add_camera(camera.clone());
    reconstruction.add_shot(shot("im1.jpg", &camera));
    reconstruction.add_point(prism_core::Point {
        id: "p1".to_string(),
        coordinates: Vector3::new(1.0, 2.0, 3.0),
        color: [255.0, 0.0, 0.0],
    });

    let mut graph = TrackGraph::new();
    let (undistorted, _) = undistort_reconstruction(&reconstruction, &mut graph, 640).unwrap();
    assert_eq!(undistorted.points, reconstruction.points);
}
