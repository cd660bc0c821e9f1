use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use nalgebra::{Point2, Rotation3, Vector3};
use serde_json::{json, Map, Value};

use prism_core::{
    BrownCamera, Camera, Error, FisheyeCamera, Observation, PerspectiveCamera, Point, Pose,
    Reconstruction, Result, Shot, ShotMetadata, SphericalCamera, TrackGraph,
};
use prism_imgproc::Raster;

/// Export format of undistorted color images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpg,
    Png,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpg => "jpg",
            ImageFormat::Png => "png",
        }
    }

    fn codec(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
        }
    }
}

fn default_depthmap_resolution() -> u32 {
    640
}

fn default_processes() -> usize {
    1
}

/// Settings the undistortion pipeline reads from the dataset configuration.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct UndistortConfig {
    /// Width in pixels of each panorama cube face.
    #[serde(default = "default_depthmap_resolution")]
    pub depthmap_resolution: u32,
    /// Worker pool size for the batch resampling stage.
    #[serde(default = "default_processes")]
    pub processes: usize,
}

impl Default for UndistortConfig {
    fn default() -> Self {
        Self {
            depthmap_resolution: default_depthmap_resolution(),
            processes: default_processes(),
        }
    }
}

/// Narrow interface to the dataset collaborators: reconstruction store,
/// track graph store and raster store.
///
/// A missing image, mask or segmentation is reported as `None`, never as an
/// error.
pub trait DataSet {
    fn config(&self) -> &UndistortConfig;

    fn load_reconstruction(&self) -> Result<Vec<Reconstruction>>;
    fn save_undistorted_reconstruction(&self, reconstructions: &[Reconstruction]) -> Result<()>;

    fn load_tracks_graph(&self) -> Result<TrackGraph>;
    fn save_undistorted_tracks_graph(&self, graph: &TrackGraph) -> Result<()>;

    fn load_image(&self, shot_id: &str) -> Option<Raster>;
    fn load_mask(&self, shot_id: &str) -> Option<Raster>;
    fn load_segmentation(&self, shot_id: &str) -> Option<Raster>;

    fn save_undistorted_image(&self, shot_id: &str, image: &Raster, format: ImageFormat)
        -> Result<()>;
    fn save_undistorted_mask(&self, shot_id: &str, image: &Raster) -> Result<()>;
    fn save_undistorted_segmentation(&self, shot_id: &str, image: &Raster) -> Result<()>;
}

/// Filesystem dataset layout:
///
/// ```text
/// root/
///   config.json                      (optional)
///   reconstruction.json
///   tracks.csv                       (tab separated)
///   images/<shot_id>
///   masks/<shot_id>.png
///   segmentations/<shot_id>.png
///   undistorted/...                  (outputs)
///   undistorted_masks/...
///   undistorted_segmentations/...
/// ```
pub struct FsDataSet {
    root: PathBuf,
    config: UndistortConfig,
}

impl FsDataSet {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let config_path = root.join("config.json");
        let config = if config_path.exists() {
            serde_json::from_str(&fs::read_to_string(&config_path)?)
                .map_err(|e| Error::Parse(format!("config.json: {}", e)))?
        } else {
            UndistortConfig::default()
        };
        Ok(Self { root, config })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn load_rgb(&self, path: &Path) -> Option<Raster> {
        image::open(path).ok().map(|img| Raster::Rgb(img.to_rgb8()))
    }

    fn load_gray(&self, path: &Path) -> Option<Raster> {
        image::open(path).ok().map(|img| Raster::Gray(img.to_luma8()))
    }

    fn save_raster(&self, path: &Path, raster: &Raster, codec: image::ImageFormat) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let saved = match raster {
            Raster::Gray(img) => img.save_with_format(path, codec),
            Raster::Rgb(img) => img.save_with_format(path, codec),
        };
        saved.map_err(|e| Error::Image(format!("{}: {}", path.display(), e)))
    }
}

impl DataSet for FsDataSet {
    fn config(&self) -> &UndistortConfig {
        &self.config
    }

    fn load_reconstruction(&self) -> Result<Vec<Reconstruction>> {
        let text = fs::read_to_string(self.root.join("reconstruction.json"))?;
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| Error::Parse(format!("reconstruction.json: {}", e)))?;
        let array = value
            .as_array()
            .ok_or_else(|| Error::Parse("reconstruction.json: expected an array".to_string()))?;
        array.iter().map(reconstruction_from_json).collect()
    }

    fn save_undistorted_reconstruction(&self, reconstructions: &[Reconstruction]) -> Result<()> {
        let value = Value::Array(reconstructions.iter().map(reconstruction_to_json).collect());
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| Error::Runtime(format!("serializing reconstruction: {}", e)))?;
        fs::write(self.root.join("undistorted_reconstruction.json"), text)?;
        Ok(())
    }

    fn load_tracks_graph(&self) -> Result<TrackGraph> {
        let text = fs::read_to_string(self.root.join("tracks.csv"))?;
        tracks_from_csv(&text)
    }

    fn save_undistorted_tracks_graph(&self, graph: &TrackGraph) -> Result<()> {
        let mut file = fs::File::create(self.root.join("undistorted_tracks.csv"))?;
        file.write_all(tracks_to_csv(graph).as_bytes())?;
        Ok(())
    }

    fn load_image(&self, shot_id: &str) -> Option<Raster> {
        self.load_rgb(&self.root.join("images").join(shot_id))
    }

    fn load_mask(&self, shot_id: &str) -> Option<Raster> {
        self.load_gray(&self.root.join("masks").join(format!("{}.png", shot_id)))
    }

    fn load_segmentation(&self, shot_id: &str) -> Option<Raster> {
        self.load_gray(&self.root.join("segmentations").join(format!("{}.png", shot_id)))
    }

    fn save_undistorted_image(
        &self,
        shot_id: &str,
        image: &Raster,
        format: ImageFormat,
    ) -> Result<()> {
        let path = self
            .root
            .join("undistorted")
            .join(format!("{}.{}", shot_id, format.extension()));
        self.save_raster(&path, image, format.codec())
    }

    fn save_undistorted_mask(&self, shot_id: &str, image: &Raster) -> Result<()> {
        let path = self
            .root
            .join("undistorted_masks")
            .join(format!("{}.png", shot_id));
        self.save_raster(&path, image, image::ImageFormat::Png)
    }

    fn save_undistorted_segmentation(&self, shot_id: &str, image: &Raster) -> Result<()> {
        let path = self
            .root
            .join("undistorted_segmentations")
            .join(format!("{}.png", shot_id));
        self.save_raster(&path, image, image::ImageFormat::Png)
    }
}

// JSON mapping of the reconstruction, kept by hand so the on-disk format
// stays independent of the in-memory types.

fn num(obj: &Map<String, Value>, key: &str) -> f64 {
    obj.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

fn num_or(obj: &Map<String, Value>, key: &str, fallback: f64) -> f64 {
    obj.get(key).and_then(Value::as_f64).unwrap_or(fallback)
}

fn dim(obj: &Map<String, Value>, key: &str) -> u32 {
    obj.get(key).and_then(Value::as_u64).unwrap_or(0) as u32
}

fn vec3(obj: &Map<String, Value>, key: &str) -> Option<Vector3<f64>> {
    let array = obj.get(key)?.as_array()?;
    if array.len() != 3 {
        return None;
    }
    Some(Vector3::new(
        array[0].as_f64()?,
        array[1].as_f64()?,
        array[2].as_f64()?,
    ))
}

fn vec3_json(v: &Vector3<f64>) -> Value {
    json!([v.x, v.y, v.z])
}

fn object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| Error::Parse(format!("expected object for {}", what)))
}

fn camera_from_json(id: &str, value: &Value) -> Result<Camera> {
    let obj = object(value, &format!("camera {}", id))?;
    let kind = obj
        .get("projection_type")
        .and_then(Value::as_str)
        .unwrap_or("perspective");
    let width = dim(obj, "width");
    let height = dim(obj, "height");

    match kind {
        "perspective" => {
            let focal = num(obj, "focal");
            Ok(Camera::Perspective(PerspectiveCamera {
                id: id.to_string(),
                width,
                height,
                focal,
                focal_prior: num_or(obj, "focal_prior", focal),
                k1: num(obj, "k1"),
                k2: num(obj, "k2"),
                k1_prior: num(obj, "k1_prior"),
                k2_prior: num(obj, "k2_prior"),
            }))
        }
        "brown" => Ok(Camera::Brown(BrownCamera {
            id: id.to_string(),
            width,
            height,
            focal_x: num(obj, "focal_x"),
            focal_y: num(obj, "focal_y"),
            c_x: num(obj, "c_x"),
            c_y: num(obj, "c_y"),
            focal_x_prior: num_or(obj, "focal_x_prior", num(obj, "focal_x")),
            focal_y_prior: num_or(obj, "focal_y_prior", num(obj, "focal_y")),
            c_x_prior: num(obj, "c_x_prior"),
            c_y_prior: num(obj, "c_y_prior"),
            k1: num(obj, "k1"),
            k2: num(obj, "k2"),
            p1: num(obj, "p1"),
            p2: num(obj, "p2"),
            k3: num(obj, "k3"),
            k1_prior: num(obj, "k1_prior"),
            k2_prior: num(obj, "k2_prior"),
            p1_prior: num(obj, "p1_prior"),
            p2_prior: num(obj, "p2_prior"),
            k3_prior: num(obj, "k3_prior"),
        })),
        "fisheye" => {
            let focal = num(obj, "focal");
            Ok(Camera::Fisheye(FisheyeCamera {
                id: id.to_string(),
                width,
                height,
                focal,
                focal_prior: num_or(obj, "focal_prior", focal),
                k1: num(obj, "k1"),
                k2: num(obj, "k2"),
                k1_prior: num(obj, "k1_prior"),
                k2_prior: num(obj, "k2_prior"),
            }))
        }
        "spherical" | "equirectangular" => Ok(Camera::Spherical(SphericalCamera {
            id: id.to_string(),
            width,
            height,
        })),
        other => Err(Error::UnsupportedProjection(other.to_string())),
    }
}

fn camera_to_json(camera: &Camera) -> Value {
    match camera {
        Camera::Perspective(c) => json!({
            "projection_type": "perspective",
            "width": c.width,
            "height": c.height,
            "focal": c.focal,
            "focal_prior": c.focal_prior,
            "k1": c.k1,
            "k2": c.k2,
            "k1_prior": c.k1_prior,
            "k2_prior": c.k2_prior,
        }),
        Camera::Brown(c) => json!({
            "projection_type": "brown",
            "width": c.width,
            "height": c.height,
            "focal_x": c.focal_x,
            "focal_y": c.focal_y,
            "c_x": c.c_x,
            "c_y": c.c_y,
            "focal_x_prior": c.focal_x_prior,
            "focal_y_prior": c.focal_y_prior,
            "c_x_prior": c.c_x_prior,
            "c_y_prior": c.c_y_prior,
            "k1": c.k1,
            "k2": c.k2,
            "p1": c.p1,
            "p2": c.p2,
            "k3": c.k3,
            "k1_prior": c.k1_prior,
            "k2_prior": c.k2_prior,
            "p1_prior": c.p1_prior,
            "p2_prior": c.p2_prior,
            "k3_prior": c.k3_prior,
        }),
        Camera::Fisheye(c) => json!({
            "projection_type": "fisheye",
            "width": c.width,
            "height": c.height,
            "focal": c.focal,
            "focal_prior": c.focal_prior,
            "k1": c.k1,
            "k2": c.k2,
            "k1_prior": c.k1_prior,
            "k2_prior": c.k2_prior,
        }),
        Camera::Spherical(c) => json!({
            "projection_type": "spherical",
            "width": c.width,
            "height": c.height,
        }),
    }
}

fn shot_from_json(id: &str, value: &Value) -> Result<Shot> {
    let obj = object(value, &format!("shot {}", id))?;
    let camera = obj
        .get("camera")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Parse(format!("shot {} has no camera", id)))?
        .to_string();
    let rotation = vec3(obj, "rotation").unwrap_or_else(Vector3::zeros);
    let translation = vec3(obj, "translation").unwrap_or_else(Vector3::zeros);
    let metadata = ShotMetadata {
        capture_time: obj.get("capture_time").and_then(Value::as_f64),
        gps_position: vec3(obj, "gps_position"),
        gps_dop: obj.get("gps_dop").and_then(Value::as_f64),
        orientation: obj.get("orientation").and_then(Value::as_i64),
    };
    Ok(Shot {
        id: id.to_string(),
        camera,
        pose: Pose::new(*Rotation3::new(rotation).matrix(), translation),
        metadata,
    })
}

fn shot_to_json(shot: &Shot) -> Value {
    let axis_angle = Rotation3::from_matrix_unchecked(*shot.pose.rotation_matrix()).scaled_axis();
    let mut obj = Map::new();
    obj.insert("camera".to_string(), json!(shot.camera));
    obj.insert("rotation".to_string(), vec3_json(&axis_angle));
    obj.insert("translation".to_string(), vec3_json(shot.pose.translation()));
    if let Some(t) = shot.metadata.capture_time {
        obj.insert("capture_time".to_string(), json!(t));
    }
    if let Some(p) = &shot.metadata.gps_position {
        obj.insert("gps_position".to_string(), vec3_json(p));
    }
    if let Some(d) = shot.metadata.gps_dop {
        obj.insert("gps_dop".to_string(), json!(d));
    }
    if let Some(o) = shot.metadata.orientation {
        obj.insert("orientation".to_string(), json!(o));
    }
    Value::Object(obj)
}

fn point_from_json(id: &str, value: &Value) -> Result<Point> {
    let obj = object(value, &format!("point {}", id))?;
    let coordinates = vec3(obj, "coordinates")
        .ok_or_else(|| Error::Parse(format!("point {} has no coordinates", id)))?;
    let color = vec3(obj, "color").unwrap_or_else(Vector3::zeros);
    Ok(Point {
        id: id.to_string(),
        coordinates,
        color: [color.x, color.y, color.z],
    })
}

fn point_to_json(point: &Point) -> Value {
    json!({
        "coordinates": vec3_json(&point.coordinates),
        "color": point.color,
    })
}

fn reconstruction_from_json(value: &Value) -> Result<Reconstruction> {
    let obj = object(value, "reconstruction")?;
    let mut reconstruction = Reconstruction::new();

    if let Some(cameras) = obj.get("cameras").and_then(Value::as_object) {
        for (id, camera) in cameras {
            reconstruction.add_camera(camera_from_json(id, camera)?);
        }
    }
    if let Some(shots) = obj.get("shots").and_then(Value::as_object) {
        for (id, shot) in shots {
            reconstruction.add_shot(shot_from_json(id, shot)?);
        }
    }
    if let Some(points) = obj.get("points").and_then(Value::as_object) {
        for (id, point) in points {
            reconstruction.add_point(point_from_json(id, point)?);
        }
    }
    Ok(reconstruction)
}

fn reconstruction_to_json(reconstruction: &Reconstruction) -> Value {
    let cameras: Map<String, Value> = reconstruction
        .cameras
        .iter()
        .map(|(id, c)| (id.clone(), camera_to_json(c)))
        .collect();
    let shots: Map<String, Value> = reconstruction
        .shots
        .iter()
        .map(|(id, s)| (id.clone(), shot_to_json(s)))
        .collect();
    let points: Map<String, Value> = reconstruction
        .points
        .iter()
        .map(|(id, p)| (id.clone(), point_to_json(p)))
        .collect();
    json!({
        "cameras": cameras,
        "shots": shots,
        "points": points,
    })
}

// Track graph rows: shot, track, feature id, x, y, r, g, b (tab separated).

fn tracks_from_csv(text: &str) -> Result<TrackGraph> {
    let mut graph = TrackGraph::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != 8 {
            return Err(Error::Parse(format!(
                "tracks line {}: expected 8 fields, got {}",
                line_no + 1,
                fields.len()
            )));
        }
        let parse_f64 = |s: &str| {
            s.parse::<f64>()
                .map_err(|e| Error::Parse(format!("tracks line {}: {}", line_no + 1, e)))
        };
        let feature_id = fields[2]
            .parse::<usize>()
            .map_err(|e| Error::Parse(format!("tracks line {}: {}", line_no + 1, e)))?;
        let observation = Observation {
            coord: Point2::new(parse_f64(fields[3])?, parse_f64(fields[4])?),
            feature_id,
            color: [
                parse_f64(fields[5])?,
                parse_f64(fields[6])?,
                parse_f64(fields[7])?,
            ],
        };
        graph.add_observation(fields[0], fields[1], observation);
    }
    Ok(graph)
}

fn tracks_to_csv(graph: &TrackGraph) -> String {
    let mut out = String::new();
    for (shot, track, obs) in graph.edges() {
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
            shot,
            track,
            obs.feature_id,
            obs.coord.x,
            obs.coord.y,
            obs.color[0],
            obs.color[1],
            obs.color[2]
        ));
    }
    out
}

/// In-memory dataset used by tests and callers that keep rasters elsewhere.
#[derive(Default)]
pub struct MemoryDataSet {
    pub config: UndistortConfig,
    pub images: BTreeMap<String, Raster>,
    pub masks: BTreeMap<String, Raster>,
    pub segmentations: BTreeMap<String, Raster>,
    outputs: std::sync::Mutex<MemoryOutputs>,
}

#[derive(Default)]
pub struct MemoryOutputs {
    pub reconstructions: Vec<Reconstruction>,
    pub tracks: Option<TrackGraph>,
    pub images: BTreeMap<String, Raster>,
    pub masks: BTreeMap<String, Raster>,
    pub segmentations: BTreeMap<String, Raster>,
}

impl MemoryDataSet {
    pub fn new(config: UndistortConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Run a closure over everything saved so far.
    pub fn with_outputs<R>(&self, f: impl FnOnce(&MemoryOutputs) -> R) -> R {
        f(&self.outputs.lock().expect("outputs lock poisoned"))
    }
}

impl DataSet for MemoryDataSet {
    fn config(&self) -> &UndistortConfig {
        &self.config
    }

    fn load_reconstruction(&self) -> Result<Vec<Reconstruction>> {
        Ok(Vec::new())
    }

    fn save_undistorted_reconstruction(&self, reconstructions: &[Reconstruction]) -> Result<()> {
        let mut outputs = self.outputs.lock().expect("outputs lock poisoned");
        outputs.reconstructions = reconstructions.to_vec();
        Ok(())
    }

    fn load_tracks_graph(&self) -> Result<TrackGraph> {
        Ok(TrackGraph::new())
    }

    fn save_undistorted_tracks_graph(&self, graph: &TrackGraph) -> Result<()> {
        let mut outputs = self.outputs.lock().expect("outputs lock poisoned");
        outputs.tracks = Some(graph.clone());
        Ok(())
    }

    fn load_image(&self, shot_id: &str) -> Option<Raster> {
        self.images.get(shot_id).cloned()
    }

    fn load_mask(&self, shot_id: &str) -> Option<Raster> {
        self.masks.get(shot_id).cloned()
    }

    fn load_segmentation(&self, shot_id: &str) -> Option<Raster> {
        self.segmentations.get(shot_id).cloned()
    }

    fn save_undistorted_image(
        &self,
        shot_id: &str,
        image: &Raster,
        _format: ImageFormat,
    ) -> Result<()> {
        let mut outputs = self.outputs.lock().expect("outputs lock poisoned");
        outputs.images.insert(shot_id.to_string(), image.clone());
        Ok(())
    }

    fn save_undistorted_mask(&self, shot_id: &str, image: &Raster) -> Result<()> {
        let mut outputs = self.outputs.lock().expect("outputs lock poisoned");
        outputs.masks.insert(shot_id.to_string(), image.clone());
        Ok(())
    }

    fn save_undistorted_segmentation(&self, shot_id: &str, image: &Raster) -> Result<()> {
        let mut outputs = self.outputs.lock().expect("outputs lock poisoned");
        outputs
            .segmentations
            .insert(shot_id.to_string(), image.clone());
        Ok(())
    }
}
