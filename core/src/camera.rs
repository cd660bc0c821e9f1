use nalgebra::{Matrix3, Point2, Vector3};

use crate::{Distortion, Error, FisheyeDistortion, Result};

/// Lens model governing how 3-D directions map to 2-D image points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    Perspective,
    Brown,
    Fisheye,
    Spherical,
}

/// Pinhole camera with an isotropic focal length and two radial
/// distortion coefficients.
///
/// Focal lengths are normalized by `max(width, height)`; image points are in
/// normalized image coordinates (see [`normalized_image_coordinates`]).
#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub focal: f64,
    pub focal_prior: f64,
    pub k1: f64,
    pub k2: f64,
    pub k1_prior: f64,
    pub k2_prior: f64,
}

impl PerspectiveCamera {
    pub fn distortion(&self) -> Distortion {
        Distortion::radial(self.k1, self.k2)
    }

    pub fn project(&self, bearing: &Vector3<f64>) -> Point2<f64> {
        let x = bearing.x / bearing.z;
        let y = bearing.y / bearing.z;
        let (xd, yd) = self.distortion().apply(x, y);
        Point2::new(self.focal * xd, self.focal * yd)
    }

    pub fn pixel_bearing(&self, point: Point2<f64>) -> Vector3<f64> {
        let (x, y) = self
            .distortion()
            .remove(point.x / self.focal, point.y / self.focal);
        bearing_from_undistorted(x, y)
    }

    pub fn k_in_pixel_coordinates(&self, width: u32, height: u32) -> Matrix3<f64> {
        let size = width.max(height) as f64;
        let f = self.focal * size;
        Matrix3::new(
            f,
            0.0,
            0.5 * (width as f64 - 1.0),
            0.0,
            f,
            0.5 * (height as f64 - 1.0),
            0.0,
            0.0,
            1.0,
        )
    }
}

/// Pinhole camera with anisotropic focal lengths, a principal point offset
/// and full radial-tangential (Brown) distortion.
#[derive(Debug, Clone, PartialEq)]
pub struct BrownCamera {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub focal_x: f64,
    pub focal_y: f64,
    pub c_x: f64,
    pub c_y: f64,
    pub focal_x_prior: f64,
    pub focal_y_prior: f64,
    pub c_x_prior: f64,
    pub c_y_prior: f64,
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
    pub k1_prior: f64,
    pub k2_prior: f64,
    pub p1_prior: f64,
    pub p2_prior: f64,
    pub k3_prior: f64,
}

impl BrownCamera {
    pub fn distortion(&self) -> Distortion {
        Distortion::new(self.k1, self.k2, self.p1, self.p2, self.k3)
    }

    pub fn project(&self, bearing: &Vector3<f64>) -> Point2<f64> {
        let x = bearing.x / bearing.z;
        let y = bearing.y / bearing.z;
        let (xd, yd) = self.distortion().apply(x, y);
        Point2::new(self.focal_x * xd + self.c_x, self.focal_y * yd + self.c_y)
    }

    pub fn pixel_bearing(&self, point: Point2<f64>) -> Vector3<f64> {
        let (x, y) = self.distortion().remove(
            (point.x - self.c_x) / self.focal_x,
            (point.y - self.c_y) / self.focal_y,
        );
        bearing_from_undistorted(x, y)
    }

    pub fn k_in_pixel_coordinates(&self, width: u32, height: u32) -> Matrix3<f64> {
        let size = width.max(height) as f64;
        Matrix3::new(
            self.focal_x * size,
            0.0,
            self.c_x * size + 0.5 * (width as f64 - 1.0),
            0.0,
            self.focal_y * size,
            self.c_y * size + 0.5 * (height as f64 - 1.0),
            0.0,
            0.0,
            1.0,
        )
    }
}

/// Equidistant fisheye camera with two distortion coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct FisheyeCamera {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub focal: f64,
    pub focal_prior: f64,
    pub k1: f64,
    pub k2: f64,
    pub k1_prior: f64,
    pub k2_prior: f64,
}

impl FisheyeCamera {
    pub fn distortion(&self) -> FisheyeDistortion {
        FisheyeDistortion::new(self.k1, self.k2)
    }

    pub fn project(&self, bearing: &Vector3<f64>) -> Point2<f64> {
        let r = (bearing.x * bearing.x + bearing.y * bearing.y).sqrt();
        if r < 1e-12 {
            return Point2::new(0.0, 0.0);
        }
        let theta = r.atan2(bearing.z);
        let t2 = theta * theta;
        let theta_d = theta * (1.0 + self.k1 * t2 + self.k2 * t2 * t2);
        let s = self.focal * theta_d / r;
        Point2::new(s * bearing.x, s * bearing.y)
    }

    pub fn pixel_bearing(&self, point: Point2<f64>) -> Vector3<f64> {
        let (x, y) = self
            .distortion()
            .remove(point.x / self.focal, point.y / self.focal);
        bearing_from_undistorted(x, y)
    }

    pub fn k_in_pixel_coordinates(&self, width: u32, height: u32) -> Matrix3<f64> {
        let size = width.max(height) as f64;
        let f = self.focal * size;
        Matrix3::new(
            f,
            0.0,
            0.5 * (width as f64 - 1.0),
            0.0,
            f,
            0.5 * (height as f64 - 1.0),
            0.0,
            0.0,
            1.0,
        )
    }
}

/// Full 360-degree equirectangular camera.
#[derive(Debug, Clone, PartialEq)]
pub struct SphericalCamera {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

impl SphericalCamera {
    pub fn project(&self, bearing: &Vector3<f64>) -> Point2<f64> {
        let lon = bearing.x.atan2(bearing.z);
        let lat = (-bearing.y).atan2((bearing.x * bearing.x + bearing.z * bearing.z).sqrt());
        let tau = 2.0 * std::f64::consts::PI;
        Point2::new(lon / tau, -lat / tau)
    }

    pub fn pixel_bearing(&self, point: Point2<f64>) -> Vector3<f64> {
        let tau = 2.0 * std::f64::consts::PI;
        let lon = point.x * tau;
        let lat = -point.y * tau;
        Vector3::new(lat.cos() * lon.sin(), -lat.sin(), lat.cos() * lon.cos())
    }
}

/// Closed set of supported camera models.
#[derive(Debug, Clone, PartialEq)]
pub enum Camera {
    Perspective(PerspectiveCamera),
    Brown(BrownCamera),
    Fisheye(FisheyeCamera),
    Spherical(SphericalCamera),
}

impl Camera {
    pub fn id(&self) -> &str {
        match self {
            Camera::Perspective(c) => &c.id,
            Camera::Brown(c) => &c.id,
            Camera::Fisheye(c) => &c.id,
            Camera::Spherical(c) => &c.id,
        }
    }

    pub fn width(&self) -> u32 {
        match self {
            Camera::Perspective(c) => c.width,
            Camera::Brown(c) => c.width,
            Camera::Fisheye(c) => c.width,
            Camera::Spherical(c) => c.width,
        }
    }

    pub fn height(&self) -> u32 {
        match self {
            Camera::Perspective(c) => c.height,
            Camera::Brown(c) => c.height,
            Camera::Fisheye(c) => c.height,
            Camera::Spherical(c) => c.height,
        }
    }

    pub fn kind(&self) -> ProjectionKind {
        match self {
            Camera::Perspective(_) => ProjectionKind::Perspective,
            Camera::Brown(_) => ProjectionKind::Brown,
            Camera::Fisheye(_) => ProjectionKind::Fisheye,
            Camera::Spherical(_) => ProjectionKind::Spherical,
        }
    }

    /// Project a bearing in the camera frame to normalized image coordinates.
    pub fn project(&self, bearing: &Vector3<f64>) -> Point2<f64> {
        match self {
            Camera::Perspective(c) => c.project(bearing),
            Camera::Brown(c) => c.project(bearing),
            Camera::Fisheye(c) => c.project(bearing),
            Camera::Spherical(c) => c.project(bearing),
        }
    }

    /// Unit bearing of a normalized image point, in the camera frame.
    pub fn pixel_bearing(&self, point: Point2<f64>) -> Vector3<f64> {
        match self {
            Camera::Perspective(c) => c.pixel_bearing(point),
            Camera::Brown(c) => c.pixel_bearing(point),
            Camera::Fisheye(c) => c.pixel_bearing(point),
            Camera::Spherical(c) => c.pixel_bearing(point),
        }
    }

    /// Calibration matrix in pixel coordinates for a raster of the given size.
    ///
    /// Spherical cameras have no pixel calibration matrix.
    pub fn k_in_pixel_coordinates(&self, width: u32, height: u32) -> Result<Matrix3<f64>> {
        match self {
            Camera::Perspective(c) => Ok(c.k_in_pixel_coordinates(width, height)),
            Camera::Brown(c) => Ok(c.k_in_pixel_coordinates(width, height)),
            Camera::Fisheye(c) => Ok(c.k_in_pixel_coordinates(width, height)),
            Camera::Spherical(c) => Err(Error::UnsupportedProjection(format!(
                "no pixel calibration matrix for spherical camera {}",
                c.id
            ))),
        }
    }
}

fn bearing_from_undistorted(x: f64, y: f64) -> Vector3<f64> {
    let l = (x * x + y * y + 1.0).sqrt();
    Vector3::new(x / l, y / l, 1.0 / l)
}

/// Convert a pixel coordinate to normalized image coordinates: centered and
/// scaled by `max(width, height)`.
pub fn normalized_image_coordinates(pixel: Point2<f64>, width: u32, height: u32) -> Point2<f64> {
    let size = width.max(height) as f64;
    Point2::new(
        (pixel.x + 0.5 - width as f64 / 2.0) / size,
        (pixel.y + 0.5 - height as f64 / 2.0) / size,
    )
}

/// Inverse of [`normalized_image_coordinates`].
pub fn denormalized_image_coordinates(point: Point2<f64>, width: u32, height: u32) -> Point2<f64> {
    let size = width.max(height) as f64;
    Point2::new(
        point.x * size - 0.5 + width as f64 / 2.0,
        point.y * size - 0.5 + height as f64 / 2.0,
    )
}
