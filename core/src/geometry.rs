use nalgebra::{Matrix3, Vector3};

/// World-to-camera rigid transform.
///
/// Stored as a rotation matrix and a translation, with the camera optical
/// center exposed through [`Pose::origin`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    rotation: Matrix3<f64>,
    translation: Vector3<f64>,
}

impl Pose {
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Build a pose from a rotation and the camera center in world coordinates.
    pub fn from_rotation_origin(rotation: Matrix3<f64>, origin: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation: -(rotation * origin),
        }
    }

    pub fn rotation_matrix(&self) -> &Matrix3<f64> {
        &self.rotation
    }

    pub fn translation(&self) -> &Vector3<f64> {
        &self.translation
    }

    /// Camera optical center in world coordinates.
    pub fn origin(&self) -> Vector3<f64> {
        -(self.rotation.transpose() * self.translation)
    }

    pub fn set_rotation_matrix(&mut self, rotation: Matrix3<f64>) {
        self.rotation = rotation;
    }

    pub fn set_origin(&mut self, origin: Vector3<f64>) {
        self.translation = -(self.rotation * origin);
    }

    /// Transform a world point into the camera frame.
    pub fn transform(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * point + self.translation
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            rotation: Matrix3::identity(),
            translation: Vector3::zeros(),
        }
    }
}

/// Radial-tangential (Brown) distortion in normalized image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Distortion {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
}

impl Distortion {
    pub fn new(k1: f64, k2: f64, p1: f64, p2: f64, k3: f64) -> Self {
        Self { k1, k2, p1, p2, k3 }
    }

    pub fn radial(k1: f64, k2: f64) -> Self {
        Self::new(k1, k2, 0.0, 0.0, 0.0)
    }

    pub fn none() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0, 0.0)
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let r2 = x * x + y * y;
        let radial = 1.0 + self.k1 * r2 + self.k2 * r2 * r2 + self.k3 * r2 * r2 * r2;
        let dx = 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let dy = self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;
        (x * radial + dx, y * radial + dy)
    }

    /// Invert [`Distortion::apply`] by iterative compensation.
    pub fn remove(&self, x: f64, y: f64) -> (f64, f64) {
        let mut xd = x;
        let mut yd = y;
        for _ in 0..10 {
            let (xu, yu) = self.apply(xd, yd);
            xd += x - xu;
            yd += y - yu;
        }
        (xd, yd)
    }
}

impl Default for Distortion {
    fn default() -> Self {
        Self::none()
    }
}

/// Equidistant fisheye distortion in normalized image coordinates.
///
/// Maps an undistorted pinhole coordinate of radius `r = tan(theta)` to a
/// distorted radius `theta_d = theta * (1 + k1 theta^2 + k2 theta^4)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FisheyeDistortion {
    pub k1: f64,
    pub k2: f64,
}

impl FisheyeDistortion {
    pub fn new(k1: f64, k2: f64) -> Self {
        Self { k1, k2 }
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let r = (x * x + y * y).sqrt();
        if r < 1e-12 {
            return (x, y);
        }
        let theta = r.atan();
        let t2 = theta * theta;
        let theta_d = theta * (1.0 + self.k1 * t2 + self.k2 * t2 * t2);
        let scale = theta_d / r;
        (x * scale, y * scale)
    }

    pub fn remove(&self, x: f64, y: f64) -> (f64, f64) {
        let rd = (x * x + y * y).sqrt();
        if rd < 1e-12 {
            return (x, y);
        }
        // The distorted radius equals theta_d; recover theta by fixed point.
        let theta_d = rd;
        let mut theta = theta_d;
        for _ in 0..10 {
            let t2 = theta * theta;
            theta = theta_d / (1.0 + self.k1 * t2 + self.k2 * t2 * t2);
        }
        let scale = theta.tan() / rd;
        (x * scale, y * scale)
    }
}
