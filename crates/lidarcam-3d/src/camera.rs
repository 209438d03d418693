use std::path::Path;

use glam::{DMat3, DVec3};
use lidarcam_image::ChannelOrder;
use serde::{Deserialize, Serialize};

use crate::ops::ProjectionError;

/// Represents the intrinsic parameters of a pinhole camera
///
/// # Fields
///
/// * `fx` - The focal length in the x direction
/// * `fy` - The focal length in the y direction
/// * `cx` - The x coordinate of the principal point
/// * `cy` - The y coordinate of the principal point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinholeIntrinsics {
    /// The focal length in the x direction
    pub fx: f64,
    /// The focal length in the y direction
    pub fy: f64,
    /// The x coordinate of the principal point
    pub cx: f64,
    /// The y coordinate of the principal point
    pub cy: f64,
}

impl PinholeIntrinsics {
    /// Create camera intrinsics from focal lengths and principal point.
    pub fn new(fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Convert to the 3x3 camera matrix `[[fx, 0, cx], [0, fy, cy], [0, 0, 1]]`.
    pub fn to_matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }

    /// Check that the focal lengths are non-zero and all values are finite.
    pub fn validate(&self) -> Result<(), ProjectionError> {
        let values = [self.fx, self.fy, self.cx, self.cy];
        if values.iter().any(|v| !v.is_finite()) || self.fx == 0.0 || self.fy == 0.0 {
            return Err(ProjectionError::InvalidIntrinsics {
                fx: self.fx,
                fy: self.fy,
                cx: self.cx,
                cy: self.cy,
            });
        }
        Ok(())
    }
}

/// Radial and tangential lens distortion using the Brown-Conrady model.
///
/// The coefficients follow the OpenCV 5-term order `(k1, k2, p1, p2, k3)`.
/// All-zero coefficients leave points untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BrownConradyDistortion {
    /// First radial distortion coefficient
    #[serde(default)]
    pub k1: f64,
    /// Second radial distortion coefficient
    #[serde(default)]
    pub k2: f64,
    /// First tangential distortion coefficient
    #[serde(default)]
    pub p1: f64,
    /// Second tangential distortion coefficient
    #[serde(default)]
    pub p2: f64,
    /// Third radial distortion coefficient
    #[serde(default)]
    pub k3: f64,
}

impl BrownConradyDistortion {
    /// Create the distortion from coefficients in OpenCV order `[k1, k2, p1, p2, k3]`.
    pub fn from_coeffs(coeffs: [f64; 5]) -> Self {
        let [k1, k2, p1, p2, k3] = coeffs;
        Self { k1, k2, p1, p2, k3 }
    }

    /// Whether every coefficient is zero.
    pub fn is_zero(&self) -> bool {
        [self.k1, self.k2, self.p1, self.p2, self.k3]
            .iter()
            .all(|&c| c == 0.0)
    }

    /// Distort a point given in normalized camera coordinates `(x / z, y / z)`.
    ///
    /// # Returns
    ///
    /// The distorted normalized coordinates, still to be scaled by the focal lengths.
    pub fn distort(&self, x: f64, y: f64) -> (f64, f64) {
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;

        let radial = 1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6;

        let xd = x * radial + 2.0 * self.p1 * x * y + self.p2 * (r2 + 2.0 * x * x);
        let yd = y * radial + self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * x * y;

        (xd, yd)
    }
}

/// Rigid transform from the world (sensor) frame into the camera frame.
///
/// A point `p` in world frame maps to `rotation * p + translation` in camera frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    /// Row-major 3x3 rotation matrix
    pub rotation: [[f64; 3]; 3],
    /// Translation vector
    pub translation: [f64; 3],
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::identity()
    }
}

impl CameraPose {
    /// Maximum absolute deviation of `R^T R` from identity, and of `det(R)` from one.
    pub const DEFAULT_ORTHONORMAL_TOLERANCE: f64 = 1e-3;

    /// Create a pose from a row-major rotation matrix and a translation vector.
    pub fn new(rotation: [[f64; 3]; 3], translation: [f64; 3]) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// The identity pose: world and camera frames coincide.
    pub fn identity() -> Self {
        Self {
            rotation: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            translation: [0.0, 0.0, 0.0],
        }
    }

    /// The rotation as a glam matrix.
    pub fn rotation_matrix(&self) -> DMat3 {
        // glam is column-major, the stored rotation is row-major
        DMat3::from_cols_array_2d(&self.rotation).transpose()
    }

    /// The translation as a glam vector.
    pub fn translation_vector(&self) -> DVec3 {
        DVec3::from_array(self.translation)
    }

    /// Check that the rotation is orthonormal with determinant +1.
    ///
    /// # Arguments
    ///
    /// * `tolerance` - Maximum absolute deviation allowed per entry of `R^T R - I` and for `det(R) - 1`.
    pub fn validate(&self, tolerance: f64) -> Result<(), ProjectionError> {
        let r = self.rotation_matrix();

        let finite = r.is_finite() && self.translation_vector().is_finite();
        let orthonormal = (r.transpose() * r).abs_diff_eq(DMat3::IDENTITY, tolerance);
        let determinant = r.determinant();

        if !finite || !orthonormal || (determinant - 1.0).abs() > tolerance {
            return Err(ProjectionError::InvalidRotation { determinant });
        }

        Ok(())
    }
}

/// A calibrated pinhole camera: intrinsics, optional distortion and pose.
///
/// The parameters are validated once at construction so that projection only has to deal
/// with per-point conditions.
#[derive(Debug, Clone)]
pub struct PinholeCamera {
    intrinsics: PinholeIntrinsics,
    distortion: Option<BrownConradyDistortion>,
    pose: CameraPose,
    rotation: DMat3,
    translation: DVec3,
}

impl PinholeCamera {
    /// Create a camera with the default orthonormality tolerance.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectionError::InvalidIntrinsics`] for zero or non-finite focal lengths and
    /// [`ProjectionError::InvalidRotation`] for a rotation that is not a proper rotation.
    ///
    /// # Example
    ///
    /// ```
    /// use lidarcam_3d::camera::{CameraPose, PinholeCamera, PinholeIntrinsics};
    ///
    /// let camera = PinholeCamera::new(
    ///     PinholeIntrinsics::new(600.0, 600.0, 320.0, 240.0),
    ///     None,
    ///     CameraPose::identity(),
    /// ).unwrap();
    /// assert_eq!(camera.intrinsics().cx, 320.0);
    /// ```
    pub fn new(
        intrinsics: PinholeIntrinsics,
        distortion: Option<BrownConradyDistortion>,
        pose: CameraPose,
    ) -> Result<Self, ProjectionError> {
        Self::with_tolerance(
            intrinsics,
            distortion,
            pose,
            CameraPose::DEFAULT_ORTHONORMAL_TOLERANCE,
        )
    }

    /// Create a camera with an explicit orthonormality tolerance for the rotation.
    pub fn with_tolerance(
        intrinsics: PinholeIntrinsics,
        distortion: Option<BrownConradyDistortion>,
        pose: CameraPose,
        tolerance: f64,
    ) -> Result<Self, ProjectionError> {
        intrinsics.validate()?;
        pose.validate(tolerance)?;

        // zero coefficients are the identity step
        let distortion = distortion.filter(|d| !d.is_zero());

        Ok(Self {
            intrinsics,
            distortion,
            pose,
            rotation: pose.rotation_matrix(),
            translation: pose.translation_vector(),
        })
    }

    /// The camera intrinsics.
    pub fn intrinsics(&self) -> &PinholeIntrinsics {
        &self.intrinsics
    }

    /// The lens distortion, `None` when no distortion is applied.
    pub fn distortion(&self) -> Option<&BrownConradyDistortion> {
        self.distortion.as_ref()
    }

    /// The world to camera pose.
    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }

    /// Transform a world point into the camera frame: `R * p + t`.
    #[inline]
    pub fn world_to_camera(&self, point: &[f64; 3]) -> DVec3 {
        self.rotation * DVec3::from_array(*point) + self.translation
    }
}

/// Error types for loading a camera configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file
    #[error("Failed to read camera configuration. {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration
    #[error("Failed to parse camera configuration. {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration describes an invalid camera
    #[error("Invalid camera configuration. {0}")]
    InvalidCamera(#[from] ProjectionError),
}

/// Camera configuration as provided by the caller, usually from a JSON file.
///
/// # Example
///
/// ```
/// use lidarcam_3d::camera::CameraConfig;
///
/// let config = CameraConfig::from_json_str(r#"{
///     "intrinsics": { "fx": 600.0, "fy": 600.0, "cx": 320.0, "cy": 240.0 },
///     "pose": {
///         "rotation": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
///         "translation": [0.0, 0.0, 0.0]
///     }
/// }"#).unwrap();
/// let camera = config.camera().unwrap();
/// assert!(camera.distortion().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// The camera intrinsics
    pub intrinsics: PinholeIntrinsics,
    /// The lens distortion, absent means no distortion
    #[serde(default)]
    pub distortion: Option<BrownConradyDistortion>,
    /// The world to camera pose
    pub pose: CameraPose,
    /// The channel order of in-memory image buffers registered with this camera.
    ///
    /// Images decoded with `lidarcam-io` are always RGB and do not use this field.
    #[serde(default)]
    pub channel_order: ChannelOrder,
    /// Tolerance used to validate the rotation
    #[serde(default = "default_orthonormal_tolerance")]
    pub orthonormal_tolerance: f64,
}

fn default_orthonormal_tolerance() -> f64 {
    CameraPose::DEFAULT_ORTHONORMAL_TOLERANCE
}

impl CameraConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path)?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }

    /// Build the validated camera described by this configuration.
    pub fn camera(&self) -> Result<PinholeCamera, ConfigError> {
        Ok(PinholeCamera::with_tolerance(
            self.intrinsics,
            self.distortion,
            self.pose,
            self.orthonormal_tolerance,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_intrinsics_matrix() {
        let intrinsics = PinholeIntrinsics::new(600.0, 500.0, 320.0, 240.0);
        assert_eq!(
            intrinsics.to_matrix(),
            [[600.0, 0.0, 320.0], [0.0, 500.0, 240.0], [0.0, 0.0, 1.0]]
        );
    }

    #[test]
    fn test_intrinsics_zero_focal_length() {
        let intrinsics = PinholeIntrinsics::new(0.0, 600.0, 320.0, 240.0);
        assert!(matches!(
            intrinsics.validate(),
            Err(ProjectionError::InvalidIntrinsics { .. })
        ));
        let intrinsics = PinholeIntrinsics::new(600.0, f64::NAN, 320.0, 240.0);
        assert!(intrinsics.validate().is_err());
    }

    #[test]
    fn test_distortion_zero_is_identity() {
        let distortion = BrownConradyDistortion::default();
        assert!(distortion.is_zero());
        assert_eq!(distortion.distort(0.3, -0.2), (0.3, -0.2));
    }

    #[test]
    fn test_distortion_radial_tangential() {
        let distortion = BrownConradyDistortion::from_coeffs([0.1, 0.01, 0.001, 0.002, 0.0001]);
        let (x, y) = (0.2, 0.1);
        let (xd, yd) = distortion.distort(x, y);

        let r2: f64 = 0.05;
        let radial = 1.0 + 0.1 * r2 + 0.01 * r2 * r2 + 0.0001 * r2 * r2 * r2;
        let xd_expected = x * radial + 2.0 * 0.001 * x * y + 0.002 * (r2 + 2.0 * x * x);
        let yd_expected = y * radial + 0.001 * (r2 + 2.0 * y * y) + 2.0 * 0.002 * x * y;

        assert_relative_eq!(xd, xd_expected, epsilon = 1e-12);
        assert_relative_eq!(yd, yd_expected, epsilon = 1e-12);
    }

    #[test]
    fn test_pose_validate() {
        assert!(CameraPose::identity()
            .validate(CameraPose::DEFAULT_ORTHONORMAL_TOLERANCE)
            .is_ok());

        // slightly off rotation as measured by a real lidar/camera rig
        let rig = CameraPose::new(
            [
                [0.9998, -0.0175, 0.0015],
                [0.0175, 0.9998, -0.0045],
                [-0.0013, 0.0046, 0.9999],
            ],
            [0.1, 0.0, 0.15],
        );
        assert!(rig.validate(CameraPose::DEFAULT_ORTHONORMAL_TOLERANCE).is_ok());
        assert!(rig.validate(1e-6).is_err());

        // a reflection is orthonormal but not a rotation
        let reflection = CameraPose::new(
            [[-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            [0.0, 0.0, 0.0],
        );
        assert!(matches!(
            reflection.validate(CameraPose::DEFAULT_ORTHONORMAL_TOLERANCE),
            Err(ProjectionError::InvalidRotation { .. })
        ));

        let scaled = CameraPose::new(
            [[2.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            [0.0, 0.0, 0.0],
        );
        assert!(scaled
            .validate(CameraPose::DEFAULT_ORTHONORMAL_TOLERANCE)
            .is_err());
    }

    #[test]
    fn test_world_to_camera_row_major() -> Result<(), ProjectionError> {
        // 90 degree rotation around z
        let pose = CameraPose::new(
            [[0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]],
            [1.0, 2.0, 3.0],
        );
        let camera = PinholeCamera::new(
            PinholeIntrinsics::new(500.0, 500.0, 320.0, 240.0),
            None,
            pose,
        )?;
        let pc = camera.world_to_camera(&[1.0, 0.0, 5.0]);
        assert_relative_eq!(pc.x, 1.0);
        assert_relative_eq!(pc.y, 3.0);
        assert_relative_eq!(pc.z, 8.0);
        Ok(())
    }

    #[test]
    fn test_camera_drops_zero_distortion() -> Result<(), ProjectionError> {
        let camera = PinholeCamera::new(
            PinholeIntrinsics::new(500.0, 500.0, 320.0, 240.0),
            Some(BrownConradyDistortion::default()),
            CameraPose::identity(),
        )?;
        assert!(camera.distortion().is_none());
        Ok(())
    }

    #[test]
    fn test_config_from_json() -> Result<(), ConfigError> {
        let config = CameraConfig::from_json_str(
            r#"{
                "intrinsics": { "fx": 600.0, "fy": 600.0, "cx": 320.0, "cy": 240.0 },
                "distortion": { "k1": 0.1 },
                "pose": {
                    "rotation": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
                    "translation": [0.1, 0.0, 0.15]
                },
                "channel_order": "rgb"
            }"#,
        )?;

        assert_eq!(config.channel_order, ChannelOrder::Rgb);
        assert_eq!(
            config.orthonormal_tolerance,
            CameraPose::DEFAULT_ORTHONORMAL_TOLERANCE
        );
        assert_eq!(
            config.distortion,
            Some(BrownConradyDistortion::from_coeffs([0.1, 0.0, 0.0, 0.0, 0.0]))
        );

        let camera = config.camera()?;
        assert_eq!(camera.pose().translation, [0.1, 0.0, 0.15]);
        assert!(camera.distortion().is_some());
        Ok(())
    }

    #[test]
    fn test_config_defaults_and_invalid_camera() -> Result<(), ConfigError> {
        let config = CameraConfig::from_json_str(
            r#"{
                "intrinsics": { "fx": 0.0, "fy": 600.0, "cx": 320.0, "cy": 240.0 },
                "pose": {
                    "rotation": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
                    "translation": [0.0, 0.0, 0.0]
                }
            }"#,
        )?;
        assert_eq!(config.channel_order, ChannelOrder::Bgr);
        assert!(config.distortion.is_none());
        assert!(matches!(config.camera(), Err(ConfigError::InvalidCamera(_))));
        Ok(())
    }

    #[test]
    fn test_config_from_file() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("camera.json");

        let config = CameraConfig {
            intrinsics: PinholeIntrinsics::new(600.0, 600.0, 320.0, 240.0),
            distortion: None,
            pose: CameraPose::identity(),
            channel_order: ChannelOrder::Bgr,
            orthonormal_tolerance: 1e-4,
        };
        std::fs::write(&file_path, serde_json::to_string_pretty(&config)?)?;

        let config_back = CameraConfig::from_json_file(&file_path)?;
        assert_eq!(config_back, config);

        assert!(matches!(
            CameraConfig::from_json_file(tmp_dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
        Ok(())
    }
}
