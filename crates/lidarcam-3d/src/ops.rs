use glam::DVec3;
use rayon::prelude::*;

use crate::camera::PinholeCamera;

/// Integer pixel coordinates of a projected point.
///
/// `u` indexes the image width (column) and `v` the image height (row).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pixel2d {
    /// The column of the pixel
    pub u: i64,
    /// The row of the pixel
    pub v: i64,
}

impl Pixel2d {
    /// Create a pixel from its column and row.
    pub fn new(u: i64, v: i64) -> Self {
        Self { u, v }
    }
}

/// Error types for the projection of points onto the image plane.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectionError {
    /// The point lies on the camera plane, the perspective division is undefined
    #[error("Point {index} has zero depth in the camera frame")]
    DegenerateDepth {
        /// Index of the point in the input cloud
        index: usize,
    },

    /// The point lies behind the camera
    #[error("Point {index} is behind the camera (depth {depth})")]
    BehindCamera {
        /// Index of the point in the input cloud
        index: usize,
        /// Depth of the point in the camera frame
        depth: f64,
    },

    /// The point or its projection is not finite
    #[error("Point {index} has non finite coordinates")]
    NonFinite {
        /// Index of the point in the input cloud
        index: usize,
    },

    /// The input point cloud has no points
    #[error("Cannot project an empty point cloud")]
    EmptyPointCloud,

    /// The rotation is not orthonormal or its determinant is not +1
    #[error("Rotation matrix is not a proper rotation (determinant {determinant})")]
    InvalidRotation {
        /// Determinant of the rotation matrix
        determinant: f64,
    },

    /// The focal lengths are zero or the intrinsics are not finite
    #[error("Invalid intrinsics fx: {fx}, fy: {fy}, cx: {cx}, cy: {cy}")]
    InvalidIntrinsics {
        /// Focal length in the x direction
        fx: f64,
        /// Focal length in the y direction
        fy: f64,
        /// Principal point x coordinate
        cx: f64,
        /// Principal point y coordinate
        cy: f64,
    },
}

impl ProjectionError {
    /// Whether the error concerns a single point rather than the whole batch.
    pub fn is_per_point(&self) -> bool {
        matches!(
            self,
            ProjectionError::DegenerateDepth { .. }
                | ProjectionError::BehindCamera { .. }
                | ProjectionError::NonFinite { .. }
        )
    }
}

/// The outcome of projecting a single point of a batch.
pub type PointProjection = Result<Pixel2d, ProjectionError>;

/// Project a point already expressed in the camera frame.
///
/// The projected coordinates are truncated toward zero, not rounded.
fn project_camera_point(index: usize, pc: DVec3, camera: &PinholeCamera) -> PointProjection {
    if !pc.is_finite() {
        return Err(ProjectionError::NonFinite { index });
    }

    if pc.z == 0.0 {
        return Err(ProjectionError::DegenerateDepth { index });
    }

    if pc.z < 0.0 {
        return Err(ProjectionError::BehindCamera {
            index,
            depth: pc.z,
        });
    }

    // normalized image plane coordinates
    let (xn, yn) = (pc.x / pc.z, pc.y / pc.z);

    let (xd, yd) = match camera.distortion() {
        Some(distortion) => distortion.distort(xn, yn),
        None => (xn, yn),
    };

    let intrinsics = camera.intrinsics();
    let x = intrinsics.fx * xd + intrinsics.cx;
    let y = intrinsics.fy * yd + intrinsics.cy;

    if !x.is_finite() || !y.is_finite() {
        return Err(ProjectionError::NonFinite { index });
    }

    // NOTE: `as` truncates toward zero and saturates at the i64 range
    Ok(Pixel2d::new(x as i64, y as i64))
}

/// Project a single 3D point to integer image coordinates.
///
/// # Arguments
///
/// * `point` - The point in world coordinates.
/// * `camera` - The calibrated camera.
///
/// # Returns
///
/// The pixel the point falls into, truncating the sub-pixel coordinates toward zero.
///
/// # Errors
///
/// [`ProjectionError::DegenerateDepth`] when the camera frame depth is exactly zero,
/// [`ProjectionError::BehindCamera`] when it is negative and
/// [`ProjectionError::NonFinite`] for non finite coordinates.
///
/// # Example
///
/// ```
/// use lidarcam_3d::camera::{CameraPose, PinholeCamera, PinholeIntrinsics};
/// use lidarcam_3d::ops::{project_point, Pixel2d};
///
/// let camera = PinholeCamera::new(
///     PinholeIntrinsics::new(600.0, 600.0, 320.0, 240.0),
///     None,
///     CameraPose::identity(),
/// ).unwrap();
///
/// assert_eq!(project_point(&[0.0, 0.0, 2.0], &camera), Ok(Pixel2d::new(320, 240)));
/// ```
pub fn project_point(point: &[f64; 3], camera: &PinholeCamera) -> PointProjection {
    project_camera_point(0, camera.world_to_camera(point), camera)
}

/// Project 3D points to integer image coordinates.
///
/// This function projects 3D world points onto the image plane using the pinhole model:
/// the point is moved into the camera frame with `R * p + t`, divided by its depth,
/// optionally distorted, scaled by the focal lengths and shifted by the principal point.
///
/// # Arguments
///
/// * `points_3d` - Array of 3D points in world coordinates.
/// * `camera` - The calibrated camera.
///
/// # Returns
///
/// One projection per input point, in the same order. Points that cannot be projected keep
/// their slot and carry the per-point error; no bounds filtering is applied here.
///
/// # Errors
///
/// Fails as a whole with [`ProjectionError::EmptyPointCloud`] if `points_3d` is empty.
///
/// # Example
///
/// ```
/// use lidarcam_3d::camera::{CameraPose, PinholeCamera, PinholeIntrinsics};
/// use lidarcam_3d::ops::project_points;
///
/// let camera = PinholeCamera::new(
///     PinholeIntrinsics::new(500.0, 500.0, 320.0, 240.0),
///     None,
///     CameraPose::identity(),
/// ).unwrap();
///
/// let points_3d = vec![[1.0, 2.0, 5.0], [0.0, 0.0, -3.0]];
/// let pixels = project_points(&points_3d, &camera).unwrap();
/// assert_eq!(pixels.len(), 2);
/// assert!(pixels[1].is_err());
/// ```
pub fn project_points(
    points_3d: &[[f64; 3]],
    camera: &PinholeCamera,
) -> Result<Vec<PointProjection>, ProjectionError> {
    if points_3d.is_empty() {
        return Err(ProjectionError::EmptyPointCloud);
    }

    Ok(points_3d
        .iter()
        .enumerate()
        .map(|(i, point)| project_camera_point(i, camera.world_to_camera(point), camera))
        .collect())
}

/// Project 3D points to integer image coordinates in parallel.
///
/// Same contract and output as [`project_points`], the points are split across the global
/// rayon thread pool.
pub fn par_project_points(
    points_3d: &[[f64; 3]],
    camera: &PinholeCamera,
) -> Result<Vec<PointProjection>, ProjectionError> {
    if points_3d.is_empty() {
        return Err(ProjectionError::EmptyPointCloud);
    }

    Ok(points_3d
        .par_iter()
        .enumerate()
        .map(|(i, point)| project_camera_point(i, camera.world_to_camera(point), camera))
        .collect())
}
