use lidarcam_image::{ChannelOrder, Image};

use crate::{
    camera::PinholeCamera,
    ops::{self, PointProjection, ProjectionError},
    pointcloud::{ColoredPointCloud, PointCloud},
};

/// Error types for the colorization of point clouds.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ColorizeError {
    /// The number of points and projected pixels differ
    #[error("Got {points} points but {pixels} projected pixels")]
    ShapeMismatch {
        /// Number of points
        points: usize,
        /// Number of projected pixels
        pixels: usize,
    },

    /// The projection of the batch failed as a whole
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

/// Colorize points by sampling a registered image at their projected pixels.
///
/// Point `i` takes the color of `projections[i]`. Points projected outside the image and
/// points whose projection failed (behind the camera, zero depth) are dropped; the kept points
/// stay in input order.
///
/// # Arguments
///
/// * `points` - The points in world coordinates.
/// * `projections` - The projection of each point, as returned by [`ops::project_points`].
/// * `image` - The image registered with the camera.
/// * `order` - The channel order of `image`.
///
/// # Errors
///
/// [`ColorizeError::ShapeMismatch`] if `points` and `projections` have different lengths.
///
/// # Example
///
/// ```
/// use lidarcam_3d::colorize::colorize;
/// use lidarcam_3d::ops::Pixel2d;
/// use lidarcam_image::{ChannelOrder, Image, ImageSize};
///
/// let image = Image::<u8, 3>::new(ImageSize { width: 1, height: 1 }, vec![10, 20, 30]).unwrap();
/// let colored = colorize(
///     &[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
///     &[Ok(Pixel2d::new(0, 0)), Ok(Pixel2d::new(1, 0))],
///     &image,
///     ChannelOrder::Bgr,
/// ).unwrap();
///
/// assert_eq!(colored.len(), 1);
/// assert_eq!(colored.colors()[0], [30.0 / 255.0, 20.0 / 255.0, 10.0 / 255.0]);
/// ```
pub fn colorize(
    points: &[[f64; 3]],
    projections: &[PointProjection],
    image: &Image<u8, 3>,
    order: ChannelOrder,
) -> Result<ColoredPointCloud, ColorizeError> {
    if points.len() != projections.len() {
        return Err(ColorizeError::ShapeMismatch {
            points: points.len(),
            pixels: projections.len(),
        });
    }

    let mut colored = ColoredPointCloud::with_capacity(points.len());

    for (point, projection) in points.iter().zip(projections.iter()) {
        let Ok(pixel) = projection else {
            continue;
        };

        if !image.contains(pixel.u, pixel.v) {
            continue;
        }

        // NOTE: bounds are checked above, u is the column and v the row
        let Ok(raw) = image.get_pixel(pixel.u as usize, pixel.v as usize) else {
            continue;
        };

        colored.push(*point, order.to_rgb_normalized(raw));
    }

    Ok(colored)
}

/// Project a point cloud with a camera and colorize it with the registered image.
///
/// # Arguments
///
/// * `pointcloud` - The point cloud in world coordinates.
/// * `camera` - The calibrated camera the image was taken with.
/// * `image` - The image registered with the camera.
/// * `order` - The channel order of `image`.
///
/// # Returns
///
/// The colored subset of the point cloud, in input order.
pub fn colorize_point_cloud(
    pointcloud: &PointCloud,
    camera: &PinholeCamera,
    image: &Image<u8, 3>,
    order: ChannelOrder,
) -> Result<ColoredPointCloud, ColorizeError> {
    let projections = ops::project_points(pointcloud.points(), camera)?;
    colorize_projected(pointcloud, &projections, image, order)
}

/// Same as [`colorize_point_cloud`] but projects the points in parallel.
pub fn par_colorize_point_cloud(
    pointcloud: &PointCloud,
    camera: &PinholeCamera,
    image: &Image<u8, 3>,
    order: ChannelOrder,
) -> Result<ColoredPointCloud, ColorizeError> {
    let projections = ops::par_project_points(pointcloud.points(), camera)?;
    colorize_projected(pointcloud, &projections, image, order)
}

fn colorize_projected(
    pointcloud: &PointCloud,
    projections: &[PointProjection],
    image: &Image<u8, 3>,
    order: ChannelOrder,
) -> Result<ColoredPointCloud, ColorizeError> {
    let failed = projections.iter().filter(|p| p.is_err()).count();
    let colored = colorize(pointcloud.points(), projections, image, order)?;

    log::debug!(
        "colorized {} of {} points ({} not projectable, {} outside {})",
        colored.len(),
        pointcloud.len(),
        failed,
        pointcloud.len() - failed - colored.len(),
        image.size(),
    );

    if colored.is_empty() {
        log::warn!(
            "no point of the cloud ({} points) projects inside the image",
            pointcloud.len()
        );
    }

    Ok(colored)
}
