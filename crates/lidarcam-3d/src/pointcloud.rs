/// An ordered set of 3D points.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    // The points in the point cloud.
    points: Vec<[f64; 3]>,
}

impl PointCloud {
    /// Create a new point cloud from points.
    pub fn new(points: Vec<[f64; 3]>) -> Self {
        Self { points }
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Consume the point cloud and return its points.
    pub fn into_points(self) -> Vec<[f64; 3]> {
        self.points
    }
}

impl From<Vec<[f64; 3]>> for PointCloud {
    fn from(points: Vec<[f64; 3]>) -> Self {
        Self::new(points)
    }
}

/// A point cloud where every point carries an RGB color normalized to [0, 1].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColoredPointCloud {
    // The points in the point cloud.
    points: Vec<[f64; 3]>,
    // The colors of the points, one per point.
    colors: Vec<[f64; 3]>,
}

impl ColoredPointCloud {
    /// Create an empty colored point cloud with room for `capacity` points.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
            colors: Vec::with_capacity(capacity),
        }
    }

    /// Append a point and its color.
    #[inline]
    pub fn push(&mut self, point: [f64; 3], color: [f64; 3]) {
        self.points.push(point);
        self.colors.push(color);
    }

    /// Get the number of points in the point cloud.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the point cloud is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get as reference the points in the point cloud.
    pub fn points(&self) -> &[[f64; 3]] {
        &self.points
    }

    /// Get as reference the colors of the points, in red-green-blue order.
    pub fn colors(&self) -> &[[f64; 3]] {
        &self.colors
    }

    /// Iterate over the points as `[x, y, z, r, g, b]`.
    pub fn iter(&self) -> impl Iterator<Item = [f64; 6]> + '_ {
        self.points
            .iter()
            .zip(self.colors.iter())
            .map(|(p, c)| [p[0], p[1], p[2], c[0], c[1], c[2]])
    }

    /// The colors scaled back to 8-bit channels, rounding to the nearest value.
    pub fn colors_u8(&self) -> Vec<[u8; 3]> {
        self.colors
            .iter()
            .map(|c| c.map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pointcloud() {
        let pointcloud = PointCloud::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);

        assert_eq!(pointcloud.len(), 2);
        assert!(!pointcloud.is_empty());
        assert_eq!(pointcloud.points()[1], [1.0, 0.0, 0.0]);
        assert_eq!(
            PointCloud::from(vec![[1.0, 2.0, 3.0]]).into_points(),
            vec![[1.0, 2.0, 3.0]]
        );
    }

    #[test]
    fn test_colored_pointcloud() {
        let mut pointcloud = ColoredPointCloud::with_capacity(2);
        assert!(pointcloud.is_empty());

        pointcloud.push([1.0, 2.0, 3.0], [1.0, 0.0, 0.0]);
        pointcloud.push([4.0, 5.0, 6.0], [30.0 / 255.0, 20.0 / 255.0, 10.0 / 255.0]);

        assert_eq!(pointcloud.len(), 2);
        assert_eq!(pointcloud.points().len(), pointcloud.colors().len());

        let rows = pointcloud.iter().collect::<Vec<_>>();
        assert_eq!(rows[0], [1.0, 2.0, 3.0, 1.0, 0.0, 0.0]);
        assert_eq!(rows[1][..3], [4.0, 5.0, 6.0]);

        assert_eq!(pointcloud.colors_u8(), vec![[255, 0, 0], [30, 20, 10]]);
    }
}
