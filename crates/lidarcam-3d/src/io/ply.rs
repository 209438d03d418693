use std::io::Write;
use std::path::Path;

use crate::pointcloud::ColoredPointCloud;

/// Error types for the PLY module.
#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    /// Failed to write PLY file
    #[error("Failed to write PLY file")]
    Io(#[from] std::io::Error),

    /// Invalid PLY file extension
    #[error("Invalid PLY file extension. Got:{0}")]
    InvalidFileExtension(String),
}

fn write_header<W: Write>(writer: &mut W, vertex_count: usize) -> Result<(), PlyError> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format binary_little_endian 1.0")?;
    writeln!(writer, "element vertex {vertex_count}")?;
    for name in ["x", "y", "z"] {
        writeln!(writer, "property float {name}")?;
    }
    for name in ["red", "green", "blue"] {
        writeln!(writer, "property uchar {name}")?;
    }
    writeln!(writer, "end_header")?;
    Ok(())
}

/// Write a colored point cloud as binary little-endian PLY into a writer.
///
/// Every vertex is stored as `x y z` floats followed by `red green blue` bytes.
pub fn write_ply_binary_to<W: Write>(
    writer: &mut W,
    pointcloud: &ColoredPointCloud,
) -> Result<(), PlyError> {
    write_header(writer, pointcloud.len())?;

    for (point, color) in pointcloud.points().iter().zip(pointcloud.colors_u8()) {
        for v in point {
            writer.write_all(&(*v as f32).to_le_bytes())?;
        }
        writer.write_all(&color)?;
    }

    writer.flush()?;
    Ok(())
}

/// Write a colored point cloud to a binary little-endian PLY file.
///
/// # Arguments
///
/// * `path` - Path to the `.ply` file, created or truncated.
/// * `pointcloud` - The colored point cloud to write.
pub fn write_ply_binary(
    path: impl AsRef<Path>,
    pointcloud: &ColoredPointCloud,
) -> Result<(), PlyError> {
    let path = path.as_ref();
    if path.extension().map_or(true, |ext| ext != "ply") {
        return Err(PlyError::InvalidFileExtension(
            path.extension()
                .map(|ext| ext.to_string_lossy().to_string())
                .unwrap_or_default(),
        ));
    }

    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_ply_binary_to(&mut writer, pointcloud)
}
