use std::io::{BufRead, Read};
use std::path::Path;

use crate::pointcloud::PointCloud;

const MAX_POINT_STEP: usize = 1024;
const MAX_POINTS: usize = 50_000_000;

/// Error types for the PCD module.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PcdError {
    /// Failed to read PCD file
    #[error("Failed to read PCD file")]
    Io(#[from] std::io::Error),

    /// Unsupported field layout or data encoding
    #[error("Unsupported PCD property: {0}")]
    UnsupportedProperty(String),

    /// Malformed PCD header
    #[error("Malformed PCD header")]
    MalformedHeader,

    /// Malformed point record
    #[error("Malformed PCD point record {0}")]
    MalformedPoint(usize),

    /// Invalid PCD file extension
    #[error("Invalid PCD file extension. Got:{0}")]
    InvalidFileExtension(String),
}

/// How the point records follow the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PcdEncoding {
    Ascii,
    Binary,
}

/// Describes a single field in a PCD point record
#[derive(Debug)]
struct PcdField {
    name: String,
    offset: usize, // byte offset within a binary point
    size: usize,   // size of one element (bytes)
    count: usize,  // number of elements
    kind: char,    // PCD type: 'F' = float, 'U' = unsigned int, 'I' = signed int
}

#[derive(Debug)]
struct PcdLayout {
    fields: Vec<PcdField>,
    point_step: usize,
    num_points: usize,
    encoding: PcdEncoding,
}

impl PcdLayout {
    fn field(&self, name: &str) -> Result<&PcdField, PcdError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| PcdError::UnsupportedProperty(format!("missing field {name}")))
    }

    /// Index of the first value of a field within an ascii record.
    fn value_index(&self, name: &str) -> Result<usize, PcdError> {
        let mut index = 0;
        for field in &self.fields {
            if field.name == name {
                return Ok(index);
            }
            index += field.count;
        }
        Err(PcdError::UnsupportedProperty(format!("missing field {name}")))
    }

    fn values_per_point(&self) -> usize {
        self.fields.iter().map(|f| f.count).sum()
    }
}

/// Read a little-endian f32 from a byte buffer
#[inline]
fn read_f32(buf: &[u8], offset: usize) -> Option<f32> {
    let slice = buf.get(offset..offset + 4)?;
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(slice);
    Some(f32::from_le_bytes(bytes))
}

fn parse_list<T: std::str::FromStr>(
    keyword: &str,
    it: std::str::SplitWhitespace<'_>,
) -> Result<Vec<T>, PcdError> {
    it.map(|v| {
        v.parse::<T>()
            .map_err(|_| PcdError::UnsupportedProperty(format!("{keyword} {v}")))
    })
    .collect()
}

fn parse_pcd_layout<R: BufRead>(reader: &mut R) -> Result<PcdLayout, PcdError> {
    let mut field_names: Vec<String> = Vec::new();
    let mut sizes: Vec<usize> = Vec::new();
    let mut types: Vec<char> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    let mut points = None;
    let mut width_height: Option<usize> = None;

    let encoding = loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 {
            return Err(PcdError::MalformedHeader);
        }
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let mut it = line.split_whitespace();
        match it.next() {
            Some("DATA") => match it.next() {
                Some("ascii") => break PcdEncoding::Ascii,
                Some("binary") => break PcdEncoding::Binary,
                other => {
                    return Err(PcdError::UnsupportedProperty(format!(
                        "DATA {}",
                        other.unwrap_or_default()
                    )))
                }
            },
            Some("FIELDS") => field_names = it.map(String::from).collect(),
            Some("SIZE") => sizes = parse_list("SIZE", it)?,
            Some("TYPE") => {
                types = it
                    .map(|v| v.chars().next().ok_or(PcdError::MalformedHeader))
                    .collect::<Result<Vec<_>, _>>()?;
            }
            Some("COUNT") => counts = parse_list("COUNT", it)?,
            Some("WIDTH") | Some("HEIGHT") => {
                let value = it
                    .next()
                    .and_then(|v| v.parse::<usize>().ok())
                    .ok_or(PcdError::MalformedHeader)?;
                width_height = Some(match width_height {
                    Some(w) => w.checked_mul(value).ok_or(PcdError::MalformedHeader)?,
                    None => value,
                });
            }
            Some("POINTS") => {
                let token = it.next().ok_or(PcdError::MalformedHeader)?;
                points = Some(token.parse::<usize>().map_err(|_| PcdError::MalformedHeader)?);
            }
            // VERSION, VIEWPOINT
            _ => {}
        }
    };

    if field_names.is_empty()
        || sizes.len() != field_names.len()
        || types.len() != field_names.len()
        || (!counts.is_empty() && counts.len() != field_names.len())
    {
        return Err(PcdError::MalformedHeader);
    }

    // Compute byte offsets for each field
    let mut offset = 0usize;
    let mut fields: Vec<PcdField> = Vec::with_capacity(field_names.len());

    for (i, name) in field_names.into_iter().enumerate() {
        // If COUNT is omitted, the PCD format defines the default count as 1
        let count = counts.get(i).copied().unwrap_or(1);
        let size = sizes[i];
        let kind = types[i];

        if matches!(name.as_str(), "x" | "y" | "z") && !(size == 4 && count == 1 && kind == 'F') {
            return Err(PcdError::UnsupportedProperty(format!(
                "field {name} must be a single 4 byte float"
            )));
        }

        if fields.iter().any(|f| f.name == name) {
            return Err(PcdError::MalformedHeader);
        }

        let field_bytes = size.checked_mul(count).ok_or(PcdError::MalformedHeader)?;
        let field = PcdField {
            name,
            offset,
            size,
            count,
            kind,
        };

        offset = offset
            .checked_add(field_bytes)
            .ok_or(PcdError::MalformedHeader)?;

        if offset > MAX_POINT_STEP {
            return Err(PcdError::MalformedHeader);
        }

        fields.push(field);
    }

    let num_points = points.or(width_height).ok_or(PcdError::MalformedHeader)?;

    Ok(PcdLayout {
        fields,
        point_step: offset,
        num_points,
        encoding,
    })
}

fn read_points_binary<R: Read>(
    reader: &mut R,
    layout: &PcdLayout,
) -> Result<Vec<[f64; 3]>, PcdError> {
    let offsets = [
        layout.field("x")?.offset,
        layout.field("y")?.offset,
        layout.field("z")?.offset,
    ];

    let mut buffer = vec![0u8; layout.point_step];
    let mut points = Vec::with_capacity(layout.num_points);

    for i in 0..layout.num_points {
        reader.read_exact(&mut buffer)?;

        let mut point = [0.0; 3];
        for (dst, &off) in point.iter_mut().zip(offsets.iter()) {
            *dst = read_f32(&buffer, off).ok_or(PcdError::MalformedPoint(i))? as f64;
        }
        points.push(point);
    }

    Ok(points)
}

fn read_points_ascii<R: BufRead>(
    reader: &mut R,
    layout: &PcdLayout,
) -> Result<Vec<[f64; 3]>, PcdError> {
    let indices = [
        layout.value_index("x")?,
        layout.value_index("y")?,
        layout.value_index("z")?,
    ];
    let values_per_point = layout.values_per_point();

    let mut points = Vec::with_capacity(layout.num_points);
    let mut line = String::new();

    while points.len() < layout.num_points {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(PcdError::MalformedPoint(points.len()));
        }
        if line.trim().is_empty() {
            continue;
        }

        let i = points.len();
        let values = line.split_whitespace().collect::<Vec<_>>();
        if values.len() != values_per_point {
            return Err(PcdError::MalformedPoint(i));
        }

        let mut point = [0.0; 3];
        for (dst, &idx) in point.iter_mut().zip(indices.iter()) {
            // ascii files may write NaN for invalid returns, keep them as is
            *dst = values[idx]
                .parse::<f64>()
                .map_err(|_| PcdError::MalformedPoint(i))?;
        }
        points.push(point);
    }

    Ok(points)
}

/// Read a point cloud from a PCD reader.
///
/// Only the `x`, `y` and `z` fields are kept, any other field is skipped.
pub fn read_pcd_from<R: BufRead>(reader: &mut R) -> Result<PointCloud, PcdError> {
    let layout = parse_pcd_layout(reader)?;

    if layout.num_points == 0 || layout.num_points > MAX_POINTS {
        return Err(PcdError::MalformedHeader);
    }

    log::debug!(
        "reading {} points ({:?}, fields: {})",
        layout.num_points,
        layout.encoding,
        layout
            .fields
            .iter()
            .map(|f| format!("{}:{}{}x{}", f.name, f.kind, f.size, f.count))
            .collect::<Vec<_>>()
            .join(" ")
    );

    let points = match layout.encoding {
        PcdEncoding::Binary => read_points_binary(reader, &layout)?,
        PcdEncoding::Ascii => read_points_ascii(reader, &layout)?,
    };

    Ok(PointCloud::new(points))
}

/// Read a PCD file.
///
/// # Arguments
/// * `path` - Path to a `.pcd` file.
///
/// # Returns
/// A [`PointCloud`] with the 3D points of the file.
///
/// # Supported formats
/// - `DATA ascii` and `DATA binary` (little-endian)
/// - `x`, `y`, `z` stored as 4 byte floats, plus any other fields
pub fn read_pcd(path: impl AsRef<Path>) -> Result<PointCloud, PcdError> {
    let Some(file_ext) = path.as_ref().extension() else {
        return Err(PcdError::InvalidFileExtension("".into()));
    };

    if file_ext != "pcd" {
        return Err(PcdError::InvalidFileExtension(
            file_ext.to_string_lossy().to_string(),
        ));
    }

    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);

    read_pcd_from(&mut reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn fails_on_compressed_data() {
        let data = b"FIELDS x y z
SIZE 4 4 4
TYPE F F F
COUNT 1 1 1
POINTS 1
DATA binary_compressed";
        let mut reader = Cursor::new(&data[..]);
        assert!(matches!(
            parse_pcd_layout(&mut reader),
            Err(PcdError::UnsupportedProperty(_))
        ));
    }

    #[test]
    fn parses_valid_binary_header() -> Result<(), PcdError> {
        let data = b"# .PCD v0.7 - Point Cloud Data file format
VERSION 0.7
FIELDS x y z rgb
SIZE 4 4 4 4
TYPE F F F U
COUNT 1 1 1 1
WIDTH 10
HEIGHT 1
VIEWPOINT 0 0 0 1 0 0 0
POINTS 10
DATA binary";
        let mut reader = Cursor::new(&data[..]);
        let layout = parse_pcd_layout(&mut reader)?;
        assert_eq!(layout.num_points, 10);
        assert_eq!(layout.point_step, 16);
        assert_eq!(layout.encoding, PcdEncoding::Binary);
        assert_eq!(layout.field("rgb")?.offset, 12);
        Ok(())
    }

    #[test]
    fn rejects_wrong_type_for_xyz() {
        let data = b"FIELDS x y z
SIZE 4 4 4
TYPE I I I
COUNT 1 1 1
POINTS 5
DATA binary";
        let mut reader = Cursor::new(&data[..]);
        assert!(parse_pcd_layout(&mut reader).is_err());
    }

    #[test]
    fn reads_ascii_points() -> Result<(), PcdError> {
        let data = b"VERSION 0.7
FIELDS x y z intensity
SIZE 4 4 4 4
TYPE F F F F
WIDTH 3
HEIGHT 1
DATA ascii
0.0 0.0 1.0 0.5
1.5 -2.0 3.25 0.1

-1.0 2.0 -3.0 0.9
";
        let pointcloud = read_pcd_from(&mut Cursor::new(&data[..]))?;
        assert_eq!(
            pointcloud.points(),
            &[[0.0, 0.0, 1.0], [1.5, -2.0, 3.25], [-1.0, 2.0, -3.0]]
        );
        Ok(())
    }

    #[test]
    fn reads_binary_points() -> Result<(), PcdError> {
        let mut data = b"FIELDS x y z rgb
SIZE 4 4 4 4
TYPE F F F U
COUNT 1 1 1 1
POINTS 2
DATA binary
"
        .to_vec();
        for (p, rgb) in [([1.0f32, 2.0, 3.0], 0xff0000u32), ([-4.0, 5.5, 6.0], 0x00ff00)] {
            for v in p {
                data.extend_from_slice(&v.to_le_bytes());
            }
            data.extend_from_slice(&rgb.to_le_bytes());
        }

        let pointcloud = read_pcd_from(&mut Cursor::new(&data[..]))?;
        assert_eq!(pointcloud.points(), &[[1.0, 2.0, 3.0], [-4.0, 5.5, 6.0]]);
        Ok(())
    }

    #[test]
    fn fails_on_truncated_data() {
        let data = b"FIELDS x y z
SIZE 4 4 4
TYPE F F F
POINTS 2
DATA ascii
0.0 0.0 1.0
";
        assert!(matches!(
            read_pcd_from(&mut Cursor::new(&data[..])),
            Err(PcdError::MalformedPoint(1))
        ));
    }

    #[test]
    fn fails_on_width_height_overflow() {
        let data = b"FIELDS x y z
SIZE 4 4 4
TYPE F F F
WIDTH 18446744073709551615
HEIGHT 2
POINTS 1
DATA ascii
1 2 3
";
        assert!(matches!(
            read_pcd_from(&mut Cursor::new(&data[..])),
            Err(PcdError::MalformedHeader)
        ));
    }

    #[test]
    fn rejects_invalid_extension() {
        assert!(matches!(
            read_pcd("cloud.ply"),
            Err(PcdError::InvalidFileExtension(ext)) if ext == "ply"
        ));
    }

    #[test]
    fn reads_pcd_file() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let file_path = tmp_dir.path().join("cloud.pcd");
        std::fs::write(
            &file_path,
            "FIELDS x y z\nSIZE 4 4 4\nTYPE F F F\nPOINTS 1\nDATA ascii\n1 2 3\n",
        )?;

        let pointcloud = read_pcd(&file_path)?;
        assert_eq!(pointcloud.points(), &[[1.0, 2.0, 3.0]]);
        Ok(())
    }
}
