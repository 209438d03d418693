#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Pinhole camera model and camera configuration.
pub mod camera;

/// Point cloud colorization from registered images.
pub mod colorize;

/// I/O utilities for reading and writing 3D data.
pub mod io;

/// Projection of 3D points onto the image plane.
pub mod ops;

/// Point cloud types.
pub mod pointcloud;
