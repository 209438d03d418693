#![deny(missing_docs)]
//! Image types and channel conventions for point cloud colorization

/// image representation for colorization purposes.
pub mod image;

/// Channel order conventions and color normalization.
pub mod color;

/// Error types for the image module.
pub mod error;

pub use crate::color::ChannelOrder;
pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
