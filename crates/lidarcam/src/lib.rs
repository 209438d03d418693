#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use lidarcam_image as image;

#[doc(inline)]
pub use lidarcam_io as io;

#[doc(inline)]
pub use lidarcam_3d as k3d;
