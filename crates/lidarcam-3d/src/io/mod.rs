/// PCD reader module.
pub mod pcd;

/// PLY writer module.
pub mod ply;
