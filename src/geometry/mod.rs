pub mod bounds;
pub mod vector;

pub use bounds::Aabb;
pub use vector::Vec3;
