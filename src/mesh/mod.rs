pub mod adjacency;
pub mod builder;
pub mod io;
pub mod obj;
pub mod polymesh;
pub mod stl;
pub mod validation;

pub use adjacency::{EdgeAdjacency, dihedral_angle};
pub use builder::{MeshBuilder, Triangle};
pub use io::{MeshFormat, load_mesh, save_mesh};
pub use polymesh::{EdgeKey, Face, Mesh, edge_key};
pub use stl::write_stl;
pub use validation::{TopologyReport, validate_and_fix, validate_mesh};
