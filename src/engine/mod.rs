//! The operations the pipeline delegates.
//!
//! [`MeshEngine`] is the seam between orchestration and geometry processing:
//! a host application can route these calls into its own remesher and
//! modifiers, while [`NativeEngine`] provides a self-contained implementation.
//! Every call edits the mesh eagerly and irreversibly.

pub mod native;
pub mod project;
pub mod quad;
pub mod relax;
pub mod surface;
pub mod voxel;

pub use native::{NativeEngine, NativeEngineConfig};

use thiserror::Error;

use crate::mesh::Mesh;

/// Result type alias using [`EngineError`]
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Failures raised by engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// Voxel size is zero, negative or not finite (e.g. a zero-size object).
    #[error("degenerate voxel size {0} (object has no extent?)")]
    DegenerateVoxelSize(f64),

    /// The voxel grid would exceed the configured cell budget.
    #[error("voxel grid of {cells} cells exceeds the limit of {limit}")]
    GridTooLarge { cells: usize, limit: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: &'static str,
    },

    /// The engine does not implement a requested option.
    #[error("unsupported option: {0}")]
    Unsupported(&'static str),

    /// The mesh cannot be processed in its current state.
    #[error("malformed mesh: {0}")]
    MalformedMesh(String),

    /// The remesher ran but could not produce usable output.
    #[error("remesh failed: {0}")]
    RemeshFailed(String),
}

impl EngineError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        EngineError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }
}

/// Parameters for a voxel remesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelRemeshParams {
    /// Edge length of one voxel, in model units
    pub voxel_size: f64,
    /// 0.0 for a strictly uniform grid
    pub adaptivity: f64,
}

impl VoxelRemeshParams {
    pub fn uniform(voxel_size: f64) -> Self {
        Self {
            voxel_size,
            adaptivity: 0.0,
        }
    }
}

/// Parameters for a quad-dominant remesh
#[derive(Debug, Clone, PartialEq)]
#[allow(clippy::struct_excessive_bools)]
pub struct QuadRemeshParams {
    /// Face count to solve for directly
    pub target_faces: u32,
    /// Keep edges marked sharp as feature lines
    pub preserve_sharp: bool,
    /// Keep open boundaries in place
    pub preserve_boundary: bool,
    /// Enforce mirror symmetry
    pub use_symmetry: bool,
    /// Let the solver set smooth shading on its output
    pub smooth_normals: bool,
    /// Seed for the solver's randomized choices
    pub seed: u64,
}

impl QuadRemeshParams {
    pub fn new(target_faces: u32) -> Self {
        Self {
            target_faces,
            preserve_sharp: true,
            preserve_boundary: true,
            use_symmetry: false,
            smooth_normals: false,
            seed: 0,
        }
    }

    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub const fn with_preserve_sharp(mut self, preserve: bool) -> Self {
        self.preserve_sharp = preserve;
        self
    }
}

/// Parameters for Laplacian smoothing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothParams {
    pub iterations: u32,
    /// Step toward the neighbor average per iteration, in `(0, 1]`
    pub factor: f64,
}

/// How vertices find their spot on the target surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectMethod {
    /// Cast along the vertex normal, in the enabled directions
    Project { positive: bool, negative: bool },
    /// Closest point on the target, in any direction
    NearestSurfacePoint,
}

/// Parameters for shrinkwrap-style projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectParams {
    pub method: ProjectMethod,
    /// Distance kept from the target surface along the projection direction
    pub offset: f64,
}

/// Geometry operations consumed by the pipeline
pub trait MeshEngine {
    /// Replace the mesh with a watertight approximation sampled on a voxel grid.
    fn voxel_remesh(&mut self, mesh: &mut Mesh, params: &VoxelRemeshParams) -> EngineResult<()>;

    /// Flag every manifold edge whose dihedral angle exceeds `sharpness`
    /// (radians) as sharp. Returns the number of edges selected.
    fn mark_sharp_edges(&mut self, mesh: &mut Mesh, sharpness: f64) -> EngineResult<usize>;

    /// Replace the mesh with a quad-dominant mesh of about `target_faces` faces.
    fn quad_remesh(&mut self, mesh: &mut Mesh, params: &QuadRemeshParams) -> EngineResult<()>;

    /// Relax vertex positions.
    fn smooth(&mut self, mesh: &mut Mesh, params: &SmoothParams) -> EngineResult<()>;

    /// Move vertices onto `target`.
    fn project(&mut self, mesh: &mut Mesh, target: &Mesh, params: &ProjectParams) -> EngineResult<()>;
}
