//! Retopology pipeline: snapshot, normalize, mark features, solve, polish, shade.
//!
//! [`Retopo::run`] drives one invocation against the active object of a
//! [`Scene`]. The geometry work is delegated to a [`MeshEngine`]; this module
//! owns the ordering, the face budget, the reference snapshot and error
//! reporting. Stages edit the source mesh destructively, so a failure part
//! way through leaves the mesh as the last successful stage left it.

pub mod budget;
pub mod features;
pub mod polish;
pub mod snapshot;
pub mod state;

pub use budget::estimate;
pub use features::sharpness_threshold_degrees;
pub use snapshot::ReferenceSnapshot;
pub use state::PipelineState;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Settings;
use crate::engine::{EngineError, MeshEngine, QuadRemeshParams, VoxelRemeshParams};
use crate::scene::{ObjectId, ObjectKind, Scene, SceneError};

/// Voxel remesh resolution: cells across the bounding-box diagonal
pub const VOXEL_DIVISIONS: f64 = 150.0;

/// Auto-smooth threshold applied to the finished mesh
pub const AUTO_SMOOTH_DEGREES: f64 = 30.0;

/// The active selection cannot be processed; nothing was modified
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Please select a Mesh object.")]
    NoActiveObject,

    #[error("Please select a Mesh object ('{name}' is a {kind}).")]
    NotAMesh { name: String, kind: ObjectKind },
}

#[derive(Debug, Error)]
pub enum RetopoError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// An engine operation failed; `state` is the last stage that completed
    #[error("Retopology failed during {stage}: {source}")]
    Engine {
        state: PipelineState,
        stage: PipelineState,
        source: EngineError,
    },

    #[error("Retopology failed during {stage}: {source}")]
    Scene {
        stage: PipelineState,
        source: SceneError,
    },
}

impl RetopoError {
    /// True when the run was rejected before touching the scene
    pub fn is_validation(&self) -> bool {
        matches!(self, RetopoError::Validation(_))
    }
}

/// Receives per-stage progress from a run
pub trait StatusReporter {
    fn stage_started(&mut self, _stage: PipelineState) {}

    fn stage_finished(&mut self, _stage: PipelineState, _message: &str) {}

    fn stage_failed(&mut self, _stage: PipelineState, _message: &str) {}
}

impl StatusReporter for () {}

#[derive(Debug, Clone, Serialize)]
pub struct StageRecord {
    pub state: PipelineState,
    pub message: String,
}

/// Outcome of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RetopoReport {
    pub object: String,
    pub target_faces: u32,
    pub realized_faces: usize,
    pub realized_vertices: usize,
    pub seed: u64,
    pub voxel_size: f64,
    /// `None` when curvature detection was off
    pub sharp_edges: Option<usize>,
    pub final_state: PipelineState,
    pub stages: Vec<StageRecord>,
}

impl RetopoReport {
    pub fn message(&self) -> String {
        format!(
            "Success! Generated {} faces (target {}).",
            self.realized_faces, self.target_faces
        )
    }
}

/// Tracks state transitions and forwards them to the reporter
struct Tracker<'r> {
    state: PipelineState,
    pending: PipelineState,
    stages: Vec<StageRecord>,
    reporter: &'r mut dyn StatusReporter,
}

impl<'r> Tracker<'r> {
    fn new(reporter: &'r mut dyn StatusReporter) -> Self {
        Self {
            state: PipelineState::Idle,
            pending: PipelineState::Idle,
            stages: Vec::new(),
            reporter,
        }
    }

    fn begin(&mut self, stage: PipelineState) {
        debug_assert!(self.state.can_advance_to(stage));
        self.pending = stage;
        self.reporter.stage_started(stage);
    }

    fn finish(&mut self, message: String) {
        let stage = self.pending;
        self.state = stage;
        info!("{}", message);
        self.reporter.stage_finished(stage, &message);
        self.stages.push(StageRecord {
            state: stage,
            message,
        });
    }

    fn skip(&self, stage: PipelineState) {
        debug_assert!(stage.is_optional());
        debug!("Skipping {} (disabled)", stage);
    }

    fn engine_error(&self, source: EngineError) -> RetopoError {
        RetopoError::Engine {
            state: self.state,
            stage: self.pending,
            source,
        }
    }

    fn scene_error(&self, source: SceneError) -> RetopoError {
        RetopoError::Scene {
            stage: self.pending,
            source,
        }
    }

    /// The returned error is the one user-facing report of a failure
    fn fail(&mut self, error: &RetopoError) {
        let message = error.to_string();
        debug!("{} failed: {}", self.pending, message);
        self.reporter.stage_failed(self.pending, &message);
        self.state = PipelineState::Failed;
    }
}

/// Check that the active object is a mesh, without touching the scene
pub fn validate_selection(scene: &Scene) -> Result<ObjectId, ValidationError> {
    let id = scene.active().ok_or(ValidationError::NoActiveObject)?;
    let object = scene.get(id).ok_or(ValidationError::NoActiveObject)?;
    match object.kind() {
        ObjectKind::Mesh => Ok(id),
        kind => Err(ValidationError::NotAMesh {
            name: object.name.clone(),
            kind,
        }),
    }
}

/// Seed for runs that do not pin one, so reruns explore different layouts
fn clock_seed() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

/// Pipeline orchestrator
pub struct Retopo<E> {
    engine: E,
    settings: Settings,
}

impl<E: MeshEngine> Retopo<E> {
    pub fn new(engine: E, settings: Settings) -> Self {
        Self { engine, settings }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Retopologize the active object of `scene` in place.
    ///
    /// Validation failures leave the scene untouched. Any later failure
    /// leaves the source mesh partially processed. The reference snapshot
    /// never outlives this call.
    pub fn run(
        &mut self,
        scene: &mut Scene,
        reporter: &mut dyn StatusReporter,
    ) -> Result<RetopoReport, RetopoError> {
        let source = validate_selection(scene)?;
        let seed = self.settings.seed.unwrap_or_else(clock_seed);

        let mut tracker = Tracker::new(reporter);
        let result = self.execute(scene, source, seed, &mut tracker);
        if let Err(e) = &result {
            tracker.fail(e);
        }
        result
    }

    fn execute(
        &mut self,
        scene: &mut Scene,
        source: ObjectId,
        seed: u64,
        tracker: &mut Tracker<'_>,
    ) -> Result<RetopoReport, RetopoError> {
        let settings = self.settings.clone();

        tracker.begin(PipelineState::Snapshotted);
        let mut snapshot =
            ReferenceSnapshot::take(scene, source).map_err(|e| tracker.scene_error(e))?;
        let object = snapshot
            .scene()
            .get(source)
            .map(|o| o.name.clone())
            .unwrap_or_default();
        let extent = snapshot.source().map_err(|e| tracker.scene_error(e))?.extent();
        tracker.finish(format!("Reference snapshot taken for '{object}'"));

        let target_faces = estimate(extent, settings.quality, settings.smart_budget);
        if settings.smart_budget {
            info!(
                "Calculated smart target: {} faces ({} tier, extent {:.4})",
                target_faces, settings.quality, extent
            );
        } else {
            info!("Fixed target: {} faces ({} tier)", target_faces, settings.quality);
        }

        tracker.begin(PipelineState::Normalized);
        let voxel_size = extent / VOXEL_DIVISIONS;
        let mesh = snapshot.source_mut().map_err(|e| tracker.scene_error(e))?;
        self.engine
            .voxel_remesh(mesh, &VoxelRemeshParams::uniform(voxel_size))
            .map_err(|e| tracker.engine_error(e))?;
        tracker.finish(format!(
            "Normalized at voxel size {:.5}: {} faces",
            voxel_size,
            mesh.face_count()
        ));

        let sharp_edges = if settings.detect_curvature {
            tracker.begin(PipelineState::FeaturesMarked);
            let count = features::mark_sharp_edges(
                &mut self.engine,
                mesh,
                settings.clamped_sensitivity(),
            )
            .map_err(|e| tracker.engine_error(e))?;
            tracker.finish(format!(
                "Marked {} sharp edges (threshold {:.1}°)",
                count,
                sharpness_threshold_degrees(settings.curvature_sensitivity)
            ));
            Some(count)
        } else {
            tracker.skip(PipelineState::FeaturesMarked);
            None
        };

        tracker.begin(PipelineState::Solved);
        let params = QuadRemeshParams::new(target_faces).with_seed(seed);
        self.engine
            .quad_remesh(mesh, &params)
            .map_err(|e| tracker.engine_error(e))?;
        tracker.finish(format!(
            "Solved for {} faces: {} faces (seed {})",
            target_faces,
            mesh.face_count(),
            seed
        ));

        if settings.flow_polish {
            tracker.begin(PipelineState::Polished);
            let (mesh, reference) = snapshot.split().map_err(|e| tracker.scene_error(e))?;
            polish::flow_polish(&mut self.engine, mesh, reference)
                .map_err(|e| tracker.engine_error(e))?;
            tracker.finish("Applied relax, volume snap and surface snap".to_string());
        } else {
            tracker.skip(PipelineState::Polished);
        }

        tracker.begin(PipelineState::Shaded);
        let mesh = snapshot.source_mut().map_err(|e| tracker.scene_error(e))?;
        mesh.set_smooth_shading(true);
        mesh.auto_smooth_angle = Some(AUTO_SMOOTH_DEGREES.to_radians());
        tracker.finish(format!(
            "Smooth shading with {AUTO_SMOOTH_DEGREES}° auto smooth"
        ));

        let mut report = RetopoReport {
            object,
            target_faces,
            realized_faces: mesh.face_count(),
            realized_vertices: mesh.vertex_count(),
            seed,
            voxel_size,
            sharp_edges,
            final_state: PipelineState::Done,
            stages: Vec::new(),
        };

        tracker.begin(PipelineState::Done);
        tracker.finish(report.message());
        report.stages = tracker.stages.clone();

        Ok(report)
    }
}
