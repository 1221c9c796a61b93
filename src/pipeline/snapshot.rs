use tracing::{debug, warn};

use crate::mesh::Mesh;
use crate::scene::{ObjectId, Scene, SceneError};

/// Name suffix of the snapshot object
pub const SNAPSHOT_SUFFIX: &str = "_Source_Ref";

/// Guard owning the reference snapshot.
///
/// The snapshot object lives in the scene while the guard is alive and is
/// removed when the guard drops, on every exit path. Only shared references
/// to the snapshot mesh are handed out.
pub struct ReferenceSnapshot<'s> {
    scene: &'s mut Scene,
    source: ObjectId,
    reference: ObjectId,
}

impl<'s> ReferenceSnapshot<'s> {
    /// Duplicate `source` into a hidden snapshot object
    pub fn take(scene: &'s mut Scene, source: ObjectId) -> Result<Self, SceneError> {
        scene.mesh(source)?;
        let reference = scene.duplicate_hidden(source, SNAPSHOT_SUFFIX)?;
        debug!("Reference snapshot {:?} taken from {:?}", reference, source);
        Ok(Self {
            scene,
            source,
            reference,
        })
    }

    pub fn reference_id(&self) -> ObjectId {
        self.reference
    }

    pub fn scene(&self) -> &Scene {
        self.scene
    }

    pub fn source(&self) -> Result<&Mesh, SceneError> {
        self.scene.mesh(self.source)
    }

    pub fn source_mut(&mut self) -> Result<&mut Mesh, SceneError> {
        self.scene.mesh_mut(self.source)
    }

    /// The source mesh for editing alongside the read-only snapshot
    pub fn split(&mut self) -> Result<(&mut Mesh, &Mesh), SceneError> {
        self.scene.mesh_pair_mut(self.source, self.reference)
    }
}

impl Drop for ReferenceSnapshot<'_> {
    fn drop(&mut self) {
        match self.scene.remove_object(self.reference) {
            Ok(_) => debug!("Reference snapshot {:?} removed", self.reference),
            Err(e) => warn!("Failed to remove reference snapshot: {}", e),
        }
    }
}
