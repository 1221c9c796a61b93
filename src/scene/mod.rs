//! Host scene model: named objects, visibility and the active selection.
//!
//! Objects live in an arena and are addressed by [`ObjectId`]. Ids are never
//! reused, so a stale id from a removed object fails lookups instead of
//! silently aliasing a newer object.

use std::fmt;

use thiserror::Error;

use crate::mesh::Mesh;

/// Stable handle to a scene object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectId(usize);

/// Object type, as far as the pipeline cares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Mesh,
    Curve,
    Empty,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectKind::Mesh => "mesh",
            ObjectKind::Curve => "curve",
            ObjectKind::Empty => "empty",
        };
        f.write_str(name)
    }
}

/// Type-specific object payload
#[derive(Debug, Clone)]
pub enum ObjectData {
    Mesh(Mesh),
    /// Control points of a curve; carried but never processed
    Curve(Vec<[f64; 3]>),
    Empty,
}

impl ObjectData {
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectData::Mesh(_) => ObjectKind::Mesh,
            ObjectData::Curve(_) => ObjectKind::Curve,
            ObjectData::Empty => ObjectKind::Empty,
        }
    }
}

/// Visibility channels of an object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub viewport: bool,
    pub render: bool,
    pub selectable: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            viewport: true,
            render: true,
            selectable: true,
        }
    }
}

impl Visibility {
    /// Hidden from every channel
    pub fn hidden() -> Self {
        Self {
            viewport: false,
            render: false,
            selectable: false,
        }
    }

    pub fn is_hidden(&self) -> bool {
        !self.viewport && !self.render && !self.selectable
    }
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub data: ObjectData,
    pub visibility: Visibility,
}

impl SceneObject {
    pub fn new(name: impl Into<String>, data: ObjectData) -> Self {
        Self {
            name: name.into(),
            data,
            visibility: Visibility::default(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.data.kind()
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.data {
            ObjectData::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.data {
            ObjectData::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }
}

/// Errors raised by scene bookkeeping
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("object {0:?} does not exist")]
    MissingObject(ObjectId),

    #[error("object '{name}' is a {kind}, not a mesh")]
    NotAMesh { name: String, kind: ObjectKind },

    #[error("cannot pair object {0:?} with itself")]
    SameObject(ObjectId),
}

/// A document holding objects and the user's active selection
#[derive(Debug, Default)]
pub struct Scene {
    objects: Vec<Option<SceneObject>>,
    active: Option<ObjectId>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, object: SceneObject) -> ObjectId {
        self.objects.push(Some(object));
        ObjectId(self.objects.len() - 1)
    }

    /// Add a visible mesh object
    pub fn add_mesh(&mut self, name: impl Into<String>, mesh: Mesh) -> ObjectId {
        self.add_object(SceneObject::new(name, ObjectData::Mesh(mesh)))
    }

    pub fn get(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.get(id).is_some()
    }

    /// Unlink and return an object. Clears the active selection if it pointed here.
    pub fn remove_object(&mut self, id: ObjectId) -> Result<SceneObject, SceneError> {
        let slot = self
            .objects
            .get_mut(id.0)
            .ok_or(SceneError::MissingObject(id))?;
        let object = slot.take().ok_or(SceneError::MissingObject(id))?;
        if self.active == Some(id) {
            self.active = None;
        }
        Ok(object)
    }

    pub fn set_active(&mut self, id: Option<ObjectId>) -> Result<(), SceneError> {
        if let Some(id) = id
            && !self.contains(id)
        {
            return Err(SceneError::MissingObject(id));
        }
        self.active = id;
        Ok(())
    }

    pub fn active(&self) -> Option<ObjectId> {
        self.active
    }

    pub fn active_object(&self) -> Option<&SceneObject> {
        self.active.and_then(|id| self.get(id))
    }

    pub fn mesh(&self, id: ObjectId) -> Result<&Mesh, SceneError> {
        let object = self.get(id).ok_or(SceneError::MissingObject(id))?;
        object.mesh().ok_or_else(|| SceneError::NotAMesh {
            name: object.name.clone(),
            kind: object.kind(),
        })
    }

    pub fn mesh_mut(&mut self, id: ObjectId) -> Result<&mut Mesh, SceneError> {
        let object = self.get_mut(id).ok_or(SceneError::MissingObject(id))?;
        let (name, kind) = (object.name.clone(), object.kind());
        object
            .mesh_mut()
            .ok_or(SceneError::NotAMesh { name, kind })
    }

    /// Borrow one mesh mutably and another immutably at the same time
    pub fn mesh_pair_mut(
        &mut self,
        target: ObjectId,
        other: ObjectId,
    ) -> Result<(&mut Mesh, &Mesh), SceneError> {
        if target == other {
            return Err(SceneError::SameObject(target));
        }
        // Validate both before splitting the arena
        self.mesh(target)?;
        self.mesh(other)?;

        let (low, high) = (target.0.min(other.0), target.0.max(other.0));
        let (head, tail) = self.objects.split_at_mut(high);
        let (low_slot, high_slot) = (&mut head[low], &mut tail[0]);
        let (target_slot, other_slot) = if target.0 < other.0 {
            (low_slot, high_slot)
        } else {
            (high_slot, low_slot)
        };

        match (
            target_slot.as_mut().and_then(SceneObject::mesh_mut),
            other_slot.as_ref().and_then(SceneObject::mesh),
        ) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(SceneError::MissingObject(target)),
        }
    }

    /// Copy an object (including its mesh data) into a new, hidden object.
    ///
    /// The copy is named `<name><suffix>` and is not selectable, so it never
    /// becomes the active object by accident.
    pub fn duplicate_hidden(&mut self, id: ObjectId, suffix: &str) -> Result<ObjectId, SceneError> {
        let source = self.get(id).ok_or(SceneError::MissingObject(id))?;
        let mut copy = source.clone();
        copy.name = format!("{}{}", source.name, suffix);
        copy.visibility = Visibility::hidden();
        Ok(self.add_object(copy))
    }

    /// Number of live objects
    pub fn object_count(&self) -> usize {
        self.objects.iter().flatten().count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|o| (ObjectId(i), o)))
    }

    pub fn find_by_name(&self, name: &str) -> Option<ObjectId> {
        self.iter().find(|(_, o)| o.name == name).map(|(id, _)| id)
    }
}
