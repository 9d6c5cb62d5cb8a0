use id_arena::Id;

use crate::material_manager::MaterialId;
use crate::scene_graph::scene_model::SceneModelId;
use crate::scene_graph::transform::Transform;

pub type ObjectId = Id<Object3D>;

/// A mesh attached to a scene node. Several renderables may share one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Renderable {
    pub model_id: SceneModelId,
    pub material_id: MaterialId,
}

pub struct Object3D {
    pub name: String,
    pub transform: Transform,
    pub renderable: Option<Renderable>,
    pub(super) parent_id: Option<ObjectId>,
    pub(super) child_ids: Vec<ObjectId>,
}

impl Object3D {
    pub fn new(name: impl Into<String>, transform: Transform) -> Self {
        Self {
            name: name.into(),
            transform,
            renderable: None,
            parent_id: None,
            child_ids: Vec::new(),
        }
    }

    pub fn with_renderable(mut self, renderable: Renderable) -> Self {
        self.renderable = Some(renderable);
        self
    }

    #[cfg(test)]
    pub fn parent_id(&self) -> Option<ObjectId> {
        self.parent_id
    }

    #[cfg(test)]
    pub fn child_ids(&self) -> &[ObjectId] {
        &self.child_ids
    }
}

impl Default for Object3D {
    fn default() -> Self {
        Self::new(String::new(), Transform::default())
    }
}
