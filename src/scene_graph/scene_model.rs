use id_arena::Id;

use crate::model::Model;

pub type SceneModelId = Id<SceneModel>;

/// CPU-side geometry registered with the scene. Uploaded once by the renderer.
pub struct SceneModel {
    pub model: Model,
}

impl SceneModel {
    pub fn new(model: Model) -> Self {
        Self { model }
    }

    pub fn name(&self) -> &str {
        &self.model.name
    }
}
