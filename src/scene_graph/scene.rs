use glam::{Mat4, Quat};
use id_arena::Arena;

use crate::scene_graph::object3d::{Object3D, ObjectId, Renderable};
use crate::scene_graph::scene_model::{SceneModel, SceneModelId};
#[cfg(test)]
use crate::scene_graph::transform::Transform;

pub struct Scene {
    objects: Arena<Object3D>,
    models: Arena<SceneModel>,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            objects: Arena::new(),
            models: Arena::new(),
        }
    }

    pub fn add_object(&mut self, object: Object3D) -> ObjectId {
        self.objects.alloc(object)
    }

    /// Adds `object` as the last child of `parent`.
    pub fn add_child(&mut self, parent: ObjectId, object: Object3D) -> ObjectId {
        let object_id = self.add_object(object);
        self.set_object_parent(object_id, Some(parent));
        object_id
    }

    #[cfg(test)]
    pub fn get_object(&self, id: ObjectId) -> Option<&Object3D> {
        self.objects.get(id)
    }

    #[cfg(test)]
    pub fn get_object_by_name(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .find(|(_, object)| object.name == name)
            .map(|(id, _)| id)
    }

    pub fn add_model(&mut self, model: SceneModel) -> SceneModelId {
        self.models.alloc(model)
    }

    pub fn models(&self) -> impl Iterator<Item = (SceneModelId, &SceneModel)> {
        self.models.iter()
    }

    /// Updates all object transforms in hierarchical order
    fn update_transforms(&self) {
        let root_objects = self
            .objects
            .iter()
            .filter(|(_, object)| object.parent_id.is_none())
            .map(|(id, _)| id);

        for root_id in root_objects {
            self.update_object_transform_recursive(root_id, Mat4::IDENTITY);
        }
    }

    fn update_object_transform_recursive(&self, object_id: ObjectId, parent_world_matrix: Mat4) {
        let Some(object) = self.objects.get(object_id) else {
            return;
        };

        // The local matrix must be refreshed first, it flags the world matrix as dirty
        let local_matrix = object.transform.local_matrix();
        if object.transform.is_world_dirty() {
            object
                .transform
                .set_world_matrix(parent_world_matrix * local_matrix);
        }

        let world_matrix = object.transform.world_matrix();
        for &child_id in &object.child_ids {
            self.update_object_transform_recursive(child_id, world_matrix);
        }
    }

    /// Invalidates world transforms for an object and all its descendants
    pub fn invalidate_object_hierarchy(&self, object_id: ObjectId) {
        if let Some(object) = self.objects.get(object_id) {
            object.transform.invalidate_world();

            for &child_id in &object.child_ids {
                self.invalidate_object_hierarchy(child_id);
            }
        }
    }

    /// Sets the parent of an object and updates child relationships
    pub fn set_object_parent(&mut self, child_id: ObjectId, new_parent_id: Option<ObjectId>) {
        if let Some(old_parent_id) = self.objects.get(child_id).and_then(|c| c.parent_id) {
            if let Some(old_parent) = self.objects.get_mut(old_parent_id) {
                old_parent.child_ids.retain(|&id| id != child_id);
            }
        }

        if let Some(child) = self.objects.get_mut(child_id) {
            child.parent_id = new_parent_id;
        }

        if let Some(new_parent) = new_parent_id.and_then(|id| self.objects.get_mut(id)) {
            new_parent.child_ids.push(child_id);
        }

        self.invalidate_object_hierarchy(child_id);
    }

    pub fn set_object_rotation(&mut self, object_id: ObjectId, rotation: Quat) {
        if let Some(object) = self.objects.get_mut(object_id) {
            object.transform.set_rotation(rotation);
        }
        self.invalidate_object_hierarchy(object_id);
    }

    #[cfg(test)]
    pub fn get_object_transform(&self, object_id: ObjectId) -> Option<&Transform> {
        self.objects.get(object_id).map(|object| &object.transform)
    }

    /// Every node carrying a renderable, with its current world matrix.
    pub fn renderables(&self) -> impl Iterator<Item = (ObjectId, Renderable, Mat4)> + '_ {
        self.objects.iter().filter_map(|(id, object)| {
            object
                .renderable
                .map(|renderable| (id, renderable, object.transform.world_matrix()))
        })
    }

    pub fn log_hierarchy(&self) {
        for (id, object) in self.objects.iter() {
            if object.parent_id.is_none() {
                self.log_object(id, 0);
            }
        }
    }

    fn log_object(&self, object_id: ObjectId, depth: usize) {
        let Some(object) = self.objects.get(object_id) else {
            return;
        };

        log::debug!(
            "{:indent$}{} (mesh: {})",
            "",
            object.name,
            object.renderable.is_some(),
            indent = depth * 2
        );

        for &child_id in &object.child_ids {
            self.log_object(child_id, depth + 1);
        }
    }

    pub fn late_update(&mut self) {
        self.update_transforms();
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}
