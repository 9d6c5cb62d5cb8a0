use id_arena::{Arena, Id};

use crate::asset_pipeline::materials::MaterialData;

pub type MaterialId = Id<MaterialData>;

pub struct MaterialManager {
    materials: Arena<MaterialData>,
}

impl MaterialManager {
    pub fn new() -> Self {
        Self {
            materials: Arena::new(),
        }
    }

    pub fn add_material(&mut self, material_data: MaterialData) -> MaterialId {
        self.materials.alloc(material_data)
    }

    pub fn materials(&self) -> impl Iterator<Item = (MaterialId, &MaterialData)> {
        self.materials.iter()
    }
}

impl Default for MaterialManager {
    fn default() -> Self {
        Self::new()
    }
}
