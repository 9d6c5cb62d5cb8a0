use std::path::PathBuf;

use glam::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadingModel {
    /// Blinn-Phong with a white specular highlight.
    Phong,
    /// Fully rough dielectric.
    Standard,
}

#[derive(Debug, Clone)]
pub struct MaterialData {
    pub name: String,
    pub shading: ShadingModel,
    pub color: Vec3,
    pub emissive: Vec3,
    pub flat_shading: bool,
    pub shininess: f32,
    pub color_map: Option<PathBuf>,
    pub normal_map: Option<PathBuf>,
}

impl MaterialData {
    pub const DEFAULT_SHININESS: f32 = 30.0;

    pub fn phong(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shading: ShadingModel::Phong,
            color: Vec3::ONE,
            emissive: Vec3::ZERO,
            flat_shading: false,
            shininess: Self::DEFAULT_SHININESS,
            color_map: None,
            normal_map: None,
        }
    }

    pub fn standard(name: impl Into<String>) -> Self {
        Self {
            shading: ShadingModel::Standard,
            ..Self::phong(name)
        }
    }

    pub fn with_color_map(mut self, path: impl Into<PathBuf>) -> Self {
        self.color_map = Some(path.into());
        self
    }

    pub fn with_normal_map(mut self, path: impl Into<PathBuf>) -> Self {
        self.normal_map = Some(path.into());
        self
    }
}
