use std::path::PathBuf;

use winit::dpi::PhysicalSize;

const ASSET_DIR_VAR: &str = "ORRERY_ASSET_DIR";
const MSAA_VAR: &str = "ORRERY_MSAA";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub window_title: String,
    pub initial_size: PhysicalSize<u32>,
    pub asset_dir: PathBuf,
    /// Requested MSAA sample count. Falls back to 1 if the adapter can't do it.
    pub sample_count: u32,
    pub vsync: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window_title: "Orrery".to_string(),
            initial_size: PhysicalSize::new(1280, 720),
            asset_dir: PathBuf::from("assets"),
            sample_count: 4,
            vsync: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(ASSET_DIR_VAR) {
            self.asset_dir = PathBuf::from(dir);
        }

        if let Some(value) = lookup(MSAA_VAR) {
            match value.parse::<u32>() {
                Ok(count @ (1 | 2 | 4 | 8)) => self.sample_count = count,
                _ => log::warn!("Ignoring {MSAA_VAR}={value:?}, expected 1, 2, 4 or 8"),
            }
        }

        self
    }

    pub fn texture_path(&self, file_name: &str) -> PathBuf {
        self.asset_dir.join("textures").join(file_name)
    }

    pub fn shader_dir(&self) -> PathBuf {
        self.asset_dir.join("shaders")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.to_string())
        }
    }

    #[test]
    fn overrides_replace_defaults() {
        let config = AppConfig::default().with_overrides(env(&[
            (ASSET_DIR_VAR, "/opt/orrery"),
            (MSAA_VAR, "1"),
        ]));

        assert_eq!(config.asset_dir, PathBuf::from("/opt/orrery"));
        assert_eq!(config.sample_count, 1);
        assert_eq!(
            config.texture_path("earth.jpg"),
            PathBuf::from("/opt/orrery/textures/earth.jpg")
        );
    }

    #[test]
    fn invalid_sample_count_is_ignored() {
        let config = AppConfig::default().with_overrides(env(&[(MSAA_VAR, "3")]));

        assert_eq!(config.sample_count, 4);
    }
}
