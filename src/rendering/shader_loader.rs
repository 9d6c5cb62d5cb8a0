use std::{
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, channel},
        Arc, RwLock,
    },
    time::Duration,
};

use anyhow::Context;
use id_arena::{Arena, Id};
use naga::{
    back::wgsl::WriterFlags,
    valid::{Capabilities, ValidationFlags},
};
use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, NagaModuleDescriptor, ShaderLanguage,
};
use notify_debouncer_mini::{
    new_debouncer_opt, notify::*, DebounceEventResult, DebouncedEventKind, Debouncer,
};
use pollster::block_on;
use wgpu::{naga, PollType, RenderPipeline};

const SHARED_MODULES_FOLDER: &str = "shared";

pub type PipelineFactory = Box<
    dyn Sync
        + Send
        + Fn(&wgpu::Device, &ShaderDefinition, &str) -> anyhow::Result<wgpu::RenderPipeline>,
>;

#[derive(Debug, Clone)]
pub struct ShaderDefinition {
    pub name: &'static str,
    /// Relative to the shader folder.
    pub path: &'static str,
}

pub struct ShaderEntry {
    pipeline_id: PipelineId,
    def: ShaderDefinition,
    factory: PipelineFactory,
}

impl ShaderEntry {
    pub fn new(pipeline_id: PipelineId, def: ShaderDefinition, factory: PipelineFactory) -> Self {
        Self {
            pipeline_id,
            def,
            factory,
        }
    }
}

pub type PipelineId = Id<PipelineCacheEntry>;

#[derive(Default)]
pub struct PipelineCacheEntry(Option<wgpu::RenderPipeline>);

impl PipelineCacheEntry {
    pub fn set_pipeline(&mut self, pipeline: wgpu::RenderPipeline) {
        self.0 = Some(pipeline);
    }
}

pub struct PipelineCacheBuilder {
    shaders: Arena<ShaderEntry>,
    pipelines: Arena<PipelineCacheEntry>,
}

impl PipelineCacheBuilder {
    pub fn new() -> Self {
        Self {
            shaders: Arena::new(),
            pipelines: Arena::new(),
        }
    }

    pub fn add_shader(
        &mut self,
        shader_def: ShaderDefinition,
        factory: PipelineFactory,
    ) -> PipelineId {
        let pipeline_id = self.pipelines.alloc(PipelineCacheEntry::default());
        let shader_entry = ShaderEntry::new(pipeline_id, shader_def, factory);
        self.shaders.alloc(shader_entry);
        pipeline_id
    }

    pub fn build(self) -> PipelineCache {
        PipelineCache {
            shaders: Arc::new(self.shaders),
            pipelines: self.pipelines,
        }
    }
}

pub struct PipelineCache {
    shaders: Arc<Arena<ShaderEntry>>,
    pipelines: Arena<PipelineCacheEntry>,
}

impl PipelineCache {
    /// `None` until the pipeline has compiled at least once.
    pub fn get(&self, id: PipelineId) -> Option<&RenderPipeline> {
        self.pipelines.get(id).and_then(|entry| entry.0.as_ref())
    }

    pub fn get_entry_mut(&mut self, id: PipelineId) -> Option<&mut PipelineCacheEntry> {
        self.pipelines.get_mut(id)
    }

    pub fn iter_shaders_and_pipelines_mut(
        &mut self,
    ) -> impl Iterator<Item = (&ShaderEntry, &mut PipelineCacheEntry)> {
        // Both arenas are only ever appended to together in add_shader
        self.shaders
            .iter()
            .map(|(_, shader_entry)| shader_entry)
            .zip(
                self.pipelines
                    .iter_mut()
                    .map(|(_, pipeline_entry)| pipeline_entry),
            )
    }
}

/// Compiles every registered shader up front, then recompiles them on a watcher thread
/// whenever a file under the shader folder changes.
pub struct ShaderLoader {
    pub cache: PipelineCache,
    device: wgpu::Device,
    shader_dir: Arc<PathBuf>,
    receiver: mpsc::Receiver<(&'static str, PipelineId, wgpu::RenderPipeline)>,
    composer: Arc<RwLock<Composer>>,
    _debouncer: Debouncer<notify_debouncer_mini::notify::RecommendedWatcher>,
}

impl ShaderLoader {
    pub fn new(
        device: wgpu::Device,
        cache_builder: PipelineCacheBuilder,
        shader_dir: PathBuf,
    ) -> anyhow::Result<Self> {
        let cache = cache_builder.build();
        let shader_dir = Arc::new(shader_dir);

        let (send_new_pipelines, recv_new_pipelines) = channel();

        let composer = create_composer(&shader_dir.join(SHARED_MODULES_FOLDER))
            .context("Failed to create composer for shader loader")?;
        let composer = Arc::new(RwLock::new(composer));

        let device_loader = device.clone();
        let shaders = cache.shaders.clone();
        let composer_clone = composer.clone();
        let shader_dir_clone = shader_dir.clone();
        let mut debouncer = new_debouncer_opt(
            notify_debouncer_mini::Config::default().with_timeout(Duration::from_millis(100)),
            move |res: DebounceEventResult| match res {
                Ok(events) => {
                    for event in events {
                        if event.kind != DebouncedEventKind::Any {
                            continue;
                        }

                        let Some(entry) = shaders
                            .iter()
                            .find(|(_, entry)| event.path.ends_with(entry.def.path))
                            .map(|(_, entry)| entry)
                        else {
                            continue;
                        };

                        match compile_file(
                            &device_loader,
                            &shader_dir_clone,
                            &entry.def,
                            &entry.factory,
                            &composer_clone,
                        ) {
                            Ok(pipeline) => {
                                if send_new_pipelines
                                    .send((entry.def.name, entry.pipeline_id, pipeline))
                                    .is_err()
                                {
                                    return;
                                }
                            }
                            Err(e) => log::error!("Failed to reload shader: {:?}", e),
                        }
                    }
                }
                Err(e) => log::error!("Error debouncing shader changes: {}", e),
            },
        )
        .context("Failed to create shader watcher")?;

        let absolute_shader_folder = shader_dir
            .canonicalize()
            .with_context(|| format!("Shader folder {} not found", shader_dir.display()))?;

        debouncer
            .watcher()
            .watch(&absolute_shader_folder, RecursiveMode::Recursive)
            .context("Failed to watch shader folder")?;

        let mut shader_loader = Self {
            device,
            cache,
            shader_dir,
            receiver: recv_new_pipelines,
            composer,
            _debouncer: debouncer,
        };

        shader_loader.create_all_pipelines()?;

        Ok(shader_loader)
    }

    pub fn create_all_pipelines(&mut self) -> anyhow::Result<()> {
        for (shader, pipeline_entry) in self.cache.iter_shaders_and_pipelines_mut() {
            let pipeline = compile_file(
                &self.device,
                &self.shader_dir,
                &shader.def,
                &shader.factory,
                &self.composer,
            )
            .with_context(|| format!("Failed to compile shader: {}", shader.def.name))?;
            pipeline_entry.set_pipeline(pipeline);
        }

        Ok(())
    }

    /// Swaps in pipelines recompiled by the watcher since the last call.
    pub fn load_pending_shaders(&mut self) {
        while let Ok((name, pipeline_id, pipeline)) = self.receiver.try_recv() {
            if let Some(entry) = self.cache.get_entry_mut(pipeline_id) {
                log::info!("Shader reloaded: {}", name);
                entry.set_pipeline(pipeline);
            }
        }
    }
}

fn compile_file(
    device: &wgpu::Device,
    shader_dir: &Path,
    shader_def: &ShaderDefinition,
    factory: &PipelineFactory,
    composer: &RwLock<Composer>,
) -> anyhow::Result<wgpu::RenderPipeline> {
    let shader_code = {
        let mut composer = composer
            .write()
            .map_err(|_| anyhow::anyhow!("Shader composer lock is poisoned"))?;

        compose_wgsl(&shader_dir.join(shader_def.path), &mut composer)?
    };

    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let pipeline = factory(device, shader_def, &shader_code);

    device
        .poll(PollType::Wait)
        .context("Failed to poll device after shader compilation")?;

    if let Some(error) = block_on(device.pop_error_scope()) {
        return Err(anyhow::anyhow!(
            "Shader compilation failed for {}: {}",
            shader_def.name,
            error
        ));
    };

    pipeline
}

/// Resolves the imports of a shader file and writes it back out as validated WGSL.
fn compose_wgsl(path: &Path, composer: &mut Composer) -> anyhow::Result<String> {
    let shader_code = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read shader file {}", path.display()))?;

    let file_path = path.to_string_lossy().to_string();

    let module = composer
        .make_naga_module(NagaModuleDescriptor {
            file_path: &file_path,
            source: &shader_code,
            ..Default::default()
        })
        .context("Failed to create Naga module from shader code")?;

    // wgpu validates the module again when it is created
    let info = naga::valid::Validator::new(ValidationFlags::empty(), Capabilities::all())
        .validate(&module)
        .context("Failed to validate Naga module")?;

    naga::back::wgsl::write_string(&module, &info, WriterFlags::empty())
        .context("Failed to convert Naga module to WGSL string")
}

fn create_composer(shared_modules_dir: &Path) -> anyhow::Result<Composer> {
    let mut composer = Composer::default();

    for (file_path, source) in read_shared_modules(shared_modules_dir)? {
        composer
            .add_composable_module(ComposableModuleDescriptor {
                source: &source,
                file_path: &file_path,
                language: ShaderLanguage::Wgsl,
                ..Default::default()
            })
            .with_context(|| format!("Failed to add shared shader module: {}", file_path))?;
    }

    Ok(composer)
}

/// Every `.wgsl` file directly inside the folder, sorted by path.
fn read_shared_modules(dir: &Path) -> anyhow::Result<Vec<(String, String)>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read shared shader modules in {}", dir.display()))?;

    let mut modules = Vec::new();
    for entry in entries {
        let path = entry
            .context("Failed to read entry in shared shader modules directory")?
            .path();

        if !path.is_file() || path.extension().is_none_or(|ext| ext != "wgsl") {
            continue;
        }

        let source = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read shared shader module {}", path.display()))?;
        modules.push((path.to_string_lossy().to_string(), source));
    }

    modules.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(modules)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_modules_skip_other_files() {
        let dir = std::env::temp_dir().join(format!("orrery-shared-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("nested.wgsl")).unwrap();
        std::fs::write(dir.join("b.wgsl"), "// b").unwrap();
        std::fs::write(dir.join("a.wgsl"), "// a").unwrap();
        std::fs::write(dir.join("notes.txt"), "not a shader").unwrap();

        let modules = read_shared_modules(&dir).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        let sources: Vec<_> = modules.iter().map(|(_, source)| source.as_str()).collect();
        assert_eq!(sources, ["// a", "// b"]);
    }

    #[test]
    fn missing_shared_folder_is_an_error() {
        assert!(read_shared_modules(Path::new("/nonexistent/orrery/shaders")).is_err());
    }

    #[test]
    fn shipped_shared_modules_compose() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/shaders/shared");

        create_composer(&dir).unwrap();
    }

    #[test]
    fn shipped_shaders_validate() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/shaders");
        let mut composer = create_composer(&dir.join(SHARED_MODULES_FOLDER)).unwrap();

        for file in ["background.wgsl", "mesh.wgsl"] {
            let wgsl = compose_wgsl(&dir.join(file), &mut composer).unwrap();
            assert!(wgsl.contains("fn fs_main"), "{file} lost its fragment entry point");
        }
    }
}
