use anyhow::Result;

mod app;
mod asset_pipeline;
mod camera;
mod config;
mod engine;
mod frame_loop;
mod material_manager;
mod model;
mod orbit_controls;
mod rendering;
mod scene_graph;
mod solar_system;
mod window;

fn main() -> Result<()> {
    pretty_env_logger::init();

    let config = config::AppConfig::from_env();
    log::info!("Loading assets from {}", config.asset_dir.display());

    pollster::block_on(window::run(config))?;

    Ok(())
}
