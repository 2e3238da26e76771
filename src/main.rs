use clap::Parser;

use scene_viewer::{ViewerArgs, ViewerConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config: ViewerConfig = ViewerArgs::parse().into();
    log::info!("Assets from {}", config.asset_root.display());

    if let Err(e) = scene_viewer::window::run(config) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
