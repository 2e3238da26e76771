//! Command line arguments

use std::path::PathBuf;

use clap::Parser;

use crate::ViewerConfig;

/// Scene viewer arguments.
#[derive(Parser, Debug)]
#[command(
    name = "scene-viewer",
    about = "Interactive PBR scene viewer",
    long_about = "Loads a model and an environment map, renders them with a PBR shader and \
        exposes the material parameters in a debug UI.\n\n\
        CONTROLS:\n\
          WASD / QE   move the camera, hold Shift to go faster\n\
          Right mouse hold and drag to look around\n\
          Scroll      change movement speed\n\
        \n\
        EXAMPLES:\n\
          # Assets next to the binary\n\
          ./scene-viewer --assets .\n\
        \n\
          # Smoke test\n\
          ./scene-viewer --max-frames 10",
    version
)]
pub struct ViewerArgs {
    /// Initial window width in pixels.
    #[arg(long, default_value = "1024")]
    pub width: u32,

    /// Initial window height in pixels.
    #[arg(long, default_value = "1024")]
    pub height: u32,

    /// Disable vertical sync (may cause tearing).
    #[arg(long)]
    pub no_vsync: bool,

    /// Directory holding `shaders/` and `models/`.
    #[arg(long = "assets", value_name = "DIR")]
    pub assets: Option<PathBuf>,

    /// Exit after rendering N frames (useful for testing).
    #[arg(long)]
    pub max_frames: Option<u64>,
}

impl From<ViewerArgs> for ViewerConfig {
    fn from(args: ViewerArgs) -> Self {
        let defaults = ViewerConfig::default();
        if args.width == 0 || args.height == 0 {
            log::warn!(
                "Ignoring window size {}x{}, using {}x{}",
                args.width,
                args.height,
                defaults.width,
                defaults.height
            );
        }

        Self {
            width: if args.width == 0 { defaults.width } else { args.width },
            height: if args.height == 0 { defaults.height } else { args.height },
            vsync: !args.no_vsync,
            asset_root: args.assets.unwrap_or(defaults.asset_root),
            max_frames: args.max_frames,
            ..defaults
        }
    }
}
