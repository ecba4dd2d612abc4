//! Command line configuration shared by the demo binaries

use std::path::PathBuf;

use clap::Parser;

use crate::app::RunOptions;
use crate::resources::{validate_cubemap_size, ResourceResult};
use crate::window::WindowConfig;

#[derive(Parser, Debug, Clone)]
#[command(version, about = "Reflectance model and environment mapping demos")]
pub struct DemoArgs {
    /// glTF or GLB model to display; a generated sphere is used when absent
    #[arg(long)]
    pub model: Option<PathBuf>,

    /// Equirectangular Radiance .hdr environment
    #[arg(long)]
    pub hdr: Option<PathBuf>,

    /// Directory with right/left/top/bottom/front/back face images
    #[arg(long, conflicts_with = "hdr")]
    pub skybox_faces: Option<PathBuf>,

    /// Edge length of the converted environment cubemap
    #[arg(long, default_value_t = 512)]
    pub cubemap_size: u32,

    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    #[arg(long, default_value_t = 720)]
    pub height: u32,

    #[arg(long)]
    pub no_vsync: bool,

    /// Start with the GUI hidden (F1 toggles it)
    #[arg(long)]
    pub no_gui: bool,

    /// Exit after rendering this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Bake the HDR cubemap on the CPU instead of the GPU
    #[arg(long)]
    pub cpu_convert: bool,
}

impl DemoArgs {
    /// Checks that clap cannot express
    pub fn validate(&self) -> ResourceResult<()> {
        validate_cubemap_size(self.cubemap_size)?;
        Ok(())
    }

    pub fn window_config(&self, title: &str) -> WindowConfig {
        WindowConfig {
            title: title.to_string(),
            width: self.width.max(1),
            height: self.height.max(1),
            vsync: !self.no_vsync,
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            show_gui: !self.no_gui,
            max_frames: self.max_frames,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourceError;

    fn parse(args: &[&str]) -> DemoArgs {
        DemoArgs::try_parse_from(std::iter::once("demo").chain(args.iter().copied()))
            .expect("arguments should parse")
    }

    #[test]
    fn defaults() {
        let args = parse(&[]);
        assert_eq!(args.cubemap_size, 512);
        assert!(args.model.is_none());
        assert!(args.max_frames.is_none());
        assert!(!args.cpu_convert);
        assert!(args.validate().is_ok());

        let config = args.window_config("Demo");
        assert_eq!(config.title, "Demo");
        assert_eq!((config.width, config.height), (1280, 720));
        assert!(config.vsync);
    }

    #[test]
    fn flags_reach_window_config() {
        let args = parse(&["--width", "800", "--height", "600", "--no-vsync", "--max-frames", "3"]);
        let config = args.window_config("Demo");
        assert_eq!((config.width, config.height), (800, 600));
        assert!(!config.vsync);
        assert_eq!(args.max_frames, Some(3));

        let options = parse(&["--no-gui", "--max-frames", "5"]).run_options();
        assert!(!options.show_gui);
        assert_eq!(options.max_frames, Some(5));
    }

    #[test]
    fn cubemap_size_must_be_power_of_two() {
        let args = parse(&["--cubemap-size", "300"]);
        assert!(matches!(
            args.validate(),
            Err(ResourceError::InvalidCubemapSize(300))
        ));
        assert!(parse(&["--cubemap-size", "8"]).validate().is_err());
        assert!(parse(&["--cubemap-size", "1024"]).validate().is_ok());
    }

    #[test]
    fn environment_sources_are_exclusive() {
        let result = DemoArgs::try_parse_from(["demo", "--hdr", "a.hdr", "--skybox-faces", "sky"]);
        assert!(result.is_err());
    }

    #[test]
    fn paths_are_kept() {
        let args = parse(&["--model", "assets/bunny.glb", "--hdr", "sky.hdr", "--cpu-convert"]);
        assert_eq!(args.model, Some(PathBuf::from("assets/bunny.glb")));
        assert_eq!(args.hdr, Some(PathBuf::from("sky.hdr")));
        assert!(args.cpu_convert);
    }
}
