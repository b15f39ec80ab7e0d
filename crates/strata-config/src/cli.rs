//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Command-line arguments. Values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "strata", about = "CDLOD terrain selection and LBVH builder")]
pub struct CliArgs {
    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// 8-bit grayscale PNG heightmap.
    #[arg(long)]
    pub heightmap: Option<PathBuf>,

    /// Number of LOD levels.
    #[arg(long)]
    pub lod_count: Option<u32>,

    /// Leaf node size in samples.
    #[arg(long)]
    pub leaf_size: Option<u32>,

    /// Number of camera frames to simulate.
    #[arg(long, default_value_t = 120)]
    pub frames: u32,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Write a top-down PNG of the last frame's selection.
    #[arg(long)]
    pub selection_image: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref path) = args.heightmap {
            self.terrain.heightmap = Some(path.clone());
        }
        if let Some(count) = args.lod_count {
            self.lod.lod_count = count;
        }
        if let Some(size) = args.leaf_size {
            self.lod.leaf_size = size;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(ref path) = args.selection_image {
            self.debug.selection_image = Some(path.clone());
        }
    }
}
