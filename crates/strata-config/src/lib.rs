//! Configuration for the terrain LOD tools.
//!
//! Settings persist to disk as a RON file and can be overridden from the
//! command line via clap.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{BvhSection, CameraConfig, Config, DebugConfig, LodConfig, TerrainConfig};
pub use error::ConfigError;
