//! Runs the terrain pipeline end to end without a window.
//!
//! Loads (or synthesizes) a height raster, builds the CDLOD quadtree, flies a
//! camera over it while logging per-frame selection stats, then builds and
//! validates an LBVH over the triangulated terrain.
//!
//! Run with `cargo run -p strata-demo -- --frames 60 --selection-image sel.png`.

mod camera;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use glam::Vec3;
use strata_bvh::{BvhConfig, BvhError, CpuDevice, LbvhBuilder, TriangleMesh};
use strata_config::{CliArgs, Config, ConfigError};
use strata_lod::{CdlodSettings, CdlodTree, DebugCanvas, LodSelection, TreeError};
use strata_terrain::{
    HeightRaster, HeightmapParams, HeightmapSampler, RasterError, TerrainDimension,
    synthesize_raster,
};
use tracing::{error, info};

use crate::camera::Flythrough;

/// Side length of the top-down selection image.
const SELECTION_IMAGE_SIZE: u32 = 1024;

/// Raster samples per BVH grid cell.
const BVH_GRID_STEP: u32 = 4;

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Raster(#[from] RasterError),
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Bvh(#[from] BvhError),
}

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let config_dir = match args.config.clone().map_or_else(Config::default_dir, Ok) {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    let log_dir = config_dir.join("logs");
    strata_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    match run(&config, args.frames) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &Config, frames: u32) -> Result<(), DemoError> {
    let raster = load_raster(config)?;
    let dimension = TerrainDimension::new(
        Vec3::from_array(config.terrain.world_min),
        Vec3::from_array(config.terrain.world_size),
    );

    let settings = CdlodSettings {
        leaf_size: config.lod.leaf_size,
        lod_count: config.lod.lod_count,
        lod_distance_ratio: config.lod.lod_distance_ratio,
        morph_start_ratio: config.lod.morph_start_ratio,
    };
    let start = Instant::now();
    let tree = CdlodTree::build(raster.clone(), dimension, settings)?;
    info!(
        nodes = tree.nodes().len(),
        roots = tree.roots().len(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Quadtree ready"
    );

    simulate_frames(&tree, config, frames)?;
    build_terrain_bvh(&raster, &dimension, config)?;
    Ok(())
}

fn load_raster(config: &Config) -> Result<HeightRaster, DemoError> {
    if let Some(path) = &config.terrain.heightmap {
        return Ok(HeightRaster::from_png(path)?);
    }

    let sampler = HeightmapSampler::new(HeightmapParams {
        seed: config.terrain.seed as u64,
        ..Default::default()
    });
    Ok(synthesize_raster(
        &sampler,
        config.terrain.synth_width,
        config.terrain.synth_height,
    )?)
}

fn simulate_frames(tree: &CdlodTree, config: &Config, frames: u32) -> Result<(), DemoError> {
    let path = Flythrough::new(tree, &config.camera, frames);
    let mut selection =
        LodSelection::new(tree.settings()).with_sort_by_distance(config.lod.sort_by_distance);
    let mut canvas = DebugCanvas::new();
    let image_path: Option<&PathBuf> = config.debug.selection_image.as_ref();

    let mut total_selected = 0usize;
    for frame in 0..frames {
        let camera = path.camera(tree, frame);
        let last = frame + 1 == frames;
        let debug = (last && image_path.is_some()).then_some(&mut canvas);
        selection.select(tree, &camera, debug);

        let stats = selection.stats();
        total_selected += selection.selected().len();
        tracing::debug!(
            frame,
            selected = selection.selected().len(),
            visited = stats.visited,
            culled = stats.frustum_culled,
            out_of_range = stats.out_of_range,
            min_lod = ?stats.min_lod_level,
            max_lod = ?stats.max_lod_level,
            "Frame selection"
        );
    }

    if frames > 0 {
        info!(
            frames,
            avg_selected = total_selected as f64 / frames as f64,
            "Camera flythrough complete"
        );
    }

    if let Some(image_path) = image_path {
        let image =
            canvas.render_top_down(tree.dimension(), SELECTION_IMAGE_SIZE, SELECTION_IMAGE_SIZE);
        image.save_png(image_path)?;
        info!(
            path = %image_path.display(),
            boxes = canvas.boxes().len(),
            "Wrote selection image"
        );
    }
    Ok(())
}

fn build_terrain_bvh(
    raster: &HeightRaster,
    dimension: &TerrainDimension,
    config: &Config,
) -> Result<(), DemoError> {
    let mesh = TriangleMesh::from_raster(raster, dimension, BVH_GRID_STEP)?;
    let device = match config.bvh.worker_threads {
        Some(threads) => CpuDevice::new(threads)?,
        None => CpuDevice::with_defaults()?,
    };
    let bvh_config = BvhConfig {
        reduction_group_size: config.bvh.reduction_group_size,
        sort_group_size: config.bvh.sort_group_size,
        validate: config.bvh.validate.unwrap_or(cfg!(debug_assertions)),
        ..Default::default()
    };
    let builder = LbvhBuilder::new(device, bvh_config)?;

    let start = Instant::now();
    let bvh = builder.build(&mesh)?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    bvh.validate()?;

    let bounds = bvh.root_bounds();
    info!(
        primitives = mesh.primitive_count(),
        passes = bvh.plan().passes().len(),
        elapsed_ms,
        min = ?bounds.min,
        max = ?bounds.max,
        "Terrain BVH validated"
    );
    Ok(())
}
