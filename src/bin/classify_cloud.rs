//! Classify a point cloud onto a voxel grid and report the result.
//!
//! Usage: cargo run --release --bin classify_cloud -- [OPTIONS]
//!
//! Options:
//!   --input <PATH>        JSON array of [x, y, z] points (default: synthetic cloud)
//!   --half-extent <M>     Synthetic patch half-width in meters (default: 2.0)
//!   --seed <SEED>         Synthetic roughness seed (default: 12345)
//!   --config <PATH>       ScanConfig JSON (default: built-in defaults)
//!   --cycles <N>          Scan cycles to run over the same cloud (default: 1)
//!   --output <PATH>       Write a grid snapshot as JSON
//!   --render <PATH>       Write the downsampled point cloud as JSON

use std::path::{Path, PathBuf};
use std::sync::Arc;

use terravox::core::Result;
use terravox::math::Vector3;
use terravox::scan::{downsample_for_render, PointSource, ScanConfig, ScanDriver, StaticSource, SyntheticTerrain};
use terravox::terrain::{TerrainPalette, TerrainType};

fn main() {
    terravox::core::logging::init();

    let args: Vec<String> = std::env::args().collect();
    if let Err(err) = run(&args) {
        log::error!("{}", err);
        std::process::exit(1);
    }
}

fn run(args: &[String]) -> Result<()> {
    let config = match parse_path_arg(args, "--config") {
        Some(path) => ScanConfig::load_sync(&path)?,
        None => ScanConfig::default(),
    };
    let cycles = parse_usize_arg(args, "--cycles").unwrap_or(1).max(1);

    let source: Arc<dyn PointSource> = match parse_path_arg(args, "--input") {
        Some(path) => Arc::new(StaticSource::new(load_points(&path)?)),
        None => {
            let half_extent = parse_f32_arg(args, "--half-extent").unwrap_or(2.0);
            let seed = parse_u32_arg(args, "--seed").unwrap_or(12345);
            log::info!("Using synthetic terrain: half extent {}m, seed {}", half_extent, seed);
            Arc::new(SyntheticTerrain::new(
                half_extent,
                config.analyzer.cluster_cell_size,
                seed,
            )?)
        }
    };

    let driver = ScanDriver::new(&config)?;
    for cycle in 0..cycles {
        let report = driver.run_cycle(source.as_ref());
        log::info!(
            "Cycle {}: {} points, {} labelled, {} cells changed",
            cycle + 1,
            report.points,
            report.labelled_points,
            report.cells_changed
        );
    }

    let stats = driver.stats();
    let palette = TerrainPalette::default();
    driver.read_grid(|grid| {
        let counts = grid.counts_by_type();
        println!(
            "Grid {:?} @ {}m: {} of {} cells occupied",
            grid.dimensions().to_array(),
            grid.voxel_size(),
            counts.total(),
            grid.capacity()
        );
        for terrain in TerrainType::ALL {
            println!(
                "  {:<15} {:>8}  (rgb565 {:#06x})",
                terrain.name(),
                counts.get(terrain),
                palette.color(terrain).to_565()
            );
        }
    });
    println!(
        "Scan time: avg {:.2}ms, max {:.2}ms over {} cycles",
        stats.avg_ms, stats.max_ms, stats.cycle_count
    );

    if let Some(path) = parse_path_arg(args, "--render") {
        let points = source.points();
        let thinned = downsample_for_render(&points, config.max_render_points);
        let raw: Vec<[f32; 3]> = thinned.iter().map(|&p| p.into()).collect();
        write_json(&path, &raw)?;
        log::info!("Wrote {} of {} points to {}", raw.len(), points.len(), path.display());
    }

    if let Some(path) = parse_path_arg(args, "--output") {
        let snapshot = driver.read_grid(|grid| grid.snapshot());
        snapshot.save_sync(&path)?;
        log::info!("Wrote {} voxels to {}", snapshot.voxels.len(), path.display());
    }

    Ok(())
}

fn load_points(path: &Path) -> Result<Vec<Vector3>> {
    let json = std::fs::read_to_string(path)?;
    let raw: Vec<[f32; 3]> = serde_json::from_str(&json)?;
    log::info!("Loaded {} points from {}", raw.len(), path.display());
    Ok(raw.into_iter().map(Vector3::from).collect())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string(value)?)?;
    Ok(())
}

fn parse_f32_arg(args: &[String], flag: &str) -> Option<f32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_u32_arg(args: &[String], flag: &str) -> Option<u32> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_usize_arg(args: &[String], flag: &str) -> Option<usize> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .and_then(|s| s.parse().ok())
}

fn parse_path_arg(args: &[String], flag: &str) -> Option<PathBuf> {
    args.iter().position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
}
