// src/bin/flythrough.rs
//
// Flies a viewer in a straight line over the terrain and logs what streaming does.
// Usage: flythrough [config.toml|config.json] [ticks]
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use glam::{DVec2, Vec3};
use log::{error, info};

use endless_terrain::{ConfigurationManager, TerrainError, TerrainWorld};

const DEFAULT_TICKS: usize = 600;
// World units per tick along +x, with a slight drift along +z
const VELOCITY: Vec3 = Vec3::new(24.0, 0.0, 6.0);

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let manager = match args.next() {
        Some(path) => match ConfigurationManager::load_from_file(&path) {
            Ok(manager) => manager,
            Err(e) => {
                error!("Failed to load config {}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => ConfigurationManager::default(),
    };
    let ticks = args
        .next()
        .and_then(|t| t.parse().ok())
        .unwrap_or(DEFAULT_TICKS);

    match run(&manager, ticks) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Flythrough failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(manager: &ConfigurationManager, ticks: usize) -> Result<(), TerrainError> {
    let mut world = TerrainWorld::from_manager(manager)?;
    let mut viewer = Vec3::new(0.0, 100.0, 0.0);

    for tick in 0..ticks {
        let report = world.update(&mut viewer);

        if let Some(shift) = report.origin_shift {
            info!(
                "tick {}: origin shifted by ({:.1}, {:.1})",
                tick, shift.delta.x, shift.delta.y
            );
        }
        if report.outcome.recomputed {
            let s = report.stats;
            info!(
                "tick {}: viewer in T{}, {} wanted, {} resident, {} active, {} in flight",
                tick, report.outcome.viewer_chunk, s.wanted, s.resident, s.active, s.in_flight
            );
        }
        for position in &report.outcome.failed {
            error!("tick {}: T{} failed to generate", tick, position);
        }

        let scene_xz = DVec2::new(viewer.x as f64, viewer.z as f64);
        match world.height_scene(scene_xz) {
            Ok(height) => {
                // Hover above the ground
                viewer.y = height + 20.0;
                if tick % 60 == 0 {
                    let absolute = world.to_absolute(scene_xz);
                    info!(
                        "tick {}: ground {:.2} at absolute ({:.1}, {:.1})",
                        tick, height, absolute.x, absolute.y
                    );
                }
            }
            Err(TerrainError::ChunkNotFound(_)) => {}
            Err(e) => return Err(e),
        }

        viewer += VELOCITY;
        thread::sleep(Duration::from_millis(16));
    }

    let stats = world.stats();
    info!(
        "done: {} resident chunks, {} failures, cumulative origin shift ({:.1}, {:.1})",
        stats.resident,
        stats.failures,
        world.cumulative_delta().x,
        world.cumulative_delta().y
    );
    Ok(())
}
