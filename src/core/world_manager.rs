use std::sync::Arc;

use glam::{DVec2, Vec3};
use log::info;

use crate::config::config_manager::{ConfigurationManager, StreamingConfiguration};
use crate::core::event_bus::{ChunkLoaded, ChunkUnloaded, EventBus, OriginShifted};
use crate::terrain::chunk_manager::{StreamingController, StreamingStats, TickOutcome};
use crate::terrain::floating_origin::{FloatingOriginRebaser, OriginShift, apply_shift};
use crate::terrain::terrain_error::TerrainResult;

// World manager
//
// Ties the pieces together for a host loop: rebases the scene when the viewer
// strays, streams chunks around it and announces what changed on the event bus.

#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub outcome: TickOutcome,
    pub origin_shift: Option<OriginShift>,
    pub stats: StreamingStats,
}

pub struct TerrainWorld {
    config: StreamingConfiguration,
    rebaser: FloatingOriginRebaser,
    controller: StreamingController,
    event_bus: Arc<EventBus>,
}

impl TerrainWorld {
    pub fn new(config: StreamingConfiguration) -> TerrainResult<Self> {
        config.validate()?;
        let controller = StreamingController::new(
            Arc::new(config.terrain.clone()),
            &config.noise,
            config.threading.resolved_threads(),
        )?;
        info!(
            "TerrainWorld: seed {}, chunk side {} units",
            config.noise.seed,
            config.terrain.chunk_side_length()
        );
        Ok(TerrainWorld {
            rebaser: FloatingOriginRebaser::new(&config.floating_origin),
            controller,
            event_bus: Arc::new(EventBus::new()),
            config,
        })
    }

    pub fn from_manager(manager: &ConfigurationManager) -> TerrainResult<Self> {
        Self::new(manager.get_config().clone())
    }

    /// One frame: rebase if needed, then stream around the viewer.
    ///
    /// `viewer_scene` is moved in place when the origin shifts.
    pub fn update(&mut self, viewer_scene: &mut Vec3) -> TickReport {
        let origin_shift = self.rebaser.check(*viewer_scene);
        if let Some(shift) = &origin_shift {
            apply_shift(viewer_scene, shift);
            self.controller.shift_origin(shift.delta);
            self.event_bus.publish(OriginShifted {
                delta: shift.delta,
                cumulative: shift.cumulative,
            });
        }

        let viewer_absolute = self
            .rebaser
            .to_absolute(DVec2::new(viewer_scene.x as f64, viewer_scene.z as f64));
        let outcome = self.controller.tick(viewer_absolute);

        for &position in &outcome.unloaded {
            self.event_bus.publish(ChunkUnloaded { position });
        }
        for &position in &outcome.loaded {
            self.event_bus.publish(ChunkLoaded { position });
        }

        TickReport {
            outcome,
            origin_shift,
            stats: self.controller.stats(),
        }
    }

    pub fn config(&self) -> &StreamingConfiguration {
        &self.config
    }

    pub fn controller(&self) -> &StreamingController {
        &self.controller
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    pub fn cumulative_delta(&self) -> DVec2 {
        self.rebaser.cumulative_delta()
    }

    pub fn to_absolute(&self, scene_xz: DVec2) -> DVec2 {
        self.rebaser.to_absolute(scene_xz)
    }

    pub fn height(&self, world_xz: DVec2) -> TerrainResult<f32> {
        self.controller.height(world_xz)
    }

    pub fn height_scene(&self, scene_xz: DVec2) -> TerrainResult<f32> {
        self.controller.height_scene(scene_xz)
    }

    pub fn is_fully_loaded(&self) -> bool {
        self.controller.is_fully_loaded()
    }

    pub fn stats(&self) -> StreamingStats {
        self.controller.stats()
    }
}
