// src/terrain/floating_origin.rs
use glam::{DVec2, Vec3};
use log::info;

use crate::config::config_manager::FloatingOriginConfig;

/// A single rebase: every scene-space position moves by `delta`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OriginShift {
    pub delta: DVec2,
    /// Sum of every delta so far, this one included.
    pub cumulative: DVec2,
}

// Watches the viewer and re-centres the scene once it strays too far from the origin.
// Scene positions are absolute positions plus the cumulative delta.
#[derive(Debug, Clone)]
pub struct FloatingOriginRebaser {
    threshold: f32,
    cumulative: DVec2,
    shifts: u64,
}

impl FloatingOriginRebaser {
    pub fn new(config: &FloatingOriginConfig) -> Self {
        FloatingOriginRebaser {
            threshold: config.threshold,
            cumulative: DVec2::ZERO,
            shifts: 0,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn cumulative_delta(&self) -> DVec2 {
        self.cumulative
    }

    pub fn shift_count(&self) -> u64 {
        self.shifts
    }

    pub fn to_absolute(&self, scene_xz: DVec2) -> DVec2 {
        scene_xz - self.cumulative
    }

    /// Returns a shift when the viewer's horizontal distance from the scene
    /// origin exceeds the threshold. The caller must apply it before reading
    /// any scene position again.
    pub fn check(&mut self, viewer_scene: Vec3) -> Option<OriginShift> {
        let horizontal = DVec2::new(viewer_scene.x as f64, viewer_scene.z as f64);
        if horizontal.length() <= self.threshold as f64 {
            return None;
        }

        let delta = -horizontal;
        self.cumulative += delta;
        self.shifts += 1;
        info!(
            "Floating origin shift #{}: delta ({:.2}, {:.2}), cumulative ({:.2}, {:.2})",
            self.shifts, delta.x, delta.y, self.cumulative.x, self.cumulative.y
        );
        Some(OriginShift {
            delta,
            cumulative: self.cumulative,
        })
    }
}

/// Moves a scene-space point by a shift's delta, leaving height alone.
pub fn apply_shift(point: &mut Vec3, shift: &OriginShift) {
    point.x = (point.x as f64 + shift.delta.x) as f32;
    point.z = (point.z as f64 + shift.delta.y) as f32;
}
