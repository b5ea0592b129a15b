//! The external blocking/terrain query service the grid is scanned against.
use std::sync::{PoisonError, RwLock};

use bevy::math::{Rect, Vec2, Vec3, Vec3Swizzles};

/// Answers "is this point blocked" and "what surface is under this point" for the grid.
///
/// The host environment (physics, a tilemap, a heightfield...) implements this.
/// The grid calls it while building and whenever a region is re-evaluated.
pub trait EnvironmentQuery: Send + Sync + 'static {
    /// True if a sphere of `radius` centered on `point` overlaps anything that blocks movement.
    fn is_blocked(&self, point: Vec3, radius: f32) -> bool;

    /// Tag of the surface found by probing straight down through `point`, if anything was hit.
    fn probe_surface(&self, point: Vec3) -> Option<String>;
}

/// An in-memory [`EnvironmentQuery`] made of axis-aligned rectangles on the XZ plane.
///
/// Handy for tilemaps, tests and benchmarks. Rectangles can be added and removed
/// after the grid has been built; call a region update afterwards so the grid sees them.
#[derive(Debug, Default)]
pub struct RectEnvironment {
    blocked: RwLock<Vec<Rect>>,
    surfaces: RwLock<Vec<(Rect, String)>>,
}

impl RectEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block everything inside `rect` (x, z).
    pub fn block(&self, rect: Rect) {
        self.blocked
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(rect);
    }

    /// Remove every blocking rectangle that contains `point` (x, z). Returns how many were removed.
    pub fn unblock_at(&self, point: Vec2) -> usize {
        let mut blocked = self.blocked.write().unwrap_or_else(PoisonError::into_inner);
        let before = blocked.len();
        blocked.retain(|rect| !rect.contains(point));
        before - blocked.len()
    }

    /// Tag the surface inside `rect`. Later rectangles sit on top of earlier ones.
    pub fn paint(&self, rect: Rect, tag: impl Into<String>) {
        self.surfaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((rect, tag.into()));
    }

    /// Remove every surface rectangle that contains `point` (x, z).
    pub fn erase_at(&self, point: Vec2) {
        self.surfaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(rect, _)| !rect.contains(point));
    }
}

impl EnvironmentQuery for RectEnvironment {
    fn is_blocked(&self, point: Vec3, radius: f32) -> bool {
        let center = point.xz();
        self.blocked
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|rect| {
                let closest = center.clamp(rect.min, rect.max);
                closest.distance_squared(center) < radius * radius
            })
    }

    fn probe_surface(&self, point: Vec3) -> Option<String> {
        let center = point.xz();
        self.surfaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(rect, _)| rect.contains(center))
            .map(|(_, tag)| tag.clone())
    }
}
