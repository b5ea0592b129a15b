//! Footprint claims and their delayed release.
use std::time::Duration;

use bevy::{
    log::debug,
    math::{UVec2, Vec2, Vec3},
    prelude::{Component, ReflectComponent},
    reflect::Reflect,
    time::{Timer, TimerMode},
};
use slab::Slab;

use crate::{
    cell::OccupantId,
    grid::{CellRect, SpatialGrid},
    FxIndexMap,
};

/// How long a moved occupant keeps its previous cells claimed.
pub const DEFAULT_RELEASE_DELAY: Duration = Duration::from_millis(300);

/// Horizontal half-size (X, Z) of an occupant in world units.
///
/// The center cell covers half a cell each way, so an object up to one cell wide
/// claims a single cell and wider objects spill one cell per extra diameter.
#[derive(Component, Reflect, Clone, Copy, Debug, PartialEq)]
#[reflect(Component)]
pub struct Footprint {
    pub half_extents: Vec2,
}

impl Footprint {
    pub fn new(half_extents: Vec2) -> Self {
        Footprint { half_extents }
    }

    /// Footprint of an object `size` wide and deep.
    pub fn from_size(size: Vec2) -> Self {
        Footprint {
            half_extents: size * 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Claim {
    center: Vec3,
    half: UVec2,
    rect: CellRect,
}

/// Last known placement of an obstacle that does not move.
#[derive(Clone, Copy, Debug)]
struct StaticFootprint {
    center: Vec3,
    footprint: Footprint,
}

#[derive(Debug)]
struct PendingRelease {
    occupant: OccupantId,
    center: Vec3,
    half: UVec2,
    timer: Timer,
}

/// Applies occupant footprints to the grid.
///
/// A dynamic update claims the new footprint immediately and releases the
/// previous one only after a delay, so for a short while a moving occupant
/// covers both. Releases only ever clear cells stamped by their own occupant
/// that are not part of its current claim. Any cleared cell that lies inside
/// another occupant's current claim is stamped with that occupant again.
#[derive(Debug)]
pub struct GridMutationBus {
    release_delay: Duration,
    claims: FxIndexMap<OccupantId, Claim>,
    statics: FxIndexMap<OccupantId, StaticFootprint>,
    pending: Slab<PendingRelease>,
}

impl Default for GridMutationBus {
    fn default() -> Self {
        GridMutationBus {
            release_delay: DEFAULT_RELEASE_DELAY,
            claims: FxIndexMap::default(),
            statics: FxIndexMap::default(),
            pending: Slab::new(),
        }
    }
}

impl GridMutationBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_release_delay(mut self, delay: Duration) -> Self {
        self.release_delay = delay;
        self
    }

    pub fn release_delay(&self) -> Duration {
        self.release_delay
    }

    /// Releases that have not fired yet.
    pub fn pending_releases(&self) -> usize {
        self.pending.len()
    }

    /// Cells the occupant currently claims.
    pub fn current_claim(&self, occupant: OccupantId) -> Option<CellRect> {
        self.claims.get(&occupant).map(|claim| claim.rect)
    }

    /// Remember where a stationary obstacle stands, so removing it later runs a
    /// [`GridMutationBus::static_update()`] over its cells.
    pub fn track_static(&mut self, occupant: OccupantId, center: Vec3, footprint: Footprint) {
        self.statics
            .insert(occupant, StaticFootprint { center, footprint });
    }

    /// True if `occupant` is a tracked stationary obstacle.
    pub fn is_static(&self, occupant: OccupantId) -> bool {
        self.statics.contains_key(&occupant)
    }

    /// Re-evaluate the cells under a footprint and clear any claims on them.
    /// Used for obstacles that do not move.
    pub fn static_update(
        &mut self,
        grid: &mut SpatialGrid,
        occupant: OccupantId,
        center: Vec3,
        footprint: Footprint,
    ) -> CellRect {
        let half = grid.half_extents_in_cells(footprint.half_extents);
        let rect = grid.update_region(center, half.x, half.y, None);
        self.restore_claims(grid, rect);

        debug!("Static grid update for {occupant:?} over {:?}..={:?}", rect.min, rect.max);
        rect
    }

    /// Claim the cells under a moved footprint and schedule the release of the previous claim.
    pub fn dynamic_update(
        &mut self,
        grid: &mut SpatialGrid,
        occupant: OccupantId,
        center: Vec3,
        footprint: Footprint,
    ) -> CellRect {
        let half = grid.half_extents_in_cells(footprint.half_extents);
        let rect = grid.update_region(center, half.x, half.y, Some(occupant));

        if let Some(previous) = self.claims.insert(occupant, Claim { center, half, rect }) {
            self.pending.insert(PendingRelease {
                occupant,
                center: previous.center,
                // One extra cell each way catches rounding at the old edges.
                half: previous.half + UVec2::ONE,
                timer: Timer::new(self.release_delay, TimerMode::Once),
            });
        }

        rect
    }

    /// Advance release timers and apply the ones that finished. Returns how many fired.
    pub fn tick(&mut self, grid: &mut SpatialGrid, delta: Duration) -> usize {
        let finished: Vec<usize> = self
            .pending
            .iter_mut()
            .filter_map(|(key, release)| {
                release.timer.tick(delta);
                release.timer.finished().then_some(key)
            })
            .collect();

        for &key in &finished {
            let release = self.pending.remove(key);
            self.release(grid, &release);
        }

        finished.len()
    }

    /// Forget an occupant that no longer exists.
    ///
    /// Its pending releases run immediately and its last claim is cleared, so no
    /// deferred release can touch the grid on its behalf afterwards. A tracked
    /// stationary obstacle gets a static update over its last footprint.
    pub fn remove_occupant(&mut self, grid: &mut SpatialGrid, occupant: OccupantId) {
        let owned: Vec<usize> = self
            .pending
            .iter()
            .filter(|(_, release)| release.occupant == occupant)
            .map(|(key, _)| key)
            .collect();

        for key in owned {
            let release = self.pending.remove(key);
            self.release(grid, &release);
        }

        if let Some(claim) = self.claims.swap_remove(&occupant) {
            let rect = grid.release_region(claim.center, claim.half.x, claim.half.y, occupant, None);
            self.restore_claims(grid, rect);
            debug!("Removed {occupant:?}, cleared {:?}..={:?}", claim.rect.min, claim.rect.max);
        }

        if let Some(obstacle) = self.statics.swap_remove(&occupant) {
            self.static_update(grid, occupant, obstacle.center, obstacle.footprint);
        }
    }

    fn release(&self, grid: &mut SpatialGrid, release: &PendingRelease) {
        let keep = self.current_claim(release.occupant);
        let rect = grid.release_region(
            release.center,
            release.half.x,
            release.half.y,
            release.occupant,
            keep,
        );
        self.restore_claims(grid, rect);
    }

    /// Stamp occupants back onto unclaimed cells of `released` that their current claim covers.
    fn restore_claims(&self, grid: &mut SpatialGrid, released: CellRect) {
        for (occupant, claim) in &self.claims {
            if let Some(overlap) = claim.rect.intersection(&released) {
                grid.fill_unclaimed(overlap, *occupant);
            }
        }
    }
}
