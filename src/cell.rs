//! `Cell` and `OccupantId`, the per-position navigation data held by the `SpatialGrid`.
use bevy::{
    math::{UVec2, Vec3},
    prelude::Component,
};

use crate::{environment::EnvironmentQuery, surface::SurfaceKind, surface::SurfaceTags};

/// Stable small-integer identity of an entity that can claim grid cells.
/// Handed out once per entity by the [`crate::occupancy::OccupancyRegistry`].
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OccupantId(pub u32);

/// Navigation data for one discretized unit of the grid.
#[derive(Clone, Debug)]
pub struct Cell {
    coord: UVec2,
    world: Vec3,
    pub(crate) walkable: bool,
    pub(crate) surface: SurfaceKind,
    pub(crate) occupant: Option<OccupantId>,
}

impl Cell {
    pub(crate) fn new(coord: UVec2, world: Vec3) -> Self {
        Cell {
            coord,
            world,
            walkable: true,
            surface: SurfaceKind::None,
            occupant: None,
        }
    }

    /// Grid coordinate, fixed at construction.
    pub fn coord(&self) -> UVec2 {
        self.coord
    }

    /// World-space center of the cell.
    pub fn world(&self) -> Vec3 {
        self.world
    }

    pub fn is_walkable(&self) -> bool {
        self.walkable
    }

    pub fn surface(&self) -> SurfaceKind {
        self.surface
    }

    /// The occupant currently claiming this cell, if any.
    pub fn occupant(&self) -> Option<OccupantId> {
        self.occupant
    }

    /// True if the cell is claimed by someone other than `requester`.
    #[inline]
    pub fn is_claimed_by_other(&self, requester: Option<OccupantId>) -> bool {
        matches!(self.occupant, Some(id) if Some(id) != requester)
    }

    /// Re-read walkability and surface from the environment.
    /// Blocked cells never carry a surface.
    pub(crate) fn refresh(&mut self, env: &dyn EnvironmentQuery, radius: f32, tags: &SurfaceTags) {
        self.walkable = !env.is_blocked(self.world, radius);
        self.surface = if self.walkable {
            tags.resolve(env.probe_surface(self.world).as_deref())
        } else {
            SurfaceKind::None
        };
    }
}
