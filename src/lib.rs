//! Grid-based pathfinding for Bevy.
//!
//! A [`grid::SpatialGrid`] is scanned once from an [`environment::EnvironmentQuery`],
//! searched with A* that honours surface penalties and occupied cells, and kept
//! up to date by footprint claims from moving entities. [`navigator::Navigator`]
//! bundles everything behind one resource and [`plugin::PathgridPlugin`] drives it
//! from components.
use std::hash::BuildHasherDefault;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHasher;

pub mod astar;
pub mod cell;
pub mod debug;
pub mod environment;
pub mod error;
pub mod grid;
pub mod heap;
pub mod mutation;
pub mod navigator;
pub mod neighbor;
pub mod occupancy;
pub mod path;
pub mod plugin;
pub mod queue;
pub mod surface;

pub mod prelude {
    pub use crate::astar::{Pathfinder, SearchOutcome};
    pub use crate::cell::{Cell, OccupantId};
    pub use crate::debug::{PathgridDebugConfig, PathgridDebugPlugin};
    pub use crate::environment::{EnvironmentQuery, RectEnvironment};
    pub use crate::error::PathgridError;
    pub use crate::grid::{CellRect, GridSettings, GridSettingsBuilder, SpatialGrid};
    pub use crate::mutation::{Footprint, GridMutationBus};
    pub use crate::navigator::Navigator;
    pub use crate::occupancy::OccupancyRegistry;
    pub use crate::path::Path;
    pub use crate::plugin::{
        GridOccupant, PathFailed, PathGoal, PathgridPlugin, PathgridSet, PenaltySurfaces,
        StaticObstacle,
    };
    pub use crate::queue::{PathDelivery, PathRequest, PathResponder, RequestQueue};
    pub use crate::surface::{SurfaceKind, SurfacePenalties, SurfacePenaltiesBuilder, SurfaceTags};
}

/// Flat index of a cell, `x * height + y`.
pub type CellIndex = usize;

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;
type FxIndexSet<K> = IndexSet<K, BuildHasherDefault<FxHasher>>;

#[cfg(test)]
pub(crate) mod test_utils {
    use std::sync::Arc;

    use bevy::math::{Rect, Vec2, Vec3};

    use crate::{
        environment::RectEnvironment,
        grid::{GridSettingsBuilder, SpatialGrid},
    };

    /// World-space center of cell `(x, y)` in grids made by [`ascii_grid`].
    pub(crate) fn world(x: u32, y: u32) -> Vec3 {
        Vec3::new(x as f32 + 0.5, 0.0, y as f32 + 0.5)
    }

    /// A rectangle strictly inside cell `(x, y)` that blocks only that cell.
    pub(crate) fn cell_rect(x: u32, y: u32) -> Rect {
        Rect::new(
            x as f32 + 0.25,
            y as f32 + 0.25,
            x as f32 + 0.75,
            y as f32 + 0.75,
        )
    }

    /// Build a grid of unit cells from a character map, row `i` being `y = i`.
    ///
    /// `#` blocked, `g` grass, `b` bush, `m` moving entity, anything else open ground.
    pub(crate) fn ascii_grid(rows: &[&str]) -> (SpatialGrid, Arc<RectEnvironment>) {
        let height = rows.len() as u32;
        let width = rows.first().map_or(0, |row| row.len()) as u32;

        let env = Arc::new(RectEnvironment::new());
        for (y, row) in rows.iter().enumerate() {
            for (x, c) in row.chars().enumerate() {
                let rect = cell_rect(x as u32, y as u32);
                match c {
                    '#' => env.block(rect),
                    'g' => env.paint(rect, "Grass"),
                    'b' => env.paint(rect, "Bush"),
                    'm' => env.paint(rect, "MovingEntity"),
                    _ => {}
                }
            }
        }

        let size = Vec2::new(width as f32, height as f32);
        let settings = GridSettingsBuilder::new(size, 1.0)
            .origin(Vec3::new(size.x * 0.5, 0.0, size.y * 0.5))
            .build()
            .unwrap();

        let grid = SpatialGrid::scan(settings, env.clone());
        (grid, env)
    }
}
