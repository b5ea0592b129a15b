//! This module contains the `SpatialGrid`, the navigation grid every search runs over.
use std::sync::Arc;

use bevy::{
    log::{debug, info},
    math::{UVec2, Vec2, Vec3, Vec3Swizzles},
};
use ndarray::{Array2, ArrayView2};
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use smallvec::SmallVec;

use crate::{
    cell::{Cell, OccupantId},
    environment::EnvironmentQuery,
    error::PathgridError,
    neighbor::ORDINAL_2D_OFFSETS,
    surface::{SurfaceKind, SurfaceTags},
};

/// Validated settings for a [`SpatialGrid`]. Use [`GridSettingsBuilder`] to create them.
#[derive(Clone, Debug)]
pub struct GridSettings {
    world_size: Vec2,
    cell_diameter: f32,
    probe_radius: f32,
    origin: Vec3,
    tags: SurfaceTags,
    dimensions: UVec2,
}

impl GridSettings {
    /// Extent of the grid in world units on the X and Z axes.
    pub fn world_size(&self) -> Vec2 {
        self.world_size
    }

    pub fn cell_diameter(&self) -> f32 {
        self.cell_diameter
    }

    /// Radius used when asking the environment whether a cell is blocked.
    /// Half the cell diameter unless overridden.
    pub fn cell_radius(&self) -> f32 {
        self.probe_radius
    }

    /// World-space center of the grid.
    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn tags(&self) -> &SurfaceTags {
        &self.tags
    }

    /// Number of cells on each axis.
    pub fn dimensions(&self) -> UVec2 {
        self.dimensions
    }

    /// World position of the grid's bottom-left corner (minimum X and Z).
    pub fn bottom_left(&self) -> Vec3 {
        self.origin - Vec3::new(self.world_size.x, 0.0, self.world_size.y) * 0.5
    }
}

/// Builder for [`GridSettings`].
///
/// ```
/// use bevy::math::{Vec2, Vec3};
/// use bevy_pathgrid::prelude::*;
///
/// let settings = GridSettingsBuilder::new(Vec2::new(64.0, 32.0), 0.5)
///     .origin(Vec3::new(10.0, 0.0, 10.0))
///     .map_tag("Hedge", SurfaceKind::Bush)
///     .build()
///     .unwrap();
///
/// assert_eq!(settings.dimensions().x, 128);
/// assert_eq!(settings.dimensions().y, 64);
/// ```
#[derive(Clone, Debug)]
pub struct GridSettingsBuilder {
    world_size: Vec2,
    cell_diameter: f32,
    probe_radius: Option<f32>,
    origin: Vec3,
    tags: SurfaceTags,
}

impl GridSettingsBuilder {
    /// Cover `world_size` (X, Z) with square cells of `cell_diameter`.
    pub fn new(world_size: Vec2, cell_diameter: f32) -> Self {
        GridSettingsBuilder {
            world_size,
            cell_diameter,
            probe_radius: None,
            origin: Vec3::ZERO,
            tags: SurfaceTags::default(),
        }
    }

    /// World-space center of the grid. Defaults to the world origin.
    pub fn origin(mut self, origin: Vec3) -> Self {
        self.origin = origin;
        self
    }

    /// Radius of the blocking check around each cell center.
    pub fn probe_radius(mut self, radius: f32) -> Self {
        self.probe_radius = Some(radius);
        self
    }

    /// Classify probe hits tagged `tag` as `kind`.
    pub fn map_tag(mut self, tag: impl Into<String>, kind: SurfaceKind) -> Self {
        self.tags.insert(tag, kind);
        self
    }

    /// Replace the whole tag table.
    pub fn surface_tags(mut self, tags: SurfaceTags) -> Self {
        self.tags = tags;
        self
    }

    /// Validate the configuration and derive the grid dimensions.
    pub fn build(self) -> Result<GridSettings, PathgridError> {
        if !self.cell_diameter.is_finite() || self.cell_diameter <= 0.0 {
            return Err(PathgridError::InvalidCellDiameter(self.cell_diameter));
        }

        if !self.world_size.is_finite() || self.world_size.cmple(Vec2::ZERO).any() {
            return Err(PathgridError::InvalidWorldSize(self.world_size));
        }

        let cells = (self.world_size / self.cell_diameter).round();
        let dimensions = UVec2::new(cells.x as u32, cells.y as u32);

        if dimensions.x == 0 || dimensions.y == 0 {
            return Err(PathgridError::EmptyGrid {
                width: dimensions.x,
                height: dimensions.y,
            });
        }

        let probe_radius = match self.probe_radius {
            Some(radius) if !radius.is_finite() || radius < 0.0 => {
                return Err(PathgridError::InvalidProbeRadius(radius));
            }
            Some(radius) => radius,
            None => self.cell_diameter * 0.5,
        };

        Ok(GridSettings {
            world_size: self.world_size,
            cell_diameter: self.cell_diameter,
            probe_radius,
            origin: self.origin,
            tags: self.tags,
            dimensions,
        })
    }
}

/// Inclusive rectangle of cell coordinates, already clipped to the grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellRect {
    pub min: UVec2,
    pub max: UVec2,
}

impl CellRect {
    pub fn new(min: UVec2, max: UVec2) -> Self {
        CellRect {
            min: min.min(max),
            max: max.max(min),
        }
    }

    pub fn contains(&self, coord: UVec2) -> bool {
        coord.cmpge(self.min).all() && coord.cmple(self.max).all()
    }

    /// Number of cells covered.
    pub fn len(&self) -> usize {
        let size = self.max - self.min + UVec2::ONE;
        (size.x * size.y) as usize
    }

    /// Always false, a rect covers at least one cell.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The cells covered by both rects.
    pub fn intersection(&self, other: &CellRect) -> Option<CellRect> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        min.cmple(max).all().then_some(CellRect { min, max })
    }

    /// Every coordinate in the rect, row by row.
    pub fn iter(&self) -> impl Iterator<Item = UVec2> {
        let CellRect { min, max } = *self;
        (min.y..=max.y).flat_map(move |y| (min.x..=max.x).map(move |x| UVec2::new(x, y)))
    }
}

/// The navigation grid: a dense array of [`Cell`]s laid over the world's XZ plane.
///
/// The grid is scanned once against an [`EnvironmentQuery`] and afterwards only
/// changes through explicit region updates. Dimensions never change.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use bevy::math::{Rect, Vec2, Vec3};
/// use bevy_pathgrid::prelude::*;
///
/// let env = Arc::new(RectEnvironment::new());
/// env.block(Rect::new(-0.5, -0.5, 0.5, 0.5));
///
/// let settings = GridSettingsBuilder::new(Vec2::new(10.0, 10.0), 1.0).build().unwrap();
/// let grid = SpatialGrid::scan(settings, env);
///
/// let center = grid.cell_at_world(Vec3::ZERO);
/// assert!(!grid.is_walkable(center));
/// ```
pub struct SpatialGrid {
    settings: GridSettings,
    env: Arc<dyn EnvironmentQuery>,
    cells: Array2<Cell>,
    built: bool,
}

impl SpatialGrid {
    /// Lay out the cells without querying the environment yet. Every cell starts walkable.
    /// Call [`SpatialGrid::build()`] before searching.
    pub fn new(settings: GridSettings, env: Arc<dyn EnvironmentQuery>) -> Self {
        let UVec2 { x: width, y: height } = settings.dimensions;
        let corner = settings.bottom_left();
        let diameter = settings.cell_diameter;

        let cells = Array2::from_shape_fn((width as usize, height as usize), |(x, y)| {
            let world = corner
                + Vec3::new(
                    x as f32 * diameter + diameter * 0.5,
                    0.0,
                    y as f32 * diameter + diameter * 0.5,
                );
            Cell::new(UVec2::new(x as u32, y as u32), world)
        });

        SpatialGrid {
            settings,
            env,
            cells,
            built: false,
        }
    }

    /// Create and immediately [`SpatialGrid::build()`] a grid.
    pub fn scan(settings: GridSettings, env: Arc<dyn EnvironmentQuery>) -> Self {
        let mut grid = SpatialGrid::new(settings, env);
        grid.build();
        grid
    }

    /// Scan every cell: ask the environment whether its center is blocked and,
    /// if it is walkable, classify the surface underneath it.
    pub fn build(&mut self) {
        let start = std::time::Instant::now();

        let env = self.env.as_ref();
        let radius = self.settings.cell_radius();
        let tags = &self.settings.tags;

        #[cfg(feature = "parallel")]
        match self.cells.as_slice_memory_order_mut() {
            Some(cells) => cells
                .par_iter_mut()
                .for_each(|cell| cell.refresh(env, radius, tags)),
            None => self
                .cells
                .iter_mut()
                .for_each(|cell| cell.refresh(env, radius, tags)),
        }

        #[cfg(not(feature = "parallel"))]
        self.cells
            .iter_mut()
            .for_each(|cell| cell.refresh(env, radius, tags));

        self.built = true;

        info!(
            "Scanned {}x{} grid in {:?}",
            self.width(),
            self.height(),
            start.elapsed()
        );
    }

    /// True once [`SpatialGrid::build()`] has run.
    pub fn is_built(&self) -> bool {
        self.built
    }

    pub fn settings(&self) -> &GridSettings {
        &self.settings
    }

    /// The environment the grid is evaluated against.
    pub fn environment(&self) -> &Arc<dyn EnvironmentQuery> {
        &self.env
    }

    pub fn width(&self) -> u32 {
        self.settings.dimensions.x
    }

    pub fn height(&self) -> u32 {
        self.settings.dimensions.y
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false, settings validation rejects empty grids.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Read-only view of every cell, indexed `[[x, y]]`.
    pub fn view(&self) -> ArrayView2<'_, Cell> {
        self.cells.view()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter()
    }

    pub fn in_bounds(&self, coord: UVec2) -> bool {
        coord.x < self.width() && coord.y < self.height()
    }

    /// Flat index of a coordinate, used to key per-search scratch data.
    #[inline]
    pub fn index_of(&self, coord: UVec2) -> usize {
        coord.x as usize * self.height() as usize + coord.y as usize
    }

    /// Inverse of [`SpatialGrid::index_of()`].
    #[inline]
    pub fn coord_of(&self, index: usize) -> UVec2 {
        let height = self.height() as usize;
        UVec2::new((index / height) as u32, (index % height) as u32)
    }

    pub fn cell(&self, coord: UVec2) -> Option<&Cell> {
        self.cells.get((coord.x as usize, coord.y as usize))
    }

    #[cfg(test)]
    pub(crate) fn cell_mut(&mut self, coord: UVec2) -> Option<&mut Cell> {
        self.cells.get_mut((coord.x as usize, coord.y as usize))
    }

    /// Cell at an in-bounds coordinate.
    #[inline]
    pub(crate) fn at(&self, coord: UVec2) -> &Cell {
        &self.cells[[coord.x as usize, coord.y as usize]]
    }

    /// False for blocked and out-of-bounds cells.
    pub fn is_walkable(&self, coord: UVec2) -> bool {
        self.cell(coord).is_some_and(Cell::is_walkable)
    }

    /// World-space center of an in-bounds cell.
    pub fn world_position(&self, coord: UVec2) -> Option<Vec3> {
        self.cell(coord).map(Cell::world)
    }

    /// Map a world position to the nearest cell without touching the grid.
    /// Positions outside the grid are clamped onto its border.
    pub fn cell_at_world(&self, point: Vec3) -> UVec2 {
        let relative = (point.xz() - self.settings.origin.xz()) / self.settings.world_size;
        let percent = (relative + 0.5).clamp(Vec2::ZERO, Vec2::ONE);

        let x = ((self.width() - 1) as f32 * percent.x).round() as u32;
        let y = ((self.height() - 1) as f32 * percent.y).round() as u32;

        UVec2::new(x.min(self.width() - 1), y.min(self.height() - 1))
    }

    /// Map a world position to the nearest cell, re-checking that cell's
    /// walkability against the environment on the way.
    pub fn world_to_cell(&mut self, point: Vec3) -> UVec2 {
        let coord = self.cell_at_world(point);
        let radius = self.settings.cell_radius();
        let env = self.env.as_ref();

        let cell = &mut self.cells[[coord.x as usize, coord.y as usize]];
        cell.walkable = !env.is_blocked(cell.world(), radius);

        coord
    }

    /// The up-to-eight in-bounds cells adjacent to `coord`.
    pub fn neighbors(&self, coord: UVec2) -> SmallVec<[UVec2; 8]> {
        let origin = coord.as_ivec2();
        let (width, height) = (self.width() as i32, self.height() as i32);

        ORDINAL_2D_OFFSETS
            .iter()
            .map(|offset| origin + *offset)
            .filter(|n| n.x >= 0 && n.y >= 0 && n.x < width && n.y < height)
            .map(|n| n.as_uvec2())
            .collect()
    }

    /// True if any neighbor of `coord` is blocked.
    pub fn has_unwalkable_neighbor(&self, coord: UVec2) -> bool {
        self.neighbors(coord)
            .into_iter()
            .any(|neighbor| !self.at(neighbor).is_walkable())
    }

    /// Convert world half-extents (X, Z) into a number of cells on each side of the center cell.
    ///
    /// The center cell already covers half a cell each way, so only the remainder
    /// spills into neighbors. An object up to one cell wide claims just its center cell.
    pub fn half_extents_in_cells(&self, half_extents: Vec2) -> UVec2 {
        let diameter = self.settings.cell_diameter;
        let spill = (half_extents - Vec2::splat(diameter * 0.5)).max(Vec2::ZERO);
        let cells = (spill / diameter).ceil();
        UVec2::new(cells.x as u32, cells.y as u32)
    }

    /// The clipped rectangle of `half_width` x `half_height` cells on each side of `center`.
    pub fn rect_around(&self, center: UVec2, half_width: u32, half_height: u32) -> CellRect {
        let half = UVec2::new(half_width, half_height);
        let last = UVec2::new(self.width() - 1, self.height() - 1);

        CellRect::new(center.saturating_sub(half), center.saturating_add(half).min(last))
    }

    /// Re-evaluate walkability and surface for every cell in the rectangle around
    /// `center`. `Some(id)` stamps the occupant onto every cell, `None` clears the stamp.
    ///
    /// Cells outside an explicit region call are never patched, so the rectangle
    /// must fully cover whatever changed.
    pub fn update_region(
        &mut self,
        center: Vec3,
        half_width: u32,
        half_height: u32,
        occupant: Option<OccupantId>,
    ) -> CellRect {
        let origin = self.world_to_cell(center);
        let rect = self.rect_around(origin, half_width, half_height);

        let env = self.env.as_ref();
        let radius = self.settings.cell_radius();
        let tags = &self.settings.tags;

        for coord in rect.iter() {
            let cell = &mut self.cells[[coord.x as usize, coord.y as usize]];
            cell.refresh(env, radius, tags);
            cell.occupant = occupant;
        }

        debug!(
            "Updated region {:?}..={:?} with occupant {:?}",
            rect.min, rect.max, occupant
        );

        rect
    }

    /// Re-evaluate the rectangle around `center` and drop `occupant`'s stamp from it.
    ///
    /// Cells claimed by other occupants and cells inside `keep` retain their stamps.
    pub fn release_region(
        &mut self,
        center: Vec3,
        half_width: u32,
        half_height: u32,
        occupant: OccupantId,
        keep: Option<CellRect>,
    ) -> CellRect {
        let origin = self.world_to_cell(center);
        let rect = self.rect_around(origin, half_width, half_height);

        let env = self.env.as_ref();
        let radius = self.settings.cell_radius();
        let tags = &self.settings.tags;

        for coord in rect.iter() {
            let cell = &mut self.cells[[coord.x as usize, coord.y as usize]];
            cell.refresh(env, radius, tags);

            let kept = keep.is_some_and(|keep| keep.contains(coord));
            if cell.occupant == Some(occupant) && !kept {
                cell.occupant = None;
            }
        }

        rect
    }

    /// Stamp `occupant` onto every unclaimed cell of `rect`. Returns how many cells it took.
    pub fn fill_unclaimed(&mut self, rect: CellRect, occupant: OccupantId) -> usize {
        let mut filled = 0;
        for coord in rect.iter() {
            if !self.in_bounds(coord) {
                continue;
            }
            let cell = &mut self.cells[[coord.x as usize, coord.y as usize]];
            if cell.occupant.is_none() {
                cell.occupant = Some(occupant);
                filled += 1;
            }
        }
        filled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ascii_grid, cell_rect, world};

    #[test]
    fn test_settings_reject_bad_diameter() {
        let result = GridSettingsBuilder::new(Vec2::new(10.0, 10.0), 0.0).build();
        assert_eq!(result.unwrap_err(), PathgridError::InvalidCellDiameter(0.0));

        let result = GridSettingsBuilder::new(Vec2::new(10.0, 10.0), -1.0).build();
        assert!(matches!(result, Err(PathgridError::InvalidCellDiameter(_))));
    }

    #[test]
    fn test_settings_reject_empty_grid() {
        let result = GridSettingsBuilder::new(Vec2::new(0.4, 10.0), 1.0).build();
        assert_eq!(
            result.unwrap_err(),
            PathgridError::EmptyGrid {
                width: 0,
                height: 10
            }
        );

        let result = GridSettingsBuilder::new(Vec2::new(0.0, 10.0), 1.0).build();
        assert!(matches!(result, Err(PathgridError::InvalidWorldSize(_))));
    }

    #[test]
    fn test_settings_reject_bad_probe_radius() {
        let result = GridSettingsBuilder::new(Vec2::new(10.0, 10.0), 1.0)
            .probe_radius(-1.0)
            .build();
        assert_eq!(result.unwrap_err(), PathgridError::InvalidProbeRadius(-1.0));

        let result = GridSettingsBuilder::new(Vec2::new(10.0, 10.0), 1.0)
            .probe_radius(f32::NAN)
            .build();
        assert!(matches!(result, Err(PathgridError::InvalidProbeRadius(r)) if r.is_nan()));

        let result = GridSettingsBuilder::new(Vec2::new(10.0, 10.0), 1.0)
            .probe_radius(f32::INFINITY)
            .build();
        assert!(matches!(result, Err(PathgridError::InvalidProbeRadius(_))));

        let settings = GridSettingsBuilder::new(Vec2::new(10.0, 10.0), 1.0)
            .probe_radius(0.0)
            .build()
            .unwrap();
        assert_eq!(settings.cell_radius(), 0.0);
    }

    #[test]
    fn test_dimensions_from_world_size() {
        let settings = GridSettingsBuilder::new(Vec2::new(30.0, 20.0), 2.0).build().unwrap();
        assert_eq!(settings.dimensions(), UVec2::new(15, 10));
        assert_eq!(settings.cell_radius(), 1.0);

        let settings = GridSettingsBuilder::new(Vec2::new(30.0, 20.0), 2.0)
            .probe_radius(0.4)
            .build()
            .unwrap();
        assert_eq!(settings.cell_radius(), 0.4);
    }

    #[test]
    fn test_cell_centers_start_at_bottom_left() {
        let settings = GridSettingsBuilder::new(Vec2::new(4.0, 4.0), 1.0)
            .origin(Vec3::new(10.0, 2.0, -10.0))
            .build()
            .unwrap();
        let grid = SpatialGrid::new(settings, Arc::new(crate::environment::RectEnvironment::new()));

        assert!(!grid.is_built());
        assert_eq!(grid.at(UVec2::ZERO).world(), Vec3::new(8.5, 2.0, -11.5));
        assert_eq!(grid.at(UVec2::new(3, 3)).world(), Vec3::new(11.5, 2.0, -8.5));
    }

    #[test]
    fn test_build_scans_walkability_and_surface() {
        let (grid, _) = ascii_grid(&[
            "..#", //
            "gb.",
            "...",
        ]);

        assert!(grid.is_built());
        assert!(!grid.is_walkable(UVec2::new(2, 0)));
        assert!(grid.is_walkable(UVec2::new(0, 0)));
        assert_eq!(grid.at(UVec2::new(0, 1)).surface(), SurfaceKind::Grass);
        assert_eq!(grid.at(UVec2::new(1, 1)).surface(), SurfaceKind::Bush);
        assert_eq!(grid.at(UVec2::new(2, 1)).surface(), SurfaceKind::None);
        assert_eq!(grid.at(UVec2::new(2, 0)).surface(), SurfaceKind::None);
    }

    #[test]
    fn test_index_round_trip() {
        let (grid, _) = ascii_grid(&["....", "....", "...."]);
        assert_eq!(grid.len(), 12);

        for index in 0..grid.len() {
            assert_eq!(grid.index_of(grid.coord_of(index)), index);
        }
        assert_eq!(grid.index_of(UVec2::new(1, 2)), 5);
    }

    #[test]
    fn test_world_to_cell_hits_cell_centers() {
        let (mut grid, _) = ascii_grid(&[".........."; 10]);

        for x in 0..10 {
            for y in 0..10 {
                assert_eq!(grid.world_to_cell(world(x, y)), UVec2::new(x, y));
            }
        }
    }

    #[test]
    fn test_world_to_cell_clamps_outside_points() {
        let (mut grid, _) = ascii_grid(&["....."; 5]);

        assert_eq!(grid.world_to_cell(Vec3::new(-100.0, 0.0, -100.0)), UVec2::ZERO);
        assert_eq!(grid.world_to_cell(Vec3::new(100.0, 0.0, 100.0)), UVec2::new(4, 4));
        assert_eq!(grid.world_to_cell(Vec3::new(100.0, 0.0, -3.0)), UVec2::new(4, 0));
    }

    #[test]
    fn test_world_to_cell_revalidates_walkability() {
        let (mut grid, env) = ascii_grid(&["....."; 5]);
        env.block(cell_rect(2, 2));

        // Nothing notices the new obstacle until something asks for that cell.
        assert!(grid.is_walkable(UVec2::new(2, 2)));
        let coord = grid.world_to_cell(world(2, 2));
        assert!(!grid.is_walkable(coord));
        assert!(grid.is_walkable(UVec2::new(2, 3)));
    }

    #[test]
    fn test_neighbors() {
        let (grid, _) = ascii_grid(&["...."; 4]);

        assert_eq!(grid.neighbors(UVec2::new(0, 0)).len(), 3);
        assert_eq!(grid.neighbors(UVec2::new(1, 0)).len(), 5);
        assert_eq!(grid.neighbors(UVec2::new(3, 3)).len(), 3);

        let center = grid.neighbors(UVec2::new(1, 1));
        assert_eq!(center.len(), 8);
        assert_eq!(center[0], UVec2::new(0, 0));
        assert_eq!(center[1], UVec2::new(0, 1));
        assert_eq!(center[7], UVec2::new(2, 2));
        assert!(!center.contains(&UVec2::new(1, 1)));
    }

    #[test]
    fn test_has_unwalkable_neighbor() {
        let (grid, _) = ascii_grid(&[
            "....", //
            ".#..",
            "....",
            "....",
        ]);

        assert!(grid.has_unwalkable_neighbor(UVec2::new(0, 0)));
        assert!(grid.has_unwalkable_neighbor(UVec2::new(2, 2)));
        assert!(!grid.has_unwalkable_neighbor(UVec2::new(3, 3)));
        // Grid borders do not count as obstacles.
        assert!(!grid.has_unwalkable_neighbor(UVec2::new(3, 0)));
    }

    #[test]
    fn test_half_extents_in_cells() {
        let (grid, _) = ascii_grid(&["...."; 4]);
        assert_eq!(grid.half_extents_in_cells(Vec2::new(0.5, 1.2)), UVec2::new(0, 1));
        assert_eq!(grid.half_extents_in_cells(Vec2::new(0.2, 0.51)), UVec2::new(0, 1));
        assert_eq!(grid.half_extents_in_cells(Vec2::new(1.5, 2.0)), UVec2::new(1, 2));
        assert_eq!(grid.half_extents_in_cells(Vec2::new(0.0, -3.0)), UVec2::new(0, 0));
    }

    #[test]
    fn test_narrow_object_claims_only_its_cell() {
        let (mut grid, _) = ascii_grid(&["....."; 5]);
        let half = grid.half_extents_in_cells(Vec2::splat(0.2));
        let rect = grid.update_region(world(2, 2), half.x, half.y, Some(OccupantId(1)));

        assert_eq!(rect.len(), 1);
        assert_eq!(grid.at(UVec2::new(2, 2)).occupant(), Some(OccupantId(1)));
        assert_eq!(grid.at(UVec2::new(1, 2)).occupant(), None);
    }

    #[test]
    fn test_rect_intersection() {
        let a = CellRect::new(UVec2::new(1, 1), UVec2::new(3, 3));
        let b = CellRect::new(UVec2::new(3, 2), UVec2::new(6, 6));
        let c = CellRect::new(UVec2::new(5, 5), UVec2::new(6, 6));

        assert_eq!(
            a.intersection(&b),
            Some(CellRect::new(UVec2::new(3, 2), UVec2::new(3, 3)))
        );
        assert_eq!(a.intersection(&c), None);
    }

    #[test]
    fn test_fill_unclaimed_keeps_existing_stamps() {
        let (mut grid, _) = ascii_grid(&["...."; 4]);
        grid.update_region(world(1, 1), 0, 0, Some(OccupantId(2)));

        let rect = CellRect::new(UVec2::new(0, 0), UVec2::new(1, 1));
        assert_eq!(grid.fill_unclaimed(rect, OccupantId(5)), 3);
        assert_eq!(grid.at(UVec2::new(1, 1)).occupant(), Some(OccupantId(2)));
        assert_eq!(grid.at(UVec2::new(0, 1)).occupant(), Some(OccupantId(5)));
        assert_eq!(grid.at(UVec2::new(2, 2)).occupant(), None);
    }

    #[test]
    fn test_rect_around_is_clipped() {
        let (grid, _) = ascii_grid(&["....."; 5]);

        let rect = grid.rect_around(UVec2::new(0, 4), 2, 1);
        assert_eq!(rect, CellRect::new(UVec2::new(0, 3), UVec2::new(2, 4)));
        assert_eq!(rect.len(), 6);
        assert_eq!(rect.iter().count(), 6);
    }

    #[test]
    fn test_update_region_stamps_and_clears() {
        let (mut grid, env) = ascii_grid(&["......"; 6]);
        let occupant = OccupantId(4);

        env.block(cell_rect(3, 3));
        let rect = grid.update_region(world(3, 3), 1, 1, Some(occupant));

        assert_eq!(rect, CellRect::new(UVec2::new(2, 2), UVec2::new(4, 4)));
        assert!(rect.iter().all(|c| grid.at(c).occupant() == Some(occupant)));
        assert!(!grid.is_walkable(UVec2::new(3, 3)));
        assert_eq!(grid.at(UVec2::new(5, 5)).occupant(), None);
        assert_eq!(grid.at(UVec2::new(1, 3)).occupant(), None);

        env.unblock_at(Vec2::new(3.5, 3.5));
        grid.update_region(world(3, 3), 1, 1, None);
        assert!(rect.iter().all(|c| grid.at(c).occupant().is_none()));
        assert!(grid.is_walkable(UVec2::new(3, 3)));
    }

    #[test]
    fn test_update_region_picks_up_surface_changes() {
        let (mut grid, env) = ascii_grid(&["...."; 4]);
        env.paint(cell_rect(1, 1), "Bush");

        assert_eq!(grid.at(UVec2::new(1, 1)).surface(), SurfaceKind::None);
        grid.update_region(world(1, 1), 0, 0, None);
        assert_eq!(grid.at(UVec2::new(1, 1)).surface(), SurfaceKind::Bush);
    }

    #[test]
    fn test_update_region_at_border_does_not_panic() {
        let (mut grid, _) = ascii_grid(&["...."; 4]);
        let rect = grid.update_region(Vec3::new(-50.0, 0.0, 50.0), 3, 3, Some(OccupantId(1)));

        assert_eq!(rect, CellRect::new(UVec2::new(0, 0), UVec2::new(3, 3)));
    }

    #[test]
    fn test_release_region_only_clears_own_stamp() {
        let (mut grid, _) = ascii_grid(&["......"; 6]);
        let mover = OccupantId(1);
        let other = OccupantId(2);

        grid.update_region(world(2, 2), 1, 1, Some(mover));
        grid.update_region(world(0, 0), 0, 0, Some(other));
        grid.cell_mut(UVec2::new(1, 1)).unwrap().occupant = Some(other);

        let keep = CellRect::new(UVec2::new(3, 3), UVec2::new(3, 3));
        grid.release_region(world(2, 2), 2, 2, mover, Some(keep));

        assert_eq!(grid.at(UVec2::new(0, 0)).occupant(), Some(other));
        assert_eq!(grid.at(UVec2::new(1, 1)).occupant(), Some(other));
        assert_eq!(grid.at(UVec2::new(3, 3)).occupant(), Some(mover));
        assert_eq!(grid.at(UVec2::new(2, 2)).occupant(), None);
        assert_eq!(grid.at(UVec2::new(3, 1)).occupant(), None);
    }
}
