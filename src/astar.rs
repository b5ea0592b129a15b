//! A* over the [`SpatialGrid`] with terrain penalties and occupancy.
use bevy::{
    log::{debug, warn},
    math::{UVec2, Vec3},
};

use crate::{
    cell::OccupantId,
    error::PathgridError,
    grid::SpatialGrid,
    heap::PriorityHeap,
    neighbor::octile_distance,
    path::{simplify, Path},
    surface::{SurfaceKind, SurfacePenalties},
    CellIndex,
};

const NO_PARENT: CellIndex = CellIndex::MAX;

/// Per-cell search state. Only valid while `generation` matches the pathfinder's.
#[derive(Clone, Copy, Debug)]
struct ScratchEntry {
    generation: u32,
    g: u32,
    h: u32,
    parent: CellIndex,
    closed: bool,
}

impl ScratchEntry {
    const STALE: ScratchEntry = ScratchEntry {
        generation: 0,
        g: u32::MAX,
        h: 0,
        parent: NO_PARENT,
        closed: false,
    };
}

/// Result of a single [`Pathfinder::search()`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The target was popped from the open set.
    Reached {
        start: UVec2,
        target: UVec2,
        cost: u32,
        expanded: usize,
    },
    /// An endpoint was unwalkable or the open set ran dry.
    Failed { expanded: usize },
}

impl SearchOutcome {
    pub fn is_reached(&self) -> bool {
        matches!(self, SearchOutcome::Reached { .. })
    }

    /// Number of cells taken off the open set.
    pub fn expanded(&self) -> usize {
        match *self {
            SearchOutcome::Reached { expanded, .. } | SearchOutcome::Failed { expanded } => expanded,
        }
    }
}

/// Reusable A* state: the open set and a scratch arena keyed by flat cell index.
///
/// Starting a search bumps a generation counter, which invalidates every scratch
/// entry at once instead of clearing the arena. The grid is only ever borrowed
/// immutably while searching, so nothing can change underneath a running search.
pub struct Pathfinder {
    scratch: Vec<ScratchEntry>,
    generation: u32,
    open: PriorityHeap<(u32, u32)>,
    penalties: SurfacePenalties,
}

impl Pathfinder {
    /// Create a pathfinder for grids of up to `capacity` cells.
    pub fn new(capacity: usize, penalties: SurfacePenalties) -> Self {
        Pathfinder {
            scratch: vec![ScratchEntry::STALE; capacity],
            generation: 0,
            open: PriorityHeap::with_capacity(capacity),
            penalties,
        }
    }

    pub fn capacity(&self) -> usize {
        self.open.capacity()
    }

    pub fn penalties(&self) -> &SurfacePenalties {
        &self.penalties
    }

    /// Map world endpoints onto cells. An unwalkable endpoint is moved to its
    /// nearest walkable neighbor, or left in place if it has none.
    pub fn resolve_endpoints(grid: &mut SpatialGrid, start: Vec3, target: Vec3) -> (UVec2, UVec2) {
        let start = grid.world_to_cell(start);
        let target = grid.world_to_cell(target);

        (nearest_walkable(grid, start), nearest_walkable(grid, target))
    }

    /// Run A* from `start` to `target` to completion.
    ///
    /// Fails with [`PathgridError::CapacityExceeded`] if the grid has more cells
    /// than the pathfinder was created for. Cells claimed by an occupant other than `requester` are treated as closed.
    /// Stepping onto a cell whose surface is listed in `penalty_surfaces` adds that
    /// surface's penalty to the step cost.
    pub fn search(
        &mut self,
        grid: &SpatialGrid,
        start: UVec2,
        target: UVec2,
        penalty_surfaces: &[SurfaceKind],
        requester: Option<OccupantId>,
    ) -> Result<SearchOutcome, PathgridError> {
        self.begin(grid.len())?;

        if !grid.is_walkable(start) || !grid.is_walkable(target) {
            return Ok(SearchOutcome::Failed { expanded: 0 });
        }

        if start == target {
            return Ok(SearchOutcome::Reached {
                start,
                target,
                cost: 0,
                expanded: 0,
            });
        }

        let start_index = grid.index_of(start);
        let h = octile_distance(start, target);
        let entry = self.entry(start_index);
        entry.g = 0;
        entry.h = h;
        self.open.add(start_index, (h, h));

        let mut expanded = 0;

        while let Some((current, _)) = self.open.remove_first() {
            expanded += 1;
            let coord = grid.coord_of(current);

            if coord == target {
                self.open.clear();
                return Ok(SearchOutcome::Reached {
                    start,
                    target,
                    cost: self.scratch[current].g,
                    expanded,
                });
            }

            self.scratch[current].closed = true;
            let g = self.scratch[current].g;

            for neighbor in grid.neighbors(coord) {
                let index = grid.index_of(neighbor);
                let cell = grid.at(neighbor);

                if cell.is_claimed_by_other(requester) {
                    self.entry(index).closed = true;
                    continue;
                }

                if !cell.is_walkable() || self.entry(index).closed {
                    continue;
                }

                let mut tentative = g + octile_distance(coord, neighbor);
                let surface = cell.surface();
                if surface != SurfaceKind::None && penalty_surfaces.contains(&surface) {
                    tentative = tentative.saturating_add(self.penalties.penalty(surface));
                }

                let queued = self.open.contains(index);
                let entry = self.entry(index);

                if !queued || tentative < entry.g {
                    let h = if queued {
                        entry.h
                    } else {
                        octile_distance(neighbor, target)
                    };
                    entry.g = tentative;
                    entry.h = h;
                    entry.parent = current;

                    let key = (tentative.saturating_add(h), h);
                    if queued {
                        self.open.update(index, key);
                    } else {
                        self.open.add(index, key);
                    }
                }
            }
        }

        Ok(SearchOutcome::Failed { expanded })
    }

    /// Turn the most recent search result into waypoints.
    ///
    /// Must be called before the next search on this pathfinder, since the parent
    /// links live in the scratch arena.
    pub fn reconstruct(&self, grid: &SpatialGrid, outcome: &SearchOutcome) -> Path {
        let SearchOutcome::Reached {
            start,
            target,
            cost,
            ..
        } = *outcome
        else {
            return Path::failed();
        };

        if start == target {
            return Path::new(Vec::new(), 0);
        }

        let current = self
            .scratch
            .get(grid.index_of(target))
            .is_some_and(|entry| entry.generation == self.generation && entry.g == cost);

        let Some(cells) = self.trace(grid, start, target).filter(|_| current) else {
            warn!("Search state for {start} -> {target} is gone, dropping the path");
            return Path::failed();
        };

        let waypoints = simplify(grid, start, &cells)
            .into_iter()
            .map(|coord| grid.at(coord).world())
            .collect();

        Path::new(waypoints, cost)
    }

    /// Resolve endpoints, search and reconstruct in one go.
    pub fn find_path(
        &mut self,
        grid: &mut SpatialGrid,
        start: Vec3,
        target: Vec3,
        penalty_surfaces: &[SurfaceKind],
        requester: Option<OccupantId>,
    ) -> Result<Path, PathgridError> {
        let (from, to) = Self::resolve_endpoints(grid, start, target);
        let outcome = self.search(grid, from, to, penalty_surfaces, requester)?;

        debug!(
            "Search {from} -> {to}: reached {} after expanding {} cells",
            outcome.is_reached(),
            outcome.expanded()
        );

        Ok(self.reconstruct(grid, &outcome))
    }

    /// Cells from just after `start` up to `target`, following parent links.
    fn trace(&self, grid: &SpatialGrid, start: UVec2, target: UVec2) -> Option<Vec<UVec2>> {
        let start_index = grid.index_of(start);
        let mut current = grid.index_of(target);
        let mut cells = Vec::new();

        while current != start_index {
            let entry = self.scratch.get(current)?;
            if entry.generation != self.generation || entry.parent == NO_PARENT {
                return None;
            }
            // A parent chain can never be longer than the grid.
            if cells.len() >= grid.len() {
                return None;
            }

            cells.push(grid.coord_of(current));
            current = entry.parent;
        }

        cells.reverse();
        Some(cells)
    }

    /// Invalidate all scratch entries for a search over `len` cells.
    fn begin(&mut self, len: usize) -> Result<(), PathgridError> {
        self.open.clear();

        if len > self.scratch.len() {
            return Err(PathgridError::CapacityExceeded {
                cells: len,
                capacity: self.scratch.len(),
            });
        }

        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.scratch.fill(ScratchEntry::STALE);
            self.generation = 1;
        }

        Ok(())
    }

    /// Scratch entry for `index`, reset first if it belongs to an older search.
    #[inline]
    fn entry(&mut self, index: CellIndex) -> &mut ScratchEntry {
        let generation = self.generation;
        let entry = &mut self.scratch[index];
        if entry.generation != generation {
            *entry = ScratchEntry {
                generation,
                ..ScratchEntry::STALE
            };
        }
        entry
    }
}

/// `coord` if walkable, otherwise its closest walkable neighbor.
fn nearest_walkable(grid: &SpatialGrid, coord: UVec2) -> UVec2 {
    if grid.is_walkable(coord) {
        return coord;
    }

    let mut best: Option<(u32, UVec2)> = None;
    for neighbor in grid.neighbors(coord) {
        if !grid.is_walkable(neighbor) {
            continue;
        }
        let distance = octile_distance(coord, neighbor);
        if best.is_none_or(|(closest, _)| distance < closest) {
            best = Some((distance, neighbor));
        }
    }

    best.map_or(coord, |(_, neighbor)| neighbor)
}
