//! The `Navigator` resource ties the grid, the request queue and the mutation bus together.
use std::sync::Arc;
use std::time::Duration;

use bevy::{
    log::info,
    math::Vec3,
    prelude::{Entity, Resource},
};

use crate::{
    astar::Pathfinder,
    cell::OccupantId,
    environment::EnvironmentQuery,
    error::PathgridError,
    grid::{CellRect, GridSettingsBuilder, SpatialGrid},
    mutation::{Footprint, GridMutationBus},
    occupancy::OccupancyRegistry,
    queue::{PathDelivery, PathRequest, PathResponder, RequestQueue},
    surface::{SurfaceKind, SurfacePenalties, SurfacePenaltiesBuilder},
};

/// Owns everything needed to answer path requests against one grid.
///
/// Insert it as a resource to let [`crate::plugin::PathgridPlugin`] drive it, or
/// call [`Navigator::step()`] and [`Navigator::tick()`] yourself.
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use bevy::math::{Vec2, Vec3};
/// use bevy_pathgrid::prelude::*;
///
/// let env = Arc::new(RectEnvironment::new());
/// let mut navigator = Navigator::new(
///     GridSettingsBuilder::new(Vec2::new(20.0, 20.0), 1.0),
///     SurfacePenaltiesBuilder::new().fill_missing(10),
///     env,
/// )
/// .unwrap();
///
/// let result = Arc::new(Mutex::new(None));
/// let sink = result.clone();
/// navigator.submit_path_request(
///     Vec3::new(-8.0, 0.0, -8.0),
///     Vec3::new(8.0, 0.0, 8.0),
///     &[SurfaceKind::Grass],
///     None,
///     move |waypoints, success| *sink.lock().unwrap() = Some((waypoints, success)),
/// );
/// navigator.step();
///
/// let (waypoints, success) = result.lock().unwrap().take().unwrap();
/// assert!(success);
/// assert_eq!(waypoints.len(), 1);
/// ```
#[derive(Resource)]
pub struct Navigator {
    grid: SpatialGrid,
    queue: RequestQueue,
    bus: GridMutationBus,
    registry: OccupancyRegistry<Entity>,
}

impl Navigator {
    /// Validate the configuration and scan the grid.
    pub fn new(
        settings: GridSettingsBuilder,
        penalties: SurfacePenaltiesBuilder,
        env: Arc<dyn EnvironmentQuery>,
    ) -> Result<Self, PathgridError> {
        let settings = settings.build()?;
        let penalties = penalties.build()?;
        let grid = SpatialGrid::scan(settings, env);

        info!(
            "Navigator ready with a {}x{} grid",
            grid.width(),
            grid.height()
        );

        Ok(Self::from_grid(grid, penalties))
    }

    /// Wrap an already built grid.
    pub fn from_grid(grid: SpatialGrid, penalties: SurfacePenalties) -> Self {
        let pathfinder = Pathfinder::new(grid.len(), penalties);

        Navigator {
            grid,
            queue: RequestQueue::new(pathfinder),
            bus: GridMutationBus::default(),
            registry: OccupancyRegistry::default(),
        }
    }

    /// Replace the mutation bus, e.g. to change the release delay.
    pub fn with_mutation_bus(mut self, bus: GridMutationBus) -> Self {
        self.bus = bus;
        self
    }

    pub fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    pub fn queue(&self) -> &RequestQueue {
        &self.queue
    }

    pub fn mutation_bus(&self) -> &GridMutationBus {
        &self.bus
    }

    /// Queue a path query whose result is handed to `callback` by a later [`Navigator::step()`].
    pub fn submit_path_request(
        &mut self,
        start: Vec3,
        target: Vec3,
        penalty_surfaces: &[SurfaceKind],
        requester: Option<OccupantId>,
        callback: impl FnOnce(Vec<Vec3>, bool) + Send + Sync + 'static,
    ) {
        let mut request = PathRequest::new(start, target, PathResponder::callback(callback))
            .with_penalties(penalty_surfaces.iter().copied());
        request.requester = requester;

        self.submit(request);
    }

    pub fn submit(&mut self, request: PathRequest) {
        self.queue.submit(&mut self.grid, request);
    }

    /// Deliver the in-flight path, if any, and start the next queued request.
    pub fn step(&mut self) -> Option<PathDelivery> {
        self.queue.step(&mut self.grid)
    }

    /// Advance pending footprint releases.
    pub fn tick(&mut self, delta: Duration) -> usize {
        self.bus.tick(&mut self.grid, delta)
    }

    /// The occupant id of `entity`, assigning the next one if it has none yet.
    pub fn occupant_id(&mut self, entity: Entity) -> OccupantId {
        self.registry.get_or_create_index(entity)
    }

    /// The occupant id of `entity`, if it has been assigned one.
    pub fn find_occupant(&self, entity: Entity) -> Option<OccupantId> {
        self.registry.get(&entity)
    }

    /// Claim the cells under a moving occupant. Its previous cells are released after a delay.
    pub fn claim_footprint(
        &mut self,
        occupant: OccupantId,
        center: Vec3,
        footprint: Footprint,
    ) -> CellRect {
        self.bus
            .dynamic_update(&mut self.grid, occupant, center, footprint)
    }

    /// Re-evaluate the cells under a stationary occupant.
    pub fn static_update(
        &mut self,
        occupant: OccupantId,
        center: Vec3,
        footprint: Footprint,
    ) -> CellRect {
        self.bus
            .static_update(&mut self.grid, occupant, center, footprint)
    }

    /// Remember a stationary obstacle's footprint. Removing the occupant later
    /// re-evaluates those cells.
    pub fn track_obstacle(&mut self, occupant: OccupantId, center: Vec3, footprint: Footprint) {
        self.bus.track_static(occupant, center, footprint);
    }

    /// Re-evaluate an arbitrary region after the environment changed.
    pub fn refresh_region(&mut self, center: Vec3, half_width: u32, half_height: u32) -> CellRect {
        self.grid.update_region(center, half_width, half_height, None)
    }

    /// Drop an occupant's claims and cancel its pending releases. A tracked
    /// obstacle's cells are re-evaluated.
    pub fn remove_occupant(&mut self, occupant: OccupantId) {
        self.bus.remove_occupant(&mut self.grid, occupant);
    }
}
