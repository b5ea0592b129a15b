//! Serializes path requests so only one search result is ever waiting to be delivered.
use std::collections::VecDeque;
use std::fmt;
#[cfg(feature = "stats")]
use std::time::{Duration, Instant};

use bevy::{
    log::{debug, error},
    math::Vec3,
    prelude::Entity,
};
use smallvec::SmallVec;

use crate::{
    astar::{Pathfinder, SearchOutcome},
    cell::OccupantId,
    grid::SpatialGrid,
    path::Path,
    surface::SurfaceKind,
};

/// Callback receiving the waypoints and whether the target was reached.
pub type PathCallback = Box<dyn FnOnce(Vec<Vec3>, bool) + Send + Sync>;

/// Where a finished path goes.
pub enum PathResponder {
    /// Invoked exactly once by [`RequestQueue::step()`].
    Callback(PathCallback),
    /// Handed back from [`RequestQueue::step()`] as a [`PathDelivery`].
    Entity(Entity),
}

impl PathResponder {
    pub fn callback(callback: impl FnOnce(Vec<Vec3>, bool) + Send + Sync + 'static) -> Self {
        PathResponder::Callback(Box::new(callback))
    }
}

impl fmt::Debug for PathResponder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathResponder::Callback(_) => f.write_str("Callback"),
            PathResponder::Entity(entity) => f.debug_tuple("Entity").field(entity).finish(),
        }
    }
}

/// A queued path query. Consumed exactly once.
#[derive(Debug)]
pub struct PathRequest {
    pub start: Vec3,
    pub target: Vec3,
    /// Surfaces whose penalty applies to this requester.
    pub penalty_surfaces: SmallVec<[SurfaceKind; 4]>,
    /// Occupant asking for the path; its own claimed cells stay passable.
    pub requester: Option<OccupantId>,
    pub responder: PathResponder,
}

impl PathRequest {
    pub fn new(start: Vec3, target: Vec3, responder: PathResponder) -> Self {
        PathRequest {
            start,
            target,
            penalty_surfaces: SmallVec::new(),
            requester: None,
            responder,
        }
    }

    pub fn with_penalties(mut self, surfaces: impl IntoIterator<Item = SurfaceKind>) -> Self {
        self.penalty_surfaces.extend(surfaces);
        self
    }

    pub fn with_requester(mut self, requester: OccupantId) -> Self {
        self.requester = Some(requester);
        self
    }
}

/// A finished path addressed to an entity.
#[derive(Debug, Clone)]
pub struct PathDelivery {
    pub entity: Entity,
    pub path: Path,
}

/// Running totals over every search the queue has run.
#[cfg(feature = "stats")]
#[derive(Clone, Debug, Default)]
pub struct PathfindingStats {
    pub searches: u64,
    pub successes: u64,
    pub failures: u64,
    pub expanded: u64,
    pub search_time: Duration,
}

#[cfg(feature = "stats")]
impl PathfindingStats {
    fn record(&mut self, outcome: &SearchOutcome, elapsed: Duration) {
        self.searches += 1;
        if outcome.is_reached() {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
        self.expanded += outcome.expanded() as u64;
        self.search_time += elapsed;
    }

    /// Mean wall time of a single search.
    pub fn average_search_time(&self) -> Duration {
        if self.searches == 0 {
            Duration::ZERO
        } else {
            self.search_time / self.searches as u32
        }
    }
}

struct InFlight {
    responder: PathResponder,
    outcome: SearchOutcome,
}

/// FIFO of path requests with at most one in flight.
///
/// Submitting runs the search for the front request right away if the queue is
/// idle. The result is held until the next [`RequestQueue::step()`], which
/// delivers it and dispatches the following request. Requests are never dropped
/// and the backlog is unbounded.
pub struct RequestQueue {
    pending: VecDeque<PathRequest>,
    in_flight: Option<InFlight>,
    pathfinder: Pathfinder,
    #[cfg(feature = "stats")]
    stats: PathfindingStats,
}

impl RequestQueue {
    pub fn new(pathfinder: Pathfinder) -> Self {
        RequestQueue {
            pending: VecDeque::new(),
            in_flight: None,
            pathfinder,
            #[cfg(feature = "stats")]
            stats: PathfindingStats::default(),
        }
    }

    /// True while a search result is waiting to be delivered.
    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Requests waiting behind the one in flight.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn pathfinder(&self) -> &Pathfinder {
        &self.pathfinder
    }

    #[cfg(feature = "stats")]
    pub fn stats(&self) -> &PathfindingStats {
        &self.stats
    }

    /// Enqueue a request and start it if nothing else is in flight.
    pub fn submit(&mut self, grid: &mut SpatialGrid, request: PathRequest) {
        self.pending.push_back(request);
        self.dispatch(grid);
    }

    /// Deliver the in-flight result, if any, then start the next request.
    ///
    /// Callback responders are invoked here. Entity responders are returned.
    pub fn step(&mut self, grid: &mut SpatialGrid) -> Option<PathDelivery> {
        let in_flight = self.in_flight.take()?;
        let path = self.pathfinder.reconstruct(grid, &in_flight.outcome);
        self.on_finished(grid, in_flight.responder, path)
    }

    fn on_finished(
        &mut self,
        grid: &mut SpatialGrid,
        responder: PathResponder,
        path: Path,
    ) -> Option<PathDelivery> {
        let delivery = match responder {
            PathResponder::Callback(callback) => {
                let (waypoints, success) = path.into_parts();
                callback(waypoints, success);
                None
            }
            PathResponder::Entity(entity) => Some(PathDelivery { entity, path }),
        };

        self.dispatch(grid);
        delivery
    }

    fn dispatch(&mut self, grid: &mut SpatialGrid) {
        if self.in_flight.is_some() {
            return;
        }

        let Some(request) = self.pending.pop_front() else {
            return;
        };

        let (start, target) = Pathfinder::resolve_endpoints(grid, request.start, request.target);

        #[cfg(feature = "stats")]
        let started = Instant::now();

        let outcome = self
            .pathfinder
            .search(
                grid,
                start,
                target,
                &request.penalty_surfaces,
                request.requester,
            )
            .unwrap_or_else(|err| {
                error!("Path request {start} -> {target} failed: {err}");
                SearchOutcome::Failed { expanded: 0 }
            });

        #[cfg(feature = "stats")]
        self.stats.record(&outcome, started.elapsed());

        debug!(
            "Path request {start} -> {target} for {:?}: reached {}, {} cells expanded, {} queued",
            request.requester,
            outcome.is_reached(),
            outcome.expanded(),
            self.pending.len()
        );

        self.in_flight = Some(InFlight {
            responder: request.responder,
            outcome,
        });
    }
}
