//! Bevy plugin driving a [`Navigator`] resource from components.
use bevy::{log, prelude::*};
use smallvec::SmallVec;

use crate::{
    cell::OccupantId,
    mutation::Footprint,
    navigator::Navigator,
    path::Path,
    queue::{PathRequest, PathResponder},
    surface::SurfaceKind,
};

/// Registers the pathfinding systems. They only run while a [`Navigator`] resource exists.
#[derive(Default)]
pub struct PathgridPlugin;

impl Plugin for PathgridPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<Footprint>()
            .register_type::<PathGoal>()
            .add_systems(
                Update,
                (
                    register_occupants,
                    track_static_obstacles,
                    claim_moved_footprints,
                    release_removed_occupants,
                    tick_pending_releases,
                    request_paths,
                    deliver_paths,
                )
                    .chain()
                    .in_set(PathgridSet)
                    .run_if(resource_exists::<Navigator>),
            );
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathgridSet;

/// Marks an entity whose [`Footprint`] claims grid cells.
#[derive(Component, Default, Debug, Clone, Copy)]
pub struct GridOccupant;

/// Marks a stationary obstacle whose [`Footprint`] blocks cells through the
/// environment. When it is removed or despawned its cells are re-evaluated.
#[derive(Component, Default, Debug, Clone, Copy)]
pub struct StaticObstacle;

/// World position the entity wants a [`Path`] to. Changing it issues a new request.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct PathGoal(pub Vec3);

/// Surfaces whose penalties apply to this entity's paths.
#[derive(Component, Default, Debug, Clone)]
pub struct PenaltySurfaces(pub SmallVec<[SurfaceKind; 4]>);

/// Inserted instead of a [`Path`] when the goal could not be reached.
#[derive(Component, Default, Debug, Clone, Copy)]
pub struct PathFailed;

fn register_occupants(
    mut commands: Commands,
    mut navigator: ResMut<Navigator>,
    query: Query<Entity, Added<GridOccupant>>,
) {
    for entity in &query {
        let id = navigator.occupant_id(entity);
        log::debug!("Registered occupant {entity} as {id:?}");
        commands.entity(entity).insert(id);
    }
}

fn track_static_obstacles(
    mut commands: Commands,
    mut navigator: ResMut<Navigator>,
    query: Query<
        (Entity, &Transform, &Footprint),
        (
            With<StaticObstacle>,
            Or<(Added<StaticObstacle>, Changed<Transform>, Changed<Footprint>)>,
        ),
    >,
) {
    for (entity, transform, footprint) in &query {
        let id = match navigator.find_occupant(entity) {
            Some(id) => id,
            None => {
                let id = navigator.occupant_id(entity);
                log::debug!("Registered obstacle {entity} as {id:?}");
                commands.entity(entity).insert(id);
                id
            }
        };
        navigator.track_obstacle(id, transform.translation, *footprint);
    }
}

fn claim_moved_footprints(
    mut navigator: ResMut<Navigator>,
    query: Query<
        (&OccupantId, &Transform, &Footprint),
        (
            With<GridOccupant>,
            Or<(Changed<Transform>, Changed<Footprint>, Added<OccupantId>)>,
        ),
    >,
) {
    for (id, transform, footprint) in &query {
        navigator.claim_footprint(*id, transform.translation, *footprint);
    }
}

fn release_removed_occupants(
    mut navigator: ResMut<Navigator>,
    mut removed: RemovedComponents<OccupantId>,
    mut removed_obstacles: RemovedComponents<StaticObstacle>,
) {
    for entity in removed.read().chain(removed_obstacles.read()) {
        if let Some(id) = navigator.find_occupant(entity) {
            navigator.remove_occupant(id);
        }
    }
}

fn tick_pending_releases(mut navigator: ResMut<Navigator>, time: Res<Time>) {
    navigator.tick(time.delta());
}

fn request_paths(
    mut navigator: ResMut<Navigator>,
    query: Query<
        (
            Entity,
            &Transform,
            &PathGoal,
            Option<&OccupantId>,
            Option<&PenaltySurfaces>,
        ),
        Changed<PathGoal>,
    >,
) {
    for (entity, transform, goal, occupant, surfaces) in &query {
        let mut request =
            PathRequest::new(transform.translation, goal.0, PathResponder::Entity(entity));
        request.requester = occupant.copied();
        if let Some(surfaces) = surfaces {
            request.penalty_surfaces = surfaces.0.clone();
        }

        log::debug!("Requesting path for {entity} to {}", goal.0);
        navigator.submit(request);
    }
}

fn deliver_paths(mut commands: Commands, mut navigator: ResMut<Navigator>) {
    let Some(delivery) = navigator.step() else {
        return;
    };

    let Ok(mut entity) = commands.get_entity(delivery.entity) else {
        log::warn!("Dropping path for despawned entity {}", delivery.entity);
        return;
    };

    if delivery.path.is_success() {
        entity.remove::<PathFailed>().insert(delivery.path);
    } else {
        entity.remove::<Path>().insert(PathFailed);
    }
}
