//! This module defines the `Path` component and path simplification.
use std::collections::VecDeque;

use bevy::math::{IVec2, UVec2, Vec3};
use bevy::prelude::Component;
use bevy::reflect::Reflect;

use crate::{grid::SpatialGrid, neighbor::step_direction};

/// The result of a pathfinding request: world-space waypoints from just after the
/// start up to and including the target.
///
/// If using [`crate::plugin::PathgridPlugin`] this is inserted as a component on an entity
/// after the plugin systems have pathfound to its [`crate::plugin::PathGoal`].
#[derive(Debug, Clone, Component, Reflect)]
pub struct Path {
    waypoints: VecDeque<Vec3>,
    cost: u32,
    success: bool,
}

impl Path {
    /// A successful path.
    /// # Arguments
    /// * `waypoints` - World positions in travel order
    /// * `cost` - Total movement cost, including surface penalties
    pub fn new(waypoints: Vec<Vec3>, cost: u32) -> Self {
        Path {
            waypoints: waypoints.into(),
            cost,
            success: true,
        }
    }

    /// A failed search. Carries no waypoints.
    pub fn failed() -> Self {
        Path {
            waypoints: VecDeque::new(),
            cost: 0,
            success: false,
        }
    }

    /// Returns true if the search reached the target.
    /// A successful path can still be empty when start and target share a cell.
    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Returns the movement cost of the path
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Returns the number of remaining waypoints
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Returns true if there are no waypoints left
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Iterate the remaining waypoints in travel order.
    pub fn iter(&self) -> impl Iterator<Item = &Vec3> {
        self.waypoints.iter()
    }

    /// Pops the next waypoint.
    pub fn pop(&mut self) -> Option<Vec3> {
        self.waypoints.pop_front()
    }

    /// Returns the next waypoint without removing it.
    pub fn next(&self) -> Option<Vec3> {
        self.waypoints.front().copied()
    }

    /// The final waypoint.
    pub fn target(&self) -> Option<Vec3> {
        self.waypoints.back().copied()
    }

    /// Split into the shape callback responders receive.
    pub fn into_parts(self) -> (Vec<Vec3>, bool) {
        (self.waypoints.into(), self.success)
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.success == other.success && self.waypoints == other.waypoints
    }
}

impl IntoIterator for Path {
    type Item = Vec3;
    type IntoIter = std::collections::vec_deque::IntoIter<Vec3>;

    fn into_iter(self) -> Self::IntoIter {
        self.waypoints.into_iter()
    }
}

/// Drop the cells of a straight run, keeping only the cells where the path turns.
///
/// `cells` is the path in travel order without `start`. The walk goes from the
/// target backwards: a cell is kept when the step that entered it differs from
/// the step that entered the cell after it, or when it sits next to an obstacle.
/// The target is always kept. Applying this to its own output changes nothing.
pub fn simplify(grid: &SpatialGrid, start: UVec2, cells: &[UVec2]) -> Vec<UVec2> {
    let mut kept = Vec::new();
    let mut previous = IVec2::ZERO;

    for (i, &cell) in cells.iter().enumerate().rev() {
        let from = if i == 0 { start } else { cells[i - 1] };
        let direction = step_direction(from, cell);

        if direction != previous || grid.has_unwalkable_neighbor(cell) {
            kept.push(cell);
        }
        previous = direction;
    }

    kept.reverse();
    kept
}
