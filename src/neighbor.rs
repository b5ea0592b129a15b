//! The 8-way grid neighborhood and its integer distance metric.
use bevy::math::{IVec2, UVec2};

/// Cost of an axis-aligned step.
pub const AXIS_STEP_COST: u32 = 10;
/// Cost of a diagonal step, 10 * √2 rounded down.
pub const DIAGONAL_STEP_COST: u32 = 14;

/// Offsets of the eight Chebyshev-distance-1 neighbors.
/// `dx` is the outer loop and `dy` the inner, which fixes iteration order.
pub const ORDINAL_2D_OFFSETS: [IVec2; 8] = [
    IVec2::new(-1, -1),
    IVec2::new(-1, 0),
    IVec2::new(-1, 1),
    IVec2::new(0, -1),
    IVec2::new(0, 1),
    IVec2::new(1, -1),
    IVec2::new(1, 0),
    IVec2::new(1, 1),
];

/// Diagonal-aware distance between two cells: diagonal steps for the shared
/// part of the displacement, axis steps for the rest.
///
/// This is both the step cost between adjacent cells and the A* heuristic.
/// It never overestimates the cost of the cheapest path on an unpenalized grid.
#[inline(always)]
pub fn octile_distance(a: UVec2, b: UVec2) -> u32 {
    let dx = a.x.abs_diff(b.x);
    let dy = a.y.abs_diff(b.y);

    if dx > dy {
        DIAGONAL_STEP_COST * dy + AXIS_STEP_COST * (dx - dy)
    } else {
        DIAGONAL_STEP_COST * dx + AXIS_STEP_COST * (dy - dx)
    }
}

/// Unit direction (component-wise sign) of the step from `from` to `to`.
#[inline]
pub fn step_direction(from: UVec2, to: UVec2) -> IVec2 {
    (to.as_ivec2() - from.as_ivec2()).signum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_costs() {
        let origin = UVec2::new(5, 5);
        assert_eq!(octile_distance(origin, origin), 0);
        assert_eq!(octile_distance(origin, UVec2::new(6, 5)), AXIS_STEP_COST);
        assert_eq!(octile_distance(origin, UVec2::new(5, 4)), AXIS_STEP_COST);
        assert_eq!(octile_distance(origin, UVec2::new(4, 4)), DIAGONAL_STEP_COST);
    }

    #[test]
    fn test_octile_distance_is_symmetric() {
        let a = UVec2::new(0, 0);
        let b = UVec2::new(9, 3);
        assert_eq!(octile_distance(a, b), octile_distance(b, a));
        assert_eq!(octile_distance(a, b), 14 * 3 + 10 * 6);
    }

    #[test]
    fn test_pure_diagonal() {
        assert_eq!(octile_distance(UVec2::ZERO, UVec2::new(9, 9)), 14 * 9);
    }

    #[test]
    fn test_offsets_exclude_self() {
        assert!(!ORDINAL_2D_OFFSETS.contains(&IVec2::ZERO));
        assert!(ORDINAL_2D_OFFSETS.iter().all(|o| o.x.abs() <= 1 && o.y.abs() <= 1));
    }

    #[test]
    fn test_step_direction() {
        assert_eq!(step_direction(UVec2::new(3, 3), UVec2::new(7, 3)), IVec2::new(1, 0));
        assert_eq!(step_direction(UVec2::new(3, 3), UVec2::new(0, 0)), IVec2::new(-1, -1));
        assert_eq!(step_direction(UVec2::new(3, 3), UVec2::new(3, 3)), IVec2::ZERO);
    }
}
