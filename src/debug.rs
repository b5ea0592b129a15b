//! This module contains some tools to help you debug your application.
//!
use std::f32::consts::FRAC_PI_2;

use bevy::{color::palettes::css, math::Isometry3d, prelude::*};

use crate::{cell::Cell, navigator::Navigator, path::Path, surface::SurfaceKind};

/// Debug [Gizmos] configuration
#[derive(Resource, Clone, Debug)]
pub struct PathgridDebugConfig {
    pub draw_cells: bool,
    pub draw_paths: bool,
    /// Only draw cells that are blocked, claimed or on a special surface.
    pub skip_plain_cells: bool,
    /// Fraction of the cell diameter each cell outline covers.
    pub cell_scale: f32,
    /// Vertical offset so outlines do not z-fight with the ground.
    pub height_offset: f32,
    pub path_color: Color,
}

impl Default for PathgridDebugConfig {
    fn default() -> Self {
        PathgridDebugConfig {
            draw_cells: true,
            draw_paths: true,
            skip_plain_cells: false,
            cell_scale: 0.9,
            height_offset: 0.05,
            path_color: Color::Srgba(css::DARK_CYAN),
        }
    }
}

#[derive(Clone, Default)]
pub struct PathgridDebugPlugin {
    /// Debug gizmos configuration
    pub config: PathgridDebugConfig,
}

impl Plugin for PathgridDebugPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(self.config.clone()).add_systems(
            Update,
            (
                draw_debug_cells.run_if(resource_exists::<Navigator>),
                draw_debug_paths,
            ),
        );
    }
}

/// Outline color of a cell: blocked red, claimed yellow, special surface magenta, otherwise white.
pub fn cell_color(cell: &Cell) -> Option<Srgba> {
    if !cell.is_walkable() {
        return Some(css::RED);
    }
    if cell.occupant().is_some() {
        return Some(css::YELLOW);
    }
    match cell.surface() {
        SurfaceKind::None | SurfaceKind::Grass => None,
        _ => Some(css::MAGENTA),
    }
}

fn draw_debug_cells(config: Res<PathgridDebugConfig>, navigator: Res<Navigator>, mut gizmos: Gizmos) {
    if !config.draw_cells {
        return;
    }

    let grid = navigator.grid();
    let size = Vec2::splat(grid.settings().cell_diameter() * config.cell_scale);
    let flat = Quat::from_rotation_x(FRAC_PI_2);

    for cell in grid.iter() {
        let color = match cell_color(cell) {
            Some(color) => color,
            None if config.skip_plain_cells => continue,
            None => css::WHITE,
        };

        let center = cell.world() + Vec3::Y * config.height_offset;
        gizmos.rect(Isometry3d::new(center, flat), size, color);
    }
}

fn draw_debug_paths(
    query: Query<(&Path, Option<&Transform>)>,
    config: Res<PathgridDebugConfig>,
    mut gizmos: Gizmos,
) {
    if !config.draw_paths {
        return;
    }

    let lift = Vec3::Y * config.height_offset;

    for (path, transform) in &query {
        let points = transform
            .map(|transform| transform.translation)
            .into_iter()
            .chain(path.iter().copied())
            .map(|point| point + lift);

        gizmos.linestrip(points, config.path_color);
    }
}

#[cfg(test)]
mod tests {
    use bevy::math::UVec2;

    use super::*;
    use crate::{
        cell::OccupantId,
        test_utils::{ascii_grid, world},
    };

    #[test]
    fn test_cell_colors() {
        let (mut grid, _) = ascii_grid(&["#gbm."]);
        grid.update_region(world(4, 0), 0, 0, Some(OccupantId(1)));

        let colors: Vec<Option<Srgba>> = (0..5)
            .map(|x| cell_color(grid.cell(UVec2::new(x, 0)).unwrap()))
            .collect();

        assert_eq!(
            colors,
            vec![
                Some(css::RED),
                None,
                Some(css::MAGENTA),
                Some(css::MAGENTA),
                Some(css::YELLOW)
            ]
        );
    }
}
