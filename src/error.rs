//! Errors raised while configuring the grid and running the pathfinder.
use bevy::math::Vec2;
use thiserror::Error;

use crate::surface::SurfaceKind;

/// Setup contract violations. These are reported when settings are built,
/// never papered over with fallback values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathgridError {
    /// The cell diameter must be a finite, strictly positive number.
    #[error("cell diameter must be finite and greater than zero, got {0}")]
    InvalidCellDiameter(f32),
    /// The probe radius must be finite and not negative.
    #[error("probe radius must be finite and not negative, got {0}")]
    InvalidProbeRadius(f32),
    /// The world size must be finite and strictly positive on both axes.
    #[error("world size must be finite and greater than zero, got {0}")]
    InvalidWorldSize(Vec2),
    /// The world size divided by the cell diameter rounds down to an empty grid.
    #[error("grid would be empty ({width}x{height} cells)")]
    EmptyGrid { width: u32, height: u32 },
    /// A surface kind that can appear on the grid has no configured penalty.
    #[error("no penalty configured for surface {0}")]
    MissingPenalty(SurfaceKind),
    /// A search was asked to run over more cells than the pathfinder was sized for.
    #[error("grid has {cells} cells but the pathfinder holds {capacity}")]
    CapacityExceeded { cells: usize, capacity: usize },
}
