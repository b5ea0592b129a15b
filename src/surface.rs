//! Terrain classification and per-surface movement penalties.
use rustc_hash::FxHashMap;
use strum::{EnumCount, IntoEnumIterator};

use crate::error::PathgridError;

/// Surface a cell is standing on, read from the tag of whatever the downward probe hits.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum::EnumCount,
    strum::EnumString,
    strum::IntoStaticStr,
)]
pub enum SurfaceKind {
    /// No surface worth penalizing. Never incurs a penalty.
    #[default]
    None,
    Grass,
    Bush,
    MovingEntity,
}

impl SurfaceKind {
    /// Dense index of the variant, used to address penalty tables.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Maps probe tags onto [`SurfaceKind`]s.
///
/// The default table maps the name of every variant except [`SurfaceKind::None`]
/// onto itself, so a probe hit tagged `"Grass"` classifies the cell as grass.
#[derive(Clone, Debug)]
pub struct SurfaceTags(FxHashMap<String, SurfaceKind>);

impl SurfaceTags {
    /// An empty table; every probe resolves to [`SurfaceKind::None`].
    pub fn empty() -> Self {
        SurfaceTags(FxHashMap::default())
    }

    /// Map `tag` onto `kind`, replacing any previous mapping.
    pub fn insert(&mut self, tag: impl Into<String>, kind: SurfaceKind) {
        self.0.insert(tag.into(), kind);
    }

    /// Resolve a probe tag. Unknown tags resolve to [`SurfaceKind::None`].
    pub fn resolve(&self, tag: Option<&str>) -> SurfaceKind {
        tag.and_then(|tag| self.0.get(tag).copied())
            .unwrap_or(SurfaceKind::None)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for SurfaceTags {
    fn default() -> Self {
        let mut tags = SurfaceTags::empty();
        for kind in SurfaceKind::iter().filter(|kind| *kind != SurfaceKind::None) {
            let name: &'static str = kind.into();
            tags.insert(name, kind);
        }
        tags
    }
}

/// Extra movement cost charged for stepping onto a surface, for requesters that opt in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SurfacePenalties([u32; SurfaceKind::COUNT]);

impl SurfacePenalties {
    /// Penalty for a surface. [`SurfaceKind::None`] is always free.
    #[inline]
    pub fn penalty(&self, kind: SurfaceKind) -> u32 {
        self.0[kind.index()]
    }

    /// Penalties of zero for every surface.
    pub fn zero() -> Self {
        SurfacePenalties([0; SurfaceKind::COUNT])
    }
}

/// Builder for [`SurfacePenalties`]. Every surface other than [`SurfaceKind::None`]
/// must be given a value before [`SurfacePenaltiesBuilder::build()`] succeeds.
///
/// ```
/// use bevy_pathgrid::prelude::*;
///
/// let penalties = SurfacePenaltiesBuilder::new()
///     .penalty(SurfaceKind::Grass, 5)
///     .penalty(SurfaceKind::Bush, 20)
///     .penalty(SurfaceKind::MovingEntity, 40)
///     .build()
///     .unwrap();
///
/// assert_eq!(penalties.penalty(SurfaceKind::Bush), 20);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SurfacePenaltiesBuilder {
    values: [Option<u32>; SurfaceKind::COUNT],
}

impl SurfacePenaltiesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the penalty for a surface. Setting one for [`SurfaceKind::None`] is ignored.
    pub fn penalty(mut self, kind: SurfaceKind, value: u32) -> Self {
        if kind != SurfaceKind::None {
            self.values[kind.index()] = Some(value);
        }
        self
    }

    /// Give every surface that has not been set yet the same penalty.
    pub fn fill_missing(mut self, value: u32) -> Self {
        for kind in SurfaceKind::iter().filter(|kind| *kind != SurfaceKind::None) {
            self.values[kind.index()].get_or_insert(value);
        }
        self
    }

    pub fn build(self) -> Result<SurfacePenalties, PathgridError> {
        let mut table = [0; SurfaceKind::COUNT];
        for kind in SurfaceKind::iter().filter(|kind| *kind != SurfaceKind::None) {
            table[kind.index()] = self.values[kind.index()].ok_or(PathgridError::MissingPenalty(kind))?;
        }
        Ok(SurfacePenalties(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_default_tags_cover_every_surface_but_none() {
        let tags = SurfaceTags::default();

        assert_eq!(tags.len(), SurfaceKind::COUNT - 1);
        assert_eq!(tags.resolve(Some("Grass")), SurfaceKind::Grass);
        assert_eq!(tags.resolve(Some("MovingEntity")), SurfaceKind::MovingEntity);
        assert_eq!(tags.resolve(Some("None")), SurfaceKind::None);
        assert_eq!(tags.resolve(Some("Lava")), SurfaceKind::None);
        assert_eq!(tags.resolve(None), SurfaceKind::None);
    }

    #[test]
    fn test_custom_tag() {
        let mut tags = SurfaceTags::empty();
        tags.insert("Hedge", SurfaceKind::Bush);

        assert_eq!(tags.resolve(Some("Hedge")), SurfaceKind::Bush);
        assert_eq!(tags.resolve(Some("Bush")), SurfaceKind::None);
    }

    #[test]
    fn test_surface_names_round_trip_through_strum() {
        assert_eq!(SurfaceKind::from_str("Bush"), Ok(SurfaceKind::Bush));
        assert_eq!(SurfaceKind::Grass.to_string(), "Grass");
    }

    #[test]
    fn test_missing_penalty_is_reported() {
        let result = SurfacePenaltiesBuilder::new()
            .penalty(SurfaceKind::Grass, 5)
            .penalty(SurfaceKind::MovingEntity, 10)
            .build();

        assert_eq!(result, Err(PathgridError::MissingPenalty(SurfaceKind::Bush)));
    }

    #[test]
    fn test_none_is_always_free() {
        let penalties = SurfacePenaltiesBuilder::new()
            .penalty(SurfaceKind::None, 99)
            .fill_missing(7)
            .build()
            .unwrap();

        assert_eq!(penalties.penalty(SurfaceKind::None), 0);
        assert_eq!(penalties.penalty(SurfaceKind::Grass), 7);
    }
}
