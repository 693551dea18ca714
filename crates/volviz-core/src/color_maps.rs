//! Colour maps and indexed colour tables.
//!
//! Volume textures and coloured isosurfaces look colours up by integer index
//! within an active index range, the way plotting libraries expose a colour
//! table. [`IndexedColorMap`] bakes a continuous [`ColorMap`] into such a
//! table and implements [`ColormapLookup`].

use std::collections::HashMap;

use glam::Vec3;

use crate::backend::ColormapLookup;
use crate::error::{Result, VizError};

const GREY: &[[f32; 3]] = &[[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]];

const VIRIDIS: &[[f32; 3]] = &[
    [0.267, 0.004, 0.329],
    [0.282, 0.140, 0.457],
    [0.253, 0.265, 0.529],
    [0.206, 0.371, 0.553],
    [0.163, 0.471, 0.558],
    [0.127, 0.566, 0.550],
    [0.134, 0.658, 0.517],
    [0.266, 0.749, 0.440],
    [0.477, 0.821, 0.318],
    [0.741, 0.873, 0.150],
    [0.993, 0.906, 0.144],
];

// Black through red and yellow to white, the usual density-cube ramp
const HOT: &[[f32; 3]] = &[
    [0.0, 0.0, 0.0],
    [0.5, 0.0, 0.0],
    [1.0, 0.0, 0.0],
    [1.0, 0.5, 0.0],
    [1.0, 1.0, 0.0],
    [1.0, 1.0, 1.0],
];

const BUILTIN: &[(&str, &[[f32; 3]])] = &[("grey", GREY), ("viridis", VIRIDIS), ("hot", HOT)];

/// A continuous colour map defined by evenly spaced samples on `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ColorMap {
    /// Colour map name.
    pub name: String,
    /// Colour samples (evenly spaced from 0 to 1).
    pub colors: Vec<Vec3>,
}

impl ColorMap {
    /// Creates a new colour map.
    pub fn new(name: impl Into<String>, colors: Vec<Vec3>) -> Self {
        Self {
            name: name.into(),
            colors,
        }
    }

    fn from_samples(name: &str, samples: &[[f32; 3]]) -> Self {
        Self::new(name, samples.iter().copied().map(Vec3::from_array).collect())
    }

    /// One of the built-in maps: `grey`, `viridis` or `hot`.
    pub fn builtin(name: &str) -> Option<Self> {
        BUILTIN
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(n, samples)| Self::from_samples(n, samples))
    }

    /// Linear interpolation between the samples around `t`, clamped to `[0, 1]`.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn sample(&self, t: f32) -> Vec3 {
        match self.colors.as_slice() {
            [] => Vec3::ZERO,
            [only] => *only,
            colors => {
                let x = t.clamp(0.0, 1.0) * (colors.len() - 1) as f32;
                let below = (x as usize).min(colors.len() - 2);
                colors[below].lerp(colors[below + 1], x - below as f32)
            }
        }
    }
}

/// A colour table addressed by integer index over an inclusive range `c1..=c2`.
#[derive(Debug, Clone)]
pub struct IndexedColorMap {
    first: u32,
    table: Vec<Vec3>,
}

impl IndexedColorMap {
    /// Bakes `map` into the index range `first..=last`.
    ///
    /// `first` maps to the start of the colour map and `last` to its end.
    pub fn from_color_map(map: &ColorMap, first: u32, last: u32) -> Result<Self> {
        if last < first {
            return Err(VizError::InvalidArgument(format!(
                "colour index range {first}..={last} is empty"
            )));
        }
        let span = last - first;
        #[allow(clippy::cast_precision_loss)]
        let table = (0..=span)
            .map(|n| {
                if span == 0 {
                    map.sample(0.0)
                } else {
                    map.sample(n as f32 / span as f32)
                }
            })
            .collect();
        Ok(Self { first, table })
    }

    /// A grey ramp from black to white over `first..=last`.
    pub fn greyscale(first: u32, last: u32) -> Result<Self> {
        Self::from_color_map(&ColorMap::from_samples("grey", GREY), first, last)
    }

    /// Number of entries in the table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns true if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl ColormapLookup for IndexedColorMap {
    #[allow(clippy::cast_possible_truncation)]
    fn color_index_range(&self) -> (u32, u32) {
        (self.first, self.first + self.table.len() as u32 - 1)
    }

    fn color(&self, index: u32) -> Vec3 {
        let offset = index.saturating_sub(self.first) as usize;
        self.table
            .get(offset.min(self.table.len() - 1))
            .copied()
            .unwrap_or(Vec3::ZERO)
    }
}

/// Named colour maps available to a context, seeded with the built-ins.
#[derive(Debug, Clone)]
pub struct ColorMapRegistry {
    maps: HashMap<String, ColorMap>,
}

impl Default for ColorMapRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ColorMapRegistry {
    /// A registry holding `grey`, `viridis` and `hot`.
    pub fn new() -> Self {
        let maps = BUILTIN
            .iter()
            .map(|(name, samples)| ((*name).to_owned(), ColorMap::from_samples(name, samples)))
            .collect();
        Self { maps }
    }

    /// Adds `map` under its name and returns the map it replaced, if any.
    pub fn insert(&mut self, map: ColorMap) -> Option<ColorMap> {
        self.maps.insert(map.name.clone(), map)
    }

    /// Looks a map up by name.
    pub fn get(&self, name: &str) -> Option<&ColorMap> {
        self.maps.get(name)
    }

    /// Bakes the named colour map into the index range `first..=last`.
    pub fn indexed(&self, name: &str, first: u32, last: u32) -> Result<IndexedColorMap> {
        let map = self
            .get(name)
            .ok_or_else(|| VizError::InvalidArgument(format!("unknown colour map '{name}'")))?;
        IndexedColorMap::from_color_map(map, first, last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_endpoints() {
        let map = ColorMap::new("bw", vec![Vec3::ZERO, Vec3::ONE]);
        assert_eq!(map.sample(0.0), Vec3::ZERO);
        assert_eq!(map.sample(1.0), Vec3::ONE);
        assert_eq!(map.sample(2.0), Vec3::ONE);
        assert!((map.sample(0.25) - Vec3::splat(0.25)).length() < 1e-6);
    }

    #[test]
    fn test_indexed_range() {
        let grey = IndexedColorMap::greyscale(16, 271).unwrap();
        assert_eq!(grey.len(), 256);
        assert_eq!(grey.color_index_range(), (16, 271));
        assert_eq!(grey.color(16), Vec3::ZERO);
        assert_eq!(grey.color(271), Vec3::ONE);
        // Out-of-range indices clamp to the table ends
        assert_eq!(grey.color(0), Vec3::ZERO);
        assert_eq!(grey.color(1000), Vec3::ONE);
    }

    #[test]
    fn test_single_entry_table() {
        let one = IndexedColorMap::greyscale(5, 5).unwrap();
        assert_eq!(one.color_index_range(), (5, 5));
        assert_eq!(one.color(5), Vec3::ZERO);
    }

    #[test]
    fn test_empty_range_rejected() {
        assert!(IndexedColorMap::greyscale(10, 9).is_err());
    }

    #[test]
    fn test_registry_defaults() {
        let registry = ColorMapRegistry::default();
        assert_eq!(registry.get("viridis").unwrap().colors.len(), 11);
        assert_eq!(registry.get("hot").unwrap().sample(1.0), Vec3::ONE);
        assert!(registry.indexed("grey", 0, 63).is_ok());
        assert!(registry.indexed("nope", 0, 63).is_err());
        assert!(ColorMap::builtin("coolwarm").is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let mut registry = ColorMapRegistry::new();
        let red = ColorMap::new("hot", vec![Vec3::X]);
        assert!(registry.insert(red).is_some());
        let hot = registry.indexed("hot", 0, 3).unwrap();
        assert_eq!(hot.color(2), Vec3::X);
        assert!(registry.insert(ColorMap::new("mine", vec![Vec3::Y])).is_none());
    }
}
