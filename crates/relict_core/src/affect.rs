//! Affect Vector - the character's primary emotional dimensions
//!
//! Instead of one blended mood value, the character is described by a small
//! closed set of named dimensions, each a scalar in [0, 1]. Some dimensions
//! own sub-components: lagging, smoothed echoes of the parent that let the
//! defense scoring distinguish a fresh spike from a long-held state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Clamp an affect value to [0, 1]. Infinities saturate at the matching
/// bound; NaN has no direction and lands on the lower bound.
#[inline]
pub fn sanitize_unit(v: f32) -> f32 {
    if v.is_nan() {
        tracing::warn!("NaN detected in affect value, clamping to 0");
        return 0.0;
    }
    v.clamp(0.0, 1.0)
}

/// One named scalar of the affect vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// Acute fear. Spikes fast, decays fast.
    Panic,
    /// Slow structural damage. Drifts upward on its own, held back by hope.
    Corruption,
    /// Hostility toward the user.
    Malice,
    /// Belief that someone will help.
    Hope,
    /// Fixation on the antagonist.
    Obsession,
}

impl Dimension {
    pub const COUNT: usize = 5;

    pub const ALL: [Dimension; Self::COUNT] = [
        Dimension::Panic,
        Dimension::Corruption,
        Dimension::Malice,
        Dimension::Hope,
        Dimension::Obsession,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Panic => "panic",
            Dimension::Corruption => "corruption",
            Dimension::Malice => "malice",
            Dimension::Hope => "hope",
            Dimension::Obsession => "obsession",
        }
    }

    /// Parse a dimension name. Unknown names yield `None`, never an error.
    pub fn parse_str(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s))
    }

    /// Value at construction and the fallback for non-finite writes.
    pub fn baseline(&self) -> f32 {
        match self {
            Dimension::Panic => 0.1,
            Dimension::Corruption => 0.02,
            Dimension::Malice => 0.02,
            Dimension::Hope => 0.6,
            Dimension::Obsession => 0.0,
        }
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Auxiliary smoothed signal owned by a parent dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubComponent {
    /// Fast echo of panic.
    Startle,
    /// Slow residue of panic.
    Dread,
    /// Fast echo of malice.
    Reactive,
    /// Slow residue of malice.
    ColdHatred,
}

impl SubComponent {
    pub const COUNT: usize = 4;

    pub const ALL: [SubComponent; Self::COUNT] = [
        SubComponent::Startle,
        SubComponent::Dread,
        SubComponent::Reactive,
        SubComponent::ColdHatred,
    ];

    /// Steady-state ratio between a sub-component and its parent.
    pub const GAIN: f32 = 0.2;

    pub fn parent(&self) -> Dimension {
        match self {
            SubComponent::Startle | SubComponent::Dread => Dimension::Panic,
            SubComponent::Reactive | SubComponent::ColdHatred => Dimension::Malice,
        }
    }

    /// Fraction of the distance to the target that survives one second.
    pub fn retention_per_sec(&self) -> f32 {
        match self {
            SubComponent::Startle => 0.9,
            SubComponent::Dread => 0.995,
            SubComponent::Reactive => 0.8,
            SubComponent::ColdHatred => 0.998,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubComponent::Startle => "startle",
            SubComponent::Dread => "dread",
            SubComponent::Reactive => "reactive",
            SubComponent::ColdHatred => "cold_hatred",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

/// The primary state vector. Every write passes through [`sanitize_unit`],
/// so no value is ever observable outside [0, 1].
///
/// Serialized as a `name -> value` map; unknown names are dropped and missing
/// names keep their baseline on the way in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "BTreeMap<String, f32>", from = "BTreeMap<String, f32>")]
pub struct AffectVector {
    values: [f32; Dimension::COUNT],
}

impl Default for AffectVector {
    fn default() -> Self {
        let mut values = [0.0; Dimension::COUNT];
        for d in Dimension::ALL {
            values[d.index()] = d.baseline();
        }
        Self { values }
    }
}

impl AffectVector {
    pub fn get(&self, dimension: Dimension) -> f32 {
        self.values[dimension.index()]
    }

    pub fn set(&mut self, dimension: Dimension, value: f32) {
        self.values[dimension.index()] = sanitize_unit(value);
    }

    /// Add `amount` and clamp. Returns the value actually stored.
    pub fn add(&mut self, dimension: Dimension, amount: f32) -> f32 {
        self.set(dimension, self.get(dimension) + amount);
        self.get(dimension)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Dimension, f32)> + '_ {
        Dimension::ALL.into_iter().map(|d| (d, self.get(d)))
    }

    /// Overwrite the dimensions named in `map`. Unknown names are ignored.
    /// Returns how many values were applied.
    pub fn merge_named(&mut self, map: &BTreeMap<String, f32>) -> usize {
        let mut applied = 0;
        for (name, value) in map {
            match Dimension::parse_str(name) {
                Some(d) => {
                    self.set(d, *value);
                    applied += 1;
                }
                None => tracing::debug!("Ignoring unknown dimension '{}'", name),
            }
        }
        applied
    }

    pub fn to_map(&self) -> BTreeMap<String, f32> {
        self.iter().map(|(d, v)| (d.as_str().to_string(), v)).collect()
    }
}

impl From<AffectVector> for BTreeMap<String, f32> {
    fn from(v: AffectVector) -> Self {
        v.to_map()
    }
}

impl From<BTreeMap<String, f32>> for AffectVector {
    fn from(map: BTreeMap<String, f32>) -> Self {
        let mut v = AffectVector::default();
        v.merge_named(&map);
        v
    }
}

/// Smoothed sub-components, all clamped to [0, 1]. Default is all zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "BTreeMap<String, f32>", from = "BTreeMap<String, f32>")]
pub struct SubComponents {
    values: [f32; SubComponent::COUNT],
}

impl SubComponents {
    pub fn get(&self, component: SubComponent) -> f32 {
        self.values[component.index()]
    }

    pub fn set(&mut self, component: SubComponent, value: f32) {
        self.values[component.index()] = sanitize_unit(value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (SubComponent, f32)> + '_ {
        SubComponent::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

impl From<SubComponents> for BTreeMap<String, f32> {
    fn from(s: SubComponents) -> Self {
        s.iter().map(|(c, v)| (c.as_str().to_string(), v)).collect()
    }
}

impl From<BTreeMap<String, f32>> for SubComponents {
    fn from(map: BTreeMap<String, f32>) -> Self {
        let mut s = SubComponents::default();
        for (name, value) in &map {
            if let Some(c) = SubComponent::parse_str(name) {
                s.set(c, *value);
            }
        }
        s
    }
}
