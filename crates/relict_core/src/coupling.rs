//! Cross-influence table: pairwise coupling between affect dimensions
//!
//! A sparse relation of `(source, target, coefficient)` triples. A direct
//! change of `delta` on a source dimension also moves every mapped target by
//! `delta * coefficient`. Propagation is one hop only: the induced changes on
//! targets do not feed back through the table.

use crate::affect::Dimension;
use serde::{Deserialize, Serialize};

/// A single directed link in the coupling table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coupling {
    pub source: Dimension,
    pub target: Dimension,
    pub coefficient: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossInfluenceTable {
    links: Vec<Coupling>,
}

impl Default for CrossInfluenceTable {
    fn default() -> Self {
        Self::empty()
            .with_link(Dimension::Panic, Dimension::Corruption, 0.008)
            .with_link(Dimension::Panic, Dimension::Malice, 0.02)
            .with_link(Dimension::Malice, Dimension::Panic, 0.01)
            .with_link(Dimension::Obsession, Dimension::Malice, 0.03)
            .with_link(Dimension::Hope, Dimension::Panic, -0.02)
    }
}

impl CrossInfluenceTable {
    pub fn empty() -> Self {
        Self { links: Vec::new() }
    }

    /// Add a link. Non-finite coefficients are dropped.
    pub fn with_link(mut self, source: Dimension, target: Dimension, coefficient: f32) -> Self {
        if coefficient.is_finite() {
            self.links.push(Coupling {
                source,
                target,
                coefficient,
            });
        } else {
            tracing::warn!("Dropping non-finite coupling {} -> {}", source, target);
        }
        self
    }

    pub fn links(&self) -> &[Coupling] {
        &self.links
    }

    /// Targets of `source` with their coefficients, in insertion order.
    pub fn targets_of(&self, source: Dimension) -> impl Iterator<Item = (Dimension, f32)> + '_ {
        self.links
            .iter()
            .filter(move |l| l.source == source)
            .map(|l| (l.target, l.coefficient))
    }

    /// Sum of coefficients from `source` to `target` (0 when unmapped).
    pub fn coefficient(&self, source: Dimension, target: Dimension) -> f32 {
        self.targets_of(source)
            .filter(|(t, _)| *t == target)
            .map(|(_, c)| c)
            .sum()
    }
}
