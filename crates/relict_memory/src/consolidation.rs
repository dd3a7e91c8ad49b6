//! Consolidation - occasional offline pass over episodic memory
//!
//! Two effects:
//! - episodes carrying frequent tags are reinforced (recurring themes stick);
//! - the most salient episodes are promoted to semantic facts, once each.

use crate::store::MemoryStore;
use std::collections::HashMap;

/// How many of the top episodes are considered for promotion.
const PROMOTION_CANDIDATES: usize = 5;

/// Promoted facts are keyed by this many leading characters of the episode.
const FACT_KEY_CHARS: usize = 60;

/// Outcome of one consolidation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsolidationResult {
    /// Episodes whose salience was raised.
    pub reinforced: usize,
    /// Keys of facts created by promotion.
    pub promoted: Vec<String>,
}

impl MemoryStore {
    /// Run one consolidation pass at time `now`.
    pub fn consolidate(&mut self, now: f64) -> ConsolidationResult {
        let mut result = ConsolidationResult::default();
        let boost_per_tag = self.config.tag_boost;

        // === Tag reinforcement ===
        let mut frequency: HashMap<String, usize> = HashMap::new();
        for episode in &self.episodes {
            for tag in &episode.tags {
                *frequency.entry(tag.clone()).or_default() += 1;
            }
        }
        for episode in self.episodes.iter_mut() {
            let boost: f32 = episode
                .tags
                .iter()
                .map(|t| boost_per_tag * frequency.get(t).copied().unwrap_or(0) as f32)
                .sum();
            if boost > 0.0 {
                episode.salience = relict_core::sanitize_unit(episode.salience + boost);
                result.reinforced += 1;
            }
        }

        // === Promotion ===
        // Stable sort: equal salience keeps insertion order.
        let mut order: Vec<usize> = (0..self.episodes.len()).collect();
        order.sort_by(|&a, &b| {
            self.episodes[b]
                .salience
                .total_cmp(&self.episodes[a].salience)
        });

        let threshold = self.config.promotion_threshold;
        for idx in order.into_iter().take(PROMOTION_CANDIDATES) {
            let episode = &self.episodes[idx];
            if episode.consolidated || episode.salience <= threshold {
                continue;
            }
            let key: String = episode.text.chars().take(FACT_KEY_CHARS).collect();
            let key = key.trim().to_string();
            let value = episode.text.clone();
            let confidence = episode.salience;

            self.episodes[idx].consolidated = true;
            if key.is_empty() {
                continue;
            }
            self.remember_fact(&key, &value, confidence, now);
            result.promoted.push(key);
        }

        if !result.promoted.is_empty() {
            tracing::info!("Consolidation promoted {} episode(s) to facts", result.promoted.len());
        }
        tracing::debug!(
            "Consolidation pass: reinforced={}, promoted={}",
            result.reinforced,
            result.promoted.len()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequent_tags_reinforce() {
        let mut m = MemoryStore::default();
        m.remember_episode("a", 0.3, ["threat"], 1.0);
        m.remember_episode("b", 0.3, ["threat"], 2.0);
        m.remember_episode("c", 0.3, Vec::<String>::new(), 3.0);

        let result = m.consolidate(4.0);
        assert_eq!(result.reinforced, 2);
        let s: Vec<_> = m.episodes().map(|e| e.salience).collect();
        // Two episodes share "threat": each gets 0.01 * 2.
        assert!((s[0] - 0.32).abs() < 1e-6);
        assert_eq!(s[2], 0.3);
    }

    #[test]
    fn test_promotion_happens_once() {
        let mut m = MemoryStore::default();
        m.remember_episode("  Он снова пришёл  ", 0.95, Vec::<String>::new(), 1.0);

        let first = m.consolidate(2.0);
        assert_eq!(first.promoted, vec!["Он снова пришёл".to_string()]);
        assert_eq!(m.recall_fact("Он снова пришёл"), Some("  Он снова пришёл  "));
        assert_eq!(m.fact("Он снова пришёл").map(|f| f.last_seen), Some(2.0));
        assert!(m.episodes().all(|e| e.consolidated));

        let second = m.consolidate(3.0);
        assert!(second.promoted.is_empty());
    }

    #[test]
    fn test_only_top_five_are_candidates() {
        let mut m = MemoryStore::default();
        for i in 0..6 {
            m.remember_episode(&format!("episode {}", i), 0.95, Vec::<String>::new(), i as f64);
        }
        let result = m.consolidate(10.0);
        assert_eq!(result.promoted.len(), 5);
        // The sixth ties on salience but was inserted last: it stays outside
        // the candidate window on every pass.
        assert!(!m.episodes().last().map(|e| e.consolidated).unwrap_or(true));
        assert!(m.consolidate(11.0).promoted.is_empty());
    }

    #[test]
    fn test_below_threshold_not_promoted() {
        let mut m = MemoryStore::default();
        m.remember_episode("quiet", 0.8, Vec::<String>::new(), 1.0);
        assert!(m.consolidate(2.0).promoted.is_empty());
        assert!(!m.episodes().any(|e| e.consolidated));
    }
}
