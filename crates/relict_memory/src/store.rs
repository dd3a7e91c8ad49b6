//! Episodic and semantic memory
//!
//! Episodes are timestamped snippets of what the user said, ranked by a
//! salience that fades over time. Facts are keyed strings with a confidence
//! that fades until the fact is forgotten. Both live in memory; persistence
//! goes through [`MemorySnapshot`].

use relict_core::dynamics::sanitize_dt;
use relict_core::{sanitize_unit, MemoryConfig};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    /// Seconds since the Unix epoch.
    #[serde(alias = "time")]
    pub created_at: f64,
    pub text: String,
    pub salience: f32,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub consolidated: bool,
}

impl Episode {
    fn sanitize(&mut self) {
        self.salience = sanitize_unit(self.salience);
        if !self.created_at.is_finite() {
            self.created_at = 0.0;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticFact {
    /// Older state files stored arbitrary JSON here; anything that is not a
    /// string is kept as its JSON text.
    #[serde(deserialize_with = "string_or_json")]
    pub value: String,
    pub confidence: f32,
    #[serde(default)]
    pub last_seen: f64,
}

fn string_or_json<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Serializable contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    #[serde(default)]
    pub episodes: Vec<Episode>,
    #[serde(default, alias = "semantic")]
    pub facts: BTreeMap<String, SemanticFact>,
}

#[derive(Debug, Clone)]
pub struct MemoryStore {
    pub(crate) config: MemoryConfig,
    /// Oldest first.
    pub(crate) episodes: VecDeque<Episode>,
    pub(crate) facts: BTreeMap<String, SemanticFact>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

impl MemoryStore {
    pub fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            episodes: VecDeque::new(),
            facts: BTreeMap::new(),
        }
    }

    /// Rebuild a store from persisted contents, repairing out-of-range values
    /// and dropping the oldest episodes beyond capacity.
    pub fn from_snapshot(config: MemoryConfig, snapshot: MemorySnapshot) -> Self {
        let mut store = Self::new(config);
        for mut episode in snapshot.episodes {
            episode.sanitize();
            store.episodes.push_back(episode);
        }
        store.evict_to(store.capacity());
        for (key, mut fact) in snapshot.facts {
            fact.confidence = sanitize_unit(fact.confidence);
            store.facts.insert(key, fact);
        }
        store
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        MemorySnapshot {
            episodes: self.episodes.iter().cloned().collect(),
            facts: self.facts.clone(),
        }
    }

    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    fn capacity(&self) -> usize {
        self.config.max_episode_history.max(1)
    }

    fn evict_to(&mut self, limit: usize) {
        while self.episodes.len() > limit {
            self.episodes.pop_front();
        }
    }

    // ========================================================================
    // Episodes
    // ========================================================================

    /// Append an episode. The text is cut to the configured character limit
    /// and the oldest episode is evicted when the store is full.
    pub fn remember_episode<I, S>(&mut self, text: &str, salience: f32, tags: I, now: f64) -> &Episode
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let text: String = text.chars().take(self.config.episode_text_limit).collect();
        let mut episode = Episode {
            created_at: now,
            text,
            salience,
            tags: tags.into_iter().map(Into::into).collect(),
            consolidated: false,
        };
        episode.sanitize();

        self.evict_to(self.capacity() - 1);
        self.episodes.push_back(episode);
        &self.episodes[self.episodes.len() - 1]
    }

    /// Oldest first.
    pub fn episodes(&self) -> impl Iterator<Item = &Episode> + '_ {
        self.episodes.iter()
    }

    pub fn episode_count(&self) -> usize {
        self.episodes.len()
    }

    /// Up to `k` episodes with `salience >= min_salience`, most salient first.
    /// Ties go to the newer episode (by timestamp, then insertion order).
    pub fn recall_top(&self, k: usize, min_salience: f32) -> Vec<&Episode> {
        let mut ranked: Vec<(usize, &Episode)> = self
            .episodes
            .iter()
            .enumerate()
            .filter(|(_, e)| e.salience >= min_salience)
            .collect();
        ranked.sort_by(|(ia, a), (ib, b)| {
            b.salience
                .total_cmp(&a.salience)
                .then(b.created_at.total_cmp(&a.created_at))
                .then(ib.cmp(ia))
        });
        ranked.into_iter().take(k).map(|(_, e)| e).collect()
    }

    /// Fuzzy keyword recall. An episode scores 1.0 if it contains the whole
    /// query, plus 0.05 per word shared with the query; the score is weighted
    /// by salience. Episodes scoring zero are skipped.
    pub fn recall_by_keyword(&self, query: &str, k: usize) -> Vec<&Episode> {
        let query = query.to_lowercase();
        let query_words: HashSet<&str> = query.split_whitespace().collect();

        let mut scored: Vec<(f32, &Episode)> = Vec::new();
        for episode in self.episodes.iter() {
            let text = episode.text.to_lowercase();
            let mut score = 0.0;
            if text.contains(&query) {
                score += 1.0;
            }
            let text_words: HashSet<&str> = text.split_whitespace().collect();
            let shared = query_words.intersection(&text_words).count();
            score += 0.05 * shared as f32;
            if score > 0.0 {
                scored.push((score * episode.salience, episode));
            }
        }
        // Stable: equal scores keep insertion order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().take(k).map(|(_, e)| e).collect()
    }

    // ========================================================================
    // Facts
    // ========================================================================

    /// Store or overwrite a fact. Last write wins.
    pub fn remember_fact(&mut self, key: &str, value: &str, confidence: f32, now: f64) {
        self.facts.insert(
            key.to_string(),
            SemanticFact {
                value: value.to_string(),
                confidence: sanitize_unit(confidence),
                last_seen: now,
            },
        );
    }

    pub fn recall_fact(&self, key: &str) -> Option<&str> {
        self.facts.get(key).map(|f| f.value.as_str())
    }

    pub fn fact(&self, key: &str) -> Option<&SemanticFact> {
        self.facts.get(key)
    }

    pub fn facts(&self) -> &BTreeMap<String, SemanticFact> {
        &self.facts
    }

    /// Values of facts whose key or value contains `query`, ignoring case.
    pub fn facts_matching(&self, query: &str) -> Vec<&str> {
        let query = query.to_lowercase();
        self.facts
            .iter()
            .filter(|(key, fact)| {
                key.to_lowercase().contains(&query) || fact.value.to_lowercase().contains(&query)
            })
            .map(|(_, fact)| fact.value.as_str())
            .collect()
    }

    // ========================================================================
    // Forgetting
    // ========================================================================

    /// Fade episodes and facts over `dt_secs`.
    ///
    /// Weak episodes fade faster than strong ones, but no episode is ever
    /// deleted here. Facts whose confidence falls below the floor are removed.
    pub fn decay(&mut self, dt_secs: f64) {
        let dt = sanitize_dt(dt_secs) as f32;
        if dt == 0.0 {
            return;
        }
        let c = &self.config;

        for episode in self.episodes.iter_mut() {
            let rate = c.episode_decay_base + (1.0 - episode.salience) * c.episode_decay_weak;
            episode.salience = (episode.salience - rate * dt).max(0.0);
        }

        for fact in self.facts.values_mut() {
            fact.confidence = (fact.confidence - c.fact_decay * dt).max(0.0);
        }
        let floor = c.fact_floor;
        let before = self.facts.len();
        self.facts.retain(|_, f| f.confidence >= floor);
        let forgotten = before - self.facts.len();
        if forgotten > 0 {
            tracing::debug!("Forgot {} semantic facts", forgotten);
        }
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.episodes.clear();
        self.facts.clear();
    }
}
