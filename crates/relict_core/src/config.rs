use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Persisted-state schema version written by this build.
pub const CURRENT_SCHEMA_VERSION: u32 = 3;

// ============================================================================
// Top-level config
// ============================================================================

/// Every tunable of the engine, loaded once at construction.
///
/// On disk this is a flat mapping: the sub-configs are flattened, so a file
/// reads `decay_fast = 0.05` rather than `[affect] decay_fast = 0.05`. The
/// upper-case spellings of older config files (`DECAY_FAST`,
/// `WEIGHT_BELIYTOPORIK`, ...) are accepted as aliases. Unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    #[serde(flatten)]
    pub affect: AffectConfig,
    #[serde(flatten)]
    pub defense: DefenseConfig,
    #[serde(flatten)]
    pub memory: MemoryConfig,
    #[serde(flatten)]
    pub engine: TickConfig,
    /// Fixed seed for reproducible runs. `None` draws a random seed.
    #[serde(alias = "SEED")]
    pub seed: Option<u64>,
    /// Schema version stamped on saved state.
    #[serde(alias = "PERSIST_VERSION")]
    pub persist_version: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            affect: AffectConfig::default(),
            defense: DefenseConfig::default(),
            memory: MemoryConfig::default(),
            engine: TickConfig::default(),
            seed: None,
            persist_version: CURRENT_SCHEMA_VERSION,
        }
    }
}

impl EngineConfig {
    /// Load config from a TOML file (or JSON when the extension is `.json`),
    /// falling back to defaults for missing fields.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let mut config: EngineConfig = if is_json {
            serde_json::from_str(&content).with_context(|| "Failed to parse JSON config")?
        } else {
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?
        };
        config.apply_env_overrides();
        config.sanitize();
        Ok(config)
    }

    /// Try to load from path; if the file doesn't exist or is invalid, return
    /// defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({:#}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("RELICT_SEED") {
            match v.trim().parse() {
                Ok(seed) => self.seed = Some(seed),
                Err(_) => tracing::warn!("Ignoring unparseable RELICT_SEED={:?}", v),
            }
        }
    }

    /// Replace non-finite or out-of-domain tunables with their defaults.
    pub fn sanitize(&mut self) {
        let d = EngineConfig::default();

        let a = &mut self.affect;
        fix(&mut a.decay_fast, d.affect.decay_fast, "decay_fast");
        fix(&mut a.decay_slow, d.affect.decay_slow, "decay_slow");
        fix(&mut a.corruption_drift, d.affect.corruption_drift, "corruption_drift");
        fix(&mut a.hope_damping, d.affect.hope_damping, "hope_damping");
        fix(&mut a.energy_recovery_rate, d.affect.energy_recovery_rate, "energy_recovery_rate");
        fix(&mut a.energy_cost_per_action, d.affect.energy_cost_per_action, "energy_cost_per_action");
        fix_unit(&mut a.exhaustion_threshold, d.affect.exhaustion_threshold, "exhaustion_threshold");
        fix(&mut a.weight_threat, d.affect.weight_threat, "weight_threat");
        fix(&mut a.weight_support, d.affect.weight_support, "weight_support");
        fix(&mut a.weight_antagonist, d.affect.weight_antagonist, "weight_antagonist");

        let m = &mut self.defense;
        fix(&mut m.transition_hysteresis, d.defense.transition_hysteresis, "transition_hysteresis");
        if !m.transition_delay.is_finite() || m.transition_delay < 0.0 {
            tracing::warn!("Invalid transition_delay {}, using default", m.transition_delay);
            m.transition_delay = d.defense.transition_delay;
        }
        fix(&mut m.mode_jitter, d.defense.mode_jitter, "mode_jitter");

        let mem = &mut self.memory;
        if mem.max_episode_history == 0 {
            tracing::warn!("max_episode_history must be positive, using default");
            mem.max_episode_history = d.memory.max_episode_history;
        }
        if mem.episode_text_limit == 0 {
            mem.episode_text_limit = d.memory.episode_text_limit;
        }
        fix(&mut mem.episode_decay_base, d.memory.episode_decay_base, "episode_decay_base");
        fix(&mut mem.episode_decay_weak, d.memory.episode_decay_weak, "episode_decay_weak");
        fix(&mut mem.fact_decay, d.memory.fact_decay, "fact_decay");
        fix_unit(&mut mem.fact_floor, d.memory.fact_floor, "fact_floor");
        fix(&mut mem.tag_boost, d.memory.tag_boost, "tag_boost");
        fix_unit(&mut mem.promotion_threshold, d.memory.promotion_threshold, "promotion_threshold");
        fix_unit(&mut mem.trauma_threshold, d.memory.trauma_threshold, "trauma_threshold");
        if !mem.trauma_window_secs.is_finite() || mem.trauma_window_secs <= 0.0 {
            mem.trauma_window_secs = d.memory.trauma_window_secs;
        }

        let t = &mut self.engine;
        if !t.consolidation_probability.is_finite() {
            t.consolidation_probability = d.engine.consolidation_probability;
        }
        t.consolidation_probability = t.consolidation_probability.clamp(0.0, 1.0);
        fix_unit(
            &mut t.episode_salience_threshold,
            d.engine.episode_salience_threshold,
            "episode_salience_threshold",
        );
    }
}

fn fix(v: &mut f32, default: f32, name: &str) {
    if !v.is_finite() || *v < 0.0 {
        tracing::warn!("Invalid tunable {}={}, using default {}", name, v, default);
        *v = default;
    }
}

fn fix_unit(v: &mut f32, default: f32, name: &str) {
    fix(v, default, name);
    *v = v.clamp(0.0, 1.0);
}

// ============================================================================
// Sub-configs
// ============================================================================

/// Decay, drift and perception weights for the affect model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AffectConfig {
    /// Panic decay per second.
    #[serde(alias = "DECAY_FAST")]
    pub decay_fast: f32,
    /// Malice decay per second; obsession decays at 0.8x this.
    #[serde(alias = "DECAY_SLOW")]
    pub decay_slow: f32,
    /// Upward corruption drift per second.
    #[serde(alias = "CORRUPTION_DRIFT")]
    pub corruption_drift: f32,
    /// Corruption reduction per second per unit of hope.
    pub hope_damping: f32,
    #[serde(alias = "ENERGY_RECOVERY_RATE")]
    pub energy_recovery_rate: f32,
    #[serde(alias = "ENERGY_COST_PER_ACTION")]
    pub energy_cost_per_action: f32,
    /// Panic level above which energy drains instead of recovering.
    pub exhaustion_threshold: f32,
    #[serde(alias = "WEIGHT_THREAT")]
    pub weight_threat: f32,
    #[serde(alias = "WEIGHT_SUPPORT")]
    pub weight_support: f32,
    #[serde(alias = "WEIGHT_BELIYTOPORIK")]
    pub weight_antagonist: f32,
}

impl Default for AffectConfig {
    fn default() -> Self {
        Self {
            decay_fast: 0.06,
            decay_slow: 0.008,
            corruption_drift: 0.0005,
            hope_damping: 0.0009,
            energy_recovery_rate: 0.01,
            energy_cost_per_action: 0.06,
            exhaustion_threshold: 0.7,
            weight_threat: 0.15,
            weight_support: 0.06,
            weight_antagonist: 0.28,
        }
    }
}

/// Mode-selection gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefenseConfig {
    /// Score advantage a challenger needs over the incumbent.
    #[serde(alias = "TRANSITION_HYSTERESIS")]
    pub transition_hysteresis: f32,
    /// Minimum seconds between transitions.
    #[serde(alias = "TRANSITION_DELAY")]
    pub transition_delay: f64,
    /// Total width of the symmetric per-mode jitter.
    pub mode_jitter: f32,
}

impl Default for DefenseConfig {
    fn default() -> Self {
        Self {
            transition_hysteresis: 0.08,
            transition_delay: 6.0,
            mode_jitter: 0.02,
        }
    }
}

/// Episodic/semantic memory limits and forgetting rates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    #[serde(alias = "MAX_EPISODE_HISTORY")]
    pub max_episode_history: usize,
    /// Episode text is truncated to this many characters.
    pub episode_text_limit: usize,
    /// Salience lost per second by every episode.
    pub episode_decay_base: f32,
    /// Extra salience lost per second, scaled by `1 - salience`.
    pub episode_decay_weak: f32,
    /// Fact confidence lost per second.
    pub fact_decay: f32,
    /// Facts below this confidence are forgotten.
    pub fact_floor: f32,
    /// Consolidation salience boost per tag occurrence.
    pub tag_boost: f32,
    /// Salience above which consolidation promotes an episode to a fact.
    pub promotion_threshold: f32,
    /// Salience above which an episode counts toward the trauma index.
    pub trauma_threshold: f32,
    /// Age at which a heavy episode's trauma contribution bottoms out.
    pub trauma_window_secs: f64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_episode_history: 1000,
            episode_text_limit: 2000,
            episode_decay_base: 0.0002,
            episode_decay_weak: 0.001,
            fact_decay: 0.0001,
            fact_floor: 0.05,
            tag_boost: 0.01,
            promotion_threshold: 0.8,
            trauma_threshold: 0.7,
            trauma_window_secs: 60.0 * 60.0 * 24.0,
        }
    }
}

/// Per-tick orchestration knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Chance per tick that a consolidation pass runs.
    pub consolidation_probability: f64,
    /// Save every N ticks when a state path is set. 0 disables autosave.
    pub autosave_interval: u32,
    /// Minimum estimated salience for an input to become an episode.
    pub episode_salience_threshold: f32,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            consolidation_probability: 0.02,
            autosave_interval: 8,
            episode_salience_threshold: 0.02,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.persist_version, CURRENT_SCHEMA_VERSION);
        assert_eq!(cfg.memory.max_episode_history, 1000);
        assert!((cfg.defense.transition_delay - 6.0).abs() < 1e-9);
        assert!(cfg.seed.is_none());
    }

    #[test]
    fn test_parse_flat_toml() {
        let toml_str = r#"
decay_fast = 0.1
transition_hysteresis = 0.2
max_episode_history = 50
seed = 7
some_unknown_key = "ignored"
"#;
        let cfg: EngineConfig = toml::from_str(toml_str).unwrap();
        assert!((cfg.affect.decay_fast - 0.1).abs() < 1e-6);
        assert!((cfg.defense.transition_hysteresis - 0.2).abs() < 1e-6);
        assert_eq!(cfg.memory.max_episode_history, 50);
        assert_eq!(cfg.seed, Some(7));
        // Defaults for unspecified fields
        assert!((cfg.affect.decay_slow - 0.008).abs() < 1e-6);
    }

    #[test]
    fn test_parse_legacy_uppercase_json() {
        let json = r#"{
            "DECAY_FAST": 0.03,
            "WEIGHT_BELIYTOPORIK": 0.5,
            "TRANSITION_DELAY": 2.5,
            "MAX_EPISODE_HISTORY": 10,
            "SEED": 42,
            "CONFIG_FILE": "psycho_config.json"
        }"#;
        let cfg: EngineConfig = serde_json::from_str(json).unwrap();
        assert!((cfg.affect.decay_fast - 0.03).abs() < 1e-6);
        assert!((cfg.affect.weight_antagonist - 0.5).abs() < 1e-6);
        assert!((cfg.defense.transition_delay - 2.5).abs() < 1e-9);
        assert_eq!(cfg.memory.max_episode_history, 10);
        assert_eq!(cfg.seed, Some(42));
    }

    #[test]
    fn test_load_json_by_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("tuning.json");
        std::fs::write(&path, r#"{"decay_slow": 0.01, "autosave_interval": 3}"#).unwrap();
        let cfg = EngineConfig::load(&path).unwrap();
        assert!((cfg.affect.decay_slow - 0.01).abs() < 1e-6);
        assert_eq!(cfg.engine.autosave_interval, 3);
    }

    #[test]
    fn test_sanitize_repairs_invalid_values() {
        let mut cfg = EngineConfig::default();
        cfg.affect.decay_fast = f32::NAN;
        cfg.affect.weight_threat = -1.0;
        cfg.defense.transition_delay = f64::INFINITY;
        cfg.memory.max_episode_history = 0;
        cfg.engine.consolidation_probability = 3.0;
        cfg.sanitize();

        let d = EngineConfig::default();
        assert_eq!(cfg.affect.decay_fast, d.affect.decay_fast);
        assert_eq!(cfg.affect.weight_threat, d.affect.weight_threat);
        assert_eq!(cfg.defense.transition_delay, d.defense.transition_delay);
        assert_eq!(cfg.memory.max_episode_history, d.memory.max_episode_history);
        assert_eq!(cfg.engine.consolidation_probability, 1.0);
    }

    #[test]
    fn test_missing_file_and_env_override() {
        std::env::set_var("RELICT_SEED", "1234");
        let cfg = EngineConfig::load_or_default("/nonexistent/relict.toml");
        assert_eq!(cfg.seed, Some(1234));
        std::env::remove_var("RELICT_SEED");

        let cfg = EngineConfig::load_or_default("/nonexistent/relict.toml");
        assert!(cfg.seed.is_none());
    }
}
