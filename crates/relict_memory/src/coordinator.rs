//! Simulation engine - owns every piece of state and runs the tick
//!
//! One tick is one [`SimulationEngine::perceive`] call:
//!
//! ```text
//! classify -> remember episode -> impulses -> advance(dt) -> memory decay
//!   -> maybe consolidate -> defense step -> maybe autosave -> decision
//! ```
//!
//! The RNG is drawn in a fixed order (consolidation roll, one jitter per
//! mode, then a phrase only if a manipulation rule matched), so the same seed,
//! clock readings and inputs always produce the same records.

use crate::decision::{
    invasion_probability, CrisisEvent, DecisionRecord, InspectorView, MemoryExcerpt, StateSnapshot,
};
use crate::error::{PersistError, Result};
use crate::persistence::{read_state, write_state, PersistedState};
use crate::store::MemoryStore;
use crate::trauma::trauma_index;
use relict_core::clock::to_datetime;
use relict_core::{AffectModel, AffectState, Clock, Dimension, EngineConfig, EngineRng, SystemClock};
use relict_limbic::perception::impulses;
use relict_limbic::{
    classify, estimate_salience, manipulation, DefenseMode, DefenseStateMachine, ImpulseTarget,
    Signal, Trust,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const EXCERPT_COUNT: usize = 3;
const EXCERPT_MIN_SALIENCE: f32 = 0.05;
const INSPECTOR_MEMORIES: usize = 5;
const INSPECTOR_MIN_SALIENCE: f32 = 0.02;

pub struct SimulationEngine {
    config: EngineConfig,
    affect: AffectModel,
    memory: MemoryStore,
    trust: Trust,
    defense: DefenseStateMachine,
    rng: EngineRng,
    clock: Arc<dyn Clock>,
    /// Autosave target. `None` disables saving.
    state_path: Option<PathBuf>,
    /// Clock reading of the previous tick.
    last_tick: f64,
    ticks_since_save: u32,
}

impl SimulationEngine {
    /// Engine on the system clock, no persistence.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let rng = EngineRng::from_seed_or_random(config.seed);
        let last_tick = clock.now();
        Self {
            affect: AffectModel::new(config.affect.clone()),
            memory: MemoryStore::new(config.memory.clone()),
            trust: Trust::default(),
            defense: DefenseStateMachine::new(config.defense.clone()),
            rng,
            clock,
            state_path: None,
            last_tick,
            ticks_since_save: 0,
            config,
        }
    }

    /// Load state from `path` if present and autosave back to it.
    pub fn with_persistence(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if self.load_from(&path) {
            tracing::info!("Loaded persisted state from {}", path.display());
        }
        self.state_path = Some(path);
        self
    }

    // ========================================================================
    // Tick
    // ========================================================================

    /// Process one user utterance (with optional system context, e.g. the
    /// foreground window title) and decide how the character responds.
    pub fn perceive(&mut self, text: &str, context: &str) -> DecisionRecord {
        let now = self.clock.now();
        let dt = now - self.last_tick;
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        self.last_tick = now;

        let signals = classify(text, context);
        let salience = estimate_salience(&signals);
        if salience > self.config.engine.episode_salience_threshold && !text.trim().is_empty() {
            self.memory
                .remember_episode(text, salience, signals.iter().map(|s| s.kind.as_str()), now);
        }
        self.apply_signals(&signals);

        self.affect.advance(dt);
        self.memory.decay(dt);
        if self.rng.chance(self.config.engine.consolidation_probability) {
            self.memory.consolidate(now);
        }

        let transition = self.defense.step(self.affect.state(), &mut self.rng, now);
        let persistence_warning = self.autosave();

        tracing::debug!(
            "Tick: dt={:.3}s signals={} mode={} trust={:.1}",
            dt,
            signals.len(),
            self.defense.active(),
            self.trust.value()
        );

        let mode = self.defense.active();
        let mut instruction = mode.instruction().to_string();
        let manipulation =
            manipulation::choose(self.affect.vector(), self.trust.value(), &mut self.rng);
        if let Some(hint) = &manipulation {
            instruction.push_str(&hint.instruction_suffix());
        }

        DecisionRecord {
            instruction,
            style: mode.style(),
            manipulation,
            invasion_probability: invasion_probability(self.affect.vector(), self.affect.energy()),
            crisis_events: CrisisEvent::detect(self.affect.vector()),
            state: self.snapshot_at(now),
            memory_excerpts: self
                .memory
                .recall_top(EXCERPT_COUNT, EXCERPT_MIN_SALIENCE)
                .into_iter()
                .map(|e| e.text.clone())
                .collect(),
            description: self.affect.state().describe_for_context(),
            transition,
            persistence_warning,
        }
    }

    fn apply_signals(&mut self, signals: &[Signal]) {
        for signal in signals {
            for impulse in impulses(signal.kind, &self.config.affect) {
                let amount = signal.magnitude * impulse.coefficient;
                match impulse.target {
                    ImpulseTarget::Dimension(d) => self.affect.apply_delta(d, amount),
                    ImpulseTarget::Trust => {
                        self.trust.adjust(amount);
                    }
                }
            }
        }
    }

    /// Count the tick and save every `autosave_interval` ticks. Failures are
    /// logged and returned as a warning instead of interrupting the tick.
    fn autosave(&mut self) -> Option<String> {
        let interval = self.config.engine.autosave_interval;
        if interval == 0 {
            return None;
        }
        self.ticks_since_save += 1;
        if self.ticks_since_save < interval {
            return None;
        }
        self.ticks_since_save = 0;
        if self.state_path.is_none() {
            return None;
        }
        match self.save() {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("Autosave failed: {}", e);
                Some(e.to_string())
            }
        }
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn snapshot(&self) -> StateSnapshot {
        self.snapshot_at(self.clock.now())
    }

    fn snapshot_at(&self, now: f64) -> StateSnapshot {
        let state = self.affect.state();
        StateSnapshot {
            dimensions: state.vector.to_map(),
            sub_components: state.sub_components.into(),
            energy: state.energy,
            mode: self.defense.active(),
            trust: self.trust.value(),
            trauma_index: trauma_index(self.memory.episodes(), now, self.memory.config()),
            timestamp: to_datetime(now),
        }
    }

    pub fn inspect(&self) -> InspectorView {
        InspectorView {
            dimensions: self.affect.vector().to_map(),
            mode: self.defense.active(),
            trust: self.trust.value(),
            top_memories: self
                .memory
                .recall_top(INSPECTOR_MEMORIES, INSPECTOR_MIN_SALIENCE)
                .into_iter()
                .map(|e| MemoryExcerpt {
                    text: e.text.clone(),
                    salience: e.salience,
                })
                .collect(),
            last_transition_time: self.defense.last_transition(),
        }
    }

    /// Lightweight retrieval for prompt building: matching facts first,
    /// keyword-recalled episodes when no fact matches.
    pub fn retrieve(&self, query: &str, k: usize) -> Vec<String> {
        let facts = self.memory.facts_matching(query);
        if !facts.is_empty() {
            return facts.into_iter().take(k).map(str::to_string).collect();
        }
        self.memory
            .recall_by_keyword(query, k)
            .into_iter()
            .map(|e| e.text.clone())
            .collect()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn affect(&self) -> &AffectModel {
        &self.affect
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// For collaborators that write back (store a fact, log an episode).
    pub fn memory_mut(&mut self) -> &mut MemoryStore {
        &mut self.memory
    }

    pub fn mode(&self) -> DefenseMode {
        self.defense.active()
    }

    pub fn last_transition_time(&self) -> f64 {
        self.defense.last_transition()
    }

    pub fn trust(&self) -> f32 {
        self.trust.value()
    }

    pub fn seed(&self) -> u64 {
        self.rng.seed()
    }

    pub fn state_path(&self) -> Option<&Path> {
        self.state_path.as_deref()
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Save to the configured state path.
    pub fn save(&self) -> Result<()> {
        match &self.state_path {
            Some(path) => self.save_to(path),
            None => Err(PersistError::NoPath),
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        write_state(path, &self.to_persisted())?;
        tracing::info!("State saved to {}", path.display());
        Ok(())
    }

    fn to_persisted(&self) -> PersistedState {
        let state = self.affect.state();
        PersistedState {
            version: self.config.persist_version,
            vectors: state.vector.to_map(),
            energy: Some(state.energy),
            active_mode: Some(self.defense.active().as_str().to_string()),
            trust: Some(self.trust.value()),
            last_transition_time: Some(self.defense.last_transition()),
            memory: Some(self.memory.snapshot()),
        }
    }

    /// Load state from `path`. Returns whether anything was applied; a
    /// missing or malformed file leaves the engine untouched.
    pub fn load_from(&mut self, path: &Path) -> bool {
        match read_state(path) {
            Some(persisted) => {
                self.apply_persisted(persisted);
                true
            }
            None => false,
        }
    }

    fn apply_persisted(&mut self, persisted: PersistedState) {
        let legacy = persisted.is_legacy(self.config.persist_version);

        let mut state = *self.affect.state();
        state.vector.merge_named(&persisted.vectors);
        if let Some(energy) = persisted.energy {
            state.set_energy(energy);
        }
        self.affect.restore(state);

        if let Some(trust) = persisted.trust {
            self.trust = Trust::new(trust);
        }

        let mode = match persisted.active_mode.as_deref() {
            Some(name) => DefenseMode::parse_str(name).unwrap_or_else(|| {
                tracing::warn!("Unknown defense mode '{}' in state file, keeping current", name);
                self.defense.active()
            }),
            None => self.defense.active(),
        };
        let last_transition = persisted
            .last_transition_time
            .unwrap_or(self.defense.last_transition());
        self.defense.restore(mode, last_transition);

        if legacy {
            tracing::info!(
                "State file version {} predates {}, memory section ignored",
                persisted.version,
                self.config.persist_version
            );
        } else if let Some(memory) = persisted.memory {
            self.memory = MemoryStore::from_snapshot(self.config.memory.clone(), memory);
        }
    }

    /// Calm the character down and forget everything. Corruption and malice
    /// go to zero, the rest of the affect state, trust and mode return to
    /// defaults. The last transition time is kept. Saves when a state path
    /// is configured.
    pub fn emergency_reset(&mut self) -> Result<()> {
        tracing::warn!("Emergency reset");
        let mut state = AffectState::default();
        state.vector.set(Dimension::Corruption, 0.0);
        state.vector.set(Dimension::Malice, 0.0);
        self.affect.restore(state);
        self.memory.clear();
        self.trust = Trust::default();
        self.defense.reset();
        self.ticks_since_save = 0;
        if self.state_path.is_some() {
            self.save()?;
        }
        Ok(())
    }
}
