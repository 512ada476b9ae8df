//! A signal together with its lazily derived rhythm and feature caches
//!
//! Every artifact is computed at most once per signal: the first caller fills
//! the slot while holding its lock, later callers get the shared `Arc`.
//! Locks are always taken in the order feature slot, then rhythm.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::config::TempoConfig;
use crate::error::AnalysisError;
use crate::features::beat_tracking::calculate_beats;
use crate::features::onset::{calculate_onset_function, OnsetFunction};
use crate::features::period::{calculate_global_tempo, GlobalTempo};
use crate::io::Signal;
use crate::metrics::{Feature, Metric, MetricKey};

/// Onset strength, global tempo and beat times of one recording
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rhythm {
    /// Onset-strength series
    pub onset_function: OnsetFunction,

    /// Global tempo estimate
    pub global_tempo: GlobalTempo,

    /// Beat times in seconds, non-decreasing
    pub beat_times: Vec<f32>,
}

impl Rhythm {
    /// Run onset strength, global tempo and beat tracking on `signal`
    ///
    /// # Errors
    ///
    /// Propagates `AnalysisError` from any of the three stages
    pub fn analyze(signal: &Signal, config: &TempoConfig) -> Result<Self, AnalysisError> {
        let onset_function = calculate_onset_function(signal, config)?;
        let global_tempo = calculate_global_tempo(&onset_function, config)?;
        let beat_times = calculate_beats(&onset_function, &global_tempo, config)?;
        Ok(Self {
            onset_function,
            global_tempo,
            beat_times,
        })
    }
}

type FeatureSlot = Arc<Mutex<Option<Arc<Feature>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Immutable signal plus its derived-artifact caches
///
/// The bound [`TempoConfig`] fixes how rhythm is derived, so every metric
/// reading beats or onset strength from this signal sees the same values.
#[derive(Debug)]
pub struct AnalyzedSignal {
    signal: Signal,
    config: TempoConfig,
    rhythm: Mutex<Option<Arc<Rhythm>>>,
    features: Mutex<HashMap<MetricKey, FeatureSlot>>,
}

impl AnalyzedSignal {
    /// Bind `signal` to a rhythm configuration
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if `config` is invalid
    pub fn new(signal: Signal, config: TempoConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            signal,
            config,
            rhythm: Mutex::new(None),
            features: Mutex::new(HashMap::new()),
        })
    }

    /// Underlying recording
    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    /// Rhythm configuration bound to this signal
    pub fn config(&self) -> &TempoConfig {
        &self.config
    }

    /// Name used in logs and error messages
    pub fn name(&self) -> &str {
        self.signal.display_name()
    }

    /// Onset function, global tempo and beats, computed on first use
    ///
    /// # Errors
    ///
    /// Returns the analysis error; nothing is cached on failure
    pub fn rhythm(&self) -> Result<Arc<Rhythm>, AnalysisError> {
        let mut slot = lock(&self.rhythm);
        if let Some(rhythm) = slot.as_ref() {
            return Ok(Arc::clone(rhythm));
        }
        log::debug!("Analyzing rhythm of '{}'", self.name());
        let rhythm = Arc::new(
            Rhythm::analyze(&self.signal, &self.config)
                .map_err(|e| e.with_context(&format!("rhythm of '{}'", self.name())))?,
        );
        *slot = Some(Arc::clone(&rhythm));
        Ok(rhythm)
    }

    /// Global tempo (computes rhythm on first use)
    pub fn global_tempo(&self) -> Result<GlobalTempo, AnalysisError> {
        Ok(self.rhythm()?.global_tempo)
    }

    /// True once rhythm has been derived
    pub fn has_rhythm(&self) -> bool {
        lock(&self.rhythm).is_some()
    }

    /// Feature of `metric`, computed on first use and cached under its full key
    ///
    /// # Errors
    ///
    /// Returns the metric's error; nothing is cached on failure
    pub fn feature(&self, metric: &Metric) -> Result<Arc<Feature>, AnalysisError> {
        let key = metric.key();
        let slot = {
            let mut features = lock(&self.features);
            Arc::clone(features.entry(key).or_default())
        };

        let mut cached = lock(&slot);
        if let Some(feature) = cached.as_ref() {
            return Ok(Arc::clone(feature));
        }
        let feature = Arc::new(metric.compute(self)?);
        *cached = Some(Arc::clone(&feature));
        Ok(feature)
    }

    /// Cached feature for `key`, without computing it
    pub fn cached_feature(&self, key: &MetricKey) -> Option<Arc<Feature>> {
        let slot = lock(&self.features).get(key).cloned()?;
        let cached = lock(&slot);
        cached.as_ref().map(Arc::clone)
    }

    /// Number of features cached so far
    pub fn cached_feature_count(&self) -> usize {
        let slots: Vec<FeatureSlot> = lock(&self.features).values().cloned().collect();
        slots.iter().filter(|slot| lock(slot).is_some()).count()
    }
}
