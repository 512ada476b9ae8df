//! Run-scoped registry of analyzed signals
//!
//! Keeps one [`AnalyzedSignal`] per key (typically a file path) for the
//! lifetime of an evaluation run, so repeated comparisons reuse the rhythm
//! and feature caches. Pass it to whoever needs it; there is no global cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::AnalyzedSignal;
use crate::config::TempoConfig;
use crate::error::AnalysisError;
use crate::io::Signal;

/// Shared analyzed signals keyed by name
#[derive(Debug)]
pub struct SignalCache {
    config: TempoConfig,
    signals: Mutex<HashMap<String, Arc<AnalyzedSignal>>>,
}

impl SignalCache {
    /// Empty cache binding every signal to `config`
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if `config` is invalid
    pub fn new(config: TempoConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        Ok(Self {
            config,
            signals: Mutex::new(HashMap::new()),
        })
    }

    fn signals(&self) -> MutexGuard<'_, HashMap<String, Arc<AnalyzedSignal>>> {
        self.signals.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rhythm configuration shared by all cached signals
    pub fn config(&self) -> &TempoConfig {
        &self.config
    }

    /// Cached signal for `key`, loading it with `loader` on first request
    ///
    /// The loader runs at most once per key; a failed load caches nothing.
    /// Loads are serialised.
    ///
    /// # Errors
    ///
    /// Returns the loader's error
    pub fn get_or_insert_with<F>(&self, key: &str, loader: F) -> Result<Arc<AnalyzedSignal>, AnalysisError>
    where
        F: FnOnce() -> Result<Signal, AnalysisError>,
    {
        let mut signals = self.signals();
        if let Some(signal) = signals.get(key) {
            return Ok(Arc::clone(signal));
        }
        log::debug!("Loading '{}' into signal cache", key);
        let signal = loader().map_err(|e| e.with_context(&format!("loading '{}'", key)))?;
        let analyzed = Arc::new(AnalyzedSignal::new(signal, self.config.clone())?);
        signals.insert(key.to_string(), Arc::clone(&analyzed));
        Ok(analyzed)
    }

    /// Add (or replace) a decoded signal under `key`
    pub fn insert(&self, key: &str, signal: Signal) -> Result<Arc<AnalyzedSignal>, AnalysisError> {
        let analyzed = Arc::new(AnalyzedSignal::new(signal, self.config.clone())?);
        self.signals().insert(key.to_string(), Arc::clone(&analyzed));
        Ok(analyzed)
    }

    /// Cached signal for `key`, if any
    pub fn get(&self, key: &str) -> Option<Arc<AnalyzedSignal>> {
        self.signals().get(key).cloned()
    }

    /// Number of cached signals
    pub fn len(&self) -> usize {
        self.signals().len()
    }

    /// True if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.signals().is_empty()
    }

    /// Drop every cached signal
    pub fn clear(&self) {
        self.signals().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone() -> Result<Signal, AnalysisError> {
        Signal::new(vec![0.25; 800], 8000).map(|s| s.with_name("tone"))
    }

    #[test]
    fn test_loader_runs_once_per_key() {
        let cache = SignalCache::new(TempoConfig::default()).unwrap();
        let mut loads = 0;
        let first = cache
            .get_or_insert_with("tone.wav", || {
                loads += 1;
                tone()
            })
            .unwrap();
        let second = cache
            .get_or_insert_with("tone.wav", || {
                loads += 1;
                tone()
            })
            .unwrap();
        assert_eq!(loads, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_failed_load_is_not_cached() {
        let cache = SignalCache::new(TempoConfig::default()).unwrap();
        let err = cache
            .get_or_insert_with("missing.wav", || {
                Err(AnalysisError::InvalidInput("no such file".to_string()))
            })
            .unwrap_err();
        assert!(err.to_string().contains("loading 'missing.wav'"));
        assert!(cache.is_empty());
        assert!(cache.get("missing.wav").is_none());
    }

    #[test]
    fn test_insert_and_clear() {
        let cache = SignalCache::new(TempoConfig::default()).unwrap();
        cache.insert("a", tone().unwrap()).unwrap();
        assert!(cache.get("a").is_some());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = TempoConfig {
            beat_grid_advance: 0.0,
            ..TempoConfig::default()
        };
        assert!(SignalCache::new(config).is_err());
    }
}
