//! Validation result cache
//!
//! Entries are keyed by state ID plus a content fingerprint, so two
//! different proposals for the same state ID never share a verdict.
//! The fingerprint is `xxh3_64` over the canonical JSON encoding of the
//! state with its timestamp left out.

use rustc_hash::FxHashMap;
use serde::Serialize;
use statecraft_core::{Component, Resource, RuleFailure, SystemState, Value};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use xxhash_rust::xxh3::Xxh3;

/// Cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// ID of the validated state (the `next` state for transitions)
    pub state_id: String,
    /// Content fingerprint
    pub fingerprint: u64,
}

#[derive(Serialize)]
struct FingerprintView<'a> {
    id: &'a str,
    version: u64,
    components: &'a BTreeMap<String, Component>,
    resources: &'a BTreeMap<String, Resource>,
    properties: &'a BTreeMap<String, Value>,
}

impl<'a> From<&'a SystemState> for FingerprintView<'a> {
    fn from(state: &'a SystemState) -> Self {
        Self {
            id: &state.id,
            version: state.version,
            components: &state.components,
            resources: &state.resources,
            properties: &state.properties,
        }
    }
}

impl CacheKey {
    /// Key for `validate_state`; `None` if the state cannot be encoded
    pub fn for_state(state: &SystemState) -> Option<Self> {
        let mut hasher = Xxh3::new();
        hasher.update(b"state:");
        hasher.update(&serde_json::to_vec(&FingerprintView::from(state)).ok()?);
        Some(Self {
            state_id: state.id.clone(),
            fingerprint: hasher.digest(),
        })
    }

    /// Key for `validate_transition`
    pub fn for_transition(current: &SystemState, next: &SystemState) -> Option<Self> {
        let mut hasher = Xxh3::new();
        hasher.update(b"transition:");
        hasher.update(&serde_json::to_vec(&FingerprintView::from(current)).ok()?);
        hasher.update(b"->");
        hasher.update(&serde_json::to_vec(&FingerprintView::from(next)).ok()?);
        Some(Self {
            state_id: next.id.clone(),
            fingerprint: hasher.digest(),
        })
    }
}

/// Cached outcome of one validation
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// ID of the validated state
    pub state_id: String,
    /// Outcome per evaluated rule ID
    pub rule_results: BTreeMap<String, bool>,
    /// Failures to report on a hit
    pub failures: Vec<RuleFailure>,
    /// When the entry was stored
    pub timestamp: Instant,
    /// How long the entry stays live
    pub ttl: Duration,
}

impl CacheEntry {
    /// Whether the entry is still live at `now`
    pub fn is_live(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.timestamp) < self.ttl
    }

    /// Cached verdict
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Bounded TTL cache of validation outcomes
#[derive(Debug)]
pub struct ValidationCache {
    entries: FxHashMap<CacheKey, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl ValidationCache {
    /// Create an empty cache
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: FxHashMap::default(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    /// Live entry for `key`, if any
    pub fn get(&self, key: &CacheKey, now: Instant) -> Option<&CacheEntry> {
        self.entries.get(key).filter(|e| e.is_live(now))
    }

    /// Store an outcome
    ///
    /// When full, expired entries are dropped first, then the oldest entry.
    pub fn insert(
        &mut self,
        key: CacheKey,
        rule_results: BTreeMap<String, bool>,
        failures: Vec<RuleFailure>,
        now: Instant,
    ) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.entries.retain(|_, e| e.is_live(now));
            if self.entries.len() >= self.max_entries {
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|(_, e)| e.timestamp)
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    self.entries.remove(&oldest);
                }
            }
        }

        let entry = CacheEntry {
            state_id: key.state_id.clone(),
            rule_results,
            failures,
            timestamp: now,
            ttl: self.ttl,
        };
        self.entries.insert(key, entry);
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of stored entries (live or not)
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
