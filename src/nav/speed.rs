//! Per-agent speed modifier stack
//!
//! Three layers compose multiplicatively over the base speed: an external
//! multiplier (walk/run pace set by the host), aura modifiers keyed by the
//! source that applied them (alive until that source clears them), and
//! timed modifiers that expire on their own. Expired timed modifiers are
//! pruned lazily whenever the effective multiplier is queried.

use ahash::AHashMap;
use uuid::Uuid;

use crate::core::error::{Result, SimError};
use crate::core::types::SimTime;

/// Floor for the combined multiplier; keeps step durations finite
pub const MIN_EFFECTIVE_MULTIPLIER: f32 = 0.05;

/// Ceiling for the combined multiplier
pub const MAX_EFFECTIVE_MULTIPLIER: f32 = 5.0;

/// Largest factor a single modifier may carry
pub const MAX_MODIFIER_FACTOR: f32 = 5.0;

#[derive(Debug, Clone, Copy)]
struct TimedModifier {
    factor: f32,
    expires_at: SimTime,
}

/// Stacked speed multipliers for one agent
#[derive(Debug, Clone)]
pub struct SpeedStack {
    external: f32,
    timed: Vec<TimedModifier>,
    auras: AHashMap<Uuid, f32>,
}

impl Default for SpeedStack {
    fn default() -> Self {
        Self {
            external: 1.0,
            timed: Vec::new(),
            auras: AHashMap::new(),
        }
    }
}

fn validate_factor(factor: f32) -> Result<f32> {
    if factor > 0.0 && factor <= MAX_MODIFIER_FACTOR {
        Ok(factor)
    } else {
        Err(SimError::InvalidModifier {
            factor,
            max: MAX_MODIFIER_FACTOR,
        })
    }
}

impl SpeedStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk/run pace multiplier chosen by the host
    pub fn set_external(&mut self, factor: f32) -> Result<()> {
        self.external = validate_factor(factor)?;
        Ok(())
    }

    /// Add a modifier that expires `duration` seconds from `now`
    pub fn apply_timed(&mut self, factor: f32, duration: f32, now: SimTime) -> Result<()> {
        let factor = validate_factor(factor)?;
        self.timed.push(TimedModifier {
            factor,
            expires_at: now + f64::from(duration),
        });
        Ok(())
    }

    /// Add or replace the aura modifier from one source
    ///
    /// Persists until the same source calls `clear_aura`; there is no
    /// natural expiry.
    pub fn set_aura(&mut self, source: Uuid, factor: f32) -> Result<()> {
        let factor = validate_factor(factor)?;
        self.auras.insert(source, factor);
        Ok(())
    }

    /// Remove the aura applied by `source`. Returns false if none was held.
    pub fn clear_aura(&mut self, source: Uuid) -> bool {
        self.auras.remove(&source).is_some()
    }

    /// Combined multiplier at `now`, clamped to
    /// [`MIN_EFFECTIVE_MULTIPLIER`, `MAX_EFFECTIVE_MULTIPLIER`]
    ///
    /// Prunes timed modifiers whose expiry has passed.
    pub fn effective(&mut self, now: SimTime) -> f32 {
        self.timed.retain(|m| m.expires_at > now);

        let timed: f32 = self.timed.iter().map(|m| m.factor).product();
        let auras: f32 = self.auras.values().product();

        (self.external * auras * timed)
            .clamp(MIN_EFFECTIVE_MULTIPLIER, MAX_EFFECTIVE_MULTIPLIER)
    }

    /// Live timed modifier count (pruning happens on `effective`)
    pub fn timed_count(&self) -> usize {
        self.timed.len()
    }

    pub fn aura_count(&self) -> usize {
        self.auras.len()
    }
}
