//! Lock-free parameter storage
//!
//! Values are `f32` bit patterns in `AtomicU32` cells, one per parameter. The
//! audio thread only loads; the UI thread (or the suggestion applier running
//! on it) stores. A single 32-bit atomic store can never be observed torn.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::{ParamId, PARAM_COUNT, PARAM_SPECS};
use crate::error::Result;

/// Inclusive parameter range with affine 0..1 normalization
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamRange {
    pub min: f32,
    pub max: f32,
}

impl ParamRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Clamp into the range; NaN passes through so callers can reject it
    #[inline]
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }

    /// Map a plain value to 0..1
    pub fn to_normalized(&self, value: f32) -> f32 {
        ((self.clamp(value) - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
    }

    /// Map 0..1 back to a plain value
    pub fn from_normalized(&self, normalized: f32) -> f32 {
        self.clamp(self.min + normalized.clamp(0.0, 1.0) * (self.max - self.min))
    }
}

/// A complete copy of every parameter value, in schema order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamValues([f32; PARAM_COUNT]);

impl ParamValues {
    /// Schema defaults
    pub fn defaults() -> Self {
        let mut values = [0.0; PARAM_COUNT];
        for (slot, spec) in values.iter_mut().zip(PARAM_SPECS.iter()) {
            *slot = spec.default;
        }
        Self(values)
    }

    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        self.0[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamId, f32)> + '_ {
        ParamId::ALL.iter().map(move |&id| (id, self.get(id)))
    }

    /// Compact JSON object in schema order, as sent to the suggestion service
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Serializes as an id → value object in schema order
impl Serialize for ParamValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(PARAM_COUNT))?;
        for (id, value) in self.iter() {
            map.serialize_entry(id.as_str(), &value)?;
        }
        map.end()
    }
}

impl Default for ParamValues {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Thread-safe table of ranged parameters
#[derive(Debug)]
pub struct ParameterStore {
    values: [AtomicU32; PARAM_COUNT],
}

impl ParameterStore {
    /// Create a store holding the schema defaults
    pub fn new() -> Self {
        Self {
            values: std::array::from_fn(|i| AtomicU32::new(PARAM_SPECS[i].default.to_bits())),
        }
    }

    /// Current value. Safe on the audio thread.
    #[inline]
    pub fn get(&self, id: ParamId) -> f32 {
        f32::from_bits(self.values[id.index()].load(Ordering::Acquire))
    }

    /// Store `value` clamped to the parameter range and return what was stored.
    ///
    /// NaN is ignored and the current value returned; infinities clamp to
    /// the nearest bound.
    pub fn set(&self, id: ParamId, value: f32) -> f32 {
        if value.is_nan() {
            return self.get(id);
        }
        let clamped = self.range(id).clamp(value);
        self.values[id.index()].store(clamped.to_bits(), Ordering::Release);
        clamped
    }

    /// Range of a parameter, for UI mapping
    pub fn range(&self, id: ParamId) -> ParamRange {
        id.spec().range()
    }

    /// Current value mapped to 0..1
    pub fn get_normalized(&self, id: ParamId) -> f32 {
        self.range(id).to_normalized(self.get(id))
    }

    /// Store a 0..1 value
    pub fn set_normalized(&self, id: ParamId, normalized: f32) -> f32 {
        if normalized.is_nan() {
            return self.get(id);
        }
        self.set(id, self.range(id).from_normalized(normalized))
    }

    /// Copy every current value
    pub fn snapshot(&self) -> ParamValues {
        let mut values = [0.0; PARAM_COUNT];
        for (slot, id) in values.iter_mut().zip(ParamId::ALL) {
            *slot = self.get(id);
        }
        ParamValues(values)
    }

    /// Write every value of a snapshot back
    pub fn restore(&self, values: &ParamValues) {
        for (id, value) in values.iter() {
            self.set(id, value);
        }
    }

    /// Apply an id → value map, ignoring unknown ids. Returns how many were written.
    pub fn apply_map(&self, map: &BTreeMap<String, f32>) -> usize {
        map.iter()
            .filter_map(|(key, &value)| ParamId::from_str(key).map(|id| (id, value)))
            .map(|(id, value)| self.set(id, value))
            .count()
    }

    /// Reset every parameter to its schema default
    pub fn reset_to_defaults(&self) {
        self.restore(&ParamValues::defaults());
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}
