//! Parsing and lock-aware application of suggestion responses

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{KeroError, Result};
use crate::params::{LockState, ParamId, ParameterStore};

/// Parameter id → suggested value, as extracted from a response
pub type SuggestionMapping = BTreeMap<String, f32>;

/// Find the first balanced `{...}` slice in `text`, starting at `from`.
///
/// Braces inside JSON string literals are not counted.
fn balanced_object(text: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let start = from + text[from..].find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some((start, start + offset + 1));
                }
            }
            _ => {}
        }
    }
    None
}

/// First embedded JSON object in free text
///
/// Skips brace-balanced fragments that are not valid JSON objects, so prose
/// like "set {low} higher" before the payload does not hide it.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let mut from = 0;
    while let Some((start, end)) = balanced_object(text, from) {
        let candidate = &text[start..end];
        if serde_json::from_str::<serde_json::Map<String, Value>>(candidate).is_ok() {
            return Some(candidate);
        }
        from = start + 1;
    }
    None
}

/// Numeric value of a mapping entry: a number or a numeric string.
///
/// Magnitudes beyond `f32` become infinities, which the store clamps to the
/// range bounds. Only NaN is dropped.
fn numeric_value(value: &Value) -> Option<f32> {
    let v = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (!v.is_nan()).then_some(v as f32)
}

/// Extract the id → value mapping from a response text
///
/// Entries whose value is not numeric are dropped. A response without any
/// embedded object is an [`KeroError::UnparseableResponse`] carrying the raw
/// text.
pub fn parse_suggestion(text: &str) -> Result<SuggestionMapping> {
    let object = extract_json_object(text).ok_or_else(|| KeroError::UnparseableResponse {
        reason: "no JSON object in response".to_string(),
        raw: text.to_string(),
    })?;

    let map: serde_json::Map<String, Value> = serde_json::from_str(object)?;
    Ok(map
        .iter()
        .filter_map(|(key, value)| numeric_value(value).map(|v| (key.clone(), v)))
        .collect())
}

/// What an apply pass did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Parameters written, with the clamped value stored
    pub applied: Vec<(ParamId, f32)>,
    /// Parameters present in the mapping but in a locked group
    pub skipped_locked: Vec<ParamId>,
    /// Mapping keys that name no parameter
    pub ignored_unknown: Vec<String>,
}

impl ApplyReport {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }

    /// Status line for the editor
    pub fn status_message(&self) -> String {
        format!("AI applied! ({} params)", self.applied_count())
    }
}

/// Writes suggestion mappings into the store, honoring group locks
#[derive(Debug, Default, Clone, Copy)]
pub struct SuggestionApplier;

impl SuggestionApplier {
    pub fn new() -> Self {
        Self
    }

    /// Clamp and write every unlocked parameter named by `mapping`.
    ///
    /// Applying the same mapping twice leaves the same end state.
    pub fn apply(
        &self,
        mapping: &SuggestionMapping,
        store: &ParameterStore,
        locks: &LockState,
    ) -> ApplyReport {
        let mut report = ApplyReport::default();

        for (key, &value) in mapping {
            let Some(id) = ParamId::from_str(key) else {
                report.ignored_unknown.push(key.clone());
                continue;
            };
            if locks.is_locked(id) {
                report.skipped_locked.push(id);
                continue;
            }
            let stored = store.set(id, value);
            report.applied.push((id, stored));
        }

        report
    }
}
