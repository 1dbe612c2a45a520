//! Parameter schema, storage and lock groups
//!
//! Every parameter is known at compile time as a [`ParamId`]. String ids only
//! appear at the edges (suggestion payloads, preset files) and are resolved
//! with [`ParamId::from_str`], which rejects unknown ids instead of panicking.

mod locks;
mod store;

pub use locks::LockState;
pub use store::{ParamRange, ParamValues, ParameterStore};

use serde::{Deserialize, Serialize};

/// Number of parameters in the schema
pub const PARAM_COUNT: usize = 20;

/// Stable parameter identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParamId {
    LowGain,
    LowFreq,
    MidGain,
    MidFreq,
    MidQ,
    HighGain,
    HighFreq,
    CompThreshold,
    CompRatio,
    CompAttack,
    CompRelease,
    CompMakeup,
    DelayTime,
    DelayFeedback,
    DelayMix,
    ReverbDecay,
    ReverbSize,
    ReverbDamp,
    ReverbMix,
    Output,
}

impl ParamId {
    /// All parameters in schema order
    pub const ALL: [ParamId; PARAM_COUNT] = [
        ParamId::LowGain,
        ParamId::LowFreq,
        ParamId::MidGain,
        ParamId::MidFreq,
        ParamId::MidQ,
        ParamId::HighGain,
        ParamId::HighFreq,
        ParamId::CompThreshold,
        ParamId::CompRatio,
        ParamId::CompAttack,
        ParamId::CompRelease,
        ParamId::CompMakeup,
        ParamId::DelayTime,
        ParamId::DelayFeedback,
        ParamId::DelayMix,
        ParamId::ReverbDecay,
        ParamId::ReverbSize,
        ParamId::ReverbDamp,
        ParamId::ReverbMix,
        ParamId::Output,
    ];

    /// Index into schema-ordered storage
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire identifier used by presets and the suggestion service
    pub fn as_str(self) -> &'static str {
        self.spec().id
    }

    /// Resolve a wire identifier; unknown ids yield `None`
    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str() == s)
    }

    /// Static description of this parameter
    pub fn spec(self) -> &'static ParamSpec {
        &PARAM_SPECS[self.index()]
    }

    /// Lock group this parameter belongs to
    pub fn group(self) -> ParamGroup {
        self.spec().group
    }
}

impl std::fmt::Display for ParamId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of one parameter
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub id: &'static str,
    pub label: &'static str,
    pub min: f32,
    pub max: f32,
    pub default: f32,
    pub group: ParamGroup,
}

impl ParamSpec {
    const fn new(
        id: &'static str,
        label: &'static str,
        min: f32,
        max: f32,
        default: f32,
        group: ParamGroup,
    ) -> Self {
        Self {
            id,
            label,
            min,
            max,
            default,
            group,
        }
    }

    /// Inclusive range of this parameter
    pub fn range(&self) -> ParamRange {
        ParamRange::new(self.min, self.max)
    }
}

/// The fixed schema, indexed by [`ParamId::index`]
pub static PARAM_SPECS: [ParamSpec; PARAM_COUNT] = [
    ParamSpec::new("lowG", "Low Gain", -18.0, 18.0, 0.0, ParamGroup::Eq),
    ParamSpec::new("lowFreq", "Low Freq", 60.0, 600.0, 200.0, ParamGroup::Eq),
    ParamSpec::new("midG", "Mid Gain", -18.0, 18.0, 0.0, ParamGroup::Eq),
    ParamSpec::new("midFreq", "Mid Freq", 300.0, 5000.0, 1000.0, ParamGroup::Eq),
    ParamSpec::new("midQ", "Mid Q", 0.3, 4.0, 0.8, ParamGroup::Eq),
    ParamSpec::new("highG", "High Gain", -18.0, 18.0, 0.0, ParamGroup::Eq),
    ParamSpec::new("highFreq", "High Freq", 3000.0, 16000.0, 8000.0, ParamGroup::Eq),
    ParamSpec::new("compThresh", "Threshold", -40.0, 0.0, -12.0, ParamGroup::Compressor),
    ParamSpec::new("compRatio", "Ratio", 1.0, 20.0, 4.0, ParamGroup::Compressor),
    ParamSpec::new("compAttack", "Attack", 1.0, 100.0, 10.0, ParamGroup::Compressor),
    ParamSpec::new("compRelease", "Release", 20.0, 500.0, 100.0, ParamGroup::Compressor),
    ParamSpec::new("compMakeup", "Makeup", 0.0, 24.0, 0.0, ParamGroup::Compressor),
    ParamSpec::new("delayTime", "Dly Time", 0.05, 1.0, 0.4, ParamGroup::Delay),
    ParamSpec::new("delayFeedback", "Dly Feedback", 0.0, 0.9, 0.3, ParamGroup::Delay),
    ParamSpec::new("delayMix", "Dly Mix", 0.0, 1.0, 0.0, ParamGroup::Delay),
    ParamSpec::new("revDecay", "Rev Decay", 0.0, 1.0, 0.5, ParamGroup::Reverb),
    ParamSpec::new("revSize", "Rev Size", 0.0, 1.0, 0.5, ParamGroup::Reverb),
    ParamSpec::new("revDamp", "Rev Damp", 0.0, 1.0, 0.3, ParamGroup::Reverb),
    ParamSpec::new("revMix", "Rev Mix", 0.0, 1.0, 0.0, ParamGroup::Reverb),
    ParamSpec::new("aimix", "Output", 0.0, 1.0, 0.8, ParamGroup::Master),
];

/// Lock groups partitioning the parameter set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamGroup {
    Eq,
    Compressor,
    Delay,
    Reverb,
    Master,
}

impl ParamGroup {
    /// Number of groups
    pub const COUNT: usize = 5;

    /// All groups in display order
    pub const ALL: [ParamGroup; Self::COUNT] = [
        ParamGroup::Eq,
        ParamGroup::Compressor,
        ParamGroup::Delay,
        ParamGroup::Reverb,
        ParamGroup::Master,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short display name
    pub fn name(self) -> &'static str {
        match self {
            ParamGroup::Eq => "EQ",
            ParamGroup::Compressor => "COMP",
            ParamGroup::Delay => "DELAY",
            ParamGroup::Reverb => "REVERB",
            ParamGroup::Master => "MASTER",
        }
    }

    /// Parse a group name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "eq" => Some(ParamGroup::Eq),
            "comp" | "compressor" => Some(ParamGroup::Compressor),
            "delay" => Some(ParamGroup::Delay),
            "reverb" | "verb" => Some(ParamGroup::Reverb),
            "master" | "output" => Some(ParamGroup::Master),
            _ => None,
        }
    }

    /// Parameters belonging to this group, in schema order
    pub fn params(self) -> impl Iterator<Item = ParamId> {
        ParamId::ALL.into_iter().filter(move |p| p.group() == self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_order_matches_ids() {
        for (i, id) in ParamId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
            assert_eq!(ParamId::from_str(id.as_str()), Some(*id));
        }
    }

    #[test]
    fn test_defaults_within_range() {
        for spec in PARAM_SPECS.iter() {
            assert!(spec.min < spec.max, "{} has an empty range", spec.id);
            assert!(
                (spec.min..=spec.max).contains(&spec.default),
                "{} default out of range",
                spec.id
            );
        }
    }

    #[test]
    fn test_every_param_in_exactly_one_group() {
        let total: usize = ParamGroup::ALL.iter().map(|g| g.params().count()).sum();
        assert_eq!(total, PARAM_COUNT);
        assert_eq!(ParamGroup::Eq.params().count(), 7);
        assert_eq!(ParamGroup::Compressor.params().count(), 5);
        assert_eq!(ParamGroup::Delay.params().count(), 3);
        assert_eq!(ParamGroup::Reverb.params().count(), 4);
        assert_eq!(ParamGroup::Master.params().collect::<Vec<_>>(), vec![ParamId::Output]);
    }

    #[test]
    fn test_unknown_id() {
        assert_eq!(ParamId::from_str("bogusId"), None);
        assert_eq!(ParamId::from_str("LOWG"), None);
    }

    #[test]
    fn test_group_names() {
        assert_eq!(ParamGroup::from_name("comp"), Some(ParamGroup::Compressor));
        assert_eq!(ParamGroup::from_name("REVERB"), Some(ParamGroup::Reverb));
        assert_eq!(ParamGroup::from_name("chorus"), None);
    }
}
