//! Regions: where a model or a constraint comes from.
//!
//! Source regions `A`..`I` tag input models; `Union`, `Merged` and `Testing`
//! tag the synthetic working sets built by the merge engine and validator.
//! Every source region owns a *marker* feature, selected exactly when a
//! configuration belongs to that region.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Name of the feature that groups all region markers under the root.
pub const REGION_FEATURE: &str = "Region";

/// Prefix of every region marker feature name.
pub const MARKER_PREFIX: &str = "REGION_";

/// Region tag of a model or constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    #[serde(rename = "UNION")]
    Union,
    #[serde(rename = "MERGED")]
    Merged,
    #[serde(rename = "TESTING")]
    Testing,
}

impl Region {
    /// All source regions, in ordinal order.
    pub const SOURCES: [Self; 9] = [
        Self::A,
        Self::B,
        Self::C,
        Self::D,
        Self::E,
        Self::F,
        Self::G,
        Self::H,
        Self::I,
    ];

    /// The `index`-th source region, if there is one.
    #[must_use]
    pub fn source(index: usize) -> Option<Self> {
        Self::SOURCES.get(index).copied()
    }

    /// Stable ordinal: source regions first, then the synthetic ones.
    #[must_use]
    pub const fn ordinal(self) -> u8 {
        match self {
            Self::A => 0,
            Self::B => 1,
            Self::C => 2,
            Self::D => 3,
            Self::E => 4,
            Self::F => 5,
            Self::G => 6,
            Self::H => 7,
            Self::I => 8,
            Self::Union => 9,
            Self::Merged => 10,
            Self::Testing => 11,
        }
    }

    /// Returns `true` for `A`..`I`.
    #[must_use]
    pub const fn is_source(self) -> bool {
        self.ordinal() < 9
    }

    /// Short display label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
            Self::G => "G",
            Self::H => "H",
            Self::I => "I",
            Self::Union => "UNION",
            Self::Merged => "MERGED",
            Self::Testing => "TESTING",
        }
    }

    /// Marker feature name for a source region; `None` for synthetic regions.
    #[must_use]
    pub fn marker_name(self) -> Option<String> {
        self.is_source()
            .then(|| format!("{MARKER_PREFIX}{}", self.label()))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error returned when parsing an unknown region label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseRegionError {
    /// The label that failed to parse.
    pub value: String,
}

impl fmt::Display for ParseRegionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown region `{}` (expected A..I, UNION, MERGED or TESTING)",
            self.value
        )
    }
}

impl std::error::Error for ParseRegionError {}

impl FromStr for Region {
    type Err = ParseRegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::SOURCES
            .into_iter()
            .chain([Self::Union, Self::Merged, Self::Testing])
            .find(|r| r.label() == upper)
            .ok_or_else(|| ParseRegionError {
                value: s.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_dense_and_sources_come_first() {
        for (i, r) in Region::SOURCES.iter().enumerate() {
            assert_eq!(usize::from(r.ordinal()), i);
            assert!(r.is_source());
        }
        assert!(!Region::Union.is_source());
        assert!(!Region::Merged.is_source());
        assert!(!Region::Testing.is_source());
    }

    #[test]
    fn markers_exist_only_for_source_regions() {
        assert_eq!(Region::A.marker_name().as_deref(), Some("REGION_A"));
        assert_eq!(Region::I.marker_name().as_deref(), Some("REGION_I"));
        assert_eq!(Region::Merged.marker_name(), None);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("b".parse::<Region>().unwrap(), Region::B);
        assert_eq!("merged".parse::<Region>().unwrap(), Region::Merged);
        let err = "Z".parse::<Region>().unwrap_err();
        assert!(err.to_string().contains("unknown region `Z`"));
    }

    #[test]
    fn source_index_lookup() {
        assert_eq!(Region::source(0), Some(Region::A));
        assert_eq!(Region::source(8), Some(Region::I));
        assert_eq!(Region::source(9), None);
    }
}
