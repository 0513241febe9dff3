use crate::error::DefsError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Six-level likelihood ordinal used by safe-search and face attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Likelihood {
    #[default]
    Unknown,
    VeryUnlikely,
    Unlikely,
    Possible,
    Likely,
    VeryLikely,
}

impl Likelihood {
    pub const ALL: [Likelihood; 6] = [
        Likelihood::Unknown,
        Likelihood::VeryUnlikely,
        Likelihood::Unlikely,
        Likelihood::Possible,
        Likelihood::Likely,
        Likelihood::VeryLikely,
    ];

    /// Out-of-range ordinals map to `Unknown`.
    pub fn from_ordinal(ordinal: i64) -> Self {
        usize::try_from(ordinal)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
            .unwrap_or(Likelihood::Unknown)
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            Likelihood::Unknown => "UNKNOWN",
            Likelihood::VeryUnlikely => "VERY_UNLIKELY",
            Likelihood::Unlikely => "UNLIKELY",
            Likelihood::Possible => "POSSIBLE",
            Likelihood::Likely => "LIKELY",
            Likelihood::VeryLikely => "VERY_LIKELY",
        }
    }
}

impl fmt::Display for Likelihood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Likelihood {
    type Err = DefsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_uppercase().replace(' ', "_");
        Self::ALL
            .into_iter()
            .find(|likelihood| likelihood.wire_name() == name)
            .ok_or(DefsError::UnknownLikelihood(name))
    }
}

impl Serialize for Likelihood {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.ordinal())
    }
}

// The backend emits integers, but enum names show up when results are
// produced with string enums enabled.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawLikelihood {
    Ordinal(i64),
    Name(String),
}

impl<'de> Deserialize<'de> for Likelihood {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match RawLikelihood::deserialize(deserializer)? {
            RawLikelihood::Ordinal(ordinal) => Ok(Likelihood::from_ordinal(ordinal)),
            RawLikelihood::Name(name) => name.parse().map_err(serde::de::Error::custom),
        }
    }
}
