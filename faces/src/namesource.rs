use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FaceError;

/// How a face's identity label was established.
///
/// The `known` flag distinguishes a named identity from a person that is
/// only distinguished-but-unnamed (bound to a synthetic negative identity).
///
/// Manual and Corrected sources are authoritative: the matcher never
/// transitions a face out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NameSource {
    /// No identity decision has been made for this face.
    #[default]
    NotAssigned,
    /// Assigned by a person.
    Manual { known: bool },
    /// An automatic assignment later fixed by a person.
    Corrected { known: bool },
    /// Assigned by the matcher.
    Auto { known: bool },
}

impl NameSource {
    /// True for Manual and Corrected sources. Such faces are never touched
    /// by automatic matching.
    pub fn is_manual_defined(self) -> bool {
        matches!(self, Self::Manual { .. } | Self::Corrected { .. })
    }

    /// True when the face is bound to a named identity.
    pub fn is_known(self) -> bool {
        matches!(
            self,
            Self::Manual { known: true } | Self::Corrected { known: true } | Self::Auto { known: true }
        )
    }

    /// Converts any source to Auto, preserving the known flag. This is how
    /// an automatically matched face inherits known/unknown status from the
    /// reference face it matched.
    pub fn to_auto(self) -> Self {
        Self::Auto { known: self.is_known() }
    }
}

impl fmt::Display for NameSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotAssigned => "not-assigned",
            Self::Manual { known: true } => "manual-known",
            Self::Manual { known: false } => "manual-unknown",
            Self::Corrected { known: true } => "corrected-known",
            Self::Corrected { known: false } => "corrected-unknown",
            Self::Auto { known: true } => "auto-known",
            Self::Auto { known: false } => "auto-unknown",
        };
        f.write_str(s)
    }
}

impl FromStr for NameSource {
    type Err = FaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "not-assigned" => Ok(Self::NotAssigned),
            "manual-known" => Ok(Self::Manual { known: true }),
            "manual-unknown" => Ok(Self::Manual { known: false }),
            "corrected-known" => Ok(Self::Corrected { known: true }),
            "corrected-unknown" => Ok(Self::Corrected { known: false }),
            "auto-known" => Ok(Self::Auto { known: true }),
            "auto-unknown" => Ok(Self::Auto { known: false }),
            _ => Err(FaceError::BadNameSource { value: s.to_string() }),
        }
    }
}

impl Serialize for NameSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NameSource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
