//! String comparison rules for `find`, `aggregate`, `count`, `update` and `delete`.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

/// The `collation` document of a command. Only servers with wire version 5 or later accept one,
/// so requesting it against an older server, or over a legacy opcode, fails before anything is
/// sent.
#[serde_with::skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct Collation {
    /// ICU locale identifier, e.g. `"fr"` or `"en_US"`.
    #[builder(!default)]
    pub locale: String,

    /// How many comparison levels apply.
    pub strength: Option<CollationStrength>,

    /// Adds a comparison level for case alone.
    pub case_level: Option<bool>,

    /// Which case sorts first at the tertiary level.
    pub case_first: Option<CollationCaseFirst>,

    /// Compares digit runs by numeric value.
    pub numeric_ordering: Option<bool>,

    /// Normalizes text to NFD before comparing.
    pub normalization: Option<bool>,

    /// Orders secondary differences from the end of the string.
    pub backwards: Option<bool>,
}

/// How many ICU comparison levels to apply, sent as the integers 1 to 5.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
#[non_exhaustive]
pub enum CollationStrength {
    /// Base characters only.
    Primary,
    /// Adds accents.
    Secondary,
    /// Adds case.
    Tertiary,
    /// Adds punctuation.
    Quaternary,
    /// Falls back to code points.
    Identical,
}

impl From<CollationStrength> for i32 {
    fn from(strength: CollationStrength) -> Self {
        match strength {
            CollationStrength::Primary => 1,
            CollationStrength::Secondary => 2,
            CollationStrength::Tertiary => 3,
            CollationStrength::Quaternary => 4,
            CollationStrength::Identical => 5,
        }
    }
}

impl TryFrom<i32> for CollationStrength {
    type Error = String;

    fn try_from(level: i32) -> std::result::Result<Self, Self::Error> {
        Ok(match level {
            1 => Self::Primary,
            2 => Self::Secondary,
            3 => Self::Tertiary,
            4 => Self::Quaternary,
            5 => Self::Identical,
            other => return Err(format!("collation strength must be 1 to 5, got {other}")),
        })
    }
}

/// Which case sorts first at the tertiary level.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum CollationCaseFirst {
    /// `"upper"`
    Upper,
    /// `"lower"`
    Lower,
    /// `"off"`, the server default.
    Off,
}
