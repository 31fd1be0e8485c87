//! Read and write concerns, forwarded to the server on the command path.


use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::skip_serializing_none;
use typed_builder::TypedBuilder;

use crate::{
    error::{Error, Result},
    serde_util,
};

/// The `readConcern` sent with `find`, `aggregate` and `count`.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[non_exhaustive]
pub struct ReadConcern {
    /// How current and durable the returned data must be.
    pub level: ReadConcernLevel,
}

impl ReadConcern {
    /// `{ level: "majority" }`.
    pub fn majority() -> Self {
        ReadConcernLevel::Majority.into()
    }

    /// `{ level: "local" }`.
    pub fn local() -> Self {
        ReadConcernLevel::Local.into()
    }

    /// `{ level: "linearizable" }`.
    pub fn linearizable() -> Self {
        ReadConcernLevel::Linearizable.into()
    }

    /// `{ level: "available" }`.
    pub fn available() -> Self {
        ReadConcernLevel::Available.into()
    }

    /// A level this crate has no variant for, sent verbatim. Known level names map to their
    /// variants.
    pub fn custom(level: impl Into<String>) -> Self {
        ReadConcernLevel::from(level.into()).into()
    }
}

impl From<ReadConcernLevel> for ReadConcern {
    fn from(level: ReadConcernLevel) -> Self {
        Self { level }
    }
}

/// The `level` of a [`ReadConcern`], serialized as its server name.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
#[non_exhaustive]
pub enum ReadConcernLevel {
    /// `"local"`
    Local,

    /// `"majority"`
    Majority,

    /// `"linearizable"`
    Linearizable,

    /// `"available"`
    Available,

    /// Any other level name.
    Custom(String),
}

impl From<String> for ReadConcernLevel {
    fn from(level: String) -> Self {
        match level.as_str() {
            "local" => Self::Local,
            "majority" => Self::Majority,
            "linearizable" => Self::Linearizable,
            "available" => Self::Available,
            _ => Self::Custom(level),
        }
    }
}

impl From<ReadConcernLevel> for String {
    fn from(level: ReadConcernLevel) -> Self {
        match level {
            ReadConcernLevel::Local => "local".into(),
            ReadConcernLevel::Majority => "majority".into(),
            ReadConcernLevel::Linearizable => "linearizable".into(),
            ReadConcernLevel::Available => "available".into(),
            ReadConcernLevel::Custom(level) => level,
        }
    }
}

/// The `writeConcern` sent with `insert`, `update` and `delete`.
///
/// `w: 0` makes a command-path write unacknowledged: the reply is not inspected, and the result
/// reports `acknowledged: false` without counts. Legacy writes are never acknowledged, whatever
/// the write concern.
#[skip_serializing_none]
#[derive(Clone, Debug, Default, PartialEq, TypedBuilder, Serialize, Deserialize)]
#[builder(field_defaults(default, setter(into)))]
#[non_exhaustive]
pub struct WriteConcern {
    /// How many members, or which tagged set, must apply the write.
    pub w: Option<Acknowledgment>,

    /// How long the server waits for `w` before reporting a `writeConcernError`.
    #[serde(rename = "wtimeout", alias = "wtimeoutMS")]
    #[serde(serialize_with = "serde_util::serialize_duration_option_as_int_millis")]
    #[serde(deserialize_with = "serde_util::deserialize_duration_option_from_u64_millis")]
    #[serde(default)]
    pub w_timeout: Option<Duration>,

    /// Whether the write must reach the on-disk journal.
    #[serde(rename = "j", alias = "journal")]
    pub journal: Option<bool>,
}

/// The `w` field of a [`WriteConcern`].
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Acknowledgment {
    /// A member count. `0` requests no acknowledgement at all.
    Nodes(u32),

    /// `"majority"`
    Majority,

    /// A tag set name defined by the deployment.
    Custom(String),
}

impl Serialize for Acknowledgment {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Nodes(n) => serde_util::serialize_u32_as_i32(*n, serializer),
            Self::Majority => serializer.serialize_str("majority"),
            Self::Custom(tag) => serializer.serialize_str(tag),
        }
    }
}

impl<'de> Deserialize<'de> for Acknowledgment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u32),
            Name(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Count(n) => Self::Nodes(n),
            Raw::Name(name) => name.into(),
        })
    }
}

impl From<u32> for Acknowledgment {
    fn from(n: u32) -> Self {
        Self::Nodes(n)
    }
}

impl From<String> for Acknowledgment {
    fn from(name: String) -> Self {
        match name.as_str() {
            "majority" => Self::Majority,
            _ => Self::Custom(name),
        }
    }
}

impl From<&str> for Acknowledgment {
    fn from(name: &str) -> Self {
        name.to_string().into()
    }
}

impl WriteConcern {
    /// `{ w: n }`.
    pub fn nodes(n: u32) -> Self {
        Acknowledgment::Nodes(n).into()
    }

    /// `{ w: "majority" }`.
    pub fn majority() -> Self {
        Acknowledgment::Majority.into()
    }

    /// `{ w: 0 }`.
    pub fn unacknowledged() -> Self {
        Self::nodes(0)
    }

    pub(crate) fn is_acknowledged(&self) -> bool {
        self.w != Some(Acknowledgment::Nodes(0)) || self.journal == Some(true)
    }

    /// An empty write concern is left out of the command so the server default applies.
    pub(crate) fn is_empty(&self) -> bool {
        self.w.is_none() && self.w_timeout.is_none() && self.journal.is_none()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.w == Some(Acknowledgment::Nodes(0)) && self.journal == Some(true) {
            return Err(Error::invalid_argument(
                "write concern cannot have w=0 and j=true",
            ));
        }
        Ok(())
    }
}

impl From<Acknowledgment> for WriteConcern {
    fn from(w: Acknowledgment) -> Self {
        Self {
            w: Some(w),
            ..Default::default()
        }
    }
}
