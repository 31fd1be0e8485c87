//! Serde adapters for option fields whose server representation is a signed BSON integer.

#[cfg(test)]
mod test;

use std::time::Duration;

use serde::{ser::Error as _, Deserialize, Deserializer, Serializer};

/// Whole milliseconds: an Int32 when it fits, an Int64 otherwise.
pub(crate) fn serialize_duration_option_as_int_millis<S: Serializer>(
    val: &Option<Duration>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let Some(duration) = val else {
        return serializer.serialize_none();
    };
    let millis = i64::try_from(duration.as_millis()).unwrap_or(i64::MAX);
    match i32::try_from(millis) {
        Ok(millis) => serializer.serialize_i32(millis),
        Err(_) => serializer.serialize_i64(millis),
    }
}

pub(crate) fn deserialize_duration_option_from_u64_millis<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<Duration>, D::Error> {
    Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
}

pub(crate) fn serialize_u32_as_i32<S: Serializer>(
    val: u32,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let val = i32::try_from(val).map_err(|_| S::Error::custom(format!("{val} exceeds i32::MAX")))?;
    serializer.serialize_i32(val)
}

/// Counts such as `skip` and `limit` are Int64 on the wire.
pub(crate) fn serialize_u64_option_as_i64<S: Serializer>(
    val: &Option<u64>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match val {
        Some(val) => {
            let val =
                i64::try_from(*val).map_err(|_| S::Error::custom(format!("{val} exceeds i64::MAX")))?;
            serializer.serialize_i64(val)
        }
        None => serializer.serialize_none(),
    }
}
