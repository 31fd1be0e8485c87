use std::time::Duration;

use pretty_assertions::assert_eq;
use serde::Serialize;

use crate::bson::{doc, to_document};

#[derive(Serialize)]
struct Fields {
    #[serde(serialize_with = "super::serialize_duration_option_as_int_millis")]
    short: Option<Duration>,
    #[serde(serialize_with = "super::serialize_duration_option_as_int_millis")]
    long: Option<Duration>,
    #[serde(serialize_with = "super::serialize_u64_option_as_i64")]
    count: Option<u64>,
}

#[test]
fn millis_and_counts_use_signed_integers() {
    let fields = Fields {
        short: Some(Duration::from_millis(1500)),
        long: Some(Duration::from_secs(u32::MAX as u64)),
        count: Some(3),
    };
    assert_eq!(
        to_document(&fields).unwrap(),
        doc! { "short": 1500, "long": (u32::MAX as i64 * 1000), "count": 3_i64 }
    );
}

#[test]
fn out_of_range_count_is_a_serialization_error() {
    let fields = Fields {
        short: None,
        long: None,
        count: Some(u64::MAX),
    };
    assert!(to_document(&fields).is_err());
}
