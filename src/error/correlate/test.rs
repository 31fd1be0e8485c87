use pretty_assertions::assert_eq;

use super::*;
use crate::{bson::doc, error::ErrorKind};

fn items(range: std::ops::Range<i32>) -> Vec<Document> {
    range.map(|i| doc! { "_id": i }).collect()
}

#[test]
fn maps_chunk_local_index_to_global_item() {
    let chunk_size = 4;
    let all = items(0..12);

    for chunk in 0..3 {
        for k in 0..chunk_size {
            let offset = chunk * chunk_size;
            let submitted = &all[offset..offset + chunk_size];
            let reply = doc! {
                "ok": 1,
                "n": 3,
                "writeErrors": [{ "index": k as i32, "code": 11000, "errmsg": "dup key" }],
            };

            let correlated = correlate(&reply, offset, submitted).unwrap();
            assert_eq!(correlated.write_errors.len(), 1);
            let error = &correlated.write_errors[0];
            assert_eq!(error.index, chunk * chunk_size + k);
            assert_eq!(error.item, all[chunk * chunk_size + k]);
            assert_eq!(error.code, 11000);
        }
    }
}

#[test]
fn reply_without_errors_correlates_to_nothing() {
    let correlated = correlate(&doc! { "ok": 1, "n": 2 }, 0, &items(0..2)).unwrap();
    assert!(!correlated.has_errors());
}

#[test]
fn structurally_invalid_write_errors_are_invalid_reply() {
    let submitted = items(0..2);
    let bad_replies = [
        doc! { "writeErrors": [{ "code": 1, "errmsg": "x" }] },
        doc! { "writeErrors": [{ "index": 0, "errmsg": "x" }] },
        doc! { "writeErrors": [{ "index": 0, "code": 1 }] },
        doc! { "writeErrors": [{ "index": 5, "code": 1, "errmsg": "x" }] },
        doc! { "writeErrors": [{ "index": -1, "code": 1, "errmsg": "x" }] },
        doc! { "writeErrors": ["not a document"] },
        doc! { "writeErrors": { "index": 0 } },
        doc! { "writeConcernError": { "errmsg": "missing code" } },
    ];

    for reply in bad_replies {
        let error = correlate(&reply, 0, &submitted).unwrap_err();
        assert!(
            matches!(*error.kind, ErrorKind::InvalidReply { .. }),
            "{reply} produced {error:?}"
        );
    }
}

#[test]
fn write_concern_error_is_kept() {
    let reply = doc! {
        "ok": 1,
        "writeConcernError": { "code": 64, "codeName": "WriteConcernFailed", "errmsg": "timeout" },
    };
    let correlated = correlate(&reply, 0, &items(0..1)).unwrap();
    assert_eq!(correlated.write_concern_error.unwrap().code, 64);
}

#[test]
fn successful_ids_exclude_failures_in_input_order() {
    let ids: Vec<Bson> = (0..6).map(Bson::Int32).collect();
    let all = items(0..6);
    let mut set = WriteErrorSet::default();

    // Second chunk's reply arrives first.
    let late = doc! { "writeErrors": [{ "index": 1, "code": 2, "errmsg": "b" }] };
    set.absorb(correlate(&late, 3, &all[3..6]).unwrap());
    let early = doc! { "writeErrors": [
        { "index": 2, "code": 1, "errmsg": "a" },
        { "index": 0, "code": 1, "errmsg": "a" },
    ] };
    set.absorb(correlate(&early, 0, &all[0..3]).unwrap());

    let failure = set.into_insert_outcome(&ids, 6).unwrap_err();
    let failed: Vec<usize> = failure.write_errors.iter().map(|e| e.index).collect();
    assert_eq!(failed, vec![0, 2, 4]);
    assert_eq!(
        failure.inserted_ids,
        vec![Bson::Int32(1), Bson::Int32(3), Bson::Int32(5)]
    );
    assert_eq!(failure.inserted_ids.len() + failure.write_errors.len(), ids.len());
    assert!(failure.unsent_ids.is_empty());
}

#[test]
fn unsent_ids_are_reported_separately() {
    let ids: Vec<Bson> = (0..4).map(Bson::Int32).collect();
    let all = items(0..4);
    let mut set = WriteErrorSet::default();
    let reply = doc! { "writeErrors": [{ "index": 1, "code": 1, "errmsg": "a" }] };
    set.absorb(correlate(&reply, 0, &all[0..2]).unwrap());

    let failure = set.into_insert_outcome(&ids, 2).unwrap_err();
    assert_eq!(failure.inserted_ids, vec![Bson::Int32(0)]);
    assert_eq!(failure.unsent_ids, vec![Bson::Int32(2), Bson::Int32(3)]);
}

#[test]
fn ordered_batch_stops_at_its_first_failure() {
    let ids: Vec<Bson> = (0..6).map(Bson::Int32).collect();
    let all = items(0..6);
    let mut set = WriteErrorSet::default();
    let failing = doc! { "n": 1, "writeErrors": [{ "index": 1, "code": 1, "errmsg": "a" }] };
    set.absorb_ordered(correlate(&failing, 0, &all[0..3]).unwrap(), 0..3);
    set.absorb_ordered(correlate(&doc! { "n": 3 }, 3, &all[3..6]).unwrap(), 3..6);

    let failure = set.into_insert_outcome(&ids, 6).unwrap_err();
    assert_eq!(failure.write_errors[0].index, 1);
    assert_eq!(
        failure.inserted_ids,
        vec![Bson::Int32(0), Bson::Int32(3), Bson::Int32(4), Bson::Int32(5)]
    );
    assert_eq!(failure.unsent_ids, vec![Bson::Int32(2)]);
}

#[test]
fn clean_outcome_returns_every_id() {
    let ids: Vec<Bson> = (0..3).map(Bson::Int32).collect();
    let inserted = WriteErrorSet::default()
        .into_insert_outcome(&ids, 3)
        .unwrap();
    assert_eq!(inserted, ids);
}

#[test]
fn ordered_failure_reports_first_statement_only() {
    let all = items(0..3);
    let reply = doc! { "writeErrors": [
        { "index": 2, "code": 1, "errmsg": "b" },
        { "index": 1, "code": 1, "errmsg": "a" },
    ] };

    let mut ordered = WriteErrorSet::default();
    ordered.absorb(correlate(&reply, 0, &all).unwrap());
    let failure = ordered.into_write_failure(true).unwrap();
    assert_eq!(failure.write_errors.len(), 1);
    assert_eq!(failure.write_errors[0].index, 1);

    let mut unordered = WriteErrorSet::default();
    unordered.absorb(correlate(&reply, 0, &all).unwrap());
    assert_eq!(unordered.into_write_failure(false).unwrap().write_errors.len(), 2);

    assert!(WriteErrorSet::default().into_write_failure(false).is_none());
}
