use std::collections::HashSet;

use pretty_assertions::assert_eq;

use super::*;
use crate::bson::doc;

#[test]
fn chunks_partition_input_in_order() {
    for len in 0..40 {
        for size in 1..12 {
            let chunks = chunk_ranges(len, size);
            let mut next = 0;
            for chunk in &chunks {
                assert_eq!(chunk.start, next);
                assert!(chunk.len() <= size);
                assert!(!chunk.is_empty());
                next = chunk.end;
            }
            assert_eq!(next, len);
        }
    }
}

#[test]
fn empty_input_has_no_chunks() {
    let plan = InsertPlan::new(vec![], DEFAULT_MAX_CHUNK_SIZE);
    assert!(plan.is_empty());
    assert!(plan.chunks.is_empty());
}

#[test]
fn ids_are_generated_only_when_missing() {
    let plan = InsertPlan::new(
        vec![doc! { "a": 1 }, doc! { "_id": 7, "a": 2 }, doc! { "a": 3 }],
        2,
    );

    assert_eq!(plan.ids[1], Bson::Int32(7));
    assert!(matches!(plan.ids[0], Bson::ObjectId(_)));
    assert!(matches!(plan.ids[2], Bson::ObjectId(_)));
    assert_ne!(plan.ids[0], plan.ids[2]);
    for (doc, id) in plan.documents.iter().zip(&plan.ids) {
        assert_eq!(doc.get("_id"), Some(id));
    }
    assert_eq!(plan.chunks, vec![0..2, 2..3]);
}

#[test]
fn generated_ids_are_unique() {
    let plan = InsertPlan::new((0..2500).map(|i| doc! { "i": i }).collect(), 1000);
    let unique: HashSet<String> = plan.ids.iter().map(|id| id.to_string()).collect();
    assert_eq!(unique.len(), 2500);
    assert_eq!(plan.chunks.len(), 3);

    let (offset, chunk) = plan.chunk(2);
    assert_eq!(offset, 2000);
    assert_eq!(chunk.len(), 500);
}
