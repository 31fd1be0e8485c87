use pretty_assertions::assert_eq;

use super::*;
use crate::bson::doc;

#[test]
fn get_int_is_lossless() {
    assert_eq!(get_int(&Bson::Int32(3)), Some(3));
    assert_eq!(get_int(&Bson::Double(4.0)), Some(4));
    assert_eq!(get_int(&Bson::Double(4.5)), None);
    assert_eq!(get_int(&Bson::String("4".into())), None);
    assert_eq!(get_u64(&Bson::Int64(-1)), None);
}

#[test]
fn id_is_prepended_once() {
    let mut doc = doc! { "x": 1 };
    let id = get_or_prepend_id_field(&mut doc);
    assert_eq!(first_key(&doc), Some("_id"));
    assert_eq!(doc.get("_id"), Some(&id));

    let again = get_or_prepend_id_field(&mut doc);
    assert_eq!(again, id);
    assert_eq!(doc.len(), 2);
}

#[test]
fn existing_id_is_kept_in_place() {
    let mut doc = doc! { "x": 1, "_id": "mine" };
    let id = get_or_prepend_id_field(&mut doc);
    assert_eq!(id, Bson::String("mine".into()));
    assert_eq!(doc, doc! { "x": 1, "_id": "mine" });
}
