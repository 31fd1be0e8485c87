use std::time::Duration;

use futures::{StreamExt, TryStreamExt};
use pretty_assertions::assert_eq;

use crate::{
    bson::{doc, Document},
    cmap::{LegacyMessage, Reply, ResponseFlags},
    error::ErrorKind,
    test::util::{mock_client, MockPool, MockReply, MockTransport},
    Collection,
    Cursor,
};

fn setup(wire_version: i32) -> (Collection, MockPool, MockTransport) {
    let (client, pool, transport) = mock_client(wire_version, None);
    (client.database("db").collection("coll"), pool, transport)
}

fn numbered(range: std::ops::Range<i32>) -> Vec<Document> {
    range.map(|i| doc! { "_id": i }).collect()
}

async fn drain(cursor: &mut Cursor<'_>) -> Vec<Document> {
    let mut docs = Vec::new();
    while let Some(doc) = cursor.try_next().await.unwrap() {
        docs.push(doc);
    }
    docs
}

fn get_more_sizes(transport: &MockTransport) -> Vec<Option<i32>> {
    transport
        .commands()
        .iter()
        .filter(|c| c.name() == "getMore")
        .map(|c| c.body().get_i32("batchSize").ok())
        .collect()
}

#[tokio::test]
async fn limit_discards_extra_documents_and_kills_the_cursor() {
    let (coll, pool, transport) = setup(8);
    transport.push(MockReply::cursor(42, numbered(0..5)));

    let mut cursor = coll.find(doc! {}).limit(3).await.unwrap();
    let docs = drain(&mut cursor).await;

    assert_eq!(docs, numbered(0..3));
    assert!(cursor.is_exhausted());
    assert!(cursor.next().await.is_none());

    let commands = transport.commands();
    assert_eq!(transport.command_names(), vec!["find", "killCursors"]);
    assert_eq!(commands[0].body().get_i64("limit"), Ok(3));
    assert_eq!(
        commands[1].body(),
        &doc! { "killCursors": "coll", "cursors": [42_i64] }
    );
    assert_eq!(pool.checked_in().len(), 1);
    pool.assert_balanced();
}

#[tokio::test]
async fn get_more_asks_for_no_more_than_the_limit_allows() {
    let (coll, pool, transport) = setup(8);
    transport.push(MockReply::cursor(42, numbered(0..2)));
    transport.push(MockReply::next_batch(42, numbered(2..4)));
    transport.push(MockReply::next_batch(0, numbered(4..5)));

    let mut cursor = coll.find(doc! {}).limit(5).batch_size(2u32).await.unwrap();
    let docs = drain(&mut cursor).await;

    assert_eq!(docs, numbered(0..5));
    assert_eq!(get_more_sizes(&transport), vec![Some(2), Some(1)]);
    assert!(!transport.command_names().contains(&"killCursors".to_string()));
    pool.assert_balanced();
}

#[tokio::test]
async fn cursor_without_limit_follows_the_server() {
    let (coll, pool, transport) = setup(8);
    transport.push(MockReply::cursor(42, numbered(0..2)));
    transport.push(MockReply::next_batch(0, numbered(2..3)));

    let mut cursor = coll.find(doc! {}).await.unwrap();
    assert_eq!(drain(&mut cursor).await, numbered(0..3));
    assert_eq!(get_more_sizes(&transport), vec![None]);

    // Single pass.
    assert!(cursor.next().await.is_none());
    pool.assert_balanced();
}

#[tokio::test]
async fn exhausted_first_batch_releases_immediately() {
    let (coll, pool, transport) = setup(8);
    transport.push(MockReply::cursor(0, numbered(0..2)));

    let mut cursor = coll.find(doc! {}).await.unwrap();
    assert_eq!(pool.checked_in().len(), 1);
    assert!(!cursor.is_exhausted());

    assert_eq!(drain(&mut cursor).await, numbered(0..2));
    assert!(cursor.is_exhausted());
    assert_eq!(transport.command_names(), vec!["find"]);
    pool.assert_balanced();
}

#[tokio::test]
async fn close_is_idempotent() {
    let (coll, pool, transport) = setup(8);
    transport.push(MockReply::cursor(42, numbered(0..3)));

    let mut cursor = coll.find(doc! {}).await.unwrap();
    assert_eq!(cursor.next().await.unwrap().unwrap(), numbered(0..1)[0]);
    cursor.close().await;
    cursor.close().await;

    assert!(cursor.is_exhausted());
    assert!(cursor.next().await.is_none());
    assert_eq!(transport.command_names(), vec!["find", "killCursors"]);
    assert_eq!(pool.checked_in().len(), 1);
    pool.assert_balanced();
}

#[tokio::test]
async fn dropped_cursor_is_killed_in_the_background() {
    let (coll, pool, transport) = setup(8);
    transport.push(MockReply::cursor(42, numbered(0..2)));

    let mut cursor = coll.find(doc! {}).await.unwrap();
    cursor.next().await.unwrap().unwrap();
    drop(cursor);

    for _ in 0..50 {
        if !pool.checked_in().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(transport.command_names(), vec!["find", "killCursors"]);
    pool.assert_balanced();
}

#[tokio::test]
async fn borrowed_connection_stays_with_the_caller() {
    let (coll, pool, transport) = setup(8);
    transport.push(MockReply::cursor(42, numbered(0..2)));
    transport.push(MockReply::cursor(0, numbered(0..1)));
    let mut conn = pool.connection();

    let mut cursor = coll.find(doc! {}).connection(&mut conn).await.unwrap();
    cursor.next().await.unwrap().unwrap();
    drop(cursor);

    let mut cursor = coll.find(doc! {}).connection(&mut conn).await.unwrap();
    assert_eq!(drain(&mut cursor).await, numbered(0..1));
    drop(cursor);

    assert_eq!(transport.command_names(), vec!["find", "find"]);
    assert!(pool.checked_out().is_empty());
    assert!(pool.checked_in().is_empty());
    assert!(conn.is_healthy());
}

#[tokio::test]
async fn get_more_failure_ends_the_cursor() {
    let (coll, pool, transport) = setup(8);
    transport.push(MockReply::cursor(42, numbered(0..1)));
    transport.push(MockReply::NetworkError);

    let mut cursor = coll.find(doc! {}).await.unwrap();
    assert!(cursor.next().await.unwrap().is_ok());
    assert!(cursor.next().await.unwrap().unwrap_err().is_network_error());
    assert!(cursor.next().await.is_none());
    assert!(cursor.is_exhausted());

    assert_eq!(transport.command_names(), vec!["find", "getMore"]);
    assert_eq!(pool.checked_in_with_health(), vec![(1, false)]);
}

#[tokio::test]
async fn legacy_query_enforces_the_limit_client_side() {
    let (coll, pool, transport) = setup(3);
    transport.push(MockReply::Legacy(Reply::new(7, numbered(0..5))));

    let mut cursor = coll
        .find(doc! { "a": 1 })
        .sort(doc! { "_id": 1 })
        .limit(2)
        .await
        .unwrap();
    assert_eq!(drain(&mut cursor).await, numbered(0..2));

    let messages = transport.legacy_messages();
    assert_eq!(messages.len(), 2);
    match &messages[0] {
        LegacyMessage::Query {
            number_to_return,
            query,
            ..
        } => {
            assert_eq!(*number_to_return, 2);
            assert_eq!(
                query,
                &doc! { "$query": { "a": 1 }, "$orderby": { "_id": 1 } }
            );
        }
        other => panic!("expected OP_QUERY, got {other:?}"),
    }
    assert_eq!(
        messages[1],
        LegacyMessage::KillCursors {
            cursor_ids: vec![7]
        }
    );
    assert!(transport.commands().is_empty());
    pool.assert_balanced();
}

#[tokio::test]
async fn legacy_cursor_fetches_with_op_get_more() {
    let (coll, pool, transport) = setup(3);
    transport.push(MockReply::Legacy(Reply::new(7, numbered(0..2))));
    transport.push(MockReply::Legacy(Reply::new(0, numbered(2..3))));

    let mut cursor = coll.find(doc! {}).batch_size(2u32).await.unwrap();
    assert_eq!(drain(&mut cursor).await, numbered(0..3));

    let messages = transport.legacy_messages();
    assert!(matches!(
        messages[1],
        LegacyMessage::GetMore {
            number_to_return: 2,
            cursor_id: 7,
            ..
        }
    ));
    pool.assert_balanced();
}

#[tokio::test]
async fn legacy_cursor_not_found_is_a_command_error() {
    let (coll, pool, transport) = setup(3);
    transport.push(MockReply::Legacy(Reply::new(7, numbered(0..1))));
    transport.push(MockReply::Legacy(
        Reply::new(7, Vec::new()).with_flags(ResponseFlags::CURSOR_NOT_FOUND),
    ));

    let mut cursor = coll.find(doc! {}).await.unwrap();
    cursor.next().await.unwrap().unwrap();
    let error = cursor.next().await.unwrap().unwrap_err();

    assert_eq!(error.code(), Some(43));
    assert!(matches!(*error.kind, ErrorKind::Command(_)));
    assert!(cursor.next().await.is_none());
    pool.assert_balanced();
}

#[tokio::test]
async fn aggregate_opens_a_cursor() {
    let (coll, pool, transport) = setup(8);
    transport.push(MockReply::cursor(0, numbered(0..2)));

    let mut cursor = coll
        .aggregate(vec![doc! { "$match": { "a": 1 } }])
        .allow_disk_use(true)
        .await
        .unwrap();
    assert_eq!(drain(&mut cursor).await, numbered(0..2));

    assert_eq!(
        transport.commands()[0].body(),
        &doc! {
            "aggregate": "coll",
            "pipeline": [{ "$match": { "a": 1 } }],
            "cursor": { "batchSize": 100 },
            "allowDiskUse": true,
        }
    );
    pool.assert_balanced();
}
