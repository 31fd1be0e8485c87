use pretty_assertions::assert_eq;
use tokio::io::{duplex, AsyncWriteExt, DuplexStream};

use super::{
    decode_op_msg,
    encode_op_msg,
    frame,
    read_message,
    BodyReader,
    Header,
    InsertFlags,
    LegacyMessage,
    OpCode,
    Reply,
    ResponseFlags,
    UpdateFlags,
};
use crate::{
    bson::{doc, Document},
    cmap::{Command, StreamTransport, Transport},
    error::ErrorKind,
    Namespace,
};

fn header_of(message: &[u8]) -> (i32, i32, i32, i32) {
    let mut reader = BodyReader::new(message);
    (
        reader.read_i32().unwrap(),
        reader.read_i32().unwrap(),
        reader.read_i32().unwrap(),
        reader.read_i32().unwrap(),
    )
}

fn doc_len(doc: &Document) -> usize {
    let mut bytes = Vec::new();
    doc.to_writer(&mut bytes).unwrap();
    bytes.len()
}

#[test]
fn insert_layout() {
    let documents = vec![doc! { "_id": 1 }, doc! { "_id": 2 }];
    let message = LegacyMessage::Insert {
        namespace: Namespace::new("db", "coll"),
        flags: InsertFlags::CONTINUE_ON_ERROR,
        documents: documents.clone(),
    }
    .encode(7)
    .unwrap();

    let (length, request_id, response_to, op_code) = header_of(&message);
    assert_eq!(length as usize, message.len());
    assert_eq!(request_id, 7);
    assert_eq!(response_to, 0);
    assert_eq!(op_code, OpCode::Insert as i32);

    let mut body = BodyReader::new(&message[Header::LENGTH..]);
    assert_eq!(body.read_u32().unwrap(), 1);
    assert_eq!(body.read_cstring().unwrap(), "db.coll");
    assert_eq!(body.read_document().unwrap(), documents[0]);
    assert_eq!(body.read_document().unwrap(), documents[1]);
    assert_eq!(body.remaining(), 0);
}

#[test]
fn update_layout() {
    let selector = doc! { "x": 1 };
    let update = doc! { "$set": { "y": 2 } };
    let message = LegacyMessage::Update {
        namespace: Namespace::new("db", "coll"),
        flags: UpdateFlags::UPSERT | UpdateFlags::MULTI_UPDATE,
        selector: selector.clone(),
        update: update.clone(),
    }
    .encode(1)
    .unwrap();

    assert_eq!(
        message.len(),
        Header::LENGTH + 4 + "db.coll".len() + 1 + 4 + doc_len(&selector) + doc_len(&update)
    );
    let mut body = BodyReader::new(&message[Header::LENGTH..]);
    assert_eq!(body.read_i32().unwrap(), 0);
    assert_eq!(body.read_cstring().unwrap(), "db.coll");
    assert_eq!(body.read_u32().unwrap(), 3);
    assert_eq!(body.read_document().unwrap(), selector);
    assert_eq!(body.read_document().unwrap(), update);
}

#[test]
fn kill_cursors_layout() {
    let message = LegacyMessage::KillCursors {
        cursor_ids: vec![42, 43],
    }
    .encode(3)
    .unwrap();

    let mut body = BodyReader::new(&message[Header::LENGTH..]);
    assert_eq!(body.read_i32().unwrap(), 0);
    assert_eq!(body.read_i32().unwrap(), 2);
    assert_eq!(body.read_i64().unwrap(), 42);
    assert_eq!(body.read_i64().unwrap(), 43);
    assert_eq!(body.remaining(), 0);
}

#[test]
fn op_msg_carries_target_db() {
    let command = Command::new("count", "library", doc! { "count": "books" });
    let message = encode_op_msg(&command, 9).unwrap();
    let (_, _, _, op_code) = header_of(&message);
    assert_eq!(op_code, OpCode::Message as i32);

    let body = decode_op_msg(&message[Header::LENGTH..]).unwrap();
    assert_eq!(body, doc! { "count": "books", "$db": "library" });
}

#[test]
fn op_msg_document_sequences_fold_into_body() {
    let mut body = Vec::new();
    body.extend_from_slice(&0u32.to_le_bytes());
    body.push(0);
    doc! { "insert": "coll" }.to_writer(&mut body).unwrap();

    let mut sequence = Vec::new();
    sequence.extend_from_slice(b"documents\0");
    doc! { "a": 1 }.to_writer(&mut sequence).unwrap();
    body.push(1);
    body.extend_from_slice(&(sequence.len() as i32 + 4).to_le_bytes());
    body.extend_from_slice(&sequence);

    assert_eq!(
        decode_op_msg(&body).unwrap(),
        doc! { "insert": "coll", "documents": [{ "a": 1 }] }
    );
}

#[test]
fn truncated_reply_is_a_protocol_error() {
    let reply = Reply::new(5, vec![doc! { "a": 1 }]).encode(1, 2).unwrap();
    let err = Reply::decode(&reply[Header::LENGTH..reply.len() - 1]).unwrap_err();
    assert!(err.is_network_error());
}

fn reply_body(number_returned: i32, documents: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0u32.to_le_bytes());
    body.extend_from_slice(&0i64.to_le_bytes());
    body.extend_from_slice(&0i32.to_le_bytes());
    body.extend_from_slice(&number_returned.to_le_bytes());
    body.extend_from_slice(documents);
    body
}

#[test]
fn oversized_document_count_is_a_malformed_reply() {
    for number_returned in [i32::MAX, -1, 2] {
        let mut documents = Vec::new();
        doc! { "a": 1 }.to_writer(&mut documents).unwrap();
        let err = Reply::decode(&reply_body(number_returned, &documents)).unwrap_err();
        assert!(
            matches!(*err.kind, ErrorKind::MalformedReply { .. }),
            "{number_returned} produced {err:?}"
        );
        assert!(!err.is_network_error());
    }
}

#[test]
fn unparseable_document_is_a_malformed_reply() {
    // Element type 0x20 does not exist.
    let err = Reply::decode(&reply_body(1, &[7, 0, 0, 0, 0x20, 0, 0])).unwrap_err();
    assert!(matches!(*err.kind, ErrorKind::MalformedReply { .. }));
    assert!(!err.is_network_error());
}

#[test]
fn failure_flags_become_command_errors() {
    let not_found = Reply::new(12, vec![])
        .with_flags(ResponseFlags::CURSOR_NOT_FOUND)
        .validate()
        .unwrap_err();
    assert_eq!(not_found.code(), Some(43));

    let failure = Reply::new(0, vec![doc! { "$err": "bad query", "code": 2 }])
        .with_flags(ResponseFlags::QUERY_FAILURE)
        .validate()
        .unwrap_err();
    match *failure.kind {
        ErrorKind::Command(ref e) => {
            assert_eq!(e.code, 2);
            assert_eq!(e.message, "bad query");
        }
        ref other => panic!("expected command error, got {other:?}"),
    }
}

async fn answer(server: &mut DuplexStream, op_code: OpCode, body: Vec<u8>) -> (Header, Vec<u8>) {
    let (header, request) = read_message(server).await.unwrap();
    let reply = frame(op_code, 100, header.request_id, &body).unwrap();
    server.write_all(&reply).await.unwrap();
    (header, request)
}

fn op_msg_body(doc: &Document) -> Vec<u8> {
    let mut body = 0u32.to_le_bytes().to_vec();
    body.push(0);
    doc.to_writer(&mut body).unwrap();
    body
}

#[tokio::test]
async fn stream_transport_uses_op_msg_on_modern_servers() {
    let (client, mut server) = duplex(4096);
    let mut transport = StreamTransport::new(client, 8);

    let server = tokio::spawn(async move {
        answer(&mut server, OpCode::Message, op_msg_body(&doc! { "ok": 1, "n": 4 })).await
    });

    let response = transport
        .send_command(Command::new("count", "db", doc! { "count": "coll" }))
        .await
        .unwrap();
    assert_eq!(response.body().unwrap(), doc! { "ok": 1, "n": 4 });

    let (header, request) = server.await.unwrap();
    assert_eq!(header.op_code, OpCode::Message);
    assert_eq!(
        decode_op_msg(&request).unwrap(),
        doc! { "count": "coll", "$db": "db" }
    );
}

#[tokio::test]
async fn stream_transport_uses_op_query_on_old_servers() {
    let (client, mut server) = duplex(4096);
    let mut transport = StreamTransport::new(client, 3);

    let server = tokio::spawn(async move {
        let reply = Reply::new(0, vec![doc! { "ok": 1 }]).encode(1, 0).unwrap();
        answer(&mut server, OpCode::Reply, reply[Header::LENGTH..].to_vec()).await
    });

    transport
        .send_command(Command::new("insert", "db", doc! { "insert": "coll" }))
        .await
        .unwrap();

    let (header, request) = server.await.unwrap();
    assert_eq!(header.op_code, OpCode::Query);
    let mut body = BodyReader::new(&request);
    body.read_u32().unwrap();
    assert_eq!(body.read_cstring().unwrap(), "db.$cmd");
    assert_eq!(body.read_i32().unwrap(), 0);
    assert_eq!(body.read_i32().unwrap(), -1);
    assert_eq!(body.read_document().unwrap(), doc! { "insert": "coll" });
}

#[tokio::test]
async fn unanswered_legacy_messages_do_not_wait() {
    let (client, mut server) = duplex(4096);
    let mut transport = StreamTransport::new(client, 0);

    let reply = transport
        .send_legacy(LegacyMessage::Insert {
            namespace: Namespace::new("db", "coll"),
            flags: InsertFlags::empty(),
            documents: vec![doc! { "_id": 1 }],
        })
        .await
        .unwrap();
    assert!(reply.is_none());

    let (header, _) = read_message(&mut server).await.unwrap();
    assert_eq!(header.op_code, OpCode::Insert);
}
