use bitflags::bitflags;

use super::{frame, legacy::LegacyMessage, BodyReader, OpCode, QueryFlags};
use crate::{
    bson::{Bson, Document},
    cmap::Command,
    error::{Error, Result},
    Namespace,
};

bitflags! {
    /// Represents the bitwise flags for an OP_MSG.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub(crate) struct MessageFlags: u32 {
        const CHECKSUM_PRESENT = 0b_0000_0000_0000_0000_0000_0000_0000_0001;
        const MORE_TO_COME     = 0b_0000_0000_0000_0000_0000_0000_0000_0010;
        const EXHAUST_ALLOWED  = 0b_0000_0000_0000_0001_0000_0000_0000_0000;
    }
}

/// Frames `command` as an OP_MSG with a single body section. The target database travels in the
/// body as `$db`.
pub(crate) fn encode_op_msg(command: &Command, request_id: i32) -> Result<Vec<u8>> {
    let mut document = command.body.clone();
    document.insert("$db", command.target_db.clone());

    let mut body = Vec::new();
    body.extend_from_slice(&MessageFlags::empty().bits().to_le_bytes());
    body.push(0);
    document.to_writer(&mut body)?;
    frame(OpCode::Message, request_id, 0, &body)
}

/// Frames `command` as an OP_QUERY against `<db>.$cmd`, the way servers before OP_MSG accept
/// commands.
pub(crate) fn encode_op_query_command(command: &Command, request_id: i32) -> Result<Vec<u8>> {
    LegacyMessage::Query {
        namespace: Namespace::new(command.target_db.clone(), "$cmd"),
        flags: QueryFlags::empty(),
        number_to_skip: 0,
        number_to_return: -1,
        query: command.body.clone(),
        return_fields_selector: None,
    }
    .encode(request_id)
}

/// Reads the reply document out of the bytes following an OP_MSG header. Document sequences are
/// folded into the body as arrays.
pub(crate) fn decode_op_msg(body: &[u8]) -> Result<Document> {
    let mut reader = BodyReader::new(body);
    let flags = MessageFlags::from_bits_truncate(reader.read_u32()?);

    let sections_len = if flags.contains(MessageFlags::CHECKSUM_PRESENT) {
        reader
            .remaining()
            .checked_sub(4)
            .ok_or_else(|| Error::protocol("OP_MSG too short for its checksum"))?
    } else {
        reader.remaining()
    };
    let mut sections = reader.split_off(sections_len)?;

    let mut document: Option<Document> = None;
    let mut sequences = Vec::new();
    while sections.remaining() > 0 {
        match sections.read_u8()? {
            0 => {
                if document.replace(sections.read_document()?).is_some() {
                    return Err(Error::protocol("OP_MSG contained more than one body section"));
                }
            }
            1 => {
                let size = sections.read_i32()?;
                let size = usize::try_from(size)
                    .ok()
                    .and_then(|s| s.checked_sub(4))
                    .ok_or_else(|| Error::protocol(format!("invalid section size {size}")))?;
                let mut sequence = sections.split_off(size)?;
                let identifier = sequence.read_cstring()?;
                let mut documents = Vec::new();
                while sequence.remaining() > 0 {
                    documents.push(Bson::Document(sequence.read_document()?));
                }
                sequences.push((identifier, documents));
            }
            other => {
                return Err(Error::protocol(format!(
                    "invalid OP_MSG payload type {other}"
                )))
            }
        }
    }

    let mut document =
        document.ok_or_else(|| Error::protocol("OP_MSG did not contain a body section"))?;
    for (identifier, documents) in sequences {
        document.insert(identifier, documents);
    }
    Ok(document)
}
