use crate::{
    bson::Document,
    error::{Error, Result},
};

/// A single server command: a key-ordered document naming the command in its first field, sent
/// to a target database. Built fresh for each request and never modified after it is sent.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    pub(crate) name: String,
    pub(crate) target_db: String,
    pub(crate) body: Document,
}

impl Command {
    pub(crate) fn new(
        name: impl Into<String>,
        target_db: impl Into<String>,
        body: Document,
    ) -> Self {
        Self {
            name: name.into(),
            target_db: target_db.into(),
            body,
        }
    }

    /// The name of the command, e.g. `"insert"`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The database the command is run against.
    pub fn target_db(&self) -> &str {
        &self.target_db
    }

    /// The command document.
    pub fn body(&self) -> &Document {
        &self.body
    }
}

/// The reply to a [`Command`], as the BSON bytes the server sent.
#[derive(Clone, Debug)]
pub struct RawCommandResponse {
    raw: Vec<u8>,
}

impl RawCommandResponse {
    /// Wraps the bytes of a reply document.
    pub fn new(raw: Vec<u8>) -> Self {
        Self { raw }
    }

    /// Encodes `doc` as a reply.
    pub fn with_document(doc: &Document) -> Result<Self> {
        let mut raw = Vec::new();
        doc.to_writer(&mut raw)?;
        Ok(Self { raw })
    }

    /// The reply bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw
    }

    /// Decodes the reply document.
    pub(crate) fn body(&self) -> Result<Document> {
        Document::from_reader(&mut self.raw.as_slice())
            .map_err(|e| Error::malformed_reply(format!("could not decode reply: {e}")))
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{bson::doc, error::ErrorKind};

    #[test]
    fn garbage_reply_is_malformed() {
        let response = RawCommandResponse::new(vec![1, 2, 3]);
        let err = response.body().unwrap_err();
        assert!(matches!(*err.kind, ErrorKind::MalformedReply { .. }));
    }

    #[test]
    fn reply_bytes_round_trip() {
        let doc = doc! { "ok": 1, "n": 3 };
        let response = RawCommandResponse::with_document(&doc).unwrap();
        assert_eq!(response.body().unwrap(), doc);
    }
}
