use crate::{
    bson::{Bson, Document},
    error::Error,
};

pub(crate) const COMMAND_TRACING_EVENT_TARGET: &str = "mongodb::command";
pub(crate) const CONNECTION_TRACING_EVENT_TARGET: &str = "mongodb::connection";
pub(crate) const CURSOR_TRACING_EVENT_TARGET: &str = "mongodb::cursor";

/// Documents longer than this are truncated in tracing events.
pub(crate) const DEFAULT_MAX_DOCUMENT_LENGTH_BYTES: usize = 1000;

pub(crate) trait TracingRepresentation {
    type Representation;

    fn tracing_representation(&self) -> Self::Representation;
}

impl TracingRepresentation for Document {
    type Representation = String;

    fn tracing_representation(&self) -> String {
        let mut ext_json = Bson::Document(self.clone())
            .into_relaxed_extjson()
            .to_string();
        truncate_on_char_boundary(&mut ext_json, DEFAULT_MAX_DOCUMENT_LENGTH_BYTES);
        ext_json
    }
}

impl TracingRepresentation for Error {
    type Representation = String;

    fn tracing_representation(&self) -> String {
        self.to_string()
    }
}

/// Truncates `s` to at most `new_len` bytes, backing up to the nearest char boundary, and marks
/// the cut with "...".
pub(crate) fn truncate_on_char_boundary(s: &mut String, new_len: usize) {
    if s.len() <= new_len {
        return;
    }
    let mut boundary = new_len;
    while !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    s.truncate(boundary);
    s.push_str("...");
}
