//! Maps the per-item errors in a write reply back onto the items that caused them.
//!
//! The server reports `writeErrors[].index` relative to the batch it received. Inserts are split
//! into chunks, so every chunk is correlated with the offset of its first item in the caller's
//! input, and the per-chunk results are merged into a single [`WriteErrorSet`] once every chunk
//! has completed.

#[cfg(test)]
mod test;

use std::ops::Range;

use crate::{
    bson::{Bson, Document},
    bson_util,
    error::{Error, IndexedWriteError, InsertManyError, Result, WriteConcernError, WriteFailure},
};

/// The errors found in one reply, with indexes already translated to global positions.
#[derive(Debug, Default)]
pub(crate) struct CorrelatedReply {
    pub(crate) write_errors: Vec<IndexedWriteError>,
    pub(crate) write_concern_error: Option<WriteConcernError>,
}

impl CorrelatedReply {
    #[cfg(test)]
    pub(crate) fn has_errors(&self) -> bool {
        !self.write_errors.is_empty() || self.write_concern_error.is_some()
    }
}

/// Whether `reply` reports at least one failed write. Used to stop dispatching an ordered insert
/// before its replies are correlated.
pub(crate) fn has_write_errors(reply: &Document) -> bool {
    reply
        .get_array("writeErrors")
        .is_ok_and(|errors| !errors.is_empty())
}

/// Extracts `writeErrors` and `writeConcernError` from `reply`, attributing each write error to
/// the entry of `submitted` it names. `offset` is the global position of `submitted[0]`.
pub(crate) fn correlate(
    reply: &Document,
    offset: usize,
    submitted: &[Document],
) -> Result<CorrelatedReply> {
    let mut correlated = CorrelatedReply::default();

    match reply.get("writeErrors") {
        None | Some(Bson::Null) => {}
        Some(Bson::Array(errors)) => {
            for error in errors {
                let error = match error {
                    Bson::Document(doc) => doc,
                    other => {
                        return Err(Error::invalid_reply(format!(
                            "expected write error to be a document, got {other}"
                        )))
                    }
                };
                correlated
                    .write_errors
                    .push(correlate_one(error, offset, submitted)?);
            }
        }
        Some(other) => {
            return Err(Error::invalid_reply(format!(
                "expected writeErrors to be an array, got {other}"
            )))
        }
    }

    if let Some(wc_error) = reply.get("writeConcernError") {
        let wc_error = match wc_error {
            Bson::Document(doc) => crate::bson::from_document(doc.clone())
                .map_err(|e| Error::invalid_reply(format!("invalid writeConcernError: {e}")))?,
            other => {
                return Err(Error::invalid_reply(format!(
                    "expected writeConcernError to be a document, got {other}"
                )))
            }
        };
        correlated.write_concern_error = Some(wc_error);
    }

    Ok(correlated)
}

fn correlate_one(
    error: &Document,
    offset: usize,
    submitted: &[Document],
) -> Result<IndexedWriteError> {
    let local_index = error
        .get("index")
        .and_then(bson_util::get_int)
        .ok_or_else(|| Error::invalid_reply(format!("write error missing index: {error}")))?;
    let local_index = usize::try_from(local_index)
        .ok()
        .filter(|i| *i < submitted.len())
        .ok_or_else(|| {
            Error::invalid_reply(format!(
                "write error index {local_index} is outside of a batch of {} items",
                submitted.len()
            ))
        })?;
    let code = error
        .get("code")
        .and_then(bson_util::get_int)
        .and_then(|c| i32::try_from(c).ok())
        .ok_or_else(|| Error::invalid_reply(format!("write error missing code: {error}")))?;
    let message = error
        .get_str("errmsg")
        .map_err(|_| Error::invalid_reply(format!("write error missing errmsg: {error}")))?;

    Ok(IndexedWriteError {
        index: offset + local_index,
        code,
        code_name: error.get_str("codeName").ok().map(String::from),
        message: message.to_string(),
        details: error.get_document("errInfo").ok().cloned(),
        item: submitted[local_index].clone(),
    })
}

/// Write errors accumulated over every request of one operation.
#[derive(Debug, Default)]
pub(crate) struct WriteErrorSet {
    write_errors: Vec<IndexedWriteError>,
    write_concern_error: Option<WriteConcernError>,
    not_attempted: Vec<Range<usize>>,
}

impl WriteErrorSet {
    pub(crate) fn absorb(&mut self, reply: CorrelatedReply) {
        self.write_errors.extend(reply.write_errors);
        if self.write_concern_error.is_none() {
            self.write_concern_error = reply.write_concern_error;
        }
    }

    /// Like [`absorb`](Self::absorb), for a reply to an ordered batch covering the global
    /// positions `batch`. The server stops at the first failing item, so every later item of the
    /// batch was never attempted.
    pub(crate) fn absorb_ordered(&mut self, reply: CorrelatedReply, batch: Range<usize>) {
        if let Some(first) = reply.write_errors.iter().map(|e| e.index).min() {
            self.not_attempted.push(first + 1..batch.end);
        }
        self.absorb(reply);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.write_errors.is_empty() && self.write_concern_error.is_none()
    }

    /// Chunk replies arrive in network order, so errors are put back in input order before they
    /// are reported or subtracted from anything.
    fn sorted(mut self) -> Self {
        self.write_errors.sort_by_key(|e| e.index);
        self
    }

    /// Splits `ids` (aligned with the caller's input) into the identities that were written and
    /// those that were never sent or never attempted. Only the first `sent` items were
    /// dispatched.
    pub(crate) fn into_insert_outcome(
        self,
        ids: &[Bson],
        sent: usize,
    ) -> std::result::Result<Vec<Bson>, InsertManyError> {
        let this = self.sorted();
        let sent = sent.min(ids.len());

        let mut failed = this.write_errors.iter().map(|e| e.index).peekable();
        let mut inserted_ids = Vec::with_capacity(sent);
        let mut unsent_ids = Vec::new();
        for (index, id) in ids[..sent].iter().enumerate() {
            while failed.next_if(|f| *f < index).is_some() {}
            if failed.next_if_eq(&index).is_some() {
                continue;
            }
            if this.not_attempted.iter().any(|skipped| skipped.contains(&index)) {
                unsent_ids.push(id.clone());
            } else {
                inserted_ids.push(id.clone());
            }
        }
        unsent_ids.extend_from_slice(&ids[sent..]);

        if this.is_empty() && sent == ids.len() {
            return Ok(inserted_ids);
        }

        Err(InsertManyError {
            write_errors: this.write_errors,
            write_concern_error: this.write_concern_error,
            inserted_ids,
            unsent_ids,
        })
    }

    /// Converts the accumulated errors into a failure, if there were any. Ordered writes stop at
    /// the first failing statement, so only that statement is reported.
    pub(crate) fn into_write_failure(self, ordered: bool) -> Option<WriteFailure> {
        if self.is_empty() {
            return None;
        }
        let mut this = self.sorted();
        if ordered {
            this.write_errors.truncate(1);
        }
        Some(WriteFailure {
            write_errors: this.write_errors,
            write_concern_error: this.write_concern_error,
        })
    }
}
