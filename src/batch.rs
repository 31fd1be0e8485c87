//! Splits write items into bounded chunks and fixes the identity of every inserted document.

#[cfg(test)]
mod test;

use std::ops::Range;

use crate::{
    bson::{Bson, Document},
    bson_util,
};

/// The largest number of items sent in a single write command or legacy insert message.
pub(crate) const DEFAULT_MAX_CHUNK_SIZE: usize = 1000;

/// Contiguous, in-order ranges of at most `chunk_size` items covering `0..len`.
pub(crate) fn chunk_ranges(len: usize, chunk_size: usize) -> Vec<Range<usize>> {
    let chunk_size = chunk_size.max(1);
    (0..len)
        .step_by(chunk_size)
        .map(|start| start..(start + chunk_size).min(len))
        .collect()
}

/// The plan for an insert: documents with their `_id`s assigned, the `_id`s in input order and the
/// chunks to send them in.
#[derive(Debug)]
pub(crate) struct InsertPlan {
    pub(crate) documents: Vec<Document>,
    pub(crate) ids: Vec<Bson>,
    pub(crate) chunks: Vec<Range<usize>>,
}

impl InsertPlan {
    pub(crate) fn new(mut documents: Vec<Document>, chunk_size: usize) -> Self {
        let ids = documents
            .iter_mut()
            .map(bson_util::get_or_prepend_id_field)
            .collect();
        let chunks = chunk_ranges(documents.len(), chunk_size);
        Self {
            documents,
            ids,
            chunks,
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub(crate) fn chunk(&self, index: usize) -> (usize, &[Document]) {
        let range = self.chunks[index].clone();
        (range.start, &self.documents[range])
    }
}
