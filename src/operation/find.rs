use crate::{
    bson::{doc, Document},
    cmap::{Command, LegacyMessage, QueryFlags, Reply},
    error::{Error, Result},
    operation::{append_options, CursorSpecification, Operation},
    options::FindOptions,
    sdam::Protocol,
    Namespace,
};

/// The `find` command, or on older servers the equivalent `OP_QUERY`.
#[derive(Debug)]
pub(crate) struct Find {
    ns: Namespace,
    filter: Document,
    options: Option<Box<FindOptions>>,
}

impl Find {
    pub(crate) fn new(ns: Namespace, filter: Document, options: Option<FindOptions>) -> Self {
        Self {
            ns,
            filter,
            options: options.map(Box::new),
        }
    }

    fn batch_size(&self) -> Option<u32> {
        self.options.as_ref().and_then(|o| o.batch_size)
    }

    /// The most documents the cursor may yield, and whether the server was asked for a single
    /// batch. A limit of zero means no limit.
    fn limit(&self) -> (Option<u64>, bool) {
        match self.options.as_ref().and_then(|o| o.limit) {
            None | Some(0) => (None, false),
            Some(limit) => (Some(limit.unsigned_abs()), limit < 0),
        }
    }

    /// The `OP_QUERY` equivalent of this find.
    pub(crate) fn legacy(&self) -> Result<LegacyMessage> {
        let options = self.options.as_deref();
        let (limit, single_batch) = self.limit();
        let to_i32 = |n: u64, what: &str| {
            i32::try_from(n).map_err(|_| {
                Error::invalid_argument(format!("{what} of {n} is too large for this server"))
            })
        };

        let batch_size = self.batch_size().map(u64::from);
        let number_to_return = match (limit, batch_size) {
            (Some(limit), _) if single_batch => -to_i32(limit, "limit")?,
            (Some(limit), Some(batch_size)) => to_i32(limit.min(batch_size), "batch size")?,
            (Some(n), None) | (None, Some(n)) => to_i32(n, "batch size")?,
            (None, None) => 0,
        };
        let number_to_skip = match options.and_then(|o| o.skip) {
            Some(skip) => to_i32(skip, "skip")?,
            None => 0,
        };

        let query = match options.and_then(|o| o.sort.as_ref()) {
            Some(sort) => doc! { "$query": self.filter.clone(), "$orderby": sort.clone() },
            None => self.filter.clone(),
        };

        Ok(LegacyMessage::Query {
            namespace: self.ns.clone(),
            flags: QueryFlags::empty(),
            number_to_skip,
            number_to_return,
            query,
            return_fields_selector: options.and_then(|o| o.projection.clone()),
        })
    }

    /// Builds the cursor for the `OP_REPLY` to [`Find::legacy`].
    pub(crate) fn handle_legacy_reply(&self, reply: Reply) -> CursorSpecification {
        CursorSpecification {
            ns: self.ns.clone(),
            id: reply.cursor_id,
            first_batch: reply.documents.into(),
            batch_size: self.batch_size(),
            limit: self.limit().0,
            protocol: Protocol::Legacy,
        }
    }
}

impl Operation for Find {
    type O = CursorSpecification;

    const NAME: &'static str = "find";

    fn build(&mut self) -> Result<Command> {
        let mut body = doc! {
            Self::NAME: self.ns.coll.clone(),
            "filter": self.filter.clone(),
        };
        append_options(&mut body, self.options.as_deref())?;

        let (limit, single_batch) = self.limit();
        if let Some(limit) = limit {
            body.insert("limit", i64::try_from(limit).unwrap_or(i64::MAX));
        }
        if single_batch {
            body.insert("singleBatch", true);
        }
        if let Some(batch_size) = self.batch_size() {
            let batch_size = i32::try_from(batch_size).map_err(|_| {
                Error::invalid_argument(format!(
                    "the batch size must fit into an i32, got {batch_size}"
                ))
            })?;
            body.insert("batchSize", batch_size);
        }

        Ok(Command::new(Self::NAME, self.ns.db.clone(), body))
    }

    fn handle_response(&self, reply: Document) -> Result<Self::O> {
        CursorSpecification::from_reply(reply, &self.ns, self.batch_size(), self.limit().0)
    }
}
