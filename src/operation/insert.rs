use std::sync::Arc;

use crate::{
    batch::InsertPlan,
    bson::{doc, Document},
    bson_util,
    cmap::{Command, InsertFlags, LegacyMessage},
    error::Result,
    operation::{append_options, remove_empty_write_concern, Operation},
    options::InsertManyOptions,
    Namespace,
};

/// The `insert` command for one chunk of an [`InsertPlan`].
#[derive(Debug)]
pub(crate) struct Insert {
    ns: Namespace,
    plan: Arc<InsertPlan>,
    chunk: usize,
    options: Option<InsertManyOptions>,
}

impl Insert {
    pub(crate) fn new(
        ns: Namespace,
        plan: Arc<InsertPlan>,
        chunk: usize,
        mut options: Option<InsertManyOptions>,
    ) -> Self {
        remove_empty_write_concern!(options);
        Self {
            ns,
            plan,
            chunk,
            options,
        }
    }

    /// The legacy `OP_INSERT` for one chunk. The server never answers it.
    pub(crate) fn legacy(
        ns: Namespace,
        documents: &[Document],
        options: Option<&InsertManyOptions>,
    ) -> LegacyMessage {
        let mut flags = InsertFlags::empty();
        if options.and_then(|o| o.ordered) != Some(true) {
            flags |= InsertFlags::CONTINUE_ON_ERROR;
        }
        LegacyMessage::Insert {
            namespace: ns,
            flags,
            documents: documents.to_vec(),
        }
    }
}

impl Operation for Insert {
    /// The raw reply. Write errors are attributed by the caller once every chunk has answered.
    type O = Document;

    const NAME: &'static str = "insert";

    fn build(&mut self) -> Result<Command> {
        let (_, documents) = self.plan.chunk(self.chunk);
        let mut body = doc! {
            Self::NAME: self.ns.coll.clone(),
            "documents": bson_util::to_bson_array(documents),
        };
        append_options(&mut body, self.options.as_ref())?;

        Ok(Command::new(Self::NAME, self.ns.db.clone(), body))
    }

    fn handle_response(&self, reply: Document) -> Result<Self::O> {
        Ok(reply)
    }
}
