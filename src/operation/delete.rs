use crate::{
    bson::{self, doc, Bson, Document},
    cmap::{Command, DeleteFlags, LegacyMessage},
    error::Result,
    operation::{append_options, get_count, remove_empty_write_concern, Operation},
    options::{DeleteLimit, DeleteModel, DeleteOptions},
    Namespace,
};

/// The `delete` command carrying every statement of one call.
#[derive(Debug)]
pub(crate) struct Delete {
    ns: Namespace,
    statements: Vec<Document>,
    options: Option<DeleteOptions>,
}

impl Delete {
    pub(crate) fn new(
        ns: Namespace,
        models: &[DeleteModel],
        mut options: Option<DeleteOptions>,
    ) -> Result<Self> {
        remove_empty_write_concern!(options);
        let collation = options
            .as_ref()
            .and_then(|o| o.collation.as_ref())
            .map(bson::to_document)
            .transpose()?;
        let statements = models
            .iter()
            .map(|model| {
                let limit = match model.limit {
                    DeleteLimit::One => 1,
                    DeleteLimit::All => 0,
                };
                let mut statement = doc! {
                    "q": model.filter.clone(),
                    "limit": limit,
                };
                if let Some(ref collation) = collation {
                    statement.insert("collation", collation.clone());
                }
                statement
            })
            .collect();
        Ok(Self {
            ns,
            statements,
            options,
        })
    }

    /// The statements as sent, aligned with the caller's models.
    pub(crate) fn statements(&self) -> &[Document] {
        &self.statements
    }

    /// The legacy `OP_DELETE` for a single statement. The server never answers it.
    pub(crate) fn legacy(ns: Namespace, model: &DeleteModel) -> LegacyMessage {
        let flags = match model.limit {
            DeleteLimit::One => DeleteFlags::SINGLE_REMOVE,
            DeleteLimit::All => DeleteFlags::empty(),
        };
        LegacyMessage::Delete {
            namespace: ns,
            flags,
            selector: model.filter.clone(),
        }
    }
}

/// The count reported by an acknowledged `delete`, plus the reply for error attribution.
#[derive(Debug)]
pub(crate) struct DeleteReply {
    pub(crate) deleted: u64,
    pub(crate) reply: Document,
}

impl Operation for Delete {
    type O = DeleteReply;

    const NAME: &'static str = "delete";

    fn build(&mut self) -> Result<Command> {
        let mut body = doc! {
            Self::NAME: self.ns.coll.clone(),
            "deletes": self.statements.iter().cloned().map(Bson::Document).collect::<Vec<_>>(),
        };
        append_options(&mut body, self.options.as_ref())?;

        Ok(Command::new(Self::NAME, self.ns.db.clone(), body))
    }

    fn handle_response(&self, reply: Document) -> Result<Self::O> {
        Ok(DeleteReply {
            deleted: get_count(&reply, "n")?,
            reply,
        })
    }
}
