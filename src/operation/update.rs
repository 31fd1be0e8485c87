use serde::Deserialize;

use crate::{
    bson::{self, doc, Bson, Document},
    cmap::{Command, LegacyMessage, UpdateFlags},
    error::{Error, Result},
    operation::{append_options, get_count, remove_empty_write_concern, Operation},
    options::{UpdateModel, UpdateOptions},
    Namespace,
};

/// The `update` command carrying every statement of one call.
#[derive(Debug)]
pub(crate) struct Update {
    ns: Namespace,
    statements: Vec<Document>,
    options: Option<UpdateOptions>,
}

impl Update {
    pub(crate) fn new(
        ns: Namespace,
        models: &[UpdateModel],
        mut options: Option<UpdateOptions>,
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
                let mut statement = doc! {
                    "q": model.filter.clone(),
                    "u": model.update.document().clone(),
                };
                if model.upsert {
                    statement.insert("upsert", true);
                }
                if model.multi {
                    statement.insert("multi", true);
                }
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

    /// The legacy `OP_UPDATE` for a single statement. The server never answers it.
    pub(crate) fn legacy(ns: Namespace, model: &UpdateModel) -> LegacyMessage {
        let mut flags = UpdateFlags::empty();
        if model.upsert {
            flags |= UpdateFlags::UPSERT;
        }
        if model.multi {
            flags |= UpdateFlags::MULTI_UPDATE;
        }
        LegacyMessage::Update {
            namespace: ns,
            flags,
            selector: model.filter.clone(),
            update: model.update.document().clone(),
        }
    }
}

/// The counts reported by an acknowledged `update`, plus the reply for error attribution.
#[derive(Debug)]
pub(crate) struct UpdateReply {
    pub(crate) matched: u64,
    pub(crate) modified: u64,
    pub(crate) upserted: Vec<(usize, Bson)>,
    pub(crate) reply: Document,
}

#[derive(Debug, Deserialize)]
struct UpsertedEntry {
    index: i64,
    #[serde(rename = "_id")]
    id: Bson,
}

impl Operation for Update {
    type O = UpdateReply;

    const NAME: &'static str = "update";

    fn build(&mut self) -> Result<Command> {
        let mut body = doc! {
            Self::NAME: self.ns.coll.clone(),
            "updates": self.statements.iter().cloned().map(Bson::Document).collect::<Vec<_>>(),
        };
        append_options(&mut body, self.options.as_ref())?;

        Ok(Command::new(Self::NAME, self.ns.db.clone(), body))
    }

    fn handle_response(&self, reply: Document) -> Result<Self::O> {
        let n = get_count(&reply, "n")?;
        let modified = get_count(&reply, "nModified")?;

        let upserted = match reply.get_array("upserted") {
            Ok(entries) => entries
                .iter()
                .map(|entry| {
                    let entry: UpsertedEntry = bson::from_bson(entry.clone()).map_err(|e| {
                        Error::malformed_reply(format!("invalid upserted entry: {e}"))
                    })?;
                    let index = usize::try_from(entry.index)
                        .ok()
                        .filter(|i| *i < self.statements.len())
                        .ok_or_else(|| {
                            Error::malformed_reply(format!(
                                "upserted index {} is outside of {} statements",
                                entry.index,
                                self.statements.len()
                            ))
                        })?;
                    Ok((index, entry.id))
                })
                .collect::<Result<Vec<_>>>()?,
            Err(_) => Vec::new(),
        };

        // `n` counts upserted documents as matched.
        let matched = n.saturating_sub(upserted.len() as u64);
        Ok(UpdateReply {
            matched,
            modified,
            upserted,
            reply,
        })
    }
}
