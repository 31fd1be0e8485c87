use crate::{
    bson::{doc, Document},
    cmap::{Command, LegacyMessage},
    error::Result,
    operation::Operation,
    Namespace,
};

/// Closes a server cursor before it is exhausted.
#[derive(Debug)]
pub(crate) struct KillCursors {
    ns: Namespace,
    cursor_id: i64,
}

impl KillCursors {
    pub(crate) fn new(ns: Namespace, cursor_id: i64) -> Self {
        Self { ns, cursor_id }
    }

    /// The `OP_KILL_CURSORS` equivalent. The server never answers it.
    pub(crate) fn legacy(&self) -> LegacyMessage {
        LegacyMessage::KillCursors {
            cursor_ids: vec![self.cursor_id],
        }
    }
}

impl Operation for KillCursors {
    type O = ();

    const NAME: &'static str = "killCursors";

    fn build(&mut self) -> Result<Command> {
        let body = doc! {
            Self::NAME: self.ns.coll.clone(),
            "cursors": [self.cursor_id],
        };
        Ok(Command::new(Self::NAME, self.ns.db.clone(), body))
    }

    fn handle_response(&self, _reply: Document) -> Result<Self::O> {
        Ok(())
    }
}
