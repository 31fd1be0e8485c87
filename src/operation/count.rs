use crate::{
    bson::{doc, Document},
    bson_util,
    cmap::Command,
    error::{Error, Result},
    operation::{append_options, is_success, Operation},
    options::CountOptions,
    Namespace,
};

/// The `count` command. Always sent as a command, whatever the server's wire version.
#[derive(Debug)]
pub(crate) struct Count {
    ns: Namespace,
    filter: Document,
    options: Option<CountOptions>,
}

impl Count {
    pub(crate) fn new(ns: Namespace, filter: Document, options: Option<CountOptions>) -> Self {
        Self {
            ns,
            filter,
            options,
        }
    }
}

impl Operation for Count {
    type O = u64;

    const NAME: &'static str = "count";

    fn build(&mut self) -> Result<Command> {
        let mut body = doc! {
            Self::NAME: self.ns.coll.clone(),
            "query": self.filter.clone(),
        };
        append_options(&mut body, self.options.as_ref())?;

        Ok(Command::new(Self::NAME, self.ns.db.clone(), body))
    }

    fn handle_response(&self, reply: Document) -> Result<Self::O> {
        if !is_success(&reply) {
            return Err(Error::malformed_reply(format!("count did not succeed: {reply}")));
        }
        match reply.get("n") {
            Some(n) => bson_util::get_u64(n).ok_or_else(|| {
                Error::malformed_reply(format!("expected count to be a number, got {n}"))
            }),
            None => Err(Error::malformed_reply("count reply is missing n")),
        }
    }

    fn handles_command_errors(&self) -> bool {
        true
    }
}
