use crate::{
    bson::{doc, Bson, Document},
    cmap::Command,
    error::Result,
    operation::{append_options, CursorSpecification, Operation},
    options::AggregateOptions,
    Namespace,
};

/// The batch size requested for the first and every later batch of an aggregation.
pub(crate) const AGGREGATE_BATCH_SIZE: u32 = 100;

/// The `aggregate` command, always run in cursor mode.
#[derive(Debug)]
pub(crate) struct Aggregate {
    ns: Namespace,
    pipeline: Vec<Document>,
    options: Option<AggregateOptions>,
}

impl Aggregate {
    pub(crate) fn new(
        ns: Namespace,
        pipeline: impl IntoIterator<Item = Document>,
        options: Option<AggregateOptions>,
    ) -> Self {
        Self {
            ns,
            pipeline: pipeline.into_iter().collect(),
            options,
        }
    }
}

impl Operation for Aggregate {
    type O = CursorSpecification;

    const NAME: &'static str = "aggregate";

    fn build(&mut self) -> Result<Command> {
        let mut body = doc! {
            Self::NAME: self.ns.coll.clone(),
            "pipeline": self.pipeline.iter().cloned().map(Bson::Document).collect::<Vec<_>>(),
            "cursor": { "batchSize": AGGREGATE_BATCH_SIZE as i32 },
        };
        append_options(&mut body, self.options.as_ref())?;

        Ok(Command::new(Self::NAME, self.ns.db.clone(), body))
    }

    fn handle_response(&self, reply: Document) -> Result<Self::O> {
        CursorSpecification::from_reply(reply, &self.ns, Some(AGGREGATE_BATCH_SIZE), None)
    }
}
