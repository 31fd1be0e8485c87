use std::time::Duration;

use pretty_assertions::assert_eq;

use crate::{
    options::{CollectionOptions, DatabaseOptions, ReadConcern, WriteConcern},
    sdam::TopologyDescription,
    test::util::{MockPool, MockTransport},
    Client,
};

#[test]
fn collection_inherits_unset_database_options() {
    let client = Client::with_components(
        MockPool::new(MockTransport::new()),
        TopologyDescription::with_wire_version(8),
        None,
    );
    let db = client.database_with_options(
        "db",
        DatabaseOptions::builder()
            .write_concern(WriteConcern::majority())
            .read_concern(ReadConcern::local())
            .timeout(Duration::from_secs(5))
            .build(),
    );

    let coll = db.collection_with_options(
        "coll",
        CollectionOptions::builder()
            .read_concern(ReadConcern::majority())
            .build(),
    );
    assert_eq!(coll.options().read_concern, Some(ReadConcern::majority()));
    assert_eq!(coll.options().write_concern, Some(WriteConcern::majority()));
    assert_eq!(coll.options().timeout, Some(Duration::from_secs(5)));
    assert_eq!(coll.namespace().to_string(), "db.coll");
}
