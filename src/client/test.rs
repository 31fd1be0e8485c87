use std::time::Duration;

use crate::{
    options::ClientOptions,
    sdam::TopologyDescription,
    test::util::{MockPool, MockTransport},
    Client,
};

fn client(rtt: Option<Duration>, options: Option<ClientOptions>) -> Client {
    let mut topology = TopologyDescription::with_wire_version(8);
    topology.round_trip_time = rtt;
    Client::with_components(MockPool::new(MockTransport::new()), topology, options)
}

#[test]
fn checkout_timeout_scales_with_latency_and_items() {
    assert_eq!(client(None, None).checkout_timeout(0), Duration::from_secs(1));
    assert_eq!(
        client(Some(Duration::from_millis(10)), None).checkout_timeout(250),
        Duration::from_millis(1250)
    );
    assert_eq!(
        client(Some(Duration::from_millis(500)), None).checkout_timeout(3),
        Duration::from_millis(2003)
    );
}

#[test]
fn configured_checkout_timeout_wins() {
    let options = ClientOptions::builder()
        .wait_queue_timeout(Duration::from_millis(50))
        .build();
    assert_eq!(
        client(Some(Duration::from_secs(3)), Some(options)).checkout_timeout(1000),
        Duration::from_millis(50)
    );
}
