use bus_rpc::{BasicMessage, Endpoint, Envelope, MessageProcessor, ObjectMessage};
use serde::{Deserialize, Serialize};

use crate::support::{collecting, harness, SpecificMessage, WAIT};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Reading {
    sensor: String,
    values: Vec<u32>,
}

/// Envelope naming its basic message field explicitly.
#[derive(Debug, Clone, Serialize, Deserialize, Envelope)]
#[envelope(basic = "inner")]
struct Tagged {
    tag: String,
    #[serde(flatten)]
    inner: BasicMessage,
}

fn reading() -> Reading {
    Reading {
        sensor: "t-1".into(),
        values: vec![3, 1, 4],
    }
}

#[test]
fn object_messages_cross_the_bus() {
    let h = harness();
    let processor = MessageProcessor::new();
    let producer = h.factory.create_producer_context(&Endpoint::queue("objects")).unwrap();
    let consumer = h.factory.create_consumer_context(&Endpoint::queue("objects")).unwrap();
    let (listener, rx) = collecting::<ObjectMessage>();
    processor.listen(&consumer, listener).unwrap();

    processor
        .send(&producer, &mut ObjectMessage::new(&reading()).unwrap())
        .unwrap();
    processor
        .send(&producer, &mut ObjectMessage::compact(&reading()).unwrap())
        .unwrap();

    let json = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(json.object::<Reading>().unwrap(), reading());
    let compact = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(compact.compact_object::<Reading>().unwrap(), reading());
}

#[test]
fn derived_envelopes_expose_the_embedded_message() {
    let mut tagged = Tagged {
        tag: "a".into(),
        inner: BasicMessage::new("body"),
    };
    tagged.set_correlation_id(Some("c".into()));

    assert_eq!(tagged.body(), "body");
    assert_eq!(tagged.inner.correlation_id(), tagged.correlation_id());
    assert_eq!(tagged.to_json().unwrap(), r#"{"tag":"a","message":"body"}"#);
}

#[test]
fn envelope_display_shows_ids_and_payload() {
    let mut msg = SpecificMessage::new(BasicMessage::new("hi"), "s");
    msg.set_correlation_id(Some("c-1".into()));
    let shown = msg.basic.to_string();
    assert_eq!(
        shown,
        r#"BasicMessage: [message-id=null, correlation-id=c-1, json-body=[{"message":"hi"}]]"#
    );
}
