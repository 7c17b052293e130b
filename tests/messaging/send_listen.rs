use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bus_rpc::{
    BasicMessage, Endpoint, Envelope, MessageId, MessageProcessor, SimpleMessageProcessor,
};

use crate::support::{collecting, harness, released, SpecificMessage, WAIT};

#[test]
fn sequential_sends_arrive_in_order() {
    let h = harness();
    let processor = MessageProcessor::new();
    let producer = h.factory.create_producer_context(&Endpoint::queue("ordered")).unwrap();
    let consumer = h.factory.create_consumer_context(&Endpoint::queue("ordered")).unwrap();
    let (listener, rx) = collecting::<BasicMessage>();
    processor.listen(&consumer, listener).unwrap();

    for body in ["one", "two", "three"] {
        processor.send(&producer, &mut BasicMessage::new(body)).unwrap();
    }

    let received: Vec<_> = (0..3)
        .map(|_| rx.recv_timeout(WAIT).unwrap().body().to_string())
        .collect();
    assert_eq!(received, ["one", "two", "three"]);
}

#[test]
fn body_and_details_survive_but_ids_come_from_the_wire() {
    let h = harness();
    let processor = MessageProcessor::new();
    let producer = h.factory.create_producer_context(&Endpoint::queue("roundtrip")).unwrap();
    let consumer = h.factory.create_consumer_context(&Endpoint::queue("roundtrip")).unwrap();
    let (listener, rx) = collecting::<SpecificMessage>();
    processor.listen(&consumer, listener).unwrap();

    let details = HashMap::from([("key1".to_string(), "val1".to_string())]);
    let mut sent = SpecificMessage::new(BasicMessage::with_details("hello", &details), "extra");
    sent.set_message_id(Some(MessageId::new("caller-chosen")));
    let id = processor.send(&producer, &mut sent).unwrap();

    let received = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(received.body(), "hello");
    assert_eq!(received.details(), Some(&details));
    assert_eq!(received.specific, "extra");
    assert_eq!(received.message_id(), Some(&id));
    assert_ne!(received.message_id(), Some(&MessageId::new("caller-chosen")));
    assert_eq!(received.correlation_id(), None);
}

#[test]
fn correlation_id_is_delivered_exactly() {
    let h = harness();
    let processor = MessageProcessor::new();
    let producer = h.factory.create_producer_context(&Endpoint::queue("corr")).unwrap();
    let consumer = h.factory.create_consumer_context(&Endpoint::queue("corr")).unwrap();
    let (listener, rx) = collecting::<BasicMessage>();
    processor.listen(&consumer, listener).unwrap();

    let mut msg = BasicMessage::new("correlated");
    msg.set_correlation_id(Some(MessageId::new("order-42")));
    processor.send(&producer, &mut msg).unwrap();
    processor.send(&producer, &mut BasicMessage::new("plain")).unwrap();

    let first = rx.recv_timeout(WAIT).unwrap();
    let second = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(first.correlation_id(), Some(&MessageId::new("order-42")));
    assert_eq!(second.correlation_id(), None);
}

#[test]
fn headers_travel_out_of_band() {
    let h = harness();
    let processor = MessageProcessor::new();
    let producer = h.factory.create_producer_context(&Endpoint::queue("hdr")).unwrap();
    let consumer = h.factory.create_consumer_context(&Endpoint::queue("hdr")).unwrap();
    let (listener, rx) = collecting::<BasicMessage>();
    processor.listen(&consumer, listener).unwrap();

    let headers = HashMap::from([("tenant".to_string(), "acme".to_string())]);
    processor
        .send_with_headers(&producer, &mut BasicMessage::new("with"), Some(&headers))
        .unwrap();
    processor.send(&producer, &mut BasicMessage::new("without")).unwrap();

    let with = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(with.headers(), Some(&headers));
    assert!(!with.to_json().unwrap().contains("tenant"));
    assert_eq!(rx.recv_timeout(WAIT).unwrap().headers(), None);
}

#[test]
fn topic_reaches_every_listener() {
    let h = harness();
    let processor = MessageProcessor::new();
    let producer = h.factory.create_producer_context(&Endpoint::topic("news")).unwrap();
    let first = h.factory.create_consumer_context(&Endpoint::topic("news")).unwrap();
    let second = h.factory.create_consumer_context(&Endpoint::topic("news")).unwrap();
    let (l1, rx1) = collecting::<BasicMessage>();
    let (l2, rx2) = collecting::<BasicMessage>();
    processor.listen(&first, l1).unwrap();
    processor.listen(&second, l2).unwrap();

    processor.send(&producer, &mut BasicMessage::new("extra!")).unwrap();

    assert_eq!(rx1.recv_timeout(WAIT).unwrap().body(), "extra!");
    assert_eq!(rx2.recv_timeout(WAIT).unwrap().body(), "extra!");
}

#[test]
fn closing_the_listener_consumer_stops_delivery() {
    let h = harness();
    let processor = MessageProcessor::new();
    let producer = h.factory.create_producer_context(&Endpoint::topic("stop")).unwrap();
    let consumer = h.factory.create_consumer_context(&Endpoint::topic("stop")).unwrap();
    let (listener, rx) = collecting::<BasicMessage>();
    processor.listen(&consumer, listener.clone()).unwrap();

    processor.send(&producer, &mut BasicMessage::new("before")).unwrap();
    assert_eq!(rx.recv_timeout(WAIT).unwrap().body(), "before");

    listener.close_consumer();
    processor.send(&producer, &mut BasicMessage::new("after")).unwrap();
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());

    let weak = Arc::downgrade(&listener);
    drop(listener);
    assert!(released(&weak));
}

#[test]
fn undecodable_message_does_not_stop_the_listener() {
    let h = harness();
    let processor = MessageProcessor::new();
    let producer = h.factory.create_producer_context(&Endpoint::queue("mixed")).unwrap();
    let consumer = h.factory.create_consumer_context(&Endpoint::queue("mixed")).unwrap();
    let (listener, rx) = collecting::<SpecificMessage>();
    processor.listen(&consumer, listener).unwrap();

    // A plain message lacks the `specific` field.
    processor.send(&producer, &mut BasicMessage::new("wrong shape")).unwrap();
    let mut good = SpecificMessage::new(BasicMessage::new("right shape"), "s");
    processor.send(&producer, &mut good).unwrap();

    assert_eq!(rx.recv_timeout(WAIT).unwrap().body(), "right shape");
}

#[test]
fn simple_processor_listens_and_sends_on_bound_contexts() {
    let h = harness();
    let inbox = h.factory.create_consumer_context(&Endpoint::queue("inbox")).unwrap();
    let outbox = h.factory.create_producer_context(&Endpoint::queue("outbox")).unwrap();
    let service = SimpleMessageProcessor::new(inbox, outbox);

    let watcher = h.factory.create_consumer_context(&Endpoint::queue("outbox")).unwrap();
    let (watch, watched) = collecting::<BasicMessage>();
    MessageProcessor::new().listen(&watcher, watch).unwrap();

    let (listener, inbound) = collecting::<BasicMessage>();
    service.listen(listener).unwrap();
    let feeder = h.factory.create_producer_context(&Endpoint::queue("inbox")).unwrap();
    MessageProcessor::new()
        .send(&feeder, &mut BasicMessage::new("in"))
        .unwrap();
    assert_eq!(inbound.recv_timeout(WAIT).unwrap().body(), "in");

    service.send(&mut BasicMessage::new("out")).unwrap();
    assert_eq!(watched.recv_timeout(WAIT).unwrap().body(), "out");
}
