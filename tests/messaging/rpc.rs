use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use bus_rpc::{
    BasicMessage, BasicMessageListener, Endpoint, Envelope, MessageId, MessageProcessor,
    MessagingError, SimpleMessageProcessor,
};

use crate::support::{harness, released, Harness, SpecificMessage, WAIT};

/// Serve `SpecificMessage` requests on `queue` with a "RESPONSE:" prefix.
fn serve(h: &Harness, queue: &str, delay: Duration) {
    let server = h.factory.create_consumer_context(&Endpoint::queue(queue)).unwrap();
    let responder = BasicMessageListener::rpc(move |req: SpecificMessage| {
        thread::sleep(delay);
        let details = req.details().cloned().unwrap_or_default();
        Ok::<_, String>(SpecificMessage::new(
            BasicMessage::with_details(format!("RESPONSE:{}", req.body()), &details),
            format!("RESPONSE:{}", req.specific),
        ))
    });
    MessageProcessor::new()
        .listen(&server, Arc::new(responder))
        .unwrap();
}

fn request() -> SpecificMessage {
    let details = HashMap::from([("key1".to_string(), "val1".to_string())]);
    SpecificMessage::new(BasicMessage::with_details("hello", &details), "specific text")
}

#[test]
fn rpc_round_trip() {
    let h = harness();
    serve(&h, "rpc.echo", Duration::ZERO);
    let client = h.factory.create_producer_context(&Endpoint::queue("rpc.echo")).unwrap();

    let mut req = request();
    req.set_correlation_id(Some(MessageId::new("call-1")));
    let future = MessageProcessor::new()
        .send_rpc::<_, SpecificMessage>(&client, &mut req)
        .unwrap();
    let response = future.get_timeout(WAIT).unwrap();

    assert_eq!(response.body(), "RESPONSE:hello");
    assert_eq!(response.details(), req.details());
    assert_eq!(response.specific, "RESPONSE:specific text");
    assert_eq!(response.correlation_id(), Some(&MessageId::new("call-1")));
    assert!(response.message_id().is_some());
    assert!(future.is_done());
    assert!(!future.is_cancelled());
}

#[test]
fn response_without_request_correlation_keeps_its_own() {
    let h = harness();
    let server = h.factory.create_consumer_context(&Endpoint::queue("rpc.own")).unwrap();
    let responder = BasicMessageListener::rpc(|req: BasicMessage| {
        let mut res = BasicMessage::new(req.body());
        res.set_correlation_id(Some(MessageId::new("from-server")));
        Ok::<_, String>(res)
    });
    MessageProcessor::new().listen(&server, Arc::new(responder)).unwrap();
    let client = h.factory.create_producer_context(&Endpoint::queue("rpc.own")).unwrap();

    let future = MessageProcessor::new()
        .send_rpc::<_, BasicMessage>(&client, &mut BasicMessage::new("x"))
        .unwrap();

    let response = future.get_timeout(WAIT).unwrap();
    assert_eq!(response.correlation_id(), Some(&MessageId::new("from-server")));
}

#[test]
fn get_returns_the_same_response_twice() {
    let h = harness();
    serve(&h, "rpc.twice", Duration::ZERO);
    let client = h.factory.create_producer_context(&Endpoint::queue("rpc.twice")).unwrap();

    let future = MessageProcessor::new()
        .send_rpc::<_, SpecificMessage>(&client, &mut request())
        .unwrap();

    let first = future.get().unwrap();
    let second = future.get().unwrap();
    assert_eq!(first, second);
}

#[test]
fn timeout_is_not_terminal() {
    let h = harness();
    serve(&h, "rpc.slow", Duration::from_millis(1500));
    let client = h.factory.create_producer_context(&Endpoint::queue("rpc.slow")).unwrap();

    let future = MessageProcessor::new()
        .send_rpc::<_, SpecificMessage>(&client, &mut request())
        .unwrap();

    let err = future.get_timeout(Duration::from_millis(200)).unwrap_err();
    assert_eq!(err, MessagingError::Timeout(Duration::from_millis(200)));
    assert!(!future.is_done());

    let response = future.get().unwrap();
    assert_eq!(response.body(), "RESPONSE:hello");
    assert!(future.is_done());
}

#[test]
fn cancelled_future_ignores_the_late_response() {
    let h = harness();
    serve(&h, "rpc.cancel", Duration::from_millis(300));
    let client = h.factory.create_producer_context(&Endpoint::queue("rpc.cancel")).unwrap();

    let future = MessageProcessor::new()
        .send_rpc::<_, SpecificMessage>(&client, &mut request())
        .unwrap();

    assert!(future.cancel(true));
    assert!(future.is_cancelled());
    assert!(future.is_done());
    assert_eq!(future.get().unwrap_err(), MessagingError::Cancelled);

    thread::sleep(Duration::from_millis(500));
    assert!(future.is_cancelled());
    assert_eq!(
        future.get_timeout(Duration::from_millis(10)).unwrap_err(),
        MessagingError::Cancelled
    );
}

#[test]
fn failing_handler_sends_no_response() {
    let h = harness();
    let server = h.factory.create_consumer_context(&Endpoint::queue("rpc.fail")).unwrap();
    let responder = BasicMessageListener::rpc(|req: BasicMessage| {
        if req.body() == "bad" {
            Err("rejected")
        } else {
            Ok(BasicMessage::new("fine"))
        }
    });
    MessageProcessor::new().listen(&server, Arc::new(responder)).unwrap();
    let client = h.factory.create_producer_context(&Endpoint::queue("rpc.fail")).unwrap();
    let processor = MessageProcessor::new();

    let bad = processor
        .send_rpc::<_, BasicMessage>(&client, &mut BasicMessage::new("bad"))
        .unwrap();
    let good = processor
        .send_rpc::<_, BasicMessage>(&client, &mut BasicMessage::new("good"))
        .unwrap();

    assert_eq!(good.get_timeout(WAIT).unwrap().body(), "fine");
    assert!(matches!(
        bad.get_timeout(Duration::from_millis(200)),
        Err(MessagingError::Timeout(_))
    ));
}

#[test]
fn wrong_response_type_surfaces_as_decode_error() {
    let h = harness();
    let server = h.factory.create_consumer_context(&Endpoint::queue("rpc.shape")).unwrap();
    let responder =
        BasicMessageListener::rpc(|req: BasicMessage| Ok::<_, String>(BasicMessage::new(req.body())));
    MessageProcessor::new().listen(&server, Arc::new(responder)).unwrap();
    let client = h.factory.create_producer_context(&Endpoint::queue("rpc.shape")).unwrap();

    let future = MessageProcessor::new()
        .send_rpc::<_, SpecificMessage>(&client, &mut BasicMessage::new("x"))
        .unwrap();

    assert!(matches!(future.get_timeout(WAIT), Err(MessagingError::Decode(_))));
    assert!(future.is_done());
}

#[test]
fn send_and_listen_routes_the_response_to_the_listener() {
    let h = harness();
    serve(&h, "rpc.listen", Duration::ZERO);
    let client = h.factory.create_producer_context(&Endpoint::queue("rpc.listen")).unwrap();

    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let listener = Arc::new(BasicMessageListener::new(move |res: SpecificMessage| {
        let _ = tx.lock().unwrap().send(res);
    }));

    let mut req = request();
    let rpc = MessageProcessor::new()
        .send_and_listen(&client, &mut req, Arc::clone(&listener))
        .unwrap();

    let response = rx.recv_timeout(WAIT).unwrap();
    assert_eq!(response.specific, "RESPONSE:specific text");
    assert_eq!(rpc.request_message().unwrap().message_id(), req.message_id());

    // The plain listener keeps its consumer until told otherwise.
    assert!(!rpc.consumer().unwrap().is_closed());
    listener.close_consumer();
    assert!(rpc.consumer().unwrap().is_closed());
}

#[test]
fn future_closes_its_reply_consumer() {
    let h = harness();
    serve(&h, "rpc.close", Duration::ZERO);
    let client = h.factory.create_producer_context(&Endpoint::queue("rpc.close")).unwrap();

    let future = MessageProcessor::new()
        .send_rpc::<_, SpecificMessage>(&client, &mut request())
        .unwrap();
    future.get_timeout(WAIT).unwrap();

    let context = future.listener().consumer_context().unwrap();
    assert!(context.consumer().unwrap().is_closed());
}

#[test]
fn simple_processor_rpc() {
    let h = harness();
    serve(&h, "rpc.simple", Duration::ZERO);
    let inbox = h.factory.create_consumer_context(&Endpoint::TEMPORARY_QUEUE).unwrap();
    let outbox = h.factory.create_producer_context(&Endpoint::queue("rpc.simple")).unwrap();
    let client = SimpleMessageProcessor::new(inbox, outbox);

    let future = client.send_rpc::<_, SpecificMessage>(&mut request()).unwrap();
    assert_eq!(future.get_timeout(WAIT).unwrap().body(), "RESPONSE:hello");
}

#[test]
fn resolved_future_releases_its_listener() {
    let h = harness();
    serve(&h, "rpc.release", Duration::ZERO);
    let client = h.factory.create_producer_context(&Endpoint::queue("rpc.release")).unwrap();

    let future = MessageProcessor::new()
        .send_rpc::<_, SpecificMessage>(&client, &mut request())
        .unwrap();
    future.get_timeout(WAIT).unwrap();
    let listener = Arc::downgrade(&future.listener());

    drop(future);
    assert!(released(&listener));
}

#[test]
fn closing_the_factory_releases_pending_listeners() {
    let h = harness();
    let client = h.factory.create_producer_context(&Endpoint::queue("rpc.nobody")).unwrap();

    let future = MessageProcessor::new()
        .send_rpc::<_, SpecificMessage>(&client, &mut request())
        .unwrap();
    let listener = Arc::downgrade(&future.listener());

    drop(future);
    h.factory.close();
    assert!(released(&listener));
}
