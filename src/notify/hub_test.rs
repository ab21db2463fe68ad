use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::timeout;

use super::*;
use crate::engine::EndFile;
use crate::engine::EndFileReason;
use crate::engine::EventKind;
use crate::engine::StartFile;

fn start(id: i64) -> EngineEvent {
    EngineEvent::StartFile(StartFile { playlist_entry_id: id })
}

fn end_of_file() -> EngineEvent {
    EngineEvent::EndFile(EndFile {
        reason: EndFileReason::Eof,
        error: 0,
        playlist_entry_id: 1,
    })
}

fn recording_subscriber(
    hub: &NotificationHub,
    filter: EventKindSet,
) -> (Subscription, Arc<Mutex<Vec<EngineEvent>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let subscription = hub.subscribe(filter, move |event| sink.lock().push(event.clone()));
    (subscription, seen)
}

#[test]
fn inline_subscribers_observe_publish_order() {
    let hub = NotificationHub::new(8);
    let (_s1, first) = recording_subscriber(&hub, EventKindSet::all());
    let (_s2, second) = recording_subscriber(&hub, EventKindSet::all());

    hub.publish(&start(1));
    hub.publish(&EngineEvent::FileLoaded);
    hub.publish(&end_of_file());

    let expected = vec![start(1), EngineEvent::FileLoaded, end_of_file()];
    assert_eq!(*first.lock(), expected);
    assert_eq!(*second.lock(), expected);
}

#[test]
fn filter_limits_delivery() {
    let hub = NotificationHub::new(8);
    let (_s, seen) = recording_subscriber(&hub, EventKind::EndFile.into());

    hub.publish(&start(1));
    hub.publish(&end_of_file());

    assert_eq!(*seen.lock(), vec![end_of_file()]);
}

#[test]
fn dropping_subscription_unsubscribes() {
    let hub = NotificationHub::new(8);
    let (subscription, seen) = recording_subscriber(&hub, EventKindSet::all());
    assert_eq!(hub.subscriber_count(), 1);

    hub.unsubscribe(subscription);
    hub.publish(&EngineEvent::PlaybackRestart);

    assert_eq!(hub.subscriber_count(), 0);
    assert!(seen.lock().is_empty());
}

#[test]
fn panicking_subscriber_does_not_stop_delivery() {
    let hub = NotificationHub::new(8);
    let _bad = hub.subscribe(EventKindSet::all(), |_| panic!("subscriber bug"));
    let (_good, seen) = recording_subscriber(&hub, EventKindSet::all());

    hub.publish(&EngineEvent::FileLoaded);
    hub.publish(&EngineEvent::PlaybackRestart);

    assert_eq!(seen.lock().len(), 2);
}

#[test]
fn subscriber_may_unsubscribe_others_during_publish() {
    let hub = NotificationHub::new(8);
    let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
    let slot = victim.clone();
    let _killer = hub.subscribe(EventKindSet::all(), move |_| {
        slot.lock().take();
    });
    let (victim_sub, _seen) = recording_subscriber(&hub, EventKindSet::all());
    *victim.lock() = Some(victim_sub);

    // Publish works on a snapshot, so removal mid-delivery cannot deadlock.
    hub.publish(&EngineEvent::FileLoaded);

    assert_eq!(hub.subscriber_count(), 1);
}

#[tokio::test]
async fn queued_subscription_receives_in_order() {
    let hub = NotificationHub::new(8);
    let sub = hub.subscribe_queued(EventKindSet::all(), None);

    hub.publish(&start(1));
    hub.publish(&start(2));

    assert_eq!(sub.recv().await, Some(start(1)));
    assert_eq!(sub.recv().await, Some(start(2)));
    assert_eq!(sub.try_recv(), None);
}

#[tokio::test]
async fn full_queue_drops_oldest_and_counts() {
    let hub = NotificationHub::new(8);
    let sub = hub.subscribe_queued(EventKindSet::all(), Some(2));

    hub.publish(&start(1));
    hub.publish(&start(2));
    hub.publish(&start(3));

    assert_eq!(sub.dropped_count(), 1);
    assert_eq!(sub.pending(), 2);
    assert_eq!(sub.recv().await, Some(start(2)));
    assert_eq!(sub.recv().await, Some(start(3)));
}

#[tokio::test]
async fn recv_wakes_on_later_publish() {
    let hub = NotificationHub::new(8);
    let sub = hub.subscribe_queued(EventKindSet::all(), None);

    let publisher = hub.clone();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(20));
        publisher.publish(&EngineEvent::FileLoaded);
    });

    let event = timeout(Duration::from_secs(2), sub.recv()).await.unwrap();
    assert_eq!(event, Some(EngineEvent::FileLoaded));
}

#[tokio::test]
async fn close_drains_then_ends_queued_subscriptions() {
    let hub = NotificationHub::new(8);
    let sub = hub.subscribe_queued(EventKindSet::all(), None);

    hub.publish(&EngineEvent::Shutdown);
    hub.close();

    assert_eq!(sub.recv().await, Some(EngineEvent::Shutdown));
    assert_eq!(timeout(Duration::from_secs(1), sub.recv()).await.unwrap(), None);

    let late = hub.subscribe_queued(EventKindSet::all(), None);
    assert_eq!(timeout(Duration::from_secs(1), late.recv()).await.unwrap(), None);
}
