//! End-to-end producer/consumer runs over a RocksDB store with a virtual clock.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use delayq_core::{
    CancellationToken, Clock, ConsumerConfig, DequeueError, EnqueueError, Message, OrderedStore,
    Queue, RocksDbStore, VirtualClock,
};

const KEY: &str = "delayq";

#[derive(Debug, thiserror::Error)]
#[error("end of stream")]
struct Eof;

fn t0() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}

fn make_msg(i: u64) -> Message {
    Message::new(
        i.to_string(),
        i.to_string().into_bytes(),
        t0() + Duration::from_millis(200 * i),
    )
}

fn setup() -> (Queue, Arc<RocksDbStore>, Arc<VirtualClock>, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(RocksDbStore::open(dir.path()).unwrap());
    let clock = Arc::new(VirtualClock::new(t0()));
    let queue = Queue::new(store.clone(), KEY).with_clock(clock.clone());
    (queue, store, clock, dir)
}

#[test]
fn ten_messages_delivered_in_id_order_then_store_is_empty() {
    let (queue, store, clock, _dir) = setup();
    let total = 10;

    for i in (0..total).rev() {
        queue.add_msg(&make_msg(i)).unwrap();
    }

    let cancel = CancellationToken::new();
    let mut next = 0;
    let err = queue.dequeue(&cancel, &ConsumerConfig::default(), |msg: &Message| {
        assert_eq!(*msg, make_msg(next));
        assert!(clock.now() >= msg.deadline, "delivered before its deadline");
        next += 1;
        if next >= total {
            cancel.cancel();
        }
        Ok::<(), Eof>(())
    });

    assert!(matches!(err, DequeueError::Cancelled), "got {err:?}");
    assert_eq!(next, total);

    let left = store.range_by_score(KEY, f64::MIN, f64::MAX).unwrap();
    assert!(left.is_empty(), "expected empty store, found {} entries", left.len());
    assert_eq!(clock.total_slept(), Duration::from_secs(2));
}

#[test]
fn handler_error_is_surfaced_and_entry_kept() {
    let (queue, _store, _clock, _dir) = setup();
    for i in 0..4 {
        queue.add_msg(&make_msg(i)).unwrap();
    }

    let mut handled = 0;
    let err = queue.dequeue(
        &CancellationToken::new(),
        &ConsumerConfig::default(),
        |_msg: &Message| {
            handled += 1;
            if handled == 2 {
                return Err(Eof);
            }
            Ok(())
        },
    );

    assert!(err.handler_error::<Eof>().is_some(), "got {err:?}");
    let ids: Vec<String> = queue.pending().unwrap().into_iter().map(|m| m.id).collect();
    assert_eq!(ids, vec!["1", "2", "3"]);
}

#[test]
fn duplicate_admission_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let msg = Message::new("order-1", b"ship".to_vec(), t0() + Duration::from_secs(30));

    {
        let store = Arc::new(RocksDbStore::open(dir.path()).unwrap());
        Queue::new(store, KEY).add_msg(&msg).unwrap();
    }

    let store = Arc::new(RocksDbStore::open(dir.path()).unwrap());
    let queue = Queue::new(store, KEY);
    let mut moved = msg.clone();
    moved.deadline = t0();

    let err = queue.add_msg(&moved).unwrap_err();
    assert!(matches!(err, EnqueueError::DuplicateEntry { .. }), "got {err:?}");

    let pending = queue.pending().unwrap();
    assert_eq!(pending, vec![msg]);
}

#[test]
fn producer_and_consumer_on_separate_threads() {
    let (queue, store, _clock, _dir) = setup();
    let queue = Arc::new(queue);
    let total = 20u64;

    let producer = {
        let queue = Arc::clone(&queue);
        std::thread::spawn(move || {
            for i in 0..total {
                queue
                    .add_msg(&Message::new(i.to_string(), vec![], t0()))
                    .unwrap();
            }
        })
    };
    producer.join().unwrap();

    let cancel = CancellationToken::new();
    let mut delivered = 0;
    let err = queue.dequeue(&cancel, &ConsumerConfig::default(), |_msg: &Message| {
        delivered += 1;
        if delivered == total {
            cancel.cancel();
        }
        Ok::<(), Eof>(())
    });

    assert!(matches!(err, DequeueError::Cancelled));
    assert_eq!(delivered, total);
    assert!(store.range_by_score(KEY, 0.0, f64::INFINITY).unwrap().is_empty());
}
