//! Cross-thread behavior of the ring, singleflight, and pubsub under
//! realistic contention: lookups racing membership churn, a cache-fill
//! stampede, and concurrent publishers.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use shardring::{Counter, Group, Pubsub, Ring};

/// Surface `debug!`/`trace!` output when running with `--nocapture`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn lookups_race_membership_churn() {
    init_tracing();

    let ring = Arc::new(Ring::new());
    ring.add("stable-1");
    ring.add("stable-2");

    let stop = Arc::new(AtomicBool::new(false));

    // Readers hammer lookups while a writer adds and removes flapping
    // members. Every observed owner must be a member that was registered
    // at some point, and the two stable members must always be reachable.
    let readers: Vec<_> = (0..4)
        .map(|reader| {
            let ring = ring.clone();
            let stop = stop.clone();
            thread::spawn(move || {
                let mut observed = HashSet::new();
                let mut i = 0u64;
                while !stop.load(Ordering::SeqCst) {
                    let key = format!("reader-{}-key-{}", reader, i);
                    let owner = ring.get(&key).expect("ring is never empty during churn");
                    observed.insert(owner);

                    let nearest = ring.get_n(&key, 3).expect("ring is never empty");
                    assert!(!nearest.is_empty());
                    i += 1;
                }
                observed
            })
        })
        .collect();

    for round in 0..50 {
        let flapper = format!("flapper-{}", round % 5);
        ring.add(&flapper);
        thread::sleep(Duration::from_millis(1));
        ring.remove(&flapper);
    }
    stop.store(true, Ordering::SeqCst);

    let valid: HashSet<String> = (0..5)
        .map(|i| format!("flapper-{}", i))
        .chain(["stable-1".to_string(), "stable-2".to_string()])
        .collect();

    for reader in readers {
        let observed = reader.join().expect("reader panicked");
        assert!(
            observed.is_subset(&valid),
            "reader observed a member that was never registered: {:?}",
            observed
        );
    }

    let mut members = ring.members();
    members.sort();
    assert_eq!(members, vec!["stable-1".to_string(), "stable-2".to_string()]);
}

#[test]
fn stampede_collapses_to_one_backend_hit() {
    init_tracing();

    let ring = Arc::new(Ring::new());
    ring.set(&["shard-a", "shard-b", "shard-c"]);

    let group: Arc<Group<String>> = Arc::new(Group::new());
    let backend_hits = Arc::new(AtomicUsize::new(0));
    let in_flight = Arc::new(Counter::new());

    // Many threads resolve the same key at once; the ring lookup plus its
    // "expensive" follow-up should run once.
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let ring = ring.clone();
            let group = group.clone();
            let backend_hits = backend_hits.clone();
            let in_flight = in_flight.clone();
            thread::spawn(move || {
                group.run("user:42", move || {
                    in_flight.inc();
                    thread::sleep(Duration::from_millis(50));
                    backend_hits.fetch_add(1, Ordering::SeqCst);
                    let owner = ring.get("user:42").expect("ring has members");
                    in_flight.dec();
                    owner
                })
            })
        })
        .collect();

    let results: Vec<String> = handles
        .into_iter()
        .map(|h| h.join().expect("stampede thread panicked"))
        .collect();

    assert_eq!(backend_hits.load(Ordering::SeqCst), 1);
    assert_eq!(in_flight.max(), 1, "only one fill may be in flight");
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}

#[test]
fn concurrent_publishers_all_fan_out() {
    init_tracing();

    let pubsub: Arc<Pubsub<u64>> = Arc::new(Pubsub::new());
    let received = Arc::new(AtomicUsize::new(0));

    let sink = received.clone();
    pubsub.subscribe("events", "sink", move |_| {
        sink.fetch_add(1, Ordering::SeqCst);
    });

    let publishers: Vec<_> = (0..4)
        .map(|p| {
            let pubsub = pubsub.clone();
            thread::spawn(move || {
                for i in 0..100u64 {
                    assert!(pubsub.publish("events", p * 1000 + i));
                }
            })
        })
        .collect();

    for publisher in publishers {
        publisher.join().expect("publisher panicked");
    }
    pubsub.close();

    assert_eq!(received.load(Ordering::SeqCst), 400);
    assert_eq!(pubsub.published(), 400);
}
