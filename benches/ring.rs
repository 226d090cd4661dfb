//! Micro-benchmarks for Ring operations: get, get_n, and the membership
//! rebuild triggered by add. Reports nanoseconds-per-operation.
//!
//! Run: `cargo bench --bench ring`

use std::time::Instant;

use shardring::Ring;

fn main() {
    println!("ring\n");

    bench_get();
    bench_get_n();
    bench_add();
}

fn build_ring(members: usize) -> Ring {
    let ring = Ring::new();
    for i in 0..members {
        ring.add(&format!("member-{}", i));
    }
    ring
}

fn bench_get() {
    println!("get");

    // Pre-generate keys outside the timed section.
    let keys: Vec<String> = (0..10_000).map(|i| format!("key-{}", i)).collect();

    for members in [3, 10, 100, 1000] {
        let ring = build_ring(members);

        let start = Instant::now();
        let mut hits = 0usize;
        for key in &keys {
            if ring.get(key).is_ok() {
                hits += 1;
            }
        }
        let elapsed = start.elapsed();

        println!(
            "  {:>5} members: {:>6} ns/op ({} lookups)",
            members,
            elapsed.as_nanos() / hits as u128,
            hits
        );
    }
    println!();
}

fn bench_get_n() {
    println!("get_n (n=3)");

    let keys: Vec<String> = (0..10_000).map(|i| format!("key-{}", i)).collect();

    for members in [3, 10, 100, 1000] {
        let ring = build_ring(members);

        let start = Instant::now();
        for key in &keys {
            let _ = ring.get_n(key, 3);
        }
        let elapsed = start.elapsed();

        println!(
            "  {:>5} members: {:>6} ns/op",
            members,
            elapsed.as_nanos() / keys.len() as u128
        );
    }
    println!();
}

fn bench_add() {
    println!("add (includes full position rebuild)");

    for members in [10, 100, 1000] {
        let names: Vec<String> = (0..members).map(|i| format!("member-{}", i)).collect();

        let ring = Ring::new();
        let start = Instant::now();
        for name in &names {
            ring.add(name);
        }
        let elapsed = start.elapsed();

        println!(
            "  {:>5} members: {:>6} ns/op",
            members,
            elapsed.as_nanos() / members as u128
        );
    }
    println!();
}
