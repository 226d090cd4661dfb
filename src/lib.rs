//! Consistent hashing ring and small concurrency utilities for sharded
//! services.
//!
//! The centerpiece is [Ring]: a CRC32-based consistent hashing ring with
//! virtual nodes, used to spread request keys across a changing set of
//! members while keeping remaps bounded. Around it sit independent
//! utilities that tend to travel with sharded services: rendezvous hashing,
//! an in-memory pubsub, duplicate-call suppression, a concurrent counter, a
//! wait group, password helpers, and a signal-driven service runner. None
//! of them call into each other's state.
//!
//! ```
//! use shardring::Ring;
//!
//! let ring = Ring::new();
//! ring.add("cache-a");
//! ring.add("cache-b");
//! ring.add("cache-c");
//!
//! let shard = ring.get("user:42")?;
//! let fallbacks = ring.get_n("user:42", 2)?;
//! # assert_eq!(fallbacks[0], shard);
//! # Ok::<(), shardring::EmptyRing>(())
//! ```

mod ring;

pub mod counter;
pub mod password;
pub mod pubsub;
pub mod rendezvous;
pub mod singleflight;
pub mod svc;
pub mod waitgroup;

pub use counter::Counter;
pub use pubsub::Pubsub;
pub use ring::{EmptyRing, Ring, DEFAULT_REPLICAS};
pub use singleflight::Group;
pub use waitgroup::WaitGroup;
