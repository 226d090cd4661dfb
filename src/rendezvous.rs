//! Highest-random-weight (rendezvous) hashing.
//!
//! An alternative to the ring for picking servers: every node is scored
//! against the key and the highest scores win. No virtual nodes and no
//! membership state; callers pass the candidate set on every call.
//!
//! The ring's CRC32 is not usable as the score function here: CRC is
//! linear, so appending different node ids to the same key produces
//! correlated scores and a visibly skewed node distribution. Scoring uses
//! an FNV-style multiply/xor-shift mix over the key and node bytes instead.

/// Return `nodes` ordered by descending weight for `key`.
///
/// Deterministic: the same nodes and key always produce the same order,
/// regardless of the input order of `nodes`. Ties break on the lower node
/// id so the order is total.
pub fn sort_by_weight(nodes: &[u64], key: &[u8]) -> Vec<u64> {
    let mut scored: Vec<(u64, u64)> = nodes.iter().map(|&n| (weight(n, key), n)).collect();
    scored.sort_unstable_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    scored.into_iter().map(|(_, n)| n).collect()
}

/// Return the `n` highest-weighted nodes for `key`, capped at the node count.
pub fn top_n(nodes: &[u64], key: &[u8], n: usize) -> Vec<u64> {
    let mut sorted = sort_by_weight(nodes, key);
    sorted.truncate(n);
    sorted
}

/// Score one node for a key: FNV-1a over the key bytes followed by the node
/// id's little-endian bytes, with an extra xor-shift per byte to break the
/// linearity plain FNV keeps. Fixed scheme; changing it reassigns every key.
fn weight(node: u64, key: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in key.iter().chain(node.to_le_bytes().iter()) {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x100_0000_01b3);
        hash ^= hash >> 32;
    }
    hash
}
