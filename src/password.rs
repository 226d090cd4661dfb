//! Salted password hashing helpers.
//!
//! Storage-side helpers for credential checks: a random printable salt, a
//! base64-encoded SHA-256 of salt + password, and verification against a
//! stored pair.

use rand::Rng;
use sha2::{Digest, Sha256};

/// Default salt length used by [new_password].
const DEFAULT_SALT_LENGTH: usize = 16;
/// Lowest byte value allowed in a salt; keeps salts printable.
const DEFAULT_ASCII_PAD: u8 = 31;

/// Generate a random salt of `length` bytes, each in `[ascii_pad, 127)`.
///
/// A pad of 127 or more falls back to [DEFAULT_ASCII_PAD]. Larger pads
/// shrink the per-byte range; values below 40 keep a reasonable alphabet.
pub fn generate_salt(length: usize, ascii_pad: u8) -> String {
    let pad = if ascii_pad >= 127 {
        DEFAULT_ASCII_PAD
    } else {
        ascii_pad
    };

    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..length).map(|_| rng.gen_range(pad..127)).collect();

    // Bytes are all below 127, hence valid single-byte UTF-8.
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Hash a password with a salt: base64(SHA-256(salt + password)).
///
/// The salt leads the concatenation; the order is part of the stored-hash
/// format and must not change.
pub fn generate_hash(salt: &str, password: &str) -> String {
    let mut sha = Sha256::new();
    sha.update(salt.as_bytes());
    sha.update(password.as_bytes());

    base64::encode(sha.finalize())
}

/// Turn a plaintext password into a fresh `(salt, hash)` pair for storage.
pub fn new_password(password: &str) -> (String, String) {
    let salt = generate_salt(8, 20);
    let hash = generate_hash(&salt, password);
    (salt, hash)
}

/// Check a plaintext password against a stored `(salt, hash)` pair.
pub fn verify(salt: &str, hash: &str, password: &str) -> bool {
    generate_hash(salt, password) == hash
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn salt_respects_length_and_range() {
        let salt = generate_salt(32, 40);

        assert_eq!(salt.len(), 32);
        assert!(salt.bytes().all(|b| (40..127).contains(&b)));
    }

    #[test]
    fn oversized_pad_falls_back_to_default() {
        let salt = generate_salt(DEFAULT_SALT_LENGTH, 200);

        assert_eq!(salt.len(), DEFAULT_SALT_LENGTH);
        assert!(salt.bytes().all(|b| (DEFAULT_ASCII_PAD..127).contains(&b)));
    }

    #[test]
    fn hash_is_deterministic_per_salt() {
        let a = generate_hash("salty", "hunter2");
        let b = generate_hash("salty", "hunter2");
        let c = generate_hash("other", "hunter2");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn known_hash_value() {
        // base64(sha256("saltpassword")), fixed by the storage format.
        assert_eq!(
            generate_hash("salt", "password"),
            "E2Ab2k6njlWge5iGbSvmvgdE44ZvE8AMgRyrYIoo8yI="
        );
    }

    #[test]
    fn new_password_round_trips() {
        let (salt, hash) = new_password("correct horse battery staple");

        assert_eq!(salt.len(), 8);
        assert!(verify(&salt, &hash, "correct horse battery staple"));
        assert!(!verify(&salt, &hash, "wrong password"));
    }

    #[test]
    fn fresh_salts_differ() {
        // 8 bytes over a ~100-symbol alphabet; a collision here means the
        // generator is broken, not unlucky.
        assert_ne!(generate_salt(8, 20), generate_salt(8, 20));
    }
}
