//! Hash functions for placement.
//!
//! Placement needs two deterministic hashes:
//! - [`crush_hash`] drives straw selection. It must give the same value on
//!   every client for the same `(pg, item, attempt)`, and stays bit-compatible
//!   with deployed clusters by using SHA-1 over a canonical text key.
//! - [`object_pg`] maps an object name to a placement group.

use std::hash::{Hash, Hasher};

use sha1::{Digest, Sha1};
use siphasher::sip::SipHasher13;

use crate::bucket::PgId;

/// Fixed SipHash key so object-to-PG mapping agrees across nodes.
const OBJECT_HASH_KEY: (u64, u64) = (0x0706_0504_0302_0100, 0x0f0e_0d0c_0b0a_0908);

/// Compute the straw hash of an item for one selection attempt.
///
/// The key `"{pg}-{item}-{attempt}"` is digested with SHA-1 and the first
/// 8 hex digits of the digest are read as a base-16 integer, so the result
/// always fits in 32 bits.
#[inline]
#[must_use]
pub fn crush_hash(pg: PgId, item: i64, attempt: usize) -> u32 {
    let key = format!("{pg}-{item}-{attempt}");
    let digest = Sha1::digest(key.as_bytes());
    // The first four bytes, big-endian, are the first eight hex digits.
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

/// Map an object name within a pool to a placement group.
///
/// Returns a placement group ID in the range `[0, pg_count)`, or `0` when
/// `pg_count` is zero.
#[inline]
#[must_use]
pub fn object_pg(pool: &str, object: &str, pg_count: u32) -> PgId {
    if pg_count == 0 {
        return 0;
    }
    let mut hasher = SipHasher13::new_with_keys(OBJECT_HASH_KEY.0, OBJECT_HASH_KEY.1);
    format!("{pool}/{object}").hash(&mut hasher);
    (hasher.finish() % u64::from(pg_count)) as PgId
}
