//! Ring identifiers and circular interval arithmetic.
//!
//! Identifiers live in `[0, 2^m)` for a configured ring width `m`. They order
//! circularly: "between" is always interval membership on the circle, never a
//! plain numeric comparison.

use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};

/// Position on the identifier ring.
///
/// Newtype over `u64` so comparisons and hashing are cheap. A `RingId` is
/// only meaningful relative to the [`RingSpace`] that reduced it.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct RingId(pub u64);

impl RingId {
    /// Absolute numeric difference between two identifiers.
    ///
    /// Used only to tie-break between two candidate closest-preceding nodes
    /// for the same target. Note this is the linear distance, not the ring
    /// distance, so it can disagree with the true arc length near the
    /// wraparound point; kept as-is for protocol compatibility.
    pub fn distance(self, other: RingId) -> u64 {
        self.0.abs_diff(other.0)
    }
}

impl fmt::Display for RingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The identifier space `[0, 2^bits)` plus its interval arithmetic.
///
/// Width is a runtime parameter; the reference deployment uses 8 bits (256
/// positions) so convergence is observable, but anything up to 63 works.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingSpace {
    bits: u32,
}

impl RingSpace {
    /// Create a space of width `bits`. Widths above 63 would overflow the
    /// `u64` modulus and are rejected.
    pub fn new(bits: u32) -> Result<Self> {
        if bits == 0 || bits > 63 {
            return Err(Error::InvalidRingWidth(bits));
        }
        Ok(Self { bits })
    }

    /// Ring width in bits.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Number of positions on the ring (`2^bits`).
    pub fn size(&self) -> u64 {
        1u64 << self.bits
    }

    /// Reduce an arbitrary value into the ring.
    pub fn reduce(&self, value: u64) -> RingId {
        RingId(value & (self.size() - 1))
    }

    /// Circular interval membership test.
    ///
    /// Exact-match rules come first: a key equal to the lower bound is inside
    /// iff `closed_left`, a key equal to the upper bound is inside iff
    /// `closed_right` (checked in that order). When `lower == upper` every
    /// other key is inside, since a single node's interval covers the whole
    /// ring.
    /// Otherwise the interval either lies flat on the number line or wraps
    /// through zero, in which case it is the complement of the short arc from
    /// `upper` to `lower`.
    pub fn between(
        &self,
        lower: RingId,
        upper: RingId,
        key: RingId,
        closed_left: bool,
        closed_right: bool,
    ) -> bool {
        if key == lower {
            return closed_left;
        }
        if key == upper {
            return closed_right;
        }
        if lower == upper {
            return true;
        }
        if lower < upper {
            lower < key && key < upper
        } else {
            !(upper < key && key < lower)
        }
    }

    /// Derive the ring key for a replica of a content chunk.
    ///
    /// Deterministic hash of `content_id` and `replica_index` together, so
    /// different replicas of the same chunk land on different ring positions.
    pub fn key_for(&self, content_id: &str, replica_index: u32) -> RingId {
        self.hash_reduced(format!("{}#{}", content_id, replica_index).as_bytes())
    }

    /// Hash an arbitrary byte string into the ring.
    pub fn hash_reduced(&self, data: &[u8]) -> RingId {
        let mut hasher = SipHasher13::new();
        data.hash(&mut hasher);
        self.reduce(hasher.finish())
    }

    /// The lookup target each finger slot tracks: `(id + 2^i) mod 2^bits`
    /// for `i in 0..bits`. Depends only on `id`, so it is computed once at
    /// node construction.
    pub fn step_targets(&self, id: RingId) -> Vec<RingId> {
        (0..self.bits)
            .map(|i| self.reduce(id.0.wrapping_add(1u64 << i)))
            .collect()
    }
}
