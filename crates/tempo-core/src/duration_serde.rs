//! Serde helpers for chrono durations.
//!
//! `TimeDelta` has no serde support of its own. These modules serialize it as
//! integer milliseconds, the same unit the ledger stores. Use with
//! `#[serde(with = "duration_serde::...")]` on struct fields.
//!
//! # Example
//! ```ignore
//! use chrono::TimeDelta;
//! use tempo_core::duration_serde;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Record {
//!     #[serde(with = "duration_serde::millis")]
//!     pub total: TimeDelta,
//!
//!     #[serde(with = "duration_serde::millis_option")]
//!     pub last: Option<TimeDelta>,
//! }
//! ```

use chrono::TimeDelta;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

fn from_millis<E: serde::de::Error>(ms: i64) -> Result<TimeDelta, E> {
    TimeDelta::try_milliseconds(ms).ok_or_else(|| E::custom("Duration out of range"))
}

/// Serialize `TimeDelta` as i64 milliseconds.
pub mod millis {
    #[allow(clippy::wildcard_imports)]
    use super::*;

    pub fn serialize<S: Serializer>(d: &TimeDelta, s: S) -> Result<S::Ok, S::Error> {
        d.num_milliseconds().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<TimeDelta, D::Error> {
        from_millis(i64::deserialize(d)?)
    }
}

/// Serialize `Option<TimeDelta>` as `Option<i64>` milliseconds.
pub mod millis_option {
    #[allow(clippy::wildcard_imports)]
    use super::*;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(d: &Option<TimeDelta>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.num_milliseconds()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<TimeDelta>, D::Error> {
        Option::<i64>::deserialize(d)?.map(from_millis).transpose()
    }
}
