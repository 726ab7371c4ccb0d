//! ID prefix constants.
//!
//! Every entity ID is `{prefix}-{8 hex chars}`, e.g. `sty-a3f8b2c1`. The random
//! part is generated by the store (see `TempoDb::generate_id`).

pub const PREFIX_CONTRIBUTOR: &str = "ctb";
pub const PREFIX_EPIC: &str = "epc";
pub const PREFIX_STORY: &str = "sty";
pub const PREFIX_STATUS_CHANGE: &str = "chg";

/// Every prefix in use, for tests and validation.
pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_CONTRIBUTOR,
    PREFIX_EPIC,
    PREFIX_STORY,
    PREFIX_STATUS_CHANGE,
];

/// Check whether `id` has the shape `{prefix}-{8 lowercase hex}`.
#[must_use]
pub fn has_prefix(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|hex| {
            hex.len() == 8 && hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
        })
}
