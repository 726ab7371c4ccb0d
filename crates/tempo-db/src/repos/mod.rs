//! Repository modules implementing Tempo operations.
//!
//! Each module adds methods to `TempoService` via `impl TempoService` blocks.
//! Row loaders that must run inside a unit of work take a `&libsql::Connection`
//! so they accept both the service connection and an open transaction.

pub mod contributor;
pub mod epic;
pub mod story;
pub mod tracking;
pub mod workflow;
