//! # tempo-core
//!
//! Core types, workflow rules, and error types for Tempo.
//!
//! This crate provides the foundational types shared across all Tempo crates:
//! - Entity structs for contributors, epics, user stories and ledger entries
//! - The story status enum and the pure workflow transition function
//! - Duration math over status-change timelines
//! - ID prefix constants
//! - Cross-cutting error types
//! - Response types for callers rendering epics and stories

pub mod duration_serde;
pub mod durations;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod responses;
pub mod validation;
pub mod workflow;
