//! Domain model for the organizational position tree.
//!
//! # Responsibility
//! - Define the persisted `Position` record and its assembled tree view.
//! - Turn untyped request payloads into fully validated drafts.
//!
//! # Invariants
//! - Every position is identified by a stable `PositionId`.
//! - Only a `PositionDraft` produced by `validation` reaches write paths.

pub mod position;
pub mod validation;
