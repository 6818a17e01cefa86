//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract the hierarchy service depends on.
//! - Isolate SQLite query details from invariant enforcement.
//!
//! # Invariants
//! - Repositories never enforce hierarchy rules themselves; they only report
//!   the store's own constraint failures.

pub mod position_repo;
