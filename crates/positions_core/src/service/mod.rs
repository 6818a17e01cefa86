//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into hierarchy-aware operations.
//! - Keep the API layer decoupled from storage details.

pub mod hierarchy_service;
