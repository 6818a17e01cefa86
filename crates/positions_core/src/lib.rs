//! Core domain logic for the positions hierarchy.
//! This crate is the single source of truth for tree invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{AppConfig, ConfigError, DatabaseTarget};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::position::{Position, PositionDraft, PositionId, PositionTree};
pub use model::validation::{
    parse_position_body, parse_position_draft, parse_uuid_text, DraftValidationError, FieldError,
};
pub use repo::position_repo::{
    PositionRepoError, PositionRepoResult, PositionRepository, SqlitePositionRepository,
};
pub use service::hierarchy_service::{
    HierarchyResult, HierarchyService, HierarchyServiceError, InvariantViolation,
};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
