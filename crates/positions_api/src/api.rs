//! Request handling for the positions HTTP surface.
//!
//! # Responsibility
//! - Dispatch `(method, path, body)` triples onto the hierarchy service.
//! - Map domain outcomes onto status codes and JSON bodies.
//!
//! # Invariants
//! - Handlers never panic; every outcome becomes an `ApiResponse`.
//! - Every failure body carries a human-readable `message`.
//! - Store failures surface as `500` without leaking error details.

use crate::route::{parse_route, Method, Route};
use log::{error, info, warn};
use positions_core::{
    parse_position_body, parse_uuid_text, DraftValidationError, HierarchyService,
    HierarchyServiceError, PositionDraft, PositionRepoError, PositionRepository,
    SqlitePositionRepository,
};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::time::Instant;

const NOT_FOUND_MESSAGE: &str = "Position not found";

/// Status code plus JSON body returned for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }

    fn message(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "message": message.into() }),
        }
    }

    fn not_found() -> Self {
        Self::message(404, NOT_FOUND_MESSAGE)
    }

    fn invalid(err: DraftValidationError) -> Self {
        Self {
            status: 400,
            body: json!({ "message": "Invalid data", "errors": err.errors }),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Positions API bound to one repository instance.
pub struct PositionsApi<R: PositionRepository> {
    service: HierarchyService<R>,
}

impl<'conn> PositionsApi<SqlitePositionRepository<'conn>> {
    /// Builds the API over a migrated SQLite connection.
    pub fn from_connection(conn: &'conn Connection) -> Result<Self, PositionRepoError> {
        Ok(Self::new(SqlitePositionRepository::try_new(conn)?))
    }
}

impl<R: PositionRepository> PositionsApi<R> {
    pub fn new(repo: R) -> Self {
        Self {
            service: HierarchyService::new(repo),
        }
    }

    /// Handles one request. `body` is the raw request body, if any.
    pub fn handle(&self, method: &str, path: &str, body: Option<&str>) -> ApiResponse {
        let started_at = Instant::now();
        let response = self.dispatch(method, path, body);
        info!(
            "event=api_request module=api method={} path={} status={} duration_ms={}",
            method.trim().to_ascii_uppercase(),
            path,
            response.status,
            started_at.elapsed().as_millis()
        );
        response
    }

    fn dispatch(&self, method: &str, path: &str, body: Option<&str>) -> ApiResponse {
        let Some(route) = parse_route(path) else {
            return ApiResponse::message(404, "Route not found");
        };
        let method = match Method::parse(method) {
            Some(method) if route.allowed_methods().contains(&method) => method,
            _ => return method_not_allowed(&route),
        };

        match (method, route) {
            (Method::Get, Route::Collection) => self.list_trees(),
            (Method::Post, Route::Collection) => self.create(body),
            (Method::Get, Route::Item(id)) => self.get_one(&id),
            (Method::Put, Route::Item(id)) => self.update(&id, body),
            (Method::Delete, Route::Item(id)) => self.delete(&id),
            (Method::Get, Route::Subtree(id)) => self.get_subtree(&id),
            (_, route) => method_not_allowed(&route),
        }
    }

    fn list_trees(&self) -> ApiResponse {
        match self.service.get_all_with_hierarchy() {
            Ok(trees) => ApiResponse::ok(to_json(&trees)),
            Err(err) => error_response(err),
        }
    }

    fn get_one(&self, raw_id: &str) -> ApiResponse {
        let Some(id) = parse_uuid_text(raw_id) else {
            return ApiResponse::not_found();
        };
        match self.service.get_one(id) {
            Ok(Some(position)) => ApiResponse::ok(to_json(&position)),
            Ok(None) => ApiResponse::not_found(),
            Err(err) => error_response(err),
        }
    }

    fn get_subtree(&self, raw_id: &str) -> ApiResponse {
        let Some(id) = parse_uuid_text(raw_id) else {
            return ApiResponse::not_found();
        };
        match self.service.get_with_children(id) {
            Ok(Some(tree)) => ApiResponse::ok(to_json(&tree)),
            Ok(None) => ApiResponse::not_found(),
            Err(err) => error_response(err),
        }
    }

    fn create(&self, body: Option<&str>) -> ApiResponse {
        let draft = match parse_draft(body) {
            Ok(draft) => draft,
            Err(err) => return ApiResponse::invalid(err),
        };
        match self.service.create(&draft) {
            Ok(position) => ApiResponse::ok(to_json(&position)),
            Err(err) => error_response(err),
        }
    }

    fn update(&self, raw_id: &str, body: Option<&str>) -> ApiResponse {
        let draft = match parse_draft(body) {
            Ok(draft) => draft,
            Err(err) => return ApiResponse::invalid(err),
        };
        let Some(id) = parse_uuid_text(raw_id) else {
            return ApiResponse::not_found();
        };
        match self.service.update(id, &draft) {
            Ok(updated) => ApiResponse::ok(json!({
                "message": "Updated Position",
                "updated": to_json(&updated),
            })),
            Err(err) => error_response(err),
        }
    }

    fn delete(&self, raw_id: &str) -> ApiResponse {
        let Some(id) = parse_uuid_text(raw_id) else {
            return ApiResponse::not_found();
        };
        match self.service.delete(id) {
            Ok(deleted) => ApiResponse::ok(json!({
                "message": "Position deleted",
                "deletedPosition": to_json(&deleted),
            })),
            Err(err) => error_response(err),
        }
    }
}

/// Handles one request against `conn` without keeping any state between calls.
///
/// Every call re-checks the schema of `conn` before dispatching. Long-lived
/// hosts should build one `PositionsApi` via `from_connection` and reuse it.
/// Schema problems on `conn` are reported as `500`.
pub fn handle_request(
    conn: &Connection,
    method: &str,
    path: &str,
    body: Option<&str>,
) -> ApiResponse {
    match PositionsApi::from_connection(conn) {
        Ok(api) => api.handle(method, path, body),
        Err(err) => {
            error!(
                "event=api_request module=api status=error error_code=repo_init_failed error={}",
                err
            );
            internal_error()
        }
    }
}

fn parse_draft(body: Option<&str>) -> Result<PositionDraft, DraftValidationError> {
    parse_position_body(body.unwrap_or_default())
}

fn error_response(err: HierarchyServiceError) -> ApiResponse {
    match err {
        HierarchyServiceError::NotFound(_) => ApiResponse::not_found(),
        HierarchyServiceError::Invariant(violation) => {
            ApiResponse::message(400, violation.to_string())
        }
        HierarchyServiceError::Repo(err) => {
            error!(
                "event=api_request module=api status=error error_code=store_failure error={}",
                err
            );
            internal_error()
        }
    }
}

fn method_not_allowed(route: &Route) -> ApiResponse {
    let allowed = route
        .allowed_methods()
        .iter()
        .map(|method| method.as_str())
        .collect::<Vec<_>>();
    warn!(
        "event=api_request module=api status=rejected reason=method_not_allowed allowed={}",
        allowed.join(",")
    );
    ApiResponse {
        status: 405,
        body: json!({ "message": "Method not allowed", "allowed": allowed }),
    }
}

fn internal_error() -> ApiResponse {
    ApiResponse::message(500, "Internal server error")
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    // Position types only hold strings and uuids, which always serialize.
    serde_json::to_value(value).unwrap_or(Value::Null)
}
