//! Transport-agnostic HTTP surface for the positions hierarchy.
//!
//! Callers hand in a method, a path and an optional raw JSON body and get
//! back a status code with a JSON body. Binding a socket is left to the host.

pub mod api;
pub mod route;

pub use api::{handle_request, ApiResponse, PositionsApi};
pub use route::{parse_route, Method, Route};
