//! Request line parsing for the positions HTTP surface.
//!
//! # Invariants
//! - Paths are matched on segments; query strings and a trailing `/` are
//!   ignored.
//! - Ids are kept as raw text; the handler decides what an unparsable id means.

/// HTTP method understood by the router.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    /// Parses a method name case-insensitively.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// Resource addressed by a request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/positions`
    Collection,
    /// `/positions/{id}`
    Item(String),
    /// `/positions/children/{id}` or `/positions-children/{id}`
    Subtree(String),
}

impl Route {
    /// Methods accepted on this route, for `405` responses.
    pub fn allowed_methods(&self) -> &'static [Method] {
        match self {
            Self::Collection => &[Method::Get, Method::Post],
            Self::Item(_) => &[Method::Get, Method::Put, Method::Delete],
            Self::Subtree(_) => &[Method::Get],
        }
    }
}

/// Maps a request path onto a `Route`, or `None` when nothing matches.
pub fn parse_route(path: &str) -> Option<Route> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segments = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();

    match segments.as_slice() {
        ["positions"] => Some(Route::Collection),
        ["positions", "children", id] => Some(Route::Subtree((*id).to_string())),
        ["positions-children", id] => Some(Route::Subtree((*id).to_string())),
        ["positions", id] => Some(Route::Item((*id).to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_route, Method, Route};

    #[test]
    fn parses_collection_and_item_routes() {
        assert_eq!(parse_route("/positions"), Some(Route::Collection));
        assert_eq!(parse_route("/positions/"), Some(Route::Collection));
        assert_eq!(parse_route("/positions?x=1"), Some(Route::Collection));
        assert_eq!(
            parse_route("/positions/abc"),
            Some(Route::Item("abc".to_string()))
        );
    }

    #[test]
    fn both_subtree_spellings_are_supported() {
        assert_eq!(
            parse_route("/positions/children/abc"),
            Some(Route::Subtree("abc".to_string()))
        );
        assert_eq!(
            parse_route("/positions-children/abc"),
            Some(Route::Subtree("abc".to_string()))
        );
    }

    #[test]
    fn unknown_paths_do_not_match() {
        assert_eq!(parse_route("/"), None);
        assert_eq!(parse_route("/teams"), None);
        assert_eq!(parse_route("/positions/a/b/c"), None);
    }

    #[test]
    fn method_parsing_is_case_insensitive() {
        assert_eq!(Method::parse("get"), Some(Method::Get));
        assert_eq!(Method::parse(" Delete "), Some(Method::Delete));
        assert_eq!(Method::parse("PATCH"), None);
        assert_eq!(Method::Put.as_str(), "PUT");
    }
}
