//! Request matching.
//!
//! A pure scan over an immutable route snapshot: first registered match
//! wins, so more-specific routes must be registered before general ones.
//! The engine never reorders.

use crate::route::MockRoute;
use std::collections::HashMap;

/// Result of matching a request against a route list.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    /// The matched route
    pub route: &'a MockRoute,
    /// Path parameters bound from the pattern
    pub params: HashMap<String, String>,
}

/// Find the first route matching `(method, path)`.
///
/// `path` may carry a query string; only the path portion is tested.
pub fn find_match<'a>(
    routes: &'a [MockRoute],
    method: &str,
    path: &str,
) -> Option<RouteMatch<'a>> {
    let path_only = path.split('?').next().unwrap_or(path);

    for route in routes {
        if !route.matches_method(method) {
            continue;
        }
        if let Some(params) = route.pattern().matches(path_only) {
            return Some(RouteMatch { route, params });
        }
    }

    None
}
