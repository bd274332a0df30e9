//! The ordered route table.
//!
//! Routes are tried strictly in registration order and the first entry
//! whose method and compiled pattern both match wins: no specificity
//! ranking, no backtracking across entries. The table is small and built
//! once before serving starts, so an O(n) scan per request is fine.

use std::collections::HashMap;

use crate::handler::Handler;
use crate::pattern::PathPattern;
use http::Method;
use tracing::warn;

#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

struct Route {
    method: Method,
    pattern: PathPattern,
    handlers: Vec<Box<dyn Handler>>,
}

/// A successful lookup: the matched route's handler chain plus the path
/// parameters it captured.
pub struct RouteMatch<'router> {
    handlers: &'router [Box<dyn Handler>],
    params: HashMap<String, String>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route.
    ///
    /// Registering with an empty handler list is accepted as a no-op (with
    /// a warning): the entry is never inserted, so it can never match.
    pub fn register(&mut self, method: Method, pattern: &str, handlers: Vec<Box<dyn Handler>>) {
        if handlers.is_empty() {
            warn!(%method, pattern, "route registered without handlers, ignoring");
            return;
        }
        self.routes.push(Route { method, pattern: PathPattern::parse(pattern), handlers });
    }

    /// Finds the first route matching `method` and the normalized `path`.
    pub fn lookup(&self, method: &Method, path: &str) -> Option<RouteMatch<'_>> {
        for route in &self.routes {
            if route.method != *method {
                continue;
            }
            if let Some(params) = route.pattern.matches(path) {
                return Some(RouteMatch { handlers: route.handlers.as_slice(), params });
            }
        }
        None
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl<'router> RouteMatch<'router> {
    pub fn handlers(&self) -> &'router [Box<dyn Handler>] {
        self.handlers
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    pub(crate) fn into_parts(self) -> (&'router [Box<dyn Handler>], HashMap<String, String>) {
        (self.handlers, self.params)
    }
}
