//! Request routing and path matching.
//!
//! Routes map an HTTP method and a path template to the name of a registered
//! service method. Templates use `{name}` segments; their captures become the
//! request's path parameters.
//!
//! # Example
//!
//! ```rust
//! use bindery_server::Router;
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.add_route(Method::GET, "/users/{id}", "GetUser");
//! router.add_route(Method::POST, "/users", "CreateUser");
//!
//! let matched = router.match_route(&Method::GET, "/users/42").unwrap();
//! assert_eq!(matched.method_name(), "GetUser");
//! assert_eq!(matched.params().get("id"), Some("42"));
//! ```

use bindery_codec::PathParams;
use http::Method;

/// A matched route with its path captures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    method_name: String,
    params: PathParams,
}

impl RouteMatch {
    /// Returns the service method the route points to.
    #[must_use]
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// Returns the path captures.
    #[must_use]
    pub fn params(&self) -> &PathParams {
        &self.params
    }

    /// Splits into method name and captures.
    #[must_use]
    pub fn into_parts(self) -> (String, PathParams) {
        (self.method_name, self.params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Literal(String),
    Param(String),
}

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    segments: Vec<PathSegment>,
    method_name: String,
}

impl Route {
    fn new(method: Method, pattern: &str, method_name: String) -> Self {
        Self {
            method,
            segments: Self::parse_segments(pattern),
            method_name,
        }
    }

    fn parse_segments(pattern: &str) -> Vec<PathSegment> {
        pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) => PathSegment::Param(name.to_string()),
                None => PathSegment::Literal(s.to_string()),
            })
            .collect()
    }

    fn match_path(&self, path: &str) -> Option<PathParams> {
        let path_segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        if path_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (pattern, actual) in self.segments.iter().zip(path_segments) {
            match pattern {
                PathSegment::Literal(expected) if expected != actual => return None,
                PathSegment::Literal(_) => {}
                PathSegment::Param(name) => params.push(name.as_str(), actual),
            }
        }

        Some(params)
    }
}

/// HTTP request router.
///
/// Routes are tried in registration order; the first match wins. A `HEAD`
/// request with no `HEAD` route falls back to the `GET` routes.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates a new empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route.
    pub fn add_route(
        &mut self,
        method: Method,
        pattern: impl AsRef<str>,
        method_name: impl Into<String>,
    ) {
        self.routes
            .push(Route::new(method, pattern.as_ref(), method_name.into()));
    }

    /// Adds a route, builder style.
    #[must_use]
    pub fn route(
        mut self,
        method: Method,
        pattern: impl AsRef<str>,
        method_name: impl Into<String>,
    ) -> Self {
        self.add_route(method, pattern, method_name);
        self
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Matches a request line to a route.
    #[must_use]
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.find(method, path).or_else(|| {
            if method == Method::HEAD {
                self.find(&Method::GET, path)
            } else {
                None
            }
        })
    }

    fn find(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        self.routes
            .iter()
            .filter(|route| route.method == *method)
            .find_map(|route| {
                route.match_path(path).map(|params| RouteMatch {
                    method_name: route.method_name.clone(),
                    params,
                })
            })
    }

    /// Returns the method names routes point to, in registration order.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.method_name.as_str())
    }
}
