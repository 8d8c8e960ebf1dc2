use http::Method;
use std::collections::HashMap;

/// Proxy endpoints served on the main listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endpoint {
    UploadCustomers,
    CustomerDetails,
    Inquiry,
}

impl Endpoint {
    pub fn name(&self) -> &'static str {
        match self {
            Endpoint::UploadCustomers => "upload_customers",
            Endpoint::CustomerDetails => "customer_details",
            Endpoint::Inquiry => "inquiry",
        }
    }
}

#[derive(Debug)]
enum PathSegment {
    Static(String),
    Param(String),
}

#[derive(Debug)]
struct PathPattern {
    segments: Vec<PathSegment>,
}

impl PathPattern {
    /// Parses a pattern such as "/api/admin/customers/{phoneNumber}".
    fn parse(pattern: &str) -> Self {
        let normalized = pattern.trim().trim_matches('/');
        let segments = if normalized.is_empty() {
            vec![]
        } else {
            normalized
                .split('/')
                .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    Some(name) => PathSegment::Param(name.to_string()),
                    None => PathSegment::Static(s.to_string()),
                })
                .collect()
        };

        PathPattern { segments }
    }

    /// Returns the captured parameters if `path` matches segment for segment.
    /// Parameters are returned as they appear on the wire, still percent-encoded.
    fn matches<'a>(&self, path: &'a str) -> Option<HashMap<String, &'a str>> {
        let normalized = path.trim_matches('/');
        let request_segments: Vec<&'a str> = if normalized.is_empty() {
            vec![]
        } else {
            normalized.split('/').collect()
        };

        if request_segments.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (pattern, segment) in self.segments.iter().zip(request_segments) {
            match pattern {
                PathSegment::Static(s) if s == segment => {}
                PathSegment::Static(_) => return None,
                PathSegment::Param(name) => {
                    params.insert(name.clone(), segment);
                }
            }
        }

        Some(params)
    }
}

#[derive(Debug)]
struct Route {
    method: Method,
    path: PathPattern,
    endpoint: Endpoint,
}

#[derive(Debug, PartialEq)]
pub enum Resolution<'a> {
    Matched {
        endpoint: Endpoint,
        params: HashMap<String, &'a str>,
    },
    MethodNotAllowed,
    NotFound,
}

#[derive(Debug)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Routes are tried in order; static paths must precede overlapping
    /// parameterised ones.
    pub fn new() -> Self {
        let route = |method, path: &str, endpoint| Route {
            method,
            path: PathPattern::parse(path),
            endpoint,
        };

        Self {
            routes: vec![
                route(
                    Method::POST,
                    "/api/admin/customers/uploadCustomers",
                    Endpoint::UploadCustomers,
                ),
                route(
                    Method::GET,
                    "/api/admin/customers/{phoneNumber}",
                    Endpoint::CustomerDetails,
                ),
                route(Method::POST, "/api/inquiry", Endpoint::Inquiry),
            ],
        }
    }

    /// The first route whose path matches decides; a method mismatch on that
    /// route is reported rather than falling through to later routes.
    pub fn resolve<'a>(&self, method: &Method, path: &'a str) -> Resolution<'a> {
        for route in &self.routes {
            if let Some(params) = route.path.matches(path) {
                if route.method != *method {
                    return Resolution::MethodNotAllowed;
                }
                return Resolution::Matched {
                    endpoint: route.endpoint,
                    params,
                };
            }
        }

        Resolution::NotFound
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
